//! Cursor module
//!
//! Opaque, resumable traversal positions.
//!
//! # Overview
//!
//! The codec is purely structural: it turns a [`Cursor`] into a transport
//! string and back, without knowing which entity the position belongs to.
//! The engine validates a decoded cursor against its traversal plan.
//!
//! An empty transport string is the start state when decoded; as a page's
//! next cursor it means the traversal is complete.

mod codec;
mod types;

pub use codec::{decode, encode, to_json, MAX_CURSOR_LEN};
pub use types::{
    CompositeCursor, Cursor, FrameCursor, ImplicitFilterCursor, PageCursor, RelatedFilterCursor,
    CURSOR_VERSION,
};

#[cfg(test)]
mod tests;
