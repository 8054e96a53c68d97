//! Cursor encoding
//!
//! Cursors travel as base64 of a JSON object. Page and composite positions
//! are written at the top level (`cursor`/`offset`, `collection*`), filter
//! chains under `implicitFilterCursor` or `relatedFilterCursor`. The shape is
//! recovered from which keys are present, so `offset` and `collectionOffset`
//! are always written.

use super::types::{
    CompositeCursor, Cursor, FrameCursor, ImplicitFilterCursor, PageCursor, RelatedFilterCursor,
    CURSOR_VERSION,
};
use crate::error::{Error, Result};
use crate::types::Token;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Cursors longer than this are rejected before decoding
pub const MAX_CURSOR_LEN: usize = 64 * 1024;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// JSON layout of a cursor
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    #[serde(default, skip_serializing_if = "is_zero")]
    account_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_cursor: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cursor: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    implicit_filter_cursor: Option<ImplicitFilterCursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    related_filter_cursor: Option<RelatedFilterCursor>,
}

impl From<&Cursor> for WireCursor {
    fn from(cursor: &Cursor) -> Self {
        let mut wire = WireCursor {
            version: Some(cursor.version),
            account_index: cursor.account_index,
            ..Default::default()
        };

        match &cursor.frame {
            None => {}
            Some(FrameCursor::Page(page)) => {
                wire.cursor.clone_from(&page.cursor);
                wire.offset = Some(page.offset);
            }
            Some(FrameCursor::Composite(composite)) => {
                wire.collection_id.clone_from(&composite.collection_id);
                wire.collection_cursor.clone_from(&composite.collection_cursor);
                wire.collection_offset = Some(composite.collection_offset);
                wire.cursor.clone_from(&composite.cursor);
                wire.offset = Some(composite.offset);
            }
            Some(FrameCursor::ImplicitFilter(implicit)) => {
                wire.implicit_filter_cursor = Some(implicit.clone());
            }
            Some(FrameCursor::RelatedFilter(related)) => {
                wire.related_filter_cursor = Some(related.clone());
            }
        }

        wire
    }
}

impl TryFrom<WireCursor> for Cursor {
    type Error = Error;

    fn try_from(wire: WireCursor) -> Result<Self> {
        let version = wire.version.unwrap_or(CURSOR_VERSION);
        if version == 0 || version > CURSOR_VERSION {
            return Err(Error::malformed_cursor(format!(
                "unsupported cursor version {version}"
            )));
        }

        let has_collection = wire.collection_id.is_some()
            || wire.collection_cursor.is_some()
            || wire.collection_offset.is_some();
        let has_page = wire.cursor.is_some() || wire.offset.is_some();
        let shapes = usize::from(has_collection || has_page)
            + usize::from(wire.implicit_filter_cursor.is_some())
            + usize::from(wire.related_filter_cursor.is_some());
        if shapes > 1 {
            return Err(Error::malformed_cursor("cursor mixes frame shapes"));
        }

        let frame = if let Some(implicit) = wire.implicit_filter_cursor {
            Some(FrameCursor::ImplicitFilter(implicit))
        } else if let Some(related) = wire.related_filter_cursor {
            Some(FrameCursor::RelatedFilter(related))
        } else if has_collection {
            Some(FrameCursor::Composite(CompositeCursor {
                collection_id: wire.collection_id,
                collection_cursor: wire.collection_cursor,
                collection_offset: wire.collection_offset.unwrap_or_default(),
                cursor: wire.cursor,
                offset: wire.offset.unwrap_or_default(),
            }))
        } else if has_page {
            Some(FrameCursor::Page(PageCursor {
                cursor: wire.cursor,
                offset: wire.offset.unwrap_or_default(),
            }))
        } else {
            None
        };

        Ok(Cursor {
            version,
            account_index: wire.account_index,
            frame,
        })
    }
}

/// Encode a cursor into its transport string
pub fn encode(cursor: &Cursor) -> Result<String> {
    let json = serde_json::to_vec(&WireCursor::from(cursor))?;
    Ok(STANDARD.encode(json))
}

/// Decode a transport string.
///
/// The empty string decodes to the start state.
pub fn decode(input: &str) -> Result<Cursor> {
    if input.is_empty() {
        return Ok(Cursor::start());
    }
    if input.len() > MAX_CURSOR_LEN {
        return Err(Error::malformed_cursor(format!(
            "cursor exceeds {MAX_CURSOR_LEN} bytes"
        )));
    }

    let bytes = STANDARD
        .decode(input.trim())
        .map_err(|e| Error::malformed_cursor(format!("invalid base64: {e}")))?;
    let wire: WireCursor = serde_json::from_slice(&bytes)
        .map_err(|e| Error::malformed_cursor(format!("invalid cursor JSON: {e}")))?;

    Cursor::try_from(wire)
}

/// The JSON object a cursor travels as, for diagnostics
pub fn to_json(cursor: &Cursor) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(WireCursor::from(cursor))?)
}
