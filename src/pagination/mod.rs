//! Pagination module
//!
//! The upstream paging contract plus two record sources built on it.
//!
//! # Overview
//!
//! [`UpstreamPaginator`] fetches one batch of a collection at a time and
//! reports whether another follows via an opaque [`NextToken`]. The engine
//! only ever sees tokens; vendor pagination patterns (cursor, offset, page
//! number, link header, next URL) are folded into tokens by the
//! [`PaginationStrategy`] implementations used by the REST source.
//! [`InMemoryPaginator`] serves fixture data.

mod memory;
mod strategies;
mod types;

pub use memory::{InMemoryPaginator, ScriptedFailure};
pub use strategies::{
    build_strategy, parse_link_header, CursorPagination, LinkHeaderPagination, NextUrlPagination,
    NoPagination, OffsetPagination, PageNumberPagination, PageParams, PageResponse,
    PaginationStrategy,
};
pub use types::{FetchRequest, NextToken, StopCondition, UpstreamPage, UpstreamPaginator};
