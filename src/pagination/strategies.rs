//! Token pagination strategies
//!
//! Each strategy maps a vendor pagination pattern onto opaque tokens: it
//! turns a token into request parameters and derives the next token from a
//! response.

use super::types::{NextToken, StopCondition};
use crate::config::PaginationDefinition;
use crate::error::{Error, Result};
use crate::extract::{first_value, scalar_to_string};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fmt::Debug;

/// Where to fetch a batch from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    /// Query parameters to add
    pub query_params: Vec<(String, String)>,
    /// Absolute URL replacing the collection URL
    pub url: Option<String>,
}

impl PageParams {
    fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    fn with_url(url: &str) -> Self {
        Self {
            query_params: Vec::new(),
            url: Some(url.to_string()),
        }
    }
}

/// A response as seen by a strategy
#[derive(Debug, Clone, Copy)]
pub struct PageResponse<'a> {
    pub body: &'a Value,
    pub headers: &'a HeaderMap,
    pub records_count: usize,
}

/// Core trait for token strategies
pub trait PaginationStrategy: Send + Sync + Debug {
    /// Parameters for the batch identified by `token`
    fn params(&self, token: Option<&str>, page_size: usize) -> Result<PageParams>;

    /// Token of the batch after the one identified by `token`
    fn next_token(
        &self,
        token: Option<&str>,
        page_size: usize,
        response: &PageResponse<'_>,
    ) -> Result<NextToken>;
}

/// Build a strategy from its definition
pub fn build_strategy(def: &PaginationDefinition) -> Box<dyn PaginationStrategy> {
    match def {
        PaginationDefinition::None => Box::new(NoPagination),
        PaginationDefinition::Cursor {
            cursor_param,
            cursor_path,
            limit_param,
            stop_condition,
        } => Box::new(CursorPagination {
            cursor_param: cursor_param.clone(),
            cursor_path: cursor_path.clone(),
            limit_param: limit_param.clone(),
            stop_condition: stop_condition.as_ref().map(StopCondition::from),
        }),
        PaginationDefinition::Offset {
            offset_param,
            limit_param,
            stop_condition,
        } => Box::new(OffsetPagination {
            offset_param: offset_param.clone(),
            limit_param: limit_param.clone(),
            stop_condition: stop_condition.as_ref().map(StopCondition::from),
        }),
        PaginationDefinition::PageNumber {
            page_param,
            start_page,
            page_size_param,
            stop_condition,
        } => Box::new(PageNumberPagination {
            page_param: page_param.clone(),
            start_page: *start_page,
            page_size_param: page_size_param.clone(),
            stop_condition: stop_condition
                .as_ref()
                .map(StopCondition::from)
                .unwrap_or_default(),
        }),
        PaginationDefinition::LinkHeader { rel } => {
            Box::new(LinkHeaderPagination { rel: rel.clone() })
        }
        PaginationDefinition::NextUrl { path } => {
            Box::new(NextUrlPagination { path: path.clone() })
        }
    }
}

fn parse_number_token(token: Option<&str>, what: &str) -> Result<Option<u64>> {
    token
        .map(|t| {
            t.parse::<u64>()
                .map_err(|_| Error::decode(format!("invalid {what} token '{t}'")))
        })
        .transpose()
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., `?starting_after=obj_123`)
///
/// The token is the cursor value found in the previous response body. It
/// says nothing about how many records came before, so a `TotalCount` stop
/// condition only sees the current batch; datasource loading rejects it.
#[derive(Debug, Clone)]
pub struct CursorPagination {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Path of the next cursor in the response body
    pub cursor_path: String,
    /// Optional page size parameter
    pub limit_param: Option<String>,
    /// Optional stop condition
    pub stop_condition: Option<StopCondition>,
}

impl PaginationStrategy for CursorPagination {
    fn params(&self, token: Option<&str>, page_size: usize) -> Result<PageParams> {
        let mut params = PageParams::default();
        if let Some(limit) = &self.limit_param {
            params = params.with_param(limit, page_size);
        }
        if let Some(cursor) = token {
            params = params.with_param(&self.cursor_param, cursor);
        }
        Ok(params)
    }

    fn next_token(
        &self,
        _token: Option<&str>,
        _page_size: usize,
        response: &PageResponse<'_>,
    ) -> Result<NextToken> {
        if let Some(condition) = &self.stop_condition {
            let fetched = response.records_count as u64;
            if condition.should_stop(response.body, response.records_count, fetched) {
                return Ok(NextToken::Done);
            }
        }

        Ok(first_value(response.body, &self.cursor_path)
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|c| !c.is_empty())
            .map_or(NextToken::Done, NextToken::Continue))
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (e.g., `?offset=100&limit=50`)
///
/// The token is the offset of the batch.
#[derive(Debug, Clone)]
pub struct OffsetPagination {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Optional stop condition
    pub stop_condition: Option<StopCondition>,
}

impl PaginationStrategy for OffsetPagination {
    fn params(&self, token: Option<&str>, page_size: usize) -> Result<PageParams> {
        let offset = parse_number_token(token, "offset")?.unwrap_or(0);
        Ok(PageParams::default()
            .with_param(&self.offset_param, offset)
            .with_param(&self.limit_param, page_size))
    }

    fn next_token(
        &self,
        token: Option<&str>,
        page_size: usize,
        response: &PageResponse<'_>,
    ) -> Result<NextToken> {
        let offset = parse_number_token(token, "offset")?.unwrap_or(0);
        let fetched = offset + response.records_count as u64;

        if let Some(condition) = &self.stop_condition {
            if condition.should_stop(response.body, response.records_count, fetched) {
                return Ok(NextToken::Done);
            }
        }

        // A short batch is the last one
        if response.records_count == 0 || response.records_count < page_size {
            return Ok(NextToken::Done);
        }

        Ok(NextToken::Continue(fetched.to_string()))
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination (e.g., `?page=2&per_page=50`)
///
/// The token is the page number.
#[derive(Debug, Clone)]
pub struct PageNumberPagination {
    /// Query parameter name for page number
    pub page_param: String,
    /// First page number (usually 0 or 1)
    pub start_page: u32,
    /// Optional page size parameter name
    pub page_size_param: Option<String>,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl PaginationStrategy for PageNumberPagination {
    fn params(&self, token: Option<&str>, page_size: usize) -> Result<PageParams> {
        let page = parse_number_token(token, "page")?.unwrap_or(u64::from(self.start_page));
        let mut params = PageParams::default().with_param(&self.page_param, page);
        if let Some(param) = &self.page_size_param {
            params = params.with_param(param, page_size);
        }
        Ok(params)
    }

    fn next_token(
        &self,
        token: Option<&str>,
        page_size: usize,
        response: &PageResponse<'_>,
    ) -> Result<NextToken> {
        let page = parse_number_token(token, "page")?.unwrap_or(u64::from(self.start_page));
        let pages_before = page.saturating_sub(u64::from(self.start_page));
        let fetched = pages_before * page_size as u64 + response.records_count as u64;

        if self
            .stop_condition
            .should_stop(response.body, response.records_count, fetched)
        {
            return Ok(NextToken::Done);
        }

        // With a known page size, a short page is the last one
        if self.page_size_param.is_some() && response.records_count < page_size {
            return Ok(NextToken::Done);
        }

        Ok(NextToken::Continue((page + 1).to_string()))
    }
}

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Link header pagination (RFC 5988)
///
/// The token is the URL of the batch.
/// Format: `Link: <https://api.github.com/...?page=2>; rel="next", ...`
#[derive(Debug, Clone)]
pub struct LinkHeaderPagination {
    /// Rel value to follow (default: "next")
    pub rel: String,
}

impl Default for LinkHeaderPagination {
    fn default() -> Self {
        Self {
            rel: "next".to_string(),
        }
    }
}

impl PaginationStrategy for LinkHeaderPagination {
    fn params(&self, token: Option<&str>, _page_size: usize) -> Result<PageParams> {
        Ok(token.map(PageParams::with_url).unwrap_or_default())
    }

    fn next_token(
        &self,
        _token: Option<&str>,
        _page_size: usize,
        response: &PageResponse<'_>,
    ) -> Result<NextToken> {
        Ok(response
            .headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(|header| parse_link_header(header, &self.rel))
            .map_or(NextToken::Done, NextToken::Continue))
    }
}

/// Parse a Link header and extract the URL for the given rel
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    for part in header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                rel = Some(stripped.trim_matches('"').trim_matches('\''));
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r.split_whitespace().any(|r| r == target_rel) {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL pagination (URL in response body)
///
/// The token is the URL of the batch.
#[derive(Debug, Clone)]
pub struct NextUrlPagination {
    /// Path of the next URL in the response body
    pub path: String,
}

impl PaginationStrategy for NextUrlPagination {
    fn params(&self, token: Option<&str>, _page_size: usize) -> Result<PageParams> {
        Ok(token.map(PageParams::with_url).unwrap_or_default())
    }

    fn next_token(
        &self,
        _token: Option<&str>,
        _page_size: usize,
        response: &PageResponse<'_>,
    ) -> Result<NextToken> {
        Ok(first_value(response.body, &self.path)
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|u| !u.is_empty())
            .map_or(NextToken::Done, NextToken::Continue))
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPagination;

impl PaginationStrategy for NoPagination {
    fn params(&self, _token: Option<&str>, _page_size: usize) -> Result<PageParams> {
        Ok(PageParams::default())
    }

    fn next_token(
        &self,
        _token: Option<&str>,
        _page_size: usize,
        _response: &PageResponse<'_>,
    ) -> Result<NextToken> {
        Ok(NextToken::Done)
    }
}
