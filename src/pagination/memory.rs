//! In-memory paginator
//!
//! Serves fixture collections in fixed-size batches with offset tokens.

use super::types::{FetchRequest, UpstreamPage, UpstreamPaginator};
use crate::error::{Error, Result, ResultExt};
use crate::extract::{find_value, scalar_to_string};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A failure injected into the next call for a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Fail with a rate limit error
    RateLimited,
    /// Fail with an HTTP status
    Status(u16),
    /// Sleep before answering
    Delay(Duration),
}

/// Fixture-backed [`UpstreamPaginator`].
///
/// Collections are keyed by selector. A collection registered for an
/// account is preferred over the account-less one. Filters are `^`-separated
/// equality terms: `type=admin^active=true`.
#[derive(Debug, Default)]
pub struct InMemoryPaginator {
    collections: HashMap<String, Vec<Value>>,
    batch_size: Option<usize>,
    failures: Mutex<HashMap<String, VecDeque<ScriptedFailure>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
}

impl InMemoryPaginator {
    /// Create an empty paginator
    pub fn new() -> Self {
        Self::default()
    }

    /// Load collections from a fixture object.
    ///
    /// Keys are selectors, or `<account>/<selector>` for per-account data.
    /// Use [`Self::with_account_collection`] when a selector itself contains
    /// slashes and the data is account-specific.
    pub fn from_fixture(fixture: &Value) -> Result<Self> {
        let map = fixture
            .as_object()
            .ok_or_else(|| Error::config("fixture must be an object of record arrays"))?;

        let mut paginator = Self::new();
        for (key, records) in map {
            let records = records
                .as_array()
                .ok_or_else(|| Error::invalid_value(key, "expected an array of records"))?;
            paginator.collections.insert(key.clone(), records.clone());
        }
        Ok(paginator)
    }

    /// Load collections from a JSON fixture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let fixture: Value = serde_json::from_str(&content)
            .with_context(|| format!("invalid fixture file {}", path.display()))?;
        Self::from_fixture(&fixture)
    }

    /// Register a collection
    #[must_use]
    pub fn with_collection(mut self, selector: impl Into<String>, records: Vec<Value>) -> Self {
        self.collections.insert(selector.into(), records);
        self
    }

    /// Register a collection for one account
    #[must_use]
    pub fn with_account_collection(
        mut self,
        account: &str,
        selector: &str,
        records: Vec<Value>,
    ) -> Self {
        self.collections
            .insert(format!("{account}/{selector}"), records);
        self
    }

    /// Fix the batch size regardless of the requested page size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }

    /// Make the next call for `selector` fail or stall
    pub fn fail_next(&self, selector: &str, failure: ScriptedFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(selector.to_string())
            .or_default()
            .push_back(failure);
    }

    /// Number of calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests served so far, in order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn collection(&self, request: &FetchRequest) -> Option<&Vec<Value>> {
        request
            .account
            .as_ref()
            .and_then(|account| {
                self.collections
                    .get(&format!("{account}/{}", request.selector))
            })
            .or_else(|| self.collections.get(&request.selector))
    }

    fn next_failure(&self, selector: &str) -> Option<ScriptedFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(selector)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl UpstreamPaginator for InMemoryPaginator {
    async fn next(&self, request: &FetchRequest) -> Result<UpstreamPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.next_failure(&request.selector) {
            Some(ScriptedFailure::RateLimited) => {
                return Err(Error::RateLimited {
                    retry_after_seconds: 1,
                })
            }
            Some(ScriptedFailure::Status(status)) => {
                return Err(Error::http_status(status, "scripted failure"))
            }
            Some(ScriptedFailure::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }

        let records = self.collection(request).ok_or_else(|| {
            Error::http_status(404, format!("unknown collection '{}'", request.selector))
        })?;

        let filtered: Vec<&Value> = match &request.filter {
            Some(filter) if !filter.is_empty() => {
                let terms = parse_filter(filter)?;
                records
                    .iter()
                    .filter(|r| matches_filter(r, &terms))
                    .collect()
            }
            _ => records.iter().collect(),
        };

        let start = match &request.token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::decode(format!("invalid page token '{token}'")))?,
            None => 0,
        };
        let batch = self.batch_size.unwrap_or(request.page_size).max(1);
        let end = start.saturating_add(batch).min(filtered.len());
        let page: Vec<Value> = filtered
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|r| (*r).clone())
            .collect();

        debug!(
            "Served {} records of {} from offset {}",
            page.len(),
            request,
            start
        );

        if end < filtered.len() {
            Ok(UpstreamPage::more(page, end.to_string()))
        } else {
            Ok(UpstreamPage::done(page))
        }
    }
}

/// Split `a=1^b=2` into equality terms
fn parse_filter(filter: &str) -> Result<Vec<(&str, &str)>> {
    filter
        .split('^')
        .filter(|term| !term.trim().is_empty())
        .map(|term| {
            term.split_once('=')
                .map(|(field, value)| (field.trim(), value.trim()))
                .ok_or_else(|| Error::decode(format!("invalid filter term '{term}'")))
        })
        .collect()
}

fn matches_filter(record: &Value, terms: &[(&str, &str)]) -> bool {
    terms.iter().all(|(field, expected)| {
        find_value(record, field)
            .and_then(scalar_to_string)
            .is_some_and(|actual| actual == *expected)
    })
}
