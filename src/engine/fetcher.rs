//! Upstream calls under the request deadline, with account prefetching

use crate::error::{Error, Result};
use crate::pagination::{FetchRequest, UpstreamPage, UpstreamPaginator};
use crate::planner::Frame;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::debug;

/// Upstream access for one page assembly.
///
/// Prefetched results are keyed by the exact request that produced them and
/// consumed at most once.
pub(crate) struct Fetcher<'a> {
    paginator: &'a dyn UpstreamPaginator,
    deadline: Option<Deadline>,
    prefetched: HashMap<FetchRequest, Result<UpstreamPage>>,
    calls: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    pub at: Instant,
    pub timeout_ms: u64,
}

impl<'a> Fetcher<'a> {
    pub fn new(paginator: &'a dyn UpstreamPaginator, deadline: Option<Deadline>) -> Self {
        Self {
            paginator,
            deadline,
            prefetched: HashMap::new(),
            calls: 0,
        }
    }

    pub fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = Some(deadline);
    }

    /// Paginator calls made so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Fetch one batch for `frame`
    pub async fn fetch(&mut self, frame: &Frame, request: FetchRequest) -> Result<UpstreamPage> {
        let result = match self.prefetched.remove(&request) {
            Some(result) => {
                debug!("Using prefetched batch of {}", request);
                result
            }
            None => {
                self.calls += 1;
                call(self.paginator, &request, self.deadline).await
            }
        };

        result.map_err(|err| match err {
            Error::DeadlineExceeded { timeout_ms, .. } => Error::DeadlineExceeded {
                frame: format!("{frame}, call {request}"),
                timeout_ms,
            },
            other => Error::upstream(format!("{frame}, call {request}"), other),
        })
    }

    /// Fetch up to `max_concurrency` requests at once and keep the results
    pub async fn prefetch(&mut self, requests: Vec<FetchRequest>, max_concurrency: usize) {
        let pending: Vec<FetchRequest> = requests
            .into_iter()
            .filter(|r| !self.prefetched.contains_key(r))
            .collect();
        if pending.is_empty() {
            return;
        }

        debug!("Prefetching {} batches", pending.len());
        let paginator = self.paginator;
        let deadline = self.deadline;
        let calls: Vec<_> = pending
            .into_iter()
            .map(|request| async move {
                let result = call(paginator, &request, deadline).await;
                (request, result)
            })
            .collect();
        let results: Vec<(FetchRequest, Result<UpstreamPage>)> = stream::iter(calls)
            .buffered(max_concurrency.max(1))
            .collect()
            .await;

        self.calls += results.len();
        self.prefetched.extend(results);
    }
}

async fn call(
    paginator: &dyn UpstreamPaginator,
    request: &FetchRequest,
    deadline: Option<Deadline>,
) -> Result<UpstreamPage> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.at, paginator.next(request))
            .await
            .map_err(|_| Error::DeadlineExceeded {
                frame: request.to_string(),
                timeout_ms: deadline.timeout_ms,
            })?,
        None => paginator.next(request).await,
    }
}
