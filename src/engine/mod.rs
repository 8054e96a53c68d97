//! Execution engine module
//!
//! Assembles one page of normalized objects from a traversal plan.
//!
//! # Overview
//!
//! The engine module provides:
//! - `PageAssembler` - Walks a plan depth-first from a cursor and emits objects
//! - `AssemblyConfig` - Configuration for page assembly
//! - `AssemblyStats` - Counters for one assembled page
//!
//! The walk is iterative. Each level of the current branch holds at most one
//! upstream batch. When the page fills, every level's position (batch token,
//! offset of the next record, join key) is frozen into the cursor; resuming
//! re-fetches those same batches and skips to the recorded offsets, so no
//! record is emitted twice or lost.

mod fetcher;
mod state;
mod types;

pub use types::{AssemblyConfig, AssemblyStats};

use crate::cursor;
use crate::error::{Error, ErrorClass, Result};
use crate::extract::{scalar_to_string, AttributeExtractor, PathResolver, RecordContext};
use crate::pagination::{FetchRequest, UpstreamPage, UpstreamPaginator};
use crate::planner::{Branch, TraversalPlan};
use crate::template::{self, TemplateContext};
use crate::types::{Object, Page};
use fetcher::{Deadline, Fetcher};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use types::TraversalState;

/// How a branch walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchOutcome {
    /// The page is full; the state points at the next record
    Filled,
    /// Every frame of the branch is exhausted
    Drained,
}

/// Page assembler for one traversal plan
pub struct PageAssembler<'a> {
    plan: &'a TraversalPlan<'a>,
    resolver: &'a dyn PathResolver,
    config: &'a AssemblyConfig,
    fetcher: Fetcher<'a>,
    stats: AssemblyStats,
}

impl<'a> PageAssembler<'a> {
    /// Create a new page assembler
    pub fn new(
        plan: &'a TraversalPlan<'a>,
        paginator: &'a dyn UpstreamPaginator,
        resolver: &'a dyn PathResolver,
        config: &'a AssemblyConfig,
    ) -> Self {
        Self {
            plan,
            resolver,
            config,
            fetcher: Fetcher::new(paginator, None),
            stats: AssemblyStats::default(),
        }
    }

    /// Abort with [`Error::DeadlineExceeded`] once `timeout` has elapsed
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Deadline {
            at: Instant::now() + timeout,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
        self.fetcher.set_deadline(deadline);
        self
    }

    /// Get statistics
    pub fn stats(&self) -> &AssemblyStats {
        &self.stats
    }

    /// Assemble the page starting at `cursor` (empty for the beginning).
    ///
    /// The returned cursor is empty only when the traversal is complete and
    /// the page holds no objects.
    pub async fn assemble(&mut self, cursor: &str, page_size: usize) -> Result<Page> {
        if page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }

        let plan = self.plan;
        let decoded = cursor::decode(cursor)?;
        let mut state = state::from_cursor(plan, &decoded)?;
        let mut objects = Vec::new();

        debug!(
            "Assembling page of up to {} '{}' objects from account {} branch {}",
            page_size, plan.entity.id, state.account_index, state.branch_index
        );

        self.prefetch_accounts(&state).await?;

        let result = loop {
            let Some(branch) = plan.branches.get(state.branch_index) else {
                break Err(Error::Other(format!(
                    "branch {} out of range",
                    state.branch_index
                )));
            };
            let account = plan.account(state.account_index);

            match self
                .walk_branch(branch, account, &mut state, &mut objects, page_size)
                .await
            {
                Ok(BranchOutcome::Filled) => break Ok(true),
                Ok(BranchOutcome::Drained) => {}
                Err(err) => break Err(err),
            }

            if let Some(next) = plan.branches.get(state.branch_index + 1) {
                state = TraversalState::fresh(state.account_index, state.branch_index + 1, next.depth());
            } else if state.account_index + 1 < plan.account_count() {
                let depth = plan.branches.first().map_or(0, Branch::depth);
                state = TraversalState::fresh(state.account_index + 1, 0, depth);
                debug!("Moving on to account {}", state.account_index);
                if let Err(err) = self.prefetch_accounts(&state).await {
                    break Err(err);
                }
            } else {
                break Ok(false);
            }
        };
        self.stats.upstream_calls = self.fetcher.calls();
        let filled = result?;

        // A page with objects always carries a cursor
        let next_cursor = if filled || !objects.is_empty() {
            cursor::encode(&state::to_cursor(plan, &state)?)?
        } else {
            String::new()
        };

        debug!(
            "Assembled {} objects with {} upstream calls",
            objects.len(),
            self.stats.upstream_calls
        );
        Ok(Page {
            objects,
            next_cursor,
        })
    }

    async fn walk_branch(
        &mut self,
        branch: &Branch,
        account: Option<&str>,
        state: &mut TraversalState,
        objects: &mut Vec<Object>,
        page_size: usize,
    ) -> Result<BranchOutcome> {
        let config = self.config;
        let resolver = self.resolver;
        let extractor = AttributeExtractor::new(self.plan.entity, resolver, &config.extraction);

        let innermost = branch.depth().saturating_sub(1);
        let mut batches: Vec<Option<UpstreamPage>> = vec![None; branch.depth()];
        let mut level = 0;

        loop {
            let frame = &branch.frames[level];
            let Some(batch) = batches[level].as_ref() else {
                let request = fetch_request(config, branch, level, account, state)?;
                let page = self.fetcher.fetch(frame, request).await?;
                batches[level] = Some(page);
                continue;
            };

            let offset = state.frames[level].offset;
            let Some(record) = batch.records.get(offset) else {
                if let Some(token) = batch.next.token() {
                    let position = &mut state.frames[level];
                    position.token = Some(token.to_string());
                    position.offset = 0;
                    batches[level] = None;
                    continue;
                }

                if level == 0 {
                    return Ok(BranchOutcome::Drained);
                }
                for batch in batches.iter_mut().skip(level) {
                    *batch = None;
                }
                level -= 1;
                state.advance(level);
                continue;
            };

            if level == innermost {
                let collection_id = level
                    .checked_sub(1)
                    .and_then(|outer| state.frames[outer].key.as_deref());
                let ctx = RecordContext {
                    account,
                    collection_id,
                };
                let result = extractor.extract(record, &ctx);
                state.frames[level].offset += 1;

                match result {
                    Ok(object) => {
                        objects.push(object);
                        self.stats.objects += 1;
                        if objects.len() >= page_size {
                            return Ok(BranchOutcome::Filled);
                        }
                    }
                    Err(err) if err.class() == ErrorClass::Record => {
                        warn!("Dropping record {} of {}: {}", offset, frame, err);
                        self.stats.dropped_records += 1;
                    }
                    Err(err) => return Err(err),
                }
                continue;
            }

            let key_path = frame.key_path.as_deref().unwrap_or_default();
            let key = resolver
                .resolve(record, key_path)?
                .first()
                .and_then(scalar_to_string);

            let Some(key) = key else {
                warn!(
                    "Skipping element {} of {} without key '{}'",
                    offset, frame, key_path
                );
                self.stats.skipped_elements += 1;
                state.advance(level);
                continue;
            };

            let changed = state.frames[level].key.as_deref().is_some_and(|k| k != key);
            if changed {
                warn!(
                    "Element {} of {} now has key '{}', restarting its inner frames",
                    offset, frame, key
                );
                state.reset_below(level);
            }
            state.frames[level].key = Some(key);
            level += 1;
        }
    }

    /// Warm the first batch of upcoming accounts
    async fn prefetch_accounts(&mut self, state: &TraversalState) -> Result<()> {
        let max_concurrency = self.config.max_concurrency;
        let plan = self.plan;
        if max_concurrency <= 1 || plan.account_count() <= 1 {
            return Ok(());
        }
        let Some(branch) = plan.branches.first() else {
            return Ok(());
        };

        // The current account only benefits when it starts from the top
        let at_start = state.branch_index == 0
            && state.frames.first().is_some_and(|f| f.token.is_none());
        let first = if at_start {
            state.account_index
        } else {
            state.account_index + 1
        };
        let last = (state.account_index + max_concurrency).min(plan.account_count());

        let fresh = TraversalState::fresh(0, 0, branch.depth());
        let requests = (first..last)
            .map(|index| fetch_request(self.config, branch, 0, plan.account(index), &fresh))
            .collect::<Result<Vec<_>>>()?;

        self.fetcher.prefetch(requests, max_concurrency).await;
        Ok(())
    }
}

/// Build the upstream request for `level` of a branch at the given position
fn fetch_request(
    config: &AssemblyConfig,
    branch: &Branch,
    level: usize,
    account: Option<&str>,
    state: &TraversalState,
) -> Result<FetchRequest> {
    let frame = &branch.frames[level];
    let (scope_id, collection_id) = match level {
        0 => (None, None),
        _ => (
            state.frames[0].key.as_deref(),
            state.frames[level - 1].key.as_deref(),
        ),
    };
    let ctx = TemplateContext::with_config(config.variables.clone())
        .account(account)
        .keys(scope_id, collection_id);

    let selector = template::render_path(&frame.selector, &ctx)?;
    let filter = frame
        .filter
        .as_deref()
        .map(|f| template::render(f, &ctx))
        .transpose()?;

    Ok(FetchRequest::new(&frame.entity_id, selector, config.upstream_page_size)
        .with_account(account.map(ToString::to_string))
        .with_filter(filter)
        .with_token(state.frames[level].token.clone()))
}
