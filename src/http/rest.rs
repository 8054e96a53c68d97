//! Generic REST record source

use super::client::{HttpClient, HttpClientConfig};
use super::rate_limit::RateLimiterConfig;
use crate::config::RestSourceConfig;
use crate::error::Result;
use crate::extract::{JsonPathResolver, PathResolver};
use crate::pagination::{
    build_strategy, FetchRequest, PageResponse, PaginationStrategy, UpstreamPage,
    UpstreamPaginator,
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// [`UpstreamPaginator`] over a JSON REST API.
///
/// The selector is the collection path relative to the base URL. Vendor
/// pagination is folded into tokens by a [`PaginationStrategy`].
#[derive(Debug)]
pub struct RestPaginator {
    client: HttpClient,
    strategy: Box<dyn PaginationStrategy>,
    record_path: Option<String>,
    filter_param: Option<String>,
    account_param: Option<String>,
}

impl RestPaginator {
    /// Create a paginator from its parts
    pub fn new(client: HttpClient, strategy: Box<dyn PaginationStrategy>) -> Self {
        Self {
            client,
            strategy,
            record_path: None,
            filter_param: None,
            account_param: None,
        }
    }

    /// Build a paginator from a REST source definition
    pub fn from_config(config: &RestSourceConfig) -> Result<Self> {
        let mut builder = HttpClientConfig::builder()
            .base_url(&config.base_url)
            .timeout(Duration::from_millis(config.timeout_ms));
        for (key, value) in &config.headers {
            builder = builder.header(key, value);
        }
        if let Some(rate_limit) = &config.rate_limit {
            builder = builder.rate_limit(RateLimiterConfig::from(rate_limit));
        }

        let client = HttpClient::with_config(builder.build())?;
        Ok(Self {
            client,
            strategy: build_strategy(&config.pagination),
            record_path: config.record_path.clone(),
            filter_param: config.filter_param.clone(),
            account_param: config.account_param.clone(),
        })
    }

    /// Path of the record array in response bodies
    #[must_use]
    pub fn with_record_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    /// Send the filter in this query parameter
    #[must_use]
    pub fn with_filter_param(mut self, param: impl Into<String>) -> Self {
        self.filter_param = Some(param.into());
        self
    }

    /// Send the account in this query parameter
    #[must_use]
    pub fn with_account_param(mut self, param: impl Into<String>) -> Self {
        self.account_param = Some(param.into());
        self
    }

    fn records(&self, body: Value) -> Result<Vec<Value>> {
        match &self.record_path {
            Some(path) => JsonPathResolver.resolve(&body, path),
            None => Ok(match body {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            }),
        }
    }
}

#[async_trait]
impl UpstreamPaginator for RestPaginator {
    async fn next(&self, request: &FetchRequest) -> Result<UpstreamPage> {
        let token = request.token.as_deref();
        let params = self.strategy.params(token, request.page_size)?;

        // Follow-up URLs from the upstream already carry every parameter
        let (url, query) = match params.url {
            Some(url) => (url, params.query_params),
            None => {
                let mut query = params.query_params;
                if let (Some(param), Some(filter)) = (&self.filter_param, &request.filter) {
                    query.push((param.clone(), filter.clone()));
                }
                if let (Some(param), Some(account)) = (&self.account_param, &request.account) {
                    query.push((param.clone(), account.clone()));
                }
                (request.selector.clone(), query)
            }
        };

        let response = self.client.get_json(&url, &query).await?;
        let records = self.records(response.body.clone())?;
        let next = self.strategy.next_token(
            token,
            request.page_size,
            &PageResponse {
                body: &response.body,
                headers: &response.headers,
                records_count: records.len(),
            },
        )?;

        debug!("Fetched {} records of {}", records.len(), request);
        Ok(UpstreamPage { records, next })
    }
}
