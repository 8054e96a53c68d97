//! Tests for the HTTP module

use super::*;
use crate::config::RestSourceConfig;
use crate::pagination::{FetchRequest, NextToken, UpstreamPaginator};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rest_config(server: &MockServer, yaml: &str) -> RestSourceConfig {
    let mut config: RestSourceConfig = serde_yaml::from_str(yaml).unwrap();
    config.base_url = server.uri();
    config
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
    assert!(config.rate_limit.is_none());
}

#[tokio::test]
async fn test_http_client_get_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("limit", "2"))
        .and(header("X-Api-Key", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"users": [{"id": 1}]}))
                .insert_header("x-total", "1"),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(mock_server.uri())
            .header("X-Api-Key", "secret")
            .build(),
    )
    .unwrap();

    let response = client
        .get_json("/api/users", &[("limit".to_string(), "2".to_string())])
        .await
        .unwrap();
    assert_eq!(response.body, json!({"users": [{"id": 1}]}));
    assert_eq!(response.headers.get("x-total").unwrap(), "1");
}

#[tokio::test]
async fn test_http_client_status_classification() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("no access"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(mock_server.uri())
            .build(),
    )
    .unwrap();

    let err = client.get_json("/throttled", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        crate::Error::RateLimited {
            retry_after_seconds: 7
        }
    ));
    assert!(err.is_retryable());

    let err = client.get_json("/down", &[]).await.unwrap_err();
    assert!(err.is_retryable());

    let err = client.get_json("/forbidden", &[]).await.unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("403"));

    // One attempt each, no retries
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_http_client_invalid_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(mock_server.uri())
            .build(),
    )
    .unwrap();

    let err = client.get_json("/broken", &[]).await.unwrap_err();
    assert!(matches!(err, crate::Error::Decode { .. }));
}

#[tokio::test]
async fn test_http_client_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(mock_server.uri())
            .timeout(Duration::from_millis(50))
            .build(),
    )
    .unwrap();

    let err = client.get_json("/slow", &[]).await.unwrap_err();
    assert!(matches!(err, crate::Error::Timeout { .. }));
    assert!(err.is_retryable());
}

// ============================================================================
// RestPaginator Tests
// ============================================================================

#[tokio::test]
async fn test_rest_cursor_pagination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "u3"}],
            "next": null
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "u1"}, {"id": "u2"}],
            "next": "c2"
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    let config = rest_config(
        &mock_server,
        r"
base_url: placeholder
record_path: data
pagination:
  type: cursor
  cursor_param: cursor
  cursor_path: next
  limit_param: limit
",
    );
    let paginator = RestPaginator::from_config(&config).unwrap();

    let request = FetchRequest::new("users", "users", 2);
    let first = paginator.next(&request).await.unwrap();
    assert_eq!(first.records, vec![json!({"id": "u1"}), json!({"id": "u2"})]);
    assert_eq!(first.next, NextToken::Continue("c2".to_string()));

    let second = paginator
        .next(&request.with_token(Some("c2".to_string())))
        .await
        .unwrap();
    assert_eq!(second.records, vec![json!({"id": "u3"})]);
    assert!(second.next.is_done());
}

#[tokio::test]
async fn test_rest_offset_with_filter_and_account() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "10"))
        .and(query_param("q", "type=admin"))
        .and(query_param("tenant", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "g1"}])))
        .mount(&mock_server)
        .await;

    let config = rest_config(
        &mock_server,
        r"
base_url: placeholder
filter_param: q
account_param: tenant
pagination:
  type: offset
",
    );
    let paginator = RestPaginator::from_config(&config).unwrap();

    let request = FetchRequest::new("groups", "groups", 10)
        .with_filter(Some("type=admin".to_string()))
        .with_account(Some("t1".to_string()));
    let page = paginator.next(&request).await.unwrap();
    assert_eq!(page.records, vec![json!({"id": "g1"})]);
    assert!(page.next.is_done());
}

#[tokio::test]
async fn test_rest_link_header_pagination() {
    let mock_server = MockServer::start().await;
    let next_url = format!("{}/members?page=2", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "m2"}])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "m1"}]))
                .insert_header("link", format!("<{next_url}>; rel=\"next\"").as_str()),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    let config = rest_config(
        &mock_server,
        r"
base_url: placeholder
pagination:
  type: link_header
",
    );
    let paginator = RestPaginator::from_config(&config).unwrap();

    let request = FetchRequest::new("members", "members", 10);
    let first = paginator.next(&request).await.unwrap();
    assert_eq!(first.next, NextToken::Continue(next_url.clone()));

    let second = paginator
        .next(&request.with_token(Some(next_url)))
        .await
        .unwrap();
    assert_eq!(second.records, vec![json!({"id": "m2"})]);
    assert!(second.next.is_done());
}

#[tokio::test]
async fn test_rest_bad_token_is_fatal() {
    let mock_server = MockServer::start().await;
    let config = rest_config(
        &mock_server,
        r"
base_url: placeholder
pagination:
  type: offset
",
    );
    let paginator = RestPaginator::from_config(&config).unwrap();

    let err = paginator
        .next(&FetchRequest::new("users", "users", 10).with_token(Some("x".to_string())))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}
