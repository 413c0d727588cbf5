//! Integration tests for the HTTP fetcher using wiremock
//!
//! These tests check the fetch policy against a real local server: redirects
//! are reported rather than followed, HTTP statuses are never retried, and
//! transport failures are retried a fixed number of times.

use site_mapper::config::UserAgentConfig;
use site_mapper::crawler::{build_http_client, FetchError, Fetcher, HttpFetcher};
use site_mapper::robots::fetch_robots;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fetcher(attempts: u32) -> HttpFetcher {
    let client = build_http_client(&UserAgentConfig::default()).unwrap();
    HttpFetcher::with_client(client, attempts, Duration::from_millis(10))
}

/// Host and port of the mock server, usable as a robots.txt domain
fn authority(server: &MockServer) -> String {
    server.address().to_string()
}

#[tokio::test]
async fn test_fetch_html_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html><head><title>Home</title></head></html>"),
        )
        .mount(&mock_server)
        .await;

    let response = fetcher(3)
        .fetch(&format!("{}/", mock_server.uri()), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.is_html());
    assert_eq!(
        String::from_utf8(response.body).unwrap(),
        "<html><head><title>Home</title></head></html>"
    );
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = fetcher(3)
        .fetch(&format!("{}/old", mock_server.uri()), TIMEOUT)
        .await
        .unwrap();

    assert!(response.is_redirect());
    assert_eq!(response.location.as_deref(), Some("/new"));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1) // Should only be called once (no retry)
        .mount(&mock_server)
        .await;

    let response = fetcher(3)
        .fetch(&format!("{}/broken", mock_server.uri()), TIMEOUT)
        .await
        .unwrap();

    assert!(response.is_error());
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let result = fetcher(3)
        .fetch(
            &format!("{}/slow", mock_server.uri()),
            Duration::from_millis(100),
        )
        .await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_error() {
    let mock_server = MockServer::start().await;
    let url = format!("{}/", mock_server.uri());
    drop(mock_server);

    let result = fetcher(2).fetch(&url, TIMEOUT).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_binary_body_is_preserved() {
    let mock_server = MockServer::start().await;
    let bytes = vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff];

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(bytes.clone()),
        )
        .mount(&mock_server)
        .await;

    let response = fetcher(1)
        .fetch(&format!("{}/image", mock_server.uri()), TIMEOUT)
        .await
        .unwrap();

    assert!(!response.is_html());
    assert_eq!(response.body, bytes);
}

#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;
    let user_agent = UserAgentConfig::default().header_value();

    Mock::given(method("GET"))
        .and(header("user-agent", user_agent.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = fetcher(1)
        .fetch(&format!("{}/", mock_server.uri()), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response.status_code, 204);
}

#[tokio::test]
async fn test_fetch_robots_rules() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /private\nCrawl-delay: 2\n"),
        )
        .mount(&mock_server)
        .await;

    let domain = authority(&mock_server);
    let robots = fetch_robots(&fetcher(1), &domain, TIMEOUT)
        .await
        .unwrap()
        .unwrap();

    let base = mock_server.uri();
    assert!(robots.is_allowed(&format!("{}/public", base), "SiteMapperBot"));
    assert!(!robots.is_allowed(&format!("{}/private/x", base), "SiteMapperBot"));
    assert_eq!(
        robots.crawl_delay_duration("SiteMapperBot"),
        Some(Duration::from_secs(2))
    );
}

#[tokio::test]
async fn test_fetch_robots_follows_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/real-robots.txt"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/real-robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&mock_server)
        .await;

    let robots = fetch_robots(&fetcher(1), &authority(&mock_server), TIMEOUT)
        .await
        .unwrap()
        .unwrap();

    assert!(!robots.is_allowed(&format!("{}/", mock_server.uri()), "SiteMapperBot"));
}

#[tokio::test]
async fn test_missing_robots_is_permissive() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let robots = fetch_robots(&fetcher(1), &authority(&mock_server), TIMEOUT)
        .await
        .unwrap();

    assert!(robots.is_none());
}
