//! Integration tests for single-site crawls
//!
//! These tests run complete crawls against a scripted fetcher and check the
//! snapshot left in the repository.

use crate::common::{fast_config, RecordingRepository, ScriptedFetcher};
use site_mapper::storage::{SiteRepository, SqliteSiteRepository};
use site_mapper::{CrawlError, SiteCrawler, SiteStatus};
use std::sync::Arc;
use std::time::Duration;

const ROOT: &str = "http://example.com/";

fn crawler_with(
    fetcher: Arc<ScriptedFetcher>,
    repository: Arc<dyn SiteRepository>,
) -> SiteCrawler {
    SiteCrawler::new("example.com", repository, fetcher, &fast_config()).unwrap()
}

#[tokio::test]
async fn test_root_with_internal_and_external_links() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .html(
                ROOT,
                r#"<html><head><title>Example</title></head><body>
                <a href="/one">One</a>
                <a href="http://example.com/two">Two</a>
                <a href="http://other.org/">Elsewhere</a>
                </body></html>"#,
            )
            .html("http://example.com/one", "<title>One</title>")
            .html("http://example.com/two", "<title>Two</title>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher.clone(), repository.clone());

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.status, SiteStatus::Processed);
    assert_eq!(site.info.page_count, 3);
    assert_eq!(site.info.link_count, 2);
    assert_eq!(site.info.progress, 100);
    assert!(site.info.status_description.is_none());
    assert!(!fetcher.was_requested("http://other.org/"));

    let stored = repository
        .get_site("example.com", true, None)
        .unwrap()
        .unwrap();
    let pages = stored.contents.unwrap().pages;
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].url, ROOT);
    assert_eq!(pages[0].links_to, vec![1, 2]);
    assert_eq!(pages[1].title, "One");
}

#[tokio::test]
async fn test_root_timeout_is_connection_problem() {
    let fetcher = Arc::new(ScriptedFetcher::new().timeout(ROOT));
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher, repository.clone());

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.status, SiteStatus::ConnectionProblem);
    assert_eq!(site.info.page_count, 0);
    assert!(site.info.status_description.is_some());

    let stored = repository
        .get_site("example.com", true, None)
        .unwrap()
        .unwrap();
    assert_eq!(stored.info.status, SiteStatus::ConnectionProblem);
    assert!(stored.contents.unwrap().pages.is_empty());
}

#[tokio::test]
async fn test_robots_disallowing_root() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .robots("example.com", "User-agent: *\nDisallow: /\n")
            .html(ROOT, r#"<a href="/a">a</a>"#),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher.clone(), repository);

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.status, SiteStatus::RobotsTxtProblem);
    assert!(site.info.status_description.is_some());
    assert!(!fetcher.was_requested(ROOT));
}

#[tokio::test]
async fn test_robots_disallowing_a_section() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .robots("example.com", "User-agent: *\nDisallow: /private\n")
            .html(ROOT, r#"<a href="/private/x">x</a><a href="/public">p</a>"#)
            .html("http://example.com/public", "<p>ok</p>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher.clone(), repository);

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.status, SiteStatus::Processed);
    assert_eq!(site.info.page_count, 2);
    assert!(!fetcher.was_requested("http://example.com/private/x"));
}

#[tokio::test]
async fn test_robots_crawl_delay_is_capped() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .robots("example.com", "User-agent: *\nCrawl-delay: 86400\n")
            .html(ROOT, r#"<a href="/a">a</a><a href="/b">b</a>"#)
            .html("http://example.com/a", "<title>A</title>")
            .html("http://example.com/b", "<title>B</title>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let mut config = fast_config();
    config.crawler.max_crawl_delay = 20;
    let crawler = SiteCrawler::new("example.com", repository, fetcher, &config).unwrap();

    let site = tokio::time::timeout(Duration::from_secs(5), crawler.crawl())
        .await
        .expect("crawl should not sleep for the full Crawl-delay")
        .unwrap()
        .unwrap();

    assert_eq!(site.info.status, SiteStatus::Processed);
    assert_eq!(site.info.page_count, 3);
}

#[tokio::test]
async fn test_unrepresentable_crawl_delay_is_ignored() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .robots("example.com", "User-agent: *\nCrawl-delay: 1e30\n")
            .html(ROOT, "<title>Home</title>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher, repository);

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.status, SiteStatus::Processed);
    assert_eq!(site.info.page_count, 1);
}

#[tokio::test]
async fn test_www_duplicates_are_merged() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .html(
                ROOT,
                r#"<a href="http://example.com/x">plain</a><a href="http://www.example.com/x">www</a>"#,
            )
            .html("http://example.com/x", "<p>no title</p>")
            .html("http://www.example.com/x", "<title>Page X</title>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher.clone(), repository);

    let site = crawler.crawl().await.unwrap().unwrap();
    let pages = site.contents.unwrap().pages;

    assert!(fetcher.was_requested("http://www.example.com/x"));
    assert_eq!(pages.len(), 2);
    let x: Vec<_> = pages.iter().filter(|p| p.url.ends_with("/x")).collect();
    assert_eq!(x.len(), 1);
    assert_eq!(x[0].url, "http://example.com/x");
    assert_eq!(x[0].title, "Page X");
    assert_eq!(pages[0].links_to, vec![x[0].id]);
    assert_eq!(site.info.link_count, 1);
}

#[tokio::test]
async fn test_root_redirect_to_www_twin() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .redirect(ROOT, "http://www.example.com/")
            .html(
                "http://www.example.com/",
                r#"<title>Home</title><a href="/about">About</a>"#,
            )
            .html("http://www.example.com/about", "<title>About</title>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher, repository);

    let site = crawler.crawl().await.unwrap().unwrap();
    let pages = site.contents.unwrap().pages;

    assert_eq!(site.info.status, SiteStatus::Processed);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].url, ROOT);
    assert_eq!(pages[0].http_status, Some(301));
    assert_eq!(pages[1].url, "http://example.com/about");
    assert_eq!(pages[0].links_to, vec![pages[1].id]);
}

#[tokio::test]
async fn test_root_redirect_off_domain() {
    let fetcher = Arc::new(ScriptedFetcher::new().redirect(ROOT, "https://elsewhere.net/"));
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher.clone(), repository);

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.status, SiteStatus::ProcessedWithProblems);
    let description = site.info.status_description.unwrap();
    assert!(description.contains("redirected to another domain"));
    assert!(description.contains("https://elsewhere.net/"));
    assert!(!fetcher.was_requested("https://elsewhere.net/"));
}

#[tokio::test]
async fn test_binary_links_and_content_are_not_mapped() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .html(
                ROOT,
                r#"<a href="/report.PDF">pdf</a><a href="/download">dl</a><a href="/page">page</a>"#,
            )
            .binary("http://example.com/download", "application/zip")
            .html("http://example.com/page", "<p>page</p>"),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher.clone(), repository);

    let site = crawler.crawl().await.unwrap().unwrap();

    assert!(!fetcher.was_requested("http://example.com/report.PDF"));
    assert!(fetcher.was_requested("http://example.com/download"));
    assert_eq!(site.info.page_count, 2);
    let pages = site.contents.unwrap().pages;
    assert!(pages.iter().all(|p| !p.url.ends_with("/download")));
}

#[tokio::test]
async fn test_error_pages_are_kept_in_snapshot() {
    let fetcher = Arc::new(
        ScriptedFetcher::new().html(ROOT, r#"<a href="/missing">gone</a>"#),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = crawler_with(fetcher, repository);

    let site = crawler.crawl().await.unwrap().unwrap();
    let pages = site.contents.unwrap().pages;

    assert_eq!(site.info.status, SiteStatus::Processed);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].http_status, Some(404));
}

#[tokio::test]
async fn test_in_flight_requests_are_bounded() {
    let mut links = String::new();
    for i in 0..30 {
        links.push_str(&format!(r#"<a href="/p{}">p</a>"#, i));
    }
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_delay(Duration::from_millis(20))
            .html(ROOT, &links),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let mut config = fast_config();
    config.crawler.max_simultaneous_requests = 3;
    let crawler =
        SiteCrawler::new("example.com", repository, fetcher.clone(), &config).unwrap();

    let site = crawler.crawl().await.unwrap().unwrap();

    assert_eq!(site.info.page_count, 31);
    assert!(fetcher.peak_in_flight() <= 3);
    assert!(fetcher.peak_in_flight() >= 2);
}

#[tokio::test]
async fn test_checkpoints_are_saved_while_crawling() {
    let mut links = String::new();
    for i in 0..12 {
        links.push_str(&format!(r#"<a href="/p{}">p</a>"#, i));
    }
    let fetcher = Arc::new(ScriptedFetcher::new().html(ROOT, &links));
    let repository = Arc::new(RecordingRepository::new());
    let mut config = fast_config();
    config.crawler.checkpoint_interval = 3;
    config.crawler.max_simultaneous_requests = 2;
    let crawler =
        SiteCrawler::new("example.com", repository.clone(), fetcher, &config).unwrap();

    crawler.crawl().await.unwrap().unwrap();

    let saves = repository.saves();
    assert!(saves.len() >= 4);
    assert_eq!(saves[0].status, SiteStatus::Processing);
    assert_eq!(saves[0].progress, 0);
    for checkpoint in &saves[1..saves.len() - 1] {
        assert_eq!(checkpoint.status, SiteStatus::Processing);
        assert!(checkpoint.progress < 100);
    }
    assert_eq!(saves.last().unwrap().status, SiteStatus::Processed);

    let times: Vec<_> = saves.iter().map(|s| s.status_time).collect();
    let stored = repository
        .get_site("example.com", false, None)
        .unwrap()
        .unwrap();
    assert!(stored.info.status_time >= *times.last().unwrap());
}

#[tokio::test]
async fn test_final_save_failure_fails_crawl() {
    let fetcher = Arc::new(ScriptedFetcher::new().html(ROOT, "<p>home</p>"));
    let repository = Arc::new(RecordingRepository::new());
    repository.fail_saves(true);
    let crawler = crawler_with(fetcher, repository.clone());

    let result = crawler.crawl().await;

    assert!(matches!(result, Err(CrawlError::FinalSave { .. })));
    assert!(repository.saves().len() >= 2);
}

#[tokio::test]
async fn test_cancellation_deletes_site() {
    let mut links = String::new();
    for i in 0..10 {
        links.push_str(&format!(r#"<a href="/p{}">p</a>"#, i));
    }
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_delay(Duration::from_millis(100))
            .html(ROOT, &links),
    );
    let repository = Arc::new(SqliteSiteRepository::open_in_memory().unwrap());
    let crawler = Arc::new(crawler_with(fetcher, repository.clone()));

    let running = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.crawl().await })
    };

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(repository.get_site("example.com", false, None).unwrap().is_some());
    crawler.cancel_processing();

    let result = running.await.unwrap().unwrap();
    assert!(result.is_none());
    assert!(repository.get_site("example.com", false, None).unwrap().is_none());
}
