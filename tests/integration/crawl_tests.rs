//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawl
//! sessions end-to-end.

use async_trait::async_trait;
use sitesignal::config::Config;
use sitesignal::crawler::{
    Coordinator, FetchMethod, NameSource, NoopRenderer, RenderError, RenderOptions, RenderedPage,
    Renderer,
};
use sitesignal::state::{AbortReason, SessionStatus};
use sitesignal::{CrawlError, CrawlRequest};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast, deterministic test configuration
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.requests_per_second = 50.0;
    config.crawler.max_jitter_ms = 0;
    config.crawler.max_retries = 0;
    config.crawler.request_timeout_ms = 2_000;
    config.user_agent.rotate = false;
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(&body))
        .mount(server)
        .await;
}

fn coordinator(config: Config) -> Coordinator {
    Coordinator::with_renderer(config, Arc::new(NoopRenderer)).expect("valid config")
}

/// Distinct page paths the server saw, robots.txt excluded
async fn requested_pages(server: &MockServer) -> HashSet<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p != "/robots.txt")
        .collect()
}

async fn request_count(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

/// Builds a one-page PDF whose only content is `text`
fn tiny_pdf(text: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        format!(
            r#"<html lang="en"><head>
            <title>Home | Acme Analytics</title>
            <meta name="description" content="Cloud analytics for retailers">
            <script type="application/ld+json">{{"@type": "Organization", "name": "Acme Analytics"}}</script>
            </head><body>
            <h1>Retail analytics made simple</h1>
            <p>Acme builds SaaS analytics and machine learning tools. Trusted by 200 customers.</p>
            <p>We partner with Globex Corporation. Our clients include Initech and Hooli.</p>
            <a href="/blog/news">News</a>
            <a href="{base}/about">About us</a>
            <a href="/files/brochure.pdf">Brochure</a>
            <a href="https://www.linkedin.com/company/acme">LinkedIn</a>
            <a href="https://partner.example.org/">Partner</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(
        &server,
        "/about",
        r#"<html><head><title>About - Acme Analytics</title></head><body>
        <h1>Our team</h1><p>Founded in 2010, we do fintech consulting.</p></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/blog/news",
        r#"<html><head><title>News</title></head><body><h2>Launch</h2><p>New product launch.</p></body></html>"#
            .to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/files/brochure.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(tiny_pdf("Brochure for retail partners"), "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config();
    let mut request = CrawlRequest::from_config(format!("{}/", base), &config);
    request.max_pages = 10;
    request.depth_limit = 2;

    let summary = coordinator(config)
        .crawl(&request)
        .await
        .expect("crawl should succeed");

    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(summary.pages_crawled, 3);
    assert!(summary.crawl_log.errors.is_empty());
    assert_eq!(summary.company_name, "Acme Analytics");
    assert_eq!(summary.company_name_source, NameSource::JsonLd);
    assert_eq!(summary.description.as_deref(), Some("Cloud analytics for retailers"));

    // Important links are visited before normal ones at the same depth
    let urls: Vec<&str> = summary.sample_pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base),
            format!("{}/about", base),
            format!("{}/blog/news", base)
        ]
    );
    assert_eq!(summary.sample_pages[1].depth, 1);

    assert!(summary.likely_niches.contains(&"saas".to_string()));
    assert!(summary.likely_niches.contains(&"fintech".to_string()));
    assert!(summary.client_indicators.contains(&"trusted by".to_string()));
    assert_eq!(summary.partner_names, vec!["Globex Corporation"]);
    assert_eq!(summary.client_names, vec!["Initech and Hooli"]);
    assert_eq!(summary.files.len(), 1);
    let brochure = &summary.files[0];
    assert_eq!(brochure.url, format!("{}/files/brochure.pdf", base));
    assert_eq!(brochure.content_type.as_deref(), Some("application/pdf"));
    assert!(brochure.error.is_none());
    assert!(brochure.text_snippet.contains("Brochure for retail partners"));
    assert!(summary
        .external_sites
        .contains(&"https://partner.example.org/".to_string()));
    assert!(summary.social.contains_key("linkedin"));
    assert_eq!(summary.sections.about, vec![format!("{}/about", base)]);
    assert_eq!(summary.sections.blog, vec![format!("{}/blog/news", base)]);
    // 0.5 + 0.3 * 3/10 + 0.1 + 0.1
    assert_eq!(summary.confidence, 0.79);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["crawl_log"]["pages_crawled"], 3);
    assert_eq!(json["sample_pages"][0]["fetch_method"], "http");
    assert_eq!(json["sample_pages"][0]["language"], "en");
}

#[tokio::test]
async fn test_robots_disallowed_seed_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><head><title>Home</title></head></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config();
    let request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    let summary = coordinator(config).crawl(&request).await.unwrap();

    assert_eq!(summary.pages_crawled, 0);
    assert_eq!(summary.status, SessionStatus::Aborted(AbortReason::RobotsDisallowed));
    assert_eq!(summary.crawl_log.errors.len(), 1);
    assert_eq!(summary.confidence, 0.0);
}

#[tokio::test]
async fn test_robots_disallowed_page_is_soft_failure() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body><a href="/private">P</a><a href="/public">Q</a></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("<html><head><title>Private</title></head></html>"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/public",
        "<html><head><title>Public</title></head><body>ok</body></html>".to_string(),
    )
    .await;

    let config = create_test_config();
    let summary = coordinator(config.clone())
        .crawl(&CrawlRequest::from_config(format!("{}/", base), &config))
        .await
        .unwrap();

    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.crawl_log.pages_attempted, 2);
    assert_eq!(summary.crawl_log.errors.len(), 1);
    assert_eq!(summary.crawl_log.errors[0].page, format!("{}/private", base));
    assert_eq!(summary.crawl_log.errors[0].error, "disallowed by robots.txt");
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body><a href="/a">A</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/a",
        r#"<html><head><title>A</title></head><body><a href="/a/b">B</a></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a/b"))
        .respond_with(html("<html><head><title>B</title></head></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config();
    let mut request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    request.depth_limit = 1;
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 2);
    assert!(summary.sample_pages.iter().all(|p| p.depth <= 1));
}

#[tokio::test]
async fn test_max_pages_one() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body><a href="/p1">1</a><a href="/p2">2</a></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/p1"))
        .respond_with(html("<html><head><title>P1</title></head></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config();
    let mut request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    request.max_pages = 1;
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 1);
    assert_eq!(summary.sample_pages[0].depth, 0);
    assert_eq!(summary.crawl_log.pages_attempted, 1);
}

#[tokio::test]
async fn test_seed_timeout_records_single_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html("<html><head><title>Slow</title></head></html>").set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.request_timeout_ms = 200;
    let mut request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 0);
    assert_eq!(summary.crawl_log.errors.len(), 1);
    assert_eq!(summary.crawl_log.errors[0].page, format!("{}/", server.uri()));
    assert_eq!(summary.crawl_log.errors[0].error, "request timed out");
    assert_eq!(summary.status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_blocked_page_without_render_continues() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body><a href="/wall">W</a><a href="/open">O</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/wall",
        "<html><head><title>Just a moment</title></head><body>Please verify you are human</body></html>"
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/open",
        "<html><head><title>Open</title></head><body>Regular content</body></html>".to_string(),
    )
    .await;

    let config = create_test_config();
    let mut request = CrawlRequest::from_config(format!("{}/", base), &config);
    request.obey_robots = false;
    request.render_fallback_enabled = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.crawl_log.errors.len(), 1);
    assert_eq!(summary.crawl_log.errors[0].page, format!("{}/wall", base));
    assert_eq!(summary.crawl_log.errors[0].error, "blocked by bot protection");
    assert!(summary
        .sample_pages
        .iter()
        .any(|p| p.url == format!("{}/open", base)));
}

struct StubRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(
        &self,
        url: &str,
        _options: &RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage {
            final_url: url.to_string(),
            html: "<html><head><title>Pricing – Acme</title></head><body><h1>Plans</h1></body></html>"
                .to_string(),
            screenshot: None,
        })
    }
}

#[tokio::test]
async fn test_blocked_page_uses_render_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(403).set_body_raw(
                b"<html><title>Attention Required! | Cloudflare</title></html>".to_vec(),
                "text/html",
            ),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.render.enabled = true;
    let renderer = Arc::new(StubRenderer {
        calls: AtomicUsize::new(0),
    });
    let coordinator = Coordinator::with_renderer(config.clone(), renderer.clone()).unwrap();

    let mut request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    request.obey_robots = false;

    let summary = coordinator.crawl(&request).await.unwrap();
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(summary.pages_crawled, 1);
    assert_eq!(summary.sample_pages[0].fetch_method, FetchMethod::Rendered);
    assert_eq!(summary.company_name, "Acme");
}

#[tokio::test]
async fn test_excluded_links_are_not_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body>
        <a href="/careers/about">Join us</a>
        <a href="/about">About</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/careers/about"))
        .respond_with(html("<html><head><title>Careers</title></head></html>"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/about",
        "<html><head><title>About</title></head><body>About us</body></html>".to_string(),
    )
    .await;

    let config = create_test_config();
    let mut request = CrawlRequest::from_config(format!("{}/", base), &config);
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 2);
    let seed = &summary.sample_pages[0];
    assert_eq!(seed.internal_links, vec![format!("{}/about", base)]);
}

#[tokio::test]
async fn test_invalid_start_url() {
    let config = create_test_config();
    let request = CrawlRequest::from_config("mailto:sales@example.com", &config);

    let result = coordinator(config).crawl(&request).await;
    assert!(matches!(result, Err(CrawlError::InvalidInput(_))));
}

#[tokio::test]
async fn test_transient_503_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        "<html><head><title>Back</title></head><body>Recovered</body></html>".to_string(),
    )
    .await;

    let mut config = create_test_config();
    config.crawler.max_retries = 2;
    config.crawler.backoff_base_ms = 10;
    config.crawler.backoff_max_ms = 20;
    let mut request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 1);
    assert!(summary.crawl_log.errors.is_empty());
    assert_eq!(summary.crawl_log.pages_attempted, 1);
    assert_eq!(request_count(&server, "/").await, 3);
}

#[tokio::test]
async fn test_exhausted_retries_record_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_retries = 2;
    config.crawler.backoff_base_ms = 10;
    config.crawler.backoff_max_ms = 20;
    let mut request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 0);
    assert_eq!(summary.crawl_log.errors.len(), 1);
    assert_eq!(summary.crawl_log.errors[0].error, "HTTP status 503");
    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(request_count(&server, "/").await, 3);
}

#[tokio::test]
async fn test_non_html_and_oversized_pages_are_soft_failures() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body>
        <a href="/api/status">Status</a>
        <a href="/huge">Huge</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"{}".to_vec(), "application/json"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/huge",
        format!("<html><body>{}</body></html>", "x".repeat(4_096)),
    )
    .await;

    let mut config = create_test_config();
    config.crawler.max_body_bytes = 2_048;
    let mut request = CrawlRequest::from_config(format!("{}/", base), &config);
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 1);

    let errors: Vec<(&str, &str)> = summary
        .crawl_log
        .errors
        .iter()
        .map(|e| (e.page.as_str(), e.error.as_str()))
        .collect();
    let status_url = format!("{}/api/status", base);
    let huge_url = format!("{}/huge", base);
    assert!(errors.contains(&(status_url.as_str(), "non-HTML content type: application/json")));
    assert!(errors.contains(&(huge_url.as_str(), "response body exceeds 2048 bytes")));

    // Every visited entry ends either parsed or soft-failed
    let visited = requested_pages(&server).await;
    assert_eq!(visited.len(), summary.pages_crawled + summary.crawl_log.errors.len());
    assert_eq!(summary.crawl_log.pages_attempted as usize, visited.len());
}

#[tokio::test]
async fn test_overflowing_crawl_delay_is_capped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1e20\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body><a href="/next">N</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/next",
        "<html><head><title>Next</title></head><body>ok</body></html>".to_string(),
    )
    .await;

    let mut config = create_test_config();
    config.crawler.max_crawl_delay_ms = 50;
    let request = CrawlRequest::from_config(format!("{}/", server.uri()), &config);

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(summary.pages_crawled, 2);
}

#[tokio::test]
async fn test_failed_file_download_is_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Root</title></head><body>
        <a href="/deck.pdf">Deck</a>
        <a href="/deck.pdf">Deck again</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    let config = create_test_config();
    let mut request = CrawlRequest::from_config(format!("{}/", base), &config);
    request.obey_robots = false;

    let summary = coordinator(config).crawl(&request).await.unwrap();
    assert_eq!(summary.pages_crawled, 1);
    assert!(summary.crawl_log.errors.is_empty());
    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].url, format!("{}/deck.pdf", base));
    assert_eq!(summary.files[0].error.as_deref(), Some("HTTP status 404"));
}
