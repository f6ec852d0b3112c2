//! Headless render fallback for bot-protected pages
//!
//! The browser is abstracted behind [`Renderer`] so the crawler works without
//! one ([`NoopRenderer`]) and tests can substitute their own. The Chromium
//! implementation is compiled with the `browser` feature.

use crate::config::RenderConfig;
use crate::crawler::detector::looks_blocked;
use crate::crawler::fetcher::{FetchFailure, FetchMethod, PageFetchResult};
use async_trait::async_trait;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no browser available")]
    Unavailable,

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser error: {0}")]
    Browser(String),
}

/// Settings for one render
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Capture a full-page screenshot when the rendered page still looks blocked
    pub screenshot_on_block: bool,
}

impl RenderOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            screenshot_on_block: config.screenshot_dir.is_some(),
        }
    }
}

/// Output of a successful render
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL reported by the browser
    pub final_url: String,
    /// DOM serialized after the page settled
    pub html: String,
    /// PNG bytes, when requested and the page still looked blocked
    pub screenshot: Option<Vec<u8>>,
}

/// A browser engine able to render one URL in isolation
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError>;
}

/// Renderer used when no browser is configured
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn render(
        &self,
        _url: &str,
        _options: &RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        Err(RenderError::Unavailable)
    }
}

/// Retries a blocked page through the renderer
///
/// Returns `fetch_method = Rendered` when the rendered DOM is clean. A page
/// that is still blocked yields a `Blocked` failure, and its screenshot is
/// written to `screenshot_dir` when one is configured.
pub async fn render_fallback(
    renderer: &dyn Renderer,
    url: &Url,
    options: &RenderOptions,
    screenshot_dir: Option<&Path>,
) -> PageFetchResult {
    let page = match renderer.render(url.as_str(), options).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Render fallback failed for {}: {}", url, e);
            return PageFetchResult::failed(url, FetchFailure::Render(e.to_string()));
        }
    };

    if looks_blocked(&page.html) {
        tracing::warn!("Rendered page still looks blocked: {}", url);
        if let (Some(dir), Some(png)) = (screenshot_dir, page.screenshot.as_deref()) {
            match write_screenshot(dir, url, png).await {
                Ok(path) => tracing::info!("Saved block screenshot to {}", path.display()),
                Err(e) => tracing::warn!("Could not save block screenshot for {}: {}", url, e),
            }
        }

        let mut result = PageFetchResult::failed(url, FetchFailure::Blocked);
        result.final_url = page.final_url;
        return result;
    }

    PageFetchResult {
        url: url.to_string(),
        final_url: page.final_url,
        status_code: None,
        content_type: Some("text/html".to_string()),
        raw_html: Some(page.html),
        fetch_method: FetchMethod::Rendered,
        failure: None,
    }
}

/// Builds `block_<sanitised-url>_<unix-ts>.png`
pub fn screenshot_file_name(url: &Url, timestamp: i64) -> String {
    let safe: String = url
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(120)
        .collect();
    format!("block_{}_{}.png", safe, timestamp)
}

async fn write_screenshot(dir: &Path, url: &Url, png: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(screenshot_file_name(url, chrono::Utc::now().timestamp()));
    tokio::fs::write(&path, png).await?;
    Ok(path)
}

/// Random pointer positions inside the viewport, 100px away from its edges
pub fn pointer_path(width: u32, height: u32, steps: usize) -> Vec<(f64, f64)> {
    let max_x = (width as f64 - 100.0).max(101.0);
    let max_y = (height as f64 - 100.0).max(101.0);
    let mut rng = rand::thread_rng();
    (0..steps)
        .map(|_| (rng.gen_range(100.0..max_x), rng.gen_range(100.0..max_y)))
        .collect()
}

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "browser")]
mod chromium {
    use super::{pointer_path, RenderError, RenderOptions, RenderedPage, Renderer};
    use crate::crawler::detector::looks_blocked;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures::StreamExt;
    use std::time::Duration;

    const POINTER_STEPS: usize = 3;
    const POINTER_PAUSE: Duration = Duration::from_millis(50);

    /// Launches an isolated headless Chromium for every render
    #[derive(Debug, Default)]
    pub struct ChromiumRenderer;

    impl ChromiumRenderer {
        pub fn new() -> Self {
            Self
        }
    }

    fn browser_error(e: impl std::fmt::Display) -> RenderError {
        RenderError::Browser(e.to_string())
    }

    async fn drive(
        page: &Page,
        url: &str,
        options: &RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        match tokio::time::timeout(options.timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(browser_error(e)),
            Err(_) => return Err(RenderError::Timeout(options.timeout)),
        }
        let _ = tokio::time::timeout(options.timeout, page.wait_for_navigation()).await;

        // Brief pointer movement on the loaded page
        let path = pointer_path(options.viewport_width, options.viewport_height, POINTER_STEPS);
        for (x, y) in path {
            if let Err(e) = page.move_mouse(Point::new(x, y)).await {
                tracing::debug!("Pointer movement on {} failed: {}", url, e);
                break;
            }
            tokio::time::sleep(POINTER_PAUSE).await;
        }

        let html = page.content().await.map_err(browser_error)?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        let screenshot = if options.screenshot_on_block && looks_blocked(&html) {
            page.screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .ok()
        } else {
            None
        };

        Ok(RenderedPage {
            final_url,
            html,
            screenshot,
        })
    }

    #[async_trait]
    impl Renderer for ChromiumRenderer {
        async fn render(
            &self,
            url: &str,
            options: &RenderOptions,
        ) -> Result<RenderedPage, RenderError> {
            let config = BrowserConfig::builder()
                .window_size(options.viewport_width, options.viewport_height)
                .viewport(Viewport {
                    width: options.viewport_width,
                    height: options.viewport_height,
                    ..Viewport::default()
                })
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .build()
                .map_err(browser_error)?;

            let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let result = match browser.new_page("about:blank").await {
                Ok(page) => {
                    let rendered = drive(&page, url, options).await;
                    let _ = page.close().await;
                    rendered
                }
                Err(e) => Err(browser_error(e)),
            };

            let _ = browser.close().await;
            let _ = browser.wait().await;
            handle.abort();

            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticRenderer {
        html: String,
        screenshot: Option<Vec<u8>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for StaticRenderer {
        async fn render(
            &self,
            url: &str,
            _options: &RenderOptions,
        ) -> Result<RenderedPage, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RenderedPage {
                final_url: url.to_string(),
                html: self.html.clone(),
                screenshot: self.screenshot.clone(),
            })
        }
    }

    fn options() -> RenderOptions {
        RenderOptions::from_config(&RenderConfig::default())
    }

    fn url() -> Url {
        Url::parse("https://example.com/pricing?plan=pro").unwrap()
    }

    #[tokio::test]
    async fn test_noop_renderer_fails() {
        let result = render_fallback(&NoopRenderer, &url(), &options(), None).await;
        assert_eq!(result.fetch_method, FetchMethod::None);
        assert!(matches!(result.failure, Some(FetchFailure::Render(_))));
    }

    #[tokio::test]
    async fn test_clean_render_is_used() {
        let renderer = StaticRenderer {
            html: "<html><body><h1>Pricing</h1></body></html>".to_string(),
            screenshot: None,
            calls: AtomicUsize::new(0),
        };
        let result = render_fallback(&renderer, &url(), &options(), None).await;
        assert!(result.is_success());
        assert_eq!(result.fetch_method, FetchMethod::Rendered);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_still_blocked_writes_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = StaticRenderer {
            html: "<title>Attention Required</title>".to_string(),
            screenshot: Some(vec![0x89, b'P', b'N', b'G']),
            calls: AtomicUsize::new(0),
        };

        let result = render_fallback(&renderer, &url(), &options(), Some(dir.path())).await;
        assert_eq!(result.failure, Some(FetchFailure::Blocked));
        assert_eq!(result.fetch_method, FetchMethod::None);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let name = files[0].as_ref().unwrap().file_name().into_string().unwrap();
        assert!(name.starts_with("block_https___example_com_pricing_plan_pro_"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_screenshot_file_name() {
        assert_eq!(
            screenshot_file_name(&url(), 1700000000),
            "block_https___example_com_pricing_plan_pro_1700000000.png"
        );
    }

    #[test]
    fn test_options_from_config() {
        let mut config = RenderConfig::default();
        let opts = RenderOptions::from_config(&config);
        assert_eq!((opts.viewport_width, opts.viewport_height), (1280, 800));
        assert!(!opts.screenshot_on_block);

        config.screenshot_dir = Some("shots".to_string());
        assert!(RenderOptions::from_config(&config).screenshot_on_block);
    }

    #[test]
    fn test_pointer_path_stays_inside_viewport() {
        let path = pointer_path(1280, 800, 3);
        assert_eq!(path.len(), 3);
        for (x, y) in path {
            assert!((100.0..1180.0).contains(&x));
            assert!((100.0..700.0).contains(&y));
        }

        // Tiny viewports still yield a usable range
        assert!(pointer_path(50, 50, 2).iter().all(|&(x, y)| x >= 100.0 && y >= 100.0));
    }
}
