// spider_chrome re-exports chromiumoxide API
use super::locator::Locator;
use crate::error::{HarnessError, Result};
use crate::page::{PageDriver, Session};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CHROME_HELP: &str = "\n\n\
    Chrome not found. You can:\n\
    - Install Chrome: https://www.google.com/chrome/\n\
    - Ubuntu/Debian: sudo apt install chromium-browser\n\
    - Fedora: sudo dnf install chromium\n\
    - macOS: brew install --cask google-chrome\n\
    - Or specify path: --chrome-path /path/to/chrome\n\
    - Linux sandbox issue? Run without --sandbox";

const IS_DISPLAYED_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.display !== 'none'
        && style.visibility !== 'hidden';
}"#;

const SCROLL_INTO_VIEW_FN: &str = "function() { this.scrollIntoView(true); }";

pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    temp_dir: Option<PathBuf>,
    action_timeout: Duration,
    handler: tokio::task::JoinHandle<()>,
    /// False when attached to a Chrome someone else started
    owns_browser: bool,
}

/// Connection mode for Chrome browser
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Launches a local Chrome (system install or explicit path)
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Connects to an existing Chrome on a remote debugging port
    DebugPort(u16),
}

impl ConnectionMode {
    /// Whether closing the session should shut the browser down
    pub fn owns_browser(&self) -> bool {
        matches!(self, ConnectionMode::Sandboxed { .. })
    }
}

/// Everything needed to open a session
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub mode: ConnectionMode,
    /// Pass `--disable-dev-shm-usage` (small /dev/shm in containers)
    pub disable_dev_shm_usage: bool,
    pub window_size: Option<(u32, u32)>,
    pub extra_args: Vec<String>,
    /// Upper bound for a single CDP request or page load
    pub action_timeout: Duration,
}

impl Default for LaunchOptions {
    /// Headless, no sandbox, no /dev/shm: the containerised CI setup
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Sandboxed {
                chrome_path: None,
                no_sandbox: true,
                headless: true,
            },
            disable_dev_shm_usage: true,
            window_size: None,
            extra_args: Vec::new(),
            action_timeout: Duration::from_secs(30),
        }
    }
}

impl ChromeDriver {
    /// Pick the page the session works on, excluding Chrome's new-tab-page
    async fn attach_page(browser: &Browser) -> Result<Page> {
        // Give the initial target a moment to show up in the page list
        for _ in 0..10 {
            let pages = browser.pages().await?;
            for page in pages.iter() {
                if let Ok(Some(url)) = page.url().await {
                    if !url.starts_with("chrome://") {
                        return Ok(page.clone());
                    }
                }
            }
            if let Some(page) = pages.last() {
                return Ok(page.clone());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::Other(format!("Failed to create page: {}", e)))
    }

    /// Create a new session with default options for the given mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        Self::launch(LaunchOptions {
            mode,
            ..LaunchOptions::default()
        })
        .await
    }

    /// Open a browser session
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let (browser, mut events, temp_dir) = match &options.mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory per session so parallel runs never share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                let temp_dir = std::env::temp_dir()
                    .join(format!("memory-game-harness-{}-{}", std::process::id(), unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    HarnessError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if *headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config
                    .user_data_dir(&temp_dir)
                    .request_timeout(options.action_timeout);

                if *no_sandbox {
                    config = config.arg("--no-sandbox");
                }
                if options.disable_dev_shm_usage {
                    config = config.arg("--disable-dev-shm-usage");
                }
                if let Some((width, height)) = options.window_size {
                    config = config.window_size(width, height);
                }
                for arg in &options.extra_args {
                    config = config.arg(arg.as_str());
                }
                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let config = config
                    .build()
                    .map_err(|e| HarnessError::LaunchFailed(format!("{}{}", e, CHROME_HELP)))?;

                log::debug!("Launching Chrome (headless: {})", headless);
                let (browser, handler) = Browser::launch(config)
                    .await
                    .map_err(|e| HarnessError::LaunchFailed(format!("{}{}", e, CHROME_HELP)))?;

                (browser, handler, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, handler) = Browser::connect(&url).await.map_err(|e| {
                    HarnessError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                (browser, handler, None)
            }
        };

        let handler = tokio::spawn(async move {
            while (events.next().await).is_some() {
                // Drain browser events
            }
        });

        let page = Self::attach_page(&browser).await?;

        Ok(Self {
            browser,
            page,
            temp_dir,
            action_timeout: options.action_timeout,
            handler,
            owns_browser: options.mode.owns_browser(),
        })
    }

    /// Navigate to a URL and wait for its load event
    pub async fn navigate(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};

        // Bare hosts get https://
        let normalized_url = if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("file://")
            && !url.starts_with("about:")
            && !url.starts_with("data:")
        {
            log::debug!("Normalizing URL: {} -> https://{}", url, url);
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        log::info!("Navigating to {}", normalized_url);

        // Subscribe before navigating so the load event cannot be missed
        let mut load_events = self.page.event_listener::<EventLoadEventFired>().await?;

        let params = NavigateParams::builder()
            .url(&normalized_url)
            .build()
            .map_err(|e| {
                HarnessError::NavigationFailed(format!("Invalid URL {}: {}", normalized_url, e))
            })?;

        let response = self.page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();

            // "oneshot canceled" means the browser connection is gone
            if error_str.contains("oneshot canceled") {
                HarnessError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                HarnessError::NavigationFailed(format!(
                    "Failed to navigate to {}: {}",
                    normalized_url, e
                ))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(HarnessError::NavigationFailed(format!(
                "{}: {}",
                normalized_url, error_text
            )));
        }

        match tokio::time::timeout(self.action_timeout, load_events.next()).await {
            Ok(Some(_)) => {
                log::debug!("Load event fired for {}", normalized_url);
                Ok(())
            }
            Ok(None) => {
                log::warn!("Load event stream closed before {} finished loading", normalized_url);
                Ok(())
            }
            Err(_) => Err(HarnessError::NavigationFailed(format!(
                "Timed out after {:?} waiting for {} to load. \n\
                 Possible causes:\n\
                 - Network connectivity issues\n\
                 - URL is unreachable\n\
                 - Firewall or proxy blocking the connection",
                self.action_timeout, normalized_url
            ))),
        }
    }

    /// Reload the current page
    pub async fn reload(&self) -> Result<()> {
        log::debug!("Reloading page");
        tokio::time::timeout(self.action_timeout, self.page.reload())
            .await
            .map_err(|_| HarnessError::Timeout(self.action_timeout))?
            .map_err(|e| HarnessError::NavigationFailed(format!("Reload failed: {}", e)))?;
        Ok(())
    }

    /// Get current URL
    pub async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| HarnessError::Other(e.to_string()))?
            .ok_or(HarnessError::NoPage)
    }

    /// Get page title
    pub async fn title(&self) -> Result<String> {
        self.page
            .get_title()
            .await
            .map_err(|e| HarnessError::Other(e.to_string()))?
            .ok_or(HarnessError::NoPage)
    }

    pub async fn find_element(&self, locator: &Locator) -> Result<Element> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            Locator::XPath(expression) => self.page.find_xpath(expression.as_str()).await,
        };
        found.map_err(|_| HarnessError::ElementNotFound(locator.to_string()))
    }

    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        match locator {
            Locator::Css(selector) => Ok(self.page.find_elements(selector.as_str()).await?),
            // DOM.performSearch reports "no results" as an error
            Locator::XPath(expression) => match self.page.find_xpaths(expression.as_str()).await {
                Ok(elements) => Ok(elements),
                Err(e) => {
                    log::debug!("XPath {} matched nothing: {}", expression, e);
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Execute arbitrary JavaScript in the page context
    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| HarnessError::Script(e.to_string()))?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Take a screenshot of the current page
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(chromiumoxide::page::ScreenshotParams::default())
            .await
            .map_err(|e| HarnessError::Other(format!("Failed to take screenshot: {}", e)))
    }

    /// Take a screenshot and save to file
    pub async fn screenshot_to_file(&self, path: &Path) -> Result<()> {
        let data = self.screenshot().await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// Get access to the page the session drives
    pub fn current_page(&self) -> &Page {
        &self.page
    }

    /// Whether the browser still answers CDP requests
    pub async fn is_alive(&self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(2), self.page.url()).await,
            Ok(Ok(_))
        )
    }

    /// Close the browser and wait for the process to exit.
    ///
    /// An attached browser is left running; only the event handler is stopped.
    pub async fn close(mut self) -> Result<()> {
        let closed = if self.owns_browser {
            self.shutdown_browser().await
        } else {
            log::debug!("Detaching from Chrome, leaving it running");
            Ok(())
        };

        self.handler.abort();
        closed
    }

    async fn shutdown_browser(&mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| HarnessError::Other(e.to_string()))?;
        if let Err(e) = self.browser.wait().await {
            log::debug!("Chrome process did not exit cleanly: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        ChromeDriver::navigate(self, url).await
    }

    async fn reload(&self) -> Result<()> {
        ChromeDriver::reload(self).await
    }

    async fn find_element(&self, locator: &Locator) -> Result<Element> {
        ChromeDriver::find_element(self, locator).await
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        ChromeDriver::find_elements(self, locator).await
    }

    async fn find_child(&self, parent: &Element, locator: &Locator) -> Result<Element> {
        match locator {
            Locator::Css(selector) => parent
                .find_element(selector.as_str())
                .await
                .map_err(|_| HarnessError::ElementNotFound(locator.to_string())),
            Locator::XPath(_) => Err(HarnessError::Other(format!(
                "XPath lookups below an element are not supported: {}",
                locator
            ))),
        }
    }

    async fn text(&self, element: &Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn inner_html(&self, element: &Element) -> Result<String> {
        Ok(element.inner_html().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<()> {
        element
            .call_js_fn(SCROLL_INTO_VIEW_FN, false)
            .await
            .map_err(|e| HarnessError::Script(format!("scrollIntoView failed: {}", e)))?;
        Ok(())
    }

    async fn is_displayed(&self, element: &Element) -> Result<bool> {
        let returns = element
            .call_js_fn(IS_DISPLAYED_FN, false)
            .await
            .map_err(|e| HarnessError::Script(format!("Visibility check failed: {}", e)))?;

        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        ChromeDriver::screenshot(self).await
    }
}

#[async_trait]
impl Session for ChromeDriver {
    async fn close(self) -> Result<()> {
        ChromeDriver::close(self).await
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        // Clean up temporary profile directory if it exists
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
