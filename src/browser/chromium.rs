//! Chromium-backed session using chromiumoxide.
//!
//! Bounded waits are poll loops against a deadline: a lookup that has not
//! resolved when the deadline passes reports absent, it does not error.

use super::{BrowserSession, ElementId};
use crate::error::{Error, Result};
use crate::extract::image_filename;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Interval between lookup attempts inside a bounded wait.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. NEWSREEL_BROWSER env
    if let Ok(p) = std::env::var("NEWSREEL_BROWSER") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// One headless Chromium instance driving a single page.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handles: Mutex<HashMap<u64, Element>>,
    next_id: AtomicU64,
    http: reqwest::Client,
}

impl ChromiumSession {
    /// Launch headless Chromium and open a blank page.
    pub async fn launch() -> Result<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            Error::Browser(
                "Chromium not found. Install it or set NEWSREEL_BROWSER to the binary path."
                    .to_string(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| Error::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Browser(format!("failed to launch Chromium: {e}")))?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser.new_page("about:blank").await?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Browser(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            http,
        })
    }

    /// Close the page and shut the browser down.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.page.clone().close().await;
        let mut browser = self.browser.lock().await;
        let _ = browser.close().await;
        let _ = browser.wait().await;
        Ok(())
    }

    /// Poll for an element until found or the deadline passes.
    async fn probe(&self, selector: &str, timeout: Duration) -> Option<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(el) = self.page.find_element(selector).await {
                return Some(el);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll a boolean-returning script until it yields true or the deadline
    /// passes.
    async fn probe_js(&self, script: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let result = self.page.evaluate(script).await?;
            if result.into_value::<bool>().unwrap_or(false) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Quote a string as a JS string literal.
    fn js_str(s: &str) -> String {
        serde_json::to_string(s).expect("strings always serialize")
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Browser(format!("navigation to {url} failed: {e}"))),
            Err(_) => Err(Error::Browser(format!(
                "navigation to {url} timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<bool> {
        match self.probe(selector, timeout).await {
            Some(el) => {
                el.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<bool> {
        match self.probe(selector, timeout).await {
            Some(el) => {
                // Clear any existing value before typing.
                let script = format!(
                    "(() => {{ const el = document.querySelector({sel}); if (el) el.value = ''; }})()",
                    sel = Self::js_str(selector)
                );
                self.page.evaluate(script).await?;
                el.click().await?.type_str(text).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn select_value(&self, selector: &str, value: &str, timeout: Duration) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.value = {val}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            sel = Self::js_str(selector),
            val = Self::js_str(value),
        );
        self.probe_js(&script, timeout).await
    }

    async fn check(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             if (!el.checked) el.click(); return true; }})()",
            sel = Self::js_str(selector),
        );
        self.probe_js(&script, timeout).await
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }})()",
            sel = Self::js_str(selector),
        );
        self.probe_js(&script, timeout).await
    }

    async fn text_of(&self, selector: &str, timeout: Duration) -> Result<Option<String>> {
        match self.probe(selector, timeout).await {
            Some(el) => Ok(el.inner_text().await?),
            None => Ok(None),
        }
    }

    async fn attr_of(
        &self,
        selector: &str,
        attr: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        match self.probe(selector, timeout).await {
            Some(el) => Ok(el.attribute(attr).await?),
            None => Ok(None),
        }
    }

    async fn list(&self, selector: &str, timeout: Duration) -> Result<Vec<ElementId>> {
        let deadline = Instant::now() + timeout;
        let elements = loop {
            let found = self.page.find_elements(selector).await.unwrap_or_default();
            if !found.is_empty() {
                break found;
            }
            if Instant::now() >= deadline {
                debug!(selector, "no elements matched before deadline");
                break Vec::new();
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        let mut handles = self.handles.lock().await;
        let mut ids = Vec::with_capacity(elements.len());
        for el in elements {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            handles.insert(id, el);
            ids.push(ElementId(id));
        }
        Ok(ids)
    }

    async fn child_text(
        &self,
        id: ElementId,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let handles = self.handles.lock().await;
        let parent = handles
            .get(&id.0)
            .ok_or_else(|| Error::Browser(format!("stale element handle {}", id.0)))?;

        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(el) = parent.find_element(selector).await {
                return Ok(el.inner_text().await?);
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn child_attr(
        &self,
        id: ElementId,
        selector: &str,
        attr: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let handles = self.handles.lock().await;
        let parent = handles
            .get(&id.0)
            .ok_or_else(|| Error::Browser(format!("stale element handle {}", id.0)))?;

        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(el) = parent.find_element(selector).await {
                return Ok(el.attribute(attr).await?);
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let err = |detail: String| Error::Download {
            url: url.to_string(),
            detail,
        };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(err(format!("HTTP {}", resp.status())));
        }

        let suggested = suggested_filename(resp.headers());
        let bytes = resp.bytes().await.map_err(|e| err(e.to_string()))?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| err(e.to_string()))?;

        let saved = dest_dir.join(image_filename(url));
        tokio::fs::write(&saved, &bytes)
            .await
            .map_err(|e| err(e.to_string()))?;

        // Rename the extension to match the server-suggested filename; some
        // image URLs carry no usable suffix.
        if let Some(ext) = suggested.as_deref().and_then(|name| {
            Path::new(name)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
        }) {
            if saved.extension().map(|e| e.to_string_lossy().into_owned()) != Some(ext.clone()) {
                let mut corrected = saved.clone();
                corrected.set_extension(&ext);
                tokio::fs::rename(&saved, &corrected)
                    .await
                    .map_err(|e| err(e.to_string()))?;
                return Ok(corrected);
            }
        }

        Ok(saved)
    }
}

/// Filename suggested by the Content-Disposition header, if any.
fn suggested_filename(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let disposition = headers
        .get(reqwest::header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    let start = disposition.find("filename=")? + "filename=".len();
    let name = disposition[start..]
        .trim_start_matches('"')
        .split(['"', ';'])
        .next()?
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
