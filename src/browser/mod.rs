//! Browser capability surface.
//!
//! Every operation carries an explicit timeout, and lookup-style operations
//! report present/absent in their `Ok` value instead of failing — the call
//! site decides whether absence means "fall back", "substitute empty", or
//! "abort". `Err` is reserved for transport-level trouble.

pub mod chromium;

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Opaque handle to an element returned by [`BrowserSession::list`],
/// usable as scope for child lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// The two timeout regimes (plus navigation and the pagination probe).
///
/// Short is for steps expected to fail tolerably: optional elements,
/// fallback probes, end-of-pagination detection. Standard is for steps
/// expected to succeed.
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub navigation: Duration,
    pub standard: Duration,
    pub short: Duration,
    pub pagination: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            standard: Duration::from_secs(10),
            short: Duration::from_secs(1),
            pagination: Duration::from_secs(4),
        }
    }
}

/// A live page in a browser session.
///
/// Interaction methods return `Ok(false)` when the target element does not
/// become available within the timeout; reads return `Ok(None)` likewise.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the page. Failure or timeout here is an error — there is no
    /// meaningful absent case for navigation.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Clear the field and type `text` into it.
    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<bool>;

    /// Select the option with `value` in a `<select>` control.
    async fn select_value(&self, selector: &str, value: &str, timeout: Duration) -> Result<bool>;

    /// Ensure a checkbox-style control is checked.
    async fn check(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Probe for a visible element without touching it.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn text_of(&self, selector: &str, timeout: Duration) -> Result<Option<String>>;

    async fn attr_of(&self, selector: &str, attr: &str, timeout: Duration)
        -> Result<Option<String>>;

    /// All elements currently matching `selector`, in document order.
    async fn list(&self, selector: &str, timeout: Duration) -> Result<Vec<ElementId>>;

    /// Text of the first descendant of `id` matching `selector`.
    async fn child_text(
        &self,
        id: ElementId,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<String>>;

    /// Attribute of the first descendant of `id` matching `selector`.
    async fn child_attr(
        &self,
        id: ElementId,
        selector: &str,
        attr: &str,
        timeout: Duration,
    ) -> Result<Option<String>>;

    /// Fetch a resource over HTTP into `dest_dir`, correcting the file
    /// extension to match the server-suggested filename. Returns the final
    /// path on disk.
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}
