//! Per-result-item extraction.
//!
//! Walks the result list in document order, reads each item's fields with
//! the short timeout regime, classifies the text, and appends one record at
//! a time. A missing title is treated as a structural page change and
//! aborts the run; a missing description or image is substituted empty.

use crate::browser::{BrowserSession, ElementId, Timeouts};
use crate::classify;
use crate::error::{Error, Result};
use crate::pipeline::Selectors;
use crate::sink::CsvSink;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// One fully-populated report row. Constructed fresh per result item and
/// handed straight to the sink; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub date: String,
    pub description: String,
    pub picture_filename: String,
    pub phrase_count: u32,
    pub has_money: bool,
}

/// Lead-image metadata. Both fields are empty when the item has no image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMeta {
    pub filename: String,
    pub source_url: String,
}

/// First URL token of a srcset attribute, with the filename derived from
/// its final path segment.
pub fn image_meta(srcset: Option<&str>) -> ImageMeta {
    let Some(first) = srcset.and_then(|s| s.split_whitespace().next()) else {
        return ImageMeta::default();
    };
    ImageMeta {
        filename: image_filename(first),
        source_url: first.to_string(),
    }
}

/// Last path segment of a URL, query stripped. Never empty for a non-empty
/// input.
pub fn image_filename(raw: &str) -> String {
    let derived = if let Ok(parsed) = url::Url::parse(raw) {
        parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .map(str::to_string)
            .unwrap_or_default()
    } else {
        // Relative or unparseable URL: plain string surgery.
        raw.rsplit('/')
            .next()
            .unwrap_or(raw)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string()
    };
    if derived.is_empty() {
        "image".to_string()
    } else {
        derived
    }
}

pub struct ArticleExtractor {
    browser: Arc<dyn BrowserSession>,
    selectors: Selectors,
    timeouts: Timeouts,
    image_dir: PathBuf,
    downloads: JoinSet<()>,
}

impl ArticleExtractor {
    pub fn new(
        browser: Arc<dyn BrowserSession>,
        selectors: Selectors,
        timeouts: Timeouts,
        image_dir: PathBuf,
    ) -> Self {
        Self {
            browser,
            selectors,
            timeouts,
            image_dir,
            downloads: JoinSet::new(),
        }
    }

    /// Extract every result item, appending one row per article. Returns the
    /// number of rows written. Image downloads are dispatched as they are
    /// discovered; call [`finish`](Self::finish) to wait for them.
    pub async fn run(&mut self, phrase: &str, sink: &CsvSink) -> Result<usize> {
        let items = self
            .browser
            .list(&self.selectors.result_item, self.timeouts.standard)
            .await?;
        info!(count = items.len(), "collecting article data");

        for (index, id) in items.iter().copied().enumerate() {
            let record = self.extract_item(index, id, phrase).await?;
            sink.append(&record)?;
        }
        Ok(items.len())
    }

    async fn extract_item(
        &mut self,
        index: usize,
        id: ElementId,
        phrase: &str,
    ) -> Result<ArticleRecord> {
        let s = self.selectors.clone();
        let short = self.timeouts.short;

        let date = self
            .browser
            .child_attr(id, &s.item_date, "aria-label", short)
            .await?
            .unwrap_or_default();

        let title = self
            .browser
            .child_text(id, &s.item_title, short)
            .await?
            .ok_or_else(|| Error::Extraction(format!("result item {index} has no title")))?;

        let description = match self.browser.child_text(id, &s.item_description, short).await? {
            Some(text) => text,
            None => {
                debug!(index, "no description in this result");
                String::new()
            }
        };

        let image = image_meta(
            self.browser
                .child_attr(id, &s.item_image, "srcset", short)
                .await?
                .as_deref(),
        );
        if !image.source_url.is_empty() {
            self.dispatch_download(image.source_url.clone());
        }

        Ok(ArticleRecord {
            phrase_count: classify::phrase_count(&title, &description, phrase),
            has_money: classify::mentions_money(&title, &description),
            picture_filename: image.filename,
            title,
            date,
            description,
        })
    }

    /// Fire off an image download without blocking the remaining fields.
    /// Failures are logged, not fatal — images are a side artifact.
    fn dispatch_download(&mut self, url: String) {
        let browser = Arc::clone(&self.browser);
        let dir = self.image_dir.clone();
        self.downloads.spawn(async move {
            match browser.download(&url, &dir).await {
                Ok(path) => debug!(url, path = %path.display(), "image downloaded"),
                Err(e) => warn!(url, error = %e, "image download failed"),
            }
        });
    }

    /// Wait for every dispatched download to complete or report failure.
    pub async fn finish(&mut self) {
        while let Some(joined) = self.downloads.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "image download task panicked");
            }
        }
    }
}
