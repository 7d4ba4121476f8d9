//! Run configuration.
//!
//! Settings come from CLI flags, optionally seeded by a JSON work item using
//! the upstream key names (`news_section`, `search_phrase`, `months`). Flags
//! win over the work item.

use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What to do about the consent banner. The site shows it inconsistently,
/// so absence is tolerated by default; `Required` reproduces the strict
/// behavior where a missing banner aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CookiePolicy {
    #[default]
    Tolerated,
    Required,
}

/// Immutable per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// News category the section filter must match.
    pub section: String,
    /// Phrase typed into the search box and counted per article.
    pub search_phrase: String,
    /// Calendar months the date filter covers, including the current one.
    pub months: u32,
    /// Site entry page.
    pub entry_url: String,
    /// Directory receiving the report and downloaded images.
    pub output_dir: PathBuf,
    pub cookie_policy: CookiePolicy,
}

/// JSON work item with the upstream field names. All fields optional;
/// anything absent falls back to the CLI flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkItem {
    pub news_section: Option<String>,
    pub search_phrase: Option<String>,
    pub months: Option<u32>,
}

impl WorkItem {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read work item {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("malformed work item {}: {e}", path.display())))
    }
}

impl RunConfig {
    /// Merge a work item (lowest precedence) with CLI-provided values.
    pub fn resolve(
        work_item: Option<WorkItem>,
        section: Option<String>,
        search_phrase: Option<String>,
        months: Option<u32>,
        entry_url: String,
        output_dir: PathBuf,
        cookie_policy: CookiePolicy,
    ) -> Result<Self> {
        let item = work_item.unwrap_or_default();
        let section = section
            .or(item.news_section)
            .ok_or_else(|| Error::Config("missing section (flag --section or work item)".into()))?;
        let search_phrase = search_phrase
            .or(item.search_phrase)
            .ok_or_else(|| Error::Config("missing search phrase (flag --phrase or work item)".into()))?;
        let months = months.or(item.months).unwrap_or(1);

        Ok(Self {
            section,
            search_phrase,
            months,
            entry_url,
            output_dir,
            cookie_policy,
        })
    }
}
