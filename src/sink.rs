//! Append-only tabular report.
//!
//! One row per extracted article, header written once when the file is
//! created. Every append reopens, writes, and flushes so a crash mid-run
//! loses at most the row in flight. Appends are deliberately not
//! idempotent — the site may legitimately show duplicate-looking results.

use crate::error::{Error, Result};
use crate::extract::ArticleRecord;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::error;

const HEADER: &str = "Title,Date,Description,Picture Filename,Search Phrase Count,Has Money";

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one record, creating the file (and header row) on first use.
    /// Any I/O failure here is fatal to the run.
    pub fn append(&self, record: &ArticleRecord) -> Result<()> {
        self.try_append(record).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to append row to report");
            Error::Persistence {
                path: self.path.clone(),
                source: e,
            }
        })
    }

    fn try_append(&self, record: &ArticleRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if file.metadata()?.len() == 0 {
            writeln!(file, "{HEADER}")?;
        }

        writeln!(
            file,
            "{},{},{},{},{},{}",
            csv_escape(&record.title),
            csv_escape(&record.date),
            csv_escape(&record.description),
            csv_escape(&record.picture_filename),
            record.phrase_count,
            record.has_money,
        )?;
        file.flush()
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
