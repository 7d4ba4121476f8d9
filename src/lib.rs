// Copyright 2026 Newsreel Contributors
// SPDX-License-Identifier: Apache-2.0

//! Newsreel — headless-browser news search bot.
//!
//! Drives one Chromium session from a blank page to a filtered, sorted,
//! fully paginated search result list, then extracts per-article metadata
//! into an append-only tabular report, downloading each lead image along
//! the way.

pub mod browser;
pub mod classify;
pub mod config;
pub mod dates;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod sink;

pub use error::{Error, Result};
