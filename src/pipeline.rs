//! Navigation state machine.
//!
//! Drives the session from a blank page to a filtered, sorted, fully
//! paginated result list. Each state is a precondition for the next; any
//! step failing outside a documented fallback path aborts the run.

use crate::browser::{BrowserSession, Timeouts};
use crate::config::{CookiePolicy, RunConfig};
use crate::dates::DateRange;
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Start,
    SearchSubmitted,
    SectionFiltered,
    CookiesDismissed,
    DateFilterOpened,
    DateRangeEntered,
    Sorted,
    FullyPaginated,
    Ready,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Site locators. Defaults target the news site's search UI; result-item
/// sub-selectors are scoped to one result element.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub accept_cookies: String,
    pub search_button: String,
    pub search_input: String,
    pub search_submit: String,
    pub section_menu: String,
    pub date_range_menu: String,
    pub specific_dates: String,
    pub start_date: String,
    pub end_date: String,
    pub date_confirm: String,
    pub sort_select: String,
    pub show_more: String,
    pub result_item: String,
    pub item_date: String,
    pub item_title: String,
    pub item_description: String,
    pub item_image: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            accept_cookies: r#"button[data-testid="GDPR-accept"]"#.into(),
            search_button: r#"button[data-test-id="search-button"]"#.into(),
            search_input: r#"input[data-testid="search-input"]"#.into(),
            search_submit: r#"button[data-test-id="search-submit"]"#.into(),
            section_menu: r#"button[data-testid="search-multiselect-button"]"#.into(),
            date_range_menu: r#"button[data-testid^="search-date"]"#.into(),
            specific_dates: r#"button[value="Specific Dates"]"#.into(),
            start_date: r#"input[aria-label="start date"]"#.into(),
            end_date: r#"input[aria-label="end date"]"#.into(),
            date_confirm: "#searchTextField".into(),
            sort_select: r#"select[data-testid$="sortBy"]"#.into(),
            show_more: r#"button[data-testid*="show-more"]"#.into(),
            result_item: "div.css-1kl114x".into(),
            item_date: "span.css-17ubb9w".into(),
            item_title: "h4".into(),
            item_description: "p.css-16nhkrn".into(),
            item_image: "img".into(),
        }
    }
}

impl Selectors {
    /// Strict strategy: the option whose accessible label equals the section.
    pub fn section_option(&self, section: &str) -> String {
        format!(r#"button[aria-label="{section}"]"#)
    }

    /// Loose fallback: a checkbox whose value is prefixed by the section.
    pub fn section_checkbox(&self, section: &str) -> String {
        format!(r#"input[value^="{section}"]"#)
    }
}

pub struct NavigationPipeline {
    browser: Arc<dyn BrowserSession>,
    selectors: Selectors,
    timeouts: Timeouts,
    state: NavState,
}

impl NavigationPipeline {
    pub fn new(browser: Arc<dyn BrowserSession>, selectors: Selectors, timeouts: Timeouts) -> Self {
        Self {
            browser,
            selectors,
            timeouts,
            state: NavState::Start,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Run the full sequence. On success the result list is filtered,
    /// sorted newest-first, and fully revealed.
    pub async fn run(&mut self, config: &RunConfig, window: &DateRange) -> Result<()> {
        self.submit_search(config).await?;
        self.filter_section(&config.section).await?;
        self.dismiss_cookies(config.cookie_policy).await?;
        self.enter_date_range(window).await?;
        self.sort_newest().await?;
        self.paginate().await?;
        self.advance(NavState::Ready);
        Ok(())
    }

    fn advance(&mut self, next: NavState) {
        debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    fn fatal(&self, detail: impl Into<String>) -> Error {
        Error::Navigation {
            step: self.state.to_string(),
            detail: detail.into(),
        }
    }

    fn require(&self, found: bool, detail: &str) -> Result<()> {
        if found {
            Ok(())
        } else {
            Err(self.fatal(detail))
        }
    }

    async fn submit_search(&mut self, config: &RunConfig) -> Result<()> {
        let s = &self.selectors;
        let t = &self.timeouts;

        info!(url = %config.entry_url, "opening site");
        self.browser.goto(&config.entry_url, t.navigation).await?;

        self.require(
            self.browser.click(&s.search_button, t.standard).await?,
            "search affordance not found",
        )?;
        self.require(
            self.browser.wait_visible(&s.search_input, t.standard).await?,
            "search input never became visible",
        )?;
        info!(phrase = %config.search_phrase, "submitting search");
        self.require(
            self.browser
                .fill(&s.search_input, &config.search_phrase, t.standard)
                .await?,
            "search input not fillable",
        )?;
        self.require(
            self.browser.click(&s.search_submit, t.standard).await?,
            "search submit button not found",
        )?;
        self.advance(NavState::SearchSubmitted);
        Ok(())
    }

    /// Two-strategy section filter: exact accessible-label match with the
    /// short timeout, then the value-prefixed checkbox with the standard one.
    async fn filter_section(&mut self, section: &str) -> Result<()> {
        let s = self.selectors.clone();
        let t = &self.timeouts;

        self.require(
            self.browser.click(&s.section_menu, t.standard).await?,
            "section filter control not found",
        )?;

        let strict = self
            .browser
            .click(&s.section_option(section), t.short)
            .await?;
        if !strict {
            debug!(section, "exact section option absent, trying checkbox fallback");
            let loose = self
                .browser
                .check(&s.section_checkbox(section), t.standard)
                .await?;
            self.require(loose, &format!("no section filter matched {section:?}"))?;
        }
        self.advance(NavState::SectionFiltered);
        Ok(())
    }

    async fn dismiss_cookies(&mut self, policy: CookiePolicy) -> Result<()> {
        let s = &self.selectors;
        let t = &self.timeouts;

        match policy {
            CookiePolicy::Required => {
                self.require(
                    self.browser.click(&s.accept_cookies, t.standard).await?,
                    "consent banner expected but not found",
                )?;
            }
            CookiePolicy::Tolerated => {
                if self.browser.click(&s.accept_cookies, t.short).await? {
                    debug!("consent banner dismissed");
                } else {
                    debug!("no consent banner shown");
                }
            }
        }
        self.advance(NavState::CookiesDismissed);
        Ok(())
    }

    async fn enter_date_range(&mut self, window: &DateRange) -> Result<()> {
        let s = self.selectors.clone();
        let t = self.timeouts.clone();

        self.require(
            self.browser.click(&s.date_range_menu, t.standard).await?,
            "date range control not found",
        )?;
        self.require(
            self.browser.click(&s.specific_dates, t.standard).await?,
            "specific-dates option not found",
        )?;
        self.advance(NavState::DateFilterOpened);

        info!(start = %window.start_mdy(), end = %window.end_mdy(), "entering date window");
        self.require(
            self.browser
                .fill(&s.start_date, &window.start_mdy(), t.standard)
                .await?,
            "start date field not fillable",
        )?;
        self.require(
            self.browser
                .fill(&s.end_date, &window.end_mdy(), t.standard)
                .await?,
            "end date field not fillable",
        )?;
        // Clicking outside the picker confirms the range.
        self.require(
            self.browser.click(&s.date_confirm, t.standard).await?,
            "could not confirm date range",
        )?;
        self.advance(NavState::DateRangeEntered);
        Ok(())
    }

    async fn sort_newest(&mut self) -> Result<()> {
        let s = &self.selectors;
        let t = &self.timeouts;

        self.require(
            self.browser
                .select_value(&s.sort_select, "newest", t.standard)
                .await?,
            "sort control not found",
        )?;
        self.advance(NavState::Sorted);
        Ok(())
    }

    /// Click "show more" until the probe stops finding it. Probe absence is
    /// the only termination condition; there is no iteration cap.
    async fn paginate(&mut self) -> Result<()> {
        let s = &self.selectors;
        let t = &self.timeouts;
        let mut clicks = 0u32;

        loop {
            if !self.browser.wait_visible(&s.show_more, t.pagination).await? {
                break;
            }
            // The control can vanish between probe and click; that also
            // means pagination is done.
            if !self.browser.click(&s.show_more, t.pagination).await? {
                break;
            }
            clicks += 1;
        }

        info!(clicks, "pagination exhausted");
        self.advance(NavState::FullyPaginated);
        Ok(())
    }
}
