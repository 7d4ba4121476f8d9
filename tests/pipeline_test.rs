//! Pipeline and extraction tests against a scripted in-memory session.

use async_trait::async_trait;
use newsreel::browser::{BrowserSession, ElementId, Timeouts};
use newsreel::config::{CookiePolicy, RunConfig};
use newsreel::dates;
use newsreel::error::{Error, Result};
use newsreel::extract::ArticleExtractor;
use newsreel::pipeline::{NavState, NavigationPipeline, Selectors};
use newsreel::sink::CsvSink;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct FakeItem {
    title: Option<String>,
    date: Option<String>,
    description: Option<String>,
    srcset: Option<String>,
}

/// A page that answers every lookup immediately from a script: selectors in
/// `absent` never resolve, the show-more control stays visible for a fixed
/// number of rounds, and result items come from `items`.
struct ScriptedSession {
    selectors: Selectors,
    absent: HashSet<String>,
    show_more_rounds: Mutex<u32>,
    clicks: Mutex<Vec<String>>,
    items: Vec<FakeItem>,
    downloads: Mutex<Vec<String>>,
}

impl ScriptedSession {
    fn new() -> Self {
        Self {
            selectors: Selectors::default(),
            absent: HashSet::new(),
            show_more_rounds: Mutex::new(0),
            clicks: Mutex::new(Vec::new()),
            items: Vec::new(),
            downloads: Mutex::new(Vec::new()),
        }
    }

    fn present(&self, selector: &str) -> bool {
        !self.absent.contains(selector)
    }

    fn clicked(&self, selector: &str) -> usize {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == selector)
            .count()
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, _url: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        if !self.present(selector) {
            return Ok(false);
        }
        if selector == self.selectors.show_more {
            let mut rounds = self.show_more_rounds.lock().unwrap();
            if *rounds == 0 {
                return Ok(false);
            }
            *rounds -= 1;
        }
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(true)
    }

    async fn fill(&self, selector: &str, _text: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.present(selector))
    }

    async fn select_value(&self, selector: &str, _value: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.present(selector))
    }

    async fn check(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        if !self.present(selector) {
            return Ok(false);
        }
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(true)
    }

    async fn wait_visible(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        if selector == self.selectors.show_more {
            return Ok(*self.show_more_rounds.lock().unwrap() > 0);
        }
        Ok(self.present(selector))
    }

    async fn text_of(&self, _selector: &str, _timeout: Duration) -> Result<Option<String>> {
        Ok(None)
    }

    async fn attr_of(
        &self,
        _selector: &str,
        _attr: &str,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn list(&self, selector: &str, _timeout: Duration) -> Result<Vec<ElementId>> {
        assert_eq!(selector, self.selectors.result_item);
        Ok((0..self.items.len() as u64).map(ElementId).collect())
    }

    async fn child_text(
        &self,
        id: ElementId,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        let item = &self.items[id.0 as usize];
        if selector == self.selectors.item_title {
            Ok(item.title.clone())
        } else if selector == self.selectors.item_description {
            Ok(item.description.clone())
        } else {
            Ok(None)
        }
    }

    async fn child_attr(
        &self,
        id: ElementId,
        selector: &str,
        attr: &str,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        let item = &self.items[id.0 as usize];
        if selector == self.selectors.item_date && attr == "aria-label" {
            Ok(item.date.clone())
        } else if selector == self.selectors.item_image && attr == "srcset" {
            Ok(item.srcset.clone())
        } else {
            Ok(None)
        }
    }

    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        self.downloads.lock().unwrap().push(url.to_string());
        Ok(dest_dir.join("downloaded.jpg"))
    }
}

fn config(cookie_policy: CookiePolicy) -> RunConfig {
    RunConfig {
        section: "Business".to_string(),
        search_phrase: "climate".to_string(),
        months: 1,
        entry_url: "https://news.example".to_string(),
        output_dir: PathBuf::from("out"),
        cookie_policy,
    }
}

fn pipeline(session: Arc<ScriptedSession>) -> NavigationPipeline {
    NavigationPipeline::new(session, Selectors::default(), Timeouts::default())
}

async fn run_pipeline(session: Arc<ScriptedSession>, policy: CookiePolicy) -> Result<NavState> {
    let mut p = pipeline(session);
    let window = dates::search_window(1, chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    p.run(&config(policy), &window).await?;
    Ok(p.state())
}

#[tokio::test]
async fn test_happy_path_reaches_ready() {
    let session = Arc::new(ScriptedSession::new());
    let state = run_pipeline(session.clone(), CookiePolicy::Tolerated)
        .await
        .unwrap();
    assert_eq!(state, NavState::Ready);
    // Strict section strategy was enough; the checkbox was never touched.
    let s = Selectors::default();
    assert_eq!(session.clicked(&s.section_option("Business")), 1);
    assert_eq!(session.clicked(&s.section_checkbox("Business")), 0);
}

#[tokio::test]
async fn test_section_fallback_uses_checkbox() {
    let mut scripted = ScriptedSession::new();
    let s = Selectors::default();
    scripted.absent.insert(s.section_option("Business"));
    let session = Arc::new(scripted);

    let state = run_pipeline(session.clone(), CookiePolicy::Tolerated)
        .await
        .unwrap();
    assert_eq!(state, NavState::Ready);
    assert_eq!(session.clicked(&s.section_checkbox("Business")), 1);
}

#[tokio::test]
async fn test_section_filter_fatal_when_both_strategies_fail() {
    let mut scripted = ScriptedSession::new();
    let s = Selectors::default();
    scripted.absent.insert(s.section_option("Business"));
    scripted.absent.insert(s.section_checkbox("Business"));
    let session = Arc::new(scripted);

    let err = run_pipeline(session, CookiePolicy::Tolerated)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Navigation { .. }));
}

#[tokio::test]
async fn test_pagination_clicks_exactly_until_control_disappears() {
    let scripted = ScriptedSession::new();
    *scripted.show_more_rounds.lock().unwrap() = 5;
    let session = Arc::new(scripted);

    let state = run_pipeline(session.clone(), CookiePolicy::Tolerated)
        .await
        .unwrap();
    assert_eq!(state, NavState::Ready);
    assert_eq!(session.clicked(&Selectors::default().show_more), 5);
}

#[tokio::test]
async fn test_missing_consent_banner_tolerated_by_default() {
    let mut scripted = ScriptedSession::new();
    scripted.absent.insert(Selectors::default().accept_cookies);
    let session = Arc::new(scripted);

    let state = run_pipeline(session, CookiePolicy::Tolerated).await.unwrap();
    assert_eq!(state, NavState::Ready);
}

#[tokio::test]
async fn test_missing_consent_banner_fatal_when_required() {
    let mut scripted = ScriptedSession::new();
    scripted.absent.insert(Selectors::default().accept_cookies);
    let session = Arc::new(scripted);

    let err = run_pipeline(session, CookiePolicy::Required)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Navigation { .. }));
}

#[tokio::test]
async fn test_extraction_writes_one_row_per_item() {
    let mut scripted = ScriptedSession::new();
    scripted.items = vec![
        FakeItem {
            title: Some("Senate climate bill passes with $5 billion earmark".into()),
            date: Some("March 14, 2024".into()),
            description: Some("The climate measure advances.".into()),
            srcset: Some("https://img.example/a/photo.jpg?w=100 100w, https://img.example/a/big.jpg 600w".into()),
        },
        FakeItem {
            title: Some("Quiet day in the markets".into()),
            date: Some("March 13, 2024".into()),
            description: None,
            srcset: None,
        },
    ];
    let session = Arc::new(scripted);

    let dir = tempfile::tempdir().unwrap();
    let sink = CsvSink::new(dir.path().join("news.csv"));
    let mut extractor = ArticleExtractor::new(
        session.clone(),
        Selectors::default(),
        Timeouts::default(),
        dir.path().join("images"),
    );

    let rows = extractor.run("climate", &sink).await.unwrap();
    extractor.finish().await;
    assert_eq!(rows, 2);

    let contents = std::fs::read_to_string(sink.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Title,Date,"));
    // First item: phrase in title and description, money in title, image kept.
    assert!(lines[1].contains("photo.jpg"));
    assert!(lines[1].ends_with("2,true"));
    // Second item: no description, no image, no money.
    assert!(lines[2].ends_with("0,false"));

    assert_eq!(
        session.downloads.lock().unwrap().clone(),
        vec!["https://img.example/a/photo.jpg?w=100".to_string()]
    );
}

#[tokio::test]
async fn test_missing_title_aborts_extraction() {
    let mut scripted = ScriptedSession::new();
    scripted.items = vec![FakeItem {
        title: None,
        date: Some("March 14, 2024".into()),
        ..FakeItem::default()
    }];
    let session = Arc::new(scripted);

    let dir = tempfile::tempdir().unwrap();
    let sink = CsvSink::new(dir.path().join("news.csv"));
    let mut extractor = ArticleExtractor::new(
        session,
        Selectors::default(),
        Timeouts::default(),
        dir.path().join("images"),
    );

    let err = extractor.run("climate", &sink).await.unwrap_err();
    assert!(matches!(err, Error::Extraction(_)));
    assert!(!sink.path().exists());
}
