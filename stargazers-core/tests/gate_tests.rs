// Tests for the readiness gate

mod support;

use stargazers_core::gate::{GateOutcome, GateState, ReadinessGate};
use stargazers_core::page::{FilePage, PageSource, StaticPage};
use stargazers_scanner::PageLayout;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use support::{loading_page, package_row, results_page};
use tempfile::NamedTempFile;
use tokio::time::Instant;

/// Plays back snapshots in order, repeating the last one forever
struct ScriptedPage {
    snapshots: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedPage {
    fn new(snapshots: Vec<Result<String, String>>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageSource for ScriptedPage {
    async fn snapshot(&self) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.len() > 1 {
            snapshots.pop_front().unwrap()
        } else {
            snapshots.front().cloned().unwrap()
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn ready_page() -> String {
    results_page(&[package_row("widget", "https://github.com/acme/widget")])
}

fn gate() -> ReadinessGate {
    ReadinessGate::new(&PageLayout::nixos_search()).unwrap()
}

// ============================================================================
// Polling behaviour
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ready_page_runs_immediately() {
    let page = ScriptedPage::new(vec![Ok(ready_page())]);
    let start = Instant::now();

    let outcome = gate().run(&page, |html| async move { html.len() }).await;

    assert!(matches!(outcome, GateOutcome::Ran(len) if len > 0));
    assert_eq!(page.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_runs_once_content_appears() {
    let page = ScriptedPage::new(vec![
        Ok(loading_page()),
        Ok(loading_page()),
        Ok(ready_page()),
    ]);
    let invocations = AtomicUsize::new(0);
    let start = Instant::now();

    let outcome = gate()
        .run(&page, |_html| async {
            invocations.fetch_add(1, Ordering::SeqCst);
            "ran"
        })
        .await;

    assert_eq!(outcome, GateOutcome::Ran("ran"));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(page.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_abandons_after_five_polls() {
    let page = ScriptedPage::new(vec![Ok(loading_page())]);
    let invocations = AtomicUsize::new(0);
    let start = Instant::now();

    let outcome = gate()
        .run(&page, |_html| async {
            invocations.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(outcome, GateOutcome::Abandoned { polls: 5 });
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    // Initial check plus five one-second polls
    assert_eq!(page.calls(), 6);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_errors_count_as_not_ready() {
    let page = ScriptedPage::new(vec![
        Err("connection reset".to_string()),
        Ok(ready_page()),
    ]);

    let outcome = gate().run(&page, |_html| async { true }).await;

    assert_eq!(outcome, GateOutcome::Ran(true));
    assert_eq!(page.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_custom_interval_and_bound() {
    let page = ScriptedPage::new(vec![Ok(loading_page())]);
    let start = Instant::now();

    let outcome = gate()
        .with_interval(Duration::from_millis(250))
        .with_max_polls(2)
        .run(&page, |_html| async {})
        .await;

    assert_eq!(outcome, GateOutcome::Abandoned { polls: 2 });
    assert_eq!(page.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test]
async fn test_zero_polls_checks_once() {
    let page = ScriptedPage::new(vec![Ok(loading_page())]);

    let outcome = gate().with_max_polls(0).run(&page, |_html| async {}).await;

    assert_eq!(outcome, GateOutcome::Abandoned { polls: 0 });
    assert_eq!(page.calls(), 1);
}

#[test]
fn test_initial_state_is_waiting() {
    assert_eq!(gate().state(), GateState::Waiting { polls: 0 });
}

// ============================================================================
// Built-in sources
// ============================================================================

#[tokio::test]
async fn test_static_page_is_passed_through() {
    let html = ready_page();
    let page = StaticPage::new(html.clone());

    let outcome = gate().run(&page, |snapshot| async move { snapshot }).await;

    assert_eq!(outcome, GateOutcome::Ran(html));
}

#[tokio::test]
async fn test_file_page_is_read() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{}", ready_page())?;
    let page = FilePage::new(file.path());

    let outcome = gate()
        .with_interval(Duration::from_millis(10))
        .run(&page, |snapshot| async move { snapshot.contains("acme/widget") })
        .await;

    assert_eq!(outcome, GateOutcome::Ran(true));
    assert_eq!(page.describe(), file.path().display().to_string());
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_abandoned() {
    let dir = tempfile::tempdir().unwrap();
    let page = FilePage::new(dir.path().join("not-there.html"));

    let outcome = gate()
        .with_interval(Duration::from_millis(10))
        .with_max_polls(3)
        .run(&page, |_html| async {})
        .await;

    assert_eq!(outcome, GateOutcome::Abandoned { polls: 3 });
}
