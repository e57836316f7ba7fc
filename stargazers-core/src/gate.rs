// Readiness gate: hold the pipeline back until the result list has rendered

use crate::page::PageSource;
use scraper::{Html, Selector};
use stargazers_scanner::PageLayout;
use stargazers_scanner::discover::parse_selector;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_POLLS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// `polls` re-checks have been made after the initial one
    Waiting { polls: u32 },
    Ready,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome<T> {
    Ran(T),
    Abandoned { polls: u32 },
}

pub struct ReadinessGate {
    ready_selector: Selector,
    interval: Duration,
    max_polls: u32,
    state: GateState,
}

impl ReadinessGate {
    pub fn new(layout: &PageLayout) -> Result<Self, String> {
        let ready_selector = parse_selector(&layout.ready_selector).map_err(|e| e.to_string())?;

        Ok(Self {
            ready_selector,
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            state: GateState::Waiting { polls: 0 },
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Whether the snapshot already contains the result list
    pub fn is_ready(&self, html: &str) -> bool {
        Html::parse_document(html)
            .select(&self.ready_selector)
            .next()
            .is_some()
    }

    /// Feed one observation. Terminal states absorb everything after them.
    pub fn observe(&mut self, present: bool) -> GateState {
        self.state = match self.state {
            GateState::Waiting { .. } if present => GateState::Ready,
            GateState::Waiting { polls } if polls >= self.max_polls => GateState::Abandoned,
            GateState::Waiting { polls } => GateState::Waiting { polls: polls + 1 },
            terminal => terminal,
        };
        self.state
    }

    /// Check the source now, then every `interval` up to `max_polls` more
    /// times. Runs `pipeline` once with the first ready snapshot.
    pub async fn run<S, F, Fut, T>(mut self, source: &S, pipeline: F) -> GateOutcome<T>
    where
        S: PageSource,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let snapshot = match source.snapshot().await {
                Ok(html) => Some(html),
                Err(e) => {
                    debug!("Snapshot of {} failed: {}", source.describe(), e);
                    None
                }
            };
            let ready = snapshot.filter(|html| self.is_ready(html));

            match (self.observe(ready.is_some()), ready) {
                (GateState::Ready, Some(html)) => {
                    info!("Page content ready: {}", source.describe());
                    return GateOutcome::Ran(pipeline(html).await);
                }
                (GateState::Waiting { polls }, _) => {
                    debug!(
                        "Page content not ready, poll {}/{} in {:?}",
                        polls, self.max_polls, self.interval
                    );
                    tokio::time::sleep(self.interval).await;
                }
                _ => {
                    warn!(
                        "Max retries reached: page content did not load after {} polls",
                        self.max_polls
                    );
                    return GateOutcome::Abandoned {
                        polls: self.max_polls,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(max_polls: u32) -> ReadinessGate {
        ReadinessGate::new(&PageLayout::nixos_search())
            .unwrap()
            .with_max_polls(max_polls)
    }

    #[test]
    fn test_ready_on_first_observation() {
        let mut gate = gate(5);
        assert_eq!(gate.observe(true), GateState::Ready);
    }

    #[test]
    fn test_waits_then_abandons() {
        let mut gate = gate(2);
        assert_eq!(gate.observe(false), GateState::Waiting { polls: 1 });
        assert_eq!(gate.observe(false), GateState::Waiting { polls: 2 });
        assert_eq!(gate.observe(false), GateState::Abandoned);
        // terminal
        assert_eq!(gate.observe(true), GateState::Abandoned);
    }

    #[test]
    fn test_ready_is_terminal() {
        let mut gate = gate(5);
        gate.observe(false);
        assert_eq!(gate.observe(true), GateState::Ready);
        assert_eq!(gate.observe(false), GateState::Ready);
    }

    #[test]
    fn test_is_ready_matches_result_list() {
        let gate = gate(5);
        assert!(gate.is_ready(
            r#"<div class="search-page success"><div class="search-results"><div><ul><li class="package"></li></ul></div></div></div>"#
        ));
        assert!(!gate.is_ready(r#"<div class="search-page loading"></div>"#));
    }
}
