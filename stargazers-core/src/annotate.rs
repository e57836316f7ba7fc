use crate::gate::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL, GateOutcome, ReadinessGate};
use crate::page::PageSource;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use serde::{Deserialize, Serialize};
use stargazers_scanner::fetcher::DEFAULT_API_BASE;
use stargazers_scanner::{
    Badge, BadgeRenderer, BadgeStyle, BatchCallback, BatchPolicy, BatchProgress, BatchScheduler,
    Discoverer, PageLayout, RepoLink, RepoStars, StarFetcher, StarSource,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options for configuring an annotate run
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub layout: PageLayout,
    pub style: BadgeStyle,
    pub policy: BatchPolicy,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub timeout_secs: u64,
    pub api_base: String,
    pub show_progress_bars: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            layout: PageLayout::nixos_search(),
            style: BadgeStyle::default(),
            policy: BatchPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            timeout_secs: 10,
            api_base: DEFAULT_API_BASE.to_string(),
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting pipeline progress
pub type AnnotateProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotateStatus {
    /// Badges were rendered
    Annotated,
    /// Page was ready but held no repository links
    NoLinks,
    /// Result list never appeared
    NotReady,
}

#[derive(Debug, Clone)]
pub struct AnnotateOutcome {
    pub status: AnnotateStatus,
    /// Annotated page, absent when the gate gave up
    pub html: Option<String>,
    pub results: Vec<RepoStars>,
    pub badges: Vec<Badge>,
}

impl AnnotateOutcome {
    fn not_ready() -> Self {
        Self {
            status: AnnotateStatus::NotReady,
            html: None,
            results: Vec::new(),
            badges: Vec::new(),
        }
    }
}

fn report(callback: Option<&AnnotateProgressCallback>, msg: String) {
    if let Some(callback) = callback {
        callback(msg);
    }
}

fn lookup_progress_bar(show: bool) -> Option<Arc<ProgressBar>> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Waiting for page content...");
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(Arc::new(pb))
}

/// Discover links in a cleaned copy of the page
pub fn discover_links(
    html: &str,
    discoverer: &Discoverer,
    renderer: &BadgeRenderer<'_>,
) -> Vec<RepoLink> {
    let mut document = Html::parse_document(html);
    renderer.clear_badges(&mut document);
    discoverer.discover(&document)
}

/// Discover, look up, render. The parsed document is rebuilt after the
/// lookups so it is never held across an await.
pub async fn annotate_page<S: StarSource>(
    html: String,
    discoverer: &Discoverer,
    scheduler: &BatchScheduler<S>,
    renderer: &BadgeRenderer<'_>,
    progress_callback: Option<&AnnotateProgressCallback>,
) -> AnnotateOutcome {
    let links = discover_links(&html, discoverer, renderer);

    if links.is_empty() {
        warn!("No GitHub repo homepages found.");
        report(progress_callback, "No GitHub repository links found".to_string());
        return AnnotateOutcome {
            status: AnnotateStatus::NoLinks,
            html: Some(html),
            results: Vec::new(),
            badges: Vec::new(),
        };
    }

    report(
        progress_callback,
        format!("Found {} GitHub repository links", links.len()),
    );

    let results = scheduler.fetch_all(&links).await;

    let mut document = Html::parse_document(&html);
    renderer.clear_badges(&mut document);
    let badges = renderer.render_all(&mut document, &results);
    info!("Rendered {} badges", badges.len());

    AnnotateOutcome {
        status: AnnotateStatus::Annotated,
        html: Some(document.html()),
        results,
        badges,
    }
}

/// Run the whole pipeline against GitHub (or `options.api_base`)
pub async fn execute_annotate<P: PageSource>(
    source: &P,
    options: AnnotateOptions,
    progress_callback: Option<AnnotateProgressCallback>,
) -> Result<AnnotateOutcome, String> {
    let fetcher = StarFetcher::with_timeout(options.timeout_secs)
        .and_then(|fetcher| fetcher.with_api_base(&options.api_base))
        .map_err(|e| format!("Failed to set up star lookups: {}", e))?;

    execute_annotate_with(source, fetcher, options, progress_callback).await
}

/// Same as [`execute_annotate`] with a caller-supplied star source
pub async fn execute_annotate_with<P: PageSource, S: StarSource>(
    source: &P,
    stars: S,
    options: AnnotateOptions,
    progress_callback: Option<AnnotateProgressCallback>,
) -> Result<AnnotateOutcome, String> {
    let AnnotateOptions {
        layout,
        style,
        policy,
        poll_interval,
        max_polls,
        show_progress_bars,
        ..
    } = options;

    let gate = ReadinessGate::new(&layout)?
        .with_interval(poll_interval)
        .with_max_polls(max_polls);
    let discoverer = Discoverer::new(&layout)
        .map_err(|e| e.to_string())?
        .with_badge_class(style.class_name.clone());
    let renderer = BadgeRenderer::new(&style, &layout).map_err(|e| e.to_string())?;

    let progress_bar = lookup_progress_bar(show_progress_bars);

    let mut scheduler = BatchScheduler::new(stars).with_policy(policy);
    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let batch_callback: BatchCallback = Arc::new(move |progress: BatchProgress| {
            pb_clone.set_message(format!(
                "Looking up stars... {}/{} repositories",
                progress.resolved, progress.total
            ));
            pb_clone.tick();
        });
        scheduler = scheduler.with_batch_callback(batch_callback);
    }

    let outcome = gate
        .run(source, |html| {
            annotate_page(
                html,
                &discoverer,
                &scheduler,
                &renderer,
                progress_callback.as_ref(),
            )
        })
        .await;

    let outcome = match outcome {
        GateOutcome::Ran(outcome) => outcome,
        GateOutcome::Abandoned { polls } => {
            report(
                progress_callback.as_ref(),
                format!("[!] Page content did not load after {} polls", polls),
            );
            AnnotateOutcome::not_ready()
        }
    };

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Done! {} badges rendered",
            outcome.badges.len()
        ));
    }

    Ok(outcome)
}

/// Wait for the page and list its repository links without any API calls.
///
/// `Ok(None)` means the page never became ready.
pub async fn execute_discover<P: PageSource>(
    source: &P,
    options: &AnnotateOptions,
) -> Result<Option<Vec<RepoLink>>, String> {
    let gate = ReadinessGate::new(&options.layout)?
        .with_interval(options.poll_interval)
        .with_max_polls(options.max_polls);
    let discoverer = Discoverer::new(&options.layout)
        .map_err(|e| e.to_string())?
        .with_badge_class(options.style.class_name.clone());
    let renderer = BadgeRenderer::new(&options.style, &options.layout).map_err(|e| e.to_string())?;

    let outcome = gate
        .run(source, |html| async move { discover_links(&html, &discoverer, &renderer) })
        .await;

    Ok(match outcome {
        GateOutcome::Ran(links) => Some(links),
        GateOutcome::Abandoned { .. } => None,
    })
}

/// Look up star counts for links that did not come from a page
pub async fn execute_lookup(
    links: &[RepoLink],
    options: &AnnotateOptions,
) -> Result<Vec<RepoStars>, String> {
    let fetcher = StarFetcher::with_timeout(options.timeout_secs)
        .and_then(|fetcher| fetcher.with_api_base(&options.api_base))
        .map_err(|e| format!("Failed to set up star lookups: {}", e))?;

    let scheduler = BatchScheduler::new(fetcher).with_policy(options.policy);
    Ok(scheduler.fetch_all(links).await)
}
