use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use stargazers_core::activation::is_search_results_page;
use stargazers_core::annotate::{
    AnnotateOptions, AnnotateStatus, execute_annotate, execute_discover, execute_lookup,
};
use stargazers_core::page::{FilePage, HttpPage, Page, PageSource};
use stargazers_core::report::{AnnotateReport, ReportFormat, render_report};
use stargazers_scanner::{BatchPolicy, PageLayout, RepoLink};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

fn init_tracing() {
    // Logs go to stderr, stdout is reserved for HTML and reports
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), msg);
    std::process::exit(1);
}

/// Read an argument that only some subcommands define
fn arg_value<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> Option<T> {
    args.try_get_one::<T>(id).ok().flatten().cloned()
}

fn arg_flag(args: &ArgMatches, id: &str) -> bool {
    arg_value::<bool>(args, id).unwrap_or(false)
}

/// Expand a leading `~` in user supplied paths
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Build the page source from either `--url` or `--file`
pub fn load_page_source(
    url: Option<&Url>,
    file: Option<&PathBuf>,
    timeout_secs: u64,
) -> Result<Page, String> {
    if let Some(file) = file {
        let path = expand_path(file);
        if !path.exists() {
            return Err(format!("File not found: {}", path.display()));
        }
        Ok(Page::File(FilePage::new(path)))
    } else if let Some(url) = url {
        Ok(Page::Http(HttpPage::with_timeout(url.clone(), timeout_secs)?))
    } else {
        Err("Either --url or --file must be provided".to_string())
    }
}

/// URLs outside the package search only run with `--force`; files always run
pub fn should_process(url: Option<&Url>, force: bool) -> bool {
    match url {
        Some(url) => force || is_search_results_page(url),
        None => true,
    }
}

/// Parse a repository given as a full URL or as `owner/repo`
pub fn parse_repo_line(line: &str, slot: usize) -> Option<RepoLink> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(link) = RepoLink::from_href(line, slot) {
        return Some(link);
    }

    let parts: Vec<&str> = line.split('/').collect();
    if let [owner, repo] = parts.as_slice()
        && !owner.is_empty()
        && !repo.is_empty()
        && !line.contains(':')
    {
        return RepoLink::from_href(&format!("https://github.com/{}/{}", owner, repo), slot);
    }

    eprintln!("⚠️  Skipping invalid repository '{}'", line);
    None
}

/// Load repositories from a newline-delimited file
pub fn load_repos_from_file(path: &Path) -> Result<Vec<String>, String> {
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read repository file {}: {}", path.display(), e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Merge positional repositories with those from `--repos-file`
pub fn collect_repo_links(
    repos: &[String],
    repos_file: Option<&PathBuf>,
) -> Result<Vec<RepoLink>, String> {
    let mut lines = repos.to_vec();
    if let Some(path) = repos_file {
        lines.extend(load_repos_from_file(path)?);
    }

    let links: Vec<RepoLink> = lines
        .iter()
        .enumerate()
        .filter_map(|(slot, line)| parse_repo_line(line, slot))
        .collect();

    if links.is_empty() {
        return Err("No valid repositories given".to_string());
    }
    Ok(links)
}

/// Map parsed arguments onto pipeline options
pub fn options_from_args(args: &ArgMatches) -> AnnotateOptions {
    let defaults = AnnotateOptions::default();

    let policy = if arg_flag(args, "parallel") {
        BatchPolicy::Parallel
    } else {
        arg_value::<u64>(args, "batch-size")
            .map(|size| BatchPolicy::Chunked(size as usize))
            .unwrap_or(defaults.policy)
    };

    let layout = if arg_flag(args, "no-label-filter") {
        PageLayout::nixos_search().without_label_filter()
    } else {
        defaults.layout.clone()
    };

    AnnotateOptions {
        layout,
        policy,
        poll_interval: arg_value::<u64>(args, "poll-interval")
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval),
        max_polls: arg_value::<u32>(args, "max-polls").unwrap_or(defaults.max_polls),
        timeout_secs: arg_value::<u64>(args, "timeout").unwrap_or(defaults.timeout_secs),
        api_base: arg_value::<String>(args, "api-base").unwrap_or(defaults.api_base.clone()),
        show_progress_bars: !arg_flag(args, "quiet"),
        ..defaults
    }
}

pub fn format_from_args(args: &ArgMatches) -> ReportFormat {
    arg_value::<String>(args, "format")
        .and_then(|f| ReportFormat::from_str(&f))
        .unwrap_or(ReportFormat::Text)
}

/// Write annotated HTML to `output`, or to stdout when no path is given
pub fn write_output(html: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let path = expand_path(path);
            fs::write(&path, html)
                .with_context(|| format!("Failed to write annotated page to {}", path.display()))
        }
        None => {
            println!("{}", html);
            Ok(())
        }
    }
}

fn describe_policy(policy: BatchPolicy) -> String {
    match policy {
        BatchPolicy::Parallel => "all at once".to_string(),
        BatchPolicy::Chunked(size) => format!("batches of {}", size.max(1)),
    }
}

pub async fn handle_annotate(sub_matches: &ArgMatches) {
    init_tracing();

    let url = sub_matches.get_one::<Url>("url");
    let file = sub_matches.get_one::<PathBuf>("file");
    let output = sub_matches.get_one::<PathBuf>("output");
    let force = sub_matches.get_flag("force");
    let quiet = sub_matches.get_flag("quiet");
    let format = format_from_args(sub_matches);
    let options = options_from_args(sub_matches);

    if !should_process(url, force) {
        eprintln!(
            "{} Not a package search results page, nothing to do (use --force to override)",
            "→".yellow().bold()
        );
        return;
    }

    debug!("Annotate options: {:?}", options);
    let page = load_page_source(url, file, options.timeout_secs).unwrap_or_else(|e| fail(e));
    let source = page.describe();

    if !quiet {
        eprintln!("\n⭐ Annotating {}", source.bright_white());
        eprintln!("Lookups: {}", describe_policy(options.policy));
        eprintln!(
            "Readiness: {} polls every {}s\n",
            options.max_polls,
            options.poll_interval.as_secs()
        );
    }

    let progress_callback = Arc::new(move |msg: String| {
        if !quiet {
            eprintln!("{}", msg);
        }
    });

    let outcome = execute_annotate(&page, options, Some(progress_callback))
        .await
        .unwrap_or_else(|e| fail(format!("Annotate failed: {}", e)));

    match outcome.status {
        AnnotateStatus::NotReady => {
            eprintln!(
                "{} Page content never loaded, nothing was written",
                "⚠".yellow().bold()
            );
        }
        AnnotateStatus::NoLinks | AnnotateStatus::Annotated => {
            if let Some(ref html) = outcome.html
                && let Err(e) = write_output(html, output.map(PathBuf::as_path))
            {
                fail(format!("{:#}", e));
            }
        }
    }

    let report = AnnotateReport::from_outcome(&source, &outcome);
    let rendered = render_report(&report, format).unwrap_or_else(|e| fail(e));

    // stdout carries the HTML unless it went to a file
    match output {
        Some(path) if outcome.html.is_some() => {
            eprintln!(
                "{} Annotated page written to {}",
                "✓".green().bold(),
                expand_path(path).display().to_string().bright_white()
            );
            print!("{}", rendered);
        }
        Some(_) => print!("{}", rendered),
        None => eprint!("{}", rendered),
    }
}

pub async fn handle_discover(sub_matches: &ArgMatches) {
    init_tracing();

    let url = sub_matches.get_one::<Url>("url");
    let file = sub_matches.get_one::<PathBuf>("file");
    let force = sub_matches.get_flag("force");
    let options = options_from_args(sub_matches);

    if !should_process(url, force) {
        eprintln!(
            "{} Not a package search results page, nothing to do (use --force to override)",
            "→".yellow().bold()
        );
        return;
    }

    let page = load_page_source(url, file, options.timeout_secs).unwrap_or_else(|e| fail(e));

    let links = execute_discover(&page, &options)
        .await
        .unwrap_or_else(|e| fail(format!("Discovery failed: {}", e)));

    match links {
        None => {
            eprintln!(
                "{} Page content never loaded after {} polls",
                "⚠".yellow().bold(),
                options.max_polls
            );
            std::process::exit(1);
        }
        Some(links) if links.is_empty() => {
            eprintln!("{} No GitHub repository links found", "→".yellow().bold());
        }
        Some(links) => {
            eprintln!(
                "{} Found {} GitHub repository links\n",
                "✓".green().bold(),
                links.len()
            );
            for link in links {
                println!("{}\t{}", link.full_name(), link.url);
            }
        }
    }
}

pub async fn handle_stars(sub_matches: &ArgMatches) {
    init_tracing();

    let repos: Vec<String> = sub_matches
        .get_many::<String>("REPO")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let repos_file = sub_matches.get_one::<PathBuf>("repos-file");
    let format = format_from_args(sub_matches);
    let options = options_from_args(sub_matches);

    let links = collect_repo_links(&repos, repos_file).unwrap_or_else(|e| fail(e));

    if !sub_matches.get_flag("quiet") {
        eprintln!(
            "\n⭐ Looking up {} repositories ({})\n",
            links.len(),
            describe_policy(options.policy)
        );
    }

    let results = execute_lookup(&links, &options)
        .await
        .unwrap_or_else(|e| fail(format!("Lookup failed: {}", e)));

    let report = AnnotateReport::from_results("command line", &results);
    let rendered = render_report(&report, format).unwrap_or_else(|e| fail(e));
    print!("{}", rendered);
}
