// Report generation for annotate and lookup runs

use crate::annotate::{AnnotateOutcome, AnnotateStatus};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use stargazers_scanner::RepoStars;
use stargazers_scanner::render::DEFAULT_PLACEHOLDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoReport {
    pub full_name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateReport {
    pub source: String,
    pub status: AnnotateStatus,
    pub discovered: usize,
    pub known: usize,
    pub unknown: usize,
    pub total_stars: u64,
    pub badges_rendered: usize,
    pub repositories: Vec<RepoReport>,
}

impl AnnotateReport {
    pub fn from_outcome(source: &str, outcome: &AnnotateOutcome) -> Self {
        let mut report = Self::from_results(source, &outcome.results);
        report.status = outcome.status;
        report.badges_rendered = outcome.badges.len();
        report
    }

    /// Report for lookups that never touched a page
    pub fn from_results(source: &str, results: &[RepoStars]) -> Self {
        let repositories: Vec<RepoReport> = results
            .iter()
            .map(|r| RepoReport {
                full_name: r.link.full_name(),
                url: r.link.url.clone(),
                stars: r.stars.count(),
            })
            .collect();

        let known = repositories.iter().filter(|r| r.stars.is_some()).count();

        Self {
            source: source.to_string(),
            status: AnnotateStatus::Annotated,
            discovered: repositories.len(),
            known,
            unknown: repositories.len() - known,
            total_stars: repositories.iter().filter_map(|r| r.stars).sum(),
            badges_rendered: 0,
            repositories,
        }
    }
}

fn status_label(status: AnnotateStatus) -> &'static str {
    match status {
        AnnotateStatus::Annotated => "annotated",
        AnnotateStatus::NoLinks => "no repository links found",
        AnnotateStatus::NotReady => "page content never loaded",
    }
}

pub fn render_report(report: &AnnotateReport, format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("Failed to serialize report: {}", e)),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

pub fn generate_text_report(report: &AnnotateReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("# Summary:\n");
    out.push_str(&format!("  Source: {}\n", report.source));
    out.push_str(&format!("  Status: {}\n", status_label(report.status)));
    out.push_str(&format!("  Repositories found: {}\n", report.discovered));
    out.push_str(&format!("  Stars resolved: {}\n", report.known));
    out.push_str(&format!("  Stars unknown: {}\n", report.unknown));
    out.push_str(&format!("  Total stars: {}\n", report.total_stars));
    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    if report.repositories.is_empty() {
        return out;
    }

    let name_width = report
        .repositories
        .iter()
        .map(|r| r.full_name.len())
        .max()
        .unwrap_or(0);

    out.push_str("## Repositories\n");
    for repo in &report.repositories {
        let stars = match repo.stars {
            Some(count) => format!("{:>7}", count).yellow().bold().to_string(),
            None => format!("{:>7}", DEFAULT_PLACEHOLDER).bright_black().to_string(),
        };
        out.push_str(&format!(
            "  ⭐ {}  {:<width$}  {}\n",
            stars,
            repo.full_name,
            repo.url,
            width = name_width
        ));
    }
    out.push('\n');

    if report.unknown > 0 {
        out.push_str(&format!(
            "{} {} lookups failed (unauthenticated GitHub API allows 60 requests/hour)\n",
            "[!]".yellow(),
            report.unknown
        ));
    }

    out
}

pub fn generate_markdown_report(report: &AnnotateReport) -> String {
    let mut out = String::new();
    out.push_str("# Stargazers Report\n\n");
    out.push_str(&format!("- **Source:** {}\n", report.source));
    out.push_str(&format!("- **Status:** {}\n", status_label(report.status)));
    out.push_str(&format!("- **Repositories:** {}\n", report.discovered));
    out.push_str(&format!(
        "- **Resolved / unknown:** {} / {}\n",
        report.known, report.unknown
    ));
    out.push_str(&format!("- **Total stars:** {}\n\n", report.total_stars));

    if report.repositories.is_empty() {
        return out;
    }

    out.push_str("| Repository | Stars |\n");
    out.push_str("|---|---:|\n");
    for repo in &report.repositories {
        let stars = repo
            .stars
            .map(|count| count.to_string())
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string());
        out.push_str(&format!("| [{}]({}) | {} |\n", repo.full_name, repo.url, stars));
    }

    out
}
