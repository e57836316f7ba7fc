use crate::error::{Result, ScanError};
use crate::result::{RepoLink, StarCount};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    stargazers_count: Option<u64>,
}

/// Anything that can resolve a star count for a link.
///
/// Implementations never fail: every problem ends up as `StarCount::Unknown`.
pub trait StarSource {
    fn fetch_stars(&self, link: &RepoLink) -> impl Future<Output = StarCount>;
}

impl<T: StarSource + ?Sized> StarSource for &T {
    fn fetch_stars(&self, link: &RepoLink) -> impl Future<Output = StarCount> {
        (**self).fetch_stars(link)
    }
}

pub struct StarFetcher {
    client: Client,
    api_base: Url,
}

impl StarFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "Stargazers/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/m1kethai/pkg-stargazers)"
            ))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;

        Ok(Self {
            client,
            api_base: Self::normalize_base(DEFAULT_API_BASE)?,
        })
    }

    /// Point lookups at another API host (GitHub Enterprise, test servers)
    pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
        self.api_base = Self::normalize_base(api_base)?;
        Ok(self)
    }

    fn normalize_base(api_base: &str) -> Result<Url> {
        let mut base = Url::parse(api_base)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", api_base, e)))?;

        // Url::join drops the last segment unless the path ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    /// `{api_base}/repos/{owner}/{repo}`
    pub fn api_url(&self, link: &RepoLink) -> Result<Url> {
        self.api_base
            .join(&format!("repos/{}/{}", link.owner, link.repo))
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", link.url, e)))
    }

    /// Single lookup with the failure kept visible
    pub async fn try_fetch_stars(&self, link: &RepoLink) -> Result<u64> {
        let url = self.api_url(link)?;
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await?;

        let status = response.status();
        let quota_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|remaining| remaining.trim() == "0");

        if quota_exhausted && !status.is_success() {
            return Err(ScanError::Other(format!(
                "GitHub API rate limit exhausted ({})",
                status
            )));
        }

        let body = response.error_for_status()?.text().await?;

        let metadata: RepoMetadata = serde_json::from_str(&body)
            .map_err(|e| ScanError::ParseError(format!("repository metadata: {}", e)))?;

        metadata
            .stargazers_count
            .ok_or_else(|| ScanError::ParseError("missing stargazers_count".to_string()))
    }
}

impl StarSource for StarFetcher {
    async fn fetch_stars(&self, link: &RepoLink) -> StarCount {
        match self.try_fetch_stars(link).await {
            Ok(count) => {
                debug!("{} has {} stars", link.full_name(), count);
                StarCount::Known(count)
            }
            Err(e) => {
                warn!("Failed to fetch stars for {}: {}", link.url, e);
                StarCount::Unknown
            }
        }
    }
}
