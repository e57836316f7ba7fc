// Page sources: where the HTML the gate polls comes from

use reqwest::Client;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Something that can produce a fresh HTML snapshot of the page
pub trait PageSource {
    fn snapshot(&self) -> impl Future<Output = Result<String, String>>;

    fn describe(&self) -> String;
}

/// Fetches the page over HTTP on every snapshot
pub struct HttpPage {
    client: Client,
    url: Url,
}

impl HttpPage {
    pub fn new(url: Url) -> Result<Self, String> {
        Self::with_timeout(url, 10)
    }

    pub fn with_timeout(url: Url, timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent(concat!("Stargazers/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl PageSource for HttpPage {
    async fn snapshot(&self) -> Result<String, String> {
        debug!("Fetching page {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        response
            .error_for_status()
            .map_err(|e| format!("Bad response: {}", e))?
            .text()
            .await
            .map_err(|e| format!("Failed to read body: {}", e))
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Re-reads a file on every snapshot, so a browser dump that is still being
/// written can be waited on
pub struct FilePage {
    path: PathBuf,
}

impl FilePage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageSource for FilePage {
    async fn snapshot(&self) -> Result<String, String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", self.path.display(), e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fixed HTML already in memory
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl PageSource for StaticPage {
    async fn snapshot(&self) -> Result<String, String> {
        Ok(self.html.clone())
    }

    fn describe(&self) -> String {
        "<inline html>".to_string()
    }
}

/// Any of the built-in sources, picked at runtime
pub enum Page {
    Http(HttpPage),
    File(FilePage),
    Static(StaticPage),
}

impl PageSource for Page {
    async fn snapshot(&self) -> Result<String, String> {
        match self {
            Page::Http(page) => page.snapshot().await,
            Page::File(page) => page.snapshot().await,
            Page::Static(page) => page.snapshot().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Page::Http(page) => page.describe(),
            Page::File(page) => page.describe(),
            Page::Static(page) => page.describe(),
        }
    }
}
