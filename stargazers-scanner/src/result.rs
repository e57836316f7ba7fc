use serde::{Deserialize, Serialize};
use url::Url;

/// Hosts whose links are treated as GitHub repository pages
pub const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Path segments marking a file view rather than a repository homepage
pub const FILE_VIEW_MARKERS: &[&str] = &["blob"];

/// A GitHub repository link discovered in the page.
///
/// `slot` is the anchor's index among every element matched by the layout's
/// link selector, in document order. Selecting again on the same document and
/// taking the `slot`th match yields the same anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLink {
    pub url: String,
    pub owner: String,
    pub repo: String,
    pub slot: usize,
}

impl RepoLink {
    /// Classify an `href` as a repository homepage link.
    ///
    /// Returns `None` for non-GitHub hosts, file views (`/blob/`), and paths
    /// that stop short of `owner/repo`.
    pub fn from_href(href: &str, slot: usize) -> Option<Self> {
        let href = href.trim();
        let parsed = Url::parse(href).ok()?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        let host = parsed.host_str()?;
        if !GITHUB_HOSTS.contains(&host) {
            return None;
        }

        let segments: Vec<&str> = parsed
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .collect();

        let [owner, repo, rest @ ..] = segments.as_slice() else {
            return None;
        };

        // Only the view segment after `owner/repo` marks a file page
        if rest
            .first()
            .is_some_and(|segment| FILE_VIEW_MARKERS.contains(segment))
        {
            return None;
        }

        let repo = repo.trim_end_matches(".git");
        if repo.is_empty() {
            return None;
        }

        Some(Self {
            url: href.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            slot,
        })
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Star count for a repository; `Unknown` is a valid terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StarCount {
    Known(u64),
    Unknown,
}

impl StarCount {
    pub fn count(&self) -> Option<u64> {
        match self {
            StarCount::Known(count) => Some(*count),
            StarCount::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, StarCount::Known(_))
    }

    /// The count as badge text, or `placeholder` when unknown
    pub fn label(&self, placeholder: &str) -> String {
        match self {
            StarCount::Known(count) => count.to_string(),
            StarCount::Unknown => placeholder.to_string(),
        }
    }
}

impl From<Option<u64>> for StarCount {
    fn from(count: Option<u64>) -> Self {
        count.map(StarCount::Known).unwrap_or(StarCount::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStars {
    pub link: RepoLink,
    pub stars: StarCount,
}

impl RepoStars {
    pub fn new(link: RepoLink, stars: StarCount) -> Self {
        Self { link, stars }
    }
}

/// What was injected for one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub url: String,
    pub text: String,
}
