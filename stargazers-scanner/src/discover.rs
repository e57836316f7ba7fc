use crate::error::{Result, ScanError};
use crate::result::RepoLink;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// Matches once the package result list has been rendered
pub const DEFAULT_READY_SELECTOR: &str =
    "div.search-page.success > div.search-results > div > ul > li.package";

/// Anchors in each package's detail list, one of which is the "Homepage" entry
pub const DEFAULT_LINK_SELECTOR: &str =
    "div.search-page.success > div.search-results > div > ul > li.package > ul > li > a";

pub const DEFAULT_LINK_LABEL: &str = "Homepage";

/// Class carried by every injected badge container
pub const BADGE_CLASS: &str = "repo-stars-badge";

/// Selector set describing the targeted page structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub ready_selector: String,
    pub link_selector: String,
    pub link_label: Option<String>,
}

impl PageLayout {
    /// Layout of the search.nixos.org package results page
    pub fn nixos_search() -> Self {
        Self {
            ready_selector: DEFAULT_READY_SELECTOR.to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            link_label: Some(DEFAULT_LINK_LABEL.to_string()),
        }
    }

    pub fn without_label_filter(mut self) -> Self {
        self.link_label = None;
        self
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::nixos_search()
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScanError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn inside_badge(element: &ElementRef<'_>, badge_class: &str) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| el.classes().any(|class| class == badge_class))
    })
}

pub struct Discoverer {
    link_selector: Selector,
    link_label: Option<String>,
    badge_class: String,
}

impl Discoverer {
    pub fn new(layout: &PageLayout) -> Result<Self> {
        Ok(Self {
            link_selector: parse_selector(&layout.link_selector)?,
            link_label: layout.link_label.clone(),
            badge_class: BADGE_CLASS.to_string(),
        })
    }

    pub fn with_badge_class(mut self, badge_class: impl Into<String>) -> Self {
        self.badge_class = badge_class.into();
        self
    }

    /// Find repository homepage links in page order.
    ///
    /// Structural mismatches yield an empty list rather than an error.
    pub fn discover(&self, document: &Html) -> Vec<RepoLink> {
        let mut links = Vec::new();

        for (slot, element) in document
            .root_element()
            .select(&self.link_selector)
            .enumerate()
        {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if inside_badge(&element, &self.badge_class) {
                debug!("Skipping badge anchor {}", href);
                continue;
            }

            if let Some(ref label) = self.link_label {
                let text: String = element.text().collect();
                if !text.contains(label.as_str()) {
                    continue;
                }
            }

            match RepoLink::from_href(href, slot) {
                Some(link) => {
                    debug!("Found repository link: {} (slot {})", link.url, slot);
                    links.push(link);
                }
                None => debug!("  -> Not a repository homepage: {}", href),
            }
        }

        info!("Discovered {} GitHub repository links", links.len());
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_row(name: &str, homepage: &str) -> String {
        format!(
            r#"<li class="package">
                <h2>{name}</h2>
                <ul>
                    <li><a href="https://search.nixos.org/packages?show={name}">Details</a></li>
                    <li><a href="https://github.com/NixOS/nixpkgs/blob/master/pkgs/{name}/default.nix">Source</a></li>
                    <li><a href="{homepage}">Homepage</a></li>
                </ul>
            </li>"#
        )
    }

    fn results_page(rows: &[String]) -> Html {
        Html::parse_document(&format!(
            r#"<html><body><div class="search-page success"><div class="search-results"><div><ul>{}</ul></div></div></div></body></html>"#,
            rows.join("\n")
        ))
    }

    #[test]
    fn test_discovers_homepages_in_page_order() {
        let document = results_page(&[
            package_row("widget", "https://github.com/acme/widget"),
            package_row("curl", "https://curl.se"),
            package_row("gadget", "https://github.com/acme/gadget"),
        ]);
        let discoverer = Discoverer::new(&PageLayout::nixos_search()).unwrap();

        let links = discoverer.discover(&document);

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://github.com/acme/widget", "https://github.com/acme/gadget"]
        );
        // Three anchors per row, homepage is the third
        assert_eq!(links[0].slot, 2);
        assert_eq!(links[1].slot, 8);
    }

    #[test]
    fn test_excludes_blob_links() {
        let document = results_page(&[
            package_row("f", "https://github.com/o/r/blob/main/f"),
            package_row("r", "https://github.com/o/r"),
        ]);
        let discoverer = Discoverer::new(&PageLayout::nixos_search()).unwrap();

        let links = discoverer.discover(&document);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://github.com/o/r");
    }

    #[test]
    fn test_label_filter_can_be_disabled() {
        let document = results_page(&[package_row("widget", "https://github.com/acme/widget")]);
        let layout = PageLayout::nixos_search().without_label_filter();
        let discoverer = Discoverer::new(&layout).unwrap();

        // Source link is a blob path, so only the homepage survives either way
        let links = discoverer.discover(&document);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_unrelated_page_yields_nothing() {
        let document = Html::parse_document(
            r#"<html><body><ul><li><a href="https://github.com/acme/widget">Homepage</a></li></ul></body></html>"#,
        );
        let discoverer = Discoverer::new(&PageLayout::nixos_search()).unwrap();

        assert!(discoverer.discover(&document).is_empty());
    }

    #[test]
    fn test_skips_anchors_inside_existing_badges() {
        let document = Html::parse_document(
            r#"<html><body><div class="search-page success"><div class="search-results"><div><ul>
                <li class="package"><ul>
                    <li><a href="https://github.com/acme/widget">Homepage</a></li>
                    <li class="repo-stars-badge"><a href="https://github.com/acme/widget">Homepage ⭐️ 1</a></li>
                </ul></li>
            </ul></div></div></div></body></html>"#,
        );
        let discoverer = Discoverer::new(&PageLayout::nixos_search()).unwrap();

        let links = discoverer.discover(&document);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].slot, 0);
    }

    #[test]
    fn test_custom_badge_class_is_skipped() {
        let document = Html::parse_document(
            r#"<html><body><div class="search-page success"><div class="search-results"><div><ul>
                <li class="package"><ul>
                    <li class="my-stars"><a href="https://github.com/acme/gadget">Homepage ⭐️ 3</a></li>
                    <li><a href="https://github.com/acme/widget">Homepage</a></li>
                </ul></li>
            </ul></div></div></div></body></html>"#,
        );

        let default_class = Discoverer::new(&PageLayout::nixos_search()).unwrap();
        assert_eq!(default_class.discover(&document).len(), 2);

        let custom_class = Discoverer::new(&PageLayout::nixos_search())
            .unwrap()
            .with_badge_class("my-stars");
        let links = custom_class.discover(&document);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://github.com/acme/widget");
        assert_eq!(links[0].slot, 1);
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let layout = PageLayout {
            link_selector: "li >> a[".to_string(),
            ..PageLayout::nixos_search()
        };
        let err = Discoverer::new(&layout).err().unwrap();
        assert!(matches!(err, ScanError::InvalidSelector { .. }));
    }
}
