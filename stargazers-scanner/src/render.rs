use crate::discover::{BADGE_CLASS, PageLayout, parse_selector};
use crate::error::Result;
use crate::result::{Badge, RepoLink, RepoStars, StarCount};
use scraper::{Html, Selector};
use std::collections::VecDeque;
use tracing::{debug, warn};

pub const DEFAULT_GLYPH: &str = "⭐️";
pub const DEFAULT_PLACEHOLDER: &str = "???";

const CONTAINER_STYLE: &str = "display: inherit; margin-left: 1em; \
    padding: 0.04em 0.6em 0.04em 0.4em; background-color: rgba(255, 255, 255, 0.15); \
    border-radius: 4px; font-size: 0.8em; font-weight: bold; text-align: center; \
    transition: all 0.2s;";

const LINK_STYLE: &str = "color: white; text-decoration: none !important; transition: all 0.2s;";

/// Look of the injected badge. Built once per run and passed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeStyle {
    pub container_style: String,
    pub link_style: String,
    pub glyph: String,
    pub placeholder: String,
    pub class_name: String,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            container_style: CONTAINER_STYLE.to_string(),
            link_style: LINK_STYLE.to_string(),
            glyph: DEFAULT_GLYPH.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            class_name: BADGE_CLASS.to_string(),
        }
    }
}

impl BadgeStyle {
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Visible badge text, e.g. `⭐️ 42`
    pub fn text_for(&self, stars: &StarCount) -> String {
        format!("{} {}", self.glyph, stars.label(&self.placeholder))
    }

    /// Badge container markup for one link
    pub fn markup(&self, link: &RepoLink, stars: &StarCount) -> String {
        format!(
            r#"<li class="{}" style="{}"><a style="{}" href="{}" target="_blank" rel="noopener noreferrer">{}</a></li>"#,
            escape_html(&self.class_name),
            escape_html(&self.container_style),
            escape_html(&self.link_style),
            escape_html(&link.url),
            escape_html(&self.text_for(stars)),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct BadgeRenderer<'s> {
    style: &'s BadgeStyle,
    link_selector: Selector,
    badge_selector: Selector,
}

impl<'s> BadgeRenderer<'s> {
    pub fn new(style: &'s BadgeStyle, layout: &PageLayout) -> Result<Self> {
        Ok(Self {
            style,
            link_selector: parse_selector(&layout.link_selector)?,
            badge_selector: parse_selector(&format!("li.{}", style.class_name))?,
        })
    }

    /// Detach badges left by an earlier run. Returns how many were removed.
    pub fn clear_badges(&self, document: &mut Html) -> usize {
        // Detached nodes stay in the arena, so only walk the live tree
        let stale: Vec<_> = document
            .root_element()
            .select(&self.badge_selector)
            .map(|badge| (*badge).id())
            .collect();

        for id in &stale {
            if let Some(mut node) = document.tree.get_mut(*id) {
                node.detach();
            }
        }

        if !stale.is_empty() {
            debug!("Removed {} existing badges", stale.len());
        }
        stale.len()
    }

    pub fn render(&self, document: &mut Html, link: &RepoLink, stars: StarCount) -> Option<Badge> {
        self.render_all(document, &[RepoStars::new(link.clone(), stars)])
            .pop()
    }

    /// Append one badge per entry as the last child of its anchor's parent.
    ///
    /// Anchors are resolved before any mutation. Entries whose slot no longer
    /// points at the same URL are skipped.
    pub fn render_all(&self, document: &mut Html, entries: &[RepoStars]) -> Vec<Badge> {
        let anchors: Vec<_> = document
            .root_element()
            .select(&self.link_selector)
            .map(|anchor| {
                let href = anchor.value().attr("href").map(|h| h.trim().to_string());
                let parent = (*anchor).parent().map(|p| p.id());
                (href, parent)
            })
            .collect();

        let mut badges = Vec::with_capacity(entries.len());

        for entry in entries {
            let parent = match anchors.get(entry.link.slot) {
                Some((Some(href), Some(parent))) if *href == entry.link.url => *parent,
                _ => {
                    warn!(
                        "Anchor for {} (slot {}) not found, skipping badge",
                        entry.link.url, entry.link.slot
                    );
                    continue;
                }
            };

            let fragment = Html::parse_fragment(&self.style.markup(&entry.link, &entry.stars));
            let mut pending: VecDeque<_> = fragment
                .root_element()
                .children()
                .map(|child| (child, parent))
                .collect();

            while let Some((node, into)) = pending.pop_front() {
                let Some(mut target) = document.tree.get_mut(into) else {
                    continue;
                };
                let copied = target.append(node.value().clone()).id();
                pending.extend(node.children().map(|child| (child, copied)));
            }

            badges.push(Badge {
                url: entry.link.url.clone(),
                text: self.style.text_for(&entry.stars),
            });
        }

        badges
    }
}
