//! Link classification for navigation pages
//!
//! A fetched folder page is parsed once into its raw hrefs. Those are then
//! resolved and classified lazily, and the classified links are checked
//! against the crawl state:
//! - navigation links go to the frontier (unless visited, queued, or the page itself)
//! - document links become section candidates (unless already known)
//! - everything else is ignored

use crate::config::SiteConfig;
use crate::state::CrawlState;
use crate::url::{classify_url, resolve_href, LinkKind};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A resolved and classified outbound link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: String,
    pub kind: LinkKind,
}

/// The anchors of one fetched page
#[derive(Debug, Clone, Default)]
pub struct PageLinks {
    hrefs: Vec<String>,
}

impl PageLinks {
    /// Collects the href of every `<a href>` element in document order
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let hrefs = match Selector::parse("a[href]") {
            Ok(selector) => document
                .select(&selector)
                .filter_map(|element| element.value().attr("href"))
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        };
        Self { hrefs }
    }

    /// Returns the number of anchors found
    pub fn len(&self) -> usize {
        self.hrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hrefs.is_empty()
    }

    /// Resolves and classifies every anchor, skipping unresolvable hrefs
    pub fn classify<'a>(
        &'a self,
        base: &'a Url,
        site: &'a SiteConfig,
    ) -> impl Iterator<Item = ClassifiedLink> + 'a {
        self.hrefs.iter().filter_map(move |href| {
            let url = resolve_href(href, base)?;
            let kind = classify_url(&url, site);
            Some(ClassifiedLink { url, kind })
        })
    }
}

/// What classifying one page contributed to the crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Navigation links newly added to the frontier
    pub enqueued: usize,

    /// Document links not yet in the sections log, in page order
    pub new_sections: Vec<String>,
}

/// Applies a page's classified links to the crawl state
///
/// Navigation links are enqueued immediately. Document links are only
/// returned: they become known once they are persisted.
///
/// # Arguments
///
/// * `state` - The crawl state of the current run
/// * `page_url` - URL of the page the links came from
/// * `links` - Classified links of that page
pub fn apply_links<I>(state: &mut CrawlState, page_url: &str, links: I) -> LinkOutcome
where
    I: IntoIterator<Item = ClassifiedLink>,
{
    let mut outcome = LinkOutcome::default();
    let mut seen_sections = HashSet::new();

    for link in links {
        if link.kind.should_crawl() {
            if link.url != page_url && state.enqueue(&link.url) {
                outcome.enqueued += 1;
            }
        } else if link.kind.is_leaf()
            && !state.knows_section(&link.url)
            && seen_sections.insert(link.url.clone())
        {
            outcome.new_sections.push(link.url);
        }
    }

    outcome
}
