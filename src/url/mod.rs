//! URL handling module for Reg-Harvest
//!
//! This module resolves raw hrefs against the site's base origin and
//! classifies the resulting URLs into folder pages, document pages, or
//! anything else.

use crate::config::SiteConfig;
use crate::{UrlError, UrlResult};
use url::Url;

/// Link classification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Folder page - more links to crawl
    Navigation,
    /// Document page - a single regulation section to extract
    Document,
    /// Anything else - ignored
    Other,
}

impl LinkKind {
    /// Returns true if the link belongs in the frontier
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Navigation)
    }

    /// Returns true if the link is a leaf to record
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Document)
    }
}

/// Parses and checks the base origin used for href resolution
pub fn parse_base(base_url: &str) -> UrlResult<Url> {
    let url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}

/// Returns the serialized form `url` gives an absolute URL
///
/// Hrefs resolved by [`resolve_href`] come out in this form, so configured
/// URLs have to be compared in it too. Host case, default ports and the root
/// path are normalized.
pub fn canonical_url(raw: &str) -> UrlResult<String> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    Ok(url.to_string())
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_href(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// Classifies an absolute URL according to the site configuration
///
/// The document pattern is checked first so that a document URL whose path
/// also happens to contain the browse fragment is never treated as a folder.
///
/// # Examples
///
/// ```
/// use reg_harvest::config::SiteConfig;
/// use reg_harvest::url::{classify_url, LinkKind};
///
/// let site = SiteConfig {
///     base_url: "https://govt.westlaw.com".to_string(),
///     start_url: "https://govt.westlaw.com/calregs/Browse/Home".to_string(),
///     navigation_pattern: "/calregs/Browse/".to_string(),
///     document_pattern: "/calregs/Document/".to_string(),
/// };
///
/// let kind = classify_url("https://govt.westlaw.com/calregs/Document/I123", &site);
/// assert_eq!(kind, LinkKind::Document);
/// ```
pub fn classify_url(url: &str, site: &SiteConfig) -> LinkKind {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => return LinkKind::Other,
    };

    if path.contains(&site.document_pattern) {
        LinkKind::Document
    } else if path.contains(&site.navigation_pattern) {
        LinkKind::Navigation
    } else {
        LinkKind::Other
    }
}
