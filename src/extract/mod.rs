//! Metadata extraction for regulation document pages
//!
//! A document page is turned into an [`ExtractedRecord`] in priority order,
//! where each later step only fills fields that are still unset:
//!
//! 1. the body text of the first matching content container
//! 2. hierarchy fields from the breadcrumb trail
//! 3. section number and heading from the `<title>` tag
//! 4. a fallback scan over the first lines of the body text
//! 5. the citation composed from whatever was found
//!
//! Extraction is a pure function of the HTML; only `retrieved_at` varies.

mod fallback;

pub use fallback::{apply_fallback, FALLBACK_SCAN_LINES};

use crate::storage::{timestamp_now, ExtractedRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Content containers tried in order; the first match is the body
pub const CONTENT_SELECTORS: &[&str] = &[
    "div#co_document",
    "div#co_docContent",
    "div.co_contentWrapper",
];

/// Breadcrumb containers tried in order
const BREADCRUMB_SELECTORS: &[&str] = &["div#co_breadcrumb", "div.co_breadcrumb"];

/// Title used when a page has no `<title>` tag
const UNKNOWN_TITLE: &str = "Unknown";

/// Number token: alphanumerics with optional inner dots (`22`, `1234.5`, `2.5`)
pub(crate) const NUMBER: &str = r"[0-9A-Za-z]+(?:\.[0-9A-Za-z]+)*";

static BREADCRUMB_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(Title|Division|Chapter|Article)\s+({})\.?\s*(.*)$",
        NUMBER
    ))
    .expect("breadcrumb pattern compiles")
});

static TITLE_SECTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"§\s*({})\.\s*(.*)$", NUMBER)).expect("title section pattern compiles")
});

/// Errors that make a document page unusable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Content not found for {url}")]
    ContentNotFound { url: String },
}

/// Structural metadata of one regulation section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMetadata {
    pub title_number: Option<String>,
    pub title_name: Option<String>,
    pub division: Option<String>,
    pub chapter: Option<String>,
    pub subchapter: Option<String>,
    pub article: Option<String>,
    pub section_number: Option<String>,
    pub section_heading: Option<String>,
}

impl SectionMetadata {
    /// Fills hierarchy fields from breadcrumb items
    pub fn apply_breadcrumbs<S: AsRef<str>>(&mut self, items: &[S]) {
        for item in items {
            let Some(caps) = BREADCRUMB_PATTERN.captures(item.as_ref().trim()) else {
                continue;
            };
            let number = caps[2].to_string();
            let name = caps[3].trim().to_string();

            match caps[1].to_ascii_lowercase().as_str() {
                "title" if self.title_number.is_none() => {
                    self.title_number = Some(number);
                    self.title_name = non_empty(name);
                }
                "division" if self.division.is_none() => {
                    self.division = Some(numbered(&number, &name));
                }
                "chapter" if self.chapter.is_none() => {
                    self.chapter = Some(numbered(&number, &name));
                }
                "article" if self.article.is_none() => {
                    self.article = Some(numbered(&number, &name));
                }
                _ => {}
            }
        }
    }

    /// Fills section number and heading from the page title
    ///
    /// Without a `§` in the title the heading falls back to the whole title
    /// and the section number stays unset.
    pub fn apply_page_title(&mut self, page_title: &str) {
        if self.section_number.is_some() {
            return;
        }
        match TITLE_SECTION_PATTERN.captures(page_title) {
            Some(caps) => {
                self.section_number = Some(caps[1].to_string());
                self.section_heading = non_empty(caps[2].trim().to_string());
            }
            None => {
                if self.section_heading.is_none() {
                    self.section_heading = non_empty(page_title.to_string());
                }
            }
        }
    }

    /// Composes the citation string
    ///
    /// # Examples
    ///
    /// ```
    /// use reg_harvest::extract::SectionMetadata;
    ///
    /// let meta = SectionMetadata {
    ///     title_number: Some("22".to_string()),
    ///     section_number: Some("1234".to_string()),
    ///     ..Default::default()
    /// };
    /// assert_eq!(meta.citation("ignored"), "22 CCR § 1234");
    /// ```
    pub fn citation(&self, page_title: &str) -> String {
        match (&self.title_number, &self.section_number) {
            (Some(title), Some(section)) => format!("{} CCR § {}", title, section),
            (None, Some(section)) => format!("CCR § {}", section),
            _ => page_title.to_string(),
        }
    }
}

/// Extracts a structured record from a document page
///
/// # Arguments
///
/// * `html` - Rendered HTML of the document page
/// * `source_url` - URL the page was requested under (the record identity)
///
/// # Returns
///
/// * `Ok(ExtractedRecord)` - The extracted record
/// * `Err(ExtractError::ContentNotFound)` - No content container matched
pub fn extract_record(html: &str, source_url: &str) -> Result<ExtractedRecord, ExtractError> {
    let document = Html::parse_document(html);

    let content = find_first(&document, CONTENT_SELECTORS)
        .map(|container| paragraph_text(&container))
        .ok_or_else(|| ExtractError::ContentNotFound {
            url: source_url.to_string(),
        })?;

    let mut meta = SectionMetadata::default();
    meta.apply_breadcrumbs(&breadcrumb_items(&document));

    let page_title = page_title(&document);
    meta.apply_page_title(&page_title);

    apply_fallback(&mut meta, &content);

    let citation = meta.citation(&page_title);
    Ok(ExtractedRecord {
        citation,
        source_url: source_url.to_string(),
        retrieved_at: timestamp_now(),
        title_number: meta.title_number,
        title_name: meta.title_name,
        division: meta.division,
        chapter: meta.chapter,
        subchapter: meta.subchapter,
        article: meta.article,
        section_number: meta.section_number,
        section_heading: meta.section_heading,
        content_markdown: content,
    })
}

/// Returns the first element matching any of the selectors, in selector order
fn find_first<'a>(document: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).next()
    })
}

/// Visible text with one blank line between text runs
fn paragraph_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn breadcrumb_items(document: &Html) -> Vec<String> {
    let Some(container) = find_first(document, BREADCRUMB_SELECTORS) else {
        return Vec::new();
    };
    let Ok(item_selector) = Selector::parse("li") else {
        return Vec::new();
    };

    container
        .select(&item_selector)
        .map(|item| item.text().map(str::trim).collect::<String>())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Text of the `<title>` tag before the first `|`
fn page_title(document: &Html) -> String {
    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|element| element.text().collect::<String>());

    match title {
        Some(text) => text.split('|').next().unwrap_or_default().trim().to_string(),
        None => UNKNOWN_TITLE.to_string(),
    }
}

pub(crate) fn numbered(number: &str, name: &str) -> String {
    format!("{}. {}", number, name).trim_end().to_string()
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
