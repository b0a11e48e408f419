//! Fallback metadata scan over the body text
//!
//! Pages with missing breadcrumbs or an uninformative title usually still
//! repeat their hierarchy in the first lines of the body. The scan is a table
//! of rules; each rule owns one field group and fires on the first line that
//! matches while its field is still unset.

use super::{non_empty, numbered, SectionMetadata, NUMBER};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Number of body lines examined
pub const FALLBACK_SCAN_LINES: usize = 30;

struct FallbackRule {
    patterns: Vec<Regex>,
    is_set: fn(&SectionMetadata) -> bool,
    apply: fn(&mut SectionMetadata, &Captures<'_>),
}

impl FallbackRule {
    fn try_line(&self, meta: &mut SectionMetadata, line: &str) {
        if (self.is_set)(meta) {
            return;
        }
        if let Some(caps) = self.patterns.iter().find_map(|p| p.captures(line)) {
            (self.apply)(meta, &caps);
        }
    }
}

fn pattern(template: &str) -> Regex {
    Regex::new(&template.replace("{N}", NUMBER)).expect("fallback pattern compiles")
}

fn name(caps: &Captures<'_>) -> String {
    caps.get(2).map_or("", |m| m.as_str()).trim().to_string()
}

static RULES: Lazy<Vec<FallbackRule>> = Lazy::new(|| {
    vec![
        FallbackRule {
            patterns: vec![pattern(r"(?i)^Title\s+({N})\.?\s+(.*)$")],
            is_set: |m| m.title_number.is_some(),
            apply: |m, caps| {
                m.title_number = Some(caps[1].to_string());
                m.title_name = non_empty(name(caps));
            },
        },
        FallbackRule {
            patterns: vec![pattern(r"(?i)^Division\s+({N})\.?\s+(.*)$")],
            is_set: |m| m.division.is_some(),
            apply: |m, caps| m.division = Some(numbered(&caps[1], &name(caps))),
        },
        FallbackRule {
            patterns: vec![pattern(r"(?i)^Chapter\s+({N})\.?\s+(.*)$")],
            is_set: |m| m.chapter.is_some(),
            apply: |m, caps| m.chapter = Some(numbered(&caps[1], &name(caps))),
        },
        FallbackRule {
            patterns: vec![
                pattern(r"^§\s*({N})\.?\s*(.*)$"),
                pattern(r"(?i)^Section\s+({N})\.?\s*(.*)$"),
            ],
            is_set: |m| m.section_number.is_some(),
            apply: |m, caps| {
                m.section_number = Some(caps[1].to_string());
                m.section_heading = non_empty(name(caps));
            },
        },
    ]
});

/// Fills still-unset fields from the first lines of the body text
///
/// # Examples
///
/// ```
/// use reg_harvest::extract::{apply_fallback, SectionMetadata};
///
/// let mut meta = SectionMetadata::default();
/// apply_fallback(&mut meta, "Title 22. Social Security\n\n§ 1234. Scope");
/// assert_eq!(meta.title_number.as_deref(), Some("22"));
/// assert_eq!(meta.section_number.as_deref(), Some("1234"));
/// ```
pub fn apply_fallback(meta: &mut SectionMetadata, body: &str) {
    for line in body.split('\n').take(FALLBACK_SCAN_LINES) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        for rule in RULES.iter() {
            rule.try_line(meta, line);
        }
    }
}
