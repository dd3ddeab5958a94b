use super::{non_empty, Rule};
use crate::model::Record;
use crate::parser::page::Page;
use crate::parser::text::{char_len, cut_at_labels, has_section_label, SECTION_LABELS};

const META_PREFIX: &str = "JewOrNotJew.com:";
const SECONDARY: &str = "td[valign=top] font, div.profile-description, p.description, td font";

/// A rule plus the length below which the current description is replaced.
struct Stage {
    below: usize,
    rule: Rule,
}

/// Thresholds are staggered: each fallback only fires while the text so far
/// is shorter than its own limit.
const STAGES: &[Stage] = &[
    Stage { below: 1, rule: Rule::new("profile_body", profile_body) },
    Stage { below: 50, rule: Rule::new("secondary_block", secondary_block) },
    Stage { below: 30, rule: Rule::new("meta_description", meta_description) },
    Stage { below: 100, rule: Rule::new("largest_cell", largest_cell) },
];

pub fn extract(page: &Page<'_>, record: &Record) -> String {
    let mut current = String::new();
    for stage in STAGES {
        if char_len(&current) >= stage.below {
            continue;
        }
        if let Some(text) = (stage.rule.run)(page, record) {
            tracing::trace!(field = "description", rule = stage.rule.name, "rule matched");
            current = text;
        }
    }
    current
}

/// `#profileBody` text with the trailing verdict/pros/cons block cut off.
fn profile_body(page: &Page<'_>, _: &Record) -> Option<String> {
    let full = page.first_text("div#profileBody, #profileBody")?;
    if char_len(&full) <= 50 {
        return None;
    }
    let full = full.replace("\r\n", "\n").replace('\r', "\n");
    non_empty(cut_at_labels(&full, SECTION_LABELS))
}

fn secondary_block(page: &Page<'_>, _: &Record) -> Option<String> {
    page.texts(SECONDARY)
        .into_iter()
        .find(|t| !has_section_label(t) && char_len(t) > 100)
}

fn meta_description(page: &Page<'_>, _: &Record) -> Option<String> {
    let desc = page.meta("description").filter(|d| char_len(d) > 10)?;
    let desc = desc.strip_prefix(META_PREFIX).map(str::trim).unwrap_or(&desc);
    non_empty(desc)
}

fn largest_cell(page: &Page<'_>, _: &Record) -> Option<String> {
    page.texts("table td")
        .into_iter()
        .filter(|t| !has_section_label(t))
        .max_by_key(|t| char_len(t))
        .filter(|t| char_len(t) > 100)
}
