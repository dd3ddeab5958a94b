use super::{non_empty, Rule};
use crate::model::Record;
use crate::parser::page::Page;

const SITE_PREFIX: &str = "Jew or Not Jew: ";
const TITLE_SEPARATOR: &str = " - ";

pub const RULES: &[Rule] = &[
    Rule::new("title", from_title),
    Rule::new("h1", from_heading),
];

/// "Jew or Not Jew: Name - Site" → "Name".
fn from_title(page: &Page<'_>, _: &Record) -> Option<String> {
    let title = page.first_text("title")?;
    let first = title.split(TITLE_SEPARATOR).next()?.trim();
    non_empty(first.strip_prefix(SITE_PREFIX).unwrap_or(first))
}

fn from_heading(page: &Page<'_>, _: &Record) -> Option<String> {
    page.texts("h1").into_iter().find(|t| !t.is_empty())
}
