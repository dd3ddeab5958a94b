use super::{non_empty, Rule};
use crate::model::Record;
use crate::parser::page::Page;
use crate::parser::text::clean_html;

const LABELLED: &str = "td font, span, div, p, strong, b, h3";

/// Categories recognised in the keywords meta tag.
const VOCABULARY: &[&str] = &[
    "Actor",
    "Actress",
    "Entertainment",
    "Politics",
    "Sports",
    "Music",
    "Science",
    "Business",
    "Religion",
    "History",
    "Art",
    "Literature",
    "Media",
    "Academia",
    "Military",
    "Fashion",
    "Technology",
    "Comedy",
    "Royalty",
    "Film",
    "Television",
];

/// Description keyword → category. Scanned in this order, so an earlier row
/// wins even when a later keyword appears first in the text.
pub const CLUES: &[(&str, &str)] = &[
    ("actor", "Entertainment"),
    ("actress", "Entertainment"),
    ("movie", "Entertainment"),
    ("film", "Entertainment"),
    ("directed", "Entertainment"),
    ("singer", "Music"),
    ("musician", "Music"),
    ("album", "Music"),
    ("song", "Music"),
    ("band", "Music"),
    ("political", "Politics"),
    ("politician", "Politics"),
    ("president", "Politics"),
    ("senator", "Politics"),
    ("parliament", "Politics"),
    ("scientist", "Science"),
    ("researcher", "Science"),
    ("professor", "Academia"),
    ("author", "Literature"),
    ("writer", "Literature"),
    ("book", "Literature"),
    ("athlete", "Sports"),
    ("player", "Sports"),
    ("baseball", "Sports"),
    ("football", "Sports"),
    ("basketball", "Sports"),
    ("soccer", "Sports"),
    ("tennis", "Sports"),
    ("religious", "Religion"),
    ("rabbi", "Religion"),
    ("priest", "Religion"),
    ("businessman", "Business"),
    ("entrepreneur", "Business"),
    ("company", "Business"),
    ("ceo", "Business"),
    ("comedian", "Comedy"),
    ("comedy", "Comedy"),
];

pub const RULES: &[Rule] = &[
    Rule::new("label", from_label),
    Rule::new("prefix", from_prefix),
    Rule::new("keywords", from_keywords),
    Rule::new("description", from_description),
];

fn tidy(raw: &str) -> Option<String> {
    non_empty(clean_html(raw).trim_matches('.'))
}

/// "Category: Film". Innermost element wins.
fn from_label(page: &Page<'_>, _: &Record) -> Option<String> {
    page.texts(LABELLED)
        .iter()
        .filter_map(|t| t.split_once("Category:").and_then(|(_, rest)| tidy(rest)))
        .last()
}

/// "Category Film", no colon.
fn from_prefix(page: &Page<'_>, _: &Record) -> Option<String> {
    page.texts(LABELLED)
        .iter()
        .filter(|t| t.starts_with("Category") && !t.contains("Category:"))
        .filter_map(|t| t.split_once(' ').and_then(|(_, rest)| tidy(rest)))
        .last()
}

fn from_keywords(page: &Page<'_>, _: &Record) -> Option<String> {
    let keywords = page.meta("keywords")?;
    keywords.split(',').find_map(|kw| {
        let kw = kw.trim().to_lowercase();
        VOCABULARY
            .iter()
            .find(|cat| kw.contains(&cat.to_lowercase()))
            .map(|cat| cat.to_string())
    })
}

fn from_description(_: &Page<'_>, record: &Record) -> Option<String> {
    let lower = record.description.to_lowercase();
    CLUES
        .iter()
        .find(|(clue, _)| lower.contains(clue))
        .map(|(_, cat)| cat.to_string())
}
