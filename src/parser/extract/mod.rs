pub mod category;
pub mod description;
pub mod identity;
pub mod image;
pub mod pros_cons;
pub mod verdict;

use tracing::trace;

use super::page::Page;
use crate::model::{Record, Seed};

/// One heuristic in a field's cascade. It sees the page and whatever fields
/// were extracted before it.
pub struct Rule {
    pub name: &'static str,
    pub run: fn(&Page<'_>, &Record) -> Option<String>,
}

impl Rule {
    pub const fn new(name: &'static str, run: fn(&Page<'_>, &Record) -> Option<String>) -> Self {
        Rule { name, run }
    }
}

/// Run `rules` in order and return the first non-empty value.
pub fn first_match(field: &str, rules: &[Rule], page: &Page<'_>, record: &Record) -> Option<String> {
    rules.iter().find_map(|rule| {
        let value = (rule.run)(page, record).filter(|v| !v.trim().is_empty())?;
        trace!(field, rule = rule.name, "rule matched");
        Some(value)
    })
}

/// Fill every field of a fresh record from the page. The name is left empty
/// when nothing matched; the caller decides on a placeholder.
pub fn extract_all(page: &Page<'_>, seed: &Seed) -> Record {
    let mut record = Record::from_seed(seed);

    record.name = first_match("identity", identity::RULES, page, &record).unwrap_or_default();
    record.verdict = first_match("verdict", verdict::RULES, page, &record).unwrap_or_default();
    record.description = description::extract(page, &record);

    let lists = pros_cons::extract(page);
    record.pros = lists.pros;
    record.cons = lists.cons;

    // Category falls back to the description, so it runs after it.
    record.category = first_match("category", category::RULES, page, &record).unwrap_or_default();
    record.image_url = first_match("image", image::RULES, page, &record).unwrap_or_default();

    record
}

pub(crate) fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &Page<'_>, _: &Record) -> Option<String> {
        None
    }
    fn blank(_: &Page<'_>, _: &Record) -> Option<String> {
        Some("   ".into())
    }
    fn first(_: &Page<'_>, _: &Record) -> Option<String> {
        Some("first".into())
    }
    fn second(_: &Page<'_>, _: &Record) -> Option<String> {
        Some("second".into())
    }

    #[test]
    fn first_non_empty_rule_wins() {
        let page = Page::parse("<html></html>", "");
        let record = Record::from_seed(&Seed::new("http://t", 1));
        let rules = [
            Rule::new("never", never),
            Rule::new("blank", blank),
            Rule::new("first", first),
            Rule::new("second", second),
        ];
        assert_eq!(
            first_match("test", &rules, &page, &record).as_deref(),
            Some("first")
        );
        assert_eq!(first_match("test", &rules[..2], &page, &record), None);
    }
}
