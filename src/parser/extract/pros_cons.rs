use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::parser::page::{ancestor_texts, text_of, Page};
use crate::parser::split::split_items;
use crate::parser::text::{
    after_label, char_len, cut_at_labels, find_ci, has_markup_artifact, strip_tags,
};

static PROS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bpros\b[\s:]*(.*?)(?:\bcons\b|\bverdict\b|$)").unwrap()
});
static CONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bcons\b[\s:]*([^:]*?)\s*(?:verdict:|$)").unwrap()
});

/// Left behind when the site cuts "considered" mid-word.
const TRUNCATION_ARTIFACT: &str = "idered";
const LABELLED_BLOCKS: &str = "div, td, span, p, font";
const LIST_CONTAINERS: &[&str] = &["div", "td", "ul"];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProsCons {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Which list an item is headed for; the acceptance rules differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Pros,
    Cons,
}

type Stage = (&'static str, fn(&Page<'_>, &mut ProsCons));

/// The label stages only fill a list that is still empty; list items are
/// always appended when not already present.
const STAGES: &[Stage] = &[
    ("markup_pattern", from_markup),
    ("inline_label", from_inline_labels),
    ("list_items", from_list_items),
];

pub fn extract(page: &Page<'_>) -> ProsCons {
    let mut lists = ProsCons::default();
    for (name, stage) in STAGES {
        let before = (lists.pros.len(), lists.cons.len());
        stage(page, &mut lists);
        if (lists.pros.len(), lists.cons.len()) != before {
            trace!(field = "pros_cons", rule = *name, "rule matched");
        }
    }
    lists
}

fn accept_pro(item: &str) -> bool {
    char_len(item) > 3 && !item.to_lowercase().contains("cons:")
}

fn accept_con(item: &str, min_len: usize) -> bool {
    char_len(item) > min_len && !item.contains(TRUNCATION_ARTIFACT) && !has_markup_artifact(item)
}

/// Label-anchored spans over the raw markup. Tags inside a span become line
/// breaks before splitting.
fn from_markup(page: &Page<'_>, lists: &mut ProsCons) {
    if lists.pros.is_empty() {
        if let Some(span) = PROS_RE.captures(page.raw).and_then(|c| c.get(1)) {
            lists.pros = split_items(&strip_tags(span.as_str()))
                .into_iter()
                .filter(|p| accept_pro(p))
                .collect();
        }
    }

    if lists.cons.is_empty() {
        if let Some(span) = CONS_RE.captures(page.raw).and_then(|c| c.get(1)) {
            let span = span.as_str();
            let len = char_len(span);
            if len > 10 && len < 1000 {
                lists.cons = split_items(&strip_tags(span))
                    .into_iter()
                    .filter(|c| accept_con(c, 10))
                    .collect();
            }
        }
    }
}

/// "Pros: a • b" written inline inside a block element. The first element
/// that yields any accepted item wins.
fn from_inline_labels(page: &Page<'_>, lists: &mut ProsCons) {
    let texts = page.texts(LABELLED_BLOCKS);
    if lists.pros.is_empty() {
        lists.pros = first_labelled(&texts, Side::Pros);
    }
    if lists.cons.is_empty() {
        lists.cons = first_labelled(&texts, Side::Cons);
    }
}

fn first_labelled(texts: &[String], side: Side) -> Vec<String> {
    let (label, word, stops): (&str, &str, &[&str]) = match side {
        Side::Pros => ("pros:", "pros", &["cons:", "verdict:"][..]),
        Side::Cons => ("cons:", "cons", &["verdict:", "pros:"][..]),
    };
    texts
        .iter()
        .filter_map(|text| {
            let rest = after_label(text, label).or_else(|| {
                (find_ci(text, word) == Some(0)).then(|| &text[word.len()..])
            })?;
            let items: Vec<String> = split_items(cut_at_labels(rest, stops))
                .into_iter()
                .filter(|i| match side {
                    Side::Pros => char_len(i) > 3 && !i.to_lowercase().contains("cons"),
                    Side::Cons => accept_con(i, 3),
                })
                .collect();
            (!items.is_empty()).then_some(items)
        })
        .next()
        .unwrap_or_default()
}

/// `<li>` items under a container that mentions "pros" or "cons", appended
/// after whatever the earlier stages found.
fn from_list_items(page: &Page<'_>, lists: &mut ProsCons) {
    for li in page.select("li") {
        let text = text_of(li);
        if char_len(&text) <= 3 {
            continue;
        }
        let Some(context) = ancestor_texts(li, LIST_CONTAINERS)
            .map(|t| t.to_lowercase())
            .find(|t| t.contains("pros") || t.contains("cons"))
        else {
            continue;
        };

        if context.contains("pros") {
            if !text.to_lowercase().contains("cons:") && !lists.pros.contains(&text) {
                lists.pros.push(text);
            }
        } else if !lists.cons.contains(&text) && !has_markup_artifact(&text) {
            lists.cons.push(text);
        }
    }
}

// ── Tests ──
