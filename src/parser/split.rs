use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\s+").unwrap());

/// Bullet glyphs, checked in this order; the first one present wins.
const BULLETS: &[&str] = &["•", "-", "★", "✓", "✔", "*", "→", "⇒", "⟹", "⇾", "⟶"];

/// Items shorter than this are dropped unless a bullet glyph delimited them.
pub const MIN_ITEM_LEN: usize = 3;

/// How a block of text was broken into items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitKind {
    Bullets,
    Lines,
    Numbered,
    Sentences,
    Whole,
}

/// Split a loosely delimited block (bullets, lines, numbering, sentences) into
/// trimmed, deduplicated items in first-seen order.
pub fn split_items(text: &str) -> Vec<String> {
    let text = text.trim();
    let (kind, items) = split_raw(text);
    normalize(kind, items)
}

fn split_raw(text: &str) -> (SplitKind, Vec<String>) {
    if let Some(bullet) = BULLETS.iter().find(|b| text.contains(**b)) {
        let items = text
            .split(bullet)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        return (SplitKind::Bullets, items);
    }

    if text.contains('\n') {
        let items: Vec<String> = text
            .lines()
            .map(strip_leading_bullet)
            .filter(|l| l.chars().count() > 2)
            .map(String::from)
            .collect();
        if !items.is_empty() {
            return (SplitKind::Lines, items);
        }
    }

    if NUMBERED_RE.is_match(text) {
        let items: Vec<String> = NUMBERED_RE
            .split(text)
            .map(str::trim)
            .filter(|p| p.chars().count() > 2)
            .map(String::from)
            .collect();
        if !items.is_empty() {
            return (SplitKind::Numbered, items);
        }
    }

    if text.chars().count() > 15 && (text.contains(". ") || text.contains("; ")) {
        let items = split_sentences(text);
        if !items.is_empty() {
            return (SplitKind::Sentences, items);
        }
    }

    (SplitKind::Whole, vec![text.to_string()])
}

fn strip_leading_bullet(line: &str) -> &str {
    let line = line.trim();
    BULLETS
        .iter()
        .find_map(|b| line.strip_prefix(b))
        .map(str::trim)
        .unwrap_or(line)
}

/// Sentence split on ". ", falling back to "; " when there is only one sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text.split(". ").collect();
    if parts.len() > 1 {
        return parts
            .into_iter()
            .map(str::trim)
            .filter(|p| p.chars().count() > 10)
            .map(|p| {
                let looks_like_sentence = p.chars().count() > 20
                    && p.chars().next().is_some_and(|c| c.is_ascii_uppercase());
                if looks_like_sentence && !p.ends_with('.') {
                    format!("{}.", p)
                } else {
                    p.to_string()
                }
            })
            .collect();
    }
    text.split("; ")
        .map(str::trim)
        .filter(|p| p.chars().count() > 5)
        .map(String::from)
        .collect()
}

fn normalize(kind: SplitKind, items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .filter(|i| kind == SplitKind::Bullets || i.chars().count() >= MIN_ITEM_LEN)
        .filter(|i| seen.insert(i.clone()))
        .collect()
}

// ── Tests ──
