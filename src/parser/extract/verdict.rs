use super::Rule;
use crate::model::Record;
use crate::parser::page::{parent_text, text_of, Page};
use crate::parser::text::{after_label, char_len};

pub const POSITIVE: &str = "Jew";
pub const NEGATIVE: &str = "Not a Jew";

/// Elements that hold verdict text on hand-authored pages.
const BLOCKS: &str = "font, div, b, p";
/// Whole-element texts that are a verdict on their own.
const PHRASES: &[&str] = &["jew", "not a jew", "barely a jew"];
const SHORT: usize = 30;

pub const RULES: &[Rule] = &[
    Rule::new("meta_description", from_meta_description),
    Rule::new("label", from_label),
    Rule::new("phrase", from_phrase),
    Rule::new("image", from_image),
];

/// "Jane Doe is Not a Jew." style closing sentences.
fn from_meta_description(page: &Page<'_>, _: &Record) -> Option<String> {
    let desc = page.meta("description")?;
    if !desc.contains("is ") || !desc.ends_with('.') {
        return None;
    }
    let words: Vec<&str> = desc.split(' ').collect();
    if words.len() <= 2 {
        return None;
    }
    map_closing(&words)
}

fn map_closing(words: &[&str]) -> Option<String> {
    let clause = match words.iter().rposition(|w| *w == "is") {
        Some(i) => &words[i + 1..],
        None => words,
    };
    if clause.iter().any(|w| w.contains("Not")) {
        return Some(NEGATIVE.to_string());
    }
    let last = words.last()?.trim_end_matches('.');
    matches!(last, "Jew" | "Jewish").then(|| POSITIVE.to_string())
}

/// "Verdict: …" inline, or a short "Verdict" heading next to a short value.
/// The innermost (last in document order) match wins.
fn from_label(page: &Page<'_>, _: &Record) -> Option<String> {
    page.select(BLOCKS)
        .into_iter()
        .filter_map(|el| {
            let text = text_of(el);
            let lower = text.to_lowercase();
            if lower.contains("verdict:") {
                let rest = after_label(&text, "verdict:")?;
                let value = rest.lines().map(str::trim).find(|l| !l.is_empty())?;
                Some(value.to_string())
            } else if lower.contains("verdict") && char_len(&text) < SHORT {
                let sibling = parent_text(el)?.replacen(&text, "", 1);
                let sibling = sibling.trim();
                (!sibling.is_empty() && char_len(sibling) < SHORT).then(|| sibling.to_string())
            } else {
                None
            }
        })
        .last()
}

fn from_phrase(page: &Page<'_>, _: &Record) -> Option<String> {
    page.texts(BLOCKS)
        .into_iter()
        .filter(|t| char_len(t) < SHORT && PHRASES.contains(&t.to_lowercase().as_str()))
        .last()
}

/// The verdict badge image names the outcome.
fn from_image(page: &Page<'_>, _: &Record) -> Option<String> {
    let src = page.attr("img[src*='img/']", "src")?;
    if src.contains("verified_jew") {
        Some(POSITIVE.to_string())
    } else if src.contains("not_a_jew") {
        Some(NEGATIVE.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Seed;
    use crate::parser::extract::first_match;

    fn verdict(html: &str) -> Option<String> {
        let page = Page::parse(html, "http://site.test");
        let record = Record::from_seed(&Seed::new("http://site.test", 1));
        first_match("verdict", RULES, &page, &record)
    }

    fn meta(content: &str) -> String {
        format!(r#"<head><meta name="description" content="{}"></head>"#, content)
    }

    #[test]
    fn meta_positive() {
        assert_eq!(verdict(&meta("John Doe is a Jew.")).as_deref(), Some("Jew"));
        assert_eq!(verdict(&meta("Verdict on Bob: he is Jewish.")).as_deref(), Some("Jew"));
    }

    #[test]
    fn meta_negative() {
        assert_eq!(
            verdict(&meta("Jane Doe is Not a Jew.")).as_deref(),
            Some("Not a Jew")
        );
    }

    #[test]
    fn meta_without_closing_sentence_is_ignored() {
        assert_eq!(verdict(&meta("Is John Doe a Jew?")), None);
        assert_eq!(verdict(&meta("He is a plumber.")), None);
    }

    #[test]
    fn label_takes_text_after_colon() {
        let html = "<body><div>Bio text. Pros: x Cons: y <b>Verdict: Barely a Jew</b></div></body>";
        assert_eq!(verdict(html).as_deref(), Some("Barely a Jew"));
    }

    #[test]
    fn short_heading_uses_sibling_text() {
        let html = "<body><span><b>Verdict</b> Jew-ish</span></body>";
        assert_eq!(verdict(html).as_deref(), Some("Jew-ish"));
    }

    #[test]
    fn exact_phrase() {
        let html = "<body><p>Some paragraph about things.</p><font>Not a Jew</font></body>";
        assert_eq!(verdict(html).as_deref(), Some("Not a Jew"));
    }

    #[test]
    fn image_badge() {
        let yes = r#"<body><img src="/img/verified_jew.gif"></body>"#;
        let no = r#"<body><img src="img/not_a_jew.gif"></body>"#;
        let other = r#"<body><img src="img/logo.gif"></body>"#;
        assert_eq!(verdict(yes).as_deref(), Some("Jew"));
        assert_eq!(verdict(no).as_deref(), Some("Not a Jew"));
        assert_eq!(verdict(other), None);
    }

    #[test]
    fn meta_wins_over_page_text() {
        let html = r#"<head><meta name="description" content="Jane Doe is Not a Jew."></head>
            <body><p>Verdict: Jew</p></body>"#;
        assert_eq!(verdict(html).as_deref(), Some("Not a Jew"));
    }
}
