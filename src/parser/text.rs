use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Fragments that mean an item still carries escaped or raw markup.
const MARKUP_ARTIFACTS: &[&str] = &["&#", "&lt;", "&gt;", "<span"];

/// Labels that open the trailing verdict/pros/cons block of a profile body.
pub const SECTION_LABELS: &[&str] = &["verdict:", "pros:", "cons:"];

/// Strip tags, decode the handful of entities the site uses, collapse whitespace.
pub fn clean_html(input: &str) -> String {
    let without_tags = TAG_RE.replace_all(input, "");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("\r\n", " ")
        .replace('\n', " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#34;", "\"");
    SPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Replace tags with line breaks so block boundaries survive as item separators.
pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "\n").into_owned()
}

pub fn has_markup_artifact(s: &str) -> bool {
    MARKUP_ARTIFACTS.iter().any(|a| s.contains(a))
}

/// True when any verdict/pros/cons label appears (case-insensitive).
pub fn has_section_label(s: &str) -> bool {
    let lower = s.to_lowercase();
    SECTION_LABELS.iter().any(|l| lower.contains(l))
}

/// Byte offset just past the first case-insensitive occurrence of `label`.
pub fn after_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let idx = find_ci(text, label)?;
    text.get(idx + label.len()..)
}

/// Case-insensitive find for ASCII needles. Returns a byte offset into `haystack`.
pub fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .filter(|&i| haystack.is_char_boundary(i))
}

/// Cut `text` at the earliest of `labels` (case-insensitive). A label at the
/// very start does not count.
pub fn cut_at_labels<'a>(text: &'a str, labels: &[&str]) -> &'a str {
    let cut = labels
        .iter()
        .filter_map(|l| find_ci(text, l))
        .filter(|&i| i > 0)
        .min()
        .unwrap_or(text.len());
    &text[..cut]
}

/// Resolve a possibly relative reference against the site base with a plain
/// prefix rule: absolute `http…` values pass through, `/x` is root-relative,
/// anything else is appended after a slash.
pub fn resolve_url(base_url: &str, value: &str) -> String {
    let value = value.trim();
    if value.starts_with("http") {
        value.to_string()
    } else if value.starts_with('/') {
        format!("{}{}", base_url, value)
    } else {
        format!("{}/{}", base_url, value)
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_html_strips_tags_and_entities() {
        assert_eq!(
            clean_html("<b>Film</b> &amp;\n  <i>TV</i>&nbsp;"),
            "Film & TV"
        );
    }

    #[test]
    fn strip_tags_keeps_boundaries() {
        assert_eq!(strip_tags("a<br>b</p>"), "a\nb\n");
    }

    #[test]
    fn detects_artifacts_and_labels() {
        assert!(has_markup_artifact("foo &lt;br"));
        assert!(has_markup_artifact("<span class=x>"));
        assert!(!has_markup_artifact("plain"));
        assert!(has_section_label("Some text. PROS: x"));
        assert!(!has_section_label("prosecutor"));
    }

    #[test]
    fn cuts_at_earliest_label() {
        let t = "Bio here. Cons: bad Pros: good";
        assert_eq!(cut_at_labels(t, &["pros:", "cons:"]), "Bio here. ");
        assert_eq!(cut_at_labels("no labels", &["pros:"]), "no labels");
        assert_eq!(cut_at_labels("Pros: first", &["pros:"]), "Pros: first");
    }

    #[test]
    fn after_label_is_case_insensitive() {
        assert_eq!(after_label("The VERDICT: Jew", "verdict:"), Some(" Jew"));
        assert_eq!(after_label("nothing", "verdict:"), None);
    }

    #[test]
    fn resolves_by_prefix() {
        let base = "http://site.test";
        assert_eq!(resolve_url(base, "/img/a.jpg"), "http://site.test/img/a.jpg");
        assert_eq!(resolve_url(base, "img/a.jpg"), "http://site.test/img/a.jpg");
        assert_eq!(resolve_url(base, "https://cdn.test/a.jpg"), "https://cdn.test/a.jpg");
    }
}
