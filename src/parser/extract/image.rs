use super::Rule;
use crate::model::Record;
use crate::parser::page::Page;
use crate::parser::text::resolve_url;

/// Path fragments that mark a portrait rather than site chrome.
const PORTRAIT_HINTS: &[&str] = &["people", "img", "images"];

pub const RULES: &[Rule] = &[
    Rule::new("og_image", from_og_image),
    Rule::new("image_src", from_link),
    Rule::new("img", from_img),
];

fn from_og_image(page: &Page<'_>, _: &Record) -> Option<String> {
    page.attr(r#"meta[property="og:image"]"#, "content")
        .map(|src| resolve_url(page.base_url, &src))
}

fn from_link(page: &Page<'_>, _: &Record) -> Option<String> {
    page.attr(r#"link[rel="image_src"]"#, "href")
        .map(|href| resolve_url(page.base_url, &href))
}

fn from_img(page: &Page<'_>, _: &Record) -> Option<String> {
    page.select("img[src]")
        .into_iter()
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .find(|src| {
            let lower = src.to_lowercase();
            PORTRAIT_HINTS.iter().any(|h| lower.contains(h))
        })
        .map(|src| resolve_url(page.base_url, src))
}
