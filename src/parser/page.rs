use scraper::{ElementRef, Html, Selector};

/// A fetched profile page: the parsed tree plus the raw markup, which some
/// rules scan with regexes instead of walking the DOM.
pub struct Page<'a> {
    pub raw: &'a str,
    pub doc: Html,
    pub base_url: &'a str,
}

impl<'a> Page<'a> {
    pub fn parse(raw: &'a str, base_url: &'a str) -> Self {
        Page {
            raw,
            doc: Html::parse_document(raw),
            base_url: base_url.trim_end_matches('/'),
        }
    }

    /// Elements matching `css` in document order. An invalid selector matches nothing.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.doc.select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Trimmed text of every element matching `css`.
    pub fn texts(&self, css: &str) -> Vec<String> {
        self.select(css).into_iter().map(text_of).collect()
    }

    pub fn first_text(&self, css: &str) -> Option<String> {
        self.select(css).into_iter().next().map(text_of)
    }

    /// Value of `attr` on the first element matching `css`, if non-empty.
    pub fn attr(&self, css: &str, attr: &str) -> Option<String> {
        self.select(css)
            .into_iter()
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn meta(&self, name: &str) -> Option<String> {
        self.attr(&format!("meta[name=\"{}\"]", name), "content")
    }
}

/// Concatenated text nodes of an element, trimmed.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the element's parent, if the parent is an element.
pub fn parent_text(el: ElementRef<'_>) -> Option<String> {
    el.parent().and_then(ElementRef::wrap).map(text_of)
}

/// Texts of the ancestors whose tag is one of `tags`, closest first.
pub fn ancestor_texts<'b>(
    el: ElementRef<'b>,
    tags: &'b [&'b str],
) -> impl Iterator<Item = String> + 'b {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .filter(move |a| tags.contains(&a.value().name()))
        .map(text_of)
}
