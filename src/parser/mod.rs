pub mod extract;
pub mod page;
pub mod split;
pub mod text;

use crate::model::{Record, Seed};
use page::Page;

/// Markup → record. The name falls back to the seed's placeholder, which the
/// fetch unit treats as "nothing extracted".
pub fn process_page(markup: &str, seed: &Seed, base_url: &str) -> Record {
    let page = Page::parse(markup, base_url);
    let mut record = extract::extract_all(&page, seed);
    if record.name.is_empty() {
        record.name = seed.placeholder();
    }
    record
}

// ── Tests ──
