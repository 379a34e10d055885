//! Anchor extraction with self-link exclusion.

use scraper::{Html, Selector};
use url::Url;

/// Extract all outbound links from a page, resolved against `page_url`.
///
/// Links whose origin and path match the page itself are excluded — a
/// hash-only difference is still the same page. The comparison ignores the
/// query string as well, matching how listing sites link back to themselves
/// with tracking parameters. Malformed hrefs are skipped silently; they are
/// never fatal to the extraction. Document order is preserved.
pub fn extract_links(html: &str, page_url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let page_key = (page_url.origin(), page_url.path().to_string());

    doc.select(&anchor_sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| page_url.join(href).ok())
        .filter(|link| (link.origin(), link.path().to_string()) != page_key)
        .collect()
}
