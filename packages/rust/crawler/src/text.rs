//! Visible body-text extraction.

use scraper::{Html, Selector};
use tracing::debug;

use listscribe_shared::Result;

use crate::fetch::Fetcher;

/// Fetch a page and return its collapsed visible body text.
///
/// Non-crawlable schemes (`mailto:`, `tel:`) return an empty string without
/// touching the network. Fetch errors propagate unchanged so the caller can
/// apply its own page-failure policy.
pub async fn extract_body_text(fetcher: &Fetcher, raw_url: &str) -> Result<String> {
    if raw_url.starts_with("mailto:") || raw_url.starts_with("tel:") {
        debug!(url = raw_url, "skipping non-crawlable scheme");
        return Ok(String::new());
    }

    let (_url, html) = fetcher.fetch_raw(raw_url).await?;
    Ok(body_text(&html))
}

/// Extract the document body's visible text with whitespace collapsed.
pub fn body_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body_sel = Selector::parse("body").unwrap();

    let raw = doc
        .select(&body_sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    collapse_whitespace(&raw)
}

/// Collapse every whitespace run to a single space and trim the ends.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_whitespace("  a \n\t b\r\n  c  "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("   \n  "), "");
    }

    #[test]
    fn body_text_ignores_markup() {
        let html = r#"<html><head><title>T</title></head>
            <body><h1>Welcome</h1>
            <p>We   serve
            the community.</p></body></html>"#;
        assert_eq!(body_text(html), "Welcome We serve the community.");
    }

    #[test]
    fn missing_body_yields_empty_text() {
        assert_eq!(body_text("<not really html"), "");
    }

    #[tokio::test]
    async fn mailto_and_tel_short_circuit() {
        // Point the fetcher at nothing routable: a network call would fail,
        // so success here proves no call was made.
        let fetcher = Fetcher::new(&FetchOptions::default()).unwrap();
        assert_eq!(
            extract_body_text(&fetcher, "mailto:info@example.org")
                .await
                .unwrap(),
            ""
        );
        assert_eq!(
            extract_body_text(&fetcher, "tel:+16025550100").await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn fetches_and_collapses_page_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h2>About  Us</h2>\n<p>Founded   in 1998.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetchOptions::default()).unwrap();
        let text = extract_body_text(&fetcher, &format!("{}/about", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "About Us Founded in 1998.");
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetchOptions::default()).unwrap();
        let err = extract_body_text(&fetcher, &format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
