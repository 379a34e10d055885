//! HTTP page fetcher with an explicit transport policy.
//!
//! Target sites are small-organization websites whose TLS setups are often
//! broken (expired certs, wrong hostnames, ancient chains). Under the default
//! [`TlsMode::Permissive`] policy certificate validation is disabled so those
//! sites remain reachable; the pipeline only reads public pages, so this is a
//! deliberate trust trade-off surfaced in configuration, not an oversight.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use listscribe_shared::{ListscribeError, Result, TlsMode};

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("listscribe/", env!("CARGO_PKG_VERSION"));

/// Transport settings for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// TLS validation mode.
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Hostname substrings that must be fetched over plain HTTP.
    pub plain_http_hosts: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            tls: TlsMode::Permissive,
            timeout: Duration::from_secs(20),
            plain_http_hosts: Vec::new(),
        }
    }
}

/// Fetches raw HTML for single URLs, tolerant of misconfigured TLS.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    plain_http_hosts: Vec<String>,
}

impl Fetcher {
    /// Build a fetcher from transport options.
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(options.timeout);

        if options.tls == TlsMode::Permissive {
            // Disables both cert-chain and hostname verification under rustls.
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| {
            ListscribeError::fetch("<client>", format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            plain_http_hosts: options.plain_http_hosts.clone(),
        })
    }

    /// Normalize a possibly scheme-less URL string for fetching.
    ///
    /// Scheme-less inputs default to `https://`; hosts on the plain-HTTP
    /// override list are downgraded to `http://`.
    pub fn normalize_url(&self, raw: &str) -> Result<Url> {
        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| ListscribeError::fetch(raw, format!("invalid URL: {e}")))?;

        if url.scheme() == "https" {
            let host = url.host_str().unwrap_or("").to_string();
            if self
                .plain_http_hosts
                .iter()
                .any(|needle| host.contains(needle.as_str()))
            {
                debug!(%url, "downgrading to plain HTTP per host override");
                url.set_scheme("http")
                    .map_err(|_| ListscribeError::fetch(raw, "cannot downgrade scheme"))?;
            }
        }

        Ok(url)
    }

    /// Fetch the raw HTML body of one URL.
    ///
    /// Network failures, timeouts, and non-success statuses all surface as
    /// [`ListscribeError::Fetch`]; callers decide whether that is fatal to
    /// the record or only to one page.
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| {
                // Timeouts get a stable message for failure reports.
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                ListscribeError::fetch(url.as_str(), message)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListscribeError::fetch(
                url.as_str(),
                format!("HTTP {status}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ListscribeError::fetch(url.as_str(), format!("body read failed: {e}")))
    }

    /// Normalize and fetch in one step. Returns the URL actually requested
    /// alongside the body so callers can resolve relative links against it.
    pub async fn fetch_raw(&self, raw: &str) -> Result<(Url, String)> {
        let url = self.normalize_url(raw)?;
        let body = self.fetch(&url).await?;
        Ok((url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_with_overrides(hosts: Vec<String>) -> Fetcher {
        Fetcher::new(&FetchOptions {
            plain_http_hosts: hosts,
            ..FetchOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn scheme_less_url_defaults_to_https() {
        let fetcher = fetcher_with_overrides(vec![]);
        let url = fetcher.normalize_url("example.org/about").unwrap();
        assert_eq!(url.as_str(), "https://example.org/about");
    }

    #[test]
    fn explicit_scheme_is_preserved() {
        let fetcher = fetcher_with_overrides(vec![]);
        let url = fetcher.normalize_url("http://example.org/").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn override_host_downgrades_to_http() {
        let fetcher = fetcher_with_overrides(vec!["eyesonsite".into()]);
        let url = fetcher.normalize_url("www.eyesonsite.example.com").unwrap();
        assert_eq!(url.scheme(), "http");

        // Substring match, so unrelated hosts stay on https.
        let url = fetcher.normalize_url("example.org").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn invalid_url_is_a_fetch_error() {
        let fetcher = fetcher_with_overrides(vec![]);
        let err = fetcher.normalize_url("http://[bad").unwrap_err();
        assert!(matches!(err, ListscribeError::Fetch { .. }));
    }

    #[tokio::test]
    async fn fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&server)
            .await;

        let fetcher = fetcher_with_overrides(vec![]);
        let url = Url::parse(&server.uri()).unwrap();
        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<html>hi</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = fetcher_with_overrides(vec![]);
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetchOptions {
            timeout: Duration::from_millis(200),
            ..FetchOptions::default()
        })
        .unwrap();

        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, ListscribeError::Fetch { .. }));
        assert!(err.to_string().contains("timed out"));
    }
}
