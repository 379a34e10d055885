//! AI-assisted link prioritization.
//!
//! Given the outbound links of a site's front page, ask the model which
//! handful look like organizational-information pages. Prioritization is an
//! optimization, never a hard dependency: the fallible path returns a
//! `Result` and the call site maps any failure to "no extra pages".

use tracing::{debug, info};
use url::Url;

use listscribe_genai::GenerativeModel;
use listscribe_shared::{ListscribeError, Result};

/// Instruction sent with the candidate link list. The model must answer with
/// nothing but a JSON array of strings.
const PRIORITIZE_INSTRUCTION: &str = "You will be provided URLs from the main page of a website \
for an organization. Determine which links may contain important information related to the \
organization. Examples include \"/about\", \"/events\", \"/blog\", \"/programs\", and \
\"/services\". Try to limit the number of links to around 5 links. You do not need to fill 5 \
links if there are not that many relevant links. Return the links in the following format: \
[\"Link1\", \"Link2\", \"Link3\"]. Do not return anything else other than the JSON array.";

/// Select up to `max_links` organizationally relevant links from `candidates`.
///
/// Returns an empty list without calling the model when there is no site URL
/// or no candidates (cost control). Model entries may be relative paths; they
/// are resolved against the site's origin, and every returned URL is
/// absolute. Malformed JSON or unresolvable entries are errors; callers
/// degrade them to an empty list.
pub async fn prioritize(
    site_url: Option<&str>,
    candidates: &[Url],
    max_links: usize,
    model: &dyn GenerativeModel,
) -> Result<Vec<Url>> {
    let Some(site_url) = site_url.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let link_list = candidates
        .iter()
        .map(Url::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!("{PRIORITIZE_INSTRUCTION} \n Here are the links: \n {link_list}");

    debug!(candidates = candidates.len(), "requesting link prioritization");
    let response = model.generate_json(&prompt).await?;

    let selected: Vec<String> = serde_json::from_str(response.trim()).map_err(|e| {
        ListscribeError::parse(format!("prioritizer returned invalid JSON: {e}"))
    })?;

    let origin = site_origin(site_url)?;
    let mut links = Vec::new();
    for entry in &selected {
        let resolved = origin.join(entry).map_err(|e| {
            ListscribeError::parse(format!("cannot resolve prioritized link '{entry}': {e}"))
        })?;
        links.push(resolved);
    }
    links.truncate(max_links);

    info!(selected = links.len(), "prioritized links resolved");
    Ok(links)
}

/// The site's origin with a root path, used as the resolution base for
/// relative entries the model returns.
fn site_origin(site_url: &str) -> Result<Url> {
    let with_scheme = if site_url.starts_with("http://") || site_url.starts_with("https://") {
        site_url.to_string()
    } else {
        format!("https://{site_url}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ListscribeError::parse(format!("invalid site URL '{site_url}': {e}")))?;
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    fn candidates(paths: &[&str]) -> Vec<Url> {
        paths
            .iter()
            .map(|p| Url::parse(&format!("https://example.org{p}")).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn empty_inputs_never_call_the_model() {
        let model = MockModel::default();

        let links = prioritize(None, &candidates(&["/about"]), 5, &model)
            .await
            .unwrap();
        assert!(links.is_empty());

        let links = prioritize(Some("example.org"), &[], 5, &model).await.unwrap();
        assert!(links.is_empty());

        assert_eq!(model.json_calls(), 0);
    }

    #[tokio::test]
    async fn relative_entries_resolve_against_site_origin() {
        let model = MockModel::default();
        model.push_json(Ok(r#"["/about", "events/2026", "https://example.org/programs"]"#.into()));

        let links = prioritize(
            Some("example.org/home?ref=directory"),
            &candidates(&["/about", "/events/2026", "/programs"]),
            5,
            &model,
        )
        .await
        .unwrap();

        let resolved: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            resolved,
            vec![
                "https://example.org/about",
                "https://example.org/events/2026",
                "https://example.org/programs",
            ]
        );
    }

    #[tokio::test]
    async fn every_result_is_absolute() {
        let model = MockModel::default();
        model.push_json(Ok(r#"["about", "contact"]"#.into()));

        let links = prioritize(Some("example.org"), &candidates(&["/about"]), 5, &model)
            .await
            .unwrap();
        for link in &links {
            assert!(link.has_host());
            assert_eq!(link.scheme(), "https");
        }
    }

    #[tokio::test]
    async fn result_is_capped_at_max_links() {
        let model = MockModel::default();
        model.push_json(Ok(r#"["/a", "/b", "/c", "/d", "/e", "/f", "/g"]"#.into()));

        let links = prioritize(Some("example.org"), &candidates(&["/a"]), 5, &model)
            .await
            .unwrap();
        assert_eq!(links.len(), 5);
    }

    #[tokio::test]
    async fn invalid_json_is_an_error_for_the_caller_to_degrade() {
        let model = MockModel::default();
        model.push_json(Ok("Here are some links you might like!".into()));

        let err = prioritize(Some("example.org"), &candidates(&["/a"]), 5, &model)
            .await
            .unwrap_err();
        assert!(matches!(err, ListscribeError::Parse { .. }));
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let model = MockModel::default();
        model.push_json(Err(ListscribeError::GenAi("boom".into())));

        let err = prioritize(Some("example.org"), &candidates(&["/a"]), 5, &model)
            .await
            .unwrap_err();
        assert!(matches!(err, ListscribeError::GenAi(_)));
    }
}
