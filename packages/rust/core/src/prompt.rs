//! Prompt assembly and token-budget negotiation.
//!
//! The generation service enforces a hard prompt-size ceiling. Rather than
//! guess at tokenization, the negotiator asks the service's own token counter
//! and drops crawled page texts from the end of the list until the prompt
//! fits. The organization's metadata always survives; in the worst case the
//! model gets a metadata-only prompt with an explicit marker in place of page
//! content.

use tracing::{debug, warn};

use listscribe_genai::GenerativeModel;
use listscribe_shared::{OrganizationRecord, PageContent, TaskKind};

/// Marker inserted when every page text had to be dropped.
pub const CONTENT_TOO_LARGE: &str = "Content too large to include.";

const NO_FORMATTING_RULES: &str = "IMPORTANT: DO NOT USE BACKTICKS OR CODE BLOCKS IN YOUR \
RESPONSE. DO NOT USE MARKDOWN FORMATTING. \nDO NOT BEGIN YOUR RESPONSE WITH ``` OR END WITH ```.";

// ---------------------------------------------------------------------------
// Prompt context
// ---------------------------------------------------------------------------

/// Everything needed to render a generation prompt for one record.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub record: &'a OrganizationRecord,
    pub task: TaskKind,
    /// Directory branding for the description's closing call-to-action.
    /// Both name and URL must be present for the branding rule to render.
    pub directory_name: Option<&'a str>,
    pub directory_url: Option<&'a str>,
}

impl<'a> PromptContext<'a> {
    fn branding(&self) -> Option<(&'a str, &'a str)> {
        self.directory_name.zip(self.directory_url)
    }
}

// ---------------------------------------------------------------------------
// Prompt rendering
// ---------------------------------------------------------------------------

fn instruction(ctx: &PromptContext<'_>) -> String {
    match ctx.task {
        TaskKind::Description => {
            let mut text = String::from(
                "You are an expert website SEO consultant. Your task is to analyze the \
following website content and generate a concise, SEO-optimized description that highlights \
the key features and offerings of the given organization.\nFollow these rules:\n\
1. **Length**: The description should be between 300 and 400 words.\n\
2. The Organization's name should be the \"keyword\" and should be mentioned at least 3 times \
in the description.\n\
3. Use an h3 tag for the title.\n\
4. The passive voice should be used less than 10% of the time.\n\
5. Transition words should be used at least 30% of the time.\n\
6. The description should be engaging and informative, providing a clear overview of the \
website's purpose and offerings.\n\
7. Paragraphs should be less than 150 words. Use multiple paragraphs if necessary.\n\
8. Wrap the first mention of the organization in an anchor with the URL of the organization.\n\
9. Use semantic HTML, such as <section> <h3> <p> and <a rel=\"noopener\">, to structure the \
description.\n\
10. Focus on the mission, vision, and key offerings of the organization. Give a broad \
overview, do not describe specific programs or events in detail.\n",
            );
            if let Some((name, url)) = ctx.branding() {
                text.push_str(&format!(
                    "11. End the description with \"Learn more at <Organization URL> and \
explore other resources at the <a href=\\\"{url}\\\">{name}</a>.\"\n"
                ));
            }
            text.push('\n');
            text.push_str(NO_FORMATTING_RULES);
            text.push_str(
                "\nPROVIDE ONLY THE RAW HTML CONTENT WITHOUT ANY CODE FORMATTING OR MARKDOWN \
SYNTAX.",
            );
            text
        }
        TaskKind::Excerpt => {
            let persona = match ctx.directory_name {
                Some(name) => format!(
                    "You are an expert website SEO consultant for {name}, a directory that \
lists many organizations."
                ),
                None => String::from(
                    "You are an expert website SEO consultant for a directory that lists many \
organizations.",
                ),
            };
            format!(
                "{persona} Your task is to analyze the following website content and generate \
a concise, SEO-optimized excerpt that highlights the key features and offerings of the given \
organization.\nFollow these rules:\n\
1. **Length**: The excerpt should be less than 55 words.\n\
2. Mention the Organization's name at least once.\n\
3. The excerpt should be engaging and informative, providing a clear overview of the \
website's purpose and offerings.\n\
4. Focus on the mission, vision, and key offerings of the organization. Give a broad \
overview, do not describe specific programs or events in detail.\n\
5. Use only plain text without any HTML formatting.\n\n{NO_FORMATTING_RULES}"
            )
        }
    }
}

/// Record metadata with safe fallbacks so missing fields never render as
/// empty holes in the prompt.
fn metadata_block(record: &OrganizationRecord) -> String {
    let name = non_empty(Some(&record.listing_title)).unwrap_or("Unknown Organization");
    let location = non_empty(record.location.as_ref()).unwrap_or("Unknown Location");
    let website = non_empty(record.website.as_ref()).unwrap_or("No website provided");
    let email = non_empty(record.email.as_ref()).unwrap_or("No email provided");
    let phone = non_empty(record.phone.as_ref()).unwrap_or("No phone provided");

    format!(
        "Name: {name}\nLocation: {location}\nURL: {website}\n\nEmail: {email}\nPhone Number: {phone}"
    )
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

fn render(ctx: &PromptContext<'_>, pages: &[PageContent]) -> String {
    let body_texts = pages
        .iter()
        .map(|page| {
            let body = if page.body_text.is_empty() {
                "No content available"
            } else {
                page.body_text.as_str()
            };
            format!("{}\n{body}", page.url)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nHere is the information about the website and organization:\n\n{}\nBody Texts:\n{body_texts}",
        instruction(ctx),
        metadata_block(ctx.record)
    )
}

fn render_marker(ctx: &PromptContext<'_>) -> String {
    format!(
        "{}\n\nHere is the information about the website and organization:\n\n{}\nBody Texts: {CONTENT_TOO_LARGE}",
        instruction(ctx),
        metadata_block(ctx.record)
    )
}

// ---------------------------------------------------------------------------
// Negotiation
// ---------------------------------------------------------------------------

/// A prompt that fits the service's ceiling, plus how it got there.
#[derive(Debug)]
pub struct NegotiatedPrompt {
    pub text: String,
    /// How many of the candidate pages survived negotiation.
    pub pages_included: usize,
    /// Token-counter round trips spent; at most `pages.len() + 1`.
    pub counter_calls: usize,
}

/// Shrink the prompt until the service's token counter accepts it.
///
/// Pages are dropped from the end of `pages`, so the site's front page (the
/// caller puts it first) is the last content to go. A counter failure is
/// treated as "over budget" and shrinks the prompt too; once no pages remain
/// the metadata-only marker prompt is returned without another counter call.
/// Never fails.
pub async fn negotiate(
    ctx: &PromptContext<'_>,
    pages: &[PageContent],
    ceiling: u64,
    model: &dyn GenerativeModel,
) -> NegotiatedPrompt {
    let mut remaining = pages.len();
    let mut counter_calls = 0;

    loop {
        let text = render(ctx, &pages[..remaining]);
        counter_calls += 1;

        match model.count_tokens(&text).await {
            Ok(tokens) if tokens <= ceiling => {
                debug!(tokens, pages = remaining, counter_calls, "prompt fits");
                return NegotiatedPrompt {
                    text,
                    pages_included: remaining,
                    counter_calls,
                };
            }
            Ok(tokens) => {
                warn!(tokens, ceiling, pages = remaining, "prompt over budget, dropping a page");
            }
            Err(e) => {
                warn!(error = %e, pages = remaining, "token count failed, dropping a page");
            }
        }

        if remaining == 0 {
            warn!("token ceiling exceeded even with no page content");
            return NegotiatedPrompt {
                text: render_marker(ctx),
                pages_included: 0,
                counter_calls,
            };
        }
        remaining -= 1;
    }
}
