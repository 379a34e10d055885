//! Per-record enrichment: crawl, negotiate, generate, persist.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};

use listscribe_crawler::{Fetcher, body_text, extract_body_text, extract_links};
use listscribe_genai::GenerativeModel;
use listscribe_shared::{
    ListscribeError, OrganizationRecord, PageContent, PipelineConfig, Result, TaskKind,
};

use crate::dataset::{backing_file_path, strip_code_fences};
use crate::prioritizer;
use crate::prompt::{self, PromptContext};

// ---------------------------------------------------------------------------
// Context and outcomes
// ---------------------------------------------------------------------------

/// Shared, immutable dependencies for processing records. One instance is
/// built per run and handed to every worker task behind an `Arc`.
pub struct ProcessorContext {
    pub fetcher: Fetcher,
    pub model: Arc<dyn GenerativeModel>,
    pub config: PipelineConfig,
    pub task: TaskKind,
    pub output_dir: PathBuf,
}

/// How a record's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from an existing backing file, no network or model calls.
    Cached,
    /// Freshly generated this run.
    Generated,
}

/// Result of processing one record.
#[derive(Debug)]
pub struct ProcessedRecord {
    pub text: String,
    pub outcome: Outcome,
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

/// Enrich one record: reuse its backing file if present, otherwise crawl the
/// site, negotiate a prompt, generate text, and write the backing file.
///
/// Failure policy: a failed front-page fetch or generation call fails the
/// record; a failed fetch of an individual prioritized page degrades to empty
/// text; a failed prioritization degrades to "front page only".
#[instrument(skip_all, fields(title = %record.listing_title))]
pub async fn process_record(
    ctx: &ProcessorContext,
    record: &OrganizationRecord,
) -> Result<ProcessedRecord> {
    let backing_file = backing_file_path(&ctx.output_dir, ctx.task, &record.listing_title);

    if backing_file.exists() {
        let raw = std::fs::read_to_string(&backing_file)
            .map_err(|e| ListscribeError::io(&backing_file, e))?;
        let text = strip_code_fences(&raw);
        // Rewrite so files generated before fence stripping get repaired.
        if text != raw {
            std::fs::write(&backing_file, &text)
                .map_err(|e| ListscribeError::io(&backing_file, e))?;
        }
        info!(path = %backing_file.display(), "reusing existing backing file");
        return Ok(ProcessedRecord {
            text,
            outcome: Outcome::Cached,
        });
    }

    let pages = collect_pages(ctx, record).await?;

    let prompt_ctx = PromptContext {
        record,
        task: ctx.task,
        directory_name: ctx.config.directory_name.as_deref(),
        directory_url: ctx.config.directory_url.as_deref(),
    };
    let negotiated =
        prompt::negotiate(&prompt_ctx, &pages, ctx.config.token_ceiling, ctx.model.as_ref()).await;
    info!(
        pages = negotiated.pages_included,
        counter_calls = negotiated.counter_calls,
        "prompt negotiated"
    );

    let generated = ctx.model.generate_content(&negotiated.text).await?;
    let text = strip_code_fences(&generated);

    if let Some(parent) = backing_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ListscribeError::io(parent, e))?;
    }
    std::fs::write(&backing_file, &text).map_err(|e| ListscribeError::io(&backing_file, e))?;
    info!(path = %backing_file.display(), chars = text.len(), "backing file written");

    Ok(ProcessedRecord {
        text,
        outcome: Outcome::Generated,
    })
}

/// Crawl the record's site into page texts: the front page first, then any
/// AI-prioritized pages. Records without a website yield no pages and the
/// prompt falls back to metadata only.
async fn collect_pages(
    ctx: &ProcessorContext,
    record: &OrganizationRecord,
) -> Result<Vec<PageContent>> {
    let Some(website) = record.website.as_deref().filter(|w| !w.is_empty()) else {
        info!("record has no website, generating from metadata only");
        return Ok(Vec::new());
    };

    // Front-page failure is record-fatal: with no reachable site there is
    // nothing trustworthy to describe.
    let (front_url, front_html) = ctx.fetcher.fetch_raw(website).await?;

    let candidates = extract_links(&front_html, &front_url);
    info!(links = candidates.len(), "links found on front page");

    let priority_links = prioritizer::prioritize(
        Some(website),
        &candidates,
        ctx.config.max_priority_links,
        ctx.model.as_ref(),
    )
    .await
    .unwrap_or_else(|e| {
        warn!(error = %e, "link prioritization failed, continuing with front page only");
        Vec::new()
    });
    info!(selected = priority_links.len(), "priority links selected");

    let mut pages = vec![PageContent {
        url: website.to_string(),
        body_text: body_text(&front_html),
    }];

    let fetches = priority_links.iter().map(|link| async move {
        let text = match extract_body_text(&ctx.fetcher, link.as_str()).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %link, error = %e, "page fetch failed, using empty text");
                String::new()
            }
        };
        PageContent {
            url: link.to_string(),
            body_text: text,
        }
    });
    pages.extend(join_all(fetches).await);

    Ok(pages)
}
