//! Core domain types for the listscribe enrichment pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrganizationRecord
// ---------------------------------------------------------------------------

/// One organization's row from the input dataset.
///
/// `listing_title` is the record's identity and is assumed unique within a
/// run. Columns the pipeline does not know about are preserved verbatim via
/// the flattened `extra` map so a round-trip through the tool never loses
/// dataset fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRecord {
    /// Display name; also the key for the record's backing file.
    pub listing_title: String,

    /// Organization website, possibly without a scheme. Absent for
    /// listings that never provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// AI-generated long-form HTML description (populated by this pipeline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,

    /// AI-generated short plain-text excerpt (populated by this pipeline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_excerpt: Option<String>,

    /// Any other dataset columns, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

/// A work-list entry owned by the batch scheduler.
///
/// Created once per record at run start and never deleted; the terminal
/// state is `processed = true` whether the record succeeded or failed.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// The organization record being enriched.
    pub record: OrganizationRecord,
    /// Position in the input dataset, preserved in the output.
    pub index: usize,
    /// Set exactly once when a processing attempt completes.
    pub processed: bool,
}

impl QueueItem {
    /// Wrap a dataset record as an unprocessed queue item.
    pub fn new(record: OrganizationRecord, index: usize) -> Self {
        Self {
            record,
            index,
            processed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// PageContent
// ---------------------------------------------------------------------------

/// Visible text extracted from one visited page.
///
/// Ephemeral: owned by a single record-processing invocation and discarded
/// once the prompt is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// The page the text came from.
    pub url: String,
    /// Collapsed visible body text (may be empty for degraded pages).
    pub body_text: String,
}

// ---------------------------------------------------------------------------
// FailureRecord
// ---------------------------------------------------------------------------

/// One failed record, kept for end-of-run reporting.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub listing_title: String,
    pub website: Option<String>,
    pub error: String,
}

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// The kind of text the pipeline generates for each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Long-form, SEO-oriented HTML description.
    Description,
    /// Short plain-text excerpt (≤ 55 words).
    Excerpt,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Excerpt => "excerpt",
        }
    }

    /// Subdirectory under the output root holding this task's backing files.
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::Description => "descriptions",
            Self::Excerpt => "excerpts",
        }
    }

    /// Backing-file extension for this task's output.
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Description => "html",
            Self::Excerpt => "txt",
        }
    }

    /// Read this task's generated field from a record.
    pub fn generated_text<'a>(&self, record: &'a OrganizationRecord) -> Option<&'a str> {
        match self {
            Self::Description => record.ai_description.as_deref(),
            Self::Excerpt => record.ai_excerpt.as_deref(),
        }
    }

    /// Write this task's generated field into a record.
    pub fn set_generated_text(&self, record: &mut OrganizationRecord, text: String) {
        match self {
            Self::Description => record.ai_description = Some(text),
            Self::Excerpt => record.ai_excerpt = Some(text),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "description" => Ok(Self::Description),
            "excerpt" => Ok(Self::Excerpt),
            other => Err(format!(
                "unknown task '{other}': expected 'description' or 'excerpt'"
            )),
        }
    }
}
