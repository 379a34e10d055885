//! Shared types, error model, and configuration for listscribe.
//!
//! This crate is the foundation depended on by all other listscribe crates.
//! It provides:
//! - [`ListscribeError`] — the unified error type
//! - Domain types ([`OrganizationRecord`], [`QueueItem`], [`PageContent`], [`TaskKind`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DirectoryConfig, GeminiConfig, PipelineConfig, TlsMode,
    TransportConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{ListscribeError, Result};
pub use types::{FailureRecord, OrganizationRecord, PageContent, QueueItem, TaskKind};
