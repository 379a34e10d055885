//! Page fetching and content extraction for listscribe.
//!
//! This crate provides:
//! - [`Fetcher`] — HTTP fetcher with an explicit transport policy
//! - [`extract_links`] — anchor extraction with self-link exclusion
//! - [`extract_body_text`] — visible-text extraction with scheme short-circuits

pub mod fetch;
pub mod links;
pub mod text;

pub use fetch::{FetchOptions, Fetcher};
pub use links::extract_links;
pub use text::{body_text, extract_body_text};
