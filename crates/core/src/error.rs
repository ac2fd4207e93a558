//! Error types for Gleaner operations.
//!
//! The extraction and reconciliation operations never fail on page content:
//! absence and malformed payloads degrade to empty results. [`GleanerError`]
//! covers the edges around them: fetching pages, reading files, parsing site
//! profiles, and the page collaborator's own failures.
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::{GleanerError, Result};
//!
//! fn load_page(html: &str) -> Result<String> {
//!     if html.is_empty() {
//!         return Err(GleanerError::EvaluationError("empty page".to_string()));
//!     }
//!     Ok(html.to_string())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Gleaner.
#[derive(Error, Debug)]
pub enum GleanerError {
    /// HTTP request errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid CSS selector or unparsable markup.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// A page-script evaluation could not produce a value.
    ///
    /// Raised by [`crate::page::Page::evaluate`] implementations when the
    /// requested binding does not exist or its payload is not valid JSON.
    #[error("Evaluation failed: {0}")]
    EvaluationError(String),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Site profile errors.
    ///
    /// Returned when parsing a site profile file fails.
    #[error("Site profile error: {0}")]
    ProfileError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),
}

/// Result type alias for GleanerError.
pub type Result<T> = std::result::Result<T, GleanerError>;
