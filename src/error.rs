//! Error types for the resume-match library.
//!
//! Three layers fail in three different ways:
//!
//! * [`MatchError`] — **Fatal**: the comparison cannot start or finish
//!   (no document, pdfium missing, unreadable PDF, provider not configured,
//!   or a reply that does not fit the metric schema).
//!
//! * [`StageFailure`] — one of the three model calls failed. The orchestrator
//!   never propagates it with `?`; it is the payload of
//!   [`crate::orchestrator::MatchOutcome::Failure`] so callers branch on the
//!   variant instead of sniffing reply text.
//!
//! * [`ResponseFormatError`] — the final reply could not be parsed into a
//!   [`crate::output::MatchResult`]. It keeps the raw text for diagnosis.

use crate::orchestrator::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume-match library.
#[derive(Debug, Error)]
pub enum MatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No document (or an empty one) was supplied.
    #[error("No {what} supplied. Please provide a résumé PDF to get a match.")]
    MissingInput { what: String },

    /// Input file was not found at the given path.
    #[error("Résumé file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The rasterisation engine could not be located or loaded.
    #[error(
        "PDF rendering engine unavailable: {0}\n\n\
Please contact support if this happens on a deployed instance. Otherwise:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Run `resume-match --fetch-pdfium` to download it into the cache.\n"
    )]
    PdfBackendUnavailable(String),

    /// The bytes are not a valid or parseable PDF document.
    #[error("Not a valid PDF document: {detail}")]
    MalformedDocument { detail: String },

    /// The rendered page could not be encoded as JPEG.
    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// One of the three model calls failed.
    #[error("{0}")]
    Stage(StageFailure),

    /// The comparison reply is not the expected JSON shape.
    #[error(transparent)]
    ResponseFormat(#[from] ResponseFormatError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed pipeline stage and the capability's error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", .stage.failure_prefix())]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// The `{"error": "..."}` payload used on the JSON output surface.
    pub fn to_error_payload(&self) -> String {
        serde_json::json!({ "error": self.to_string() }).to_string()
    }
}

/// The final reply could not be turned into a [`crate::output::MatchResult`].
#[derive(Debug, Clone, Error)]
#[error("Could not parse the model's response ({detail}). The model may have returned an unexpected format; please try again.")]
pub struct ResponseFormatError {
    pub detail: String,
    /// Raw reply, kept for diagnostic display.
    pub raw: String,
}

/// Error returned by a text or vision capability call.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
