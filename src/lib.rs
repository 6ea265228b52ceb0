//! # resume-match
//!
//! Score how well a PDF résumé fits a job description, using a text model
//! and a vision model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! résumé PDF ─┬─ 1. Input    local file, URL download, or uploaded bytes
//!             ├─ 2. Render   page 1 only, via pdfium (spawn_blocking)
//!             └─ 3. Encode   JPEG → base64 image part
//!
//! job text ───┬─ 4. JobFacts     text model: title + keywords
//! image ──────┼─ 5. ResumeFacts  vision model: title + keywords
//!             ├─ 6. Compare      text model: three scores as JSON
//!             └─ 7. Parse        typed MatchResult + display metrics
//! ```
//!
//! The three model calls run strictly in sequence and the first failure ends
//! the run with a stage-specific message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_match::{DocumentSource, MatchConfig, MatchSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider chosen from RESUME_MATCH_PROVIDER / GEMINI_API_KEY / OPENAI_API_KEY / ...
//!     let session = MatchSession::new(MatchConfig::from_env()?)?;
//!     let report = session
//!         .compare(&DocumentSource::parse("cv.pdf"), "Staff Data Engineer, Spark, Airflow")
//!         .await?;
//!     for m in &report.metrics {
//!         println!("{:<24} {:>6} {}", m.label, m.value, m.delta.as_deref().unwrap_or(""));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume-match` binary (clap + anyhow + tracing-subscriber) |
//! | `fetch` | on      | Lets the CLI download the pdfium library into the user cache |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MatchConfig, MatchConfigBuilder, DEFAULT_MODEL};
pub use error::{CapabilityError, MatchError, ResponseFormatError, StageFailure};
pub use orchestrator::{MatchOrchestrator, MatchOutcome, Stage};
pub use output::{DocumentImagePart, MatchReport, MatchResult, Metric};
pub use pipeline::input::DocumentSource;
pub use pipeline::llm::{LlmCapability, TextGeneration, VisionGeneration};
pub use pipeline::render::PdfPageRenderer;
pub use pipeline::response::parse_match_result;
pub use progress::{MatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{match_resume, match_resume_sync, MatchSession};

pub use pdfium_backend::BackendLocator;
