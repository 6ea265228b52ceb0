//! Progress-callback trait for comparison events.
//!
//! Inject an [`Arc<dyn MatchProgressCallback>`] via
//! [`crate::config::MatchConfigBuilder::progress_callback`] to be told when
//! the résumé is rendered and when each model stage starts and finishes.
//! The CLI uses it to drive a spinner; a web front-end could forward the same
//! events to a socket.
//!
//! # Example
//!
//! ```rust
//! use resume_match::{MatchConfig, MatchProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl MatchProgressCallback for Log {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {}", stage.label());
//!     }
//! }
//!
//! let config = MatchConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn MatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::orchestrator::Stage;
use std::sync::Arc;

/// Receives pipeline events. Every method defaults to a no-op.
pub trait MatchProgressCallback: Send + Sync {
    /// Rasterisation of page 1 is about to start.
    fn on_render_start(&self) {}

    /// Page 1 was rendered; `jpeg_bytes` is the encoded size.
    fn on_render_complete(&self, jpeg_bytes: usize) {
        let _ = jpeg_bytes;
    }

    /// A model call is about to be issued.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A model call returned; `reply_chars` is the normalised reply length.
    fn on_stage_complete(&self, stage: Stage, reply_chars: usize) {
        let _ = (stage, reply_chars);
    }

    /// A model call failed; no later stage will run.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// Used when no callback is configured.
pub struct NoopProgressCallback;

impl MatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MatchConfig`].
pub type ProgressCallback = Arc<dyn MatchProgressCallback>;
