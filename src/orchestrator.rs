//! The three-stage comparison pipeline.
//!
//! ```text
//! START ─▶ JobFacts (text) ─▶ ResumeFacts (vision) ─▶ Compare (text) ─▶ Success(raw)
//!              │                   │                      │
//!              └──────────────┬────┴──────────────────────┘
//!                             ▼
//!                   Failure(stage, message)
//! ```
//!
//! Stages run strictly one after another; each issues exactly one capability
//! call and each reply has its newline characters removed before it is used.
//! The first failing stage ends the run: later capabilities are never called.
//!
//! [`MatchOrchestrator::compute_match`] returns the tagged [`MatchOutcome`];
//! [`MatchOrchestrator::evaluate`] additionally pushes a successful reply
//! through [`crate::pipeline::response::parse_match_result`].

use crate::error::{CapabilityError, MatchError, StageFailure};
use crate::output::{DocumentImagePart, MatchReport};
use crate::pipeline::llm::{TextGeneration, VisionGeneration};
use crate::pipeline::response;
use crate::progress::ProgressCallback;
use crate::prompts;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Extract title and keywords from the job description (text call).
    JobFacts,
    /// Extract title and keywords from the résumé image (vision call).
    ResumeFacts,
    /// Score the two extractions against each other (text call).
    Compare,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::JobFacts, Stage::ResumeFacts, Stage::Compare];

    /// Short name for progress output.
    pub fn label(self) -> &'static str {
        match self {
            Stage::JobFacts => "job description",
            Stage::ResumeFacts => "résumé",
            Stage::Compare => "comparison",
        }
    }

    /// Leading words of the user-facing failure message.
    pub fn failure_prefix(self) -> &'static str {
        match self {
            Stage::JobFacts => "Failed to process job description",
            Stage::ResumeFacts => "Failed to process resume",
            Stage::Compare => "Failed to compare job and resume",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of [`MatchOrchestrator::compute_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Reply of the comparison stage, newlines removed, not yet validated.
    Success(String),
    /// The stage that failed and why. No later stage ran.
    Failure(StageFailure),
}

impl MatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MatchOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<String, StageFailure> {
        match self {
            MatchOutcome::Success(raw) => Ok(raw),
            MatchOutcome::Failure(f) => Err(f),
        }
    }

    /// Single-string form: the raw reply, or `{"error": "..."}` on failure.
    pub fn to_payload(&self) -> String {
        match self {
            MatchOutcome::Success(raw) => raw.clone(),
            MatchOutcome::Failure(f) => f.to_error_payload(),
        }
    }
}

/// Drives the three stages against a text and a vision capability.
pub struct MatchOrchestrator {
    text: Arc<dyn TextGeneration>,
    vision: Arc<dyn VisionGeneration>,
    progress: Option<ProgressCallback>,
}

impl MatchOrchestrator {
    pub fn new(text: Arc<dyn TextGeneration>, vision: Arc<dyn VisionGeneration>) -> Self {
        Self {
            text,
            vision,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the pipeline and return the raw comparison reply or the failing stage.
    pub async fn compute_match(
        &self,
        job_description: &str,
        resume: &DocumentImagePart,
    ) -> MatchOutcome {
        let job_prompt = prompts::job_facts_prompt(job_description);
        let job_facts = match self
            .run_stage(Stage::JobFacts, self.text.generate(&job_prompt))
            .await
        {
            Ok(text) => text,
            Err(f) => return MatchOutcome::Failure(f),
        };

        let resume_facts = match self
            .run_stage(
                Stage::ResumeFacts,
                self.vision
                    .generate_with_image(prompts::RESUME_FACTS_PROMPT, resume),
            )
            .await
        {
            Ok(text) => text,
            Err(f) => return MatchOutcome::Failure(f),
        };

        let compare_prompt = prompts::compare_prompt(&job_facts, &resume_facts);
        match self
            .run_stage(Stage::Compare, self.text.generate(&compare_prompt))
            .await
        {
            Ok(raw) => MatchOutcome::Success(raw),
            Err(f) => MatchOutcome::Failure(f),
        }
    }

    /// [`compute_match`](Self::compute_match) followed by reply validation.
    pub async fn evaluate(
        &self,
        job_description: &str,
        resume: &DocumentImagePart,
    ) -> Result<MatchReport, MatchError> {
        let start = Instant::now();
        let raw = self
            .compute_match(job_description, resume)
            .await
            .into_result()
            .map_err(MatchError::Stage)?;

        let result = response::parse_match_result(&raw).map_err(|e| {
            warn!("Comparison reply did not parse: {}", e.detail);
            e
        })?;
        for (name, v) in [
            ("designation", result.designation_match),
            ("keyword", result.keyword_match),
            ("final", result.final_match),
        ] {
            if !(0.0..=100.0).contains(&v) {
                warn!("{name} match {v} is outside 0–100; showing it unchanged");
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Match complete: designation {}%, keywords {}%, final {}% in {}ms",
            result.designation_match, result.keyword_match, result.final_match, duration_ms
        );
        Ok(MatchReport::new(result, raw, duration_ms))
    }

    async fn run_stage(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<String, CapabilityError>>,
    ) -> Result<String, StageFailure> {
        info!("Stage {}: calling model", stage);
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage);
        }

        match call.await {
            Ok(reply) => {
                let reply = strip_newlines(&reply);
                debug!("Stage {}: {} chars", stage, reply.len());
                if let Some(ref cb) = self.progress {
                    cb.on_stage_complete(stage, reply.chars().count());
                }
                Ok(reply)
            }
            Err(e) => {
                warn!("Stage {} failed: {}", stage, e);
                let failure = StageFailure::new(stage, e.to_string());
                if let Some(ref cb) = self.progress {
                    cb.on_stage_error(stage, &failure.to_string());
                }
                Err(failure)
            }
        }
    }
}

/// Remove line breaks from a model reply. Other whitespace is kept.
pub fn strip_newlines(reply: &str) -> String {
    reply.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}
