//! Entry points: wire config, renderer and orchestrator together.
//!
//! A [`MatchSession`] is built once at process start from a
//! [`MatchConfig`]. Building it resolves the LLM providers from the config
//! fields; after that the session is read-only and can serve any number of
//! comparisons.

use crate::config::{MatchConfig, DEFAULT_MODEL};
use crate::error::MatchError;
use crate::orchestrator::{MatchOrchestrator, MatchOutcome};
use crate::output::{DocumentImagePart, MatchReport};
use crate::pipeline::input::DocumentSource;
use crate::pipeline::llm::{LlmCapability, TextGeneration, VisionGeneration};
use crate::pipeline::render::PdfPageRenderer;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{info, warn};

/// A configured renderer plus orchestrator.
pub struct MatchSession {
    config: MatchConfig,
    renderer: PdfPageRenderer,
    orchestrator: MatchOrchestrator,
}

impl MatchSession {
    /// Resolve providers from the config.
    pub fn new(config: MatchConfig) -> Result<Self, MatchError> {
        let (text, vision) = resolve_providers(&config)?;
        let text: Arc<dyn TextGeneration> = Arc::new(LlmCapability::new(text, &config));
        let vision: Arc<dyn VisionGeneration> = Arc::new(LlmCapability::new(vision, &config));
        Ok(Self::with_capabilities(config, text, vision))
    }

    /// Use caller-supplied capabilities instead of LLM providers.
    pub fn with_capabilities(
        config: MatchConfig,
        text: Arc<dyn TextGeneration>,
        vision: Arc<dyn VisionGeneration>,
    ) -> Self {
        let orchestrator =
            MatchOrchestrator::new(text, vision).with_progress(config.progress_callback.clone());
        Self {
            renderer: PdfPageRenderer::new(&config),
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn renderer(&self) -> &PdfPageRenderer {
        &self.renderer
    }

    pub fn orchestrator(&self) -> &MatchOrchestrator {
        &self.orchestrator
    }

    /// Load the résumé and render its first page.
    pub async fn render(&self, source: &DocumentSource) -> Result<DocumentImagePart, MatchError> {
        info!("Loading résumé: {}", source.describe());
        let bytes = source.load(self.config.download_timeout_secs).await?;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_render_start();
        }
        let part = self.renderer.render_first_page(&bytes).await?;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_render_complete(part.byte_len());
        }
        Ok(part)
    }

    /// Render, run the three stages, and return the tagged outcome without
    /// validating the final reply. Rendering errors are returned as `Err`.
    pub async fn compare_raw(
        &self,
        source: &DocumentSource,
        job_description: &str,
    ) -> Result<MatchOutcome, MatchError> {
        warn_if_blank(job_description);
        let resume = self.render(source).await?;
        Ok(self.orchestrator.compute_match(job_description, &resume).await)
    }

    /// Render, run the three stages, and parse the reply into metrics.
    pub async fn compare(
        &self,
        source: &DocumentSource,
        job_description: &str,
    ) -> Result<MatchReport, MatchError> {
        warn_if_blank(job_description);
        let resume = self.render(source).await?;
        self.orchestrator.evaluate(job_description, &resume).await
    }
}

/// One-shot comparison: build a session, compare, drop it.
///
/// ```rust,no_run
/// use resume_match::{match_resume, DocumentSource, MatchConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = match_resume(
///     &DocumentSource::parse("cv.pdf"),
///     "Senior Backend Engineer, Go, Kubernetes",
///     &MatchConfig::default(),
/// )
/// .await?;
/// for m in &report.metrics {
///     println!("{}: {}", m.label, m.value);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn match_resume(
    source: &DocumentSource,
    job_description: &str,
    config: &MatchConfig,
) -> Result<MatchReport, MatchError> {
    MatchSession::new(config.clone())?
        .compare(source, job_description)
        .await
}

/// Synchronous wrapper around [`match_resume`].
///
/// Creates a temporary tokio runtime internally.
pub fn match_resume_sync(
    source: &DocumentSource,
    job_description: &str,
    config: &MatchConfig,
) -> Result<MatchReport, MatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(match_resume(source, job_description, config))
}

fn warn_if_blank(job_description: &str) {
    if job_description.trim().is_empty() {
        warn!("Job description is empty; scores will be meaningless");
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// (text, vision)
type ProviderPair = (Arc<dyn LLMProvider>, Arc<dyn LLMProvider>);

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, MatchError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        MatchError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Build the (text, vision) provider pair, most specific source first:
///
/// 1. **Pre-built providers** on the config. A lone one serves both roles.
/// 2. **Named provider** (`provider_name`) with `text_model` / `vision_model`;
///    the vision model defaults to the text model, which defaults to
///    [`DEFAULT_MODEL`].
/// 3. **Auto-detection** via `ProviderFactory::from_env`, which picks
///    whichever provider has an API key configured.
///
/// Environment-derived choices are made earlier, by
/// [`crate::config::MatchConfigBuilder::provider_from_env`].
fn resolve_providers(config: &MatchConfig) -> Result<ProviderPair, MatchError> {
    match (&config.text_provider, &config.vision_provider) {
        (Some(t), Some(v)) => return Ok((Arc::clone(t), Arc::clone(v))),
        (Some(p), None) | (None, Some(p)) => return Ok((Arc::clone(p), Arc::clone(p))),
        (None, None) => {}
    }

    if let Some(ref name) = config.provider_name {
        let text_model = config.text_model.as_deref().unwrap_or(DEFAULT_MODEL);
        let vision_model = config.vision_model.as_deref().unwrap_or(text_model);
        info!("Using provider '{name}' (text: {text_model}, vision: {vision_model})");
        return Ok((
            create_provider(name, text_model)?,
            create_provider(name, vision_model)?,
        ));
    }

    if config.text_model.is_some() || config.vision_model.is_some() {
        warn!("Model names are ignored when the provider is auto-detected; pass a provider name too");
    }
    let (llm, _embedding) =
        ProviderFactory::from_env().map_err(|e| MatchError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY (or GOOGLE_API_KEY), OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;
    Ok((Arc::clone(&llm), llm))
}
