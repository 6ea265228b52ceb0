//! Configuration for a résumé comparison.
//!
//! Everything the pipeline needs from its environment lives in
//! [`MatchConfig`]: which providers and models to call, how to render the
//! résumé, and where pdfium is. It is built once at process entry (the CLI
//! maps flags onto the builder, then calls
//! [`MatchConfigBuilder::provider_from_env`]) and then only borrowed. No
//! other module reads the environment.

use crate::error::MatchError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use pdfium_backend::BackendLocator;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model for both stages when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Provider override, honoured only together with [`MODEL_ENV`].
pub const PROVIDER_ENV: &str = "RESUME_MATCH_PROVIDER";
/// Model override, honoured only together with [`PROVIDER_ENV`].
pub const MODEL_ENV: &str = "RESUME_MATCH_MODEL";
/// Either of these selects Gemini when nothing else names a provider.
pub const GEMINI_KEY_ENV: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Configuration for one or many comparisons.
///
/// # Example
/// ```rust
/// use resume_match::MatchConfig;
///
/// let config = MatchConfig::builder()
///     .provider_name("gemini")
///     .text_model("gemini-2.0-flash")
///     .vision_model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MatchConfig {
    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None and no pre-built provider is set, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Model for the two text-only stages (job facts, comparison).
    pub text_model: Option<String>,

    /// Model for the résumé stage; must accept image input.
    pub vision_model: Option<String>,

    /// Pre-constructed provider for the text stages. Takes precedence over
    /// `provider_name`.
    pub text_provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed provider for the vision stage. Falls back to
    /// `text_provider` when only that one is given.
    pub vision_provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1, so repeated runs score alike.
    pub temperature: f32,

    /// Maximum tokens per model reply. Default: 2048.
    pub max_tokens: usize,

    /// Where to find pdfium. Default: cache dir, then system library.
    pub pdfium: BackendLocator,

    /// Cap on the longest rendered edge in pixels. Default: None, which keeps
    /// the rasteriser's own default resolution.
    pub max_rendered_pixels: Option<u32>,

    /// JPEG quality, 1–100. Default: 75.
    pub jpeg_quality: u8,

    /// Download timeout for URL résumé sources in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            text_model: None,
            vision_model: None,
            text_provider: None,
            vision_provider: None,
            temperature: 0.1,
            max_tokens: 2048,
            pdfium: BackendLocator::default(),
            max_rendered_pixels: None,
            jpeg_quality: 75,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchConfig")
            .field("provider_name", &self.provider_name)
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field(
                "text_provider",
                &self.text_provider.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .field(
                "vision_provider",
                &self.vision_provider.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pdfium", &self.pdfium)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl MatchConfig {
    pub fn builder() -> MatchConfigBuilder {
        MatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus everything the process environment selects: the
    /// provider (see [`MatchConfigBuilder::provider_from_env`]) and the
    /// pdfium location (`PDFIUM_LIB_PATH`, `PDFIUM_CACHE_DIR`).
    pub fn from_env() -> Result<Self, MatchError> {
        Self::builder()
            .pdfium(BackendLocator::from_env())
            .provider_from_env()
            .build()
    }
}

/// Builder for [`MatchConfig`].
pub struct MatchConfigBuilder {
    config: MatchConfig,
}

impl MatchConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = Some(model.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    pub fn text_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.text_provider = Some(provider);
        self
    }

    pub fn vision_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.vision_provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn pdfium(mut self, locator: BackendLocator) -> Self {
        self.config.pdfium = locator;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium = self.config.pdfium.with_library_path(path);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = Some(px.max(100));
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Fill in the provider from the environment when none is set yet.
    ///
    /// `RESUME_MATCH_PROVIDER` + `RESUME_MATCH_MODEL` (both non-empty) name
    /// the provider and text model; otherwise a Gemini key selects
    /// `"gemini"`. Explicit names and pre-built providers are never replaced.
    pub fn provider_from_env(self) -> Self {
        self.provider_from_vars(|k| std::env::var(k).ok())
    }

    fn provider_from_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let c = &mut self.config;
        if c.provider_name.is_some() || c.text_provider.is_some() || c.vision_provider.is_some() {
            return self;
        }
        let set = |k: &str| var(k).filter(|v| !v.trim().is_empty());

        if let (Some(provider), Some(model)) = (set(PROVIDER_ENV), set(MODEL_ENV)) {
            c.provider_name = Some(provider);
            c.text_model.get_or_insert(model);
        } else if GEMINI_KEY_ENV.iter().any(|k| set(k).is_some()) {
            c.provider_name = Some("gemini".to_string());
        }
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MatchConfig, MatchError> {
        let c = &self.config;
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(MatchError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_tokens == 0 {
            return Err(MatchError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        for (what, model) in [("text", &c.text_model), ("vision", &c.vision_model)] {
            if model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(MatchError::InvalidConfig(format!(
                    "{what} model name must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn provider_pair_from_env() {
        let c = MatchConfig::builder()
            .provider_from_vars(vars(&[
                (PROVIDER_ENV, "openai"),
                (MODEL_ENV, "gpt-4.1-mini"),
                ("GEMINI_API_KEY", "k"),
            ]))
            .build()
            .unwrap();
        assert_eq!(c.provider_name.as_deref(), Some("openai"));
        assert_eq!(c.text_model.as_deref(), Some("gpt-4.1-mini"));
    }

    #[test]
    fn provider_without_model_falls_back_to_gemini_key() {
        let c = MatchConfig::builder()
            .provider_from_vars(vars(&[(PROVIDER_ENV, "openai"), ("GOOGLE_API_KEY", "k")]))
            .build()
            .unwrap();
        assert_eq!(c.provider_name.as_deref(), Some("gemini"));
        assert!(c.text_model.is_none());
    }

    #[test]
    fn explicit_provider_and_model_win_over_env() {
        let c = MatchConfig::builder()
            .provider_name("anthropic")
            .provider_from_vars(vars(&[(PROVIDER_ENV, "openai"), (MODEL_ENV, "gpt-4.1")]))
            .build()
            .unwrap();
        assert_eq!(c.provider_name.as_deref(), Some("anthropic"));
        assert!(c.text_model.is_none());

        let c = MatchConfig::builder()
            .text_model("gpt-4o")
            .provider_from_vars(vars(&[(PROVIDER_ENV, "openai"), (MODEL_ENV, "gpt-4.1")]))
            .build()
            .unwrap();
        assert_eq!(c.provider_name.as_deref(), Some("openai"));
        assert_eq!(c.text_model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn empty_env_leaves_provider_unset() {
        let c = MatchConfig::builder()
            .provider_from_vars(vars(&[("GEMINI_API_KEY", "  ")]))
            .build()
            .unwrap();
        assert!(c.provider_name.is_none());
    }

    #[test]
    fn defaults() {
        let c = MatchConfig::default();
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 2048);
        assert_eq!(c.jpeg_quality, 75);
        assert!(c.max_rendered_pixels.is_none());
        assert!(c.provider_name.is_none());
    }

    #[test]
    fn builder_clamps_temperature_and_pixels() {
        let c = MatchConfig::builder()
            .temperature(9.0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, Some(100));
    }

    #[test]
    fn builder_rejects_zero_quality() {
        let err = MatchConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(matches!(err, MatchError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_model() {
        let err = MatchConfig::builder().vision_model("  ").build().unwrap_err();
        assert!(err.to_string().contains("vision"), "got: {err}");
    }

    #[test]
    fn debug_hides_providers() {
        let s = format!("{:?}", MatchConfig::default());
        assert!(s.contains("MatchConfig"));
        assert!(s.contains("jpeg_quality"));
    }
}
