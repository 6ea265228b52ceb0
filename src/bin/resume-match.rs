//! CLI binary for resume-match.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `MatchConfig` and prints the three metrics.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume_match::{
    BackendLocator, DocumentSource, MatchConfig, MatchError, MatchProgressCallback, MatchReport,
    MatchSession, PdfPageRenderer, ProgressCallback, Stage,
};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per finished step.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading résumé…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn mark_start(&self) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl MatchProgressCallback for CliProgressCallback {
    fn on_render_start(&self) {
        self.mark_start();
        self.bar.set_prefix("Rendering");
        self.bar.set_message("page 1");
    }

    fn on_render_complete(&self, jpeg_bytes: usize) {
        self.bar.println(format!(
            "  {} Rendered page 1  {}  {}",
            green("✓"),
            dim(&format!("{:>5} KB", jpeg_bytes / 1024)),
            self.elapsed(),
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.mark_start();
        let idx = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0) + 1;
        self.bar.set_prefix(format!("Stage {idx}/{}", Stage::ALL.len()));
        self.bar.set_message(format!("reading {}", stage.label()));
    }

    fn on_stage_complete(&self, stage: Stage, reply_chars: usize) {
        self.bar.println(format!(
            "  {} {:<16}  {}  {}",
            green("✓"),
            stage.label(),
            dim(&format!("{reply_chars:>5} chars")),
            self.elapsed(),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<16}  {}  {}",
            red("✗"),
            stage.label(),
            red(&msg),
            self.elapsed(),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Job description inline
  resume-match cv.pdf --job "Senior Rust engineer, tokio, gRPC, Kubernetes"

  # Job description from a file, or from stdin with '-'
  resume-match cv.pdf --job-file posting.txt
  pbpaste | resume-match cv.pdf --job-file -

  # Résumé from a URL, explicit provider and models
  resume-match https://example.com/cv.pdf --job-file posting.txt \
      --provider openai --model gpt-4.1-mini

  # Machine-readable output
  resume-match cv.pdf --job-file posting.txt --json

  # Check what the vision model will see (no API key needed)
  resume-match cv.pdf --render-only page1.jpg

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (GOOGLE_API_KEY also accepted)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  RESUME_MATCH_PROVIDER   Override provider (gemini, openai, anthropic, ollama)
  RESUME_MATCH_MODEL      Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  PDFIUM_CACHE_DIR        Override the pdfium cache directory

  A .env file in the working directory is loaded first.

SETUP:
  1. Set API key:     export GEMINI_API_KEY=...
  2. Get pdfium:      resume-match --fetch-pdfium   (or install it system-wide)
  3. Match:           resume-match cv.pdf --job-file posting.txt
"#;

/// Score a PDF résumé against a job description using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "resume-match",
    version,
    about = "Score a PDF résumé against a job description using LLMs",
    long_about = "Render page 1 of a résumé, extract title and keywords from it and from a job \
description, and ask a model to score designation match, semantic keyword match and an overall \
match. Supports Google Gemini, OpenAI, Anthropic, and any provider edgequake-llm knows.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Résumé PDF: local file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "fetch_pdfium")]
    resume: Option<String>,

    /// Job description text.
    #[arg(short, long, env = "RESUME_MATCH_JOB", conflicts_with = "job_file")]
    job: Option<String>,

    /// Read the job description from this file ('-' for stdin).
    #[arg(long, env = "RESUME_MATCH_JOB_FILE")]
    job_file: Option<PathBuf>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "RESUME_MATCH_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set \
          (Gemini first)."
    )]
    provider: Option<String>,

    /// Model for the two text stages (default: gemini-2.0-flash).
    #[arg(long, env = "RESUME_MATCH_MODEL")]
    model: Option<String>,

    /// Model for the résumé stage; must accept images. Defaults to --model.
    #[arg(long, env = "RESUME_MATCH_VISION_MODEL")]
    vision_model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUME_MATCH_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per stage.
    #[arg(long, env = "RESUME_MATCH_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// JPEG quality of the rendered page (1–100).
    #[arg(long, env = "RESUME_MATCH_JPEG_QUALITY", default_value_t = 75,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Cap the rendered page's longer edge at this many pixels.
    #[arg(long, env = "RESUME_MATCH_MAX_PIXELS")]
    max_pixels: Option<u32>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RESUME_MATCH_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to libpdfium; overrides PDFIUM_LIB_PATH and the cache.
    #[arg(long, env = "RESUME_MATCH_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Download pdfium into the cache directory, then continue.
    #[arg(long)]
    fetch_pdfium: bool,

    /// Write the rendered page 1 to this JPEG file and exit.
    #[arg(long, value_name = "JPEG")]
    render_only: Option<PathBuf>,

    /// Output structured JSON (MatchReport) instead of a table.
    #[arg(long, env = "RESUME_MATCH_JSON")]
    json: bool,

    /// Also print the comparison model's raw reply.
    #[arg(long)]
    show_raw: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "RESUME_MATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME_MATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "RESUME_MATCH_QUIET")]
    quiet: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    // The Gemini provider reads GEMINI_API_KEY; accept Google's name for it
    // too. Done before the runtime starts so no other thread reads the env.
    if std::env::var_os("GEMINI_API_KEY").is_none() {
        if let Some(key) = std::env::var_os("GOOGLE_API_KEY") {
            std::env::set_var("GEMINI_API_KEY", key);
        }
    }

    let cli = Cli::parse();
    init_logging(&cli);

    let mut locator = BackendLocator::from_env();
    if let Some(ref path) = cli.pdfium_lib {
        locator = locator.with_library_path(path);
    }

    // The download uses a blocking client, so it runs before the runtime exists.
    if cli.fetch_pdfium {
        if let Err(e) = fetch_pdfium(&locator, cli.quiet) {
            eprintln!("{} {e:#}", red("✘"));
            return ExitCode::FAILURE;
        }
        if cli.resume.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} Failed to start tokio runtime: {e}", red("✘"));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, locator)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", red("✘"));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    // Suppress INFO-level library logs when the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress(cli) {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn show_progress(cli: &Cli) -> bool {
    !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose
}

async fn run(cli: Cli, locator: BackendLocator) -> Result<ExitCode> {
    let Some(ref resume) = cli.resume else {
        anyhow::bail!("No résumé given");
    };
    let source = DocumentSource::parse(resume);

    // ── Render-only mode ─────────────────────────────────────────────────
    if let Some(ref out) = cli.render_only {
        let config = build_config(&cli, locator, None)?;
        let bytes = source
            .load(config.download_timeout_secs)
            .await
            .context("Failed to load résumé")?;
        let part = PdfPageRenderer::new(&config)
            .render_first_page(&bytes)
            .await
            .context("Failed to render page 1")?;
        let jpeg = part.decode().context("Rendered image is not valid base64")?;
        tokio::fs::write(out, &jpeg)
            .await
            .with_context(|| format!("Failed to write {}", out.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} page 1 → {}  {}",
                green("✔"),
                bold(&out.display().to_string()),
                dim(&format!("{} KB", jpeg.len() / 1024)),
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Build session ────────────────────────────────────────────────────
    let job = read_job_description(&cli).await?;
    let spinner = show_progress(&cli).then(CliProgressCallback::new);
    let progress = spinner
        .clone()
        .map(|cb| cb as Arc<dyn MatchProgressCallback>);
    let config = build_config(&cli, locator, progress)?;
    let session = MatchSession::new(config).context("Failed to configure LLM provider")?;

    // ── Run match ────────────────────────────────────────────────────────
    let result = session.compare(&source, &job).await;
    if let Some(ref cb) = spinner {
        cb.finish();
    }

    match result {
        Ok(report) => {
            print_report(&cli, &report)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(MatchError::Stage(failure)) => {
            if cli.json {
                println!("{}", failure.to_error_payload());
            }
            eprintln!("{} {}", red("✘"), failure);
            Ok(ExitCode::FAILURE)
        }
        Err(MatchError::ResponseFormat(e)) => {
            eprintln!("{} {}", red("✘"), e);
            eprintln!("{}", dim("raw model output:"));
            eprintln!("{}", e.raw);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Match failed"),
    }
}

/// Map CLI args to `MatchConfig`.
fn build_config(
    cli: &Cli,
    locator: BackendLocator,
    progress: Option<ProgressCallback>,
) -> Result<MatchConfig> {
    let mut builder = MatchConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .jpeg_quality(cli.jpeg_quality)
        .download_timeout_secs(cli.download_timeout)
        .pdfium(locator);

    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref m) = cli.model {
        builder = builder.text_model(m);
    }
    if let Some(ref m) = cli.vision_model {
        builder = builder.vision_model(m);
    }
    if let Some(px) = cli.max_pixels {
        builder = builder.max_rendered_pixels(px);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder
        .provider_from_env()
        .build()
        .context("Invalid configuration")
}

async fn read_job_description(cli: &Cli) -> Result<String> {
    let text = match (&cli.job, &cli.job_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) if path.as_os_str() == "-" => read_stdin()?,
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path))?,
        (None, None) if !io::stdin().is_terminal() => read_stdin()?,
        (None, None) => String::new(),
    };
    if text.trim().is_empty() && !cli.quiet {
        eprintln!(
            "{} Job description is empty; pass --job or --job-file",
            cyan("⚠")
        );
    }
    Ok(text)
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read job description from stdin")?;
    Ok(buf)
}

fn print_report(cli: &Cli, report: &MatchReport) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    for m in &report.metrics {
        let delta = match m.delta.as_deref() {
            Some(d) if d.starts_with('-') => red(d),
            Some(d) => green(d),
            None => String::new(),
        };
        println!("{:<24} {:>7}   {}", bold(m.label), m.value, delta);
    }
    if cli.show_raw {
        println!();
        println!("{}", dim("raw model output:"));
        println!("{}", report.raw);
    }
    if !cli.quiet {
        eprintln!("{}", dim(&format!("{}ms total", report.duration_ms)));
    }
    Ok(())
}

#[cfg(feature = "fetch")]
fn fetch_pdfium(locator: &BackendLocator, quiet: bool) -> Result<()> {
    if quiet {
        locator.fetch(None).context("Failed to download pdfium")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("pdfium");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    let path = locator
        .fetch(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
        .context("Failed to download pdfium")?;

    dl_bar.finish_and_clear();
    eprintln!("{} pdfium ready at {}", green("✔"), bold(&path.display().to_string()));
    Ok(())
}

#[cfg(not(feature = "fetch"))]
fn fetch_pdfium(_locator: &BackendLocator, _quiet: bool) -> Result<()> {
    anyhow::bail!("This build has no download support; rebuild with `--features fetch`")
}
