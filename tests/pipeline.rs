//! Pipeline tests with scripted capabilities.
//!
//! No model and no pdfium is involved: the text and vision capabilities are
//! stubs that replay canned replies and count their calls, and the document
//! tests only exercise failures that are detected before rasterisation.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use resume_match::{
    CapabilityError, DocumentImagePart, DocumentSource, MatchConfig, MatchError,
    MatchOrchestrator, MatchOutcome, MatchProgressCallback, MatchSession, Stage, TextGeneration,
    VisionGeneration,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Stubs ────────────────────────────────────────────────────────────────────

type Reply = Result<String, CapabilityError>;

/// Replays `replies` in order and records every prompt it sees.
#[derive(Default)]
struct ScriptedText {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedText {
    fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompt(&self, i: usize) -> String {
        self.prompts.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl TextGeneration for ScriptedText {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::new("no scripted reply left")))
    }
}

/// Answers every call with the same reply and keeps the last image seen.
struct ScriptedVision {
    reply: Reply,
    seen: Mutex<Option<DocumentImagePart>>,
    calls: AtomicUsize,
}

impl ScriptedVision {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            seen: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionGeneration for ScriptedVision {
    async fn generate_with_image(
        &self,
        _prompt: &str,
        image: &DocumentImagePart,
    ) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock().unwrap() = Some(image.clone());
        self.reply.clone()
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl MatchProgressCallback for EventLog {
    fn on_stage_start(&self, stage: Stage) {
        self.0.lock().unwrap().push(format!("start:{stage:?}"));
    }

    fn on_stage_complete(&self, stage: Stage, _reply_chars: usize) {
        self.0.lock().unwrap().push(format!("done:{stage:?}"));
    }

    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.0.lock().unwrap().push(format!("error:{stage:?}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const JOB: &str = "Senior Backend Engineer. Go, Kubernetes, PostgreSQL, gRPC.";
const JOB_FACTS: &str = "{\n  \"designation\": \"Senior Backend Engineer\",\n  \"keywords\": [\"Go\", \"Kubernetes\"]\n}";
const RESUME_FACTS: &str =
    "{\r\n  \"designation\": \"Backend Developer\",\r\n  \"keywords\": [\"Go\", \"Docker\"]\r\n}";
const SCORES: &str =
    "{\n  \"Designation Match\": 90,\n  \"Semantic Keyword Match\": 85,\n  \"Final Match\": 88\n}";

fn resume_image() -> DocumentImagePart {
    DocumentImagePart::from_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9])
}

fn ok(s: &str) -> Reply {
    Ok(s.to_string())
}

fn orchestrator(text: &Arc<ScriptedText>, vision: &Arc<ScriptedVision>) -> MatchOrchestrator {
    MatchOrchestrator::new(text.clone(), vision.clone())
}

// ── Stage ordering and short-circuit ─────────────────────────────────────────

#[tokio::test]
async fn job_stage_failure_skips_everything_else() {
    let text = ScriptedText::new([Err(CapabilityError::new("quota exceeded"))]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let outcome = orchestrator(&text, &vision)
        .compute_match(JOB, &resume_image())
        .await;

    match &outcome {
        MatchOutcome::Failure(f) => assert_eq!(f.stage, Stage::JobFacts),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(text.calls(), 1);
    assert_eq!(vision.calls(), 0, "vision must not run after a job-stage failure");

    let payload: serde_json::Value = serde_json::from_str(&outcome.to_payload()).unwrap();
    assert_eq!(
        payload,
        serde_json::json!({ "error": "Failed to process job description: quota exceeded" })
    );
}

#[tokio::test]
async fn resume_stage_failure_skips_comparison() {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(Err(CapabilityError::new("image too large")));

    let outcome = orchestrator(&text, &vision)
        .compute_match(JOB, &resume_image())
        .await;

    let failure = outcome.into_result().unwrap_err();
    assert_eq!(failure.stage, Stage::ResumeFacts);
    assert_eq!(failure.to_string(), "Failed to process resume: image too large");
    assert_eq!(text.calls(), 1, "comparison must not run");
    assert_eq!(vision.calls(), 1);
}

#[tokio::test]
async fn comparison_failure_is_reported_last() {
    let text = ScriptedText::new([ok(JOB_FACTS), Err(CapabilityError::new("503 Service Unavailable"))]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let failure = orchestrator(&text, &vision)
        .compute_match(JOB, &resume_image())
        .await
        .into_result()
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Compare);
    assert_eq!(
        failure.to_error_payload(),
        serde_json::json!({ "error": "Failed to compare job and resume: 503 Service Unavailable" })
            .to_string()
    );
    assert_eq!(text.calls(), 2);
    assert_eq!(vision.calls(), 1);
}

#[tokio::test]
async fn success_returns_comparison_reply_without_newlines() {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let outcome = orchestrator(&text, &vision)
        .compute_match(JOB, &resume_image())
        .await;

    let raw = outcome.into_result().unwrap();
    assert!(!raw.contains('\n') && !raw.contains('\r'));
    assert!(raw.contains("\"Final Match\": 88"));
    assert_eq!((text.calls(), vision.calls()), (2, 1));
}

#[tokio::test]
async fn prompts_carry_job_text_and_normalised_facts() {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    orchestrator(&text, &vision)
        .compute_match(JOB, &resume_image())
        .await;

    assert!(text.prompt(0).contains(JOB));

    let compare = text.prompt(1);
    assert!(compare.contains(r#"{  "designation": "Senior Backend Engineer""#));
    assert!(compare.contains(r#"{  "designation": "Backend Developer""#));
    assert!(!compare.contains('\r'));
}

#[tokio::test]
async fn vision_receives_the_rendered_image() {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));
    let image = resume_image();

    orchestrator(&text, &vision).compute_match(JOB, &image).await;

    let seen = vision.seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen, image);
    assert_eq!(seen.mime_type(), "image/jpeg");
}

#[tokio::test]
async fn empty_job_description_still_runs() {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let outcome = orchestrator(&text, &vision)
        .compute_match("", &resume_image())
        .await;

    assert!(outcome.is_success());
    assert_eq!(text.calls(), 2);
}

#[tokio::test]
async fn progress_events_follow_stage_order() {
    let text = ScriptedText::new([ok(JOB_FACTS), Err(CapabilityError::new("boom"))]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));
    let log = Arc::new(EventLog::default());

    orchestrator(&text, &vision)
        .with_progress(Some(log.clone() as Arc<dyn MatchProgressCallback>))
        .compute_match(JOB, &resume_image())
        .await;

    assert_eq!(
        *log.0.lock().unwrap(),
        [
            "start:JobFacts",
            "done:JobFacts",
            "start:ResumeFacts",
            "done:ResumeFacts",
            "start:Compare",
            "error:Compare",
        ]
    );
}

// ── Parsed reports ───────────────────────────────────────────────────────────

#[tokio::test]
async fn evaluate_builds_display_metrics() {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let report = orchestrator(&text, &vision)
        .evaluate(JOB, &resume_image())
        .await
        .unwrap();

    assert_eq!(report.result.designation_match, 90.0);
    assert_eq!(report.result.keyword_match, 85.0);
    assert_eq!(report.result.final_match, 88.0);

    let [designation, keywords, overall] = &report.metrics;
    assert_eq!((designation.label, designation.value.as_str()), ("Designation Match", "90%"));
    assert_eq!((keywords.label, keywords.value.as_str()), ("Semantic Keyword Match", "85%"));
    assert_eq!((overall.label, overall.value.as_str()), ("Overall Match", "88%"));
    assert_eq!(overall.delta.as_deref(), Some("+38.0% from average"));
    assert!(designation.delta.is_none() && keywords.delta.is_none());
}

#[tokio::test]
async fn below_average_score_has_negative_delta() {
    let text = ScriptedText::new([
        ok(JOB_FACTS),
        ok(r#"```json{"Designation Match": "40%", "Semantic Keyword Match": "35%", "Final Match": "37.5%"}```"#),
    ]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let report = orchestrator(&text, &vision)
        .evaluate(JOB, &resume_image())
        .await
        .unwrap();

    assert_eq!(report.metrics[2].value, "37.5%");
    assert_eq!(report.metrics[2].delta.as_deref(), Some("-12.5% from average"));
}

#[tokio::test]
async fn prose_reply_is_a_format_error_with_raw_text() {
    let text = ScriptedText::new([
        ok(JOB_FACTS),
        ok("The candidate is a\nreasonable fit overall."),
    ]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let err = orchestrator(&text, &vision)
        .evaluate(JOB, &resume_image())
        .await
        .unwrap_err();

    match err {
        MatchError::ResponseFormat(e) => {
            assert_eq!(e.raw, "The candidate is areasonable fit overall.");
        }
        other => panic!("expected ResponseFormat, got {other:?}"),
    }
}

#[tokio::test]
async fn stage_failure_surfaces_through_evaluate() {
    let text = ScriptedText::new([Err(CapabilityError::new("invalid API key"))]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));

    let err = orchestrator(&text, &vision)
        .evaluate(JOB, &resume_image())
        .await
        .unwrap_err();

    assert!(matches!(err, MatchError::Stage(ref f) if f.stage == Stage::JobFacts));
    assert_eq!(
        err.to_string(),
        "Failed to process job description: invalid API key"
    );
}

// ── Document sources ─────────────────────────────────────────────────────────

fn stub_session() -> (MatchSession, Arc<ScriptedText>, Arc<ScriptedVision>) {
    let text = ScriptedText::new([ok(JOB_FACTS), ok(SCORES)]);
    let vision = ScriptedVision::new(ok(RESUME_FACTS));
    let config = MatchConfig::builder()
        .pdfium_lib_path("/no/such/libpdfium.so")
        .build()
        .unwrap();
    let session = MatchSession::with_capabilities(config, text.clone(), vision.clone());
    (session, text, vision)
}

#[tokio::test]
async fn missing_file_is_reported_before_any_model_call() {
    let (session, text, vision) = stub_session();
    let dir = tempfile::tempdir().unwrap();
    let source = DocumentSource::Path(dir.path().join("nope.pdf"));

    let err = session.compare(&source, JOB).await.unwrap_err();

    assert!(matches!(err, MatchError::FileNotFound { .. }), "got {err:?}");
    assert_eq!((text.calls(), vision.calls()), (0, 0));
}

#[tokio::test]
async fn empty_file_is_missing_input() {
    let (session, text, _vision) = stub_session();
    let file = tempfile::NamedTempFile::new().unwrap();
    let source = DocumentSource::Path(file.path().to_path_buf());

    let err = session.compare(&source, JOB).await.unwrap_err();

    assert!(matches!(err, MatchError::MissingInput { .. }), "got {err:?}");
    assert_eq!(text.calls(), 0);
}

#[tokio::test]
async fn non_pdf_file_is_malformed() {
    let (session, text, vision) = stub_session();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"Jane Doe\nSenior Engineer\n").unwrap();
    let source = DocumentSource::parse(file.path().to_str().unwrap());

    let err = session.compare(&source, JOB).await.unwrap_err();

    assert!(matches!(err, MatchError::MalformedDocument { .. }), "got {err:?}");
    assert_eq!((text.calls(), vision.calls()), (0, 0));
}

#[tokio::test]
async fn uploaded_bytes_without_backend_report_backend_unavailable() {
    let (session, text, _vision) = stub_session();
    let source = DocumentSource::from(b"%PDF-1.4\n%%EOF\n".to_vec());

    let err = session.compare_raw(&source, JOB).await.unwrap_err();

    assert!(matches!(err, MatchError::PdfBackendUnavailable(_)), "got {err:?}");
    assert_eq!(text.calls(), 0);
}
