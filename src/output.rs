//! Data that flows out of the pipeline: the encoded résumé page, the parsed
//! metrics, and their display form.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// MIME type of every rendered résumé page.
pub const JPEG_MIME: &str = "image/jpeg";

/// The "average" the overall match is compared against in its delta.
pub const AVERAGE_BASELINE: f64 = 50.0;

/// First page of a résumé, JPEG-encoded and base64-wrapped for a vision call.
///
/// Immutable once built; dropped when the comparison finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentImagePart {
    mime_type: String,
    data: String,
}

impl DocumentImagePart {
    /// Wrap raw JPEG bytes.
    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        Self {
            mime_type: JPEG_MIME.to_string(),
            data: STANDARD.encode(jpeg),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Size of the JPEG the payload encodes, in bytes.
    pub fn byte_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|&b| b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }

    /// Decode the payload back to JPEG bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// The three percentages produced by the comparison stage.
///
/// Values are not range-checked: models occasionally answer 105 or -1 and
/// those are shown as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "Designation Match")]
    pub designation_match: f64,
    #[serde(rename = "Semantic Keyword Match")]
    pub keyword_match: f64,
    #[serde(rename = "Final Match")]
    pub final_match: f64,
}

impl MatchResult {
    /// Display rows in presentation order.
    pub fn metrics(&self) -> [Metric; 3] {
        [
            Metric::new("Designation Match", self.designation_match, None),
            Metric::new("Semantic Keyword Match", self.keyword_match, None),
            Metric::new(
                "Overall Match",
                self.final_match,
                Some(format!(
                    "{:+.1}% from average",
                    self.final_match - AVERAGE_BASELINE
                )),
            ),
        ]
    }
}

/// One rendered metric: label, percentage text and an optional delta.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
    pub delta: Option<String>,
}

impl Metric {
    fn new(label: &'static str, value: f64, delta: Option<String>) -> Self {
        Self {
            label,
            value: format!("{value}%"),
            delta,
        }
    }
}

/// A successful comparison: the parsed metrics plus the raw reply they came from.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub result: MatchResult,
    pub metrics: [Metric; 3],
    /// Reply of the comparison stage, newlines removed.
    pub raw: String,
    pub duration_ms: u64,
}

impl MatchReport {
    pub fn new(result: MatchResult, raw: String, duration_ms: u64) -> Self {
        Self {
            metrics: result.metrics(),
            result,
            raw,
            duration_ms,
        }
    }
}
