//! Pipeline stages for a résumé comparison.
//!
//! Each submodule implements one transformation step so it can be tested in
//! isolation and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm (×3) ──▶ response
//! (path/URL/  (pdfium   (JPEG +    (text,      (JSON →
//!  upload)    page 1)   base64)    vision)     MatchResult)
//! ```
//!
//! 1. [`input`]    — load résumé bytes from the chosen [`input::DocumentSource`]
//! 2. [`render`]   — rasterise page 1; runs in `spawn_blocking` because pdfium
//!    is not async-safe
//! 3. [`encode`]   — JPEG-encode and base64-wrap the page image
//! 4. [`llm`]      — the text and vision capabilities the orchestrator calls
//! 5. [`response`] — parse-and-validate boundary for the final reply

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
pub mod response;
