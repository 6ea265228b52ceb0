//! PDF rasterisation: page 1 of the résumé → `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while rendering. `tokio::task::spawn_blocking` moves that
//! work to the blocking pool so the runtime's workers keep serving I/O.
//!
//! ## Failure order
//!
//! Cheap checks run before pdfium is bound: an empty buffer is
//! [`MatchError::MissingInput`] and a buffer without a `%PDF` header is
//! [`MatchError::MalformedDocument`], whether or not pdfium is installed.
//! Only a plausible PDF reaches the backend, where a missing library is
//! [`MatchError::PdfBackendUnavailable`] and a load failure is again
//! `MalformedDocument`.

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::output::DocumentImagePart;
use crate::pipeline::encode;
use image::DynamicImage;
use pdfium_backend::BackendLocator;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// The PDF header may be preceded by junk; readers accept it within this window.
const HEADER_WINDOW: usize = 1024;

/// Renders the first page of a résumé to a JPEG image part.
#[derive(Debug, Clone)]
pub struct PdfPageRenderer {
    locator: BackendLocator,
    max_rendered_pixels: Option<u32>,
    jpeg_quality: u8,
}

impl PdfPageRenderer {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            locator: config.pdfium.clone(),
            max_rendered_pixels: config.max_rendered_pixels,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Rasterise page 1 only, encode it as JPEG and base64-wrap it.
    pub async fn render_first_page(&self, pdf: &[u8]) -> Result<DocumentImagePart, MatchError> {
        let image = self.rasterize_first_page(pdf).await?;
        encode::encode_page(&image, self.jpeg_quality)
            .map_err(|e| MatchError::ImageEncoding(e.to_string()))
    }

    /// Rasterise page 1 without encoding it.
    pub async fn rasterize_first_page(&self, pdf: &[u8]) -> Result<DynamicImage, MatchError> {
        check_document(pdf)?;

        let bytes = pdf.to_vec();
        let locator = self.locator.clone();
        let max_pixels = self.max_rendered_pixels;

        tokio::task::spawn_blocking(move || render_first_page_blocking(&locator, &bytes, max_pixels))
            .await
            .map_err(|e| MatchError::Internal(format!("Render task panicked: {}", e)))?
    }
}

/// Reject input that cannot possibly be a PDF, without touching pdfium.
pub fn check_document(pdf: &[u8]) -> Result<(), MatchError> {
    if pdf.is_empty() {
        return Err(MatchError::MissingInput {
            what: "résumé document".into(),
        });
    }
    let window = &pdf[..pdf.len().min(HEADER_WINDOW)];
    if !window.windows(4).any(|w| w == b"%PDF") {
        let head: Vec<u8> = pdf.iter().take(4).copied().collect();
        return Err(MatchError::MalformedDocument {
            detail: format!("missing %PDF header (first bytes: {head:?})"),
        });
    }
    Ok(())
}

fn render_first_page_blocking(
    locator: &BackendLocator,
    pdf: &[u8],
    max_pixels: Option<u32>,
) -> Result<DynamicImage, MatchError> {
    let pdfium = locator
        .bind()
        .map_err(|e| MatchError::PdfBackendUnavailable(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| MatchError::MalformedDocument {
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages, rendering page 1", pages.len());
    if pages.len() == 0 {
        return Err(MatchError::MalformedDocument {
            detail: "document has no pages".into(),
        });
    }

    let page = pages.get(0).map_err(|e| MatchError::MalformedDocument {
        detail: format!("page 1: {:?}", e),
    })?;

    let render_config = match max_pixels {
        Some(px) => PdfRenderConfig::new()
            .set_target_width(px as i32)
            .set_maximum_height(px as i32),
        None => PdfRenderConfig::new(),
    };

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| MatchError::MalformedDocument {
            detail: format!("rendering page 1: {:?}", e),
        })?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());
    Ok(image)
}
