//! Best-effort Word <-> PDF conversion
//!
//! PDF to Word keeps text lines only. Word to PDF keeps paragraph text and
//! heading levels and reflows them; tables, images and run formatting are
//! flattened or dropped.

pub mod docx;
pub mod extract;
pub mod render;

pub use docx::{Paragraph, ParagraphStyle};
pub use extract::{extract_text, PageText};

use crate::error::PdfSignError;
use tracing::info;

/// Paragraph written when the PDF has no extractable text
pub const NO_TEXT_FALLBACK: &str = "No text content could be extracted from the PDF.";

/// Line breaks in the empty paragraph separating pages
const PAGE_SEPARATOR_BREAKS: u8 = 2;

/// Paragraph list for a DOCX built from extracted page text
pub fn paragraphs_from_pages(pages: &[PageText]) -> Vec<Paragraph> {
    if pages.iter().all(PageText::is_empty) {
        return vec![Paragraph::body(NO_TEXT_FALLBACK)];
    }

    let mut paragraphs = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            paragraphs.push(Paragraph {
                breaks_before: PAGE_SEPARATOR_BREAKS,
                ..Paragraph::default()
            });
        }
        paragraphs.extend(page.lines.iter().map(Paragraph::body));
    }
    paragraphs
}

/// Convert a PDF to a `.docx` package, one paragraph per text line
pub fn pdf_to_docx(pdf_bytes: &[u8]) -> Result<Vec<u8>, PdfSignError> {
    let pages = extract_text(pdf_bytes)?;
    let paragraphs = paragraphs_from_pages(&pages);
    let docx = docx::write_docx(&paragraphs)?;
    info!(
        pages = pages.len(),
        paragraphs = paragraphs.len(),
        "Converted PDF to Word"
    );
    Ok(docx)
}

/// Convert a `.docx` package to a PDF text flow
pub fn docx_to_pdf(docx_bytes: &[u8]) -> Result<Vec<u8>, PdfSignError> {
    let paragraphs = docx::read_docx(docx_bytes)?;
    if paragraphs.is_empty() {
        return Err(PdfSignError::Conversion(
            "The Word document contains no text".into(),
        ));
    }
    let pdf = render::render_pdf(&paragraphs)?;
    info!(paragraphs = paragraphs.len(), size = pdf.len(), "Converted Word to PDF");
    Ok(pdf)
}
