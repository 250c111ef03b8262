//! PDF signature placement and Word/PDF conversion
//!
//! This crate provides the client-side core of the signer using lopdf:
//! - `annotation`: signature stamps and the per-session store
//! - `geometry`: viewer <-> PDF coordinate mapping
//! - `embed`: flattening stamps into the document
//! - `convert`: best-effort Word <-> PDF conversion

pub mod annotation;
pub mod config;
pub mod convert;
pub mod embed;
pub mod error;
pub mod geometry;
pub mod page;
pub mod raster;
pub mod validation;
pub mod viewer;

#[cfg(test)]
mod test_support;

pub use annotation::{
    AnnotationId, Raster, SignatureAnnotation, SignatureKind, SignatureStore, DEFAULT_POSITION,
    DEFAULT_SIZE,
};
pub use config::SignerConfig;
pub use convert::{docx_to_pdf, pdf_to_docx};
pub use embed::{
    embed_signatures, embed_signatures_with_report, EmbedReport, SkipReason, SkippedAnnotation,
};
pub use error::PdfSignError;
pub use geometry::{normalize, pdf_to_screen, screen_to_pdf, PageSize, Point, Size};
pub use validation::{validate_pdf, PdfInfo};
pub use viewer::ViewerState;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfSignError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Native size of every page, in page order
pub fn page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfSignError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;
    Ok(doc
        .get_pages()
        .values()
        .map(|&id| page::page_box(&doc, id).size)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;

    #[test]
    fn test_get_page_count() {
        assert_eq!(get_page_count(&create_test_pdf(4)).unwrap(), 4);
    }

    #[test]
    fn test_get_page_count_invalid() {
        assert!(matches!(
            get_page_count(b"nope"),
            Err(PdfSignError::DocumentLoad(_))
        ));
    }

    #[test]
    fn test_page_sizes() {
        let sizes = page_sizes(&create_test_pdf(2)).unwrap();
        assert_eq!(sizes, vec![PageSize::letter(), PageSize::letter()]);
    }
}
