//! Upload checks, document info and output naming

use crate::config::UploadLimits;
use crate::error::PdfSignError;
use crate::raster::{detect_format, RasterFormat};
use lopdf::Document;
use serde::Serialize;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
}

/// Document types accepted by the converters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Word,
    Pdf,
}

impl FileKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileKind::Word => &["docx", "doc"],
            FileKind::Pdf => &["pdf"],
        }
    }
}

/// Parse a PDF and report basic info. Fails on anything we could not sign.
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, PdfSignError> {
    check_header(bytes)?;

    let version = extract_version(bytes);
    let document =
        Document::load_mem(bytes).map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PdfSignError::DocumentLoad("PDF has no pages".into()));
    }

    let (title, author) = extract_metadata(&document);

    Ok(PdfInfo {
        page_count,
        version,
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title,
        author,
    })
}

fn check_header(bytes: &[u8]) -> Result<(), PdfSignError> {
    if bytes.len() < 8 {
        return Err(PdfSignError::DocumentLoad(
            "File too small to be a valid PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfSignError::DocumentLoad(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }
    Ok(())
}

/// Header format: %PDF-1.7
fn extract_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "1.4".to_string())
}

fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info = document
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| document.get_dictionary(id));

    let Ok(info) = info else {
        return (None, None);
    };

    let field = |key: &[u8]| {
        info.get(key)
            .and_then(|obj| obj.as_str())
            .ok()
            .map(decode_text_string)
            .filter(|s| !s.is_empty())
    };
    (field(b"Title"), field(b"Author"))
}

/// PDF text strings are UTF-16BE with a BOM or PDFDocEncoding
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Header and trailer check without parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfSignError> {
    check_header(bytes)?;

    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfSignError::DocumentLoad(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }
    Ok(())
}

/// Check a PDF chosen for signing: name, size, then a full parse
pub fn validate_pdf_upload(
    filename: &str,
    bytes: &[u8],
    limits: &UploadLimits,
) -> Result<PdfInfo, PdfSignError> {
    validate_file_type(filename, FileKind::Pdf)?;
    if bytes.len() > limits.max_pdf_bytes {
        return Err(PdfSignError::InvalidUpload(format!(
            "PDF is {}, the limit is {}",
            format_bytes(bytes.len()),
            format_bytes(limits.max_pdf_bytes)
        )));
    }
    validate_pdf(bytes)
}

/// Check an uploaded signature image and report its format
pub fn validate_signature_image(
    bytes: &[u8],
    limits: &UploadLimits,
) -> Result<RasterFormat, PdfSignError> {
    if bytes.len() > limits.max_image_bytes {
        return Err(PdfSignError::InvalidUpload(format!(
            "Image is {}, the limit is {}",
            format_bytes(bytes.len()),
            format_bytes(limits.max_image_bytes)
        )));
    }
    detect_format(bytes).ok_or_else(|| {
        PdfSignError::InvalidUpload("Signature image must be PNG or JPEG".into())
    })
}

/// Lowercased extension, without the dot
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn validate_file_type(filename: &str, kind: FileKind) -> Result<(), PdfSignError> {
    match file_extension(filename) {
        Some(ext) if kind.extensions().contains(&ext.as_str()) => Ok(()),
        _ => Err(PdfSignError::InvalidUpload(format!(
            "{} is not a {} file (expected .{})",
            filename,
            match kind {
                FileKind::Word => "Word",
                FileKind::Pdf => "PDF",
            },
            kind.extensions().join(" or .")
        ))),
    }
}

/// File name without directories or the last extension
pub fn file_stem(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

/// `contract.pdf` -> `contract-signed.pdf`
pub fn signed_filename(source: &str, suffix: &str) -> String {
    format!("{}{}.pdf", file_stem(source), suffix)
}

/// `report.pdf` -> `report.docx` and the reverse
pub fn converted_filename(source: &str, target: FileKind) -> String {
    let ext = match target {
        FileKind::Word => "docx",
        FileKind::Pdf => "pdf",
    };
    format!("{}.{}", file_stem(source), ext)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
