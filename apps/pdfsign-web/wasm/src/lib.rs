//! WASM bindings for PDF signing and Word/PDF conversion
//!
//! State lives in Rust via `SigningSession`; JavaScript renders pages with
//! PDF.js, draws the overlay elements and handles file I/O.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { SigningSession, convertWordToPdf } from './pkg/pdfsign_wasm.js';
//!
//! await init();
//!
//! const session = new SigningSession("lease.pdf", bytes);
//! session.goToPage(2);
//! const id = session.addSignature("draw", canvas.toDataURL("image/png"));
//! session.updateSignature(id, 120, 640, 200, 100);
//! const { bytes: signed, skipped } = session.exportWithReport();
//! downloadBlob(signed, session.signedFilename);
//! ```

pub mod session;

use pdfsign_core::validation::{self, FileKind};
use pdfsign_core::PdfSignError;
use wasm_bindgen::prelude::*;

pub use session::{SignatureView, SigningSession};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

pub(crate) fn to_js_error(e: PdfSignError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

pub(crate) fn to_uint8_array(bytes: &[u8]) -> js_sys::Uint8Array {
    let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
    array.copy_from(bytes);
    array
}

/// Get the library version
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Header and trailer check, without a full parse
#[wasm_bindgen(js_name = quickValidate)]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(to_js_error)
}

/// Page count, version and metadata of a PDF
#[wasm_bindgen(js_name = getPdfInfo)]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = validation::validate_pdf(bytes).map_err(to_js_error)?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Check a file name against the converter's accepted types.
/// `kind` is "word" or "pdf".
#[wasm_bindgen(js_name = validateFileType)]
pub fn validate_file_type(filename: &str, kind: &str) -> Result<(), JsValue> {
    let kind = match kind {
        "word" => FileKind::Word,
        "pdf" => FileKind::Pdf,
        other => return Err(JsValue::from_str(&format!("Unknown file kind: {}", other))),
    };
    validation::validate_file_type(filename, kind).map_err(to_js_error)
}

/// Best-effort PDF to DOCX conversion (text lines only)
#[wasm_bindgen(js_name = convertPdfToWord)]
pub fn convert_pdf_to_word(bytes: &[u8]) -> Result<js_sys::Uint8Array, JsValue> {
    let docx = pdfsign_core::pdf_to_docx(bytes).map_err(to_js_error)?;
    Ok(to_uint8_array(&docx))
}

/// Best-effort DOCX to PDF conversion (reflowed text)
#[wasm_bindgen(js_name = convertWordToPdf)]
pub fn convert_word_to_pdf(bytes: &[u8]) -> Result<js_sys::Uint8Array, JsValue> {
    let pdf = pdfsign_core::docx_to_pdf(bytes).map_err(to_js_error)?;
    Ok(to_uint8_array(&pdf))
}

/// Download name for a converted file
#[wasm_bindgen(js_name = convertedFilename)]
pub fn converted_filename(source: &str, to_word: bool) -> String {
    let target = if to_word { FileKind::Word } else { FileKind::Pdf };
    validation::converted_filename(source, target)
}

/// Format bytes as human-readable string
#[wasm_bindgen(js_name = formatBytes)]
pub fn format_bytes(bytes: usize) -> String {
    validation::format_bytes(bytes)
}
