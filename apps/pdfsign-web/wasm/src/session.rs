//! Signing session: one PDF, its viewer state and the placed signatures
//!
//! JavaScript renders pages with PDF.js and handles pointer events; every
//! piece of state lives here.

use pdfsign_core::annotation::{AnnotationId, Raster, SignatureAnnotation, SignatureKind};
use pdfsign_core::validation::{signed_filename, validate_pdf_upload, validate_signature_image};
use pdfsign_core::{
    embed_signatures_with_report, page_sizes, EmbedReport, PageSize, PdfInfo, PdfSignError, Point,
    SignatureStore, SignerConfig, Size, SkippedAnnotation, ViewerState,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{to_js_error, to_uint8_array};

/// Signature as the overlay layer draws it, in current-zoom pixels
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureView {
    pub id: AnnotationId,
    pub kind: SignatureKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// `data:` URL for an `<img>` element
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportSummary<'a> {
    embedded: usize,
    skipped: &'a [SkippedAnnotation],
}

#[wasm_bindgen]
pub struct SigningSession {
    document_name: String,
    document_bytes: Vec<u8>,
    info: PdfInfo,
    page_sizes: Vec<PageSize>,
    viewer: ViewerState,
    signatures: SignatureStore,
    config: SignerConfig,
}

impl SigningSession {
    /// Validate the upload and open a session (testable without JsValue)
    pub fn open(name: &str, bytes: &[u8], config: SignerConfig) -> Result<Self, PdfSignError> {
        let info = validate_pdf_upload(name, bytes, &config.uploads)?;
        let page_sizes = page_sizes(bytes)?;

        Ok(Self {
            document_name: name.to_string(),
            document_bytes: bytes.to_vec(),
            viewer: ViewerState::new(info.page_count, config.viewer.clone()),
            info,
            page_sizes,
            signatures: SignatureStore::new(),
            config,
        })
    }

    pub fn info(&self) -> &PdfInfo {
        &self.info
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    pub fn signatures(&self) -> &SignatureStore {
        &self.signatures
    }

    /// Place a new signature on the page currently showing
    pub fn add_signature_internal(
        &mut self,
        kind: SignatureKind,
        raster: Raster,
    ) -> Result<AnnotationId, PdfSignError> {
        validate_signature_image(raster.bytes(), &self.config.uploads)?;

        let placement = &self.config.placement;
        let annotation = SignatureAnnotation::new(kind, raster, self.viewer.page())
            .with_position(placement.position)
            .with_size(self.config.limits.apply(placement.size))
            .with_scale(self.viewer.zoom());
        Ok(self.signatures.add(annotation))
    }

    /// Apply a drag/resize reported in current-zoom pixels.
    ///
    /// The size is clamped to the configured limits and the position kept
    /// off negative coordinates. Geometry is stored at the annotation's own
    /// capture scale.
    pub fn update_signature_internal(
        &mut self,
        id: AnnotationId,
        position: Point,
        size: Size,
    ) -> bool {
        let Some(capture_scale) = self.signatures.get(id).map(|a| a.scale) else {
            return false;
        };
        let zoom = self.viewer.zoom();

        let size = self.config.limits.apply(size);
        let position = Point::new(position.x.max(0.0), position.y.max(0.0));

        let rescale = |v: f64| v * capture_scale / zoom;
        self.signatures.update_geometry(
            id,
            Point::new(rescale(position.x), rescale(position.y)),
            Size::new(rescale(size.width), rescale(size.height)),
        )
    }

    pub fn signatures_for_page_internal(&self, page: u32) -> Vec<SignatureView> {
        let zoom = self.viewer.zoom();
        self.signatures
            .for_page(page)
            .into_iter()
            .map(|a| {
                let rescale = |v: f64| v * zoom / a.scale;
                SignatureView {
                    id: a.id,
                    kind: a.kind,
                    page: a.page,
                    x: rescale(a.position.x),
                    y: rescale(a.position.y),
                    width: rescale(a.size.width),
                    height: rescale(a.size.height),
                    image: data_url(&a.raster),
                }
            })
            .collect()
    }

    pub fn export_internal(&self) -> Result<EmbedReport, PdfSignError> {
        embed_signatures_with_report(&self.document_bytes, &self.signatures.snapshot())
    }

    pub fn page_size_internal(&self, page: u32) -> Option<PageSize> {
        let index = page.checked_sub(1)? as usize;
        self.page_sizes.get(index).copied()
    }
}

fn data_url(raster: &Raster) -> String {
    let mime = match pdfsign_core::raster::detect_format(raster.bytes()) {
        Some(pdfsign_core::raster::RasterFormat::Jpeg) => "image/jpeg",
        _ => "image/png",
    };
    format!("data:{};base64,{}", mime, raster.to_base64())
}

#[wasm_bindgen]
impl SigningSession {
    /// Open a PDF for signing with the default configuration
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8]) -> Result<SigningSession, JsValue> {
        Self::open(name, bytes, SignerConfig::default()).map_err(to_js_error)
    }

    /// Open a PDF for signing with a JSON `SignerConfig`
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        name: &str,
        bytes: &[u8],
        config_json: &str,
    ) -> Result<SigningSession, JsValue> {
        let config = SignerConfig::from_json(config_json).map_err(to_js_error)?;
        Self::open(name, bytes, config).map_err(to_js_error)
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.document_name.clone()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.viewer.page_count()
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.viewer.page()
    }

    #[wasm_bindgen(getter)]
    pub fn zoom(&self) -> f64 {
        self.viewer.zoom()
    }

    /// Document bytes for PDF.js rendering
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> js_sys::Uint8Array {
        to_uint8_array(&self.document_bytes)
    }

    /// Native `{width, height}` of a page in points
    #[wasm_bindgen(js_name = pageSize)]
    pub fn page_size(&self, page: u32) -> Result<JsValue, JsValue> {
        let size = self
            .page_size_internal(page)
            .ok_or_else(|| JsValue::from_str("Page out of range"))?;
        serde_wasm_bindgen::to_value(&size)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self) -> u32 {
        self.viewer.next_page()
    }

    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&mut self) -> u32 {
        self.viewer.previous_page()
    }

    #[wasm_bindgen(js_name = firstPage)]
    pub fn first_page(&mut self) -> u32 {
        self.viewer.first_page()
    }

    #[wasm_bindgen(js_name = lastPage)]
    pub fn last_page(&mut self) -> u32 {
        self.viewer.last_page()
    }

    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        self.viewer.go_to(page)
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> f64 {
        self.viewer.zoom_in()
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> f64 {
        self.viewer.zoom_out()
    }

    #[wasm_bindgen(js_name = resetZoom)]
    pub fn reset_zoom(&mut self) -> f64 {
        self.viewer.reset_zoom()
    }

    /// Add a signature from a canvas data URL or base64 string.
    /// `kind` is one of draw, text, image, barcode, qrcode.
    #[wasm_bindgen(js_name = addSignature)]
    pub fn add_signature(&mut self, kind: &str, image: &str) -> Result<u64, JsValue> {
        let kind: SignatureKind = kind.parse().map_err(to_js_error)?;
        let raster = Raster::from_encoded(image).map_err(to_js_error)?;
        self.add_signature_internal(kind, raster).map_err(to_js_error)
    }

    /// Add an uploaded PNG/JPEG file as a signature
    #[wasm_bindgen(js_name = addSignatureImage)]
    pub fn add_signature_image(&mut self, bytes: &[u8]) -> Result<u64, JsValue> {
        self.add_signature_internal(SignatureKind::UploadedImage, Raster::new(bytes.to_vec()))
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = updateSignature)]
    pub fn update_signature(&mut self, id: u64, x: f64, y: f64, width: f64, height: f64) -> bool {
        self.update_signature_internal(id, Point::new(x, y), Size::new(width, height))
    }

    #[wasm_bindgen(js_name = removeSignature)]
    pub fn remove_signature(&mut self, id: u64) -> bool {
        self.signatures.remove(id)
    }

    #[wasm_bindgen(js_name = clearSignatures)]
    pub fn clear_signatures(&mut self) {
        self.signatures.clear();
    }

    #[wasm_bindgen(getter, js_name = signatureCount)]
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Signatures on `page`, scaled to the current zoom
    #[wasm_bindgen(js_name = signaturesForPage)]
    pub fn signatures_for_page(&self, page: u32) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.signatures_for_page_internal(page))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Flatten every signature into the PDF
    pub fn export(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let report = self.export_internal().map_err(to_js_error)?;
        Ok(to_uint8_array(&report.bytes))
    }

    /// Like `export`, returning `{ bytes, embedded, skipped: [{id, reason}] }`
    #[wasm_bindgen(js_name = exportWithReport)]
    pub fn export_with_report(&self) -> Result<JsValue, JsValue> {
        let report = self.export_internal().map_err(to_js_error)?;
        let summary = serde_wasm_bindgen::to_value(&ExportSummary {
            embedded: report.embedded,
            skipped: &report.skipped,
        })
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))?;

        js_sys::Reflect::set(
            &summary,
            &JsValue::from_str("bytes"),
            &to_uint8_array(&report.bytes),
        )?;
        Ok(summary)
    }

    /// Download name for the signed output
    #[wasm_bindgen(getter, js_name = signedFilename)]
    pub fn signed_filename(&self) -> String {
        signed_filename(&self.document_name, &self.config.output.signed_suffix)
    }
}
