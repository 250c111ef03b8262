//! Flatten signature annotations into a PDF

use crate::annotation::{AnnotationId, SignatureAnnotation};
use crate::error::PdfSignError;
use crate::geometry::{normalize, screen_to_pdf};
use crate::page::{add_xobject, append_content, isolate_content, page_box, page_id};
use crate::raster;
use lopdf::{Document, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Why an annotation was left out of the output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `page` is 0 or past the last page of the document
    PageOutOfRange,
    /// Raster is neither PNG nor JPEG
    UndecodableRaster,
    /// Non-finite values, negative size or a non-positive scale
    InvalidGeometry,
    /// The target page's dictionary could not be edited
    PageNotEditable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedAnnotation {
    pub id: AnnotationId,
    pub reason: SkipReason,
}

/// Output of an export plus the annotations that did not make it in
#[derive(Debug, Clone)]
pub struct EmbedReport {
    pub bytes: Vec<u8>,
    pub embedded: usize,
    pub skipped: Vec<SkippedAnnotation>,
}

impl EmbedReport {
    pub fn skipped_ids(&self) -> Vec<AnnotationId> {
        self.skipped.iter().map(|s| s.id).collect()
    }
}

/// Stamp every annotation onto its page and serialize a new PDF.
///
/// Fails only when `pdf_bytes` cannot be loaded or the result cannot be
/// written. Annotations on missing pages or with undecodable rasters are
/// left out; use [`embed_signatures_with_report`] to find out which.
pub fn embed_signatures(
    pdf_bytes: &[u8],
    annotations: &[SignatureAnnotation],
) -> Result<Vec<u8>, PdfSignError> {
    embed_signatures_with_report(pdf_bytes, annotations).map(|report| report.bytes)
}

/// [`embed_signatures`], also returning the skipped annotation ids
pub fn embed_signatures_with_report(
    pdf_bytes: &[u8],
    annotations: &[SignatureAnnotation],
) -> Result<EmbedReport, PdfSignError> {
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;

    let mut isolated: HashSet<ObjectId> = HashSet::new();
    let mut skipped = Vec::new();
    let mut embedded = 0;

    // Sequential: later stamps must be drawn over earlier ones
    for annotation in annotations {
        match stamp(&mut doc, annotation, &mut isolated) {
            None => embedded += 1,
            Some(reason) => {
                warn!(id = annotation.id, page = annotation.page, ?reason, "Skipping signature");
                skipped.push(SkippedAnnotation {
                    id: annotation.id,
                    reason,
                });
            }
        }
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfSignError::Serialization(e.to_string()))?;

    info!(
        embedded,
        skipped = skipped.len(),
        size = bytes.len(),
        "Exported signed PDF"
    );

    Ok(EmbedReport {
        bytes,
        embedded,
        skipped,
    })
}

/// Draw one annotation. `Some(_)` means it was skipped.
fn stamp(
    doc: &mut Document,
    annotation: &SignatureAnnotation,
    isolated: &mut HashSet<ObjectId>,
) -> Option<SkipReason> {
    let Some(target) = page_id(doc, annotation.page) else {
        return Some(SkipReason::PageOutOfRange);
    };

    if !geometry_is_valid(annotation) {
        return Some(SkipReason::InvalidGeometry);
    }

    let image = match raster::decode(annotation.raster.bytes()) {
        Ok(image) => image,
        Err(e) => {
            debug!(id = annotation.id, error = %e, "Signature raster rejected");
            return Some(SkipReason::UndecodableRaster);
        }
    };

    let bbox = page_box(doc, target);
    let (position, size) = normalize(annotation.position, annotation.size, annotation.scale);
    let mapped = screen_to_pdf(position, size, bbox.size);
    let x = mapped.x + bbox.origin_x;
    let y = mapped.y + bbox.origin_y;

    let format = image.format;
    let image_id = image.add_to(doc);
    let name = format!("SigIm{}", image_id.0);
    let ops = format!(
        "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
        num(size.width),
        num(size.height),
        num(x),
        num(y),
        name
    );

    if let Err(e) = draw_on_page(doc, target, &name, image_id, ops, isolated) {
        debug!(id = annotation.id, error = %e, "Page edit failed");
        return Some(SkipReason::PageNotEditable);
    }

    debug!(
        id = annotation.id,
        page = annotation.page,
        ?format,
        x,
        y,
        width = size.width,
        height = size.height,
        "Stamped signature"
    );
    None
}

fn draw_on_page(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    image_id: ObjectId,
    ops: String,
    isolated: &mut HashSet<ObjectId>,
) -> Result<(), PdfSignError> {
    add_xobject(doc, page_id, name.as_bytes(), image_id)?;
    if isolated.insert(page_id) {
        isolate_content(doc, page_id)?;
    }
    append_content(doc, page_id, ops.into_bytes())
}

fn geometry_is_valid(annotation: &SignatureAnnotation) -> bool {
    let p = annotation.position;
    let s = annotation.size;
    p.x.is_finite()
        && p.y.is_finite()
        && s.is_finite()
        && s.width >= 0.0
        && s.height >= 0.0
        && annotation.scale.is_finite()
        && annotation.scale > 0.0
}

/// Content-stream number: fixed precision, no exponent, trailing zeros cut
fn num(value: f64) -> String {
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}
