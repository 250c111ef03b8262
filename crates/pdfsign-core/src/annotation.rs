//! Signature annotations and the per-session store that holds them
//!
//! An annotation is a signature raster pinned to one page of the document
//! being signed. Its geometry is in viewer space (top-left origin, CSS
//! pixels); the embedder maps it into PDF space at export time.

use crate::error::PdfSignError;
use crate::geometry::{Point, Size};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type AnnotationId = u64;

/// Default placement for freshly created signatures
pub const DEFAULT_POSITION: Point = Point { x: 50.0, y: 50.0 };
pub const DEFAULT_SIZE: Size = Size {
    width: 200.0,
    height: 100.0,
};

/// How the signature image was produced. Provenance only, placement
/// ignores it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    #[serde(alias = "draw")]
    Drawn,
    #[serde(alias = "text")]
    Typed,
    #[serde(alias = "image")]
    UploadedImage,
    Barcode,
    #[serde(alias = "qrcode")]
    QrCode,
}

impl FromStr for SignatureKind {
    type Err = PdfSignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drawn" | "draw" => Ok(Self::Drawn),
            "typed" | "text" => Ok(Self::Typed),
            "uploaded_image" | "uploaded-image" | "image" => Ok(Self::UploadedImage),
            "barcode" => Ok(Self::Barcode),
            "qr_code" | "qrcode" | "qr" => Ok(Self::QrCode),
            other => Err(PdfSignError::InvalidUpload(format!(
                "Unknown signature kind: {}",
                other
            ))),
        }
    }
}

/// Encoded signature image (PNG or JPEG bytes).
///
/// Serialized as standard base64. Deserializes from plain base64 or a
/// `data:` URL as produced by `canvas.toDataURL()`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Raster(Vec<u8>);

impl Raster {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode a `data:image/...;base64,...` URL
    pub fn from_data_url(url: &str) -> Result<Self, PdfSignError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| PdfSignError::InvalidUpload("Not a data URL".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| PdfSignError::InvalidUpload("Data URL has no payload".into()))?;
        if !meta.ends_with(";base64") {
            return Err(PdfSignError::InvalidUpload(
                "Only base64 data URLs are supported".into(),
            ));
        }
        Self::from_base64(payload)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, PdfSignError> {
        BASE64
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| PdfSignError::InvalidUpload(format!("Invalid base64 image: {}", e)))
    }

    /// Accept either a data URL or bare base64
    pub fn from_encoded(s: &str) -> Result<Self, PdfSignError> {
        if s.starts_with("data:") {
            Self::from_data_url(s)
        } else {
            Self::from_base64(s)
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Raster({} bytes)", self.0.len())
    }
}

impl TryFrom<String> for Raster {
    type Error = PdfSignError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_encoded(&s)
    }
}

impl From<Raster> for String {
    fn from(raster: Raster) -> Self {
        raster.to_base64()
    }
}

fn default_scale() -> f64 {
    1.0
}

/// A signature stamp pinned to one page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureAnnotation {
    pub id: AnnotationId,
    pub kind: SignatureKind,
    pub raster: Raster,
    /// 1-based page index, fixed at creation
    pub page: u32,
    pub position: Point,
    pub size: Size,
    /// Viewer render scale the geometry was captured at
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl SignatureAnnotation {
    /// New annotation at the default placement. The id is assigned by
    /// [`SignatureStore::add`].
    pub fn new(kind: SignatureKind, raster: Raster, page: u32) -> Self {
        Self {
            id: 0,
            kind,
            raster,
            page,
            position: DEFAULT_POSITION,
            size: DEFAULT_SIZE,
            scale: 1.0,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// Ordered list of annotations for one editing session.
///
/// List order is z-order: later entries are drawn over earlier ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureStore {
    next_id: AnnotationId,
    annotations: Vec<SignatureAnnotation>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation, assigning it a fresh id
    pub fn add(&mut self, mut annotation: SignatureAnnotation) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;

        annotation.id = id;
        self.annotations.push(annotation);
        id
    }

    /// Apply a drag/resize result. Only geometry is mutable.
    pub fn update_geometry(&mut self, id: AnnotationId, position: Point, size: Size) -> bool {
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(annotation) => {
                annotation.position = position;
                annotation.size = size;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: AnnotationId) -> bool {
        if let Some(pos) = self.annotations.iter().position(|a| a.id == id) {
            self.annotations.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: AnnotationId) -> Option<&SignatureAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn annotations(&self) -> &[SignatureAnnotation] {
        &self.annotations
    }

    pub fn for_page(&self, page: u32) -> Vec<&SignatureAnnotation> {
        self.annotations.iter().filter(|a| a.page == page).collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Drop every annotation. Ids keep counting up.
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Owned copy to hand to an export
    pub fn snapshot(&self) -> Vec<SignatureAnnotation> {
        self.annotations.clone()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
