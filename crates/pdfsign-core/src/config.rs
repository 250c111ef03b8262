//! Signer configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Front ends build one `SignerConfig` at startup and pass it down.

use crate::error::PdfSignError;
use crate::geometry::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignerConfig {
    /// Where new signatures land
    pub placement: PlacementConfig,
    /// Resize bounds for the overlay editor
    pub limits: SizeLimits,
    pub viewer: ViewerConfig,
    pub uploads: UploadLimits,
    pub output: OutputConfig,
}

impl SignerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PdfSignError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PdfSignError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    ///
    /// ```
    /// use pdfsign_core::config::SignerConfig;
    ///
    /// let config = SignerConfig::from_toml_str("[viewer]\nmax_zoom = 4.0").unwrap();
    /// assert_eq!(config.viewer.max_zoom, 4.0);
    /// assert_eq!(config.viewer.min_zoom, 0.5);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, PdfSignError> {
        let config: Self = toml::from_str(s).map_err(|e| PdfSignError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(s: &str) -> Result<Self, PdfSignError> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| PdfSignError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PdfSignError> {
        let numbers = [
            ("placement.position.x", self.placement.position.x),
            ("placement.position.y", self.placement.position.y),
            ("placement.size.width", self.placement.size.width),
            ("placement.size.height", self.placement.size.height),
            ("limits.min.width", self.limits.min.width),
            ("limits.min.height", self.limits.min.height),
            ("limits.max.width", self.limits.max.width),
            ("limits.max.height", self.limits.max.height),
            ("viewer.min_zoom", self.viewer.min_zoom),
            ("viewer.max_zoom", self.viewer.max_zoom),
            ("viewer.zoom_step", self.viewer.zoom_step),
        ];
        if let Some((key, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PdfSignError::Config(format!(
                "{} must be a finite number, got {}",
                key, value
            )));
        }

        let limits = &self.limits;
        if !(limits.min.width > 0.0 && limits.min.height > 0.0) {
            return Err(PdfSignError::Config(
                "limits.min must be positive".into(),
            ));
        }
        if limits.min.width > limits.max.width || limits.min.height > limits.max.height {
            return Err(PdfSignError::Config(
                "limits.min must not exceed limits.max".into(),
            ));
        }

        let viewer = &self.viewer;
        if !(viewer.min_zoom > 0.0 && viewer.min_zoom <= viewer.max_zoom) {
            return Err(PdfSignError::Config(format!(
                "viewer zoom range [{}, {}] is empty",
                viewer.min_zoom, viewer.max_zoom
            )));
        }
        if !(viewer.zoom_step > 0.0) {
            return Err(PdfSignError::Config("viewer.zoom_step must be positive".into()));
        }
        if !(viewer.min_zoom..=viewer.max_zoom).contains(&1.0) {
            return Err(PdfSignError::Config(
                "viewer zoom range must include 1.0".into(),
            ));
        }

        let placement = &self.placement;
        if placement.position.x < 0.0 || placement.position.y < 0.0 {
            return Err(PdfSignError::Config(
                "placement.position must be non-negative".into(),
            ));
        }

        if self.uploads.max_pdf_bytes == 0 || self.uploads.max_image_bytes == 0 {
            return Err(PdfSignError::Config("upload limits must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementConfig {
    pub position: Point,
    pub size: Size,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            position: crate::annotation::DEFAULT_POSITION,
            size: crate::annotation::DEFAULT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizeLimits {
    pub min: Size,
    pub max: Size,
    pub lock_aspect_ratio: bool,
}

impl SizeLimits {
    /// Clamp a requested overlay size into these limits
    pub fn apply(&self, size: Size) -> Size {
        size.clamp(self.min, self.max, self.lock_aspect_ratio)
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            min: Size::new(50.0, 25.0),
            max: Size::new(400.0, 200.0),
            lock_aspect_ratio: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadLimits {
    pub max_pdf_bytes: usize,
    pub max_image_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_pdf_bytes: 10 * 1024 * 1024,
            max_image_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the source file stem for signed exports
    pub signed_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            signed_suffix: "-signed".to_string(),
        }
    }
}
