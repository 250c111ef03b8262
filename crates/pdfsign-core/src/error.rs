use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfSignError {
    /// The source PDF could not be parsed. Fatal to the whole export.
    #[error("Failed to load PDF document: {0}")]
    DocumentLoad(String),

    #[error("Failed to serialize PDF: {0}")]
    Serialization(String),

    /// A signature raster that is neither decodable PNG nor JPEG
    #[error("Unsupported signature image: {0}")]
    Raster(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
