//! Signature raster decoding
//!
//! Turns PNG or JPEG bytes into PDF image XObjects. PNG is tried first, JPEG
//! second; the order is fixed.

use crate::error::PdfSignError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Quality used when a CMYK JPEG has to be re-encoded as RGB
const REENCODE_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

/// Sniff the image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Option<RasterFormat> {
    if bytes.starts_with(&PNG_MAGIC) {
        Some(RasterFormat::Png)
    } else if bytes.starts_with(&JPEG_MAGIC) {
        Some(RasterFormat::Jpeg)
    } else {
        None
    }
}

/// A decoded raster ready to be added to a document
#[derive(Debug)]
pub struct EmbeddableImage {
    pub format: RasterFormat,
    pub width: u32,
    pub height: u32,
    image: Stream,
    soft_mask: Option<Stream>,
}

impl EmbeddableImage {
    pub fn has_alpha(&self) -> bool {
        self.soft_mask.is_some()
    }

    /// Add the image (and its soft mask) to `doc`, returning the image id
    pub fn add_to(self, doc: &mut Document) -> ObjectId {
        let mut image = self.image;
        if let Some(mask) = self.soft_mask {
            let mask_id = doc.add_object(mask);
            image.dict.set("SMask", Object::Reference(mask_id));
        }
        doc.add_object(image)
    }
}

/// Decode `bytes` as PNG, falling back to JPEG
pub fn decode(bytes: &[u8]) -> Result<EmbeddableImage, PdfSignError> {
    let png_err = match decode_png(bytes) {
        Ok(image) => return Ok(image),
        Err(e) => e,
    };
    decode_jpeg(bytes).map_err(|jpeg_err| {
        PdfSignError::Raster(format!("PNG: {}; JPEG: {}", png_err, jpeg_err))
    })
}

fn decode_png(bytes: &[u8]) -> Result<EmbeddableImage, String> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    // Palette and tRNS expand to RGB(A), 16-bit samples drop to 8
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder.read_info().map_err(|e| e.to_string())?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).map_err(|e| e.to_string())?;
    let pixels = &buf[..frame.buffer_size()];

    let (color_space, channels, has_alpha) = match frame.color_type {
        png::ColorType::Grayscale => ("DeviceGray", 1, false),
        png::ColorType::GrayscaleAlpha => ("DeviceGray", 2, true),
        png::ColorType::Rgb => ("DeviceRGB", 3, false),
        png::ColorType::Rgba => ("DeviceRGB", 4, true),
        png::ColorType::Indexed => return Err("palette was not expanded".to_string()),
    };

    let (color, alpha) = if has_alpha {
        split_alpha(pixels, channels)
    } else {
        (pixels.to_vec(), None)
    };

    let image = image_stream(
        frame.width,
        frame.height,
        color_space,
        "FlateDecode",
        zlib(&color)?,
    );
    let soft_mask = match alpha {
        Some(alpha) => Some(image_stream(
            frame.width,
            frame.height,
            "DeviceGray",
            "FlateDecode",
            zlib(&alpha)?,
        )),
        None => None,
    };

    Ok(EmbeddableImage {
        format: RasterFormat::Png,
        width: frame.width,
        height: frame.height,
        image,
        soft_mask,
    })
}

fn decode_jpeg(bytes: &[u8]) -> Result<EmbeddableImage, String> {
    // Full decode so truncated or corrupt data is rejected here rather than
    // by the PDF viewer later.
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;
    let (width, height) = (decoded.width(), decoded.height());

    let (color_space, data) = match jpeg_components(bytes) {
        Some(1) => ("DeviceGray", bytes.to_vec()),
        Some(3) => ("DeviceRGB", bytes.to_vec()),
        _ => {
            // CMYK/YCCK: re-encode the decoder's RGB output
            let rgb = decoded.to_rgb8();
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, REENCODE_QUALITY)
                .encode_image(&rgb)
                .map_err(|e| e.to_string())?;
            ("DeviceRGB", out)
        }
    };

    Ok(EmbeddableImage {
        format: RasterFormat::Jpeg,
        width,
        height,
        image: image_stream(width, height, color_space, "DCTDecode", data),
        soft_mask: None,
    })
}

/// Component count from the first SOF segment
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = bytes[i + 1];
        match marker {
            // Fill bytes and standalone markers carry no length
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => {
                i += 2;
                continue;
            }
            // SOF0-SOF15 except DHT, JPG and DAC
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return bytes.get(i + 9).copied();
            }
            _ => {}
        }
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        i += 2 + len;
    }
    None
}

/// Split interleaved samples into color and alpha planes.
/// Returns no alpha plane when every pixel is opaque.
fn split_alpha(pixels: &[u8], channels: usize) -> (Vec<u8>, Option<Vec<u8>>) {
    let color_channels = channels - 1;
    let pixel_count = pixels.len() / channels;
    let mut color = Vec::with_capacity(pixel_count * color_channels);
    let mut alpha = Vec::with_capacity(pixel_count);

    for px in pixels.chunks_exact(channels) {
        color.extend_from_slice(&px[..color_channels]);
        alpha.push(px[color_channels]);
    }

    if alpha.iter().all(|&a| a == u8::MAX) {
        (color, None)
    } else {
        (color, Some(alpha))
    }
}

fn zlib(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())
}

fn image_stream(
    width: u32,
    height: u32,
    color_space: &str,
    filter: &str,
    data: Vec<u8>,
) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));

    let mut stream = Stream::new(dict, data);
    // Already encoded
    stream.allows_compression = false;
    stream
}
