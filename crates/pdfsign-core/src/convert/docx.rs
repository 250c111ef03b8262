//! Minimal WordprocessingML reading and writing
//!
//! Only what the converters need: paragraphs of plain text, with heading
//! levels on the way in and a fixed body style on the way out.

use crate::error::PdfSignError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Body text: Calibri 11pt (sizes are in half-points)
const BODY_FONT: &str = "Calibri";
const BODY_HALF_POINTS: &str = "22";
/// Paragraph spacing in twips
const SPACING_AFTER: &str = "120";
const LINE_SPACING: &str = "276";
/// 0.5" on every side
const PAGE_MARGIN: &str = "720";
/// A4 in twips
const PAGE_WIDTH: &str = "11906";
const PAGE_HEIGHT: &str = "16838";

/// Paragraph style, as far as the PDF renderer distinguishes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphStyle {
    #[default]
    Body,
    Title,
    Heading1,
    Heading2,
    Heading3,
}

impl ParagraphStyle {
    /// Map a `w:pStyle` id. Deeper headings collapse to level 3.
    pub fn from_style_id(id: &str) -> Self {
        let id = id.to_ascii_lowercase().replace(' ', "");
        if id == "title" {
            return Self::Title;
        }
        match id.strip_prefix("heading").and_then(|n| n.parse::<u8>().ok()) {
            Some(1) => Self::Heading1,
            Some(2) => Self::Heading2,
            Some(n) if n >= 3 => Self::Heading3,
            _ => Self::Body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub text: String,
    /// Line breaks emitted before the text
    pub breaks_before: u8,
}

impl Paragraph {
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            style: ParagraphStyle::Body,
            text: text.into(),
            breaks_before: 0,
        }
    }
}

fn xml_err(e: impl std::fmt::Display) -> PdfSignError {
    PdfSignError::Conversion(format!("XML error: {}", e))
}

fn zip_err(e: impl std::fmt::Display) -> PdfSignError {
    PdfSignError::Conversion(format!("DOCX package error: {}", e))
}

fn start<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> Event<'a> {
    let mut el = BytesStart::new(name);
    for attr in attrs {
        el.push_attribute(*attr);
    }
    Event::Start(el)
}

fn empty<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> Event<'a> {
    let mut el = BytesStart::new(name);
    for attr in attrs {
        el.push_attribute(*attr);
    }
    Event::Empty(el)
}

fn end(name: &str) -> Event<'_> {
    Event::End(BytesEnd::new(name))
}

fn write_paragraph<W: Write>(
    writer: &mut Writer<W>,
    paragraph: &Paragraph,
) -> Result<(), PdfSignError> {
    writer.write_event(start("w:p", &[])).map_err(xml_err)?;

    writer.write_event(start("w:pPr", &[])).map_err(xml_err)?;
    writer
        .write_event(empty(
            "w:spacing",
            &[
                ("w:after", SPACING_AFTER),
                ("w:line", LINE_SPACING),
                ("w:lineRule", "auto"),
            ],
        ))
        .map_err(xml_err)?;
    writer.write_event(end("w:pPr")).map_err(xml_err)?;

    writer.write_event(start("w:r", &[])).map_err(xml_err)?;
    writer.write_event(start("w:rPr", &[])).map_err(xml_err)?;
    writer
        .write_event(empty(
            "w:rFonts",
            &[("w:ascii", BODY_FONT), ("w:hAnsi", BODY_FONT), ("w:cs", BODY_FONT)],
        ))
        .map_err(xml_err)?;
    writer
        .write_event(empty("w:sz", &[("w:val", BODY_HALF_POINTS)]))
        .map_err(xml_err)?;
    writer.write_event(end("w:rPr")).map_err(xml_err)?;

    for _ in 0..paragraph.breaks_before {
        writer.write_event(empty("w:br", &[])).map_err(xml_err)?;
    }
    let text = xml_chars(&paragraph.text);
    if !text.is_empty() {
        writer
            .write_event(start("w:t", &[("xml:space", "preserve")]))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(xml_err)?;
        writer.write_event(end("w:t")).map_err(xml_err)?;
    }
    writer.write_event(end("w:r")).map_err(xml_err)?;

    writer.write_event(end("w:p")).map_err(xml_err)?;
    Ok(())
}

/// Keep only characters XML 1.0 allows in text content. Glyph-id strings
/// from CID fonts decode to control characters Word refuses to open.
fn xml_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c,
                '\t' | '\n' | '\r'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}')
        })
        .collect()
}

/// Serialize `word/document.xml`
pub fn document_xml(paragraphs: &[Paragraph]) -> Result<Vec<u8>, PdfSignError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_err)?;
    writer
        .write_event(start("w:document", &[("xmlns:w", W_NS)]))
        .map_err(xml_err)?;
    writer.write_event(start("w:body", &[])).map_err(xml_err)?;

    for paragraph in paragraphs {
        write_paragraph(&mut writer, paragraph)?;
    }

    writer.write_event(start("w:sectPr", &[])).map_err(xml_err)?;
    writer
        .write_event(empty(
            "w:pgSz",
            &[("w:w", PAGE_WIDTH), ("w:h", PAGE_HEIGHT)],
        ))
        .map_err(xml_err)?;
    writer
        .write_event(empty(
            "w:pgMar",
            &[
                ("w:top", PAGE_MARGIN),
                ("w:right", PAGE_MARGIN),
                ("w:bottom", PAGE_MARGIN),
                ("w:left", PAGE_MARGIN),
            ],
        ))
        .map_err(xml_err)?;
    writer.write_event(end("w:sectPr")).map_err(xml_err)?;

    writer.write_event(end("w:body")).map_err(xml_err)?;
    writer.write_event(end("w:document")).map_err(xml_err)?;
    Ok(writer.into_inner())
}

/// Package paragraphs as a `.docx` file
pub fn write_docx(paragraphs: &[Paragraph]) -> Result<Vec<u8>, PdfSignError> {
    let document = document_xml(paragraphs)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/document.xml", document.as_slice()),
    ] {
        zip.start_file(name, options).map_err(zip_err)?;
        zip.write_all(data).map_err(zip_err)?;
    }

    let cursor = zip.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

/// Paragraph being collected while walking `w:p`
#[derive(Default)]
struct ParagraphBuilder {
    style: ParagraphStyle,
    text: String,
}

/// Read the paragraphs of a `.docx` package.
///
/// Text inside tables and text boxes is read in document order. Empty
/// paragraphs are dropped.
pub fn read_docx(bytes: &[u8]) -> Result<Vec<Paragraph>, PdfSignError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PdfSignError::Conversion(format!("Not a DOCX package: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| PdfSignError::Conversion(format!("Missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(zip_err)?;

    parse_document_xml(&xml)
}

pub fn parse_document_xml(xml: &str) -> Result<Vec<Paragraph>, PdfSignError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<ParagraphBuilder> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(ParagraphBuilder::default()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:pStyle" => {
                    if let Some(p) = current.as_mut() {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"w:val" {
                                let value = attr.unescape_value().map_err(xml_err)?;
                                p.style = ParagraphStyle::from_style_id(&value);
                            }
                        }
                    }
                }
                b"w:tab" => {
                    if let Some(p) = current.as_mut() {
                        p.text.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(p) = current.as_mut() {
                        p.text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_text => {
                if let Some(p) = current.as_mut() {
                    p.text.push_str(&e.unescape().map_err(xml_err)?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(p) = current.take() {
                        if !p.text.trim().is_empty() {
                            paragraphs.push(Paragraph {
                                style: p.style,
                                text: p.text,
                                breaks_before: 0,
                            });
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
