mod common;

use common::{letter_pdf, pdf_with_boxes};
use pdfsign_core::convert::{docx, extract_text, NO_TEXT_FALLBACK};
use pdfsign_core::{docx_to_pdf, pdf_to_docx, PdfSignError};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};

/// A .docx as a word processor would save it: extra parts, styles, tables
fn word_document(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in [
        ("[Content_Types].xml", "<Types/>"),
        ("word/styles.xml", "<w:styles/>"),
        ("docProps/core.xml", "<cp:coreProperties/>"),
        ("word/document.xml", document.as_str()),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn test_pdf_to_word_keeps_pages_in_order() {
    let pdf = letter_pdf(3);
    let out = pdf_to_docx(&pdf).unwrap();
    let paragraphs = docx::read_docx(&out).unwrap();
    let texts: Vec<_> = paragraphs.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["Page 1", "Page 2", "Page 3"]);
}

#[test]
fn test_pdf_to_word_reads_scaled_text() {
    // Text shown under a 0.5 scale on an offset MediaBox still extracts
    let pdf = pdf_with_boxes(&[[100, 100, 712, 892]]);
    let pages = extract_text(&pdf).unwrap();
    assert_eq!(pages[0].lines, vec!["Page 1"]);
}

#[test]
fn test_word_to_pdf_headings_and_tables() {
    let docx = word_document(
        r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Rental Agreement</w:t></w:r></w:p>
           <w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Parties</w:t></w:r></w:p>
           <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Landlord</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
           <w:p><w:r><w:t>Tenant agrees &amp; signs.</w:t></w:r></w:p>"#,
    );
    let pdf = docx_to_pdf(&docx).unwrap();
    let pages = extract_text(&pdf).unwrap();
    assert_eq!(
        pages[0].lines,
        vec!["Rental Agreement", "Parties", "Landlord", "Tenant agrees & signs."]
    );
}

#[test]
fn test_word_to_pdf_long_paragraph_wraps() {
    let sentence = "All rent is due on the first day of each month. ".repeat(40);
    let docx = word_document(&format!(r#"<w:p><w:r><w:t>{}</w:t></w:r></w:p>"#, sentence));
    let pdf = docx_to_pdf(&docx).unwrap();
    let pages = extract_text(&pdf).unwrap();

    assert!(pages[0].lines.len() > 1);
    assert_eq!(pages[0].lines.join(" "), sentence.trim_end());
}

#[test]
fn test_word_to_pdf_rejects_documents_without_text() {
    let docx = word_document("<w:p/><w:p><w:r><w:t> </w:t></w:r></w:p>");
    assert!(matches!(
        docx_to_pdf(&docx),
        Err(PdfSignError::Conversion(_))
    ));
}

#[test]
fn test_word_to_pdf_rejects_legacy_doc() {
    // OLE compound file header of a .doc
    let doc = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
    assert!(matches!(
        docx_to_pdf(&doc),
        Err(PdfSignError::Conversion(_))
    ));
}

#[test]
fn test_pdf_without_text_gets_fallback_paragraph() {
    let blank = {
        let pdf = docx_to_pdf(&word_document(r#"<w:p><w:r><w:t>x</w:t></w:r></w:p>"#)).unwrap();
        // Same pages, no content streams
        let mut doc = lopdf::Document::load_mem(&pdf).unwrap();
        for (_, page_id) in doc.get_pages() {
            doc.get_dictionary_mut(page_id).unwrap().remove(b"Contents");
        }
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    };

    let out = pdf_to_docx(&blank).unwrap();
    let paragraphs = docx::read_docx(&out).unwrap();
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].text, NO_TEXT_FALLBACK);
}
