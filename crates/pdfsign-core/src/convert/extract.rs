//! Line-oriented text extraction from PDF content streams

use crate::error::PdfSignError;
use lopdf::content::Content;
use lopdf::{Document, Object};
use std::collections::BTreeMap;
use tracing::debug;

/// Text of one page, top to bottom
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageText {
    pub page: u32,
    pub lines: Vec<String>,
}

impl PageText {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a × b` in PDF row-vector convention
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Text-positioning state for one content stream
struct TextState {
    ctm: Matrix,
    saved: Vec<Matrix>,
    line_matrix: Matrix,
    leading: f64,
    /// Strings shown so far, keyed by rounded baseline y, in show order
    lines: BTreeMap<i64, Vec<String>>,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            saved: Vec::new(),
            line_matrix: IDENTITY,
            leading: 0.0,
            lines: BTreeMap::new(),
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&translate(tx, ty), &self.line_matrix);
    }

    fn show(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        let device = multiply(&self.line_matrix, &self.ctm);
        let key = device[5].round() as i64;
        self.lines.entry(key).or_default().push(text);
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let n = |i: usize| operands.get(i).and_then(number).unwrap_or(0.0);
        match operator {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" if operands.len() == 6 => {
                let m = [n(0), n(1), n(2), n(3), n(4), n(5)];
                self.ctm = multiply(&m, &self.ctm);
            }
            "BT" => self.line_matrix = IDENTITY,
            "Tm" if operands.len() == 6 => {
                self.line_matrix = [n(0), n(1), n(2), n(3), n(4), n(5)];
            }
            "Td" => self.next_line(n(0), n(1)),
            "TD" => {
                self.leading = -n(1);
                self.next_line(n(0), n(1));
            }
            "TL" => self.leading = n(0),
            "T*" => self.next_line(0.0, -self.leading),
            "Tj" | "TJ" => {
                if let Some(text) = operands.first().and_then(operand_text) {
                    self.show(text);
                }
            }
            "'" => {
                self.next_line(0.0, -self.leading);
                if let Some(text) = operands.first().and_then(operand_text) {
                    self.show(text);
                }
            }
            "\"" => {
                self.next_line(0.0, -self.leading);
                if let Some(text) = operands.get(2).and_then(operand_text) {
                    self.show(text);
                }
            }
            _ => {}
        }
    }

    /// Lines sorted top to bottom, items joined by a space
    fn into_lines(self) -> Vec<String> {
        self.lines
            .into_iter()
            .rev()
            .map(|(_, items)| items.join(" "))
            .collect()
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Decode a string operand: UTF-8, then UTF-16BE with BOM, then Latin-1
fn decode_string(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn operand_text(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_string(bytes)),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_string(bytes)),
                    // Large negative kerning is a word gap
                    other => {
                        if number(other).is_some_and(|k| k < -100.0) {
                            text.push(' ');
                        }
                    }
                }
            }
            Some(text)
        }
        _ => None,
    }
}

/// Extract text lines from every page of a loaded document
pub fn extract_pages(doc: &Document) -> Vec<PageText> {
    doc.get_pages()
        .into_iter()
        .map(|(page, page_id)| {
            let mut state = TextState::new();
            match doc.get_page_content(page_id).map(|c| Content::decode(&c)) {
                Ok(Ok(content)) => {
                    for op in &content.operations {
                        state.apply(&op.operator, &op.operands);
                    }
                }
                _ => debug!(page, "Page content could not be decoded"),
            }
            let lines = state.into_lines();
            debug!(page, lines = lines.len(), "Extracted page text");
            PageText { page, lines }
        })
        .collect()
}

/// Parse `pdf_bytes` and extract text lines per page
pub fn extract_text(pdf_bytes: &[u8]) -> Result<Vec<PageText>, PdfSignError> {
    let doc =
        Document::load_mem(pdf_bytes).map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;
    Ok(extract_pages(&doc))
}
