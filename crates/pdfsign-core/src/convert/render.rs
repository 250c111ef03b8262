//! Plain text flow onto A4 pages
//!
//! Paragraphs are set in Helvetica with greedy word wrapping. There is no
//! hyphenation, justification, or float handling.

use super::docx::{Paragraph, ParagraphStyle};
use crate::error::PdfSignError;
use crate::geometry::PageSize;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// Page padding in points (40 CSS px)
const MARGIN: f64 = 30.0;
/// Body text size in points (14 CSS px)
const BODY_SIZE: f64 = 10.5;
const LINE_HEIGHT: f64 = 1.6;

const REGULAR: &[u8] = b"F1";
const BOLD: &[u8] = b"F2";

/// Standard Helvetica advance widths for 0x20..=0x7E, per 1000 em
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for glyphs outside the ASCII table
const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    font: &'static [u8],
    size: f64,
}

impl TextStyle {
    fn for_paragraph(style: ParagraphStyle) -> Self {
        match style {
            ParagraphStyle::Body => Self {
                font: REGULAR,
                size: BODY_SIZE,
            },
            ParagraphStyle::Title | ParagraphStyle::Heading1 => Self {
                font: BOLD,
                size: 18.0,
            },
            ParagraphStyle::Heading2 => Self {
                font: BOLD,
                size: 15.0,
            },
            ParagraphStyle::Heading3 => Self {
                font: BOLD,
                size: 12.0,
            },
        }
    }

    fn line_height(&self) -> f64 {
        self.size * LINE_HEIGHT
    }

    fn char_width(&self, c: char) -> f64 {
        let table = if self.font == BOLD {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        };
        let units = match c as u32 {
            code @ 0x20..=0x7E => table[(code - 0x20) as usize],
            _ => FALLBACK_WIDTH,
        };
        units as f64 * self.size / 1000.0
    }

    fn text_width(&self, text: &str) -> f64 {
        text.chars().map(|c| self.char_width(c)).sum()
    }
}

/// Map a char to its WinAnsiEncoding byte; unmappable chars become `?`
fn win_ansi(c: char) -> u8 {
    match c as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
        _ => match c {
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        },
    }
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines always break. Words wider than a line are split by
/// character.
fn wrap(text: &str, style: &TextStyle, max_width: f64) -> Vec<String> {
    let space = style.char_width(' ');
    let mut lines = Vec::new();

    for hard_line in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0;

        // Tabs and runs of spaces collapse to a single space
        for word in hard_line.split_whitespace() {
            let word_width = style.text_width(word);
            let needed = if line.is_empty() {
                word_width
            } else {
                width + space + word_width
            };

            if needed <= max_width {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
                width = needed;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }

            if word_width <= max_width {
                line.push_str(word);
                width = word_width;
                continue;
            }

            for c in word.chars() {
                let cw = style.char_width(c);
                if width + cw > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push(c);
                width += cw;
            }
        }
        lines.push(line);
    }

    lines
}

/// One positioned line of text
struct PlacedLine {
    style: TextStyle,
    x: f64,
    y: f64,
    text: String,
}

/// Lay paragraphs out into pages of placed lines
fn layout(paragraphs: &[Paragraph], page: PageSize) -> Vec<Vec<PlacedLine>> {
    let max_width = page.width - 2.0 * MARGIN;
    let top = page.height - MARGIN;

    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut cursor = top;

    for paragraph in paragraphs {
        let style = TextStyle::for_paragraph(paragraph.style);
        for _ in 0..paragraph.breaks_before {
            cursor -= style.line_height();
        }

        for text in wrap(&paragraph.text, &style, max_width) {
            if cursor - style.line_height() < MARGIN {
                pages.push(Vec::new());
                cursor = top;
            }
            cursor -= style.line_height();
            // Baseline sits in the lower part of the line box
            let baseline = cursor + (style.line_height() - style.size) / 2.0 + style.size * 0.2;
            if !text.is_empty() {
                if let Some(current) = pages.last_mut() {
                    current.push(PlacedLine {
                        style,
                        x: MARGIN,
                        y: baseline,
                        text,
                    });
                }
            }
        }
        // Paragraph gap of one em
        cursor -= style.size;
    }

    pages
}

fn page_content(lines: &[PlacedLine]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 3 + 2);
    operations.push(Operation::new("BT", vec![]));
    for line in lines {
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(line.style.font.to_vec()),
                Object::Real(line.style.size as f32),
            ],
        ));
        operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real(line.x as f32),
                Object::Real(line.y as f32),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                line.text.chars().map(win_ansi).collect(),
                StringFormat::Literal,
            )],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

fn add_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Render paragraphs to a PDF on A4 pages
pub fn render_pdf(paragraphs: &[Paragraph]) -> Result<Vec<u8>, PdfSignError> {
    let page_size = PageSize::a4();
    let pages = layout(paragraphs, page_size);

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular = add_font(&mut doc, "Helvetica");
    let bold = add_font(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(regular),
            "F2" => Object::Reference(bold),
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for lines in &pages {
        let content = page_content(lines)
            .encode()
            .map_err(|e| PdfSignError::Serialization(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }
    debug!(pages = kids.len(), "Laid out text flow");

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.clone(),
            "Count" => kids.len() as i64,
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(page_size.width as f32),
                Object::Real(page_size.height as f32),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfSignError::Serialization(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body() -> TextStyle {
        TextStyle::for_paragraph(ParagraphStyle::Body)
    }

    #[test]
    fn test_width_tables_cover_printable_ascii() {
        assert_eq!(HELVETICA.len(), 0x7E - 0x20 + 1);
        assert_eq!(HELVETICA_BOLD.len(), HELVETICA.len());
        let style = TextStyle {
            font: REGULAR,
            size: 1000.0,
        };
        assert_eq!(style.char_width('A'), 667.0);
        assert_eq!(style.char_width('i'), 222.0);
        assert_eq!(style.char_width('é'), 556.0);
    }

    #[test]
    fn test_wrap_respects_width() {
        let style = body();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(20);
        let lines = wrap(&text, &style, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(style.text_width(line) <= 200.0, "{} too wide", line);
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, text.trim_end());
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let style = body();
        let word = "x".repeat(200);
        let lines = wrap(&word, &style, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_keeps_hard_breaks() {
        let lines = wrap("one\ntwo", &body(), 500.0);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_wrap_collapses_tabs_and_space_runs() {
        let lines = wrap("Name:\tJane   Doe", &body(), 500.0);
        assert_eq!(lines, vec!["Name: Jane Doe"]);
    }

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi('A'), b'A');
        assert_eq!(win_ansi('é'), 0xE9);
        assert_eq!(win_ansi('€'), 0x80);
        assert_eq!(win_ansi('\u{201C}'), 0x93);
        assert_eq!(win_ansi('中'), b'?');
    }

    #[test]
    fn test_layout_overflows_to_new_page() {
        let paragraphs: Vec<_> = (0..200)
            .map(|i| Paragraph::body(format!("Paragraph {}", i)))
            .collect();
        let pages = layout(&paragraphs, PageSize::a4());
        assert!(pages.len() > 1);
        for page in &pages {
            for line in page {
                assert!(line.y >= MARGIN);
                assert!(line.y <= PageSize::a4().height - MARGIN);
            }
        }
    }

    #[test]
    fn test_render_produces_loadable_pdf() {
        let pdf = render_pdf(&[
            Paragraph {
                style: ParagraphStyle::Heading1,
                text: "Heading".into(),
                breaks_before: 0,
            },
            Paragraph::body("Body text"),
        ])
        .unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
