//! printpdf backend: turns a laid out [`Document`] into PDF bytes using the
//! built-in Helvetica fonts.

use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt,
    Rgb, TextItem,
};
use tracing::{debug, warn};

use super::table::{DrawCommand, Document};

const BORDER_THICKNESS: f32 = 0.5;

fn font(bold: bool) -> BuiltinFont {
    if bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    }
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point::new(Mm(x), Mm(y)),
        bezier: false,
    }
}

fn page_ops(commands: &[DrawCommand]) -> Vec<Op> {
    let mut ops = vec![
        Op::SetOutlineColor {
            col: Color::Rgb(Rgb {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                icc_profile: None,
            }),
        },
        Op::SetOutlineThickness {
            pt: Pt(BORDER_THICKNESS),
        },
    ];

    for command in commands {
        match command {
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
            } => ops.push(Op::DrawLine {
                line: Line {
                    points: vec![
                        point(*x, *y),
                        point(x + width, *y),
                        point(x + width, y + height),
                        point(*x, y + height),
                    ],
                    is_closed: true,
                },
            }),
            DrawCommand::Text {
                x,
                y,
                text,
                size_pt,
                bold,
            } => {
                ops.extend([
                    Op::StartTextSection,
                    Op::SetTextCursor {
                        pos: Point::new(Mm(*x), Mm(*y)),
                    },
                    Op::SetFontSizeBuiltinFont {
                        size: Pt(*size_pt),
                        font: font(*bold),
                    },
                    Op::WriteTextBuiltinFont {
                        items: vec![TextItem::Text(text.clone())],
                        font: font(*bold),
                    },
                    Op::EndTextSection,
                ]);
            }
        }
    }
    ops
}

/// Serialise the document. Warnings from the PDF writer are logged, not fatal.
pub fn to_pdf_bytes(document: &Document, title: &str) -> Vec<u8> {
    let pages: Vec<PdfPage> = document
        .pages
        .iter()
        .map(|page| {
            PdfPage::new(
                Mm(document.width),
                Mm(document.height),
                page_ops(&page.commands),
            )
        })
        .collect();
    let page_count = pages.len();

    let mut doc = PdfDocument::new(title);
    doc.with_pages(pages);
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);

    if !warnings.is_empty() {
        warn!(count = warnings.len(), "PDF writer reported warnings");
        debug!(?warnings, "PDF writer warnings");
    }
    debug!(pages = page_count, bytes = bytes.len(), "Serialised PDF");
    bytes
}
