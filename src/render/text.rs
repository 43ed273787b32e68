//! Text measurement, font-safe substitution and greedy word wrapping.

/// Width of a piece of text in the caller's unit (millimetres for the PDF
/// renderer). Any `Fn(&str) -> f32` is a `Measure`, which keeps layout
/// independent of the font backend.
pub trait Measure {
    fn width(&self, text: &str) -> f32;
}

impl<F> Measure for F
where
    F: Fn(&str) -> f32,
{
    fn width(&self, text: &str) -> f32 {
        self(text)
    }
}

/// Replacement for characters the built-in fonts cannot encode.
pub const SUBSTITUTE: char = '?';

const PT_TO_MM: f32 = 0.352_778;

/// Advance widths (1/1000 em) of Helvetica for 0x20..=0x7E.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths (1/1000 em) of Helvetica-Bold for 0x20..=0x7E.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for Latin-1 characters outside the ASCII tables.
const FALLBACK_WIDTH: u16 = 556;

/// Helvetica metrics at a given size, measuring in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelveticaMetrics {
    pub size_pt: f32,
    pub bold: bool,
}

impl HelveticaMetrics {
    pub fn regular(size_pt: f32) -> Self {
        Self {
            size_pt,
            bold: false,
        }
    }

    pub fn bold(size_pt: f32) -> Self {
        Self {
            size_pt,
            bold: true,
        }
    }

    fn advance(&self, c: char) -> u16 {
        let table = if self.bold {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        };
        match c as u32 {
            code @ 0x20..=0x7E => table[(code - 0x20) as usize],
            _ => FALLBACK_WIDTH,
        }
    }
}

impl Measure for HelveticaMetrics {
    fn width(&self, text: &str) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.advance(c))).sum();
        units as f32 / 1000.0 * self.size_pt * PT_TO_MM
    }
}

/// Whether the built-in WinAnsi fonts can draw `c`.
pub fn is_encodable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF)
}

/// Replace characters the built-in fonts cannot encode with [`SUBSTITUTE`].
/// Returns the cleaned text and how many characters were replaced.
pub fn sanitize(text: &str) -> (String, usize) {
    let mut replaced = 0;
    let cleaned = text
        .chars()
        .map(|c| {
            if is_encodable(c) {
                c
            } else if c.is_whitespace() {
                ' '
            } else {
                replaced += 1;
                SUBSTITUTE
            }
        })
        .collect();
    (cleaned, replaced)
}

/// Greedy word wrap. Words are packed while the measured line fits in
/// `max_width`; a word wider than `max_width` on its own is split into
/// character runs that each fit. Always returns at least one line.
pub fn wrap<M>(text: &str, max_width: f32, measure: &M) -> Vec<String>
where
    M: Measure + ?Sized,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure.width(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure.width(word) <= max_width {
            current = word.to_string();
        } else {
            let mut parts = split_word(word, max_width, measure);
            current = parts.pop().unwrap_or_default();
            lines.extend(parts);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split a single word into runs that each fit `max_width`. A character
/// wider than `max_width` still gets a run of its own.
fn split_word<M>(word: &str, max_width: f32, measure: &M) -> Vec<String>
where
    M: Measure + ?Sized,
{
    let mut parts = Vec::new();
    let mut part = String::new();
    for c in word.chars() {
        part.push(c);
        if measure.width(&part) > max_width && part.chars().count() > 1 {
            part.pop();
            parts.push(std::mem::take(&mut part));
            part.push(c);
        }
    }
    if !part.is_empty() {
        parts.push(part);
    }
    parts
}
