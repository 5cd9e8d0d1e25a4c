//! # Document Renderer
//!
//! Draws the layout engine's instructions onto fixed-height text pages.
//!
//! ## Pagination
//! ```text
//! ┌──────────── page 1 ────────────┐      ┌──────────── page 2 ────────────┐
//! │ [logo]                          │      │ row 18  (moved whole)          │
//! │ title                           │      │ row 19                         │
//! │ header fields                   │      │ installation fee               │
//! │ table header                    │      │ grand total                    │
//! │ row 1 .. row 17                 │      │ signatures                     │
//! │ (row 18 would cross the bottom) │      │                                │
//! └─────────────────────────────────┘      └────────────────────────────────┘
//! ```
//!
//! Heights are in layout units; a row is never split across pages. A spacer
//! that does not fit is dropped instead of opening a page of its own.
//! Widths are in layout units too, [`UNITS_PER_CHAR`] units per character.

use invoice_core::layout::{Align, Cell, DrawInstruction, Row};

/// Horizontal layout units covered by one character.
pub const UNITS_PER_CHAR: u32 = 2;

/// A rendered invoice document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub pages: usize,
    pub text: String,
}

/// Splits `instructions` into pages of at most `page_height` units.
///
/// An instruction taller than a whole page still gets a page of its own.
pub fn paginate(instructions: &[DrawInstruction], page_height: u32) -> Vec<Vec<&DrawInstruction>> {
    let mut pages: Vec<Vec<&DrawInstruction>> = vec![Vec::new()];
    let mut used = 0;

    for instruction in instructions {
        let height = instruction.height();
        let page_has_content = pages.last().is_some_and(|p| !p.is_empty());

        if used + height > page_height && page_has_content {
            if matches!(instruction, DrawInstruction::Spacer { .. }) {
                continue;
            }
            pages.push(Vec::new());
            used = 0;
        }

        if let Some(page) = pages.last_mut() {
            page.push(instruction);
        }
        used += height;
    }

    pages
}

/// Renders instructions to UTF-8 text, pages separated by form feeds.
pub fn render_text(
    instructions: &[DrawInstruction],
    page_height: u32,
    line_height: u32,
) -> RenderedDocument {
    let pages = paginate(instructions, page_height);
    let total = pages.len();
    let line_height = line_height.max(1);
    let mut out = String::new();

    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            out.push_str("\u{c}\n");
        }

        // Bottom edge still owed by the last bordered row.
        let mut open_rule: Option<String> = None;

        for instruction in page {
            let bordered_row = match instruction {
                DrawInstruction::Row(row) if row.cells.iter().any(|c| c.bordered) => Some(row),
                _ => None,
            };

            if bordered_row.is_none() {
                if let Some(edge) = open_rule.take() {
                    push_line(&mut out, &edge);
                }
            }

            match instruction {
                DrawInstruction::Logo { width, height } => {
                    push_line(&mut out, &pad("[ LOGO ]", to_chars(*width), Align::Center));
                    blank_lines(&mut out, lines_for(*height, line_height).saturating_sub(1));
                }
                DrawInstruction::Spacer { height } => {
                    blank_lines(&mut out, lines_for(*height, line_height));
                }
                DrawInstruction::Row(row) => {
                    if bordered_row.is_some() {
                        let edge = rule(row);
                        push_line(&mut out, &edge);
                        open_rule = Some(edge);
                    }
                    draw_row(&mut out, row, line_height);
                }
            }
        }

        if let Some(edge) = open_rule.take() {
            push_line(&mut out, &edge);
        }

        out.push('\n');
        push_line(&mut out, &format!("- {} / {} -", index + 1, total));
    }

    RenderedDocument { pages: total, text: out }
}

fn draw_row(out: &mut String, row: &Row, line_height: u32) {
    let lines = lines_for(row.height, line_height).max(1);
    let bordered = row.cells.iter().any(|c| c.bordered);

    for line in 0..lines {
        let mut rendered = String::new();
        if bordered {
            rendered.push('|');
        }
        for cell in &row.cells {
            rendered.push_str(&cell_line(cell, line));
            if bordered {
                rendered.push('|');
            }
        }
        push_line(out, &rendered);
    }
}

fn cell_line(cell: &Cell, line: usize) -> String {
    let text = cell.lines.get(line).map(String::as_str).unwrap_or("");
    pad(text, to_chars(cell.width), cell.align)
}

/// Pads `text` to `width` characters. Longer text is kept whole.
fn pad(text: &str, width: usize, how: Align) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let free = width - len;
    let (left, right) = match how {
        Align::Left => (0, free),
        Align::Right => (free, 0),
        Align::Center => (free / 2, free - free / 2),
    };
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

/// `+-----+---+` matching the cell boundaries of `row`.
fn rule(row: &Row) -> String {
    let mut out = String::from("+");
    for cell in &row.cells {
        out.push_str(&"-".repeat(to_chars(cell.width)));
        out.push('+');
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn blank_lines(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push('\n');
    }
}

fn to_chars(units: u32) -> usize {
    (units / UNITS_PER_CHAR).max(1) as usize
}

fn lines_for(height: u32, line_height: u32) -> usize {
    (height / line_height) as usize
}
