//! # Table Layout Engine
//!
//! Turns a priced [`Invoice`] into an ordered list of draw instructions for
//! a page-based rendering primitive.
//!
//! ## Document Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [logo]                                              (optional)         │
//! │                           Sales Invoice                                 │
//! │  ┌───────────────────────────────┬───────────────────────────────┐     │
//! │  │ Date: 1402/03/13              │ Invoice No.: 230603094112     │     │
//! │  │ By: Sara                      │ Store: Tehran Pumps           │     │
//! │  │ Customer: Reza                │ Phone: 0912                   │     │
//! │  │ Address: Tehran               │ Customer Code: 12             │     │
//! │  └───────────────────────────────┴───────────────────────────────┘     │
//! │  ┌────────┬────────┬─────┬──────────────┬──┐                            │
//! │  │ Total  │ Unit   │ Qty │ Description  │ #│  ← table header            │
//! │  ├────────┼────────┼─────┼──────────────┼──┤                            │
//! │  │        │        │     │ wrapped      │  │  ← one row per line,       │
//! │  │  total │  unit  │  2  │ product name │ 1│    every cell as tall as   │
//! │  ├────────┼────────┴─────┴──────────────┴──┤    the wrapped name        │
//! │  │  fee   │ Installation Fee               │                            │
//! │  │  grand │ Grand Total                    │                            │
//! │  └────────┴────────────────────────────────┘                            │
//! │            Amount in words: two million six thousand Rials              │
//! │  Seller Signature                              Buyer Signature          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Column order follows right-to-left reading: the index sits at the right
//! edge and the total at the left.
//!
//! The engine never paginates. It guarantees each row is self-consistent
//! (every cell shares the row height) so the renderer can move a whole row
//! to the next page instead of splitting it.

use serde::{Deserialize, Serialize};

use crate::invoice::Invoice;
use crate::words::NumberWords;

// =============================================================================
// Configuration
// =============================================================================

/// Reading direction of the document script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Rtl,
    Ltr,
}

/// Table column widths in page units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnWidths {
    pub total: u32,
    pub unit_price: u32,
    pub quantity: u32,
    pub name: u32,
    pub index: u32,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            total: 40,
            unit_price: 40,
            quantity: 20,
            name: 60,
            index: 10,
        }
    }
}

impl ColumnWidths {
    /// Width of the whole table.
    pub fn table_width(&self) -> u32 {
        self.total + self.unit_price + self.quantity + self.name + self.index
    }
}

/// Geometry of the laid-out document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Height of one text line.
    pub line_height: u32,

    /// Product names wrap once a line would exceed this many characters.
    pub name_wrap_chars: usize,

    /// Usable page height, consumed by the renderer.
    pub page_height: u32,

    /// Width of each of the two header field columns.
    pub header_cell_width: u32,

    /// Height reserved for the logo when one is present.
    pub logo_height: u32,

    /// Vertical gap between header blocks.
    pub spacer_height: u32,

    pub direction: TextDirection,

    pub columns: ColumnWidths,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_height: 10,
            name_wrap_chars: 24,
            page_height: 277,
            header_cell_width: 95,
            logo_height: 30,
            spacer_height: 10,
            direction: TextDirection::Rtl,
            columns: ColumnWidths::default(),
        }
    }
}

/// Localizable captions printed on the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentLabels {
    pub title: String,
    pub date: String,
    pub invoice_number: String,
    pub seller: String,
    pub store: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub customer_code: String,
    pub column_total: String,
    pub column_unit_price: String,
    pub column_quantity: String,
    pub column_name: String,
    pub column_index: String,
    pub installation_fee: String,
    pub grand_total: String,
    pub currency: String,
    pub amount_in_words: String,
    /// Language the grand total is spelled in.
    pub number_words: NumberWords,
    pub seller_signature: String,
    pub buyer_signature: String,
    pub store_missing: String,
    pub seller_missing: String,
}

impl Default for DocumentLabels {
    fn default() -> Self {
        Self {
            title: "Sales Invoice".to_string(),
            date: "Date".to_string(),
            invoice_number: "Invoice No.".to_string(),
            seller: "By".to_string(),
            store: "Store".to_string(),
            customer_name: "Customer".to_string(),
            customer_phone: "Phone".to_string(),
            customer_address: "Address".to_string(),
            customer_code: "Customer Code".to_string(),
            column_total: "Total (Rials)".to_string(),
            column_unit_price: "Unit Price (Rials)".to_string(),
            column_quantity: "Qty".to_string(),
            column_name: "Description".to_string(),
            column_index: "#".to_string(),
            installation_fee: "Installation Fee".to_string(),
            grand_total: "Grand Total".to_string(),
            currency: "Rials".to_string(),
            amount_in_words: "Amount in words".to_string(),
            number_words: NumberWords::English,
            seller_signature: "Seller Signature".to_string(),
            buyer_signature: "Buyer Signature".to_string(),
            store_missing: "Store name not set".to_string(),
            seller_missing: "Seller name not set".to_string(),
        }
    }
}

// =============================================================================
// Draw Instructions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One rectangle of a row. Its height is the row's height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub width: u32,
    /// Display lines, top to bottom.
    pub lines: Vec<String>,
    pub align: Align,
    pub bordered: bool,
}

impl Cell {
    fn text(width: u32, text: impl Into<String>, align: Align, bordered: bool) -> Self {
        Self {
            width,
            lines: vec![text.into()],
            align,
            bordered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Title,
    HeaderField,
    TableHeader,
    Line,
    InstallationFee,
    GrandTotal,
    AmountInWords,
    Signature,
}

/// A horizontal band of cells that must stay on a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub kind: RowKind,
    pub height: u32,
    pub cells: Vec<Cell>,
}

impl Row {
    fn new(kind: RowKind, line_height: u32, cells: Vec<Cell>) -> Self {
        let lines = cells.iter().map(|c| c.lines.len()).max().unwrap_or(1).max(1);
        Self {
            kind,
            height: line_height * lines as u32,
            cells,
        }
    }

    /// Width of the row (sum of cell widths).
    pub fn width(&self) -> u32 {
        self.cells.iter().map(|c| c.width).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawInstruction {
    /// The user's logo, drawn at the top of the first page.
    Logo { width: u32, height: u32 },
    Row(Row),
    Spacer { height: u32 },
}

impl DrawInstruction {
    /// Vertical space the instruction occupies.
    pub fn height(&self) -> u32 {
        match self {
            DrawInstruction::Logo { height, .. } => *height,
            DrawInstruction::Row(row) => row.height,
            DrawInstruction::Spacer { height } => *height,
        }
    }
}

// =============================================================================
// Text Wrapping
// =============================================================================

/// Greedily wraps `text` into lines of at most `max_chars` characters,
/// breaking only at whitespace.
///
/// A single word longer than `max_chars` gets a line of its own and is never
/// cut. Blank input yields one empty line so every row has a height.
///
/// ## Example
/// ```rust
/// use invoice_core::layout::wrap_text;
///
/// assert_eq!(wrap_text("stainless steel pipe", 10), ["stainless", "steel pipe"]);
/// assert_eq!(wrap_text("supercalifragilistic", 5), ["supercalifragilistic"]);
/// ```
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wraps a product name for its table cell, reversing the line order for
/// right-to-left scripts.
pub fn wrap_name(name: &str, config: &LayoutConfig) -> Vec<String> {
    let mut lines = wrap_text(name, config.name_wrap_chars);
    if config.direction == TextDirection::Rtl {
        lines.reverse();
    }
    lines
}

// =============================================================================
// Layout
// =============================================================================

/// Lays out `invoice` as header block, table header, one row per line and
/// the two totals rows, followed by the amount in words and the signature
/// labels.
pub fn layout_invoice(
    invoice: &Invoice,
    has_logo: bool,
    config: &LayoutConfig,
    labels: &DocumentLabels,
) -> Vec<DrawInstruction> {
    let mut out = Vec::with_capacity(invoice.lines.len() + 12);
    let lh = config.line_height;
    let half = config.header_cell_width;
    let full = half * 2;

    // ---- header block (first page only) -----------------------------------
    if has_logo {
        out.push(DrawInstruction::Logo {
            width: full,
            height: config.logo_height,
        });
    }
    out.push(DrawInstruction::Row(Row::new(
        RowKind::Title,
        lh,
        vec![Cell::text(full, &labels.title, Align::Center, false)],
    )));
    out.push(DrawInstruction::Spacer {
        height: config.spacer_height,
    });

    let seller = invoice
        .seller
        .seller_name
        .as_deref()
        .unwrap_or(&labels.seller_missing);
    let store = invoice
        .seller
        .store_name
        .as_deref()
        .unwrap_or(&labels.store_missing);
    let customer = &invoice.customer;

    let field_pairs = [
        (
            (labels.date.as_str(), invoice.display_date.as_str()),
            (labels.invoice_number.as_str(), invoice.number.as_str()),
        ),
        ((labels.seller.as_str(), seller), (labels.store.as_str(), store)),
        (
            (labels.customer_name.as_str(), customer.name.as_str()),
            (labels.customer_phone.as_str(), customer.phone.as_str()),
        ),
        (
            (labels.customer_address.as_str(), customer.address.as_str()),
            (labels.customer_code.as_str(), customer.code.as_str()),
        ),
    ];
    for ((left_label, left), (right_label, right)) in field_pairs {
        out.push(DrawInstruction::Row(Row::new(
            RowKind::HeaderField,
            lh,
            vec![
                Cell::text(half, format!("{}: {}", left_label, left), Align::Right, true),
                Cell::text(half, format!("{}: {}", right_label, right), Align::Right, true),
            ],
        )));
    }
    out.push(DrawInstruction::Spacer {
        height: config.spacer_height,
    });

    // ---- table -------------------------------------------------------------
    let cols = &config.columns;
    out.push(DrawInstruction::Row(Row::new(
        RowKind::TableHeader,
        lh,
        vec![
            Cell::text(cols.total, &labels.column_total, Align::Center, true),
            Cell::text(cols.unit_price, &labels.column_unit_price, Align::Center, true),
            Cell::text(cols.quantity, &labels.column_quantity, Align::Center, true),
            Cell::text(cols.name, &labels.column_name, Align::Center, true),
            Cell::text(cols.index, &labels.column_index, Align::Center, true),
        ],
    )));

    for (idx, line) in invoice.lines.iter().enumerate() {
        let name = Cell {
            width: cols.name,
            lines: wrap_name(&line.name, config),
            align: Align::Center,
            bordered: true,
        };
        out.push(DrawInstruction::Row(Row::new(
            RowKind::Line,
            lh,
            vec![
                Cell::text(cols.total, line.line_total.to_string(), Align::Center, true),
                Cell::text(cols.unit_price, line.unit_price.to_string(), Align::Center, true),
                Cell::text(cols.quantity, line.quantity.to_string(), Align::Center, true),
                name,
                Cell::text(cols.index, (idx + 1).to_string(), Align::Center, true),
            ],
        )));
    }

    let label_width = cols.table_width() - cols.total;
    out.push(DrawInstruction::Row(Row::new(
        RowKind::InstallationFee,
        lh,
        vec![
            Cell::text(cols.total, invoice.installation_fee.to_string(), Align::Center, true),
            Cell::text(label_width, &labels.installation_fee, Align::Right, true),
        ],
    )));
    out.push(DrawInstruction::Row(Row::new(
        RowKind::GrandTotal,
        lh,
        vec![
            Cell::text(
                cols.total,
                format!("{} {}", invoice.grand_total, labels.currency),
                Align::Center,
                true,
            ),
            Cell::text(label_width, &labels.grand_total, Align::Right, true),
        ],
    )));

    // ---- footer ------------------------------------------------------------
    out.push(DrawInstruction::Spacer {
        height: config.spacer_height,
    });
    let words = format!(
        "{}: {} {}",
        labels.amount_in_words,
        labels.number_words.spell(invoice.grand_total.minor()),
        labels.currency
    );
    out.push(DrawInstruction::Row(Row::new(
        RowKind::AmountInWords,
        lh,
        vec![Cell::text(full, words, Align::Center, false)],
    )));
    out.push(DrawInstruction::Row(Row::new(
        RowKind::Signature,
        lh,
        vec![
            Cell::text(half, &labels.seller_signature, Align::Left, false),
            Cell::text(half, &labels.buyer_signature, Align::Right, false),
        ],
    )));

    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::invoice::PricedLine;
    use crate::types::{Customer, SellerInfo, UserId};
    use chrono::NaiveDate;

    fn invoice(names: &[&str]) -> Invoice {
        let lines = names
            .iter()
            .map(|name| PricedLine {
                name: name.to_string(),
                quantity: 2,
                unit_price: Money::from_minor(836_000),
                line_total: Money::from_minor(1_672_000),
            })
            .collect();
        Invoice {
            number: "230603094112".to_string(),
            issued_at: NaiveDate::from_ymd_opt(2023, 6, 3)
                .unwrap()
                .and_hms_opt(9, 41, 0)
                .unwrap(),
            display_date: "1402/03/13".to_string(),
            user_id: UserId::from("501"),
            seller: SellerInfo {
                store_name: Some("Tehran Pumps".to_string()),
                seller_name: None,
            },
            customer: Customer {
                code: "12".to_string(),
                name: "Reza".to_string(),
                phone: "0912".to_string(),
                address: "Tehran".to_string(),
            },
            lines,
            subtotal: Money::from_minor(1_672_000),
            installation_fee: Money::from_minor(334_000),
            grand_total: Money::from_minor(2_006_000),
        }
    }

    fn rows(instructions: &[DrawInstruction]) -> Vec<&Row> {
        instructions
            .iter()
            .filter_map(|i| match i {
                DrawInstruction::Row(row) => Some(row),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_wrap_text_breaks_at_whitespace_only() {
        assert_eq!(wrap_text("a bb ccc dddd", 6), ["a bb", "ccc", "dddd"]);
        assert_eq!(wrap_text("averyveryverylongword tail", 8), ["averyveryverylongword", "tail"]);
        assert_eq!(wrap_text("", 8), [""]);
        assert_eq!(wrap_text("   ", 8), [""]);
        // Exactly at the limit stays on one line.
        assert_eq!(wrap_text("abc def", 7), ["abc def"]);
    }

    #[test]
    fn test_wrap_counts_characters_not_bytes() {
        // Each Persian letter is two bytes in UTF-8.
        assert_eq!(wrap_text("لوله فولادی", 11), ["لوله فولادی"]);
        assert_eq!(wrap_text("لوله فولادی", 10), ["لوله", "فولادی"]);
    }

    #[test]
    fn test_wrap_name_reverses_for_rtl() {
        let rtl = LayoutConfig {
            name_wrap_chars: 6,
            ..LayoutConfig::default()
        };
        assert_eq!(wrap_name("one two three", &rtl), ["three", "two", "one"]);

        let ltr = LayoutConfig {
            direction: TextDirection::Ltr,
            ..rtl
        };
        assert_eq!(wrap_name("one two three", &ltr), ["one", "two", "three"]);
    }

    #[test]
    fn test_line_row_cells_share_wrapped_height() {
        let config = LayoutConfig {
            name_wrap_chars: 10,
            ..LayoutConfig::default()
        };
        let out = layout_invoice(
            &invoice(&["Widget", "stainless steel pipe fitting"]),
            false,
            &config,
            &DocumentLabels::default(),
        );
        let line_rows: Vec<&Row> = rows(&out)
            .into_iter()
            .filter(|r| r.kind == RowKind::Line)
            .collect();

        assert_eq!(line_rows.len(), 2);
        assert_eq!(line_rows[0].height, 10);
        // "stainless" / "steel pipe" / "fitting"
        assert_eq!(line_rows[1].height, 30);
        assert_eq!(line_rows[1].cells[3].lines, ["fitting", "steel pipe", "stainless"]);
        assert_eq!(line_rows[1].cells[4].lines, ["2"]);
        assert_eq!(line_rows[1].cells[0].lines, ["1,672,000"]);
    }

    #[test]
    fn test_instruction_order() {
        let out = layout_invoice(
            &invoice(&["Widget"]),
            true,
            &LayoutConfig::default(),
            &DocumentLabels::default(),
        );
        assert!(matches!(out[0], DrawInstruction::Logo { .. }));

        let kinds: Vec<RowKind> = rows(&out).iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                RowKind::Title,
                RowKind::HeaderField,
                RowKind::HeaderField,
                RowKind::HeaderField,
                RowKind::HeaderField,
                RowKind::TableHeader,
                RowKind::Line,
                RowKind::InstallationFee,
                RowKind::GrandTotal,
                RowKind::AmountInWords,
                RowKind::Signature,
            ]
        );
    }

    #[test]
    fn test_header_and_totals_text() {
        let out = layout_invoice(
            &invoice(&["Widget"]),
            false,
            &LayoutConfig::default(),
            &DocumentLabels::default(),
        );
        assert!(!out.iter().any(|i| matches!(i, DrawInstruction::Logo { .. })));

        let rows = rows(&out);
        let header: Vec<&str> = rows
            .iter()
            .filter(|r| r.kind == RowKind::HeaderField)
            .flat_map(|r| r.cells.iter().map(|c| c.lines[0].as_str()))
            .collect();
        assert!(header.contains(&"Date: 1402/03/13"));
        assert!(header.contains(&"Invoice No.: 230603094112"));
        assert!(header.contains(&"By: Seller name not set"));
        assert!(header.contains(&"Store: Tehran Pumps"));
        assert!(header.contains(&"Customer Code: 12"));

        let grand = rows.iter().find(|r| r.kind == RowKind::GrandTotal).unwrap();
        assert_eq!(grand.cells[0].lines, ["2,006,000 Rials"]);
        assert_eq!(grand.width(), LayoutConfig::default().columns.table_width());

        let words = rows.iter().find(|r| r.kind == RowKind::AmountInWords).unwrap();
        assert_eq!(words.cells[0].lines, ["Amount in words: two million six thousand Rials"]);

        let fee = rows.iter().find(|r| r.kind == RowKind::InstallationFee).unwrap();
        assert_eq!(fee.cells[0].lines, ["334,000"]);
        assert_eq!(fee.height, 10);
    }

    #[test]
    fn test_layout_config_partial_toml() {
        let config: LayoutConfig = toml::from_str(
            r#"
            name_wrap_chars = 30
            direction = "ltr"
            [columns]
            name = 80
            "#,
        )
        .unwrap();
        assert_eq!(config.name_wrap_chars, 30);
        assert_eq!(config.line_height, 10);
        assert_eq!(config.direction, TextDirection::Ltr);
        assert_eq!(config.columns.name, 80);
        assert_eq!(config.columns.total, 40);
    }

    #[test]
    fn test_amount_in_words_follows_labels() {
        let labels = DocumentLabels {
            amount_in_words: "مبلغ به حروف".to_string(),
            currency: "ریال".to_string(),
            number_words: NumberWords::Persian,
            ..DocumentLabels::default()
        };
        let out = layout_invoice(&invoice(&["Widget"]), false, &LayoutConfig::default(), &labels);

        let words = rows(&out)
            .into_iter()
            .find(|r| r.kind == RowKind::AmountInWords)
            .unwrap();
        assert_eq!(words.cells[0].lines, ["مبلغ به حروف: دو میلیون و شش هزار ریال"]);
        assert!(!words.cells[0].bordered);
    }
}
