//! PDF invoice rendering.
//!
//! [`layout`] places every piece of text on A4 pages and is pure; [`render`]
//! draws that layout with `printpdf` using the built-in Helvetica faces.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;

use rimline_core::invoice::{Invoice, InvoiceLine};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 15.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const ROW: f32 = 6.0;
const NOTE_ROW: f32 = 4.5;
/// Room kept free on the last page for the totals block.
const TOTALS_HEIGHT: f32 = 32.0;
const DESCRIPTION_CHARS: usize = 52;

const COL_QTY: f32 = 112.0;
const COL_UNIT: f32 = 126.0;
const COL_SERVICES: f32 = 152.0;
const COL_TOTAL: f32 = 176.0;

/// Errors rendering a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(#[from] printpdf::Error),
}

/// Typeface of a text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

/// A run of text at a position, in millimetres from the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub face: Face,
}

/// Accumulates text items, starting a new page when a row does not fit.
struct Pages {
    pages: Vec<Vec<TextItem>>,
    y: f32,
}

impl Pages {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: TOP,
        }
    }

    fn text(&mut self, x: f32, size: f32, face: Face, text: impl Into<String>) {
        let item = TextItem {
            text: text.into(),
            x,
            y: self.y,
            size,
            face,
        };
        if let Some(page) = self.pages.last_mut() {
            page.push(item);
        }
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
    }

    /// Start a new page unless `height` still fits above `reserve`.
    fn ensure(&mut self, height: f32, reserve: f32) -> bool {
        if self.y - height < BOTTOM + reserve {
            self.pages.push(Vec::new());
            self.y = TOP;
            true
        } else {
            false
        }
    }
}

fn column_headings(pages: &mut Pages) {
    pages.text(MARGIN_LEFT, 9.0, Face::Bold, "Item");
    pages.text(COL_QTY, 9.0, Face::Bold, "Qty");
    pages.text(COL_UNIT, 9.0, Face::Bold, "Unit");
    pages.text(COL_SERVICES, 9.0, Face::Bold, "Services");
    pages.text(COL_TOTAL, 9.0, Face::Bold, "Total");
    pages.advance(ROW);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
        short.push_str("...");
        short
    }
}

fn line_height(line: &InvoiceLine) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let notes = line.notes.len() as f32;
    notes.mul_add(NOTE_ROW, ROW)
}

/// Place the invoice on pages.
#[must_use]
pub fn layout(invoice: &Invoice, store_name: &str) -> Vec<Vec<TextItem>> {
    let mut pages = Pages::new();

    pages.text(MARGIN_LEFT, 18.0, Face::Bold, store_name);
    pages.text(COL_UNIT, 18.0, Face::Bold, "INVOICE");
    pages.advance(9.0);
    pages.text(COL_UNIT, 10.0, Face::Regular, format!("Order #{}", invoice.order_number));
    pages.advance(5.0);
    pages.text(
        COL_UNIT,
        10.0,
        Face::Regular,
        format!("Date {}", invoice.issued_at.format("%Y-%m-%d")),
    );
    pages.advance(5.0);
    pages.text(COL_UNIT, 10.0, Face::Regular, format!("Status {}", invoice.status));
    pages.advance(5.0);
    pages.text(COL_UNIT, 10.0, Face::Regular, format!("Payment {}", invoice.payment_status));
    pages.advance(10.0);

    pages.text(MARGIN_LEFT, 10.0, Face::Bold, "Bill to");
    pages.advance(5.0);
    pages.text(MARGIN_LEFT, 10.0, Face::Regular, invoice.customer.as_str());
    pages.advance(5.0);
    for line in &invoice.ship_to {
        pages.text(MARGIN_LEFT, 10.0, Face::Regular, line.as_str());
        pages.advance(5.0);
    }
    pages.advance(6.0);

    column_headings(&mut pages);
    let count = invoice.lines.len();
    for (index, line) in invoice.lines.iter().enumerate() {
        let reserve = if index + 1 == count { TOTALS_HEIGHT } else { 0.0 };
        if pages.ensure(line_height(line), reserve) {
            column_headings(&mut pages);
        }

        pages.text(
            MARGIN_LEFT,
            10.0,
            Face::Regular,
            truncate(&line.description, DESCRIPTION_CHARS),
        );
        pages.text(COL_QTY, 10.0, Face::Regular, line.quantity.to_string());
        pages.text(COL_UNIT, 10.0, Face::Regular, line.unit_price.to_string());
        pages.text(COL_SERVICES, 10.0, Face::Regular, line.services.to_string());
        pages.text(COL_TOTAL, 10.0, Face::Regular, line.total.to_string());
        pages.advance(NOTE_ROW);
        for note in &line.notes {
            pages.text(MARGIN_LEFT + 4.0, 8.0, Face::Regular, truncate(note, DESCRIPTION_CHARS + 10));
            pages.advance(NOTE_ROW);
        }
        pages.advance(ROW - NOTE_ROW);
    }

    pages.ensure(TOTALS_HEIGHT, 0.0);
    pages.advance(4.0);
    let totals = [
        ("Merchandise", invoice.merchandise.to_string(), Face::Regular),
        ("Services", invoice.services.to_string(), Face::Regular),
        ("Discount", format!("-{}", invoice.discount), Face::Regular),
        ("Total", invoice.total.to_string(), Face::Bold),
    ];
    for (label, amount, face) in totals {
        pages.text(COL_SERVICES, 10.0, face, label);
        pages.text(COL_TOTAL, 10.0, face, amount);
        pages.advance(ROW);
    }

    pages.pages
}

/// Render the invoice as PDF bytes.
///
/// # Errors
///
/// Returns an error if `printpdf` fails to build or serialize the document.
pub fn render(invoice: &Invoice, store_name: &str) -> Result<Vec<u8>, PdfError> {
    let title = format!("Invoice {}", invoice.order_number);
    let (doc, first_page, first_layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for (index, items) in layout(invoice, store_name).into_iter().enumerate() {
        let (page, layer) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1")
        };
        let layer = doc.get_page(page).get_layer(layer);
        for item in items {
            let font = match item.face {
                Face::Regular => &regular,
                Face::Bold => &bold,
            };
            layer.use_text(item.text, item.size, Mm(item.x), Mm(item.y), font);
        }
    }

    Ok(doc.save_to_bytes()?)
}

/// `Content-Disposition` value for an invoice download.
#[must_use]
pub fn attachment_header(order_number: &str) -> String {
    let safe: String = order_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    format!("attachment; filename=\"invoice-{safe}.pdf\"")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rimline_core::types::{Money, OrderStatus, PaymentStatus};

    use super::*;

    fn invoice(lines: usize) -> Invoice {
        let line = InvoiceLine {
            description: "Michelin Pilot Sport 4S 245/40ZR18".to_string(),
            notes: vec!["Priced as 1 set of 4".to_string(), "TPMS Rebuild $9.99 each".to_string()],
            quantity: 4,
            unit_price: Money::from_cents(27_500),
            merchandise: Money::from_cents(99_900),
            services: Money::from_cents(3_996),
            discount: Money::ZERO,
            total: Money::from_cents(103_896),
        };
        let total = Money::from_cents(103_896) * u32::try_from(lines).unwrap();
        Invoice {
            order_number: "10042".to_string(),
            issued_at: Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).single().unwrap(),
            customer: "Dana Reyes".to_string(),
            ship_to: vec!["Dana Reyes".to_string(), "1 Main St".to_string(), "Austin, TX 78701".to_string()],
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Paid,
            lines: vec![line; lines],
            merchandise: total,
            services: Money::ZERO,
            discount: Money::ZERO,
            total,
        }
    }

    fn texts(pages: &[Vec<TextItem>]) -> Vec<&str> {
        pages.iter().flatten().map(|item| item.text.as_str()).collect()
    }

    #[test]
    fn test_layout_single_page() {
        let pages = layout(&invoice(2), "Rimline");
        assert_eq!(pages.len(), 1);
        let texts = texts(&pages);
        assert!(texts.contains(&"Order #10042"));
        assert!(texts.contains(&"Date 2025-03-14"));
        assert!(texts.contains(&"Austin, TX 78701"));
        // Line totals are printed as the invoice lines carry them
        assert_eq!(texts.iter().filter(|t| **t == "$1,038.96").count(), 2);
        assert!(texts.contains(&"$2,077.92"));
    }

    #[test]
    fn test_layout_paginates_and_stays_on_page() {
        let pages = layout(&invoice(40), "Rimline");
        assert!(pages.len() > 1);
        for page in &pages {
            for item in page {
                assert!(item.y >= BOTTOM && item.y <= TOP, "{} at {}", item.text, item.y);
            }
        }
        // Every continuation page repeats the column headings
        for page in pages.iter().skip(1) {
            assert_eq!(page[0].text, "Item");
        }
        assert_eq!(texts(&pages).iter().filter(|t| **t == "Total").count(), pages.len() + 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render(&invoice(3), "Rimline").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_attachment_header() {
        assert_eq!(attachment_header("10042"), "attachment; filename=\"invoice-10042.pdf\"");
        assert_eq!(attachment_header("A/1\"x"), "attachment; filename=\"invoice-A1x.pdf\"");
    }
}
