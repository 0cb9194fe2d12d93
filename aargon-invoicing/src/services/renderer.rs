//! Invoice document renderer.
//!
//! Pure formatting over printpdf: lays out the header, metadata, bill-to and
//! per-month line-item blocks and returns the finished PDF as bytes. Amounts
//! and dates arrive fully computed; nothing here may alter them. Any drawing
//! or serialization failure surfaces as `RenderFailure` with no partial
//! artifact.

use aargon_core::error::AppError;
use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rust_decimal::Decimal;

use crate::models::MonthPreview;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const FOOTER_Y_MM: f32 = 15.0;

/// Header data for one invoice document.
#[derive(Debug, Clone)]
pub struct InvoiceHeader {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub client_name: String,
    pub client_address: Option<String>,
    pub months_label: String,
}

/// Renders invoice documents on behalf of the lifecycle manager.
#[derive(Debug, Clone)]
pub struct InvoiceRenderer {
    company_name: String,
}

struct Cursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    font_oblique: IndirectFontRef,
    y: f32,
}

impl Cursor {
    fn text(&self, font: &IndirectFontRef, size: f32, x: f32, text: &str) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self) {
        self.layer.add_line(printpdf::Line {
            points: vec![
                (printpdf::Point::new(Mm(MARGIN_MM), Mm(self.y)), false),
                (
                    printpdf::Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(self.y)),
                    false,
                ),
            ],
            is_closed: false,
        });
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Break to a fresh page when the remaining space is exhausted.
    fn ensure_room(&mut self, mm: f32) {
        if self.y - mm < FOOTER_Y_MM + 10.0 {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }
}

fn fmt_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

impl InvoiceRenderer {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }

    /// Produce the finished document bytes.
    pub fn render(
        &self,
        header: &InvoiceHeader,
        months: &[MonthPreview],
    ) -> Result<Vec<u8>, AppError> {
        let (doc, page1, layer1) = PdfDocument::new(
            format!("Invoice {}", header.invoice_number),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page1).get_layer(layer1);

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::RenderFailure(anyhow::anyhow!("pdf font error: {}", e)))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::RenderFailure(anyhow::anyhow!("pdf font error: {}", e)))?;
        let font_oblique = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| AppError::RenderFailure(anyhow::anyhow!("pdf font error: {}", e)))?;

        let mut cur = Cursor {
            doc,
            layer,
            font,
            font_bold,
            font_oblique,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        };

        self.title_block(&mut cur, header);
        self.bill_to_block(&mut cur, header);
        self.billing_period_block(&mut cur, header, months);
        self.footer(&cur);

        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        cur.doc
            .save(&mut writer)
            .map_err(|e| AppError::RenderFailure(anyhow::anyhow!("pdf save failed: {}", e)))?;
        writer
            .into_inner()
            .map_err(|e| AppError::RenderFailure(anyhow::anyhow!("pdf buffer error: {}", e)))
    }

    fn title_block(&self, cur: &mut Cursor, header: &InvoiceHeader) {
        let bold = cur.font_bold.clone();
        let font = cur.font.clone();

        cur.text(&bold, 18.0, MARGIN_MM, &self.company_name);
        cur.advance(10.0);
        cur.text(&font, 12.0, MARGIN_MM, "Invoice");
        cur.advance(8.0);
        cur.text(
            &font,
            12.0,
            MARGIN_MM,
            &format!("Invoice Number: {}", header.invoice_number),
        );
        cur.advance(8.0);
        cur.text(
            &font,
            12.0,
            MARGIN_MM,
            &format!(
                "Invoice Date: {}",
                header.invoice_date.format("%d %B %Y")
            ),
        );
        cur.advance(6.0);
        cur.rule();
        cur.advance(12.0);
    }

    fn bill_to_block(&self, cur: &mut Cursor, header: &InvoiceHeader) {
        let bold = cur.font_bold.clone();
        let font = cur.font.clone();

        cur.text(&bold, 12.0, MARGIN_MM, "Bill To:");
        cur.advance(7.0);
        cur.text(&font, 12.0, MARGIN_MM, &header.client_name);
        if let Some(address) = &header.client_address {
            cur.advance(6.0);
            cur.text(&font, 12.0, MARGIN_MM, address);
        }
        cur.advance(12.0);
    }

    fn billing_period_block(
        &self,
        cur: &mut Cursor,
        header: &InvoiceHeader,
        months: &[MonthPreview],
    ) {
        let bold = cur.font_bold.clone();
        let font = cur.font.clone();

        cur.text(&bold, 12.0, MARGIN_MM, "Billing Period:");
        cur.advance(7.0);
        cur.text(&font, 12.0, MARGIN_MM, &header.months_label);
        cur.advance(10.0);

        // Table column x positions (mm).
        let x_service = MARGIN_MM;
        let x_days = 120.0;
        let x_rate = 140.0;
        let x_amount = 168.0;

        let mut grand_total = Decimal::ZERO;
        for preview in months {
            cur.ensure_room(22.0);
            cur.text(&bold, 12.0, MARGIN_MM, &preview.label);
            cur.advance(7.0);

            cur.text(&bold, 10.0, x_service, "Service");
            cur.text(&bold, 10.0, x_days, "Days");
            cur.text(&bold, 10.0, x_rate, "Rate");
            cur.text(&bold, 10.0, x_amount, "Amount");
            cur.advance(3.0);
            cur.rule();
            cur.advance(6.0);

            for item in &preview.line_items {
                cur.ensure_room(6.0);
                let mut label = item.service_name.clone();
                if let Some(capacity) = &item.link_capacity {
                    label.push_str(&format!(" ({})", capacity));
                }
                cur.text(&font, 10.0, x_service, &label);
                cur.text(&font, 10.0, x_days, &item.prorated_days.to_string());
                let rate = item
                    .rate
                    .map(fmt_money)
                    .unwrap_or_else(|| "-".to_string());
                cur.text(&font, 10.0, x_rate, &rate);
                cur.text(&font, 10.0, x_amount, &fmt_money(item.prorated_amount));
                cur.advance(6.0);
            }

            cur.ensure_room(8.0);
            cur.text(&bold, 10.0, x_rate, "Subtotal:");
            cur.text(&bold, 10.0, x_amount, &fmt_money(preview.month_total));
            cur.advance(10.0);

            grand_total += preview.month_total;
        }

        if !months.is_empty() {
            cur.ensure_room(8.0);
            cur.rule();
            cur.advance(7.0);
            cur.text(&bold, 12.0, x_rate, "Total:");
            cur.text(&bold, 12.0, x_amount, &fmt_money(grand_total));
        }
    }

    fn footer(&self, cur: &Cursor) {
        cur.layer.use_text(
            "Thank you for your business.",
            10.0,
            Mm(MARGIN_MM),
            Mm(FOOTER_Y_MM),
            &cur.font_oblique,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingMonth, ServiceLineItem};
    use uuid::Uuid;

    fn header() -> InvoiceHeader {
        InvoiceHeader {
            invoice_number: "INV-20250131-1A2B3C4D".into(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            client_name: "Acme Telecom".into(),
            client_address: Some("12 Harbor Road, Lagos".into()),
            months_label: "January 2025".into(),
        }
    }

    fn preview() -> MonthPreview {
        let month: BillingMonth = "2025-01".parse().unwrap();
        let item = ServiceLineItem {
            assignment_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: "Dedicated Internet".into(),
            description: None,
            link_capacity: Some("100 Mbps".into()),
            rate: Some("3100.00".parse().unwrap()),
            billing_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            service_stop_date: None,
            status: "active".into(),
            prorated_days: 31,
            prorated_amount: "3100.00".parse().unwrap(),
        };
        MonthPreview {
            month,
            label: month.label(),
            month_total: item.prorated_amount,
            line_items: vec![item],
        }
    }

    #[test]
    fn renders_a_pdf_byte_stream() {
        let renderer = InvoiceRenderer::new("Aargon Management");
        let bytes = renderer.render(&header(), &[preview()]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn rendering_is_deterministic_for_identical_input() {
        let renderer = InvoiceRenderer::new("Aargon Management");
        let a = renderer.render(&header(), &[preview()]).unwrap();
        let b = renderer.render(&header(), &[preview()]).unwrap();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn many_line_items_paginate_without_error() {
        let renderer = InvoiceRenderer::new("Aargon Management");
        let mut p = preview();
        let template = p.line_items[0].clone();
        for _ in 0..120 {
            p.line_items.push(template.clone());
        }
        let bytes = renderer.render(&header(), &[p]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
