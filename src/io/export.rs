use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::ReceiptService;
use crate::domain::{Category, PaymentMethod, ReceiptDetails, Store, DATE_FORMAT};

/// Database snapshot for JSON export. Image bytes are not included;
/// `image_size` on each receipt tells whether one is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub stores: Vec<Store>,
    pub categories: Vec<Category>,
    pub payment_methods: Vec<PaymentMethod>,
    pub receipts: Vec<ReceiptDetails>,
}

/// Exporter for converting receipt data to CSV or JSON
pub struct Exporter<'a> {
    service: &'a ReceiptService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a ReceiptService) -> Self {
        Self { service }
    }

    /// Export receipts to CSV format. Returns the number of records written.
    pub async fn export_receipts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let receipts = self.service.list_receipts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "store",
            "category",
            "payment_method",
            "purchase_date",
            "total_cents",
            "has_image",
        ])?;

        for receipt in &receipts {
            csv_writer.write_record([
                receipt.id.to_string(),
                receipt.store.clone(),
                receipt.category.clone(),
                receipt.payment_method.clone(),
                receipt.purchase_date.format(DATE_FORMAT).to_string(),
                receipt.total_cents.to_string(),
                receipt.has_image().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(receipts.len())
    }

    /// Export receipts and reference rows as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<ReceiptSnapshot> {
        let snapshot = ReceiptSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            stores: self.service.list_stores().await?,
            categories: self.service.list_categories().await?,
            payment_methods: self.service.list_payment_methods().await?,
            receipts: self.service.list_receipts().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
