// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use receipts::application::ReceiptService;
use receipts::domain::ReceiptId;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(ReceiptService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = ReceiptService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a YYYY-MM-DD string
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Capture the receipt listing as lines
pub async fn listing_lines(service: &ReceiptService) -> Result<Vec<String>> {
    let mut buffer = Vec::new();
    service.write_listing(&mut buffer).await?;
    Ok(String::from_utf8(buffer)?
        .lines()
        .map(str::to_string)
        .collect())
}

/// Test fixture: a few receipts across two stores
pub struct SampleReceipts;

impl SampleReceipts {
    /// Record three receipts and return their ids in insertion order
    pub async fn record(service: &ReceiptService) -> Result<Vec<ReceiptId>> {
        let mut ids = Vec::new();
        ids.push(
            service
                .record_receipt(
                    "Trader Joe's",
                    "Groceries",
                    "Credit Card",
                    4217,
                    parse_date("2024-01-05"),
                )
                .await?,
        );
        ids.push(
            service
                .record_receipt("Shell", "Fuel", "Debit Card", 5500, parse_date("2024-01-07"))
                .await?,
        );
        ids.push(
            service
                .record_receipt(
                    "Trader Joe's",
                    "Groceries",
                    "Cash",
                    1899,
                    parse_date("2024-01-12"),
                )
                .await?,
        );
        Ok(ids)
    }
}
