use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{format_cents, Cents, ReferenceId};

pub type ReceiptId = i64;

/// Date format used both in storage and in listings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A receipt as stored: one purchase, linked by id to its store, category
/// and payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: ReceiptId,
    pub store_id: ReferenceId,
    pub category_id: ReferenceId,
    pub payment_method_id: ReferenceId,
    pub total_cents: Cents,
    pub purchase_date: NaiveDate,
    /// Raw image bytes, stored as-is
    pub image: Option<Vec<u8>>,
}

impl Receipt {
    /// Returns the stored image, treating an empty blob as no image.
    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image.as_deref().filter(|bytes| !bytes.is_empty())
    }
}

/// The values needed to record a receipt, before any row exists.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub store: String,
    pub category: String,
    pub payment_method: String,
    pub total_cents: Cents,
    pub purchase_date: NaiveDate,
    pub image: Option<Vec<u8>>,
}

impl NewReceipt {
    pub fn new(
        store: impl Into<String>,
        category: impl Into<String>,
        payment_method: impl Into<String>,
        total_cents: Cents,
        purchase_date: NaiveDate,
    ) -> Self {
        Self {
            store: store.into(),
            category: category.into(),
            payment_method: payment_method.into(),
            total_cents,
            purchase_date,
            image: None,
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

/// A receipt joined with the names of the rows it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDetails {
    pub id: ReceiptId,
    pub store: String,
    pub category: String,
    pub payment_method: String,
    pub purchase_date: NaiveDate,
    pub total_cents: Cents,
    /// Size of the stored image in bytes (0 when none)
    pub image_size: i64,
}

impl ReceiptDetails {
    pub fn has_image(&self) -> bool {
        self.image_size > 0
    }
}

/// One listing line: `id | store | category | method | date | $amount`.
impl fmt::Display for ReceiptDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {} | {} | ${}",
            self.id,
            self.store,
            self.category,
            self.payment_method,
            self.purchase_date.format(DATE_FORMAT),
            format_cents(self.total_cents)
        )
    }
}
