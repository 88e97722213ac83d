use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::{
    Category, Cents, NewReceipt, PaymentMethod, ReceiptDetails, ReceiptId, ReferenceKind, Store,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing the receipt operations.
/// This is the primary interface for any client (CLI, export, tests).
///
/// The service owns the storage handle for its whole lifetime; call
/// [`ReceiptService::close`] to release the connection.
pub struct ReceiptService {
    repo: Repository,
}

/// Result of asking for a receipt's image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The image was written to the destination path
    Written { path: PathBuf, bytes: usize },
    /// The receipt does not exist or has no stored image; nothing was written
    Missing,
}

impl ReceiptService {
    /// Create a new receipt service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open the database at the given path, creating the file and the
    /// tables if they do not exist. Every command opens the store this way.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::init(&db_url).await?;
        info!(database = database_path, "database ready");
        Ok(Self::new(repo))
    }

    /// Release the database connection.
    pub async fn close(self) {
        self.repo.close().await;
    }

    // ========================
    // Receipt operations
    // ========================

    /// Record a receipt without an image.
    ///
    /// Unseen store, category and payment method values are created on the
    /// fly. Returns the id assigned to the new receipt.
    pub async fn record_receipt(
        &self,
        store: &str,
        category: &str,
        payment_method: &str,
        total_cents: Cents,
        purchase_date: NaiveDate,
    ) -> Result<ReceiptId, AppError> {
        let receipt = NewReceipt::new(store, category, payment_method, total_cents, purchase_date);
        self.save(receipt).await
    }

    /// Record a receipt with the contents of an image file attached.
    ///
    /// The file is read before anything touches the database, so an
    /// unreadable path leaves the database unchanged.
    pub async fn record_receipt_with_image(
        &self,
        store: &str,
        category: &str,
        payment_method: &str,
        total_cents: Cents,
        purchase_date: NaiveDate,
        image_path: impl AsRef<Path>,
    ) -> Result<ReceiptId, AppError> {
        let image_path = image_path.as_ref();
        let image = tokio::fs::read(image_path)
            .await
            .map_err(|source| AppError::ImageRead {
                path: image_path.to_path_buf(),
                source,
            })?;

        let receipt = NewReceipt::new(store, category, payment_method, total_cents, purchase_date)
            .with_image(image);
        self.save(receipt).await
    }

    async fn save(&self, receipt: NewReceipt) -> Result<ReceiptId, AppError> {
        let id = self.repo.save_receipt(&receipt).await?;
        info!(
            id,
            store = %receipt.store,
            total_cents = receipt.total_cents,
            image_bytes = receipt.image.as_ref().map_or(0, Vec::len),
            "recorded receipt"
        );
        Ok(id)
    }

    /// Write a receipt's image to `destination`, overwriting any file there.
    ///
    /// A missing receipt or a receipt without an image is not an error:
    /// nothing is written and [`ImageOutcome::Missing`] is returned.
    pub async fn retrieve_image(
        &self,
        id: ReceiptId,
        destination: impl AsRef<Path>,
    ) -> Result<ImageOutcome, AppError> {
        let destination = destination.as_ref();
        let receipt = self.repo.get_receipt(id).await?;

        let Some(bytes) = receipt.as_ref().and_then(|r| r.image_bytes()) else {
            debug!(id, "no stored image for receipt");
            return Ok(ImageOutcome::Missing);
        };

        tokio::fs::write(destination, bytes)
            .await
            .map_err(|source| AppError::ImageWrite {
                path: destination.to_path_buf(),
                source,
            })?;

        Ok(ImageOutcome::Written {
            path: destination.to_path_buf(),
            bytes: bytes.len(),
        })
    }

    /// Delete a receipt. Returns whether a receipt with that id existed.
    /// Store, category and payment method rows are left in place.
    pub async fn delete_receipt(&self, id: ReceiptId) -> Result<bool, AppError> {
        let deleted = self.repo.delete_receipt(id).await?;
        if deleted {
            info!(id, "deleted receipt");
        } else {
            debug!(id, "delete requested for unknown receipt");
        }
        Ok(deleted)
    }

    /// Get one receipt with its reference names.
    pub async fn get_receipt(&self, id: ReceiptId) -> Result<ReceiptDetails, AppError> {
        self.repo
            .get_receipt_details(id)
            .await?
            .ok_or(AppError::ReceiptNotFound(id))
    }

    /// List every receipt with its reference names, in id order.
    pub async fn list_receipts(&self) -> Result<Vec<ReceiptDetails>, AppError> {
        Ok(self.repo.list_receipt_details().await?)
    }

    /// Write one line per receipt to `writer`. Returns the number of lines.
    pub async fn write_listing<W: Write>(&self, mut writer: W) -> Result<usize, AppError> {
        let receipts = self.list_receipts().await?;
        for receipt in &receipts {
            writeln!(writer, "{}", receipt)?;
        }
        writer.flush()?;
        Ok(receipts.len())
    }

    pub async fn count_receipts(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_receipts().await?)
    }

    // ========================
    // Reference rows
    // ========================

    /// Get or create a single reference row by natural key.
    pub async fn resolve_reference<K: ReferenceKind>(&self, key: &str) -> Result<K, AppError> {
        Ok(self.repo.get_or_create::<K>(key).await?)
    }

    pub async fn list_references<K: ReferenceKind>(&self) -> Result<Vec<K>, AppError> {
        Ok(self.repo.list_references::<K>().await?)
    }

    pub async fn count_references<K: ReferenceKind>(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_references::<K>().await?)
    }

    pub async fn list_stores(&self) -> Result<Vec<Store>, AppError> {
        self.list_references::<Store>().await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.list_references::<Category>().await
    }

    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, AppError> {
        self.list_references::<PaymentMethod>().await
    }
}
