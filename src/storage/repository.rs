use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::domain::{NewReceipt, Receipt, ReceiptDetails, ReceiptId, ReferenceKind, DATE_FORMAT};

use super::MIGRATION_001_INITIAL;

const RECEIPT_DETAILS_QUERY: &str = r#"
    SELECT r.id, s.name AS store, c.name AS category, p.method AS payment_method,
           r.purchase_date, r.total_cents, COALESCE(LENGTH(r.image), 0) AS image_size
    FROM receipts r
    INNER JOIN stores s ON s.id = r.store_id
    INNER JOIN categories c ON c.id = r.category_id
    INNER JOIN payment_methods p ON p.id = r.payment_method_id
"#;

/// Repository for persisting and querying receipts and their reference rows.
///
/// Owns a single-connection pool; the connection is released by
/// [`Repository::close`] or when the repository is dropped.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL such as `sqlite:receipts.db`.
    /// The database file is created when absent.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and ensure the schema exists.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close the underlying connection, waiting for it to be released.
    pub async fn close(self) {
        self.pool.close().await;
    }

    // ========================
    // Reference rows
    // ========================

    /// Look up a reference row by its natural key, creating it if absent.
    /// Runs in its own transaction.
    pub async fn get_or_create<K: ReferenceKind>(&self, key: &str) -> Result<K> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let reference = Self::get_or_create_in::<K>(&mut *tx, key).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(reference)
    }

    /// Get-or-create on an already open connection or transaction.
    async fn get_or_create_in<K: ReferenceKind>(
        conn: &mut SqliteConnection,
        key: &str,
    ) -> Result<K> {
        let select = format!(
            "SELECT id FROM {} WHERE {} = ?",
            K::TABLE,
            K::KEY_COLUMN
        );
        let existing = sqlx::query(&select)
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
            .with_context(|| format!("Failed to look up {}", K::LABEL))?;

        if let Some(row) = existing {
            return Ok(K::from_row(row.get("id"), key.to_string()));
        }

        let insert = format!(
            "INSERT INTO {} ({}) VALUES (?) RETURNING id",
            K::TABLE,
            K::KEY_COLUMN
        );
        let row = sqlx::query(&insert)
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("Failed to create {}", K::LABEL))?;

        let id: i64 = row.get("id");
        debug!(kind = K::LABEL, id, key, "created reference row");
        Ok(K::from_row(id, key.to_string()))
    }

    /// List all rows of a reference kind, ordered by natural key.
    pub async fn list_references<K: ReferenceKind>(&self) -> Result<Vec<K>> {
        let query = format!(
            "SELECT id, {col} AS natural_key FROM {table} ORDER BY {col}",
            table = K::TABLE,
            col = K::KEY_COLUMN
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} rows", K::LABEL))?;

        Ok(rows
            .iter()
            .map(|row| K::from_row(row.get("id"), row.get("natural_key")))
            .collect())
    }

    /// Count rows of a reference kind.
    pub async fn count_references<K: ReferenceKind>(&self) -> Result<i64> {
        let query = format!("SELECT COUNT(*) AS count FROM {}", K::TABLE);
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {} rows", K::LABEL))?;
        Ok(row.get("count"))
    }

    // ========================
    // Receipt operations
    // ========================

    /// Save a receipt together with any reference rows it needs.
    ///
    /// Store, category and payment method resolution and the receipt insert
    /// share one transaction: either all rows land or none do.
    pub async fn save_receipt(&self, receipt: &NewReceipt) -> Result<ReceiptId> {
        use crate::domain::{Category, PaymentMethod, Store};

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let store = Self::get_or_create_in::<Store>(&mut *tx, &receipt.store).await?;
        let category = Self::get_or_create_in::<Category>(&mut *tx, &receipt.category).await?;
        let method =
            Self::get_or_create_in::<PaymentMethod>(&mut *tx, &receipt.payment_method).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO receipts (store_id, category_id, payment_method_id, total_cents, purchase_date, image)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(store.id)
        .bind(category.id)
        .bind(method.id)
        .bind(receipt.total_cents)
        .bind(receipt.purchase_date.format(DATE_FORMAT).to_string())
        .bind(receipt.image.as_deref())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to save receipt")?;

        tx.commit().await.context("Failed to commit receipt")?;
        Ok(row.get("id"))
    }

    /// Get a stored receipt, image included.
    pub async fn get_receipt(&self, id: ReceiptId) -> Result<Option<Receipt>> {
        let row = sqlx::query(
            r#"
            SELECT id, store_id, category_id, payment_method_id, total_cents, purchase_date, image
            FROM receipts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch receipt")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_receipt(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a receipt joined with its reference names.
    pub async fn get_receipt_details(&self, id: ReceiptId) -> Result<Option<ReceiptDetails>> {
        let query = format!("{} WHERE r.id = ?", RECEIPT_DETAILS_QUERY);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch receipt details")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_details(&row)?)),
            None => Ok(None),
        }
    }

    /// List every receipt with its reference names, ordered by id.
    pub async fn list_receipt_details(&self) -> Result<Vec<ReceiptDetails>> {
        let query = format!("{} ORDER BY r.id", RECEIPT_DETAILS_QUERY);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list receipts")?;

        rows.iter().map(Self::row_to_details).collect()
    }

    /// Delete a receipt. Returns false when no row had that id.
    pub async fn delete_receipt(&self, id: ReceiptId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete receipt")?;
        Ok(result.rows_affected() > 0)
    }

    /// Count stored receipts.
    pub async fn count_receipts(&self) -> Result<i64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM receipts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count receipts")?
            .get("count");
        Ok(count)
    }

    fn parse_date(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .with_context(|| format!("Invalid purchase_date: {}", value))
    }

    fn row_to_receipt(row: &SqliteRow) -> Result<Receipt> {
        let date_str: String = row.get("purchase_date");

        Ok(Receipt {
            id: row.get("id"),
            store_id: row.get("store_id"),
            category_id: row.get("category_id"),
            payment_method_id: row.get("payment_method_id"),
            total_cents: row.get("total_cents"),
            purchase_date: Self::parse_date(&date_str)?,
            image: row.get("image"),
        })
    }

    fn row_to_details(row: &SqliteRow) -> Result<ReceiptDetails> {
        let date_str: String = row.get("purchase_date");

        Ok(ReceiptDetails {
            id: row.get("id"),
            store: row.get("store"),
            category: row.get("category"),
            payment_method: row.get("payment_method"),
            purchase_date: Self::parse_date(&date_str)?,
            total_cents: row.get("total_cents"),
            image_size: row.get("image_size"),
        })
    }
}
