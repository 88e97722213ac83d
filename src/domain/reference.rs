use serde::{Deserialize, Serialize};

/// Auto-assigned row id shared by all reference tables.
pub type ReferenceId = i64;

/// A lookup table keyed by a unique natural key (a store name, a category
/// name, a payment method label). Receipts link to one row of each kind.
///
/// `TABLE` and `KEY_COLUMN` are interpolated into SQL, so implementations
/// must only use fixed identifiers.
pub trait ReferenceKind: Sized {
    /// Table holding the rows of this kind.
    const TABLE: &'static str;
    /// Column carrying the unique natural key.
    const KEY_COLUMN: &'static str;
    /// Human-readable singular name, used in logs.
    const LABEL: &'static str;

    fn from_row(id: ReferenceId, key: String) -> Self;

    fn id(&self) -> ReferenceId;

    fn key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: ReferenceId,
    pub name: String,
}

impl ReferenceKind for Store {
    const TABLE: &'static str = "stores";
    const KEY_COLUMN: &'static str = "name";
    const LABEL: &'static str = "store";

    fn from_row(id: ReferenceId, key: String) -> Self {
        Self { id, name: key }
    }

    fn id(&self) -> ReferenceId {
        self.id
    }

    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: ReferenceId,
    pub name: String,
}

impl ReferenceKind for Category {
    const TABLE: &'static str = "categories";
    const KEY_COLUMN: &'static str = "name";
    const LABEL: &'static str = "category";

    fn from_row(id: ReferenceId, key: String) -> Self {
        Self { id, name: key }
    }

    fn id(&self) -> ReferenceId {
        self.id
    }

    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: ReferenceId,
    /// Free-form label, e.g. "Credit Card" or "Cash"
    pub method: String,
}

impl ReferenceKind for PaymentMethod {
    const TABLE: &'static str = "payment_methods";
    const KEY_COLUMN: &'static str = "method";
    const LABEL: &'static str = "payment method";

    fn from_row(id: ReferenceId, key: String) -> Self {
        Self { id, method: key }
    }

    fn id(&self) -> ReferenceId {
        self.id
    }

    fn key(&self) -> &str {
        &self.method
    }
}
