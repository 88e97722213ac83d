use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ReceiptId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(ReceiptId),

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// Storage failures; the repository's context is the message
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}
