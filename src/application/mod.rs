// Application layer - use cases on top of the repository.
// Every client (CLI, export, tests) goes through ReceiptService.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
