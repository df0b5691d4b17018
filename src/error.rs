use std::{io, path::PathBuf};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ------------------------------------ INVENTORY ERRORS ------------------------------------------
// ------------------------------------------------------------------------------------------------

// Failures of the flat-file record store. Everything except Persistence and SourceLocked
// happens at load time and aborts startup.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory source {} is missing", .0.display())]
    MissingInventorySource(PathBuf),

    #[error("failed to read inventory source {}: {source}", path.display())]
    SourceRead { path: PathBuf, source: io::Error },

    #[error("invalid {field} {value:?} on line {line} of {}", path.display())]
    InvalidNumericField {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("negative {field} {value} on line {line} of {}", path.display())]
    NegativeFieldValue {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: i64,
    },

    #[error("failed to update {}: {source}", path.display())]
    Persistence { path: PathBuf, source: io::Error },

    #[error("lock file {} already exists, another purchase may be in progress", lock.display())]
    SourceLocked { lock: PathBuf },
}

// ------------------------------------------------------------------------------------------------
// ------------------------------------- PURCHASE ERRORS ------------------------------------------
// ------------------------------------------------------------------------------------------------

// Errors that end a single purchase attempt. None of them mutate the catalogue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("the book {0:?} is not available")]
    BookNotFound(String),

    #[error("only {available} copies are available")]
    InsufficientStock { available: u32, requested: u32 },

    #[error("{0:?} is not a valid number of copies")]
    InvalidQuantity(String),

    #[error("{0:?} is not a valid phone number")]
    InvalidPhoneNumber(String),
}

// Writing the receipt failed. Reported to the buyer but never blocks the inventory update.
#[derive(Debug, Error)]
#[error("failed to write receipt to {}: {source}", path.display())]
pub struct ReceiptEmissionError {
    pub path: PathBuf,
    pub source: io::Error,
}
