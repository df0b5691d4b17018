use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::ReceiptEmissionError;

// Record of a completed purchase, rendered as a fixed six-field plain-text layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub buyer_name: String,
    pub phone: String,
    pub book_name: String,
    pub author: String,
    pub quantity: u32,
    pub total_price: u64,
}

impl Receipt {
    // Writes the receipt to `path`, replacing any earlier receipt.
    pub fn emit(&self, path: &Path) -> Result<(), ReceiptEmissionError> {
        fs::write(path, self.to_string()).map_err(|source| ReceiptEmissionError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(receipt = %path.display(), book = %self.book_name, "Receipt written");
        Ok(())
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----- Book Store Receipt -----")?;
        writeln!(f, "Name: {}", self.buyer_name)?;
        writeln!(f, "Mobile Number: {}", self.phone)?;
        writeln!(f, "Book: {}", self.book_name)?;
        writeln!(f, "Author: {}", self.author)?;
        writeln!(f, "Quantity: {}", self.quantity)?;
        writeln!(f, "Total Price: {}", self.total_price)
    }
}
