use csv::WriterBuilder;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use tracing::debug;

// ------------------------------------------------------------------------------------------------
// ------------------------------------------ BOOK ------------------------------------------------
// ------------------------------------------------------------------------------------------------

// A single catalogue entry. Only `available_quantity` changes after load.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Book {
    name: String,
    author: String,
    #[serde(rename = "quantity")]
    available_quantity: u32,
    #[serde(rename = "price")]
    unit_price: u32,
}

impl Book {
    pub fn new(name: String, author: String, available_quantity: u32, unit_price: u32) -> Self {
        Book {
            name,
            author,
            available_quantity,
            unit_price,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    #[cfg(test)]
    pub fn unit_price(&self) -> u32 {
        self.unit_price
    }

    // Linear pricing, no discounts or tax. Widened so large orders cannot overflow.
    pub fn price_for(&self, quantity: u32) -> u64 {
        u64::from(self.unit_price) * u64::from(quantity)
    }

    // Callers check stock first; saturating keeps the quantity non-negative regardless.
    pub(crate) fn take(&mut self, quantity: u32) {
        self.available_quantity = self.available_quantity.saturating_sub(quantity);
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Book Name: {}", self.name)?;
        writeln!(f, "Author: {}", self.author)?;
        writeln!(f, "Quantity Available: {}", self.available_quantity)?;
        write!(f, "Price per Book: {}", self.unit_price)
    }
}

// ------------------------------------------------------------------------------------------------
// --------------------------------------- CATALOGUE ----------------------------------------------
// ------------------------------------------------------------------------------------------------

// Wrapper over the loaded books to avoid exposing the underlying vec.
pub struct Catalogue {
    books: Vec<Book>,
}

impl Catalogue {
    pub fn new(books: Vec<Book>) -> Self {
        Catalogue { books }
    }

    // Every book in load order.
    pub fn list(&self) -> &[Book] {
        &self.books
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    // First book whose name matches `query` ignoring case.
    pub fn find_by_name(&self, query: &str) -> Option<&Book> {
        self.position_by_name(query).map(|index| &self.books[index])
    }

    pub(crate) fn find_by_name_mut(&mut self, query: &str) -> Option<&mut Book> {
        self.position_by_name(query).map(move |index| &mut self.books[index])
    }

    fn position_by_name(&self, query: &str) -> Option<usize> {
        let query = query.trim().to_lowercase();
        let position = self
            .books
            .iter()
            .position(|book| book.name.trim().to_lowercase() == query);
        debug!(query = %query, found = position.is_some(), "Catalogue lookup");
        position
    }

    // Write the catalogue as csv with headers.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
        for book in &self.books {
            writer.serialize(book)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_stdout(&self) -> csv::Result<()> {
        self.write_csv(io::stdout().lock())
    }
}

// ------------------------------------------------------------------------------------------------
// --------------------------------------- UNIT TESTS ---------------------------------------------
// ------------------------------------------------------------------------------------------------
