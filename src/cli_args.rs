use clap::Parser;
use std::path::PathBuf;

use crate::inventory::InventorySources;

/// Console bookstore: browse the catalogue and buy books from flat-file inventory.
#[derive(Parser, Debug)]
pub struct CliArgs {
    /// Directory the inventory files and receipt are resolved against.
    #[clap(long, value_parser, default_value = ".")]
    data_dir: PathBuf,

    /// File with one book name per line.
    #[clap(long, value_parser, default_value = "BooksName.txt")]
    names_file: PathBuf,

    /// File with one author per line, aligned with the names file.
    #[clap(long, value_parser, default_value = "AuthorsName.txt")]
    authors_file: PathBuf,

    /// File with one available quantity per line, rewritten after each sale.
    #[clap(long, value_parser, default_value = "Quantity.txt")]
    quantities_file: PathBuf,

    /// File with one unit price per line.
    #[clap(long, value_parser, default_value = "Price.txt")]
    prices_file: PathBuf,

    /// Where the receipt of a completed purchase is written.
    #[clap(long, value_parser, default_value = "Receipt.txt")]
    receipt_file: PathBuf,

    /// Print the catalogue as csv to stdout and exit.
    #[clap(long, action)]
    pub catalogue_csv: bool,
}

// Resolve configured file names against the data directory. Absolute names are kept as-is.
impl CliArgs {
    pub fn inventory_sources(&self) -> InventorySources {
        InventorySources {
            names: self.data_dir.join(&self.names_file),
            authors: self.data_dir.join(&self.authors_file),
            quantities: self.data_dir.join(&self.quantities_file),
            prices: self.data_dir.join(&self.prices_file),
        }
    }

    pub fn receipt_path(&self) -> PathBuf {
        self.data_dir.join(&self.receipt_file)
    }
}
