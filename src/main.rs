mod catalogue;
mod cli_args;
mod console;
mod error;
mod inventory;
mod purchase;
mod receipt;

use catalogue::Catalogue;
use clap::Parser;
use cli_args::CliArgs;
use console::Console;
use inventory::InventoryStore;
use std::io;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so stdout carries only the dialogue or the csv export.
    // Verbosity comes from RUST_LOG, defaulting to warnings.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Read args supplied to binary. CLAP exits with usage on unknown or malformed flags.
    let args: CliArgs = cli_args::CliArgs::parse();

    // Load every book up front. Any missing or malformed source aborts startup.
    let store = InventoryStore::init(args.inventory_sources());
    debug!(sources = ?store.sources(), "Loading inventory");
    let mut catalogue = match store.load_inventory() {
        Ok(books) => Catalogue::new(books),
        Err(err) => {
            error!(error = %err, "Failed to load inventory");
            println!("Error loading inventory: {}", err);
            std::process::exit(1)
        }
    };

    if args.catalogue_csv {
        if let Err(err) = catalogue.to_csv_stdout() {
            println!("Error sending catalogue to stdout: {}", err);
            std::process::exit(1)
        }
        return;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock());
    if let Err(err) = console.run(&mut catalogue, &store, &args.receipt_path()) {
        error!(error = %err, "Console session ended abnormally");
        println!("Error: {}", err);
        std::process::exit(1)
    }
}
