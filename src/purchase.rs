use std::fmt;
use std::path::Path;
use tracing::{error, info};

use crate::catalogue::{Book, Catalogue};
use crate::error::{InventoryError, PurchaseError, ReceiptEmissionError};
use crate::inventory::InventoryStore;
use crate::receipt::Receipt;

// ------------------------------------------------------------------------------------------------
// ------------------------------------- PURCHASE STATES ------------------------------------------
// ------------------------------------------------------------------------------------------------
//
// One purchase attempt moves SelectBook -> Quoted -> AwaitingConfirmation -> Completed/Cancelled.
// Each step consumes the previous state, so a failed step ends the attempt. States refer to the
// book by its loaded name, which always resolves back to the same first case-insensitive match.

// A book picked out of the catalogue, waiting for a quantity.
#[derive(Debug)]
pub struct Selection {
    name: String,
}

// A priced request for an in-stock quantity, waiting for the buyer's decision.
#[derive(Debug)]
pub struct Quote {
    name: String,
    quantity: u32,
    total_price: u64,
}

pub enum Decision {
    Confirm(Buyer),
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    pub name: String,
    pub phone: PhoneNumber,
}

#[derive(Debug)]
pub enum PurchaseOutcome {
    Completed(CompletedPurchase),
    Cancelled,
}

// Result of the completion side effects. Receipt and persistence failures are carried here
// rather than returned since neither undoes the in-memory sale.
#[derive(Debug)]
pub struct CompletedPurchase {
    pub receipt: Receipt,
    pub remaining: u32,
    pub receipt_error: Option<ReceiptEmissionError>,
    pub persistence_error: Option<InventoryError>,
}

// ------------------------------------------------------------------------------------------------
// ----------------------------------- PURCHASE TRANSITIONS ---------------------------------------
// ------------------------------------------------------------------------------------------------

pub fn select_book(catalogue: &Catalogue, query: &str) -> Result<Selection, PurchaseError> {
    match catalogue.find_by_name(query) {
        Some(book) => Ok(Selection {
            name: book.name().to_string(),
        }),
        None => Err(PurchaseError::BookNotFound(query.trim().to_string())),
    }
}

impl Selection {
    // Prices the request, refusing quantities above the available stock.
    pub fn quote(self, catalogue: &Catalogue, quantity: u32) -> Result<Quote, PurchaseError> {
        let book = catalogue
            .find_by_name(&self.name)
            .ok_or_else(|| PurchaseError::BookNotFound(self.name.clone()))?;
        check_stock(book, quantity)?;
        Ok(Quote {
            total_price: book.price_for(quantity),
            name: self.name,
            quantity,
        })
    }
}

impl Quote {
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    // Declining changes nothing. Confirming writes the receipt, takes the copies out of the
    // catalogue and persists the new quantity, in that order.
    pub fn decide(
        self,
        decision: Decision,
        catalogue: &mut Catalogue,
        store: &InventoryStore,
        receipt_path: &Path,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        let buyer = match decision {
            Decision::Confirm(buyer) => buyer,
            Decision::Decline => {
                info!(book = %self.name, "Purchase cancelled");
                return Ok(PurchaseOutcome::Cancelled);
            }
        };

        let book = catalogue
            .find_by_name_mut(&self.name)
            .ok_or_else(|| PurchaseError::BookNotFound(self.name.clone()))?;
        check_stock(book, self.quantity)?;

        let receipt = Receipt {
            buyer_name: buyer.name,
            phone: buyer.phone.to_string(),
            book_name: book.name().to_string(),
            author: book.author().to_string(),
            quantity: self.quantity,
            total_price: self.total_price,
        };
        let receipt_error = receipt.emit(receipt_path).err();
        if let Some(err) = &receipt_error {
            error!(error = %err, "Receipt emission failed");
        }

        book.take(self.quantity);
        let remaining = book.available_quantity();
        let persistence_error = store.persist_quantity(book.name(), remaining).err();
        if let Some(err) = &persistence_error {
            error!(error = %err, "Inventory update failed, in-memory quantity diverges from disk");
        }

        info!(
            book = %receipt.book_name,
            quantity = self.quantity,
            total_price = self.total_price,
            remaining,
            "Purchase completed"
        );
        Ok(PurchaseOutcome::Completed(CompletedPurchase {
            receipt,
            remaining,
            receipt_error,
            persistence_error,
        }))
    }
}

fn check_stock(book: &Book, requested: u32) -> Result<(), PurchaseError> {
    if requested > book.available_quantity() {
        return Err(PurchaseError::InsufficientStock {
            available: book.available_quantity(),
            requested,
        });
    }
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// ------------------------------------- INPUT PARSING --------------------------------------------
// ------------------------------------------------------------------------------------------------

// Whole, positive number of copies.
pub fn parse_quantity(raw: &str) -> Result<u32, PurchaseError> {
    match raw.trim().parse::<u32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(PurchaseError::InvalidQuantity(raw.trim().to_string())),
    }
}

// Only an explicit "yes" counts as agreement.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

// Digits only, optionally prefixed with `+`. Spaces and dashes between digits are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PurchaseError> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let numeric = body.starts_with(|c: char| c.is_ascii_digit())
            && body
                .chars()
                .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
        if numeric {
            Ok(PhoneNumber(trimmed.to_string()))
        } else {
            Err(PurchaseError::InvalidPhoneNumber(trimmed.to_string()))
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// --------------------------------------- UNIT TESTS ---------------------------------------------
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::tests::write_sources;
    use std::fs;
    use tempfile::TempDir;

    // Single-book store ("Dune", "Frank Herbert", 5 copies at 20) backed by temp files.
    fn dune_fixture() -> (TempDir, InventoryStore, Catalogue) {
        let dir = tempfile::tempdir().unwrap();
        let sources = write_sources(dir.path(), &["Dune"], &["Frank Herbert"], &["5"], &["20"]);
        let store = InventoryStore::init(sources);
        let catalogue = Catalogue::new(store.load_inventory().unwrap());
        (dir, store, catalogue)
    }

    fn buyer() -> Buyer {
        Buyer {
            name: "Ada".into(),
            phone: PhoneNumber::parse("5551234567").unwrap(),
        }
    }

    #[test]
    fn confirmed_purchase_updates_memory_disk_and_receipt() {
        let (dir, store, mut catalogue) = dune_fixture();
        let receipt_path = dir.path().join("Receipt.txt");

        let quote = select_book(&catalogue, "dune")
            .unwrap()
            .quote(&catalogue, 2)
            .unwrap();
        assert_eq!(quote.total_price(), 40);

        let outcome = quote
            .decide(Decision::Confirm(buyer()), &mut catalogue, &store, &receipt_path)
            .unwrap();
        let completed = match outcome {
            PurchaseOutcome::Completed(completed) => completed,
            PurchaseOutcome::Cancelled => panic!("purchase should complete"),
        };

        assert_eq!(completed.remaining, 3);
        assert!(completed.receipt_error.is_none());
        assert!(completed.persistence_error.is_none());
        assert_eq!(catalogue.find_by_name("Dune").unwrap().available_quantity(), 3);
        assert_eq!(fs::read_to_string(&store.sources().quantities).unwrap(), "3\n");

        let receipt = fs::read_to_string(&receipt_path).unwrap();
        assert!(receipt.contains("Quantity: 2\n"));
        assert!(receipt.contains("Total Price: 40\n"));
    }

    #[test]
    fn buying_all_copies_leaves_zero() {
        let (dir, store, mut catalogue) = dune_fixture();
        let quote = select_book(&catalogue, "Dune")
            .unwrap()
            .quote(&catalogue, 5)
            .unwrap();

        quote
            .decide(
                Decision::Confirm(buyer()),
                &mut catalogue,
                &store,
                &dir.path().join("Receipt.txt"),
            )
            .unwrap();

        assert_eq!(catalogue.find_by_name("Dune").unwrap().available_quantity(), 0);
        assert_eq!(fs::read_to_string(&store.sources().quantities).unwrap(), "0\n");
    }

    #[test]
    fn over_request_reports_available_count_without_mutation() {
        let (_dir, _store, catalogue) = dune_fixture();

        let err = select_book(&catalogue, "Dune")
            .unwrap()
            .quote(&catalogue, 10)
            .unwrap_err();

        assert_eq!(
            err,
            PurchaseError::InsufficientStock {
                available: 5,
                requested: 10
            }
        );
        assert_eq!(err.to_string(), "only 5 copies are available");
        assert_eq!(catalogue.find_by_name("Dune").unwrap().available_quantity(), 5);
    }

    #[test]
    fn padded_name_can_be_bought_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let sources = write_sources(dir.path(), &["Dune "], &["Frank Herbert"], &["5"], &["20"]);
        let store = InventoryStore::init(sources);
        let mut catalogue = Catalogue::new(store.load_inventory().unwrap());

        let quote = select_book(&catalogue, "Dune")
            .unwrap()
            .quote(&catalogue, 2)
            .unwrap();
        quote
            .decide(
                Decision::Confirm(buyer()),
                &mut catalogue,
                &store,
                &dir.path().join("Receipt.txt"),
            )
            .unwrap();

        assert_eq!(catalogue.find_by_name("dune").unwrap().available_quantity(), 3);
        assert_eq!(fs::read_to_string(&store.sources().quantities).unwrap(), "3\n");
    }

    #[test]
    fn unknown_book_is_not_found() {
        let (_dir, _store, catalogue) = dune_fixture();
        let err = select_book(&catalogue, "Emma").unwrap_err();
        assert_eq!(err, PurchaseError::BookNotFound("Emma".into()));
    }

    #[test]
    fn declining_changes_nothing() {
        let (dir, store, mut catalogue) = dune_fixture();
        let receipt_path = dir.path().join("Receipt.txt");
        let quote = select_book(&catalogue, "Dune")
            .unwrap()
            .quote(&catalogue, 2)
            .unwrap();

        let outcome = quote
            .decide(Decision::Decline, &mut catalogue, &store, &receipt_path)
            .unwrap();

        assert!(matches!(outcome, PurchaseOutcome::Cancelled));
        assert_eq!(catalogue.find_by_name("Dune").unwrap().available_quantity(), 5);
        assert_eq!(fs::read_to_string(&store.sources().quantities).unwrap(), "5\n");
        assert!(!receipt_path.exists());
    }

    #[test]
    fn receipt_failure_does_not_block_inventory_update() {
        let (dir, store, mut catalogue) = dune_fixture();
        let receipt_path = dir.path().join("missing").join("Receipt.txt");
        let quote = select_book(&catalogue, "Dune")
            .unwrap()
            .quote(&catalogue, 1)
            .unwrap();

        let outcome = quote
            .decide(Decision::Confirm(buyer()), &mut catalogue, &store, &receipt_path)
            .unwrap();

        match outcome {
            PurchaseOutcome::Completed(completed) => {
                assert!(completed.receipt_error.is_some());
                assert!(completed.persistence_error.is_none());
                assert_eq!(completed.remaining, 4);
            }
            PurchaseOutcome::Cancelled => panic!("purchase should complete"),
        }
        assert_eq!(fs::read_to_string(&store.sources().quantities).unwrap(), "4\n");
    }

    #[test]
    fn persistence_failure_keeps_in_memory_decrement() {
        let (dir, store, mut catalogue) = dune_fixture();
        fs::write(dir.path().join("Quantity.txt.lock"), "").unwrap();
        let quote = select_book(&catalogue, "Dune")
            .unwrap()
            .quote(&catalogue, 2)
            .unwrap();

        let outcome = quote
            .decide(
                Decision::Confirm(buyer()),
                &mut catalogue,
                &store,
                &dir.path().join("Receipt.txt"),
            )
            .unwrap();

        match outcome {
            PurchaseOutcome::Completed(completed) => {
                assert!(matches!(
                    completed.persistence_error,
                    Some(InventoryError::SourceLocked { .. })
                ));
            }
            PurchaseOutcome::Cancelled => panic!("purchase should complete"),
        }
        assert_eq!(catalogue.find_by_name("Dune").unwrap().available_quantity(), 3);
        assert_eq!(fs::read_to_string(&store.sources().quantities).unwrap(), "5\n");
    }

    #[test]
    fn quantity_must_be_a_positive_whole_number() {
        assert_eq!(parse_quantity(" 3 "), Ok(3));
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("-2").is_err());
        assert!(parse_quantity("two").is_err());
        assert!(parse_quantity("").is_err());
    }

    #[test]
    fn phone_numbers_are_validated() {
        assert!(PhoneNumber::parse("5551234567").is_ok());
        assert!(PhoneNumber::parse("+44 20 7946 0958").is_ok());
        assert!(PhoneNumber::parse("555-1234").is_ok());
        assert!(PhoneNumber::parse("12345").is_ok());
        assert!(PhoneNumber::parse("call me").is_err());
        assert!(PhoneNumber::parse("555 12x4").is_err());
        assert!(PhoneNumber::parse("+-5551234").is_err());
        assert!(PhoneNumber::parse("").is_err());
    }

    #[test]
    fn only_yes_confirms() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative(" YES\n"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative("no"));
    }
}
