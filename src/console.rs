use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::catalogue::Catalogue;
use crate::error::PurchaseError;
use crate::inventory::InventoryStore;
use crate::purchase::{
    is_affirmative, parse_quantity, select_book, Buyer, Decision, PhoneNumber, PurchaseOutcome,
};

const SEPARATOR: &str = "--------------------------";

// Interactive session over any line source and sink. Main wires this to stdin/stdout.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }

    // Offers the catalogue, then at most one purchase attempt.
    pub fn run(
        &mut self,
        catalogue: &mut Catalogue,
        store: &InventoryStore,
        receipt_path: &Path,
    ) -> io::Result<()> {
        writeln!(self.output, "Welcome to the Book Store")?;
        if self.ask_yes_no("Do you want to see the catalogue? (yes/no): ")? {
            self.show_catalogue(catalogue)?;
        }
        if self.ask_yes_no("Do you want to buy a book? (yes/no): ")? {
            self.purchase(catalogue, store, receipt_path)?;
        }
        writeln!(self.output, "Thank you for visiting")?;
        self.output.flush()
    }

    fn show_catalogue(&mut self, catalogue: &Catalogue) -> io::Result<()> {
        if catalogue.is_empty() {
            return writeln!(self.output, "The catalogue is empty.");
        }
        writeln!(self.output, "Available Books:")?;
        for book in catalogue.list() {
            writeln!(self.output, "{}", book)?;
            writeln!(self.output, "{}", SEPARATOR)?;
        }
        Ok(())
    }

    // Purchase errors are reported and end the attempt. Only console I/O errors propagate.
    fn purchase(
        &mut self,
        catalogue: &mut Catalogue,
        store: &InventoryStore,
        receipt_path: &Path,
    ) -> io::Result<()> {
        let query = self.prompt("Enter the name of the book you want to buy: ")?;
        let selection = match select_book(catalogue, &query) {
            Ok(selection) => selection,
            Err(err) => return self.report(&err),
        };

        let requested = self.prompt("Enter the number of copies you want to buy: ")?;
        let quote = match parse_quantity(&requested).and_then(|q| selection.quote(catalogue, q)) {
            Ok(quote) => quote,
            Err(err) => return self.report(&err),
        };
        writeln!(
            self.output,
            "Total amount to be paid for {} copies: {}",
            quote.quantity(),
            quote.total_price()
        )?;

        let proceed = self.ask_yes_no("Would you like to proceed with the transaction? (yes/no): ")?;
        let decision = if proceed {
            let name = self.prompt("Enter your name: ")?;
            let phone = self.prompt("Enter your mobile number: ")?;
            match PhoneNumber::parse(&phone) {
                Ok(phone) => Decision::Confirm(Buyer { name, phone }),
                Err(err) => return self.report(&err),
            }
        } else {
            Decision::Decline
        };

        match quote.decide(decision, catalogue, store, receipt_path) {
            Ok(PurchaseOutcome::Cancelled) => writeln!(self.output, "Transaction cancelled."),
            Ok(PurchaseOutcome::Completed(completed)) => {
                writeln!(
                    self.output,
                    "Transaction successful. {} copies left in stock.",
                    completed.remaining
                )?;
                write!(self.output, "{}", completed.receipt)?;
                match completed.receipt_error {
                    Some(err) => writeln!(self.output, "Could not generate receipt: {}", err)?,
                    None => writeln!(self.output, "Receipt written to {}", receipt_path.display())?,
                }
                if let Some(err) = completed.persistence_error {
                    writeln!(self.output, "Warning: inventory could not be saved: {}", err)?;
                }
                Ok(())
            }
            Err(err) => self.report(&err),
        }
    }

    fn report(&mut self, err: &PurchaseError) -> io::Result<()> {
        writeln!(self.output, "Sorry, {}.", err)
    }

    fn ask_yes_no(&mut self, message: &str) -> io::Result<bool> {
        Ok(is_affirmative(&self.prompt(message)?))
    }

    // Running out of input mid-dialogue is an error rather than an implicit answer.
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input ended before the dialogue finished",
            ));
        }
        Ok(line.trim().to_string())
    }
}

// ------------------------------------------------------------------------------------------------
// --------------------------------------- UNIT TESTS ---------------------------------------------
// ------------------------------------------------------------------------------------------------
