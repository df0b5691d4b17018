use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Lines, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::catalogue::Book;
use crate::error::InventoryError;

// ------------------------------------------------------------------------------------------------
// ------------------------------------ INVENTORY SOURCES -----------------------------------------
// ------------------------------------------------------------------------------------------------

// Paths of the four parallel text files. Line N of each file describes the same book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySources {
    pub names: PathBuf,
    pub authors: PathBuf,
    pub quantities: PathBuf,
    pub prices: PathBuf,
}

// Line reader over one source that tags read failures with the source path.
struct SourceLines<'a> {
    path: &'a Path,
    lines: Lines<BufReader<File>>,
}

impl<'a> SourceLines<'a> {
    fn open(path: &'a Path) -> Result<Self, InventoryError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => InventoryError::MissingInventorySource(path.to_path_buf()),
            _ => InventoryError::SourceRead {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(SourceLines {
            path,
            lines: BufReader::new(file).lines(),
        })
    }

    fn next_line(&mut self) -> Option<Result<String, InventoryError>> {
        let path = self.path;
        self.lines.next().map(|line| {
            line.map_err(|source| InventoryError::SourceRead {
                path: path.to_path_buf(),
                source,
            })
        })
    }
}

// ------------------------------------------------------------------------------------------------
// ------------------------------------ INVENTORY STORE -------------------------------------------
// ------------------------------------------------------------------------------------------------

// Owns loading books from, and persisting quantities to, the flat-file sources.
pub struct InventoryStore {
    sources: InventorySources,
}

impl InventoryStore {
    // Naming follows `init` as the store stands in for a real inventory backend.
    pub fn init(sources: InventorySources) -> Self {
        InventoryStore { sources }
    }

    pub fn sources(&self) -> &InventorySources {
        &self.sources
    }

    // Zips the four sources line by line into books, stopping at the end of the shortest one.
    // Any unparseable or negative quantity/price aborts the whole load.
    pub fn load_inventory(&self) -> Result<Vec<Book>, InventoryError> {
        // All four must open before anything is read.
        let mut names = SourceLines::open(&self.sources.names)?;
        let mut authors = SourceLines::open(&self.sources.authors)?;
        let mut quantities = SourceLines::open(&self.sources.quantities)?;
        let mut prices = SourceLines::open(&self.sources.prices)?;

        let mut books = Vec::new();
        loop {
            // A read error on any source fails the load, even next to an exhausted source.
            let row = (
                names.next_line().transpose()?,
                authors.next_line().transpose()?,
                quantities.next_line().transpose()?,
                prices.next_line().transpose()?,
            );
            match row {
                (Some(name), Some(author), Some(quantity), Some(price)) => {
                    let line = books.len() + 1;
                    let available_quantity =
                        parse_field(&self.sources.quantities, line, "quantity", &quantity)?;
                    let unit_price = parse_field(&self.sources.prices, line, "price", &price)?;
                    books.push(Book::new(name, author, available_quantity, unit_price));
                }
                (None, None, None, None) => break,
                (name, author, quantity, price) => {
                    let exhausted: Vec<String> = [
                        (&self.sources.names, name.is_none()),
                        (&self.sources.authors, author.is_none()),
                        (&self.sources.quantities, quantity.is_none()),
                        (&self.sources.prices, price.is_none()),
                    ]
                    .into_iter()
                    .filter(|(_, ended)| *ended)
                    .map(|(path, _)| path.display().to_string())
                    .collect();
                    warn!(
                        records = books.len(),
                        exhausted = ?exhausted,
                        "Inventory sources have different lengths, extra lines ignored"
                    );
                    break;
                }
            }
        }

        info!(records = books.len(), "Loaded inventory");
        Ok(books)
    }

    // Rewrites the quantities source with `new_quantity` on the line whose name exactly equals
    // `name`. Unknown names are a no-op. The read-modify-write runs under an exclusive lock file.
    pub fn persist_quantity(&self, name: &str, new_quantity: u32) -> Result<(), InventoryError> {
        let quantities_path = self.sources.quantities.as_path();
        let _lock = SourceLock::acquire(quantities_path)?;

        let names = read_all_lines(&self.sources.names)?;
        let mut quantities = read_all_lines(quantities_path)?;

        let index = match names.iter().position(|candidate| candidate == name) {
            Some(index) => index,
            None => {
                warn!(book = name, "Book not present in names source, quantity not persisted");
                return Ok(());
            }
        };
        match quantities.get_mut(index) {
            Some(line) => *line = new_quantity.to_string(),
            None => {
                warn!(
                    book = name,
                    line = index + 1,
                    "Quantities source too short, quantity not persisted"
                );
                return Ok(());
            }
        }

        rewrite_lines(quantities_path, &quantities)?;
        info!(book = name, quantity = new_quantity, "Persisted quantity");
        Ok(())
    }
}

// Parses a quantity or price line. Surrounding whitespace is ignored.
fn parse_field(
    path: &Path,
    line: usize,
    field: &'static str,
    raw: &str,
) -> Result<u32, InventoryError> {
    let invalid = || InventoryError::InvalidNumericField {
        path: path.to_path_buf(),
        line,
        field,
        value: raw.to_string(),
    };
    let value: i64 = raw.trim().parse().map_err(|_| invalid())?;
    if value < 0 {
        return Err(InventoryError::NegativeFieldValue {
            path: path.to_path_buf(),
            line,
            field,
            value,
        });
    }
    u32::try_from(value).map_err(|_| invalid())
}

fn read_all_lines(path: &Path) -> Result<Vec<String>, InventoryError> {
    let contents = fs::read_to_string(path).map_err(|source| InventoryError::Persistence {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents.lines().map(str::to_owned).collect())
}

// Whole-file rewrite through a temporary sibling file renamed over the original, so a failed
// write never leaves a truncated source behind.
fn rewrite_lines(path: &Path, lines: &[String]) -> Result<(), InventoryError> {
    let persistence = |source: io::Error| InventoryError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut contents = String::new();
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }

    // The rename replaces the source, so it keeps the source's permissions, not the temp file's.
    let permissions = fs::metadata(path).map_err(persistence)?.permissions();

    let mut temp_file = NamedTempFile::new_in(dir).map_err(persistence)?;
    temp_file
        .write_all(contents.as_bytes())
        .map_err(persistence)?;
    temp_file
        .as_file()
        .set_permissions(permissions)
        .map_err(persistence)?;
    temp_file.as_file().sync_all().map_err(persistence)?;
    temp_file.persist(path).map_err(|err| persistence(err.error))?;
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// --------------------------------------- SOURCE LOCK --------------------------------------------
// ------------------------------------------------------------------------------------------------

// Exclusive claim on a source, held as `<source>.lock` for as long as the guard lives.
struct SourceLock {
    path: PathBuf,
}

impl SourceLock {
    fn acquire(source: &Path) -> Result<Self, InventoryError> {
        let mut lock_name = OsString::from(source.as_os_str());
        lock_name.push(".lock");
        let path = PathBuf::from(lock_name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!(lock = %path.display(), "Acquired source lock");
                Ok(SourceLock { path })
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(InventoryError::SourceLocked { lock: path })
            }
            Err(source) => Err(InventoryError::Persistence { path, source }),
        }
    }
}

impl Drop for SourceLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %err, "Failed to release source lock");
        }
    }
}

// ------------------------------------------------------------------------------------------------
// --------------------------------------- UNIT TESTS ---------------------------------------------
// ------------------------------------------------------------------------------------------------
