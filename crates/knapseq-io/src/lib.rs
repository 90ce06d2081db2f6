mod explicit;
mod items;
mod shorthand;

use knapseq_solver::InputError;
use thiserror::Error;

pub use explicit::{ExplicitStyle, save_explicit, to_explicit, write_explicit};
pub use items::{parse_items, read_items};
pub use shorthand::{ShorthandRow, load_shorthand, read_shorthand, save_shorthand, write_shorthand};

#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error("Invalid item list: {0}")]
    Input(#[from] InputError),
    #[error("Row {row}: {message}")]
    Reconstruct { row: usize, message: String },
}

pub type Result<T> = std::result::Result<T, IoError>;

/// Line number of a CSV record, for error messages
fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}
