//! gf-results: append-only CSV log of published grid snapshots.

pub mod store;
pub mod writer;

pub use store::{BUS_LOG_FILE, LINE_LOG_FILE, SnapshotLog};
pub use writer::spawn_log_writer;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid log path: {message}")]
    InvalidPath { message: String },
}
