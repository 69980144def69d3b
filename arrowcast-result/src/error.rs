use std::io;

use thiserror::Error;

/// Unified error type for all arrowcast operations.
///
/// Only genuinely fatal conditions travel through this type: failing to open
/// an input or output file, an Arrow-level failure while materializing or
/// writing a table, or invalid arguments handed to a driver. Malformed
/// *data* never becomes an `Error`; it is recorded in the warning ledger and
/// the conversion continues.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading an input file or writing an output file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow library error while building arrays or writing the IPC file.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid user input or API parameter, e.g. a multi-byte CSV delimiter
    /// or an unsupported header-rows range.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or violated invariant, such as a
    /// driver writing rows out of order.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}
