//! Shared error and result types for every arrowcast crate.

mod error;

pub use error::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
