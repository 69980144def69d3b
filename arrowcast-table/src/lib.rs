//! Type-inferring column builder and streaming table assembler.
//!
//! Every arrowcast front-end (CSV, JSON, XLS, XLSX) pushes cells into this
//! crate one at a time; the core infers a single output type per column,
//! bounds memory, tracks diagnostics, and materializes an Arrow record
//! batch with well-defined null semantics.
//!
//! Modules:
//! - string_buffer: fixed-cap append-anything buffer with UTF-8-safe
//!   truncation.
//! - warnings: counted, first-occurrence-located diagnostics ledger.
//! - limits: per-run resource caps, frozen at driver construction.
//! - column: per-column type-inferring accumulator.
//! - table: name-addressed table builder.
//! - sheet: index-addressed table builder for spreadsheet drivers.
//! - ipc: Arrow IPC file output.

#![forbid(unsafe_code)]

pub mod column;
pub mod ipc;
pub mod limits;
pub mod sheet;
pub mod string_buffer;
pub mod table;
pub mod warnings;

pub use column::{ColumnBuilder, Dtype, StringColumnBuilder, is_column_name_invalid};
pub use limits::Limits;
pub use sheet::{NextAction, SheetTableBuilder, column_reference};
pub use string_buffer::StringBuffer;
pub use table::{FoundColumn, TableBuilder};
pub use warnings::Warnings;
