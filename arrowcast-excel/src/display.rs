//! Display strings and epoch conversion for spreadsheet cells.
//!
//! The display string is what lands in the column's text shadow, so it is
//! the value a user sees if the column falls back to text.

use calamine::{CellErrorType, Data, ExcelDateTime};
use chrono::NaiveTime;

/// Render a cell the way the sheet would show it.
pub fn cell_display(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(v) => v.to_string(),
        Data::Float(v) => format_general(*v),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => format_datetime(dt),
        Data::Error(e) => error_display(e).to_string(),
    }
}

/// "General" number format: integers without a decimal point, everything
/// else in the shortest representation that round-trips.
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn format_datetime(dt: &ExcelDateTime) -> String {
    match dt.as_datetime() {
        Some(naive) => {
            if naive.time() == NaiveTime::MIN {
                naive.format("%Y-%m-%d").to_string()
            } else {
                naive.format("%Y-%m-%d %H:%M:%S%.f").to_string()
            }
        }
        None => format_general(dt.as_f64()),
    }
}

/// Nanoseconds since the Unix epoch for a date cell. The second element is
/// the overflow flag: set when the date lands outside what 64-bit
/// nanoseconds can hold, in which case the cell must become null.
pub fn datetime_to_ns(dt: &ExcelDateTime) -> (i64, bool) {
    match dt.as_datetime() {
        Some(naive) => match naive.and_utc().timestamp_nanos_opt() {
            Some(ns) => (ns, false),
            None => (0, true),
        },
        None => (0, true),
    }
}

/// Excel's canonical error-cell text.
fn error_display(error: &CellErrorType) -> &'static str {
    match error {
        CellErrorType::Null => "#NULL!",
        CellErrorType::Div0 => "#DIV/0!",
        CellErrorType::Value => "#VALUE!",
        CellErrorType::Ref => "#REF!",
        CellErrorType::Name => "#NAME?",
        CellErrorType::Num => "#NUM!",
        CellErrorType::NA => "#N/A",
        CellErrorType::GettingData => "#GETTING_DATA",
    }
}
