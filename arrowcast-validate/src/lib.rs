//! Read-only integrity scanner for Arrow IPC files.
//!
//! Walks each record batch and each column once. Primitive columns cost
//! nothing beyond the structural check; string columns get their payloads
//! validated; dictionary columns recurse into indices and values. Every
//! check is opt-in through [`Checks`] and the first failure wins.

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use arrow::array::{
    Array, ArrayRef, DictionaryArray, Float32Array, Float64Array, StringArray,
};
use arrow::datatypes::{DataType, Int8Type, Int16Type, Int32Type};
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;

use arrowcast_result::Result;

/// Which validations to run.
#[derive(Debug, Clone)]
pub struct Checks {
    /// Structural soundness: offsets within bounds, valid UTF-8 payloads,
    /// sane null buffers. The default.
    pub safe: bool,
    /// No NaN or infinity in float columns.
    pub floats_all_finite: bool,
    /// Every dictionary value is referenced by some index.
    pub dictionary_values_all_used: bool,
    /// No null dictionary values.
    pub dictionary_values_not_null: bool,
    /// No duplicate dictionary values.
    pub dictionary_values_unique: bool,
    /// No ASCII control characters in column names.
    pub column_name_control_characters: bool,
    /// Maximum column-name length in bytes; 0 disables the check.
    pub column_name_max_bytes: usize,
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            safe: true,
            floats_all_finite: false,
            dictionary_values_all_used: false,
            dictionary_values_not_null: false,
            dictionary_values_unique: false,
            column_name_control_characters: false,
            column_name_max_bytes: 0,
        }
    }
}

/// Scan `path`. `Ok(None)` means the file passed; `Ok(Some(message))`
/// names the first failed check. `Err` is reserved for I/O-level problems
/// reading the file at all.
pub fn validate_file(path: &Path, checks: &Checks) -> Result<Option<String>> {
    let reader = FileReader::try_new(File::open(path)?, None)?;
    for batch in reader {
        let batch = match batch {
            Ok(batch) => batch,
            Err(err) if checks.safe => {
                return Ok(Some(format!("--check-safe failed: {err}")));
            }
            Err(err) => return Err(err.into()),
        };
        if let Some(failure) = validate_batch(&batch, checks) {
            return Ok(Some(failure));
        }
    }
    Ok(None)
}

fn validate_batch(batch: &RecordBatch, checks: &Checks) -> Option<String> {
    let schema = batch.schema();
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if let Some(failure) = validate_column_name(field.name(), checks) {
            return Some(failure);
        }
        if let Some(failure) = validate_array(column, checks) {
            return Some(format!("{failure} failed on column {}", field.name()));
        }
    }
    None
}

fn validate_column_name(name: &str, checks: &Checks) -> Option<String> {
    if checks.column_name_control_characters && name.bytes().any(|b| b < 0x20) {
        return Some("--check-column-name-control-characters failed on a column name".to_string());
    }
    if checks.column_name_max_bytes > 0 && name.len() > checks.column_name_max_bytes {
        return Some(format!(
            "--check-column-name-max-bytes={} failed on column {name}",
            checks.column_name_max_bytes
        ));
    }
    None
}

/// Check one array; the returned string names the violated flag.
fn validate_array(array: &ArrayRef, checks: &Checks) -> Option<String> {
    if checks.safe
        && let Err(err) = array.to_data().validate_full()
    {
        return Some(format!("--check-safe ({err})"));
    }

    match array.data_type() {
        DataType::Float64 => {
            let floats = array.as_any().downcast_ref::<Float64Array>()?;
            check_floats_finite(floats.iter(), checks)
        }
        DataType::Float32 => {
            let floats = array.as_any().downcast_ref::<Float32Array>()?;
            check_floats_finite(floats.iter().map(|v| v.map(f64::from)), checks)
        }
        DataType::Float16 if checks.floats_all_finite => {
            Some("--check-floats-all-finite does not support float16".to_string())
        }
        DataType::Dictionary(key_type, _) => match key_type.as_ref() {
            DataType::Int8 => {
                let dict = array.as_any().downcast_ref::<DictionaryArray<Int8Type>>()?;
                validate_dictionary(
                    dict.keys().iter().map(|k| k.map(|k| k as usize)),
                    dict.values(),
                    checks,
                )
            }
            DataType::Int16 => {
                let dict = array.as_any().downcast_ref::<DictionaryArray<Int16Type>>()?;
                validate_dictionary(
                    dict.keys().iter().map(|k| k.map(|k| k as usize)),
                    dict.values(),
                    checks,
                )
            }
            DataType::Int32 => {
                let dict = array.as_any().downcast_ref::<DictionaryArray<Int32Type>>()?;
                validate_dictionary(
                    dict.keys().iter().map(|k| k.map(|k| k as usize)),
                    dict.values(),
                    checks,
                )
            }
            _ => Some("dictionary indices must be int8/int16/int32".to_string()),
        },
        _ => None,
    }
}

fn check_floats_finite(
    values: impl Iterator<Item = Option<f64>>,
    checks: &Checks,
) -> Option<String> {
    if !checks.floats_all_finite {
        return None;
    }
    for value in values.flatten() {
        if !value.is_finite() {
            return Some("--check-floats-all-finite".to_string());
        }
    }
    None
}

fn validate_dictionary(
    keys: impl Iterator<Item = Option<usize>>,
    values: &ArrayRef,
    checks: &Checks,
) -> Option<String> {
    if let Some(failure) = validate_array(values, checks) {
        return Some(failure);
    }

    if checks.dictionary_values_not_null && values.null_count() > 0 {
        return Some("--check-dictionary-values-not-null".to_string());
    }

    if checks.dictionary_values_all_used {
        let mut seen = vec![false; values.len()];
        for key in keys.flatten() {
            if let Some(slot) = seen.get_mut(key) {
                *slot = true;
            }
        }
        if seen.iter().any(|used| !used) {
            return Some("--check-dictionary-values-all-used".to_string());
        }
    }

    if checks.dictionary_values_unique {
        let Some(strings) = values.as_any().downcast_ref::<StringArray>() else {
            return Some("--check-dictionary-values-unique supports only utf8 values".to_string());
        };
        let mut seen = HashSet::with_capacity(strings.len());
        for value in strings.iter().flatten() {
            if !seen.insert(value) {
                return Some("--check-dictionary-values-unique".to_string());
            }
        }
    }

    None
}
