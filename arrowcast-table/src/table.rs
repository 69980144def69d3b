//! Name-addressed table assembly.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use rustc_hash::FxHashMap;

use arrowcast_result::Result;

use crate::column::{ColumnBuilder, Dtype, is_column_name_invalid};
use crate::warnings::Warnings;

/// Result of a successful column lookup or creation.
#[derive(Debug, Clone, Copy)]
pub struct FoundColumn {
    pub index: usize,
    pub is_new: bool,
}

/// Owns column builders in insertion order plus a name index.
///
/// The map stores indices into the builder vector rather than references,
/// so there is exactly one owner of each builder and one authoritative copy
/// of each name.
pub struct TableBuilder {
    columns: Vec<ColumnBuilder>,
    lookup: FxHashMap<String, usize>,
    max_columns: usize,
}

impl TableBuilder {
    pub fn new(max_columns: usize) -> Self {
        Self {
            columns: Vec::new(),
            lookup: FxHashMap::default(),
            max_columns,
        }
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_mut(&mut self, index: usize) -> &mut ColumnBuilder {
        &mut self.columns[index]
    }

    /// Look `name` up; on a miss, create the column if the name is valid
    /// and the column budget allows. `None` means the cell must be
    /// discarded (the reason has been recorded in `warnings`).
    pub fn find_or_create_column(
        &mut self,
        row: usize,
        name: &str,
        warnings: &mut Warnings,
    ) -> Option<FoundColumn> {
        if let Some(&index) = self.lookup.get(name) {
            return Some(FoundColumn {
                index,
                is_new: false,
            });
        }
        if is_column_name_invalid(name) {
            warnings.warn_column_name_invalid(row, name);
            return None;
        }
        if self.columns.len() >= self.max_columns {
            warnings.warn_column_skipped(name);
            return None;
        }

        let index = self.columns.len();
        self.columns.push(ColumnBuilder::new(name));
        self.lookup.insert(name.to_string(), index);
        Some(FoundColumn {
            index,
            is_new: true,
        })
    }

    /// Index-addressed access for drivers with anonymous columns (CSV):
    /// auto-creates columns through `index` with decimal names.
    pub fn column_at(
        &mut self,
        index: usize,
        warnings: &mut Warnings,
    ) -> Option<&mut ColumnBuilder> {
        if index >= self.max_columns {
            warnings.warn_column_skipped(&index.to_string());
            return None;
        }
        while self.columns.len() <= index {
            let name = self.columns.len().to_string();
            self.lookup.insert(name.clone(), self.columns.len());
            self.columns.push(ColumnBuilder::new(&name));
        }
        Some(&mut self.columns[index])
    }

    /// Destructively build the output batch: null-pad every column to
    /// `n_rows`, emit per-column finish warnings, and clear internal state.
    pub fn finish(&mut self, n_rows: usize, warnings: &mut Warnings) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());

        for column in &mut self.columns {
            column.grow_to_length(n_rows);
            column.warn_on_finish(warnings);
            if column.dtype() == Dtype::Untyped {
                warnings.warn_column_null(column.name());
            }
            let array = column.finish(n_rows);
            fields.push(Field::new(column.name(), array.data_type().clone(), true));
            arrays.push(array);
        }

        self.lookup.clear();
        self.columns.clear();

        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(n_rows));
        Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use arrow::array::{Array, StringArray};
    use arrow::datatypes::DataType;

    #[test]
    fn creates_then_finds_by_name() {
        let mut table = TableBuilder::new(usize::MAX);
        let mut warnings = Warnings::default();
        let first = table.find_or_create_column(0, "x", &mut warnings).expect("create");
        assert!(first.is_new);
        let again = table.find_or_create_column(1, "x", &mut warnings).expect("find");
        assert!(!again.is_new);
        assert_eq!(first.index, again.index);
        assert_eq!(table.n_columns(), 1);
    }

    #[test]
    fn rejects_invalid_names() {
        let mut table = TableBuilder::new(usize::MAX);
        let mut warnings = Warnings::default();
        assert!(table.find_or_create_column(0, "", &mut warnings).is_none());
        assert!(table.find_or_create_column(0, "a\nb", &mut warnings).is_none());
        assert_eq!(table.n_columns(), 0);
        assert!(
            warnings
                .render(&Limits::default())
                .contains("ignored invalid column")
        );
    }

    #[test]
    fn enforces_column_budget() {
        let mut table = TableBuilder::new(2);
        let mut warnings = Warnings::default();
        assert!(table.find_or_create_column(0, "a", &mut warnings).is_some());
        assert!(table.find_or_create_column(0, "b", &mut warnings).is_some());
        assert!(table.find_or_create_column(0, "z", &mut warnings).is_none());
        // An existing column is still reachable past the budget.
        assert!(table.find_or_create_column(0, "a", &mut warnings).is_some());
        let limits = Limits {
            max_columns: 2,
            ..Limits::default()
        };
        assert_eq!(
            warnings.render(&limits),
            "skipped column z (after column limit of 2)\n"
        );
    }

    #[test]
    fn column_at_backfills_with_decimal_names() {
        let mut table = TableBuilder::new(usize::MAX);
        let mut warnings = Warnings::default();
        table
            .column_at(2, &mut warnings)
            .expect("column 2")
            .write_string(0, "c");
        assert_eq!(table.n_columns(), 3);
        let batch = table.finish(1, &mut warnings).expect("finish");
        assert_eq!(batch.schema().field(0).name(), "0");
        assert_eq!(batch.schema().field(2).name(), "2");
    }

    #[test]
    fn finish_pads_and_warns_all_null() {
        let mut table = TableBuilder::new(usize::MAX);
        let mut warnings = Warnings::default();
        let found = table.find_or_create_column(0, "a", &mut warnings).expect("a");
        table.column_mut(found.index).write_string(0, "v");
        table.find_or_create_column(0, "b", &mut warnings).expect("b");
        let batch = table.finish(3, &mut warnings).expect("finish");

        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Utf8);
        let b = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("strings");
        assert_eq!(b.null_count(), 3);
        assert!(
            warnings
                .render(&Limits::default())
                .contains("chose string type for null column b\n")
        );
        // Builder is reusable after finish.
        assert_eq!(table.n_columns(), 0);
    }

    #[test]
    fn zero_column_table_keeps_row_count() {
        let mut table = TableBuilder::new(usize::MAX);
        let mut warnings = Warnings::default();
        let batch = table.finish(0, &mut warnings).expect("finish");
        assert_eq!(batch.num_columns(), 0);
        assert_eq!(batch.num_rows(), 0);
    }
}
