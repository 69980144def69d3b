//! Arrow IPC file output.

use std::fs::File;
use std::path::Path;

use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;

use arrowcast_result::Result;

/// Write `batch` to `path` as an Arrow IPC file with a single record batch.
pub fn write_ipc_file(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &batch.schema())?;
    writer.write(batch)?;
    writer.finish()?;
    Ok(())
}
