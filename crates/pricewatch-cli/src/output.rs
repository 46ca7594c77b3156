//! CSV snapshot output.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use pricewatch_core::ProductRecord;

const STDOUT_PATH: &str = "-";

/// Writes `records` as CSV with a header row and returns the row count.
pub(crate) fn write_csv<W: Write>(writer: W, records: &[ProductRecord]) -> anyhow::Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(records.len())
}

/// Writes to the file at `out`, or stdout when `out` is `-`.
pub(crate) fn write_records(out: &Path, records: &[ProductRecord]) -> anyhow::Result<usize> {
    if out == Path::new(STDOUT_PATH) {
        return write_csv(io::stdout().lock(), records);
    }
    let file =
        File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
    write_csv(file, records).with_context(|| format!("failed to write {}", out.display()))
}

pub(crate) fn describe(out: &Path) -> String {
    if out == Path::new(STDOUT_PATH) {
        "stdout".to_string()
    } else {
        out.display().to_string()
    }
}
