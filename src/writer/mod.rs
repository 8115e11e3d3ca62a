//! CSV download of a filtered view
//!
//! Columns carry the workbook headers in their standard order. The header
//! line is always written, so an empty view still produces a valid file.

use crate::error::{CarteraError, CarteraResult};
use crate::types::{PortfolioRecord, REQUIRED_COLUMNS};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Write rows as CSV to any writer
pub fn write_csv<W: Write>(writer: W, rows: &[PortfolioRecord]) -> CarteraResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(REQUIRED_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render rows as an in-memory CSV document
pub fn to_csv_string(rows: &[PortfolioRecord]) -> CarteraResult<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, rows)?;
    String::from_utf8(buf).map_err(|e| CarteraError::Export(format!("CSV is not valid UTF-8: {}", e)))
}

pub fn write_csv_file(path: &Path, rows: &[PortfolioRecord]) -> CarteraResult<()> {
    let file = File::create(path)?;
    write_csv(file, rows)
}

/// Read rows previously written by [`write_csv`]
pub fn read_csv<R: Read>(reader: R) -> CarteraResult<Vec<PortfolioRecord>> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.deserialize::<PortfolioRecord>() {
        rows.push(record?);
    }
    Ok(rows)
}
