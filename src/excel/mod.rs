//! Excel workbook access
//!
//! - Import: the three portfolio summary sheets → [`crate::types::Portfolio`]
//! - Export: record collections (a whole portfolio or one filtered view) → .xlsx

mod exporter;
mod importer;

pub use exporter::ExcelExporter;
pub use importer::ExcelImporter;
