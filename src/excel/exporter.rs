//! Excel exporter implementation - records → Excel (.xlsx)

use crate::error::{CarteraError, CarteraResult};
use crate::types::{Portfolio, PortfolioRecord, REQUIRED_COLUMNS};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

/// Writes record collections as worksheets carrying the standard headers,
/// so the output can be read back by [`super::ExcelImporter`].
#[derive(Default)]
pub struct ExcelExporter<'a> {
    sheets: Vec<(String, &'a [PortfolioRecord])>,
}

impl<'a> ExcelExporter<'a> {
    pub fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    /// Exporter for every sheet of a loaded portfolio
    pub fn from_portfolio(portfolio: &'a Portfolio) -> Self {
        let mut exporter = Self::new();
        for sheet in portfolio.sheets() {
            exporter = exporter.sheet(sheet.name.clone(), &sheet.records);
        }
        exporter
    }

    /// Queue a worksheet
    pub fn sheet(mut self, name: impl Into<String>, records: &'a [PortfolioRecord]) -> Self {
        self.sheets.push((name.into(), records));
        self
    }

    /// Export all queued worksheets to an .xlsx file
    pub fn export(&self, output_path: &Path) -> CarteraResult<()> {
        let mut workbook = Workbook::new();

        for (name, records) in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(name)
                .map_err(|e| CarteraError::Export(format!("Failed to set worksheet name: {}", e)))?;
            Self::write_sheet(worksheet, records)?;
        }

        workbook
            .save(output_path)
            .map_err(|e| CarteraError::Export(format!("Failed to save Excel file: {}", e)))?;

        tracing::debug!(path = %output_path.display(), sheets = self.sheets.len(), "workbook written");
        Ok(())
    }

    fn write_sheet(worksheet: &mut Worksheet, records: &[PortfolioRecord]) -> CarteraResult<()> {
        let header_format = Format::new().set_bold();

        for (col, header) in REQUIRED_COLUMNS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *header, &header_format)
                .map_err(|e| CarteraError::Export(format!("Failed to write header: {}", e)))?;
            worksheet
                .set_column_width(col as u16, 18)
                .map_err(|e| CarteraError::Export(e.to_string()))?;
        }

        for (idx, record) in records.iter().enumerate() {
            let row = (idx + 1) as u32;
            for (col, cell) in record_cells(record).into_iter().enumerate() {
                let result = match cell {
                    Cell::Text(text) => worksheet.write_string(row, col as u16, text).map(|_| ()),
                    Cell::Number(Some(n)) => worksheet.write_number(row, col as u16, n).map(|_| ()),
                    Cell::Number(None) => Ok(()),
                };
                result.map_err(|e| CarteraError::Export(format!("Failed to write row {}: {}", row, e)))?;
            }
        }
        Ok(())
    }
}

enum Cell<'r> {
    Text(&'r str),
    Number(Option<f64>),
}

/// Cells in [`REQUIRED_COLUMNS`] order
fn record_cells(r: &PortfolioRecord) -> [Cell<'_>; 14] {
    [
        Cell::Text(&r.business_unit),
        Cell::Text(&r.department),
        Cell::Number(r.tenor_months.map(f64::from)),
        Cell::Text(&r.department_id),
        Cell::Text(&r.rate_flag),
        Cell::Text(&r.category),
        Cell::Number(r.margin),
        Cell::Number(r.capital_balance),
        Cell::Number(r.weighted_rate),
        Cell::Number(r.usgaap60_amount),
        Cell::Number(r.usgaap90_amount),
        Cell::Number(r.usgaap90_pct),
        Cell::Number(r.rrr),
        Cell::Number(r.rrr_with_margin),
    ]
}
