//! Excel importer implementation - Excel (.xlsx) → Portfolio

use crate::config::SheetNames;
use crate::error::{CarteraError, CarteraResult};
use crate::types::*;
use calamine::{open_workbook, Data, Range, Reader, Xlsx, XlsxError};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Reads the three portfolio summary sheets of a workbook
pub struct ExcelImporter {
    path: std::path::PathBuf,
    sheet_names: SheetNames,
}

impl ExcelImporter {
    /// Create a new Excel importer using the default tab names
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sheet_names: SheetNames::default(),
        }
    }

    /// Override the tab names looked up in the workbook
    pub fn with_sheet_names(mut self, sheet_names: SheetNames) -> Self {
        self.sheet_names = sheet_names;
        self
    }

    /// Import every required sheet. Missing sheets or headers are fatal.
    pub fn import(&self) -> CarteraResult<Portfolio> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e: XlsxError| CarteraError::Workbook {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let available = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(SheetKind::ALL.len());

        for kind in SheetKind::ALL {
            let tab = self.sheet_names.tab(kind);
            if !available.iter().any(|name| name == tab) {
                return Err(CarteraError::MissingSheet(tab.to_string()));
            }
            let range = workbook
                .worksheet_range(tab)
                .map_err(|e| CarteraError::Workbook {
                    path: self.path.display().to_string(),
                    message: format!("sheet '{}': {}", tab, e),
                })?;
            let records = self.read_sheet(tab, &range)?;
            debug!(sheet = tab, rows = records.len(), "sheet loaded");
            sheets.push(Sheet::new(kind, tab, records));
        }

        Ok(Portfolio::new(sheets))
    }

    /// Convert one worksheet range into records
    fn read_sheet(&self, sheet: &str, range: &Range<Data>) -> CarteraResult<Vec<PortfolioRecord>> {
        let mut rows = range.rows();
        let header = match rows.next() {
            Some(header) => header,
            None => {
                return Err(CarteraError::MissingColumn {
                    sheet: sheet.to_string(),
                    column: REQUIRED_COLUMNS[0].to_string(),
                })
            }
        };
        let columns = ColumnIndex::from_header(sheet, header)?;

        let mut records = Vec::new();
        for (offset, row) in rows.enumerate() {
            if row.iter().all(|cell| matches!(cell, Data::Empty)) {
                continue;
            }
            // +2: one for the header, one for 1-based spreadsheet rows
            let cells = RowCells {
                sheet,
                row_number: offset + 2,
                row,
                columns: &columns,
            };
            records.push(cells.to_record());
        }
        Ok(records)
    }
}

/// Header name → column position
struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn from_header(sheet: &str, header: &[Data]) -> CarteraResult<Self> {
        let names: Vec<String> = header
            .iter()
            .map(|cell| match cell {
                Data::String(s) => s.trim().to_string(),
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect();

        let mut positions = HashMap::new();
        for column in REQUIRED_COLUMNS {
            let idx = names
                .iter()
                .position(|name| name == column)
                .ok_or_else(|| CarteraError::MissingColumn {
                    sheet: sheet.to_string(),
                    column: column.to_string(),
                })?;
            positions.insert(column, idx);
        }
        Ok(Self { positions })
    }

    fn get(&self, column: &str) -> usize {
        // Every required column was resolved in from_header
        self.positions.get(column).copied().unwrap_or(usize::MAX)
    }
}

static EMPTY_CELL: Data = Data::Empty;

struct RowCells<'a> {
    sheet: &'a str,
    row_number: usize,
    row: &'a [Data],
    columns: &'a ColumnIndex,
}

impl RowCells<'_> {
    fn cell(&self, column: &str) -> &Data {
        self.row.get(self.columns.get(column)).unwrap_or(&EMPTY_CELL)
    }

    fn text(&self, column: &str) -> String {
        cell_to_text(self.cell(column))
    }

    fn number(&self, column: &str) -> Option<f64> {
        let cell = self.cell(column);
        let value = cell_to_number(cell);
        if value.is_none() && !is_blank(cell) {
            warn!(
                sheet = self.sheet,
                row = self.row_number,
                column,
                cell = %cell,
                "non-numeric cell treated as missing"
            );
        }
        value
    }

    fn tenor(&self) -> Option<u32> {
        let months = self.number(COL_TENOR)?;
        if months >= 0.0 && months.fract() == 0.0 && months <= u32::MAX as f64 {
            Some(months as u32)
        } else {
            warn!(
                sheet = self.sheet,
                row = self.row_number,
                months,
                "tenor is not a whole number of months"
            );
            None
        }
    }

    fn to_record(&self) -> PortfolioRecord {
        PortfolioRecord {
            business_unit: self.text(COL_BUSINESS_UNIT),
            department: self.text(COL_DEPARTMENT),
            tenor_months: self.tenor(),
            department_id: self.text(COL_DEPARTMENT_ID),
            rate_flag: self.text(COL_RATE_FLAG),
            category: self.text(COL_CATEGORY),
            margin: self.number(COL_MARGIN),
            capital_balance: self.number(COL_CAPITAL_BALANCE),
            weighted_rate: self.number(COL_WEIGHTED_RATE),
            usgaap60_amount: self.number(COL_USGAAP60_AMOUNT),
            usgaap90_amount: self.number(COL_USGAAP90_AMOUNT),
            usgaap90_pct: self.number(COL_USGAAP90_PCT),
            rrr: self.number(COL_RRR),
            rrr_with_margin: self.number(COL_RRR_WITH_MARGIN),
        }
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text cell; whole floats print without a trailing ".0" so ids stay stable
fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Numeric cell; numeric text is accepted, errors and blanks are missing
fn cell_to_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_row() -> Vec<Data> {
        REQUIRED_COLUMNS
            .iter()
            .map(|c| Data::String(c.to_string()))
            .collect()
    }

    #[test]
    fn test_cell_to_text() {
        assert_eq!(cell_to_text(&Data::String(" MOTOS ".to_string())), "MOTOS");
        assert_eq!(cell_to_text(&Data::Float(101.0)), "101");
        assert_eq!(cell_to_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_text(&Data::Int(7)), "7");
        assert_eq!(cell_to_text(&Data::Empty), "");
    }

    #[test]
    fn test_cell_to_number() {
        assert_eq!(cell_to_number(&Data::Float(0.25)), Some(0.25));
        assert_eq!(cell_to_number(&Data::Int(12)), Some(12.0));
        assert_eq!(cell_to_number(&Data::String("3.5".to_string())), Some(3.5));
        assert_eq!(cell_to_number(&Data::String("n/a".to_string())), None);
        assert_eq!(cell_to_number(&Data::Empty), None);
        assert_eq!(cell_to_number(&Data::Bool(true)), None);
    }

    #[test]
    fn test_column_index_finds_reordered_headers() {
        let mut header = header_row();
        header.reverse();
        header.push(Data::String("EXTRA".to_string()));
        let index = ColumnIndex::from_header("s", &header).unwrap();
        assert_eq!(index.get(COL_RRR_WITH_MARGIN), 0);
        assert_eq!(index.get(COL_BUSINESS_UNIT), REQUIRED_COLUMNS.len() - 1);
    }

    #[test]
    fn test_column_index_missing_header() {
        let header: Vec<Data> = header_row()
            .into_iter()
            .filter(|c| !matches!(c, Data::String(s) if s == COL_RRR))
            .collect();
        match ColumnIndex::from_header("RECOMPRA_resumen", &header) {
            Err(CarteraError::MissingColumn { sheet, column }) => {
                assert_eq!(sheet, "RECOMPRA_resumen");
                assert_eq!(column, "RRR");
            }
            other => panic!("Expected MissingColumn, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_row_to_record() {
        let index = ColumnIndex::from_header("s", &header_row()).unwrap();
        let row = vec![
            Data::String("ELEKTRA".to_string()),
            Data::String("MOTOS".to_string()),
            Data::Float(12.0),
            Data::Float(305.0),
            Data::String("CON TASA".to_string()),
            Data::String("RETAIL".to_string()),
            Data::Float(0.35),
            Data::Float(1_250_000.0),
            Data::Float(0.61),
            Data::Empty,
            Data::Float(12_000.0),
            Data::Float(0.04),
            Data::Float(1.8),
            Data::String("#N/A".to_string()),
        ];
        let cells = RowCells {
            sheet: "s",
            row_number: 2,
            row: &row,
            columns: &index,
        };
        let record = cells.to_record();

        assert_eq!(record.business_unit, "ELEKTRA");
        assert_eq!(record.tenor_months, Some(12));
        assert_eq!(record.department_id, "305");
        assert_eq!(record.capital_balance, Some(1_250_000.0));
        assert_eq!(record.usgaap60_amount, None);
        assert_eq!(record.rrr, Some(1.8));
        assert_eq!(record.rrr_with_margin, None);
    }

    #[test]
    fn test_short_row_reads_missing_cells_as_empty() {
        let index = ColumnIndex::from_header("s", &header_row()).unwrap();
        let row = vec![Data::String("ELEKTRA".to_string())];
        let cells = RowCells {
            sheet: "s",
            row_number: 2,
            row: &row,
            columns: &index,
        };
        let record = cells.to_record();
        assert_eq!(record.business_unit, "ELEKTRA");
        assert_eq!(record.tenor_months, None);
        assert_eq!(record.capital_balance, None);
    }

    #[test]
    fn test_import_missing_file() {
        let result = ExcelImporter::new("does-not-exist.xlsx").import();
        assert!(matches!(result, Err(CarteraError::Workbook { .. })));
    }
}
