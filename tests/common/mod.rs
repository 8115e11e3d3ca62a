//! Shared fixtures: a small portfolio and a workbook written from it

#![allow(dead_code)]

use cartera::excel::ExcelExporter;
use cartera::types::{Portfolio, PortfolioRecord, Sheet, SheetKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn record(unit: &str, department: &str, tenor: u32, balance: f64, rrr: f64, pct: f64) -> PortfolioRecord {
    PortfolioRecord {
        business_unit: unit.to_string(),
        department: department.to_string(),
        tenor_months: Some(tenor),
        department_id: format!("{}", department.len()),
        rate_flag: "CON TASA".to_string(),
        category: "RETAIL".to_string(),
        margin: Some(0.3),
        capital_balance: Some(balance),
        weighted_rate: Some(0.5),
        usgaap60_amount: Some(balance * 0.02),
        usgaap90_amount: Some(balance * pct),
        usgaap90_pct: Some(pct),
        rrr: Some(rrr),
        rrr_with_margin: Some(rrr + 0.25),
    }
}

/// Total sheet rows
///
/// - EL BODEGON MUEBLES at 6 and 12 months (aggregates under "all")
/// - EL BODEGON COLCHONES under the standard balance floor
/// - ELEKTRA MOTOS without rate, CELULARES with a zero %USGAAP 90
pub fn total_records() -> Vec<PortfolioRecord> {
    let mut no_rate = record("ELEKTRA", "MOTOS", 6, 2_000_000.0, 1.1, 0.04);
    no_rate.rate_flag = "SIN TASA".to_string();
    vec![
        record("EL BODEGON", "MUEBLES", 6, 200_000.0, 1.5, 0.05),
        record("EL BODEGON", "MUEBLES", 12, 600_000.0, 2.5, 0.09),
        record("EL BODEGON", "COLCHONES", 6, 50_000.0, 0.9, 0.02),
        record("ELEKTRA", "LINEA BLANCA", 6, 900_000.0, 1.8, 0.06),
        record("ELEKTRA", "CELULARES", 6, 1_200_000.0, 2.2, 0.0),
        no_rate,
    ]
}

pub fn portfolio() -> Portfolio {
    Portfolio::new(vec![
        Sheet::new(SheetKind::Total, SheetKind::Total.default_tab(), total_records()),
        Sheet::new(
            SheetKind::FirstPurchase,
            SheetKind::FirstPurchase.default_tab(),
            vec![record("ELEKTRA", "LINEA BLANCA", 6, 400_000.0, 1.6, 0.05)],
        ),
        Sheet::new(
            SheetKind::Repurchase,
            SheetKind::Repurchase.default_tab(),
            vec![record("ELEKTRA", "LINEA BLANCA", 6, 500_000.0, 2.0, 0.07)],
        ),
    ])
}

/// Write [`portfolio`] as a workbook inside `dir`
pub fn write_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("Resumen_Cartera_Morosidad.xlsx");
    ExcelExporter::from_portfolio(&portfolio())
        .export(&path)
        .expect("fixture workbook");
    path
}

pub fn workbook_dir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = write_workbook(dir.path());
    (dir, path)
}
