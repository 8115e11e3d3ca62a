use super::*;
use crate::core::TenorSelection;
use crate::types::Sheet;
use tempfile::TempDir;

fn record(unit: &str, department: &str, tenor: Option<u32>, balance: f64) -> PortfolioRecord {
    PortfolioRecord {
        business_unit: unit.to_string(),
        department: department.to_string(),
        tenor_months: tenor,
        rate_flag: "CON TASA".to_string(),
        capital_balance: Some(balance),
        weighted_rate: Some(0.55),
        usgaap90_pct: Some(0.061),
        rrr: Some(1.85),
        rrr_with_margin: Some(2.1),
        ..Default::default()
    }
}

fn portfolio() -> Portfolio {
    Portfolio::new(vec![Sheet::new(
        SheetKind::Total,
        "TOTAL CARTERA_resumen",
        vec![
            record("EL BODEGON", "MUEBLES", Some(6), 200_000.0),
            record("EL BODEGON", "COLCHONES", Some(6), 50_000.0),
            record("ELEKTRA", "MOTOS", Some(6), 900_000.0),
        ],
    )])
}

// =========================================================================
// Formatting Tests
// =========================================================================

#[test]
fn test_format_number_trims_zeros() {
    assert_eq!(format_number(100.0), "100");
    assert_eq!(format_number(0.5), "0.5");
    assert_eq!(format_number(0.123456), "0.1235");
    assert_eq!(format_number(-2.75), "-2.75");
}

#[test]
fn test_format_balance_groups_thousands() {
    assert_eq!(format_balance(0.0), "0");
    assert_eq!(format_balance(999.0), "999");
    assert_eq!(format_balance(1_000.0), "1,000");
    assert_eq!(format_balance(1_234_567.4), "1,234,567");
    assert_eq!(format_balance(-550_000.0), "-550,000");
}

#[test]
fn test_truncate_long_labels() {
    assert_eq!(truncate("MOTOS", 10), "MOTOS");
    assert_eq!(truncate("LINEA BLANCA", 6), "LINEA…");
}

#[test]
fn test_format_table_shows_all_tenors_marker() {
    let rows = vec![
        record("ELEKTRA", "MOTOS", Some(6), 900_000.0),
        record("ELEKTRA", "CELULARES", None, 1_500_000.0),
    ];
    let table = format_table(&rows);
    let lines: Vec<&str> = table.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("NEGOCIO"));
    assert!(lines[2].contains("900,000"));
    assert!(lines[3].contains(" all "));
    assert!(lines[3].contains("1.85"));
}

// =========================================================================
// Chart Tests
// =========================================================================

#[test]
fn test_render_scatter_counts_plotted_rows() {
    let params = FilterParams::default().with_business_units(["EL BODEGON", "ELEKTRA"]);
    let rendered = ChartRequest::Scatter {
        x: Metric::Rrr,
        y: Metric::Usgaap90Pct,
    }
    .render(&portfolio(), &params, &ChartSettings::default())
    .unwrap();

    // COLCHONES is under the balance floor
    assert_eq!(rendered.plotted, 2);
    assert_eq!(rendered.empty_state, None);
    assert_eq!(rendered.caption, "EL BODEGON, ELEKTRA - 6 months");
    assert!(rendered.svg.contains("MUEBLES"));
}

#[test]
fn test_render_bars_without_metrics_fails() {
    let params = FilterParams::default().with_business_units(["ELEKTRA"]);
    let result = ChartRequest::Bars {
        bars: vec![],
        line: None,
    }
    .render(&portfolio(), &params, &ChartSettings::default());
    assert!(matches!(result, Err(CarteraError::Validation(_))));
}

#[test]
fn test_render_empty_selection_reports_state() {
    let params = FilterParams::default().with_tenor(TenorSelection::All);
    let rendered = ChartRequest::Bars {
        bars: vec![Metric::Rrr],
        line: Some(Metric::Usgaap90Pct),
    }
    .render(&portfolio(), &params, &ChartSettings::default())
    .unwrap();

    assert_eq!(rendered.plotted, 0);
    assert_eq!(rendered.empty_state, Some(EmptyState::NoBusinessUnit));
    assert!(rendered.svg.contains(EmptyState::NoBusinessUnit.message()));
}

#[test]
fn test_render_to_file_writes_svg() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("bars.svg");
    let params = FilterParams::default().with_business_units(["ELEKTRA"]);

    render_to_file(
        &ChartRequest::Bars {
            bars: vec![Metric::Rrr, Metric::RrrWithMargin],
            line: None,
        },
        &portfolio(),
        &params,
        &ChartSettings::default(),
        &output,
    )
    .unwrap();

    let svg = fs::read_to_string(&output).unwrap();
    assert!(svg.contains("MOTOS"));
    assert!(svg.contains("1.9x"));
}

// =========================================================================
// Export Tests
// =========================================================================

#[test]
fn test_export_rows_csv() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("view.csv");
    let rows = vec![record("ELEKTRA", "MOTOS", Some(6), 900_000.0)];

    export_rows(&rows, &output).unwrap();

    let back = writer::read_csv(fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(back, rows);
}

#[test]
fn test_export_rows_xlsx_uppercase_extension() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("VIEW.XLSX");
    export_rows(&[record("ELEKTRA", "MOTOS", Some(6), 900_000.0)], &output).unwrap();
    assert!(output.exists());
}

#[test]
fn test_export_rows_rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let result = export_rows(&[], &dir.path().join("view.json"));
    assert!(matches!(result, Err(CarteraError::Validation(_))));
}
