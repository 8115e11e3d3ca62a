use crate::error::{CarteraError, CarteraResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Column Headers
//==============================================================================

pub const COL_BUSINESS_UNIT: &str = "NEGOCIO";
pub const COL_TENOR: &str = "PLAZO MESES";
pub const COL_DEPARTMENT: &str = "DEPARTAMENTO / PRODUCTO";
pub const COL_CAPITAL_BALANCE: &str = "CARTERA CAPITAL TOTAL";
pub const COL_RATE_FLAG: &str = "TASA";
pub const COL_RRR: &str = "RRR";
pub const COL_RRR_WITH_MARGIN: &str = "RRR (con margen)";
pub const COL_USGAAP90_PCT: &str = "%USGAAP 90 PONDERADO";
pub const COL_MARGIN: &str = "MARGEN";
pub const COL_WEIGHTED_RATE: &str = "TASA ACTIVA PONDERADA";
pub const COL_DEPARTMENT_ID: &str = "ID DEPTO";
pub const COL_USGAAP60_AMOUNT: &str = "$ USGAAP 60 TOTAL";
pub const COL_USGAAP90_AMOUNT: &str = "$ USGAAP 90 TOTAL";
pub const COL_CATEGORY: &str = "RETAIL/PF/MKP";

/// Every header a portfolio sheet must carry, in export order.
pub const REQUIRED_COLUMNS: [&str; 14] = [
    COL_BUSINESS_UNIT,
    COL_DEPARTMENT,
    COL_TENOR,
    COL_DEPARTMENT_ID,
    COL_RATE_FLAG,
    COL_CATEGORY,
    COL_MARGIN,
    COL_CAPITAL_BALANCE,
    COL_WEIGHTED_RATE,
    COL_USGAAP60_AMOUNT,
    COL_USGAAP90_AMOUNT,
    COL_USGAAP90_PCT,
    COL_RRR,
    COL_RRR_WITH_MARGIN,
];

//==============================================================================
// Portfolio Record
//==============================================================================

/// One row of a portfolio summary sheet.
///
/// Serde names match the workbook headers so the same struct drives the CSV
/// export, the CSV reader and the JSON API payloads. Numeric cells that were
/// blank in the workbook stay `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioRecord {
    #[serde(rename = "NEGOCIO")]
    pub business_unit: String,
    #[serde(rename = "DEPARTAMENTO / PRODUCTO")]
    pub department: String,
    /// `None` on rows collapsed across all tenors
    #[serde(rename = "PLAZO MESES")]
    pub tenor_months: Option<u32>,
    #[serde(rename = "ID DEPTO")]
    pub department_id: String,
    #[serde(rename = "TASA")]
    pub rate_flag: String,
    #[serde(rename = "RETAIL/PF/MKP")]
    pub category: String,
    #[serde(rename = "MARGEN")]
    pub margin: Option<f64>,
    #[serde(rename = "CARTERA CAPITAL TOTAL")]
    pub capital_balance: Option<f64>,
    #[serde(rename = "TASA ACTIVA PONDERADA")]
    pub weighted_rate: Option<f64>,
    #[serde(rename = "$ USGAAP 60 TOTAL")]
    pub usgaap60_amount: Option<f64>,
    #[serde(rename = "$ USGAAP 90 TOTAL")]
    pub usgaap90_amount: Option<f64>,
    #[serde(rename = "%USGAAP 90 PONDERADO")]
    pub usgaap90_pct: Option<f64>,
    #[serde(rename = "RRR")]
    pub rrr: Option<f64>,
    #[serde(rename = "RRR (con margen)")]
    pub rrr_with_margin: Option<f64>,
}

impl PortfolioRecord {
    /// Read a numeric column through the typed metric enumeration
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Tenor => self.tenor_months.map(f64::from),
            Metric::CapitalBalance => self.capital_balance,
            Metric::WeightedRate => self.weighted_rate,
            Metric::Margin => self.margin,
            Metric::Usgaap60Amount => self.usgaap60_amount,
            Metric::Usgaap90Amount => self.usgaap90_amount,
            Metric::Usgaap90Pct => self.usgaap90_pct,
            Metric::Rrr => self.rrr,
            Metric::RrrWithMargin => self.rrr_with_margin,
        }
    }
}

//==============================================================================
// Metric
//==============================================================================

/// Numeric columns that may be plotted or filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    Tenor,
    CapitalBalance,
    WeightedRate,
    Margin,
    Usgaap60Amount,
    Usgaap90Amount,
    Usgaap90Pct,
    Rrr,
    RrrWithMargin,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Tenor,
        Metric::CapitalBalance,
        Metric::WeightedRate,
        Metric::Margin,
        Metric::Usgaap60Amount,
        Metric::Usgaap90Amount,
        Metric::Usgaap90Pct,
        Metric::Rrr,
        Metric::RrrWithMargin,
    ];

    /// Workbook header for this column
    pub fn header(self) -> &'static str {
        match self {
            Metric::Tenor => COL_TENOR,
            Metric::CapitalBalance => COL_CAPITAL_BALANCE,
            Metric::WeightedRate => COL_WEIGHTED_RATE,
            Metric::Margin => COL_MARGIN,
            Metric::Usgaap60Amount => COL_USGAAP60_AMOUNT,
            Metric::Usgaap90Amount => COL_USGAAP90_AMOUNT,
            Metric::Usgaap90Pct => COL_USGAAP90_PCT,
            Metric::Rrr => COL_RRR,
            Metric::RrrWithMargin => COL_RRR_WITH_MARGIN,
        }
    }

    /// Short command-line name
    pub fn slug(self) -> &'static str {
        match self {
            Metric::Tenor => "plazo-meses",
            Metric::CapitalBalance => "cartera-capital-total",
            Metric::WeightedRate => "tasa-activa-ponderada",
            Metric::Margin => "margen",
            Metric::Usgaap60Amount => "usgaap-60-total",
            Metric::Usgaap90Amount => "usgaap-90-total",
            Metric::Usgaap90Pct => "pct-usgaap-90",
            Metric::Rrr => "rrr",
            Metric::RrrWithMargin => "rrr-con-margen",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Metric {
    type Err = CarteraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.header().eq_ignore_ascii_case(wanted) || m.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Metric::ALL.iter().map(|m| m.slug()).collect();
                CarteraError::Validation(format!(
                    "Unknown metric '{}'. Expected one of: {}",
                    wanted,
                    known.join(", ")
                ))
            })
    }
}

impl TryFrom<String> for Metric {
    type Error = CarteraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.header().to_string()
    }
}

//==============================================================================
// Sheets
//==============================================================================

/// The three record collections a workbook must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SheetKind {
    /// Aggregate portfolio
    Total,
    FirstPurchase,
    Repurchase,
}

impl SheetKind {
    pub const ALL: [SheetKind; 3] = [SheetKind::Total, SheetKind::FirstPurchase, SheetKind::Repurchase];

    /// Tab name used when no configuration overrides it
    pub fn default_tab(self) -> &'static str {
        match self {
            SheetKind::Total => "TOTAL CARTERA_resumen",
            SheetKind::FirstPurchase => "PRIMERA COMPRA_resumen",
            SheetKind::Repurchase => "RECOMPRA_resumen",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            SheetKind::Total => "total",
            SheetKind::FirstPurchase => "first-purchase",
            SheetKind::Repurchase => "repurchase",
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SheetKind {
    type Err = CarteraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SheetKind::ALL
            .into_iter()
            .find(|k| k.slug().eq_ignore_ascii_case(wanted) || k.default_tab().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CarteraError::Validation(format!(
                    "Unknown sheet '{}'. Expected one of: total, first-purchase, repurchase",
                    wanted
                ))
            })
    }
}

impl TryFrom<String> for SheetKind {
    type Error = CarteraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SheetKind> for String {
    fn from(kind: SheetKind) -> Self {
        kind.slug().to_string()
    }
}

/// A loaded worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub kind: SheetKind,
    /// Tab name as found in the workbook
    pub name: String,
    pub records: Vec<PortfolioRecord>,
}

impl Sheet {
    pub fn new(kind: SheetKind, name: impl Into<String>, records: Vec<PortfolioRecord>) -> Self {
        Self {
            kind,
            name: name.into(),
            records,
        }
    }
}

//==============================================================================
// Portfolio
//==============================================================================

/// All record collections of a workbook. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Portfolio {
    sheets: Vec<Sheet>,
}

impl Portfolio {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, kind: SheetKind) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.kind == kind)
    }

    /// Total number of records across all sheets
    pub fn total_records(&self) -> usize {
        self.sheets.iter().map(|s| s.records.len()).sum()
    }

    /// Concatenate the selected sheets, in selection order, skipping repeats
    pub fn records(&self, kinds: &[SheetKind]) -> CarteraResult<Vec<&PortfolioRecord>> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for kind in kinds {
            if seen.contains(kind) {
                continue;
            }
            seen.push(*kind);
            let sheet = self
                .sheet(*kind)
                .ok_or_else(|| CarteraError::MissingSheet(kind.default_tab().to_string()))?;
            out.extend(sheet.records.iter());
        }
        Ok(out)
    }

    /// Business units of the aggregate sheet, in first-seen order
    pub fn business_units(&self) -> Vec<String> {
        let source = self.sheet(SheetKind::Total).or_else(|| self.sheets.first());
        let mut units: Vec<String> = Vec::new();
        for record in source.map(|s| s.records.as_slice()).unwrap_or_default() {
            if !record.business_unit.is_empty() && !units.contains(&record.business_unit) {
                units.push(record.business_unit.clone());
            }
        }
        units
    }

    /// Departments offered for the given business units (all units when empty), sorted
    pub fn departments(&self, business_units: &[String]) -> Vec<String> {
        let mut departments: Vec<String> = self
            .sheets
            .iter()
            .flat_map(|s| s.records.iter())
            .filter(|r| business_units.is_empty() || business_units.contains(&r.business_unit))
            .map(|r| r.department.clone())
            .filter(|d| !d.is_empty())
            .collect();
        departments.sort();
        departments.dedup();
        departments
    }

    /// Distinct tenors present in any sheet, ascending
    pub fn tenors(&self) -> Vec<u32> {
        let mut tenors: Vec<u32> = self
            .sheets
            .iter()
            .flat_map(|s| s.records.iter())
            .filter_map(|r| r.tenor_months)
            .collect();
        tenors.sort_unstable();
        tenors.dedup();
        tenors
    }
}
