//! Filter parameters and the predicate chain

use crate::config::{DashboardConfig, STANDARD_MIN_BALANCE, WITH_RATE};
use crate::core::aggregate::aggregate_all_tenors;
use crate::error::{CarteraError, CarteraResult};
use crate::types::{Metric, Portfolio, PortfolioRecord, SheetKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

//==============================================================================
// Tenor Selection
//==============================================================================

/// A single tenor, or every tenor collapsed by weighted aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TenorRepr", into = "TenorRepr")]
pub enum TenorSelection {
    Months(u32),
    All,
}

impl Default for TenorSelection {
    fn default() -> Self {
        TenorSelection::Months(6)
    }
}

impl fmt::Display for TenorSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenorSelection::Months(m) => write!(f, "{} months", m),
            TenorSelection::All => f.write_str("all tenors"),
        }
    }
}

impl FromStr for TenorSelection {
    type Err = CarteraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("todos") {
            return Ok(TenorSelection::All);
        }
        s.parse::<u32>()
            .ok()
            .filter(|m| *m > 0)
            .map(TenorSelection::Months)
            .ok_or_else(|| {
                CarteraError::Validation(format!(
                    "Invalid tenor '{}': expected a number of months or 'all'",
                    s
                ))
            })
    }
}

/// Wire form: a number of months or the string "all"
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TenorRepr {
    Months(u32),
    Text(String),
}

impl TryFrom<TenorRepr> for TenorSelection {
    type Error = CarteraError;

    fn try_from(repr: TenorRepr) -> Result<Self, Self::Error> {
        match repr {
            TenorRepr::Months(m) => m.to_string().parse(),
            TenorRepr::Text(s) => s.parse(),
        }
    }
}

impl From<TenorSelection> for TenorRepr {
    fn from(sel: TenorSelection) -> Self {
        match sel {
            TenorSelection::Months(m) => TenorRepr::Months(m),
            TenorSelection::All => TenorRepr::Text("all".to_string()),
        }
    }
}

//==============================================================================
// Filter Parameters
//==============================================================================

/// Everything the user selected. Immutable; a new selection is a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub sheets: Vec<SheetKind>,
    /// Empty means nothing selected, which yields an empty view
    pub business_units: Vec<String>,
    /// Empty means every department
    pub departments: Vec<String>,
    pub tenor: TenorSelection,
    pub min_balance: f64,
    /// `None` skips the rate-flag predicate
    pub rate_flag: Option<String>,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            sheets: vec![SheetKind::Total],
            business_units: Vec::new(),
            departments: Vec::new(),
            tenor: TenorSelection::default(),
            min_balance: STANDARD_MIN_BALANCE,
            rate_flag: Some(WITH_RATE.to_string()),
        }
    }
}

impl FilterParams {
    /// Defaults taken from the dashboard configuration
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            tenor: TenorSelection::Months(config.filters.default_tenor),
            min_balance: config.filters.min_balance,
            rate_flag: config.filters.rate_flag.clone(),
            ..Self::default()
        }
    }

    pub fn with_business_units<S: Into<String>>(mut self, units: impl IntoIterator<Item = S>) -> Self {
        self.business_units = units.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_departments<S: Into<String>>(mut self, departments: impl IntoIterator<Item = S>) -> Self {
        self.departments = departments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sheets(mut self, sheets: Vec<SheetKind>) -> Self {
        self.sheets = sheets;
        self
    }

    pub fn with_tenor(mut self, tenor: TenorSelection) -> Self {
        self.tenor = tenor;
        self
    }

    pub fn with_min_balance(mut self, min_balance: f64) -> Self {
        self.min_balance = min_balance;
        self
    }

    pub fn with_rate_flag(mut self, rate_flag: Option<String>) -> Self {
        self.rate_flag = rate_flag;
        self
    }

    pub fn validate(&self) -> CarteraResult<()> {
        if self.sheets.is_empty() {
            return Err(CarteraError::Validation(
                "Select at least one sheet".to_string(),
            ));
        }
        if !self.min_balance.is_finite() || self.min_balance < 0.0 {
            return Err(CarteraError::Validation(format!(
                "Minimum balance must be a non-negative number, got {}",
                self.min_balance
            )));
        }
        if self.tenor == TenorSelection::Months(0) {
            return Err(CarteraError::Validation("Tenor must be positive".to_string()));
        }
        Ok(())
    }

    /// [`FilterParams::validate`] plus the configured tenor bounds
    pub fn validate_with(&self, config: &DashboardConfig) -> CarteraResult<()> {
        self.validate()?;
        if let TenorSelection::Months(m) = self.tenor {
            let (lo, hi) = config.filters.tenor_range;
            if !(lo..=hi).contains(&m) {
                return Err(CarteraError::Validation(format!(
                    "Tenor {} is outside the allowed range {}-{} months",
                    m, lo, hi
                )));
            }
        }
        Ok(())
    }
}

//==============================================================================
// Column Guard
//==============================================================================

/// Columns the renderer is about to read: rows missing any `required`
/// column are dropped, as are rows where any `nonzero` column is zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnGuard {
    pub required: Vec<Metric>,
    pub nonzero: Vec<Metric>,
}

impl ColumnGuard {
    pub fn none() -> Self {
        Self::default()
    }

    /// Require and exclude zeros on the same columns
    pub fn plotted(metrics: &[Metric]) -> Self {
        Self {
            required: metrics.to_vec(),
            nonzero: metrics.to_vec(),
        }
    }

    fn admits(&self, record: &PortfolioRecord) -> bool {
        let present = self.required.iter().all(|m| record.metric(*m).is_some());
        let nonzero = self
            .nonzero
            .iter()
            .all(|m| record.metric(*m).map(|v| v != 0.0).unwrap_or(false));
        present && nonzero
    }
}

//==============================================================================
// Predicate Chain
//==============================================================================

/// Run the full predicate chain and return the surviving rows.
///
/// Order: sheets, business unit, department, tenor (or aggregation), balance
/// floor, rate flag, then the column guard.
pub fn apply(
    portfolio: &Portfolio,
    params: &FilterParams,
    guard: &ColumnGuard,
) -> CarteraResult<Vec<PortfolioRecord>> {
    params.validate()?;

    let source = portfolio.records(&params.sheets)?;
    let total = source.len();

    let selected: Vec<&PortfolioRecord> = source
        .into_iter()
        .filter(|r| params.business_units.contains(&r.business_unit))
        .filter(|r| params.departments.is_empty() || params.departments.contains(&r.department))
        .collect();

    let by_tenor: Vec<PortfolioRecord> = match params.tenor {
        TenorSelection::Months(m) => selected
            .into_iter()
            .filter(|r| r.tenor_months == Some(m))
            .cloned()
            .collect(),
        TenorSelection::All => aggregate_all_tenors(&selected),
    };

    let rows: Vec<PortfolioRecord> = by_tenor
        .into_iter()
        .filter(|r| r.capital_balance.map(|b| b >= params.min_balance).unwrap_or(false))
        .filter(|r| match &params.rate_flag {
            Some(flag) => r.rate_flag.trim() == flag.trim(),
            None => true,
        })
        .filter(|r| guard.admits(r))
        .collect();

    debug!(
        source = total,
        kept = rows.len(),
        tenor = %params.tenor,
        "filter chain applied"
    );

    Ok(rows)
}
