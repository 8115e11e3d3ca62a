//! Dashboard configuration
//!
//! Optional YAML file. Every field has a default so an empty file, or no file
//! at all, yields a working setup against `Resumen_Cartera_Morosidad.xlsx`.
//!
//! ```yaml
//! workbook: Resumen_Cartera_Morosidad.xlsx
//! sheets:
//!   total: "TOTAL CARTERA_resumen"
//! filters:
//!   min_balance: 550000
//!   rate_flag: "CON TASA"
//! chart:
//!   palette: magma
//! ```

use crate::chart::ChartPalette;
use crate::error::{CarteraError, CarteraResult};
use crate::types::SheetKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Balance floor used by most dashboard views
pub const STANDARD_MIN_BALANCE: f64 = 100_000.0;

/// Stricter balance floor some views used to hide small portfolios
pub const STRICT_MIN_BALANCE: f64 = 550_000.0;

/// Rate-flag value meaning "with rate"
pub const WITH_RATE: &str = "CON TASA";

pub const DEFAULT_WORKBOOK: &str = "Resumen_Cartera_Morosidad.xlsx";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub workbook: PathBuf,
    pub sheets: SheetNames,
    pub filters: FilterDefaults,
    pub chart: ChartSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from(DEFAULT_WORKBOOK),
            sheets: SheetNames::default(),
            filters: FilterDefaults::default(),
            chart: ChartSettings::default(),
        }
    }
}

/// Tab names of the three required sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub total: String,
    pub first_purchase: String,
    pub repurchase: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            total: SheetKind::Total.default_tab().to_string(),
            first_purchase: SheetKind::FirstPurchase.default_tab().to_string(),
            repurchase: SheetKind::Repurchase.default_tab().to_string(),
        }
    }
}

impl SheetNames {
    pub fn tab(&self, kind: SheetKind) -> &str {
        match kind {
            SheetKind::Total => &self.total,
            SheetKind::FirstPurchase => &self.first_purchase,
            SheetKind::Repurchase => &self.repurchase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    pub min_balance: f64,
    /// `None` disables the rate-flag predicate
    pub rate_flag: Option<String>,
    pub default_tenor: u32,
    /// Inclusive bounds accepted for a single tenor
    pub tenor_range: (u32, u32),
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            min_balance: STANDARD_MIN_BALANCE,
            rate_flag: Some(WITH_RATE.to_string()),
            default_tenor: 6,
            tenor_range: (1, 24),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub palette: ChartPalette,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            palette: ChartPalette::Viridis,
        }
    }
}

impl DashboardConfig {
    /// Load a config file
    pub fn load(path: &Path) -> CarteraResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DashboardConfig = if content.trim().is_empty() {
            DashboardConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded dashboard config");
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> CarteraResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CarteraResult<()> {
        let (lo, hi) = self.filters.tenor_range;
        if lo > hi {
            return Err(CarteraError::Validation(format!(
                "tenor_range [{}, {}] is empty",
                lo, hi
            )));
        }
        if !(lo..=hi).contains(&self.filters.default_tenor) {
            return Err(CarteraError::Validation(format!(
                "default_tenor {} is outside tenor_range [{}, {}]",
                self.filters.default_tenor, lo, hi
            )));
        }
        if !self.filters.min_balance.is_finite() || self.filters.min_balance < 0.0 {
            return Err(CarteraError::Validation(
                "min_balance must be a non-negative number".to_string(),
            ));
        }
        if self.chart.width < 200 || self.chart.height < 150 {
            return Err(CarteraError::Validation(
                "chart size must be at least 200x150".to_string(),
            ));
        }
        Ok(())
    }
}
