//! Arguments shared by several subcommands

use crate::config::{DashboardConfig, STRICT_MIN_BALANCE};
use crate::core::{FilterParams, TenorSelection};
use crate::error::CarteraResult;
use crate::excel::ExcelImporter;
use crate::types::{Portfolio, SheetKind};
use clap::Args;
use std::path::PathBuf;

/// Where the data and the settings come from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Workbook to load (defaults to the config's `workbook`)
    #[arg(short, long, env = "CARTERA_WORKBOOK")]
    pub workbook: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long, env = "CARTERA_CONFIG")]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    pub fn load_config(&self) -> CarteraResult<DashboardConfig> {
        DashboardConfig::load_or_default(self.config.as_deref())
    }

    pub fn workbook_path(&self, config: &DashboardConfig) -> PathBuf {
        self.workbook.clone().unwrap_or_else(|| config.workbook.clone())
    }

    /// Load the config, then the workbook it points at
    pub fn load(&self) -> CarteraResult<(DashboardConfig, Portfolio)> {
        let config = self.load_config()?;
        let portfolio = ExcelImporter::new(self.workbook_path(&config))
            .with_sheet_names(config.sheets.clone())
            .import()?;
        Ok((config, portfolio))
    }
}

/// The dashboard's filter controls
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Sheet(s) to read: total, first-purchase, repurchase
    #[arg(short, long = "sheet", value_delimiter = ',')]
    pub sheets: Vec<SheetKind>,

    /// Business unit (NEGOCIO); repeat for several
    #[arg(short, long = "business-unit")]
    pub business_units: Vec<String>,

    /// Department / product; repeat for several, omit for all
    #[arg(short, long = "department")]
    pub departments: Vec<String>,

    /// Tenor in months, or "all" for the balance-weighted aggregate
    #[arg(short, long)]
    pub tenor: Option<TenorSelection>,

    /// Minimum capital balance (inclusive)
    #[arg(short, long, conflicts_with = "strict")]
    pub min_balance: Option<f64>,

    /// Use the 550,000 balance floor
    #[arg(long)]
    pub strict: bool,

    /// Required TASA value
    #[arg(short, long, conflicts_with = "any_rate")]
    pub rate_flag: Option<String>,

    /// Keep rows regardless of TASA
    #[arg(long)]
    pub any_rate: bool,
}

impl FilterArgs {
    /// Resolve flags over the config defaults
    pub fn to_params(&self, config: &DashboardConfig) -> CarteraResult<FilterParams> {
        let mut params = FilterParams::from_config(config)
            .with_business_units(self.business_units.iter().cloned())
            .with_departments(self.departments.iter().cloned());

        if !self.sheets.is_empty() {
            params = params.with_sheets(self.sheets.clone());
        }

        if let Some(tenor) = self.tenor {
            params = params.with_tenor(tenor);
        }

        if self.strict {
            params = params.with_min_balance(STRICT_MIN_BALANCE);
        } else if let Some(min) = self.min_balance {
            params = params.with_min_balance(min);
        }

        if self.any_rate {
            params = params.with_rate_flag(None);
        } else if let Some(flag) = &self.rate_flag {
            params = params.with_rate_flag(Some(flag.clone()));
        }

        params.validate_with(config)?;
        Ok(params)
    }
}
