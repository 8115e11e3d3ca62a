//! Cartera - loan portfolio delinquency dashboard
//!
//! Loads the portfolio summary workbook (three sheets: total, first purchase,
//! repurchase), filters it by business unit, department, tenor, balance floor
//! and rate flag, collapses tenors with balance-weighted means when "all
//! tenors" is selected, and renders the result as SVG charts or CSV.
//!
//! # Example
//!
//! ```no_run
//! use cartera::chart::ScatterChart;
//! use cartera::config::DashboardConfig;
//! use cartera::core::{FilterParams, FilteredView, TenorSelection};
//! use cartera::excel::ExcelImporter;
//! use cartera::types::Metric;
//!
//! let config = DashboardConfig::default();
//! let portfolio = ExcelImporter::new(&config.workbook)
//!     .with_sheet_names(config.sheets.clone())
//!     .import()?;
//!
//! let params = FilterParams::from_config(&config)
//!     .with_business_units(["EL BODEGON"])
//!     .with_tenor(TenorSelection::All);
//! let guard = ScatterChart::guard(Metric::Rrr, Metric::Usgaap90Pct);
//! let view = FilteredView::derive(&portfolio, &params, &guard)?;
//!
//! let svg = ScatterChart::build(&view, Metric::Rrr, Metric::Usgaap90Pct).render_svg(&config.chart)?;
//! println!("{} bytes of SVG", svg.len());
//! # Ok::<(), cartera::error::CarteraError>(())
//! ```

pub mod api;
pub mod chart;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod logging;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use error::{CarteraError, CarteraResult};
pub use types::{Metric, Portfolio, PortfolioRecord, SheetKind};
