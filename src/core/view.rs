//! Filtered view: the rows one interaction renders, plus why it may be empty

use crate::core::filter::{self, ColumnGuard, FilterParams, TenorSelection};
use crate::error::CarteraResult;
use crate::types::{Metric, Portfolio, PortfolioRecord};
use serde::Serialize;
use std::cmp::Ordering;

/// Why a view has nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    NoBusinessUnit,
    NoMatchingRows,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoBusinessUnit => "Select at least one business unit to see data",
            EmptyState::NoMatchingRows => "No rows match the current selection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView {
    pub rows: Vec<PortfolioRecord>,
    pub business_units: Vec<String>,
    pub tenor: TenorSelection,
    /// Rows in the selected sheets before filtering
    pub source_rows: usize,
}

impl FilteredView {
    /// Derive the view for one set of parameters
    pub fn derive(portfolio: &Portfolio, params: &FilterParams, guard: &ColumnGuard) -> CarteraResult<Self> {
        let rows = filter::apply(portfolio, params, guard)?;
        let source_rows = portfolio.records(&params.sheets)?.len();
        Ok(Self {
            rows,
            business_units: params.business_units.clone(),
            tenor: params.tenor,
            source_rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.business_units.is_empty() {
            Some(EmptyState::NoBusinessUnit)
        } else if self.rows.is_empty() {
            Some(EmptyState::NoMatchingRows)
        } else {
            None
        }
    }

    /// Sort rows by a metric, largest first. Stable; missing values last.
    pub fn sorted_desc(mut self, metric: Metric) -> Self {
        self.rows.sort_by(|a, b| match (a.metric(metric), b.metric(metric)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self
    }

    /// "EL BODEGON - 6 months" style caption fragment
    pub fn caption(&self) -> String {
        let units = if self.business_units.is_empty() {
            "No business unit".to_string()
        } else {
            self.business_units.join(", ")
        };
        format!("{} - {}", units, self.tenor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sheet, SheetKind};

    fn row(department: &str, rrr: Option<f64>) -> PortfolioRecord {
        PortfolioRecord {
            business_unit: "ELEKTRA".to_string(),
            department: department.to_string(),
            tenor_months: Some(6),
            rate_flag: "CON TASA".to_string(),
            capital_balance: Some(1_000_000.0),
            rrr,
            ..Default::default()
        }
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(vec![Sheet::new(
            SheetKind::Total,
            "TOTAL CARTERA_resumen",
            vec![row("A", Some(1.0)), row("B", Some(3.0)), row("C", None), row("D", Some(2.0))],
        )])
    }

    #[test]
    fn test_empty_state_without_business_unit() {
        let view = FilteredView::derive(&portfolio(), &FilterParams::default(), &ColumnGuard::none()).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.empty_state(), Some(EmptyState::NoBusinessUnit));
        assert_eq!(view.source_rows, 4);
    }

    #[test]
    fn test_empty_state_no_match() {
        let params = FilterParams::default().with_business_units(["BANCO"]);
        let view = FilteredView::derive(&portfolio(), &params, &ColumnGuard::none()).unwrap();
        assert_eq!(view.empty_state(), Some(EmptyState::NoMatchingRows));
    }

    #[test]
    fn test_sorted_desc_puts_missing_last() {
        let params = FilterParams::default().with_business_units(["ELEKTRA"]);
        let view = FilteredView::derive(&portfolio(), &params, &ColumnGuard::none())
            .unwrap()
            .sorted_desc(Metric::Rrr);
        let order: Vec<&str> = view.rows.iter().map(|r| r.department.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        assert_eq!(view.empty_state(), None);
    }

    #[test]
    fn test_caption() {
        let params = FilterParams::default()
            .with_business_units(["EL BODEGON"])
            .with_tenor(TenorSelection::Months(6));
        let view = FilteredView::derive(&portfolio(), &params, &ColumnGuard::none()).unwrap();
        assert_eq!(view.caption(), "EL BODEGON - 6 months");
    }
}
