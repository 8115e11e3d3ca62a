//! Balance-weighted aggregation across tenors
//!
//! Rows sharing business unit, department, department id, rate flag,
//! category and margin collapse into one row. Balances and delinquency
//! amounts are summed; rate, %USGAAP 90 and both RRR columns become
//! capital-balance-weighted means.

use crate::types::PortfolioRecord;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Grouping key for "all tenors" aggregation. Equality follows the total
/// order on `margin`, so `-0.0` and `0.0` are distinct keys.
#[derive(Debug, Clone)]
struct GroupKey {
    business_unit: String,
    department: String,
    department_id: String,
    rate_flag: String,
    category: String,
    margin: Option<f64>,
}

impl GroupKey {
    fn of(record: &PortfolioRecord) -> Self {
        Self {
            business_unit: record.business_unit.clone(),
            department: record.department.clone(),
            department_id: record.department_id.clone(),
            rate_flag: record.rate_flag.clone(),
            category: record.category.clone(),
            margin: record.margin,
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.business_unit
            .cmp(&other.business_unit)
            .then_with(|| self.department.cmp(&other.department))
            .then_with(|| self.department_id.cmp(&other.department_id))
            .then_with(|| self.rate_flag.cmp(&other.rate_flag))
            .then_with(|| self.category.cmp(&other.category))
            .then_with(|| cmp_opt(self.margin, other.margin))
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order on optional floats, `None` first
fn cmp_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

/// Order rows inside a group independently of their input order, so the
/// floating-point sums below come out bit-identical for any permutation.
fn canonical_order(a: &PortfolioRecord, b: &PortfolioRecord) -> Ordering {
    a.tenor_months
        .cmp(&b.tenor_months)
        .then_with(|| cmp_opt(a.capital_balance, b.capital_balance))
        .then_with(|| cmp_opt(a.weighted_rate, b.weighted_rate))
        .then_with(|| cmp_opt(a.usgaap60_amount, b.usgaap60_amount))
        .then_with(|| cmp_opt(a.usgaap90_amount, b.usgaap90_amount))
        .then_with(|| cmp_opt(a.usgaap90_pct, b.usgaap90_pct))
        .then_with(|| cmp_opt(a.rrr, b.rrr))
        .then_with(|| cmp_opt(a.rrr_with_margin, b.rrr_with_margin))
}

/// Sum of the present values, `None` if there are none
pub fn sum_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Σ(v·w) / Σw over pairs where both value and weight are present.
///
/// Returns `None` when nothing contributes or the total weight is zero.
pub fn weighted_mean<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
{
    let mut numerator = 0.0;
    let mut total_weight = 0.0;
    let mut contributed = false;
    for (value, weight) in pairs {
        if let (Some(v), Some(w)) = (value, weight) {
            numerator += v * w;
            total_weight += w;
            contributed = true;
        }
    }
    if !contributed || total_weight == 0.0 {
        return None;
    }
    Some(numerator / total_weight)
}

/// Collapse rows across tenors, one output row per group, sorted by key.
pub fn aggregate_all_tenors(rows: &[&PortfolioRecord]) -> Vec<PortfolioRecord> {
    let mut groups: BTreeMap<GroupKey, Vec<&PortfolioRecord>> = BTreeMap::new();
    for row in rows {
        groups.entry(GroupKey::of(row)).or_default().push(row);
    }

    debug!(input = rows.len(), groups = groups.len(), "aggregating across tenors");

    groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(|a, b| canonical_order(*a, *b));
            collapse(key, &members)
        })
        .collect()
}

fn collapse(key: GroupKey, members: &[&PortfolioRecord]) -> PortfolioRecord {
    let weighted = |field: fn(&PortfolioRecord) -> Option<f64>, column: &str| {
        let mean = weighted_mean(members.iter().map(|r| (field(*r), r.capital_balance)));
        let has_values = members.iter().any(|r| field(*r).is_some());
        if mean.is_none() && has_values {
            warn!(
                business_unit = %key.business_unit,
                department = %key.department,
                column,
                "zero total balance in group, weighted value is undefined"
            );
        }
        mean
    };

    PortfolioRecord {
        tenor_months: None,
        capital_balance: sum_present(members.iter().map(|r| r.capital_balance)),
        weighted_rate: weighted(|r| r.weighted_rate, "TASA ACTIVA PONDERADA"),
        usgaap60_amount: sum_present(members.iter().map(|r| r.usgaap60_amount)),
        usgaap90_amount: sum_present(members.iter().map(|r| r.usgaap90_amount)),
        usgaap90_pct: weighted(|r| r.usgaap90_pct, "%USGAAP 90 PONDERADO"),
        rrr: weighted(|r| r.rrr, "RRR"),
        rrr_with_margin: weighted(|r| r.rrr_with_margin, "RRR (con margen)"),
        business_unit: key.business_unit,
        department: key.department,
        department_id: key.department_id,
        rate_flag: key.rate_flag,
        category: key.category,
        margin: key.margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(department: &str, tenor: u32, balance: f64, rate: f64) -> PortfolioRecord {
        PortfolioRecord {
            business_unit: "ELEKTRA".to_string(),
            department: department.to_string(),
            tenor_months: Some(tenor),
            department_id: "101".to_string(),
            rate_flag: "CON TASA".to_string(),
            category: "RETAIL".to_string(),
            margin: Some(0.3),
            capital_balance: Some(balance),
            weighted_rate: Some(rate),
            usgaap60_amount: Some(balance * 0.01),
            usgaap90_amount: Some(balance * 0.02),
            usgaap90_pct: Some(rate / 10.0),
            rrr: Some(rate * 10.0),
            rrr_with_margin: Some(rate * 12.0),
        }
    }

    #[test]
    fn test_group_key_equality_matches_ordering() {
        let mut a = row("MOTOS", 6, 100.0, 0.10);
        let mut b = row("MOTOS", 12, 300.0, 0.20);
        a.margin = Some(0.0);
        b.margin = Some(-0.0);
        let (ka, kb) = (GroupKey::of(&a), GroupKey::of(&b));
        assert_eq!(ka == kb, ka.cmp(&kb) == Ordering::Equal);
        assert_ne!(ka, kb);

        a.margin = Some(f64::NAN);
        b.margin = Some(f64::NAN);
        assert_eq!(GroupKey::of(&a), GroupKey::of(&b));
        assert_eq!(aggregate_all_tenors(&[&a, &b]).len(), 1);
    }

    #[test]
    fn test_weighted_rate_example() {
        let a = row("MOTOS", 6, 100.0, 0.10);
        let b = row("MOTOS", 12, 300.0, 0.20);
        let out = aggregate_all_tenors(&[&a, &b]);

        assert_eq!(out.len(), 1);
        let agg = &out[0];
        assert!((agg.weighted_rate.unwrap() - 0.175).abs() < 1e-12);
        assert_eq!(agg.capital_balance, Some(400.0));
        assert_eq!(agg.tenor_months, None);
        assert_eq!(agg.usgaap60_amount, Some(4.0));
        assert_eq!(agg.usgaap90_amount, Some(8.0));
    }

    #[test]
    fn test_uniform_weights_give_arithmetic_mean() {
        let rows = [
            row("MOTOS", 6, 250.0, 0.10),
            row("MOTOS", 12, 250.0, 0.40),
            row("MOTOS", 18, 250.0, 0.25),
        ];
        let refs: Vec<&PortfolioRecord> = rows.iter().collect();
        let agg = &aggregate_all_tenors(&refs)[0];

        assert!((agg.weighted_rate.unwrap() - 0.25).abs() < 1e-12);
        assert!((agg.rrr.unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_groups_split_by_department() {
        let a = row("MOTOS", 6, 100.0, 0.1);
        let b = row("CELULARES", 6, 100.0, 0.2);
        let c = row("MOTOS", 12, 100.0, 0.3);
        let out = aggregate_all_tenors(&[&a, &b, &c]);

        assert_eq!(out.len(), 2);
        // Sorted by key
        assert_eq!(out[0].department, "CELULARES");
        assert_eq!(out[1].department, "MOTOS");
        assert_eq!(out[1].capital_balance, Some(200.0));
    }

    #[test]
    fn test_margin_is_part_of_the_key() {
        let a = row("MOTOS", 6, 100.0, 0.1);
        let mut b = row("MOTOS", 12, 100.0, 0.2);
        b.margin = Some(0.5);
        assert_eq!(aggregate_all_tenors(&[&a, &b]).len(), 2);
    }

    #[test]
    fn test_zero_weight_group_is_undefined() {
        let a = row("MOTOS", 6, 0.0, 0.1);
        let b = row("MOTOS", 12, 0.0, 0.2);
        let agg = &aggregate_all_tenors(&[&a, &b])[0];

        assert_eq!(agg.weighted_rate, None);
        assert_eq!(agg.rrr, None);
        assert_eq!(agg.capital_balance, Some(0.0));
    }

    #[test]
    fn test_missing_values_do_not_contribute() {
        let a = row("MOTOS", 6, 100.0, 0.1);
        let mut b = row("MOTOS", 12, 300.0, 0.2);
        b.weighted_rate = None;
        let agg = &aggregate_all_tenors(&[&a, &b])[0];

        assert!((agg.weighted_rate.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(agg.capital_balance, Some(400.0));
    }

    #[test]
    fn test_invariant_under_reordering() {
        let rows = [
            row("MOTOS", 6, 123.45, 0.113),
            row("MOTOS", 12, 987.65, 0.271),
            row("MOTOS", 18, 0.1, 0.9),
            row("MOTOS", 24, 55_555.5, 0.0333),
        ];
        let forward: Vec<&PortfolioRecord> = rows.iter().collect();
        let backward: Vec<&PortfolioRecord> = rows.iter().rev().collect();
        let shuffled = vec![&rows[2], &rows[0], &rows[3], &rows[1]];

        let expected = aggregate_all_tenors(&forward);
        assert_eq!(aggregate_all_tenors(&backward), expected);
        assert_eq!(aggregate_all_tenors(&shuffled), expected);
    }

    #[test]
    fn test_weighted_mean_helpers() {
        assert_eq!(weighted_mean(vec![]), None);
        assert_eq!(weighted_mean(vec![(Some(1.0), None)]), None);
        assert_eq!(weighted_mean(vec![(Some(2.0), Some(4.0))]), Some(2.0));
        assert_eq!(sum_present(vec![None, None]), None);
        assert_eq!(sum_present(vec![Some(1.5), None, Some(2.5)]), Some(4.0));
    }
}
