use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RekapError, Result};
use crate::models::{
    transaction_amount, transaction_category, CategoryPath, Record, TargetRecord,
};

// ---------------------------------------------------------------------------
// Target summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub category: CategoryPath,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSummary {
    pub rows: Vec<CategoryRow>,
    pub total: Decimal,
}

/// Spendable categories of `target` in their original order, with the exact total.
///
/// The display-only TOTAL row is added by the renderer, not here.
pub fn summarize_target(target: &TargetRecord) -> Result<TargetSummary> {
    let rows: Vec<CategoryRow> = target
        .categories()?
        .into_iter()
        .map(|(key, amount)| CategoryRow {
            category: CategoryPath::parse(key),
            amount,
        })
        .collect();
    let total = checked_sum(rows.iter().map(|r| r.amount), "target total")?;
    debug!("Summarized {} target categories", rows.len());
    Ok(TargetSummary { rows, total })
}

// ---------------------------------------------------------------------------
// Variance
// ---------------------------------------------------------------------------

/// Whether transactions in categories unknown to the target are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Orphan transactions are dropped without trace.
    #[default]
    Lenient,
    /// Orphan transactions are collected into `VarianceReport::orphans`.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarianceRow {
    pub category: CategoryPath,
    pub target: Decimal,
    pub actual: Decimal,
    /// `actual - target`, unrounded.
    pub deviation: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarianceTotals {
    pub target: Decimal,
    pub actual: Decimal,
    pub deviation: Decimal,
}

/// Transactions whose `Sub_Kategori` matches no target category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanCategory {
    pub key: String,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarianceReport {
    pub rows: Vec<VarianceRow>,
    pub totals: VarianceTotals,
    /// Always empty in lenient mode.
    pub orphans: Vec<OrphanCategory>,
}

/// Compare target against actual spending per category, dropping orphans.
pub fn compute_variance(target: &TargetRecord, transactions: &[Record]) -> Result<VarianceReport> {
    compute_variance_with(target, transactions, Strictness::Lenient)
}

pub fn compute_variance_with(
    target: &TargetRecord,
    transactions: &[Record],
    strictness: Strictness,
) -> Result<VarianceReport> {
    let categories = target.categories()?;

    // Every transaction must be well-formed, orphans included.
    let mut entries: Vec<(&str, Decimal)> = Vec::with_capacity(transactions.len());
    for (ix, record) in transactions.iter().enumerate() {
        entries.push((transaction_category(record, ix)?, transaction_amount(record, ix)?));
    }

    let mut rows = Vec::with_capacity(categories.len());
    let mut totals = VarianceTotals::default();
    for &(key, target_amount) in &categories {
        let actual = checked_sum(
            entries
                .iter()
                .filter(|(category, _)| *category == key)
                .map(|(_, amount)| *amount),
            &format!("actual for '{key}'"),
        )?;
        rows.push(VarianceRow {
            category: CategoryPath::parse(key),
            target: target_amount,
            actual,
            deviation: checked_deviation(actual, target_amount, key)?,
        });
        totals.target = checked_sum([totals.target, target_amount], "target total")?;
        totals.actual = checked_sum([totals.actual, actual], "actual total")?;
    }
    totals.deviation = checked_deviation(totals.actual, totals.target, "TOTAL")?;

    let orphans = match strictness {
        Strictness::Lenient => Vec::new(),
        Strictness::Strict => collect_orphans(&categories, &entries)?,
    };
    for orphan in &orphans {
        warn!(
            "{} transaction(s) in '{}' ({}) match no target category",
            orphan.count, orphan.key, orphan.total
        );
    }

    debug!(
        "Variance over {} categories and {} transactions",
        rows.len(),
        transactions.len()
    );
    Ok(VarianceReport {
        rows,
        totals,
        orphans,
    })
}

fn collect_orphans(
    categories: &[(&str, Decimal)],
    entries: &[(&str, Decimal)],
) -> Result<Vec<OrphanCategory>> {
    let mut orphans: Vec<OrphanCategory> = Vec::new();
    for &(category, amount) in entries {
        if categories.iter().any(|(key, _)| *key == category) {
            continue;
        }
        match orphans.iter_mut().find(|o| o.key == category) {
            Some(existing) => {
                existing.count += 1;
                existing.total = checked_sum(
                    [existing.total, amount],
                    &format!("orphans in '{category}'"),
                )?;
            }
            None => orphans.push(OrphanCategory {
                key: category.to_string(),
                count: 1,
                total: amount,
            }),
        }
    }
    Ok(orphans)
}

/// Sum that fails instead of panicking when `Decimal` overflows.
pub(crate) fn checked_sum(
    amounts: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| RekapError::invalid(format!("amount overflow in {what}")))
}

fn checked_deviation(actual: Decimal, target: Decimal, key: &str) -> Result<Decimal> {
    actual
        .checked_sub(target)
        .ok_or_else(|| RekapError::invalid(format!("amount overflow in deviation for '{key}'")))
}

/// Parse a JSON array of transaction objects.
pub fn transactions_from_value(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(ix, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(RekapError::invalid(format!(
                    "transaction {} is not an object",
                    ix + 1
                ))),
            })
            .collect(),
        Value::Null => Err(RekapError::invalid("transaction list is missing")),
        _ => Err(RekapError::invalid("transactions must be a JSON array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn target(value: Value) -> TargetRecord {
        TargetRecord::from_value(value).unwrap()
    }

    fn txns(value: Value) -> Vec<Record> {
        transactions_from_value(value).unwrap()
    }

    fn sample_target() -> TargetRecord {
        target(json!({
            "Bulan": 9,
            "Tahun": 2024,
            "Belanja Bahan Baku (COGS)": 1000000,
            "Operasional|Gaji Pegawai": 500000,
            "Operasional|Akumulasi Beban Penyusutan": 1200000,
            "Operasional|Utilitas": 200000.5,
            "Tanggal Laporan": "2024-09-30"
        }))
    }

    #[test]
    fn test_summary_excludes_reserved_keys() {
        let summary = summarize_target(&sample_target()).unwrap();
        let labels: Vec<String> = summary.rows.iter().map(|r| r.category.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Belanja Bahan Baku (COGS)",
                "Operasional - Gaji Pegawai",
                "Operasional - Utilitas",
            ]
        );
    }

    #[test]
    fn test_summary_total_matches_rows() {
        let summary = summarize_target(&sample_target()).unwrap();
        let sum: Decimal = summary.rows.iter().map(|r| r.amount).sum();
        assert_eq!(summary.total, sum);
        assert_eq!(summary.total, dec!(1700000.5));
    }

    #[test]
    fn test_summary_of_metadata_only_target() {
        let summary = summarize_target(&target(json!({"Bulan": 1, "Tahun": 2025}))).unwrap();
        assert!(summary.rows.is_empty());
        assert_eq!(summary.total, Decimal::ZERO);
    }

    #[test]
    fn test_summary_rejects_string_amount() {
        let err = summarize_target(&target(json!({"A": 1, "B": "dua"}))).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_variance_example() {
        let t = target(json!({"A": 100, "B": 200}));
        let tx = txns(json!([
            {"Sub_Kategori": "A", "Nominal": 40},
            {"Sub_Kategori": "A", "Nominal": 60},
            {"Sub_Kategori": "B", "Nominal": 150}
        ]));
        let report = compute_variance(&t, &tx).unwrap();
        assert_eq!(
            report.rows,
            vec![
                VarianceRow {
                    category: CategoryPath::parse("A"),
                    target: dec!(100),
                    actual: dec!(100),
                    deviation: dec!(0),
                },
                VarianceRow {
                    category: CategoryPath::parse("B"),
                    target: dec!(200),
                    actual: dec!(150),
                    deviation: dec!(-50),
                },
            ]
        );
        assert_eq!(
            report.totals,
            VarianceTotals {
                target: dec!(300),
                actual: dec!(250),
                deviation: dec!(-50),
            }
        );
    }

    #[test]
    fn test_variance_category_without_transactions() {
        let t = target(json!({"A": 100, "Operasional|Lain-lain": 50000}));
        let tx = txns(json!([{"Sub_Kategori": "A", "Nominal": 100}]));
        let report = compute_variance(&t, &tx).unwrap();
        let row = &report.rows[1];
        assert_eq!(row.actual, Decimal::ZERO);
        assert_eq!(row.deviation, dec!(-50000));
    }

    #[test]
    fn test_variance_skips_excluded_keys() {
        let tx = txns(json!([
            {"Sub_Kategori": "Operasional|Akumulasi Beban Penyusutan", "Nominal": 1200000},
            {"Sub_Kategori": "Operasional|Gaji Pegawai", "Nominal": 500000}
        ]));
        let report = compute_variance(&sample_target(), &tx).unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.totals.target, dec!(1700000.5));
        assert_eq!(report.totals.actual, dec!(500000));
    }

    #[test]
    fn test_variance_lenient_drops_orphans() {
        let t = target(json!({"A": 100}));
        let tx = txns(json!([
            {"Sub_Kategori": "A", "Nominal": 100},
            {"Sub_Kategori": "Utilitas|Listrik", "Nominal": 75000}
        ]));
        let report = compute_variance(&t, &tx).unwrap();
        assert_eq!(report.totals.actual, dec!(100));
        assert!(report.orphans.is_empty());
    }

    #[test]
    fn test_variance_strict_surfaces_orphans() {
        let t = target(json!({"A": 100}));
        let tx = txns(json!([
            {"Sub_Kategori": "X", "Nominal": 10},
            {"Sub_Kategori": "A", "Nominal": 100},
            {"Sub_Kategori": "X", "Nominal": 15.5}
        ]));
        let report = compute_variance_with(&t, &tx, Strictness::Strict).unwrap();
        assert_eq!(
            report.orphans,
            vec![OrphanCategory {
                key: "X".to_string(),
                count: 2,
                total: dec!(25.5),
            }]
        );
        assert_eq!(report.totals.actual, dec!(100));
    }

    #[test]
    fn test_variance_rejects_non_numeric_nominal() {
        let t = target(json!({"A": 100}));
        let tx = txns(json!([{"Sub_Kategori": "A", "Nominal": "40"}]));
        assert!(compute_variance(&t, &tx).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_variance_rejects_malformed_target() {
        let t = target(json!({"A": "seratus"}));
        assert!(compute_variance(&t, &[]).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_variance_is_exact_and_idempotent() {
        let t = target(json!({"A": 0.3}));
        let tx = txns(json!([
            {"Sub_Kategori": "A", "Nominal": 0.1},
            {"Sub_Kategori": "A", "Nominal": 0.2}
        ]));
        let first = compute_variance(&t, &tx).unwrap();
        assert_eq!(first.rows[0].deviation, Decimal::ZERO);
        assert_eq!(first, compute_variance(&t, &tx).unwrap());
    }

    #[test]
    fn test_overflowing_target_total_is_invalid_input() {
        let t = target(json!({"A": 5e28, "B": 5e28}));
        let err = summarize_target(&t).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("amount overflow"));
    }

    #[test]
    fn test_overflowing_actual_is_invalid_input() {
        let t = target(json!({"A": 1}));
        let tx = txns(json!([
            {"Sub_Kategori": "A", "Nominal": 5e28},
            {"Sub_Kategori": "A", "Nominal": 5e28}
        ]));
        let err = compute_variance(&t, &tx).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("amount overflow"));
    }

    #[test]
    fn test_overflowing_deviation_is_invalid_input() {
        let t = target(json!({"A": 5e28}));
        let tx = txns(json!([{"Sub_Kategori": "A", "Nominal": -5e28}]));
        assert!(compute_variance(&t, &tx).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_overflowing_orphans_are_invalid_input() {
        let t = target(json!({"A": 1}));
        let tx = txns(json!([
            {"Sub_Kategori": "X", "Nominal": 5e28},
            {"Sub_Kategori": "X", "Nominal": 5e28}
        ]));
        assert!(compute_variance(&t, &tx).is_ok());
        let err = compute_variance_with(&t, &tx, Strictness::Strict).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_transactions_from_value_rejects_non_objects() {
        assert!(transactions_from_value(json!([1])).unwrap_err().is_invalid_input());
        assert!(transactions_from_value(Value::Null).unwrap_err().is_invalid_input());
    }
}
