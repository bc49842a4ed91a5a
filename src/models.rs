use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{RekapError, Result};

/// One row of loosely-typed tabular data. Keys iterate in insertion order.
pub type Record = Map<String, Value>;

pub const MONTH_KEY: &str = "Bulan";
pub const YEAR_KEY: &str = "Tahun";
pub const REPORT_DATE_KEY: &str = "Tanggal Laporan";
/// Kept in the raw target but never shown as a spendable category.
pub const ACCUMULATED_DEPRECIATION_KEY: &str = "Operasional|Akumulasi Beban Penyusutan";

pub const RESERVED_KEYS: [&str; 4] = [
    MONTH_KEY,
    YEAR_KEY,
    REPORT_DATE_KEY,
    ACCUMULATED_DEPRECIATION_KEY,
];

pub const SUB_CATEGORY_FIELD: &str = "Sub_Kategori";
pub const AMOUNT_FIELD: &str = "Nominal";

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

// ---------------------------------------------------------------------------
// Category paths
// ---------------------------------------------------------------------------

pub const PATH_SEPARATOR: char = '|';
pub const LABEL_SEPARATOR: &str = " - ";

/// A category key such as `Operasional|Gaji Pegawai`, split into its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryPath {
    segments: Vec<String>,
}

impl CategoryPath {
    pub fn parse(key: &str) -> Self {
        Self {
            segments: key.split(PATH_SEPARATOR).map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The top-level group, if the key is hierarchical.
    pub fn parent(&self) -> Option<&str> {
        if self.segments.len() > 1 {
            self.segments.first().map(String::as_str)
        } else {
            None
        }
    }

    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The original key, segments joined with `|`.
    pub fn key(&self) -> String {
        self.segments.join(&PATH_SEPARATOR.to_string())
    }

    /// The display label, segments joined with ` - `.
    pub fn label(&self) -> String {
        self.segments.join(LABEL_SEPARATOR)
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ---------------------------------------------------------------------------
// Reporting period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| RekapError::invalid(format!("no such period: {year}-{month}")))?;
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for Period {
    type Err = RekapError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || RekapError::invalid(format!("expected a month as YYYY-MM, got '{s}'"));
        let (y, m) = s.trim().split_once('-').ok_or_else(bad)?;
        let year = y.parse().map_err(|_| bad())?;
        let month = m.parse().map_err(|_| bad())?;
        Period::new(year, month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Target record
// ---------------------------------------------------------------------------

/// A month's budget: category key -> amount, plus the reserved metadata keys.
///
/// Entries keep the order in which they were inserted (or appeared in the
/// source JSON), and every derived view follows that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetRecord {
    entries: Record,
}

impl TargetRecord {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self::from_map(entries)),
            Value::Null => Err(RekapError::invalid("target record is missing")),
            other => Err(RekapError::invalid(format!(
                "target record must be an object, got {}",
                value_kind(&other)
            ))),
        }
    }

    pub fn from_map(entries: Record) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &Record {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Spendable categories with their amounts, reserved keys skipped.
    ///
    /// Fails on the first amount that is not a non-negative number.
    pub fn categories(&self) -> Result<Vec<(&str, Decimal)>> {
        self.entries
            .iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .map(|(key, value)| {
                let amount = amount_from_value(value, &format!("target amount for '{key}'"))?;
                if amount.is_sign_negative() && !amount.is_zero() {
                    return Err(RekapError::invalid(format!(
                        "target amount for '{key}' is negative ({amount})"
                    )));
                }
                Ok((key.as_str(), amount))
            })
            .collect()
    }

    /// The reporting period from `Tahun` and `Bulan`.
    pub fn period(&self) -> Result<Period> {
        let field = |key: &str| {
            self.entries
                .get(key)
                .and_then(Value::as_i64)
                .ok_or_else(|| RekapError::invalid(format!("target record has no integer '{key}'")))
        };
        let year = field(YEAR_KEY)?;
        let month = field(MONTH_KEY)?;
        let year = i32::try_from(year)
            .map_err(|_| RekapError::invalid(format!("year out of range: {year}")))?;
        let month = u32::try_from(month)
            .map_err(|_| RekapError::invalid(format!("month out of range: {month}")))?;
        Period::new(year, month)
    }
}

// ---------------------------------------------------------------------------
// Transaction fields
// ---------------------------------------------------------------------------

/// `Sub_Kategori` of the transaction at 0-based `index`.
pub fn transaction_category(record: &Record, index: usize) -> Result<&str> {
    match record.get(SUB_CATEGORY_FIELD) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(RekapError::invalid(format!(
            "transaction {}: {SUB_CATEGORY_FIELD} must be a string, got {}",
            index + 1,
            value_kind(other)
        ))),
        None => Err(RekapError::invalid(format!(
            "transaction {}: missing {SUB_CATEGORY_FIELD}",
            index + 1
        ))),
    }
}

/// `Nominal` of the transaction at 0-based `index`.
pub fn transaction_amount(record: &Record, index: usize) -> Result<Decimal> {
    let value = record.get(AMOUNT_FIELD).ok_or_else(|| {
        RekapError::invalid(format!("transaction {}: missing {AMOUNT_FIELD}", index + 1))
    })?;
    amount_from_value(value, &format!("transaction {}: {AMOUNT_FIELD}", index + 1))
}

/// Exact decimal for a JSON number; `None` for anything else.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let Value::Number(n) = value else {
        return None;
    };
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Like [`decimal_from_value`], but tells a non-number apart from a number
/// too large for `Decimal`. `what` names the field in the error.
pub fn amount_from_value(value: &Value, what: &str) -> Result<Decimal> {
    match value {
        Value::Number(n) => decimal_from_value(value)
            .ok_or_else(|| RekapError::invalid(format!("{what} is out of range: {n}"))),
        other => Err(RekapError::invalid(format!(
            "{what} must be a number, got {}",
            value_kind(other)
        ))),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
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

    #[test]
    fn test_category_path_label() {
        let path = CategoryPath::parse("Operasional|Gaji Pegawai");
        assert_eq!(path.label(), "Operasional - Gaji Pegawai");
        assert_eq!(path.key(), "Operasional|Gaji Pegawai");
        assert_eq!(path.parent(), Some("Operasional"));
        assert_eq!(path.leaf(), "Gaji Pegawai");
        assert_eq!(path.to_string(), "Operasional - Gaji Pegawai");
    }

    #[test]
    fn test_category_path_flat() {
        let path = CategoryPath::parse("Belanja Bahan Baku (COGS)");
        assert_eq!(path.label(), "Belanja Bahan Baku (COGS)");
        assert_eq!(path.parent(), None);
        assert_eq!(path.segments().len(), 1);
    }

    #[test]
    fn test_period_parse() {
        let p: Period = "2024-09".parse().unwrap();
        assert_eq!((p.year(), p.month()), (2024, 9));
        assert_eq!(p.to_string(), "2024-09");
        assert!("2024-13".parse::<Period>().is_err());
        assert!("september".parse::<Period>().is_err());
    }

    #[test]
    fn test_target_keeps_insertion_order() {
        let t = target(json!({"Zeta": 1, "Alpha": 2, "Bulan": 9, "Mid": 3}));
        let keys: Vec<&str> = t.categories().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_target_categories_skip_reserved_keys() {
        let t = target(json!({
            "Bulan": 9,
            "Tahun": 2024,
            "Tanggal Laporan": "2024-09-30",
            "Operasional|Akumulasi Beban Penyusutan": 1500000,
            "Operasional|Utilitas": 200000
        }));
        let cats = t.categories().unwrap();
        assert_eq!(cats, vec![("Operasional|Utilitas", dec!(200000))]);
    }

    #[test]
    fn test_target_rejects_string_amount() {
        let t = target(json!({"A": "100"}));
        let err = t.categories().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_target_rejects_negative_amount() {
        let t = target(json!({"A": -5}));
        assert!(t.categories().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_target_from_null_is_invalid() {
        assert!(TargetRecord::from_value(Value::Null).unwrap_err().is_invalid_input());
        assert!(TargetRecord::from_value(json!([1, 2])).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_target_period() {
        let t = target(json!({"Bulan": 9, "Tahun": 2024, "A": 1}));
        assert_eq!(t.period().unwrap(), Period::new(2024, 9).unwrap());
        let t = target(json!({"A": 1}));
        assert!(t.period().is_err());
    }

    #[test]
    fn test_decimal_from_value_is_exact() {
        assert_eq!(decimal_from_value(&json!(0.1)), Some(dec!(0.1)));
        assert_eq!(decimal_from_value(&json!(557342.25)), Some(dec!(557342.25)));
        assert_eq!(decimal_from_value(&json!(100000)), Some(dec!(100000)));
        assert_eq!(decimal_from_value(&json!("100000")), None);
    }

    #[test]
    fn test_out_of_range_amount_is_not_called_non_numeric() {
        let t = target(json!({"A": 1e29}));
        let msg = t.categories().unwrap_err().to_string();
        assert!(msg.contains("out of range"), "{msg}");
        assert!(!msg.contains("must be a number"));

        let rec = json!({"Sub_Kategori": "A", "Nominal": -1e40}).as_object().unwrap().clone();
        let err = transaction_amount(&rec, 0).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("transaction 1: Nominal is out of range"));
    }

    #[test]
    fn test_transaction_fields() {
        let rec = json!({"Sub_Kategori": "A", "Nominal": 40}).as_object().unwrap().clone();
        assert_eq!(transaction_category(&rec, 0).unwrap(), "A");
        assert_eq!(transaction_amount(&rec, 0).unwrap(), dec!(40));

        let bad = json!({"Sub_Kategori": "A", "Nominal": "40"}).as_object().unwrap().clone();
        let err = transaction_amount(&bad, 2).unwrap_err();
        assert!(err.to_string().contains("transaction 3"));
    }
}
