use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::models::CategoryPath;

pub const CURRENCY_PREFIX: &str = "Rp\u{a0}";

/// Format an amount as Rupiah with no fraction digits and `.` thousands separators: Rp 1.234.567
pub fn rupiah(val: Decimal) -> String {
    let rounded = val.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-{CURRENCY_PREFIX}{grouped}")
    } else {
        format!("{CURRENCY_PREFIX}{grouped}")
    }
}

/// Render a raw cell value the way a browser would stringify it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f == 0.0 => "0".to_string(),
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
                _ => n.to_string(),
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Column header for a record key: underscores become spaces, `|` becomes ` - `.
pub fn relabel_header(key: &str) -> String {
    CategoryPath::parse(&key.replace('_', " ")).label()
}
