//! CSV text for copy/download, and CSV ingestion of transaction files.
//!
//! `to_csv` is deliberately not RFC 4180: a text field is wrapped in double
//! quotes only when it contains a comma, and embedded double quotes are left
//! as they are.

use std::io::Read;

use serde_json::{Number, Value};
use tracing::debug;

use crate::error::Result;
use crate::fmt::display_value;
use crate::models::Record;

/// Serialize records to CSV text. The first record's keys form the header and
/// index every row; rows are joined by `\n` with no trailing terminator.
pub fn to_csv(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(headers.join(","));
    for record in records {
        let values: Vec<String> = headers
            .iter()
            .map(|header| match record.get(*header) {
                Some(Value::String(s)) if s.contains(',') => format!("\"{s}\""),
                Some(value) => display_value(value),
                None => String::new(),
            })
            .collect();
        lines.push(values.join(","));
    }
    lines.join("\n")
}

/// Read transactions from CSV with a header row. Fields that parse as numbers
/// become JSON numbers; everything else stays text.
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let mut record = Record::new();
        for (header, field) in headers.iter().zip(row.iter()) {
            record.insert(header.to_string(), parse_field(field));
        }
        records.push(record);
    }
    debug!("Read {} transactions from CSV", records.len());
    Ok(records)
}

/// `0012`, `-007`: zero-padded codes, not amounts.
fn is_zero_padded(field: &str) -> bool {
    let digits = field.trim_start_matches(|c: char| c == '-' || c == '+').as_bytes();
    digits.first() == Some(&b'0') && digits.get(1).is_some_and(u8::is_ascii_digit)
}

fn parse_field(raw: &str) -> Value {
    let trimmed = raw.trim();
    if is_zero_padded(trimmed) {
        return Value::String(raw.to_string());
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    // Only plain decimal notation; "inf", "NaN" and friends stay text.
    let looks_numeric = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+');
    if looks_numeric {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_empty_input_is_empty_string() {
        assert_eq!(to_csv(&[]), "");
    }

    #[test]
    fn test_header_and_rows() {
        let data = records(json!([
            {"ID_Transaksi": "TXN0001", "Bulan": 9, "Nominal": 425000.0},
            {"ID_Transaksi": "TXN0002", "Bulan": 9, "Nominal": 80000}
        ]));
        let csv = to_csv(&data);
        assert_eq!(
            csv,
            "ID_Transaksi,Bulan,Nominal\nTXN0001,9,425000\nTXN0002,9,80000"
        );
        assert_eq!(csv.lines().count(), data.len() + 1);
    }

    #[test]
    fn test_comma_fields_are_quoted_others_are_not() {
        let data = records(json!([
            {"Keterangan": "susu/gula, kopi", "PIC": "SYSTEM"}
        ]));
        assert_eq!(to_csv(&data), "Keterangan,PIC\n\"susu/gula, kopi\",SYSTEM");
    }

    #[test]
    fn test_embedded_quotes_are_not_escaped() {
        let data = records(json!([{"Keterangan": "kopi \"tubruk\", gula"}]));
        assert_eq!(to_csv(&data), "Keterangan\n\"kopi \"tubruk\", gula\"");
    }

    #[test]
    fn test_first_record_keys_drive_columns() {
        let data = records(json!([
            {"A": 1, "B": 2},
            {"B": 3, "C": 4}
        ]));
        assert_eq!(to_csv(&data), "A,B\n1,2\n,3");
    }

    #[test]
    fn test_to_csv_is_idempotent() {
        let data = records(json!([{"A": "x,y", "B": 1.5}]));
        assert_eq!(to_csv(&data), to_csv(&data));
    }

    #[test]
    fn test_read_transactions_csv() {
        let input = "ID_Transaksi,Bulan,Sub_Kategori,Keterangan,Nominal\n\
                     TXN0001,9,Operasional|Utilitas,\"wifi, bulanan\",425000\n\
                     TXN0002,9,Belanja Bahan Baku (COGS),susu/gula,157300.5\n";
        let rows = read_transactions_csv(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ID_Transaksi"], json!("TXN0001"));
        assert_eq!(rows[0]["Bulan"], json!(9));
        assert_eq!(rows[0]["Keterangan"], json!("wifi, bulanan"));
        assert_eq!(rows[0]["Nominal"], json!(425000));
        assert_eq!(rows[1]["Nominal"], json!(157300.5));
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys[0], "ID_Transaksi");
        assert_eq!(keys[4], "Nominal");
    }

    #[test]
    fn test_parse_field_keeps_dates_as_text() {
        assert_eq!(parse_field("2024-09-01"), json!("2024-09-01"));
        assert_eq!(parse_field("inf"), json!("inf"));
        assert_eq!(parse_field(""), json!(""));
    }

    #[test]
    fn test_zero_padded_fields_survive_ingest_and_export() {
        assert_eq!(parse_field("0012"), json!("0012"));
        assert_eq!(parse_field("-007"), json!("-007"));
        assert_eq!(parse_field("0"), json!(0));
        assert_eq!(parse_field("0.5"), json!(0.5));

        let rows = read_transactions_csv("Kode,Nominal
0012,1500
".as_bytes()).unwrap();
        assert_eq!(to_csv(&rows), "Kode,Nominal
0012,1500");
    }
}
