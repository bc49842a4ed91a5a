//! Display tables shared by every view.
//!
//! A [`TableView`] is sink-agnostic: the CLI prints it through comfy-table or
//! as JSON, and a UI layer can map the same structure onto its own widgets.

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::fmt::{display_value, relabel_header, rupiah};
use crate::models::{decimal_from_value, Record};
use crate::reports::{OrphanCategory, TargetSummary, VarianceReport};

/// Deviations with an absolute value below this are shown as balanced.
pub const BALANCE_TOLERANCE: Decimal = Decimal::ONE;

pub const NO_DATA: &str = "Tidak ada data untuk ditampilkan.";

pub const TARGET_TITLE: &str = "Ringkasan Target";
pub const VARIANCE_TITLE: &str = "Verifikasi: Target vs. Aktual";
pub const TRANSACTIONS_TITLE: &str = "Detail Transaksi Harian";
pub const ORPHANS_TITLE: &str = "Transaksi Tanpa Target";

/// Raw calendar fields; numeric but never currency.
const CALENDAR_COLUMNS: [&str; 2] = ["bulan", "tahun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    Balanced,
    Unbalanced,
}

impl Balance {
    pub fn classify(deviation: Decimal) -> Self {
        if deviation.abs() < BALANCE_TOLERANCE {
            Balance::Balanced
        } else {
            Balance::Unbalanced
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Text,
    Number,
    Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCell {
    pub text: String,
    pub kind: CellKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Set on total rows.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub emphasis: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    /// Shown instead of the table when there is nothing to render.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    pub title: String,
    /// Raw key of the column whose amounts get a balance flag.
    pub balance_column: Option<String>,
    /// Render the last row as a total row.
    pub emphasize_last: bool,
}

impl TableOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

enum CellValue {
    Amount(Decimal),
    Raw(Value),
}

impl CellValue {
    fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(v) => match decimal_from_value(v) {
                Some(amount) => CellValue::Amount(amount),
                None => CellValue::Raw(v.clone()),
            },
            None => CellValue::Raw(Value::Null),
        }
    }

    fn text(s: impl Into<String>) -> Self {
        CellValue::Raw(Value::String(s.into()))
    }
}

fn is_calendar_column(key: &str) -> bool {
    CALENDAR_COLUMNS.contains(&key.to_lowercase().as_str())
}

fn format_cell(key: &str, value: CellValue, options: &TableOptions) -> TableCell {
    match value {
        CellValue::Amount(amount) if is_calendar_column(key) => TableCell {
            text: amount.normalize().to_string(),
            kind: CellKind::Number,
            balance: None,
        },
        CellValue::Amount(amount) => TableCell {
            text: rupiah(amount),
            kind: CellKind::Currency,
            balance: (options.balance_column.as_deref() == Some(key))
                .then(|| Balance::classify(amount)),
        },
        CellValue::Raw(value) => TableCell {
            text: display_value(&value),
            kind: CellKind::Text,
            balance: None,
        },
    }
}

fn build(keys: &[String], rows: Vec<Vec<CellValue>>, options: &TableOptions) -> TableView {
    let last = rows.len().saturating_sub(1);
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(ix, values)| TableRow {
            cells: keys
                .iter()
                .zip(values)
                .map(|(key, value)| format_cell(key, value, options))
                .collect(),
            emphasis: options.emphasize_last && ix == last,
        })
        .collect();
    TableView {
        title: options.title.clone(),
        headers: keys.iter().map(|k| relabel_header(k)).collect(),
        rows,
        placeholder: None,
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Generic table over uniform records; columns come from the first record.
pub fn render_table(rows: &[Record], options: &TableOptions) -> TableView {
    let Some(first) = rows.first() else {
        return TableView::empty(&options.title);
    };
    let keys: Vec<String> = first.keys().cloned().collect();
    let values: Vec<Vec<CellValue>> = rows
        .iter()
        .map(|row| {
            keys.iter()
                .map(|key| CellValue::from_json(row.get(key)))
                .collect()
        })
        .collect();
    build(&keys, values, options)
}

pub fn render_target(summary: &TargetSummary) -> TableView {
    let keys = ["Kategori".to_string(), "Nominal".to_string()];
    let mut rows: Vec<Vec<CellValue>> = summary
        .rows
        .iter()
        .map(|row| vec![CellValue::text(row.category.label()), CellValue::Amount(row.amount)])
        .collect();
    rows.push(vec![CellValue::text("TOTAL TARGET"), CellValue::Amount(summary.total)]);

    let options = TableOptions {
        emphasize_last: true,
        ..TableOptions::titled(TARGET_TITLE)
    };
    build(&keys, rows, &options)
}

pub fn render_variance(report: &VarianceReport) -> TableView {
    let keys = ["Kategori", "Target", "Aktual", "Deviasi"].map(String::from);
    let mut rows: Vec<Vec<CellValue>> = report
        .rows
        .iter()
        .map(|row| {
            vec![
                CellValue::text(row.category.label()),
                CellValue::Amount(row.target),
                CellValue::Amount(row.actual),
                CellValue::Amount(row.deviation),
            ]
        })
        .collect();
    rows.push(vec![
        CellValue::text("TOTAL"),
        CellValue::Amount(report.totals.target),
        CellValue::Amount(report.totals.actual),
        CellValue::Amount(report.totals.deviation),
    ]);

    let options = TableOptions {
        balance_column: Some("Deviasi".to_string()),
        emphasize_last: true,
        ..TableOptions::titled(VARIANCE_TITLE)
    };
    build(&keys, rows, &options)
}

pub fn render_transactions(transactions: &[Record]) -> TableView {
    render_table(transactions, &TableOptions::titled(TRANSACTIONS_TITLE))
}

pub fn render_orphans(orphans: &[OrphanCategory]) -> TableView {
    if orphans.is_empty() {
        return TableView::empty(ORPHANS_TITLE);
    }
    let keys = ["Sub_Kategori", "Transaksi", "Nominal"].map(String::from);
    let rows: Vec<Vec<CellValue>> = orphans
        .iter()
        .map(|o| {
            vec![
                CellValue::text(o.key.clone()),
                CellValue::text(o.count.to_string()),
                CellValue::Amount(o.total),
            ]
        })
        .collect();
    build(&keys, rows, &TableOptions::titled(ORPHANS_TITLE))
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

impl TableView {
    pub fn empty(title: &str) -> Self {
        Self {
            title: title.to_string(),
            headers: Vec::new(),
            rows: Vec::new(),
            placeholder: Some(NO_DATA.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.placeholder.is_some()
    }

    /// Terminal rendering: balanced deviations green, unbalanced red, totals bold.
    pub fn to_text(&self) -> String {
        if let Some(placeholder) = &self.placeholder {
            return format!("{}\n{placeholder}", self.title);
        }

        let mut table = Table::new();
        table.set_header(self.headers.clone());
        for row in &self.rows {
            table.add_row(row.cells.iter().map(|cell| {
                let mut styled = cell.text.normal();
                if row.emphasis {
                    styled = styled.bold();
                }
                styled = match cell.balance {
                    Some(Balance::Balanced) => styled.green(),
                    Some(Balance::Unbalanced) => styled.red(),
                    None => styled,
                };
                let out = Cell::new(styled);
                match cell.kind {
                    CellKind::Currency => out.set_alignment(CellAlignment::Right),
                    CellKind::Number | CellKind::Text => out,
                }
            }));
        }
        format!("{}\n{table}", self.title)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
