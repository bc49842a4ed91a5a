use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::{fetch_target, fetch_transactions, InputArgs};
use crate::csv_export::to_csv;
use crate::error::Result;
use crate::models::Period;
use crate::settings::{shellexpand_path, Settings};

/// `expense_data_<year>_<month>.csv`, month unpadded.
pub fn export_file_name(period: Period) -> String {
    format!("expense_data_{}_{}.csv", period.year(), period.month())
}

fn write_csv(csv: &str, path: &Path) -> Result<String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, csv)?;
    Ok(format!("Wrote {}", path.display()))
}

pub fn run(
    settings: &Settings,
    input: &InputArgs,
    output: Option<String>,
    stdout: bool,
) -> Result<String> {
    let target = fetch_target(settings, input)?;
    let transactions = fetch_transactions(settings, input, &target)?;
    let csv = to_csv(&transactions);
    info!("{} rows exported", transactions.len());

    if stdout {
        return Ok(csv);
    }
    let path = match output {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => settings
            .export_dir()
            .join(export_file_name(target.period()?)),
    };
    write_csv(&csv, &path)
}
