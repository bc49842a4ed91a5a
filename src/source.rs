use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::csv_export::read_transactions_csv;
use crate::error::{RekapError, Result};
use crate::models::{Period, Record, TargetRecord};
use crate::reports::transactions_from_value;

/// Where targets and transaction lists come from.
///
/// Transactions are fetched for an already-fetched target, never on their own.
pub trait DataSource {
    fn fetch_target(&self, period: Period) -> Result<TargetRecord>;
    fn fetch_transactions(&self, target: &TargetRecord) -> Result<Vec<Record>>;
}

/// Reads `target-YYYY-MM.json` and `transactions-YYYY-MM.{json,csv}` from a directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn target_path(&self, period: Period) -> PathBuf {
        self.dir.join(format!("target-{period}.json"))
    }

    /// The JSON file if present, otherwise the CSV one.
    pub fn transactions_path(&self, period: Period) -> PathBuf {
        let json = self.dir.join(format!("transactions-{period}.json"));
        if json.exists() {
            json
        } else {
            self.dir.join(format!("transactions-{period}.csv"))
        }
    }
}

impl DataSource for DirSource {
    fn fetch_target(&self, period: Period) -> Result<TargetRecord> {
        let path = self.target_path(period);
        if !path.exists() {
            return Err(RekapError::Source(format!(
                "no target for {period} (expected {})",
                path.display()
            )));
        }
        load_target(&path)
    }

    fn fetch_transactions(&self, target: &TargetRecord) -> Result<Vec<Record>> {
        let period = target.period()?;
        let path = self.transactions_path(period);
        if !path.exists() {
            return Err(RekapError::Source(format!(
                "no transactions for {period} in {}",
                self.dir.display()
            )));
        }
        load_transactions(&path)
    }
}

pub fn load_target(path: &Path) -> Result<TargetRecord> {
    debug!("Loading target from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    TargetRecord::from_value(value)
}

/// Load transactions from a JSON array or, for `.csv` files, a CSV table.
pub fn load_transactions(path: &Path) -> Result<Vec<Record>> {
    debug!("Loading transactions from {}", path.display());
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let file = std::fs::File::open(path)?;
        return read_transactions_csv(std::io::BufReader::new(file));
    }
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    transactions_from_value(value)
}
