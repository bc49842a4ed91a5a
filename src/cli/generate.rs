use std::path::PathBuf;

use tracing::info;

use crate::cli::{fetch_target, InputArgs};
use crate::error::{RekapError, Result};
use crate::generator::generate_transactions;
use crate::settings::{shellexpand_path, Settings};

pub fn run(
    settings: &Settings,
    input: &InputArgs,
    output: Option<String>,
    force: bool,
) -> Result<String> {
    let target = fetch_target(settings, input)?;
    let period = target.period()?;
    let path = match output {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => settings
            .data_dir()
            .join(format!("transactions-{period}.json")),
    };
    if path.exists() && !force {
        return Err(RekapError::Other(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }

    let transactions = generate_transactions(&target, input.seed)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&transactions)?;
    std::fs::write(&path, format!("{json}\n"))?;
    info!("{} transactions generated for {period}", transactions.len());

    Ok(format!(
        "Wrote {} transactions to {}",
        transactions.len(),
        path.display()
    ))
}
