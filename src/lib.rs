//! Monthly budget reconciliation: a target per category, the transactions
//! spent against it, and the tables and CSV built from both.

pub mod cli;
pub mod csv_export;
pub mod error;
pub mod fmt;
pub mod generator;
pub mod models;
pub mod reports;
pub mod settings;
pub mod source;
pub mod table;

pub use csv_export::to_csv;
pub use error::{RekapError, Result};
pub use generator::{generate_transactions, GeneratorSource};
pub use models::{CategoryPath, Period, Record, TargetRecord};
pub use reports::{compute_variance, compute_variance_with, summarize_target, Strictness};
pub use source::{DataSource, DirSource};
pub use table::{render_table, TableOptions, TableView};
