use crate::cli::{fetch_target, fetch_transactions, InputArgs, OutputFormat};
use crate::error::Result;
use crate::reports::{compute_variance_with, summarize_target, Strictness};
use crate::settings::Settings;
use crate::table::{
    render_orphans, render_target, render_transactions, render_variance, TableView,
};

fn strictness(strict: bool) -> Strictness {
    if strict {
        Strictness::Strict
    } else {
        Strictness::Lenient
    }
}

/// Print one or more views; JSON output is always an array.
fn emit(views: &[TableView], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(views
            .iter()
            .map(TableView::to_text)
            .collect::<Vec<_>>()
            .join("\n\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(views)?),
    }
}

pub fn target(settings: &Settings, input: &InputArgs, format: OutputFormat) -> Result<String> {
    let target = fetch_target(settings, input)?;
    let summary = summarize_target(&target)?;
    emit(&[render_target(&summary)], format)
}

pub fn transactions(settings: &Settings, input: &InputArgs, format: OutputFormat) -> Result<String> {
    let target = fetch_target(settings, input)?;
    let transactions = fetch_transactions(settings, input, &target)?;
    emit(&[render_transactions(&transactions)], format)
}

pub fn variance(
    settings: &Settings,
    input: &InputArgs,
    strict: bool,
    format: OutputFormat,
) -> Result<String> {
    let target = fetch_target(settings, input)?;
    let transactions = fetch_transactions(settings, input, &target)?;
    let report = compute_variance_with(&target, &transactions, strictness(strict))?;

    let mut views = vec![render_variance(&report)];
    if strict && !report.orphans.is_empty() {
        views.push(render_orphans(&report.orphans));
    }
    emit(&views, format)
}

/// Every view in the order a reader works through them: target first, then
/// how spending compares to it, then the transactions behind the numbers.
pub fn all(
    settings: &Settings,
    input: &InputArgs,
    strict: bool,
    format: OutputFormat,
) -> Result<String> {
    let target = fetch_target(settings, input)?;
    let summary = summarize_target(&target)?;
    let transactions = fetch_transactions(settings, input, &target)?;
    let report = compute_variance_with(&target, &transactions, strictness(strict))?;

    let mut views = vec![render_target(&summary), render_variance(&report)];
    if strict && !report.orphans.is_empty() {
        views.push(render_orphans(&report.orphans));
    }
    views.push(render_transactions(&transactions));
    emit(&views, format)
}
