use athwatch_core::{DerivedMetrics, Summary};
use serde::Serialize;

use crate::cli::SummaryArgs;
use crate::error::CliError;
use crate::output::Table;

use super::{parse_symbols, parse_types, CommandResult, Context};

#[derive(Debug, Serialize)]
struct SummaryResponseData {
    threshold: f64,
    /// `null` when no instrument matched.
    summary: Option<Summary>,
}

pub async fn run(args: &SummaryArgs, context: &Context) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let types = parse_types(&args.types)?;

    let rows = context
        .service
        .metrics_batch(&symbols, context.threshold)
        .await?;
    let summary = context.service.summary(&rows, &types);

    let table = summary_table(summary.as_ref());
    let data = serde_json::to_value(SummaryResponseData {
        threshold: context.threshold.value(),
        summary,
    })?;

    Ok(CommandResult { data, table })
}

fn summary_table(summary: Option<&Summary>) -> Table {
    let mut table = Table::new(vec!["FIGURE", "VALUE"]);
    let Some(summary) = summary else {
        table.push(vec![String::from("instruments"), String::from("0")]);
        return table;
    };

    table.push(vec![String::from("instruments"), summary.count.to_string()]);
    table.push(vec![
        String::from("deepest discount"),
        describe(Some(&summary.deepest_discount), percent_down),
    ]);
    table.push(vec![String::from("nearest peak"), describe(summary.nearest_peak.as_ref(), percent_down)]);
    table.push(vec![String::from("at peak"), summary.at_peak_count.to_string()]);
    table.push(vec![String::from("top performer"), describe(summary.top_performer.as_ref(), daily_change)]);
    table.push(vec![
        String::from("worst performer"),
        describe(summary.worst_performer.as_ref(), daily_change),
    ]);
    table.push(vec![
        String::from("average down"),
        format!("{:.2}%", summary.average_percent_down),
    ]);
    table
}

fn describe(row: Option<&DerivedMetrics>, value: fn(&DerivedMetrics) -> String) -> String {
    row.map_or_else(|| String::from("-"), |row| format!("{} ({})", row.symbol, value(row)))
}

fn percent_down(row: &DerivedMetrics) -> String {
    format!("{:.2}% down", row.percent_down)
}

fn daily_change(row: &DerivedMetrics) -> String {
    row.daily_change_percent
        .map_or_else(|| String::from("-"), |change| format!("{change:+.2}%"))
}
