use athwatch_core::{sort_filter, DerivedMetrics, PeakConfidence, SortDirection, SortField};
use serde::Serialize;

use crate::cli::MetricsArgs;
use crate::error::CliError;
use crate::output::{optional_percent, Table};

use super::{parse_symbols, parse_types, CommandResult, Context};

#[derive(Debug, Serialize)]
struct MetricsResponseData {
    threshold: f64,
    metrics: Vec<DerivedMetrics>,
}

pub async fn run(args: &MetricsArgs, context: &Context) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let field: SortField = args.sort.parse()?;
    let direction = if args.desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    let types = parse_types(&args.types)?;

    let rows = context
        .service
        .metrics_batch(&symbols, context.threshold)
        .await?;
    let metrics = sort_filter(rows, field, direction, &args.query, &types);

    let table = metrics_table(&metrics);
    let data = serde_json::to_value(MetricsResponseData {
        threshold: context.threshold.value(),
        metrics,
    })?;

    Ok(CommandResult { data, table })
}

fn metrics_table(metrics: &[DerivedMetrics]) -> Table {
    let mut table = Table::new(vec![
        "SYMBOL", "TYPE", "PRICE", "PEAK", "PEAK DATE", "DOWN", "TO PEAK", "DAY", "NEAR",
    ]);
    for row in metrics {
        let fallback = if row.confidence == PeakConfidence::Fallback {
            "*"
        } else {
            ""
        };
        table.push(vec![
            row.symbol.to_string(),
            row.asset_type.to_string(),
            format!("{:.2} {}", row.current_price, row.currency),
            format!("{:.2}{fallback}", row.peak_price),
            row.peak_date.date().to_string(),
            format!("{:.2}%", row.percent_down),
            format!("{:.2}%", row.percent_to_peak),
            optional_percent(row.daily_change_percent),
            if row.is_near_peak { "yes" } else { "" }.to_owned(),
        ]);
    }
    table
}
