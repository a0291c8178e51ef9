use athwatch_core::{ChartRange, Symbol, SymbolDetail};

use crate::cli::DetailArgs;
use crate::error::CliError;
use crate::output::{optional_percent, Table};

use super::{CommandResult, Context};

pub async fn run(args: &DetailArgs, context: &Context) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let range = args
        .range
        .as_deref()
        .map_or(context.default_range, ChartRange::parse_or_default);

    let detail = context.service.detail(&symbol, range).await?;

    let table = detail_table(&detail, range);
    let data = serde_json::to_value(&detail)?;
    Ok(CommandResult { data, table })
}

fn detail_table(detail: &SymbolDetail, range: ChartRange) -> Table {
    let quote = &detail.quote;
    let price = |value: Option<f64>| value.map_or_else(|| String::from("-"), |v| format!("{v:.2}"));

    let mut table = Table::new(vec!["FIELD", "VALUE"]);
    let mut row = |field: &str, value: String| table.push(vec![field.to_owned(), value]);

    row("symbol", quote.symbol.to_string());
    row("name", quote.name.clone());
    row("price", format!("{:.2} {}", quote.current_price, quote.currency));
    row("day change", optional_percent(quote.daily_change_percent));
    row("previous close", price(quote.extras.previous_close));
    row("day range", format!("{} - {}", price(quote.extras.day_low), price(quote.extras.day_high)));
    row(
        "52w range",
        format!(
            "{} - {}",
            price(quote.extras.fifty_two_week_low),
            price(quote.extras.fifty_two_week_high)
        ),
    );
    row("dividend yield", optional_percent(quote.dividend_yield));
    row("expense ratio", optional_percent(quote.expense_ratio));
    row("peak", format!("{:.2}", detail.peak_price));
    row("peak date", detail.peak_date.date().to_string());
    row("confidence", format!("{:?}", detail.confidence).to_lowercase());
    row(
        "chart",
        format!("{} points over {}", detail.chart_data.len(), range.as_str()),
    );
    table
}
