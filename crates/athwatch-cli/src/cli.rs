//! CLI argument definitions for athwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `metrics` | Distance-from-peak rows for a watchlist |
//! | `summary` | Watchlist summary (deepest discount, nearest peak, ...) |
//! | `detail` | Quote, chart and peak for one symbol |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--threshold` | `1` | Near-peak cutoff in percent (0-10, step 0.5) |
//! | `--offline` | `false` | Use deterministic synthetic data |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! athwatch metrics AAPL VTI BTC-USD --sort percent_down --desc
//! athwatch summary AAPL VTI GLD --type etf,materials --pretty
//! athwatch detail AAPL --range 5y --format table
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Track how far your watchlist trades below its all-time highs.
#[derive(Debug, Parser)]
#[command(name = "athwatch", author, version, about = "All-time-high watchlist tracker")]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Near-peak threshold in percent. Out-of-range or malformed values fall
    /// back to 1.
    #[arg(long, global = true)]
    pub threshold: Option<String>,

    /// Serve synthetic data instead of calling Yahoo Finance.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Log provider calls and retries to stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON document.
    Json,
    /// Aligned plain-text table.
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Per-symbol distance from peak.
    Metrics(MetricsArgs),
    /// Aggregate figures for a watchlist.
    Summary(SummaryArgs),
    /// Quote, chart data and peak for a single symbol.
    Detail(DetailArgs),
}

#[derive(Debug, Args)]
pub struct MetricsArgs {
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Field to sort by (symbol, name, price, peak, percent_down, ...).
    #[arg(long, default_value = "percent_down")]
    pub sort: String,

    /// Sort descending.
    #[arg(long, default_value_t = false)]
    pub desc: bool,

    /// Case-insensitive match against symbol or name.
    #[arg(long, default_value = "")]
    pub query: String,

    /// Asset types to keep (etf, stock, crypto, materials).
    #[arg(long = "type", value_delimiter = ',')]
    pub types: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Asset types to summarize (etf, stock, crypto, materials).
    #[arg(long = "type", value_delimiter = ',')]
    pub types: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DetailArgs {
    pub symbol: String,

    /// Chart lookback (1mo, 3mo, 6mo, 1y, 5y, max).
    #[arg(long)]
    pub range: Option<String>,
}
