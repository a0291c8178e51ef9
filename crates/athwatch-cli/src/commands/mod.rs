mod detail;
mod metrics;
mod summary;

use std::collections::BTreeSet;
use std::sync::Arc;

use athwatch_core::{
    AssetType, ChartRange, FixtureSource, MarketDataSource, Symbol, Threshold, WatchConfig,
    WatchService, YahooSource,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Table;

/// Output of one command: the JSON document and its table rendering.
pub struct CommandResult {
    pub data: Value,
    pub table: Table,
}

/// Resolved settings shared by every command.
pub struct Context {
    pub service: WatchService,
    pub threshold: Threshold,
    pub default_range: ChartRange,
}

impl Context {
    /// Env settings first, then CLI flags on top.
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = WatchConfig::from_env();
        if let Some(raw) = cli.threshold.as_deref() {
            config = config.with_threshold(Threshold::parse_or_default(raw));
        }

        let source: Arc<dyn MarketDataSource> = if cli.offline {
            Arc::new(FixtureSource::synthetic())
        } else {
            Arc::new(YahooSource::default())
        };
        debug!(source = source.id(), threshold = config.threshold.value(), "configured");

        Self {
            threshold: config.threshold,
            default_range: config.default_range,
            service: WatchService::new(source, config),
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let context = Context::from_cli(cli);

    match &cli.command {
        Command::Metrics(args) => metrics::run(args, &context).await,
        Command::Summary(args) => summary::run(args, &context).await,
        Command::Detail(args) => detail::run(args, &context).await,
    }
}

fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    Ok(Symbol::parse_unique(raw)?)
}

fn parse_types(raw: &[String]) -> Result<BTreeSet<AssetType>, CliError> {
    raw.iter()
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.parse::<AssetType>().map_err(CliError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_parse_into_set_and_skip_blanks() {
        let raw = vec![String::from("etf"), String::new(), String::from("ETF"), String::from("crypto")];
        let types = parse_types(&raw).expect("valid types");
        assert_eq!(types, BTreeSet::from([AssetType::Etf, AssetType::Crypto]));
    }

    #[test]
    fn unknown_type_is_a_validation_error() {
        let error = parse_types(&[String::from("bond")]).expect_err("invalid");
        assert_eq!(error.exit_code(), 2);
    }
}
