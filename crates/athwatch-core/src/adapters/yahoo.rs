//! Yahoo Finance adapter.
//!
//! Weekly history and chart samples come from the v8 chart endpoint, quotes
//! from the v7 quote endpoint. Yahoo's payloads are loosely typed (every
//! numeric field nullable, error bodies of varying shape), so they are parsed
//! here into the crate's explicit schema and never passed further raw.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::data_source::{MarketDataSource, QuoteBatch, QuoteRequest, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::{
    ChartPoint, ChartRange, PricePoint, QuoteExtras, QuoteSnapshot, Symbol, SymbolSeries,
    UtcDateTime,
};

const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_BASE: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";

#[derive(Clone)]
pub struct YahooSource {
    http_client: Arc<dyn HttpClient>,
    crumb: Arc<Mutex<Option<String>>>,
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            crumb: Arc::new(Mutex::new(None)),
        }
    }

    async fn get(&self, url: String) -> Result<HttpResponse, SourceError> {
        let request = HttpRequest::get(url).with_header("referer", REFERER);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| SourceError::unavailable(format!("yahoo transport error: {}", e.message())))?;
        classify_status(response)
    }

    /// Crumb token required by the quote endpoint, fetched once per session.
    async fn crumb(&self) -> Result<String, SourceError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only sets the session cookie; its status is irrelevant.
        let _ = self
            .http_client
            .execute(HttpRequest::get(COOKIE_URL).with_header("referer", REFERER))
            .await;

        for url in CRUMB_URLS {
            let request = HttpRequest::get(url).with_header("referer", REFERER);
            let Ok(response) = self.http_client.execute(request).await else {
                continue;
            };
            let body = response.body.trim();
            if response.status == 429 || body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited("yahoo rate limited while fetching crumb"));
            }
            if response.is_success() && is_plausible_crumb(body) {
                *cached = Some(body.to_owned());
                return Ok(body.to_owned());
            }
        }

        Err(SourceError::unavailable("failed to fetch yahoo crumb from all endpoints"))
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn fetch_history(&self, symbol: Symbol) -> Result<SymbolSeries, SourceError> {
        let url = format!(
            "{CHART_BASE}/{}?interval=1wk&range=max&events=split",
            urlencoding::encode(symbol.as_str())
        );
        debug!(%symbol, "fetching weekly history from yahoo");
        let response = self.get(url).await?;
        parse_history(symbol, &response.body)
    }

    async fn fetch_quotes(&self, req: QuoteRequest) -> Result<QuoteBatch, SourceError> {
        let symbols = req
            .symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut refreshed = false;
        loop {
            let crumb = self.crumb().await?;
            let url = format!(
                "{QUOTE_BASE}?symbols={}&crumb={}",
                urlencoding::encode(&symbols),
                urlencoding::encode(&crumb)
            );
            debug!(symbols = req.symbols.len(), "fetching quotes from yahoo");

            match self.get(url).await {
                Err(error) if !refreshed && error.message().contains("status 401") => {
                    warn!("yahoo rejected crumb, refreshing session");
                    self.invalidate_crumb().await;
                    refreshed = true;
                }
                Err(error) => return Err(error),
                Ok(response) => return parse_quotes(&response.body),
            }
        }
    }

    async fn fetch_chart(&self, symbol: Symbol, range: ChartRange) -> Result<Vec<ChartPoint>, SourceError> {
        let url = format!(
            "{CHART_BASE}/{}?interval={}&range={}",
            urlencoding::encode(symbol.as_str()),
            range.bar_interval(),
            range.as_str()
        );
        let response = self.get(url).await?;
        parse_chart(&response.body)
    }
}

impl MarketDataSource for YahooSource {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn weekly_history<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, SymbolSeries> {
        Box::pin(self.fetch_history(symbol))
    }

    fn quotes<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch> {
        Box::pin(self.fetch_quotes(req))
    }

    fn chart<'a>(&'a self, symbol: Symbol, range: ChartRange) -> SourceFuture<'a, Vec<ChartPoint>> {
        Box::pin(self.fetch_chart(symbol, range))
    }
}

fn classify_status(response: HttpResponse) -> Result<HttpResponse, SourceError> {
    match response.status {
        200..=299 => Ok(response),
        404 => Err(SourceError::not_found("yahoo returned status 404")),
        429 => Err(SourceError::rate_limited("yahoo returned status 429")),
        status => Err(SourceError::unavailable(format!("yahoo returned status {status}"))),
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(' ')
        && !body.contains("<html")
        && !body.contains("<!DOCTYPE")
}

/// Parses a weekly chart payload into a series.
pub fn parse_history(symbol: Symbol, body: &str) -> Result<SymbolSeries, SourceError> {
    let result = match chart_result(body)? {
        Some(result) => result,
        None => return Ok(SymbolSeries::empty(symbol)),
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|values| values.into_iter().next())
        .map(|values| values.adjclose)
        .unwrap_or_default();

    let points = timestamps
        .iter()
        .enumerate()
        .filter_map(|(index, &seconds)| {
            let date = UtcDateTime::from_unix_timestamp(seconds).ok()?;
            Some(PricePoint::new(
                date,
                value_at(&quote.high, index),
                value_at(&quote.close, index),
                value_at(&adjclose, index),
            ))
        })
        .collect();

    Ok(SymbolSeries::new(symbol, points))
}

/// Parses chart samples, preferring adjusted close over close.
pub fn parse_chart(body: &str) -> Result<Vec<ChartPoint>, SourceError> {
    let Some(result) = chart_result(body)? else {
        return Ok(Vec::new());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|values| values.into_iter().next())
        .map(|values| values.adjclose)
        .unwrap_or_default();

    Ok(timestamps
        .iter()
        .enumerate()
        .filter_map(|(index, &seconds)| {
            let timestamp = UtcDateTime::from_unix_timestamp(seconds).ok()?;
            let price = value_at(&adjclose, index).or_else(|| value_at(&quote.close, index))?;
            Some(ChartPoint { timestamp, price })
        })
        .collect())
}

/// Parses a v7 quote payload. Entries without a usable price or symbol are
/// dropped rather than failing the batch.
pub fn parse_quotes(body: &str) -> Result<QuoteBatch, SourceError> {
    let response: YahooQuoteResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo quote response: {e}")))?;

    if let Some(error) = response.quote_response.error {
        return Err(SourceError::unavailable(format!("yahoo quote API error: {error}")));
    }

    let quotes = response
        .quote_response
        .result
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| match normalize_quote(raw) {
            Ok(quote) => Some(quote),
            Err(reason) => {
                warn!(%reason, "skipping yahoo quote");
                None
            }
        })
        .collect();

    Ok(QuoteBatch { quotes })
}

fn chart_result(body: &str) -> Result<Option<YahooChartResult>, SourceError> {
    let response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("not found") {
            return Err(SourceError::not_found(error.to_string()));
        }
        return Err(SourceError::unavailable(format!("yahoo chart API error: {error}")));
    }

    Ok(response.chart.result.unwrap_or_default().into_iter().next())
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

fn normalize_quote(raw: YahooQuoteData) -> Result<QuoteSnapshot, String> {
    let symbol = Symbol::parse(&raw.symbol).map_err(|e| format!("{}: {e}", raw.symbol))?;
    let price = raw
        .regular_market_price
        .ok_or_else(|| format!("{symbol}: missing regularMarketPrice"))?;
    let name = raw
        .long_name
        .or(raw.short_name)
        .unwrap_or_else(|| symbol.as_str().to_owned());
    let currency = raw.currency.unwrap_or_else(|| String::from("USD"));

    // `dividendYield` is already a percentage; the trailing field is a ratio.
    let dividend_yield = raw
        .dividend_yield
        .or(raw.trailing_annual_dividend_yield.map(|ratio| ratio * 100.0));
    let expense_ratio = raw.net_expense_ratio.or(raw.annual_report_expense_ratio);

    let extras = QuoteExtras {
        previous_close: raw.regular_market_previous_close,
        day_high: raw.regular_market_day_high,
        day_low: raw.regular_market_day_low,
        fifty_two_week_high: raw.fifty_two_week_high,
        fifty_two_week_low: raw.fifty_two_week_low,
        market_cap: raw.market_cap,
        volume: raw.regular_market_volume.and_then(|v| u64::try_from(v).ok()),
    };

    QuoteSnapshot::new(symbol.clone(), name, price, &currency)
        .map(|quote| {
            quote
                .with_daily_change_percent(raw.regular_market_change_percent)
                .with_dividend_yield(dividend_yield)
                .with_expense_ratio(expense_ratio)
                .with_extras(extras)
        })
        .map_err(|e| format!("{symbol}: {e}"))
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl std::fmt::Display for YahooApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => f.write_str(&self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResponseData,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponseData {
    #[serde(default)]
    result: Option<Vec<YahooQuoteData>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteData {
    symbol: String,
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<f64>,
    currency: Option<String>,
    regular_market_change_percent: Option<f64>,
    dividend_yield: Option<f64>,
    trailing_annual_dividend_yield: Option<f64>,
    net_expense_ratio: Option<f64>,
    annual_report_expense_ratio: Option<f64>,
    regular_market_previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    market_cap: Option<f64>,
    regular_market_volume: Option<i64>,
}
