use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use athwatch_core::http_client::HttpFuture;
use athwatch_core::{
    ChartRange, FixtureSource, HttpClient, HttpRequest, HttpResponse, MarketDataSource,
    QuoteRequest, SeriesCorrector, SourceErrorKind, Symbol, YahooSource,
};

const YAHOO_CHART: &str = r#"{"chart":{"result":[{"meta":{"symbol":"MSFT"},
    "timestamp":[1700000000,1700604800,1701209600,1701814400],
    "indicators":{"quote":[{"high":[372.0,380.1,null,378.9],"close":[369.8,377.4,374.5,372.5]}],
    "adjclose":[{"adjclose":[367.1,374.6,371.8,369.9]}]}}],"error":null}}"#;

const YAHOO_QUOTES: &str = r#"{"quoteResponse":{"result":[
    {"symbol":"MSFT","longName":"Microsoft Corporation","regularMarketPrice":372.5,"currency":"USD",
     "regularMarketChangePercent":0.8}],"error":null}}"#;

const YAHOO_NOT_FOUND: &str =
    r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;

/// Serves canned Yahoo payloads keyed on the request path.
struct CannedYahoo;

impl HttpClient for CannedYahoo {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        let response = if request.url.contains("getcrumb") {
            HttpResponse::ok_json("canned-crumb")
        } else if request.url.contains("v7/finance/quote") {
            HttpResponse::ok_json(YAHOO_QUOTES)
        } else if request.url.contains("chart/MSFT") {
            HttpResponse::ok_json(YAHOO_CHART)
        } else if request.url.contains("v8/finance/chart") {
            HttpResponse::with_status(404, YAHOO_NOT_FOUND)
        } else {
            HttpResponse::with_status(404, "")
        };
        Box::pin(async move { Ok(response) })
    }
}

#[derive(Clone)]
struct ProviderCase {
    id: &'static str,
    source: Arc<dyn MarketDataSource>,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: "fixture",
            source: Arc::new(FixtureSource::synthetic()),
        },
        ProviderCase {
            id: "yahoo",
            source: Arc::new(YahooSource::with_http_client(Arc::new(CannedYahoo))),
        },
    ]
}

fn msft() -> Symbol {
    Symbol::parse("MSFT").expect("valid symbol")
}

#[test]
fn weekly_history_is_chronological_and_usable_for_all_providers() {
    for case in provider_cases() {
        assert_eq!(case.source.id(), case.id);

        let series = block_on(case.source.weekly_history(msft()))
            .unwrap_or_else(|error| panic!("provider '{}' history failed: {error}", case.id));
        assert_eq!(series.symbol, msft(), "provider '{}': symbol", case.id);
        assert!(!series.is_empty(), "provider '{}': empty history", case.id);
        assert!(
            series.points.windows(2).all(|pair| pair[0].date <= pair[1].date),
            "provider '{}': history out of order",
            case.id
        );
        assert!(
            !SeriesCorrector::default().correct(&series).is_empty(),
            "provider '{}': no usable week",
            case.id
        );
    }
}

#[test]
fn quotes_return_requested_symbol_for_all_providers() {
    let request = QuoteRequest::new(vec![msft()]).expect("valid quote request");

    for case in provider_cases() {
        let batch = block_on(case.source.quotes(request.clone()))
            .unwrap_or_else(|error| panic!("provider '{}' quotes failed: {error}", case.id));
        let quote = batch
            .find(&msft())
            .unwrap_or_else(|| panic!("provider '{}': MSFT missing", case.id));

        assert!(quote.current_price > 0.0, "provider '{}': price must be positive", case.id);
        assert_eq!(quote.currency, "USD", "provider '{}': currency", case.id);
        assert!(!quote.name.is_empty(), "provider '{}': name", case.id);
    }
}

#[test]
fn chart_samples_are_finite_for_all_providers() {
    for case in provider_cases() {
        let points = block_on(case.source.chart(msft(), ChartRange::OneMonth))
            .unwrap_or_else(|error| panic!("provider '{}' chart failed: {error}", case.id));
        assert!(!points.is_empty(), "provider '{}': empty chart", case.id);
        assert!(
            points.iter().all(|point| point.price.is_finite() && point.price > 0.0),
            "provider '{}': bad sample",
            case.id
        );
    }
}

#[test]
fn unknown_symbol_history_is_not_retryable() {
    let unknown = Symbol::parse("ZZZZ9").expect("valid symbol");
    let sources: Vec<Arc<dyn MarketDataSource>> = vec![
        Arc::new(FixtureSource::new()),
        Arc::new(YahooSource::with_http_client(Arc::new(CannedYahoo))),
    ];

    for source in sources {
        let error = block_on(source.weekly_history(unknown.clone()))
            .expect_err("unknown symbol should fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound, "provider '{}'", source.id());
        assert!(!error.retryable(), "provider '{}'", source.id());
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    let waker = noop_waker();
    let mut context = Context::from_waker(&waker);
    let mut future = Box::pin(future);

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}

fn noop_waker() -> Waker {
    // SAFETY: The vtable functions never dereference the data pointer.
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_WAKER_VTABLE)
}

unsafe fn noop_raw_waker_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

unsafe fn noop_raw_waker_wake(_: *const ()) {}

unsafe fn noop_raw_waker_wake_by_ref(_: *const ()) {}

unsafe fn noop_raw_waker_drop(_: *const ()) {}

static NOOP_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    noop_raw_waker_clone,
    noop_raw_waker_wake,
    noop_raw_waker_wake_by_ref,
    noop_raw_waker_drop,
);
