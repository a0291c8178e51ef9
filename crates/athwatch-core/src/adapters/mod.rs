mod fixture;
mod yahoo;

pub use fixture::FixtureSource;
pub use yahoo::{parse_chart, parse_history, parse_quotes, YahooSource};
