//! Price data providers.

pub mod csv_import;
pub mod fixture;
pub mod provider;
pub mod yahoo;

pub use csv_import::CsvProvider;
pub use fixture::FixtureProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawPricePoint};
pub use yahoo::{YahooOptions, YahooProvider};
