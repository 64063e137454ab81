#![deny(clippy::all)]

mod classifier;
mod error;
mod filter;
mod grouping;
pub mod loader;
mod metrics;
mod query;
mod ranking;
mod record;
mod series;
mod summary;

#[cfg(test)]
mod test_support;

pub use classifier::*;
pub use error::EngineError;
pub use filter::*;
pub use grouping::*;
pub use loader::{load_records, LoadReport, LoadedRecords, RecordFormat};
pub use metrics::*;
pub use query::*;
pub use ranking::*;
pub use record::*;
pub use series::*;
pub use summary::*;

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
