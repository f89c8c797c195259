pub mod aggregate;
pub mod curve;
pub mod error;
pub mod output;
pub mod parser;
pub mod plot;
pub mod regression;
pub mod schema;
pub mod stats;
pub mod surplus;
pub mod tiers;
