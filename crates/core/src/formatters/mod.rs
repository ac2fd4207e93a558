pub mod json;

pub use json::{JsonConfig, OutputFormat, PageSummary, records_to_json};
