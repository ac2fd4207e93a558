pub mod confidence;
pub mod discover;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod formatters;
pub mod locate;
pub mod page;
pub mod parse;
pub mod preprocess;
pub mod profile;
pub mod reconcile;
pub mod record;
pub mod scoring;
pub mod selector;
pub mod tree;

pub use confidence::{ConfidenceResult, DEFAULT_MIN_CONFIDENCE, FieldWeights, score};
pub use discover::{RecordShape, find_record_array};
pub use error::{GleanerError, Result};
pub use extract::{
    CardExtractor, Diagnostics, ExtractConfig, Extraction, ExtractionMethod, SelectorCardExtractor, extract_page,
    extract_page_with_config,
};
#[cfg(feature = "fetch")]
pub use fetch::fetch_url;
pub use fetch::{FetchConfig, PageInput, fetch_file, fetch_stdin};
pub use formatters::{JsonConfig, OutputFormat, PageSummary, records_to_json};
pub use locate::{CandidateLocation, LocateReport, Located, Locator, Probe, ProbeAttempt, ProbeOutcome};
pub use page::{ElementSnapshot, HtmlPage, Page};
pub use parse::Document;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use profile::{CardField, Directive, ProfileLoader, ProfileLoaderBuilder, ProfileParser, SiteProfile};
pub use reconcile::{identity_key, normalize_address, normalize_postcode, reconcile};
pub use record::{FieldMap, MergedRecord, ReconciledRecord, Record, fields};
#[doc(hidden)]
pub use scoring::{ElementHeuristics, ScoreResult, WeightedPattern, calculate_score, score_element};
pub use selector::{SelectorCandidate, SelectorReport, discover_selector};
