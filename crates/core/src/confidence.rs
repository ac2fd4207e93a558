//! Batch confidence scoring.
//!
//! Each expected field carries a weight. A record earns the weights of the
//! fields it actually holds; the batch score is the earned total over the
//! maximum possible, as a rounded percentage.

use serde::Serialize;

use crate::record::{Record, fields};

/// Default percentage below which a batch is reported as low confidence.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 30;

/// Expected fields and their weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWeights {
    weights: Vec<(String, u32)>,
}

impl FieldWeights {
    pub fn new(weights: Vec<(String, u32)>) -> Self {
        Self { weights }
    }

    pub fn total(&self) -> u32 {
        self.weights.iter().map(|(_, weight)| weight).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.weights.iter().map(|(field, weight)| (field.as_str(), *weight))
    }

    /// Weight earned by a single record.
    pub fn earned(&self, record: &Record) -> u32 {
        self.iter().filter(|(field, _)| record.has_value(field)).map(|(_, weight)| weight).sum()
    }
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self::new(
            [
                (fields::URL, 20),
                (fields::ADDRESS, 20),
                (fields::PRICE, 20),
                (fields::DESCRIPTION, 15),
                (fields::IMAGES, 15),
                (fields::DATE, 10),
            ]
            .into_iter()
            .map(|(field, weight)| (field.to_string(), weight))
            .collect(),
        )
    }
}

/// Confidence of a batch, 0 to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ConfidenceResult {
    pub percent: u8,
}

impl ConfidenceResult {
    pub fn is_below(&self, threshold: u8) -> bool {
        self.percent < threshold
    }
}

/// Score a batch of records.
pub fn score(records: &[Record], weights: &FieldWeights) -> ConfidenceResult {
    let possible = records.len() as u64 * u64::from(weights.total());
    if possible == 0 {
        return ConfidenceResult::default();
    }

    let earned: u64 = records.iter().map(|record| u64::from(weights.earned(record))).sum();
    let percent = (earned as f64 * 100.0 / possible as f64).round().clamp(0.0, 100.0) as u8;
    ConfidenceResult { percent }
}
