use crate::confidence::ConfidenceResult;
use crate::extract::{Extraction, ExtractionMethod};
use crate::{GleanerError, Result};
use serde::Serialize;

/// Record serialization layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array
    #[default]
    Json,
    /// One JSON object per line
    Jsonl,
}

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    pub format: OutputFormat,
    /// Pretty print JSON arrays (ignored for JSON lines)
    pub pretty: bool,
}

/// Per-page summary for reports
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub input: String,
    pub method: ExtractionMethod,
    pub confidence: ConfidenceResult,
    pub records: usize,
    pub low_confidence: bool,
}

impl PageSummary {
    pub fn new(input: &str, extraction: &Extraction) -> Self {
        Self {
            input: input.to_string(),
            method: extraction.method.clone(),
            confidence: extraction.confidence,
            records: extraction.records.len(),
            low_confidence: extraction.diagnostics.low_confidence,
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.map_err(GleanerError::from)
}

/// Render records (or page summaries) as a JSON array or as JSON lines
pub fn records_to_json<T: Serialize>(records: &[T], config: &JsonConfig) -> Result<String> {
    match config.format {
        OutputFormat::Json => to_json(records, config.pretty),
        OutputFormat::Jsonl => {
            let lines = records.iter().map(|record| to_json(record, false)).collect::<Result<Vec<_>>>()?;
            Ok(lines.join("\n"))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use serde_json::json;

    fn records() -> Vec<Record> {
        vec![
            serde_json::from_value(json!({"id": 1, "address": "1 Mill Lane"})).unwrap(),
            serde_json::from_value(json!({"id": 2, "address": "3 Mill Lane"})).unwrap(),
        ]
    }

    #[test]
    fn test_records_to_json_array() {
        let output = records_to_json(&records(), &JsonConfig::default()).unwrap();
        assert_eq!(output, r#"[{"id":1,"address":"1 Mill Lane"},{"id":2,"address":"3 Mill Lane"}]"#);
    }

    #[test]
    fn test_records_to_json_lines() {
        let config = JsonConfig { format: OutputFormat::Jsonl, pretty: true };
        let output = records_to_json(&records(), &config).unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"{"id":2,"address":"3 Mill Lane"}"#);
    }

    #[test]
    fn test_pretty_array() {
        let config = JsonConfig { format: OutputFormat::Json, pretty: true };
        let output = records_to_json(&records(), &config).unwrap();
        assert!(output.starts_with("[\n"));
    }

    #[test]
    fn test_empty_records() {
        assert_eq!(records_to_json::<Record>(&[], &JsonConfig::default()).unwrap(), "[]");
        let jsonl = JsonConfig { format: OutputFormat::Jsonl, pretty: false };
        assert_eq!(records_to_json::<Record>(&[], &jsonl).unwrap(), "");
    }

    #[test]
    fn test_summary_serialization() {
        let summary = PageSummary {
            input: "page.html".to_string(),
            method: ExtractionMethod::Dom { selector: ".card".to_string() },
            confidence: ConfidenceResult { percent: 72 },
            records: 3,
            low_confidence: false,
        };
        let rendered = records_to_json(&[summary], &JsonConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value[0]["method"], json!({"kind": "dom", "selector": ".card"}));
        assert_eq!(value[0]["confidence"]["percent"], 72);
    }
}
