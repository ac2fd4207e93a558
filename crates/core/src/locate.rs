//! Structured-data location.
//!
//! A [`Locator`] probes a page for an embedded data object: first every
//! configured [`CandidateLocation`] in priority order, then every script
//! element of a structured-data MIME type. The first probe that yields a
//! non-null object wins. Nothing found is an ordinary outcome, reported as
//! `None`, and every attempt is recorded in a [`LocateReport`].

use serde_json::Value;

use crate::page::Page;
use crate::tree::is_object_like;

/// MIME types scanned when no candidate location matched.
pub const DEFAULT_SCRIPT_TYPES: &[&str] = &["application/ld+json", "application/json"];

/// How a candidate location is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// A page-global expression, e.g. `window.__NEXT_DATA__.props.pageProps`.
    Binding(String),
    /// A CSS selector for a script element whose text is a JSON payload.
    Script(String),
}

/// A probe plus the label reported when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLocation {
    pub probe: Probe,
    pub label: String,
}

impl CandidateLocation {
    pub fn binding(expression: &str, label: &str) -> Self {
        Self { probe: Probe::Binding(expression.to_string()), label: label.to_string() }
    }

    pub fn script(selector: &str, label: &str) -> Self {
        Self { probe: Probe::Script(selector.to_string()), label: label.to_string() }
    }
}

/// Built-in locations tried after any site-specific ones.
pub fn default_locations() -> Vec<CandidateLocation> {
    vec![
        CandidateLocation::binding("window.__NEXT_DATA__.props.pageProps", "next-data"),
        CandidateLocation::binding("window.__NUXT__", "nuxt"),
        CandidateLocation::binding("window.__INITIAL_STATE__", "initial-state"),
        CandidateLocation::binding("window.__PRELOADED_STATE__", "preloaded-state"),
        CandidateLocation::binding("window.__APOLLO_STATE__", "apollo-state"),
        CandidateLocation::binding("window.jsonModel", "json-model"),
        CandidateLocation::script("script#__NEXT_DATA__", "next-data-script"),
    ]
}

/// The accepted object and the label of the probe that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub blob: Value,
    pub label: String,
}

/// Why a single probe did or did not produce an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    /// The probe resolved to `null` or matched no element.
    Empty,
    /// The probe resolved to a scalar.
    NotObject,
    /// Evaluation, query or JSON parsing failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub label: String,
    pub outcome: ProbeOutcome,
}

/// Diagnostics of one locate pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocateReport {
    pub found: Option<Located>,
    pub attempts: Vec<ProbeAttempt>,
}

impl LocateReport {
    fn record(&mut self, label: String, outcome: ProbeOutcome) {
        self.attempts.push(ProbeAttempt { label, outcome });
    }

    /// Record the outcome of reading `value` and keep it when it is an object.
    fn accept(&mut self, label: String, value: Value) -> bool {
        let outcome = if is_object_like(&value) {
            ProbeOutcome::Found
        } else if value.is_null() {
            ProbeOutcome::Empty
        } else {
            ProbeOutcome::NotObject
        };

        let found = outcome == ProbeOutcome::Found;
        if found {
            tracing::debug!(label = %label, "structured data located");
            self.found = Some(Located { blob: value, label: label.clone() });
        }
        self.record(label, outcome);
        found
    }
}

/// Probes a page for embedded structured data.
#[derive(Debug, Clone)]
pub struct Locator {
    locations: Vec<CandidateLocation>,
    script_types: Vec<String>,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(default_locations())
    }
}

impl Locator {
    pub fn new(locations: Vec<CandidateLocation>) -> Self {
        Self { locations, script_types: DEFAULT_SCRIPT_TYPES.iter().map(|t| t.to_string()).collect() }
    }

    /// Replace the MIME types scanned by the script fallback.
    pub fn with_script_types(mut self, script_types: Vec<String>) -> Self {
        self.script_types = script_types;
        self
    }

    pub fn locations(&self) -> &[CandidateLocation] {
        &self.locations
    }

    /// Return the first embedded object found, if any.
    pub fn locate(&self, page: &dyn Page) -> Option<Located> {
        self.locate_with_report(page).found
    }

    /// Run every probe until one succeeds and report each attempt.
    pub fn locate_with_report(&self, page: &dyn Page) -> LocateReport {
        let mut report = LocateReport::default();

        for location in &self.locations {
            let label = location.label.clone();
            let read = match &location.probe {
                Probe::Binding(expression) => page.evaluate(expression).map(Some),
                Probe::Script(selector) => read_script(page, selector),
            };

            match read {
                Ok(Some(value)) => {
                    if report.accept(label, value) {
                        return report;
                    }
                }
                Ok(None) => report.record(label, ProbeOutcome::Empty),
                Err(e) => report.record(label, ProbeOutcome::Failed(e.to_string())),
            }
        }

        for script_type in &self.script_types {
            let selector = format!("script[type=\"{script_type}\"]");
            let scripts = match page.query(&selector) {
                Ok(scripts) => scripts,
                Err(e) => {
                    report.record(selector, ProbeOutcome::Failed(e.to_string()));
                    continue;
                }
            };

            for (index, script) in scripts.iter().enumerate() {
                let label = format!("{selector}[{index}]");
                match serde_json::from_str::<Value>(script.text.trim()) {
                    Ok(value) => {
                        if report.accept(label, value) {
                            return report;
                        }
                    }
                    Err(e) => report.record(label, ProbeOutcome::Failed(e.to_string())),
                }
            }
        }

        tracing::debug!(attempts = report.attempts.len(), "no structured data located");
        report
    }
}

/// Parse the first script element matching `selector`.
fn read_script(page: &dyn Page, selector: &str) -> crate::Result<Option<Value>> {
    let Some(script) = page.query(selector)?.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(script.text.trim())?))
}
