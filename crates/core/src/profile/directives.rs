use crate::confidence::DEFAULT_MIN_CONFIDENCE;
use crate::discover::RecordShape;
use crate::error::{GleanerError, Result};
use crate::locate::{CandidateLocation, DEFAULT_SCRIPT_TYPES, Locator, default_locations};
use crate::record::FieldMap;
use crate::scoring::{ElementHeuristics, WeightedPattern};

/// Weight of a `class_pattern` without an explicit one
const DEFAULT_CLASS_PATTERN_WEIGHT: u32 = 10;

/// Represents a single site profile directive
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Source tag stamped on every record from the site
    Source(String),

    /// Embedded data probes
    Binding(String, String),
    Script(String, String),
    ScriptType(String),

    /// Record discovery
    Container(String),
    Field(String, Vec<String>),
    MaxDepth(usize),

    /// DOM card extraction
    Card(String),
    CardField(CardField),
    ClassPattern(String, u32),
    ElementThreshold(u32),

    /// Behavior options
    MinConfidence(u8),
    DefaultProbes(bool),

    /// Testing
    TestUrl(String),
}

/// A per-card field extractor: a CSS selector evaluated inside the card and
/// an optional attribute to read instead of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub field: String,
    pub selector: String,
    pub attr: Option<String>,
}

impl CardField {
    /// Parse `<canonical> = <selector>[@attr]`
    pub fn parse(value: &str) -> Result<Self> {
        let (field, target) = value
            .split_once('=')
            .ok_or_else(|| GleanerError::ProfileError(format!("Invalid card_field format: {value}")))?;
        let field = field.trim();
        let target = target.trim();
        if field.is_empty() || target.is_empty() {
            return Err(GleanerError::ProfileError(format!("Invalid card_field format: {value}")));
        }

        let (selector, attr) = match target.rsplit_once('@') {
            Some((selector, attr)) if is_attribute_name(attr) => (selector.trim(), Some(attr.to_string())),
            _ => (target, None),
        };

        Ok(Self { field: field.to_string(), selector: selector.to_string(), attr })
    }
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

/// Everything known about one site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteProfile {
    /// Source tag
    pub source: Option<String>,

    /// Site-specific probes, tried before the built-in ones
    pub locations: Vec<CandidateLocation>,
    pub script_types: Vec<String>,

    /// Extra container keys, searched before the defaults
    pub containers: Vec<String>,
    /// Field aliases (canonical name, raw keys in priority order)
    pub fields: Vec<(String, Vec<String>)>,
    pub max_depth: Option<usize>,

    /// Known card selectors, tried before heuristic discovery
    pub cards: Vec<String>,
    pub card_fields: Vec<CardField>,
    /// Extra class patterns for card scoring (regex, weight), ahead of the defaults
    pub class_patterns: Vec<(String, u32)>,
    pub element_threshold: Option<u32>,

    /// Behavior options
    pub min_confidence: Option<u8>,
    pub default_probes: Option<bool>,

    /// Test URLs
    pub test_urls: Vec<String>,
}

impl SiteProfile {
    /// Create a new empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// A profile that only sets the source tag
    pub fn for_source(source: &str) -> Self {
        Self { source: Some(source.to_string()), ..Default::default() }
    }

    /// Add a directive to this profile
    pub fn add_directive(&mut self, directive: Directive) {
        match directive {
            Directive::Source(source) => self.source = Some(source),

            Directive::Binding(expression, label) => {
                self.locations.push(CandidateLocation::binding(&expression, &label));
            }
            Directive::Script(selector, label) => self.locations.push(CandidateLocation::script(&selector, &label)),
            Directive::ScriptType(mime) => self.script_types.push(mime),

            Directive::Container(key) => self.containers.push(key),
            Directive::Field(field, aliases) => match self.fields.iter_mut().find(|(name, _)| *name == field) {
                Some((_, existing)) => existing.extend(aliases),
                None => self.fields.push((field, aliases)),
            },
            Directive::MaxDepth(depth) => self.max_depth = Some(depth),

            Directive::Card(selector) => self.cards.push(selector),
            Directive::CardField(card_field) => self.card_fields.push(card_field),
            Directive::ClassPattern(pattern, weight) => self.class_patterns.push((pattern, weight)),
            Directive::ElementThreshold(threshold) => self.element_threshold = Some(threshold),

            Directive::MinConfidence(percent) => self.min_confidence = Some(percent),
            Directive::DefaultProbes(value) => self.default_probes = Some(value),

            Directive::TestUrl(url) => self.test_urls.push(url),
        }
    }

    /// Merge a more specific profile into this one
    ///
    /// List entries from `other` go in front so its probes, aliases and card
    /// selectors are tried first. Scalar options from `other` take precedence.
    pub fn merge(&mut self, other: &SiteProfile) {
        if other.source.is_some() {
            self.source.clone_from(&other.source);
        }

        prepend(&mut self.locations, &other.locations);
        prepend(&mut self.script_types, &other.script_types);

        prepend(&mut self.containers, &other.containers);
        for (field, aliases) in &other.fields {
            match self.fields.iter_mut().find(|(name, _)| name == field) {
                Some((_, existing)) => prepend(existing, aliases),
                None => self.fields.push((field.clone(), aliases.clone())),
            }
        }
        if other.max_depth.is_some() {
            self.max_depth = other.max_depth;
        }

        prepend(&mut self.cards, &other.cards);
        prepend(&mut self.card_fields, &other.card_fields);
        prepend(&mut self.class_patterns, &other.class_patterns);
        if other.element_threshold.is_some() {
            self.element_threshold = other.element_threshold;
        }

        if other.min_confidence.is_some() {
            self.min_confidence = other.min_confidence;
        }
        if other.default_probes.is_some() {
            self.default_probes = other.default_probes;
        }

        prepend(&mut self.test_urls, &other.test_urls);
    }

    /// Source tag stamped on records, `fallback` when the profile sets none
    pub fn source_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(fallback)
    }

    /// Get effective default-probes setting (default: true)
    pub fn uses_default_probes(&self) -> bool {
        self.default_probes.unwrap_or(true)
    }

    /// Get effective warning threshold (default: 30)
    pub fn min_confidence(&self) -> u8 {
        self.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE)
    }

    /// Locator with the site probes first, then the built-in ones
    pub fn locator(&self) -> Locator {
        let mut locations = self.locations.clone();
        if self.uses_default_probes() {
            locations.extend(default_locations().into_iter().filter(|l| !self.locations.contains(l)));
        }

        let mut script_types = self.script_types.clone();
        for mime in DEFAULT_SCRIPT_TYPES {
            if !script_types.iter().any(|t| t == mime) {
                script_types.push(mime.to_string());
            }
        }

        Locator::new(locations).with_script_types(script_types)
    }

    /// Default aliases with the site's aliases in front
    pub fn field_map(&self) -> FieldMap {
        let mut map = FieldMap::default();
        for (field, aliases) in &self.fields {
            map.prepend_aliases(field, aliases);
        }
        map
    }

    pub fn record_shape(&self) -> RecordShape {
        let shape = RecordShape::default().with_containers(&self.containers);
        match self.max_depth {
            Some(depth) => shape.with_max_depth(depth),
            None => shape,
        }
    }

    /// Default card heuristics tuned by the site's patterns and threshold
    pub fn heuristics(&self) -> ElementHeuristics {
        let mut heuristics = ElementHeuristics::default();

        let site_patterns: Vec<WeightedPattern> = self
            .class_patterns
            .iter()
            .filter_map(|(pattern, weight)| match WeightedPattern::new(pattern, *weight) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "ignoring invalid class pattern");
                    None
                }
            })
            .collect();
        heuristics.class_patterns.splice(0..0, site_patterns);

        if let Some(threshold) = self.element_threshold {
            heuristics.element_threshold = threshold;
        }
        heuristics
    }

    /// Check if this profile is effectively empty
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a directive line from a site profile
pub fn parse_directive(line: &str) -> Result<Directive> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(GleanerError::ProfileError("Empty or comment line".to_string()));
    }

    let Some((key, value)) = line.split_once(':') else {
        return Err(GleanerError::ProfileError(format!("Invalid directive format: {line}")));
    };
    let key = key.trim();
    let value = value.trim();

    if value.is_empty() {
        return Err(GleanerError::ProfileError(format!("Missing value for directive: {key}")));
    }

    match key {
        "source" => Ok(Directive::Source(value.to_string())),

        "binding" => {
            let (expression, label) = split_label(value);
            Ok(Directive::Binding(expression, label))
        }
        "script" => {
            let (selector, label) = split_label(value);
            Ok(Directive::Script(selector, label))
        }
        "script_type" => Ok(Directive::ScriptType(value.to_string())),

        "container" => Ok(Directive::Container(value.to_string())),
        "field" => {
            let (field, aliases) = value
                .split_once('=')
                .ok_or_else(|| GleanerError::ProfileError(format!("Invalid field format: {value}")))?;
            let aliases: Vec<String> = aliases
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            let field = field.trim();
            if field.is_empty() || aliases.is_empty() {
                return Err(GleanerError::ProfileError(format!("Invalid field format: {value}")));
            }
            Ok(Directive::Field(field.to_string(), aliases))
        }
        "max_depth" => {
            let depth = value
                .parse()
                .map_err(|_| GleanerError::ProfileError(format!("Invalid max_depth value: {value}")))?;
            Ok(Directive::MaxDepth(depth))
        }

        "card" => Ok(Directive::Card(value.to_string())),
        "card_field" => Ok(Directive::CardField(CardField::parse(value)?)),
        "class_pattern" => {
            let (pattern, weight) = value
                .rsplit_once(char::is_whitespace)
                .and_then(|(pattern, weight)| Some((pattern.trim(), weight.parse::<u32>().ok()?)))
                .unwrap_or((value, DEFAULT_CLASS_PATTERN_WEIGHT));
            regex::Regex::new(pattern)
                .map_err(|e| GleanerError::ProfileError(format!("Invalid class_pattern {pattern}: {e}")))?;
            Ok(Directive::ClassPattern(pattern.to_string(), weight))
        }
        "element_threshold" => {
            let threshold = value
                .parse()
                .map_err(|_| GleanerError::ProfileError(format!("Invalid element_threshold value: {value}")))?;
            Ok(Directive::ElementThreshold(threshold))
        }

        "min_confidence" => {
            let percent = value
                .trim_end_matches('%')
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| GleanerError::ProfileError(format!("Invalid min_confidence value: {value}")))?;
            Ok(Directive::MinConfidence(percent))
        }
        "default_probes" => Ok(Directive::DefaultProbes(parse_boolean(value)?)),

        "test_url" => Ok(Directive::TestUrl(value.to_string())),

        _ => Err(GleanerError::ProfileError(format!("Unknown directive: {key}"))),
    }
}

fn prepend<T: Clone>(list: &mut Vec<T>, front: &[T]) {
    list.splice(0..0, front.iter().cloned());
}

/// Split `<target> | <label>`, labelling with the target when no label is given
///
/// The bar needs a space on both sides so `[lang|=en]` stays in the selector.
fn split_label(value: &str) -> (String, String) {
    match value.rsplit_once(" | ") {
        Some((target, label)) if !label.trim().is_empty() => (target.trim().to_string(), label.trim().to_string()),
        _ => (value.to_string(), value.to_string()),
    }
}

/// Parse a boolean value from a site profile
fn parse_boolean(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(GleanerError::ProfileError(format!("Invalid boolean value: {value}"))),
    }
}
