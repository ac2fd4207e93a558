use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::confidence::{ConfidenceResult, FieldWeights, score};
use crate::locate::LocateReport;
use crate::page::{ElementSnapshot, Page};
use crate::parse::Document;
use crate::profile::{CardField, SiteProfile};
use crate::record::{FieldMap, Record, fields};
use crate::selector::{SelectorReport, discover};

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[£$€]\s?(\d[\d,]*(?:\.\d+)?)").expect("valid regex"));

static BEDROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:bed|bedroom)s?\b").expect("valid regex"));

static BATHROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:bath|bathroom)s?\b").expect("valid regex"));

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid regex"));

/// Generic selectors tried inside a card when no card field covers the field
const ADDRESS_SELECTORS: &str = "address, [itemprop='address'], [class*='address'], [class*='Address']";
const DESCRIPTION_SELECTORS: &str =
    "[itemprop='description'], [class*='description'], [class*='Description'], [class*='summary'], [class*='Summary']";
const DATE_SELECTORS: &str = "time[datetime], [class*='added'], [class*='Added'], [class*='date'], [class*='Date']";

/// Data attributes that carry a listing identifier on the card element
const ID_ATTRIBUTES: &[&str] = &["data-listing-id", "data-property-id", "data-advert-id", "data-id", "id"];

/// Configuration for page extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Source tag when the profile sets none
    pub default_source: String,
    /// Confidence weights
    pub weights: FieldWeights,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { default_source: "unknown".to_string(), weights: FieldWeights::default() }
    }
}

/// How the records of a page were obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// From an embedded data object, labelled by the probe that found it
    Structured { label: String },
    /// From repeated DOM cards matching a selector
    Dom { selector: String },
    None,
}

/// What happened during one extraction pass
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub locate: LocateReport,
    /// Length of the record array found in the embedded data, if any
    pub record_array_len: Option<usize>,
    /// Array elements that produced no record
    pub unrecognized: usize,
    /// Heuristic selector discovery, when it ran
    pub selector: Option<SelectorReport>,
    /// Cards matched by the chosen selector
    pub cards: usize,
    /// Confidence fell below the profile threshold
    pub low_confidence: bool,
}

/// The result of extracting one page
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub method: ExtractionMethod,
    pub confidence: ConfidenceResult,
    pub diagnostics: Diagnostics,
}

/// Turns one listing card into a record
pub trait CardExtractor {
    fn extract(&self, card: &ElementSnapshot) -> Option<Record>;
}

/// Card extractor driven by `card_field` selectors, with generic fallbacks
/// for every field the selectors leave empty
#[derive(Debug, Clone, Default)]
pub struct SelectorCardExtractor {
    fields: Vec<CardField>,
}

impl SelectorCardExtractor {
    pub fn new(fields: Vec<CardField>) -> Self {
        Self { fields }
    }

    fn fill_from_fields(&self, card: &Document, record: &mut Record) {
        for card_field in &self.fields {
            if record.has_value(&card_field.field) {
                continue;
            }

            let Ok(matches) = card.select(&card_field.selector) else {
                tracing::debug!(selector = %card_field.selector, "invalid card field selector");
                continue;
            };

            let value = matches.iter().find_map(|element| match &card_field.attr {
                Some(attr) => element.attr(attr).map(str::to_string),
                None => Some(element.text()),
            });

            if let Some(value) = value.map(|v| collapse_whitespace(&v)).filter(|v| !v.is_empty()) {
                record.insert(&card_field.field, coerce(&card_field.field, value));
            }
        }
    }

    fn fill_generic(card: &ElementSnapshot, doc: &Document, record: &mut Record) {
        let text = collapse_whitespace(&card.text);

        if !record.has_value(fields::ID)
            && let Some(id) = ID_ATTRIBUTES.iter().find_map(|attr| card.attr(attr)).filter(|v| !v.trim().is_empty())
        {
            record.insert(fields::ID, Value::String(id.trim().to_string()));
        }

        if !record.has_value(fields::URL) {
            let href = match card.attr("href") {
                Some(href) if card.tag == "a" => Some(href.to_string()),
                _ => first_attr(doc, "a[href]", "href"),
            };
            if let Some(href) = href {
                record.insert(fields::URL, Value::String(href));
            }
        }

        if !record.has_value(fields::PRICE)
            && let Some(price) = PRICE_RE.captures(&text).and_then(|c| parse_number(&c[1]))
        {
            record.insert(fields::PRICE, price);
        }

        if !record.has_value(fields::BEDROOMS)
            && let Some(beds) = BEDROOMS_RE.captures(&text).and_then(|c| parse_number(&c[1]))
        {
            record.insert(fields::BEDROOMS, beds);
        }

        if !record.has_value(fields::BATHROOMS)
            && let Some(baths) = BATHROOMS_RE.captures(&text).and_then(|c| parse_number(&c[1]))
        {
            record.insert(fields::BATHROOMS, baths);
        }

        if !record.has_value(fields::IMAGES) {
            let images: Vec<Value> = doc
                .select("img")
                .unwrap_or_default()
                .iter()
                .filter_map(|img| img.attr("src").or_else(|| img.attr("data-src")))
                .filter(|src| !src.starts_with("data:"))
                .map(|src| Value::String(src.to_string()))
                .collect();
            if !images.is_empty() {
                record.insert(fields::IMAGES, Value::Array(images));
            }
        }

        for (field, selectors) in
            [(fields::ADDRESS, ADDRESS_SELECTORS), (fields::DESCRIPTION, DESCRIPTION_SELECTORS), (fields::DATE, DATE_SELECTORS)]
        {
            if record.has_value(field) {
                continue;
            }
            let value = doc.select(selectors).unwrap_or_default().iter().find_map(|element| {
                let value = match element.attr("datetime") {
                    Some(datetime) if field == fields::DATE => datetime.to_string(),
                    _ => collapse_whitespace(&element.text()),
                };
                (!value.is_empty()).then_some(value)
            });
            if let Some(value) = value {
                record.insert(field, Value::String(value));
            }
        }
    }
}

impl CardExtractor for SelectorCardExtractor {
    fn extract(&self, card: &ElementSnapshot) -> Option<Record> {
        let doc = Document::parse_fragment(&card.html);
        let mut record = Record::new();

        self.fill_from_fields(&doc, &mut record);
        Self::fill_generic(card, &doc, &mut record);

        if record.is_empty() { None } else { Some(record) }
    }
}

fn first_attr(doc: &Document, selector: &str, attr: &str) -> Option<String> {
    doc.select(selector)
        .unwrap_or_default()
        .iter()
        .find_map(|element| element.attr(attr).map(str::to_string))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse `1,250` or `3.5` into a JSON number
fn parse_number(text: &str) -> Option<Value> {
    let digits = text.replace(',', "");
    if let Ok(integer) = digits.parse::<u64>() {
        return Some(Value::Number(integer.into()));
    }
    digits.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

/// Numeric fields read from text become numbers when they contain one
fn coerce(field: &str, text: String) -> Value {
    let numeric = [fields::PRICE, fields::BEDROOMS, fields::BATHROOMS, fields::LATITUDE, fields::LONGITUDE];
    if numeric.contains(&field)
        && let Some(number) = NUMBER_RE.find(&text).and_then(|m| parse_number(m.as_str()))
    {
        return number;
    }
    if field == fields::IMAGES {
        return Value::Array(vec![Value::String(text)]);
    }
    Value::String(text)
}

/// Extract listing records from a page with default settings
pub fn extract_page(page: &dyn Page, profile: &SiteProfile) -> Extraction {
    extract_page_with_config(page, profile, &ExtractConfig::default())
}

/// Extract listing records from a page
///
/// Embedded data is preferred. When no record array is found there, the
/// profile's card selectors are tried, then heuristic selector discovery.
/// Every record is stamped with the profile's source tag.
pub fn extract_page_with_config(page: &dyn Page, profile: &SiteProfile, config: &ExtractConfig) -> Extraction {
    let field_map = profile.field_map();
    let mut diagnostics = Diagnostics::default();

    let (mut records, method) = match extract_structured(page, profile, &field_map, &mut diagnostics) {
        Some(found) => found,
        None => extract_cards(page, profile, &field_map, &mut diagnostics),
    };

    let source = profile.source_or(&config.default_source);
    for record in &mut records {
        if !record.has_value(fields::SOURCE) {
            record.insert(fields::SOURCE, Value::String(source.to_string()));
        }
    }

    let confidence = score(&records, &config.weights);
    diagnostics.low_confidence = confidence.is_below(profile.min_confidence());
    if diagnostics.low_confidence && !records.is_empty() {
        tracing::warn!(
            source,
            confidence = confidence.percent,
            threshold = profile.min_confidence(),
            "low extraction confidence"
        );
    }

    tracing::debug!(source, records = records.len(), method = ?method, "page extracted");
    Extraction { records, method, confidence, diagnostics }
}

fn extract_structured(
    page: &dyn Page, profile: &SiteProfile, field_map: &FieldMap, diagnostics: &mut Diagnostics,
) -> Option<(Vec<Record>, ExtractionMethod)> {
    diagnostics.locate = profile.locator().locate_with_report(page);
    let located = diagnostics.locate.found.as_ref()?;

    let Some(array) = profile.record_shape().find(&located.blob) else {
        tracing::debug!(label = %located.label, "embedded data holds no record array");
        return None;
    };
    diagnostics.record_array_len = Some(array.len());

    let records: Vec<Record> = array.iter().filter_map(|raw| field_map.normalize(raw)).collect();
    diagnostics.unrecognized = array.len() - records.len();
    if records.is_empty() {
        return None;
    }

    Some((records, ExtractionMethod::Structured { label: located.label.clone() }))
}

fn extract_cards(
    page: &dyn Page, profile: &SiteProfile, field_map: &FieldMap, diagnostics: &mut Diagnostics,
) -> (Vec<Record>, ExtractionMethod) {
    let known = profile.cards.iter().find_map(|selector| match page.query(selector) {
        Ok(cards) if !cards.is_empty() => Some((selector.clone(), cards)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(selector = %selector, error = %e, "card selector failed");
            None
        }
    });

    let (selector, cards) = match known {
        Some(found) => found,
        None => {
            let report = discover(page, &profile.heuristics());
            let chosen = report.chosen.as_ref().map(|c| c.selector.clone());
            diagnostics.selector = Some(report);

            let Some(selector) = chosen else {
                return (Vec::new(), ExtractionMethod::None);
            };
            let cards = page.query(&selector).unwrap_or_default();
            (selector, cards)
        }
    };
    diagnostics.cards = cards.len();

    let extractor = SelectorCardExtractor::new(profile.card_fields.clone());
    let records: Vec<Record> = cards
        .iter()
        .filter_map(|card| extractor.extract(card))
        .map(|record| field_map.retain_recognized(record))
        .filter(|record| !record.is_empty())
        .collect();

    if records.is_empty() {
        return (records, ExtractionMethod::None);
    }
    (records, ExtractionMethod::Dom { selector })
}
