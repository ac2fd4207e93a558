use regex::Regex;

use crate::page::ElementSnapshot;

/// A regex and the points awarded for each match.
#[derive(Debug, Clone)]
pub struct WeightedPattern {
    pub pattern: Regex,
    pub weight: u32,
}

impl WeightedPattern {
    pub fn new(pattern: &str, weight: u32) -> Result<Self, regex::Error> {
        Ok(Self { pattern: Regex::new(pattern)?, weight })
    }

    fn is_match(&self, haystack: &str) -> bool {
        self.pattern.is_match(haystack)
    }
}

/// Configuration for listing-card scoring
#[derive(Debug, Clone)]
pub struct ElementHeuristics {
    /// Patterns tested against the class attribute, each match adds its weight
    pub class_patterns: Vec<WeightedPattern>,
    /// Patterns tested against the id attribute, each match adds its weight.
    /// The defaults only match numbered listing ids such as `property-12345`.
    pub id_patterns: Vec<WeightedPattern>,
    /// Generic test/id data attributes (`data-testid`, ...)
    pub generic_attributes: Vec<String>,
    /// Weight when any generic attribute is present
    pub generic_attribute_weight: u32,
    /// Listing identifier data attributes (`data-listing-id`, ...)
    pub listing_attributes: Vec<String>,
    /// Weight when any listing attribute is present
    pub listing_attribute_weight: u32,
    /// Patterns tested against the element's text content
    pub text_patterns: Vec<WeightedPattern>,
    /// Minimum score for an element to count towards a selector group
    pub element_threshold: u32,
    /// Minimum number of qualifying elements in a selector group
    pub min_group_size: usize,
}

fn default_pattern(pattern: &str, weight: u32) -> WeightedPattern {
    WeightedPattern::new(pattern, weight).expect("valid default pattern")
}

impl Default for ElementHeuristics {
    fn default() -> Self {
        let class_like = ["property", "listing", "result", "card", "advert"];
        Self {
            class_patterns: class_like.iter().map(|p| default_pattern(&format!("(?i){p}"), 10)).collect(),
            id_patterns: ["property", "listing", "result", "advert"]
                .iter()
                .map(|p| default_pattern(&format!(r"(?i){p}[-_]?\d+$"), 10))
                .collect(),
            generic_attributes: ["data-testid", "data-test", "data-id"].iter().map(|a| a.to_string()).collect(),
            generic_attribute_weight: 5,
            listing_attributes: ["data-listing-id", "data-property-id", "data-listingid", "data-advert-id", "data-lid"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            listing_attribute_weight: 8,
            text_patterns: vec![
                default_pattern(r"[£$€]\s?\d", 3),
                default_pattern(r"(?i)\b\d+\s*(?:bed|bedroom)s?\b", 2),
                default_pattern(
                    r"(?i)\b\d+[a-z]?\s+(?:[a-z]+\s+){0,3}(?:street|st|road|rd|avenue|ave|lane|ln|drive|dr|close|way|court|place|crescent|gardens|terrace)\b",
                    2,
                ),
            ],
            element_threshold: 10,
            min_group_size: 3,
        }
    }
}

/// Result of scoring an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    /// The element's tag name
    pub tag_name: String,
    /// The element's class attribute (if present)
    pub class: Option<String>,
    /// The element's id attribute (if present)
    pub id: Option<String>,
    /// Points from class and id patterns
    pub class_weight: u32,
    /// Points from data attributes
    pub attribute_weight: u32,
    /// Points from text content
    pub text_weight: u32,
    /// Final calculated score
    pub final_score: u32,
}

/// Sum the weights of every class and id pattern that matches
pub fn class_id_weight(element: &ElementSnapshot, heuristics: &ElementHeuristics) -> u32 {
    let sum = |patterns: &[WeightedPattern], value: Option<&str>| -> u32 {
        value
            .map(|v| patterns.iter().filter(|p| p.is_match(v)).map(|p| p.weight).sum())
            .unwrap_or(0)
    };

    sum(&heuristics.class_patterns, element.class()) + sum(&heuristics.id_patterns, element.id())
}

/// Score data attributes
///
/// - any generic test/id attribute: `generic_attribute_weight` (+5)
/// - any listing identifier attribute: `listing_attribute_weight` (+8)
pub fn attribute_weight(element: &ElementSnapshot, heuristics: &ElementHeuristics) -> u32 {
    let mut weight = 0;
    if heuristics.generic_attributes.iter().any(|a| element.has_attr(a)) {
        weight += heuristics.generic_attribute_weight;
    }
    if heuristics.listing_attributes.iter().any(|a| element.has_attr(a)) {
        weight += heuristics.listing_attribute_weight;
    }
    weight
}

/// Score text content: currency amounts (+3), "N bed" (+2), street addresses (+2)
pub fn text_weight(element: &ElementSnapshot, heuristics: &ElementHeuristics) -> u32 {
    heuristics
        .text_patterns
        .iter()
        .filter(|p| p.is_match(&element.text))
        .map(|p| p.weight)
        .sum()
}

/// Calculate the listing-card score for an element
pub fn calculate_score(element: &ElementSnapshot, heuristics: &ElementHeuristics) -> ScoreResult {
    let class_weight = class_id_weight(element, heuristics);
    let attribute_weight = attribute_weight(element, heuristics);
    let text_weight = text_weight(element, heuristics);

    ScoreResult {
        tag_name: element.tag.clone(),
        class: element.class().map(str::to_string),
        id: element.id().map(str::to_string),
        class_weight,
        attribute_weight,
        text_weight,
        final_score: class_weight + attribute_weight + text_weight,
    }
}

/// The final score alone
pub fn score_element(element: &ElementSnapshot, heuristics: &ElementHeuristics) -> u32 {
    calculate_score(element, heuristics).final_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{HtmlPage, Page};
    use rstest::rstest;

    fn first(html: &str, selector: &str) -> ElementSnapshot {
        let page = HtmlPage::parse(html).unwrap();
        page.query(selector).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn test_class_weight_counts_each_pattern() {
        let element = first(r#"<div class="propertyCard">Content</div>"#, "div");
        assert_eq!(class_id_weight(&element, &ElementHeuristics::default()), 20);
    }

    #[rstest]
    #[case("listing-42", 10)]
    #[case("property-12345", 10)]
    #[case("result_7", 10)]
    #[case("advert9", 10)]
    #[case("property-search-form", 0)]
    #[case("listing-filters", 0)]
    #[case("results-header", 0)]
    #[case("property-12345-gallery", 0)]
    fn test_id_weight_needs_listing_number(#[case] id: &str, #[case] expected: u32) {
        let element = ElementSnapshot::new("li").with_attr("id", id);
        assert_eq!(class_id_weight(&element, &ElementHeuristics::default()), expected);
    }

    #[test]
    fn test_class_weight_no_match() {
        let element = first(r#"<div class="container" id="wrapper">Content</div>"#, "div");
        assert_eq!(class_id_weight(&element, &ElementHeuristics::default()), 0);
    }

    #[test]
    fn test_attribute_weight() {
        let heuristics = ElementHeuristics::default();

        let generic = first(r#"<div data-testid="x">a</div>"#, "div");
        assert_eq!(attribute_weight(&generic, &heuristics), 5);

        let listing = first(r#"<div data-listing-id="7">a</div>"#, "div");
        assert_eq!(attribute_weight(&listing, &heuristics), 8);

        let both = first(r#"<div data-test="card" data-property-id="7" data-id="7">a</div>"#, "div");
        assert_eq!(attribute_weight(&both, &heuristics), 13);
    }

    #[test]
    fn test_text_weight() {
        let heuristics = ElementHeuristics::default();

        let element = first("<div>£1,250 pcm · 3 bed flat · 12 Mill Lane</div>", "div");
        assert_eq!(text_weight(&element, &heuristics), 7);

        let plain = first("<div>Sign up for alerts</div>", "div");
        assert_eq!(text_weight(&plain, &heuristics), 0);
    }

    #[test]
    fn test_calculate_score_combined() {
        let html = r#"<article class="result-card" data-listing-id="9">
            <p>$2,400 / month</p>
            <p>2 bedrooms</p>
        </article>"#;
        let element = first(html, "article");
        let result = calculate_score(&element, &ElementHeuristics::default());

        assert_eq!(result.tag_name, "article");
        assert_eq!(result.class, Some("result-card".to_string()));
        assert_eq!(result.id, None);
        assert_eq!(result.class_weight, 20);
        assert_eq!(result.attribute_weight, 8);
        assert_eq!(result.text_weight, 5);
        assert_eq!(result.final_score, 33);
    }

    #[test]
    fn test_custom_heuristics() {
        let heuristics = ElementHeuristics {
            class_patterns: vec![WeightedPattern::new("(?i)annonce", 12).unwrap()],
            ..Default::default()
        };
        let element = ElementSnapshot::new("div").with_attr("class", "annonce-bloc");
        assert_eq!(score_element(&element, &heuristics), 12);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(WeightedPattern::new("(unclosed", 1).is_err());
    }
}
