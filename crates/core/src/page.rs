//! The page collaborator.
//!
//! Extraction never talks to a browser directly. It consumes a [`Page`]: a
//! page-script evaluation capability and a DOM query capability. A browser
//! automation layer implements the trait over a live tab; [`HtmlPage`]
//! implements it over a static HTML document, resolving page-global bindings
//! from the inline scripts that would have created them.
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::page::{HtmlPage, Page};
//!
//! let html = r#"<script>window.jsonModel = {"properties": [{"id": 1}]};</script>"#;
//! let page = HtmlPage::parse(html).unwrap();
//! let model = page.evaluate("window.jsonModel.properties").unwrap();
//! assert_eq!(model[0]["id"], 1);
//! ```

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::parse::{Document, Element};
use crate::tree::{extract_balanced_json, lookup_path};
use crate::{GleanerError, Result};

/// Read-only access to a rendered page.
pub trait Page {
    /// Evaluate a read-only page-global expression such as
    /// `window.__NEXT_DATA__.props.pageProps`.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the expression cannot be
    /// evaluated. A binding that exists but holds nothing yields
    /// `Ok(Value::Null)`.
    fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Return every element matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Implementations return an error for invalid selectors or when the DOM
    /// cannot be queried.
    fn query(&self, selector: &str) -> Result<Vec<ElementSnapshot>>;
}

/// An owned view of one DOM element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content.
    pub text: String,
    /// Outer HTML.
    pub html: String,
}

impl ElementSnapshot {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_lowercase(), ..Default::default() }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn class(&self) -> Option<&str> {
        self.attr("class")
    }

    /// Whitespace-separated class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class().unwrap_or_default().split_whitespace()
    }

    /// The `id` attribute, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").map(str::trim).filter(|id| !id.is_empty())
    }
}

impl From<&Element<'_>> for ElementSnapshot {
    fn from(element: &Element<'_>) -> Self {
        Self { tag: element.tag_name(), attributes: element.attrs(), text: element.text(), html: element.outer_html() }
    }
}

/// An inline script captured when the page was parsed.
#[derive(Debug, Clone)]
struct InlineScript {
    id: Option<String>,
    text: String,
}

/// A [`Page`] over a static HTML document.
pub struct HtmlPage {
    document: Document,
    scripts: Vec<InlineScript>,
    url: Option<Url>,
}

impl HtmlPage {
    /// Parse HTML without preprocessing.
    pub fn parse(html: &str) -> Result<Self> {
        Self::from_document(Document::parse(html)?, None)
    }

    /// Parse HTML fetched from `url`, preprocessing it and resolving relative
    /// links against the URL.
    ///
    /// # Errors
    ///
    /// Returns [`GleanerError::InvalidUrl`] if `url` cannot be parsed.
    pub fn with_url(html: &str, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| GleanerError::InvalidUrl(e.to_string()))?;
        let document = Document::parse_with_preprocessing(html, Some(url.clone()))?;
        Self::from_document(document, Some(url))
    }

    /// Parse HTML with preprocessing but no base URL.
    pub fn preprocessed(html: &str) -> Result<Self> {
        Self::from_document(Document::parse_with_preprocessing(html, None)?, None)
    }

    fn from_document(document: Document, url: Option<Url>) -> Result<Self> {
        let scripts = document
            .select("script:not([src])")?
            .iter()
            .map(|script| InlineScript { id: script.attr("id").map(str::to_string), text: script.text() })
            .collect();
        Ok(Self { document, scripts, url })
    }

    /// The page URL, when known.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn title(&self) -> Option<String> {
        self.document.title()
    }

    /// Resolve a page-global binding by name.
    fn resolve_global(&self, name: &str) -> Result<Value> {
        if let Some(script) = self.scripts.iter().find(|s| s.id.as_deref() == Some(name)) {
            return serde_json::from_str(script.text.trim())
                .map_err(|e| GleanerError::EvaluationError(format!("{name}: {e}")));
        }

        let assignment = Regex::new(&format!(
            r#"(?:\b(?:window|self|globalThis)\s*(?:\.\s*{0}|\[\s*["']{0}["']\s*\])|\b(?:var|let|const)\s+{0})\s*=\s*"#,
            regex::escape(name)
        ))
        .map_err(|e| GleanerError::EvaluationError(e.to_string()))?;

        for script in &self.scripts {
            for found in assignment.find_iter(&script.text) {
                let rest = &script.text[found.end()..];
                let Some(literal) = extract_balanced_json(rest) else {
                    continue;
                };
                return serde_json::from_str(literal)
                    .map_err(|e| GleanerError::EvaluationError(format!("{name}: {e}")));
            }
        }

        Err(GleanerError::EvaluationError(format!("{name} is not defined")))
    }
}

impl Page for HtmlPage {
    fn evaluate(&self, expression: &str) -> Result<Value> {
        let expression = expression.trim();
        let expression = ["window.", "self.", "globalThis."]
            .iter()
            .find_map(|prefix| expression.strip_prefix(prefix))
            .unwrap_or(expression);

        let (name, path) = expression.split_once('.').unwrap_or((expression, ""));
        if name.is_empty() {
            return Err(GleanerError::EvaluationError("empty expression".to_string()));
        }

        let root = self.resolve_global(name)?;
        Ok(lookup_path(&root, path).cloned().unwrap_or(Value::Null))
    }

    fn query(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        Ok(self.document.select(selector)?.iter().map(ElementSnapshot::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"
        <html>
        <head>
            <script>
                window.jsonModel = {"properties": [{"id": 11, "price": {"amount": 950}}]};
                var searchConfig = {"page": 2};
            </script>
            <script id="__NEXT_DATA__" type="application/json">{"props": {"pageProps": {"total": 3}}}</script>
            <script src="/bundle.js"></script>
        </head>
        <body>
            <div class="card big" id="property-11" data-testid="result">£950 pcm</div>
        </body>
        </html>
    "#;

    #[test]
    fn test_evaluate_window_assignment() {
        let page = HtmlPage::parse(PAGE).unwrap();
        assert_eq!(page.evaluate("window.jsonModel.properties.0.id").unwrap(), json!(11));
    }

    #[test]
    fn test_evaluate_var_declaration() {
        let page = HtmlPage::parse(PAGE).unwrap();
        assert_eq!(page.evaluate("searchConfig").unwrap(), json!({"page": 2}));
    }

    #[test]
    fn test_evaluate_json_script_by_id() {
        let page = HtmlPage::parse(PAGE).unwrap();
        assert_eq!(page.evaluate("window.__NEXT_DATA__.props.pageProps.total").unwrap(), json!(3));
    }

    #[test]
    fn test_evaluate_missing_path_is_null() {
        let page = HtmlPage::parse(PAGE).unwrap();
        assert_eq!(page.evaluate("window.jsonModel.nothing").unwrap(), Value::Null);
    }

    #[test]
    fn test_evaluate_undefined_binding_errors() {
        let page = HtmlPage::parse(PAGE).unwrap();
        assert!(matches!(page.evaluate("window.__APOLLO_STATE__"), Err(GleanerError::EvaluationError(_))));
    }

    #[test]
    fn test_evaluate_bracket_assignment() {
        let page = HtmlPage::parse(r#"<script>window["__STATE__"] = [1, 2, 3];</script>"#).unwrap();
        assert_eq!(page.evaluate("__STATE__").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_evaluate_js_literal_errors() {
        let page = HtmlPage::parse("<script>window.model = {key: 'value'};</script>").unwrap();
        assert!(page.evaluate("window.model").is_err());
    }

    #[test]
    fn test_query_snapshot() {
        let page = HtmlPage::parse(PAGE).unwrap();
        let cards = page.query("div.card").unwrap();

        assert_eq!(cards.len(), 1);
        let card = &cards[0];
        assert_eq!(card.tag, "div");
        assert_eq!(card.id(), Some("property-11"));
        assert_eq!(card.classes().collect::<Vec<_>>(), vec!["card", "big"]);
        assert!(card.has_attr("data-testid"));
        assert_eq!(card.text, "£950 pcm");
        assert!(card.html.contains("property-11"));
    }

    #[test]
    fn test_query_invalid_selector() {
        let page = HtmlPage::parse(PAGE).unwrap();
        assert!(page.query("div[").is_err());
    }

    #[test]
    fn test_with_url_resolves_links() {
        let page = HtmlPage::with_url(r#"<a class="link" href="/property/1">One</a>"#, "https://example.com/search").unwrap();
        let links = page.query("a.link").unwrap();
        assert_eq!(links[0].attr("href"), Some("https://example.com/property/1"));
        assert_eq!(page.url().map(Url::as_str), Some("https://example.com/search"));
    }

    #[test]
    fn test_snapshot_builder() {
        let snapshot = ElementSnapshot::new("LI").with_attr("class", "result").with_text("2 bed flat");
        assert_eq!(snapshot.tag, "li");
        assert_eq!(snapshot.class(), Some("result"));
        assert_eq!(snapshot.id(), None);
    }
}
