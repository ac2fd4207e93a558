//! HTML parsing and DOM querying.
//!
//! This module provides the [`Document`] and [`Element`] types that wrap
//! `scraper` for the rest of the crate. [`crate::page::HtmlPage`] builds on
//! them to implement the page collaborator over static HTML, and the card
//! extractor uses [`Document::parse_fragment`] to query inside a single card.
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::parse::Document;
//!
//! let html = r#"
//!     <ul>
//!         <li class="result">1 High Street</li>
//!         <li class="result">2 High Street</li>
//!     </ul>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let cards = doc.select("li.result").unwrap();
//! assert_eq!(cards.len(), 2);
//! ```

use scraper::{Html, Selector};
use url::Url;

use crate::{GleanerError, PreprocessConfig, Result, preprocess};

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses an HTML fragment, such as the outer HTML of a single card.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), base_url: None }
    }

    /// Parses HTML from a string with preprocessing.
    ///
    /// Presentation-only elements are removed and relative links are resolved
    /// against `base_url` before parsing. Script elements survive so that the
    /// structured-data locator can still read them.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gleaner_core::parse::Document;
    ///
    /// let html = "<html><body><style>.x{}</style><div class=\"card\">Flat</div></body></html>";
    /// let doc = Document::parse_with_preprocessing(html, None).unwrap();
    /// assert!(doc.select("style").unwrap().is_empty());
    /// ```
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Result<Self> {
        let config = PreprocessConfig { base_url: base_url.clone(), ..Default::default() };

        let cleaned = preprocess::preprocess_html(html, &config);
        let html = Html::parse_document(&cleaned);

        Ok(Self { html, base_url })
    }

    /// Gets the base URL used for preprocessing.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`GleanerError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Gets the title of the document.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the text content of this element.
    ///
    /// Returns the concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Gets all attributes in source order.
    pub fn attrs(&self) -> Vec<(String, String)> {
        self.element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`GleanerError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| GleanerError::HtmlParseError(format!("Invalid selector: {}", e)))
}
