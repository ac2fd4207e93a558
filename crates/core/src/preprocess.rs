use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

static HIDDEN_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("valid regex"));

/// Configuration for HTML preprocessing
///
/// Script elements are never removed: embedded data objects live in them.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove noscript tags
    pub remove_noscript: bool,
    /// Whether to remove iframe tags
    pub remove_iframes: bool,
    /// Whether to remove svg tags
    pub remove_svg: bool,
    /// Whether to remove canvas tags
    pub remove_canvas: bool,
    /// Whether to remove elements hidden by inline style or the `hidden` attribute
    pub remove_hidden: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_styles: true,
            remove_noscript: true,
            remove_iframes: true,
            remove_svg: true,
            remove_canvas: true,
            remove_hidden: true,
            convert_urls: true,
            base_url: None,
        }
    }
}

/// Preprocess listing-page HTML before DOM discovery
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = html.to_string();

    if config.remove_styles || config.remove_noscript || config.remove_iframes || config.remove_svg || config.remove_canvas
    {
        processed = remove_unwanted_tags(&processed, config);
    }

    processed = remove_comments(&processed);

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.convert_urls
        && let Some(base_url) = &config.base_url
    {
        processed = convert_relative_urls(&processed, base_url);
    }

    processed
}

/// Remove style, noscript, iframe, svg, and canvas tags from HTML
fn remove_unwanted_tags(html: &str, config: &PreprocessConfig) -> String {
    let removals = [
        (config.remove_styles, "style"),
        (config.remove_noscript, "noscript"),
        (config.remove_iframes, "iframe"),
        (config.remove_svg, "svg"),
        (config.remove_canvas, "canvas"),
    ];

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: removals
                .iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, tag)| {
                    lol_html::element!(*tag, |el| {
                        el.remove();
                        Ok(())
                    })
                })
                .collect(),
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }

    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    COMMENT_RE.replace_all(html, "").to_string()
}

/// Convert relative link and image URLs to absolute URLs
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("a[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Ok(absolute) = base_url.join(&href)
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("img", |el| {
                    for attr in ["src", "data-src"] {
                        if let Some(src) = el.get_attribute(attr)
                            && let Ok(absolute) = base_url.join(&src)
                        {
                            el.set_attribute(attr, absolute.as_str()).ok();
                        }
                    }
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }

    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove elements with display:none, visibility:hidden, or a `hidden` attribute
fn remove_hidden_elements(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                if el.tag_name() == "script" {
                    return Ok(());
                }
                if el.has_attribute("hidden") {
                    el.remove();
                    return Ok(());
                }
                if let Some(style) = el.get_attribute("style")
                    && HIDDEN_STYLE_RE.is_match(&style)
                {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }

    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}
