//! Page fetching from URLs, files, and stdin.
//!
//! Listing pages arrive from the network, from saved snapshots on disk, or
//! piped through standard input. URL fetching needs the `fetch` feature.

use std::fs;
use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::Client;
use url::Url;

use crate::page::HtmlPage;
use crate::{GleanerError, Result};

/// HTTP client configuration for fetching listing pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Gleaner/0.3; +https://github.com/stormlightlabs/gleaner)".to_string(),
        }
    }
}

/// Where a page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInput {
    Url(Url),
    File(PathBuf),
    Stdin,
}

impl PageInput {
    /// Classify a command-line argument: `-` is stdin, anything with an
    /// http(s) scheme is a URL, everything else a file path.
    pub fn parse(input: &str) -> Self {
        if input == "-" {
            return PageInput::Stdin;
        }
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => PageInput::Url(url),
            _ => PageInput::File(PathBuf::from(input)),
        }
    }

    /// The page URL, used for profile lookup and link resolution.
    pub fn url(&self) -> Option<&Url> {
        match self {
            PageInput::Url(url) => Some(url),
            _ => None,
        }
    }

    /// Read the raw HTML.
    pub async fn read(&self, config: &FetchConfig) -> Result<String> {
        match self {
            #[cfg(feature = "fetch")]
            PageInput::Url(url) => fetch_url(url.as_str(), config).await,
            #[cfg(not(feature = "fetch"))]
            PageInput::Url(url) => {
                let _ = config;
                Err(GleanerError::InvalidUrl(format!("{url}: built without the fetch feature")))
            }
            PageInput::File(path) => fetch_file(&path.to_string_lossy()),
            PageInput::Stdin => fetch_stdin(),
        }
    }

    /// Read and parse into a page.
    pub async fn load(&self, config: &FetchConfig) -> Result<HtmlPage> {
        let html = self.read(config).await?;
        self.page(&html)
    }

    /// Parse HTML read from this input, preprocessing against the URL when known.
    pub fn page(&self, html: &str) -> Result<HtmlPage> {
        match self.url() {
            Some(url) => HtmlPage::with_url(html, url.as_str()),
            None => HtmlPage::preprocessed(html),
        }
    }
}

/// Fetches a listing page from a URL.
///
/// Follows redirects, respects the configured timeout, and fails on HTTP
/// error statuses.
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| GleanerError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(GleanerError::InvalidUrl(format!("unsupported scheme: {}", parsed_url.scheme())));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(GleanerError::HttpError)?;

    let timeout = |e: reqwest::Error| {
        if e.is_timeout() { GleanerError::Timeout { timeout: config.timeout } } else { GleanerError::HttpError(e) }
    };

    tracing::debug!(url = %parsed_url, "fetching page");
    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-GB,en;q=0.9")
        .send()
        .await
        .map_err(timeout)?
        .error_for_status()?;

    response.text().await.map_err(timeout)
}

/// Reads a saved page from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(GleanerError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(GleanerError::from)
    }
}

/// Reads a page from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(GleanerError::from)?;

    Ok(buffer)
}
