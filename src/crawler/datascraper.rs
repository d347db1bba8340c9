// src/crawler/datascraper.rs

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::reconstructor::RawFieldTable;

/// Elements whose text never counts as visible page content.
const HIDDEN_PARENTS: [&str; 5] = ["head", "title", "style", "script", "noscript"];

/// One selector to pull out of a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub selector: String,
    /// Take this attribute instead of the element text.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Resolve the attribute value as a URL relative to the page.
    #[serde(default)]
    pub resolve_links: bool,
}

impl FieldSpec {
    pub fn text(selector: impl Into<String>) -> Self {
        Self { selector: selector.into(), attribute: None, resolve_links: false }
    }

    pub fn attr(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self { selector: selector.into(), attribute: Some(attribute.into()), resolve_links: false }
    }

    pub fn resolved(mut self) -> Self {
        self.resolve_links = true;
        self
    }

    /// The raw field name this selector produces, e.g. `.albumTitle` or `.albumTitle a@href`.
    pub fn raw_name(&self) -> String {
        match &self.attribute {
            Some(attr) => format!("{}@{}", self.selector, attr),
            None => self.selector.clone(),
        }
    }
}

/// A fetched page. The body is parsed on demand so the handle stays `Send`.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self { url: url.into(), body: body.into() }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Extracts each field into one column of the table, keyed by its raw name.
    pub fn select_fields(&self, specs: &[FieldSpec]) -> Result<RawFieldTable, FetchError> {
        let document = self.document();
        let base_url = Url::parse(&self.url).ok();
        let mut table = RawFieldTable::new();

        for spec in specs {
            let selector = parse_selector(&spec.selector)?;
            let values = document
                .select(&selector)
                .map(|element| match &spec.attribute {
                    Some(attr) => {
                        let raw = element.value().attr(attr).unwrap_or_default();
                        match (&base_url, spec.resolve_links) {
                            (Some(base), true) if !raw.is_empty() => resolve(base, raw),
                            _ => raw.trim().to_string(),
                        }
                    }
                    None => clean_text(element),
                })
                .collect();
            table.insert(spec.raw_name(), values);
        }
        Ok(table)
    }

    /// The `href` of the first element matching `selector`, made absolute.
    pub fn link(&self, selector: &str) -> Result<Option<String>, FetchError> {
        let selector = parse_selector(selector)?;
        let document = self.document();
        let base_url = Url::parse(&self.url).map_err(|e| FetchError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let link = document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(|href| resolve(&base_url, href))
            .next();
        Ok(link)
    }

    /// Text a reader would see: everything outside head, scripts and styles.
    pub fn visible_text(&self) -> String {
        let document = self.document();
        let mut buffer = String::with_capacity(self.body.len() / 4);

        for node in document.tree.nodes() {
            let Some(text) = node.value().as_text() else { continue };
            let visible = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .is_some_and(|element| !HIDDEN_PARENTS.contains(&element.name()));
            if !visible {
                continue;
            }
            for word in text.split_whitespace() {
                if !buffer.is_empty() { buffer.push(' '); }
                buffer.push_str(word);
            }
        }
        buffer
    }
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn resolve(base: &Url, href: &str) -> String {
    match base.join(href.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => href.trim().to_string(),
    }
}

/// Joins an element's trimmed text pieces with single spaces.
fn clean_text(element: ElementRef<'_>) -> String {
    let mut buffer = String::new();
    for part in element.text() {
        for word in part.split_whitespace() {
            if !buffer.is_empty() { buffer.push(' '); }
            buffer.push_str(word);
        }
    }
    buffer
}

/// Something that can turn a URL into a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

/// Fetches pages over HTTP with reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url_str: &str) -> Result<Page, FetchError> {
        Url::parse(url_str).map_err(|e| FetchError::InvalidUrl {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;

        let response = self.client.get(url_str).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url_str.to_string(),
                status: response.status().as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page::new(final_url, body))
    }
}
