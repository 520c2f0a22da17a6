//! Outgoing crawl requests and their cookie decoration

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::constants::{cookies, site};

/// What the response to a request is expected to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Listing,
    Detail,
}

impl RequestKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: Url,
    pub kind: RequestKind,
    pub cookies: BTreeMap<String, String>,
}

impl CrawlRequest {
    pub fn new(url: Url, kind: RequestKind) -> Self {
        Self {
            url,
            kind,
            cookies: BTreeMap::new(),
        }
    }

    pub fn listing(url: Url) -> Self {
        Self::new(url, RequestKind::Listing)
    }

    pub fn detail(url: Url) -> Self {
        Self::new(url, RequestKind::Detail)
    }

    /// Attach the fixed language / mature content / age-check cookie set
    pub fn add_cookies(&mut self, language: &str) {
        self.cookies
            .insert(cookies::LANGUAGE.to_string(), language.to_string());
        for (name, value) in [
            cookies::MATURE_CONTENT,
            cookies::LAST_AGE_CHECK,
            cookies::BIRTH_TIME,
        ] {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }

    /// Builder-style [`CrawlRequest::add_cookies`]
    #[must_use]
    pub fn with_cookies(mut self, language: &str) -> Self {
        self.add_cookies(language);
        self
    }

    /// `Cookie` header value, `None` when no cookie is attached
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Listing page number from the `page` query parameter, first page when absent
    pub fn page_number(&self) -> u32 {
        page_number(&self.url)
    }
}

/// Listing page number of a URL, first page when absent or unparsable
pub fn page_number(url: &Url) -> u32 {
    url.query_pairs()
        .find(|(key, _)| key == site::PAGE_PARAM)
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .unwrap_or(site::PAGE_NUMBERING_BASE)
}
