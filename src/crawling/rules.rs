//! Ordered link extraction rules
//!
//! Each rule pairs a matcher (URL pattern plus the page region links must come
//! from) with a plain handler function. Rules are evaluated in order and the
//! first rule that accepts a link claims it.

use std::collections::HashSet;

use regex::Regex;
use tracing::trace;
use url::Url;

use super::request::CrawlRequest;
use crate::infrastructure::html::{HtmlPage, ListingSelectors, SelectorError, SelectorSpec};

#[derive(Debug, Clone)]
pub struct LinkMatcher {
    pub allow: Regex,
    pub restrict_to: SelectorSpec,
}

impl LinkMatcher {
    pub fn new(allow: &str, restrict_to: &str) -> Result<Self, SelectorError> {
        let allow = Regex::new(allow).map_err(|e| SelectorError::InvalidPattern {
            pattern: allow.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            allow,
            restrict_to: SelectorSpec::parse(restrict_to)?,
        })
    }

    pub fn accepts(&self, link: &Url) -> bool {
        self.allow.is_match(link.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LinkRule {
    pub matcher: LinkMatcher,
    pub handler: fn(Url) -> CrawlRequest,
}

/// Rule table plus the allowed domain filter
#[derive(Debug, Clone)]
pub struct LinkRules {
    rules: Vec<LinkRule>,
    allowed_domains: Vec<String>,
}

impl LinkRules {
    pub fn new(rules: Vec<LinkRule>, allowed_domains: Vec<String>) -> Self {
        Self {
            rules,
            allowed_domains: allowed_domains
                .into_iter()
                .map(|domain| domain.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
        }
    }

    /// Detail links first, then pagination
    pub fn from_listing(
        selectors: &ListingSelectors,
        allowed_domains: Vec<String>,
    ) -> Result<Self, SelectorError> {
        let rules = vec![
            LinkRule {
                matcher: LinkMatcher::new(
                    &selectors.detail_link_allow,
                    &selectors.detail_link_region,
                )?,
                handler: CrawlRequest::detail,
            },
            LinkRule {
                matcher: LinkMatcher::new(
                    &selectors.pagination_allow,
                    &selectors.pagination_region,
                )?,
                handler: CrawlRequest::listing,
            },
        ];
        Ok(Self::new(rules, allowed_domains))
    }

    pub fn rules(&self) -> &[LinkRule] {
        &self.rules
    }

    /// True when the host is one of the allowed domains or a subdomain of one.
    /// An empty allow list admits every host.
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.allowed_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// Apply the rule table to links gathered per rule region.
    ///
    /// `links_in` returns the links found inside a region; each distinct link is
    /// claimed by the first rule that accepts it.
    pub fn apply<F>(&self, mut links_in: F) -> Vec<CrawlRequest>
    where
        F: FnMut(&SelectorSpec) -> Vec<Url>,
    {
        let mut claimed: HashSet<Url> = HashSet::new();
        let mut requests = Vec::new();

        for rule in &self.rules {
            for link in links_in(&rule.matcher.restrict_to) {
                if claimed.contains(&link) || !rule.matcher.accepts(&link) {
                    continue;
                }
                if !self.is_allowed(&link) {
                    trace!(url = %link, "link outside allowed domains");
                    continue;
                }
                claimed.insert(link.clone());
                requests.push((rule.handler)(link));
            }
        }
        requests
    }

    pub fn extract(&self, page: &HtmlPage) -> Vec<CrawlRequest> {
        self.apply(|region| page.links_within(region))
    }
}
