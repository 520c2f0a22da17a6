//! HTML selection over `scraper`
//!
//! Selector strings follow the pseudo-element convention used by the site profile:
//! - `css ::text` every descendant text node
//! - `css::text` the element's own text nodes
//! - `css::attr(name)` an attribute value
//! - `css` the element's outer HTML

use std::fmt;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::{CandidateRecord, GameField};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidCss { selector: String, message: String },

    #[error("Malformed attribute extractor in '{0}'")]
    MalformedAttr(String),

    #[error("Invalid link pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// What is pulled out of each matched element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    Text,
    OwnText,
    Attr(String),
    OuterHtml,
}

/// A parsed selector string: compiled CSS plus an extraction mode
#[derive(Clone)]
pub struct SelectorSpec {
    raw: String,
    css: Selector,
    extract: Extract,
}

impl SelectorSpec {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let (css, extract) = if let Some(prefix) = trimmed.strip_suffix("::text") {
            if prefix.ends_with(char::is_whitespace) {
                (prefix.trim_end(), Extract::Text)
            } else {
                (prefix, Extract::OwnText)
            }
        } else if let Some(start) = trimmed.find("::attr(") {
            let name = trimmed[start + "::attr(".len()..]
                .strip_suffix(')')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| SelectorError::MalformedAttr(trimmed.to_string()))?;
            (&trimmed[..start], Extract::Attr(name.to_string()))
        } else {
            (trimmed, Extract::OuterHtml)
        };

        // A bare `::text` selects the text of the whole document
        let css = if css.trim().is_empty() { ":root" } else { css.trim() };
        let compiled = Selector::parse(css).map_err(|e| SelectorError::InvalidCss {
            selector: css.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: trimmed.to_string(),
            css: compiled,
            extract,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub const fn extract(&self) -> &Extract {
        &self.extract
    }

    fn values(&self, element: ElementRef<'_>, out: &mut Vec<String>) {
        match &self.extract {
            Extract::Text => out.extend(element.text().map(str::to_string)),
            Extract::OwnText => out.extend(
                element
                    .children()
                    .filter_map(|child| child.value().as_text())
                    .map(|text| text.to_string()),
            ),
            Extract::Attr(name) => {
                if let Some(value) = element.value().attr(name) {
                    out.push(value.to_string());
                }
            }
            Extract::OuterHtml => out.push(element.html()),
        }
    }
}

impl fmt::Debug for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SelectorSpec").field(&self.raw).finish()
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for SelectorSpec {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for SelectorSpec {}

/// A fetched document together with the URL it was finally served from.
///
/// `Html` is not `Send`; pages are parsed and queried synchronously and dropped
/// before any await point.
pub struct HtmlPage {
    url: Url,
    document: Html,
}

impl HtmlPage {
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(body),
        }
    }

    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Raw strings for every element matching the selector, in document order
    pub fn select(&self, spec: &SelectorSpec) -> Vec<String> {
        let mut out = Vec::new();
        for element in self.document.select(&spec.css) {
            spec.values(element, &mut out);
        }
        out
    }

    /// Absolute link targets of anchors inside every element matching `region`
    pub fn links_within(&self, region: &SelectorSpec) -> Vec<Url> {
        let Ok(anchors) = Selector::parse("a[href], area[href]") else {
            return Vec::new();
        };

        let mut links = Vec::new();
        for container in self.document.select(&region.css) {
            for anchor in container.select(&anchors) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                match self.url.join(href.trim()) {
                    Ok(mut link) => {
                        link.set_fragment(None);
                        links.push(link);
                    }
                    Err(e) => debug!(href, error = %e, "skipping unresolvable link"),
                }
            }
        }
        links
    }
}

/// Listing page selectors and link regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub release_dates: String,
    pub detail_link_allow: String,
    pub detail_link_region: String,
    pub pagination_allow: String,
    pub pagination_region: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            release_dates: "div.search_released::text".to_string(),
            detail_link_allow: "/app/.+".to_string(),
            detail_link_region: "#search_result_container".to_string(),
            pagination_allow: r"page=(\d+)".to_string(),
            pagination_region: ".search_pagination_right".to_string(),
        }
    }
}

/// Typed `(field, selector)` list for detail pages, iterated in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    pub fields: Vec<(GameField, String)>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        let fields = [
            (GameField::ReleaseDate, "div.date ::text"),
            (GameField::Title, ".apphub_AppName ::text"),
            (GameField::Description, "#game_area_description"),
            (GameField::NumReviews, ".user_reviews .responsive_hidden ::text"),
            (GameField::Specs, ".game_area_details_specs a ::text"),
            (GameField::Tags, "a.app_tag ::text"),
            (GameField::Price, "div.price::attr(data-price-final)"),
            (
                GameField::SystemRequirements,
                r#".game_area_sys_req[data-os="win"] ::text"#,
            ),
        ];
        Self {
            fields: fields
                .into_iter()
                .map(|(field, selector)| (field, selector.to_string()))
                .collect(),
        }
    }
}

/// Every selector the harvester needs for one store layout, as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
}

/// Compiled form of the page selectors in a [`SiteProfile`]
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    release_dates: SelectorSpec,
    detail_fields: Vec<(GameField, SelectorSpec)>,
}

impl SiteSelectors {
    pub fn compile(profile: &SiteProfile) -> Result<Self, SelectorError> {
        let release_dates = SelectorSpec::parse(&profile.listing.release_dates)?;
        let detail_fields = profile
            .detail
            .fields
            .iter()
            .map(|(field, raw)| SelectorSpec::parse(raw).map(|spec| (*field, spec)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            release_dates,
            detail_fields,
        })
    }

    /// Visible release date fragments of a listing page
    pub fn extract_listing_dates(&self, page: &HtmlPage) -> Vec<String> {
        page.select(&self.release_dates)
    }

    /// Raw candidate for a detail page
    pub fn extract_candidate(&self, page: &HtmlPage) -> CandidateRecord {
        let mut candidate = CandidateRecord::new(page.url().as_str());
        for (field, selector) in &self.detail_fields {
            candidate.extend(*field, page.select(selector));
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div id="search_result_container">
            <a href="https://store.steampowered.com/app/10/Alpha/?snr=1_7_7_230_150_1">
              <div class="search_released">18 Aug, 2019</div>
            </a>
            <a href="/app/20/Beta/"><div class="search_released">  17 Aug, 2019 </div></a>
            <div class="search_pagination_right">
              <a href="?sort_by=Released_DESC&amp;page=2">2</a>
              <a href="?sort_by=Released_DESC&amp;page=3#top">3</a>
            </div>
          </div>
          <a href="/about/">About</a>
        </body></html>
    "#;

    fn listing_page() -> HtmlPage {
        HtmlPage::parse(
            Url::parse("https://store.steampowered.com/search/?sort_by=Released_DESC").unwrap(),
            LISTING,
        )
    }

    #[test]
    fn parses_extraction_modes() {
        assert_eq!(SelectorSpec::parse("div.date ::text").unwrap().extract(), &Extract::Text);
        assert_eq!(
            SelectorSpec::parse("div.search_released::text").unwrap().extract(),
            &Extract::OwnText
        );
        assert_eq!(
            SelectorSpec::parse("div.price::attr(data-price-final)").unwrap().extract(),
            &Extract::Attr("data-price-final".to_string())
        );
        assert_eq!(
            SelectorSpec::parse("#game_area_description").unwrap().extract(),
            &Extract::OuterHtml
        );
    }

    #[test]
    fn rejects_bad_selectors() {
        assert_eq!(SelectorSpec::parse("  ").unwrap_err(), SelectorError::Empty);
        assert!(matches!(
            SelectorSpec::parse("div[").unwrap_err(),
            SelectorError::InvalidCss { .. }
        ));
        assert!(matches!(
            SelectorSpec::parse("div::attr(").unwrap_err(),
            SelectorError::MalformedAttr(_)
        ));
    }

    #[test]
    fn selects_text_attributes_and_html() {
        let page = HtmlPage::parse(
            Url::parse("https://store.steampowered.com/app/1/x/").unwrap(),
            r#"<div class="price" data-price-final="1999"> Buy <b>now</b></div>"#,
        );

        let own = page.select(&SelectorSpec::parse("div.price::text").unwrap());
        assert_eq!(own, vec![" Buy ".to_string()]);

        let all = page.select(&SelectorSpec::parse("div.price ::text").unwrap());
        assert_eq!(all, vec![" Buy ".to_string(), "now".to_string()]);

        let attr = page.select(&SelectorSpec::parse("div.price::attr(data-price-final)").unwrap());
        assert_eq!(attr, vec!["1999".to_string()]);

        let html = page.select(&SelectorSpec::parse("div.price").unwrap());
        assert_eq!(html.len(), 1);
        assert!(html[0].starts_with("<div"));
        assert!(html[0].ends_with("</div>"));
    }

    #[test]
    fn links_are_resolved_within_region_only() {
        let page = listing_page();
        let links = page.links_within(&SelectorSpec::parse(".search_pagination_right").unwrap());
        let urls: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            [
                "https://store.steampowered.com/search/?sort_by=Released_DESC&page=2",
                "https://store.steampowered.com/search/?sort_by=Released_DESC&page=3",
            ]
        );

        let all = page.links_within(&SelectorSpec::parse("#search_result_container").unwrap());
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|link| !link.path().starts_with("/about")));
    }

    #[test]
    fn default_profile_extracts_listing_dates() {
        let selectors = SiteSelectors::compile(&SiteProfile::default()).unwrap();
        let dates = selectors.extract_listing_dates(&listing_page());
        assert_eq!(dates, vec!["18 Aug, 2019".to_string(), "  17 Aug, 2019 ".to_string()]);
    }

    #[test]
    fn default_profile_compiles() {
        let profile = SiteProfile::default();
        let selectors = SiteSelectors::compile(&profile).unwrap();
        assert_eq!(selectors.detail_fields.len(), GameField::ALL.len() - 1);
    }

    #[test]
    fn broken_profile_selector_is_reported() {
        let mut profile = SiteProfile::default();
        profile.detail.fields.push((GameField::Tags, "a.app_tag[".to_string()));
        assert!(matches!(
            SiteSelectors::compile(&profile),
            Err(SelectorError::InvalidCss { .. })
        ));
    }

    #[test]
    fn profile_deserializes_field_pairs() {
        let json = r#"{"detail": {"fields": [["title", "h1 ::text"]]}}"#;
        let profile: SiteProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.detail.fields, vec![(GameField::Title, "h1 ::text".to_string())]);
        assert_eq!(profile.listing, ListingSelectors::default());
    }
}
