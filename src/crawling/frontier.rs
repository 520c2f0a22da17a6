//! Crawl frontier controller
//!
//! Listing pages are sorted newest first. A page on which no visible release
//! date falls inside the recency window means every later page is older too, so
//! the branch halts there instead of walking the whole catalog.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use url::Url;

use super::request::{self, CrawlRequest, RequestKind};
use crate::domain::{GameField, ParseFailureReporter, SoftParseFailure};
use crate::normalization::DateParser;
use crate::normalization::fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierState {
    Scanning,
    /// Terminal; listing pages numbered `at_page` or later are not requested
    Halted { at_page: u32 },
}

/// What the frontier extracted from one fetched listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub url: Url,
    pub release_dates: Vec<String>,
    /// Requests discovered through the link rules, undecorated
    pub requests: Vec<CrawlRequest>,
}

impl ListingPage {
    pub fn page_number(&self) -> u32 {
        request::page_number(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierDecision {
    /// Recent content found: dispatch these decorated requests
    Continue(Vec<CrawlRequest>),
    /// Nothing recent on this page: stop the branch, dispatch nothing
    Halt,
    /// The branch already halted at an earlier page
    Skip,
}

#[derive(Debug, Clone)]
pub struct CrawlFrontierController {
    date_parser: DateParser,
    max_age_days: i64,
    language: String,
    max_listing_pages: Option<u32>,
    state: FrontierState,
}

impl CrawlFrontierController {
    pub fn new(date_parser: DateParser, max_age_days: i64, language: impl Into<String>) -> Self {
        Self {
            date_parser,
            max_age_days,
            language: language.into(),
            max_listing_pages: None,
            state: FrontierState::Scanning,
        }
    }

    /// Never request listing pages numbered above `limit`
    #[must_use]
    pub const fn with_max_listing_pages(mut self, limit: Option<u32>) -> Self {
        self.max_listing_pages = limit;
        self
    }

    pub const fn state(&self) -> FrontierState {
        self.state
    }

    pub const fn is_halted(&self) -> bool {
        matches!(self.state, FrontierState::Halted { .. })
    }

    /// Attach the fixed cookie set to an outgoing request
    pub fn decorate(&self, mut request: CrawlRequest) -> CrawlRequest {
        request.add_cookies(&self.language);
        request
    }

    /// Decorated request for the seed listing page
    pub fn seed(&self, url: Url) -> CrawlRequest {
        self.decorate(CrawlRequest::listing(url))
    }

    /// Whether a request may still be dispatched. Detail requests always may.
    pub fn admits(&self, request: &CrawlRequest) -> bool {
        if request.kind == RequestKind::Detail {
            return true;
        }

        let page = request.page_number();
        if self.max_listing_pages.is_some_and(|limit| page > limit) {
            return false;
        }
        match self.state {
            FrontierState::Scanning => true,
            FrontierState::Halted { at_page } => page < at_page,
        }
    }

    /// True when some release date on the page is a real date inside the window
    pub fn has_recent_content(
        &self,
        release_dates: &[String],
        now: DateTime<Utc>,
        reporter: &dyn ParseFailureReporter,
    ) -> bool {
        release_dates.iter().any(|raw| {
            if let Some(date) = self.date_parser.parse_date(raw) {
                fields::is_recent(date, self.max_age_days, now)
            } else {
                if !raw.trim().is_empty() {
                    reporter.report(SoftParseFailure::new(GameField::ReleaseDate, raw.as_str()));
                }
                false
            }
        })
    }

    /// Decide what to do with a fetched listing page
    pub fn inspect(
        &mut self,
        page: ListingPage,
        now: DateTime<Utc>,
        reporter: &dyn ParseFailureReporter,
    ) -> FrontierDecision {
        let page_number = page.page_number();

        if let FrontierState::Halted { at_page } = self.state {
            if page_number >= at_page {
                debug!(page = page_number, halted_at = at_page, "listing page after halt skipped");
                return FrontierDecision::Skip;
            }
        }

        if !self.has_recent_content(&page.release_dates, now, reporter) {
            let at_page = match self.state {
                FrontierState::Halted { at_page } => at_page.min(page_number),
                FrontierState::Scanning => page_number,
            };
            self.state = FrontierState::Halted { at_page };
            info!(
                page = page_number,
                dates = page.release_dates.len(),
                max_age_days = self.max_age_days,
                "no recent content on listing page, halting"
            );
            return FrontierDecision::Halt;
        }

        let requests: Vec<CrawlRequest> = page
            .requests
            .into_iter()
            .filter(|request| self.admits(request))
            .map(|request| self.decorate(request))
            .collect();

        debug!(
            page = page_number,
            dispatched = requests.len(),
            "listing page has recent content"
        );
        FrontierDecision::Continue(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{defaults, site};
    use crate::domain::{CollectingReporter, NoopReporter};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 8, 18, 0, 0, 0).unwrap()
    }

    fn controller() -> CrawlFrontierController {
        CrawlFrontierController::new(DateParser::new(defaults::DATE_FORMATS), 2, "english")
    }

    fn listing_url(page: u32) -> Url {
        Url::parse(&format!(
            "https://store.steampowered.com/search/?sort_by=Released_DESC&page={page}"
        ))
        .unwrap()
    }

    fn page(number: u32, dates: &[&str]) -> ListingPage {
        ListingPage {
            url: listing_url(number),
            release_dates: dates.iter().map(|d| (*d).to_string()).collect(),
            requests: vec![
                CrawlRequest::detail(
                    Url::parse(&format!("https://store.steampowered.com/app/{number}/x/")).unwrap(),
                ),
                CrawlRequest::listing(listing_url(number + 1)),
            ],
        }
    }

    #[test]
    fn future_dates_keep_scanning() {
        let mut frontier = controller();
        let decision = frontier.inspect(page(1, &["1 Jan, 2099"]), now(), &NoopReporter);

        let FrontierDecision::Continue(requests) = decision else {
            panic!("expected continue");
        };
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.cookies.contains_key("birthtime")));
        assert_eq!(frontier.state(), FrontierState::Scanning);
    }

    #[test]
    fn any_recent_date_is_enough() {
        let mut frontier = controller();
        let decision = frontier.inspect(
            page(1, &["1 Jan, 2010", "Coming soon", "16 Aug, 2019"]),
            now(),
            &NoopReporter,
        );
        assert!(matches!(decision, FrontierDecision::Continue(_)));
    }

    #[test]
    fn old_page_halts_and_dispatches_nothing() {
        let mut frontier = controller();
        let decision = frontier.inspect(page(4, &["15 Aug, 2019", "1 Jan, 2010"]), now(), &NoopReporter);

        assert_eq!(decision, FrontierDecision::Halt);
        assert_eq!(frontier.state(), FrontierState::Halted { at_page: 4 });
    }

    #[test]
    fn unparsable_dates_never_count_as_recent() {
        let reporter = CollectingReporter::new();
        let mut frontier = controller();
        let decision = frontier.inspect(page(1, &["Coming soon", "TBA"]), now(), &reporter);

        assert_eq!(decision, FrontierDecision::Halt);
        assert_eq!(reporter.len(), 2);
    }

    #[test]
    fn page_without_dates_halts() {
        let mut frontier = controller();
        assert_eq!(frontier.inspect(page(1, &[]), now(), &NoopReporter), FrontierDecision::Halt);
    }

    #[test]
    fn later_pages_are_skipped_after_halt_but_earlier_ones_inspected() {
        let mut frontier = controller();
        assert_eq!(
            frontier.inspect(page(5, &["1 Jan, 2010"]), now(), &NoopReporter),
            FrontierDecision::Halt
        );
        assert_eq!(
            frontier.inspect(page(6, &["18 Aug, 2019"]), now(), &NoopReporter),
            FrontierDecision::Skip
        );

        let decision = frontier.inspect(page(2, &["18 Aug, 2019"]), now(), &NoopReporter);
        let FrontierDecision::Continue(requests) = decision else {
            panic!("expected continue");
        };
        // page 3 is still below the halt point
        assert_eq!(requests.len(), 2);

        assert_eq!(
            frontier.inspect(page(3, &["1 Jan, 2010"]), now(), &NoopReporter),
            FrontierDecision::Halt
        );
        assert_eq!(frontier.state(), FrontierState::Halted { at_page: 3 });
    }

    #[test]
    fn admits_respects_halt_point_and_page_cap() {
        let mut frontier = controller().with_max_listing_pages(Some(10));
        let detail = CrawlRequest::detail(Url::parse("https://store.steampowered.com/app/1/x/").unwrap());

        assert!(frontier.admits(&CrawlRequest::listing(listing_url(10))));
        assert!(!frontier.admits(&CrawlRequest::listing(listing_url(11))));

        let _ = frontier.inspect(page(4, &["1 Jan, 2010"]), now(), &NoopReporter);
        assert!(frontier.admits(&CrawlRequest::listing(listing_url(3))));
        assert!(!frontier.admits(&CrawlRequest::listing(listing_url(4))));
        assert!(frontier.admits(&detail));
    }

    #[test]
    fn seed_request_is_decorated() {
        let frontier = controller();
        let seed = frontier.seed(Url::parse(site::SEED_URL).unwrap());
        assert_eq!(seed.kind, RequestKind::Listing);
        assert_eq!(seed.cookies.get("Steam_language").map(String::as_str), Some("english"));
        assert_eq!(seed.page_number(), 1);
    }
}
