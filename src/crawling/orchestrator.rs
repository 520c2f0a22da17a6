//! Harvest orchestrator
//!
//! Drives the request queue over a [`PageFetcher`]. Fetches run as tasks bounded
//! by a semaphore; each task parses its page synchronously into an owned
//! outcome, so no HTML document ever crosses an await point. Frontier decisions,
//! de-duplication and record assembly all happen on the orchestrator's own loop.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::assembler::ItemAssembler;
use super::clock::{Clock, SystemClock};
use super::dupe_filter::DupeFilter;
use super::fetcher::{FetchError, FetchedPage, PageFetcher};
use super::frontier::{CrawlFrontierController, FrontierDecision, FrontierState, ListingPage};
use super::request::{CrawlRequest, RequestKind};
use super::rules::LinkRules;
use crate::domain::{
    CandidateRecord, NoopReporter, ParseFailureReporter, RecordSink, SinkError, SoftParseFailure,
};
use crate::infrastructure::config::{ConfigError, HarvestConfig, HttpConfig};
use crate::infrastructure::html::{HtmlPage, SiteSelectors};

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Record sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Counters for one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    pub listings_halted: u64,
    /// Listing pages skipped or never requested because of an earlier halt
    pub listings_skipped: u64,
    pub duplicates_filtered: u64,
    pub records_emitted: u64,
    pub rejections: BTreeMap<&'static str, u64>,
    pub soft_parse_failures: u64,
    pub halted_at_page: Option<u32>,
    pub cancelled: bool,
}

impl HarvestStats {
    pub fn rejected(&self) -> u64 {
        self.rejections.values().sum()
    }
}

/// Forwards to the configured reporter and counts what passes through
struct CountingReporter {
    inner: Arc<dyn ParseFailureReporter>,
    count: AtomicU64,
}

impl CountingReporter {
    fn new(inner: Arc<dyn ParseFailureReporter>) -> Self {
        Self {
            inner,
            count: AtomicU64::new(0),
        }
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl ParseFailureReporter for CountingReporter {
    fn report(&self, failure: SoftParseFailure) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.inner.report(failure);
    }
}

/// What a fetch task hands back to the loop
enum PageOutcome {
    Listing(ListingPage),
    Detail(CandidateRecord),
    Failed {
        request: CrawlRequest,
        error: FetchError,
    },
    /// Listing fetch dropped on cancellation
    Abandoned(CrawlRequest),
}

/// Parse a fetched page into an owned outcome. Runs synchronously inside the task.
fn parse_page(page: FetchedPage, selectors: &SiteSelectors, rules: &LinkRules) -> PageOutcome {
    let html = HtmlPage::parse(page.final_url, &page.body);
    match page.request.kind {
        RequestKind::Listing => PageOutcome::Listing(ListingPage {
            url: page.request.url,
            release_dates: selectors.extract_listing_dates(&html),
            requests: rules.extract(&html),
        }),
        RequestKind::Detail => PageOutcome::Detail(selectors.extract_candidate(&html)),
    }
}

pub struct HarvestOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    frontier: CrawlFrontierController,
    rules: Arc<LinkRules>,
    selectors: Arc<SiteSelectors>,
    assembler: ItemAssembler,
    dupe_filter: DupeFilter,
    clock: Arc<dyn Clock>,
    reporter: CountingReporter,
    max_concurrent: usize,
    seed: Url,
}

impl HarvestOrchestrator {
    pub fn from_config(
        harvest: &HarvestConfig,
        http: &HttpConfig,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, HarvestError> {
        let frontier = CrawlFrontierController::new(
            harvest.date_parser(),
            harvest.max_age_days,
            harvest.language.clone(),
        )
        .with_max_listing_pages(harvest.max_listing_pages);

        Ok(Self {
            fetcher,
            frontier,
            rules: Arc::new(harvest.link_rules()?),
            selectors: Arc::new(harvest.site_selectors()?),
            assembler: ItemAssembler::new(
                harvest.normalization_policy(),
                harvest.age_check_marker.clone(),
            ),
            dupe_filter: DupeFilter::new(),
            clock: Arc::new(SystemClock),
            reporter: CountingReporter::new(Arc::new(NoopReporter)),
            max_concurrent: usize::try_from(http.max_concurrent_requests.max(1)).unwrap_or(1),
            seed: harvest.seed_url()?,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ParseFailureReporter>) -> Self {
        self.reporter = CountingReporter::new(reporter);
        self
    }

    /// Crawl from the seed until the frontier halts, the queue drains or
    /// `cancel` fires. Accepted records stream to `sink` as they are assembled.
    ///
    /// On cancellation nothing new is dispatched; in-flight detail pages still
    /// complete and are emitted.
    pub async fn run<S>(
        mut self,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<HarvestStats, HarvestError>
    where
        S: RecordSink + ?Sized,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<PageOutcome> = JoinSet::new();
        let mut queue: VecDeque<CrawlRequest> = VecDeque::new();
        let mut stats = HarvestStats::default();

        let seed = self.frontier.seed(self.seed.clone());
        self.enqueue(seed, &mut queue, &mut stats);
        info!(seed = %self.seed, concurrency = self.max_concurrent, "harvest started");

        loop {
            if cancel.is_cancelled() && !stats.cancelled {
                stats.cancelled = true;
                info!(
                    in_flight = tasks.len(),
                    queued = queue.len(),
                    "cancellation requested, draining in-flight pages"
                );
            }

            while !stats.cancelled {
                let Some(request) = queue.front() else {
                    break;
                };
                if !self.frontier.admits(request) {
                    debug!(url = %request.url, "listing request dropped after halt");
                    stats.listings_skipped += 1;
                    queue.pop_front();
                    continue;
                }
                let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                    break;
                };
                let Some(request) = queue.pop_front() else {
                    break;
                };

                let fetcher = Arc::clone(&self.fetcher);
                let selectors = Arc::clone(&self.selectors);
                let rules = Arc::clone(&self.rules);
                let token = cancel.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    let fetched = if request.kind == RequestKind::Listing {
                        tokio::select! {
                            result = fetcher.fetch(&request) => Some(result),
                            () = token.cancelled() => None,
                        }
                    } else {
                        Some(fetcher.fetch(&request).await)
                    };
                    match fetched {
                        Some(Ok(page)) => parse_page(page, &selectors, &rules),
                        Some(Err(error)) => PageOutcome::Failed { request, error },
                        None => PageOutcome::Abandoned(request),
                    }
                });
            }

            let next = if stats.cancelled {
                tasks.join_next().await
            } else {
                tokio::select! {
                    joined = tasks.join_next() => joined,
                    () = cancel.cancelled() => continue,
                }
            };

            let Some(joined) = next else {
                break;
            };
            match joined {
                Ok(outcome) => self.handle(outcome, sink, &mut queue, &mut stats).await?,
                Err(e) => {
                    error!(error = %e, "fetch task failed");
                    stats.fetch_failures += 1;
                }
            }
        }

        sink.flush().await?;

        stats.listings_skipped += u64::try_from(
            queue
                .iter()
                .filter(|request| request.kind == RequestKind::Listing)
                .count(),
        )
        .unwrap_or(u64::MAX);
        stats.soft_parse_failures = self.reporter.count();
        stats.halted_at_page = match self.frontier.state() {
            FrontierState::Halted { at_page } => Some(at_page),
            FrontierState::Scanning => None,
        };

        info!(
            pages = stats.pages_fetched,
            records = stats.records_emitted,
            rejected = stats.rejected(),
            fetch_failures = stats.fetch_failures,
            soft_parse_failures = stats.soft_parse_failures,
            halted_at_page = ?stats.halted_at_page,
            cancelled = stats.cancelled,
            "harvest finished"
        );
        Ok(stats)
    }

    fn enqueue(
        &mut self,
        request: CrawlRequest,
        queue: &mut VecDeque<CrawlRequest>,
        stats: &mut HarvestStats,
    ) {
        if self.dupe_filter.insert(&request.url) {
            queue.push_back(request);
        } else {
            stats.duplicates_filtered += 1;
        }
    }

    async fn handle<S>(
        &mut self,
        outcome: PageOutcome,
        sink: &mut S,
        queue: &mut VecDeque<CrawlRequest>,
        stats: &mut HarvestStats,
    ) -> Result<(), HarvestError>
    where
        S: RecordSink + ?Sized,
    {
        let now = self.clock.now();
        match outcome {
            PageOutcome::Listing(page) => {
                stats.pages_fetched += 1;
                let page_number = page.page_number();
                match self.frontier.inspect(page, now, &self.reporter) {
                    FrontierDecision::Continue(requests) => {
                        for request in requests {
                            self.enqueue(request, queue, stats);
                        }
                    }
                    FrontierDecision::Halt => {
                        stats.listings_halted += 1;
                    }
                    FrontierDecision::Skip => {
                        debug!(page = page_number, "listing page skipped");
                        stats.listings_skipped += 1;
                    }
                }
            }
            PageOutcome::Detail(candidate) => {
                stats.pages_fetched += 1;
                match self.assembler.assemble(&candidate, now, &self.reporter) {
                    Ok(record) => {
                        sink.accept(&record).await?;
                        stats.records_emitted += 1;
                    }
                    Err(rejection) => {
                        debug!(reason = rejection.reason(), "{rejection}");
                        *stats.rejections.entry(rejection.reason()).or_default() += 1;
                    }
                }
            }
            PageOutcome::Failed { request, error } => {
                warn!(url = %request.url, kind = %request.kind, error = %error, "fetch failed");
                stats.fetch_failures += 1;
            }
            PageOutcome::Abandoned(request) => {
                debug!(url = %request.url, "listing fetch abandoned on cancellation");
                stats.listings_skipped += 1;
            }
        }
        Ok(())
    }
}
