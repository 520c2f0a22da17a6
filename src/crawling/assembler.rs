//! Item assembly: one candidate in, one typed record or a rejection out

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::domain::{
    CandidateRecord, GameField, GameRecord, ParseFailureReporter, ReleaseDate, SystemRequirements,
};
use crate::normalization::processors::NormalizationPolicy;
use crate::normalization::{FieldValue, NormalizeContext, processor_for};

/// Record-fatal conditions. The record is dropped, the crawl goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Diverted to age verification: {url}")]
    AgeCheckInterstitial { url: String },

    #[error("No numeric id in {url}")]
    MissingId { url: String },

    #[error("No title on {url}")]
    MissingTitle { url: String },
}

impl Rejection {
    /// Short stable label for statistics
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::AgeCheckInterstitial { .. } => "age_check",
            Self::MissingId { .. } => "missing_id",
            Self::MissingTitle { .. } => "missing_title",
        }
    }
}

#[derive(Debug, Default)]
struct RecordDraft {
    id: Option<u64>,
    title: Option<String>,
    description: String,
    num_reviews: Option<i64>,
    release_date: Option<ReleaseDate>,
    specs: Vec<String>,
    tags: Vec<String>,
    price: i64,
    system_requirements: Option<SystemRequirements>,
}

impl RecordDraft {
    fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::Id(id) => self.id = id,
            FieldValue::Title(title) => self.title = title,
            FieldValue::Description(description) => self.description = description,
            FieldValue::NumReviews(n) => self.num_reviews = n,
            FieldValue::ReleaseDate(date) => self.release_date = date,
            FieldValue::Specs(specs) => self.specs = specs,
            FieldValue::Tags(tags) => self.tags = tags,
            FieldValue::Price(price) => self.price = price,
            FieldValue::SystemRequirements(reqs) => self.system_requirements = reqs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemAssembler {
    policy: NormalizationPolicy,
    age_check_marker: String,
}

impl ItemAssembler {
    pub fn new(policy: NormalizationPolicy, age_check_marker: impl Into<String>) -> Self {
        Self {
            policy,
            age_check_marker: age_check_marker.into(),
        }
    }

    pub const fn policy(&self) -> &NormalizationPolicy {
        &self.policy
    }

    /// True when the resolved URL is the age verification page
    pub fn is_age_check(&self, url: &str) -> bool {
        !self.age_check_marker.is_empty() && url.contains(&self.age_check_marker)
    }

    pub fn assemble(
        &self,
        candidate: &CandidateRecord,
        now: DateTime<Utc>,
        reporter: &dyn ParseFailureReporter,
    ) -> Result<GameRecord, Rejection> {
        let url = candidate.url();
        if self.is_age_check(url) {
            return Err(Rejection::AgeCheckInterstitial {
                url: url.to_string(),
            });
        }

        let ctx = NormalizeContext::new(&self.policy, now, reporter);
        let mut draft = RecordDraft::default();
        for field in GameField::ALL {
            draft.apply(processor_for(field)(candidate.fragments(field), &ctx));
        }

        let id = draft.id.ok_or_else(|| Rejection::MissingId {
            url: url.to_string(),
        })?;
        let title = draft.title.ok_or_else(|| Rejection::MissingTitle {
            url: url.to_string(),
        })?;

        debug!(id, title = %title, "record assembled");
        Ok(GameRecord {
            id,
            title,
            description: draft.description,
            num_reviews: draft.num_reviews,
            release_date: draft.release_date,
            specs: draft.specs,
            tags: draft.tags,
            price: draft.price,
            system_requirements: draft.system_requirements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{defaults, site};
    use crate::domain::{CollectingReporter, NoopReporter};
    use crate::normalization::{DateParser, LabelSet, RequirementsSlicing};
    use chrono::{NaiveDate, TimeZone};

    fn assembler() -> ItemAssembler {
        ItemAssembler::new(
            NormalizationPolicy::new(
                defaults::REVIEW_THRESHOLD,
                defaults::MAX_AGE_DAYS,
                LabelSet::default(),
                RequirementsSlicing::Prefix,
                DateParser::new(defaults::DATE_FORMATS),
            ),
            site::AGE_CHECK_MARKER,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 8, 18, 0, 0, 0).unwrap()
    }

    fn portal() -> CandidateRecord {
        CandidateRecord::new("https://store.steampowered.com/app/620/Portal_2/")
            .with(GameField::ReleaseDate, ["18 Aug, 2019"])
            .with(GameField::Title, ["Portal 2"])
            .with(
                GameField::Description,
                ["<div id=\"game_area_description\"><h2>About This Game</h2>Puzzles</div>"],
            )
            .with(GameField::NumReviews, ["(1,234)", "(98,765)"])
            .with(GameField::Specs, ["Single-player", "Co-op"])
            .with(GameField::Tags, ["\n\t\tPuzzle\t\t", "\n\t\tCo-op\t\t"])
            .with(GameField::Price, ["999"])
            .with(
                GameField::SystemRequirements,
                ["Minimum:", "OS:", "Windows 7", "Recommended:", "OS:", "Windows 10"],
            )
    }

    #[test]
    fn assembles_full_record() {
        let record = assembler().assemble(&portal(), now(), &NoopReporter).unwrap();

        assert_eq!(record.id, 620);
        assert_eq!(record.title, "Portal 2");
        assert_eq!(record.description, "<h2>About This Game</h2>Puzzles");
        assert_eq!(record.num_reviews, Some(98_765));
        assert_eq!(
            record.release_date,
            Some(ReleaseDate::Date(NaiveDate::from_ymd_opt(2019, 8, 18).unwrap()))
        );
        assert_eq!(record.specs, ["Single-player", "Co-op"]);
        assert_eq!(record.tags, ["Puzzle", "Co-op"]);
        assert_eq!(record.price, 999);
        let reqs = record.system_requirements.unwrap();
        assert_eq!(reqs.min_os.as_deref(), Some("Windows 7"));
        assert_eq!(reqs.rec_os.as_deref(), Some("Windows 7"));
    }

    #[test]
    fn assembling_twice_is_identical() {
        let assembler = assembler();
        let candidate = portal();
        let first = assembler.assemble(&candidate, now(), &NoopReporter).unwrap();
        let second = assembler.assemble(&candidate, now(), &NoopReporter).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn age_check_diversion_is_rejected() {
        let candidate = CandidateRecord::new("https://store.steampowered.com/agecheck/app/620/")
            .with(GameField::Title, ["Portal 2"]);
        let rejection = assembler().assemble(&candidate, now(), &NoopReporter).unwrap_err();
        assert_eq!(rejection.reason(), "age_check");
    }

    #[test]
    fn missing_id_is_rejected() {
        let candidate = CandidateRecord::new("https://store.steampowered.com/app/portal/")
            .with(GameField::Title, ["Portal 2"]);
        let rejection = assembler().assemble(&candidate, now(), &NoopReporter).unwrap_err();
        assert!(matches!(rejection, Rejection::MissingId { .. }));
    }

    #[test]
    fn missing_title_is_rejected() {
        let candidate = CandidateRecord::new("https://store.steampowered.com/app/620/Portal_2/")
            .with(GameField::Title, ["   "]);
        let rejection = assembler().assemble(&candidate, now(), &NoopReporter).unwrap_err();
        assert_eq!(rejection.reason(), "missing_title");
    }

    #[test]
    fn optional_fields_fall_back_to_sentinels() {
        let reporter = CollectingReporter::new();
        let candidate = CandidateRecord::new("https://store.steampowered.com/app/42/Minimal/")
            .with(GameField::Title, ["Minimal"])
            .with(GameField::ReleaseDate, ["Coming soon"])
            .with(GameField::NumReviews, ["(12)"])
            .with(GameField::Price, ["Free to Play"]);

        let record = assembler().assemble(&candidate, now(), &reporter).unwrap();
        assert_eq!(record.description, "");
        assert_eq!(record.num_reviews, None);
        assert_eq!(record.release_date, Some(ReleaseDate::Raw("Coming soon".to_string())));
        assert_eq!(record.price, 0);
        assert_eq!(record.system_requirements, None);
        assert!(record.specs.is_empty());
        assert_eq!(reporter.len(), 2);
    }

    #[test]
    fn old_release_date_is_nulled_not_rejected() {
        let candidate = portal().with(GameField::ReleaseDate, ["1 Jan, 2010"]);
        // first fragment still wins
        let record = assembler().assemble(&candidate, now(), &NoopReporter).unwrap();
        assert!(record.release_date.is_some());

        let old = CandidateRecord::new("https://store.steampowered.com/app/7/Old/")
            .with(GameField::Title, ["Old"])
            .with(GameField::ReleaseDate, ["1 Jan, 2010"]);
        let record = assembler().assemble(&old, now(), &NoopReporter).unwrap();
        assert_eq!(record.release_date, None);
    }
}
