//! Typed processor table: one `(raw fragments) -> typed value` function per field.
//!
//! Every processor is total. Missing or garbled input falls back to the field's
//! sentinel and, where useful, a soft failure is reported.

use chrono::{DateTime, Utc};

use super::date_parser::DateParser;
use super::fields;
use super::requirements::{self, LabelSet, RequirementsSlicing};
use crate::domain::{
    GameField, ParseFailureReporter, ReleaseDate, SoftParseFailure, SystemRequirements,
};

/// Immutable normalization settings, built once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationPolicy {
    pub review_threshold: i64,
    pub max_age_days: i64,
    pub labels: LabelSet,
    pub slicing: RequirementsSlicing,
    pub date_parser: DateParser,
}

impl NormalizationPolicy {
    pub fn new(
        review_threshold: i64,
        max_age_days: i64,
        labels: LabelSet,
        slicing: RequirementsSlicing,
        date_parser: DateParser,
    ) -> Self {
        Self {
            review_threshold,
            max_age_days,
            labels,
            slicing,
            date_parser,
        }
    }
}

/// Everything a processor may depend on. `now` is explicit so results are reproducible.
#[derive(Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub policy: &'a NormalizationPolicy,
    pub now: DateTime<Utc>,
    pub reporter: &'a dyn ParseFailureReporter,
}

impl<'a> NormalizeContext<'a> {
    pub fn new(
        policy: &'a NormalizationPolicy,
        now: DateTime<Utc>,
        reporter: &'a dyn ParseFailureReporter,
    ) -> Self {
        Self {
            policy,
            now,
            reporter,
        }
    }
}

/// Output of one processor, tagged by the field it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Id(Option<u64>),
    Title(Option<String>),
    Description(String),
    NumReviews(Option<i64>),
    ReleaseDate(Option<ReleaseDate>),
    Specs(Vec<String>),
    Tags(Vec<String>),
    Price(i64),
    SystemRequirements(Option<SystemRequirements>),
}

pub type FieldProcessor = fn(&[String], &NormalizeContext<'_>) -> FieldValue;

/// Processor for a field
pub fn processor_for(field: GameField) -> FieldProcessor {
    match field {
        GameField::Id => id,
        GameField::Title => title,
        GameField::Description => description,
        GameField::NumReviews => num_reviews,
        GameField::ReleaseDate => release_date,
        GameField::Specs => specs,
        GameField::Tags => tags,
        GameField::Price => price,
        GameField::SystemRequirements => system_requirements,
    }
}

fn first_non_blank(raw: &[String]) -> Option<&str> {
    raw.iter().map(|value| value.trim()).find(|value| !value.is_empty())
}

fn trimmed_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn id(raw: &[String], _ctx: &NormalizeContext<'_>) -> FieldValue {
    FieldValue::Id(raw.iter().find_map(|value| value.trim().parse::<u64>().ok()))
}

pub fn title(raw: &[String], _ctx: &NormalizeContext<'_>) -> FieldValue {
    FieldValue::Title(first_non_blank(raw).map(str::to_string))
}

pub fn description(raw: &[String], _ctx: &NormalizeContext<'_>) -> FieldValue {
    FieldValue::Description(fields::strip_wrapper(&raw.concat()))
}

pub fn num_reviews(raw: &[String], ctx: &NormalizeContext<'_>) -> FieldValue {
    let count = fields::extract_review_count(raw);
    FieldValue::NumReviews(fields::num_reviews_filter(count, ctx.policy.review_threshold))
}

pub fn release_date(raw: &[String], ctx: &NormalizeContext<'_>) -> FieldValue {
    let Some(first) = first_non_blank(raw) else {
        return FieldValue::ReleaseDate(None);
    };
    let parsed = ctx.policy.date_parser.parse(first, ctx.reporter);
    FieldValue::ReleaseDate(fields::release_date_filter(
        parsed,
        ctx.policy.max_age_days,
        ctx.now,
    ))
}

pub fn specs(raw: &[String], _ctx: &NormalizeContext<'_>) -> FieldValue {
    FieldValue::Specs(trimmed_list(raw))
}

pub fn tags(raw: &[String], _ctx: &NormalizeContext<'_>) -> FieldValue {
    FieldValue::Tags(trimmed_list(raw))
}

pub fn price(raw: &[String], ctx: &NormalizeContext<'_>) -> FieldValue {
    let Some(first) = first_non_blank(raw) else {
        return FieldValue::Price(0);
    };
    let value = fields::to_int(first, 0);
    if value == 0 && first.parse::<i64>().is_err() {
        ctx.reporter
            .report(SoftParseFailure::new(GameField::Price, first));
    }
    FieldValue::Price(value)
}

pub fn system_requirements(raw: &[String], ctx: &NormalizeContext<'_>) -> FieldValue {
    if first_non_blank(raw).is_none() {
        return FieldValue::SystemRequirements(None);
    }

    let parsed = requirements::parse_with(raw, &ctx.policy.labels, ctx.policy.slicing);
    if parsed.is_empty() {
        ctx.reporter.report(SoftParseFailure::new(
            GameField::SystemRequirements,
            raw.join(" "),
        ));
    }
    FieldValue::SystemRequirements(Some(parsed))
}
