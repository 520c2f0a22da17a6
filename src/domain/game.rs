//! Game records and the raw candidates they are built from.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

/// Field names of a game record, used as keys for raw fragments and processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameField {
    Id,
    Title,
    Description,
    NumReviews,
    ReleaseDate,
    Specs,
    Tags,
    Price,
    SystemRequirements,
}

impl GameField {
    /// Every field, in assembly order
    pub const ALL: [Self; 9] = [
        Self::Id,
        Self::Title,
        Self::Description,
        Self::NumReviews,
        Self::ReleaseDate,
        Self::Specs,
        Self::Tags,
        Self::Price,
        Self::SystemRequirements,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::NumReviews => "num_reviews",
            Self::ReleaseDate => "release_date",
            Self::Specs => "specs",
            Self::Tags => "tags",
            Self::Price => "price",
            Self::SystemRequirements => "system_requirements",
        }
    }
}

impl fmt::Display for GameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release date: either a real calendar date or the raw text no format matched.
///
/// A `Raw` value is a soft failure signal, never a date.
///
/// Both variants serialize as a bare JSON string, so reading a record back is
/// lossy: a `Raw` text that happens to be ISO-shaped (`"2019-08-18"`) comes
/// back as `Date`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReleaseDate {
    Date(NaiveDate),
    Raw(String),
}

impl ReleaseDate {
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Raw(_) => None,
        }
    }

    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

/// Minimum / recommended hardware requirements. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemRequirements {
    #[serde(rename = "minOS")]
    pub min_os: Option<String>,
    #[serde(rename = "minCPU")]
    pub min_cpu: Option<String>,
    #[serde(rename = "minRAM")]
    pub min_ram: Option<String>,
    #[serde(rename = "minGPU")]
    pub min_gpu: Option<String>,
    #[serde(rename = "recOS")]
    pub rec_os: Option<String>,
    #[serde(rename = "recCPU")]
    pub rec_cpu: Option<String>,
    #[serde(rename = "recRAM")]
    pub rec_ram: Option<String>,
    #[serde(rename = "recGPU")]
    pub rec_gpu: Option<String>,
}

impl SystemRequirements {
    /// True when no label was found at all
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min_os.is_none()
            && self.min_cpu.is_none()
            && self.min_ram.is_none()
            && self.min_gpu.is_none()
            && self.rec_os.is_none()
            && self.rec_cpu.is_none()
            && self.rec_ram.is_none()
            && self.rec_gpu.is_none()
    }
}

/// Final typed record for one catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// `None` when below the acceptance threshold
    pub num_reviews: Option<i64>,
    /// `None` when the release date is older than the recency window
    pub release_date: Option<ReleaseDate>,
    pub specs: Vec<String>,
    pub tags: Vec<String>,
    /// Minor currency units, 0 when unparsable
    pub price: i64,
    pub system_requirements: Option<SystemRequirements>,
}

/// Raw fragments extracted from one detail page, keyed by field.
///
/// Selector output is never guaranteed single-valued, so every field maps to a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    url: String,
    fragments: BTreeMap<GameField, Vec<String>>,
}

impl CandidateRecord {
    /// Create a candidate for the resolved detail page URL.
    ///
    /// Numeric path segments of the URL are seeded as the `Id` fragments.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let mut fragments = BTreeMap::new();

        if let Ok(parsed) = Url::parse(&url) {
            let ids: Vec<String> = parsed
                .path_segments()
                .into_iter()
                .flatten()
                .filter(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
                .map(str::to_string)
                .collect();
            if !ids.is_empty() {
                fragments.insert(GameField::Id, ids);
            }
        }

        Self { url, fragments }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Append one raw fragment for a field
    pub fn push(&mut self, field: GameField, value: impl Into<String>) {
        self.fragments.entry(field).or_default().push(value.into());
    }

    /// Append several raw fragments for a field
    pub fn extend<I, S>(&mut self, field: GameField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments
            .entry(field)
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Raw fragments for a field, empty when the selector found nothing
    #[must_use]
    pub fn fragments(&self, field: GameField) -> &[String] {
        self.fragments.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Builder-style variant of [`CandidateRecord::extend`]
    #[must_use]
    pub fn with<I, S>(mut self, field: GameField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend(field, values);
        self
    }
}
