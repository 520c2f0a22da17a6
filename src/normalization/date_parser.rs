//! Free-text release date parsing against an ordered format list

use chrono::NaiveDate;
use tracing::trace;

use crate::domain::{GameField, ParseFailureReporter, ReleaseDate, SoftParseFailure};

/// One accepted format, completed so chrono always sees a full calendar date.
///
/// `%b %Y` has no day, so it is matched as `%b %Y %d` against `<input> 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DateFormat {
    pattern: String,
    completed: String,
    filler: &'static str,
}

impl DateFormat {
    fn new(pattern: &str) -> Self {
        let has_day = ["%d", "%e", "%j"].iter().any(|spec| pattern.contains(spec));
        let has_month = ["%m", "%b", "%B", "%h"]
            .iter()
            .any(|spec| pattern.contains(spec))
            || pattern.contains("%j");

        let (suffix, filler) = match (has_month, has_day) {
            (_, true) => ("", ""),
            (true, false) => (" %d", " 1"),
            (false, false) => (" %m %d", " 1 1"),
        };

        Self {
            pattern: pattern.to_string(),
            completed: format!("{pattern}{suffix}"),
            filler,
        }
    }

    fn parse(&self, input: &str) -> Option<NaiveDate> {
        if self.filler.is_empty() {
            NaiveDate::parse_from_str(input, &self.completed).ok()
        } else {
            NaiveDate::parse_from_str(&format!("{input}{}", self.filler), &self.completed).ok()
        }
    }
}

/// Parses date fragments by trying each configured format in order.
///
/// Order is a priority tie-break: the first format that matches wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    formats: Vec<DateFormat>,
}

impl DateParser {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            formats: formats
                .into_iter()
                .map(|pattern| DateFormat::new(pattern.as_ref()))
                .collect(),
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.formats.iter().map(|format| format.pattern.as_str())
    }

    /// Parse without reporting, `None` when no format matches
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let input = raw.trim();
        if input.is_empty() {
            return None;
        }

        self.formats.iter().find_map(|format| {
            let parsed = format.parse(input);
            if parsed.is_some() {
                trace!(raw = input, pattern = %format.pattern, "date fragment matched");
            }
            parsed
        })
    }

    /// Parse a fragment, falling back to the unchanged raw text.
    ///
    /// The fallback is reported as a soft failure and never raised.
    pub fn parse(&self, raw: &str, reporter: &dyn ParseFailureReporter) -> ReleaseDate {
        if let Some(date) = self.parse_date(raw) {
            ReleaseDate::Date(date)
        } else {
            reporter.report(SoftParseFailure::new(GameField::ReleaseDate, raw));
            ReleaseDate::Raw(raw.to_string())
        }
    }
}

/// One-shot form of [`DateParser::parse`]
pub fn parse<S: AsRef<str>>(
    raw: &str,
    formats: &[S],
    reporter: &dyn ParseFailureReporter,
) -> ReleaseDate {
    DateParser::new(formats).parse(raw, reporter)
}
