//! Data models for the metrics engine.
//!
//! This module contains the core entities shared across the normalizer,
//! word counter, trend aggregator, and orchestrator.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized agency entity.
///
/// Produced by the normalizer from one raw upstream record and immutable
/// afterwards. `id` is the upstream short name when present, otherwise
/// the slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    /// Stable unique identifier (short name, falling back to slug).
    pub id: String,
    /// Full display name.
    pub name: String,
    /// Upstream short name, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// CFR title numbers this agency regulates, deduplicated in
    /// first-seen order.
    pub titles: Vec<u32>,
}

/// Word count result for a single title.
///
/// `error` and a real count are mutually exclusive: a failed title carries
/// a zero-count sentinel, never a partial count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleWordCount {
    /// CFR title number.
    pub title_number: u32,
    /// Word count, or 0 when `error` is set.
    pub count: u64,
    /// Failure message if the fetch or count failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TitleWordCount {
    /// Creates a successful count entry.
    pub fn counted(title_number: u32, count: u64) -> Self {
        Self {
            title_number,
            count,
            error: None,
        }
    }

    /// Creates a failed entry with the zero-count sentinel.
    pub fn failed(title_number: u32, error: impl Into<String>) -> Self {
        Self {
            title_number,
            count: 0,
            error: Some(error.into()),
        }
    }

    /// True when this entry holds a real count.
    pub fn is_counted(&self) -> bool {
        self.error.is_none()
    }
}

/// A published correction event, consumed from the upstream corrections
/// feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEvent {
    pub id: u64,
    pub corrected_at: DateTime<Utc>,
}

impl CorrectionEvent {
    /// The UTC calendar date of the correction, used for bucketing.
    pub fn corrected_on(&self) -> NaiveDate {
        self.corrected_at.date_naive()
    }
}

/// One point in a correction trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Calendar-aligned bucket key in `YYYY-MM-DD` form.
    pub bucket: String,
    /// Number of corrections in the bucket. Always positive; empty
    /// buckets are never materialized.
    pub changes: u64,
}

/// Calendar bucket size for trend aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    /// Derives the bucket key for a calendar date.
    ///
    /// Day keeps the full date, month forces the day to the first of the
    /// month, year forces January 1. Keys sort chronologically under
    /// plain lexicographic ordering.
    pub fn bucket_key(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Day => date.format("%Y-%m-%d").to_string(),
            Granularity::Month => format!("{:04}-{:02}-01", date.year(), date.month()),
            Granularity::Year => format!("{:04}-01-01", date.year()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Month => write!(f, "month"),
            Granularity::Year => write!(f, "year"),
        }
    }
}

/// Preset date ranges offered for trend filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRangePreset {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "last-1-year")]
    LastYear,
    #[serde(rename = "last-2-years")]
    LastTwoYears,
}

impl DateRangePreset {
    /// Maps the preset to inclusive filter bounds relative to `today`.
    ///
    /// `All` means no filtering at all; the rolling presets bound only the
    /// start, leaving the end open.
    pub fn bounds(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            DateRangePreset::All => (None, None),
            DateRangePreset::LastYear => (today.checked_sub_months(Months::new(12)), None),
            DateRangePreset::LastTwoYears => (today.checked_sub_months(Months::new(24)), None),
        }
    }
}

/// Title content as returned by the versioner API.
///
/// The upstream source returns either full markup text or a structural
/// skeleton depending on the endpoint; the word counter dispatches on the
/// variant instead of probing shapes at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TitleContent {
    /// Raw XML-like markup.
    Text(String),
    /// Nested structural document.
    Structured(serde_json::Value),
}

/// Aggregated word count metrics for one agency selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyMetrics {
    /// The agency these metrics belong to.
    pub agency_id: String,
    /// Per-title results, in the agency's title order. Failed titles
    /// carry an error message and a zero-count sentinel.
    pub results: Vec<TitleWordCount>,
    /// Sum of counts over error-free entries.
    pub total_words: u64,
    /// Number of error-free entries.
    pub titles_counted: usize,
    /// Mean words per successfully counted title (0.0 when none).
    pub average_words: f64,
}

impl AgencyMetrics {
    /// Builds the summary from per-title results.
    ///
    /// Totals and the average are derived only from entries without an
    /// error; failed titles are reported but never skew the summary.
    pub fn from_results(agency_id: impl Into<String>, results: Vec<TitleWordCount>) -> Self {
        let total_words: u64 = results
            .iter()
            .filter(|r| r.is_counted())
            .map(|r| r.count)
            .sum();
        let titles_counted = results.iter().filter(|r| r.is_counted()).count();
        let average_words = if titles_counted > 0 {
            total_words as f64 / titles_counted as f64
        } else {
            0.0
        };

        Self {
            agency_id: agency_id.into(),
            results,
            total_words,
            titles_counted,
            average_words,
        }
    }

    /// Titles whose fetch or count failed.
    pub fn failed_titles(&self) -> Vec<u32> {
        self.results
            .iter()
            .filter(|r| !r.is_counted())
            .map(|r| r.title_number)
            .collect()
    }
}
