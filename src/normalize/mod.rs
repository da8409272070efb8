//! Agency record normalization.
//!
//! The admin API returns agency records with inconsistent identifiers
//! (some agencies have a short name, some only a slug) and CFR references
//! that may repeat a title across chapters. This module maps those raw
//! records into canonical [`Agency`] entities and builds the id-keyed
//! directory the orchestrator looks agencies up in.

use crate::error::{MetricsError, Result};
use crate::models::Agency;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// A raw agency record as returned by `/admin/v1/agencies.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAgency {
    /// Full display name.
    #[serde(default)]
    pub name: String,
    /// Short name, e.g. "USDA". May be absent or empty.
    #[serde(default)]
    pub short_name: Option<String>,
    /// URL slug, e.g. "agriculture-department".
    #[serde(default)]
    pub slug: Option<String>,
    /// Upstream display variants, passed through untouched.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub sortable_name: Option<String>,
    /// CFR title/chapter references.
    #[serde(default)]
    pub cfr_references: Vec<CfrReference>,
    /// Child agencies. Present upstream but not flattened here; each
    /// child appears as its own top-level record when requested.
    #[serde(default)]
    pub children: Vec<RawAgency>,
}

/// One CFR reference on a raw agency record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfrReference {
    pub title: u32,
    #[serde(default)]
    pub chapter: Option<String>,
}

/// Outcome of normalizing a batch of raw records.
///
/// Partial-success semantics: malformed records are skipped and their
/// errors collected, never failing the batch.
#[derive(Debug, Default)]
pub struct NormalizedAgencies {
    pub agencies: Vec<Agency>,
    pub errors: Vec<MetricsError>,
}

impl NormalizedAgencies {
    /// Consumes the outcome into a lookup directory, dropping the
    /// per-record errors.
    pub fn into_directory(self) -> AgencyDirectory {
        AgencyDirectory::new(self.agencies)
    }
}

/// Normalize raw agency records into canonical entities.
///
/// Id derivation prefers a non-empty short name and falls back to the
/// slug; a record with neither (or with an empty name) is skipped with a
/// [`MetricsError::Validation`] entry.
pub fn normalize(raw: Vec<RawAgency>) -> NormalizedAgencies {
    let mut outcome = NormalizedAgencies::default();

    for record in raw {
        match normalize_record(&record) {
            Ok(agency) => outcome.agencies.push(agency),
            Err(err) => {
                warn!("Skipping agency record: {}", err);
                outcome.errors.push(err);
            }
        }
    }

    debug!(
        "Normalized {} agencies ({} skipped)",
        outcome.agencies.len(),
        outcome.errors.len()
    );

    outcome
}

/// Normalize a single raw record.
fn normalize_record(record: &RawAgency) -> Result<Agency> {
    if record.name.trim().is_empty() {
        return Err(MetricsError::validation(
            record.slug.as_deref().unwrap_or("<unnamed>"),
            "missing display name",
        ));
    }

    let id = derive_id(record).ok_or_else(|| {
        MetricsError::validation(record.name.as_str(), "missing both short_name and slug")
    })?;

    Ok(Agency {
        id,
        name: record.name.clone(),
        short_name: non_empty(record.short_name.as_deref()),
        titles: dedup_titles(&record.cfr_references),
    })
}

/// Prefer a non-empty short name, fall back to the slug.
fn derive_id(record: &RawAgency) -> Option<String> {
    non_empty(record.short_name.as_deref()).or_else(|| non_empty(record.slug.as_deref()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Extract title numbers, deduplicated in first-seen order.
fn dedup_titles(references: &[CfrReference]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();

    for reference in references {
        if seen.insert(reference.title) {
            titles.push(reference.title);
        }
    }

    titles
}

/// Id-keyed directory over normalized agencies.
///
/// Agencies are held sorted by display name. The directory also carries
/// per-title effective dates (from the versioner titles listing) used by
/// the orchestrator; titles without a known date fall back to the
/// configured default.
#[derive(Debug, Clone, Default)]
pub struct AgencyDirectory {
    agencies: Vec<Agency>,
    by_id: HashMap<String, usize>,
    title_dates: HashMap<u32, NaiveDate>,
}

impl AgencyDirectory {
    /// Build a directory, sorting agencies by name. On duplicate ids the
    /// first record wins.
    pub fn new(mut agencies: Vec<Agency>) -> Self {
        agencies.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_id = HashMap::new();
        for (index, agency) in agencies.iter().enumerate() {
            by_id.entry(agency.id.clone()).or_insert(index);
        }

        Self {
            agencies,
            by_id,
            title_dates: HashMap::new(),
        }
    }

    /// Attach per-title effective dates.
    pub fn with_title_dates(mut self, dates: HashMap<u32, NaiveDate>) -> Self {
        self.title_dates = dates;
        self
    }

    /// Look up an agency by id.
    pub fn get(&self, id: &str) -> Option<&Agency> {
        self.by_id.get(id).map(|&index| &self.agencies[index])
    }

    /// All agencies, sorted by name.
    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    /// The most specific known effective date for a title.
    pub fn effective_date(&self, title: u32) -> Option<NaiveDate> {
        self.title_dates.get(&title).copied()
    }

    pub fn len(&self) -> usize {
        self.agencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agencies.is_empty()
    }
}

/// Source of raw agency records, implemented by the eCFR client and by
/// in-memory fakes in tests.
pub trait AgencyDirectorySource {
    fn fetch_agencies(&self) -> BoxFuture<'_, Result<Vec<RawAgency>>>;
}

/// Fetch and normalize the full agency listing.
pub async fn load_agencies<S: AgencyDirectorySource>(source: &S) -> Result<NormalizedAgencies> {
    let raw = source.fetch_agencies().await?;
    Ok(normalize(raw))
}
