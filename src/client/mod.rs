//! HTTP client for the eCFR admin and versioner APIs.
//!
//! Implements the collaborator traits the engine consumes:
//! agency records from `/admin/v1`, title content and structure from
//! `/versioner/v1`, and correction events from `/admin/v1/corrections`.
//! Transport failures surface as [`MetricsError::UpstreamFetch`]; bodies
//! that cannot be interpreted surface as [`MetricsError::ContentShape`].

use crate::config::MetricsConfig;
use crate::error::{MetricsError, Result};
use crate::models::{CorrectionEvent, TitleContent};
use crate::normalize::{AgencyDirectorySource, RawAgency};
use crate::trends::{CorrectionEventSource, CorrectionScope};
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the public eCFR API.
pub struct EcfrClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AgenciesEnvelope {
    agencies: Vec<RawAgency>,
}

#[derive(Debug, Deserialize)]
struct TitlesEnvelope {
    titles: Vec<TitleSummary>,
}

/// Per-title entry from `/versioner/v1/titles.json`.
#[derive(Debug, Deserialize)]
pub struct TitleSummary {
    pub number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub up_to_date_as_of: Option<NaiveDate>,
    #[serde(default)]
    pub latest_issue_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct CorrectionsEnvelope {
    ecfr_corrections: Vec<RawCorrection>,
}

#[derive(Debug, Deserialize)]
struct RawCorrection {
    id: u64,
    error_corrected: String,
}

impl EcfrClient {
    pub fn new(config: &MetricsConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the title listing and extract each title's most recent known
    /// effective date, for use as the per-title date in the orchestrator.
    pub async fn fetch_title_dates(&self) -> Result<HashMap<u32, NaiveDate>> {
        let url = format!("{}/versioner/v1/titles.json", self.base_url);
        let envelope: TitlesEnvelope = self.get_json(&url).await?;

        Ok(envelope
            .titles
            .into_iter()
            .filter_map(|title| {
                title
                    .up_to_date_as_of
                    .or(title.latest_issue_date)
                    .map(|date| (title.number, date))
            })
            .collect())
    }

    /// Fetch the structural document for a title.
    pub async fn fetch_title_structure(&self, title: u32, date: NaiveDate) -> Result<TitleContent> {
        let url = format!(
            "{}/versioner/v1/structure/{}/title-{}.json",
            self.base_url,
            date.format("%Y-%m-%d"),
            title
        );
        let document: serde_json::Value = self.get_json(&url).await?;
        Ok(TitleContent::Structured(document))
    }

    fn corrections_url(&self, scope: CorrectionScope) -> String {
        match scope {
            CorrectionScope::AllTitles => format!("{}/admin/v1/corrections.json", self.base_url),
            CorrectionScope::Title(title) => {
                format!("{}/admin/v1/corrections/title-{}.json", self.base_url, title)
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| MetricsError::upstream_with_source(format!("GET {}", url), err))?
            .error_for_status()
            .map_err(|err| MetricsError::upstream_with_source(format!("GET {}", url), err))?;

        response
            .text()
            .await
            .map_err(|err| MetricsError::upstream_with_source(format!("GET {} (body)", url), err))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|err| MetricsError::content_shape(format!("{}: {}", url, err)))
    }
}

impl AgencyDirectorySource for EcfrClient {
    fn fetch_agencies(&self) -> BoxFuture<'_, Result<Vec<RawAgency>>> {
        async move {
            let url = format!("{}/admin/v1/agencies.json", self.base_url);
            let envelope: AgenciesEnvelope = self.get_json(&url).await?;
            debug!("Fetched {} agency records", envelope.agencies.len());
            Ok(envelope.agencies)
        }
        .boxed()
    }
}

impl crate::orchestrator::TitleContentSource for EcfrClient {
    fn fetch_title(&self, title: u32, date: NaiveDate) -> BoxFuture<'_, Result<TitleContent>> {
        async move {
            let url = format!(
                "{}/versioner/v1/full/{}/title-{}.xml",
                self.base_url,
                date.format("%Y-%m-%d"),
                title
            );
            debug!("GET {}", url);

            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|err| MetricsError::upstream_with_source(format!("GET {}", url), err))?;

            // The dated snapshot may not exist; fall back once to the
            // latest published version.
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                info!("Title {} not found for {}, trying latest version", title, date);
                let fallback = format!(
                    "{}/versioner/v1/full/latest/title-{}.xml",
                    self.base_url, title
                );
                return Ok(TitleContent::Text(self.get_text(&fallback).await?));
            }

            let body = response
                .error_for_status()
                .map_err(|err| MetricsError::upstream_with_source(format!("GET {}", url), err))?
                .text()
                .await
                .map_err(|err| {
                    MetricsError::upstream_with_source(format!("GET {} (body)", url), err)
                })?;

            Ok(TitleContent::Text(body))
        }
        .boxed()
    }
}

impl CorrectionEventSource for EcfrClient {
    fn fetch_corrections(
        &self,
        scope: CorrectionScope,
    ) -> BoxFuture<'_, Result<Vec<CorrectionEvent>>> {
        async move {
            let url = self.corrections_url(scope);
            let envelope: CorrectionsEnvelope = self.get_json(&url).await?;

            let events = envelope
                .ecfr_corrections
                .into_iter()
                .filter_map(|raw| match parse_correction_timestamp(&raw.error_corrected) {
                    Some(corrected_at) => Some(CorrectionEvent {
                        id: raw.id,
                        corrected_at,
                    }),
                    None => {
                        warn!(
                            "Skipping correction {}: unparsable date '{}'",
                            raw.id, raw.error_corrected
                        );
                        None
                    }
                })
                .collect();

            Ok(events)
        }
        .boxed()
    }
}

/// Parse the upstream `error_corrected` field.
///
/// The feed sends bare `YYYY-MM-DD` dates; full RFC 3339 timestamps are
/// accepted too. Bare dates resolve to UTC midnight.
fn parse_correction_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_date() {
        let parsed = parse_correction_timestamp("2024-03-05").unwrap();
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let parsed = parse_correction_timestamp("2024-03-05T14:30:00Z").unwrap();
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_correction_timestamp("last tuesday").is_none());
    }

    #[test]
    fn test_corrections_envelope_parses() {
        let json = r#"{
            "ecfr_corrections": [
                { "id": 101, "error_corrected": "2024-02-20", "corrective_action": "amended" },
                { "id": 102, "error_corrected": "2024-02-19" }
            ]
        }"#;

        let envelope: CorrectionsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.ecfr_corrections.len(), 2);
        assert_eq!(envelope.ecfr_corrections[0].id, 101);
    }

    #[test]
    fn test_titles_envelope_extracts_dates() {
        let json = r#"{
            "titles": [
                { "number": 7, "name": "Agriculture", "up_to_date_as_of": "2024-05-17" },
                { "number": 9, "latest_issue_date": "2024-01-05" },
                { "number": 35, "name": "Reserved" }
            ]
        }"#;

        let envelope: TitlesEnvelope = serde_json::from_str(json).unwrap();
        let dates: HashMap<u32, NaiveDate> = envelope
            .titles
            .into_iter()
            .filter_map(|t| t.up_to_date_as_of.or(t.latest_issue_date).map(|d| (t.number, d)))
            .collect();

        assert_eq!(dates.len(), 2);
        assert_eq!(dates[&7], NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(dates[&9], NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_corrections_url_by_scope() {
        let client = EcfrClient::new(&MetricsConfig::default());
        assert_eq!(
            client.corrections_url(CorrectionScope::AllTitles),
            "https://www.ecfr.gov/api/admin/v1/corrections.json"
        );
        assert_eq!(
            client.corrections_url(CorrectionScope::Title(7)),
            "https://www.ecfr.gov/api/admin/v1/corrections/title-7.json"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = MetricsConfig {
            base_url: "http://localhost:8080/api/".to_string(),
            ..MetricsConfig::default()
        };
        let client = EcfrClient::new(&config);
        assert_eq!(
            client.corrections_url(CorrectionScope::AllTitles),
            "http://localhost:8080/api/admin/v1/corrections.json"
        );
    }
}
