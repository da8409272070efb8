//! Per-agency metrics orchestration.
//!
//! Looks an agency up in the normalized directory, fetches each of its
//! titles through an injected content source, and runs the word counter
//! over whatever comes back. Title fetches run concurrently with a
//! bounded buffer; one bad title never aborts the batch.
//!
//! Agency selection is tracked with a generation token so a slow response
//! for a previously selected agency is discarded instead of overwriting
//! newer results.

use crate::config::MetricsConfig;
use crate::error::{MetricsError, Result};
use crate::models::{AgencyMetrics, TitleContent, TitleWordCount};
use crate::normalize::AgencyDirectory;
use crate::wordcount::count_words;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Source of title content, implemented by the eCFR client and by
/// in-memory fakes in tests.
pub trait TitleContentSource {
    fn fetch_title(&self, title: u32, date: NaiveDate) -> BoxFuture<'_, Result<TitleContent>>;
}

/// Token identifying one agency selection.
///
/// A batch computed under a token that is no longer current is stale and
/// its results are discarded on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionToken {
    generation: u64,
}

/// The metrics orchestrator.
pub struct MetricsOrchestrator {
    config: MetricsConfig,
    current_selection: AtomicU64,
}

impl MetricsOrchestrator {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            current_selection: AtomicU64::new(0),
        }
    }

    /// Start a new agency selection, invalidating all earlier tokens.
    pub fn begin_selection(&self) -> SelectionToken {
        let generation = self.current_selection.fetch_add(1, Ordering::SeqCst) + 1;
        SelectionToken { generation }
    }

    fn is_current(&self, token: SelectionToken) -> bool {
        self.current_selection.load(Ordering::SeqCst) == token.generation
    }

    /// Compute word count metrics for one agency.
    ///
    /// Fails with [`MetricsError::NotFound`] when the agency id is not in
    /// the directory. Per-title fetch or count failures are recorded on
    /// the corresponding entry and the batch continues; the summary is
    /// derived only from error-free entries.
    ///
    /// Returns `Ok(None)` when `token` was superseded by a newer
    /// selection while the batch was in flight.
    pub async fn compute_agency_metrics<S: TitleContentSource>(
        &self,
        agency_id: &str,
        directory: &AgencyDirectory,
        source: &S,
        token: SelectionToken,
    ) -> Result<Option<AgencyMetrics>> {
        let agency = directory
            .get(agency_id)
            .ok_or_else(|| MetricsError::not_found(agency_id))?
            .clone();

        info!(
            "Computing metrics for agency {} ({} titles)",
            agency.id,
            agency.titles.len()
        );

        let concurrency = self.config.concurrency.max(1);
        let results: Vec<TitleWordCount> = stream::iter(agency.titles.iter().map(|&title| {
            let date = directory
                .effective_date(title)
                .unwrap_or(self.config.default_effective_date);

            async move {
                match source.fetch_title(title, date).await {
                    Ok(content) => {
                        let count = count_words(&content);
                        debug!("Title {}: {} words", title, count);
                        TitleWordCount::counted(title, count)
                    }
                    Err(err) => {
                        warn!("Title {} failed: {}", title, err);
                        TitleWordCount::failed(title, err.to_string())
                    }
                }
            }
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;

        // Re-key by the agency's title order; completion order is not
        // meaningful.
        let mut by_title: HashMap<u32, TitleWordCount> = results
            .into_iter()
            .map(|result| (result.title_number, result))
            .collect();
        let ordered: Vec<TitleWordCount> = agency
            .titles
            .iter()
            .filter_map(|title| by_title.remove(title))
            .collect();

        if !self.is_current(token) {
            debug!("Discarding stale batch for agency {}", agency.id);
            return Ok(None);
        }

        Ok(Some(AgencyMetrics::from_results(agency.id, ordered)))
    }
}
