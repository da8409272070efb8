//! Correction trend aggregation.
//!
//! Buckets timestamped correction events into a sparse, chronologically
//! sorted series for charting. Buckets with no events are never emitted;
//! gaps in the series mean no corrections were published in that period.

use crate::error::Result;
use crate::models::{CorrectionEvent, DateRangePreset, Granularity, TrendPoint};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use tracing::debug;

/// Which titles a correction fetch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionScope {
    /// Corrections across every title.
    AllTitles,
    /// Corrections for a single title.
    Title(u32),
}

/// Source of correction events, implemented by the eCFR client and by
/// in-memory fakes in tests.
pub trait CorrectionEventSource {
    fn fetch_corrections(&self, scope: CorrectionScope)
        -> BoxFuture<'_, Result<Vec<CorrectionEvent>>>;
}

/// Group correction events into calendar buckets.
///
/// Events outside the inclusive `[start, end]` bounds are dropped before
/// bucketing; an absent bound means unbounded on that side. The returned
/// series is sorted ascending by bucket key (`YYYY-MM-DD` keys sort
/// chronologically under lexicographic order, which the `BTreeMap`
/// provides directly).
pub fn aggregate(
    events: &[CorrectionEvent],
    granularity: Granularity,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();

    for event in events {
        let date = event.corrected_on();
        if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
            continue;
        }
        *buckets.entry(granularity.bucket_key(date)).or_insert(0) += 1;
    }

    debug!(
        "Aggregated {} events into {} {} buckets",
        events.len(),
        buckets.len(),
        granularity
    );

    buckets
        .into_iter()
        .map(|(bucket, changes)| TrendPoint { bucket, changes })
        .collect()
}

/// Fetch correction events and aggregate them into a trend series.
///
/// A fetch failure is batch-fatal: the error propagates as-is and no
/// partial trend is returned. `today` anchors the preset's rolling window
/// so callers (and tests) control the clock.
pub async fn load_trends<S: CorrectionEventSource>(
    source: &S,
    scope: CorrectionScope,
    granularity: Granularity,
    preset: DateRangePreset,
    today: NaiveDate,
) -> Result<Vec<TrendPoint>> {
    let events = source.fetch_corrections(scope).await?;
    let (start, end) = preset.bounds(today);
    Ok(aggregate(&events, granularity, start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use chrono::{TimeZone, Utc};
    use futures::FutureExt;

    fn event(id: u64, year: i32, month: u32, day: u32) -> CorrectionEvent {
        CorrectionEvent {
            id,
            corrected_at: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_month_granularity_merges_same_month() {
        let events = vec![event(1, 2024, 3, 5), event(2, 2024, 3, 28)];
        let trends = aggregate(&events, Granularity::Month, None, None);

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].bucket, "2024-03-01");
        assert_eq!(trends[0].changes, 2);
    }

    #[test]
    fn test_day_granularity_keeps_days_apart() {
        let events = vec![event(1, 2024, 3, 5), event(2, 2024, 3, 28), event(3, 2024, 3, 5)];
        let trends = aggregate(&events, Granularity::Day, None, None);

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].bucket, "2024-03-05");
        assert_eq!(trends[0].changes, 2);
        assert_eq!(trends[1].bucket, "2024-03-28");
        assert_eq!(trends[1].changes, 1);
    }

    #[test]
    fn test_year_granularity() {
        let events = vec![event(1, 2023, 12, 31), event(2, 2024, 1, 1), event(3, 2024, 6, 15)];
        let trends = aggregate(&events, Granularity::Year, None, None);

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].bucket, "2023-01-01");
        assert_eq!(trends[1].bucket, "2024-01-01");
        assert_eq!(trends[1].changes, 2);
    }

    #[test]
    fn test_output_sorted_ascending_and_sparse() {
        let events = vec![event(1, 2024, 5, 1), event(2, 2022, 1, 1), event(3, 2023, 7, 4)];
        let trends = aggregate(&events, Granularity::Day, None, None);

        let buckets: Vec<&str> = trends.iter().map(|t| t.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["2022-01-01", "2023-07-04", "2024-05-01"]);
        assert!(trends.iter().all(|t| t.changes > 0));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let events = vec![
            event(1, 2023, 12, 31), // before start, dropped
            event(2, 2024, 1, 1),   // on start, kept
            event(3, 2024, 1, 31),  // on end, kept
            event(4, 2024, 2, 1),   // after end, dropped
        ];

        let trends = aggregate(
            &events,
            Granularity::Day,
            Some(date(2024, 1, 1)),
            Some(date(2024, 1, 31)),
        );

        let buckets: Vec<&str> = trends.iter().map(|t| t.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["2024-01-01", "2024-01-31"]);
    }

    #[test]
    fn test_no_events_is_empty_series() {
        assert!(aggregate(&[], Granularity::Month, None, None).is_empty());
    }

    struct FakeCorrections {
        events: Result<Vec<CorrectionEvent>>,
    }

    impl CorrectionEventSource for FakeCorrections {
        fn fetch_corrections(
            &self,
            _scope: CorrectionScope,
        ) -> BoxFuture<'_, Result<Vec<CorrectionEvent>>> {
            let result = match &self.events {
                Ok(events) => Ok(events.clone()),
                Err(_) => Err(MetricsError::upstream("corrections feed unavailable")),
            };
            async move { result }.boxed()
        }
    }

    #[tokio::test]
    async fn test_load_trends_applies_preset_window() {
        let source = FakeCorrections {
            events: Ok(vec![event(1, 2021, 6, 1), event(2, 2024, 3, 5)]),
        };

        let trends = load_trends(
            &source,
            CorrectionScope::AllTitles,
            Granularity::Month,
            DateRangePreset::LastYear,
            date(2024, 6, 15),
        )
        .await
        .unwrap();

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].bucket, "2024-03-01");
    }

    #[tokio::test]
    async fn test_load_trends_fetch_failure_is_batch_fatal() {
        let source = FakeCorrections {
            events: Err(MetricsError::upstream("boom")),
        };

        let result = load_trends(
            &source,
            CorrectionScope::Title(7),
            Granularity::Day,
            DateRangePreset::All,
            date(2024, 6, 15),
        )
        .await;

        assert!(matches!(result, Err(MetricsError::UpstreamFetch { .. })));
    }
}
