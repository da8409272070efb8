//! Error types for the metrics engine.
//!
//! Failures fall into four categories with different blast radii:
//! per-record validation problems and per-title fetch failures are
//! collected next to their result entries, while an unknown agency or
//! a failed correction fetch fails the whole call.

use thiserror::Error;

/// Unified error type for metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A raw agency record is malformed or ambiguous. Never fatal to a
    /// batch; the offending record is skipped and the error collected.
    #[error("invalid agency record '{record}': {reason}")]
    Validation { record: String, reason: String },

    /// The requested agency id is not present in the directory. Fatal to
    /// the metrics call.
    #[error("agency '{agency_id}' not found")]
    NotFound { agency_id: String },

    /// An upstream collaborator (eCFR API or injected source) failed.
    /// Isolated per title in the orchestrator; fatal in the trend loader.
    #[error("upstream fetch failed: {context}")]
    UpstreamFetch {
        context: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A response body could not be interpreted as either markup text or
    /// a structural document.
    #[error("unrecognized title content: {detail}")]
    ContentShape { detail: String },
}

impl MetricsError {
    pub fn validation(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(agency_id: impl Into<String>) -> Self {
        Self::NotFound {
            agency_id: agency_id.into(),
        }
    }

    pub fn upstream(context: impl Into<String>) -> Self {
        Self::UpstreamFetch {
            context: context.into(),
            source: None,
        }
    }

    pub fn upstream_with_source(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::UpstreamFetch {
            context: context.into(),
            source: Some(source),
        }
    }

    pub fn content_shape(detail: impl Into<String>) -> Self {
        Self::ContentShape {
            detail: detail.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MetricsError>;
