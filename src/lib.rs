//! eCFR Regulatory Metrics Aggregation Engine
//!
//! A library for turning raw Electronic Code of Federal Regulations
//! (eCFR) data into dashboard-ready metrics:
//!
//! - `normalize`: canonical [`Agency`] entities from raw admin API
//!   records, with per-record validation and title deduplication.
//! - `wordcount`: deterministic word counts over title content, whether
//!   the versioner API returned full markup or a structural document.
//! - `trends`: correction events bucketed into sparse, sorted time
//!   series at day, month, or year granularity.
//! - `orchestrator`: concurrent per-title fetch and count for a
//!   selected agency, with partial-failure isolation and stale-selection
//!   discard.
//! - `client`: a reqwest-backed implementation of the collaborator
//!   traits against the public eCFR API.
//!
//! The engine owns no wire format: sources are injected through the
//! `*Source` traits, so tests and alternative transports plug in the same
//! way the bundled client does.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod trends;
pub mod wordcount;

pub use client::EcfrClient;
pub use config::MetricsConfig;
pub use error::{MetricsError, Result};
pub use models::{
    Agency, AgencyMetrics, CorrectionEvent, DateRangePreset, Granularity, TitleContent,
    TitleWordCount, TrendPoint,
};
pub use normalize::{
    load_agencies, normalize, AgencyDirectory, AgencyDirectorySource, NormalizedAgencies, RawAgency,
};
pub use orchestrator::{MetricsOrchestrator, SelectionToken, TitleContentSource};
pub use trends::{aggregate, load_trends, CorrectionEventSource, CorrectionScope};
pub use wordcount::count_words;
