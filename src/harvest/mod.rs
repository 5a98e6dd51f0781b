//! Harvest module - activity classification and record iteration.
//!
//! This module provides the core of the harvester:
//! - **Classifier**: raw activities to [`ChangeRecord`](crate::ChangeRecord)s via [`classify`]
//! - **Collector**: one crawl of a stream via [`StreamCollector`]
//! - **Fetcher**: single-document lookup via [`fetch_content`]
//! - **Iterators**: filtered, cancellable traversal via [`HarvestingIterator`]
//! - **Errors**: collection, fetch and iteration failures

pub mod classifier;
pub mod collector;
pub mod fetcher;
pub mod iterator;
pub mod throttle;
pub mod traits;

// Re-export commonly used types
pub use traits::{
    FetchError, HarvestError, HarvestingIterator, InvariantViolation, IterationResult,
    IterationState, ReportingIteration,
};

pub use classifier::classify;
pub use collector::{CollectedStream, StreamCollector};
pub use fetcher::fetch_content;
pub use iterator::{FullRecordIterator, HeaderIterator, Headers, RecordIterator, Records};
pub use throttle::Throttled;
