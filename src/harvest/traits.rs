//! Iteration protocol and error types for the harvest core.
//!
//! This module defines how callers consume a harvested stream:
//! - Per-item callbacks via [`ReportingIteration`]
//! - Cancellable traversal via [`HarvestingIterator`]
//! - Standardized error handling for collection, fetching and iteration

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use thiserror::Error;

use crate::model::ChangeRecord;
use crate::traits::{CrawlError, LookupError};

// ============================================================================
// Callback Protocol
// ============================================================================

/// Verdict of a per-item callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationResult {
    /// Move on to the next matching record
    Continue,

    /// Stop immediately; no further record is visited
    Terminate,
}

/// Per-item callback driven by a [`HarvestingIterator`].
///
/// Any `FnMut(T) -> io::Result<IterationResult>` closure implements this
/// trait. Implement it directly when processing an item needs to await,
/// e.g. to pace requests against a rate-limited endpoint.
///
/// # Errors
///
/// An `Err` stops the iteration; it is reported to the caller wrapped with
/// the identifier of the record being processed.
#[async_trait]
pub trait ReportingIteration<T: Send>: Send {
    async fn process(&mut self, item: T) -> io::Result<IterationResult>;
}

#[async_trait]
impl<T, F> ReportingIteration<T> for F
where
    T: Send + 'static,
    F: FnMut(T) -> io::Result<IterationResult> + Send,
{
    async fn process(&mut self, item: T) -> io::Result<IterationResult> {
        (self)(item)
    }
}

// ============================================================================
// Iterator Trait
// ============================================================================

/// Lifecycle of a single traversal.
///
/// `NotStarted → Iterating → {Completed, Terminated, Failed}`. There is no
/// way back; a new traversal needs a new iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationState {
    NotStarted,
    Iterating,
    Completed,
    Terminated,
    Failed,
}

impl fmt::Display for IterationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterationState::NotStarted => write!(f, "not started"),
            IterationState::Iterating => write!(f, "iterating"),
            IterationState::Completed => write!(f, "completed"),
            IterationState::Terminated => write!(f, "terminated"),
            IterationState::Failed => write!(f, "failed"),
        }
    }
}

/// Cancellable, filtered traversal over the records of one collected stream.
///
/// Items are visited in collection order, one at a time. Any fetch an item
/// needs happens only when the traversal reaches it.
#[async_trait]
pub trait HarvestingIterator: Send {
    /// What the callback receives for each visited record
    type Item: Send + 'static;

    /// Number of collected records, regardless of any filter.
    fn count_records(&self) -> usize;

    fn state(&self) -> IterationState;

    /// Final timestamp reported by the crawl that produced these records.
    fn last_crawl_timestamp(&self) -> Option<DateTime<Utc>>;

    /// Visits every record for which `predicate` holds, until `action`
    /// returns [`IterationResult::Terminate`] or fails.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the callback or a fetch fails, or if this
    /// iterator was already traversed.
    async fn for_each_filtered<R, P>(
        &mut self,
        action: R,
        predicate: P,
    ) -> Result<(), HarvestError>
    where
        R: ReportingIteration<Self::Item>,
        P: Fn(&ChangeRecord) -> bool + Send;

    /// Visits every record not marked deleted.
    async fn for_each_non_deleted<R>(&mut self, action: R) -> Result<(), HarvestError>
    where
        R: ReportingIteration<Self::Item>,
    {
        self.for_each_filtered(action, |record: &ChangeRecord| !record.deleted)
            .await
    }

    /// Releases the iterator. Safe to call any number of times and leaves
    /// any traversal untouched; also runs on drop.
    fn close(&mut self);
}

// ============================================================================
// Error Types
// ============================================================================

/// A collaborator broke its contract. Never a data condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `Refresh` activities must be resolved by the crawler
    #[error("A \"Refresh\" activity should have been handled earlier")]
    UnresolvedRefresh,

    /// The crawler delivered an activity it should have rejected
    #[error("Activity should have been validated earlier: {0}")]
    Unvalidated(String),
}

/// Errors that can occur while fetching a single record's content.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The identifier resolved to more than one metadata document
    #[error("Found {matches} records for '{identifier}', expected at most one")]
    AmbiguousSource { identifier: String, matches: usize },

    /// The lookup itself failed
    #[error("Could not look up '{identifier}': {source}")]
    Lookup {
        identifier: String,
        #[source]
        source: LookupError,
    },
}

impl FetchError {
    /// Identifier of the record that could not be fetched.
    pub fn identifier(&self) -> &str {
        match self {
            FetchError::AmbiguousSource { identifier, .. } => identifier,
            FetchError::Lookup { identifier, .. } => identifier,
        }
    }
}

/// Errors surfaced by stream collection and iteration.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The crawl aborted; no records are returned
    #[error("Harvesting stream '{stream_url}' failed: {source}")]
    Crawl {
        stream_url: String,
        #[source]
        source: CrawlError,
    },

    /// The callback failed for this record
    #[error("Problem while processing: {identifier}")]
    Processing {
        identifier: String,
        #[source]
        source: io::Error,
    },

    /// Content for this record could not be fetched
    #[error("Problem while processing: {identifier}")]
    Fetch {
        identifier: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),

    #[error("Iterator already {0}; start a new harvest to traverse again")]
    AlreadyTraversed(IterationState),
}

impl HarvestError {
    /// Identifier of the record being processed when the failure occurred.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            HarvestError::Processing { identifier, .. } => Some(identifier),
            HarvestError::Fetch { identifier, .. } => Some(identifier),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_is_reporting_iteration() {
        let mut seen = Vec::new();
        let mut action = |item: u32| {
            seen.push(item);
            Ok(IterationResult::Continue)
        };

        let result = action.process(7).await.unwrap();
        assert_eq!(result, IterationResult::Continue);
        assert_eq!(seen, vec![7]);
    }

    #[test]
    fn test_errors_name_the_identifier() {
        let err = HarvestError::Fetch {
            identifier: "z".to_string(),
            source: FetchError::AmbiguousSource {
                identifier: "z".to_string(),
                matches: 2,
            },
        };
        assert_eq!(err.identifier(), Some("z"));
        assert!(err.to_string().contains('z'));

        let traversed = HarvestError::AlreadyTraversed(IterationState::Completed);
        assert_eq!(traversed.identifier(), None);
    }

    #[test]
    fn test_state_display() {
        let err = HarvestError::AlreadyTraversed(IterationState::Terminated);
        assert_eq!(
            err.to_string(),
            "Iterator already terminated; start a new harvest to traverse again"
        );
    }
}
