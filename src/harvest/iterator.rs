//! Filtered, cancellable traversal over a collected stream.
//!
//! [`HeaderIterator`] hands out the change records themselves;
//! [`FullRecordIterator`] fetches each visited record's metadata document
//! first, lazily and strictly one at a time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::harvest::collector::CollectedStream;
use crate::harvest::fetcher::fetch_content;
use crate::harvest::traits::{
    HarvestError, HarvestingIterator, IterationResult, IterationState, ReportingIteration,
};
use crate::model::{ChangeRecord, CrawlState, FullRecord};
use crate::traits::RecordLookup;

/// Traversal mode yielding bare [`ChangeRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headers;

/// Traversal mode yielding [`FullRecord`]s fetched through a lookup.
#[derive(Clone)]
pub struct Records {
    lookup: Arc<dyn RecordLookup>,
}

/// Iterator over the records of one collected stream.
///
/// The records are owned by the iterator and never change after
/// collection. Each iterator allows a single traversal.
pub struct RecordIterator<M> {
    mode: M,
    records: Vec<ChangeRecord>,
    crawl_state: CrawlState,
    state: IterationState,
    closed: bool,
}

pub type HeaderIterator = RecordIterator<Headers>;
pub type FullRecordIterator = RecordIterator<Records>;

impl HeaderIterator {
    pub fn new(collected: CollectedStream) -> Self {
        Self::with_mode(Headers, collected)
    }
}

impl FullRecordIterator {
    pub fn new(collected: CollectedStream, lookup: Arc<dyn RecordLookup>) -> Self {
        Self::with_mode(Records { lookup }, collected)
    }
}

impl<M> RecordIterator<M> {
    fn with_mode(mode: M, collected: CollectedStream) -> Self {
        Self {
            mode,
            records: collected.records,
            crawl_state: collected.crawl_state,
            state: IterationState::NotStarted,
            closed: false,
        }
    }

    /// The collected records, in stream order.
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Drives `visitor` over every record admitted by `predicate`, then
    /// settles the final state.
    async fn run<V, P>(&mut self, mut visitor: V, predicate: P) -> Result<(), HarvestError>
    where
        V: Visit,
        P: Fn(&ChangeRecord) -> bool + Send,
    {
        if self.state != IterationState::NotStarted {
            return Err(HarvestError::AlreadyTraversed(self.state));
        }
        self.state = IterationState::Iterating;

        let mut outcome = Ok(IterationState::Completed);
        for record in &self.records {
            if !predicate(record) {
                continue;
            }
            match visitor.visit(record).await {
                Ok(IterationResult::Continue) => {}
                Ok(IterationResult::Terminate) => {
                    outcome = Ok(IterationState::Terminated);
                    break;
                }
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        self.settle(outcome)
    }

    fn settle(
        &mut self,
        outcome: Result<IterationState, HarvestError>,
    ) -> Result<(), HarvestError> {
        match outcome {
            Ok(state) => {
                self.state = state;
                debug!(state = %state, records = self.records.len(), "Iteration finished");
                Ok(())
            }
            Err(err) => {
                self.state = IterationState::Failed;
                error!(error = %err, "Iteration aborted");
                Err(err)
            }
        }
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            trace!(state = %self.state, "Iterator closed");
        }
    }
}

impl<M> Drop for RecordIterator<M> {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Per-record Steps
// ============================================================================

/// What a traversal does with each record the predicate admits.
#[async_trait]
trait Visit: Send {
    async fn visit(&mut self, record: &ChangeRecord) -> Result<IterationResult, HarvestError>;
}

fn processing_failed(record: &ChangeRecord, source: io::Error) -> HarvestError {
    HarvestError::Processing {
        identifier: record.identifier.clone(),
        source,
    }
}

/// Hands the record itself to the callback.
struct ReportHeaders<R>(R);

#[async_trait]
impl<R> Visit for ReportHeaders<R>
where
    R: ReportingIteration<ChangeRecord>,
{
    async fn visit(&mut self, record: &ChangeRecord) -> Result<IterationResult, HarvestError> {
        self.0
            .process(record.clone())
            .await
            .map_err(|source| processing_failed(record, source))
    }
}

/// Fetches the record's content, then hands the full record to the
/// callback. Records without content are skipped.
struct FetchThenReport<R> {
    lookup: Arc<dyn RecordLookup>,
    action: R,
}

#[async_trait]
impl<R> Visit for FetchThenReport<R>
where
    R: ReportingIteration<FullRecord>,
{
    async fn visit(&mut self, record: &ChangeRecord) -> Result<IterationResult, HarvestError> {
        let lookup = self.lookup.as_ref();
        let content = match fetch_content(lookup, &record.identifier).await {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(IterationResult::Continue),
            Err(source) => {
                return Err(HarvestError::Fetch {
                    identifier: record.identifier.clone(),
                    source,
                });
            }
        };
        let full_record = FullRecord::from_fetched(record.clone(), content);
        self.action
            .process(full_record)
            .await
            .map_err(|source| processing_failed(record, source))
    }
}

// ============================================================================
// Iterator Implementations
// ============================================================================

#[async_trait]
impl HarvestingIterator for HeaderIterator {
    type Item = ChangeRecord;

    fn count_records(&self) -> usize {
        self.records.len()
    }

    fn state(&self) -> IterationState {
        self.state
    }

    fn last_crawl_timestamp(&self) -> Option<DateTime<Utc>> {
        self.crawl_state.last_crawl_timestamp
    }

    async fn for_each_filtered<R, P>(
        &mut self,
        action: R,
        predicate: P,
    ) -> Result<(), HarvestError>
    where
        R: ReportingIteration<Self::Item>,
        P: Fn(&ChangeRecord) -> bool + Send,
    {
        self.run(ReportHeaders(action), predicate).await
    }

    fn close(&mut self) {
        self.release();
    }
}

#[async_trait]
impl HarvestingIterator for FullRecordIterator {
    type Item = FullRecord;

    fn count_records(&self) -> usize {
        self.records.len()
    }

    fn state(&self) -> IterationState {
        self.state
    }

    fn last_crawl_timestamp(&self) -> Option<DateTime<Utc>> {
        self.crawl_state.last_crawl_timestamp
    }

    async fn for_each_filtered<R, P>(
        &mut self,
        action: R,
        predicate: P,
    ) -> Result<(), HarvestError>
    where
        R: ReportingIteration<Self::Item>,
        P: Fn(&ChangeRecord) -> bool + Send,
    {
        let visitor = FetchThenReport {
            lookup: Arc::clone(&self.mode.lookup),
            action,
        };
        self.run(visitor, predicate).await
    }

    fn close(&mut self) {
        self.release();
    }
}
