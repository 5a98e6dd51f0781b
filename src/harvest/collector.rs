//! Drives one crawl of an activity stream and accumulates change records.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::harvest::classifier::classify;
use crate::harvest::traits::{HarvestError, InvariantViolation};
use crate::model::{Activity, ChangeRecord, CrawlState};
use crate::traits::{ActivityHandler, CrawlError, StreamCrawler};

/// Records of one completed crawl, in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedStream {
    pub records: Vec<ChangeRecord>,
    pub crawl_state: CrawlState,
}

/// [`ActivityHandler`] that classifies every supported activity and keeps
/// the results in arrival order.
///
/// A collector serves exactly one crawl; each collection builds its own.
#[derive(Debug)]
pub struct StreamCollector {
    resource_type: String,
    records: Vec<ChangeRecord>,
    crawl_state: CrawlState,
    violation: Option<InvariantViolation>,
}

impl StreamCollector {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            records: Vec::new(),
            crawl_state: CrawlState::default(),
            violation: None,
        }
    }

    /// Runs `crawler` over `stream_url` and returns everything it delivered.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Crawl`] if the crawl fails and
    /// [`HarvestError::InvariantViolation`] if the crawler delivered an
    /// activity it should have resolved or rejected. Either way, records
    /// gathered so far are discarded.
    pub async fn collect<C>(
        mut self,
        crawler: &C,
        stream_url: &str,
    ) -> Result<CollectedStream, HarvestError>
    where
        C: StreamCrawler + ?Sized,
    {
        let outcome = crawler.process_stream(stream_url, &mut self).await;

        // A broken contract outranks whatever the crawler made of it.
        if let Some(violation) = self.violation {
            return Err(violation.into());
        }
        outcome.map_err(|source| HarvestError::Crawl {
            stream_url: stream_url.to_string(),
            source,
        })?;

        info!(
            stream_url,
            records = self.records.len(),
            last_crawl_timestamp = ?self.crawl_state.last_crawl_timestamp,
            "Stream collected"
        );
        Ok(CollectedStream {
            records: self.records,
            crawl_state: self.crawl_state,
        })
    }
}

impl ActivityHandler for StreamCollector {
    fn is_supported_resource_type(&self, resource_type: &str) -> bool {
        resource_type == self.resource_type
    }

    fn process_activity(&mut self, activity: &Activity) -> Result<(), InvariantViolation> {
        if let Some(violation) = &self.violation {
            return Err(violation.clone());
        }
        match classify(activity) {
            Ok(record) => {
                self.records.push(record);
                Ok(())
            }
            Err(violation) => {
                error!(error = %violation, ?activity, "Crawler delivered an invalid activity");
                self.violation = Some(violation.clone());
                Err(violation)
            }
        }
    }

    fn last_crawl_timestamp(&self, _stream_url: &str) -> Option<DateTime<Utc>> {
        self.crawl_state.last_crawl_timestamp
    }

    fn crawl_start(&mut self, stream_url: &str) {
        info!(stream_url, "Starting crawl");
    }

    fn crawl_end(&mut self, latest_timestamp: DateTime<Utc>) {
        self.crawl_state.last_crawl_timestamp = Some(latest_timestamp);
    }

    fn crawl_fail(&mut self, message: &str, cause: Option<&CrawlError>) {
        match cause {
            Some(cause) => warn!(error = %cause, "Crawl failed: {}", message),
            None => warn!("Crawl failed: {}", message),
        }
    }

    fn log(&self, message: &str) {
        debug!(target: "iiif_discovery_harvester::crawler", "{}", message);
    }
}
