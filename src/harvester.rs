use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::HarvesterConfig;
use crate::harvest::collector::{CollectedStream, StreamCollector};
use crate::harvest::fetcher::fetch_content;
use crate::harvest::iterator::{FullRecordIterator, HeaderIterator};
use crate::harvest::traits::{FetchError, HarvestError};
use crate::traits::{RecordLookup, StreamCrawler};

/// Entry point for harvesting an IIIF Discovery activity stream.
///
/// Every `harvest_headers`/`harvest_records` call runs its own crawl and
/// hands the resulting records to a fresh iterator; nothing is shared
/// between iterators.
///
/// # Example
///
/// ```ignore
/// use iiif_discovery_harvester::{
///     FullRecord, HarvestingIterator, IiifDiscoveryHarvester, IterationResult, Throttled,
/// };
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let harvester = IiifDiscoveryHarvester::new(crawler, Arc::new(lookup));
/// let mut records = harvester.harvest_records(stream_url).await?;
/// println!("Harvesting {} records", records.count_records());
///
/// let mut dump = Vec::new();
/// let write = |record: FullRecord| -> std::io::Result<IterationResult> {
///     record.write_content(&mut dump)?;
///     Ok(IterationResult::Continue)
/// };
/// // The endpoint allows one request every two seconds.
/// records
///     .for_each_non_deleted(Throttled::new(write, Duration::from_millis(2500)))
///     .await?;
/// ```
pub struct IiifDiscoveryHarvester<C> {
    crawler: C,
    lookup: Arc<dyn RecordLookup>,
    config: HarvesterConfig,
}

impl<C> IiifDiscoveryHarvester<C>
where
    C: StreamCrawler,
{
    /// Creates a harvester with the default [`HarvesterConfig`].
    pub fn new<L>(crawler: C, lookup: Arc<L>) -> Self
    where
        L: RecordLookup + 'static,
    {
        Self {
            crawler,
            lookup,
            config: HarvesterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HarvesterConfig) -> Self {
        self.config = config;
        self
    }

    /// Collects activities on `resource_type` instead of `"Manifest"`.
    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.config.resource_type = resource_type.into();
        self
    }

    pub fn config(&self) -> &HarvesterConfig {
        &self.config
    }

    /// Crawls `stream_url` and iterates the change records themselves.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the crawl fails; no partial result is
    /// returned.
    #[instrument(skip(self))]
    pub async fn harvest_headers(&self, stream_url: &str) -> Result<HeaderIterator, HarvestError> {
        let collected = self.harvest_stream(stream_url).await?;
        Ok(HeaderIterator::new(collected))
    }

    /// Crawls `stream_url` and iterates full records, fetching each one's
    /// metadata document as the iteration reaches it.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the crawl fails; no partial result is
    /// returned.
    #[instrument(skip(self))]
    pub async fn harvest_records(
        &self,
        stream_url: &str,
    ) -> Result<FullRecordIterator, HarvestError> {
        let collected = self.harvest_stream(stream_url).await?;
        Ok(FullRecordIterator::new(collected, Arc::clone(&self.lookup)))
    }

    /// Fetches the metadata document of a single known record.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the lookup fails or is ambiguous.
    #[instrument(skip(self))]
    pub async fn harvest_record(&self, identifier: &str) -> Result<Option<String>, FetchError> {
        fetch_content(self.lookup.as_ref(), identifier).await
    }

    async fn harvest_stream(&self, stream_url: &str) -> Result<CollectedStream, HarvestError> {
        info!(resource_type = %self.config.resource_type, "Harvesting stream");
        StreamCollector::new(self.config.resource_type.clone())
            .collect(&self.crawler, stream_url)
            .await
    }
}
