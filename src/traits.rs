//! Seams to the external collaborators: the activity-stream crawler and the
//! record lookup service. Transport, pagination and retries live behind
//! these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::harvest::InvariantViolation;
use crate::model::{Activity, SeeAlsoRecord};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid activity stream: {0}")]
    Validation(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid lookup response: {0}")]
    Validation(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receiver of everything a crawler discovers while walking a stream.
///
/// The crawler must resolve `Refresh` activities and validate each activity
/// before calling [`process_activity`](ActivityHandler::process_activity).
pub trait ActivityHandler: Send {
    /// Whether activities on resources of this type should be delivered.
    fn is_supported_resource_type(&self, resource_type: &str) -> bool;

    /// Receives one supported activity, in stream order.
    ///
    /// An `Err` means the crawler broke its contract; the crawl must stop.
    fn process_activity(&mut self, activity: &Activity) -> Result<(), InvariantViolation>;

    /// Where the previous crawl of `stream_url` ended; `None` means from
    /// the beginning.
    fn last_crawl_timestamp(&self, stream_url: &str) -> Option<DateTime<Utc>>;

    fn crawl_start(&mut self, stream_url: &str);

    fn crawl_end(&mut self, latest_timestamp: DateTime<Utc>);

    fn crawl_fail(&mut self, message: &str, cause: Option<&CrawlError>);

    /// Diagnostic sink for the crawler.
    fn log(&self, message: &str);
}

/// Walks an activity stream from the handler's last crawl timestamp to its
/// current end.
#[async_trait]
pub trait StreamCrawler: Send + Sync {
    async fn process_stream(
        &self,
        stream_url: &str,
        handler: &mut dyn ActivityHandler,
    ) -> Result<(), CrawlError>;
}

/// Resolves a record identifier to the metadata documents it links to.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<Vec<SeeAlsoRecord>, LookupError>;
}
