//! Scripted collaborators shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{Activity, ActivityObject, ActivityType, SeeAlsoRecord};
use crate::traits::{ActivityHandler, CrawlError, LookupError, RecordLookup, StreamCrawler};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fixed instant offset by `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn activity_on(
    kind: ActivityType,
    id: &str,
    resource_type: &str,
    end_time: DateTime<Utc>,
) -> Activity {
    Activity {
        kind,
        object: Some(ActivityObject {
            id: id.to_string(),
            kind: resource_type.to_string(),
        }),
        target: None,
        end_time,
    }
}

pub fn activity(kind: ActivityType, id: &str, end_time: DateTime<Utc>) -> Activity {
    activity_on(kind, id, "Manifest", end_time)
}

pub fn move_activity(from: &str, to: &str, end_time: DateTime<Utc>) -> Activity {
    Activity {
        target: Some(json!({ "id": to, "type": "Manifest" })),
        ..activity(ActivityType::Move, from, end_time)
    }
}

/// Replays a fixed list of activities as if they had been read from a
/// stream.
#[derive(Default)]
pub struct ScriptedCrawler {
    pub activities: Vec<Activity>,
    /// Fail with a transport error after delivering this many activities
    pub fail_after: Option<usize>,
    /// Keep going when the handler rejects an activity
    pub ignore_handler_errors: bool,
    pub seen_last_timestamp: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl ScriptedCrawler {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self {
            activities,
            ..Self::default()
        }
    }
}

#[async_trait]
impl StreamCrawler for ScriptedCrawler {
    async fn process_stream(
        &self,
        stream_url: &str,
        handler: &mut dyn ActivityHandler,
    ) -> Result<(), CrawlError> {
        self.seen_last_timestamp
            .lock()
            .unwrap()
            .push(handler.last_crawl_timestamp(stream_url));
        handler.crawl_start(stream_url);

        let mut delivered = 0;
        let mut latest = None;
        for activity in &self.activities {
            if self.fail_after == Some(delivered) {
                let err = CrawlError::Transport("connection reset".to_string());
                handler.crawl_fail("page request failed", Some(&err));
                return Err(err);
            }
            let resource_type = activity
                .object
                .as_ref()
                .map(|o| o.kind.as_str())
                .unwrap_or("");
            if !handler.is_supported_resource_type(resource_type) {
                handler.log("skipping unsupported resource");
                continue;
            }
            if let Err(violation) = handler.process_activity(activity) {
                if !self.ignore_handler_errors {
                    let err = CrawlError::Validation(violation.to_string());
                    handler.crawl_fail("activity rejected", Some(&err));
                    return Err(err);
                }
            }
            delivered += 1;
            latest = latest.max(Some(activity.end_time));
        }

        handler.crawl_end(latest.unwrap_or_else(|| at(0)));
        Ok(())
    }
}

/// Lookup backed by a map; unknown identifiers resolve to no documents.
#[derive(Default)]
pub struct MapLookup {
    pub documents: HashMap<String, Vec<SeeAlsoRecord>>,
    pub broken: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MapLookup {
    pub fn with(mut self, identifier: &str, contents: &[&str]) -> Self {
        let records = contents
            .iter()
            .enumerate()
            .map(|(i, content)| SeeAlsoRecord {
                id: format!("{identifier}/edm/{i}"),
                metadata_content: content.to_string(),
            })
            .collect();
        self.documents.insert(identifier.to_string(), records);
        self
    }

    pub fn broken(mut self, identifier: &str) -> Self {
        self.broken.push(identifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordLookup for MapLookup {
    async fn lookup(&self, identifier: &str) -> Result<Vec<SeeAlsoRecord>, LookupError> {
        self.calls.lock().unwrap().push(identifier.to_string());
        if self.broken.iter().any(|b| b == identifier) {
            return Err(LookupError::Validation("missing profile".to_string()));
        }
        Ok(self.documents.get(identifier).cloned().unwrap_or_default())
    }
}
