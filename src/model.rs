//! Data model for activity-stream harvesting.
//!
//! Raw activity events ([`Activity`]) come from the crawler, are normalized
//! into [`ChangeRecord`] stubs, and optionally enriched into [`FullRecord`]s
//! once the metadata document has been fetched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

// ============================================================================
// Activity Stream Events
// ============================================================================

/// Kind of change announced by an activity-stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Add,
    Create,
    Update,
    Move,
    Delete,
    Remove,
    /// Asks consumers to rebuild their state. The crawler resolves these
    /// before handing activities over; they never describe a record change.
    Refresh,
}

/// Resource an activity acts upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityObject {
    /// URI of the resource (e.g. a IIIF manifest)
    pub id: String,

    /// Resource type, e.g. `"Manifest"` or `"Collection"`
    #[serde(rename = "type")]
    pub kind: String,
}

/// One raw event of an IIIF Discovery activity stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityType,

    /// Resource the activity acts upon
    pub object: Option<ActivityObject>,

    /// Raw target JSON; only meaningful for `Move`, where it names the new
    /// location of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<serde_json::Value>,

    /// Moment the activity completed
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
}

/// Resource identified inside a target JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedResource {
    #[serde(alias = "@id")]
    pub id: String,
}

// ============================================================================
// Harvested Records
// ============================================================================

/// Normalized change derived from one activity.
///
/// Several stubs may share an identifier when a resource changed more than
/// once within one crawl; they are kept in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub identifier: String,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
}

impl ChangeRecord {
    pub fn new(identifier: impl Into<String>, timestamp: DateTime<Utc>, deleted: bool) -> Self {
        Self {
            identifier: identifier.into(),
            timestamp,
            deleted,
        }
    }
}

/// Attempt to read or build content for a record deleted at the source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Record '{identifier}' is deleted at source")]
pub struct RecordDeleted {
    pub identifier: String,
}

/// Content of a non-deleted record. Only constructible from a live stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentRecord {
    stub: ChangeRecord,
    content: String,
}

impl PresentRecord {
    pub fn stub(&self) -> &ChangeRecord {
        &self.stub
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A change record together with its fetched metadata document.
///
/// Deleted records carry no content at all, so reading the content of a
/// deleted record is a `RecordDeleted` error rather than stale data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullRecord {
    Present(PresentRecord),
    Deleted(ChangeRecord),
}

impl FullRecord {
    /// Pairs a live stub with its content.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDeleted`] if the stub is marked deleted.
    pub fn new(stub: ChangeRecord, content: impl Into<String>) -> Result<Self, RecordDeleted> {
        if stub.deleted {
            return Err(RecordDeleted {
                identifier: stub.identifier,
            });
        }
        Ok(Self::Present(PresentRecord {
            stub,
            content: content.into(),
        }))
    }

    /// Builds whichever variant matches the stub, discarding content for
    /// deleted stubs.
    pub(crate) fn from_fetched(stub: ChangeRecord, content: String) -> Self {
        if stub.deleted {
            Self::Deleted(stub)
        } else {
            Self::Present(PresentRecord { stub, content })
        }
    }

    pub fn stub(&self) -> &ChangeRecord {
        match self {
            Self::Present(record) => &record.stub,
            Self::Deleted(stub) => stub,
        }
    }

    pub fn harvesting_identifier(&self) -> &str {
        &self.stub().identifier
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.stub().timestamp
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }

    /// Returns the metadata document.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDeleted`] for the deleted variant.
    pub fn content(&self) -> Result<&str, RecordDeleted> {
        match self {
            Self::Present(record) => Ok(&record.content),
            Self::Deleted(stub) => Err(RecordDeleted {
                identifier: stub.identifier.clone(),
            }),
        }
    }

    /// Consumes the record and returns the metadata document.
    pub fn into_content(self) -> Result<String, RecordDeleted> {
        match self {
            Self::Present(record) => Ok(record.content),
            Self::Deleted(stub) => Err(RecordDeleted {
                identifier: stub.identifier,
            }),
        }
    }

    /// Writes the metadata document as UTF-8 to `out`.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if the record is deleted; otherwise
    /// forwards any error from `out`.
    pub fn write_content<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        let content = self
            .content()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        out.write_all(content.as_bytes())
    }
}

/// One metadata document returned by a lookup-by-identifier call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeeAlsoRecord {
    /// URI the document was retrieved from
    pub id: String,

    /// Raw metadata document (e.g. EDM RDF/XML)
    pub metadata_content: String,
}

// ============================================================================
// Crawl State
// ============================================================================

/// Progress marker kept for the duration of one stream collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    /// Final timestamp reported by the last completed crawl; `None` until
    /// a crawl completes.
    pub last_crawl_timestamp: Option<DateTime<Utc>>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stub(deleted: bool) -> ChangeRecord {
        ChangeRecord::new(
            "https://example.org/manifest/1",
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            deleted,
        )
    }

    #[test]
    fn test_full_record_rejects_deleted_stub() {
        let err = FullRecord::new(stub(true), "<rdf/>").unwrap_err();
        assert_eq!(err.identifier, "https://example.org/manifest/1");
    }

    #[test]
    fn test_present_record_exposes_content() {
        let record = FullRecord::new(stub(false), "<rdf/>").unwrap();
        assert!(!record.is_deleted());
        assert_eq!(record.content().unwrap(), "<rdf/>");
        assert_eq!(
            record.harvesting_identifier(),
            "https://example.org/manifest/1"
        );

        let mut out = Vec::new();
        record.write_content(&mut out).unwrap();
        assert_eq!(out, b"<rdf/>");
    }

    #[test]
    fn test_deleted_record_never_yields_content() {
        let record = FullRecord::from_fetched(stub(true), "<rdf/>".to_string());
        assert!(record.is_deleted());
        assert!(record.content().is_err());

        let mut out = Vec::new();
        let err = record.write_content(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
        assert!(out.is_empty());
        assert!(record.into_content().is_err());
    }

    #[test]
    fn test_activity_deserialization() {
        let json = r#"{
            "type": "Move",
            "object": { "id": "https://example.org/a", "type": "Manifest" },
            "target": { "@id": "https://example.org/b", "type": "Manifest" },
            "endTime": "2024-03-01T12:00:00Z"
        }"#;

        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.kind, ActivityType::Move);
        assert_eq!(activity.object.unwrap().kind, "Manifest");

        let target: UpdatedResource = serde_json::from_value(activity.target.unwrap()).unwrap();
        assert_eq!(target.id, "https://example.org/b");
    }
}
