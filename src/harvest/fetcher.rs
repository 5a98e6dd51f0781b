use tracing::debug;

use crate::harvest::traits::FetchError;
use crate::traits::RecordLookup;

/// Fetches the single metadata document behind `identifier`.
///
/// Issues exactly one lookup. No match yields `Ok(None)`: the source has
/// nothing to serve for this identifier.
///
/// # Errors
///
/// Returns [`FetchError::AmbiguousSource`] for more than one match and
/// [`FetchError::Lookup`] if the lookup itself fails.
pub async fn fetch_content<L>(lookup: &L, identifier: &str) -> Result<Option<String>, FetchError>
where
    L: RecordLookup + ?Sized,
{
    let mut records = lookup
        .lookup(identifier)
        .await
        .map_err(|source| FetchError::Lookup {
            identifier: identifier.to_string(),
            source,
        })?;

    match records.len() {
        0 => {
            debug!(identifier, "No metadata document found");
            Ok(None)
        }
        1 => Ok(records.pop().map(|record| record.metadata_content)),
        matches => Err(FetchError::AmbiguousSource {
            identifier: identifier.to_string(),
            matches,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MapLookup;
    use crate::traits::LookupError;

    #[tokio::test]
    async fn test_zero_matches_is_no_content() {
        let lookup = MapLookup::default();
        assert_eq!(fetch_content(&lookup, "z").await.unwrap(), None);
        assert_eq!(lookup.calls(), vec!["z"]);
    }

    #[tokio::test]
    async fn test_single_match_returns_content() {
        let lookup = MapLookup::default().with("x", &["<rdf:RDF/>"]);
        assert_eq!(
            fetch_content(&lookup, "x").await.unwrap().as_deref(),
            Some("<rdf:RDF/>")
        );
    }

    #[tokio::test]
    async fn test_multiple_matches_are_ambiguous() {
        let lookup = MapLookup::default().with("z", &["<a/>", "<b/>"]);
        let err = fetch_content(&lookup, "z").await.unwrap_err();
        assert_eq!(err.identifier(), "z");
        match err {
            FetchError::AmbiguousSource { matches, .. } => assert_eq!(matches, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_wrapped() {
        let lookup = MapLookup::default().broken("x");
        let err = fetch_content(&lookup, "x").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Lookup {
                source: LookupError::Validation(_),
                ..
            }
        ));
    }
}
