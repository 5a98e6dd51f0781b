use serde::{Deserialize, Serialize};

/// Resource type harvested by default: IIIF Presentation manifests.
pub const DEFAULT_RESOURCE_TYPE: &str = "Manifest";

/// Settings for [`IiifDiscoveryHarvester`](crate::IiifDiscoveryHarvester).
///
/// Missing fields fall back to their defaults when deserialized, so a
/// partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// The only resource type whose activities are collected
    pub resource_type: String,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            resource_type: DEFAULT_RESOURCE_TYPE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resource_type() {
        assert_eq!(HarvesterConfig::default().resource_type, "Manifest");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: HarvesterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HarvesterConfig::default());

        let json = r#"{ "resource_type": "Collection" }"#;
        let config: HarvesterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.resource_type, "Collection");
    }
}
