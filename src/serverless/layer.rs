use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::S3Location;
use crate::shape::{self, Computed, Mismatch, Polymorphic};
use crate::template::ResourceType;

/// `AWS::Serverless::LayerVersion` properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub content_uri: Option<ContentUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_runtimes: Option<Computed<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_info: Option<String>,
    /// `Retain` or `Delete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentUri {
    String(String),
    S3Location(S3Location),
}

impl Polymorphic for ContentUri {
    const TYPE_NAME: &'static str = "AWS::Serverless::LayerVersion.ContentUri";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(ContentUri::String),
            Value::Object(_) => shape::structured(value).map(ContentUri::S3Location),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ContentUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl ResourceType for LayerVersion {
    const TYPE: &'static str = "AWS::Serverless::LayerVersion";

    fn audit(properties: &Value, path: &str) -> Vec<Mismatch> {
        let mut found = Vec::new();
        shape::audit_field::<ContentUri>(properties, "ContentUri", path, &mut found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_uri_round_trip() {
        let layer: LayerVersion = serde_json::from_value(json!({
            "LayerName": "deps",
            "ContentUri": {"Bucket": "b", "Key": "layer.zip"},
            "CompatibleRuntimes": ["python3.12"]
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&layer).unwrap(),
            json!({
                "LayerName": "deps",
                "ContentUri": {"Bucket": "b", "Key": "layer.zip"},
                "CompatibleRuntimes": ["python3.12"]
            })
        );
    }

    #[test]
    fn content_uri_mismatch_is_dropped() {
        let layer: LayerVersion = serde_json::from_value(json!({"ContentUri": true})).unwrap();
        assert_eq!(layer, LayerVersion::default());
    }
}
