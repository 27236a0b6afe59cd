//! Typed AWS SAM resources (`AWS::Serverless::*`) and the polymorphic
//! properties they own.
pub mod api;
pub mod events;
pub mod function;
pub mod iam;
pub mod layer;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shape::{self, Mismatch};
use crate::template::ResourceType;

pub use api::{Api, Cors, CorsConfiguration, DefinitionUri};
pub use events::{EventProperties, EventSource, S3Events};
pub use function::{CodeUri, Environment, Function};
pub use iam::{IamPolicyDocument, Policies, PolicyItem};
pub use layer::{ContentUri, LayerVersion};

/// Object form shared by `CodeUri`, `DefinitionUri` and `ContentUri`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub version: Option<String>,
}

/// Strict shape check of a serverless resource's raw properties.
/// `None` when `resource_type` is not one of the typed SAM resources.
pub fn audit(resource_type: &str, properties: &Value, path: &str) -> Option<Vec<Mismatch>> {
    let found = match resource_type {
        Function::TYPE => Function::audit(properties, path),
        Api::TYPE => Api::audit(properties, path),
        LayerVersion::TYPE => LayerVersion::audit(properties, path),
        _ => return None,
    };
    Some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn s3_location_version_is_optional_and_permissive() {
        let loc: S3Location = serde_json::from_value(json!({"Bucket": "b", "Key": "k", "Version": 3})).unwrap();
        assert_eq!(loc, S3Location { bucket: "b".into(), key: "k".into(), version: None });
        assert!(serde_json::from_value::<S3Location>(json!({"Bucket": "b"})).is_err());
    }

    #[test]
    fn audit_dispatches_only_serverless_types() {
        let props = json!({"CodeUri": false});
        assert!(audit("AWS::S3::Bucket", &props, "p").is_none());
        assert_eq!(audit(Function::TYPE, &props, "p").map(|v| v.len()), Some(1));
    }
}
