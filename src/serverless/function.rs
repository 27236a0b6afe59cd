use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::events::{EventProperties, EventSource};
use super::iam::Policies;
use super::S3Location;
use crate::error::Error;
use crate::shape::{self, Computed, Mismatch, Polymorphic, Shape};
use crate::template::ResourceType;

/// `AWS::Serverless::Function` properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Function {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub code_uri: Option<CodeUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub policies: Option<Policies>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub events: IndexMap<String, EventSource>,
    /// Layer ARNs, or one call producing the whole list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Computed<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_publish_alias: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
}

/// `CodeUri`: `s3://bucket/key` string or an [`S3Location`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CodeUri {
    String(String),
    S3Location(S3Location),
}

impl Polymorphic for CodeUri {
    const TYPE_NAME: &'static str = "AWS::Serverless::Function.CodeUri";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(CodeUri::String),
            Value::Object(_) => shape::structured(value).map(CodeUri::S3Location),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for CodeUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl ResourceType for Function {
    const TYPE: &'static str = "AWS::Serverless::Function";

    fn audit(properties: &Value, path: &str) -> Vec<Mismatch> {
        let mut found = Vec::new();
        shape::audit_field::<CodeUri>(properties, "CodeUri", path, &mut found);
        shape::audit_field::<Policies>(properties, "Policies", path, &mut found);

        let Some(Value::Object(events)) = properties.get("Events") else {
            return found;
        };
        for (name, event) in events {
            let Some(raw) = event.get("Properties").filter(|v| !v.is_null()) else {
                continue;
            };
            let event_type = event.get("Type").and_then(Value::as_str).unwrap_or_default();
            if EventProperties::decode_for_type(event_type, raw).is_none() {
                found.push(Mismatch {
                    path: format!("{path}.Events.{name}.Properties"),
                    error: Error::ShapeMismatch { type_name: EventProperties::TYPE_NAME, found: Shape::of(raw) },
                });
            }
        }
        found
    }
}
