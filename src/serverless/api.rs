use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::S3Location;
use crate::shape::{self, Computed, Mismatch, Polymorphic};
use crate::template::ResourceType;

/// `AWS::Serverless::Api` properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Api {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub definition_uri: Option<DefinitionUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub cors: Option<Cors>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub tracing_enabled: Option<Computed<bool>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,
}

/// `DefinitionUri`: location of an OpenAPI document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefinitionUri {
    String(String),
    S3Location(S3Location),
}

/// `Cors`: a single quoted origin (`"'*'"`) or a full configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cors {
    String(String),
    Configuration(CorsConfiguration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsConfiguration {
    pub allow_origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub allow_methods: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub allow_headers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub max_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub allow_credentials: Option<Computed<bool>>,
}

impl Polymorphic for DefinitionUri {
    const TYPE_NAME: &'static str = "AWS::Serverless::Api.DefinitionUri";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(DefinitionUri::String),
            Value::Object(_) => shape::structured(value).map(DefinitionUri::S3Location),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for DefinitionUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl Polymorphic for Cors {
    const TYPE_NAME: &'static str = "AWS::Serverless::Api.Cors";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(Cors::String),
            Value::Object(_) => shape::structured(value).map(Cors::Configuration),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Cors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl ResourceType for Api {
    const TYPE: &'static str = "AWS::Serverless::Api";

    fn audit(properties: &Value, path: &str) -> Vec<Mismatch> {
        let mut found = Vec::new();
        shape::audit_field::<DefinitionUri>(properties, "DefinitionUri", path, &mut found);
        shape::audit_field::<Cors>(properties, "Cors", path, &mut found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_uri_alternatives() {
        let api: Api = serde_json::from_value(json!({"StageName": "prod", "DefinitionUri": "./openapi.yaml"})).unwrap();
        assert_eq!(api.definition_uri, Some(DefinitionUri::String("./openapi.yaml".into())));

        let api: Api = serde_json::from_value(json!({"DefinitionUri": {"Bucket": "b", "Key": "spec.yaml"}})).unwrap();
        assert!(matches!(api.definition_uri, Some(DefinitionUri::S3Location(ref loc)) if loc.key == "spec.yaml"));
    }

    #[test]
    fn cors_alternatives() {
        assert_eq!(Cors::decode(&json!("'*'")), Some(Cors::String("'*'".into())));
        let config = Cors::decode(&json!({"AllowOrigin": "'*'", "MaxAge": "'600'"})).unwrap();
        assert_eq!(config.to_value().unwrap(), json!({"AllowOrigin": "'*'", "MaxAge": "'600'"}));
        // AllowOrigin is required
        assert_eq!(Cors::decode(&json!({"AllowMethods": "'GET'"})), None);
    }

    #[test]
    fn flag_holding_a_call_survives_round_trip() {
        let raw = json!({"StageName": "p", "TracingEnabled": {"Ref": "Trace"}});
        let api: Api = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(api.tracing_enabled.as_ref().and_then(Computed::call), Some(json!({"Ref": "Trace"})));
        let encoded = crate::intrinsics::token::expand(serde_json::to_value(&api).unwrap());
        assert_eq!(encoded, raw);

        let api: Api = serde_json::from_value(json!({"TracingEnabled": true})).unwrap();
        assert_eq!(api.tracing_enabled, Some(Computed::Literal(true)));
    }

    #[test]
    fn audit_flags_bad_cors_only() {
        let found = Api::audit(&json!({"DefinitionUri": "s3://b/k", "Cors": ["'*'"]}), "P");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "P.Cors");
    }
}
