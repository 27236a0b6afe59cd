use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::shape::{self, Polymorphic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamPolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub version: Option<String>,
    /// A single statement or a list of them; kept as written.
    pub statement: Value,
}

/// `Policies`: a managed policy name, a list of names, one policy document,
/// a list of documents, or a mixed list (names, documents and SAM policy
/// templates such as `{"S3ReadPolicy": {"BucketName": ...}}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Policies {
    String(String),
    StringArray(Vec<String>),
    Document(IamPolicyDocument),
    DocumentArray(Vec<IamPolicyDocument>),
    Mixed(Vec<PolicyItem>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PolicyItem {
    Name(String),
    Document(IamPolicyDocument),
    Template(Map<String, Value>),
}

impl Polymorphic for Policies {
    const TYPE_NAME: &'static str = "AWS::Serverless::Function.Policies";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(Policies::String),
            Value::Array(items) => shape::string_array(value)
                .map(Policies::StringArray)
                .or_else(|| shape::structured_array(value).map(Policies::DocumentArray))
                .or_else(|| items.iter().map(PolicyItem::sniff).collect::<Option<Vec<_>>>().map(Policies::Mixed)),
            Value::Object(_) => shape::structured(value).map(Policies::Document),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Policies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl Polymorphic for PolicyItem {
    const TYPE_NAME: &'static str = "AWS::Serverless::Function.Policies[]";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(PolicyItem::Name),
            Value::Object(map) => shape::structured(value)
                .map(PolicyItem::Document)
                .or_else(|| Some(PolicyItem::Template(map.clone()))),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for PolicyItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}
