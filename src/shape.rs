//! Shape-dispatched decoding for polymorphic CloudFormation properties.
//!
//! Many SAM/CloudFormation properties accept more than one JSON shape: a
//! `CodeUri` is either an `s3://` string or an `{Bucket, Key}` object,
//! `Policies` is a managed policy name, a list of names, a policy document or
//! a list of documents. Each such property is a closed enum implementing
//! [`Polymorphic`].
//!
//! Decoding rules:
//! - look at the runtime [`Shape`] of the value first, then try the variants
//!   that accept that shape in declaration order; first success wins.
//! - structural variants are decoded permissively: unknown keys are ignored
//!   and optional fields of the wrong type are dropped ([`permissive`]). The
//!   variant's required fields act as the validation step.
//! - a value no variant accepts is not an error in lenient mode ([`lenient`]),
//!   it becomes `None` plus a warning. [`Polymorphic::decode_strict`] reports
//!   it instead.
//!
//! Encoding emits whichever variant is held; variant order is the priority
//! order, so there is no "two slots set" state to arbitrate.
//!
//! Non-string fields that may hold an intrinsic call (counts, flags,
//! enum-like attributes) are typed [`Computed<T>`].
use std::fmt;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::intrinsics::token;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Runtime kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

pub trait Polymorphic: Serialize + Sized {
    /// CloudFormation-style name used in diagnostics, e.g. `AWS::Serverless::Function.CodeUri`.
    const TYPE_NAME: &'static str;

    /// Pick the first alternative accepting `value`, or `None`.
    fn sniff(value: &Value) -> Option<Self>;

    fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::Serialize)
    }

    /// Lenient decode: a shape mismatch yields `None`.
    fn decode(value: &Value) -> Option<Self> {
        let decoded = Self::sniff(value);
        if decoded.is_none() {
            debug!(type_name = Self::TYPE_NAME, found = %Shape::of(value), "no alternative matched");
        }
        decoded
    }

    fn decode_strict(value: &Value) -> Result<Self> {
        Self::sniff(value).ok_or(Error::ShapeMismatch {
            type_name: Self::TYPE_NAME,
            found: Shape::of(value),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Bool,
            Value::Number(_) => Shape::Number,
            Value::String(_) => Shape::String,
            Value::Array(_) => Shape::Array,
            Value::Object(_) => Shape::Object,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Null => "null",
            Shape::Bool => "boolean",
            Shape::Number => "number",
            Shape::String => "string",
            Shape::Array => "array",
            Shape::Object => "object",
        };
        f.write_str(name)
    }
}

/// A literal `T`, or an intrinsic call standing in for it.
///
/// Decoding accepts a token string or a literal call object and keeps the
/// call as its token, so it serializes like a string field holding a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Computed<T> {
    Literal(T),
    Call(String),
}

/// Encode an optional tagged value; unset encodes as JSON `null`.
pub fn encode<T: Polymorphic>(slot: Option<&T>) -> Result<Value> {
    slot.map_or(Ok(Value::Null), T::to_value)
}

impl<T> Computed<T> {
    pub fn literal(&self) -> Option<&T> {
        match self {
            Computed::Literal(value) => Some(value),
            Computed::Call(_) => None,
        }
    }

    /// The call as JSON, e.g. `{"Ref": "DesiredCapacity"}`.
    pub fn call(&self) -> Option<Value> {
        match self {
            Computed::Literal(_) => None,
            Computed::Call(token) => token::decode(token),
        }
    }
}

impl<T> From<T> for Computed<T> {
    fn from(value: T) -> Self {
        Computed::Literal(value)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Computed<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::String(s) if token::decode(s).is_some() => return Ok(Computed::Call(s.clone())),
            Value::Object(_) if token::function_name(&value).is_some() => {
                return Ok(Computed::Call(token::encode(&value)));
            }
            _ => {}
        }
        serde_json::from_value(value).map(Computed::Literal).map_err(de::Error::custom)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERDE ADAPTERS
// ————————————————————————————————————————————————————————————————————————————

/// Strict `Deserialize` body shared by every polymorphic type.
pub fn deserialize<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Polymorphic,
{
    let value = Value::deserialize(deserializer)?;
    T::decode_strict(&value).map_err(de::Error::custom)
}

/// Field adapter: `#[serde(default, deserialize_with = "shape::lenient")]`.
///
/// Malformed JSON still fails; a well-formed value of the wrong shape is
/// dropped with a warning.
pub fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Polymorphic,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let decoded = T::sniff(&value);
    if decoded.is_none() {
        warn!(
            type_name = T::TYPE_NAME,
            found = %Shape::of(&value),
            "dropping property value that matches no declared alternative"
        );
    }
    Ok(decoded)
}

/// Field adapter for optional plain fields inside structural alternatives:
/// a value of the wrong type is ignored rather than failing the variant.
pub fn permissive<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let holds_call = token::contains_call(&value);
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(err) if holds_call => {
            warn!(%err, "dropping intrinsic call from a field that cannot hold one");
            Ok(None)
        }
        Err(err) => {
            debug!(%err, "ignoring mismatched optional field");
            Ok(None)
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// AUDIT
// ————————————————————————————————————————————————————————————————————————————

/// A property value that strict decoding rejects, with where it sits.
#[derive(Debug)]
pub struct Mismatch {
    pub path: String,
    pub error: Error,
}

/// Strictly decode `parent[key]` when present and non-null, recording a mismatch.
pub fn audit_field<T: Polymorphic>(parent: &Value, key: &str, path: &str, out: &mut Vec<Mismatch>) {
    let Some(value) = parent.get(key).filter(|v| !v.is_null()) else {
        return;
    };
    if let Err(error) = T::decode_strict(value) {
        out.push(Mismatch { path: format!("{path}.{key}"), error });
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SNIFF HELPERS
// ————————————————————————————————————————————————————————————————————————————

pub(crate) fn string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Array whose every element is a string.
pub(crate) fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|el| el.as_str().map(str::to_string))
        .collect()
}

/// Permissive structural decode of an object into `T`.
pub(crate) fn structured<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// Array whose every element decodes structurally into `T`.
pub(crate) fn structured_array<T: DeserializeOwned>(value: &Value) -> Option<Vec<T>> {
    value.as_array()?.iter().map(structured).collect()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serverless::{CodeUri, S3Location};
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Holder {
        #[serde(rename = "CodeUri", default, deserialize_with = "lenient")]
        code_uri: Option<CodeUri>,
    }

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(rename = "Size", default, deserialize_with = "permissive")]
        size: Option<u32>,
    }

    #[test]
    fn shape_of_every_kind() {
        assert_eq!(Shape::of(&json!(null)), Shape::Null);
        assert_eq!(Shape::of(&json!(true)), Shape::Bool);
        assert_eq!(Shape::of(&json!(1.5)), Shape::Number);
        assert_eq!(Shape::of(&json!("x")), Shape::String);
        assert_eq!(Shape::of(&json!([])), Shape::Array);
        assert_eq!(Shape::of(&json!({})), Shape::Object);
        assert_eq!(Shape::Bool.to_string(), "boolean");
    }

    #[test]
    fn lenient_field_drops_mismatch_without_error() {
        let holder: Holder = serde_json::from_value(json!({"CodeUri": 42})).unwrap();
        assert_eq!(holder, Holder { code_uri: None });
    }

    #[test]
    fn lenient_field_absent_and_null_are_none() {
        let absent: Holder = serde_json::from_value(json!({})).unwrap();
        let null: Holder = serde_json::from_value(json!({"CodeUri": null})).unwrap();
        assert!(absent.code_uri.is_none());
        assert!(null.code_uri.is_none());
    }

    #[test]
    fn lenient_field_still_rejects_malformed_json() {
        let err = serde_json::from_str::<Holder>(r#"{"CodeUri": "s3://b/k"#);
        assert!(err.is_err());
    }

    #[test]
    fn strict_decode_names_type_and_shape() {
        let err = CodeUri::decode_strict(&json!(true)).unwrap_err();
        match err {
            Error::ShapeMismatch { type_name, found } => {
                assert_eq!(type_name, CodeUri::TYPE_NAME);
                assert_eq!(found, Shape::Bool);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_deserialize_rejects_mismatch() {
        assert!(serde_json::from_value::<CodeUri>(json!([1, 2])).is_err());
    }

    #[test]
    fn encode_unset_is_null() {
        assert_eq!(encode::<CodeUri>(None).unwrap(), Value::Null);
        let set = CodeUri::S3Location(S3Location {
            bucket: "b".into(),
            key: "k".into(),
            version: None,
        });
        assert_eq!(encode(Some(&set)).unwrap(), json!({"Bucket": "b", "Key": "k"}));
    }

    #[test]
    fn permissive_ignores_wrong_type() {
        let loose: Loose = serde_json::from_value(json!({"Size": "big"})).unwrap();
        assert!(loose.size.is_none());
        let loose: Loose = serde_json::from_value(json!({"Size": 3})).unwrap();
        assert_eq!(loose.size, Some(3));
    }

    #[test]
    fn audit_field_records_path() {
        let mut found = Vec::new();
        let props = json!({"CodeUri": 7, "Other": 7});
        audit_field::<CodeUri>(&props, "CodeUri", "Resources.Fn.Properties", &mut found);
        audit_field::<CodeUri>(&props, "Missing", "Resources.Fn.Properties", &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "Resources.Fn.Properties.CodeUri");
        assert!(matches!(found[0].error, Error::ShapeMismatch { found: Shape::Number, .. }));
    }

    #[test]
    fn string_array_requires_all_strings() {
        assert_eq!(string_array(&json!(["a", "b"])), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(string_array(&json!(["a", 1])), None);
        assert_eq!(string_array(&json!("a")), None);
    }

    #[derive(Debug, Deserialize)]
    struct Counted {
        #[serde(rename = "Count", default)]
        count: Option<Computed<u32>>,
        #[serde(rename = "Enabled", default, deserialize_with = "permissive")]
        enabled: Option<Computed<bool>>,
    }

    #[test]
    fn computed_holds_literal_or_call() {
        let literal: Counted = serde_json::from_value(json!({"Count": 3, "Enabled": true})).unwrap();
        assert_eq!(literal.count, Some(Computed::Literal(3)));
        assert_eq!(literal.enabled.and_then(|e| e.literal().copied()), Some(true));

        let token = token::encode(&json!({"Ref": "Desired"}));
        let from_token: Counted = serde_json::from_value(json!({"Count": token})).unwrap();
        assert_eq!(from_token.count, Some(Computed::Call(token.clone())));

        let from_object: Counted =
            serde_json::from_value(json!({"Count": {"Ref": "Desired"}, "Enabled": {"Fn::Equals": ["a", "a"]}})).unwrap();
        assert_eq!(from_object.count.as_ref().and_then(Computed::call), Some(json!({"Ref": "Desired"})));
        assert_eq!(serde_json::to_value(&from_object.count).unwrap(), json!(token));
        assert!(from_object.enabled.is_some_and(|e| e.call().is_some()));
    }

    #[test]
    fn computed_rejects_wrong_literal() {
        assert!(serde_json::from_value::<Counted>(json!({"Count": "three"})).is_err());
        let loose: Counted = serde_json::from_value(json!({"Enabled": "yes"})).unwrap();
        assert!(loose.enabled.is_none());
    }
}
