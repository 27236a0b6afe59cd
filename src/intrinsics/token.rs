//! Opaque tokens standing in for intrinsic function calls.
//!
//! A token is the standard-alphabet, padded base64 of the JSON text of a
//! single-key object such as `{"Ref":"MyBucket"}`. Tokens are plain strings,
//! so they fit in any string-typed property; [`expand`] swaps them back for
//! the literal call before a template leaves the crate.
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static BASE64_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})+(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
        .expect("static regex")
});

// shortest possible call, `{"Ref":""}`, is 10 bytes → 16 chars of base64
const MIN_TOKEN_LEN: usize = 16;

pub fn encode(fragment: &Value) -> String {
    BASE64_STANDARD.encode(fragment.to_string())
}

/// Decode a token back into its call, or `None` for any ordinary string.
pub fn decode(token: &str) -> Option<Value> {
    if token.len() < MIN_TOKEN_LEN || !BASE64_SHAPE.is_match(token) {
        return None;
    }
    let bytes = BASE64_STANDARD.decode(token).ok()?;
    let fragment = serde_json::from_slice::<Value>(&bytes).ok()?;
    function_name(&fragment).is_some().then_some(fragment)
}

/// Name of the intrinsic if `value` is a call (`Ref`, `Condition` or `Fn::*`).
pub fn function_name(value: &Value) -> Option<&str> {
    call_name(value.as_object()?)
}

/// Same as [`function_name`] for an object already in hand.
pub fn call_name(map: &Map<String, Value>) -> Option<&str> {
    call_key(map).filter(|key| *key == "Condition" || is_expression_key(key))
}

/// Replace every token in the tree with its fragment, recursively.
pub fn expand(value: Value) -> Value {
    match value {
        Value::String(s) => match decode(&s) {
            Some(fragment) => expand(fragment),
            None => Value::String(s),
        },
        Value::Array(xs) => Value::Array(xs.into_iter().map(expand).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, expand(v))).collect()),
        other => other,
    }
}

/// Replace every `Ref`/`Fn::*` call object in the tree with a token.
///
/// `Condition` is left alone: as a single-key object it also appears as a
/// plain attribute, and inside condition functions it is already nested in a
/// tokenized `Fn::*` call.
pub fn tokenize(value: Value) -> Value {
    match value {
        Value::Object(map) if call_key(&map).is_some_and(is_expression_key) => {
            Value::String(encode(&Value::Object(map)))
        }
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, tokenize(v))).collect()),
        Value::Array(xs) => Value::Array(xs.into_iter().map(tokenize).collect()),
        other => other,
    }
}

/// Does the tree still contain a call anywhere (literal or tokenized)?
pub fn contains_call(value: &Value) -> bool {
    match value {
        Value::String(s) => decode(s).is_some(),
        Value::Array(xs) => xs.iter().any(contains_call),
        Value::Object(map) => function_name(value).is_some() || map.values().any(contains_call),
        _ => false,
    }
}

fn call_key(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.keys().next().map(String::as_str)
}

fn is_expression_key(key: &str) -> bool {
    key == "Ref" || key.starts_with("Fn::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_is_plain_standard_base64() {
        let token = encode(&json!({"Ref": "MyBucket"}));
        assert_eq!(token, "eyJSZWYiOiJNeUJ1Y2tldCJ9");
        assert_eq!(decode(&token), Some(json!({"Ref": "MyBucket"})));
    }

    #[test]
    fn ordinary_strings_are_not_tokens() {
        assert_eq!(decode("s3://bucket/key.zip"), None);
        assert_eq!(decode("abcdabcdabcdabcd"), None);
        // valid base64 of a non-call object
        assert_eq!(decode(&encode(&json!({"Bucket": "b"}))), None);
        // valid base64 of a two-key object
        assert_eq!(decode(&encode(&json!({"Ref": "a", "Fn::Sub": "b"}))), None);
    }

    #[test]
    fn condition_fragments_decode() {
        let token = encode(&json!({"Condition": "IsProd"}));
        assert_eq!(decode(&token), Some(json!({"Condition": "IsProd"})));
    }

    #[test]
    fn expand_replaces_nested_tokens() {
        let inner = encode(&json!({"Ref": "AWS::Region"}));
        let outer = encode(&json!({"Fn::Join": ["-", ["app", inner]]}));
        let doc = json!({"Name": outer, "Other": "literal", "List": [1, true]});
        assert_eq!(
            expand(doc),
            json!({
                "Name": {"Fn::Join": ["-", ["app", {"Ref": "AWS::Region"}]]},
                "Other": "literal",
                "List": [1, true]
            })
        );
    }

    #[test]
    fn tokenize_then_expand_is_identity() {
        let doc = json!({
            "Resources": {
                "Fn": {
                    "Type": "AWS::Serverless::Function",
                    "Condition": "IsProd",
                    "Properties": {
                        "CodeUri": {"Fn::Sub": "s3://${Bucket}/code.zip"},
                        "Role": {"Fn::GetAtt": ["Role", "Arn"]},
                        "Tags": {"Env": {"Ref": "Env"}}
                    }
                }
            }
        });
        let tokenized = tokenize(doc.clone());
        assert!(tokenized["Resources"]["Fn"]["Properties"]["CodeUri"].is_string());
        assert_eq!(tokenized["Resources"]["Fn"]["Condition"], json!("IsProd"));
        assert_eq!(expand(tokenized), doc);
    }

    #[test]
    fn contains_call_sees_literals_and_tokens() {
        assert!(contains_call(&json!([{"Ref": "X"}])));
        assert!(contains_call(&json!({"a": encode(&json!({"Ref": "X"}))})));
        assert!(!contains_call(&json!({"a": ["b", 1]})));
    }
}
