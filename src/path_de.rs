use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::intrinsics::token;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_parse_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_parse_error)
}

/// Same as above for an already parsed tree (e.g. after tokenizing).
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_parse_error)
}

fn into_parse_error(err: serde_path_to_error::Error<serde_json::Error>) -> Error {
    let path = err.path().to_string();
    let source = err.into_inner();
    // serde quotes the offending string; a token there means a call sat in a typed field
    let call = source.to_string().split('"').skip(1).step_by(2).find_map(token::decode).map(token::expand);
    Error::Parse { path, source, call }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer {
        inner: Inner,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        count: u32,
    }

    #[test]
    fn truncated_input_is_a_parse_error() {
        let err = from_str_with_path::<Value>(r#"{"a": [1, 2"#).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn error_carries_the_offending_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": {"count": "x"}}"#).unwrap_err();
        match err {
            Error::Parse { path, .. } => assert_eq!(path, "inner.count"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn token_in_typed_field_is_reported_as_its_call() {
        let value = serde_json::json!({"inner": {"count": token::encode(&serde_json::json!({"Ref": "N"}))}});
        match from_value_with_path::<Outer>(value).unwrap_err() {
            Error::Parse { path, call, .. } => {
                assert_eq!(path, "inner.count");
                assert_eq!(call, Some(serde_json::json!({"Ref": "N"})));
            }
            other => panic!("unexpected error: {other}"),
        }
        let plain = from_str_with_path::<Outer>(r#"{"inner": {"count": "x"}}"#).unwrap_err();
        assert!(matches!(plain, Error::Parse { call: None, .. }));
    }

    #[test]
    fn value_input_reports_path_too() {
        let value = serde_json::json!({"inner": {}});
        let err = from_value_with_path::<Outer>(value).unwrap_err();
        assert!(err.to_string().contains("inner"));
    }
}
