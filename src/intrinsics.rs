//! CloudFormation intrinsic functions as embeddable tokens.
//!
//! Every helper builds the call structurally with `serde_json` and returns it
//! as a [`token`], so the result can be stored in any string-typed property
//! and nested as an argument of another helper:
//!
//! ```
//! use cfn_shapes::intrinsics::{self, token};
//! use serde_json::json;
//!
//! let name = intrinsics::join("-", &[intrinsics::ref_("AWS::StackName"), "logs".to_string()]);
//! assert_eq!(
//!     token::expand(json!(name)),
//!     json!({"Fn::Join": ["-", [{"Ref": "AWS::StackName"}, "logs"]]})
//! );
//! ```
//!
//! Argument values are never validated; CloudFormation rejects bad ones at
//! deploy time.
pub mod resolve;
pub mod token;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use resolve::{resolve, ResolveOptions};

fn call(function: &str, args: Value) -> String {
    let mut fragment = Map::new();
    fragment.insert(function.to_string(), args);
    token::encode(&Value::Object(fragment))
}

fn list<S: AsRef<str>>(items: &[S]) -> Value {
    Value::Array(items.iter().map(|s| Value::from(s.as_ref())).collect())
}

/// `{"Ref": logical_name}`
pub fn ref_(logical_name: &str) -> String {
    call("Ref", Value::from(logical_name))
}

/// `{"Fn::GetAtt": [logical_name, attribute]}`
pub fn get_att(logical_name: &str, attribute: &str) -> String {
    call("Fn::GetAtt", list(&[logical_name, attribute]))
}

/// `{"Fn::ImportValue": name}`
pub fn import_value(name: &str) -> String {
    call("Fn::ImportValue", Value::from(name))
}

/// `{"Fn::Base64": input}`
pub fn base64(input: &str) -> String {
    call("Fn::Base64", Value::from(input))
}

/// `{"Fn::Cidr": [ip_block, count, cidr_bits]}`
pub fn cidr(ip_block: &str, count: &str, cidr_bits: &str) -> String {
    call("Fn::Cidr", list(&[ip_block, count, cidr_bits]))
}

/// `{"Fn::FindInMap": [map_name, top_level_key, second_level_key]}`
pub fn find_in_map(map_name: &str, top_level_key: &str, second_level_key: &str) -> String {
    call("Fn::FindInMap", list(&[map_name, top_level_key, second_level_key]))
}

/// `{"Fn::GetAZs": region}`; an empty region means the stack's region.
pub fn get_azs(region: &str) -> String {
    call("Fn::GetAZs", Value::from(region))
}

/// `{"Fn::Join": [delimiter, [values...]]}`
pub fn join<S: AsRef<str>>(delimiter: &str, values: &[S]) -> String {
    call("Fn::Join", Value::Array(vec![Value::from(delimiter), list(values)]))
}

/// `{"Fn::Select": [index, [list...]]}`
pub fn select<S: AsRef<str>>(index: &str, values: &[S]) -> String {
    call("Fn::Select", Value::Array(vec![Value::from(index), list(values)]))
}

/// `{"Fn::Split": [delimiter, source]}`
pub fn split(delimiter: &str, source: &str) -> String {
    call("Fn::Split", list(&[delimiter, source]))
}

/// `{"Fn::Sub": template}`
pub fn sub(template: &str) -> String {
    call("Fn::Sub", Value::from(template))
}

/// `{"Fn::And": [conditions...]}`
pub fn and<S: AsRef<str>>(conditions: &[S]) -> String {
    call("Fn::And", list(conditions))
}

/// `{"Fn::Equals": [value_1, value_2]}`
pub fn equals(value_1: &str, value_2: &str) -> String {
    call("Fn::Equals", list(&[value_1, value_2]))
}

/// `{"Fn::If": [condition_name, value_if_true, value_if_false]}`
pub fn if_(condition_name: &str, value_if_true: &str, value_if_false: &str) -> String {
    call("Fn::If", list(&[condition_name, value_if_true, value_if_false]))
}

/// `{"Fn::Not": [conditions...]}`
pub fn not<S: AsRef<str>>(conditions: &[S]) -> String {
    call("Fn::Not", list(conditions))
}

/// `{"Fn::Or": [conditions...]}`
pub fn or<S: AsRef<str>>(conditions: &[S]) -> String {
    call("Fn::Or", list(conditions))
}

/// `{"Condition": name}`, for use inside `and`/`or`/`not`.
pub fn condition(name: &str) -> String {
    call("Condition", Value::from(name))
}

/// Build a token from a function name and a flat argument list.
///
/// Accepts `Ref`, `Condition` and `Fn::*` names, with or without the `Fn::`
/// prefix. For `Join`/`Select` the first argument is the delimiter/index and
/// the rest form the list.
pub fn build(function: &str, args: &[String]) -> Result<String> {
    let name = function.strip_prefix("Fn::").unwrap_or(function);
    let arity = |n: usize| -> Result<()> {
        if args.len() == n {
            Ok(())
        } else {
            Err(Error::intrinsic(function, format!("expected {n} argument(s), got {}", args.len())))
        }
    };
    let at_least = |n: usize| -> Result<()> {
        if args.len() >= n {
            Ok(())
        } else {
            Err(Error::intrinsic(function, format!("expected at least {n} argument(s), got {}", args.len())))
        }
    };
    let token = match name {
        "Ref" => {
            arity(1)?;
            ref_(&args[0])
        }
        "Condition" => {
            arity(1)?;
            condition(&args[0])
        }
        "GetAtt" => {
            arity(2)?;
            get_att(&args[0], &args[1])
        }
        "ImportValue" => {
            arity(1)?;
            import_value(&args[0])
        }
        "Base64" => {
            arity(1)?;
            base64(&args[0])
        }
        "Cidr" => {
            arity(3)?;
            cidr(&args[0], &args[1], &args[2])
        }
        "FindInMap" => {
            arity(3)?;
            find_in_map(&args[0], &args[1], &args[2])
        }
        "GetAZs" => match args {
            [] => get_azs(""),
            [region] => get_azs(region),
            _ => return Err(Error::intrinsic(function, "expected at most 1 argument")),
        },
        "Join" => {
            at_least(1)?;
            join(&args[0], &args[1..])
        }
        "Select" => {
            at_least(1)?;
            select(&args[0], &args[1..])
        }
        "Split" => {
            arity(2)?;
            split(&args[0], &args[1])
        }
        "Sub" => {
            arity(1)?;
            sub(&args[0])
        }
        "And" => {
            at_least(2)?;
            and(args)
        }
        "Or" => {
            at_least(2)?;
            or(args)
        }
        "Not" => {
            arity(1)?;
            not(args)
        }
        "Equals" => {
            arity(2)?;
            equals(&args[0], &args[1])
        }
        "If" => {
            arity(3)?;
            if_(&args[0], &args[1], &args[2])
        }
        _ => return Err(Error::intrinsic(function, "unknown intrinsic function")),
    };
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decoded(tok: &str) -> Value {
        token::decode(tok).expect("helper output must decode")
    }

    #[test]
    fn scalar_forms() {
        assert_eq!(decoded(&ref_("MyBucket")), json!({"Ref": "MyBucket"}));
        assert_eq!(decoded(&import_value("SharedVpc")), json!({"Fn::ImportValue": "SharedVpc"}));
        assert_eq!(decoded(&base64("#!/bin/sh")), json!({"Fn::Base64": "#!/bin/sh"}));
        assert_eq!(decoded(&get_azs("")), json!({"Fn::GetAZs": ""}));
        assert_eq!(decoded(&sub("arn:${AWS::Partition}:s3:::b")), json!({"Fn::Sub": "arn:${AWS::Partition}:s3:::b"}));
        assert_eq!(decoded(&condition("IsProd")), json!({"Condition": "IsProd"}));
    }

    #[test]
    fn positional_forms() {
        assert_eq!(decoded(&get_att("Fn", "Arn")), json!({"Fn::GetAtt": ["Fn", "Arn"]}));
        assert_eq!(decoded(&cidr("10.0.0.0/16", "6", "5")), json!({"Fn::Cidr": ["10.0.0.0/16", "6", "5"]}));
        assert_eq!(
            decoded(&find_in_map("RegionMap", "us-east-1", "AMI")),
            json!({"Fn::FindInMap": ["RegionMap", "us-east-1", "AMI"]})
        );
        assert_eq!(decoded(&split(",", "a,b")), json!({"Fn::Split": [",", "a,b"]}));
        assert_eq!(decoded(&equals("prod", "dev")), json!({"Fn::Equals": ["prod", "dev"]}));
        assert_eq!(decoded(&if_("IsProd", "big", "small")), json!({"Fn::If": ["IsProd", "big", "small"]}));
    }

    #[test]
    fn join_has_no_delimiter_artifacts() {
        assert_eq!(decoded(&join::<&str>(",", &[])), json!({"Fn::Join": [",", []]}));
        assert_eq!(decoded(&join(",", &["a"])), json!({"Fn::Join": [",", ["a"]]}));
        assert_eq!(decoded(&join(",", &["a", "b"])), json!({"Fn::Join": [",", ["a", "b"]]}));
    }

    #[test]
    fn list_forms() {
        assert_eq!(decoded(&select("0", &["a", "b"])), json!({"Fn::Select": ["0", ["a", "b"]]}));
        assert_eq!(decoded(&and(&["A", "B"])), json!({"Fn::And": ["A", "B"]}));
        assert_eq!(decoded(&or::<&str>(&[])), json!({"Fn::Or": []}));
        assert_eq!(decoded(&not(&["A"])), json!({"Fn::Not": ["A"]}));
    }

    #[test]
    fn arguments_needing_escapes_stay_valid_json() {
        let tok = join("\"", &["say \"hi\"", "back\\slash"]);
        assert_eq!(decoded(&tok), json!({"Fn::Join": ["\"", ["say \"hi\"", "back\\slash"]]}));
    }

    #[test]
    fn nested_helpers_expand_into_nested_calls() {
        let is_prod = equals(&ref_("Env"), "prod");
        let tok = and(&[is_prod, condition("HasBucket")]);
        assert_eq!(
            token::expand(json!(tok)),
            json!({"Fn::And": [
                {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
                {"Condition": "HasBucket"}
            ]})
        );
    }

    #[test]
    fn build_accepts_short_and_prefixed_names() {
        let args = vec!["Fn".to_string(), "Arn".to_string()];
        assert_eq!(build("GetAtt", &args).unwrap(), get_att("Fn", "Arn"));
        assert_eq!(build("Fn::GetAtt", &args).unwrap(), get_att("Fn", "Arn"));
        let join_args = vec![",".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(build("Join", &join_args).unwrap(), join(",", &["a", "b"]));
        assert_eq!(build("GetAZs", &[]).unwrap(), get_azs(""));
    }

    #[test]
    fn build_rejects_bad_arity_and_unknown_names() {
        assert!(matches!(build("Ref", &[]), Err(Error::Intrinsic { .. })));
        assert!(matches!(build("Fn::Nope", &["x".to_string()]), Err(Error::Intrinsic { .. })));
    }
}
