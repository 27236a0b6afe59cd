//! Best-effort evaluation of intrinsic functions in a rendered template.
//!
//! The input is an expanded template (no tokens). Calls whose arguments are
//! fully known after evaluating their own arguments are replaced by their
//! result; everything else (`Fn::GetAtt`, `Fn::ImportValue`, refs to
//! resources, ...) is left exactly as written.
use std::cell::RefCell;
use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::token;
use crate::error::{Error, Result};

static SUB_VARIABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").expect("static regex"));

const NO_VALUE: &str = "AWS::NoValue";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub region: String,
    pub account_id: String,
    pub stack_name: String,
    pub partition: String,
    /// Wins over a parameter's `Default`.
    pub parameter_overrides: IndexMap<String, Value>,
    /// Evaluate `Fn::If` and drop resources/outputs whose `Condition` is false.
    pub evaluate_conditions: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            stack_name: "cfn-shapes-stack".to_string(),
            partition: "aws".to_string(),
            parameter_overrides: IndexMap::new(),
            evaluate_conditions: false,
        }
    }
}

struct Resolver<'a> {
    options: &'a ResolveOptions,
    parameters: Map<String, Value>,
    mappings: Value,
    conditions: Map<String, Value>,
    /// `None` while a condition is being evaluated (cycle detection).
    evaluated: RefCell<HashMap<String, Option<bool>>>,
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

/// Resolve a whole template. Non-object input is resolved as a bare value
/// with no parameters, mappings or conditions in scope.
pub fn resolve(template: Value, options: &ResolveOptions) -> Result<Value> {
    let template = token::expand(template);
    let resolver = Resolver::new(&template, options);
    let mut root = match template {
        Value::Object(root) if token::call_name(&root).is_none() => root,
        other => return Ok(strip_no_value(resolver.resolve(other)?)),
    };

    for section in ["Resources", "Outputs"] {
        let Some(Value::Object(entries)) = root.get_mut(section) else {
            continue;
        };
        let mut kept = Map::new();
        for (name, entry) in std::mem::take(entries) {
            if options.evaluate_conditions && !resolver.entry_enabled(&entry)? {
                debug!(section, name = %name, "dropping entry whose condition is false");
                continue;
            }
            kept.insert(name, strip_no_value(resolver.resolve(entry)?));
        }
        *entries = kept;
    }
    Ok(Value::Object(root))
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Resolver<'a> {
    fn new(template: &Value, options: &'a ResolveOptions) -> Self {
        let mut parameters = Map::new();
        if let Some(Value::Object(declared)) = template.get("Parameters") {
            for (name, declaration) in declared {
                let value = options
                    .parameter_overrides
                    .get(name)
                    .cloned()
                    .or_else(|| declaration.get("Default").cloned());
                if let Some(value) = value {
                    let list_typed = declaration
                        .get("Type")
                        .and_then(Value::as_str)
                        .is_some_and(|ty| ty == "CommaDelimitedList" || ty.starts_with("List<"));
                    parameters.insert(name.clone(), parameter_value(value, list_typed));
                }
            }
        }
        let conditions = match template.get("Conditions") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        Self {
            options,
            parameters,
            mappings: template.get("Mappings").cloned().unwrap_or(Value::Null),
            conditions,
            evaluated: RefCell::new(HashMap::new()),
        }
    }

    fn resolve(&self, value: Value) -> Result<Value> {
        match value {
            Value::Object(map) if token::call_name(&map).is_some() => {
                let Some((function, args)) = map.into_iter().next() else {
                    return Ok(Value::Object(Map::new()));
                };
                let args = self.resolve(args)?;
                self.apply(&function, args)
            }
            Value::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k, self.resolve(v)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(xs) => xs.into_iter().map(|x| self.resolve(x)).collect::<Result<Vec<_>>>().map(Value::Array),
            other => Ok(other),
        }
    }

    fn apply(&self, function: &str, args: Value) -> Result<Value> {
        trace!(function, "evaluating intrinsic");
        // these decide on a condition name, so run before the "all args known" gate
        match function {
            "Condition" => {
                return match args.as_str() {
                    Some(name) => Ok(Value::Bool(self.condition(name)?)),
                    None => Ok(unresolved(function, args)),
                };
            }
            "Fn::If" if self.options.evaluate_conditions => {
                let [name, when_true, when_false] = take_array::<3>(function, args)?;
                let name = name.as_str().ok_or_else(|| Error::intrinsic(function, "expected a condition name"))?;
                return Ok(if self.condition(name)? { when_true } else { when_false });
            }
            _ => {}
        }

        if function == "Ref" {
            let name = args.as_str().ok_or_else(|| Error::intrinsic(function, "expected a logical name"))?;
            return Ok(self.reference(name).unwrap_or_else(|| unresolved(function, args.clone())));
        }

        if token::contains_call(&args) {
            return Ok(unresolved(function, args));
        }

        let value = match function {
            "Fn::Join" => {
                let [delimiter, values] = take_array::<2>(function, args)?;
                let delimiter = expect_str(function, &delimiter)?;
                let Value::Array(values) = values else {
                    return Err(Error::intrinsic(function, "expected a list of values"));
                };
                let parts = values.iter().map(|v| scalar_string(function, v)).collect::<Result<Vec<_>>>()?;
                Value::String(parts.join(delimiter))
            }
            "Fn::Select" => {
                let [index, values] = take_array::<2>(function, args)?;
                let index = match &index {
                    Value::Number(n) => n.as_u64().map(|n| n as usize),
                    Value::String(s) => s.trim().parse::<usize>().ok(),
                    _ => None,
                }
                .ok_or_else(|| Error::intrinsic(function, "index must be a non-negative integer"))?;
                let Value::Array(mut values) = values else {
                    return Err(Error::intrinsic(function, "expected a list of values"));
                };
                if index >= values.len() {
                    return Err(Error::intrinsic(function, format!("index {index} out of range for {} value(s)", values.len())));
                }
                values.swap_remove(index)
            }
            "Fn::Split" => {
                let [delimiter, source] = take_array::<2>(function, args)?;
                let delimiter = expect_str(function, &delimiter)?;
                let source = expect_str(function, &source)?;
                if delimiter.is_empty() {
                    return Err(Error::intrinsic(function, "delimiter must not be empty"));
                }
                Value::Array(source.split(delimiter).map(Value::from).collect())
            }
            "Fn::Sub" => match self.substitute(function, args.clone())? {
                Some(s) => Value::String(s),
                None => unresolved(function, args),
            },
            "Fn::Base64" => Value::String(BASE64_STANDARD.encode(expect_str(function, &args)?)),
            "Fn::FindInMap" => {
                let [map_name, top, second] = take_array::<3>(function, args)?;
                let (map_name, top, second) =
                    (expect_str(function, &map_name)?, expect_str(function, &top)?, expect_str(function, &second)?);
                self.mappings
                    .get(map_name)
                    .and_then(|m| m.get(top))
                    .and_then(|m| m.get(second))
                    .cloned()
                    .ok_or_else(|| Error::intrinsic(function, format!("no mapping entry {map_name}.{top}.{second}")))?
            }
            "Fn::GetAZs" => {
                let region = match expect_str(function, &args)? {
                    "" => self.options.region.as_str(),
                    region => region,
                };
                Value::Array(["a", "b", "c"].iter().map(|zone| Value::from(format!("{region}{zone}"))).collect())
            }
            "Fn::Equals" => {
                let [a, b] = take_array::<2>(function, args)?;
                let equal = match (scalar_string(function, &a), scalar_string(function, &b)) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => a == b,
                };
                Value::Bool(equal)
            }
            "Fn::And" | "Fn::Or" => {
                let Value::Array(items) = args else {
                    return Err(Error::intrinsic(function, "expected a list of conditions"));
                };
                if !(2..=10).contains(&items.len()) {
                    return Err(Error::intrinsic(function, "expected between 2 and 10 conditions"));
                }
                let flags = items.iter().map(|v| expect_bool(function, v)).collect::<Result<Vec<_>>>()?;
                Value::Bool(if function == "Fn::And" { flags.iter().all(|b| *b) } else { flags.iter().any(|b| *b) })
            }
            "Fn::Not" => {
                let [inner] = take_array::<1>(function, args)?;
                Value::Bool(!expect_bool(function, &inner)?)
            }
            _ => unresolved(function, args),
        };
        Ok(value)
    }

    /// Pseudo-parameters and parameters; `None` for anything else (resources).
    fn reference(&self, name: &str) -> Option<Value> {
        let options = self.options;
        let value = match name {
            "AWS::AccountId" => Value::from(options.account_id.as_str()),
            "AWS::Region" => Value::from(options.region.as_str()),
            "AWS::StackName" => Value::from(options.stack_name.as_str()),
            "AWS::Partition" => Value::from(options.partition.as_str()),
            "AWS::StackId" => Value::from(format!(
                "arn:{}:cloudformation:{}:{}:stack/{}/00000000-0000-0000-0000-000000000000",
                options.partition, options.region, options.account_id, options.stack_name
            )),
            "AWS::URLSuffix" => Value::from(if options.partition == "aws-cn" { "amazonaws.com.cn" } else { "amazonaws.com" }),
            "AWS::NotificationARNs" => Value::Array(vec![Value::from(format!(
                "arn:{}:sns:{}:{}:{}-notifications",
                options.partition, options.region, options.account_id, options.stack_name
            ))]),
            // kept as a marker; removed by `strip_no_value`
            NO_VALUE => return None,
            _ => return self.parameters.get(name).cloned(),
        };
        Some(value)
    }

    /// `None` when some variable cannot be resolved to a string.
    fn substitute(&self, function: &str, args: Value) -> Result<Option<String>> {
        let (template, variables) = match args {
            Value::String(s) => (s, Map::new()),
            Value::Array(xs) => {
                let mut xs = xs.into_iter();
                match (xs.next(), xs.next(), xs.next()) {
                    (Some(Value::String(s)), Some(Value::Object(vars)), None) => (s, vars),
                    (Some(Value::String(s)), None, None) => (s, Map::new()),
                    _ => return Err(Error::intrinsic(function, "expected a string or [string, {variables}]")),
                }
            }
            _ => return Err(Error::intrinsic(function, "expected a string or [string, {variables}]")),
        };

        let mut complete = true;
        let rendered = SUB_VARIABLE.replace_all(&template, |caps: &Captures| {
            let name = &caps[1];
            if let Some(literal) = name.strip_prefix('!') {
                return format!("${{{literal}}}");
            }
            let value = variables.get(name).cloned().or_else(|| self.reference(name));
            match value.as_ref().map(|v| scalar_string(function, v)) {
                Some(Ok(s)) => s,
                _ => {
                    complete = false;
                    caps[0].to_string()
                }
            }
        });
        let rendered = rendered.into_owned();
        Ok(complete.then_some(rendered))
    }

    fn condition(&self, name: &str) -> Result<bool> {
        if let Some(state) = self.evaluated.borrow().get(name) {
            return state.ok_or_else(|| Error::intrinsic("Condition", format!("{name} refers to itself")));
        }
        let expression = self
            .conditions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::intrinsic("Condition", format!("no condition named {name}")))?;
        self.evaluated.borrow_mut().insert(name.to_string(), None);
        let outcome = self.resolve(expression)?;
        let outcome = expect_bool("Condition", &outcome)?;
        self.evaluated.borrow_mut().insert(name.to_string(), Some(outcome));
        debug!(condition = name, outcome, "condition evaluated");
        Ok(outcome)
    }

    fn entry_enabled(&self, entry: &Value) -> Result<bool> {
        match entry.get("Condition").and_then(Value::as_str) {
            Some(name) => self.condition(name),
            None => Ok(true),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn unresolved(function: &str, args: Value) -> Value {
    let mut map = Map::new();
    map.insert(function.to_string(), args);
    Value::Object(map)
}

fn parameter_value(value: Value, list_typed: bool) -> Value {
    match value {
        Value::String(s) if list_typed => Value::Array(s.split(',').map(|part| Value::from(part.trim())).collect()),
        other => other,
    }
}

fn take_array<const N: usize>(function: &str, args: Value) -> Result<[Value; N]> {
    let Value::Array(xs) = args else {
        return Err(Error::intrinsic(function, format!("expected a list of {N} argument(s)")));
    };
    let len = xs.len();
    <[Value; N]>::try_from(xs).map_err(|_| Error::intrinsic(function, format!("expected {N} argument(s), got {len}")))
}

fn expect_str<'v>(function: &str, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| Error::intrinsic(function, "expected a string argument"))
}

fn expect_bool(function: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| Error::intrinsic(function, "expected a condition that evaluates to true or false"))
}

fn scalar_string(function: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::intrinsic(function, "expected a string, number or boolean")),
    }
}

fn is_no_value(value: &Value) -> bool {
    value.get("Ref").and_then(Value::as_str) == Some(NO_VALUE) && value.as_object().is_some_and(|m| m.len() == 1)
}

/// Remove `{"Ref": "AWS::NoValue"}` object members and list elements.
/// Unresolved calls are kept whole.
fn strip_no_value(value: Value) -> Value {
    match value {
        Value::Object(map) if token::call_name(&map).is_some() => Value::Object(map),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !is_no_value(v))
                .map(|(k, v)| (k, strip_no_value(v)))
                .collect(),
        ),
        Value::Array(xs) => Value::Array(xs.into_iter().filter(|v| !is_no_value(v)).map(strip_no_value).collect()),
        other => other,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve_with(template: Value, options: &ResolveOptions) -> Value {
        resolve(template, options).unwrap()
    }

    fn sample() -> Value {
        json!({
            "Parameters": {
                "Env": {"Type": "String", "Default": "dev"},
                "Subnets": {"Type": "CommaDelimitedList", "Default": "a, b"}
            },
            "Mappings": {
                "Sizes": {"dev": {"Memory": 128}, "prod": {"Memory": 1024}}
            },
            "Conditions": {
                "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
                "IsNotProd": {"Fn::Not": [{"Condition": "IsProd"}]}
            },
            "Resources": {
                "Bucket": {
                    "Type": "AWS::S3::Bucket",
                    "Properties": {
                        "BucketName": {"Fn::Join": ["-", [{"Ref": "AWS::StackName"}, {"Ref": "Env"}]]},
                        "Memory": {"Fn::FindInMap": ["Sizes", {"Ref": "Env"}, "Memory"]},
                        "Arn": {"Fn::GetAtt": ["Other", "Arn"]},
                        "Tier": {"Fn::If": ["IsProd", "gold", {"Ref": "AWS::NoValue"}]}
                    }
                },
                "ProdOnly": {"Type": "AWS::SNS::Topic", "Condition": "IsProd"}
            },
            "Outputs": {
                "Where": {"Value": {"Fn::Sub": "${AWS::Region}/${Env}/${!Literal}"}}
            }
        })
    }

    #[test]
    fn pseudo_parameters_and_defaults() {
        let out = resolve_with(sample(), &ResolveOptions::default());
        let props = &out["Resources"]["Bucket"]["Properties"];
        assert_eq!(props["BucketName"], json!("cfn-shapes-stack-dev"));
        assert_eq!(props["Memory"], json!(128));
        assert_eq!(out["Outputs"]["Where"]["Value"], json!("us-east-1/dev/${Literal}"));
    }

    #[test]
    fn unresolvable_calls_are_left_verbatim() {
        let out = resolve_with(sample(), &ResolveOptions::default());
        let props = &out["Resources"]["Bucket"]["Properties"];
        assert_eq!(props["Arn"], json!({"Fn::GetAtt": ["Other", "Arn"]}));
        assert_eq!(props["Tier"], json!({"Fn::If": ["IsProd", "gold", {"Ref": "AWS::NoValue"}]}));
        assert_eq!(resolve_with(json!({"Ref": "SomeResource"}), &ResolveOptions::default()), json!({"Ref": "SomeResource"}));
    }

    #[test]
    fn overrides_win_and_conditions_prune() {
        let mut options = ResolveOptions { evaluate_conditions: true, ..ResolveOptions::default() };
        let out = resolve_with(sample(), &options);
        assert!(out["Resources"].get("ProdOnly").is_none());
        // false branch was AWS::NoValue, so the key disappears
        assert!(out["Resources"]["Bucket"]["Properties"].get("Tier").is_none());

        options.parameter_overrides.insert("Env".to_string(), json!("prod"));
        let out = resolve_with(sample(), &options);
        assert!(out["Resources"].get("ProdOnly").is_some());
        assert_eq!(out["Resources"]["Bucket"]["Properties"]["Tier"], json!("gold"));
        assert_eq!(out["Resources"]["Bucket"]["Properties"]["Memory"], json!(1024));
    }

    #[test]
    fn list_parameters_split_and_select() {
        let template = json!({
            "Parameters": {"Subnets": {"Type": "CommaDelimitedList", "Default": "a, b"}},
            "Outputs": {"Second": {"Value": {"Fn::Select": ["1", {"Ref": "Subnets"}]}}}
        });
        let out = resolve_with(template, &ResolveOptions::default());
        assert_eq!(out["Outputs"]["Second"]["Value"], json!("b"));
    }

    #[test]
    fn split_getazs_base64() {
        let options = ResolveOptions { region: "eu-west-1".to_string(), ..ResolveOptions::default() };
        assert_eq!(resolve_with(json!({"Fn::Split": [",", "x,y"]}), &options), json!(["x", "y"]));
        assert_eq!(resolve_with(json!({"Fn::GetAZs": ""}), &options), json!(["eu-west-1a", "eu-west-1b", "eu-west-1c"]));
        assert_eq!(resolve_with(json!({"Fn::Base64": "hi"}), &options), json!("aGk="));
    }

    #[test]
    fn sub_with_variable_map_and_unknown_variable() {
        let options = ResolveOptions::default();
        let known = json!({"Fn::Sub": ["${Name}-${AWS::AccountId}", {"Name": "app"}]});
        assert_eq!(resolve_with(known, &options), json!("app-123456789012"));
        let unknown = json!({"Fn::Sub": "${Thing.Arn}"});
        assert_eq!(resolve_with(unknown.clone(), &options), unknown);
    }

    #[test]
    fn tokens_are_expanded_before_resolving() {
        let doc = json!({"Outputs": {"R": {"Value": crate::intrinsics::ref_("AWS::Region")}}});
        assert_eq!(resolve_with(doc, &ResolveOptions::default())["Outputs"]["R"]["Value"], json!("us-east-1"));
    }

    #[test]
    fn malformed_arguments_are_errors() {
        let options = ResolveOptions::default();
        assert!(resolve(json!({"Fn::Select": ["5", ["a"]]}), &options).is_err());
        assert!(resolve(json!({"Fn::Join": ["-"]}), &options).is_err());
        assert!(resolve(json!({"Fn::FindInMap": ["Missing", "a", "b"]}), &options).is_err());
    }

    #[test]
    fn self_referencing_condition_is_an_error() {
        let template = json!({
            "Conditions": {"Loop": {"Fn::Not": [{"Condition": "Loop"}]}},
            "Resources": {"R": {"Type": "AWS::SNS::Topic", "Condition": "Loop"}}
        });
        let options = ResolveOptions { evaluate_conditions: true, ..ResolveOptions::default() };
        assert!(matches!(resolve(template, &options), Err(Error::Intrinsic { .. })));
    }
}
