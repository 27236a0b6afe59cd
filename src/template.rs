//! The template document: sections, resources and their attributes.
//!
//! Parsing tokenizes every `Ref`/`Fn::*` object first, so a call can sit in
//! any string-typed property of a typed resource; non-string properties that
//! accept calls are [`Computed`]. Serializing expands the
//! tokens again; a template always leaves the crate as plain CloudFormation
//! JSON.
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::intrinsics::{self, token, ResolveOptions};
use crate::path_de;
use crate::policies::{CreationPolicy, DeletionPolicy, UpdatePolicy};
use crate::serverless;
use crate::shape::{self, Computed, Mismatch, Polymorphic};

pub const FORMAT_VERSION: &str = "2010-09-09";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion", default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mappings: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub conditions: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, Resource>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

/// `Transform`: one macro name or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Transform {
    String(String),
    StringArray(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::lenient")]
    pub depends_on: Option<DependsOn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<Computed<DeletionPolicy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<Computed<DeletionPolicy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<UpdatePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_policy: Option<CreationPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DependsOn {
    String(String),
    StringArray(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_echo: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: Value,
}

/// A typed `Properties` block for one resource type.
pub trait ResourceType: Serialize + DeserializeOwned {
    const TYPE: &'static str;

    /// Strict shape check of raw properties; empty when nothing is polymorphic.
    fn audit(_properties: &Value, _path: &str) -> Vec<Mismatch> {
        Vec::new()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

impl FromStr for Template {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self> {
        let value = path_de::from_str_with_path::<Value>(src)?;
        Self::from_value(value)
    }
}

impl Template {
    pub fn new() -> Self {
        Self { format_version: Some(FORMAT_VERSION.to_string()), ..Self::default() }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value = path_de::from_slice_with_path::<Value>(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        path_de::from_value_with_path(token::tokenize(value))
    }

    /// Plain CloudFormation JSON, tokens expanded.
    pub fn to_value(&self) -> Result<Value> {
        let value = serde_json::to_value(self).map_err(Error::Serialize)?;
        Ok(token::expand(value))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_value()?).map_err(Error::Serialize)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value()?).map_err(Error::Serialize)
    }

    /// Evaluate what can be evaluated; see [`intrinsics::resolve`].
    pub fn resolve(&self, options: &ResolveOptions) -> Result<Value> {
        intrinsics::resolve(self.to_value()?, options)
    }

    /// Every resource of type `T`, decoded, in document order.
    pub fn resources_of<T: ResourceType>(&self) -> Result<IndexMap<String, T>> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.resource_type == T::TYPE)
            .map(|(name, resource)| Ok((name.clone(), decode_properties(name, resource)?)))
            .collect()
    }

    /// `Ok(None)` when `name` is missing or has another type.
    pub fn resource_of<T: ResourceType>(&self, name: &str) -> Result<Option<T>> {
        match self.resources.get(name) {
            Some(resource) if resource.resource_type == T::TYPE => decode_properties(name, resource).map(Some),
            _ => Ok(None),
        }
    }

    /// Add or replace `name` with a resource of type `T`.
    pub fn insert_resource<T: ResourceType>(&mut self, name: &str, properties: &T) -> Result<()> {
        let properties = serde_json::to_value(properties).map_err(Error::Serialize)?;
        let resource = Resource::new(T::TYPE, properties);
        if self.resources.insert(name.to_string(), resource).is_some() {
            debug!(name, resource_type = T::TYPE, "replaced existing resource");
        }
        Ok(())
    }

    /// Strict shape errors across every typed serverless resource.
    pub fn audit(&self) -> Vec<Mismatch> {
        let mut found = Vec::new();
        for (name, resource) in &self.resources {
            let Some(properties) = resource.properties.as_ref() else {
                continue;
            };
            let path = format!("Resources.{name}.Properties");
            if let Some(mismatches) = serverless::audit(&resource.resource_type, properties, &path) {
                found.extend(mismatches);
            }
        }
        found
    }
}

impl Resource {
    pub fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties: Some(properties),
            depends_on: None,
            condition: None,
            metadata: None,
            deletion_policy: None,
            update_replace_policy: None,
            update_policy: None,
            creation_policy: None,
        }
    }
}

impl Polymorphic for Transform {
    const TYPE_NAME: &'static str = "Transform";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(Transform::String),
            Value::Array(_) => shape::string_array(value).map(Transform::StringArray),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl Polymorphic for DependsOn {
    const TYPE_NAME: &'static str = "DependsOn";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(DependsOn::String),
            Value::Array(_) => shape::string_array(value).map(DependsOn::StringArray),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for DependsOn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn decode_properties<T: ResourceType>(name: &str, resource: &Resource) -> Result<T> {
    let properties = resource.properties.clone().unwrap_or_else(|| Value::Object(Default::default()));
    path_de::from_value_with_path(properties).map_err(|err| match err {
        Error::Parse { path, source, call } => {
            Error::Parse { path: format!("Resources.{name}.Properties.{path}"), source, call }
        }
        other => other,
    })
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
