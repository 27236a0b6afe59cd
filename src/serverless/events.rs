//! Function event sources (`AWS::Serverless::Function.Events`).
//!
//! An event source is `{Type, Properties}`. When `Type` names a known kind the
//! properties decode straight into that variant; otherwise the object is
//! sniffed against every variant in declaration order.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::shape::{self, Computed, Polymorphic, Shape};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSource {
    #[serde(rename = "Type")]
    pub event_type: String,
    #[serde(rename = "Properties", skip_serializing_if = "Option::is_none")]
    pub properties: Option<EventProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventProperties {
    S3(S3Event),
    Sns(SnsEvent),
    Kinesis(KinesisEvent),
    DynamoDb(DynamoDbEvent),
    Api(ApiEvent),
    Schedule(ScheduleEvent),
    CloudWatchEvent(CloudWatchEventEvent),
    IotRule(IotRuleEvent),
    /// No required fields, so it matches any object; keep it last.
    AlexaSkill(AlexaSkillEvent),
}

/// S3 event `Events`: one event name or several.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum S3Events {
    String(String),
    StringArray(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Event {
    pub bucket: String,
    pub events: S3Events,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsEvent {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_policy: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KinesisEvent {
    pub stream: String,
    pub starting_position: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub batch_size: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub enabled: Option<Computed<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DynamoDbEvent {
    pub stream: String,
    pub starting_position: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub batch_size: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub enabled: Option<Computed<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiEvent {
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub rest_api_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleEvent {
    pub schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub enabled: Option<Computed<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudWatchEventEvent {
    pub pattern: Value,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub input_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IotRuleEvent {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub aws_iot_sql_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlexaSkillEvent {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "shape::permissive")]
    pub skill_id: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl EventSource {
    /// Event source whose `Type` matches `properties`.
    pub fn new(properties: EventProperties) -> Self {
        Self { event_type: properties.kind().to_string(), properties: Some(properties) }
    }
}

impl<'de> Deserialize<'de> for EventSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "Type")]
            event_type: String,
            #[serde(rename = "Properties", default)]
            properties: Value,
        }

        let raw = Raw::deserialize(deserializer)?;
        let properties = if raw.properties.is_null() {
            None
        } else {
            let decoded = EventProperties::decode_for_type(&raw.event_type, &raw.properties);
            if decoded.is_none() {
                warn!(
                    event_type = %raw.event_type,
                    found = %Shape::of(&raw.properties),
                    "dropping event properties that match no event kind"
                );
            }
            decoded
        };
        Ok(EventSource { event_type: raw.event_type, properties })
    }
}

impl EventProperties {
    /// SAM `Type` string for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            EventProperties::S3(_) => "S3",
            EventProperties::Sns(_) => "SNS",
            EventProperties::Kinesis(_) => "Kinesis",
            EventProperties::DynamoDb(_) => "DynamoDB",
            EventProperties::Api(_) => "Api",
            EventProperties::Schedule(_) => "Schedule",
            EventProperties::CloudWatchEvent(_) => "CloudWatchEvent",
            EventProperties::IotRule(_) => "IoTRule",
            EventProperties::AlexaSkill(_) => "AlexaSkill",
        }
    }

    /// Decode using the event `Type` when it is known, else fall back to sniffing.
    pub fn decode_for_type(event_type: &str, value: &Value) -> Option<Self> {
        match event_type {
            "S3" => shape::structured(value).map(EventProperties::S3),
            "SNS" => shape::structured(value).map(EventProperties::Sns),
            "Kinesis" => shape::structured(value).map(EventProperties::Kinesis),
            "DynamoDB" => shape::structured(value).map(EventProperties::DynamoDb),
            "Api" => shape::structured(value).map(EventProperties::Api),
            "Schedule" => shape::structured(value).map(EventProperties::Schedule),
            "CloudWatchEvent" => shape::structured(value).map(EventProperties::CloudWatchEvent),
            "IoTRule" => shape::structured(value).map(EventProperties::IotRule),
            "AlexaSkill" => shape::structured(value).map(EventProperties::AlexaSkill),
            _ => Self::sniff(value),
        }
    }
}

impl Polymorphic for EventProperties {
    const TYPE_NAME: &'static str = "AWS::Serverless::Function.EventSource.Properties";

    fn sniff(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        shape::structured(value)
            .map(EventProperties::S3)
            .or_else(|| shape::structured(value).map(EventProperties::Sns))
            .or_else(|| shape::structured(value).map(EventProperties::Kinesis))
            .or_else(|| shape::structured(value).map(EventProperties::DynamoDb))
            .or_else(|| shape::structured(value).map(EventProperties::Api))
            .or_else(|| shape::structured(value).map(EventProperties::Schedule))
            .or_else(|| shape::structured(value).map(EventProperties::CloudWatchEvent))
            .or_else(|| shape::structured(value).map(EventProperties::IotRule))
            .or_else(|| shape::structured(value).map(EventProperties::AlexaSkill))
    }
}

impl<'de> Deserialize<'de> for EventProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

impl Polymorphic for S3Events {
    const TYPE_NAME: &'static str = "AWS::Serverless::Function.S3Event.Events";

    fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => shape::string(value).map(S3Events::String),
            Value::Array(_) => shape::string_array(value).map(S3Events::StringArray),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for S3Events {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        shape::deserialize(deserializer)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
