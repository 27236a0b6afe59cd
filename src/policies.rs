//! Resource attributes: `DeletionPolicy`, `UpdateReplacePolicy`,
//! `UpdatePolicy` and `CreationPolicy`.
//!
//! Plain records serialized inline with their resource. Every field is
//! optional and left out of the output when unset.
use serde::{Deserialize, Serialize};

use crate::shape::Computed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    RetainExceptOnCreate,
    Snapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling_replacing_update: Option<AutoScalingReplacingUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling_rolling_update: Option<AutoScalingRollingUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling_scheduled_action: Option<AutoScalingScheduledAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_deploy_lambda_alias_update: Option<CodeDeployLambdaAliasUpdate>,
    /// OpenSearch/Elasticsearch domains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_version_upgrade: Option<Computed<bool>>,
    /// ElastiCache replication groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_online_resharding: Option<Computed<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingReplacingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_replace: Option<Computed<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingRollingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances_in_service: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_successful_instances_percent: Option<Computed<u32>>,
    /// ISO8601 duration, e.g. `PT5M`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_processes: Option<Computed<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_on_resource_signals: Option<Computed<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingScheduledAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_unmodified_group_size_properties: Option<Computed<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeDeployLambdaAliasUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_allow_traffic_hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_allow_traffic_hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_group_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreationPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling_creation_policy: Option<AutoScalingCreationPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_signal: Option<ResourceSignal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingCreationPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_successful_instances_percent: Option<Computed<u32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Computed<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}
