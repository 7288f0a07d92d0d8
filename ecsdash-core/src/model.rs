use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Arn = String;

/// The fixed identifier prefix of the orchestration service for one
/// account/region, e.g. `arn:aws:ecs:eu-west-1:243865322197:`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArnPrefix {
    region: String,
    account_id: Option<String>,
}

impl ArnPrefix {
    pub fn new(region: impl Into<String>, account_id: Option<String>) -> Self {
        Self {
            region: region.into(),
            account_id,
        }
    }

    /// The literal prefix, when the account is known.
    pub fn literal(&self) -> Option<String> {
        self.account_id
            .as_ref()
            .map(|account| format!("arn:aws:ecs:{}:{}:", self.region, account))
    }

    /// Strip the prefix from an identifier. Identifiers that do not carry the
    /// prefix are returned unchanged.
    pub fn short_name<'a>(&self, arn: &'a str) -> &'a str {
        match self.literal() {
            Some(prefix) => arn.strip_prefix(prefix.as_str()).unwrap_or(arn),
            None => strip_any_ecs_prefix(arn),
        }
    }
}

/// `arn:<partition>:ecs:<region>:<account>:<rest>` -> `<rest>`
fn strip_any_ecs_prefix(arn: &str) -> &str {
    let mut parts = arn.splitn(6, ':');
    match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some("arn"), Some(partition), Some("ecs"), Some(_), Some(_), Some(rest))
            if partition.starts_with("aws") =>
        {
            rest
        }
        _ => arn,
    }
}

/// Segment after the first `/`: `cluster/prod` -> `prod`.
pub fn resource_name(arn: &str) -> &str {
    match arn.split_once('/') {
        Some((_, rest)) => rest,
        None => arn,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRef {
    pub arn: Arn,
    pub name: String,
}

impl ClusterRef {
    pub fn new(arn: impl Into<Arn>, prefix: &ArnPrefix) -> Self {
        let arn = arn.into();
        let name = prefix.short_name(&arn).to_string();
        Self { arn, name }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub arn: Arn,
    pub name: String,
    pub cluster_arn: Arn,
}

impl ServiceRef {
    pub fn new(arn: impl Into<Arn>, cluster: &ClusterRef, prefix: &ArnPrefix) -> Self {
        let arn = arn.into();
        let name = prefix.short_name(&arn).to_string();
        Self {
            arn,
            name,
            cluster_arn: cluster.arn.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceStatus {
    Active,
    Draining,
    Inactive,
    Other(String),
}

impl ServiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceStatus::Active => "ACTIVE",
            ServiceStatus::Draining => "DRAINING",
            ServiceStatus::Inactive => "INACTIVE",
            ServiceStatus::Other(s) => s,
        }
    }
}

impl From<String> for ServiceStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => ServiceStatus::Active,
            "DRAINING" => ServiceStatus::Draining,
            "INACTIVE" => ServiceStatus::Inactive,
            _ => ServiceStatus::Other(s),
        }
    }
}

impl From<ServiceStatus> for String {
    fn from(s: ServiceStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event reported for a service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEvent {
    #[serde(default)]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub arn: Arn,
    pub name: String,
    pub cluster_arn: Arn,
    pub status: ServiceStatus,
    pub task_definition: Arn,
    #[serde(default)]
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default)]
    pub desired_count: u32,
    #[serde(default)]
    pub load_balancers: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub events: Vec<ServiceEvent>,
}

impl ServiceSummary {
    pub fn load_balancer(&self) -> Option<&str> {
        self.load_balancers.first().map(String::as_str)
    }

    /// `running/pending/desired`
    pub fn counts_label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.running_count, self.pending_count, self.desired_count
        )
    }
}

/// Result of a batched describe: what came back, and what the remote side
/// reported as missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescribedServices {
    pub services: Vec<ServiceSummary>,
    pub missing: Vec<Arn>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub arn: Arn,
    #[serde(default)]
    pub container_instance_arn: Option<Arn>,
    #[serde(default)]
    pub last_status: String,
    #[serde(default)]
    pub desired_status: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerInstanceDetail {
    pub arn: Arn,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinitionDetail {
    pub arn: Arn,
    #[serde(default)]
    pub payload: serde_json::Value,
}
