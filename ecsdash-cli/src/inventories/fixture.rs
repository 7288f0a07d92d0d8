//! Inventory served from a YAML file.
//!
//! ```yaml
//! clusters:
//!   - name: prod
//!     container_instances:
//!       ci-1: { ec2InstanceId: i-0abc, status: ACTIVE }
//!     services:
//!       - name: api
//!         task_definition: api:3
//!         desired: 2
//!         running: 2
//!         load_balancers: [api-lb]
//!         events:
//!           - created_at: 2024-03-01T12:00:00Z
//!             message: "(service api) has reached a steady state."
//!         tasks:
//!           - id: 0f1e
//!             container_instance: ci-1
//! task_definitions:
//!   "api:3": { family: api, revision: 3 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use ecsdash_core::error::ConfigError;
use ecsdash_core::inventory::{Inventory, InventoryResult};
use ecsdash_core::model::{
    Arn, ContainerInstanceDetail, DescribedServices, ServiceEvent, ServiceStatus, ServiceSummary,
    TaskDefinitionDetail, TaskDetail,
};

use super::fleet::Fleet;

/// Account used to form identifiers when none is configured.
pub const FIXTURE_ACCOUNT: &str = "000000000000";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureFile {
    #[serde(default)]
    clusters: Vec<FixtureCluster>,
    /// Keyed by `family:revision`
    #[serde(default)]
    task_definitions: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureCluster {
    name: String,
    #[serde(default)]
    services: Vec<FixtureService>,
    /// Keyed by instance id
    #[serde(default)]
    container_instances: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureService {
    name: String,
    #[serde(default = "default_status")]
    status: String,
    /// `family:revision`
    task_definition: String,
    #[serde(default)]
    desired: u32,
    #[serde(default)]
    running: u32,
    #[serde(default)]
    pending: u32,
    #[serde(default)]
    load_balancers: Vec<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    events: Vec<FixtureEvent>,
    #[serde(default)]
    tasks: Vec<FixtureTask>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureEvent {
    #[serde(default)]
    id: Option<String>,
    created_at: DateTime<Utc>,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureTask {
    id: String,
    #[serde(default)]
    container_instance: Option<String>,
    #[serde(default = "default_task_status")]
    last_status: String,
    #[serde(default = "default_task_status")]
    desired_status: String,
}

fn default_status() -> String {
    "ACTIVE".into()
}

fn default_task_status() -> String {
    "RUNNING".into()
}

pub struct FixtureInventory {
    fleet: Fleet,
}

impl FixtureInventory {
    pub fn load(path: &Path, region: &str, account_id: Option<&str>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content, region, account_id)
    }

    pub fn from_str(content: &str, region: &str, account_id: Option<&str>) -> Result<Self, ConfigError> {
        let file: FixtureFile = serde_yaml::from_str(content)?;
        let mut fleet = Fleet::new(region, account_id.unwrap_or(FIXTURE_ACCOUNT));

        for (name, payload) in file.task_definitions {
            fleet.add_task_definition(TaskDefinitionDetail {
                arn: fleet.arn(&format!("task-definition/{name}")),
                payload,
            });
        }

        for cluster in file.clusters {
            let cluster_arn = fleet.add_cluster(&cluster.name);
            for (id, payload) in cluster.container_instances {
                fleet.add_instance(ContainerInstanceDetail {
                    arn: fleet.arn(&format!("container-instance/{}/{id}", cluster.name)),
                    payload,
                });
            }
            for service in cluster.services {
                let service_arn = fleet.arn(&format!("service/{}/{}", cluster.name, service.name));
                let task_definition = fleet.arn(&format!("task-definition/{}", service.task_definition));
                for task in &service.tasks {
                    let detail = task_detail(&fleet, &cluster.name, &task_definition, task);
                    fleet.add_task(&service_arn, detail);
                }
                fleet.add_service(ServiceSummary {
                    arn: service_arn,
                    cluster_arn: cluster_arn.clone(),
                    status: ServiceStatus::from(service.status),
                    task_definition,
                    running_count: service.running,
                    pending_count: service.pending,
                    desired_count: service.desired,
                    load_balancers: service.load_balancers,
                    created_at: service.created_at,
                    events: service
                        .events
                        .into_iter()
                        .enumerate()
                        .map(|(i, e)| ServiceEvent {
                            id: e.id.unwrap_or_else(|| format!("{}-{i}", service.name)),
                            created_at: e.created_at,
                            message: e.message,
                        })
                        .collect(),
                    name: service.name,
                });
            }
        }

        tracing::info!(
            clusters = fleet.list_clusters().len(),
            services = fleet.service_count(),
            "loaded fixture inventory"
        );
        Ok(Self { fleet })
    }
}

fn task_detail(fleet: &Fleet, cluster: &str, task_definition: &str, task: &FixtureTask) -> TaskDetail {
    let arn = fleet.arn(&format!("task/{cluster}/{}", task.id));
    let container_instance_arn = task
        .container_instance
        .as_ref()
        .map(|id| fleet.arn(&format!("container-instance/{cluster}/{id}")));
    let payload = json!({
        "taskArn": arn,
        "taskDefinitionArn": task_definition,
        "lastStatus": task.last_status,
        "desiredStatus": task.desired_status,
        "containerInstanceArn": container_instance_arn,
    });
    TaskDetail {
        arn,
        container_instance_arn,
        last_status: task.last_status.clone(),
        desired_status: task.desired_status.clone(),
        payload,
    }
}

#[async_trait]
impl Inventory for FixtureInventory {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn list_clusters(&self) -> InventoryResult<Vec<Arn>> {
        Ok(self.fleet.list_clusters())
    }

    async fn list_services(&self, cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.fleet.list_services(cluster_arn)
    }

    async fn list_tasks(&self, service_arn: &str, _cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        Ok(self.fleet.list_tasks(service_arn))
    }

    async fn describe_services(
        &self,
        service_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<DescribedServices> {
        Ok(self.fleet.describe_services(service_arns, cluster_arn))
    }

    async fn describe_tasks(
        &self,
        task_arns: &[Arn],
        _cluster_arn: &str,
    ) -> InventoryResult<Vec<TaskDetail>> {
        Ok(self.fleet.describe_tasks(task_arns))
    }

    async fn describe_container_instances(
        &self,
        instance_arns: &[Arn],
        _cluster_arn: &str,
    ) -> InventoryResult<Vec<ContainerInstanceDetail>> {
        Ok(self.fleet.describe_container_instances(instance_arns))
    }

    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> InventoryResult<TaskDefinitionDetail> {
        self.fleet.describe_task_definition(task_definition_arn)
    }
}
