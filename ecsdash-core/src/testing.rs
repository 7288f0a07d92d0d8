//! In-memory inventory with failure injection, for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::InventoryError;
use crate::inventory::{Inventory, InventoryResult};
use crate::model::{
    Arn, ContainerInstanceDetail, DescribedServices, ServiceEvent, ServiceStatus, ServiceSummary,
    TaskDefinitionDetail, TaskDetail,
};

pub const ACCOUNT: &str = "111122223333";
pub const REGION: &str = "eu-west-1";

pub fn cluster_arn(name: &str) -> Arn {
    format!("arn:aws:ecs:{REGION}:{ACCOUNT}:cluster/{name}")
}

pub fn service_arn(cluster: &str, name: &str) -> Arn {
    format!("arn:aws:ecs:{REGION}:{ACCOUNT}:service/{cluster}/{name}")
}

pub fn task_arn(cluster: &str, id: &str) -> Arn {
    format!("arn:aws:ecs:{REGION}:{ACCOUNT}:task/{cluster}/{id}")
}

pub fn instance_arn(cluster: &str, id: &str) -> Arn {
    format!("arn:aws:ecs:{REGION}:{ACCOUNT}:container-instance/{cluster}/{id}")
}

pub fn task_definition_arn(family: &str, revision: u32) -> Arn {
    format!("arn:aws:ecs:{REGION}:{ACCOUNT}:task-definition/{family}:{revision}")
}

pub fn summary(cluster: &str, name: &str) -> ServiceSummary {
    ServiceSummary {
        arn: service_arn(cluster, name),
        name: name.to_string(),
        cluster_arn: cluster_arn(cluster),
        status: ServiceStatus::Active,
        task_definition: task_definition_arn(name, 1),
        running_count: 1,
        pending_count: 0,
        desired_count: 1,
        load_balancers: Vec::new(),
        created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        events: Vec::new(),
    }
}

/// `count` events one minute apart, oldest first.
pub fn events(count: usize) -> Vec<ServiceEvent> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    (1..=count)
        .map(|i| ServiceEvent {
            id: format!("e{i}"),
            created_at: start + chrono::Duration::minutes(i as i64),
            message: format!("event {i}"),
        })
        .collect()
}

#[derive(Default)]
struct Fleet {
    clusters: Vec<Arn>,
    services: BTreeMap<Arn, Vec<ServiceSummary>>,
    tasks: BTreeMap<Arn, Vec<TaskDetail>>,
    instances: BTreeMap<Arn, ContainerInstanceDetail>,
    task_definitions: BTreeMap<Arn, TaskDefinitionDetail>,
}

/// Scripted fleet. Failures are keyed either by operation name
/// (`"ListClusters"`) or by the identifier the call is about.
#[derive(Default)]
pub struct ScriptedInventory {
    fleet: Mutex<Fleet>,
    failing_ops: Mutex<BTreeSet<String>>,
    failing_arns: Mutex<BTreeSet<Arn>>,
    vanished: Mutex<BTreeSet<Arn>>,
    gone_on_describe: Mutex<BTreeSet<Arn>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
    batch: Option<usize>,
}

impl ScriptedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_cluster(self, arn: &str) -> Self {
        self.fleet.lock().unwrap().clusters.push(arn.to_string());
        self
    }

    pub fn with_service(self, service: ServiceSummary) -> Self {
        {
            let mut fleet = self.fleet.lock().unwrap();
            if !fleet.clusters.contains(&service.cluster_arn) {
                fleet.clusters.push(service.cluster_arn.clone());
            }
            fleet
                .services
                .entry(service.cluster_arn.clone())
                .or_default()
                .push(service);
        }
        self
    }

    pub fn with_task(self, service_arn: &str, task: TaskDetail) -> Self {
        self.fleet
            .lock()
            .unwrap()
            .tasks
            .entry(service_arn.to_string())
            .or_default()
            .push(task);
        self
    }

    pub fn with_instance(self, instance: ContainerInstanceDetail) -> Self {
        self.fleet
            .lock()
            .unwrap()
            .instances
            .insert(instance.arn.clone(), instance);
        self
    }

    pub fn with_task_definition(self, detail: TaskDefinitionDetail) -> Self {
        self.fleet
            .lock()
            .unwrap()
            .task_definitions
            .insert(detail.arn.clone(), detail);
        self
    }

    pub fn fail_op(&self, op: &str) {
        self.failing_ops.lock().unwrap().insert(op.to_string());
    }

    pub fn heal_op(&self, op: &str) {
        self.failing_ops.lock().unwrap().remove(op);
    }

    pub fn fail_arn(&self, arn: &str) {
        self.failing_arns.lock().unwrap().insert(arn.to_string());
    }

    /// Listed, but reported missing on describe. A vanished cluster fails
    /// its service listing with `NotFound`.
    pub fn vanish(&self, arn: &str) {
        self.vanished.lock().unwrap().insert(arn.to_string());
    }

    /// Services of this cluster list fine, then describing them fails with
    /// `NotFound` for the cluster.
    pub fn vanish_on_describe(&self, cluster_arn: &str) {
        self.gone_on_describe
            .lock()
            .unwrap()
            .insert(cluster_arn.to_string());
    }

    pub fn update_service(&self, service: ServiceSummary) {
        let mut fleet = self.fleet.lock().unwrap();
        if let Some(list) = fleet.services.get_mut(&service.cluster_arn) {
            if let Some(slot) = list.iter_mut().find(|s| s.arn == service.arn) {
                *slot = service;
            }
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, op: &str, subject: &[&str]) -> InventoryResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{op}({})", subject.len()));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_ops.lock().unwrap().contains(op) {
            return Err(InventoryError::transient(format!("{op} failed")));
        }
        let failing = self.failing_arns.lock().unwrap();
        if let Some(arn) = subject.iter().find(|a| failing.contains(**a)) {
            return Err(InventoryError::transient(format!("{op} failed for {arn}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Inventory for ScriptedInventory {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn max_describe_batch(&self) -> usize {
        self.batch.unwrap_or(crate::inventory::DEFAULT_DESCRIBE_BATCH)
    }

    async fn list_clusters(&self) -> InventoryResult<Vec<Arn>> {
        self.enter("ListClusters", &[]).await?;
        Ok(self.fleet.lock().unwrap().clusters.clone())
    }

    async fn list_services(&self, cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.enter("ListServices", &[cluster_arn]).await?;
        if self.vanished.lock().unwrap().contains(cluster_arn) {
            return Err(InventoryError::not_found(cluster_arn));
        }
        let fleet = self.fleet.lock().unwrap();
        Ok(fleet
            .services
            .get(cluster_arn)
            .map(|list| list.iter().map(|s| s.arn.clone()).collect())
            .unwrap_or_default())
    }

    async fn list_tasks(&self, service_arn: &str, _cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.enter("ListTasks", &[service_arn]).await?;
        let fleet = self.fleet.lock().unwrap();
        Ok(fleet
            .tasks
            .get(service_arn)
            .map(|list| list.iter().map(|t| t.arn.clone()).collect())
            .unwrap_or_default())
    }

    async fn describe_services(
        &self,
        service_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<DescribedServices> {
        let subject: Vec<&str> = service_arns.iter().map(String::as_str).collect();
        self.enter("DescribeServices", &subject).await?;
        if self.gone_on_describe.lock().unwrap().contains(cluster_arn) {
            return Err(InventoryError::not_found(cluster_arn));
        }
        let fleet = self.fleet.lock().unwrap();
        let vanished = self.vanished.lock().unwrap();
        let known = fleet.services.get(cluster_arn);
        let mut out = DescribedServices::default();
        for arn in service_arns {
            match known.and_then(|list| list.iter().find(|s| &s.arn == arn)) {
                Some(service) if !vanished.contains(arn) => out.services.push(service.clone()),
                _ => out.missing.push(arn.clone()),
            }
        }
        Ok(out)
    }

    async fn describe_tasks(
        &self,
        task_arns: &[Arn],
        _cluster_arn: &str,
    ) -> InventoryResult<Vec<TaskDetail>> {
        let subject: Vec<&str> = task_arns.iter().map(String::as_str).collect();
        self.enter("DescribeTasks", &subject).await?;
        let fleet = self.fleet.lock().unwrap();
        Ok(fleet
            .tasks
            .values()
            .flatten()
            .filter(|t| task_arns.contains(&t.arn))
            .cloned()
            .collect())
    }

    async fn describe_container_instances(
        &self,
        instance_arns: &[Arn],
        _cluster_arn: &str,
    ) -> InventoryResult<Vec<ContainerInstanceDetail>> {
        let subject: Vec<&str> = instance_arns.iter().map(String::as_str).collect();
        self.enter("DescribeContainerInstances", &subject).await?;
        let fleet = self.fleet.lock().unwrap();
        Ok(instance_arns
            .iter()
            .filter_map(|arn| fleet.instances.get(arn).cloned())
            .collect())
    }

    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> InventoryResult<TaskDefinitionDetail> {
        self.enter("DescribeTaskDefinition", &[task_definition_arn])
            .await?;
        self.fleet
            .lock()
            .unwrap()
            .task_definitions
            .get(task_definition_arn)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(task_definition_arn))
    }
}
