use std::collections::BTreeMap;

use ecsdash_core::error::InventoryError;
use ecsdash_core::inventory::InventoryResult;
use ecsdash_core::model::{
    Arn, ContainerInstanceDetail, DescribedServices, ServiceSummary, TaskDefinitionDetail,
    TaskDetail,
};

/// An in-memory fleet answering inventory queries. Shared by the demo and
/// fixture backends.
#[derive(Clone, Debug, Default)]
pub struct Fleet {
    prefix: String,
    clusters: Vec<Arn>,
    services: BTreeMap<Arn, Vec<ServiceSummary>>,
    tasks: BTreeMap<Arn, Vec<TaskDetail>>,
    instances: BTreeMap<Arn, ContainerInstanceDetail>,
    task_definitions: BTreeMap<Arn, TaskDefinitionDetail>,
}

impl Fleet {
    pub fn new(region: &str, account_id: &str) -> Self {
        Self {
            prefix: format!("arn:aws:ecs:{region}:{account_id}:"),
            ..Self::default()
        }
    }

    /// Full identifier of a resource path such as `cluster/prod`.
    pub fn arn(&self, path: &str) -> Arn {
        format!("{}{}", self.prefix, path)
    }

    pub fn add_cluster(&mut self, name: &str) -> Arn {
        let arn = self.arn(&format!("cluster/{name}"));
        if !self.clusters.contains(&arn) {
            self.clusters.push(arn.clone());
        }
        arn
    }

    pub fn add_service(&mut self, service: ServiceSummary) {
        self.services
            .entry(service.cluster_arn.clone())
            .or_default()
            .push(service);
    }

    pub fn add_task(&mut self, service_arn: &str, task: TaskDetail) {
        self.tasks
            .entry(service_arn.to_string())
            .or_default()
            .push(task);
    }

    pub fn add_instance(&mut self, instance: ContainerInstanceDetail) {
        self.instances.insert(instance.arn.clone(), instance);
    }

    pub fn add_task_definition(&mut self, detail: TaskDefinitionDetail) {
        self.task_definitions.insert(detail.arn.clone(), detail);
    }

    pub fn service_count(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }

    pub fn list_clusters(&self) -> Vec<Arn> {
        self.clusters.clone()
    }

    pub fn list_services(&self, cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        if !self.clusters.iter().any(|c| c == cluster_arn) {
            return Err(InventoryError::not_found(cluster_arn));
        }
        Ok(self
            .services
            .get(cluster_arn)
            .map(|list| list.iter().map(|s| s.arn.clone()).collect())
            .unwrap_or_default())
    }

    pub fn list_tasks(&self, service_arn: &str) -> Vec<Arn> {
        self.tasks
            .get(service_arn)
            .map(|list| list.iter().map(|t| t.arn.clone()).collect())
            .unwrap_or_default()
    }

    pub fn describe_services(&self, service_arns: &[Arn], cluster_arn: &str) -> DescribedServices {
        let known = self.services.get(cluster_arn);
        let mut described = DescribedServices::default();
        for arn in service_arns {
            match known.and_then(|list| list.iter().find(|s| &s.arn == arn)) {
                Some(service) => described.services.push(service.clone()),
                None => described.missing.push(arn.clone()),
            }
        }
        described
    }

    pub fn describe_tasks(&self, task_arns: &[Arn]) -> Vec<TaskDetail> {
        self.tasks
            .values()
            .flatten()
            .filter(|t| task_arns.contains(&t.arn))
            .cloned()
            .collect()
    }

    pub fn describe_container_instances(&self, instance_arns: &[Arn]) -> Vec<ContainerInstanceDetail> {
        instance_arns
            .iter()
            .filter_map(|arn| self.instances.get(arn))
            .cloned()
            .collect()
    }

    pub fn describe_task_definition(&self, arn: &str) -> InventoryResult<TaskDefinitionDetail> {
        self.task_definitions
            .get(arn)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(arn))
    }
}
