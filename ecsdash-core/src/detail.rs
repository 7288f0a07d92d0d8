//! Describe-chains behind the detail panels.

use futures_util::future::join_all;

use crate::error::InventoryError;
use crate::inventory::{Inventory, InventoryResult};
use crate::model::{
    Arn, ContainerInstanceDetail, ServiceSummary, TaskDefinitionDetail, TaskDetail,
};

/// A per-entry result inside a drill-down. Failures are kept next to the
/// entries that did load instead of failing the whole drill-down.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    Loaded(T),
    Unavailable(String),
}

impl<T> Fetched<T> {
    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Fetched::Loaded(v) => Some(v),
            Fetched::Unavailable(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Fetched::Unavailable(_))
    }
}

impl<T> From<InventoryResult<T>> for Fetched<T> {
    fn from(result: InventoryResult<T>) -> Self {
        match result {
            Ok(v) => Fetched::Loaded(v),
            Err(e) => Fetched::Unavailable(e.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskEntry {
    pub task_arn: Arn,
    pub detail: Fetched<TaskDetail>,
    /// None when the task is not placed on a container instance
    pub instance: Option<Fetched<ContainerInstanceDetail>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrillDown {
    pub service: ServiceSummary,
    pub tasks: Vec<TaskEntry>,
}

impl DrillDown {
    pub fn unavailable_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| {
                t.detail.is_unavailable()
                    || t.instance.as_ref().is_some_and(Fetched::is_unavailable)
            })
            .count()
    }
}

pub struct DetailLoader<'a, I: ?Sized> {
    inventory: &'a I,
}

impl<'a, I: Inventory + ?Sized> DetailLoader<'a, I> {
    pub fn new(inventory: &'a I) -> Self {
        Self { inventory }
    }

    pub async fn load_service_detail(
        &self,
        service_arn: &str,
        cluster_arn: &str,
    ) -> InventoryResult<ServiceSummary> {
        let described = self
            .inventory
            .describe_services(&[service_arn.to_string()], cluster_arn)
            .await?;
        described
            .services
            .into_iter()
            .find(|s| s.arn == service_arn)
            .ok_or_else(|| InventoryError::not_found(service_arn))
    }

    pub async fn load_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> InventoryResult<TaskDefinitionDetail> {
        self.inventory
            .describe_task_definition(task_definition_arn)
            .await
    }

    /// Service, its tasks, and the container instance of each task.
    /// Only the service describe and the task listing can fail the whole
    /// drill-down.
    pub async fn load_drill_down(
        &self,
        service_arn: &str,
        cluster_arn: &str,
    ) -> InventoryResult<DrillDown> {
        let service = self.load_service_detail(service_arn, cluster_arn).await?;
        let task_arns = self.inventory.list_tasks(service_arn, cluster_arn).await?;
        tracing::debug!(service = %service.name, tasks = task_arns.len(), "drilling down");

        let tasks = join_all(
            task_arns
                .into_iter()
                .map(|task_arn| self.load_task(task_arn, cluster_arn)),
        )
        .await;

        let drill = DrillDown { service, tasks };
        let failed = drill.unavailable_count();
        if failed > 0 {
            tracing::warn!(service = %drill.service.name, failed, "some task details unavailable");
        }
        Ok(drill)
    }

    async fn load_task(&self, task_arn: Arn, cluster_arn: &str) -> TaskEntry {
        let detail = self
            .inventory
            .describe_tasks(std::slice::from_ref(&task_arn), cluster_arn)
            .await
            .and_then(|tasks| {
                tasks
                    .into_iter()
                    .find(|t| t.arn == task_arn)
                    .ok_or_else(|| InventoryError::not_found(task_arn.as_str()))
            });

        let instance = match &detail {
            Ok(TaskDetail {
                container_instance_arn: Some(instance_arn),
                ..
            }) => Some(self.load_instance(instance_arn, cluster_arn).await),
            _ => None,
        };

        TaskEntry {
            task_arn,
            detail: detail.into(),
            instance,
        }
    }

    async fn load_instance(
        &self,
        instance_arn: &str,
        cluster_arn: &str,
    ) -> Fetched<ContainerInstanceDetail> {
        self.inventory
            .describe_container_instances(&[instance_arn.to_string()], cluster_arn)
            .await
            .and_then(|list| {
                list.into_iter()
                    .find(|i| i.arn == instance_arn)
                    .ok_or_else(|| InventoryError::not_found(instance_arn))
            })
            .into()
    }
}
