//! Boundary to the remote orchestration service.
//!
//! The dashboard never talks to the remote API directly; every list/describe
//! call goes through an [`Inventory`]. Backends (the demo fleet, a YAML
//! fixture, a real API client) implement this trait.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::InventoryError;
use crate::model::{
    Arn, ContainerInstanceDetail, DescribedServices, TaskDefinitionDetail, TaskDetail,
};

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Default per-call item limit of batched describes.
pub const DEFAULT_DESCRIBE_BATCH: usize = 10;

#[async_trait]
pub trait Inventory: Send + Sync {
    /// Human-readable name of this backend
    fn name(&self) -> &'static str;

    /// Max items accepted by one `describe_services` call
    fn max_describe_batch(&self) -> usize {
        DEFAULT_DESCRIBE_BATCH
    }

    async fn list_clusters(&self) -> InventoryResult<Vec<Arn>>;

    async fn list_services(&self, cluster_arn: &str) -> InventoryResult<Vec<Arn>>;

    async fn list_tasks(&self, service_arn: &str, cluster_arn: &str) -> InventoryResult<Vec<Arn>>;

    async fn describe_services(
        &self,
        service_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<DescribedServices>;

    async fn describe_tasks(
        &self,
        task_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<Vec<TaskDetail>>;

    async fn describe_container_instances(
        &self,
        instance_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<Vec<ContainerInstanceDetail>>;

    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> InventoryResult<TaskDefinitionDetail>;
}

/// Bounds every call of the wrapped inventory; calls that run longer fail
/// with [`InventoryError::Transient`].
pub struct TimeoutInventory<I> {
    inner: I,
    timeout: Duration,
}

impl<I: Inventory> TimeoutInventory<I> {
    pub fn new(inner: I, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        op: &str,
        fut: impl Future<Output = InventoryResult<T>>,
    ) -> InventoryResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout = ?self.timeout, "inventory call timed out");
                Err(InventoryError::transient(format!(
                    "{} timed out after {}s",
                    op,
                    self.timeout.as_secs_f32()
                )))
            }
        }
    }
}

#[async_trait]
impl<I: Inventory> Inventory for TimeoutInventory<I> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn max_describe_batch(&self) -> usize {
        self.inner.max_describe_batch()
    }

    async fn list_clusters(&self) -> InventoryResult<Vec<Arn>> {
        self.bounded("ListClusters", self.inner.list_clusters())
            .await
    }

    async fn list_services(&self, cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.bounded("ListServices", self.inner.list_services(cluster_arn))
            .await
    }

    async fn list_tasks(&self, service_arn: &str, cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.bounded("ListTasks", self.inner.list_tasks(service_arn, cluster_arn))
            .await
    }

    async fn describe_services(
        &self,
        service_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<DescribedServices> {
        self.bounded(
            "DescribeServices",
            self.inner.describe_services(service_arns, cluster_arn),
        )
        .await
    }

    async fn describe_tasks(
        &self,
        task_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<Vec<TaskDetail>> {
        self.bounded(
            "DescribeTasks",
            self.inner.describe_tasks(task_arns, cluster_arn),
        )
        .await
    }

    async fn describe_container_instances(
        &self,
        instance_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<Vec<ContainerInstanceDetail>> {
        self.bounded(
            "DescribeContainerInstances",
            self.inner
                .describe_container_instances(instance_arns, cluster_arn),
        )
        .await
    }

    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> InventoryResult<TaskDefinitionDetail> {
        self.bounded(
            "DescribeTaskDefinition",
            self.inner.describe_task_definition(task_definition_arn),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedInventory;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_becomes_transient() {
        let inner = ScriptedInventory::new().with_latency(Duration::from_secs(30));
        let inventory = TimeoutInventory::new(inner, Duration::from_secs(5));

        let err = inventory.list_clusters().await.unwrap_err();
        assert!(matches!(err, InventoryError::Transient { ref message } if message.contains("ListClusters")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_passes_through() {
        let inner = ScriptedInventory::new().with_cluster("arn:aws:ecs:eu-west-1:1:cluster/a");
        let inventory = TimeoutInventory::new(inner, Duration::from_secs(5));

        let clusters = inventory.list_clusters().await.unwrap();
        assert_eq!(clusters, vec!["arn:aws:ecs:eu-west-1:1:cluster/a".to_string()]);
    }
}
