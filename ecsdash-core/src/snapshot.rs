//! Builds one consistent picture of the fleet from a sequence of list and
//! describe calls.
//!
//! A build either completes or is aborted as a whole: a partial tree would
//! mix stale and fresh data while looking consistent. A transient failure
//! anywhere aborts. Clusters and services the remote side reports missing
//! between list and describe are dropped from the build instead.

use crate::error::{BuildError, InventoryError};
use crate::inventory::Inventory;
use crate::model::{
    Arn, ArnPrefix, ClusterRef, ServiceRef, ServiceSummary, resource_name,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceLeaf {
    pub service: ServiceRef,
    pub is_service: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterNode {
    pub cluster: ClusterRef,
    /// In discovery order
    pub services: Vec<ServiceLeaf>,
}

/// Clusters and their services, in the order the remote side listed them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InventoryTree {
    pub clusters: Vec<ClusterNode>,
}

impl InventoryTree {
    pub fn cluster(&self, name: &str) -> Option<&ClusterNode> {
        self.clusters.iter().find(|c| c.cluster.name == name)
    }

    pub fn service_count(&self) -> usize {
        self.clusters.iter().map(|c| c.services.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// One table row: status, service, cluster, task definition, R/P/D.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub status: String,
    pub service: String,
    pub cluster: String,
    pub task_definition: String,
    pub counts: String,
}

impl TableRow {
    pub fn from_summary(summary: &ServiceSummary) -> Self {
        Self {
            status: summary.status.to_string(),
            service: summary.name.clone(),
            cluster: resource_name(&summary.cluster_arn).to_string(),
            task_definition: resource_name(&summary.task_definition).to_string(),
            counts: summary.counts_label(),
        }
    }

    pub fn cells(&self) -> [&str; 5] {
        [
            &self.status,
            &self.service,
            &self.cluster,
            &self.task_definition,
            &self.counts,
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableEntry {
    pub row: TableRow,
    pub service: ServiceSummary,
}

/// Services in discovery order (cluster order, then service order).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceTable {
    pub entries: Vec<TableEntry>,
}

impl ServiceTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, service_arn: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.service.arn == service_arn)
    }
}

pub struct SnapshotBuilder<'a, I: ?Sized> {
    inventory: &'a I,
    prefix: &'a ArnPrefix,
    batch: usize,
}

impl<'a, I: Inventory + ?Sized> SnapshotBuilder<'a, I> {
    pub fn new(inventory: &'a I, prefix: &'a ArnPrefix) -> Self {
        Self {
            inventory,
            prefix,
            batch: inventory.max_describe_batch().max(1),
        }
    }

    /// Cap the describe batch below what the inventory advertises.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch = self.batch.min(limit.max(1));
        self
    }

    pub async fn build_tree(&self) -> Result<InventoryTree, BuildError> {
        let mut tree = InventoryTree::default();

        for (cluster, services) in self.walk().await? {
            tracing::debug!(cluster = %cluster.name, services = services.len(), "got cluster");
            let services = services
                .into_iter()
                .map(|summary| ServiceLeaf {
                    service: ServiceRef::new(summary.arn, &cluster, self.prefix),
                    is_service: true,
                })
                .collect();
            tree.clusters.push(ClusterNode { cluster, services });
        }

        tracing::info!(
            clusters = tree.clusters.len(),
            services = tree.service_count(),
            "tree rebuilt"
        );
        Ok(tree)
    }

    pub async fn build_table(&self) -> Result<ServiceTable, BuildError> {
        let mut table = ServiceTable::default();

        for (_, services) in self.walk().await? {
            for service in services {
                table.entries.push(TableEntry {
                    row: TableRow::from_summary(&service),
                    service,
                });
            }
        }

        tracing::info!(services = table.len(), "table rebuilt");
        Ok(table)
    }

    /// list clusters -> list services per cluster -> batched describe
    async fn walk(&self) -> Result<Vec<(ClusterRef, Vec<ServiceSummary>)>, BuildError> {
        let cluster_arns = self
            .inventory
            .list_clusters()
            .await
            .map_err(|e| BuildError::aborted("listing clusters", e))?;

        let mut out = Vec::with_capacity(cluster_arns.len());
        for arn in cluster_arns {
            let cluster = ClusterRef::new(arn, self.prefix);
            let service_arns = match self.inventory.list_services(&cluster.arn).await {
                Ok(arns) => arns,
                Err(InventoryError::NotFound { .. }) => {
                    tracing::warn!(cluster = %cluster.name, "cluster vanished before listing services, dropped");
                    continue;
                }
                Err(e) => {
                    return Err(BuildError::aborted(
                        format!("listing services of {}", cluster.name),
                        e,
                    ));
                }
            };
            let services = self.describe_all(&cluster, &service_arns).await?;
            out.push((cluster, services));
        }
        Ok(out)
    }

    /// Describe in chunks of at most `batch`, keeping list order and
    /// dropping what the remote side reports missing.
    async fn describe_all(
        &self,
        cluster: &ClusterRef,
        service_arns: &[Arn],
    ) -> Result<Vec<ServiceSummary>, BuildError> {
        let mut described = Vec::with_capacity(service_arns.len());
        for chunk in service_arns.chunks(self.batch) {
            let result = match self.inventory.describe_services(chunk, &cluster.arn).await {
                Ok(result) => result,
                Err(InventoryError::NotFound { resource }) => {
                    tracing::warn!(cluster = %cluster.name, %resource, services = chunk.len(), "describe target vanished, chunk dropped");
                    continue;
                }
                Err(e) => {
                    return Err(BuildError::aborted(
                        format!("describing services of {}", cluster.name),
                        e,
                    ));
                }
            };
            for arn in &result.missing {
                tracing::warn!(cluster = %cluster.name, service = %arn, "service vanished before describe, dropped");
            }
            described.extend(result.services);
        }

        let mut ordered = Vec::with_capacity(described.len());
        for arn in service_arns {
            if let Some(pos) = described.iter().position(|s| &s.arn == arn) {
                ordered.push(described.swap_remove(pos));
            }
        }
        Ok(ordered)
    }
}
