//! Remote work requested by the dashboard, run off the UI loop.
//!
//! The dashboard never awaits the network itself. It hands out [`Job`]s;
//! a [`JobRunner`] executes them and the outcomes are fed back through
//! `Dashboard::apply` on the UI loop, which is the only writer of state.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::detail::DetailLoader;
use crate::error::BuildError;
use crate::inventory::Inventory;
use crate::model::ArnPrefix;
use crate::navigation::{DetailPayload, LoadKind, LoadOutcome, LoadRequest};
use crate::scheduler::{BuildTicket, SnapshotKind};
use crate::snapshot::{InventoryTree, ServiceTable, SnapshotBuilder};

#[derive(Debug, PartialEq)]
pub enum Job {
    Build(BuildTicket),
    Load(LoadRequest),
}

#[derive(Debug)]
pub enum JobOutcome {
    Tree {
        ticket: BuildTicket,
        result: Result<InventoryTree, BuildError>,
    },
    Table {
        ticket: BuildTicket,
        result: Result<ServiceTable, BuildError>,
    },
    Load(LoadOutcome),
}

#[derive(Clone)]
pub struct JobRunner {
    inventory: Arc<dyn Inventory>,
    prefix: ArnPrefix,
    batch_limit: usize,
}

impl JobRunner {
    pub fn new(inventory: Arc<dyn Inventory>, prefix: ArnPrefix, batch_limit: usize) -> Self {
        Self {
            inventory,
            prefix,
            batch_limit,
        }
    }

    pub fn inventory(&self) -> &dyn Inventory {
        self.inventory.as_ref()
    }

    pub async fn run(&self, job: Job) -> JobOutcome {
        match job {
            Job::Build(ticket) => {
                let builder = SnapshotBuilder::new(self.inventory.as_ref(), &self.prefix)
                    .with_batch_limit(self.batch_limit);
                match ticket.kind {
                    SnapshotKind::Tree => JobOutcome::Tree {
                        result: builder.build_tree().await,
                        ticket,
                    },
                    SnapshotKind::Table => JobOutcome::Table {
                        result: builder.build_table().await,
                        ticket,
                    },
                }
            }
            Job::Load(request) => {
                let result = self.load(&request.kind).await;
                JobOutcome::Load(LoadOutcome { request, result })
            }
        }
    }

    async fn load(
        &self,
        kind: &LoadKind,
    ) -> Result<DetailPayload, crate::error::InventoryError> {
        let loader = DetailLoader::new(self.inventory.as_ref());
        match kind {
            LoadKind::Service {
                service_arn,
                cluster_arn,
            } => loader
                .load_service_detail(service_arn, cluster_arn)
                .await
                .map(DetailPayload::Service),
            LoadKind::DrillDown {
                service_arn,
                cluster_arn,
            } => loader
                .load_drill_down(service_arn, cluster_arn)
                .await
                .map(DetailPayload::DrillDown),
            LoadKind::TaskDefinition {
                task_definition_arn,
                ..
            } => loader
                .load_task_definition(task_definition_arn)
                .await
                .map(DetailPayload::TaskDefinition),
        }
    }

    /// Run each job on its own task; outcomes arrive on `tx` in completion
    /// order.
    pub fn spawn_all(&self, jobs: Vec<Job>, tx: &mpsc::UnboundedSender<JobOutcome>) {
        for job in jobs {
            let runner = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = runner.run(job).await;
                // receiver gone means the UI is shutting down
                let _ = tx.send(outcome);
            });
        }
    }
}
