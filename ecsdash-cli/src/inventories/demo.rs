use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use ecsdash_core::error::InventoryError;
use ecsdash_core::inventory::{Inventory, InventoryResult};
use ecsdash_core::model::{
    Arn, ContainerInstanceDetail, DescribedServices, ServiceEvent, ServiceStatus, ServiceSummary,
    TaskDefinitionDetail, TaskDetail,
};

use super::fleet::Fleet;

pub const DEMO_ACCOUNT: &str = "123456789012";

/// (cluster, service, desired, task definition revision)
const SERVICES: &[(&str, &str, u32, u32)] = &[
    ("prod", "api", 3, 14),
    ("prod", "worker", 2, 9),
    ("prod", "web", 2, 21),
    ("staging", "api", 1, 15),
    ("staging", "worker", 1, 10),
];

const EMPTY_CLUSTERS: &[&str] = &["sandbox"];

/// Simulated fleet. Every tree refresh advances one round: counts drift,
/// deployments come and go, and events accumulate. Every `fail_every`-th
/// task describe fails.
pub struct DemoInventory {
    region: String,
    started: DateTime<Utc>,
    fleet: Mutex<Fleet>,
    round: AtomicU64,
    task_describes: AtomicU64,
    fail_every: u64,
    latency: Duration,
}

impl DemoInventory {
    pub fn new(region: &str) -> Self {
        let started = Utc::now();
        Self {
            region: region.to_string(),
            started,
            fleet: Mutex::new(build_fleet(region, started, 0)),
            round: AtomicU64::new(0),
            task_describes: AtomicU64::new(0),
            fail_every: 4,
            latency: Duration::from_millis(120),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn with_fleet<T>(&self, f: impl FnOnce(&Fleet) -> T) -> InventoryResult<T> {
        let fleet = self
            .fleet
            .lock()
            .map_err(|_| InventoryError::transient("demo fleet lock poisoned"))?;
        Ok(f(&fleet))
    }
}

fn build_fleet(region: &str, started: DateTime<Utc>, round: u64) -> Fleet {
    let mut fleet = Fleet::new(region, DEMO_ACCOUNT);

    for (i, &(cluster, service, desired, revision)) in SERVICES.iter().enumerate() {
        let cluster_arn = fleet.add_cluster(cluster);
        let seed = round + i as u64;

        // a rollout every few rounds leaves one task pending
        let pending = u32::from(seed % 5 == 0).min(desired);
        let running = desired - pending;
        let status = if cluster == "staging" && service == "worker" && round % 6 >= 3 {
            ServiceStatus::Draining
        } else {
            ServiceStatus::Active
        };

        let family = format!("{cluster}-{service}");
        let task_definition = fleet.arn(&format!("task-definition/{family}:{revision}"));
        fleet.add_task_definition(TaskDefinitionDetail {
            arn: task_definition.clone(),
            payload: json!({
                "family": family,
                "revision": revision,
                "networkMode": "bridge",
                "containerDefinitions": [{
                    "name": service,
                    "image": format!("registry.example.com/{service}:{revision}"),
                    "memory": 512,
                    "cpu": 256,
                    "essential": true,
                }],
            }),
        });

        let service_arn = fleet.arn(&format!("service/{cluster}/{service}"));
        for t in 0..desired {
            let instance_id = format!("ci-{}", t % 2);
            let instance_arn = fleet.arn(&format!("container-instance/{cluster}/{instance_id}"));
            let task_arn = fleet.arn(&format!("task/{cluster}/{service}-{t}"));
            let last_status = if t < running { "RUNNING" } else { "PENDING" };
            fleet.add_instance(ContainerInstanceDetail {
                arn: instance_arn.clone(),
                payload: json!({
                    "ec2InstanceId": format!("i-0{cluster}{t}"),
                    "status": "ACTIVE",
                    "agentConnected": true,
                    "runningTasksCount": running,
                }),
            });
            fleet.add_task(
                &service_arn,
                TaskDetail {
                    payload: json!({
                        "taskArn": task_arn,
                        "taskDefinitionArn": task_definition,
                        "containerInstanceArn": instance_arn,
                        "lastStatus": last_status,
                        "desiredStatus": "RUNNING",
                        "startedAt": (started + chrono::Duration::seconds(t as i64)).to_rfc3339(),
                    }),
                    arn: task_arn,
                    container_instance_arn: Some(instance_arn),
                    last_status: last_status.to_string(),
                    desired_status: "RUNNING".to_string(),
                },
            );
        }

        fleet.add_service(ServiceSummary {
            arn: service_arn,
            name: service.to_string(),
            cluster_arn,
            status,
            task_definition,
            running_count: running,
            pending_count: pending,
            desired_count: desired,
            load_balancers: if service == "worker" {
                Vec::new()
            } else {
                vec![format!("{cluster}-{service}-lb")]
            },
            created_at: Some(started - chrono::Duration::days(30 + i as i64)),
            events: demo_events(service, started, round),
        });
    }

    for cluster in EMPTY_CLUSTERS {
        fleet.add_cluster(cluster);
    }
    fleet
}

fn demo_events(service: &str, started: DateTime<Utc>, round: u64) -> Vec<ServiceEvent> {
    (0..(3 + round))
        .map(|i| {
            let message = if i % 4 == 3 {
                format!("(service {service}) has started 1 tasks: (task {service}-{i}).")
            } else {
                format!("(service {service}) has reached a steady state.")
            };
            ServiceEvent {
                id: format!("{service}-{i}"),
                created_at: started + chrono::Duration::minutes(i as i64),
                message,
            }
        })
        .collect()
}

#[async_trait]
impl Inventory for DemoInventory {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn list_clusters(&self) -> InventoryResult<Vec<Arn>> {
        self.simulate_latency().await;
        let round = self.round.fetch_add(1, Ordering::Relaxed) + 1;
        let next = build_fleet(&self.region, self.started, round);
        let mut fleet = self
            .fleet
            .lock()
            .map_err(|_| InventoryError::transient("demo fleet lock poisoned"))?;
        *fleet = next;
        tracing::debug!(round, "demo fleet advanced");
        Ok(fleet.list_clusters())
    }

    async fn list_services(&self, cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.simulate_latency().await;
        self.with_fleet(|f| f.list_services(cluster_arn))?
    }

    async fn list_tasks(&self, service_arn: &str, _cluster_arn: &str) -> InventoryResult<Vec<Arn>> {
        self.simulate_latency().await;
        self.with_fleet(|f| f.list_tasks(service_arn))
    }

    async fn describe_services(
        &self,
        service_arns: &[Arn],
        cluster_arn: &str,
    ) -> InventoryResult<DescribedServices> {
        self.simulate_latency().await;
        self.with_fleet(|f| f.describe_services(service_arns, cluster_arn))
    }

    async fn describe_tasks(
        &self,
        task_arns: &[Arn],
        _cluster_arn: &str,
    ) -> InventoryResult<Vec<TaskDetail>> {
        self.simulate_latency().await;
        let n = self.task_describes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(InventoryError::transient("DescribeTasks throttled (demo)"));
        }
        self.with_fleet(|f| f.describe_tasks(task_arns))
    }

    async fn describe_container_instances(
        &self,
        instance_arns: &[Arn],
        _cluster_arn: &str,
    ) -> InventoryResult<Vec<ContainerInstanceDetail>> {
        self.simulate_latency().await;
        self.with_fleet(|f| f.describe_container_instances(instance_arns))
    }

    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> InventoryResult<TaskDefinitionDetail> {
        self.simulate_latency().await;
        self.with_fleet(|f| f.describe_task_definition(task_definition_arn))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> DemoInventory {
        DemoInventory::new("eu-west-1")
            .with_latency(Duration::ZERO)
            .with_fail_every(3)
    }

    #[tokio::test]
    async fn test_fleet_shape() {
        let inv = demo();
        let clusters = inv.list_clusters().await.unwrap();
        assert_eq!(clusters.len(), 3);
        assert!(clusters[2].ends_with(":cluster/sandbox"));

        let services = inv.list_services(&clusters[0]).await.unwrap();
        assert_eq!(services.len(), 3);
        assert!(inv.list_services(&clusters[2]).await.unwrap().is_empty());

        let described = inv.describe_services(&services, &clusters[0]).await.unwrap();
        assert!(described.missing.is_empty());
        for s in &described.services {
            assert_eq!(s.running_count + s.pending_count, s.desired_count);
        }
    }

    #[tokio::test]
    async fn test_events_grow_each_round() {
        let inv = demo();
        let clusters = inv.list_clusters().await.unwrap();
        let services = inv.list_services(&clusters[0]).await.unwrap();
        let first = inv.describe_services(&services[..1], &clusters[0]).await.unwrap();

        inv.list_clusters().await.unwrap();
        let second = inv.describe_services(&services[..1], &clusters[0]).await.unwrap();
        assert_eq!(
            second.services[0].events.len(),
            first.services[0].events.len() + 1
        );
    }

    #[tokio::test]
    async fn test_every_nth_task_describe_fails() {
        let inv = demo();
        let clusters = inv.list_clusters().await.unwrap();
        let services = inv.list_services(&clusters[0]).await.unwrap();
        let tasks = inv.list_tasks(&services[0], &clusters[0]).await.unwrap();
        assert_eq!(tasks.len(), 3);

        let mut failures = 0;
        for task in &tasks {
            if inv
                .describe_tasks(std::slice::from_ref(task), &clusters[0])
                .await
                .is_err()
            {
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
    }
}
