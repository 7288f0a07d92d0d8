//! Pure mapping from dashboard state to what each panel displays.
//!
//! Nothing here owns timers or performs I/O; the same inputs always give the
//! same output, so the repaint tick can call these as often as it likes.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::detail::{DrillDown, Fetched};
use crate::model::{ServiceEvent, ServiceSummary, TaskDefinitionDetail};
use crate::navigation::{DetailPayload, TreeNodeRef};
use crate::snapshot::{InventoryTree, ServiceTable};

pub const TABLE_HEADERS: [&str; 5] = ["Status", "Service", "Cluster", "Task Definition", "R/P/D"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewOptions {
    /// Offset timestamps are displayed in
    pub offset: FixedOffset,
    pub event_limit: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            event_limit: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Tree

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreePayload {
    pub extended: bool,
    pub children: Vec<ClusterPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterPayload {
    pub name: String,
    pub arn: String,
    pub extended: bool,
    pub children: Vec<ServicePayload>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicePayload {
    pub name: String,
    pub arn: String,
    pub is_service: bool,
}

/// Mirrors the tree; clusters are extended unless the user collapsed them.
pub fn tree_payload(tree: &InventoryTree, collapsed: &BTreeSet<String>) -> TreePayload {
    TreePayload {
        extended: true,
        children: tree
            .clusters
            .iter()
            .map(|node| ClusterPayload {
                name: node.cluster.name.clone(),
                arn: node.cluster.arn.clone(),
                extended: !collapsed.contains(&node.cluster.name),
                children: node
                    .services
                    .iter()
                    .map(|leaf| ServicePayload {
                        name: leaf.service.name.clone(),
                        arn: leaf.service.arn.clone(),
                        is_service: leaf.is_service,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Stable identity of a tree row across rebuilds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeKey {
    Cluster(String),
    Service { cluster: String, service: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: u8,
    pub label: String,
    pub key: NodeKey,
    pub node: TreeNodeRef,
    pub extended: bool,
    pub expandable: bool,
}

/// Flatten the payload into visible rows.
pub fn tree_lines(payload: &TreePayload) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    if !payload.extended {
        return lines;
    }
    for cluster in &payload.children {
        lines.push(TreeLine {
            depth: 0,
            label: cluster.name.clone(),
            key: NodeKey::Cluster(cluster.name.clone()),
            node: TreeNodeRef::Cluster {
                cluster_arn: cluster.arn.clone(),
            },
            extended: cluster.extended,
            expandable: !cluster.children.is_empty(),
        });
        if !cluster.extended {
            continue;
        }
        for service in &cluster.children {
            lines.push(TreeLine {
                depth: 1,
                label: service.name.clone(),
                key: NodeKey::Service {
                    cluster: cluster.name.clone(),
                    service: service.name.clone(),
                },
                node: TreeNodeRef::Service {
                    service_arn: service.arn.clone(),
                    cluster_arn: cluster.arn.clone(),
                    is_service: service.is_service,
                },
                extended: false,
                expandable: false,
            });
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Table

pub fn table_rows(table: &ServiceTable) -> Vec<[String; 5]> {
    table
        .entries
        .iter()
        .map(|e| e.row.cells().map(str::to_string))
        .collect()
}

// ---------------------------------------------------------------------------
// Detail panel

pub fn format_created(at: Option<&DateTime<Utc>>, offset: &FixedOffset) -> String {
    match at {
        Some(at) => at
            .with_timezone(offset)
            .format("%a %b %d %Y %H:%M:%S GMT%z")
            .to_string(),
        None => String::new(),
    }
}

pub fn format_event_time(at: &DateTime<Utc>, offset: &FixedOffset) -> String {
    at.with_timezone(offset).format("%d-%b %H:%M:%S").to_string()
}

pub fn service_detail_text(service: &ServiceSummary, opts: &ViewOptions) -> String {
    format!(
        "Info of {name}

STATUS:           {status}
Task definition:  {task_definition}
Desired:          {desired}
Pending:          {pending}
Load balancer:    {load_balancer}
Created:          {created}

Press <T> to view the TaskDefinition
",
        name = service.name,
        status = service.status,
        task_definition = service.task_definition,
        desired = service.desired_count,
        pending = service.pending_count,
        load_balancer = service.load_balancer().unwrap_or(""),
        created = format_created(service.created_at.as_ref(), &opts.offset),
    )
}

/// Descriptive payloads are shown verbatim, as YAML.
pub fn render_payload(value: &serde_json::Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(text) => text.trim_end().to_string(),
        Err(_) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    }
}

pub fn task_definition_text(detail: &TaskDefinitionDetail) -> String {
    format!("{}\n\n{}\n", detail.arn, render_payload(&detail.payload))
}

const ENTRY_GAP: &str = "\n\n\n\n";

pub fn drill_down_text(drill: &DrillDown) -> String {
    let mut out = format!("{}\n\n", drill.service.name);

    out.push_str("Container instances: \n");
    for (i, task) in drill.tasks.iter().enumerate() {
        let n = i + 1;
        match (&task.detail, &task.instance) {
            (Fetched::Unavailable(reason), _) => {
                out.push_str(&format!("[{n}] unavailable: {reason}{ENTRY_GAP}"));
            }
            (Fetched::Loaded(_), None) => {
                out.push_str(&format!("[{n}] (not placed on a container instance){ENTRY_GAP}"));
            }
            (Fetched::Loaded(detail), Some(instance)) => {
                let arn = detail.container_instance_arn.as_deref().unwrap_or_default();
                out.push_str(&format!("[{n}] {arn}\n{}{ENTRY_GAP}", fetched_text(instance)));
            }
        }
    }

    out.push_str("Tasks: \n");
    for (i, task) in drill.tasks.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {}\n{}{ENTRY_GAP}",
            i + 1,
            task.task_arn,
            match &task.detail {
                Fetched::Loaded(detail) => render_payload(&detail.payload),
                Fetched::Unavailable(reason) => format!("unavailable: {reason}"),
            }
        ));
    }
    out
}

fn fetched_text(fetched: &Fetched<crate::model::ContainerInstanceDetail>) -> String {
    match fetched {
        Fetched::Loaded(instance) => render_payload(&instance.payload),
        Fetched::Unavailable(reason) => format!("unavailable: {reason}"),
    }
}

pub fn detail_text(payload: Option<&DetailPayload>, opts: &ViewOptions) -> String {
    match payload {
        None => String::new(),
        Some(DetailPayload::Service(service)) => service_detail_text(service, opts),
        Some(DetailPayload::DrillDown(drill)) => drill_down_text(drill),
        Some(DetailPayload::TaskDefinition(def)) => task_definition_text(def),
    }
}

// ---------------------------------------------------------------------------
// Event log

/// The newest `limit` events, newest first, each as a timestamp line
/// followed by a message line. Input order does not matter: events sharing
/// a timestamp are ordered by id.
pub fn event_log_lines(events: &[ServiceEvent], opts: &ViewOptions) -> Vec<String> {
    let mut newest_first: Vec<&ServiceEvent> = events.iter().collect();
    newest_first.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    newest_first
        .into_iter()
        .take(opts.event_limit)
        .flat_map(|event| {
            [
                format_event_time(&event.created_at, &opts.offset),
                event.message.clone(),
            ]
        })
        .collect()
}

/// Events shown next to a panel's detail: only drill-downs carry them.
pub fn panel_events(payload: Option<&DetailPayload>, opts: &ViewOptions) -> Vec<String> {
    match payload {
        Some(DetailPayload::DrillDown(drill)) => event_log_lines(&drill.service.events, opts),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::TaskEntry;
    use crate::model::{ArnPrefix, ClusterRef, ServiceRef, TaskDetail};
    use crate::snapshot::{ClusterNode, ServiceLeaf, TableEntry, TableRow};
    use crate::testing::{self, cluster_arn, events, summary, task_arn};

    fn tree() -> InventoryTree {
        let prefix = ArnPrefix::new(testing::REGION, Some(testing::ACCOUNT.into()));
        let prod = ClusterRef::new(cluster_arn("prod"), &prefix);
        let staging = ClusterRef::new(cluster_arn("staging"), &prefix);
        let leaf = |cluster: &ClusterRef, name: &str| ServiceLeaf {
            service: ServiceRef::new(
                testing::service_arn(crate::model::resource_name(&cluster.name), name),
                cluster,
                &prefix,
            ),
            is_service: true,
        };
        InventoryTree {
            clusters: vec![
                ClusterNode {
                    services: vec![leaf(&prod, "api"), leaf(&prod, "worker")],
                    cluster: prod,
                },
                ClusterNode {
                    services: vec![leaf(&staging, "api")],
                    cluster: staging,
                },
            ],
        }
    }

    #[test]
    fn test_tree_payload_defaults_extended() {
        let payload = tree_payload(&tree(), &BTreeSet::new());
        assert!(payload.extended);
        assert!(payload.children.iter().all(|c| c.extended));
        assert_eq!(tree_lines(&payload).len(), 5);
    }

    #[test]
    fn test_collapsed_cluster_hides_services() {
        let collapsed = BTreeSet::from(["cluster/prod".to_string()]);
        let lines = tree_lines(&tree_payload(&tree(), &collapsed));
        let labels: Vec<_> = lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], "cluster/prod");
        assert!(!lines[0].extended);
        assert_eq!(lines[1].key, NodeKey::Cluster("cluster/staging".into()));
    }

    #[test]
    fn test_table_counts_cell() {
        let mut service = summary("prod", "api");
        service.desired_count = 3;
        service.running_count = 2;
        service.pending_count = 1;
        let table = ServiceTable {
            entries: vec![TableEntry {
                row: TableRow::from_summary(&service),
                service,
            }],
        };
        assert_eq!(table_rows(&table)[0][4], "2/1/3");
    }

    #[test]
    fn test_service_detail_layout() {
        let mut service = summary("prod", "api");
        service.desired_count = 2;
        service.pending_count = 1;
        service.load_balancers = vec!["api-lb".into()];
        let text = service_detail_text(&service, &ViewOptions::default());

        let expected = format!(
            "Info of api\n\
             \n\
             STATUS:           ACTIVE\n\
             Task definition:  {}\n\
             Desired:          2\n\
             Pending:          1\n\
             Load balancer:    api-lb\n\
             Created:          Fri Mar 01 2024 12:00:00 GMT+0000\n\
             \n\
             Press <T> to view the TaskDefinition\n",
            service.task_definition
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_service_detail_without_load_balancer() {
        let text = service_detail_text(&summary("prod", "api"), &ViewOptions::default());
        assert!(text.contains("Load balancer:    \n"));
    }

    #[test]
    fn test_event_log_newest_fifty() {
        let opts = ViewOptions::default();
        let lines = event_log_lines(&events(60), &opts);
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[1], "event 60");
        assert_eq!(lines[3], "event 59");
        assert_eq!(lines[99], "event 11");
        assert_eq!(lines[0], "01-Mar 13:00:00");

        // newest-first input gives the same log
        let mut reversed = events(60);
        reversed.reverse();
        assert_eq!(event_log_lines(&reversed, &opts), lines);
    }

    #[test]
    fn test_event_log_ties_have_one_order() {
        let opts = ViewOptions::default();
        let mut same_second = events(3);
        let at = same_second[0].created_at;
        for event in &mut same_second {
            event.created_at = at;
        }
        let lines = event_log_lines(&same_second, &opts);
        assert_eq!(lines[1], "event 3");
        assert_eq!(lines[5], "event 1");

        same_second.swap(0, 1);
        assert_eq!(event_log_lines(&same_second, &opts), lines);
        same_second.reverse();
        assert_eq!(event_log_lines(&same_second, &opts), lines);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let opts = ViewOptions::default();
        let payload = DetailPayload::Service(summary("prod", "api"));
        assert_eq!(
            detail_text(Some(&payload), &opts),
            detail_text(Some(&payload), &opts)
        );
        let t = tree();
        assert_eq!(
            tree_lines(&tree_payload(&t, &BTreeSet::new())),
            tree_lines(&tree_payload(&t, &BTreeSet::new()))
        );
    }

    #[test]
    fn test_drill_down_marks_unavailable() {
        let loaded = |id: &str| TaskDetail {
            arn: task_arn("prod", id),
            container_instance_arn: None,
            last_status: "RUNNING".into(),
            desired_status: "RUNNING".into(),
            payload: serde_json::json!({ "lastStatus": "RUNNING" }),
        };
        let drill = DrillDown {
            service: summary("prod", "api"),
            tasks: vec![
                TaskEntry {
                    task_arn: task_arn("prod", "t1"),
                    detail: Fetched::Loaded(loaded("t1")),
                    instance: None,
                },
                TaskEntry {
                    task_arn: task_arn("prod", "t2"),
                    detail: Fetched::Unavailable("transient: timeout".into()),
                    instance: None,
                },
                TaskEntry {
                    task_arn: task_arn("prod", "t3"),
                    detail: Fetched::Loaded(loaded("t3")),
                    instance: None,
                },
            ],
        };
        let text = drill_down_text(&drill);
        assert!(text.starts_with("api\n\nContainer instances: \n"));
        assert!(text.contains("[2] unavailable: transient: timeout"));
        assert!(text.contains(&format!("[1] {}\nlastStatus: RUNNING", task_arn("prod", "t1"))));
        assert!(text.contains(&format!("[3] {}\nlastStatus: RUNNING", task_arn("prod", "t3"))));
        assert_eq!(text.matches("lastStatus: RUNNING").count(), 2);
    }
}
