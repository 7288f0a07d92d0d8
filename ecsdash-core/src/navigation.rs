//! Screen/focus/detail state machine.
//!
//! Each screen owns its own detail panel. Every load the navigator asks for
//! carries a request id; a result is applied only if it answers the load the
//! panel is currently waiting for, so a slow load cannot overwrite a panel
//! after the user moved on.

use crate::detail::DrillDown;
use crate::error::InventoryError;
use crate::model::{Arn, ServiceSummary, TaskDefinitionDetail};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    /// Tree + debug log + detail
    #[default]
    Services,
    /// Table + detail + events
    Table,
}

impl Screen {
    pub const ALL: [Screen; 2] = [Screen::Services, Screen::Table];

    pub fn next(&self) -> Self {
        match self {
            Screen::Services => Screen::Table,
            Screen::Table => Screen::Services,
        }
    }

    pub fn prev(&self) -> Self {
        // two screens: the carousel wraps both ways
        self.next()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Screen::Services => "Services",
            Screen::Table => "Table",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Focus {
    /// Tree on the services screen, table on the table screen
    #[default]
    Navigator,
    Detail,
}

impl Focus {
    pub fn toggle(&self) -> Self {
        match self {
            Focus::Navigator => Focus::Detail,
            Focus::Detail => Focus::Navigator,
        }
    }
}

/// What the detail panel is showing, and what the toggle key does next.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum DetailContext {
    #[default]
    Empty,
    Service {
        service_arn: Arn,
        cluster_arn: Arn,
        task_definition_arn: Arn,
    },
    TaskDefinition {
        task_definition_arn: Arn,
        service_arn: Arn,
        cluster_arn: Arn,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadKind {
    Service {
        service_arn: Arn,
        cluster_arn: Arn,
    },
    DrillDown {
        service_arn: Arn,
        cluster_arn: Arn,
    },
    TaskDefinition {
        task_definition_arn: Arn,
        service_arn: Arn,
        cluster_arn: Arn,
    },
}

impl LoadKind {
    pub fn describe(&self) -> String {
        match self {
            LoadKind::Service { service_arn, .. } => format!("service {service_arn}"),
            LoadKind::DrillDown { service_arn, .. } => format!("tasks of {service_arn}"),
            LoadKind::TaskDefinition {
                task_definition_arn,
                ..
            } => format!("task definition {task_definition_arn}"),
        }
    }
}

pub type RequestId = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub id: RequestId,
    pub screen: Screen,
    pub kind: LoadKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetailPayload {
    Service(ServiceSummary),
    DrillDown(DrillDown),
    TaskDefinition(TaskDefinitionDetail),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadOutcome {
    pub request: LoadRequest,
    pub result: Result<DetailPayload, InventoryError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Acceptance {
    Applied,
    /// Answer to a request the panel no longer waits for
    Stale,
    /// The load failed; the panel keeps what it showed before
    Failed(InventoryError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetailPanel {
    pub context: DetailContext,
    pub payload: Option<DetailPayload>,
    pub pending: Option<RequestId>,
    pub scroll: u16,
}

impl DetailPanel {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll = (self.scroll as i32 + delta).clamp(0, u16::MAX as i32) as u16;
    }
}

/// A node of the services tree as seen by the navigator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeNodeRef {
    Cluster {
        cluster_arn: Arn,
    },
    Service {
        service_arn: Arn,
        cluster_arn: Arn,
        is_service: bool,
    },
}

#[derive(Debug, Default)]
pub struct Navigator {
    screen: Screen,
    focus: [Focus; 2],
    panels: [DetailPanel; 2],
    next_id: RequestId,
}

fn slot(screen: Screen) -> usize {
    match screen {
        Screen::Services => 0,
        Screen::Table => 1,
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn focus(&self) -> Focus {
        self.focus[slot(self.screen)]
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus[slot(self.screen)] = focus;
    }

    pub fn panel(&self, screen: Screen) -> &DetailPanel {
        &self.panels[slot(screen)]
    }

    pub fn panel_mut(&mut self, screen: Screen) -> &mut DetailPanel {
        &mut self.panels[slot(screen)]
    }

    pub fn active_panel(&self) -> &DetailPanel {
        self.panel(self.screen)
    }

    pub fn next_screen(&mut self) -> Screen {
        self.screen = self.screen.next();
        self.screen
    }

    pub fn prev_screen(&mut self) -> Screen {
        self.screen = self.screen.prev();
        self.screen
    }

    /// `s`: back to the services screen with the tree focused.
    pub fn focus_services_tree(&mut self) {
        self.screen = Screen::Services;
        self.set_focus(Focus::Navigator);
    }

    fn request(&mut self, screen: Screen, kind: LoadKind) -> LoadRequest {
        self.next_id += 1;
        let id = self.next_id;
        self.panel_mut(screen).pending = Some(id);
        LoadRequest { id, screen, kind }
    }

    /// Only service leaves load anything.
    pub fn select_tree_node(&mut self, node: &TreeNodeRef) -> Option<LoadRequest> {
        match node {
            TreeNodeRef::Service {
                service_arn,
                cluster_arn,
                is_service: true,
            } => Some(self.request(
                Screen::Services,
                LoadKind::Service {
                    service_arn: service_arn.clone(),
                    cluster_arn: cluster_arn.clone(),
                },
            )),
            _ => None,
        }
    }

    pub fn select_table_service(&mut self, service: &ServiceSummary) -> LoadRequest {
        self.request(
            Screen::Table,
            LoadKind::DrillDown {
                service_arn: service.arn.clone(),
                cluster_arn: service.cluster_arn.clone(),
            },
        )
    }

    /// `t`: service <-> task definition on the active screen's panel.
    pub fn toggle_detail(&mut self) -> Option<LoadRequest> {
        let screen = self.screen;
        let kind = match &self.panel(screen).context {
            DetailContext::Empty => return None,
            DetailContext::Service {
                service_arn,
                cluster_arn,
                task_definition_arn,
            } => LoadKind::TaskDefinition {
                task_definition_arn: task_definition_arn.clone(),
                service_arn: service_arn.clone(),
                cluster_arn: cluster_arn.clone(),
            },
            DetailContext::TaskDefinition {
                service_arn,
                cluster_arn,
                ..
            } => service_view(screen, service_arn.clone(), cluster_arn.clone()),
        };
        if matches!(kind, LoadKind::TaskDefinition { .. }) {
            self.set_focus(Focus::Detail);
        }
        Some(self.request(screen, kind))
    }

    /// Reload whatever the active panel shows, e.g. after a manual refresh.
    pub fn reload_detail(&mut self) -> Option<LoadRequest> {
        let screen = self.screen;
        let kind = match &self.panel(screen).context {
            DetailContext::Empty => return None,
            DetailContext::Service {
                service_arn,
                cluster_arn,
                ..
            } => service_view(screen, service_arn.clone(), cluster_arn.clone()),
            DetailContext::TaskDefinition {
                task_definition_arn,
                service_arn,
                cluster_arn,
            } => LoadKind::TaskDefinition {
                task_definition_arn: task_definition_arn.clone(),
                service_arn: service_arn.clone(),
                cluster_arn: cluster_arn.clone(),
            },
        };
        Some(self.request(screen, kind))
    }

    /// Drop the in-flight load of `screen`'s panel so its answer is
    /// discarded as stale. The panel keeps what it already shows.
    pub fn abandon_pending(&mut self, screen: Screen) -> bool {
        self.panel_mut(screen).pending.take().is_some()
    }

    pub fn accept(&mut self, outcome: LoadOutcome) -> Acceptance {
        let LoadOutcome { request, result } = outcome;
        let panel = self.panel_mut(request.screen);
        if panel.pending != Some(request.id) {
            return Acceptance::Stale;
        }
        panel.pending = None;

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => return Acceptance::Failed(e),
        };

        panel.context = match (&payload, &request.kind) {
            (DetailPayload::Service(summary), _) => service_context(summary),
            (DetailPayload::DrillDown(drill), _) => service_context(&drill.service),
            (
                DetailPayload::TaskDefinition(_),
                LoadKind::TaskDefinition {
                    task_definition_arn,
                    service_arn,
                    cluster_arn,
                },
            ) => DetailContext::TaskDefinition {
                task_definition_arn: task_definition_arn.clone(),
                service_arn: service_arn.clone(),
                cluster_arn: cluster_arn.clone(),
            },
            (DetailPayload::TaskDefinition(def), _) => {
                tracing::warn!(arn = %def.arn, "task definition answered a non task-definition request");
                return Acceptance::Stale;
            }
        };
        panel.payload = Some(payload);
        panel.scroll = 0;
        Acceptance::Applied
    }
}

fn service_view(screen: Screen, service_arn: Arn, cluster_arn: Arn) -> LoadKind {
    match screen {
        Screen::Services => LoadKind::Service {
            service_arn,
            cluster_arn,
        },
        Screen::Table => LoadKind::DrillDown {
            service_arn,
            cluster_arn,
        },
    }
}

fn service_context(summary: &ServiceSummary) -> DetailContext {
    DetailContext::Service {
        service_arn: summary.arn.clone(),
        cluster_arn: summary.cluster_arn.clone(),
        task_definition_arn: summary.task_definition.clone(),
    }
}
