//! The controller object: owns every piece of mutable UI state and turns
//! ticks, key actions and job outcomes into state changes and new jobs.

use chrono::{DateTime, Utc};

use crate::debug_log::DebugLog;
use crate::focus::{TableCursor, TreeCursor};
use crate::jobs::{Job, JobOutcome};
use crate::navigation::{
    Acceptance, DetailContext, DetailPanel, Focus, LoadKind, Navigator, Screen, TreeNodeRef,
};
use crate::projection::{self, TreeLine, ViewOptions};
use crate::scheduler::{BuildGate, SnapshotKind, Tick};
use crate::snapshot::{InventoryTree, ServiceTable};

/// User intents, already decoded from keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusServicesTree,
    ToggleDetail,
    NextScreen,
    PrevScreen,
    Refresh,
    Up,
    Down,
    PageUp,
    PageDown,
    Select,
    SwapFocus,
}

const PAGE: i32 = 10;

pub struct Dashboard {
    opts: ViewOptions,
    tree: InventoryTree,
    tree_built_at: Option<DateTime<Utc>>,
    table: Option<ServiceTable>,
    tree_cursor: TreeCursor,
    table_cursor: TableCursor,
    nav: Navigator,
    gate: BuildGate,
    log: DebugLog,
    quit: bool,
}

impl Dashboard {
    pub fn new(opts: ViewOptions, log_capacity: usize) -> Self {
        Self {
            opts,
            tree: InventoryTree::default(),
            tree_built_at: None,
            table: None,
            tree_cursor: TreeCursor::new(),
            table_cursor: TableCursor::new(),
            nav: Navigator::new(),
            gate: BuildGate::new(),
            log: DebugLog::new(log_capacity),
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn on_tick(&mut self, tick: Tick) -> Vec<Job> {
        match tick {
            Tick::RefreshTree => self.begin_build(SnapshotKind::Tree).into_iter().collect(),
            Tick::Repaint => Vec::new(),
        }
    }

    fn begin_build(&mut self, kind: SnapshotKind) -> Option<Job> {
        let ticket = self.gate.try_begin(kind)?;
        match kind {
            SnapshotKind::Tree => self.log.info("Repopulating Services tree..."),
            SnapshotKind::Table => self.log.info("Loading services table..."),
        }
        Some(Job::Build(ticket))
    }

    pub fn handle(&mut self, action: Action) -> Vec<Job> {
        let mut jobs = Vec::new();
        match action {
            Action::Quit => self.quit = true,
            Action::FocusServicesTree => {
                self.log.info("Focussing on services tree...");
                self.nav.focus_services_tree();
            }
            Action::ToggleDetail => {
                if let Some(request) = self.nav.toggle_detail() {
                    match request.kind {
                        LoadKind::TaskDefinition { .. } => self.log.info("Getting task definition..."),
                        _ => self.log.info("Populating info box..."),
                    }
                    jobs.push(Job::Load(request));
                }
            }
            Action::NextScreen | Action::PrevScreen => {
                let screen = if action == Action::NextScreen {
                    self.nav.next_screen()
                } else {
                    self.nav.prev_screen()
                };
                if screen == Screen::Table && self.table.is_none() {
                    jobs.extend(self.begin_build(SnapshotKind::Table));
                }
            }
            Action::Refresh => {
                let kind = match self.nav.screen() {
                    Screen::Services => SnapshotKind::Tree,
                    Screen::Table => SnapshotKind::Table,
                };
                jobs.extend(self.begin_build(kind));
                if let Some(request) = self.nav.reload_detail() {
                    jobs.push(Job::Load(request));
                }
            }
            Action::Up => self.move_or_scroll(-1),
            Action::Down => self.move_or_scroll(1),
            Action::PageUp => self.scroll_detail(-PAGE),
            Action::PageDown => self.scroll_detail(PAGE),
            Action::SwapFocus => {
                let focus = self.nav.focus().toggle();
                self.nav.set_focus(focus);
            }
            Action::Select => jobs.extend(self.select()),
        }
        jobs
    }

    /// A load still in flight belongs to the row the cursor just left.
    fn move_or_scroll(&mut self, delta: i32) {
        let screen = self.nav.screen();
        let moved = match (self.nav.focus(), screen) {
            (Focus::Detail, _) => {
                self.scroll_detail(delta);
                false
            }
            (Focus::Navigator, Screen::Services) => {
                let lines = self.tree_lines();
                let before = self.tree_cursor.index();
                self.tree_cursor.move_by(&lines, delta as isize);
                self.tree_cursor.index() != before
            }
            (Focus::Navigator, Screen::Table) => match &self.table {
                Some(table) => {
                    let before = self.table_cursor.index();
                    self.table_cursor.move_by(table, delta as isize);
                    self.table_cursor.index() != before
                }
                None => false,
            },
        };
        if moved && self.nav.abandon_pending(screen) {
            tracing::debug!(screen = screen.label(), "cursor moved, pending detail load abandoned");
        }
    }

    fn scroll_detail(&mut self, delta: i32) {
        let screen = self.nav.screen();
        self.nav.panel_mut(screen).scroll_by(delta);
    }

    fn select(&mut self) -> Option<Job> {
        match self.nav.screen() {
            Screen::Services => {
                let lines = self.tree_lines();
                let line = self.tree_cursor.selected(&lines)?.clone();
                if let TreeNodeRef::Cluster { .. } = line.node {
                    self.tree_cursor.toggle_cluster(&line.label);
                    let lines = self.tree_lines();
                    self.tree_cursor.reconcile(&lines);
                    return None;
                }
                let request = self.nav.select_tree_node(&line.node)?;
                self.log.info("Populating info box...");
                Some(Job::Load(request))
            }
            Screen::Table => {
                let table = self.table.as_ref()?;
                let entry = self.table_cursor.selected(table)?;
                let request = self.nav.select_table_service(&entry.service);
                self.log.info(format!("Loading tasks of {}...", entry.service.name));
                Some(Job::Load(request))
            }
        }
    }

    pub fn apply(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Tree { ticket, result } => {
                self.gate.finish(&ticket);
                match result {
                    Ok(tree) => {
                        for node in &tree.clusters {
                            self.log.info(format!("Got {}", node.cluster.name));
                        }
                        self.tree = tree;
                        self.tree_built_at = Some(Utc::now());
                        let lines = self.tree_lines();
                        self.tree_cursor.reconcile(&lines);
                    }
                    Err(e) => self
                        .log
                        .error(format!("{e}; keeping previous tree")),
                }
            }
            JobOutcome::Table { ticket, result } => {
                self.gate.finish(&ticket);
                match result {
                    Ok(table) => {
                        self.log
                            .info(format!("Loaded {} services", table.len()));
                        self.table_cursor.reconcile(&table);
                        self.table = Some(table);
                    }
                    Err(e) => self
                        .log
                        .error(format!("{e}; keeping previous table")),
                }
            }
            JobOutcome::Load(outcome) => {
                let what = outcome.request.kind.describe();
                match self.nav.accept(outcome) {
                    Acceptance::Applied => {}
                    Acceptance::Stale => {
                        tracing::debug!(%what, "discarded result for stale selection")
                    }
                    Acceptance::Failed(e) => self.log.warn(format!("Loading {what} failed: {e}")),
                }
            }
        }
    }

    // ---- read side, used by the renderer ----

    pub fn view_options(&self) -> &ViewOptions {
        &self.opts
    }

    pub fn screen(&self) -> Screen {
        self.nav.screen()
    }

    pub fn focus(&self) -> Focus {
        self.nav.focus()
    }

    pub fn tree(&self) -> &InventoryTree {
        &self.tree
    }

    pub fn tree_built_at(&self) -> Option<&DateTime<Utc>> {
        self.tree_built_at.as_ref()
    }

    pub fn tree_lines(&self) -> Vec<TreeLine> {
        projection::tree_lines(&projection::tree_payload(
            &self.tree,
            self.tree_cursor.collapsed(),
        ))
    }

    pub fn tree_index(&self) -> usize {
        self.tree_cursor.index()
    }

    pub fn table(&self) -> Option<&ServiceTable> {
        self.table.as_ref()
    }

    pub fn table_index(&self) -> usize {
        self.table_cursor.index()
    }

    pub fn table_label(&self) -> &'static str {
        if self.gate.in_flight(SnapshotKind::Table) {
            "#### LOADING ####"
        } else {
            "Services"
        }
    }

    pub fn is_building(&self, kind: SnapshotKind) -> bool {
        self.gate.in_flight(kind)
    }

    pub fn panel(&self, screen: Screen) -> &DetailPanel {
        self.nav.panel(screen)
    }

    pub fn detail_title(&self, screen: Screen) -> &'static str {
        let panel = self.nav.panel(screen);
        match (&panel.context, panel.is_loading()) {
            (_, true) => "Info (loading)",
            (DetailContext::TaskDefinition { .. }, _) => "Task definition",
            _ => "Info",
        }
    }

    pub fn detail_text(&self, screen: Screen) -> String {
        projection::detail_text(self.nav.panel(screen).payload.as_ref(), &self.opts)
    }

    pub fn event_lines(&self, screen: Screen) -> Vec<String> {
        projection::panel_events(self.nav.panel(screen).payload.as_ref(), &self.opts)
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.log
    }
}
