//! Timers driving the dashboard: a slow tree rebuild and a fast repaint,
//! plus single-flight gating of snapshot builds.

use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Rebuild the inventory tree
    RefreshTree,
    /// Re-render from already resolved state
    Repaint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnapshotKind {
    Tree,
    Table,
}

/// Proof that a build was admitted; handed back on completion.
#[derive(Debug, PartialEq, Eq)]
pub struct BuildTicket {
    pub kind: SnapshotKind,
    pub generation: u64,
}

/// At most one build in flight per snapshot kind. A request while one is
/// in flight is coalesced into it, not queued.
#[derive(Debug, Default)]
pub struct BuildGate {
    tree: Option<u64>,
    table: Option<u64>,
    generation: u64,
    coalesced: u64,
}

impl BuildGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: SnapshotKind) -> &mut Option<u64> {
        match kind {
            SnapshotKind::Tree => &mut self.tree,
            SnapshotKind::Table => &mut self.table,
        }
    }

    pub fn try_begin(&mut self, kind: SnapshotKind) -> Option<BuildTicket> {
        if self.in_flight(kind) {
            self.coalesced += 1;
            tracing::debug!(?kind, "build already in flight, request coalesced");
            return None;
        }
        self.generation += 1;
        let generation = self.generation;
        *self.slot(kind) = Some(generation);
        Some(BuildTicket { kind, generation })
    }

    /// Returns false when the ticket does not belong to the build in flight.
    pub fn finish(&mut self, ticket: &BuildTicket) -> bool {
        let slot = self.slot(ticket.kind);
        if *slot == Some(ticket.generation) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn in_flight(&self, kind: SnapshotKind) -> bool {
        match kind {
            SnapshotKind::Tree => self.tree.is_some(),
            SnapshotKind::Table => self.table.is_some(),
        }
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

/// Two independent timers. The tree timer fires once immediately.
pub struct RefreshScheduler {
    tree: Interval,
    repaint: Interval,
}

impl RefreshScheduler {
    pub fn new(tree_period: Duration, repaint_period: Duration) -> Self {
        let mut tree = tokio::time::interval(tree_period);
        tree.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut repaint = tokio::time::interval_at(
            tokio::time::Instant::now() + repaint_period,
            repaint_period,
        );
        repaint.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self { tree, repaint }
    }

    /// Wait for the next timer. Cancel-safe, so it can sit in a `select!`
    /// next to input and load results.
    pub async fn tick(&mut self) -> Tick {
        tokio::select! {
            biased;
            _ = self.tree.tick() => Tick::RefreshTree,
            _ = self.repaint.tick() => Tick::Repaint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_coalesces() {
        let mut gate = BuildGate::new();
        let ticket = gate.try_begin(SnapshotKind::Tree).unwrap();
        assert!(gate.try_begin(SnapshotKind::Tree).is_none());
        assert!(gate.try_begin(SnapshotKind::Tree).is_none());
        assert_eq!(gate.coalesced(), 2);

        // other kind is independent
        let table = gate.try_begin(SnapshotKind::Table).unwrap();
        assert!(gate.in_flight(SnapshotKind::Table));

        assert!(gate.finish(&ticket));
        assert!(!gate.in_flight(SnapshotKind::Tree));
        assert!(gate.try_begin(SnapshotKind::Tree).is_some());
        assert!(gate.finish(&table));
    }

    #[test]
    fn test_gate_rejects_foreign_ticket() {
        let mut gate = BuildGate::new();
        let ticket = gate.try_begin(SnapshotKind::Tree).unwrap();
        let bogus = BuildTicket {
            kind: SnapshotKind::Tree,
            generation: ticket.generation + 10,
        };
        assert!(!gate.finish(&bogus));
        assert!(gate.in_flight(SnapshotKind::Tree));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_run_on_their_own_cadence() {
        let mut scheduler =
            RefreshScheduler::new(Duration::from_secs(60), Duration::from_secs(1));

        // immediate refresh at startup
        assert_eq!(scheduler.tick().await, Tick::RefreshTree);

        let mut repaints = 0;
        let mut refreshes = 0;
        let start = tokio::time::Instant::now();
        while start.elapsed() < Duration::from_secs(120) {
            match scheduler.tick().await {
                Tick::Repaint => repaints += 1,
                Tick::RefreshTree => refreshes += 1,
            }
        }
        assert_eq!(refreshes, 2);
        assert!((119..=121).contains(&repaints), "repaints = {repaints}");
    }
}
