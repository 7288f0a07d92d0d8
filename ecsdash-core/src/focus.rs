//! Cursor state of the tree and the table.
//!
//! Cursors remember *what* is selected (a node key, a service arn), not just
//! a row index, so a refresh that reorders or grows the data keeps the user's
//! place. When the selected item disappears the index is clamped instead.

use std::collections::BTreeSet;

use crate::model::Arn;
use crate::projection::{NodeKey, TreeLine};
use crate::snapshot::{ServiceTable, TableEntry};

#[derive(Clone, Debug, Default)]
pub struct TreeCursor {
    selected: Option<NodeKey>,
    index: usize,
    collapsed: BTreeSet<String>,
}

impl TreeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn collapsed(&self) -> &BTreeSet<String> {
        &self.collapsed
    }

    /// Re-locate the selection in freshly projected lines.
    pub fn reconcile(&mut self, lines: &[TreeLine]) {
        if lines.is_empty() {
            self.index = 0;
            return;
        }
        if let Some(key) = &self.selected {
            if let Some(pos) = lines.iter().position(|l| &l.key == key) {
                self.index = pos;
                return;
            }
        }
        self.index = self.index.min(lines.len() - 1);
        self.selected = Some(lines[self.index].key.clone());
    }

    pub fn move_by(&mut self, lines: &[TreeLine], delta: isize) {
        if lines.is_empty() {
            return;
        }
        self.reconcile(lines);
        let last = lines.len() as isize - 1;
        self.index = (self.index as isize + delta).clamp(0, last) as usize;
        self.selected = Some(lines[self.index].key.clone());
    }

    pub fn selected<'a>(&self, lines: &'a [TreeLine]) -> Option<&'a TreeLine> {
        match &self.selected {
            Some(key) => lines.iter().find(|l| &l.key == key),
            None => lines.get(self.index),
        }
    }

    /// Collapse or extend a cluster node. Returns the new extended flag.
    pub fn toggle_cluster(&mut self, cluster: &str) -> bool {
        if self.collapsed.remove(cluster) {
            true
        } else {
            self.collapsed.insert(cluster.to_string());
            false
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TableCursor {
    selected: Option<Arn>,
    index: usize,
}

impl TableCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reconcile(&mut self, table: &ServiceTable) {
        if table.is_empty() {
            self.index = 0;
            return;
        }
        if let Some(pos) = self.selected.as_deref().and_then(|arn| table.position(arn)) {
            self.index = pos;
            return;
        }
        self.index = self.index.min(table.len() - 1);
        self.selected = Some(table.entries[self.index].service.arn.clone());
    }

    pub fn move_by(&mut self, table: &ServiceTable, delta: isize) {
        if table.is_empty() {
            return;
        }
        self.reconcile(table);
        let last = table.len() as isize - 1;
        self.index = (self.index as isize + delta).clamp(0, last) as usize;
        self.selected = Some(table.entries[self.index].service.arn.clone());
    }

    pub fn selected<'a>(&self, table: &'a ServiceTable) -> Option<&'a TableEntry> {
        table.entries.get(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::TreeNodeRef;
    use crate::snapshot::TableRow;
    use crate::testing::summary;

    fn line(key: NodeKey) -> TreeLine {
        TreeLine {
            depth: 0,
            label: format!("{key:?}"),
            key,
            node: TreeNodeRef::Cluster {
                cluster_arn: String::new(),
            },
            extended: true,
            expandable: false,
        }
    }

    fn cluster(name: &str) -> TreeLine {
        line(NodeKey::Cluster(name.into()))
    }

    #[test]
    fn test_selection_follows_node_across_refresh() {
        let mut cursor = TreeCursor::new();
        let before = vec![cluster("a"), cluster("b"), cluster("c")];
        cursor.move_by(&before, 2);
        assert_eq!(cursor.selected(&before).unwrap().label, before[2].label);

        // a new cluster shows up in front
        let after = vec![cluster("z"), cluster("a"), cluster("b"), cluster("c")];
        cursor.reconcile(&after);
        assert_eq!(cursor.index(), 3);
        assert_eq!(cursor.selected(&after).unwrap().key, NodeKey::Cluster("c".into()));
    }

    #[test]
    fn test_vanished_selection_is_clamped() {
        let mut cursor = TreeCursor::new();
        let before = vec![cluster("a"), cluster("b"), cluster("c")];
        cursor.move_by(&before, 2);

        let after = vec![cluster("a")];
        cursor.reconcile(&after);
        assert_eq!(cursor.index(), 0);
        assert_eq!(cursor.selected(&after).unwrap().key, NodeKey::Cluster("a".into()));
    }

    #[test]
    fn test_toggle_cluster() {
        let mut cursor = TreeCursor::new();
        assert!(!cursor.toggle_cluster("prod"));
        assert!(cursor.collapsed().contains("prod"));
        assert!(cursor.toggle_cluster("prod"));
        assert!(cursor.collapsed().is_empty());
    }

    #[test]
    fn test_table_cursor_tracks_arn() {
        let entry = |name: &str| {
            let service = summary("prod", name);
            TableEntry {
                row: TableRow::from_summary(&service),
                service,
            }
        };
        let mut cursor = TableCursor::new();
        let table = ServiceTable {
            entries: vec![entry("a"), entry("b")],
        };
        cursor.move_by(&table, 1);
        assert_eq!(cursor.selected(&table).unwrap().service.name, "b");

        let rebuilt = ServiceTable {
            entries: vec![entry("b"), entry("c"), entry("a")],
        };
        cursor.reconcile(&rebuilt);
        assert_eq!(cursor.selected(&rebuilt).unwrap().service.name, "b");

        cursor.move_by(&rebuilt, 10);
        assert_eq!(cursor.selected(&rebuilt).unwrap().service.name, "a");
        cursor.move_by(&rebuilt, -10);
        assert_eq!(cursor.index(), 0);
    }
}
