//! In-memory board aggregate owned by a controller.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{Board, Column, Position, Task};

/// Snapshot of one board: its columns in position order and the tasks of
/// every column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardState {
    pub board: Board,
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
}

/// A violation of the dense-position invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionConflict {
    /// Several siblings share one position.
    Duplicate {
        parent_id: String,
        position: Position,
        ids: Vec<String>,
    },
    /// No sibling holds a position below the sibling count.
    Gap { parent_id: String, position: Position },
}

impl std::fmt::Display for PositionConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionConflict::Duplicate {
                parent_id,
                position,
                ids,
            } => write!(
                f,
                "position {} in {} is shared by {}",
                position,
                parent_id,
                ids.join(", ")
            ),
            PositionConflict::Gap {
                parent_id,
                position,
            } => write!(f, "position {} in {} is unused", position, parent_id),
        }
    }
}

impl BoardState {
    pub fn new(board: Board, columns: Vec<Column>, tasks: Vec<Task>) -> Self {
        Self {
            board,
            columns,
            tasks,
        }
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Tasks currently in a column, ordered by position.
    pub fn tasks_in(&self, column_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.column_id == column_id)
            .collect();
        tasks.sort_by_key(|t| t.position);
        tasks
    }

    /// Number of tasks currently in a column.
    pub fn task_count(&self, column_id: &str) -> usize {
        self.tasks.iter().filter(|t| t.column_id == column_id).count()
    }

    /// Check that column positions and each column's task positions are
    /// exactly 0..n-1. Tasks pointing at a missing column are not checked here.
    pub fn position_conflicts(&self) -> Vec<PositionConflict> {
        let mut conflicts = check_dense(
            &self.board.id,
            self.columns.iter().map(|c| (c.id.as_str(), c.position)),
        );
        for column in &self.columns {
            conflicts.extend(check_dense(
                &column.id,
                self.tasks
                    .iter()
                    .filter(|t| t.column_id == column.id)
                    .map(|t| (t.id.as_str(), t.position)),
            ));
        }
        conflicts
    }
}

fn check_dense<'a>(
    parent_id: &str,
    items: impl Iterator<Item = (&'a str, Position)>,
) -> Vec<PositionConflict> {
    let mut by_position: BTreeMap<Position, Vec<String>> = BTreeMap::new();
    let mut count = 0usize;
    for (id, position) in items {
        by_position.entry(position).or_default().push(id.to_string());
        count += 1;
    }

    let mut conflicts = Vec::new();
    for (position, ids) in &by_position {
        if ids.len() > 1 {
            conflicts.push(PositionConflict::Duplicate {
                parent_id: parent_id.to_string(),
                position: *position,
                ids: ids.clone(),
            });
        }
    }
    for index in 0..count {
        let position = crate::types::rank(index);
        if !by_position.contains_key(&position) {
            conflicts.push(PositionConflict::Gap {
                parent_id: parent_id.to_string(),
                position,
            });
        }
    }
    conflicts
}
