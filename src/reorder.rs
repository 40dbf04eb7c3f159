//! Drag-and-drop reorder engine.
//!
//! A gesture is a drag-start, zero or more drag-overs, and a drag-end. The
//! [`DragSession`] state machine applies the resulting arrangement to a
//! [`BoardState`] in memory and reports which rows must be written back as a
//! [`DragOutcome`]. Persisting the outcome is the controller's job.
//!
//! Whether an item is a column or a task comes from the [`DragKind`] fixed at
//! drag-start; ids are never probed to guess it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::BoardState;
use crate::error::{BoardError, BoardResult};
use crate::types::{Column, Position, Task, rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    Column,
    Task,
}

/// A draggable or droppable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragItem {
    pub id: String,
    pub kind: DragKind,
}

impl DragItem {
    pub fn column(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DragKind::Column,
        }
    }

    pub fn task(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DragKind::Task,
        }
    }
}

/// One row whose stored position has to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionUpdate {
    pub id: String,
    pub from: Position,
    pub to: Position,
}

/// Result of a finished gesture, already applied to the in-memory state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DragOutcome {
    /// Dropped outside any target, or drag-end without a gesture.
    Cancelled,
    /// Dropped on itself or on a target that yields no new arrangement.
    NoOp,
    ReorderColumns { updates: Vec<PositionUpdate> },
    ReorderTasks {
        column_id: String,
        updates: Vec<PositionUpdate>,
    },
    /// The task changed column. Its position there is decided by the backend.
    MoveTask {
        task_id: String,
        from_column: String,
        to_column: String,
    },
}

/// Items that carry a dense position within their parent.
pub trait Ranked {
    fn id(&self) -> &str;
    fn position(&self) -> Position;
    fn set_position(&mut self, position: Position);
}

impl Ranked for Column {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

impl Ranked for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// Move the element at `from` to `to`, shifting everything in between by one.
/// Out-of-range indices leave the slice untouched.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Set each item's position to its index and return only the rows that changed.
pub fn renumber<T: Ranked>(items: &mut [T]) -> Vec<PositionUpdate> {
    items
        .iter_mut()
        .enumerate()
        .filter_map(|(index, item)| {
            let to = rank(index);
            let from = item.position();
            if from == to {
                return None;
            }
            item.set_position(to);
            Some(PositionUpdate {
                id: item.id().to_string(),
                from,
                to,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    item: DragItem,
    /// Column a dragged task was in at drag-start.
    origin_column: Option<String>,
}

/// Per-board gesture state: idle, or dragging exactly one item.
#[derive(Debug, Default)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&DragItem> {
        self.active.as_ref().map(|a| &a.item)
    }

    /// Idle → Dragging. A second start while dragging is rejected.
    pub fn start(&mut self, item: DragItem, state: &BoardState) -> BoardResult<()> {
        if let Some(active) = &self.active {
            return Err(BoardError::GestureInProgress {
                active: active.item.id.clone(),
            });
        }

        let origin_column = match item.kind {
            DragKind::Column => {
                if state.column(&item.id).is_none() {
                    return Err(BoardError::not_found("column", &item.id));
                }
                None
            }
            DragKind::Task => {
                let task = state
                    .task(&item.id)
                    .ok_or_else(|| BoardError::not_found("task", &item.id))?;
                Some(task.column_id.clone())
            }
        };

        debug!(id = %item.id, kind = ?item.kind, "Drag started");
        self.active = Some(ActiveDrag {
            item,
            origin_column,
        });
        Ok(())
    }

    /// Hovering a task over a column provisionally moves it there, in memory
    /// only. Everything else is ignored.
    pub fn over(&mut self, over: &DragItem, state: &mut BoardState) {
        let Some(active) = &self.active else {
            return;
        };
        if active.item.id == over.id
            || active.item.kind != DragKind::Task
            || over.kind != DragKind::Column
            || state.column(&over.id).is_none()
        {
            return;
        }

        if let Some(task) = state.task_mut(&active.item.id) {
            if task.column_id != over.id {
                debug!(task = %task.id, column = %over.id, "Task provisionally over column");
                task.column_id = over.id.clone();
            }
        }
    }

    /// Dragging → Idle. Applies the new arrangement to `state` and reports
    /// what must be persisted.
    pub fn end(&mut self, over: Option<&DragItem>, state: &mut BoardState) -> DragOutcome {
        let Some(active) = self.active.take() else {
            return DragOutcome::Cancelled;
        };
        revert_provisional(&active, state);

        let outcome = match over {
            None => DragOutcome::Cancelled,
            Some(over) if over.id == active.item.id => DragOutcome::NoOp,
            Some(over) => match (&active.item.kind, &active.origin_column) {
                (DragKind::Column, _) => reorder_columns(state, &active.item.id, over),
                (DragKind::Task, Some(origin)) => place_task(state, &active.item.id, origin, over),
                (DragKind::Task, None) => DragOutcome::NoOp,
            },
        };
        debug!(id = %active.item.id, ?outcome, "Drag ended");
        outcome
    }

    /// Abandon the gesture, undoing any provisional column reassignment.
    pub fn cancel(&mut self, state: &mut BoardState) {
        if let Some(active) = self.active.take() {
            revert_provisional(&active, state);
        }
    }

    /// Forget the gesture without touching state, e.g. after a reload
    /// replaced the state it referred to.
    pub fn reset(&mut self) {
        self.active = None;
    }
}

fn revert_provisional(active: &ActiveDrag, state: &mut BoardState) {
    if let Some(origin) = &active.origin_column {
        if let Some(task) = state.task_mut(&active.item.id) {
            task.column_id = origin.clone();
        }
    }
}

fn reorder_columns(state: &mut BoardState, active_id: &str, over: &DragItem) -> DragOutcome {
    let (Some(from), Some(to)) = (state.column_index(active_id), state.column_index(&over.id))
    else {
        return DragOutcome::NoOp;
    };

    array_move(&mut state.columns, from, to);
    let updates = renumber(&mut state.columns);
    DragOutcome::ReorderColumns { updates }
}

fn place_task(
    state: &mut BoardState,
    task_id: &str,
    origin_column: &str,
    over: &DragItem,
) -> DragOutcome {
    let target_column = match over.kind {
        DragKind::Task => state.task(&over.id).map(|t| t.column_id.clone()),
        DragKind::Column => state.column(&over.id).map(|c| c.id.clone()),
    };
    let Some(target_column) = target_column else {
        return DragOutcome::NoOp;
    };

    if target_column != origin_column {
        if let Some(task) = state.task_mut(task_id) {
            task.column_id = target_column.clone();
        }
        return DragOutcome::MoveTask {
            task_id: task_id.to_string(),
            from_column: origin_column.to_string(),
            to_column: target_column,
        };
    }

    // Dropped on its own column's body rather than on a sibling.
    if over.kind != DragKind::Task {
        return DragOutcome::NoOp;
    }

    let mut siblings: Vec<Task> = state.tasks_in(origin_column).into_iter().cloned().collect();
    let from = siblings.iter().position(|t| t.id == task_id);
    let to = siblings.iter().position(|t| t.id == over.id);
    let (Some(from), Some(to)) = (from, to) else {
        return DragOutcome::NoOp;
    };

    array_move(&mut siblings, from, to);
    let updates = renumber(&mut siblings);
    for update in &updates {
        if let Some(task) = state.task_mut(&update.id) {
            task.position = update.to;
        }
    }
    DragOutcome::ReorderTasks {
        column_id: origin_column.to_string(),
        updates,
    }
}
