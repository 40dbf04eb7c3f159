//! Board controller: owns one board's in-memory state and writes changes
//! through the persistence gateway.
//!
//! Reorders are applied optimistically, then persisted one row at a time in
//! index order. If any write fails the optimistic state is thrown away and the
//! board is reloaded from the gateway, never patched row by row.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{BoardState, load_board};
use crate::db::now_ms;
use crate::error::{BoardError, BoardResult, GatewayError, GatewayResult};
use crate::gateway::PersistenceGateway;
use crate::notify::{NoticeLevel, Notification};
use crate::reorder::{DragItem, DragOutcome, DragSession, PositionUpdate, renumber};
use crate::types::{Column, Task, rank, validate_title};

/// Whether the board is usable, or blocked on a failed read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready,
    /// The last load failed; call [`BoardController::refresh`] to retry.
    Failed { message: String },
}

pub struct BoardController {
    gateway: Arc<dyn PersistenceGateway>,
    board_id: String,
    state: Option<BoardState>,
    load_state: LoadState,
    session: DragSession,
    notifications: Vec<Notification>,
}

impl BoardController {
    /// Create a controller that has not loaded anything yet.
    pub fn new(gateway: Arc<dyn PersistenceGateway>, board_id: impl Into<String>) -> Self {
        Self {
            gateway,
            board_id: board_id.into(),
            state: None,
            load_state: LoadState::Loading,
            session: DragSession::new(),
            notifications: Vec::new(),
        }
    }

    /// Create a controller and load the board.
    pub async fn open(
        gateway: Arc<dyn PersistenceGateway>,
        board_id: impl Into<String>,
    ) -> BoardResult<Self> {
        let mut controller = Self::new(gateway, board_id);
        controller.refresh().await?;
        Ok(controller)
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn state(&self) -> Option<&BoardState> {
        self.state.as_ref()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_dragging()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drain pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Reload the board from the gateway, replacing all local state.
    ///
    /// On failure the board becomes unavailable until a later refresh succeeds.
    pub async fn refresh(&mut self) -> BoardResult<&BoardState> {
        self.load_state = LoadState::Loading;
        self.session.reset();

        match load_board(self.gateway.as_ref(), &self.board_id).await {
            Ok(state) => {
                self.load_state = LoadState::Ready;
                let state: &BoardState = self.state.insert(state);
                Ok(state)
            }
            Err(err) => {
                warn!(board = %self.board_id, error = %err, "Failed to load board");
                self.state = None;
                self.load_state = LoadState::Failed {
                    message: err.to_string(),
                };
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Drag gestures
    // =========================================================================

    pub fn drag_start(&mut self, item: DragItem) -> BoardResult<()> {
        let state = self.state.as_ref().ok_or(BoardError::NotLoaded)?;
        self.session.start(item, state)
    }

    pub fn drag_over(&mut self, over: &DragItem) {
        if let Some(state) = self.state.as_mut() {
            self.session.over(over, state);
        }
    }

    /// Finish the gesture and persist its outcome.
    ///
    /// Persistence failures do not surface as errors: they raise a failure
    /// notification and reload the board.
    pub async fn drag_end(&mut self, over: Option<DragItem>) -> BoardResult<DragOutcome> {
        let Some(state) = self.state.as_mut() else {
            self.session.reset();
            return Err(BoardError::NotLoaded);
        };
        let outcome = self.session.end(over.as_ref(), state);

        match &outcome {
            DragOutcome::Cancelled | DragOutcome::NoOp => {}
            DragOutcome::ReorderColumns { updates } => {
                match self.persist_column_positions(updates).await {
                    Ok(()) => self.notify(Notification::success("Columns reordered")),
                    Err(err) => self.reconcile("Failed to reorder columns", err).await,
                }
            }
            DragOutcome::ReorderTasks { updates, .. } => {
                match self.persist_task_positions(updates).await {
                    Ok(()) => self.notify(Notification::success("Tasks reordered")),
                    Err(err) => self.reconcile("Failed to reorder tasks", err).await,
                }
            }
            DragOutcome::MoveTask {
                task_id, to_column, ..
            } => match self.gateway.update_task_column(task_id, to_column).await {
                Ok(()) => {
                    // The backend decides where the task lands; take its word for it.
                    if self.refresh().await.is_ok() {
                        self.notify(Notification::success("Task moved"));
                    } else {
                        self.notify(Notification::failure(
                            "Task moved, but the board could not be reloaded",
                        ));
                    }
                }
                Err(err) => self.reconcile("Failed to move task", err).await,
            },
        }

        Ok(outcome)
    }

    // =========================================================================
    // Board, column and task edits
    // =========================================================================

    pub async fn rename_board(&mut self, title: &str) -> BoardResult<()> {
        let title = validate_title("title", title)?;
        self.ensure_idle()?;
        self.loaded()?;

        if let Err(err) = self.gateway.update_board_title(&self.board_id, &title).await {
            return Err(self.write_failed("Failed to rename board", err));
        }

        let state = self.loaded_mut()?;
        state.board.title = title;
        state.board.updated_at = now_ms();
        self.notify(Notification::success("Board renamed"));
        Ok(())
    }

    /// Append a column after the last one.
    pub async fn add_column(&mut self, title: &str) -> BoardResult<Column> {
        let title = validate_title("title", title)?;
        self.ensure_idle()?;
        let position = rank(self.loaded()?.columns.len());

        let column = match self
            .gateway
            .insert_column(&self.board_id, &title, position)
            .await
        {
            Ok(column) => column,
            Err(err) => return Err(self.write_failed("Failed to add column", err)),
        };

        self.loaded_mut()?.columns.push(column.clone());
        self.notify(Notification::success(format!("Column '{}' added", column.title)));
        Ok(column)
    }

    pub async fn rename_column(&mut self, column_id: &str, title: &str) -> BoardResult<()> {
        let title = validate_title("title", title)?;
        self.ensure_idle()?;
        self.require_column(column_id)?;

        if let Err(err) = self.gateway.update_column_title(column_id, &title).await {
            return Err(self.write_failed("Failed to rename column", err));
        }

        if let Some(column) = self
            .loaded_mut()?
            .columns
            .iter_mut()
            .find(|c| c.id == column_id)
        {
            column.title = title;
            column.updated_at = now_ms();
        }
        self.notify(Notification::success("Column renamed"));
        Ok(())
    }

    /// Delete a column and its tasks, then close the gap in column positions.
    pub async fn delete_column(&mut self, column_id: &str) -> BoardResult<()> {
        self.ensure_idle()?;
        self.require_column(column_id)?;

        if let Err(err) = self.gateway.delete_column(column_id).await {
            return Err(self.write_failed("Failed to delete column", err));
        }

        let state = self.loaded_mut()?;
        state.columns.retain(|c| c.id != column_id);
        state.tasks.retain(|t| t.column_id != column_id);
        let updates = renumber(&mut state.columns);

        match self.persist_column_positions(&updates).await {
            Ok(()) => self.notify(Notification::success("Column deleted")),
            Err(err) => self.reconcile("Column deleted, but reordering failed", err).await,
        }
        Ok(())
    }

    /// Append a task to the end of a column.
    pub async fn add_task(&mut self, column_id: &str, title: &str) -> BoardResult<Task> {
        let title = validate_title("title", title)?;
        self.ensure_idle()?;
        self.require_column(column_id)?;
        let position = rank(self.loaded()?.task_count(column_id));

        let task = match self.gateway.insert_task(column_id, &title, position).await {
            Ok(task) => task,
            Err(err) => return Err(self.write_failed("Failed to add task", err)),
        };

        self.loaded_mut()?.tasks.push(task.clone());
        self.notify(Notification::success(format!("Task '{}' added", task.title)));
        Ok(task)
    }

    /// Replace a task's title and description. A blank description clears it.
    pub async fn update_task(
        &mut self,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> BoardResult<()> {
        let title = validate_title("title", title)?;
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        self.ensure_idle()?;
        self.require_task(task_id)?;

        if let Err(err) = self
            .gateway
            .update_task_details(task_id, &title, description.as_deref())
            .await
        {
            return Err(self.write_failed("Failed to update task", err));
        }

        if let Some(task) = self.loaded_mut()?.task_mut(task_id) {
            task.title = title;
            task.description = description;
            task.updated_at = now_ms();
        }
        self.notify(Notification::success("Task updated"));
        Ok(())
    }

    /// Delete a task, then close the gap in its column.
    pub async fn delete_task(&mut self, task_id: &str) -> BoardResult<()> {
        self.ensure_idle()?;
        let column_id = self.require_task(task_id)?.column_id.clone();

        if let Err(err) = self.gateway.delete_task(task_id).await {
            return Err(self.write_failed("Failed to delete task", err));
        }

        let state = self.loaded_mut()?;
        state.tasks.retain(|t| t.id != task_id);
        let updates = compact_tasks(state, &column_id);

        match self.persist_task_positions(&updates).await {
            Ok(()) => self.notify(Notification::success("Task deleted")),
            Err(err) => self.reconcile("Task deleted, but reordering failed", err).await,
        }
        Ok(())
    }

    pub async fn attach_tag(&mut self, task_id: &str, tag_id: &str) -> BoardResult<()> {
        self.ensure_idle()?;
        self.require_task(task_id)?;

        let tag = match self.gateway.list_tags().await {
            Ok(tags) => tags
                .into_iter()
                .find(|t| t.id == tag_id)
                .ok_or_else(|| BoardError::not_found("tag", tag_id))?,
            Err(err) => return Err(self.write_failed("Failed to load tags", err)),
        };

        if let Err(err) = self.gateway.attach_tag(task_id, tag_id).await {
            return Err(self.write_failed("Failed to tag task", err));
        }

        if let Some(task) = self.loaded_mut()?.task_mut(task_id) {
            if !task.tags.iter().any(|t| t.id == tag.id) {
                task.tags.push(tag);
            }
        }
        self.notify(Notification::success("Tag added"));
        Ok(())
    }

    pub async fn detach_tag(&mut self, task_id: &str, tag_id: &str) -> BoardResult<()> {
        self.ensure_idle()?;
        self.require_task(task_id)?;

        if let Err(err) = self.gateway.detach_tag(task_id, tag_id).await {
            return Err(self.write_failed("Failed to remove tag", err));
        }

        if let Some(task) = self.loaded_mut()?.task_mut(task_id) {
            task.tags.retain(|t| t.id != tag_id);
        }
        self.notify(Notification::success("Tag removed"));
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn loaded(&self) -> BoardResult<&BoardState> {
        self.state.as_ref().ok_or(BoardError::NotLoaded)
    }

    fn loaded_mut(&mut self) -> BoardResult<&mut BoardState> {
        self.state.as_mut().ok_or(BoardError::NotLoaded)
    }

    fn ensure_idle(&self) -> BoardResult<()> {
        match self.session.active() {
            Some(active) => Err(BoardError::GestureInProgress {
                active: active.id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn require_column(&self, column_id: &str) -> BoardResult<&Column> {
        self.loaded()?
            .column(column_id)
            .ok_or_else(|| BoardError::not_found("column", column_id))
    }

    fn require_task(&self, task_id: &str) -> BoardResult<&Task> {
        self.loaded()?
            .task(task_id)
            .ok_or_else(|| BoardError::not_found("task", task_id))
    }

    async fn persist_column_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()> {
        for update in updates {
            self.gateway
                .update_column_position(&update.id, update.to)
                .await?;
        }
        Ok(())
    }

    async fn persist_task_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()> {
        for update in updates {
            self.gateway
                .update_task_position(&update.id, update.to)
                .await?;
        }
        Ok(())
    }

    /// Discard optimistic state after a failed write and reload from the backend.
    async fn reconcile(&mut self, context: &str, err: GatewayError) {
        self.notify(Notification::failure(format!("{}: {}", context, err)));
        let reloaded = self.refresh().await.map(|_| ());
        if let Err(reload_err) = reloaded {
            self.notify(Notification::failure(format!(
                "Failed to reload board: {}",
                reload_err
            )));
        }
    }

    /// Report a failed write that had not been applied locally.
    fn write_failed(&mut self, context: &str, err: GatewayError) -> BoardError {
        self.notify(Notification::failure(format!("{}: {}", context, err)));
        BoardError::Gateway(err)
    }

    fn notify(&mut self, notification: Notification) {
        match notification.level {
            NoticeLevel::Success => info!(board = %self.board_id, "{}", notification.message),
            NoticeLevel::Failure => warn!(board = %self.board_id, "{}", notification.message),
        }
        self.notifications.push(notification);
    }
}

/// Renumber the tasks left in a column after one was removed.
fn compact_tasks(state: &mut BoardState, column_id: &str) -> Vec<PositionUpdate> {
    let mut siblings: Vec<Task> = state.tasks_in(column_id).into_iter().cloned().collect();
    let updates = renumber(&mut siblings);
    for update in &updates {
        if let Some(task) = state.task_mut(&update.id) {
            task.position = update.to;
        }
    }
    updates
}
