//! Persistence gateway: the backend capability set the board depends on.
//!
//! Every call is assumed network-latent and may fail on its own; none is
//! atomic across rows from the caller's point of view. [`Database`] is the
//! bundled SQLite implementation.

use async_trait::async_trait;

use crate::db::Database;
use crate::error::GatewayResult;
use crate::types::{Board, Column, Position, Tag, Task};

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn get_board(&self, board_id: &str) -> GatewayResult<Board>;

    /// Boards of an owner, most recently updated first.
    async fn list_boards(&self, owner: &str) -> GatewayResult<Vec<Board>>;

    async fn insert_board(&self, owner: &str, title: &str) -> GatewayResult<Board>;

    async fn update_board_title(&self, board_id: &str, title: &str) -> GatewayResult<()>;

    /// Columns of a board ordered by position.
    async fn list_columns(&self, board_id: &str) -> GatewayResult<Vec<Column>>;

    async fn insert_column(
        &self,
        board_id: &str,
        title: &str,
        position: Position,
    ) -> GatewayResult<Column>;

    async fn update_column_title(&self, column_id: &str, title: &str) -> GatewayResult<()>;

    async fn update_column_position(&self, column_id: &str, position: Position)
    -> GatewayResult<()>;

    async fn delete_column(&self, column_id: &str) -> GatewayResult<()>;

    /// Tasks of the given columns ordered by position, tags flattened in.
    async fn list_tasks(&self, column_ids: &[String]) -> GatewayResult<Vec<Task>>;

    async fn insert_task(
        &self,
        column_id: &str,
        title: &str,
        position: Position,
    ) -> GatewayResult<Task>;

    async fn update_task_details(
        &self,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> GatewayResult<()>;

    async fn update_task_position(&self, task_id: &str, position: Position) -> GatewayResult<()>;

    /// Reassign a task to another column. The backend owns the resulting position.
    async fn update_task_column(&self, task_id: &str, column_id: &str) -> GatewayResult<()>;

    async fn delete_task(&self, task_id: &str) -> GatewayResult<()>;

    async fn insert_tag(&self, name: &str, color: &str) -> GatewayResult<Tag>;

    async fn list_tags(&self) -> GatewayResult<Vec<Tag>>;

    async fn attach_tag(&self, task_id: &str, tag_id: &str) -> GatewayResult<()>;

    async fn detach_tag(&self, task_id: &str, tag_id: &str) -> GatewayResult<()>;
}

#[async_trait]
impl PersistenceGateway for Database {
    async fn get_board(&self, board_id: &str) -> GatewayResult<Board> {
        Ok(Database::get_board(self, board_id)?)
    }

    async fn list_boards(&self, owner: &str) -> GatewayResult<Vec<Board>> {
        Ok(Database::list_boards(self, owner)?)
    }

    async fn insert_board(&self, owner: &str, title: &str) -> GatewayResult<Board> {
        Ok(self.create_board(owner, title)?)
    }

    async fn update_board_title(&self, board_id: &str, title: &str) -> GatewayResult<()> {
        Ok(Database::update_board_title(self, board_id, title)?)
    }

    async fn list_columns(&self, board_id: &str) -> GatewayResult<Vec<Column>> {
        Ok(Database::list_columns(self, board_id)?)
    }

    async fn insert_column(
        &self,
        board_id: &str,
        title: &str,
        position: Position,
    ) -> GatewayResult<Column> {
        Ok(self.create_column(board_id, title, position)?)
    }

    async fn update_column_title(&self, column_id: &str, title: &str) -> GatewayResult<()> {
        Ok(Database::update_column_title(self, column_id, title)?)
    }

    async fn update_column_position(
        &self,
        column_id: &str,
        position: Position,
    ) -> GatewayResult<()> {
        Ok(Database::update_column_position(self, column_id, position)?)
    }

    async fn delete_column(&self, column_id: &str) -> GatewayResult<()> {
        Ok(Database::delete_column(self, column_id)?)
    }

    async fn list_tasks(&self, column_ids: &[String]) -> GatewayResult<Vec<Task>> {
        Ok(Database::list_tasks(self, column_ids)?)
    }

    async fn insert_task(
        &self,
        column_id: &str,
        title: &str,
        position: Position,
    ) -> GatewayResult<Task> {
        Ok(self.create_task(column_id, title, position)?)
    }

    async fn update_task_details(
        &self,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> GatewayResult<()> {
        Ok(Database::update_task_details(self, task_id, title, description)?)
    }

    async fn update_task_position(&self, task_id: &str, position: Position) -> GatewayResult<()> {
        Ok(Database::update_task_position(self, task_id, position)?)
    }

    async fn update_task_column(&self, task_id: &str, column_id: &str) -> GatewayResult<()> {
        Ok(self.move_task_to_column(task_id, column_id)?)
    }

    async fn delete_task(&self, task_id: &str) -> GatewayResult<()> {
        Ok(Database::delete_task(self, task_id)?)
    }

    async fn insert_tag(&self, name: &str, color: &str) -> GatewayResult<Tag> {
        Ok(self.create_tag(name, color)?)
    }

    async fn list_tags(&self) -> GatewayResult<Vec<Tag>> {
        Ok(Database::list_tags(self)?)
    }

    async fn attach_tag(&self, task_id: &str, tag_id: &str) -> GatewayResult<()> {
        Ok(Database::attach_tag(self, task_id, tag_id)?)
    }

    async fn detach_tag(&self, task_id: &str, tag_id: &str) -> GatewayResult<()> {
        Ok(Database::detach_tag(self, task_id, tag_id)?)
    }
}
