//! Task CRUD, position and column-membership operations.

use super::boards::touch_board;
use super::tags::tags_for_tasks;
use super::{Database, new_id, now_ms};
use crate::error::GatewayError;
use crate::types::{Position, Task};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        column_id: row.get("column_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        tags: Vec::new(),
    })
}

/// Look up the column and board a task currently lives in.
fn task_location(conn: &Connection, task_id: &str) -> Result<(String, String)> {
    conn.query_row(
        "SELECT t.column_id, c.board_id FROM tasks t JOIN columns c ON c.id = t.column_id
         WHERE t.id = ?1",
        params![task_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or_else(|| GatewayError::not_found("task", task_id).into())
}

/// Rewrite a column's task positions as 0..n-1 in their current order.
fn compact_column(conn: &Connection, column_id: &str, now: i64) -> Result<()> {
    let ids: Vec<(String, Position)> = {
        let mut stmt = conn.prepare(
            "SELECT id, position FROM tasks WHERE column_id = ?1 ORDER BY position, created_at",
        )?;
        stmt.query_map(params![column_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    for (index, (id, position)) in ids.iter().enumerate() {
        let rank = crate::types::rank(index);
        if *position != rank {
            conn.execute(
                "UPDATE tasks SET position = ?1, updated_at = ?2 WHERE id = ?3",
                params![rank, now, id],
            )?;
        }
    }
    Ok(())
}

impl Database {
    /// Insert a task at the given position. Existing positions are not shifted.
    pub fn create_task(&self, column_id: &str, title: &str, position: Position) -> Result<Task> {
        let now = now_ms();
        let task = Task {
            id: new_id(),
            column_id: column_id.to_string(),
            title: title.to_string(),
            description: None,
            position,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let board_id: String = tx
                .query_row(
                    "SELECT board_id FROM columns WHERE id = ?1",
                    params![column_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| GatewayError::not_found("column", column_id))?;

            tx.execute(
                "INSERT INTO tasks (id, column_id, title, description, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6)",
                params![task.id, task.column_id, task.title, task.position, now, now],
            )?;
            touch_board(&tx, &board_id, now)?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(task)
    }

    /// Get a task with its tags.
    pub fn get_task(&self, task_id: &str) -> Result<Task> {
        self.with_conn(|conn| {
            let mut task = conn
                .query_row(
                    "SELECT * FROM tasks WHERE id = ?1",
                    params![task_id],
                    parse_task_row,
                )
                .optional()?
                .ok_or_else(|| GatewayError::not_found("task", task_id))?;
            let mut tags = tags_for_tasks(conn, std::slice::from_ref(&task.id))?;
            task.tags = tags.remove(&task.id).unwrap_or_default();
            Ok(task)
        })
    }

    /// List the tasks of the given columns ordered by position, tags joined.
    pub fn list_tasks(&self, column_ids: &[String]) -> Result<Vec<Task>> {
        if column_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.with_conn(|conn| {
            let placeholders = vec!["?"; column_ids.len()].join(", ");
            let sql = format!(
                "SELECT * FROM tasks WHERE column_id IN ({}) ORDER BY position, created_at",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut tasks = stmt
                .query_map(rusqlite::params_from_iter(column_ids.iter()), parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
            let mut tags = tags_for_tasks(conn, &ids)?;
            for task in &mut tasks {
                task.tags = tags.remove(&task.id).unwrap_or_default();
            }
            Ok(tasks)
        })
    }

    /// Update a task's title and description.
    pub fn update_task_details(
        &self,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let (_, board_id) = task_location(conn, task_id)?;
            let now = now_ms();
            conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![title, description, now, task_id],
            )?;
            touch_board(conn, &board_id, now)
        })
    }

    /// Write a single task's position.
    pub fn update_task_position(&self, task_id: &str, position: Position) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET position = ?1, updated_at = ?2 WHERE id = ?3",
                params![position, now_ms(), task_id],
            )?;
            if changed == 0 {
                return Err(GatewayError::not_found("task", task_id).into());
            }
            Ok(())
        })
    }

    /// Move a task into another column.
    ///
    /// The task is appended after the destination's last task and the source
    /// column is compacted, all in one transaction, so a subsequent read never
    /// sees two tasks sharing a `(column_id, position)` pair.
    pub fn move_task_to_column(&self, task_id: &str, column_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (source_column, board_id) = task_location(&tx, task_id)?;
            if source_column == column_id {
                return Ok(());
            }

            let next_position: Position = tx
                .query_row(
                    "SELECT (SELECT COUNT(*) FROM tasks WHERE column_id = ?1)
                     FROM columns WHERE id = ?1",
                    params![column_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| GatewayError::not_found("column", column_id))?;

            let now = now_ms();
            tx.execute(
                "UPDATE tasks SET column_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                params![column_id, next_position, now, task_id],
            )?;
            compact_column(&tx, &source_column, now)?;
            touch_board(&tx, &board_id, now)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Delete a task. Sibling positions are left for the caller to renumber.
    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let (_, board_id) = task_location(conn, task_id)?;
            conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            touch_board(conn, &board_id, now_ms())
        })
    }
}
