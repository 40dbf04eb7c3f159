//! Column CRUD and position operations.

use super::boards::touch_board;
use super::{Database, new_id, now_ms};
use crate::error::GatewayError;
use crate::types::{Column, Position};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

fn parse_column_row(row: &Row) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get("id")?,
        board_id: row.get("board_id")?,
        title: row.get("title")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn board_of_column(conn: &Connection, column_id: &str) -> Result<String> {
    match conn.query_row(
        "SELECT board_id FROM columns WHERE id = ?1",
        params![column_id],
        |row| row.get(0),
    ) {
        Ok(board_id) => Ok(board_id),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(GatewayError::not_found("column", column_id).into())
        }
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Insert a column at the given position. Existing positions are not shifted.
    pub fn create_column(&self, board_id: &str, title: &str, position: Position) -> Result<Column> {
        let now = now_ms();
        let column = Column {
            id: new_id(),
            board_id: board_id.to_string(),
            title: title.to_string(),
            position,
            created_at: now,
            updated_at: now,
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let board_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM boards WHERE id = ?1)",
                params![board_id],
                |row| row.get(0),
            )?;
            if !board_exists {
                return Err(GatewayError::not_found("board", board_id).into());
            }

            tx.execute(
                "INSERT INTO columns (id, board_id, title, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    column.id,
                    column.board_id,
                    column.title,
                    column.position,
                    column.created_at,
                    column.updated_at
                ],
            )?;
            touch_board(&tx, board_id, now)?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(column)
    }

    /// List a board's columns ordered by position.
    pub fn list_columns(&self, board_id: &str) -> Result<Vec<Column>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM columns WHERE board_id = ?1 ORDER BY position, created_at",
            )?;
            let columns = stmt
                .query_map(params![board_id], parse_column_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(columns)
        })
    }

    /// Rename a column.
    pub fn update_column_title(&self, column_id: &str, title: &str) -> Result<()> {
        self.with_conn(|conn| {
            let board_id = board_of_column(conn, column_id)?;
            let now = now_ms();
            conn.execute(
                "UPDATE columns SET title = ?1, updated_at = ?2 WHERE id = ?3",
                params![title, now, column_id],
            )?;
            touch_board(conn, &board_id, now)
        })
    }

    /// Write a single column's position.
    pub fn update_column_position(&self, column_id: &str, position: Position) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE columns SET position = ?1, updated_at = ?2 WHERE id = ?3",
                params![position, now_ms(), column_id],
            )?;
            if changed == 0 {
                return Err(GatewayError::not_found("column", column_id).into());
            }
            Ok(())
        })
    }

    /// Delete a column; its tasks are removed by the foreign key cascade.
    /// Sibling positions are left untouched for the caller to renumber.
    pub fn delete_column(&self, column_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let board_id = board_of_column(conn, column_id)?;
            conn.execute("DELETE FROM columns WHERE id = ?1", params![column_id])?;
            touch_board(conn, &board_id, now_ms())
        })
    }
}
