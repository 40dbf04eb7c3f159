//! Board CRUD operations.

use super::{Database, new_id, now_ms};
use crate::error::GatewayError;
use crate::types::Board;
use anyhow::Result;
use rusqlite::{Connection, Row, params};

fn parse_board_row(row: &Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get("id")?,
        title: row.get("title")?,
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Bump a board's updated_at so board listings surface recently edited boards first.
pub(crate) fn touch_board(conn: &Connection, board_id: &str, now: i64) -> Result<()> {
    conn.execute(
        "UPDATE boards SET updated_at = ?1 WHERE id = ?2",
        params![now, board_id],
    )?;
    Ok(())
}

impl Database {
    /// Create a board with no columns.
    pub fn create_board(&self, owner: &str, title: &str) -> Result<Board> {
        let now = now_ms();
        let board = Board {
            id: new_id(),
            title: title.to_string(),
            owner: owner.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO boards (id, title, owner, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    board.id,
                    board.title,
                    board.owner,
                    board.created_at,
                    board.updated_at
                ],
            )?;
            Ok(())
        })?;

        Ok(board)
    }

    /// Get a board by ID.
    pub fn get_board(&self, board_id: &str) -> Result<Board> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM boards WHERE id = ?1")?;
            match stmt.query_row(params![board_id], parse_board_row) {
                Ok(board) => Ok(board),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    Err(GatewayError::not_found("board", board_id).into())
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List an owner's boards, most recently updated first.
    pub fn list_boards(&self, owner: &str) -> Result<Vec<Board>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM boards WHERE owner = ?1
                 ORDER BY updated_at DESC, created_at DESC",
            )?;
            let boards = stmt
                .query_map(params![owner], parse_board_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(boards)
        })
    }

    /// Rename a board.
    pub fn update_board_title(&self, board_id: &str, title: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE boards SET title = ?1, updated_at = ?2 WHERE id = ?3",
                params![title, now_ms(), board_id],
            )?;
            if changed == 0 {
                return Err(GatewayError::not_found("board", board_id).into());
            }
            Ok(())
        })
    }

    /// Delete a board along with its columns and tasks.
    pub fn delete_board(&self, board_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM boards WHERE id = ?1", params![board_id])?;
            if changed == 0 {
                return Err(GatewayError::not_found("board", board_id).into());
            }
            Ok(())
        })
    }
}
