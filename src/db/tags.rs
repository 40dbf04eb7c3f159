//! Tag CRUD and task_tags junction operations.

use super::{Database, new_id, now_ms};
use crate::error::GatewayError;
use crate::types::Tag;
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;

pub(crate) fn parse_tag_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
    })
}

/// Load tags for a set of tasks, flattened per task in attach order.
pub(crate) fn tags_for_tasks(
    conn: &Connection,
    task_ids: &[String],
) -> Result<HashMap<String, Vec<Tag>>> {
    let mut by_task: HashMap<String, Vec<Tag>> = HashMap::new();
    if task_ids.is_empty() {
        return Ok(by_task);
    }

    let placeholders = vec!["?"; task_ids.len()].join(", ");
    let sql = format!(
        "SELECT tt.task_id, t.id, t.name, t.color, t.created_at
         FROM task_tags tt JOIN tags t ON t.id = tt.tag_id
         WHERE tt.task_id IN ({})
         ORDER BY tt.attached_at, tt.rowid",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(task_ids.iter()), |row| {
        let task_id: String = row.get("task_id")?;
        Ok((task_id, parse_tag_row(row)?))
    })?;

    for row in rows {
        let (task_id, tag) = row?;
        by_task.entry(task_id).or_default().push(tag);
    }
    Ok(by_task)
}

fn ensure_exists(conn: &Connection, table: &'static str, entity: &'static str, id: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table),
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(GatewayError::not_found(entity, id).into());
    }
    Ok(())
}

impl Database {
    /// Create a tag. The color must already be normalized.
    pub fn create_tag(&self, name: &str, color: &str) -> Result<Tag> {
        let tag = Tag {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            created_at: now_ms(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tags (id, name, color, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![tag.id, tag.name, tag.color, tag.created_at],
            )?;
            Ok(())
        })?;

        Ok(tag)
    }

    /// List all tags by name.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM tags ORDER BY name, created_at")?;
            let tags = stmt
                .query_map([], parse_tag_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tags)
        })
    }

    /// Attach a tag to a task. Attaching twice keeps the original order.
    pub fn attach_tag(&self, task_id: &str, tag_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            ensure_exists(conn, "tasks", "task", task_id)?;
            ensure_exists(conn, "tags", "tag", tag_id)?;
            conn.execute(
                "INSERT OR IGNORE INTO task_tags (task_id, tag_id, attached_at) VALUES (?1, ?2, ?3)",
                params![task_id, tag_id, now_ms()],
            )?;
            Ok(())
        })
    }

    /// Detach a tag from a task.
    pub fn detach_tag(&self, task_id: &str, tag_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM task_tags WHERE task_id = ?1 AND tag_id = ?2",
                params![task_id, tag_id],
            )?;
            if changed == 0 {
                return Err(GatewayError::not_found("task tag", format!("{}/{}", task_id, tag_id)).into());
            }
            Ok(())
        })
    }
}
