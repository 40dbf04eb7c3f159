//! Output formatting utilities for markdown and JSON.

use serde_json::Value;

use crate::board::BoardState;
use crate::types::{Board, Tag, Task};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Format a board with its columns and tasks as markdown.
pub fn format_board_markdown(state: &BoardState) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n", state.board.title));
    md.push_str(&format!("- **id**: `{}`\n", state.board.id));
    md.push_str(&format!("- **owner**: {}\n\n", state.board.owner));

    for column in &state.columns {
        let tasks = state.tasks_in(&column.id);
        md.push_str(&format!(
            "## {} ({}) `{}`\n\n",
            column.title,
            tasks.len(),
            column.id
        ));
        for task in tasks {
            md.push_str(&format_task_short(task));
        }
        md.push('\n');
    }

    md
}

fn format_task_short(task: &Task) -> String {
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        let labels: Vec<String> = task.tags.iter().map(format_tag_label).collect();
        format!(" {}", labels.join(" "))
    };

    let description = task
        .description
        .as_ref()
        .map(|d| format!(" - _{}_", d))
        .unwrap_or_default();

    format!("- {} `{}`{}{}\n", task.title, task.id, tags, description)
}

/// A tag rendered as `[name](#bg on #fg)` so terminals without color still
/// show which text color suits the background.
fn format_tag_label(tag: &Tag) -> String {
    format!("[{}]({} on {})", tag.name, tag.color, tag.contrast_color())
}

/// Format a list of boards as markdown.
pub fn format_boards_markdown(boards: &[Board]) -> String {
    let mut md = format!("# Boards ({})\n\n", boards.len());
    for board in boards {
        md.push_str(&format!(
            "- {} `{}` @{}\n",
            board.title, board.id, board.owner
        ));
    }
    md
}

pub fn format_tags_markdown(tags: &[Tag]) -> String {
    let mut md = format!("# Tags ({})\n\n", tags.len());
    for tag in tags {
        md.push_str(&format!("- {} `{}`\n", format_tag_label(tag), tag.id));
    }
    md
}

/// Convert markdown to JSON value for uniform response handling.
pub fn markdown_to_json(md: String) -> Value {
    serde_json::json!({
        "format": "markdown",
        "content": md
    })
}
