//! Core types for the task board.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::BoardError;

/// Dense zero-based rank of a column within its board or a task within its column.
pub type Position = u32;

/// Convert a list index into a stored position.
pub fn rank(index: usize) -> Position {
    Position::try_from(index).unwrap_or(Position::MAX)
}

/// A named board owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An ordered container of tasks within a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub board_id: String,
    pub title: String,
    pub position: Position,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A unit of work. Tags are joined from the task_tags relation in attach order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub position: Position,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A reusable colored label. The color is always stored as `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: i64,
}

impl Tag {
    /// Red, green and blue components of the tag color.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        parse_rgb(&self.color)
    }

    /// Text color that stays readable on top of the tag color.
    ///
    /// Uses perceived luminance; unparseable colors get white text.
    pub fn contrast_color(&self) -> &'static str {
        match self.rgb() {
            Some((r, g, b)) => {
                let luminance =
                    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0;
                if luminance > 0.5 { "#000000" } else { "#ffffff" }
            }
            None => "#ffffff",
        }
    }
}

static HEX_COLOR: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"^#?([0-9a-fA-F]{6})$").expect("hex color pattern is valid")
});

/// Validate a 6-hex-digit RGB color and normalize it to lower-case `#rrggbb`.
pub fn normalize_color(input: &str) -> Result<String, BoardError> {
    let trimmed = input.trim();
    let caps = HEX_COLOR.captures(trimmed).ok_or_else(|| {
        BoardError::invalid_value("color", format!("'{}' is not a #rrggbb color", trimmed))
    })?;
    Ok(format!("#{}", caps[1].to_ascii_lowercase()))
}

fn parse_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Trim a user-supplied title and reject it if nothing is left.
pub fn validate_title(field: &'static str, title: &str) -> Result<String, BoardError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoardError::missing_field(field));
    }
    Ok(trimmed.to_string())
}
