//! Board and tag catalogue: listing, creating boards with default columns,
//! and managing the shared tag set.

use std::sync::Arc;
use tracing::info;

use crate::error::{BoardError, BoardResult};
use crate::gateway::PersistenceGateway;
use crate::types::{Board, Tag, normalize_color, rank, validate_title};

pub struct BoardDirectory {
    gateway: Arc<dyn PersistenceGateway>,
    default_columns: Vec<String>,
}

impl BoardDirectory {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, default_columns: Vec<String>) -> Self {
        Self {
            gateway,
            default_columns,
        }
    }

    pub fn default_columns(&self) -> &[String] {
        &self.default_columns
    }

    /// Boards of an owner, most recently updated first.
    pub async fn list_boards(&self, owner: &str) -> BoardResult<Vec<Board>> {
        let owner = validate_title("owner", owner)?;
        Ok(self.gateway.list_boards(&owner).await?)
    }

    /// Create a board seeded with the default columns.
    pub async fn create_board(&self, owner: &str, title: &str) -> BoardResult<Board> {
        let owner = validate_title("owner", owner)?;
        let title = validate_title("title", title)?;

        let board = self.gateway.insert_board(&owner, &title).await?;
        for (index, column_title) in self.default_columns.iter().enumerate() {
            self.gateway
                .insert_column(&board.id, column_title, rank(index))
                .await?;
        }

        info!(board = %board.id, owner = %owner, "Created board '{}'", board.title);
        Ok(board)
    }

    pub async fn create_tag(&self, name: &str, color: &str) -> BoardResult<Tag> {
        let name = validate_title("name", name)?;
        let color = normalize_color(color)?;
        let tag = self.gateway.insert_tag(&name, &color).await?;
        info!(tag = %tag.id, color = %tag.color, "Created tag '{}'", tag.name);
        Ok(tag)
    }

    pub async fn list_tags(&self) -> BoardResult<Vec<Tag>> {
        Ok(self.gateway.list_tags().await?)
    }

    /// Find a tag by id or, failing that, by exact name.
    pub async fn find_tag(&self, id_or_name: &str) -> BoardResult<Tag> {
        let tags = self.list_tags().await?;
        tags.iter()
            .find(|t| t.id == id_or_name)
            .or_else(|| tags.iter().find(|t| t.name == id_or_name))
            .cloned()
            .ok_or_else(|| BoardError::not_found("tag", id_or_name))
    }
}
