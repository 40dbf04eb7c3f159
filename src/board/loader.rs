//! Board aggregate loading.

use tracing::{debug, warn};

use super::BoardState;
use crate::error::GatewayResult;
use crate::gateway::PersistenceGateway;

/// Load a board with its columns and their tasks.
///
/// Columns and tasks come back from the gateway already sorted by position,
/// with each task's tags flattened. Position conflicts found in the loaded
/// data are logged, not repaired.
pub async fn load_board(
    gateway: &dyn PersistenceGateway,
    board_id: &str,
) -> GatewayResult<BoardState> {
    let board = gateway.get_board(board_id).await?;
    let columns = gateway.list_columns(board_id).await?;
    let column_ids: Vec<String> = columns.iter().map(|c| c.id.clone()).collect();
    let tasks = gateway.list_tasks(&column_ids).await?;

    debug!(
        board = %board_id,
        columns = columns.len(),
        tasks = tasks.len(),
        "Loaded board"
    );

    let state = BoardState::new(board, columns, tasks);
    for conflict in state.position_conflicts() {
        warn!(board = %board_id, %conflict, "Inconsistent positions in stored board");
    }
    Ok(state)
}
