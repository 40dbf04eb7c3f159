//! Board state, loading, and the controller that edits a board.

mod controller;
mod directory;
mod loader;
pub mod state;

pub use controller::{BoardController, LoadState};
pub use directory::BoardDirectory;
pub use loader::load_board;
pub use state::{BoardState, PositionConflict};
