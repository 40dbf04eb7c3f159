//! JSON HTTP API over the board controllers.
//!
//! Each board gets one long-lived [`BoardController`](crate::board::BoardController),
//! so a drag gesture can span several requests.

mod error;
mod server;

pub use error::ApiError;
pub use server::{ApiServer, build_router, start_server};
