//! Kanban task boards with drag-and-drop reordering.
//!
//! This module exports the core components for testing and integration.

pub mod api;
pub mod board;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod gateway;
pub mod notify;
pub mod reorder;
pub mod types;
