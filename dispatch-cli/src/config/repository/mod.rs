//! Repository layer for database operations

pub mod dispatch;
pub mod settings;
