//! Command handlers

pub mod export;
pub mod list;
pub mod settings;
pub mod sync;

pub use export::handle_export_command;
pub use list::handle_list_command;
pub use settings::handle_settings_command;
pub use sync::handle_sync_command;
