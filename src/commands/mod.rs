pub mod collect;
pub mod config;

pub use collect::handle_collect_command;
pub use config::handle_config_command;
