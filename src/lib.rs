//! Nutanix Prism Central inventory collector.

pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod graph;
pub mod plugin;
pub mod resources;

pub use collector::{Collection, CollectorFailure, PrismCentralCollector};
pub use config::{CollectorConfig, PrismCentralCredentials};
pub use error::{CollectorError, Result};
pub use graph::Graph;
pub use plugin::{NutanixCollectorPlugin, PluginRun};
