//! Runs the Prism Central collector for every configured account.

use crate::client::{ClientFactory, PrismClientFactory};
use crate::collector::{Collection, CollectorFailure, PrismCentralCollector};
use crate::config::{CollectorConfig, PrismCentralCredentials};
use crate::error::CollectorError;
use crate::graph::Graph;
use crate::resources::{GraphRoot, PrismCentralAccount};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const GRAPH_ROOT_ID: &str = "root";

/// Outcome of one plugin run across all accounts.
pub struct PluginRun {
    pub graph: Graph,
    pub failures: Vec<CollectorFailure>,
}

impl PluginRun {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct NutanixCollectorPlugin<F = PrismClientFactory> {
    config: CollectorConfig,
    factory: F,
}

impl NutanixCollectorPlugin<PrismClientFactory> {
    pub fn new(config: CollectorConfig) -> Self {
        let factory = PrismClientFactory {
            timeout: Duration::from_secs(config.timeout_secs),
        };
        NutanixCollectorPlugin { config, factory }
    }
}

impl<F: ClientFactory> NutanixCollectorPlugin<F> {
    pub fn with_factory(config: CollectorConfig, factory: F) -> Self {
        NutanixCollectorPlugin { config, factory }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect every configured account. Accounts are independent: one
    /// failing account never keeps the others out of the graph.
    pub fn collect(&self) -> PluginRun {
        debug!("plugin: collecting nutanix resources");

        let mut graph = Graph::new(GraphRoot::new(GRAPH_ROOT_ID));
        let root = graph.root();
        let mut failures = Vec::new();

        for creds in &self.config.credentials {
            let collection = match self.collect_pc(creds) {
                Ok(collection) => collection,
                Err(e) => {
                    error!("Skipping Prism Central {}: {}", creds.name, e);
                    failures.push(account_failure(&creds.name, "setup", &e));
                    continue;
                }
            };

            failures.extend(collection.failures);
            match graph.merge(root, collection.graph) {
                Ok(merged) => {
                    for e in merged.skipped {
                        let e = CollectorError::from(e);
                        warn!("Prism Central {}: left out of the graph: {}", creds.name, e);
                        failures.push(account_failure(&creds.name, "merge", &e));
                    }
                }
                Err(e) => {
                    let e = CollectorError::from(e);
                    error!("Failed to merge Prism Central {}: {}", creds.name, e);
                    failures.push(account_failure(&creds.name, "merge", &e));
                }
            }
        }

        info!(
            "Collected {} accounts, {} resources, {} failures",
            graph.successors(root).len(),
            graph.node_count() - 1,
            failures.len()
        );
        PluginRun { graph, failures }
    }

    /// Collect a single Prism Central. Fails only if the account can not be
    /// set up; collector errors are reported inside the returned collection.
    pub fn collect_pc(&self, creds: &PrismCentralCredentials) -> Result<Collection, CollectorError> {
        creds.validate()?;
        let account = PrismCentralAccount::from_credentials(creds);
        info!("Collecting data from Nutanix Prism Central {}", account.name);

        let vms = self.factory.vmm_client(&account)?;
        let clusters = self.factory.cluster_client(&account)?;
        let collector = PrismCentralCollector::new(account, vms.as_ref(), clusters.as_ref())
            .with_enabled(self.config.enabled_collectors());
        Ok(collector.collect())
    }
}

fn account_failure(account: &str, stage: &str, e: &CollectorError) -> CollectorFailure {
    CollectorFailure {
        account: account.to_string(),
        element: None,
        collector: stage.to_string(),
        error: e.to_string(),
    }
}
