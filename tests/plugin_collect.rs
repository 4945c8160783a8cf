//! End-to-end collection runs against in-memory Prism Central backends.

use nutanix_collector::client::{
    ClientFactory, ClusterManagement, ClusterRecord, ClusterReference, ListResponse,
    VmManagement, VmRecord,
};
use nutanix_collector::collector::vm_filter;
use nutanix_collector::config::{CollectorConfig, PrismCentralCredentials};
use nutanix_collector::error::{ApiError, ConfigError};
use nutanix_collector::resources::{BaseResource, PrismCentralAccount, ResourceKind};
use nutanix_collector::NutanixCollectorPlugin;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ── In-memory backend ───────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Backend {
    clusters: Vec<ClusterRecord>,
    vms: HashMap<String, Vec<VmRecord>>,
    fail_clusters: bool,
}

struct FakeClusters(Backend);

impl ClusterManagement for FakeClusters {
    fn list_clusters(&self) -> Result<ListResponse<ClusterRecord>, ApiError> {
        if self.0.fail_clusters {
            return Err(ApiError::Status {
                url: "https://pc/api/clustermgmt/v4.0/config/clusters".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(ListResponse::new(self.0.clusters.clone()))
    }
}

struct FakeVms(Backend);

impl VmManagement for FakeVms {
    fn list_vms(&self, filter: &str) -> Result<ListResponse<VmRecord>, ApiError> {
        Ok(ListResponse::new(
            self.0.vms.get(filter).cloned().unwrap_or_default(),
        ))
    }
}

/// Hands out clients per account id; unknown accounts fail client setup.
#[derive(Default)]
struct FakeFactory {
    backends: HashMap<String, Backend>,
    built: Arc<Mutex<Vec<(String, u16, bool)>>>,
}

impl FakeFactory {
    fn backend(&self, account: &PrismCentralAccount) -> Result<Backend, ConfigError> {
        self.built
            .lock()
            .unwrap()
            .push((account.endpoint.clone(), account.port, account.insecure));
        self.backends
            .get(&account.id)
            .cloned()
            .ok_or_else(|| ConfigError::Client {
                host: account.endpoint.clone(),
                message: "no route to host".to_string(),
            })
    }
}

impl ClientFactory for FakeFactory {
    fn cluster_client(
        &self,
        account: &PrismCentralAccount,
    ) -> Result<Box<dyn ClusterManagement>, ConfigError> {
        Ok(Box::new(FakeClusters(self.backend(account)?)))
    }

    fn vmm_client(
        &self,
        account: &PrismCentralAccount,
    ) -> Result<Box<dyn VmManagement>, ConfigError> {
        Ok(Box::new(FakeVms(self.backend(account)?)))
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

fn creds(name: &str) -> PrismCentralCredentials {
    PrismCentralCredentials {
        name: name.to_string(),
        endpoint: format!("{}.example.com", name.replace(' ', "-").to_lowercase()),
        username: "admin".to_string(),
        password: "secret".to_string(),
        insecure: false,
        port: 9440,
    }
}

fn cluster(id: &str, name: &str) -> ClusterRecord {
    ClusterRecord {
        ext_id: id.to_string(),
        name: name.to_string(),
    }
}

fn vm(id: &str, name: &str, cluster: &str) -> VmRecord {
    VmRecord {
        ext_id: id.to_string(),
        name: name.to_string(),
        power_state: Some("ON".to_string()),
        create_time: None,
        update_time: None,
        cluster: Some(ClusterReference {
            ext_id: cluster.to_string(),
        }),
    }
}

/// Two clusters; c1 runs one VM, c2 runs none.
fn scenario_backend() -> Backend {
    let mut backend = Backend {
        clusters: vec![cluster("c1", "ClusterA"), cluster("c2", "ClusterB")],
        ..Default::default()
    };
    backend
        .vms
        .insert(vm_filter("c1"), vec![vm("vm1", "web1", "c1")]);
    backend
}

fn config(names: &[&str]) -> CollectorConfig {
    CollectorConfig {
        credentials: names.iter().map(|n| creds(n)).collect(),
        ..Default::default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[test]
fn two_cluster_scenario() {
    let mut factory = FakeFactory::default();
    factory
        .backends
        .insert("Sherlock_Dev".to_string(), scenario_backend());

    let plugin = NutanixCollectorPlugin::with_factory(config(&["Sherlock Dev"]), factory);
    let run = plugin.collect();
    assert!(run.is_complete(), "{:?}", run.failures);

    let graph = &run.graph;
    let account = graph
        .find(ResourceKind::PrismCentralAccount, "Sherlock_Dev")
        .expect("account node");
    assert_eq!(graph.node(account).unwrap().name(), "Sherlock Dev");
    assert_eq!(graph.successors(graph.root()), vec![account]);

    let c1 = graph.find(ResourceKind::PrismElement, "c1").unwrap();
    let c2 = graph.find(ResourceKind::PrismElement, "c2").unwrap();
    assert_eq!(graph.successors(account), vec![c1, c2]);

    let vm1 = graph.find(ResourceKind::VirtualMachine, "vm1").unwrap();
    assert_eq!(graph.successors(c1), vec![vm1]);
    assert!(graph.successors(c2).is_empty());
    assert_eq!(graph.node(vm1).unwrap().name(), "web1");

    // root + account + 2 elements + 1 vm
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.edge_count(), 4);
    graph.validate().unwrap();
}

#[test]
fn account_settings_reach_the_client_factory() {
    let mut factory = FakeFactory::default();
    factory.backends.insert("lab".to_string(), Backend::default());
    let built = factory.built.clone();

    let mut cfg = config(&["lab"]);
    cfg.credentials[0].port = 9441;
    cfg.credentials[0].insecure = true;
    let run = NutanixCollectorPlugin::with_factory(cfg, factory).collect();

    assert!(run.is_complete());
    let built = built.lock().unwrap();
    assert_eq!(built.len(), 2);
    assert!(built
        .iter()
        .all(|b| *b == ("lab.example.com".to_string(), 9441, true)));
}

#[test]
fn disabling_virtual_machines_keeps_elements() {
    let mut factory = FakeFactory::default();
    factory.backends.insert("pc".to_string(), scenario_backend());

    let mut cfg = config(&["pc"]);
    cfg.disable(&["virtual_machines".to_string()]);
    let run = NutanixCollectorPlugin::with_factory(cfg, factory).collect();

    assert_eq!(run.graph.nodes_of_kind(ResourceKind::PrismElement).len(), 2);
    assert!(run
        .graph
        .nodes_of_kind(ResourceKind::VirtualMachine)
        .is_empty());
}

#[test]
fn failing_account_does_not_block_others() {
    let mut factory = FakeFactory::default();
    factory.backends.insert("good".to_string(), scenario_backend());
    let mut flaky = scenario_backend();
    flaky.fail_clusters = true;
    factory.backends.insert("flaky".to_string(), flaky);

    // "unreachable" has no backend and fails client setup; "bad" never
    // gets that far because its endpoint carries a scheme.
    let mut cfg = config(&["unreachable", "flaky", "good", "bad"]);
    cfg.credentials[3].endpoint = "https://bad.example.com".to_string();

    let run = NutanixCollectorPlugin::with_factory(cfg, factory).collect();
    let graph = &run.graph;

    assert!(graph
        .find(ResourceKind::PrismCentralAccount, "unreachable")
        .is_none());
    assert!(graph.find(ResourceKind::PrismCentralAccount, "bad").is_none());
    // A failed cluster listing still yields an (empty) account node.
    let flaky = graph
        .find(ResourceKind::PrismCentralAccount, "flaky")
        .unwrap();
    assert!(graph.successors(flaky).is_empty());
    assert!(graph.find(ResourceKind::VirtualMachine, "vm1").is_some());

    let mut failed: Vec<(&str, &str)> = run
        .failures
        .iter()
        .map(|f| (f.account.as_str(), f.collector.as_str()))
        .collect();
    failed.sort();
    assert_eq!(
        failed,
        vec![
            ("bad", "setup"),
            ("flaky", "prism_elements"),
            ("unreachable", "setup"),
        ]
    );
}

#[test]
fn shared_cluster_keeps_the_rest_of_the_account() {
    let mut factory = FakeFactory::default();
    factory.backends.insert("a".to_string(), scenario_backend());

    // "b" sees c1 as well, plus a cluster of its own.
    let mut other = Backend {
        clusters: vec![cluster("c1", "ClusterA"), cluster("c3", "ClusterC")],
        ..Default::default()
    };
    other
        .vms
        .insert(vm_filter("c1"), vec![vm("vm2", "web2", "c1")]);
    other
        .vms
        .insert(vm_filter("c3"), vec![vm("vm3", "db1", "c3")]);
    factory.backends.insert("b".to_string(), other);

    let run = NutanixCollectorPlugin::with_factory(config(&["a", "b"]), factory).collect();
    let graph = &run.graph;

    assert_eq!(graph.successors(graph.root()).len(), 2);
    let a = graph.find(ResourceKind::PrismCentralAccount, "a").unwrap();
    let b = graph.find(ResourceKind::PrismCentralAccount, "b").unwrap();
    let c1 = graph.find(ResourceKind::PrismElement, "c1").unwrap();
    let c3 = graph.find(ResourceKind::PrismElement, "c3").unwrap();
    assert_eq!(graph.predecessors(c1), vec![a]);
    assert_eq!(graph.successors(b), vec![c3]);
    assert!(graph.find(ResourceKind::VirtualMachine, "vm2").is_none());
    assert!(graph.find(ResourceKind::VirtualMachine, "vm3").is_some());

    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].account, "b");
    assert_eq!(run.failures[0].collector, "merge");
    assert!(run.failures[0].error.contains("prism_element:c1"));
    graph.validate().unwrap();
}

#[test]
fn repeated_runs_build_identical_graphs() {
    let mut factory = FakeFactory::default();
    factory.backends.insert("pc".to_string(), scenario_backend());
    let plugin = NutanixCollectorPlugin::with_factory(config(&["pc"]), factory);

    let first = plugin.collect();
    let second = plugin.collect();
    assert_eq!(first.graph.structure(), second.graph.structure());
}

#[test]
fn no_credentials_yields_bare_root() {
    let plugin = NutanixCollectorPlugin::with_factory(CollectorConfig::default(), FakeFactory::default());
    let run = plugin.collect();
    assert_eq!(run.graph.node_count(), 1);
    assert!(run.is_complete());
    assert_eq!(run.graph.root_resource().id(), "root");
}

#[test]
fn exported_graph_hides_secrets() {
    let mut factory = FakeFactory::default();
    factory.backends.insert("pc".to_string(), scenario_backend());
    let run = NutanixCollectorPlugin::with_factory(config(&["pc"]), factory).collect();

    let json = serde_json::to_string(&run.graph.export()).unwrap();
    assert!(!json.contains("secret"));
    assert!(json.contains("\"root\":\"graph_root:root\""));
}
