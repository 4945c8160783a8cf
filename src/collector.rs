//! Mandatory, global and per-element collectors for one Prism Central.

use crate::client::{ClusterManagement, VmManagement};
use crate::error::Result;
use crate::graph::Graph;
use crate::resources::{PrismCentralAccount, PrismElement, ResourceKind, VirtualMachine};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

pub const PRISM_ELEMENTS: &str = "prism_elements";
pub const VIRTUAL_MACHINES: &str = "virtual_machines";

/// What a collector function gets to work with.
pub struct CollectContext<'a> {
    pub account: &'a PrismCentralAccount,
    pub clusters: &'a dyn ClusterManagement,
    pub vms: &'a dyn VmManagement,
    pub graph: &'a mut Graph,
}

/// The Prism Element a per-element collector runs against.
#[derive(Debug, Clone)]
pub struct ElementTarget {
    pub index: NodeIndex,
    pub id: String,
    pub name: String,
}

pub type PhaseFn = fn(&mut CollectContext<'_>) -> Result<()>;
pub type ElementFn = fn(&mut CollectContext<'_>, &ElementTarget) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Mandatory,
    Global,
    PerElement,
}

#[derive(Clone, Copy)]
pub enum Collector {
    Mandatory(PhaseFn),
    Global(PhaseFn),
    PerElement(ElementFn),
}

impl Collector {
    pub fn phase(&self) -> Phase {
        match self {
            Collector::Mandatory(_) => Phase::Mandatory,
            Collector::Global(_) => Phase::Global,
            Collector::PerElement(_) => Phase::PerElement,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Registration {
    pub name: &'static str,
    pub collector: Collector,
}

/// Collectors registered on every new [`PrismCentralCollector`].
pub fn default_registrations() -> Vec<Registration> {
    vec![
        Registration {
            name: PRISM_ELEMENTS,
            collector: Collector::Mandatory(collect_prism_elements),
        },
        Registration {
            name: VIRTUAL_MACHINES,
            collector: Collector::PerElement(collect_virtual_machines),
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorFailure {
    pub account: String,
    pub element: Option<String>,
    pub collector: String,
    pub error: String,
}

pub struct Collection {
    pub graph: Graph,
    pub failures: Vec<CollectorFailure>,
}

pub struct PrismCentralCollector<'a> {
    account: PrismCentralAccount,
    vms: &'a dyn VmManagement,
    clusters: &'a dyn ClusterManagement,
    registrations: Vec<Registration>,
    enabled: HashSet<String>,
}

impl<'a> PrismCentralCollector<'a> {
    pub fn new(
        account: PrismCentralAccount,
        vms: &'a dyn VmManagement,
        clusters: &'a dyn ClusterManagement,
    ) -> Self {
        let registrations = default_registrations();
        let enabled = registrations.iter().map(|r| r.name.to_string()).collect();
        PrismCentralCollector {
            account,
            vms,
            clusters,
            registrations,
            enabled,
        }
    }

    /// Restrict the non-mandatory collectors to `enabled`. Unknown names are
    /// ignored.
    pub fn with_enabled(mut self, enabled: HashSet<String>) -> Self {
        self.enabled = enabled;
        self
    }

    /// Register an additional collector. It is enabled unless a later
    /// `with_enabled` says otherwise.
    pub fn with_collector(mut self, name: &'static str, collector: Collector) -> Self {
        self.enabled.insert(name.to_string());
        self.registrations.push(Registration { name, collector });
        self
    }

    /// Runs all collectors and returns the graph rooted at the account.
    pub fn collect(&self) -> Collection {
        info!("Collecting data from Nutanix Prism Central: {}", self.account.name);

        let mut graph = Graph::new(self.account.clone());
        let mut failures = Vec::new();
        let mut ctx = CollectContext {
            account: &self.account,
            clusters: self.clusters,
            vms: self.vms,
            graph: &mut graph,
        };

        for reg in self.in_phase(Phase::Mandatory) {
            if let Collector::Mandatory(collect) = reg.collector {
                info!("Running collector: {} in {}", reg.name, self.account.name);
                let result = collect(&mut ctx);
                self.record(result, reg.name, None, &mut failures);
            }
        }

        for reg in self.in_phase(Phase::Global) {
            if let Collector::Global(collect) = reg.collector {
                if !self.enabled.contains(reg.name) {
                    debug!("Skipping disabled collector: {}", reg.name);
                    continue;
                }
                info!("Running collector: {} in {}", reg.name, self.account.name);
                let result = collect(&mut ctx);
                self.record(result, reg.name, None, &mut failures);
            }
        }

        let elements = element_targets(&*ctx.graph);
        for reg in self.in_phase(Phase::PerElement) {
            if let Collector::PerElement(collect) = reg.collector {
                if !self.enabled.contains(reg.name) {
                    debug!("Skipping disabled collector: {}", reg.name);
                    continue;
                }
                for element in &elements {
                    info!("Running collector: {} in {}", reg.name, element.name);
                    let result = collect(&mut ctx, element);
                    self.record(result, reg.name, Some(element), &mut failures);
                }
            }
        }

        Collection { graph, failures }
    }

    fn in_phase(&self, phase: Phase) -> impl Iterator<Item = &Registration> + '_ {
        self.registrations
            .iter()
            .filter(move |r| r.collector.phase() == phase)
    }

    fn record(
        &self,
        result: Result<()>,
        collector: &str,
        element: Option<&ElementTarget>,
        failures: &mut Vec<CollectorFailure>,
    ) {
        if let Err(e) = result {
            error!(
                account = %self.account.name,
                element = element.map(|pe| pe.name.as_str()).unwrap_or("-"),
                collector = collector,
                "Collector failed: {}",
                e
            );
            failures.push(CollectorFailure {
                account: self.account.name.clone(),
                element: element.map(|pe| pe.name.clone()),
                collector: collector.to_string(),
                error: e.to_string(),
            });
        }
    }
}

fn element_targets(graph: &Graph) -> Vec<ElementTarget> {
    graph
        .nodes_of_kind(ResourceKind::PrismElement)
        .into_iter()
        .filter_map(|index| {
            graph.node(index).and_then(|r| r.as_element()).map(|pe| ElementTarget {
                index,
                id: pe.id.clone(),
                name: pe.name.clone(),
            })
        })
        .collect()
}

/// Server-side filter selecting the VMs of one Prism Element.
pub fn vm_filter(element_id: &str) -> String {
    format!("contains(cluster/extId, '{}')", element_id)
}

pub fn collect_prism_elements(ctx: &mut CollectContext<'_>) -> Result<()> {
    info!("Collecting data from all Prism Elements");
    let clusters = ctx.clusters.list_clusters()?;
    info!("Found PEs: {}", clusters.metadata.total_available_results);

    let root = ctx.graph.root();
    for cluster in clusters.data {
        debug!("Processing PE. uuid: {}, name: {}", cluster.ext_id, cluster.name);
        let pe = PrismElement::new(&cluster.ext_id, &cluster.name);
        if let Err(e) = ctx.graph.add_resource(root, pe) {
            warn!("Skipping PE {}: {}", cluster.ext_id, e);
        }
    }
    Ok(())
}

pub fn collect_virtual_machines(ctx: &mut CollectContext<'_>, pe: &ElementTarget) -> Result<()> {
    info!("Collecting data from all virtual machines in {}", pe.name);
    let response = ctx.vms.list_vms(&vm_filter(&pe.id))?;
    info!(
        "{}: Found virtual machines: {}",
        pe.name, response.metadata.total_available_results
    );
    if response.data.is_empty() {
        return Ok(());
    }

    for vm in response.data {
        let power_state = vm.power_state.as_deref().unwrap_or("UNKNOWN");
        debug!(
            "VM: {}, uuid: {}, power_state: {}, create_time: {:?}",
            vm.name, vm.ext_id, power_state, vm.create_time
        );
        if let Some(cluster) = &vm.cluster {
            if cluster.ext_id != pe.id {
                warn!(
                    "Skipping VM {}: belongs to cluster {}, not {}",
                    vm.ext_id, cluster.ext_id, pe.id
                );
                continue;
            }
        }

        let resource = VirtualMachine::new(
            &vm.ext_id,
            &vm.name,
            power_state,
            vm.create_time,
            vm.update_time,
        );
        if let Err(e) = ctx.graph.add_resource(pe.index, resource) {
            warn!("Skipping VM {}: {}", vm.ext_id, e);
        }
    }
    Ok(())
}
