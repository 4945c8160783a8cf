use crate::config::PrismCentralCredentials;
use crate::error::ResourceError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

pub type Tags = BTreeMap<String, String>;

pub const DEFAULT_PORT: u16 = 9440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    GraphRoot,
    PrismCentralAccount,
    PrismElement,
    VirtualMachine,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::GraphRoot => "graph_root",
            ResourceKind::PrismCentralAccount => "prism_central_account",
            ResourceKind::PrismElement => "prism_element",
            ResourceKind::VirtualMachine => "virtual_machine",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::GraphRoot => "Graph Root",
            ResourceKind::PrismCentralAccount => "Prism Central",
            ResourceKind::PrismElement => "Prism Element",
            ResourceKind::VirtualMachine => "Virtual Machine",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ResourceKind::GraphRoot => "Root of a collection run",
            ResourceKind::PrismCentralAccount => {
                "Prism Central is a multi-cluster management solution that manages multiple Nutanix clusters"
            }
            ResourceKind::PrismElement => "A Nutanix Prism Element is like a region in public clouds",
            ResourceKind::VirtualMachine => "A virtual machine in Nutanix",
        }
    }

    /// Declared edge relationships for this kind.
    pub fn reference_kinds(&self) -> ReferenceKinds {
        match self {
            ResourceKind::GraphRoot => ReferenceKinds {
                successors: EdgeKinds {
                    default: &[ResourceKind::PrismCentralAccount],
                    delete: &[],
                },
                predecessors: EdgeKinds::NONE,
            },
            ResourceKind::PrismCentralAccount => ReferenceKinds {
                successors: EdgeKinds {
                    default: &[ResourceKind::PrismElement],
                    delete: &[],
                },
                predecessors: EdgeKinds::NONE,
            },
            ResourceKind::PrismElement => ReferenceKinds {
                successors: EdgeKinds {
                    default: &[ResourceKind::VirtualMachine],
                    delete: &[],
                },
                predecessors: EdgeKinds {
                    default: &[ResourceKind::PrismCentralAccount],
                    delete: &[],
                },
            },
            ResourceKind::VirtualMachine => ReferenceKinds {
                successors: EdgeKinds::NONE,
                predecessors: EdgeKinds {
                    default: &[ResourceKind::PrismElement],
                    delete: &[],
                },
            },
        }
    }

    /// Whether `child` may be attached below `self` with an edge of `edge_type`.
    ///
    /// Either side may declare the relationship: the parent through its
    /// successors or the child through its predecessors.
    pub fn allows_successor(&self, child: ResourceKind, edge_type: EdgeType) -> bool {
        self.reference_kinds()
            .successors
            .of(edge_type)
            .contains(&child)
            || child
                .reference_kinds()
                .predecessors
                .of(edge_type)
                .contains(self)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Default,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeKinds {
    pub default: &'static [ResourceKind],
    /// Subset of relationships that may be cascade-deleted.
    pub delete: &'static [ResourceKind],
}

impl EdgeKinds {
    pub const NONE: EdgeKinds = EdgeKinds {
        default: &[],
        delete: &[],
    };

    pub fn of(&self, edge_type: EdgeType) -> &'static [ResourceKind] {
        match edge_type {
            EdgeType::Default => self.default,
            EdgeType::Delete => self.delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceKinds {
    pub successors: EdgeKinds,
    pub predecessors: EdgeKinds,
}

/// Result of a delete or tag operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The kind is read-only; nothing was changed remotely.
    Unsupported,
}

/// Capabilities shared by every resource kind.
pub trait BaseResource {
    fn kind(&self) -> ResourceKind;
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn tags(&self) -> &Tags;

    fn reference_kinds(&self) -> ReferenceKinds {
        self.kind().reference_kinds()
    }

    /// Unique identity of the resource within a graph.
    fn key(&self) -> String {
        format!("{}:{}", self.kind(), self.id())
    }

    fn delete(&self) -> Result<Outcome, ResourceError> {
        Ok(Outcome::Unsupported)
    }

    fn update_tag(&mut self, key: &str, _value: &str) -> Result<Outcome, ResourceError> {
        check_tag_key(self.kind(), self.id(), key)?;
        Ok(Outcome::Unsupported)
    }

    fn delete_tag(&mut self, key: &str) -> Result<Outcome, ResourceError> {
        check_tag_key(self.kind(), self.id(), key)?;
        Ok(Outcome::Unsupported)
    }
}

fn check_tag_key(kind: ResourceKind, id: &str, key: &str) -> Result<(), ResourceError> {
    if key.trim().is_empty() {
        return Err(ResourceError::InvalidTag {
            kind: kind.as_str(),
            id: id.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Account identifier derived from a configured display name.
pub fn account_id(name: &str) -> String {
    name.replace(' ', "_")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRoot {
    pub id: String,
    pub tags: Tags,
}

impl GraphRoot {
    pub fn new(id: &str) -> Self {
        GraphRoot {
            id: id.to_string(),
            tags: Tags::new(),
        }
    }
}

impl BaseResource for GraphRoot {
    fn kind(&self) -> ResourceKind {
        ResourceKind::GraphRoot
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.id
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

#[derive(Clone, PartialEq, Serialize)]
pub struct PrismCentralAccount {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub port: u16,
    pub insecure: bool,
    pub tags: Tags,
}

impl PrismCentralAccount {
    pub fn from_credentials(creds: &PrismCentralCredentials) -> Self {
        PrismCentralAccount {
            id: account_id(&creds.name),
            name: creds.name.clone(),
            endpoint: creds.endpoint.clone(),
            username: creds.username.clone(),
            password: creds.password.clone(),
            port: creds.port,
            insecure: creds.insecure,
            tags: Tags::new(),
        }
    }
}

impl fmt::Debug for PrismCentralAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrismCentralAccount")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl BaseResource for PrismCentralAccount {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PrismCentralAccount
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrismElement {
    pub id: String,
    pub name: String,
    pub tags: Tags,
}

impl PrismElement {
    pub fn new(ext_id: &str, name: &str) -> Self {
        let mut tags = Tags::new();
        tags.insert("cluster_uuid".to_string(), ext_id.to_string());
        PrismElement {
            id: ext_id.to_string(),
            name: name.to_string(),
            tags,
        }
    }
}

impl BaseResource for PrismElement {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PrismElement
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }

    // Clusters can not be deleted through this integration.
    fn delete(&self) -> Result<Outcome, ResourceError> {
        Ok(Outcome::Unsupported)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    pub power_state: String, // "ON", "OFF", "PAUSED", ...
    pub ctime: Option<DateTime<Utc>>,
    pub mtime: Option<DateTime<Utc>>,
    pub tags: Tags,
}

impl VirtualMachine {
    pub fn new(
        ext_id: &str,
        name: &str,
        power_state: &str,
        ctime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> Self {
        let mut tags = Tags::new();
        tags.insert("power_state".to_string(), power_state.to_string());
        VirtualMachine {
            id: ext_id.to_string(),
            name: name.to_string(),
            power_state: power_state.to_string(),
            ctime,
            mtime,
            tags,
        }
    }
}

impl BaseResource for VirtualMachine {
    fn kind(&self) -> ResourceKind {
        ResourceKind::VirtualMachine
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn delete(&self) -> Result<Outcome, ResourceError> {
        info!("delete virtual machine {}: {}", self.id, self.name);
        Ok(Outcome::Unsupported)
    }
}

/// Closed set of node types stored in a [`crate::graph::Graph`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    GraphRoot(GraphRoot),
    PrismCentralAccount(PrismCentralAccount),
    PrismElement(PrismElement),
    VirtualMachine(VirtualMachine),
}

impl Resource {
    fn inner(&self) -> &dyn BaseResource {
        match self {
            Resource::GraphRoot(r) => r,
            Resource::PrismCentralAccount(r) => r,
            Resource::PrismElement(r) => r,
            Resource::VirtualMachine(r) => r,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn BaseResource {
        match self {
            Resource::GraphRoot(r) => r,
            Resource::PrismCentralAccount(r) => r,
            Resource::PrismElement(r) => r,
            Resource::VirtualMachine(r) => r,
        }
    }

    pub fn as_element(&self) -> Option<&PrismElement> {
        match self {
            Resource::PrismElement(pe) => Some(pe),
            _ => None,
        }
    }

    pub fn as_virtual_machine(&self) -> Option<&VirtualMachine> {
        match self {
            Resource::VirtualMachine(vm) => Some(vm),
            _ => None,
        }
    }
}

impl BaseResource for Resource {
    fn kind(&self) -> ResourceKind {
        self.inner().kind()
    }
    fn id(&self) -> &str {
        self.inner().id()
    }
    fn name(&self) -> &str {
        self.inner().name()
    }
    fn tags(&self) -> &Tags {
        self.inner().tags()
    }
    fn delete(&self) -> Result<Outcome, ResourceError> {
        self.inner().delete()
    }
    fn update_tag(&mut self, key: &str, value: &str) -> Result<Outcome, ResourceError> {
        self.inner_mut().update_tag(key, value)
    }
    fn delete_tag(&mut self, key: &str) -> Result<Outcome, ResourceError> {
        self.inner_mut().delete_tag(key)
    }
}

impl From<GraphRoot> for Resource {
    fn from(r: GraphRoot) -> Self {
        Resource::GraphRoot(r)
    }
}

impl From<PrismCentralAccount> for Resource {
    fn from(r: PrismCentralAccount) -> Self {
        Resource::PrismCentralAccount(r)
    }
}

impl From<PrismElement> for Resource {
    fn from(r: PrismElement) -> Self {
        Resource::PrismElement(r)
    }
}

impl From<VirtualMachine> for Resource {
    fn from(r: VirtualMachine) -> Self {
        Resource::VirtualMachine(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_replaces_spaces() {
        assert_eq!(account_id("Sherlock Dev"), "Sherlock_Dev");
        assert_eq!(account_id("a b  c"), "a_b__c");
        assert_eq!(account_id("prod"), "prod");
    }

    #[test]
    fn successor_declarations() {
        let account = ResourceKind::PrismCentralAccount;
        let element = ResourceKind::PrismElement;
        let vm = ResourceKind::VirtualMachine;

        assert!(account.allows_successor(element, EdgeType::Default));
        assert!(element.allows_successor(vm, EdgeType::Default));
        assert!(!account.allows_successor(vm, EdgeType::Default));
        assert!(!vm.allows_successor(element, EdgeType::Default));
        assert!(ResourceKind::GraphRoot.allows_successor(account, EdgeType::Default));

        // Nothing in this integration may be cascade-deleted.
        assert!(!account.allows_successor(element, EdgeType::Delete));
        assert!(!element.allows_successor(vm, EdgeType::Delete));
    }

    #[test]
    fn delete_is_unsupported_not_an_error() {
        let pe = PrismElement::new("c1", "ClusterA");
        let vm = VirtualMachine::new("vm1", "web1", "ON", None, None);
        assert_eq!(pe.delete(), Ok(Outcome::Unsupported));
        assert_eq!(vm.delete(), Ok(Outcome::Unsupported));
        assert_eq!(Resource::from(vm).delete(), Ok(Outcome::Unsupported));
    }

    #[test]
    fn tag_operations_report_outcome() {
        let mut vm = Resource::from(VirtualMachine::new("vm1", "web1", "ON", None, None));
        assert_eq!(vm.update_tag("owner", "ops"), Ok(Outcome::Unsupported));
        assert_eq!(vm.delete_tag("owner"), Ok(Outcome::Unsupported));
        assert!(matches!(
            vm.update_tag(" ", "x"),
            Err(ResourceError::InvalidTag { .. })
        ));
        assert!(vm.delete_tag("").is_err());
    }

    #[test]
    fn seeded_tags() {
        let pe = PrismElement::new("c1", "ClusterA");
        assert_eq!(pe.tags.get("cluster_uuid").map(String::as_str), Some("c1"));

        let vm = VirtualMachine::new("vm1", "web1", "OFF", None, None);
        assert_eq!(vm.tags.get("power_state").map(String::as_str), Some("OFF"));
        assert_eq!(Resource::from(vm).key(), "virtual_machine:vm1");
    }

    #[test]
    fn account_password_is_not_exported() {
        let account = PrismCentralAccount {
            id: "pc".to_string(),
            name: "pc".to_string(),
            endpoint: "pc.example.com".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            port: DEFAULT_PORT,
            insecure: false,
            tags: Tags::new(),
        };
        let json = serde_json::to_string(&Resource::from(account.clone())).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"kind\":\"prism_central_account\""));
        assert!(!format!("{:?}", account).contains("secret"));
    }
}
