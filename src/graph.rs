use crate::error::GraphError;
use crate::resources::{BaseResource, EdgeType, Resource, ResourceKind};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub struct Graph {
    graph: DiGraph<Resource, EdgeType>,
    index: HashMap<String, NodeIndex>,
    root: NodeIndex,
}

#[derive(Debug, Serialize)]
pub struct GraphExport<'a> {
    pub root: String,
    pub nodes: Vec<&'a Resource>,
    pub edges: Vec<ExportEdge>,
}

/// Result of [`Graph::merge`].
#[derive(Debug)]
pub struct Merged {
    pub root: NodeIndex,
    /// Nodes left out because they already exist; their subtrees went with them.
    pub skipped: Vec<GraphError>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ExportEdge {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeType,
}

impl Graph {
    pub fn new(root: impl Into<Resource>) -> Self {
        let root = root.into();
        let key = root.key();
        let mut graph = DiGraph::new();
        let idx = graph.add_node(root);
        let mut index = HashMap::new();
        index.insert(key, idx);
        Graph {
            graph,
            index,
            root: idx,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_resource(&self) -> &Resource {
        &self.graph[self.root]
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Resource> {
        self.graph.node_weight(idx)
    }

    pub fn find(&self, kind: ResourceKind, id: &str) -> Option<NodeIndex> {
        self.index.get(&format!("{}:{}", kind, id)).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Attach `resource` below `parent` with a default edge.
    ///
    /// Adding a resource that is already attached below the same parent is a
    /// no-op returning the existing node.
    pub fn add_resource(
        &mut self,
        parent: NodeIndex,
        resource: impl Into<Resource>,
    ) -> Result<NodeIndex, GraphError> {
        let resource = resource.into();
        let parent_kind = self.kind_of(parent)?;
        if !parent_kind.allows_successor(resource.kind(), EdgeType::Default) {
            return Err(GraphError::InvalidEdge {
                parent: parent_kind.to_string(),
                child: resource.kind().to_string(),
            });
        }

        let key = resource.key();
        if let Some(&existing) = self.index.get(&key) {
            if self.has_edge(parent, existing, EdgeType::Default) {
                return Ok(existing);
            }
            return Err(GraphError::AlreadyAttached {
                key,
                existing_parent: self.parent_key(existing),
            });
        }

        let idx = self.graph.add_node(resource);
        self.index.insert(key, idx);
        self.graph.add_edge(parent, idx, EdgeType::Default);
        Ok(idx)
    }

    /// Add an extra edge between two existing nodes.
    pub fn add_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        edge_type: EdgeType,
    ) -> Result<(), GraphError> {
        let from_kind = self.kind_of(from)?;
        let to_kind = self.kind_of(to)?;
        if !from_kind.allows_successor(to_kind, edge_type) {
            return Err(GraphError::InvalidEdge {
                parent: from_kind.to_string(),
                child: to_kind.to_string(),
            });
        }
        if !self.has_edge(from, to, edge_type) {
            self.graph.add_edge(from, to, edge_type);
        }
        Ok(())
    }

    /// Merge `other` into this graph, attaching its root below `parent`.
    ///
    /// A node of `other` that already exists here is skipped together with
    /// everything below it and reported in [`Merged::skipped`]. Fails without
    /// modifying `self` only if the root of `other` itself collides.
    pub fn merge(&mut self, parent: NodeIndex, other: Graph) -> Result<Merged, GraphError> {
        let parent_kind = self.kind_of(parent)?;
        let other_root_kind = other.root_resource().kind();
        if !parent_kind.allows_successor(other_root_kind, EdgeType::Default) {
            return Err(GraphError::InvalidEdge {
                parent: parent_kind.to_string(),
                child: other_root_kind.to_string(),
            });
        }
        let root_key = other.root_resource().key();
        if let Some(&existing) = self.index.get(&root_key) {
            return Err(GraphError::AlreadyAttached {
                key: root_key,
                existing_parent: self.parent_key(existing),
            });
        }

        let Graph {
            graph: other_graph,
            root: other_root,
            ..
        } = other;

        // Parents always precede their children in BFS order.
        let mut order = Vec::with_capacity(other_graph.node_count());
        let mut bfs = Bfs::new(&other_graph, other_root);
        while let Some(idx) = bfs.next(&other_graph) {
            order.push(idx);
        }

        let (nodes, edges) = other_graph.into_nodes_edges();
        let mut weights: Vec<Option<Resource>> = nodes.into_iter().map(|n| Some(n.weight)).collect();
        let mut parents: Vec<Vec<NodeIndex>> = vec![Vec::new(); weights.len()];
        for edge in &edges {
            parents[edge.target().index()].push(edge.source());
        }

        let mut mapping: Vec<Option<NodeIndex>> = vec![None; weights.len()];
        let mut skipped = Vec::new();
        for idx in order {
            let i = idx.index();
            let reachable =
                idx == other_root || parents[i].iter().any(|p| mapping[p.index()].is_some());
            let Some(resource) = weights[i].take() else {
                continue;
            };
            if !reachable {
                continue;
            }
            let key = resource.key();
            if let Some(&existing) = self.index.get(&key) {
                skipped.push(GraphError::AlreadyAttached {
                    existing_parent: self.parent_key(existing),
                    key,
                });
                continue;
            }
            let new_idx = self.graph.add_node(resource);
            self.index.insert(key, new_idx);
            mapping[i] = Some(new_idx);
        }

        for edge in edges {
            if let (Some(from), Some(to)) = (
                mapping[edge.source().index()],
                mapping[edge.target().index()],
            ) {
                self.graph.add_edge(from, to, edge.weight);
            }
        }

        let root = mapping[other_root.index()].ok_or(GraphError::Orphan { key: root_key })?;
        self.graph.add_edge(parent, root, EdgeType::Default);
        Ok(Merged { root, skipped })
    }

    pub fn nodes_of_kind(&self, kind: ResourceKind) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].kind() == kind)
            .collect()
    }

    /// Direct successors over default edges, in insertion order.
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Outgoing)
    }

    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Incoming)
    }

    /// Check that every non-root node hangs below a declared predecessor kind.
    pub fn validate(&self) -> Result<(), GraphError> {
        for idx in self.graph.node_indices() {
            if idx == self.root {
                continue;
            }
            let kind = self.graph[idx].kind();
            let attached = self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .any(|e| {
                    *e.weight() == EdgeType::Default
                        && self.graph[e.source()].kind().allows_successor(kind, EdgeType::Default)
                });
            if !attached {
                return Err(GraphError::Orphan {
                    key: self.graph[idx].key(),
                });
            }
        }
        Ok(())
    }

    /// Node keys and edge set, independent of insertion order.
    pub fn structure(&self) -> (BTreeSet<String>, BTreeSet<ExportEdge>) {
        let nodes = self.graph.node_weights().map(|r| r.key()).collect();
        let edges = self.export_edges().into_iter().collect();
        (nodes, edges)
    }

    pub fn export(&self) -> GraphExport<'_> {
        GraphExport {
            root: self.root_resource().key(),
            nodes: self.graph.node_weights().collect(),
            edges: self.export_edges(),
        }
    }

    fn export_edges(&self) -> Vec<ExportEdge> {
        self.graph
            .edge_references()
            .map(|e| ExportEdge {
                from: self.graph[e.source()].key(),
                to: self.graph[e.target()].key(),
                edge_type: *e.weight(),
            })
            .collect()
    }

    fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == EdgeType::Default)
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn kind_of(&self, idx: NodeIndex) -> Result<ResourceKind, GraphError> {
        self.graph
            .node_weight(idx)
            .map(|r| r.kind())
            .ok_or_else(|| GraphError::UnknownParent {
                parent: format!("#{}", idx.index()),
            })
    }

    fn has_edge(&self, from: NodeIndex, to: NodeIndex, edge_type: EdgeType) -> bool {
        self.graph
            .edges_connecting(from, to)
            .any(|e| *e.weight() == edge_type)
    }

    fn parent_key(&self, idx: NodeIndex) -> String {
        self.predecessors(idx)
            .first()
            .map(|&p| self.graph[p].key())
            .unwrap_or_else(|| "<root>".to_string())
    }
}
