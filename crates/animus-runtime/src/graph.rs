//! The agent graph, backed by petgraph.
//!
//! Nodes carry an optional agent and auxiliary attributes. Node ids are
//! stable uuids mapped onto petgraph indices; a `StableGraph` keeps those
//! indices valid when nodes are removed. Insertion order is tracked
//! separately so that round-robin iteration is deterministic.

use animus_core::agent::Agent;
use animus_core::error::SystemError;
use animus_core::types::{AgentId, Attributes};
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(uuid::Builder::from_random_bytes(rng.gen()).into_uuid())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content of one graph node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub agent: Option<Agent>,
    /// Local environment of the node.
    pub aux: Attributes,
}

impl Node {
    pub fn is_occupied(&self) -> bool {
        self.agent.is_some()
    }
}

/// Undirected graph of nodes that may hold agents.
#[derive(Debug, Clone, Default)]
pub struct AgentGraph {
    graph: StableUnGraph<Node, ()>,
    node_index: HashMap<NodeId, NodeIndex>,
    agent_index: HashMap<AgentId, NodeId>,
    order: Vec<NodeId>,
}

impl AgentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete graph on `n` fresh nodes with ids drawn from `rng`.
    pub fn complete<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut graph = Self::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| graph.add_node(NodeId::from_rng(rng), format!("node_{}", i)))
            .collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                graph.add_edge(*a, *b);
            }
        }
        graph
    }

    /// A path graph on `n` fresh nodes: node 0 – node 1 – … – node n-1.
    pub fn path<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut graph = Self::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| graph.add_node(NodeId::from_rng(rng), format!("node_{}", i)))
            .collect();
        for pair in ids.windows(2) {
            graph.add_edge(pair[0], pair[1]);
        }
        graph
    }

    pub fn add_node(&mut self, id: NodeId, label: impl Into<String>) -> NodeId {
        let idx = self.graph.add_node(Node {
            id,
            label: label.into(),
            agent: None,
            aux: Attributes::new(),
        });
        self.node_index.insert(id, idx);
        self.order.push(id);
        id
    }

    /// Remove a node with its edges, returning its content.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.node_index.remove(&id)?;
        self.order.retain(|n| *n != id);
        let node = self.graph.remove_node(idx)?;
        if let Some(agent_id) = node.agent.as_ref().and_then(Agent::id) {
            self.agent_index.remove(&agent_id);
        }
        Some(node)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.node_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.node(*id))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add an undirected edge. Returns false when it already existed, when it
    /// would be a self-loop, or when either end is unknown.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let (Some(&ia), Some(&ib)) = (self.node_index.get(&a), self.node_index.get(&b)) else {
            return false;
        };
        if ia == ib || self.graph.find_edge(ia, ib).is_some() {
            return false;
        }
        self.graph.add_edge(ia, ib, ());
        true
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let (Some(&ia), Some(&ib)) = (self.node_index.get(&a), self.node_index.get(&b)) else {
            return false;
        };
        match self.graph.find_edge(ia, ib) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        match (self.node_index.get(&a), self.node_index.get(&b)) {
            (Some(&ia), Some(&ib)) => self.graph.find_edge(ia, ib).is_some(),
            _ => false,
        }
    }

    pub fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.node_index.get(&id) else {
            return Vec::new();
        };
        self.graph
            .edges(idx)
            .map(|edge| {
                let other = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                self.graph[other].id
            })
            .collect()
    }

    /// Every edge as a pair of node ids.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].id, self.graph[b].id))
            .collect()
    }

    /// Put an agent into an empty node. The agent must already have an id.
    pub fn place(&mut self, node: NodeId, agent: Agent) -> Result<(), SystemError> {
        let agent_id = agent
            .id()
            .ok_or_else(|| SystemError::Unattached(agent.name().to_string()))?;
        let slot = self
            .node_mut(node)
            .ok_or_else(|| SystemError::UnknownNode(node.to_string()))?;
        if slot.agent.is_some() {
            return Err(SystemError::NodeOccupied(node.to_string()));
        }
        slot.agent = Some(agent);
        self.agent_index.insert(agent_id, node);
        Ok(())
    }

    /// Take the agent out of a node, leaving the node in place.
    pub fn evict(&mut self, node: NodeId) -> Option<Agent> {
        let agent = self.node_mut(node)?.agent.take()?;
        if let Some(id) = agent.id() {
            self.agent_index.remove(&id);
        }
        Some(agent)
    }

    pub fn node_of(&self, agent: AgentId) -> Option<NodeId> {
        self.agent_index.get(&agent).copied()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.node(self.node_of(id)?)?.agent.as_ref()
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let node = self.node_of(id)?;
        self.node_mut(node)?.agent.as_mut()
    }

    /// Agent ids in node insertion order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.nodes()
            .filter_map(|n| n.agent.as_ref().and_then(Agent::id))
            .collect()
    }

    /// Exchange the agents held by two nodes. Auxiliary content stays put.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<(), SystemError> {
        for node in [a, b] {
            if !self.contains_node(node) {
                return Err(SystemError::UnknownNode(node.to_string()));
            }
        }
        let first = self.evict(a);
        let second = self.evict(b);
        if let Some(agent) = second {
            self.place(a, agent)?;
        }
        if let Some(agent) = first {
            self.place(b, agent)?;
        }
        Ok(())
    }

    /// The underlying petgraph graph.
    pub fn inner(&self) -> &StableUnGraph<Node, ()> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animus_core::types::rng_from_seed;

    fn attached(name: &str) -> Agent {
        let mut agent = Agent::new(name).with_seed(1);
        agent.set_id(AgentId::new());
        agent
    }

    #[test]
    fn complete_graph_has_every_pair() {
        let mut rng = rng_from_seed(Some(4));
        let graph = AgentGraph::complete(4, &mut rng);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 6);
        let first = graph.node_ids()[0];
        assert_eq!(graph.neighbours(first).len(), 3);
    }

    #[test]
    fn edges_are_undirected_and_unique() {
        let mut rng = rng_from_seed(Some(4));
        let mut graph = AgentGraph::path(2, &mut rng);
        let (a, b) = (graph.node_ids()[0], graph.node_ids()[1]);
        assert!(graph.has_edge(b, a));
        assert!(!graph.add_edge(b, a));
        assert!(!graph.add_edge(a, a));
        assert!(graph.remove_edge(b, a));
        assert!(!graph.has_edge(a, b));
    }

    #[test]
    fn occupied_nodes_refuse_a_second_agent() {
        let mut rng = rng_from_seed(Some(4));
        let mut graph = AgentGraph::path(1, &mut rng);
        let node = graph.node_ids()[0];
        graph.place(node, attached("a")).unwrap();
        let err = graph.place(node, attached("b")).unwrap_err();
        assert_eq!(err, SystemError::NodeOccupied(node.to_string()));
    }

    #[test]
    fn swap_moves_agents_but_not_aux() {
        let mut rng = rng_from_seed(Some(4));
        let mut graph = AgentGraph::path(2, &mut rng);
        let (a, b) = (graph.node_ids()[0], graph.node_ids()[1]);
        let agent = attached("walker");
        let id = agent.id().unwrap();
        graph.place(a, agent).unwrap();
        graph.node_mut(a).unwrap().aux.insert("food".into(), 3.into());

        graph.swap(a, b).unwrap();
        assert_eq!(graph.node_of(id), Some(b));
        assert!(graph.node(a).unwrap().agent.is_none());
        assert!(graph.node(a).unwrap().aux.contains_key("food"));
    }

    #[test]
    fn removing_a_node_drops_its_edges_and_agent() {
        let mut rng = rng_from_seed(Some(4));
        let mut graph = AgentGraph::complete(3, &mut rng);
        let node = graph.node_ids()[1];
        let agent = attached("gone");
        let id = agent.id().unwrap();
        graph.place(node, agent).unwrap();

        let removed = graph.remove_node(node).unwrap();
        assert_eq!(removed.agent.unwrap().name(), "gone");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_of(id), None);
        assert_eq!(graph.node_ids().len(), 2);
    }
}
