//! Samplers: read-only snapshots of a running system.
//!
//! Agent and environment samplers produce a [`Table`]; the graph sampler
//! produces a relabelled petgraph graph. None of them mutate the system.

use crate::graph::Node;
use crate::system::ManagementSystem;
use animus_core::agent::Agent;
use animus_core::array::Array;
use animus_core::operator::{ArrayRef, ArraySource};
use animus_core::policy::{ConditionSource, KeySelection};
use animus_core::types::{Attributes, Value};
use petgraph::graph::UnGraph;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Rows of values under named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(columns: I) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Each row keyed by column name, in column order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|row| Record {
            columns: &self.columns,
            row,
        })
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }
}

/// One row of a [`Table`], serialized as a JSON object.
pub struct Record<'a> {
    columns: &'a [String],
    row: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

pub type AgentFilter = dyn Fn(&Agent) -> bool + Send + Sync;

/// Samples imprint values of every (or every matching) agent.
///
/// Rows are `(generation, agent, agent_id, path, value)` where the path reads
/// like `resource:energy` or `belief:joy:joy_index`.
#[derive(Clone, Default)]
pub struct AgentSampler {
    slots: Vec<(ConditionSource, KeySelection)>,
    filter: Option<Arc<AgentFilter>>,
}

impl AgentSampler {
    pub const COLUMNS: [&'static str; 5] = ["generation", "agent", "agent_id", "path", "value"];

    /// A sampler over every imprint of every agent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict sampling to the given slots. Without any slot, all imprints
    /// are sampled.
    pub fn with_slot(mut self, source: ConditionSource, keys: impl Into<KeySelection>) -> Self {
        self.slots.push((source, keys.into()));
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Agent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn sample(&self, system: &ManagementSystem, generation: u64) -> Table {
        let mut table = Table::new(Self::COLUMNS);
        for agent in system.agents() {
            if self.filter.as_ref().is_some_and(|keep| !keep(agent)) {
                continue;
            }
            let id = agent.id().map(Value::from).unwrap_or_default();
            for (r, array, keys) in self.selected(agent) {
                for key in keys {
                    // Agents need not share a schema; absent keys are skipped.
                    let Ok(value) = array.peek(&key) else {
                        continue;
                    };
                    table.push(vec![
                        Value::from(generation),
                        Value::from(agent.name()),
                        id.clone(),
                        Value::from(format!("{}:{}", r, key)),
                        value.clone(),
                    ]);
                }
            }
        }
        table
    }

    fn selected<'a>(&self, agent: &'a Agent) -> Vec<(ArrayRef, &'a Array, Vec<String>)> {
        let bank = agent.bank();
        if self.slots.is_empty() {
            return bank
                .imprints()
                .into_iter()
                .map(|(r, array)| (r, array, array.keys().to_vec()))
                .collect();
        }
        self.slots
            .iter()
            .filter_map(|(source, keys)| {
                let r = source.array_ref();
                let array = bank.array(&r)?;
                let keys = match keys {
                    KeySelection::All => array.keys().to_vec(),
                    KeySelection::Keys(keys) => keys.clone(),
                };
                Some((r, array, keys))
            })
            .collect()
    }
}

impl fmt::Debug for AgentSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSampler")
            .field("slots", &self.slots)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

pub type NodeReader = dyn Fn(&Node) -> Attributes + Send + Sync;

/// Samples per-node attributes through a reader. The default reader returns
/// the node's auxiliary content.
///
/// Rows are `(generation, node, attribute, value)`.
#[derive(Clone)]
pub struct EnvironmentSampler {
    reader: Arc<NodeReader>,
}

impl EnvironmentSampler {
    pub const COLUMNS: [&'static str; 4] = ["generation", "node", "attribute", "value"];

    pub fn new() -> Self {
        Self::with_reader(|node| node.aux.clone())
    }

    pub fn with_reader<F>(reader: F) -> Self
    where
        F: Fn(&Node) -> Attributes + Send + Sync + 'static,
    {
        Self {
            reader: Arc::new(reader),
        }
    }

    pub fn sample(&self, system: &ManagementSystem, generation: u64) -> Table {
        let mut table = Table::new(Self::COLUMNS);
        for node in system.graph().nodes() {
            for (attribute, value) in (self.reader)(node) {
                table.push(vec![
                    Value::from(generation),
                    Value::from(node.id.to_string()),
                    Value::from(attribute),
                    value,
                ]);
            }
        }
        table
    }
}

impl Default for EnvironmentSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvironmentSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvironmentSampler(..)")
    }
}

/// Copies the graph with agent ids as labels.
///
/// Unoccupied nodes are labelled `unoccupied_<n>` with a running counter, so
/// every label is distinct.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphSampler;

impl GraphSampler {
    pub fn new() -> Self {
        Self
    }

    pub fn sample(&self, system: &ManagementSystem) -> UnGraph<String, ()> {
        let source = system.graph();
        let mut graph = UnGraph::with_capacity(source.node_count(), source.edge_count());
        let mut index = HashMap::new();
        let mut vacant = 0;
        for node in source.nodes() {
            let label = match node.agent.as_ref().and_then(Agent::id) {
                Some(id) => id.to_string(),
                None => {
                    vacant += 1;
                    format!("unoccupied_{}", vacant - 1)
                }
            };
            index.insert(node.id, graph.add_node(label));
        }
        for (a, b) in source.edges() {
            if let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) {
                graph.add_edge(ia, ib, ());
            }
        }
        graph
    }
}

/// A sampler of any of the three kinds.
#[derive(Debug, Clone)]
pub enum Sampler {
    Agent(AgentSampler),
    Environment(EnvironmentSampler),
    Graph(GraphSampler),
}

/// What a sampler produced.
#[derive(Debug, Clone)]
pub enum Sample {
    Table(Table),
    Graph(UnGraph<String, ()>),
}

impl Sampler {
    pub fn sample(&self, system: &ManagementSystem, generation: u64) -> Sample {
        match self {
            Sampler::Agent(s) => Sample::Table(s.sample(system, generation)),
            Sampler::Environment(s) => Sample::Table(s.sample(system, generation)),
            Sampler::Graph(s) => Sample::Graph(s.sample(system)),
        }
    }

    pub fn is_tabular(&self) -> bool {
        !matches!(self, Sampler::Graph(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sampler::Agent(_) => "agent",
            Sampler::Environment(_) => "environment",
            Sampler::Graph(_) => "graph",
        }
    }
}

impl From<AgentSampler> for Sampler {
    fn from(s: AgentSampler) -> Self {
        Sampler::Agent(s)
    }
}

impl From<EnvironmentSampler> for Sampler {
    fn from(s: EnvironmentSampler) -> Self {
        Sampler::Environment(s)
    }
}

impl From<GraphSampler> for Sampler {
    fn from(s: GraphSampler) -> Self {
        Sampler::Graph(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AgentGraph;
    use crate::system::SystemBuilder;
    use animus_core::types::rng_from_seed;

    fn grazer(name: &str, energy: f64) -> Agent {
        let mut agent = Agent::new(name);
        agent
            .set_resource(Array::resource("stock", ["energy"]).unwrap().with_values([energy]).unwrap())
            .unwrap();
        agent
            .set_belief(Array::belief("joy", ["joy_index"]).unwrap().with_values([1]).unwrap())
            .unwrap();
        agent
    }

    fn system() -> ManagementSystem {
        let mut rng = rng_from_seed(Some(3));
        SystemBuilder::new("pasture")
            .seed(3)
            .with_graph(AgentGraph::path(3, &mut rng))
            .with_agents([grazer("a", 2.0), grazer("b", 8.0)])
            .build()
            .unwrap()
    }

    #[test]
    fn agent_rows_carry_paths() {
        let table = AgentSampler::new().sample(&system(), 4);
        assert_eq!(table.columns, AgentSampler::COLUMNS);
        assert_eq!(table.len(), 4);
        let paths: Vec<&Value> = table.column("path").unwrap();
        assert_eq!(paths[0], &Value::from("resource:energy"));
        assert_eq!(paths[1], &Value::from("belief:joy:joy_index"));
        assert!(table.column("generation").unwrap().iter().all(|g| **g == Value::Int(4)));
    }

    #[test]
    fn slots_and_filters_narrow_the_sample() {
        let sampler = AgentSampler::new()
            .with_slot(ConditionSource::Resource, "energy")
            .with_filter(|agent| {
                agent.resource().and_then(|r| r.peek("energy").ok()?.as_f64()) > Some(5.0)
            });
        let table = sampler.sample(&system(), 0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][1], Value::from("b"));
        assert_eq!(table.rows[0][4], Value::Float(8.0));
    }

    #[test]
    fn environment_rows_follow_the_reader() {
        let mut system = system();
        let first = system.graph().node_ids()[0];
        system.node_aux_mut(first).unwrap().insert("grass".into(), Value::from(5));
        let table = EnvironmentSampler::new().sample(&system, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][2], Value::from("grass"));

        let counted = EnvironmentSampler::with_reader(|node| {
            Attributes::from([("occupied".to_string(), Value::from(node.is_occupied()))])
        })
        .sample(&system, 1);
        assert_eq!(counted.len(), 3);
    }

    #[test]
    fn graph_labels_are_distinct() {
        let system = system();
        let graph = GraphSampler::new().sample(&system);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let labels: Vec<&String> = graph.node_weights().collect();
        assert!(labels.contains(&&"unoccupied_0".to_string()));
        for id in system.agent_ids() {
            assert!(labels.contains(&&id.to_string()));
        }
    }

    #[test]
    fn records_keep_column_order() {
        let mut table = Table::new(["z", "a"]);
        table.push(vec![Value::from(1), Value::from("x")]);
        let json = serde_json::to_string(&table.records().collect::<Vec<_>>()).unwrap();
        assert_eq!(json, r#"[{"z":1,"a":"x"}]"#);
    }
}
