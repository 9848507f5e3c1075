//! The management system: the graph owner that holds agents, routes
//! between them, enforces laws and runs system-owned interactions.
//!
//! # Architecture
//!
//! Agents live inside graph nodes. The system hands out ids from its own
//! seeded generator and derives each agent's generator from it, so a seeded
//! system replays identically. Laws are compulsions and mutations an agent
//! carries but that only the system may trigger; the law book records which
//! agents each law applies to.
//!
//! # Example
//!
//! ```rust
//! use animus_core::agent::Agent;
//! use animus_runtime::system::SystemBuilder;
//!
//! let system = SystemBuilder::new("meadow")
//!     .seed(7)
//!     .with_agents([Agent::new("ant"), Agent::new("bee")])
//!     .build()
//!     .unwrap();
//!
//! let ids = system.agent_ids();
//! assert_eq!(system.neighbours_to(ids[0]).unwrap(), vec![ids[1]]);
//! ```

use crate::config::SystemConfig;
use crate::graph::{AgentGraph, Node, NodeId};
use crate::interaction::{self, is_interaction_kind, Interaction};
use animus_core::agent::Agent;
use animus_core::bank::ArrayBank;
use animus_core::error::{AgentError, InstructorError, PolicyError, Result, SocketError, SystemError};
use animus_core::executive::{Executive, Outcome, Verb};
use animus_core::instructor::{Category, Instructor};
use animus_core::types::{rng_from_seed, AgentId, Attributes, SimRng};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Whether `edge_edit` adds or deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEdit {
    Add,
    Delete,
}

/// Builder for [`ManagementSystem`].
pub struct SystemBuilder {
    config: SystemConfig,
    agents: Vec<Agent>,
    graph: Option<AgentGraph>,
    environment: Attributes,
    interactions: Vec<Interaction>,
}

impl SystemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: SystemConfig {
                name: name.into(),
                ..SystemConfig::default()
            },
            agents: Vec::new(),
            graph: None,
            environment: Attributes::new(),
            interactions: Vec::new(),
        }
    }

    /// Replace every configured parameter, name included.
    pub fn with_config(mut self, config: SystemConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn strict_engine(mut self, strict: bool) -> Self {
        self.config.strict_engine = strict;
        self
    }

    pub fn empty_to_identity(mut self, on: bool) -> Self {
        self.config.empty_to_identity = on;
        self
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Use this graph instead of a complete one. Agents fill its free nodes
    /// in insertion order.
    pub fn with_graph(mut self, graph: AgentGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_environment(mut self, environment: Attributes) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interactions.push(interaction);
        self
    }

    pub fn build(self) -> Result<ManagementSystem> {
        let mut rng = rng_from_seed(self.config.seed);
        let graph = match self.graph {
            Some(graph) => graph,
            None => AgentGraph::complete(self.agents.len(), &mut rng),
        };
        let free: Vec<NodeId> = graph
            .nodes()
            .filter(|n| !n.is_occupied())
            .map(|n| n.id)
            .collect();
        if free.len() < self.agents.len() {
            return Err(SystemError::GraphTooSmall {
                free: free.len(),
                agents: self.agents.len(),
            }
            .into());
        }

        let mut system = ManagementSystem {
            name: self.config.name,
            graph,
            environment: self.environment,
            law_book: BTreeMap::new(),
            interactions: BTreeMap::new(),
            strict_engine: self.config.strict_engine,
            empty_to_identity: self.config.empty_to_identity,
            rng,
        };
        for (agent, node) in self.agents.into_iter().zip(free) {
            system.situate(agent, node)?;
        }
        for interaction in self.interactions {
            system.add_interaction(interaction)?;
        }
        info!(
            system = %system.name,
            agents = system.agent_count(),
            nodes = system.graph.node_count(),
            edges = system.graph.edge_count(),
            "management system constructed"
        );
        Ok(system)
    }
}

/// Holds the agents, their graph and the rules that bind them.
#[derive(Debug, Clone)]
pub struct ManagementSystem {
    name: String,
    graph: AgentGraph,
    environment: Attributes,
    law_book: BTreeMap<String, BTreeSet<AgentId>>,
    interactions: BTreeMap<String, Interaction>,
    strict_engine: bool,
    empty_to_identity: bool,
    rng: SimRng,
}

impl ManagementSystem {
    /// A system over a complete graph, seeded from entropy.
    pub fn new(name: impl Into<String>, agents: impl IntoIterator<Item = Agent>) -> Result<Self> {
        SystemBuilder::new(name).with_agents(agents).build()
    }

    pub fn from_config(config: SystemConfig, agents: impl IntoIterator<Item = Agent>) -> Result<Self> {
        SystemBuilder::new(config.name.clone())
            .with_config(config)
            .with_agents(agents)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &AgentGraph {
        &self.graph
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub fn environment(&self) -> &Attributes {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Attributes {
        &mut self.environment
    }

    /// Agent ids in node insertion order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.graph.agent_ids()
    }

    pub fn agent_count(&self) -> usize {
        self.graph.agent_ids().len()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.graph.nodes().filter_map(|n| n.agent.as_ref())
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.graph.agent(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.graph.agent_mut(id)
    }

    pub fn node_of(&self, id: AgentId) -> Option<NodeId> {
        self.graph.node_of(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    /// Auxiliary content of the node an agent sits on.
    pub fn aux_of(&self, id: AgentId) -> Option<&Attributes> {
        self.graph.node(self.graph.node_of(id)?).map(|n| &n.aux)
    }

    pub fn aux_of_mut(&mut self, id: AgentId) -> Option<&mut Attributes> {
        let node = self.graph.node_of(id)?;
        self.graph.node_mut(node).map(|n| &mut n.aux)
    }

    pub fn node_aux_mut(&mut self, node: NodeId) -> Option<&mut Attributes> {
        self.graph.node_mut(node).map(|n| &mut n.aux)
    }

    fn located(&self, id: AgentId) -> Result<NodeId> {
        Ok(self.graph.node_of(id).ok_or(SystemError::UnknownAgent(id))?)
    }

    fn live_agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        let agent = self.graph.agent_mut(id).ok_or(SystemError::UnknownAgent(id))?;
        if agent.is_inert() {
            return Err(AgentError::Inert(agent.name().to_string()).into());
        }
        Ok(agent)
    }

    /// Agents on nodes adjacent to `id`. Order is unspecified.
    pub fn neighbours_to(&self, id: AgentId) -> Result<Vec<AgentId>> {
        let node = self.located(id)?;
        Ok(self
            .graph
            .neighbours(node)
            .into_iter()
            .filter_map(|n| self.graph.node(n)?.agent.as_ref()?.id())
            .collect())
    }

    /// Nodes adjacent to `id`, occupied or not.
    pub fn neighbour_nodes(&self, id: AgentId) -> Result<Vec<NodeId>> {
        Ok(self.graph.neighbours(self.located(id)?))
    }

    /// Attach a new agent to an empty node and return the id it was given.
    pub fn situate(&mut self, mut agent: Agent, node: NodeId) -> Result<AgentId> {
        let slot = self
            .graph
            .node(node)
            .ok_or_else(|| SystemError::UnknownNode(node.to_string()))?;
        if slot.is_occupied() {
            return Err(SystemError::NodeOccupied(node.to_string()).into());
        }

        let id = AgentId::from_rng(&mut self.rng);
        agent.set_id(id);
        agent.set_rng(SimRng::seed_from_u64(self.rng.gen()));
        if self.strict_engine {
            agent.set_strict_engine(true);
        }
        if !self.empty_to_identity {
            agent.set_empty_to_identity(false);
        }
        let laws: Vec<String> = [Category::Compulsion, Category::Mutation]
            .into_iter()
            .flat_map(|c| agent.organ_names(c))
            .map(str::to_string)
            .collect();
        debug!(system = %self.name, agent = %agent.name(), %id, %node, "situating agent");
        self.graph.place(node, agent)?;
        for law in laws {
            self.law_book.entry(law).or_default().insert(id);
        }
        Ok(id)
    }

    /// Flag an agent inert; it is removed on the next cleanse.
    pub fn terminate_agent(&mut self, id: AgentId) -> Result<()> {
        self.graph
            .agent_mut(id)
            .ok_or(SystemError::UnknownAgent(id))?
            .mark_inert();
        Ok(())
    }

    /// Remove every inert agent together with its node and edges.
    pub fn cleanse_inert(&mut self) -> Vec<AgentId> {
        let doomed: Vec<(NodeId, AgentId)> = self
            .graph
            .nodes()
            .filter_map(|n| {
                let agent = n.agent.as_ref()?;
                if agent.is_inert() {
                    Some((n.id, agent.id()?))
                } else {
                    None
                }
            })
            .collect();
        for (node, id) in &doomed {
            self.graph.remove_node(*node);
            self.forget(*id);
        }
        if !doomed.is_empty() {
            info!(system = %self.name, removed = doomed.len(), "cleansed inert agents");
        }
        doomed.into_iter().map(|(_, id)| id).collect()
    }

    fn forget(&mut self, id: AgentId) {
        for subjects in self.law_book.values_mut() {
            subjects.remove(&id);
        }
    }

    pub fn laws(&self) -> &BTreeMap<String, BTreeSet<AgentId>> {
        &self.law_book
    }

    /// Set which agents a law applies to.
    pub fn set_law(&mut self, name: impl Into<String>, subjects: impl IntoIterator<Item = AgentId>) {
        self.law_book.insert(name.into(), subjects.into_iter().collect());
    }

    /// Exempt one agent from a law. Returns whether it was subject to it.
    pub fn exempt(&mut self, name: &str, id: AgentId) -> bool {
        self.law_book
            .get_mut(name)
            .is_some_and(|subjects| subjects.remove(&id))
    }

    /// Attach an organ to a situated agent. A compulsion or mutation becomes
    /// a law the agent is subject to.
    pub fn add_organ(&mut self, id: AgentId, organ: Instructor) -> Result<()> {
        let category = organ.kind().category();
        let name = organ.name().to_string();
        self.live_agent_mut(id)?.add_organ(organ)?;
        if matches!(category, Category::Compulsion | Category::Mutation) {
            debug!(system = %self.name, law = %name, agent = %id, "registering law");
            self.law_book.entry(name).or_default().insert(id);
        }
        Ok(())
    }

    fn apply_law(&mut self, id: AgentId, name: &str, category: Category) -> Result<Outcome> {
        let subject = match self.law_book.get(name) {
            Some(subjects) => subjects.contains(&id),
            // organ attached through `get_mut` after situating
            None => {
                let carries = self
                    .graph
                    .agent(id)
                    .is_some_and(|agent| agent.organ(category, name).is_some());
                if !carries {
                    return Err(SystemError::UnknownLaw(name.to_string()).into());
                }
                self.law_book.entry(name.to_string()).or_default().insert(id);
                true
            }
        };
        if !subject {
            debug!(system = %self.name, law = name, agent = %id, "law does not apply");
            return Ok(Outcome::Verdict(false));
        }
        let agent = self.live_agent_mut(id)?;
        match category {
            Category::Compulsion => agent.compel(name),
            _ => agent.mutate(name),
        }
    }

    /// Apply the compulsion law `name` to an agent.
    pub fn compel(&mut self, id: AgentId, name: &str) -> Result<Outcome> {
        self.apply_law(id, name, Category::Compulsion)
    }

    /// Apply the mutation law `name` to an agent.
    pub fn mutate(&mut self, id: AgentId, name: &str) -> Result<Outcome> {
        self.apply_law(id, name, Category::Mutation)
    }

    /// Add or delete the edge between two agents' nodes.
    pub fn edge_edit(&mut self, a: AgentId, b: AgentId, edit: EdgeEdit) -> Result<bool> {
        let (na, nb) = (self.located(a)?, self.located(b)?);
        self.node_edge_edit(na, nb, edit)
    }

    pub fn node_edge_edit(&mut self, a: NodeId, b: NodeId, edit: EdgeEdit) -> Result<bool> {
        for node in [a, b] {
            if !self.graph.contains_node(node) {
                return Err(SystemError::UnknownNode(node.to_string()).into());
            }
        }
        debug!(system = %self.name, %a, %b, ?edit, "editing edge");
        Ok(match edit {
            EdgeEdit::Add => self.graph.add_edge(a, b),
            EdgeEdit::Delete => self.graph.remove_edge(a, b),
        })
    }

    /// Whether two agents' nodes are adjacent.
    pub fn edge_property(&self, a: AgentId, b: AgentId) -> Result<bool> {
        Ok(self.graph.has_edge(self.located(a)?, self.located(b)?))
    }

    /// `n` node ids, round-robin from the first node in insertion order.
    pub fn cycle_nodes(&self, n: usize) -> Vec<NodeId> {
        round_robin(self.graph.node_ids(), n)
    }

    /// `n` agent ids, round-robin from the first agent in node order.
    pub fn cycle_agents(&self, n: usize) -> Vec<AgentId> {
        round_robin(&self.graph.agent_ids(), n)
    }

    /// `n` node ids drawn at random, with or without replacement.
    pub fn shuffle_nodes(&mut self, n: usize, replace: bool) -> Result<Vec<NodeId>> {
        let population = self.graph.node_ids().to_vec();
        draw(&mut self.rng, &population, n, replace)
    }

    /// `n` agent ids drawn at random, with or without replacement.
    pub fn shuffle_agents(&mut self, n: usize, replace: bool) -> Result<Vec<AgentId>> {
        let population = self.graph.agent_ids();
        draw(&mut self.rng, &population, n, replace)
    }

    /// Add an empty, unconnected node.
    pub fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        let id = NodeId::from_rng(&mut self.rng);
        self.graph.add_node(id, label)
    }

    /// Remove a node and its edges, returning the agent it held.
    pub fn remove_node(&mut self, node: NodeId) -> Result<Option<Agent>> {
        let removed = self
            .graph
            .remove_node(node)
            .ok_or_else(|| SystemError::UnknownNode(node.to_string()))?;
        if let Some(id) = removed.agent.as_ref().and_then(Agent::id) {
            self.forget(id);
        }
        Ok(removed.agent)
    }

    /// Exchange the agents of two nodes. Auxiliary content stays with the node.
    pub fn swap_agents(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        Ok(self.graph.swap(a, b)?)
    }

    /// Register a system-owned sensor or actuator.
    pub fn add_interaction(&mut self, mut interaction: Interaction) -> Result<()> {
        if !is_interaction_kind(interaction.kind()) {
            return Err(InstructorError::InvalidOutput {
                organ: interaction.name().to_string(),
                reason: "system interactions are sensors or actuators".into(),
            }
            .into());
        }
        if self.interactions.contains_key(interaction.name()) {
            return Err(AgentError::Duplicate {
                agent: self.name.clone(),
                category: "interaction".into(),
                name: interaction.name().to_string(),
            }
            .into());
        }
        if self.strict_engine {
            interaction.set_strict(true);
        }
        self.interactions.insert(interaction.name().to_string(), interaction);
        Ok(())
    }

    pub fn interaction(&self, name: &str) -> Option<&Interaction> {
        self.interactions.get(name)
    }

    /// Run the interaction `name` on behalf of `caller`.
    pub fn interact(&mut self, caller: AgentId, name: &str) -> Result<Outcome> {
        self.live_agent_mut(caller)?;
        let interaction = self
            .interactions
            .get_mut(name)
            .ok_or_else(|| SystemError::UnknownInteraction(name.to_string()))?;
        interaction::run(interaction, &mut self.graph, &self.environment, caller)
    }

    fn routes(&self, verb: Verb, phrase: &str) -> bool {
        self.interactions
            .get(phrase)
            .is_some_and(|i| Category::of_verb(verb) == Some(i.kind().category()))
    }

    /// Connect to a socket offered by `target`. The bound verb runs through
    /// the system, so it sees interactions and laws.
    pub fn connect(
        &mut self,
        caller: Option<AgentId>,
        target: AgentId,
        socket: &str,
        token: &str,
    ) -> Result<Outcome> {
        let agent = self.get(target).ok_or(SystemError::UnknownAgent(target))?;
        let bound = agent
            .socket(socket)
            .ok_or_else(|| SocketError::UnknownSocket(socket.to_string()))?;
        bound.admit(caller, token)?;
        let (verb, phrase) = (bound.verb(), bound.phrase().to_string());
        debug!(system = %self.name, socket, %target, verb = %verb, "socket connection admitted");
        self.handle(target).perform(verb, &phrase)
    }

    /// An executive for one agent that routes verbs through the system.
    pub fn handle(&mut self, id: AgentId) -> AgentHandle<'_> {
        AgentHandle { system: self, id }
    }
}

fn round_robin<T: Copy>(population: &[T], n: usize) -> Vec<T> {
    if population.is_empty() {
        return Vec::new();
    }
    (0..n).map(|i| population[i % population.len()]).collect()
}

fn draw<T: Copy>(rng: &mut SimRng, population: &[T], n: usize, replace: bool) -> Result<Vec<T>> {
    let available = population.len();
    if n > 0 && (available == 0 || (!replace && n > available)) {
        return Err(SystemError::SampleTooLarge {
            requested: n,
            available,
        }
        .into());
    }
    if replace {
        Ok((0..n).map(|_| population[rng.gen_range(0..available)]).collect())
    } else {
        Ok(index::sample(rng, available, n)
            .into_iter()
            .map(|i| population[i])
            .collect())
    }
}

/// One agent seen through its management system.
///
/// Sensing and acting prefer a system interaction of the same name,
/// compulsions and mutations go through the law book, and clauses and plans
/// run against this handle so their steps are routed the same way.
pub struct AgentHandle<'a> {
    system: &'a mut ManagementSystem,
    id: AgentId,
}

impl AgentHandle<'_> {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn agent(&self) -> Result<&Agent> {
        Ok(self.system.get(self.id).ok_or(SystemError::UnknownAgent(self.id))?)
    }

    fn agent_mut(&mut self) -> Result<&mut Agent> {
        Ok(self
            .system
            .get_mut(self.id)
            .ok_or(SystemError::UnknownAgent(self.id))?)
    }
}

impl Executive for AgentHandle<'_> {
    fn perform(&mut self, verb: Verb, phrase: &str) -> Result<Outcome> {
        let agent = self.agent()?;
        if agent.is_inert() && verb != Verb::Pump {
            return Err(AgentError::Inert(agent.name().to_string()).into());
        }
        let routed = self.system.routes(verb, phrase);
        match verb {
            Verb::Sense | Verb::Act if routed => self.system.interact(self.id, phrase),
            Verb::Compel => self.system.compel(self.id, phrase),
            Verb::Mutate => self.system.mutate(self.id, phrase),
            Verb::Pronounce => {
                let clause = self
                    .agent()?
                    .clause(phrase)
                    .cloned()
                    .ok_or_else(|| PolicyError::MissingClause(phrase.to_string()))?;
                clause.pronounce(self).map(Outcome::Verdict)
            }
            Verb::Enact => {
                let plan = self
                    .agent()?
                    .plan(phrase)
                    .cloned()
                    .ok_or_else(|| PolicyError::MissingPlan(phrase.to_string()))?;
                plan.enact(self).map(Outcome::Verdict)
            }
            _ => self.agent_mut()?.perform(verb, phrase),
        }
    }

    fn arrays(&self) -> Result<&ArrayBank> {
        self.agent().map(Agent::bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animus_core::array::Array;
    use animus_core::error::{AnimusError, EngineError};
    use animus_core::instructor::Engine;
    use animus_core::scaffold::ScaffoldMap;
    use animus_core::types::Value;

    fn trio(seed: u64) -> ManagementSystem {
        SystemBuilder::new("trio")
            .seed(seed)
            .with_agents([Agent::new("a"), Agent::new("b"), Agent::new("c")])
            .build()
            .unwrap()
    }

    #[test]
    fn default_graph_is_complete() {
        let system = trio(1);
        assert_eq!(system.graph().edge_count(), 3);
        for id in system.agent_ids() {
            assert_eq!(system.neighbours_to(id).unwrap().len(), 2);
        }
    }

    #[test]
    fn seeded_systems_hand_out_the_same_ids() {
        assert_eq!(trio(9).agent_ids(), trio(9).agent_ids());
        assert_ne!(trio(9).agent_ids(), trio(10).agent_ids());
    }

    #[test]
    fn too_small_a_graph_is_refused() {
        let mut rng = rng_from_seed(Some(1));
        let err = SystemBuilder::new("cramped")
            .with_graph(AgentGraph::path(1, &mut rng))
            .with_agents([Agent::new("a"), Agent::new("b")])
            .build()
            .unwrap_err();
        assert_eq!(err, AnimusError::System(SystemError::GraphTooSmall { free: 1, agents: 2 }));
    }

    #[test]
    fn cycling_restarts_from_the_first_node() {
        let system = trio(1);
        let ids = system.agent_ids();
        assert_eq!(system.cycle_agents(4), vec![ids[0], ids[1], ids[2], ids[0]]);
        assert_eq!(system.cycle_nodes(2), system.graph().node_ids()[..2].to_vec());
    }

    #[test]
    fn sampling_without_replacement_is_bounded() {
        let mut system = trio(1);
        let drawn = system.shuffle_agents(3, false).unwrap();
        let unique: BTreeSet<AgentId> = drawn.iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(system.shuffle_agents(7, true).unwrap().len(), 7);
        assert_eq!(
            system.shuffle_nodes(4, false).unwrap_err(),
            AnimusError::System(SystemError::SampleTooLarge { requested: 4, available: 3 })
        );
    }

    fn tire(name: &str) -> Instructor {
        Instructor::compulsion(
            name,
            Engine::new(|_args| Ok::<_, EngineError>(-1.0)),
            ScaffoldMap::resource("energy", "delta", ["cost"]).unwrap(),
        )
        .unwrap()
    }

    fn stocked_pair() -> ManagementSystem {
        let stocked = |name: &str| {
            let mut agent = Agent::new(name);
            agent
                .set_resource(Array::resource("stock", ["energy"]).unwrap().with_values([5.0]).unwrap())
                .unwrap();
            agent
        };
        SystemBuilder::new("pair")
            .seed(3)
            .with_agents([stocked("a"), stocked("b")])
            .build()
            .unwrap()
    }

    fn energy(system: &ManagementSystem, id: AgentId) -> Value {
        system.get(id).unwrap().resource().unwrap().peek("energy").unwrap().clone()
    }

    #[test]
    fn organs_added_after_situating_become_laws() {
        let mut system = stocked_pair();
        let ids = system.agent_ids();
        system.add_organ(ids[0], tire("tire")).unwrap();
        assert!(system.laws()["tire"].contains(&ids[0]));
        assert_eq!(system.compel(ids[0], "tire").unwrap(), Outcome::Completed);
        assert_eq!(energy(&system, ids[0]), Value::Float(4.0));
        assert_eq!(system.compel(ids[1], "tire").unwrap(), Outcome::Verdict(false));
        assert_eq!(energy(&system, ids[1]), Value::Float(5.0));

        system.get_mut(ids[1]).unwrap().add_organ(tire("rest")).unwrap();
        assert_eq!(system.compel(ids[1], "rest").unwrap(), Outcome::Completed);
        assert_eq!(energy(&system, ids[1]), Value::Float(4.0));
        assert!(system.laws()["rest"].contains(&ids[1]));
        assert_eq!(
            system.compel(ids[0], "nap").unwrap_err(),
            AnimusError::System(SystemError::UnknownLaw("nap".into()))
        );
    }

    #[test]
    fn inert_agents_refuse_verbs_but_still_pump() {
        let mut system = trio(1);
        let id = system.agent_ids()[0];
        system.terminate_agent(id).unwrap();
        let mut handle = system.handle(id);
        assert!(matches!(
            handle.perform(Verb::Sense, "eye"),
            Err(AnimusError::Agent(AgentError::Inert(_)))
        ));
        assert_eq!(handle.perform(Verb::Pump, "").unwrap(), Outcome::Verdict(false));
    }
}
