//! System-owned interactions.
//!
//! An interaction is a sensor or actuator whose engine runs inside the
//! management system. Besides the usual snapshots it receives a
//! [`SystemView`] through which it can look at the caller's surroundings and
//! tickle neighbouring cortices. Its output message and scaffold maps land on
//! the calling agent, exactly as for an agent-owned organ.

use crate::graph::{AgentGraph, NodeId};
use animus_core::agent::Agent;
use animus_core::error::{EngineError, Result, SystemError};
use animus_core::executive::Outcome;
use animus_core::instructor::{EngineArgs, Instructor, InstructorKind, IntoOutputs};
use animus_core::types::{AgentId, Attributes, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Closure type behind a [`SystemEngine`].
pub type SystemEngineFn = dyn Fn(&mut SystemView<'_>, EngineArgs<'_>) -> std::result::Result<Vec<Value>, EngineError>
    + Send
    + Sync;

/// An engine that also receives a view of the system.
#[derive(Clone)]
pub struct SystemEngine(Arc<SystemEngineFn>);

impl SystemEngine {
    pub fn new<F, O>(f: F) -> Self
    where
        F: Fn(&mut SystemView<'_>, EngineArgs<'_>) -> std::result::Result<O, EngineError> + Send + Sync + 'static,
        O: IntoOutputs,
    {
        SystemEngine(Arc::new(move |view: &mut SystemView<'_>, args: EngineArgs<'_>| {
            f(view, args).map(IntoOutputs::into_outputs)
        }))
    }

    pub fn call(
        &self,
        view: &mut SystemView<'_>,
        args: EngineArgs<'_>,
    ) -> std::result::Result<Vec<Value>, EngineError> {
        (self.0)(view, args)
    }
}

impl fmt::Debug for SystemEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SystemEngine(..)")
    }
}

/// A sensor or actuator owned by the management system.
pub type Interaction = Instructor<SystemEngine>;

/// Whether an instructor kind may run as a system interaction.
pub(crate) fn is_interaction_kind(kind: InstructorKind) -> bool {
    matches!(kind, InstructorKind::Sensor | InstructorKind::Actuator)
}

/// What an interaction engine may see and touch while it runs.
///
/// The caller is taken out of its node for the duration of the call, so it
/// does not show up among the agents reachable from here.
pub struct SystemView<'a> {
    caller: AgentId,
    node: NodeId,
    graph: &'a mut AgentGraph,
    environment: &'a Attributes,
}

impl<'a> SystemView<'a> {
    pub(crate) fn new(
        caller: AgentId,
        node: NodeId,
        graph: &'a mut AgentGraph,
        environment: &'a Attributes,
    ) -> Self {
        Self {
            caller,
            node,
            graph,
            environment,
        }
    }

    pub fn caller(&self) -> AgentId {
        self.caller
    }

    /// The caller's node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Agents on nodes adjacent to the caller.
    pub fn neighbours(&self) -> Vec<AgentId> {
        self.graph
            .neighbours(self.node)
            .into_iter()
            .filter_map(|n| self.graph.node(n)?.agent.as_ref()?.id())
            .collect()
    }

    pub fn neighbour_nodes(&self) -> Vec<NodeId> {
        self.graph.neighbours(self.node)
    }

    /// Read-only access to another agent.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.graph.agent(id)
    }

    /// Query a cortex of another agent.
    pub fn tickle(&mut self, agent: AgentId, cortex: &str) -> Result<Outcome> {
        let target = self
            .graph
            .agent_mut(agent)
            .ok_or(SystemError::UnknownAgent(agent))?;
        debug!(caller = %self.caller, target = %agent, cortex, "tickling neighbour");
        target.tickle(cortex)
    }

    /// Auxiliary content of the caller's node.
    pub fn aux(&self) -> Option<&Attributes> {
        self.graph.node(self.node).map(|n| &n.aux)
    }

    pub fn aux_mut(&mut self) -> Option<&mut Attributes> {
        self.graph.node_mut(self.node).map(|n| &mut n.aux)
    }

    pub fn environment(&self) -> &Attributes {
        self.environment
    }
}

/// Run `interaction` on behalf of the agent `caller`.
///
/// The agent is lifted out of its node while the engine runs and put back
/// afterwards, whatever the result.
pub(crate) fn run(
    interaction: &mut Interaction,
    graph: &mut AgentGraph,
    environment: &Attributes,
    caller: AgentId,
) -> Result<Outcome> {
    let node = graph.node_of(caller).ok_or(SystemError::UnknownAgent(caller))?;
    let mut agent = graph.evict(node).ok_or(SystemError::UnknownAgent(caller))?;
    let result = drive(interaction, &mut agent, caller, node, graph, environment);
    graph.place(node, agent)?;
    result
}

fn drive(
    interaction: &mut Interaction,
    agent: &mut Agent,
    caller: AgentId,
    node: NodeId,
    graph: &mut AgentGraph,
    environment: &Attributes,
) -> Result<Outcome> {
    debug!(agent = %agent.name(), interaction = interaction.name(), "running system interaction");
    if let Some(output) = interaction.output() {
        agent.bank_mut().register(output)?;
    }
    let inputs = interaction.prepare(agent.bank_mut(), Some(caller))?;
    let result = {
        let mut view = SystemView::new(caller, node, graph, environment);
        let args = inputs.args(interaction.kwargs(), None, agent.rng_mut());
        interaction.engine().call(&mut view, args)
    };
    let outcome = match interaction.deliver(agent.bank_mut(), result) {
        Ok(outcome) => outcome,
        Err(e) => {
            clear_maps(interaction);
            return Err(e);
        }
    };
    if outcome != Outcome::Completed {
        clear_maps(interaction);
        return Ok(outcome);
    }
    if let Some(maps) = interaction.maps_mut() {
        agent.apply_maps(maps)?;
    }
    Ok(outcome)
}

fn clear_maps(interaction: &mut Interaction) {
    if let Some(maps) = interaction.maps_mut() {
        maps.clear();
    }
}
