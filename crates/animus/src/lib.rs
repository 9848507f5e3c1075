//! # Animus
//!
//! Agent-based simulation built from typed arrays, organs and policies.
//!
//! Agents keep their state in named arrays and change it only through
//! organs: sensors and interpreters fill messages and beliefs, moulders and
//! actuators turn beliefs into action, compulsions and mutations update the
//! resource and essence through deferred scaffold maps. A management system
//! places agents on an undirected graph, enforces laws and runs interactions
//! that can reach beyond a single agent.
//!
//! ## Quick Start
//!
//! ```rust
//! use animus::prelude::*;
//!
//! let mut walker = Agent::new("walker");
//! walker
//!     .set_resource(Array::resource("stock", ["energy"]).unwrap().with_values([5.0]).unwrap())
//!     .unwrap();
//! walker
//!     .add_organ(
//!         Instructor::compulsion(
//!             "tire",
//!             Engine::new(|_args| Ok::<_, EngineError>(-1.0)),
//!             ScaffoldMap::resource("energy", "delta", ["cost"]).unwrap(),
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let mut system = SystemBuilder::new("trail")
//!     .seed(7)
//!     .with_agents([walker])
//!     .build()
//!     .unwrap();
//!
//! let id = system.agent_ids()[0];
//! system.compel(id, "tire").unwrap();
//!
//! let table = AgentSampler::new().sample(&system, 1);
//! assert_eq!(table.column("value"), Some(vec![&Value::Float(4.0)]));
//! ```
//!
//! ## Architecture
//!
//! Animus is organized into two crates:
//!
//! - [`animus_core`] - Arrays, operators, scaffold maps, instructors, policies and agents
//! - [`animus_runtime`] - Management system, agent graph, interactions, sampling and persistence
//!
//! ## Key Concepts
//!
//! ### Organs
//!
//! | Organ | Reads | Writes |
//! |-------|-------|--------|
//! | Sensor | nothing | buzz |
//! | Interpreter | buzz or belief | belief |
//! | Moulder | belief | direction |
//! | Actuator | direction | nothing |
//! | Cortex | imprints | feature |
//! | Compulsion | optional imprints | resource via maps |
//! | Mutation | optional imprints | essence via maps, on a Bernoulli trial |
//!
//! ### Persistence
//!
//! Buzzes, directions and features are *flash*: reading them clears them.
//! Beliefs, the resource and the essence are *imprints* and persist.
//!
//! ### Policies
//!
//! - **Clause** - a sequence of verbs whose verdict is their conjunction or an auto-condition
//! - **Plan** - a binary decision tree of verbs
//! - **Heartbeat** - ages an agent and marks it inert when it fails a condition or grows too old

// Re-export all subcrates
pub use animus_core as core;
pub use animus_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use animus::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use animus_core::types::{rng_from_seed, AgentId, Attributes, Kwargs, SimRng, Tick, Value};

    // Arrays and maps
    pub use animus_core::array::{Array, ArrayKind, Persistence, SupraArray};
    pub use animus_core::bank::ArrayBank;
    pub use animus_core::operator::{ArrayOperator, ArrayRef, ArraySource};
    pub use animus_core::scaffold::{MapCollection, Mapper, ScaffoldMap, ScaffoldTarget};

    // Organs and policies
    pub use animus_core::instructor::{Category, Engine, EngineArgs, Instructor, InstructorKind, IntoOutputs};
    pub use animus_core::policy::{AutoCondition, Clause, ConditionSource, Heartbeat, KeySelection, Plan, Traversal};
    pub use animus_core::agent::Agent;
    pub use animus_core::executive::{Executive, Outcome, Verb};
    pub use animus_core::socket::Socket;

    // Error types
    pub use animus_core::error::{
        AgentError, AnimusError, ArrayError, EngineError, InstructorError, PolicyError, Result, ScaffoldError,
        SocketError, SystemError,
    };

    // Runtime
    pub use animus_runtime::system::{AgentHandle, EdgeEdit, ManagementSystem, SystemBuilder};
    pub use animus_runtime::graph::{AgentGraph, NodeId};
    pub use animus_runtime::interaction::{Interaction, SystemEngine, SystemView};

    // Sampling and persistence
    pub use animus_runtime::sampler::{AgentSampler, EnvironmentSampler, GraphSampler, Sample, Sampler, Table};
    pub use animus_runtime::persist::{Persister, Serializer, WriteRule};
    pub use animus_runtime::config::{SamplingConfig, SimulationConfig, SystemConfig};
    pub use animus_runtime::error::PersistError;
}
