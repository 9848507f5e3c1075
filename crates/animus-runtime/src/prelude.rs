//! Animus Runtime Prelude — convenient imports for common usage.
//!
//! ```rust
//! use animus_runtime::prelude::*;
//! ```

// Re-export the system
pub use crate::system::{AgentHandle, EdgeEdit, ManagementSystem, SystemBuilder};
pub use crate::graph::{AgentGraph, Node, NodeId};
pub use crate::interaction::{Interaction, SystemEngine, SystemView};

// Re-export sampling and persistence
pub use crate::sampler::{AgentSampler, EnvironmentSampler, GraphSampler, Sample, Sampler, Table};
pub use crate::persist::{Persister, Serializer, WriteRule};
pub use crate::config::{RuleConfig, SamplerKind, SamplingConfig, SimulationConfig, SystemConfig};
pub use crate::error::PersistError;

// Re-export from core
pub use animus_core::prelude::*;
