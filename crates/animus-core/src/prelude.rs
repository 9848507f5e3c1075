//! Animus Core Prelude — convenient imports for common usage.
//!
//! ```rust
//! use animus_core::prelude::*;
//! ```

pub use crate::types::{rng_from_seed, AgentId, Attributes, Kwargs, SimRng, Tick, Value};

pub use crate::array::{Array, ArrayKind, Persistence, SupraArray};
pub use crate::bank::ArrayBank;
pub use crate::operator::{ArrayOperator, ArrayRef, ArraySource};
pub use crate::scaffold::{MapCollection, Mapper, ScaffoldMap, ScaffoldTarget};

pub use crate::instructor::{Category, Engine, EngineArgs, Inputs, Instructor, InstructorKind, IntoOutputs};

pub use crate::policy::{AutoCondition, Clause, ConditionSource, Heartbeat, KeySelection, Plan, Traversal};

pub use crate::agent::{Agent, AVAILABLE_CORTICES, REVEAL_CORTICES};
pub use crate::executive::{Executive, Outcome, Verb};
pub use crate::socket::Socket;

pub use crate::error::{
    AgentError, AnimusError, ArrayError, EngineError, InstructorError, PolicyError, Result, ScaffoldError,
    SocketError, SystemError,
};
