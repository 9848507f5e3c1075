//! Error types for Animus operations.
//!
//! Every layer owns a typed error; all of them fold into [`AnimusError`].
//! Construction, semantic, policy and routing failures always surface to the
//! caller. Engine failures surface only when the organ runs in strict mode;
//! otherwise they are captured into [`crate::executive::Outcome::Captured`].

use crate::array::ArrayKind;
use crate::types::AgentId;
use thiserror::Error;

/// Result type for Animus operations.
pub type Result<T> = std::result::Result<T, AnimusError>;

/// Errors that can occur anywhere in the framework.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimusError {
    #[error("array error: {0}")]
    Array(#[from] ArrayError),
    #[error("scaffold error: {0}")]
    Scaffold(#[from] ScaffoldError),
    #[error("instructor error: {0}")]
    Instructor(#[from] InstructorError),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("socket connection error: {0}")]
    Socket(#[from] SocketError),
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),
    #[error("system error: {0}")]
    System(#[from] SystemError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl AnimusError {
    /// The engine failure carried by this error, if it is one.
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            AnimusError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

/// Array construction and access errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrayError {
    #[error("array '{array}' declares key '{key}' more than once")]
    DuplicateKey { array: String, key: String },
    #[error("array '{array}' declares no keys")]
    NoKeys { array: String },
    #[error("array '{array}' has no key '{key}'")]
    UnknownKey { array: String, key: String },
    #[error("array '{array}' expects {expected} values, got {found}")]
    LengthMismatch {
        array: String,
        expected: usize,
        found: usize,
    },
    #[error("flash array '{array}' read while entirely empty")]
    EmptyFlashAccess { array: String },
    #[error("array '{array}' is a {found:?}, expected {expected}")]
    WrongKind {
        array: String,
        expected: String,
        found: ArrayKind,
    },
    #[error("operator mixes flash and imprint arrays")]
    MixedVariants,
    #[error("operator selects no keys")]
    EmptySelection,
    #[error("operator needs at least one source array")]
    NoSources,
    #[error("mix sources do not share the same keys")]
    ShapeMismatch,
    #[error("mix pick {pick} out of range for {sources} sources")]
    PickOutOfRange { pick: usize, sources: usize },
    #[error("no array registered as {0}")]
    Missing(String),
}

/// Scaffold map construction and application errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaffoldError {
    #[error("agent carries no {0} to apply a map to")]
    MissingScaffold(String),
    #[error("target key '{key}' is unset on the {target}")]
    UnsetTarget { target: String, key: String },
    #[error("map '{map}' has partially empty arguments")]
    PartialArguments { map: String },
    #[error("mapper '{mapper}' takes {expected} arguments, map declares {found}")]
    Arity {
        mapper: String,
        expected: usize,
        found: usize,
    },
    #[error("unknown mapper '{0}'")]
    UnknownMapper(String),
    #[error("mapper '{mapper}' failed: {reason}")]
    Mapper { mapper: String, reason: String },
    #[error("map collection mixes resource and essence targets")]
    MixedTargets,
}

/// Instructor construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstructorError {
    #[error("organ '{organ}' cannot take that input: {reason}")]
    InvalidInput { organ: String, reason: String },
    #[error("organ '{organ}' cannot produce that output: {reason}")]
    InvalidOutput { organ: String, reason: String },
    #[error("organ '{organ}' requires a {required} map")]
    MissingMap { organ: String, required: String },
    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("engine of '{organ}' returned {found} values, expected {expected}")]
    OutputArity {
        organ: String,
        expected: usize,
        found: usize,
    },
}

/// Plan, clause, heartbeat and condition errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("plan '{0}' has not been stamped and approved")]
    NotStamped(String),
    #[error("plan '{plan}' is not a tree: {reason}")]
    NotATree { plan: String, reason: String },
    #[error("plan '{plan}' node {node} returned {result} but has no matching edge")]
    DanglingPolarity {
        plan: String,
        node: usize,
        result: bool,
    },
    #[error("plan '{plan}' has no node {node}")]
    UnknownNode { plan: String, node: usize },
    #[error("unknown verb '{0}'")]
    UnknownVerb(String),
    #[error("no clause named '{0}'")]
    MissingClause(String),
    #[error("no plan named '{0}'")]
    MissingPlan(String),
    #[error("no heartbeat named '{0}'")]
    MissingHeartbeat(String),
    #[error("condition on {0} selects no keys")]
    EmptySelection(String),
}

/// Socket connection failures. All of them fail closed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SocketError {
    #[error("no socket named '{0}'")]
    UnknownSocket(String),
    #[error("wrong token for socket '{0}'")]
    BadToken(String),
    #[error("caller {caller:?} is not whitelisted on socket '{socket}'")]
    NotWhitelisted {
        socket: String,
        caller: Option<AgentId>,
    },
}

/// Agent composition and lookup errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("agent '{agent}' has no {category} named '{name}'")]
    MissingOrgan {
        agent: String,
        category: String,
        name: String,
    },
    #[error("agent '{agent}' already holds a {category} named '{name}'")]
    Duplicate {
        agent: String,
        category: String,
        name: String,
    },
    #[error("message '{name}' is already registered with a different shape")]
    MessageConflict { name: String },
    #[error("agent '{0}' is inert")]
    Inert(String),
}

/// Management system errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SystemError {
    #[error("no agent with id {0}")]
    UnknownAgent(AgentId),
    #[error("no node '{0}'")]
    UnknownNode(String),
    #[error("node '{0}' is already occupied")]
    NodeOccupied(String),
    #[error("agent '{0}' has not been attached to a system")]
    Unattached(String),
    #[error("no law named '{0}'")]
    UnknownLaw(String),
    #[error("no system interaction named '{0}'")]
    UnknownInteraction(String),
    #[error("cannot draw {requested} without replacement from {available}")]
    SampleTooLarge { requested: usize, available: usize },
    #[error("graph has {free} free nodes for {agents} agents")]
    GraphTooSmall { free: usize, agents: usize },
}

/// A failure raised inside an engine.
///
/// Engines report failures by value; in non-strict mode the failure is the
/// verb's result instead of an error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for EngineError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for EngineError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<ArrayError> for EngineError {
    fn from(e: ArrayError) -> Self {
        EngineError::new(e.to_string())
    }
}

impl From<AnimusError> for EngineError {
    fn from(e: AnimusError) -> Self {
        match e {
            AnimusError::Engine(inner) => inner,
            other => EngineError::new(other.to_string()),
        }
    }
}
