//! Policies: how an agent strings verbs together.
//!
//! - [`Clause`]: an ordered verb list with an optional auto-condition
//! - [`Plan`]: a binary tree of verbs, traversed by result polarity
//! - [`Heartbeat`]: an age ticker with survival conditions

pub mod clause;
pub mod condition;
pub mod heartbeat;
pub mod plan;

pub use clause::Clause;
pub use condition::{AutoCondition, ConditionSource, KeySelection};
pub use heartbeat::Heartbeat;
pub use plan::{Plan, PlanNode, Traversal};
