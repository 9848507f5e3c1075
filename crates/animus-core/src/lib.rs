//! # Animus Core
//!
//! Building blocks for agent-based simulations in which agents sense,
//! interpret, decide and act through named organs:
//!
//! - **Arrays**: fixed-key records, either *imprint* (persistent) or
//!   *flash* (consumed on read)
//! - **Operators**: read-only views slicing, extending or mixing arrays
//! - **Scaffold maps**: deferred updates to an agent's resource or essence
//! - **Instructors**: organs wrapping an engine with typed inputs and outputs
//! - **Policies**: clauses, plans and heartbeats composing verbs
//! - **Agents**: the owners of all of the above
//!
//! ## Quick Start
//!
//! ```rust
//! use animus_core::prelude::*;
//!
//! let mut agent = Agent::new("walker").with_seed(42);
//! agent
//!     .set_resource(Array::resource("stock", ["energy"]).unwrap().with_values([5.0]).unwrap())
//!     .unwrap();
//!
//! let step = Engine::new(|_args| Ok::<_, EngineError>(-1.0));
//! let legs = Instructor::compulsion(
//!     "walk",
//!     step,
//!     ScaffoldMap::resource("energy", "delta", ["cost"]).unwrap(),
//! )
//! .unwrap();
//! agent.add_organ(legs).unwrap();
//!
//! agent.compel("walk").unwrap();
//! assert_eq!(agent.resource().unwrap().peek("energy").unwrap(), &Value::Float(4.0));
//! ```

pub mod agent;
pub mod array;
pub mod bank;
pub mod error;
pub mod executive;
pub mod instructor;
pub mod numeric;
pub mod operator;
pub mod policy;
pub mod prelude;
pub mod scaffold;
pub mod socket;
pub mod types;
