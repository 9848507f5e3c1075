//! # Animus Runtime
//!
//! The management system and everything around it.
//!
//! Agents from `animus-core` are placed on the nodes of an undirected graph
//! owned by a [`system::ManagementSystem`]. The system assigns ids, enforces
//! laws, runs system-owned interactions that can see a caller's neighbours,
//! and routes socket connections. Samplers take read-only snapshots between
//! steps and the [`persist::Persister`] writes them to disk.
//!
//! ## Quick Start
//!
//! ```rust
//! use animus_runtime::prelude::*;
//!
//! let mut system = SystemBuilder::new("pond")
//!     .seed(11)
//!     .with_agents([Agent::new("frog"), Agent::new("newt"), Agent::new("toad")])
//!     .build()
//!     .unwrap();
//!
//! let ids = system.agent_ids();
//! system.edge_edit(ids[0], ids[1], EdgeEdit::Delete).unwrap();
//! assert_eq!(system.neighbours_to(ids[0]).unwrap(), vec![ids[2]]);
//!
//! let table = AgentSampler::new().sample(&system, 0);
//! assert!(table.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod persist;
pub mod prelude;
pub mod sampler;
pub mod system;
