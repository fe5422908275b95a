//! # ngnet-graph
//!
//! The netgraph control client: everything that talks to the kernel graph
//! manager over a control channel. Resolves node identity and type,
//! enumerates hooks and allocates bridge link slots, and drives the
//! multi-step create/connect/destroy protocols for bridge and eiface
//! nodes, with best-effort teardown on the destroy paths.
//!
//! The channel is strictly synchronous; the graph itself is shared,
//! externally mutable state, so every check here is advisory.

#![warn(missing_docs)]

pub mod bridge;
pub mod channel;
pub mod eiface;
pub mod hooks;
pub mod ifconfig;
pub mod node;
pub mod wire;

pub use channel::{ControlChannel, NgSocket};
pub use hooks::{LinkSlot, MAX_LINKS};
pub use ifconfig::{Ifconfig, SysIfconfig};
pub use node::NodeKind;
