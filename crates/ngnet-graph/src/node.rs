//! Node type resolution and the operation gate.
//!
//! Every mutation in this crate is gated on an advisory existence/type
//! check. Advisory because the graph is shared, externally mutable state:
//! another session can create or destroy a node between the check and the
//! mutation. The check exists to give a useful diagnostic, not to lock.

use std::fmt;

use ngnet_common::{GraphPath, NgError, NgResult};

use crate::channel::ControlChannel;
use crate::wire::{Cookie, NodeInfo, generic};

/// The closed set of node kinds this tool knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A frame-forwarding bridge node.
    Bridge,
    /// A virtual ethernet endpoint node.
    Eiface,
    /// A physical ethernet node.
    Ether,
    /// A kind this tool does not recognize. Not an error; unknown kinds
    /// simply never pass a check that expects a known one.
    Unknown,
    /// Synthesized locally when the kernel reports no such node. The
    /// kernel itself never reports this kind.
    Nonexistent,
}

impl NodeKind {
    /// The kind's type string, matching what the kernel reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::Eiface => "eiface",
            Self::Ether => "ether",
            Self::Unknown => "unknown",
            Self::Nonexistent => "nonexistent",
        }
    }

    /// Map a kernel type string onto the closed set.
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "bridge" => Self::Bridge,
            "eiface" => Self::Eiface,
            "ether" => Self::Ether,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve a node reference to its kind.
///
/// A "no such node" condition from the channel yields
/// [`NodeKind::Nonexistent`]; any other channel failure propagates.
///
/// # Errors
///
/// Returns a channel or decode error; never an error for a missing node.
pub fn resolve<C: ControlChannel>(channel: &mut C, node: &GraphPath) -> NgResult<NodeKind> {
    match channel.send(node, Cookie::Generic, generic::NODEINFO, &[]) {
        Err(NgError::NoSuchNode { .. }) => return Ok(NodeKind::Nonexistent),
        Err(err) => return Err(err),
        Ok(()) => {}
    }
    let reply = channel.receive()?;
    let info = NodeInfo::decode(&reply)?;
    let kind = NodeKind::from_type_name(&info.type_name);
    tracing::debug!(node = %node, kind = %kind, "resolved");
    Ok(kind)
}

/// Gate an operation on a node resolving to the expected kind.
///
/// With no node supplied the check trivially passes; several operations
/// take optional operands. The two failure diagnostics are distinguished:
/// expecting [`NodeKind::Nonexistent`] and finding anything else means the
/// target name is already taken, every other mismatch means the operand is
/// missing or of the wrong kind.
///
/// # Errors
///
/// Returns [`NgError::AlreadyExists`], [`NgError::WrongKind`], or a
/// propagated resolve failure.
pub fn check<C: ControlChannel>(
    channel: &mut C,
    node: Option<&GraphPath>,
    expected: NodeKind,
) -> NgResult<()> {
    let Some(node) = node else {
        return Ok(());
    };
    let actual = resolve(channel, node)?;
    if actual == expected {
        return Ok(());
    }
    if expected == NodeKind::Nonexistent {
        Err(NgError::AlreadyExists {
            node: node.to_string(),
            kind: actual.as_str().to_string(),
        })
    } else {
        Err(NgError::WrongKind {
            node: node.to_string(),
            actual: actual.as_str().to_string(),
            expected: expected.as_str().to_string(),
        })
    }
}
