//! Validated node names and canonical graph paths.
//!
//! Netgraph addresses a node either by a caller-chosen persistent name or by
//! a path relative to some other node. The canonical form used throughout
//! these tools is `<name>:` for a node and `<name>:<hook>` for the node on
//! the far side of one of its hooks. [`GraphPath`] owns that canonical form
//! and enforces its length bound at construction.

use std::fmt;
use std::str::FromStr;

use crate::error::{NgError, NgResult};

/// The netgraph path separator.
pub const SEPARATOR: char = ':';

/// A validated node name.
///
/// Node names must:
/// - Be 1-15 characters long (they double as OS interface names)
/// - Contain only alphanumeric characters and hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeName(String);

impl NodeName {
    /// Maximum length of a node name (one below the OS IFNAMSIZ).
    pub const MAX_LENGTH: usize = 15;

    /// Create a new node name, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or contains a
    /// character outside `a-zA-Z0-9-`. `:` is the netgraph separator and
    /// `[`/`]` delimit node IDs, so none of them can appear in a name.
    pub fn new(name: impl Into<String>) -> NgResult<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > Self::MAX_LENGTH {
            return Err(NgError::InvalidNodeName { name });
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(NgError::InvalidNodeName { name });
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeName {
    type Err = NgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A canonical graph path.
///
/// Always carries the trailing separator (`br0:`), so it can be handed to
/// every channel call unchanged. The one place the separator must not
/// appear, the name field of a rename request, uses [`GraphPath::node_name`]
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphPath(String);

impl GraphPath {
    /// Maximum length of a path (one below the kernel's path field width).
    pub const MAX_LENGTH: usize = 511;

    /// The control session's own node.
    #[must_use]
    pub fn own() -> Self {
        Self(format!(".{SEPARATOR}"))
    }

    /// Canonical path for a validated node name.
    #[must_use]
    pub fn from_name(name: &NodeName) -> Self {
        // MAX_LENGTH of a NodeName keeps this far below the path bound.
        Self(format!("{name}{SEPARATOR}"))
    }

    /// Canonical path for a kernel-assigned node name.
    ///
    /// Kernel names (e.g. the default `ngeth0` of a fresh eiface) are not
    /// restricted to the CLI character set, so only the length is checked.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::PathTooLong`] if the resulting path would not fit
    /// the kernel's path field.
    pub fn from_kernel_name(name: &str) -> NgResult<Self> {
        if name.len() + 1 > Self::MAX_LENGTH {
            return Err(NgError::PathTooLong {
                path: name.to_string(),
            });
        }
        Ok(Self(format!("{name}{SEPARATOR}")))
    }

    /// Path to whatever sits on the far side of `hook` on this node.
    ///
    /// `br0:` via `link3` becomes `br0:link3`.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::PathTooLong`] if appending the hook name would
    /// exceed the kernel's path field.
    pub fn via_hook(&self, hook: &str) -> NgResult<Self> {
        if self.0.len() + hook.len() > Self::MAX_LENGTH {
            return Err(NgError::PathTooLong {
                path: format!("{}{hook}", self.0),
            });
        }
        Ok(Self(format!("{}{hook}", self.0)))
    }

    /// Get the path as a string slice, trailing separator included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare node name, everything before the first separator.
    ///
    /// This is the form the rename command requires: its name field is a
    /// plain identifier, not a path, and the kernel rejects a separator.
    #[must_use]
    pub fn node_name(&self) -> &str {
        self.0
            .split_once(SEPARATOR)
            .map_or(self.0.as_str(), |(name, _)| name)
    }
}

impl fmt::Display for GraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&NodeName> for GraphPath {
    fn from(name: &NodeName) -> Self {
        Self::from_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_node_names() {
        assert!(NodeName::new("br0").is_ok());
        assert!(NodeName::new("eth-a").is_ok());
        assert!(NodeName::new("A1-b2-C3").is_ok());
        assert!(NodeName::new("a".repeat(15)).is_ok());
    }

    #[test]
    fn invalid_node_names() {
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new("a".repeat(16)).is_err());
        assert!(NodeName::new("br0:").is_err());
        assert!(NodeName::new("br[1]").is_err());
        assert!(NodeName::new("br_0").is_err());
        assert!(NodeName::new("br 0").is_err());
    }

    #[test]
    fn canonical_path_has_trailing_separator() {
        let name = NodeName::new("br0").unwrap();
        let path = GraphPath::from_name(&name);
        assert_eq!(path.as_str(), "br0:");
        assert_eq!(path.node_name(), "br0");
    }

    #[test]
    fn own_node_path() {
        assert_eq!(GraphPath::own().as_str(), ".:");
    }

    #[test]
    fn hook_relative_path() {
        let name = NodeName::new("br0").unwrap();
        let path = GraphPath::from_name(&name).via_hook("link3").unwrap();
        assert_eq!(path.as_str(), "br0:link3");
        assert_eq!(path.node_name(), "br0");
    }

    #[test]
    fn kernel_name_path() {
        let path = GraphPath::from_kernel_name("ngeth0").unwrap();
        assert_eq!(path.as_str(), "ngeth0:");
    }

    #[test]
    fn overlong_path_rejected() {
        let long = "x".repeat(GraphPath::MAX_LENGTH);
        assert!(matches!(
            GraphPath::from_kernel_name(&long),
            Err(NgError::PathTooLong { .. })
        ));
        let base = GraphPath::from_kernel_name(&"y".repeat(500)).unwrap();
        assert!(base.via_hook("link12345678").is_err());
    }
}
