//! Wire codecs for netgraph control messages.
//!
//! Requests and responses are the kernel's fixed-width C structures:
//! NUL-terminated names in fixed byte fields, native-endian integers. Each
//! request type here is defined independently and built field by field;
//! response substructures are never reinterpreted as requests even when
//! their leading fields line up.

use ngnet_common::{GraphPath, NgError, NgResult};

/// Width of a node name or node type field.
pub const NODE_SIZ: usize = 32;
/// Width of a hook name field.
pub const HOOK_SIZ: usize = 32;
/// Width of a path field.
pub const PATH_SIZ: usize = 512;

/// Command namespace identifier carried on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cookie {
    /// Generic node commands, understood by every node type.
    Generic,
    /// Bridge-specific commands.
    Bridge,
    /// Physical-ethernet-specific commands.
    Ether,
}

impl Cookie {
    /// The on-wire cookie value.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Generic => 1_137_070_366,
            Self::Bridge => 967_239_368,
            Self::Ether => 917_787_906,
        }
    }
}

/// Generic command codes ([`Cookie::Generic`]).
pub mod generic {
    /// Shut a node down.
    pub const SHUTDOWN: u32 = 1;
    /// Spawn a peer node across a new hook pair.
    pub const MKPEER: u32 = 2;
    /// Connect a hook to a hook on another node.
    pub const CONNECT: u32 = 3;
    /// Assign a persistent name to a node.
    pub const NAME: u32 = 4;
    /// Remove one of a node's hooks.
    pub const RMHOOK: u32 = 5;
    /// Query a node's descriptor.
    pub const NODEINFO: u32 = 6;
    /// List a node's hooks (descriptor included in the reply).
    pub const LISTHOOKS: u32 = 7;
}

/// Bridge command codes ([`Cookie::Bridge`]).
pub mod bridge {
    /// Keep the node alive after its creating session ends.
    pub const SET_PERSISTENT: u32 = 8;
}

/// Ethernet command codes ([`Cookie::Ether`]).
pub mod ether {
    /// Toggle promiscuous reception; payload is a native-endian u32 flag.
    pub const SET_PROMISC: u32 = 6;
}

/// Native-endian u32 payload, used for flag-valued commands.
#[must_use]
pub fn u32_payload(value: u32) -> [u8; 4] {
    value.to_ne_bytes()
}

fn put_str(buf: &mut [u8], value: &str, field: &'static str) -> NgResult<()> {
    // the field must keep room for the NUL
    if value.len() >= buf.len() {
        return Err(NgError::Encode {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    buf[..value.len()].copy_from_slice(value.as_bytes());
    Ok(())
}

fn get_str(buf: &[u8], field: &'static str) -> NgResult<String> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let s = std::str::from_utf8(&buf[..end]).map_err(|_| NgError::Decode {
        message: format!("non-UTF-8 {field} field"),
    })?;
    Ok(s.to_string())
}

fn get_u32(buf: &[u8]) -> u32 {
    u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Spawn-peer request: node type plus the hook pair joining the two nodes.
#[derive(Debug, Clone)]
pub struct MkPeer<'a> {
    /// Type of the node to spawn.
    pub type_name: &'a str,
    /// Hook created on the target node.
    pub our_hook: &'a str,
    /// Hook created on the new peer.
    pub peer_hook: &'a str,
}

impl MkPeer<'_> {
    /// Encode into the kernel's request layout.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::Encode`] if a field does not fit its wire width.
    pub fn encode(&self) -> NgResult<Vec<u8>> {
        let mut buf = vec![0u8; NODE_SIZ + 2 * HOOK_SIZ];
        put_str(&mut buf[..NODE_SIZ], self.type_name, "type")?;
        put_str(&mut buf[NODE_SIZ..NODE_SIZ + HOOK_SIZ], self.our_hook, "ourhook")?;
        put_str(&mut buf[NODE_SIZ + HOOK_SIZ..], self.peer_hook, "peerhook")?;
        Ok(buf)
    }
}

/// Connect-hooks request: bind a hook on the target node to a hook on the
/// node addressed by `path`.
#[derive(Debug, Clone)]
pub struct Connect<'a> {
    /// Path to the far node.
    pub path: &'a GraphPath,
    /// Hook on the target node.
    pub our_hook: &'a str,
    /// Hook on the far node.
    pub peer_hook: &'a str,
}

impl Connect<'_> {
    /// Encode into the kernel's request layout.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::Encode`] if a field does not fit its wire width.
    pub fn encode(&self) -> NgResult<Vec<u8>> {
        let mut buf = vec![0u8; PATH_SIZ + 2 * HOOK_SIZ];
        put_str(&mut buf[..PATH_SIZ], self.path.as_str(), "path")?;
        put_str(&mut buf[PATH_SIZ..PATH_SIZ + HOOK_SIZ], self.our_hook, "ourhook")?;
        put_str(&mut buf[PATH_SIZ + HOOK_SIZ..], self.peer_hook, "peerhook")?;
        Ok(buf)
    }
}

/// Rename request. The name field is a plain identifier: no separator.
#[derive(Debug, Clone)]
pub struct Name<'a> {
    /// The name to assign.
    pub name: &'a str,
}

impl Name<'_> {
    /// Encode into the kernel's request layout.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::Encode`] if the name does not fit its wire width.
    pub fn encode(&self) -> NgResult<Vec<u8>> {
        let mut buf = vec![0u8; NODE_SIZ];
        put_str(&mut buf, self.name, "name")?;
        Ok(buf)
    }
}

/// Remove-hook request, naming one hook on the target node.
#[derive(Debug, Clone)]
pub struct RmHook<'a> {
    /// The hook to remove.
    pub our_hook: &'a str,
}

impl RmHook<'_> {
    /// Encode into the kernel's request layout.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::Encode`] if the hook name does not fit.
    pub fn encode(&self) -> NgResult<Vec<u8>> {
        let mut buf = vec![0u8; HOOK_SIZ];
        put_str(&mut buf, self.our_hook, "ourhook")?;
        Ok(buf)
    }
}

/// A node descriptor as reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Persistent name, empty if the node is unnamed.
    pub name: String,
    /// Node type string (`bridge`, `eiface`, `ether`, ...).
    pub type_name: String,
    /// Kernel node ID.
    pub id: u32,
    /// Number of connected hooks.
    pub hooks: u32,
}

impl NodeInfo {
    /// Encoded size of one descriptor.
    pub const WIRE_LEN: usize = 2 * NODE_SIZ + 8;

    /// Decode a descriptor from a response payload.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::Decode`] on a truncated or non-UTF-8 payload.
    pub fn decode(buf: &[u8]) -> NgResult<Self> {
        if buf.len() < Self::WIRE_LEN {
            return Err(NgError::Decode {
                message: format!(
                    "node descriptor truncated: {} of {} bytes",
                    buf.len(),
                    Self::WIRE_LEN
                ),
            });
        }
        Ok(Self {
            name: get_str(&buf[..NODE_SIZ], "name")?,
            type_name: get_str(&buf[NODE_SIZ..2 * NODE_SIZ], "type")?,
            id: get_u32(&buf[2 * NODE_SIZ..]),
            hooks: get_u32(&buf[2 * NODE_SIZ + 4..]),
        })
    }
}

/// One connection point in a hook-list reply: the local hook, the peer's
/// hook, and the peer's descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// Hook name on the listed node.
    pub our_hook: String,
    /// Hook name on the peer; empty when nothing is attached.
    pub peer_hook: String,
    /// The peer node's descriptor.
    pub peer: NodeInfo,
}

impl LinkInfo {
    /// Encoded size of one entry.
    pub const WIRE_LEN: usize = 2 * HOOK_SIZ + NodeInfo::WIRE_LEN;

    fn decode(buf: &[u8]) -> NgResult<Self> {
        Ok(Self {
            our_hook: get_str(&buf[..HOOK_SIZ], "ourhook")?,
            peer_hook: get_str(&buf[HOOK_SIZ..2 * HOOK_SIZ], "peerhook")?,
            peer: NodeInfo::decode(&buf[2 * HOOK_SIZ..])?,
        })
    }

    /// Whether a peer is actually attached on this hook.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.peer_hook.is_empty()
    }
}

/// A hook-list reply: the node's own descriptor followed by one entry per
/// hook. The kernel gives no ordering guarantee over the entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookList {
    /// Descriptor of the listed node itself.
    pub node: NodeInfo,
    /// One entry per hook, unordered.
    pub links: Vec<LinkInfo>,
}

impl HookList {
    /// Decode a hook-list reply.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::Decode`] if the payload is shorter than the hook
    /// count in the embedded descriptor claims.
    pub fn decode(buf: &[u8]) -> NgResult<Self> {
        let node = NodeInfo::decode(buf)?;
        let count = node.hooks as usize;
        let need = NodeInfo::WIRE_LEN + count * LinkInfo::WIRE_LEN;
        if buf.len() < need {
            return Err(NgError::Decode {
                message: format!(
                    "hook list truncated: {} of {} bytes for {count} hooks",
                    buf.len(),
                    need
                ),
            });
        }
        let mut links = Vec::with_capacity(count);
        for idx in 0..count {
            let start = NodeInfo::WIRE_LEN + idx * LinkInfo::WIRE_LEN;
            links.push(LinkInfo::decode(&buf[start..start + LinkInfo::WIRE_LEN])?);
        }
        Ok(Self { node, links })
    }
}

#[cfg(test)]
pub(crate) mod testenc {
    //! Encoders for the response side, used by tests standing in for the
    //! kernel.

    use super::{HOOK_SIZ, HookList, NODE_SIZ, NodeInfo};

    pub fn node_info(name: &str, type_name: &str, id: u32, hooks: u32) -> Vec<u8> {
        let mut buf = vec![0u8; NodeInfo::WIRE_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf[NODE_SIZ..NODE_SIZ + type_name.len()].copy_from_slice(type_name.as_bytes());
        buf[2 * NODE_SIZ..2 * NODE_SIZ + 4].copy_from_slice(&id.to_ne_bytes());
        buf[2 * NODE_SIZ + 4..].copy_from_slice(&hooks.to_ne_bytes());
        buf
    }

    pub fn hook_list(list: &HookList) -> Vec<u8> {
        let mut buf = node_info(
            &list.node.name,
            &list.node.type_name,
            list.node.id,
            list.links.len() as u32,
        );
        for link in &list.links {
            let mut entry = vec![0u8; 2 * HOOK_SIZ];
            entry[..link.our_hook.len()].copy_from_slice(link.our_hook.as_bytes());
            entry[HOOK_SIZ..HOOK_SIZ + link.peer_hook.len()]
                .copy_from_slice(link.peer_hook.as_bytes());
            buf.extend_from_slice(&entry);
            buf.extend_from_slice(&node_info(
                &link.peer.name,
                &link.peer.type_name,
                link.peer.id,
                link.peer.hooks,
            ));
        }
        buf
    }
}
