//! Hook enumeration and bridge link-slot allocation.
//!
//! A bridge's numbered connection points follow the `link<N>` naming
//! convention. Occupancy is never stored; it is derived fresh from the
//! current hook list on every allocation, because the list carries no
//! ordering guarantee and other sessions mutate the graph concurrently.

use std::fmt;

use ngnet_common::{GraphPath, NgError, NgResult};

use crate::channel::ControlChannel;
use crate::wire::{Cookie, HookList, generic};

/// Capacity of a bridge's numbered link namespace.
pub const MAX_LINKS: usize = 32;

/// One of a bridge's numbered connection points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkSlot(u8);

impl LinkSlot {
    /// Construct from an index known to be in range.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`MAX_LINKS`].
    #[must_use]
    pub fn new(index: usize) -> Self {
        assert!(index < MAX_LINKS, "link slot {index} out of range");
        Self(index as u8)
    }

    /// The slot index.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The conventional hook name, `link<N>`.
    #[must_use]
    pub fn hook_name(self) -> String {
        format!("link{}", self.0)
    }

    /// Parse a hook name of the `link<N>` convention.
    ///
    /// Names outside the convention, out-of-range indexes included, yield
    /// `None`; callers skip them rather than treat them as errors.
    #[must_use]
    pub fn parse(hook: &str) -> Option<Self> {
        let digits = hook.strip_prefix("link")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: usize = digits.parse().ok()?;
        (index < MAX_LINKS).then(|| Self(index as u8))
    }
}

impl fmt::Display for LinkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link{}", self.0)
    }
}

/// List a node's hooks; the reply embeds the node's own descriptor.
///
/// # Errors
///
/// Returns a channel or decode error.
pub fn list<C: ControlChannel>(channel: &mut C, node: &GraphPath) -> NgResult<HookList> {
    channel.send(node, Cookie::Generic, generic::LISTHOOKS, &[])?;
    let reply = channel.receive()?;
    HookList::decode(&reply)
}

/// Find the lowest unoccupied link slot on a bridge.
///
/// Hook names that do not follow the `link<N>` convention are skipped.
///
/// # Errors
///
/// Returns [`NgError::LinksExhausted`] when every slot is taken, or a
/// propagated listing failure.
pub fn lowest_free_slot<C: ControlChannel>(
    channel: &mut C,
    bridge: &GraphPath,
) -> NgResult<LinkSlot> {
    let hooks = list(channel, bridge)?;
    let mut occupied = [false; MAX_LINKS];
    for link in &hooks.links {
        if let Some(slot) = LinkSlot::parse(&link.our_hook) {
            occupied[slot.index()] = true;
        }
    }
    occupied
        .iter()
        .position(|taken| !taken)
        .map(LinkSlot::new)
        .ok_or_else(|| NgError::LinksExhausted {
            bridge: bridge.to_string(),
        })
}

/// Whether a physical interface already has any connected hook.
///
/// Used to refuse attaching an interface that is already serving a bridge.
///
/// # Errors
///
/// Returns a propagated listing failure.
pub fn ether_is_connected<C: ControlChannel>(
    channel: &mut C,
    ether: &GraphPath,
) -> NgResult<bool> {
    let hooks = list(channel, ether)?;
    Ok(hooks.links.iter().any(crate::wire::LinkInfo::is_connected))
}
