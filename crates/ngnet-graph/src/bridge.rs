//! Bridge lifecycle: create, attach a physical interface, destroy.
//!
//! None of these protocols is transactional. A create that fails mid-way
//! leaves a partially created node for the operator to shut down; a
//! destroy keeps going past individual hook-removal failures and always
//! issues the terminal shutdown.

use ngnet_common::{GraphPath, NgResult};

use crate::channel::ControlChannel;
use crate::hooks;
use crate::node::NodeKind;
use crate::wire::{self, Connect, Cookie, MkPeer, RmHook, generic};

/// Hook pair consumed on the bridge by a physical interface: its `lower`
/// hook lands on `link0`, its `upper` hook on `link1`. Attachment happens
/// only right after creation, when both are provably free.
const ETHER_LOWER_SLOT: &str = "link0";
const ETHER_UPPER_SLOT: &str = "link1";

/// Create a persistent bridge node named by `bridge`.
///
/// The node is spawned under the control session's own node across a
/// provisional hook pair, renamed, flagged persistent, then cut loose from
/// the session so it stands alone, addressable only by name.
///
/// # Errors
///
/// Aborts on the first failing step; earlier steps are not undone, so a
/// failure after the spawn leaves a node behind that needs a manual
/// shutdown.
pub fn create<C: ControlChannel>(channel: &mut C, bridge: &GraphPath) -> NgResult<()> {
    tracing::debug!(bridge = %bridge, "creating bridge");

    let spawn = MkPeer {
        type_name: NodeKind::Bridge.as_str(),
        our_hook: "lower",
        // a fresh bridge has every slot free, link0 is fine
        peer_hook: ETHER_LOWER_SLOT,
    };
    channel.send(&GraphPath::own(), Cookie::Generic, generic::MKPEER, &spawn.encode()?)?;

    // The rename wants the bare name: its name field is an identifier, not
    // a path, and the kernel rejects a trailing separator there.
    let rename = wire::Name {
        name: bridge.node_name(),
    };
    let own_lower = GraphPath::own().via_hook("lower")?;
    channel.send(&own_lower, Cookie::Generic, generic::NAME, &rename.encode()?)?;

    // Persistence must be set before we detach, or the node dies with the
    // session.
    channel.send(bridge, Cookie::Bridge, wire::bridge::SET_PERSISTENT, &[])?;

    let cut = RmHook {
        our_hook: ETHER_LOWER_SLOT,
    };
    channel.send(bridge, Cookie::Generic, generic::RMHOOK, &cut.encode()?)?;

    tracing::debug!(bridge = %bridge, "bridge created");
    Ok(())
}

/// Attach a physical interface to a freshly created bridge.
///
/// The interface is put in promiscuous mode first; bridging needs it, and
/// a refusal aborts the attach with the interface state unchanged. The two
/// connects then consume the bridge's reserved slots 0 and 1. Both are
/// verified, a hardening over the original tool's fire-and-forget sends;
/// a failed connect aborts with the interface left promiscuous.
///
/// Callers guarantee this runs only directly after [`create`], when both
/// reserved slots are free; that is not re-verified here.
///
/// # Errors
///
/// Returns the first failing step's error; prior steps are not undone.
pub fn attach_ether<C: ControlChannel>(
    channel: &mut C,
    bridge: &GraphPath,
    ether: &GraphPath,
) -> NgResult<()> {
    tracing::debug!(bridge = %bridge, ether = %ether, "attaching ether");

    channel.send(
        ether,
        Cookie::Ether,
        wire::ether::SET_PROMISC,
        &wire::u32_payload(1),
    )?;

    let upper = Connect {
        path: bridge,
        our_hook: "upper",
        peer_hook: ETHER_UPPER_SLOT,
    };
    channel.send(ether, Cookie::Generic, generic::CONNECT, &upper.encode()?)?;

    let lower = Connect {
        path: bridge,
        our_hook: "lower",
        peer_hook: ETHER_LOWER_SLOT,
    };
    channel.send(ether, Cookie::Generic, generic::CONNECT, &lower.encode()?)?;

    tracing::debug!(bridge = %bridge, ether = %ether, "ether attached");
    Ok(())
}

/// Destroy a bridge, detaching whatever is connected to it.
///
/// Every hook is removed best-effort: a failure on one is logged and the
/// rest are still attempted. A physical interface found on `link0` gets
/// its promiscuous flag cleared along the way. The terminal shutdown is
/// issued regardless of how many removals failed. Detached eiface peers
/// survive; they need their own destroy.
///
/// # Errors
///
/// Returns an error only if the hook list cannot be fetched or the final
/// shutdown fails.
pub fn destroy<C: ControlChannel>(channel: &mut C, bridge: &GraphPath) -> NgResult<()> {
    tracing::debug!(bridge = %bridge, "destroying bridge");

    let hooks = hooks::list(channel, bridge)?;
    for link in &hooks.links {
        let rm = RmHook {
            our_hook: &link.our_hook,
        };
        let removed = rm
            .encode()
            .and_then(|payload| channel.send(bridge, Cookie::Generic, generic::RMHOOK, &payload));
        if let Err(err) = removed {
            tracing::warn!(bridge = %bridge, hook = %link.our_hook, %err, "hook removal failed");
        }

        let peer_kind = NodeKind::from_type_name(&link.peer.type_name);
        if peer_kind == NodeKind::Ether && link.our_hook == ETHER_LOWER_SLOT {
            if let Err(err) = clear_promisc(channel, &link.peer.name) {
                tracing::warn!(ether = %link.peer.name, %err, "failed to clear promiscuous mode");
            }
        }
    }

    channel.send(bridge, Cookie::Generic, generic::SHUTDOWN, &[])?;
    tracing::debug!(bridge = %bridge, "bridge shut down");
    Ok(())
}

fn clear_promisc<C: ControlChannel>(channel: &mut C, ether_name: &str) -> NgResult<()> {
    let path = GraphPath::from_kernel_name(ether_name)?;
    channel.send(
        &path,
        Cookie::Ether,
        wire::ether::SET_PROMISC,
        &wire::u32_payload(0),
    )
}
