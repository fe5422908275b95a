//! Virtual ethernet endpoint (eiface) lifecycle.
//!
//! An eiface pairs a graph node with an OS network interface, so creating
//! one converges two independent rename operations, one per namespace, on
//! the same externally visible name. Neither create nor the later address
//! assignment is transactional; documented partial states are left in
//! place on failure.

use ngnet_common::{GraphPath, LinkAddr, NgResult};

use crate::channel::ControlChannel;
use crate::hooks;
use crate::ifconfig::Ifconfig;
use crate::node::NodeKind;
use crate::wire::{self, Cookie, MkPeer, NodeInfo, RmHook, generic};

/// Create an eiface on the lowest free link slot of `bridge` and give it
/// the name `eiface` in both the graph and OS namespaces.
///
/// The kernel assigns the fresh node a default name (also its initial OS
/// interface name), learned here with a descriptor query through the
/// bridge's new hook. Rename failures leave a partially named endpoint:
/// spawned and attached, but still carrying a kernel name in one or both
/// namespaces. Nothing is rolled back.
///
/// # Errors
///
/// Returns the first failing step's error.
pub fn create<C: ControlChannel, I: Ifconfig>(
    channel: &mut C,
    os: &I,
    bridge: &GraphPath,
    eiface: &GraphPath,
) -> NgResult<()> {
    tracing::debug!(bridge = %bridge, eiface = %eiface, "creating eiface");

    let slot = hooks::lowest_free_slot(channel, bridge)?;
    let our_hook = slot.hook_name();

    let spawn = MkPeer {
        type_name: NodeKind::Eiface.as_str(),
        our_hook: &our_hook,
        peer_hook: "ether",
    };
    channel.send(bridge, Cookie::Generic, generic::MKPEER, &spawn.encode()?)?;

    // learn the kernel-assigned name through the hook we just made
    let via_slot = bridge.via_hook(&our_hook)?;
    channel.send(&via_slot, Cookie::Generic, generic::NODEINFO, &[])?;
    let info = NodeInfo::decode(&channel.receive()?)?;

    // graph rename, addressed by the kernel name; bare name in the payload
    let kernel_path = GraphPath::from_kernel_name(&info.name)?;
    let rename = wire::Name {
        name: eiface.node_name(),
    };
    channel.send(&kernel_path, Cookie::Generic, generic::NAME, &rename.encode()?)?;

    // OS rename, the second namespace
    os.rename(&info.name, eiface.node_name())?;

    tracing::debug!(eiface = %eiface, slot = %slot, "eiface created");
    Ok(())
}

/// Install a link-layer address on an existing eiface.
///
/// Independent of and subsequent to [`create`]; a failure here leaves the
/// endpoint alive with its kernel-assigned default address.
///
/// # Errors
///
/// Returns [`ngnet_common::NgError::LinkAddrTooLarge`] before touching the
/// interface if the address does not fit the OS field, otherwise any I/O
/// error from the configuration call.
pub fn set_lladdr<I: Ifconfig>(os: &I, eiface: &GraphPath, addr: &LinkAddr) -> NgResult<()> {
    addr.check_capacity()?;
    os.set_lladdr(eiface.node_name(), addr)
}

/// Destroy an eiface: detach its hook (there is one or zero) best-effort,
/// then shut the node down.
///
/// # Errors
///
/// Returns an error only if the hook list cannot be fetched or the final
/// shutdown fails.
pub fn destroy<C: ControlChannel>(channel: &mut C, eiface: &GraphPath) -> NgResult<()> {
    tracing::debug!(eiface = %eiface, "destroying eiface");

    let hooks = hooks::list(channel, eiface)?;
    for link in &hooks.links {
        let rm = RmHook {
            our_hook: &link.our_hook,
        };
        let removed = rm
            .encode()
            .and_then(|payload| channel.send(eiface, Cookie::Generic, generic::RMHOOK, &payload));
        if let Err(err) = removed {
            tracing::warn!(eiface = %eiface, hook = %link.our_hook, %err, "hook removal failed");
        }
    }

    channel.send(eiface, Cookie::Generic, generic::SHUTDOWN, &[])?;
    tracing::debug!(eiface = %eiface, "eiface shut down");
    Ok(())
}
