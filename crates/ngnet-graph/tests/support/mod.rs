//! An in-memory graph standing in for the kernel graph manager.
//!
//! Interprets the same commands the kernel would, against a small node
//! store, and answers with the same fixed-width reply layouts. Enough to
//! run the lifecycle protocols end to end without a netgraph kernel.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use ngnet_common::{GraphPath, LinkAddr, NgError, NgResult};
use ngnet_graph::channel::ControlChannel;
use ngnet_graph::ifconfig::Ifconfig;
use ngnet_graph::wire::{self, Cookie, HOOK_SIZ, NODE_SIZ, NodeInfo, PATH_SIZ, generic};

const SESSION_ID: u32 = 0;

pub struct FakeNode {
    pub name: String,
    pub type_name: String,
    pub hooks: BTreeMap<String, (u32, String)>,
    pub persistent: bool,
    pub promisc: bool,
}

pub struct FakeGraph {
    nodes: BTreeMap<u32, FakeNode>,
    next_id: u32,
    eiface_seq: u32,
    replies: VecDeque<Vec<u8>>,
    /// Hook name whose next removal is refused, for best-effort tests.
    pub fail_rmhook_once: Option<String>,
}

impl FakeGraph {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            SESSION_ID,
            FakeNode {
                name: String::new(),
                type_name: "socket".to_string(),
                hooks: BTreeMap::new(),
                persistent: false,
                promisc: false,
            },
        );
        Self {
            nodes,
            next_id: 1,
            eiface_seq: 0,
            replies: VecDeque::new(),
            fail_rmhook_once: None,
        }
    }

    pub fn add_ether(&mut self, name: &str) -> u32 {
        self.add_node(name, "ether")
    }

    pub fn add_node(&mut self, name: &str, type_name: &str) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            FakeNode {
                name: name.to_string(),
                type_name: type_name.to_string(),
                hooks: BTreeMap::new(),
                persistent: false,
                promisc: false,
            },
        );
        id
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_by_name(name).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 // the session node doesn't count
    }

    pub fn promisc(&self, name: &str) -> bool {
        self.node_by_name(name).is_some_and(|(_, n)| n.promisc)
    }

    pub fn persistent(&self, name: &str) -> bool {
        self.node_by_name(name).is_some_and(|(_, n)| n.persistent)
    }

    /// Hooks of a node as (our hook, peer name, peer hook), sorted.
    pub fn hooks_of(&self, name: &str) -> Vec<(String, String, String)> {
        let Some((_, node)) = self.node_by_name(name) else {
            return Vec::new();
        };
        node.hooks
            .iter()
            .map(|(hook, (peer, peer_hook))| {
                let peer_name = self.nodes[peer].name.clone();
                (hook.clone(), peer_name, peer_hook.clone())
            })
            .collect()
    }

    fn node_by_name(&self, name: &str) -> Option<(u32, &FakeNode)> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, node)| (*id, node))
    }

    fn resolve_path(&self, path: &str) -> Option<u32> {
        let (name, hook) = path.split_once(':')?;
        let base = if name == "." {
            SESSION_ID
        } else {
            self.node_by_name(name)?.0
        };
        if hook.is_empty() {
            return Some(base);
        }
        self.nodes[&base].hooks.get(hook).map(|(peer, _)| *peer)
    }

    fn connect(&mut self, a: u32, a_hook: &str, b: u32, b_hook: &str) {
        self.nodes
            .get_mut(&a)
            .unwrap()
            .hooks
            .insert(a_hook.to_string(), (b, b_hook.to_string()));
        self.nodes
            .get_mut(&b)
            .unwrap()
            .hooks
            .insert(b_hook.to_string(), (a, a_hook.to_string()));
    }

    fn disconnect(&mut self, id: u32, hook: &str) {
        let Some((peer, peer_hook)) = self.nodes.get_mut(&id).unwrap().hooks.remove(hook) else {
            return;
        };
        if let Some(peer_node) = self.nodes.get_mut(&peer) {
            peer_node.hooks.remove(&peer_hook);
        }
    }

    fn info_bytes(&self, id: u32) -> Vec<u8> {
        let node = &self.nodes[&id];
        encode_node_info(&node.name, &node.type_name, id, node.hooks.len() as u32)
    }

    fn hook_list_bytes(&self, id: u32) -> Vec<u8> {
        let node = &self.nodes[&id];
        let mut buf = self.info_bytes(id);
        for (hook, (peer, peer_hook)) in &node.hooks {
            let mut entry = vec![0u8; 2 * HOOK_SIZ];
            entry[..hook.len()].copy_from_slice(hook.as_bytes());
            entry[HOOK_SIZ..HOOK_SIZ + peer_hook.len()].copy_from_slice(peer_hook.as_bytes());
            buf.extend_from_slice(&entry);
            buf.extend_from_slice(&self.info_bytes(*peer));
        }
        buf
    }

    fn mkpeer(&mut self, target: u32, payload: &[u8]) -> NgResult<()> {
        let type_name = read_str(payload, 0, NODE_SIZ);
        let our_hook = read_str(payload, NODE_SIZ, HOOK_SIZ);
        let peer_hook = read_str(payload, NODE_SIZ + HOOK_SIZ, HOOK_SIZ);
        // eifaces come up with a kernel-assigned name that doubles as the
        // OS interface name; other nodes start unnamed
        let name = if type_name == "eiface" {
            let seq = self.eiface_seq;
            self.eiface_seq += 1;
            format!("ngeth{seq}")
        } else {
            String::new()
        };
        let id = self.add_node(&name, &type_name);
        self.connect(target, &our_hook, id, &peer_hook);
        Ok(())
    }

    fn shutdown(&mut self, id: u32) {
        let hooks: Vec<String> = self.nodes[&id].hooks.keys().cloned().collect();
        for hook in hooks {
            self.disconnect(id, &hook);
        }
        self.nodes.remove(&id);
    }
}

impl ControlChannel for FakeGraph {
    fn send(
        &mut self,
        target: &GraphPath,
        cookie: Cookie,
        command: u32,
        payload: &[u8],
    ) -> NgResult<()> {
        let Some(id) = self.resolve_path(target.as_str()) else {
            return Err(NgError::NoSuchNode {
                path: target.to_string(),
            });
        };
        match (cookie, command) {
            (Cookie::Generic, generic::NODEINFO) => {
                let reply = self.info_bytes(id);
                self.replies.push_back(reply);
                Ok(())
            }
            (Cookie::Generic, generic::LISTHOOKS) => {
                let reply = self.hook_list_bytes(id);
                self.replies.push_back(reply);
                Ok(())
            }
            (Cookie::Generic, generic::MKPEER) => self.mkpeer(id, payload),
            (Cookie::Generic, generic::CONNECT) => {
                let path = read_str(payload, 0, PATH_SIZ);
                let our_hook = read_str(payload, PATH_SIZ, HOOK_SIZ);
                let peer_hook = read_str(payload, PATH_SIZ + HOOK_SIZ, HOOK_SIZ);
                let Some(far) = self.resolve_path(&path) else {
                    return Err(NgError::NoSuchNode { path });
                };
                self.connect(id, &our_hook, far, &peer_hook);
                Ok(())
            }
            (Cookie::Generic, generic::NAME) => {
                let name = read_str(payload, 0, NODE_SIZ);
                self.nodes.get_mut(&id).unwrap().name = name;
                Ok(())
            }
            (Cookie::Generic, generic::RMHOOK) => {
                let hook = read_str(payload, 0, HOOK_SIZ);
                if self.fail_rmhook_once.as_deref() == Some(hook.as_str()) {
                    self.fail_rmhook_once = None;
                    return Err(NgError::Channel {
                        message: format!("removal of {hook} refused"),
                    });
                }
                self.disconnect(id, &hook);
                Ok(())
            }
            (Cookie::Generic, generic::SHUTDOWN) => {
                self.shutdown(id);
                Ok(())
            }
            (Cookie::Bridge, wire::bridge::SET_PERSISTENT) => {
                self.nodes.get_mut(&id).unwrap().persistent = true;
                Ok(())
            }
            (Cookie::Ether, wire::ether::SET_PROMISC) => {
                let on = u32::from_ne_bytes(payload[..4].try_into().unwrap()) != 0;
                self.nodes.get_mut(&id).unwrap().promisc = on;
                Ok(())
            }
            _ => Err(NgError::Channel {
                message: format!("unhandled command {command} for cookie {cookie:?}"),
            }),
        }
    }

    fn receive(&mut self) -> NgResult<Vec<u8>> {
        self.replies.pop_front().ok_or_else(|| NgError::Channel {
            message: "no pending reply".to_string(),
        })
    }
}

fn encode_node_info(name: &str, type_name: &str, id: u32, hooks: u32) -> Vec<u8> {
    let mut buf = vec![0u8; NodeInfo::WIRE_LEN];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    buf[NODE_SIZ..NODE_SIZ + type_name.len()].copy_from_slice(type_name.as_bytes());
    buf[2 * NODE_SIZ..2 * NODE_SIZ + 4].copy_from_slice(&id.to_ne_bytes());
    buf[2 * NODE_SIZ + 4..].copy_from_slice(&hooks.to_ne_bytes());
    buf
}

fn read_str(payload: &[u8], offset: usize, width: usize) -> String {
    let field = &payload[offset..offset + width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Records OS-side interface configuration calls.
#[derive(Default)]
pub struct FakeIfconfig {
    pub renames: RefCell<Vec<(String, String)>>,
    pub lladdrs: RefCell<Vec<(String, LinkAddr)>>,
}

impl Ifconfig for FakeIfconfig {
    fn rename(&self, from: &str, to: &str) -> NgResult<()> {
        self.renames
            .borrow_mut()
            .push((from.to_string(), to.to_string()));
        Ok(())
    }

    fn set_lladdr(&self, name: &str, addr: &LinkAddr) -> NgResult<()> {
        self.lladdrs
            .borrow_mut()
            .push((name.to_string(), addr.clone()));
        Ok(())
    }
}
