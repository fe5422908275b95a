//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};

use ngnet_common::{GraphPath, LinkAddr, NgError, NodeName};
use ngnet_graph::node::{self, NodeKind};
use ngnet_graph::{NgSocket, SysIfconfig, bridge, eiface, hooks};

/// ngnet - netgraph bridge and eiface management
#[derive(Parser)]
#[command(name = "ngnet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Resource kinds.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage bridge nodes
    Bridge {
        /// The verb to apply
        #[command(subcommand)]
        command: BridgeCommands,
    },

    /// Manage virtual ethernet endpoint nodes
    Eiface {
        /// The verb to apply
        #[command(subcommand)]
        command: EifaceCommands,
    },
}

/// Bridge verbs.
#[derive(Subcommand)]
pub enum BridgeCommands {
    /// Create a persistent bridge, optionally attaching a physical
    /// interface to it
    Create {
        /// Bridge name
        name: String,

        /// Physical interface to attach
        ether: Option<String>,
    },

    /// Detach everything from a bridge and shut it down
    Destroy {
        /// Bridge name
        name: String,
    },
}

/// Eiface verbs.
#[derive(Subcommand)]
pub enum EifaceCommands {
    /// Create a virtual ethernet endpoint on a bridge
    Create {
        /// Bridge to attach to
        bridge: String,

        /// Endpoint name (graph node and OS interface alike)
        name: String,

        /// Link-layer address, colon-separated hex byte pairs
        lladdr: String,
    },

    /// Detach an endpoint and shut it down
    Destroy {
        /// Endpoint name
        name: String,
    },
}

fn parse_path(name: &str) -> Result<GraphPath> {
    let name: NodeName = name.parse()?;
    Ok(GraphPath::from_name(&name))
}

impl Cli {
    /// Execute the CLI command.
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Bridge { command } => match command {
                BridgeCommands::Create { name, ether } => bridge_create(&name, ether.as_deref()),
                BridgeCommands::Destroy { name } => bridge_destroy(&name),
            },
            Commands::Eiface { command } => match command {
                EifaceCommands::Create {
                    bridge,
                    name,
                    lladdr,
                } => eiface_create(&bridge, &name, &lladdr),
                EifaceCommands::Destroy { name } => eiface_destroy(&name),
            },
        }
    }
}

fn bridge_create(name: &str, ether: Option<&str>) -> Result<()> {
    let bridge_path = parse_path(name)?;
    let ether_path = ether.map(parse_path).transpose()?;

    let mut channel = NgSocket::open()?;

    // Racy by nature: names come and go under other sessions. The checks
    // buy a useful diagnostic, not a lock.
    node::check(&mut channel, Some(&bridge_path), NodeKind::Nonexistent)?;
    node::check(&mut channel, ether_path.as_ref(), NodeKind::Ether)?;
    if let Some(ether_path) = &ether_path {
        if hooks::ether_is_connected(&mut channel, ether_path)? {
            return Err(NgError::EtherInUse {
                ether: ether_path.to_string(),
            }
            .into());
        }
    }

    bridge::create(&mut channel, &bridge_path)
        .wrap_err_with(|| format!("failed to create bridge {name}"))?;
    println!("Success: create: {name} bridge");

    let Some(ether_path) = &ether_path else {
        return Ok(());
    };
    // from here on a failure leaves the bridge behind; the operator has
    // to destroy it
    bridge::attach_ether(&mut channel, &bridge_path, ether_path).wrap_err_with(|| {
        format!("failed to attach {ether_path} to bridge {name} (the bridge was created; destroy it if unwanted)")
    })?;
    println!("Success: attach: bridge {name} <-> {ether_path} ether");
    Ok(())
}

fn bridge_destroy(name: &str) -> Result<()> {
    let bridge_path = parse_path(name)?;
    let mut channel = NgSocket::open()?;

    node::check(&mut channel, Some(&bridge_path), NodeKind::Bridge)?;
    bridge::destroy(&mut channel, &bridge_path).wrap_err_with(|| {
        format!("failed to destroy bridge {name} (try `ngctl show {name}:` to see what is attached)")
    })?;
    println!("Success: destroy: {name} bridge");
    Ok(())
}

fn eiface_create(bridge: &str, name: &str, lladdr: &str) -> Result<()> {
    let bridge_path = parse_path(bridge)?;
    let eiface_path = parse_path(name)?;
    let addr = LinkAddr::parse(lladdr)?;

    let mut channel = NgSocket::open()?;
    let os = SysIfconfig;

    node::check(&mut channel, Some(&bridge_path), NodeKind::Bridge)?;
    node::check(&mut channel, Some(&eiface_path), NodeKind::Nonexistent)?;

    eiface::create(&mut channel, &os, &bridge_path, &eiface_path)
        .wrap_err_with(|| format!("failed to create eiface {name}"))?;
    println!("Success: create: {name} eiface");

    // independent of creation: the endpoint stays even if this fails, it
    // just keeps its kernel-assigned address
    eiface::set_lladdr(&os, &eiface_path, &addr)
        .wrap_err_with(|| format!("failed to set link-layer address on eiface {name}"))?;
    Ok(())
}

fn eiface_destroy(name: &str) -> Result<()> {
    let eiface_path = parse_path(name)?;
    let mut channel = NgSocket::open()?;

    node::check(&mut channel, Some(&eiface_path), NodeKind::Eiface)?;
    eiface::destroy(&mut channel, &eiface_path)
        .wrap_err_with(|| format!("failed to destroy eiface {name}"))?;
    println!("Success: destroy: {name} eiface");
    Ok(())
}
