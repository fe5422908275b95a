//! Common error types for the ngnet tools.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`NgError`].
pub type NgResult<T> = Result<T, NgError>;

/// Common errors across the ngnet tools.
#[derive(Error, Diagnostic, Debug)]
pub enum NgError {
    /// Node name failed validation.
    #[error("Invalid node name: {name}")]
    #[diagnostic(
        code(ngnet::name::invalid),
        help("Node names must be 1-15 characters composed of a-zA-Z0-9 or '-'")
    )]
    InvalidNodeName {
        /// The rejected name.
        name: String,
    },

    /// A graph path would exceed the kernel's path field.
    #[error("Graph path too long: {path}")]
    #[diagnostic(code(ngnet::name::path_too_long))]
    PathTooLong {
        /// The overlong path.
        path: String,
    },

    /// Link-layer address string failed validation.
    #[error("Invalid link-layer address: {value}")]
    #[diagnostic(
        code(ngnet::lladdr::invalid),
        help("Expected colon-separated hex byte pairs, e.g. 02:a1:b2:c3:d4:e5")
    )]
    InvalidLinkAddr {
        /// The rejected address string.
        value: String,
    },

    /// Link-layer address does not fit the OS address field.
    #[error("Link-layer address too large: {value} ({len} bytes)")]
    #[diagnostic(code(ngnet::lladdr::too_large))]
    LinkAddrTooLarge {
        /// The address in textual form.
        value: String,
        /// Its encoded length in bytes.
        len: usize,
    },

    /// The kernel reported that the addressed node does not exist.
    #[error("No such node: {path}")]
    #[diagnostic(code(ngnet::graph::no_such_node))]
    NoSuchNode {
        /// The path that failed to resolve.
        path: String,
    },

    /// Control channel transport failure.
    #[error("Control channel error: {message}")]
    #[diagnostic(code(ngnet::channel))]
    Channel {
        /// What went wrong on the channel.
        message: String,
    },

    /// A request field does not fit its fixed wire width.
    #[error("Overlong {field} in request: {value}")]
    #[diagnostic(code(ngnet::channel::encode))]
    Encode {
        /// Which request field overflowed.
        field: String,
        /// The offending value.
        value: String,
    },

    /// A response payload could not be decoded.
    #[error("Malformed response: {message}")]
    #[diagnostic(code(ngnet::channel::decode))]
    Decode {
        /// What was wrong with the payload.
        message: String,
    },

    /// Operand missing or of the wrong kind.
    #[error("{node} doesn't exist, or isn't a {expected} (found {actual})")]
    #[diagnostic(code(ngnet::graph::wrong_kind))]
    WrongKind {
        /// The checked node reference.
        node: String,
        /// The kind actually observed.
        actual: String,
        /// The kind the operation requires.
        expected: String,
    },

    /// Target name is already taken.
    #[error("{node} already exists ({kind})")]
    #[diagnostic(code(ngnet::graph::already_exists))]
    AlreadyExists {
        /// The checked node reference.
        node: String,
        /// The kind of the existing node.
        kind: String,
    },

    /// Every numbered bridge link is occupied.
    #[error("No free link on bridge {bridge}")]
    #[diagnostic(code(ngnet::bridge::links_exhausted))]
    LinksExhausted {
        /// The bridge whose link namespace is full.
        bridge: String,
    },

    /// A physical interface is already attached to a bridge.
    #[error("{ether} already connected to a bridge")]
    #[diagnostic(code(ngnet::bridge::ether_in_use))]
    EtherInUse {
        /// The interface that is already attached.
        ether: String,
    },

    /// Feature not supported on this platform.
    #[error("Feature not supported: {feature}")]
    #[diagnostic(
        code(ngnet::unsupported),
        help("This tool drives the FreeBSD netgraph(4) subsystem")
    )]
    Unsupported {
        /// The unsupported feature.
        feature: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(ngnet::io))]
    Io(#[from] std::io::Error),
}
