//! The control channel to the kernel graph manager.
//!
//! One channel is one request/response session: strictly synchronous,
//! half-duplex, no pipelining. Every logical operation is exactly one send
//! followed by zero or one receive; decoding the reply bytes into a typed
//! structure is the caller's job (see [`crate::wire`]).

use ngnet_common::{GraphPath, NgResult};

use crate::wire::Cookie;

/// A synchronous request/response session with the graph manager.
pub trait ControlChannel {
    /// Send one command to the node addressed by `target`.
    ///
    /// A "no such node" condition surfaces here, at send time, as
    /// [`ngnet_common::NgError::NoSuchNode`]; address resolution happens
    /// when the request is queued, not when it is answered.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the request cannot be delivered.
    fn send(
        &mut self,
        target: &GraphPath,
        cookie: Cookie,
        command: u32,
        payload: &[u8],
    ) -> NgResult<()>;

    /// Receive the reply to the last sent command, as raw payload bytes.
    ///
    /// # Errors
    ///
    /// Returns a channel error on transport failure or a malformed frame.
    fn receive(&mut self) -> NgResult<Vec<u8>>;
}

pub use sys::NgSocket;

#[cfg(target_os = "freebsd")]
mod sys {
    use std::io;

    use ngnet_common::{GraphPath, NgError, NgResult};

    use crate::wire::Cookie;

    use super::ControlChannel;

    const AF_NETGRAPH: libc::c_int = 32;
    const NG_CONTROL: libc::c_int = 2;
    const NG_VERSION: u8 = 8;
    const NGF_RESP: u32 = 1;

    /// ng_msghdr: version, spare bytes, arglen, cmd, flags, token,
    /// typecookie, cmdstr[32].
    const HDR_LEN: usize = 4 + 4 * 5 + 32;

    /// A control socket bound to a process-scoped identity (`ngctl<pid>`).
    ///
    /// The identity must be unique among concurrent users of the graph
    /// subsystem; a bind collision is a fatal setup error. The socket
    /// lives for the whole invocation and closes on drop.
    pub struct NgSocket {
        fd: libc::c_int,
        token: u32,
    }

    impl NgSocket {
        /// Open a control socket and bind its session identity.
        ///
        /// # Errors
        ///
        /// Returns a channel error if the socket cannot be created or the
        /// identity is already taken.
        pub fn open() -> NgResult<Self> {
            let fd = unsafe { libc::socket(AF_NETGRAPH, libc::SOCK_DGRAM, NG_CONTROL) };
            if fd == -1 {
                return Err(NgError::Channel {
                    message: format!(
                        "failed to open netgraph control socket: {}",
                        io::Error::last_os_error()
                    ),
                });
            }
            let name = format!("ngctl{}", std::process::id());
            if let Err(err) = bind_name(fd, &name) {
                unsafe { libc::close(fd) };
                return Err(err);
            }
            tracing::debug!(name, "netgraph control socket open");
            Ok(Self { fd, token: 0 })
        }
    }

    fn bind_name(fd: libc::c_int, name: &str) -> NgResult<()> {
        // struct sockaddr_ng: sg_len, sg_family, then the node name
        let mut addr = [0u8; 2 + 64];
        let len = 2 + name.len() + 1;
        addr[0] = len as u8;
        addr[1] = AF_NETGRAPH as u8;
        addr[2..2 + name.len()].copy_from_slice(name.as_bytes());
        let rc = unsafe {
            libc::bind(
                fd,
                addr.as_ptr().cast::<libc::sockaddr>(),
                len as libc::socklen_t,
            )
        };
        if rc == -1 {
            let err = io::Error::last_os_error();
            let message = if err.raw_os_error() == Some(libc::EADDRINUSE) {
                format!("session identity {name} already in use")
            } else {
                format!("failed to bind session identity {name}: {err}")
            };
            return Err(NgError::Channel { message });
        }
        Ok(())
    }

    fn target_addr(path: &GraphPath) -> ([u8; 2 + crate::wire::PATH_SIZ], usize) {
        let mut addr = [0u8; 2 + crate::wire::PATH_SIZ];
        let bytes = path.as_str().as_bytes();
        let len = 2 + bytes.len() + 1;
        addr[0] = len as u8;
        addr[1] = AF_NETGRAPH as u8;
        addr[2..2 + bytes.len()].copy_from_slice(bytes);
        (addr, len)
    }

    impl ControlChannel for NgSocket {
        fn send(
            &mut self,
            target: &GraphPath,
            cookie: Cookie,
            command: u32,
            payload: &[u8],
        ) -> NgResult<()> {
            self.token = self.token.wrapping_add(1);

            let mut msg = vec![0u8; HDR_LEN + payload.len()];
            msg[0] = NG_VERSION;
            msg[4..8].copy_from_slice(&(payload.len() as u32).to_ne_bytes());
            msg[8..12].copy_from_slice(&command.to_ne_bytes());
            // flags stay zero on an original request
            msg[16..20].copy_from_slice(&self.token.to_ne_bytes());
            msg[20..24].copy_from_slice(&cookie.value().to_ne_bytes());
            msg[HDR_LEN..].copy_from_slice(payload);

            let (addr, addr_len) = target_addr(target);
            tracing::debug!(target = %target, cookie = cookie.value(), command, "send");
            let rc = unsafe {
                libc::sendto(
                    self.fd,
                    msg.as_ptr().cast(),
                    msg.len(),
                    0,
                    addr.as_ptr().cast::<libc::sockaddr>(),
                    addr_len as libc::socklen_t,
                )
            };
            if rc == -1 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::ENOENT) {
                    return Err(NgError::NoSuchNode {
                        path: target.to_string(),
                    });
                }
                return Err(NgError::Channel {
                    message: format!("send to {target} failed: {err}"),
                });
            }
            Ok(())
        }

        fn receive(&mut self) -> NgResult<Vec<u8>> {
            // large enough for a full hook list of a maxed-out bridge
            let mut buf = vec![0u8; 8192];
            let rc = unsafe { libc::recv(self.fd, buf.as_mut_ptr().cast(), buf.len(), 0) };
            if rc == -1 {
                return Err(NgError::Channel {
                    message: format!("receive failed: {}", io::Error::last_os_error()),
                });
            }
            let got = rc as usize;
            if got < HDR_LEN {
                return Err(NgError::Channel {
                    message: format!("short control frame: {got} bytes"),
                });
            }
            let arglen =
                u32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
            let flags = u32::from_ne_bytes([buf[12], buf[13], buf[14], buf[15]]);
            if flags & NGF_RESP == 0 {
                return Err(NgError::Channel {
                    message: "unexpected non-response control frame".to_string(),
                });
            }
            if got < HDR_LEN + arglen {
                return Err(NgError::Channel {
                    message: format!(
                        "truncated control frame: {got} bytes for arglen {arglen}"
                    ),
                });
            }
            buf.truncate(HDR_LEN + arglen);
            buf.drain(..HDR_LEN);
            Ok(buf)
        }
    }

    impl Drop for NgSocket {
        fn drop(&mut self) {
            unsafe { libc::close(self.fd) };
        }
    }
}

#[cfg(not(target_os = "freebsd"))]
mod sys {
    use ngnet_common::{GraphPath, NgError, NgResult};

    use crate::wire::Cookie;

    use super::ControlChannel;

    /// Stand-in on platforms without netgraph; every call reports
    /// [`NgError::Unsupported`].
    pub struct NgSocket;

    impl NgSocket {
        /// Open a control socket.
        ///
        /// # Errors
        ///
        /// Always returns [`NgError::Unsupported`] on this platform.
        pub fn open() -> NgResult<Self> {
            Err(NgError::Unsupported {
                feature: "netgraph control socket".to_string(),
            })
        }
    }

    impl ControlChannel for NgSocket {
        fn send(
            &mut self,
            _target: &GraphPath,
            _cookie: Cookie,
            _command: u32,
            _payload: &[u8],
        ) -> NgResult<()> {
            Err(NgError::Unsupported {
                feature: "netgraph control socket".to_string(),
            })
        }

        fn receive(&mut self) -> NgResult<Vec<u8>> {
            Err(NgError::Unsupported {
                feature: "netgraph control socket".to_string(),
            })
        }
    }
}
