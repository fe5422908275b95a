//! OS interface-configuration primitives.
//!
//! The graph node name and the OS interface name live in different
//! namespaces; these calls work on the OS side, keyed by the OS-visible
//! interface name. Each call opens its own configuration socket and
//! releases it before returning.

use ngnet_common::{LinkAddr, NgResult};

/// OS-side interface configuration.
pub trait Ifconfig {
    /// Rename a network interface.
    ///
    /// # Errors
    ///
    /// Returns an I/O or unsupported-platform error.
    fn rename(&self, from: &str, to: &str) -> NgResult<()>;

    /// Install a link-layer address on an interface.
    ///
    /// # Errors
    ///
    /// Returns an I/O or unsupported-platform error.
    fn set_lladdr(&self, name: &str, addr: &LinkAddr) -> NgResult<()>;
}

pub use sys::SysIfconfig;

#[cfg(target_os = "freebsd")]
mod sys {
    use std::io;

    use ngnet_common::{LinkAddr, NgError, NgResult};

    use super::Ifconfig;

    const IFNAMSIZ: usize = 16;
    const AF_LINK: u8 = 18;

    // _IOW('i', 40/60, struct ifreq), 32-byte ifreq
    const SIOCSIFNAME: libc::c_ulong = 0x8020_6928;
    const SIOCSIFLLADDR: libc::c_ulong = 0x8020_693c;

    #[repr(C)]
    #[derive(Clone, Copy)]
    struct SockAddr {
        sa_len: u8,
        sa_family: u8,
        sa_data: [u8; 14],
    }

    #[repr(C)]
    union IfrIfru {
        data: *mut libc::c_char,
        addr: SockAddr,
    }

    #[repr(C)]
    struct IfReq {
        name: [u8; IFNAMSIZ],
        ifru: IfrIfru,
    }

    fn name_field(name: &str) -> NgResult<[u8; IFNAMSIZ]> {
        if name.len() >= IFNAMSIZ {
            return Err(NgError::Encode {
                field: "ifr_name".to_string(),
                value: name.to_string(),
            });
        }
        let mut field = [0u8; IFNAMSIZ];
        field[..name.len()].copy_from_slice(name.as_bytes());
        Ok(field)
    }

    fn with_config_socket<T>(op: impl FnOnce(libc::c_int) -> NgResult<T>) -> NgResult<T> {
        let fd = unsafe { libc::socket(libc::AF_LOCAL, libc::SOCK_DGRAM, 0) };
        if fd == -1 {
            return Err(NgError::Io(io::Error::last_os_error()));
        }
        let result = op(fd);
        // released right away; only the graph control socket spans the
        // whole invocation
        unsafe { libc::close(fd) };
        result
    }

    /// The real ioctl-backed implementation.
    pub struct SysIfconfig;

    impl Ifconfig for SysIfconfig {
        fn rename(&self, from: &str, to: &str) -> NgResult<()> {
            tracing::debug!(from, to, "renaming interface");
            let mut new_name = name_field(to)?;
            let mut req = IfReq {
                name: name_field(from)?,
                ifru: IfrIfru {
                    data: new_name.as_mut_ptr().cast(),
                },
            };
            with_config_socket(|fd| {
                let rc = unsafe { libc::ioctl(fd, SIOCSIFNAME, &mut req) };
                if rc == -1 {
                    return Err(NgError::Io(io::Error::last_os_error()));
                }
                Ok(())
            })
        }

        fn set_lladdr(&self, name: &str, addr: &LinkAddr) -> NgResult<()> {
            tracing::debug!(name, addr = %addr, "setting link-layer address");
            addr.check_capacity()?;
            let mut sa = SockAddr {
                sa_len: addr.len() as u8,
                sa_family: AF_LINK,
                sa_data: [0u8; 14],
            };
            sa.sa_data[..addr.len()].copy_from_slice(addr.as_bytes());
            let mut req = IfReq {
                name: name_field(name)?,
                ifru: IfrIfru { addr: sa },
            };
            with_config_socket(|fd| {
                let rc = unsafe { libc::ioctl(fd, SIOCSIFLLADDR, &mut req) };
                if rc == -1 {
                    return Err(NgError::Io(io::Error::last_os_error()));
                }
                Ok(())
            })
        }
    }
}

#[cfg(not(target_os = "freebsd"))]
mod sys {
    use ngnet_common::{LinkAddr, NgError, NgResult};

    use super::Ifconfig;

    /// Stand-in on platforms without the interface ioctls.
    pub struct SysIfconfig;

    impl Ifconfig for SysIfconfig {
        fn rename(&self, _from: &str, _to: &str) -> NgResult<()> {
            Err(NgError::Unsupported {
                feature: "interface rename".to_string(),
            })
        }

        fn set_lladdr(&self, _name: &str, _addr: &LinkAddr) -> NgResult<()> {
            Err(NgError::Unsupported {
                feature: "link-layer address assignment".to_string(),
            })
        }
    }
}
