//! Link-layer address parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::{NgError, NgResult};

/// An owned link-layer address, parsed from the textual
/// `bb:bb:bb:bb:bb:bb` form of colon-separated hex byte pairs.
///
/// No attempt is made to check that the address is unused on the local
/// segment; picking something unique is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkAddr(Vec<u8>);

impl LinkAddr {
    /// Capacity of the OS socket-address data field an address must fit
    /// when it is installed on an interface.
    pub const MAX_LENGTH: usize = 14;

    /// Parse a colon-separated hex-byte address string.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::InvalidLinkAddr`] unless every group is exactly
    /// two hex digits and there is at least one group.
    pub fn parse(value: &str) -> NgResult<Self> {
        let invalid = || NgError::InvalidLinkAddr {
            value: value.to_string(),
        };
        if value.is_empty() {
            return Err(invalid());
        }
        let mut bytes = Vec::new();
        for group in value.split(':') {
            if group.len() != 2 {
                return Err(invalid());
            }
            let byte = u8::from_str_radix(group, 16).map_err(|_| invalid())?;
            bytes.push(byte);
        }
        Ok(Self(bytes))
    }

    /// The raw address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encoded length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the address is empty. It never is; `parse` rejects that.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check the address against the OS address-field capacity.
    ///
    /// # Errors
    ///
    /// Returns [`NgError::LinkAddrTooLarge`] if the encoded form exceeds
    /// [`Self::MAX_LENGTH`].
    pub fn check_capacity(&self) -> NgResult<()> {
        if self.0.len() > Self::MAX_LENGTH {
            return Err(NgError::LinkAddrTooLarge {
                value: self.to_string(),
                len: self.0.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for LinkAddr {
    type Err = NgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
