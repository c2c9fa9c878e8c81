#![warn(missing_docs)]

//! Identities on the ring.
//!
//! Peers and files share one integer id space. Membership routing compares [PeerId]s
//! with plain integer ordering: the ring is a sorted chain, there is no modular
//! wraparound when a peer joins or departs. File placement is the only place ids are
//! hashed, see [FileId::hash].

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::consts::HASH_MODULUS;
use crate::error::Error;
use crate::error::Result;

/// Identity of a peer, also the offset of its ports from the base ports.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct PeerId(u32);

/// Identity of a file stored on the ring.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct FileId(u32);

impl PeerId {
    /// Wrap a raw id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl FileId {
    /// Wrap a raw file id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw file id.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Position of the file on the ring, `file_id mod 256`.
    pub const fn hash(&self) -> u32 {
        self.0 % HASH_MODULUS
    }
}

impl From<u32> for PeerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<u32> for FileId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a non-negative decimal token. Anything else resolves to
/// [Error::InvalidToken], so callers can reject the message without crashing.
pub(crate) fn parse_token<T: FromStr>(token: &str) -> Result<T> {
    token
        .parse::<T>()
        .map_err(|_| Error::InvalidToken(token.to_string()))
}

impl FromStr for PeerId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        parse_token::<u32>(s).map(Self)
    }
}

impl FromStr for FileId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        parse_token::<u32>(s).map(Self)
    }
}
