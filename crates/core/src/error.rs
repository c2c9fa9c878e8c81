//! Error of ringpeer_core

use crate::dht::PeerId;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in ringpeer-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Peer {0} is out of the addressable port range")]
    PeerOutOfRange(PeerId),

    #[error("RingState lock poisoned")]
    RingLockError,

    #[error("PredecessorTracker lock poisoned")]
    PredecessorLockError,

    #[error("ProbeTable lock poisoned")]
    ProbeLockError,

    #[error("Callback lock poisoned")]
    CallbackLockError,

    #[error("Invalid successors ({first}, {second}) for peer {peer}")]
    InvalidSuccessors {
        peer: PeerId,
        first: PeerId,
        second: PeerId,
    },

    #[error("Successors of this peer are not assigned")]
    SuccessorsUnset,

    #[error("Missing message type")]
    MissingTag,

    #[error("Unknown message type {0}")]
    UnknownTag(String),

    #[error("Missing field in {0} message")]
    MissingToken(&'static str),

    #[error("{0} is not a valid number")]
    InvalidToken(String),

    #[error("Unexpected trailing field {0}")]
    TrailingToken(String),

    #[error("Message header exceeds {0} bytes")]
    HeaderTooLong(usize),

    #[error("Couldn't decode data as UTF-8.")]
    Utf8Encoding(#[from] std::string::FromUtf8Error),

    #[error("Awaiting join response, refused {0} message")]
    AwaitingJoin(&'static str),

    #[error("Unexpected {0} message")]
    UnexpectedMessage(&'static str),

    #[error("Invalid filename {0}")]
    InvalidFilename(String),

    #[error("Connect to peer {0} failed: {1}")]
    Connect(PeerId, #[source] std::io::Error),

    #[error("Timed out talking to peer {0}")]
    Timeout(PeerId),

    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lost both successors at once, no peer left to query")]
    BothSuccessorsLost,

    #[error("Recovery query to peer {survivor} about departed peer {departed} failed: {reason}")]
    RecoveryFailed {
        survivor: PeerId,
        departed: PeerId,
        reason: String,
    },
}

impl Error {
    /// Ring inconsistencies leave the successor list in a state the protocol cannot
    /// reason about. The process is expected to terminate on them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::BothSuccessorsLost | Error::RecoveryFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(Error::BothSuccessorsLost.is_fatal());
        assert!(Error::RecoveryFailed {
            survivor: PeerId::new(5),
            departed: PeerId::new(19),
            reason: "connection refused".to_string(),
        }
        .is_fatal());
        assert!(!Error::Timeout(PeerId::new(5)).is_fatal());
        assert!(!Error::UnknownTag("PING".to_string()).is_fatal());
    }
}
