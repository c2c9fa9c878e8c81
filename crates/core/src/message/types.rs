#![warn(missing_docs)]
//! This module defines the messages exchanged between peers.
//!
//! Both protocols are text framed: whitespace delimited tokens, the first token names
//! the message. Control messages travel over TCP, one header per line. The header of a
//! [Transfer] ends with a NUL byte instead, the raw file bytes follow it on the same
//! stream. Ping messages travel over UDP, one per datagram.

use std::str::FromStr;
use std::str::SplitWhitespace;

use crate::dht::id::parse_token;
use crate::dht::FileId;
use crate::dht::PeerId;
use crate::error::Error;
use crate::error::Result;

/// Ask a peer to place `peer` on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequest {
    /// The joining peer.
    pub peer: PeerId,
}

/// Successors of a peer that just joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResponse {
    /// First successor of the joiner.
    pub first: PeerId,
    /// Second successor of the joiner.
    pub second: PeerId,
}

/// Graceful departure of `peer`, carrying its successors so predecessors can splice
/// them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerDepart {
    /// The departing peer.
    pub peer: PeerId,
    /// First successor of the departing peer.
    pub first: PeerId,
    /// Second successor of the departing peer.
    pub second: PeerId,
}

/// Sent to the surviving successor after the other one stopped answering heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryQuery {
    /// The peer repairing its successors.
    pub asking: PeerId,
    /// The peer that left abruptly.
    pub departed: PeerId,
}

/// Answer of a [RecoveryQuery], on the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReply {
    /// First successor of the answering peer.
    pub first: PeerId,
}

/// Place a file on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreRequest {
    /// The file to place.
    pub file: FileId,
    /// Peer that issued the request.
    pub requester: PeerId,
}

/// Look a file up on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveRequest {
    /// The file to look up.
    pub file: FileId,
    /// Peer the file has to be sent to.
    pub requester: PeerId,
}

/// Header of a file transfer, the payload follows on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// The transferred file.
    pub file: FileId,
    /// Name of the file variant, without directories.
    pub filename: String,
}

/// A collection of control messages for unified management.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ControlMessage {
    /// `JOIN_REQUEST <peer>`
    JoinRequest(JoinRequest),
    /// `JOIN_RESPONSE <first> <second>`
    JoinResponse(JoinResponse),
    /// `PEER_DEPART <peer> <first> <second>`
    PeerDepart(PeerDepart),
    /// `RECOVERY_QUERY <asking> <departed>`
    RecoveryQuery(RecoveryQuery),
    /// `RECOVERY_QUERY <first>`
    RecoveryReply(RecoveryReply),
    /// `STORE <file> <requester>`
    Store(StoreRequest),
    /// `RETRIEVE <file> <requester>`
    Retrieve(RetrieveRequest),
    /// `TRANSFER <file> <filename>`
    Transfer(Transfer),
}

/// Heartbeat datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMessage {
    /// `REQUEST <seq> <sender>`
    Request {
        /// Sequence number of the probe.
        seq: u64,
        /// Probing peer.
        sender: PeerId,
    },
    /// `ACKNOWLEDGE <seq> <sender>`
    Acknowledge {
        /// Sequence number of the answered probe.
        seq: u64,
        /// Answering peer.
        sender: PeerId,
    },
}

impl ControlMessage {
    /// Wire tag of the message.
    pub fn tag(&self) -> &'static str {
        match self {
            ControlMessage::JoinRequest(_) => "JOIN_REQUEST",
            ControlMessage::JoinResponse(_) => "JOIN_RESPONSE",
            ControlMessage::PeerDepart(_) => "PEER_DEPART",
            ControlMessage::RecoveryQuery(_) | ControlMessage::RecoveryReply(_) => "RECOVERY_QUERY",
            ControlMessage::Store(_) => "STORE",
            ControlMessage::Retrieve(_) => "RETRIEVE",
            ControlMessage::Transfer(_) => "TRANSFER",
        }
    }

    /// Header bytes including the terminator.
    pub fn to_frame(&self) -> Vec<u8> {
        let terminator = match self {
            ControlMessage::Transfer(_) => '\0',
            _ => '\n',
        };
        format!("{}{}", self, terminator).into_bytes()
    }
}

impl std::fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let tag = self.tag();
        match self {
            ControlMessage::JoinRequest(m) => write!(f, "{} {}", tag, m.peer),
            ControlMessage::JoinResponse(m) => write!(f, "{} {} {}", tag, m.first, m.second),
            ControlMessage::PeerDepart(m) => {
                write!(f, "{} {} {} {}", tag, m.peer, m.first, m.second)
            }
            ControlMessage::RecoveryQuery(m) => write!(f, "{} {} {}", tag, m.asking, m.departed),
            ControlMessage::RecoveryReply(m) => write!(f, "{} {}", tag, m.first),
            ControlMessage::Store(m) => write!(f, "{} {} {}", tag, m.file, m.requester),
            ControlMessage::Retrieve(m) => write!(f, "{} {} {}", tag, m.file, m.requester),
            ControlMessage::Transfer(m) => write!(f, "{} {} {}", tag, m.file, m.filename),
        }
    }
}

/// Cursor over the tokens following a tag.
struct Tokens<'a> {
    tag: &'static str,
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn word(&mut self) -> Result<&'a str> {
        self.iter.next().ok_or(Error::MissingToken(self.tag))
    }

    fn next<T: FromStr>(&mut self) -> Result<T> {
        parse_token(self.word()?)
    }

    fn maybe<T: FromStr>(&mut self) -> Result<Option<T>> {
        self.iter.next().map(parse_token::<T>).transpose()
    }

    fn finish<T>(mut self, value: T) -> Result<T> {
        match self.iter.next() {
            Some(extra) => Err(Error::TrailingToken(extra.to_string())),
            None => Ok(value),
        }
    }
}

/// Split a line into its upper cased tag and the remaining tokens.
fn split_tag(s: &str) -> Result<(String, SplitWhitespace)> {
    let mut iter = s.split_whitespace();
    let tag = iter.next().ok_or(Error::MissingTag)?;
    Ok((tag.to_ascii_uppercase(), iter))
}

impl FromStr for ControlMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (tag, iter) = split_tag(s)?;
        let tokens = |tag| Tokens { tag, iter };
        match tag.as_str() {
            "JOIN_REQUEST" => {
                let mut t = tokens("JOIN_REQUEST");
                let peer = t.next()?;
                t.finish(ControlMessage::JoinRequest(JoinRequest { peer }))
            }
            "JOIN_RESPONSE" => {
                let mut t = tokens("JOIN_RESPONSE");
                let first = t.next()?;
                let second = t.next()?;
                t.finish(ControlMessage::JoinResponse(JoinResponse { first, second }))
            }
            "PEER_DEPART" => {
                let mut t = tokens("PEER_DEPART");
                let peer = t.next()?;
                let first = t.next()?;
                let second = t.next()?;
                t.finish(ControlMessage::PeerDepart(PeerDepart {
                    peer,
                    first,
                    second,
                }))
            }
            "RECOVERY_QUERY" => {
                // The query names two peers, the reply only one.
                let mut t = tokens("RECOVERY_QUERY");
                let head = t.next()?;
                let msg = match t.maybe()? {
                    Some(departed) => ControlMessage::RecoveryQuery(RecoveryQuery {
                        asking: head,
                        departed,
                    }),
                    None => ControlMessage::RecoveryReply(RecoveryReply { first: head }),
                };
                t.finish(msg)
            }
            "STORE" => {
                let mut t = tokens("STORE");
                let file = t.next()?;
                let requester = t.next()?;
                t.finish(ControlMessage::Store(StoreRequest { file, requester }))
            }
            "RETRIEVE" => {
                let mut t = tokens("RETRIEVE");
                let file = t.next()?;
                let requester = t.next()?;
                t.finish(ControlMessage::Retrieve(RetrieveRequest { file, requester }))
            }
            "TRANSFER" => {
                let mut t = tokens("TRANSFER");
                let file = t.next()?;
                let filename = t.word()?.to_string();
                t.finish(ControlMessage::Transfer(Transfer { file, filename }))
            }
            _ => Err(Error::UnknownTag(tag)),
        }
    }
}

impl std::fmt::Display for PingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PingMessage::Request { seq, sender } => write!(f, "REQUEST {} {}", seq, sender),
            PingMessage::Acknowledge { seq, sender } => write!(f, "ACKNOWLEDGE {} {}", seq, sender),
        }
    }
}

impl FromStr for PingMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (tag, iter) = split_tag(s)?;
        let (name, is_request) = match tag.as_str() {
            "REQUEST" => ("REQUEST", true),
            "ACKNOWLEDGE" => ("ACKNOWLEDGE", false),
            _ => return Err(Error::UnknownTag(tag)),
        };
        let mut t = Tokens { tag: name, iter };
        let seq = t.next()?;
        let sender = t.next()?;
        t.finish(if is_request {
            PingMessage::Request { seq, sender }
        } else {
            PingMessage::Acknowledge { seq, sender }
        })
    }
}

impl PingMessage {
    /// Peer that sent the datagram.
    pub fn sender(&self) -> PeerId {
        match self {
            PingMessage::Request { sender, .. } | PingMessage::Acknowledge { sender, .. } => {
                *sender
            }
        }
    }
}
