#![warn(missing_docs)]
//! Membership of the ring: ids, endpoints, successor and predecessor bookkeeping.
//!
//! The topology follows CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>,
//! with a fixed successor list of two and without fingers. Membership routing walks the
//! ring one successor at a time.

mod address;
pub mod id;
mod predecessor;
mod routing;
pub mod successor;
pub mod types;

pub use address::AddressBook;
pub use id::FileId;
pub use id::PeerId;
pub use predecessor::PredecessorTracker;
pub use routing::RemoteAction;
pub use routing::RingAction;
pub use successor::RingState;
pub use successor::SetOutcome;
pub use successor::SharedSuccessorCallback;
pub use successor::SuccessorCallback;
pub use types::Ring;
pub use types::Slot;
pub use types::Successors;
