//! Content held by this peer, and the byte streams that move files between peers.

pub mod files;
pub mod memory;

pub use crate::storage::files::DiskFileTransfer;
pub use crate::storage::files::FileTransfer;
pub use crate::storage::memory::ContentStore;
