//! Constant variables.

/// Number of successors every peer keeps, the replication factor of the ring.
pub const SUCCESSOR_CAPACITY: usize = 2;
/// Number of recent pingers remembered as likely predecessors.
pub const PREDECESSOR_CAPACITY: usize = 2;
/// Unacknowledged probes after which a successor is declared dead.
pub const ABRUPT_THRESHOLD: u64 = 3;
/// File ids are placed on the ring by `file_id % HASH_MODULUS`.
pub const HASH_MODULUS: u32 = 256;
/// Well-known base port, a peer listens on `DEFAULT_BASE_PORT + peer_id`.
pub const DEFAULT_BASE_PORT: u16 = 12000;
/// Largest heartbeat datagram we accept.
pub const MAX_DATAGRAM_LEN: usize = 2048;
/// Largest control message header we accept.
pub const MAX_HEADER_LEN: usize = 2048;
/// default connect/read timeout for control connections in ms
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 3000;
/// Extensions sent back for every retrieved file id.
pub const DEFAULT_FILE_VARIANTS: [&str; 2] = ["txt", "pdf"];
/// Prefix of files written by an incoming transfer.
pub const RECEIVED_FILE_PREFIX: &str = "received_";
/// Heartbeat intervals to wait for the answer to a recovery query. The survivor may
/// be recovering itself and answers only once both of its successors are set.
pub const RECOVERY_REPLY_INTERVALS: u32 = 4;
