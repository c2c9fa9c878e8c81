//! Control messages, their framing, and the handlers that run the ring protocol.
mod client;
pub use client::ControlClient;

pub mod frame;
pub use frame::read_header;

pub mod types;
pub use types::*;

pub mod handlers;
pub use handlers::ControlProtocol;
pub use handlers::Dispatch;
pub use handlers::HandleMsg;
