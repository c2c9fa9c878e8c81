//! ringpeer-node: the process shell around [ringpeer_core].
//!
//! It owns what a running peer needs beyond the ring itself: the yaml [config], the
//! stderr [logging] setup and the operator [console] reading commands from stdin.
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod util;
