use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::sync::atomic::AtomicU16;
use std::sync::atomic::Ordering;

use crate::dht::AddressBook;

pub mod default;

/// Ports reserved for one test, peer ids used in tests stay below this.
const PORTS_PER_TEST: u16 = 100;

static NEXT_BASE: AtomicU16 = AtomicU16::new(21000);

#[allow(dead_code)]
pub fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Loopback address book with base ports no other test uses.
pub fn gen_addresses() -> AddressBook {
    let base = NEXT_BASE.fetch_add(PORTS_PER_TEST * 2, Ordering::SeqCst);
    AddressBook::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        base,
        base + PORTS_PER_TEST,
    )
}
