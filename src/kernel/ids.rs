//! Object and interface identity.
//!
//! A capability identifier only needs to be a stable, comparable name - it
//! rides on a string tag rather than a fabricated 128-bit constant table,
//! since nothing in this design calls across an ABI boundary that would
//! need a fixed-width encoding.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Names a capability a component may advertise (signal, folder, device,
/// function block, input port, ...). Two components share an `InterfaceId`
/// if and only if they implement the same capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceId(&'static str);

impl InterfaceId {
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub const fn tag(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub const IFACE_COMPONENT: InterfaceId = InterfaceId::new("daq.component");
pub const IFACE_FOLDER: InterfaceId = InterfaceId::new("daq.folder");
pub const IFACE_SIGNAL: InterfaceId = InterfaceId::new("daq.signal");
pub const IFACE_INPUT_PORT: InterfaceId = InterfaceId::new("daq.input_port");
pub const IFACE_DEVICE: InterfaceId = InterfaceId::new("daq.device");
pub const IFACE_FUNCTION_BLOCK: InterfaceId = InterfaceId::new("daq.function_block");
pub const IFACE_CHANNEL: InterfaceId = InterfaceId::new("daq.channel");

/// Process-unique, monotonically increasing object identity used for packet
/// IDs, session bookkeeping and the packet-ID dedup set in the streaming
/// layer. Not persisted or meaningful across process restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Allocates the next process-unique ID.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_monotonic_and_unique() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert!(b.raw() > a.raw());
    }
}
