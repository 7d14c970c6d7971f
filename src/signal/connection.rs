//! Connection: the FIFO queue between
//! exactly one signal and one input port.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::component::Component;
use crate::signal::input_port::InputPort;
use crate::signal::packet::Packet;

/// Jointly owned by a signal and an input port; ownership ends when
/// either side disconnects. An input port holds at most one connection at
/// a time. `input_port` is a back-reference only, mirroring the `Weak`
/// domain-signal back-refs a signal keeps to its dependants - it lets the
/// signal side notify the port directly (e.g. on removal) without routing
/// back through the port's own lookup tables.
pub struct Connection {
    signal_global_id: String,
    input_port_global_id: String,
    input_port: Weak<InputPort>,
    queue: Mutex<VecDeque<Packet>>,
}

impl Connection {
    pub fn new(signal_global_id: impl Into<String>, input_port: &Arc<InputPort>) -> Self {
        Self {
            signal_global_id: signal_global_id.into(),
            input_port_global_id: input_port.base().global_id().to_string(),
            input_port: Arc::downgrade(input_port),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn signal_global_id(&self) -> &str {
        &self.signal_global_id
    }

    pub fn input_port_global_id(&self) -> &str {
        &self.input_port_global_id
    }

    /// The connected port, if it hasn't been dropped yet.
    pub fn input_port(&self) -> Option<Arc<InputPort>> {
        self.input_port.upgrade()
    }

    pub fn enqueue(&self, packet: Packet) {
        self.queue.lock().push_back(packet);
    }

    pub fn dequeue(&self) -> Option<Packet> {
        self.queue.lock().pop_front()
    }

    pub fn peek(&self) -> Option<Packet> {
        self.queue.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
