//! Input port: a component that consumes packets through at
//! most one connection.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::{Component, ComponentBase};
use crate::error::{DaqError, DaqResult, ErrorKind};
use crate::signal::connection::Connection;
use crate::signal::packet::Packet;
use crate::signal::signal::Signal;

/// Status returned from a blocking packet read: a reader that blocks for
/// packets accepts a timeout and reports whether it woke up with data,
/// with an event, or because the timeout elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    Ok,
    Event,
    Timeout,
}

pub struct InputPort {
    base: ComponentBase,
    connection: RwLock<Option<Arc<Connection>>>,
}

impl std::fmt::Debug for InputPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputPort").field("global_id", &self.base.global_id()).finish()
    }
}

impl InputPort {
    pub fn new(local_id: impl Into<String>, parent: Option<&Arc<dyn Component>>) -> DaqResult<Arc<Self>> {
        Ok(Arc::new(Self {
            base: ComponentBase::new(local_id, parent)?,
            connection: RwLock::new(None),
        }))
    }

    /// Connects to `signal`, creating the joint FIFO and registering as a
    /// listener. Fails if already connected - an input port holds at most
    /// one connection.
    pub fn connect(self: &Arc<Self>, signal: &Arc<Signal>) -> DaqResult<()> {
        if self.connection.read().is_some() {
            return Err(DaqError::new(ErrorKind::InvalidState, "input port already has a connection"));
        }
        let connection = Arc::new(Connection::new(signal.base().global_id(), self));
        signal.listener_connected(connection.clone())?;
        *self.connection.write() = Some(connection);
        Ok(())
    }

    /// Disconnects, notifying the signal so it can drop its listener-count
    /// bookkeeping. Safe to call when already disconnected.
    pub fn disconnect(&self, signal: &Arc<Signal>) {
        if let Some(connection) = self.connection.write().take() {
            signal.listener_disconnected(connection.input_port_global_id());
        }
    }

    /// Drops the connection without notifying the signal back - the signal
    /// calls this on every still-connected port as part of its own removal,
    /// so there is no listener-count bookkeeping left on that side to update.
    pub fn disconnect_silently(&self) {
        *self.connection.write() = None;
    }

    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.read().clone()
    }

    /// Pulls the next packet without blocking.
    pub fn try_read(&self) -> Option<Packet> {
        self.connection.read().as_ref().and_then(|c| c.dequeue())
    }

    /// Blocks (by short-sleeping in a poll loop, since this runtime has no
    /// condvar-backed wake path yet) until a packet arrives or `timeout`
    /// elapses.
    pub fn read(&self, timeout: std::time::Duration) -> (ReadStatus, Option<Packet>) {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(packet) = self.try_read() {
                let status = match &packet {
                    Packet::Event(_) => ReadStatus::Event,
                    Packet::Data(_) => ReadStatus::Ok,
                };
                return (status, Some(packet));
            }
            if std::time::Instant::now() >= deadline {
                return (ReadStatus::Timeout, None);
            }
            std::thread::yield_now();
        }
    }
}

impl Component for InputPort {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn on_remove(&self) {
        *self.connection.write() = None;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
