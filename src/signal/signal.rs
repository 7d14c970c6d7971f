//! Signal: a component that produces packets, fans them out to
//! subscribed input ports, and maintains a last-value cache.
//!
//! Ownership between a value signal and its domain signal is asymmetric by
//! design: the value signal holds a strong `Arc<Signal>` to its
//! domain, while the domain signal holds only `Weak<Signal>` back-references
//! to its dependants. A value signal tells its domain to drop the
//! back-reference before it is destroyed, so the domain never outlives its
//! last dependant's notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::component::{Component, ComponentBase};
use crate::error::{DaqError, DaqResult, ErrorKind};
use crate::signal::connection::Connection;
use crate::signal::descriptor::{DataDescriptor, SampleType};
use crate::signal::packet::{DataPacket, EventPacket, Packet};

/// A decoded last value: raw sample bytes inflated into a typed scalar
/// according to the descriptor's sample type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LastValue {
    Int(i64),
    Float(f64),
    Bytes,
}

struct LastValueCache {
    raw: Vec<u8>,
    descriptor: Option<Arc<DataDescriptor>>,
}

struct SignalState {
    descriptor: Option<Arc<DataDescriptor>>,
    domain_signal: Option<Arc<Signal>>,
    public: bool,
    keep_last_value: bool,
    related_signals: Vec<Weak<Signal>>,
}

/// See module docs.
pub struct Signal {
    base: ComponentBase,
    state: RwLock<SignalState>,
    connections: RwLock<Vec<Arc<Connection>>>,
    domain_back_refs: RwLock<Vec<Weak<Signal>>>,
    last_value: Mutex<Option<LastValueCache>>,
    active: AtomicBool,
    streamed: AtomicBool,
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("global_id", &self.base.global_id()).finish()
    }
}

impl Signal {
    pub fn new(local_id: impl Into<String>, parent: Option<&Arc<dyn Component>>) -> DaqResult<Arc<Self>> {
        Ok(Arc::new(Self {
            base: ComponentBase::new(local_id, parent)?,
            state: RwLock::new(SignalState {
                descriptor: None,
                domain_signal: None,
                public: true,
                keep_last_value: true,
                related_signals: Vec::new(),
            }),
            connections: RwLock::new(Vec::new()),
            domain_back_refs: RwLock::new(Vec::new()),
            last_value: Mutex::new(None),
            active: AtomicBool::new(true),
            streamed: AtomicBool::new(false),
        }))
    }

    pub fn descriptor(&self) -> Option<Arc<DataDescriptor>> {
        self.state.read().descriptor.clone()
    }

    /// Sets the descriptor and fires `DataDescriptorChanged` to every
    /// subscribed connection and to each dependant that names this signal
    /// as its domain. Rejects `SampleType::Null`, which
    /// is reserved as the event-packet marker.
    pub fn set_descriptor(self: &Arc<Self>, descriptor: DataDescriptor) -> DaqResult<()> {
        if descriptor.sample_type == SampleType::Null {
            return Err(DaqError::new(ErrorKind::InvalidParameter, "InvalidSampleType: Null is reserved for event packets"));
        }
        let descriptor = Arc::new(descriptor);
        self.state.write().descriptor = Some(descriptor.clone());

        let domain_descriptor = self.state.read().domain_signal.as_ref().and_then(|d| d.descriptor());
        let event = EventPacket::data_descriptor_changed(Some(&descriptor), domain_descriptor.as_deref());
        self.broadcast_event(event);

        for dependant in self.domain_back_refs.read().iter().filter_map(Weak::upgrade) {
            let event = EventPacket::data_descriptor_changed(None, Some(&descriptor));
            dependant.broadcast_event(event);
        }
        Ok(())
    }

    pub fn domain_signal(&self) -> Option<Arc<Signal>> {
        self.state.read().domain_signal.clone()
    }

    /// Swaps the domain back-reference and pushes a `DataDescriptorChanged`
    /// event carrying the new domain descriptor. Clearing an already-clear
    /// domain signal is idempotent.
    pub fn set_domain_signal(self: &Arc<Self>, domain: Option<Arc<Signal>>) {
        let previous = {
            let mut state = self.state.write();
            let previous = state.domain_signal.take();
            state.domain_signal = domain.clone();
            previous
        };
        if let Some(previous) = &previous {
            previous.domain_back_refs.write().retain(|w| w.upgrade().map(|s| !Arc::ptr_eq(&s, self)).unwrap_or(false));
        }
        let Some(domain) = domain else {
            if previous.is_none() {
                return;
            }
            let event = EventPacket::data_descriptor_changed(self.descriptor().as_deref(), None);
            self.broadcast_event(event);
            return;
        };
        domain.domain_back_refs.write().push(Arc::downgrade(self));
        let event = EventPacket::data_descriptor_changed(self.descriptor().as_deref(), domain.descriptor().as_deref());
        self.broadcast_event(event);
    }

    pub fn public(&self) -> bool {
        self.state.read().public
    }

    pub fn set_public(&self, value: bool) {
        self.state.write().public = value;
    }

    pub fn keep_last_value(&self) -> bool {
        self.state.read().keep_last_value
    }

    pub fn enable_keep_last_value(&self, value: bool) {
        self.state.write().keep_last_value = value;
    }

    pub fn related_signals(&self) -> Vec<Arc<Signal>> {
        self.state.read().related_signals.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn add_related_signal(&self, signal: &Arc<Signal>) {
        self.state.write().related_signals.push(Arc::downgrade(signal));
    }

    pub fn remove_related_signal(&self, signal: &Arc<Signal>) {
        self.state
            .write()
            .related_signals
            .retain(|w| w.upgrade().map(|s| !Arc::ptr_eq(&s, signal)).unwrap_or(false));
    }

    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.read().clone()
    }

    pub fn streamed(&self) -> bool {
        self.streamed.load(Ordering::Acquire)
    }

    pub fn set_streamed(&self, value: bool) {
        self.streamed.store(value, Ordering::Release);
    }

    fn broadcast_event(&self, event: EventPacket) {
        for connection in self.connections.read().iter() {
            connection.enqueue(Packet::Event(event.clone()));
        }
    }

    /// Delivers a packet decoded off the wire to every local connection, as
    /// the packet-streaming client does when it reconstructs packets from
    /// streaming buffers and publishes them to the signal. Updates the
    /// last-value cache exactly like a locally produced data packet would.
    pub fn deliver(&self, packet: Packet) {
        if let Packet::Data(data) = &packet {
            self.update_last_value(data);
        }
        for connection in self.connections.read().iter() {
            connection.enqueue(packet.clone());
        }
    }

    /// Stores a listed connection at most once and, on a 0→1
    /// transition, signals that this signal has gained its first listener.
    /// Emits the connection's initial descriptor event immediately.
    pub fn listener_connected(self: &Arc<Self>, connection: Arc<Connection>) -> DaqResult<()> {
        let mut connections = self.connections.write();
        if connections
            .iter()
            .any(|c| c.input_port_global_id() == connection.input_port_global_id())
        {
            return Err(DaqError::new(ErrorKind::DuplicateItem, "input port is already connected"));
        }
        let was_empty = connections.is_empty();
        let domain_descriptor = self.state.read().domain_signal.as_ref().and_then(|d| d.descriptor());
        connection.enqueue(Packet::Event(EventPacket::data_descriptor_changed(
            self.descriptor().as_deref(),
            domain_descriptor.as_deref(),
        )));
        connections.push(connection);
        drop(connections);
        if was_empty {
            self.on_listened_status_changed(true);
        }
        Ok(())
    }

    pub fn listener_disconnected(&self, input_port_global_id: &str) {
        let mut connections = self.connections.write();
        connections.retain(|c| c.input_port_global_id() != input_port_global_id);
        let now_empty = connections.is_empty();
        drop(connections);
        if now_empty {
            self.on_listened_status_changed(false);
        }
    }

    /// Hook for subclasses (e.g. channels pausing acquisition with no
    /// listeners); the base signal does nothing.
    fn on_listened_status_changed(&self, _connected: bool) {}

    /// Packet fan-out: inert while `active` is false;
    /// updates the last-value cache for data packets under the acquisition
    /// lock, then enqueues a clone on every connection.
    pub fn send_packet(&self, packet: Packet) -> DaqResult<()> {
        if !self.active.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Packet::Data(data) = &packet {
            if self.descriptor().is_none() {
                return Err(DaqError::new(
                    ErrorKind::PacketStreaming,
                    "No signal descriptor event received",
                ));
            }
            if data.descriptor.sample_type == SampleType::Null {
                return Err(DaqError::new(ErrorKind::InvalidParameter, "InvalidSampleType: Null sample type is not sendable"));
            }
            self.update_last_value(data);
        }
        let connections = self.connections.read().clone();
        for connection in connections {
            connection.enqueue(packet.clone());
        }
        Ok(())
    }

    pub fn send_packets(&self, packets: Vec<Packet>) -> DaqResult<()> {
        for packet in packets {
            self.send_packet(packet)?;
        }
        Ok(())
    }

    fn update_last_value(&self, packet: &DataPacket) {
        if !self.keep_last_value() {
            return;
        }
        if let Some(raw) = packet.last_sample_bytes() {
            *self.last_value.lock() = Some(LastValueCache {
                raw,
                descriptor: Some(packet.descriptor.clone()),
            });
        }
    }

    pub fn set_last_value(&self, raw: Vec<u8>, descriptor: Arc<DataDescriptor>) {
        *self.last_value.lock() = Some(LastValueCache { raw, descriptor: Some(descriptor) });
    }

    /// Lazily inflates the cached raw bytes into a typed value.
    pub fn last_value(&self) -> Option<LastValue> {
        let cache = self.last_value.lock();
        let cache = cache.as_ref()?;
        let descriptor = cache.descriptor.as_ref()?;
        match descriptor.sample_type {
            SampleType::Float64 => cache.raw.get(0..8).map(|b| LastValue::Float(f64::from_le_bytes(b.try_into().unwrap()))),
            SampleType::Float32 => cache.raw.get(0..4).map(|b| LastValue::Float(f32::from_le_bytes(b.try_into().unwrap()) as f64)),
            SampleType::Int64 => cache.raw.get(0..8).map(|b| LastValue::Int(i64::from_le_bytes(b.try_into().unwrap()))),
            SampleType::Int32 => cache.raw.get(0..4).map(|b| LastValue::Int(i32::from_le_bytes(b.try_into().unwrap()) as i64)),
            _ => Some(LastValue::Bytes),
        }
    }
}

impl Component for Signal {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    /// Clears connections, tells every subscribed input port to drop this
    /// signal without emitting back-events, and severs domain back-refs.
    fn on_remove(&self) {
        self.active.store(false, Ordering::Release);
        let connections = std::mem::take(&mut *self.connections.write());
        for connection in &connections {
            if let Some(port) = connection.input_port() {
                port.disconnect_silently();
            }
        }
        if let Some(domain) = self.state.write().domain_signal.take() {
            domain.domain_back_refs.write().retain(|w| {
                w.upgrade()
                    .map(|s| s.base().global_id() != self.base().global_id())
                    .unwrap_or(false)
            });
        }
        self.domain_back_refs.write().clear();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
