//! The packet-streaming server: encodes signal packets into wire
//! buffers, deduplicates retransmitted packet IDs, batches adjacent small
//! buffers into cacheable groups, and periodically emits release frames.
//!
//! Packets here are plain values, not reference-counted handles the server
//! could hook a destructor into to queue a release automatically when the
//! last reference drops. Instead that contract is exposed as an explicit
//! [`PacketStreamingServer::notify_packet_dropped`] that the packet's last
//! owner calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::{DaqError, DaqResult, ErrorKind};
use crate::signal::{DataPacket, EventPacket, Packet};
use crate::streaming::header::{
    flags_with_offset, offset_type_for, AlreadySentHeaderExt, DataHeaderExt, GenericHeader, PacketType,
    ALREADY_SENT_HEADER_EXTRA_SIZE, DATA_HEADER_EXTRA_SIZE, GENERIC_HEADER_SIZE, PACKET_FLAG_CAN_RELEASE, SIGNAL_ID_NONE,
};

pub const NON_CACHEABLE_GROUP_ID: u64 = 0;

/// One queued wire buffer: header bytes followed by payload bytes, plus
/// the bookkeeping the server needs to track cacheable-group membership.
#[derive(Clone, Debug)]
pub struct PacketBuffer {
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
    pub cacheable_group_id: u64,
}

impl PacketBuffer {
    pub fn is_cacheable(&self) -> bool {
        self.cacheable_group_id != NON_CACHEABLE_GROUP_ID
    }

    pub fn total_size(&self) -> usize {
        self.header.len() + self.payload.len()
    }
}

#[derive(Default)]
struct CacheableGroup {
    count: usize,
    size: usize,
}

#[derive(Default)]
struct PacketCollection {
    sent: HashSet<i64>,
    ready_for_release: Vec<i64>,
}

pub struct PacketStreamingServer {
    cacheable_payload_size_max: usize,
    release_threshold: usize,
    queue: Mutex<VecDeque<Arc<PacketBuffer>>>,
    cacheable_groups: Mutex<HashMap<u64, CacheableGroup>>,
    count_of_non_cacheable_buffers: Mutex<usize>,
    current_cacheable_group_id: Mutex<u64>,
    data_descriptors: Mutex<HashSet<u32>>,
    packet_collection: Arc<Mutex<PacketCollection>>,
}

impl PacketStreamingServer {
    pub fn new(cacheable_payload_size_max: usize, release_threshold: usize) -> Self {
        Self {
            cacheable_payload_size_max,
            release_threshold,
            queue: Mutex::new(VecDeque::new()),
            cacheable_groups: Mutex::new(HashMap::new()),
            count_of_non_cacheable_buffers: Mutex::new(0),
            current_cacheable_group_id: Mutex::new(0),
            data_descriptors: Mutex::new(HashSet::new()),
            packet_collection: Arc::new(Mutex::new(PacketCollection::default())),
        }
    }

    /// Dispatches by packet type, then checks whether enough packets are
    /// pending release to flush a `release` frame.
    pub fn add_daq_packet(&self, signal_id: u32, packet: Packet, steal_ref: bool) -> DaqResult<()> {
        match packet {
            Packet::Event(event) => self.add_event_packet(signal_id, &event)?,
            Packet::Data(data) => self.add_data_packet(signal_id, &data, steal_ref)?,
        }
        self.check_and_send_release_packet(false);
        Ok(())
    }

    fn add_event_packet(&self, signal_id: u32, packet: &EventPacket) -> DaqResult<()> {
        let mut payload = serde_json::to_vec(&packet.to_json())
            .map_err(|e| DaqError::new(ErrorKind::PacketStreaming, e.to_string()))?;
        payload.push(0); // NUL-terminated JSON

        let header = GenericHeader {
            size: GENERIC_HEADER_SIZE as u32,
            packet_type: PacketType::Event,
            version: 0,
            flags: 0,
            signal_id,
            payload_size: payload.len() as u32,
        };
        let group_id = self.next_cacheable_group_id(header.size as usize, header.payload_size as usize)?;

        if packet.id == "DataDescriptorChanged" {
            if !packet.parameters.get("valueDescriptor").map(|v| v.is_null()).unwrap_or(true) {
                self.data_descriptors.lock().unwrap().insert(signal_id);
            }
        }

        self.queue_packet_buffer(PacketBuffer {
            header: header.encode(),
            payload,
            cacheable_group_id: group_id,
        });
        Ok(())
    }

    fn should_send_packet(&self, packet_id: i64, mark_for_release: bool) -> bool {
        let mut collection = self.packet_collection.lock().unwrap();
        let already_sent = collection.sent.contains(&packet_id);
        if already_sent {
            if mark_for_release {
                collection.sent.remove(&packet_id);
            }
        } else if !mark_for_release {
            collection.sent.insert(packet_id);
        }
        !already_sent
    }

    /// `steal_ref` is a fast path for the refcount-one case: the caller is
    /// telling the server this send is the last thing that will touch the
    /// packet, so the ID never needs a separate release message.
    fn add_data_packet(&self, signal_id: u32, packet: &DataPacket, steal_ref: bool) -> DaqResult<()> {
        if !self.data_descriptors.lock().unwrap().contains(&signal_id) {
            return Err(DaqError::new(ErrorKind::PacketStreaming, "No signal descriptor event received"));
        }

        let domain_packet_id = packet.domain_packet_id.unwrap_or(-1);
        let should_send = self.should_send_packet(packet.id, steal_ref);
        if !should_send {
            self.add_already_sent_packet(signal_id, packet.id, domain_packet_id, steal_ref);
            return Ok(());
        }

        let (offset_type, offset_int, offset_float) = offset_type_for(packet.offset);
        let flags = flags_with_offset(if steal_ref { PACKET_FLAG_CAN_RELEASE } else { 0 }, offset_type);

        let size = (GENERIC_HEADER_SIZE + DATA_HEADER_EXTRA_SIZE) as u32;
        let generic = GenericHeader {
            size,
            packet_type: PacketType::Data,
            version: 0,
            flags,
            signal_id,
            payload_size: packet.payload.len() as u32,
        };
        let ext = DataHeaderExt {
            packet_id: packet.id,
            domain_packet_id,
            sample_count: packet.sample_count as i64,
            offset_int,
            offset_float,
        };

        let group_id = self.next_cacheable_group_id(size as usize, packet.payload.len())?;
        let mut header = generic.encode();
        header.extend_from_slice(&ext.encode());

        self.queue_packet_buffer(PacketBuffer {
            header,
            payload: packet.payload.clone(),
            cacheable_group_id: group_id,
        });
        Ok(())
    }

    fn add_already_sent_packet(&self, signal_id: u32, packet_id: i64, domain_packet_id: i64, mark_for_release: bool) {
        let size = (GENERIC_HEADER_SIZE + ALREADY_SENT_HEADER_EXTRA_SIZE) as u32;
        let generic = GenericHeader {
            size,
            packet_type: PacketType::AlreadySent,
            version: 0,
            flags: if mark_for_release { PACKET_FLAG_CAN_RELEASE } else { 0 },
            signal_id,
            payload_size: 0,
        };
        let ext = AlreadySentHeaderExt { packet_id, domain_packet_id };
        let group_id = self.next_cacheable_group_id(size as usize, 0).unwrap_or(NON_CACHEABLE_GROUP_ID);
        let mut header = generic.encode();
        header.extend_from_slice(&ext.encode());
        self.queue_packet_buffer(PacketBuffer {
            header,
            payload: Vec::new(),
            cacheable_group_id: group_id,
        });
    }

    /// Called by a data packet's last owner when it is dropped. Queues the
    /// packet ID for the next release frame iff it was still marked `sent`.
    pub fn notify_packet_dropped(&self, packet_id: i64) {
        let mut collection = self.packet_collection.lock().unwrap();
        if collection.sent.remove(&packet_id) {
            collection.ready_for_release.push(packet_id);
        }
    }

    /// Flushes a `release` frame once `ready_for_release` reaches
    /// `release_threshold`, or always when `force` is set and the list is
    /// non-empty.
    pub fn check_and_send_release_packet(&self, force: bool) {
        let ids = {
            let mut collection = self.packet_collection.lock().unwrap();
            let pending = collection.ready_for_release.len();
            if !(force && pending > 0) && pending < self.release_threshold {
                return;
            }
            std::mem::take(&mut collection.ready_for_release)
        };

        let mut payload = Vec::with_capacity(ids.len() * 8);
        for id in &ids {
            payload.extend_from_slice(&id.to_le_bytes());
        }
        let header = GenericHeader {
            size: GENERIC_HEADER_SIZE as u32,
            packet_type: PacketType::Release,
            version: 0,
            flags: 0,
            signal_id: SIGNAL_ID_NONE,
            payload_size: payload.len() as u32,
        };
        let group_id = self
            .next_cacheable_group_id(header.size as usize, payload.len())
            .unwrap_or(NON_CACHEABLE_GROUP_ID);
        self.queue_packet_buffer(PacketBuffer {
            header: header.encode(),
            payload,
            cacheable_group_id: group_id,
        });
    }

    pub fn flush_release(&self) {
        self.check_and_send_release_packet(true);
    }

    fn queue_packet_buffer(&self, buffer: PacketBuffer) {
        if buffer.is_cacheable() {
            let mut groups = self.cacheable_groups.lock().unwrap();
            let group = groups.entry(buffer.cacheable_group_id).or_default();
            group.count += 1;
            group.size += buffer.total_size();
        } else {
            *self.count_of_non_cacheable_buffers.lock().unwrap() += 1;
        }
        self.queue.lock().unwrap().push_back(Arc::new(buffer));
    }

    /// Assigns the cacheable-group ID a new buffer should carry: small
    /// buffers extend the current group unless the previous buffer queued
    /// was non-cacheable, in which case a new group starts.
    fn next_cacheable_group_id(&self, _header_size: usize, payload_size: usize) -> DaqResult<u64> {
        if payload_size > self.cacheable_payload_size_max {
            return Ok(NON_CACHEABLE_GROUP_ID);
        }
        let queue = self.queue.lock().unwrap();
        let mut current = self.current_cacheable_group_id.lock().unwrap();
        if queue.is_empty() {
            if !self.cacheable_groups.lock().unwrap().is_empty() {
                return Err(self.linear_caching_assertion("cacheable_groups non-empty with empty queue"));
            }
            *current = 1;
        }
        if let Some(back) = queue.back() {
            if !back.is_cacheable() {
                *current += 1;
            }
        }
        if *current == NON_CACHEABLE_GROUP_ID {
            *current += 1;
        }
        Ok(*current)
    }

    /// Pops the next buffer and adjusts group/non-cacheable bookkeeping.
    /// Invariant violations are fatal and bubble to the caller as
    /// `PacketStreaming` errors rather than panicking.
    pub fn get_next_packet_buffer(&self) -> DaqResult<Option<Arc<PacketBuffer>>> {
        let buffer = match self.queue.lock().unwrap().pop_front() {
            Some(b) => b,
            None => return Ok(None),
        };
        if buffer.is_cacheable() {
            let mut groups = self.cacheable_groups.lock().unwrap();
            let remove = {
                let group = groups
                    .get_mut(&buffer.cacheable_group_id)
                    .ok_or_else(|| self.linear_caching_assertion("missing cacheable group on dequeue"))?;
                if group.count == 0 {
                    return Err(self.linear_caching_assertion("cacheable group count underflow"));
                }
                group.count -= 1;
                if group.size < buffer.total_size() {
                    return Err(self.linear_caching_assertion("cacheable group size underflow"));
                }
                group.size -= buffer.total_size();
                group.count == 0 || group.size == 0
            };
            if remove {
                groups.remove(&buffer.cacheable_group_id);
            }
        } else {
            let mut count = self.count_of_non_cacheable_buffers.lock().unwrap();
            if *count == 0 {
                return Err(self.linear_caching_assertion("non-cacheable count underflow"));
            }
            *count -= 1;
        }
        Ok(Some(buffer))
    }

    pub fn peek_next_packet_buffer(&self) -> Option<Arc<PacketBuffer>> {
        self.queue.lock().unwrap().front().cloned()
    }

    pub fn available_buffers_count(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    fn linear_caching_assertion(&self, condition: &str) -> DaqError {
        DaqError::new(ErrorKind::PacketStreaming, format!("linear caching failure: {condition}"))
    }
}
