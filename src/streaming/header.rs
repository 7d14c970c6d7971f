//! Packet-streaming wire format: fixed-size binary headers that
//! precede each buffer's payload.

use crate::error::{DaqError, DaqResult, ErrorKind};

pub const GENERIC_HEADER_SIZE: usize = 16;
pub const DATA_HEADER_EXTRA_SIZE: usize = 32;
pub const ALREADY_SENT_HEADER_EXTRA_SIZE: usize = 16;

pub const PACKET_FLAG_CAN_RELEASE: u8 = 1 << 0;
const PACKET_FLAG_OFFSET_TYPE_SHIFT: u8 = 1;
const PACKET_FLAG_OFFSET_TYPE_MASK: u8 = 0b11 << PACKET_FLAG_OFFSET_TYPE_SHIFT;

pub const SIGNAL_ID_NONE: u32 = 0xFFFF_FFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Event = 0,
    Data = 1,
    AlreadySent = 2,
    Release = 3,
}

impl PacketType {
    fn from_u8(v: u8) -> DaqResult<Self> {
        match v {
            0 => Ok(PacketType::Event),
            1 => Ok(PacketType::Data),
            2 => Ok(PacketType::AlreadySent),
            3 => Ok(PacketType::Release),
            other => Err(DaqError::new(ErrorKind::PacketStreaming, format!("unknown packet type {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetType {
    None,
    Int,
    Float,
}

impl OffsetType {
    fn bits(self) -> u8 {
        match self {
            OffsetType::None => 0,
            OffsetType::Int => 1,
            OffsetType::Float => 2,
        }
    }

    fn from_flags(flags: u8) -> Self {
        match (flags & PACKET_FLAG_OFFSET_TYPE_MASK) >> PACKET_FLAG_OFFSET_TYPE_SHIFT {
            1 => OffsetType::Int,
            2 => OffsetType::Float,
            _ => OffsetType::None,
        }
    }
}

/// Common header every buffer carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericHeader {
    pub size: u32,
    pub packet_type: PacketType,
    pub version: u8,
    pub flags: u8,
    pub signal_id: u32,
    pub payload_size: u32,
}

impl GenericHeader {
    pub fn can_release(&self) -> bool {
        self.flags & PACKET_FLAG_CAN_RELEASE != 0
    }

    pub fn offset_type(&self) -> OffsetType {
        OffsetType::from_flags(self.flags)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(GENERIC_HEADER_SIZE);
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.push(self.packet_type as u8);
        buf.push(self.version);
        buf.push(self.flags);
        buf.push(0); // padding
        buf.extend_from_slice(&self.signal_id.to_le_bytes());
        buf.extend_from_slice(&self.payload_size.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> DaqResult<Self> {
        if bytes.len() < GENERIC_HEADER_SIZE {
            return Err(DaqError::new(ErrorKind::PacketStreaming, "buffer shorter than generic header"));
        }
        Ok(Self {
            size: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            packet_type: PacketType::from_u8(bytes[4])?,
            version: bytes[5],
            flags: bytes[6],
            signal_id: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            payload_size: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

/// Extra fields a data header appends after the generic header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataHeaderExt {
    pub packet_id: i64,
    pub domain_packet_id: i64,
    pub sample_count: i64,
    pub offset_int: i64,
    pub offset_float: f64,
}

impl DataHeaderExt {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DATA_HEADER_EXTRA_SIZE);
        buf.extend_from_slice(&self.packet_id.to_le_bytes());
        buf.extend_from_slice(&self.domain_packet_id.to_le_bytes());
        buf.extend_from_slice(&self.sample_count.to_le_bytes());
        // offset is an 8-byte union selected by the generic header's offset-type flag bits
        buf.extend_from_slice(&self.offset_int.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8], offset_type: OffsetType) -> DaqResult<Self> {
        if bytes.len() < DATA_HEADER_EXTRA_SIZE {
            return Err(DaqError::new(ErrorKind::PacketStreaming, "buffer shorter than data header"));
        }
        let offset_bytes: [u8; 8] = bytes[24..32].try_into().unwrap();
        let (offset_int, offset_float) = match offset_type {
            OffsetType::Float => (0, f64::from_le_bytes(offset_bytes)),
            _ => (i64::from_le_bytes(offset_bytes), 0.0),
        };
        Ok(Self {
            packet_id: i64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            domain_packet_id: i64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            sample_count: i64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            offset_int,
            offset_float,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlreadySentHeaderExt {
    pub packet_id: i64,
    pub domain_packet_id: i64,
}

impl AlreadySentHeaderExt {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ALREADY_SENT_HEADER_EXTRA_SIZE);
        buf.extend_from_slice(&self.packet_id.to_le_bytes());
        buf.extend_from_slice(&self.domain_packet_id.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> DaqResult<Self> {
        if bytes.len() < ALREADY_SENT_HEADER_EXTRA_SIZE {
            return Err(DaqError::new(ErrorKind::PacketStreaming, "buffer shorter than already-sent header"));
        }
        Ok(Self {
            packet_id: i64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            domain_packet_id: i64::from_le_bytes(bytes[8..16].try_into().unwrap()),
        })
    }
}

pub fn offset_type_for(offset: Option<crate::signal::PacketOffset>) -> (OffsetType, i64, f64) {
    match offset {
        None => (OffsetType::None, 0, 0.0),
        Some(crate::signal::PacketOffset::Int(i)) => (OffsetType::Int, i, 0.0),
        Some(crate::signal::PacketOffset::Float(f)) => (OffsetType::Float, 0, f),
    }
}

pub fn flags_with_offset(base: u8, offset_type: OffsetType) -> u8 {
    base | (offset_type.bits() << PACKET_FLAG_OFFSET_TYPE_SHIFT)
}
