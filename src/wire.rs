//! Wire formats for burst and motion packets.
//!
//! Both codecs use fixed little-endian headers. The channel carries one
//! packet kind per stream, so neither format spends bytes on a type tag.

use thiserror::Error;

pub use crate::core::constants::{BURST_HEADER_SIZE, MAX_BURST_ID, MOTION_PACKET_SIZE};

/// One redundant copy of a burst payload.
///
/// Wire format:
/// ```text
/// +0   Burst Id (4 bytes LE32)
/// +4   Sequence Index (4 bytes LE32)
/// +8   Payload Length (4 bytes LE32)
/// +12  Payload (variable)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstPacket {
    /// Idempotency key shared by every copy in the burst, drawn from
    /// `[0, MAX_BURST_ID]`.
    pub id: u32,
    /// 1-based position of this copy within the burst. Informational;
    /// receivers do not require gap-free delivery.
    pub seq: u32,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

impl BurstPacket {
    /// Create a new burst packet.
    pub fn new(id: u32, seq: u32, payload: Vec<u8>) -> Self {
        Self { id, seq, payload }
    }

    /// Total wire size.
    pub fn wire_size(&self) -> usize {
        BURST_HEADER_SIZE + self.payload.len()
    }

    /// Encode to wire format (12-byte header + payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.seq.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Encode into an existing buffer, returns bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, WireError> {
        let size = self.wire_size();
        if buf.len() < size {
            return Err(WireError::BufferTooSmall {
                required: size,
                available: buf.len(),
            });
        }

        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.seq.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf[12..size].copy_from_slice(&self.payload);

        Ok(size)
    }

    /// Decode from wire format. Trailing bytes beyond the declared payload
    /// length are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < BURST_HEADER_SIZE {
            return Err(WireError::TooShort {
                expected: BURST_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let id = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let seq = u32::from_le_bytes(data[4..8].try_into().unwrap());
        let len = u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize;

        if data.len() < BURST_HEADER_SIZE + len {
            return Err(WireError::TooShort {
                expected: BURST_HEADER_SIZE + len,
                actual: data.len(),
            });
        }

        let payload = data[BURST_HEADER_SIZE..BURST_HEADER_SIZE + len].to_vec();

        Ok(Self { id, seq, payload })
    }
}

/// Keyframe flag value on the wire.
const FLAG_KEYFRAME: u8 = 0;
/// Delta flag value on the wire.
const FLAG_DELTA: u8 = 1;

/// Kind of motion packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// Absolute orientation snapshot; resynchronizes the receiver.
    Keyframe,
    /// Relative change since the sender's last sent snapshot.
    Delta,
}

/// Rotation update for the two tracked joints.
///
/// Wire format:
/// ```text
/// +0   Flag (1 byte: 0 = keyframe, 1 = delta)
/// +1   A rotation X/Y/Z (3 x f32 LE, radians)
/// +13  B rotation X/Y/Z (3 x f32 LE, radians)
/// ```
///
/// Angles are Euler XYZ: absolute orientations for keyframes, relative
/// rotations for deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPacket {
    /// Keyframe or delta.
    pub kind: MotionKind,
    /// Joint A angles (radians).
    pub a: [f32; 3],
    /// Joint B angles (radians).
    pub b: [f32; 3],
}

impl MotionPacket {
    /// Create a keyframe packet carrying absolute orientations.
    pub fn keyframe(a: [f32; 3], b: [f32; 3]) -> Self {
        Self {
            kind: MotionKind::Keyframe,
            a,
            b,
        }
    }

    /// Create a delta packet carrying relative rotations.
    pub fn delta(a: [f32; 3], b: [f32; 3]) -> Self {
        Self {
            kind: MotionKind::Delta,
            a,
            b,
        }
    }

    /// Whether this packet is a delta.
    pub fn is_delta(&self) -> bool {
        self.kind == MotionKind::Delta
    }

    /// Encode to wire format (25 bytes).
    pub fn encode(&self) -> [u8; MOTION_PACKET_SIZE] {
        let mut buf = [0u8; MOTION_PACKET_SIZE];
        buf[0] = match self.kind {
            MotionKind::Keyframe => FLAG_KEYFRAME,
            MotionKind::Delta => FLAG_DELTA,
        };
        for (i, angle) in self.a.iter().chain(self.b.iter()).enumerate() {
            let at = 1 + i * 4;
            buf[at..at + 4].copy_from_slice(&angle.to_le_bytes());
        }
        buf
    }

    /// Decode from wire format.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < MOTION_PACKET_SIZE {
            return Err(WireError::TooShort {
                expected: MOTION_PACKET_SIZE,
                actual: data.len(),
            });
        }

        let kind = match data[0] {
            FLAG_KEYFRAME => MotionKind::Keyframe,
            FLAG_DELTA => MotionKind::Delta,
            flag => return Err(WireError::InvalidFlag(flag)),
        };

        let mut angles = [0f32; 6];
        for (i, angle) in angles.iter_mut().enumerate() {
            let at = 1 + i * 4;
            *angle = f32::from_le_bytes(data[at..at + 4].try_into().unwrap());
        }

        Ok(Self {
            kind,
            a: [angles[0], angles[1], angles[2]],
            b: [angles[3], angles[4], angles[5]],
        })
    }
}

/// Wire encoding/decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input data is shorter than required.
    #[error("packet too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Output buffer is too small to hold encoded data.
    #[error("buffer too small: required {required} bytes, available {available}")]
    BufferTooSmall {
        /// Bytes needed for encoding.
        required: usize,
        /// Bytes available in buffer.
        available: usize,
    },

    /// Motion packet flag byte is neither keyframe nor delta.
    #[error("invalid motion flag: {0}")]
    InvalidFlag(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_roundtrip() {
        let packet = BurstPacket::new(0x1234_5678, 3, vec![1, 2, 3, 4, 5]);

        let encoded = packet.encode();
        assert_eq!(encoded.len(), BURST_HEADER_SIZE + 5);

        let decoded = BurstPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_burst_empty_payload() {
        let packet = BurstPacket::new(7, 1, Vec::new());

        let encoded = packet.encode();
        assert_eq!(encoded.len(), BURST_HEADER_SIZE);
        assert_eq!(BurstPacket::decode(&encoded).unwrap(), packet);
    }

    #[test]
    fn test_burst_decode_too_short() {
        let data = [0u8; 8];
        let result = BurstPacket::decode(&data);
        assert!(matches!(result, Err(WireError::TooShort { .. })));
    }

    #[test]
    fn test_burst_decode_truncated_payload() {
        let packet = BurstPacket::new(1, 2, vec![1, 2, 3, 4, 5]);
        let mut encoded = packet.encode();
        encoded.truncate(14);

        let result = BurstPacket::decode(&encoded);
        assert!(matches!(result, Err(WireError::TooShort { .. })));
    }

    #[test]
    fn test_burst_decode_trailing_bytes() {
        let packet = BurstPacket::new(1, 2, vec![9, 9]);
        let mut encoded = packet.encode();
        encoded.extend_from_slice(&[0xFF; 16]);

        assert_eq!(BurstPacket::decode(&encoded).unwrap(), packet);
    }

    #[test]
    fn test_burst_encode_into_small_buffer() {
        let packet = BurstPacket::new(1, 2, vec![1, 2, 3]);
        let mut buf = [0u8; 10];

        let result = packet.encode_into(&mut buf);
        assert!(matches!(result, Err(WireError::BufferTooSmall { .. })));
    }

    #[test]
    fn test_burst_encode_into_buffer() {
        let packet = BurstPacket::new(42, 2, vec![1, 2, 3]);
        let mut buf = [0u8; 64];

        let written = packet.encode_into(&mut buf).unwrap();
        assert_eq!(written, BURST_HEADER_SIZE + 3);
        assert_eq!(BurstPacket::decode(&buf[..written]).unwrap(), packet);
    }

    #[test]
    fn test_motion_keyframe_roundtrip() {
        let packet = MotionPacket::keyframe([0.1, -0.2, 0.3], [1.0, 0.0, -1.5]);

        let encoded = packet.encode();
        assert_eq!(encoded.len(), MOTION_PACKET_SIZE);
        assert_eq!(encoded[0], 0);

        let decoded = MotionPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
        assert!(!decoded.is_delta());
    }

    #[test]
    fn test_motion_delta_roundtrip() {
        let packet = MotionPacket::delta([0.01, 0.02, -0.03], [0.0, 0.0, 0.04]);

        let encoded = packet.encode();
        assert_eq!(encoded[0], 1);

        let decoded = MotionPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
        assert!(decoded.is_delta());
    }

    #[test]
    fn test_motion_decode_too_short() {
        let data = [0u8; MOTION_PACKET_SIZE - 1];
        let result = MotionPacket::decode(&data);
        assert!(matches!(result, Err(WireError::TooShort { .. })));
    }

    #[test]
    fn test_motion_decode_invalid_flag() {
        let packet = MotionPacket::keyframe([0.0; 3], [0.0; 3]);
        let mut encoded = packet.encode();
        encoded[0] = 0x7F;

        let result = MotionPacket::decode(&encoded);
        assert_eq!(result, Err(WireError::InvalidFlag(0x7F)));
    }
}
