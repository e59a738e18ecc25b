use byteorder::{ByteOrder, LittleEndian};

use crate::config;
use crate::integrity;

// Header field offsets (19 bytes total, all integers little-endian)
const OFF_MAGIC: usize = 0;
const OFF_FLAGS: usize = 2;
const OFF_PACKET_INDEX: usize = 3;
const OFF_TOTAL_PACKETS: usize = 7;
const OFF_PAYLOAD_LEN: usize = 11;
const OFF_CRC: usize = 15;

/// Parsed packet header fields.
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub flags: u8,
    pub packet_index: u32,
    pub total_packets: u32,
    pub payload_length: u32,
    pub checksum: u32,
}

impl PacketHeader {
    pub fn is_repair(&self) -> bool {
        self.flags & config::FLAG_REPAIR != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & config::FLAG_ENCRYPTED != 0
    }
}

/// Serialize one packet into a frame-sized buffer: header, payload, zero
/// padding up to `FRAME_BYTES`. The checksum covers exactly the payload as
/// supplied.
pub fn encode_packet(index: u32, total: u32, payload: &[u8], flags: u8) -> Vec<u8> {
    assert!(payload.len() <= config::MAX_PAYLOAD);

    let mut buf = vec![0u8; config::FRAME_BYTES];
    LittleEndian::write_u16(&mut buf[OFF_MAGIC..], config::MAGIC);
    buf[OFF_FLAGS] = flags;
    LittleEndian::write_u32(&mut buf[OFF_PACKET_INDEX..], index);
    LittleEndian::write_u32(&mut buf[OFF_TOTAL_PACKETS..], total);
    LittleEndian::write_u32(&mut buf[OFF_PAYLOAD_LEN..], payload.len() as u32);
    LittleEndian::write_u32(&mut buf[OFF_CRC..], integrity::crc32(payload));
    buf[config::PACKET_HEADER_SIZE..config::PACKET_HEADER_SIZE + payload.len()]
        .copy_from_slice(payload);
    buf
}

/// Parse a packet out of a raw frame buffer.
///
/// Returns `None` when the buffer is too short for a header, the magic does
/// not match, or the declared payload overruns the buffer — any of which
/// means the frame is not (or no longer) a framevault packet. The checksum is
/// deliberately NOT verified here; callers verify separately so that a
/// corrupt-but-recognizable packet can still be classified.
pub fn decode_packet(raw: &[u8]) -> Option<(PacketHeader, &[u8])> {
    if raw.len() < config::PACKET_HEADER_SIZE {
        return None;
    }
    if LittleEndian::read_u16(&raw[OFF_MAGIC..]) != config::MAGIC {
        return None;
    }

    let header = PacketHeader {
        flags: raw[OFF_FLAGS],
        packet_index: LittleEndian::read_u32(&raw[OFF_PACKET_INDEX..]),
        total_packets: LittleEndian::read_u32(&raw[OFF_TOTAL_PACKETS..]),
        payload_length: LittleEndian::read_u32(&raw[OFF_PAYLOAD_LEN..]),
        checksum: LittleEndian::read_u32(&raw[OFF_CRC..]),
    };

    let end = config::PACKET_HEADER_SIZE.checked_add(header.payload_length as usize)?;
    if end > raw.len() {
        return None;
    }
    Some((header, &raw[config::PACKET_HEADER_SIZE..end]))
}

/// Check a decoded payload against its header checksum.
pub fn verify_packet(payload: &[u8], checksum: u32) -> bool {
    integrity::verify_payload(payload, checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = vec![0xAA; 256];
        let raw = encode_packet(3, 12, &payload, config::FLAG_REPAIR);
        assert_eq!(raw.len(), config::FRAME_BYTES);

        let (header, got) = decode_packet(&raw).unwrap();
        assert_eq!(header.packet_index, 3);
        assert_eq!(header.total_packets, 12);
        assert_eq!(header.payload_length, 256);
        assert_eq!(header.checksum, integrity::crc32(&payload));
        assert!(header.is_repair());
        assert!(!header.is_encrypted());
        assert_eq!(got, payload.as_slice());
        assert!(verify_packet(got, header.checksum));
    }

    #[test]
    fn test_padding_is_zero() {
        let raw = encode_packet(0, 1, b"xyz", 0);
        assert!(raw[config::PACKET_HEADER_SIZE + 3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_payload() {
        let raw = encode_packet(0, 1, b"", 0);
        let (header, payload) = decode_packet(&raw).unwrap();
        assert_eq!(header.payload_length, 0);
        assert!(payload.is_empty());
        // CRC of the empty slice
        assert_eq!(header.checksum, 0);
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(decode_packet(&[0u8; 18]).is_none());
        assert!(decode_packet(&[]).is_none());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut raw = encode_packet(0, 1, b"data", 0);
        raw[0] ^= 0xFF;
        assert!(decode_packet(&raw).is_none());
    }

    #[test]
    fn test_overrunning_payload_length_rejected() {
        let mut raw = encode_packet(0, 1, b"data", 0);
        // Declare more payload than the frame can hold
        byteorder::LittleEndian::write_u32(&mut raw[OFF_PAYLOAD_LEN..], config::FRAME_BYTES as u32);
        assert!(decode_packet(&raw).is_none());
    }

    #[test]
    fn test_corrupt_payload_fails_verify() {
        let mut raw = encode_packet(7, 9, &[0x5A; 100], 0);
        raw[config::PACKET_HEADER_SIZE + 40] ^= 0x01;
        let (header, payload) = decode_packet(&raw).unwrap();
        assert!(!verify_packet(payload, header.checksum));
    }

    #[test]
    fn test_encrypted_flag() {
        let raw = encode_packet(0, 1, b"meta", config::FLAG_ENCRYPTED);
        let (header, _) = decode_packet(&raw).unwrap();
        assert!(header.is_encrypted());
        assert!(!header.is_repair());
    }
}
