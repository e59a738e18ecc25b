use crc::{Crc, CRC_32_ISO_HDLC};

/// CRC-32 (IEEE 802.3): reflected, poly 0xEDB88320, init/final-xor 0xFFFFFFFF.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the CRC-32 of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Check a payload against the checksum carried in its packet header.
pub fn verify_payload(payload: &[u8], expected: u32) -> bool {
    crc32(payload) == expected
}
