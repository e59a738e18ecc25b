use crate::config;

/// One fixed-size source chunk. `data` is always `MAX_PAYLOAD` bytes,
/// zero-padded past `payload_len`; the padded form feeds the fountain coder
/// while `payload_len` is what the packet header declares.
#[derive(Debug, Clone)]
pub struct SourceChunk {
    pub data: Vec<u8>,
    pub payload_len: usize,
}

/// Number of source chunks a stream of `len` bytes splits into.
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(config::MAX_PAYLOAD)
}

/// Split a byte stream into `MAX_PAYLOAD`-sized zero-padded source chunks.
/// The input must be non-empty; the pipeline rejects empty input before
/// chunking.
pub fn source_chunks(data: &[u8]) -> Vec<SourceChunk> {
    data.chunks(config::MAX_PAYLOAD)
        .map(|slice| {
            let mut padded = vec![0u8; config::MAX_PAYLOAD];
            padded[..slice.len()].copy_from_slice(slice);
            SourceChunk {
                data: padded,
                payload_len: slice.len(),
            }
        })
        .collect()
}
