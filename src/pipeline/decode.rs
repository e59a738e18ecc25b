use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use crate::chunker;
use crate::config;
use crate::crypto;
use crate::fountain::{self, RepairPacket};
use crate::metadata;
use crate::packet::{self, PacketHeader};
use crate::pixels;
use crate::pipeline::{CodecError, FrameSource};
use crate::video::decoder::VideoDecoder;

/// A reassembled file: the original name, media type and bytes.
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

struct ReceivedFrame {
    header: PacketHeader,
    payload: Vec<u8>,
    valid: bool,
}

/// How far the declared packet total may exceed the received frame count
/// before the frame-0 header is treated as corrupt. Covers a demuxer that
/// legitimately dropped a tail of frames without permitting a bogus count to
/// size the decoder's allocations.
const DECLARED_TOTAL_SLACK: usize = 1024;

/// Core decode pipeline: frames -> packets -> classify -> peel -> reassemble
/// -> trim -> [decrypt].
pub fn decode_frames(
    source: &mut dyn FrameSource,
    password: Option<&str>,
) -> Result<DecodedFile, CodecError> {
    // Drain the demuxer first; frame order is positional and must be kept.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {pos} frames received")
            .unwrap(),
    );
    let mut rgba_frames = Vec::new();
    while let Some(frame) = source.next_frame()? {
        rgba_frames.push(frame);
        spinner.inc(1);
    }
    spinner.finish_and_clear();
    info!("received {} frames from demuxer", rgba_frames.len());

    // Frames are independent until classification; parse them in parallel.
    let frames: Vec<Option<ReceivedFrame>> = rgba_frames
        .par_iter()
        .map(|rgba| {
            let raw = pixels::pixels_to_bytes(rgba);
            packet::decode_packet(&raw).map(|(header, payload)| ReceivedFrame {
                valid: packet::verify_packet(payload, header.checksum),
                payload: payload.to_vec(),
                header,
            })
        })
        .collect();
    drop(rgba_frames);

    if frames.iter().all(Option::is_none) {
        return Err(CodecError::NoFrames);
    }

    let meta_frame = match frames.first() {
        Some(Some(f)) if f.valid => f,
        _ => return Err(CodecError::MetadataLost),
    };
    let meta = metadata::decode_metadata(&meta_frame.payload)?;
    if meta.encrypted && password.is_none() {
        return Err(CodecError::PasswordRequired);
    }

    // The packet checksum covers only the payload, so total_packets arrives
    // unprotected. The demuxer preserves frame count, which bounds how far
    // the declared total may exceed what actually arrived; past that the
    // header is corrupt and the walk below must not size itself from it.
    let total = meta_frame.header.total_packets as usize;
    if total > frames.len().saturating_add(DECLARED_TOTAL_SLACK) {
        warn!(
            "frame 0 declares {} packets but only {} frames arrived; header corrupt",
            total,
            frames.len()
        );
        return Err(CodecError::MetadataLost);
    }
    info!(
        "metadata: name={:?} size={} mime={:?} encrypted={} frames={}",
        meta.name, meta.original_size, meta.mime, meta.encrypted, total
    );

    // Classify frames 1..total. Received frames partition by their repair
    // flag in order of appearance; positions with no usable header consume
    // whichever partition still has quota left. Quotas follow from inverting
    // total = 1 + n + max(1, ceil(0.3 n)).
    let (expected_sources, expected_repairs) = derive_layout(total);
    let stream_len = meta.original_size as usize
        + if meta.encrypted { config::ENVELOPE_OVERHEAD } else { 0 };
    if chunker::chunk_count(stream_len) != expected_sources {
        warn!(
            "metadata size {} implies {} source chunks but the frame count implies {}",
            meta.original_size,
            chunker::chunk_count(stream_len),
            expected_sources
        );
    }
    let mut slots: Vec<Option<Vec<u8>>> = Vec::new();
    let mut received_repairs: Vec<(u32, Vec<u8>)> = Vec::new();
    let mut repair_cursor: u32 = 0;

    for pos in 1..total {
        match frames.get(pos) {
            Some(Some(f)) if f.header.is_repair() => {
                if f.valid {
                    received_repairs.push((repair_cursor, padded(&f.payload)));
                }
                repair_cursor += 1;
            }
            Some(Some(f)) => {
                slots.push(if f.valid { Some(padded(&f.payload)) } else { None });
            }
            _ => {
                if slots.len() < expected_sources {
                    slots.push(None);
                } else {
                    repair_cursor += 1;
                }
            }
        }
    }

    let source_count = slots.len();
    if source_count != expected_sources || repair_cursor as usize != expected_repairs {
        warn!(
            "frame classification found {}+{} packets where the layout implies {}+{}",
            source_count, repair_cursor, expected_sources, expected_repairs
        );
    }
    if source_count == 0 {
        return Err(CodecError::UnrecoverableLoss(0));
    }

    let missing_before = slots.iter().filter(|s| s.is_none()).count();
    let repairs: Vec<RepairPacket> = received_repairs
        .into_iter()
        .map(|(index, data)| RepairPacket {
            repair_index: index,
            source_indices: fountain::repair_sources(index, source_count),
            data,
        })
        .collect();

    fountain::recover_packets(&mut slots, &repairs);

    if let Some(i) = slots.iter().position(Option::is_none) {
        return Err(CodecError::UnrecoverableLoss(i as u32));
    }
    if missing_before > 0 {
        info!(
            "fountain recovery rebuilt {} of {} source chunks",
            missing_before, source_count
        );
    }

    let mut stream = Vec::with_capacity(source_count * config::MAX_PAYLOAD);
    for chunk in slots.iter().flatten() {
        stream.extend_from_slice(chunk);
    }

    let bytes = if meta.encrypted {
        stream.truncate(meta.original_size as usize + config::ENVELOPE_OVERHEAD);
        let pw = password.ok_or(CodecError::PasswordRequired)?;
        crypto::decrypt(&stream, pw)?
    } else {
        stream.truncate(meta.original_size as usize);
        stream
    };

    Ok(DecodedFile {
        name: meta.name,
        mime: meta.mime,
        bytes,
    })
}

/// Invert `total = 1 + n + max(1, ceil(0.3 n))`. The right-hand side is
/// strictly increasing in `n`, so at most one split fits, and `n` sits at
/// most a few steps below `(total - 1) / 1.3`.
fn derive_layout(total: usize) -> (usize, usize) {
    let stream_frames = total.saturating_sub(1);
    let upper = (stream_frames * 10 / 13).max(1);
    for n in (upper.saturating_sub(3).max(1)..=upper).rev() {
        let m = fountain::repair_count(n, config::REDUNDANCY_RATIO);
        if n + m == stream_frames {
            return (n, m);
        }
    }
    warn!(
        "declared frame count {} matches no source/repair split; treating every data frame as a source",
        total
    );
    (stream_frames, 0)
}

fn padded(payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; config::MAX_PAYLOAD];
    let len = payload.len().min(config::MAX_PAYLOAD);
    buf[..len].copy_from_slice(&payload[..len]);
    buf
}

/// File front-end: demux `input_path`, decode, write the recovered bytes to
/// `output_path`.
pub fn decode_file(
    input_path: &str,
    output_path: &Path,
    password: Option<&str>,
) -> Result<DecodedFile> {
    let mut decoder = VideoDecoder::open(input_path)
        .context("failed to start video decoder — is ffmpeg installed?")?;
    let decoded = decode_frames(&mut decoder, password)?;

    let mut outfile = File::create(output_path)
        .with_context(|| format!("failed to create output file {}", output_path.display()))?;
    outfile
        .write_all(&decoded.bytes)
        .context("failed to write output data")?;
    outfile.flush()?;

    info!(
        "recovered {:?} ({} bytes) to {}",
        decoded.name,
        decoded.bytes.len(),
        output_path.display()
    );
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use byteorder::{ByteOrder, LittleEndian};

    use super::*;
    use crate::pipeline::encode::encode_bytes;
    use crate::pipeline::{MemoryFrameSink, MemoryFrameSource};

    fn encode_to_frames(data: &[u8], password: Option<&str>) -> Vec<Vec<u8>> {
        let mut sink = MemoryFrameSink::default();
        encode_bytes("a.bin", "application/octet-stream", data, password, &mut sink).unwrap();
        sink.frames
    }

    fn decode(frames: Vec<Vec<u8>>, password: Option<&str>) -> Result<DecodedFile, CodecError> {
        decode_frames(&mut MemoryFrameSource::new(frames), password)
    }

    fn blank(frames: &mut [Vec<u8>], pos: usize) {
        // A hosting pipeline that mangles a frame beyond recognition still
        // yields a raster at that position, just not one of ours.
        frames[pos] = vec![0u8; config::FRAME_PIXELS];
    }

    /// Flip the pixel channel carrying data byte `offset` of frame `pos`.
    fn corrupt_data_byte(frames: &mut [Vec<u8>], pos: usize, offset: usize) {
        let rgba_index = (offset / 3) * 4 + offset % 3;
        frames[pos][rgba_index] ^= 0xFF;
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_roundtrip_small_file() {
        let data: Vec<u8> = (0..=255).collect();
        let frames = encode_to_frames(&data, None);
        assert_eq!(frames.len(), 3);

        let decoded = decode(frames, None).unwrap();
        assert_eq!(decoded.name, "a.bin");
        assert_eq!(decoded.mime, "application/octet-stream");
        assert_eq!(decoded.bytes, data);
    }

    #[test]
    fn test_roundtrip_multi_chunk() {
        let data = pattern(15 * 1024 * 1024);
        let frames = encode_to_frames(&data, None);
        // 3 sources + 1 repair + metadata
        assert_eq!(frames.len(), 5);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_dropped_source_is_recovered() {
        let data = pattern(15 * 1024 * 1024);
        let mut frames = encode_to_frames(&data, None);
        blank(&mut frames, 2);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_corrupted_source_is_recovered() {
        let data = pattern(15 * 1024 * 1024);
        let mut frames = encode_to_frames(&data, None);
        corrupt_data_byte(&mut frames, 3, config::PACKET_HEADER_SIZE + 1000);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_dropped_repair_still_decodes() {
        let data = pattern(15 * 1024 * 1024);
        let mut frames = encode_to_frames(&data, None);
        blank(&mut frames, 4);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_dropped_metadata_is_fatal() {
        let data = pattern(15 * 1024 * 1024);
        let mut frames = encode_to_frames(&data, None);
        blank(&mut frames, 0);
        assert!(matches!(decode(frames, None), Err(CodecError::MetadataLost)));
    }

    #[test]
    fn test_corrupted_metadata_is_fatal() {
        let mut frames = encode_to_frames(b"some data", None);
        corrupt_data_byte(&mut frames, 0, config::PACKET_HEADER_SIZE + 2);
        assert!(matches!(decode(frames, None), Err(CodecError::MetadataLost)));
    }

    #[test]
    fn test_malformed_metadata_is_reported() {
        // A frame 0 whose payload passes its CRC but does not parse as a
        // descriptor must surface as MalformedMetadata, not MetadataLost.
        let mut frames = encode_to_frames(b"some data", None);
        let raw = pixels::pixels_to_bytes(&frames[0]);
        let (header, payload) = packet::decode_packet(&raw).unwrap();
        let truncated = &payload[..payload.len() - 1];
        frames[0] = pixels::bytes_to_pixels(&packet::encode_packet(
            0,
            header.total_packets,
            truncated,
            header.flags,
        ));
        assert!(matches!(
            decode(frames, None),
            Err(CodecError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_corrupt_total_count_is_rejected() {
        // total_packets sits outside the payload checksum; a flipped high bit
        // must be caught by the received-count bound, not drive allocation.
        let frames = encode_to_frames(b"some data", None);
        for bogus_total in [u32::MAX, 1 << 20] {
            let mut frames = frames.clone();
            let mut raw = pixels::pixels_to_bytes(&frames[0]);
            LittleEndian::write_u32(&mut raw[7..11], bogus_total);
            frames[0] = pixels::bytes_to_pixels(&raw);
            assert!(matches!(decode(frames, None), Err(CodecError::MetadataLost)));
        }
    }

    #[test]
    fn test_truncated_tail_still_decodes() {
        // Losing the trailing repair frame entirely (shorter stream, not a
        // blanked raster) stays within the declared-total slack.
        let data: Vec<u8> = (0..=255).collect();
        let mut frames = encode_to_frames(&data, None);
        frames.truncate(2);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_no_frames() {
        assert!(matches!(decode(Vec::new(), None), Err(CodecError::NoFrames)));

        let garbage = vec![vec![0u8; config::FRAME_PIXELS]; 4];
        assert!(matches!(decode(garbage, None), Err(CodecError::NoFrames)));
    }

    #[test]
    fn test_unrecoverable_loss_reports_first_missing_source() {
        let data: Vec<u8> = (0..=255).collect();
        let mut frames = encode_to_frames(&data, None);
        blank(&mut frames, 1);
        blank(&mut frames, 2);
        assert!(matches!(
            decode(frames, None),
            Err(CodecError::UnrecoverableLoss(0))
        ));
    }

    #[test]
    fn test_single_source_recovered_from_repair_copy() {
        let data: Vec<u8> = (0..=255).collect();
        let mut frames = encode_to_frames(&data, None);
        blank(&mut frames, 1);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let frames = encode_to_frames(b"hello world", Some("p@ssw0rd"));
        let decoded = decode(frames, Some("p@ssw0rd")).unwrap();
        assert_eq!(decoded.bytes, b"hello world");
    }

    #[test]
    fn test_wrong_password_fails_auth() {
        let frames = encode_to_frames(b"hello world", Some("p@ssw0rd"));
        assert!(matches!(
            decode(frames, Some("wrong")),
            Err(CodecError::Crypto(
                crate::crypto::CryptoError::DecryptionAuthFailure
            ))
        ));
    }

    #[test]
    fn test_missing_password_is_reported() {
        let frames = encode_to_frames(b"hello world", Some("p@ssw0rd"));
        assert!(matches!(decode(frames, None), Err(CodecError::PasswordRequired)));
    }

    #[test]
    fn test_encrypted_roundtrip_survives_source_loss() {
        let data = pattern(15 * 1024 * 1024);
        let mut frames = encode_to_frames(&data, Some("pw"));
        blank(&mut frames, 1);
        assert_eq!(decode(frames, Some("pw")).unwrap().bytes, data);
    }

    #[test]
    fn test_trailing_garbage_frames_are_ignored() {
        let data: Vec<u8> = (0..=255).collect();
        let mut frames = encode_to_frames(&data, None);
        frames.push(vec![0xEE; config::FRAME_PIXELS]);
        assert_eq!(decode(frames, None).unwrap().bytes, data);
    }

    #[test]
    fn test_derive_layout() {
        for n in [1usize, 2, 3, 4, 5, 10, 16, 64, 100] {
            let m = fountain::repair_count(n, config::REDUNDANCY_RATIO);
            assert_eq!(derive_layout(1 + n + m), (n, m));
        }
    }
}
