use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::chunker;
use crate::config::{self, FramevaultConfig};
use crate::crypto;
use crate::fountain;
use crate::metadata::{self, FileMetadata};
use crate::packet;
use crate::pixels;
use crate::pipeline::{CodecError, FrameSink};
use crate::video::encoder::VideoEncoder;

/// Frame counts for one encoded stream.
#[derive(Debug, Clone, Copy)]
pub struct EncodeReport {
    pub source_count: usize,
    pub repair_count: usize,
    pub total_frames: usize,
}

/// Core encode pipeline: bytes -> [encrypt] -> chunk -> repairs -> packets ->
/// pixels -> sink. Frames are rendered and released one at a time, so peak
/// memory is the chunk set plus a single frame.
pub fn encode_bytes(
    name: &str,
    mime: &str,
    data: &[u8],
    password: Option<&str>,
    sink: &mut dyn FrameSink,
) -> Result<EncodeReport, CodecError> {
    if data.is_empty() {
        return Err(CodecError::EmptyInput);
    }
    if data.len() > u32::MAX as usize {
        return Err(CodecError::InputTooLarge);
    }

    let encrypted = password.is_some();
    let stream = match password {
        Some(pw) => crypto::encrypt(data, pw)?,
        None => data.to_vec(),
    };

    let chunks = chunker::source_chunks(&stream);
    let n = chunks.len();
    info!("split {} bytes into {} source chunks", stream.len(), n);

    let payload_lens: Vec<usize> = chunks.iter().map(|c| c.payload_len).collect();
    let buffers: Vec<Vec<u8>> = chunks.into_iter().map(|c| c.data).collect();
    let repairs = fountain::generate_repair_packets(&buffers, config::REDUNDANCY_RATIO);
    let m = repairs.len();
    let total = (1 + n + m) as u32;
    info!("generated {} repair packets, {} frames total", m, total);

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    let meta = FileMetadata {
        name: name.to_owned(),
        original_size: data.len() as u32,
        mime: mime.to_owned(),
        encrypted,
    };
    let meta_flags = if encrypted { config::FLAG_ENCRYPTED } else { 0 };
    let meta_payload = metadata::encode_metadata(&meta);
    emit(sink, &packet::encode_packet(0, total, &meta_payload, meta_flags))?;
    progress.inc(1);

    for (i, buffer) in buffers.iter().enumerate() {
        let payload = &buffer[..payload_lens[i]];
        emit(sink, &packet::encode_packet((1 + i) as u32, total, payload, 0))?;
        progress.inc(1);
    }

    for repair in &repairs {
        let index = 1 + n as u32 + repair.repair_index;
        emit(
            sink,
            &packet::encode_packet(index, total, &repair.data, config::FLAG_REPAIR),
        )?;
        progress.inc(1);
    }

    progress.finish_with_message("encode complete");

    Ok(EncodeReport {
        source_count: n,
        repair_count: m,
        total_frames: total as usize,
    })
}

fn emit(sink: &mut dyn FrameSink, frame: &[u8]) -> Result<(), CodecError> {
    sink.push_frame(&pixels::bytes_to_pixels(frame))?;
    Ok(())
}

/// File front-end: read the input, encode into an FFV1/MKV video at
/// `output_path`.
pub fn encode_file(
    input_path: &Path,
    output_path: &str,
    password: Option<&str>,
    mime: &str,
    cfg: &FramevaultConfig,
) -> Result<EncodeReport> {
    let data = std::fs::read(input_path)
        .with_context(|| format!("failed to read input file {}", input_path.display()))?;
    let name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_owned());

    info!("encoding {} ({} bytes) to {}", name, data.len(), output_path);

    let mut encoder = VideoEncoder::create(output_path, cfg)
        .context("failed to start video encoder — is ffmpeg installed?")?;
    let report = encode_bytes(&name, mime, &data, password, &mut encoder)?;
    encoder.finish().context("video encoder failed")?;

    info!(
        "wrote {} frames ({} source, {} repair)",
        report.total_frames, report.source_count, report.repair_count
    );
    Ok(report)
}
