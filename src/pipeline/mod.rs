pub mod decode;
pub mod encode;
pub mod hook;

use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{self, FramevaultConfig};
use crate::crypto::CryptoError;
use crate::metadata::MetadataError;
use hook::PipelineHook;

/// Errors surfaced by the codec core.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("input is empty")]
    EmptyInput,
    #[error("input larger than {} bytes", u32::MAX)]
    InputTooLarge,
    #[error("no decodable frames in the input stream")]
    NoFrames,
    #[error("metadata frame missing or corrupt")]
    MetadataLost,
    #[error("stream is encrypted but no password was given")]
    PasswordRequired,
    #[error("source chunk {0} could not be recovered")]
    UnrecoverableLoss(u32),
    #[error("malformed metadata: {0}")]
    MalformedMetadata(#[from] MetadataError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("frame transport failed: {0}")]
    Io(#[from] io::Error),
}

/// Consumes rendered frames in order. The concrete sink is the muxer seam:
/// the codec promises each buffer is a full RGBA raster and nothing else.
pub trait FrameSink {
    fn push_frame(&mut self, rgba: &[u8]) -> io::Result<()>;
}

/// Yields demuxed frames in order, `None` at end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// In-memory sink, for tests and for callers that mux themselves.
#[derive(Default)]
pub struct MemoryFrameSink {
    pub frames: Vec<Vec<u8>>,
}

impl FrameSink for MemoryFrameSink {
    fn push_frame(&mut self, rgba: &[u8]) -> io::Result<()> {
        self.frames.push(rgba.to_vec());
        Ok(())
    }
}

/// In-memory source over a recorded frame sequence.
pub struct MemoryFrameSource {
    frames: std::vec::IntoIter<Vec<u8>>,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.frames.next())
    }
}

/// Result of a full encode → hook → decode roundtrip.
pub struct RoundtripResult {
    /// SHA-256 hex digest of the original input file.
    pub original_hash: String,
    /// SHA-256 hex digest of the decoded output file.
    pub decoded_hash: String,
    /// `true` if the hashes match (lossless round-trip).
    pub matched: bool,
}

/// Run a full encode → hook → decode roundtrip.
///
/// Steps:
/// 1. SHA-256 hashes `input`.
/// 2. Encodes `input` → `encoded_path`.
/// 3. Calls `hook.after_encode(encoded_path)` — upload/download happens here.
/// 4. Decodes the path returned by the hook → `output`.
/// 5. SHA-256 hashes `output` and compares with the original.
pub fn roundtrip<H: PipelineHook>(
    input: &Path,
    encoded_path: &str,
    output: &Path,
    password: Option<&str>,
    cfg: &FramevaultConfig,
    hook: &H,
) -> Result<RoundtripResult> {
    let original_hash = sha256_file(input)?;

    encode::encode_file(input, encoded_path, password, config::DEFAULT_MIME, cfg)?;

    let decode_from = hook.after_encode(Path::new(encoded_path))?;

    decode::decode_file(decode_from.to_string_lossy().as_ref(), output, password)?;

    let decoded_hash = sha256_file(output)?;
    let matched = original_hash == decoded_hash;

    Ok(RoundtripResult {
        original_hash,
        decoded_hash,
        matched,
    })
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
