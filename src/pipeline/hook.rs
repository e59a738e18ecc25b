use std::path::{Path, PathBuf};

use anyhow::Result;

/// A hook invoked between encoding and decoding in a [`roundtrip`](super::roundtrip).
///
/// Implement this trait to inject the host round-trip: upload the encoded
/// video, let the host re-encode it, download the result, and hand back the
/// local path of the downloaded copy for decoding.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use anyhow::Result;
/// use framevault::PipelineHook;
///
/// struct UploadHook;
///
/// impl PipelineHook for UploadHook {
///     fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf> {
///         // upload encoded_path to the video host ...
///         // download the re-encoded copy to a local file ...
///         Ok(encoded_path.to_path_buf()) // placeholder
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Called after encoding completes. `encoded_path` is the local path of
    /// the freshly written video. Return the path the decoder should read
    /// from — the same file, or a downloaded copy after the remote round-trip.
    fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf>;
}

/// A no-op hook that passes the encoded path through unchanged.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf> {
        Ok(encoded_path.to_path_buf())
    }
}
