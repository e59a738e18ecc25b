use std::io;
use std::io::Write;
use std::process::{Child, Command, Stdio};

use log::info;

use crate::config::{self, FramevaultConfig};
use crate::pipeline::FrameSink;

/// Muxes RGBA frames into an FFV1/MKV video via the ffmpeg CLI.
///
/// FFV1 is lossless, so the demuxed frames come back bit-exact as long as the
/// file is not re-encoded in transit; slice CRCs let ffmpeg flag damage early.
pub struct VideoEncoder {
    child: Child,
    frames_pushed: u64,
    output_path: String,
}

impl VideoEncoder {
    pub fn create(output_path: &str, cfg: &FramevaultConfig) -> io::Result<Self> {
        let child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgba",
                "-video_size",
                &format!("{}x{}", config::FRAME_WIDTH, config::FRAME_HEIGHT),
                "-framerate",
                &cfg.fps.to_string(),
                "-i",
                "pipe:0",
                "-c:v",
                "ffv1",
                "-level",
                "3",
                "-slices",
                "4",
                "-slicecrc",
                "1",
                output_path,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self {
            child,
            frames_pushed: 0,
            output_path: output_path.to_owned(),
        })
    }

    /// Close the frame stream and wait for ffmpeg to finalize the container.
    pub fn finish(mut self) -> io::Result<()> {
        drop(self.child.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("ffmpeg exited with status {status}"),
            ));
        }
        info!(
            "muxed {} frames into {}",
            self.frames_pushed, self.output_path
        );
        Ok(())
    }
}

impl FrameSink for VideoEncoder {
    fn push_frame(&mut self, rgba: &[u8]) -> io::Result<()> {
        debug_assert_eq!(rgba.len(), config::FRAME_PIXELS);
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "encoder already finished"))?;
        stdin.write_all(rgba)?;
        self.frames_pushed += 1;
        Ok(())
    }
}
