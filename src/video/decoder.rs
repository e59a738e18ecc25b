use std::io;
use std::process::{Child, Command, Stdio};

use log::info;

use crate::config;
use crate::pipeline::FrameSource;
use crate::video::read_exact_or_eof;

/// Demuxes a video file back into RGBA frames via the ffmpeg CLI.
pub struct VideoDecoder {
    child: Child,
    frames_read: u64,
    done: bool,
}

impl VideoDecoder {
    pub fn open(input_path: &str) -> io::Result<Self> {
        let child = Command::new("ffmpeg")
            .args([
                "-i",
                input_path,
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self {
            child,
            frames_read: 0,
            done: false,
        })
    }
}

impl FrameSource for VideoDecoder {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        let stdout = self
            .child
            .stdout
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "decoder stdout closed"))?;

        let mut frame = vec![0u8; config::FRAME_PIXELS];
        if read_exact_or_eof(stdout, &mut frame)? {
            self.frames_read += 1;
            return Ok(Some(frame));
        }

        self.done = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("ffmpeg exited with status {status}"),
            ));
        }
        info!("demuxed {} frames", self.frames_read);
        Ok(None)
    }
}
