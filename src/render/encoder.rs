use std::ffi::OsString;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::Child;
use std::process::ChildStdin;
use std::process::Command;
use std::process::Stdio;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::render::raster::Canvas;

/// Environment variable that overrides the configured encoder program
pub const FFMPEG_ENV: &str = "LOGVIZ_FFMPEG";

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Encoder \"{program}\" is unavailable: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write frame {frame} to the encoder: {source}")]
    Write {
        frame: usize,
        #[source]
        source: io::Error,
    },

    #[error("Frame {frame} is {got_w}x{got_h}, but the video is {exp_w}x{exp_h}")]
    FrameSize {
        frame: usize,
        exp_w: usize,
        exp_h: usize,
        got_w: usize,
        got_h: usize,
    },

    #[error("Encoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("No frames were written")]
    NoFrames,
}

/// Consumes rendered frames and turns them into a video.
pub trait FrameSink {
    /// Called once per frame, in playback order.
    fn write_frame(&mut self, frame: &Canvas) -> Result<(), EncodingError>;

    /// Called once after the last frame. Nothing is written after this.
    fn finish(&mut self) -> Result<(), EncodingError>;

    /// Called instead of `finish` when the render fails. Whatever was written is discarded.
    fn abort(&mut self);
}

struct Running {
    child: Child,
    stdin: ChildStdin,
    size: (usize, usize),
}

/// Pipes raw `rgb24` frames into an `ffmpeg` process that writes an H.264 MP4.
///
/// The process is started with the first frame, once the frame size is known.
pub struct FfmpegSink {
    program: OsString,
    output: PathBuf,
    interval_ms: u32,
    running: Option<Running>,
    frames: usize,

    /// Whether an encoder was started and the output may hold an unfinished video
    dirty: bool,
}

impl FfmpegSink {
    pub fn new(program: impl Into<OsString>, output: impl Into<PathBuf>, interval_ms: u32) -> Self {
        Self {
            program: program.into(),
            output: output.into(),
            interval_ms: interval_ms.max(1),
            running: None,
            frames: 0,
            dirty: false,
        }
    }

    /// Frames per second, as a rational ffmpeg understands
    fn frame_rate(&self) -> String {
        format!("1000/{}", self.interval_ms)
    }

    fn args(&self, width: usize, height: usize) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push(format!("{width}x{height}").into());
        args.push("-framerate".into());
        args.push(self.frame_rate().into());

        for arg in [
            "-i",
            "-",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ] {
            args.push(arg.into());
        }

        args.push(self.output.clone().into_os_string());

        args
    }

    fn spawn(&self, width: usize, height: usize) -> Result<Running, EncodingError> {
        let unavailable = |source| EncodingError::Unavailable {
            program: self.program.to_string_lossy().to_string(),
            source,
        };

        let args = self.args(width, height);
        debug!(?args, "Spawning encoder");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(unavailable)?;

        let Some(stdin) = child.stdin.take() else {
            return Err(unavailable(io::Error::other("no stdin pipe")));
        };

        Ok(Running {
            child,
            stdin,
            size: (width, height),
        })
    }

    /// Waits for the encoder and turns a failed exit into an error.
    fn reap(running: Running) -> Result<(), EncodingError> {
        let Running { child, stdin, .. } = running;
        drop(stdin);

        let output = child.wait_with_output().map_err(|source| EncodingError::Failed {
            status: "unknown status".to_string(),
            stderr: source.to_string(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        Err(EncodingError::Failed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Canvas) -> Result<(), EncodingError> {
        let (w, h) = (frame.width(), frame.height());

        let running = match self.running.take() {
            Some(running) => running,
            None => {
                let running = self.spawn(w, h)?;
                self.dirty = true;
                running
            }
        };
        let running = self.running.insert(running);

        if running.size != (w, h) {
            return Err(EncodingError::FrameSize {
                frame: self.frames,
                exp_w: running.size.0,
                exp_h: running.size.1,
                got_w: w,
                got_h: h,
            });
        }

        if let Err(source) = running.stdin.write_all(frame.bytes()) {
            // The encoder most likely died, its exit status says more than the broken pipe
            if let Some(running) = self.running.take() {
                Self::reap(running)?;
            }

            return Err(EncodingError::Write {
                frame: self.frames,
                source,
            });
        }

        self.frames += 1;

        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncodingError> {
        let Some(running) = self.running.take() else {
            return Err(EncodingError::NoFrames);
        };

        Self::reap(running)?;
        self.dirty = false;

        info!(
            frames = self.frames,
            output = %self.output.display(),
            "Wrote video"
        );

        Ok(())
    }

    fn abort(&mut self) {
        if let Some(running) = self.running.take() {
            let Running {
                mut child, stdin, ..
            } = running;
            drop(stdin);

            if let Err(e) = child.kill() {
                debug!("Encoder already exited: {e}");
            }

            if let Err(e) = child.wait() {
                warn!("Failed to wait for the encoder: {e}");
            }
        }

        if !self.dirty {
            return;
        }
        self.dirty = false;

        match std::fs::remove_file(&self.output) {
            Ok(()) => info!(output = %self.output.display(), "Removed partial video"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(output = %self.output.display(), "Failed to remove partial video: {e}"),
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}
