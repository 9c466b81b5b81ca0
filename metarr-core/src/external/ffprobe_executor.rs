//! FFprobe integration for the metadata pre-check.
//!
//! Runs `ffprobe -v quiet -print_format json -show_format -show_streams` and
//! decodes the container tags, stream codecs and thumbnail dispositions.
//! The call may carry a deadline; a probe that overruns it is killed.

use crate::error::{CoreError, CoreResult, command_start_error};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Stream disposition flags reported by ffprobe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbeDisposition {
    pub attached_pic: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeStream {
    pub index: i64,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub disposition: ProbeDisposition,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeFormat {
    pub format_name: Option<String>,
    pub tags: HashMap<String, String>,
}

/// Decoded ffprobe output.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeOutput {
    pub streams: Vec<ProbeStream>,
    pub format: ProbeFormat,
}

impl ProbeOutput {
    pub fn from_json(bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::Ffprobe(format!("bad JSON: {e}")))
    }

    /// True when a video stream is flagged as an attached picture.
    pub fn has_embedded_thumbnail(&self) -> bool {
        self.streams.iter().any(|s| {
            s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 1
        })
    }

    /// Container tag, matched case-insensitively.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.format
            .tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Codec of the first real (non thumbnail) video stream.
    pub fn video_codec(&self) -> Option<&str> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic != 1)
            .and_then(|s| s.codec_name.as_deref())
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .and_then(|s| s.codec_name.as_deref())
    }
}

/// Trait for running ffprobe against a file.
pub trait FfprobeExecutor: Send + Sync {
    fn probe(&self, input_path: &Path, timeout: Option<Duration>) -> CoreResult<ProbeOutput>;
}

/// Runs the `ffprobe` binary from `PATH`.
#[derive(Debug, Clone, Default)]
pub struct CommandFfprobeExecutor;

impl CommandFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CommandFfprobeExecutor {
    fn probe(&self, input_path: &Path, timeout: Option<Duration>) -> CoreResult<ProbeOutput> {
        log::debug!("Running ffprobe on: {}", input_path.display());
        let mut child = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(input_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| command_start_error("ffprobe", e))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::Ffprobe("stdout was not captured".to_string()))?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = timeout.map(|t| Instant::now() + t);
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CoreError::Ffprobe(format!(
                    "timed out probing {}",
                    input_path.display()
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let output = reader
            .join()
            .map_err(|_| CoreError::Ffprobe("output reader panicked".to_string()))??;
        if !status.success() {
            return Err(CoreError::Ffprobe(format!(
                "ffprobe exited with {} for {}",
                status,
                input_path.display()
            )));
        }
        ProbeOutput::from_json(&output)
    }
}
