//! Two-pass H.264/AAC transcoding.
//!
//! Two passes hit a target bitrate (and so a predictable file size): the
//! first pass only analyses the input and writes rate-control stats to a
//! pass log, the second pass encodes using those stats.
//!
//! References:
//! - <https://trac.ffmpeg.org/wiki/Encode/H.264>

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use transcode_models::Conversion;

use crate::command::{FfmpegCommand, FfmpegRunner, NULL_OUTPUT};
use crate::error::{MediaError, MediaResult};

const VIDEO_CODEC: &str = "libx264";
const VIDEO_PROFILE: &str = "high";
const VIDEO_PRESET: &str = "slow";
const CONTAINER_FORMAT: &str = "mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Analyse,
    Encode,
}

impl Pass {
    pub fn number(&self) -> u8 {
        match self {
            Pass::Analyse => 1,
            Pass::Encode => 2,
        }
    }
}

/// Scales and re-encodes one file according to a [`Conversion`].
#[derive(Debug, Clone)]
pub struct TwoPassTranscoder {
    input: PathBuf,
    output: PathBuf,
    conversion: Conversion,
}

impl TwoPassTranscoder {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>, conversion: Conversion) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            conversion,
        }
    }

    /// Command for one pass. The first pass discards its output.
    pub fn pass_command(&self, pass: Pass, passlog: &Path) -> FfmpegCommand {
        let output = match pass {
            Pass::Analyse => Path::new(NULL_OUTPUT),
            Pass::Encode => self.output.as_path(),
        };

        FfmpegCommand::new(&self.input, output)
            .video_codec(VIDEO_CODEC)
            .profile(VIDEO_PROFILE)
            .preset(VIDEO_PRESET)
            .video_bitrate_kbps(self.conversion.video_kilobit_rate)
            .bufsize_kbits(self.conversion.buffer_kilobits())
            .video_filter(format!("scale={}", self.conversion.scale))
            .threads(0)
            .pass(pass.number(), passlog)
            .audio_codec(&self.conversion.audio_codec)
            .audio_bitrate_kbps(self.conversion.audio_kilobit_rate)
            .format(CONTAINER_FORMAT)
    }

    /// Run both passes. The pass log lives in a temporary directory that is
    /// removed when this returns.
    pub async fn run(&self, runner: &FfmpegRunner) -> MediaResult<()> {
        if !tokio::fs::try_exists(&self.input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(self.input.clone()));
        }

        let passlog_dir = tempfile::Builder::new().prefix("ffmpeg2pass").tempdir()?;
        let passlog = passlog_dir.path().join("ffmpeg2pass");

        info!(
            input = %self.input.display(),
            output = %self.output.display(),
            scale = %self.conversion.scale,
            video_kbps = self.conversion.video_kilobit_rate,
            audio_kbps = self.conversion.audio_kilobit_rate,
            "Transcoding file"
        );

        for pass in [Pass::Analyse, Pass::Encode] {
            debug!(pass = pass.number(), "Starting FFmpeg pass");
            runner.run(&self.pass_command(pass, &passlog)).await?;
        }

        Ok(())
    }
}
