//! The ffmpeg stages that turn one AAX container into playable files.
//!
//! Stages run strictly in order: [`Stage::Decode`], [`Stage::ExtractCover`]
//! and, when requested, [`Stage::Loop`]. The first failing stage stops the
//! job. Files written by earlier stages are kept.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{
    activation::ActivationBytes,
    error::AaxionResult,
    process::ExternalProcess,
    progress::{ProgressCallback, ProgressEvent, Stage, TimecodeProgress},
    util::AaxionPathExt,
};

/// Value passed to ffmpeg's `-loglevel`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FfmpegLogLevel {
    Quiet,
    #[default]
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl FfmpegLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        }
    }

    /// Map a `-v` count to a log level.
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => Self::Error,
            1 => Self::Info,
            _ => Self::Debug,
        }
    }
}

/// Files produced for one input, sharing a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub audio: PathBuf,
    pub cover: PathBuf,
    pub video: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, base_name: &str) -> Self {
        Self {
            audio: dir.join_with_extension(base_name, "m4a"),
            cover: dir.join_with_extension(base_name, "jpg"),
            video: dir.join_with_extension(base_name, "mp4"),
        }
    }

    pub fn for_stage(&self, stage: Stage) -> &Path {
        match stage {
            Stage::Decode => &self.audio,
            Stage::ExtractCover => &self.cover,
            Stage::Loop => &self.video,
        }
    }
}

pub struct TranscodeJob<'a> {
    pub input: &'a Path,
    pub activation_bytes: ActivationBytes,
    pub duration_seconds: u64,
    pub outputs: &'a OutputPaths,
    pub loop_video: bool,
}

impl TranscodeJob<'_> {
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::Decode, Stage::ExtractCover];
        if self.loop_video {
            stages.push(Stage::Loop);
        }
        stages
    }
}

pub struct Transcoder {
    ffmpeg: PathBuf,
    loglevel: FfmpegLogLevel,
    progress: ProgressCallback,
}

impl Transcoder {
    pub fn new<P>(ffmpeg: P, loglevel: FfmpegLogLevel, progress: ProgressCallback) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            ffmpeg: ffmpeg.into(),
            loglevel,
            progress,
        }
    }

    fn command(&self, stage: Stage, job: &TranscodeJob<'_>) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-hide_banner", "-nostdin", "-y"])
            .args(["-loglevel", self.loglevel.as_str()])
            .args(["-progress", "pipe:1", "-nostats"]);

        // The AAX demuxer refuses to open the container without the key,
        // even when only the cover stream is copied.
        let activation_bytes = job.activation_bytes.to_string();
        match stage {
            Stage::Decode => {
                command
                    .args(["-activation_bytes", &activation_bytes])
                    .arg("-i")
                    .arg(job.input)
                    .args(["-vn", "-c:a", "copy"]);
            }
            Stage::ExtractCover => {
                command
                    .args(["-activation_bytes", &activation_bytes])
                    .arg("-i")
                    .arg(job.input)
                    .args(["-an", "-c:v", "copy", "-frames:v", "1"]);
            }
            Stage::Loop => {
                command
                    .args(["-loop", "1", "-framerate", "1", "-i"])
                    .arg(&job.outputs.cover)
                    .arg("-i")
                    .arg(&job.outputs.audio)
                    .args(["-c:v", "libx264", "-tune", "stillimage", "-pix_fmt", "yuv420p"])
                    .args(["-r", "1", "-c:a", "copy", "-shortest"]);
            }
        }
        command.arg(job.outputs.for_stage(stage));
        command
    }

    async fn run_stage(
        &self,
        stage: Stage,
        job: &TranscodeJob<'_>,
        cancel: &CancellationToken,
    ) -> AaxionResult<()> {
        tracing::debug!("{stage} -> {}", job.outputs.for_stage(stage).display());

        let mut tracker = TimecodeProgress::new(stage, job.duration_seconds);
        let progress = self.progress.clone();
        ExternalProcess::new(self.command(stage, job))
            .run(cancel, |line| {
                if let Some(event) = tracker.feed_line(line) {
                    progress(event);
                }
            })
            .await?
            .ensure_success()?;

        (self.progress)(ProgressEvent::Transcode {
            stage,
            percent: 100,
        });
        (self.progress)(ProgressEvent::StageFinished { stage });
        Ok(())
    }

    /// Run every stage of `job`, returning the files written.
    pub async fn transcode(
        &self,
        job: &TranscodeJob<'_>,
        cancel: &CancellationToken,
    ) -> AaxionResult<Vec<PathBuf>> {
        let mut produced = Vec::new();
        for stage in job.stages() {
            self.run_stage(stage, job, cancel).await?;
            produced.push(job.outputs.for_stage(stage).to_path_buf());
        }
        Ok(produced)
    }
}
