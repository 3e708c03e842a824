use std::path::PathBuf;

use aaxion::{
    ActivationBytes, ActivationResolver, CancellationToken, ConvertOptions, Converter,
    FfmpegLogLevel, MetadataProbe, Transcoder,
};
use anyhow::bail;
use clap::Args;

use super::{expand_inputs, GlobalOptions};
use crate::progress::terminal_progress;

#[derive(Args, Clone, Debug)]
pub struct ConvertCommand {
    /// Activation bytes to decrypt with, as 8 hex digits
    #[clap(short, long)]
    pub activation_bytes: Option<ActivationBytes>,

    /// Index of the registered device whose activation bytes to use
    #[clap(short, long)]
    pub device: Option<u32>,

    /// Crack the activation bytes with rcrack when no other source has them
    #[clap(long)]
    pub crack: bool,

    /// Output file name, without extension. Defaults to "artist - title [date]"
    #[clap(short, long)]
    pub output: Option<String>,

    /// Directory to write the output files to
    #[clap(short = 'O', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also render a looped still-image video from the cover and audio
    #[clap(short = 'l', long = "loop")]
    pub loop_video: bool,

    /// AAX files or glob patterns
    pub files: Vec<String>,
}

impl ConvertCommand {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub async fn run(self, global: &GlobalOptions, cancel: CancellationToken) -> anyhow::Result<()> {
        let files = expand_inputs(&self.files)?;
        if files.is_empty() {
            bail!("No input files.");
        }

        let tools = global.tool_paths()?;
        let resolver = ActivationResolver::from_options(
            self.activation_bytes,
            self.device,
            self.crack,
            &global.capabilities(),
        );
        let transcoder = Transcoder::new(
            tools.ffmpeg,
            FfmpegLogLevel::from_verbosity(global.verbose),
            terminal_progress(),
        );
        let converter = Converter::new(
            MetadataProbe::new(tools.ffprobe),
            resolver,
            transcoder,
            ConvertOptions {
                output_dir: self.output_dir,
                output_name: self.output,
                loop_video: self.loop_video,
            },
        )
        .with_cancel(cancel);

        let report = converter.convert_all(&files).await;
        tracing::info!(
            "{} of {} file(s) converted.",
            report.success_count(),
            files.len()
        );

        if report.cancelled {
            bail!("Conversion cancelled.");
        }
        if !report.failures.is_empty() {
            bail!("{} file(s) failed to convert.", report.failure_count());
        }
        Ok(())
    }
}
