//! Batch conversion: probe, resolve the key, transcode, one file at a time.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::{
    activation::{ActivationBytes, ActivationResolver},
    error::{AaxionError, AaxionResult},
    probe::{ContainerMetadata, MetadataProbe},
    transcode::{OutputPaths, TranscodeJob, Transcoder},
    util::sanitize_file_name_or,
};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub output_dir: PathBuf,
    /// Base name used instead of the one derived from metadata.
    pub output_name: Option<String>,
    pub loop_video: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_name: None,
            loop_video: false,
        }
    }
}

/// A successfully converted input.
#[derive(Debug)]
pub struct Conversion {
    pub input: PathBuf,
    pub metadata: ContainerMetadata,
    pub activation_bytes: ActivationBytes,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<Conversion>,
    pub failures: Vec<(PathBuf, AaxionError)>,
    /// Set when the batch stopped early. Inputs after the cancelled one were never started.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

pub struct Converter {
    probe: MetadataProbe,
    resolver: ActivationResolver,
    transcoder: Transcoder,
    options: ConvertOptions,
    cancel: CancellationToken,
}

impl Converter {
    pub fn new(
        probe: MetadataProbe,
        resolver: ActivationResolver,
        transcoder: Transcoder,
        options: ConvertOptions,
    ) -> Self {
        Self {
            probe,
            resolver,
            transcoder,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Base name for the outputs of the `position`-th input (1-based).
    ///
    /// Derived names look like `Artist - Title [Date]`. An explicit name is
    /// used as is for the first input and gets `_<position>` appended for the
    /// rest, so a batch never writes two inputs to the same files.
    pub fn output_base(&self, input: &Path, metadata: &ContainerMetadata, position: usize) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(name) = &self.options.output_name {
            let name = sanitize_file_name_or(name, &stem);
            return if position > 1 {
                format!("{name}_{position}")
            } else {
                name
            };
        }

        let mut base = match (metadata.artist.is_empty(), metadata.title.is_empty()) {
            (false, false) => format!("{} - {}", metadata.artist, metadata.title),
            (true, false) => metadata.title.clone(),
            (false, true) => metadata.artist.clone(),
            (true, true) => stem.clone(),
        };
        if !metadata.release_date.is_empty() {
            base.push_str(&format!(" [{}]", metadata.release_date));
        }
        sanitize_file_name_or(&base, &stem)
    }

    /// Convert a single input. `position` is its 1-based index in the batch.
    pub async fn convert(&self, input: &Path, position: usize) -> AaxionResult<Conversion> {
        if self.cancel.is_cancelled() {
            return Err(AaxionError::Cancelled);
        }

        let metadata = self.probe.metadata(input, &self.cancel).await?;
        tracing::info!(
            "{}: {} - {} ({}s, checksum {})",
            input.display(),
            metadata.artist,
            metadata.title,
            metadata.duration_seconds,
            metadata.checksum
        );

        let activation_bytes = self.resolver.resolve(&metadata.checksum, &self.cancel).await?;

        tokio::fs::create_dir_all(&self.options.output_dir).await?;
        let base = self.output_base(input, &metadata, position);
        let paths = OutputPaths::new(&self.options.output_dir, &base);
        let job = TranscodeJob {
            input,
            activation_bytes,
            duration_seconds: metadata.duration_seconds,
            outputs: &paths,
            loop_video: self.options.loop_video,
        };
        let outputs = self.transcoder.transcode(&job, &self.cancel).await?;

        Ok(Conversion {
            input: input.to_path_buf(),
            metadata,
            activation_bytes,
            outputs,
        })
    }

    /// Convert every input in order. A failed input is logged and skipped;
    /// cancellation stops the whole batch.
    pub async fn convert_all<I, P>(&self, inputs: I) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = BatchReport::default();

        for (index, input) in inputs.into_iter().enumerate() {
            let input = input.as_ref();
            match self.convert(input, index + 1).await {
                Ok(conversion) => {
                    tracing::info!("Converted {}", input.display());
                    report.succeeded.push(conversion);
                }
                Err(AaxionError::Cancelled) => {
                    tracing::warn!("Cancelled while converting {}", input.display());
                    report.cancelled = true;
                    break;
                }
                Err(error) => {
                    tracing::error!("Failed to convert {}: {error}", input.display());
                    report.failures.push((input.to_path_buf(), error));
                }
            }
        }

        report
    }
}
