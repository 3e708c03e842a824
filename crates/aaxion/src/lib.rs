pub mod activation;
pub mod checksum;
pub mod convert;
pub mod error;
pub mod license;
pub mod probe;
pub mod process;
pub mod progress;
pub mod tools;
pub mod transcode;
pub mod util;

pub use activation::{ActivationBytes, ActivationResolver, ActivationSource};
pub use checksum::{extract_checksum, read_checksum, Checksum};
pub use convert::{BatchReport, Conversion, ConvertOptions, Converter};
pub use error::{AaxionError, AaxionResult};
pub use license::{LicenseDescriptor, LicenseFetcher};
pub use probe::{ContainerMetadata, MetadataProbe};
pub use progress::{ProgressCallback, ProgressEvent, Stage};
pub use tools::{Capabilities, ToolPaths};
pub use transcode::{FfmpegLogLevel, OutputPaths, Transcoder};

// Re-export so callers can build tokens without depending on tokio-util.
pub use tokio_util::sync::CancellationToken;
