use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{
    checksum::{extract_checksum, Checksum},
    error::{AaxionError, AaxionResult},
    process::ExternalProcess,
};

/// Major brand of the containers this crate can convert.
pub const AAX_BRAND: &str = "aax";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ProbeFormat {
    fn tag(&self, key: &str) -> String {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_default()
    }

    fn duration_seconds(&self) -> u64 {
        self.duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.floor() as u64)
            .unwrap_or_default()
    }
}

/// What we know about one input container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMetadata {
    /// Lowercased major brand, e.g. `aax`.
    pub filetype: String,
    pub artist: String,
    pub title: String,
    pub release_date: String,
    pub duration_seconds: u64,
    pub checksum: Checksum,
}

impl ContainerMetadata {
    fn from_probe(format: &ProbeFormat, checksum: Checksum) -> Self {
        Self {
            filetype: format.tag("major_brand").to_lowercase(),
            artist: format.tag("artist"),
            title: format.tag("title"),
            release_date: format.tag("date"),
            duration_seconds: format.duration_seconds(),
            checksum,
        }
    }

    pub fn is_aax(&self) -> bool {
        self.filetype == AAX_BRAND
    }

    /// Reject anything that is not an AAX container.
    pub fn validate(self, path: &Path) -> AaxionResult<Self> {
        if self.is_aax() {
            Ok(self)
        } else {
            Err(AaxionError::InvalidContainer {
                path: path.to_path_buf(),
                brand: self.filetype,
            })
        }
    }
}

/// Reads container metadata with `ffprobe`.
#[derive(Debug, Clone)]
pub struct MetadataProbe {
    ffprobe: PathBuf,
}

impl MetadataProbe {
    pub fn new<P>(ffprobe: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    async fn probe_format(&self, path: &Path, cancel: &CancellationToken) -> AaxionResult<ProbeFormat> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "error", "-print_format", "json", "-show_format"])
            .arg(path);

        let output = ExternalProcess::new(command)
            .run(cancel, |_| {})
            .await?
            .ensure_success()?;
        let parsed: ProbeOutput = serde_json::from_str(&output.stdout)?;
        Ok(parsed.format)
    }

    /// Probe tags and read the checksum concurrently, without validating the brand.
    pub async fn inspect(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> AaxionResult<ContainerMetadata> {
        let (format, checksum) = tokio::join!(self.probe_format(path, cancel), extract_checksum(path));
        Ok(ContainerMetadata::from_probe(&format?, checksum))
    }

    /// Probe and validate `path`. Only AAX containers pass.
    pub async fn metadata(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> AaxionResult<ContainerMetadata> {
        let metadata = self.inspect(path, cancel).await?;
        tracing::debug!("Probed {}: {metadata:?}", path.display());
        metadata.validate(path)
    }
}
