use std::path::PathBuf;

use crate::{
    activation::{Cracker, DeviceRegistry},
    error::AaxionResult,
};

/// Locations of the ffmpeg executables.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Use the given paths, searching `PATH` for the ones left out.
    pub fn locate(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> AaxionResult<Self> {
        let ffmpeg = match ffmpeg {
            Some(path) => path,
            None => which::which("ffmpeg")?,
        };
        let ffprobe = match ffprobe {
            Some(path) => path,
            None => which::which("ffprobe")?,
        };
        tracing::debug!("Using {} and {}", ffmpeg.display(), ffprobe.display());

        Ok(Self { ffmpeg, ffprobe })
    }
}

/// Activation sources that only exist on some platforms or installs.
///
/// Detected once at startup and passed down, so nothing else needs to check
/// the platform.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub registry: Option<DeviceRegistry>,
    pub cracker: Option<Cracker>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn detect(rcrack: Option<PathBuf>, tables: Option<PathBuf>) -> Self {
        let capabilities = Self {
            registry: DeviceRegistry::detect(),
            cracker: Cracker::locate(rcrack, tables),
        };
        tracing::debug!(
            "Device registry: {}, rcrack: {}",
            if capabilities.registry.is_some() { "available" } else { "unavailable" },
            match &capabilities.cracker {
                Some(cracker) => cracker.executable().display().to_string(),
                None => "unavailable".to_string(),
            }
        );
        capabilities
    }
}
