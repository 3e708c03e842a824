//! Activation bytes and the chain of sources they are resolved from.
//!
//! Sources are tried in the order they were added to an
//! [`ActivationResolver`]. The first source that yields a value wins; a source
//! that has nothing to offer passes to the next one. Some failures are hard
//! stops instead, e.g. asking for a device the registry does not know about.

mod crack;
mod registry;

pub use crack::Cracker;
pub use registry::{DeviceActivationTable, DeviceRegistry};

use std::{fmt, str::FromStr};

use tokio_util::sync::CancellationToken;

use crate::{
    checksum::Checksum,
    error::{AaxionError, AaxionResult},
    Capabilities,
};

/// Marker the registry uses for empty device slots. Never a usable value.
pub const SENTINEL: [u8; 4] = [0xFF; 4];

/// The 4-byte secret needed to decrypt an AAX audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationBytes([u8; 4]);

impl ActivationBytes {
    /// Build from the first four bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> AaxionResult<Self> {
        let Some(head) = bytes.get(..4) else {
            return Err(AaxionError::InvalidActivationBytes(hex::encode_upper(bytes)));
        };

        let mut value = [0u8; 4];
        value.copy_from_slice(head);
        if value == SENTINEL {
            return Err(AaxionError::InvalidActivationBytes(hex::encode_upper(value)));
        }
        Ok(Self(value))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ActivationBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for ActivationBytes {
    type Err = AaxionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 8 {
            return Err(AaxionError::InvalidActivationBytes(s.to_string()));
        }

        let bytes =
            hex::decode(digits).map_err(|_| AaxionError::InvalidActivationBytes(s.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// One link of the resolution chain.
pub enum ActivationSource {
    /// Bytes given by the user. Always wins when present.
    Explicit(ActivationBytes),
    /// Bytes registered on this machine by the vendor's desktop software.
    Registry {
        registry: DeviceRegistry,
        device: Option<u32>,
    },
    /// Bytes recovered from the file checksum with rainbow tables.
    Crack(Cracker),
}

impl ActivationSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "command line",
            Self::Registry { .. } => "device registry",
            Self::Crack(_) => "rainbow table crack",
        }
    }

    /// `Ok(None)` means this source has nothing and the next one should be tried.
    pub async fn resolve(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> AaxionResult<Option<ActivationBytes>> {
        match self {
            Self::Explicit(bytes) => Ok(Some(*bytes)),
            Self::Registry { registry, device } => {
                let table = registry.snapshot(cancel).await?;
                match device {
                    Some(index) => table
                        .get(*index)
                        .map(Some)
                        .ok_or(AaxionError::DeviceNotFound(*index)),
                    None => Ok(table.first().map(|(_, bytes)| bytes)),
                }
            }
            Self::Crack(cracker) => cracker.crack(checksum, cancel).await.map(Some),
        }
    }
}

#[derive(Default)]
pub struct ActivationResolver {
    sources: Vec<ActivationSource>,
}

impl ActivationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard chain: explicit bytes, then the device registry,
    /// then (only if `crack` is set) the rainbow table crack.
    pub fn from_options(
        explicit: Option<ActivationBytes>,
        device: Option<u32>,
        crack: bool,
        capabilities: &Capabilities,
    ) -> Self {
        let mut resolver = Self::new();

        if let Some(bytes) = explicit {
            resolver.push(ActivationSource::Explicit(bytes));
        }

        match &capabilities.registry {
            Some(registry) => resolver.push(ActivationSource::Registry {
                registry: registry.clone(),
                device,
            }),
            None if device.is_some() => {
                tracing::warn!("Device registry is not available on this platform, ignoring --device.")
            }
            None => {}
        }

        if crack {
            match &capabilities.cracker {
                Some(cracker) => resolver.push(ActivationSource::Crack(cracker.clone())),
                None => tracing::warn!("rcrack is not available, activation bytes can not be cracked."),
            }
        }

        resolver
    }

    pub fn with_source(mut self, source: ActivationSource) -> Self {
        self.push(source);
        self
    }

    pub fn push(&mut self, source: ActivationSource) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[ActivationSource] {
        &self.sources
    }

    pub async fn resolve(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> AaxionResult<ActivationBytes> {
        for source in &self.sources {
            if let Some(bytes) = source.resolve(checksum, cancel).await? {
                tracing::info!("Using activation bytes {bytes} from {}.", source.name());
                return Ok(bytes);
            }
            tracing::debug!("No activation bytes from {}.", source.name());
        }

        Err(AaxionError::NoActivationBytes)
    }
}
