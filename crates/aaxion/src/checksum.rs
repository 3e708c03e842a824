use std::{fmt, io::SeekFrom, path::Path, str::FromStr};

use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};

use crate::error::{AaxionError, AaxionResult};

/// Absolute offset of the file checksum inside an AAX container.
pub const CHECKSUM_OFFSET: u64 = 0x28D;
/// Length of the file checksum in bytes.
pub const CHECKSUM_LEN: usize = 20;

/// The 20-byte fingerprint used as the rainbow-table lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checksum([u8; CHECKSUM_LEN]);

impl Checksum {
    pub const fn new(bytes: [u8; CHECKSUM_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn zeroed() -> Self {
        Self([0; CHECKSUM_LEN])
    }

    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Checksum {
    type Err = AaxionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| AaxionError::InvalidChecksum(s.to_string()))?;
        let bytes: [u8; CHECKSUM_LEN] = bytes
            .try_into()
            .map_err(|_| AaxionError::InvalidChecksum(s.to_string()))?;
        Ok(Self(bytes))
    }
}

/// Read the checksum, failing if the file cannot be opened or is too short.
pub async fn read_checksum<P>(path: P) -> AaxionResult<Checksum>
where
    P: AsRef<Path>,
{
    let mut file = File::open(path.as_ref()).await?;
    file.seek(SeekFrom::Start(CHECKSUM_OFFSET)).await?;

    let mut buffer = [0u8; CHECKSUM_LEN];
    file.read_exact(&mut buffer).await?;
    Ok(Checksum(buffer))
}

/// Read the checksum, falling back to an all-zero checksum on any I/O error.
///
/// An unreadable file still gets rejected later by the container brand check.
pub async fn extract_checksum<P>(path: P) -> Checksum
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    match read_checksum(path).await {
        Ok(checksum) => checksum,
        Err(e) => {
            tracing::error!("Failed to read checksum from {}: {e}", path.display());
            Checksum::zeroed()
        }
    }
}
