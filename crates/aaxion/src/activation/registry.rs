use std::{collections::BTreeMap, path::PathBuf};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{ActivationBytes, SENTINEL};
use crate::{error::AaxionResult, process::ExternalProcess};

/// Registry key where the vendor's desktop software stores per-device bytes.
pub const SWGIDMAP_KEY: &str = r"HKLM\SOFTWARE\WOW6432Node\Audible\SWGIDMAP";

/// Activation bytes registered on this machine, keyed by device index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceActivationTable(BTreeMap<u32, ActivationBytes>);

impl DeviceActivationTable {
    /// Build a table from raw registry slots. Sentinel slots are dropped.
    pub fn from_raw<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, [u8; 4])>,
    {
        Self(
            entries
                .into_iter()
                .filter(|(_, raw)| *raw != SENTINEL)
                .filter_map(|(index, raw)| {
                    ActivationBytes::from_bytes(&raw)
                        .ok()
                        .map(|bytes| (index, bytes))
                })
                .collect(),
        )
    }

    pub fn get(&self, index: u32) -> Option<ActivationBytes> {
        self.0.get(&index).copied()
    }

    pub fn first(&self) -> Option<(u32, ActivationBytes)> {
        self.0.iter().next().map(|(index, bytes)| (*index, *bytes))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, ActivationBytes)> + '_ {
        self.0.iter().map(|(index, bytes)| (*index, *bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the output of `reg query <SWGIDMAP_KEY>`.
    ///
    /// Each `REG_BINARY` value stores the device's activation bytes in its
    /// first four bytes, least significant byte first.
    pub fn parse_reg_query(output: &str) -> Self {
        let entries = output.lines().filter_map(|line| {
            let mut columns = line.split_whitespace();
            let index = columns.next()?.parse::<u32>().ok()?;
            if columns.next()? != "REG_BINARY" {
                return None;
            }

            let data = columns.next()?;
            let raw = hex::decode(data.get(..8)?).ok()?;
            let mut raw: [u8; 4] = raw.try_into().ok()?;
            raw.reverse();
            Some((index, raw))
        });

        Self::from_raw(entries)
    }
}

/// Where device activation bytes come from.
#[derive(Debug, Clone)]
pub enum DeviceRegistry {
    /// Query the Windows registry through `reg.exe`.
    Reg { executable: PathBuf },
    /// A table known ahead of time.
    Fixed(DeviceActivationTable),
}

impl DeviceRegistry {
    /// The registry source available on the current platform, if any.
    pub fn detect() -> Option<Self> {
        if cfg!(windows) {
            Some(Self::Reg {
                executable: PathBuf::from("reg"),
            })
        } else {
            None
        }
    }

    pub fn fixed(table: DeviceActivationTable) -> Self {
        Self::Fixed(table)
    }

    /// Read the current table. A missing key yields an empty table.
    pub async fn snapshot(&self, cancel: &CancellationToken) -> AaxionResult<DeviceActivationTable> {
        match self {
            Self::Fixed(table) => Ok(table.clone()),
            Self::Reg { executable } => {
                let mut command = Command::new(executable);
                command.args(["query", SWGIDMAP_KEY]);

                let output = ExternalProcess::new(command).run(cancel, |_| {}).await?;
                if !output.success() {
                    tracing::debug!("Registry key {SWGIDMAP_KEY} is not readable: {}", output.stderr_tail());
                    return Ok(DeviceActivationTable::default());
                }

                let table = DeviceActivationTable::parse_reg_query(&output.stdout);
                tracing::debug!("Found {} registered device(s).", table.len());
                Ok(table)
            }
        }
    }
}
