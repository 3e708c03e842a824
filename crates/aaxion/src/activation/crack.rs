use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::ActivationBytes;
use crate::{
    checksum::Checksum,
    error::{AaxionError, AaxionResult},
    process::ExternalProcess,
};

static RCRACK_RESULT_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hex:([0-9a-fA-F]{8})").unwrap());

/// Recovers activation bytes from a file checksum with `rcrack` and a set of
/// precomputed rainbow tables.
#[derive(Debug, Clone)]
pub struct Cracker {
    executable: PathBuf,
    tables: PathBuf,
}

impl Cracker {
    /// A relative `executable` with a directory part is made absolute, since
    /// rcrack runs from the tables' parent directory. Bare names are looked up
    /// in `PATH`.
    pub fn new<E, T>(executable: E, tables: T) -> Self
    where
        E: Into<PathBuf>,
        T: Into<PathBuf>,
    {
        Self {
            executable: absolute_program(executable.into()),
            tables: tables.into(),
        }
    }

    /// Use the given paths, or the copies bundled next to the running binary.
    ///
    /// Returns `None` when no rcrack executable exists at the resolved path.
    pub fn locate(executable: Option<PathBuf>, tables: Option<PathBuf>) -> Option<Self> {
        let executable = executable.or_else(default_executable)?;
        if !executable.is_file() {
            tracing::debug!("rcrack not found at {}", executable.display());
            return None;
        }

        let tables = tables
            .or_else(default_tables)
            .unwrap_or_else(|| PathBuf::from("tables"));
        Some(Self::new(executable, tables))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn tables(&self) -> &Path {
        &self.tables
    }

    fn command(&self, checksum: &Checksum) -> Command {
        let (cwd, tables) = match (self.tables.parent(), self.tables.file_name()) {
            (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                (parent.to_path_buf(), PathBuf::from(name))
            }
            _ => (PathBuf::from("."), self.tables.clone()),
        };

        let mut command = Command::new(&self.executable);
        command
            .current_dir(cwd)
            .arg(tables)
            .arg("-h")
            .arg(checksum.to_string());
        command
    }

    /// Look up the activation bytes for `checksum`.
    ///
    /// This can take a long time and is only bounded by `cancel`.
    pub async fn crack(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> AaxionResult<ActivationBytes> {
        tracing::info!("Cracking activation bytes for checksum {checksum}...");

        let output = ExternalProcess::new(self.command(checksum))
            .run(cancel, |line| tracing::trace!("rcrack: {line}"))
            .await?;

        if !output.stderr.trim().is_empty() {
            return Err(AaxionError::CrackFailed(output.stderr_tail()));
        }
        if !output.success() {
            return Err(AaxionError::CrackFailed(format!(
                "rcrack exited with {}",
                output.status
            )));
        }

        parse_rcrack_output(&output.stdout)
            .ok_or_else(|| AaxionError::ActivationBytesNotFound(checksum.to_string()))?
    }
}

fn parse_rcrack_output(stdout: &str) -> Option<AaxionResult<ActivationBytes>> {
    RCRACK_RESULT_REGEXP
        .captures(stdout)
        .map(|captures| captures[1].parse())
}

fn absolute_program(path: PathBuf) -> PathBuf {
    if path.is_absolute() || path.components().count() < 2 {
        return path;
    }
    match std::path::absolute(&path) {
        Ok(absolute) => absolute,
        Err(error) => {
            tracing::warn!("Failed to resolve {}: {error}", path.display());
            path
        }
    }
}

fn bundle_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()?
        .parent()
        .map(Path::to_path_buf)
}

fn default_executable() -> Option<PathBuf> {
    let name = if cfg!(windows) { "rcrack.exe" } else { "rcrack" };
    Some(
        bundle_dir()?
            .join("bin")
            .join(std::env::consts::OS)
            .join(name),
    )
}

fn default_tables() -> Option<PathBuf> {
    Some(bundle_dir()?.join("tables"))
}
