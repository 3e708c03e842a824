use std::path::PathBuf;

use aaxion::{CancellationToken, Capabilities, ToolPaths};
use clap::{ArgAction, Args, Subcommand};

mod checksum;
mod convert;
mod devices;
mod download;
mod lookup;

pub use convert::ConvertCommand;

#[derive(Subcommand, Debug)]
pub enum AaxionCommand {
    /// Decrypt AAX files into M4A audio and a cover image
    #[clap(visible_alias = "c")]
    Convert(convert::ConvertCommand),
    /// List activation bytes of the devices registered on this machine
    #[clap(visible_alias = "list-devices")]
    Devices(devices::DevicesCommand),
    /// Crack the activation bytes for checksums or AAX files
    Lookup(lookup::LookupCommand),
    /// Print the checksum rcrack would be keyed with
    Checksum(checksum::ChecksumCommand),
    /// Download the AAX file described by a license (.adh) file
    #[clap(visible_alias = "dl")]
    Download(download::DownloadCommand),
}

impl AaxionCommand {
    pub async fn run(self, global: &GlobalOptions, cancel: CancellationToken) -> anyhow::Result<()> {
        match self {
            Self::Convert(command) => command.run(global, cancel).await,
            Self::Devices(command) => command.run(global, cancel).await,
            Self::Lookup(command) => command.run(global, cancel).await,
            Self::Checksum(command) => command.run().await,
            Self::Download(command) => command.run(cancel).await,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct GlobalOptions {
    /// More logging output. Repeat for even more
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to ffmpeg. Searched in PATH by default
    #[clap(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe. Searched in PATH by default
    #[clap(long, global = true)]
    pub ffprobe: Option<PathBuf>,

    /// Path to the rcrack executable
    #[clap(long, global = true, env = "AAXION_RCRACK")]
    pub rcrack: Option<PathBuf>,

    /// Directory holding the rainbow tables used by rcrack
    #[clap(long, global = true, env = "AAXION_TABLES")]
    pub tables: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn tool_paths(&self) -> anyhow::Result<ToolPaths> {
        Ok(ToolPaths::locate(self.ffmpeg.clone(), self.ffprobe.clone())?)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::detect(self.rcrack.clone(), self.tables.clone())
    }
}

/// Expand each argument as a glob pattern. Existing paths are taken as is,
/// so names containing `[` still work.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];

    for pattern in patterns {
        let path = PathBuf::from(pattern);
        if path.exists() {
            files.push(path);
            continue;
        }

        let before = files.len();
        for file in glob::glob(pattern)? {
            files.push(file?);
        }
        if files.len() == before {
            tracing::warn!("No files match {pattern}");
        }
    }

    Ok(files)
}
