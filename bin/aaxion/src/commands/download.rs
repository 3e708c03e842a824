use std::path::PathBuf;

use aaxion::{
    license::{base_url, DEFAULT_DOWNLOAD_HOST},
    CancellationToken, LicenseDescriptor, LicenseFetcher,
};
use clap::Args;

use crate::progress::terminal_progress;

#[derive(Args, Clone, Debug)]
pub struct DownloadCommand {
    /// License file
    pub license: PathBuf,

    /// Directory to save the download to
    #[clap(short = 'O', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Download host, optionally with a scheme
    #[clap(long, default_value = DEFAULT_DOWNLOAD_HOST)]
    pub host: String,
}

impl DownloadCommand {
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let license = LicenseDescriptor::from_file(&self.license).await?;
        tracing::debug!("{license:?}");

        let fetcher = LicenseFetcher::new(terminal_progress())?.with_base_url(base_url(&self.host)?);
        let target = fetcher.download(&license, &self.output_dir, &cancel).await?;
        tracing::info!("Saved {}", target.display());

        Ok(())
    }
}
