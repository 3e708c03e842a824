use aaxion::CancellationToken;
use clap::Args;

use super::GlobalOptions;

#[derive(Args, Clone, Debug)]
pub struct DevicesCommand {}

impl DevicesCommand {
    pub async fn run(self, global: &GlobalOptions, cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(registry) = global.capabilities().registry else {
            tracing::warn!("The device registry is not available on this platform.");
            return Ok(());
        };

        let table = registry.snapshot(&cancel).await?;
        if table.is_empty() {
            tracing::info!("No registered devices found.");
        }
        for (index, bytes) in table.iter() {
            println!("{index}: {bytes}");
        }

        Ok(())
    }
}
