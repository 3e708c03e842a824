use std::path::Path;

use aaxion::{read_checksum, CancellationToken, Checksum};
use anyhow::Context;
use clap::Args;

use super::GlobalOptions;

#[derive(Args, Clone, Debug)]
pub struct LookupCommand {
    /// 40-digit hex checksums, or AAX files to read the checksum from
    #[clap(required = true)]
    pub targets: Vec<String>,
}

impl LookupCommand {
    async fn checksum(target: &str) -> anyhow::Result<Checksum> {
        if let Ok(checksum) = target.parse() {
            return Ok(checksum);
        }
        read_checksum(Path::new(target))
            .await
            .with_context(|| format!("{target} is neither a checksum nor a readable file"))
    }

    pub async fn run(self, global: &GlobalOptions, cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(cracker) = global.capabilities().cracker else {
            anyhow::bail!("rcrack is not available. Point --rcrack at the executable.");
        };

        let mut failed = 0;
        for target in &self.targets {
            let result = async {
                let checksum = Self::checksum(target).await?;
                let bytes = cracker.crack(&checksum, &cancel).await?;
                anyhow::Ok((checksum, bytes))
            }
            .await;

            match result {
                Ok((checksum, bytes)) => println!("{checksum}: {bytes}"),
                Err(e) => {
                    if cancel.is_cancelled() {
                        return Err(e);
                    }
                    tracing::error!("{target}: {e:#}");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{failed} lookup(s) failed.");
        }
        Ok(())
    }
}
