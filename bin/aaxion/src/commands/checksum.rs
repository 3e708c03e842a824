use aaxion::extract_checksum;
use clap::Args;

use super::expand_inputs;

#[derive(Args, Clone, Debug)]
pub struct ChecksumCommand {
    /// AAX files or glob patterns
    #[clap(required = true)]
    pub files: Vec<String>,
}

impl ChecksumCommand {
    pub async fn run(self) -> anyhow::Result<()> {
        for file in expand_inputs(&self.files)? {
            let checksum = extract_checksum(&file).await;
            println!("{checksum}  {}", file.display());
        }
        Ok(())
    }
}
