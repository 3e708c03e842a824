use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AaxionError, AaxionResult},
    process::with_cancel,
    progress::{ProgressCallback, ProgressEvent},
    util::{sanitize_file_name_or, AaxionPathExt},
};

pub const DEFAULT_DOWNLOAD_HOST: &str = "cds.audible.com";

/// The vendor's CDN only serves the download manager.
pub const DOWNLOAD_USER_AGENT: &str = "Audible Download Manager";

/// Download parameters read from a license (`.adh`) file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseDescriptor {
    pub customer_id: String,
    pub product_id: String,
    pub codec: String,
    pub title: String,
}

impl LicenseDescriptor {
    /// Parse `key=value&key=value` license contents.
    ///
    /// Values are form-decoded, so `My+Book` becomes `My Book`.
    pub fn parse(text: &str) -> AaxionResult<Self> {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(text.trim().as_bytes())
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let field = |key: &'static str| {
            pairs
                .iter()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.clone())
                .ok_or(AaxionError::MissingLicenseField(key))
        };

        Ok(Self {
            customer_id: field("cust_id")?,
            product_id: field("product_id")?,
            codec: field("codec")?,
            title: field("title")?,
        })
    }

    pub async fn from_file<P>(path: P) -> AaxionResult<Self>
    where
        P: AsRef<Path>,
    {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse(&text)
    }

    /// `<base>/download?product_id=..&cust_id=..&codec=..`
    pub fn download_url(&self, base: &Url) -> AaxionResult<Url> {
        let mut url = base.join("download")?;
        url.query_pairs_mut()
            .append_pair("product_id", &self.product_id)
            .append_pair("cust_id", &self.customer_id)
            .append_pair("codec", &self.codec);
        Ok(url)
    }

    /// Base name of the downloaded file. Falls back to the product id when
    /// the title sanitizes to nothing.
    pub fn file_stem(&self) -> String {
        sanitize_file_name_or(&self.title, &self.product_id)
    }

    pub fn file_name(&self) -> String {
        format!("{}.aax", self.file_stem())
    }
}

/// Turn a `--host` value into a base URL. Bare hosts get `https://`.
pub fn base_url(host: &str) -> AaxionResult<Url> {
    let url = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}/")
    };
    Ok(Url::parse(&url)?)
}

pub struct LicenseFetcher {
    client: Client,
    base_url: Url,
    progress: ProgressCallback,
}

impl LicenseFetcher {
    pub fn new(progress: ProgressCallback) -> AaxionResult<Self> {
        let client = Client::builder().user_agent(DOWNLOAD_USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url(DEFAULT_DOWNLOAD_HOST)?,
            progress,
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Download the container described by `license` into `output_dir`.
    pub async fn download(
        &self,
        license: &LicenseDescriptor,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> AaxionResult<PathBuf> {
        let url = license.download_url(&self.base_url)?;
        tokio::fs::create_dir_all(output_dir).await?;
        let target = output_dir.join_with_extension(&license.file_stem(), "aax");

        tracing::info!("Downloading {} to {}", license.title, target.display());
        self.fetch_to(url, &target, cancel).await?;
        Ok(target)
    }

    /// Stream `url` into `target`, returning the number of bytes written.
    ///
    /// A partially written file is left in place on failure.
    pub async fn fetch_to(
        &self,
        url: Url,
        target: &Path,
        cancel: &CancellationToken,
    ) -> AaxionResult<u64> {
        tracing::debug!("GET {url}");
        let response = with_cancel(cancel, self.client.get(url).send())
            .await
            .ok_or(AaxionError::Cancelled)??;

        let status = response.status();
        if !status.is_success() {
            if let Ok(body) = response.text().await {
                tracing::warn!("Error body: {body}");
            }
            return Err(AaxionError::HttpError(status));
        }

        let total = response.content_length();
        let mut file = File::create(target).await?;
        let mut stream = response.bytes_stream();
        let mut received = 0u64;
        (self.progress)(ProgressEvent::Download { received, total });

        while let Some(chunk) = with_cancel(cancel, stream.next())
            .await
            .ok_or(AaxionError::Cancelled)?
        {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            (self.progress)(ProgressEvent::Download { received, total });
        }
        file.flush().await?;

        (self.progress)(ProgressEvent::DownloadFinished { received });
        Ok(received)
    }
}
