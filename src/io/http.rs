use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::Download;
use anyhow::{Context, Result, bail};

/// Plain HTTP(S) GET downloader
pub struct HttpDownloader {
    client: Client,
    max_retry: u32,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        // No overall timeout: server archives can take minutes on slow links.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("devcore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_retry: 10,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut retry_count = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        bail!("GET {} failed with status: {}", url, resp.status());
                    }
                    return Ok(resp);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(e).context(format!("max retries exceeded for {url}"));
                    }
                    warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, self.max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Download for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        debug!(url, destination = %destination.display(), "downloading");
        let mut resp = self.get(url).await?;

        let mut file = fs::File::create(destination)
            .await
            .with_context(|| format!("cannot create {}", destination.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(destination, std::fs::Permissions::from_mode(0o755)).await?;
        }

        debug!(url, bytes = written, "download complete");
        Ok(())
    }
}
