use anyhow::{Result, anyhow};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, direct::NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{File, create_dir_all};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Rewrites an arXiv abstract link into its PDF link. Only arXiv is supported.
pub fn arxiv_pdf_url(link: &str) -> Result<String> {
    let parsed = Url::parse(link).map_err(|e| anyhow!("Invalid URL '{}': {}", link, e))?;
    let is_arxiv = parsed
        .host_str()
        .is_some_and(|host| host == "arxiv.org" || host.ends_with(".arxiv.org"));
    if !is_arxiv {
        return Err(anyhow!("Only arXiv links are supported for now: {}", link));
    }

    let mut pdf_url = link.replace("/abs/", "/pdf/");
    if !pdf_url.ends_with(".pdf") {
        pdf_url.push_str(".pdf");
    }
    Ok(pdf_url)
}

/// `<title>_<timestamp>.pdf`, with path separators in the title replaced.
pub fn timestamped_file_name(title: &str, timestamp: &str) -> String {
    let title = title.trim().replace(['/', '\\'], "_");
    format!("{}_{}.pdf", title, timestamp)
}

pub struct Downloader {
    client: Client,
    base_dir: PathBuf,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl Downloader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        // arXiv asks automated clients to stay around one request every three seconds
        let quota = Quota::per_minute(nonzero!(20u32));

        Self {
            client: Client::new(),
            base_dir: base_dir.into(),
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Downloads the PDF behind an arXiv link into the knowledge base root and
    /// returns the saved path.
    pub async fn save_arxiv_pdf(&self, link: &str, title: &str) -> Result<PathBuf> {
        let pdf_url = arxiv_pdf_url(link)?;

        self.limiter.until_ready().await;
        tracing::info!("Downloading PDF from: {}", pdf_url);
        let mut response = self.client.get(&pdf_url).send().await?;

        if !response.status().is_success() {
            let err = format!("Failed to download PDF from {}: {}", pdf_url, response.status());
            tracing::error!("{}", err);
            return Err(anyhow!(err));
        }

        create_dir_all(&self.base_dir).await?;
        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        let pdf_path = self.base_dir.join(timestamped_file_name(title, &timestamp));

        let mut file = File::create(&pdf_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::info!("PDF saved to: {:?}", pdf_path);
        Ok(pdf_path)
    }
}
