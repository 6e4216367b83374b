use crate::download::DownloadResult;
use crate::pool::{run_all, WorkerPool};
use scraper::Html;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::instrument;
use url::Url;

pub mod download;
pub mod errors;
pub mod link;
pub mod pool;
pub mod session;

pub use errors::{Result, ScrapeError};
pub use link::Target;
pub use session::{Cookie, SessionContext};

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub page_url: Url,
    pub target: Target,
    /// Where files are written. Defaults to the page's host.
    pub destination_dir: PathBuf,
    /// Number of concurrent downloads
    pub workers: usize,
}

impl ScrapeConfig {
    pub fn new(page_url: Url, target: Target) -> Self {
        let destination_dir = default_destination(&page_url);
        Self {
            page_url,
            target,
            destination_dir,
            workers: pool::DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug)]
pub enum Update {
    MessageUpdate(Message),
    ProgressUpdate(Progress),
}

#[derive(Debug)]
pub struct Message {
    pub content: String,
    pub resource_name: String,
    pub is_error: bool,
}

#[derive(Debug)]
pub struct Progress {
    /// The link being downloaded. Several links may share a file name.
    pub link: Url,
    pub bytes_written: u64,
    /// `None` when the server did not advertise a size
    pub file_size: Option<u64>,
    /// File name on disk
    pub resource_name: String,
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub results: Vec<DownloadResult>,
}

impl ScrapeReport {
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.completed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// The page's network location, used as the folder name when none is given.
pub fn default_destination(page_url: &Url) -> PathBuf {
    let host = page_url.host_str().unwrap_or_default();
    match page_url.port() {
        Some(port) => PathBuf::from(format!("{host}:{port}")),
        None => PathBuf::from(host),
    }
}

/// Fetches the page, collects the matching links and downloads all of them.
///
/// Fails before any download when the page can't be fetched or no link has
/// the requested extension. A page without images gives an empty report.
/// Individual download failures end up in the report instead.
#[instrument(skip(session, update_tx), fields(page_url = %config.page_url))]
pub async fn scrape(
    session: Arc<SessionContext>,
    config: ScrapeConfig,
    update_tx: Sender<Update>,
) -> Result<ScrapeReport> {
    let pool = WorkerPool::new(config.workers)?;
    tracing::debug!("Session cookie configured : {}", session.cookie().is_some());
    let html = session.fetch_page(&config.page_url).await?;
    let links = {
        let document = Html::parse_document(&html);
        link::extract(&document, &config.page_url, &config.target)?
    };
    if links.is_empty() {
        tracing::info!("No images found on {}", config.page_url);
        return Ok(ScrapeReport::default());
    }
    tracing::info!(
        "Found {} file(s), downloading with {} worker(s) into {}",
        links.len(),
        pool.workers(),
        config.destination_dir.display()
    );

    let results = run_all(session, links, config.destination_dir, &pool, update_tx).await;
    Ok(ScrapeReport { results })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_defaults_to_network_location() {
        let url = Url::parse("https://www.example.com/gallery?page=2").unwrap();
        assert_eq!(default_destination(&url), PathBuf::from("www.example.com"));
        let url = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(default_destination(&url), PathBuf::from("localhost:8080"));
    }

    #[test]
    fn config_starts_serial() {
        let config = ScrapeConfig::new(
            Url::parse("http://site/").unwrap(),
            Target::Extension(".pdf".into()),
        );
        assert_eq!(config.workers, 1);
        assert_eq!(config.destination_dir, PathBuf::from("site"));
    }
}
