use crate::errors::{Result, ScrapeError};
use crate::session::SessionContext;
use crate::Update::{MessageUpdate, ProgressUpdate};
use crate::{Message, Progress, Update};
use chrono::Utc;
use futures::StreamExt;
use phf::phf_map;
use reqwest::header::{self, HeaderMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
use url::Url;

/// Size of the pieces written to disk.
pub const CHUNK_SIZE: usize = 1024;
const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DownloadItem {
    pub link: Url,
    pub destination_dir: PathBuf,
}

/// Outcome of a single download.
#[derive(Debug)]
pub struct DownloadResult {
    pub link: Url,
    pub bytes_written: u64,
    /// Size advertised through content-length, if any
    pub file_size: Option<u64>,
    /// Path of the written file
    pub outcome: Result<PathBuf>,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Regroups arbitrarily sized body chunks into pieces of exactly `size`
/// bytes. Whatever is left at the end comes out of [`FixedChunks::finish`].
#[derive(Debug)]
pub struct FixedChunks {
    size: usize,
    pending: Vec<u8>,
}

impl FixedChunks {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "chunk size must be positive");
        Self {
            size,
            pending: Vec::with_capacity(size),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    pub fn next_full(&mut self) -> Option<Vec<u8>> {
        if self.pending.len() < self.size {
            return None;
        }
        let rest = self.pending.split_off(self.size);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    pub fn finish(self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

#[derive(Debug, Default)]
struct Transfer {
    bytes_written: u64,
    file_size: Option<u64>,
}

/// Streams `dld_item.link` into its destination directory. Failures are
/// reported in the returned result, never raised.
#[tracing::instrument(skip(session, update_tx), fields(link = %dld_item.link))]
pub async fn download_file(
    session: &SessionContext,
    dld_item: DownloadItem,
    update_tx: &Sender<Update>,
) -> DownloadResult {
    let mut transfer = Transfer::default();
    let outcome = save_to_disk(session, &dld_item, update_tx, &mut transfer).await;

    match &outcome {
        Ok(path) => {
            tracing::debug!(
                "Download completed for {}, file @ {}",
                &dld_item.link,
                path.display()
            );
        }
        Err(e) => {
            tracing::error!("Error downloading file from {}", dld_item.link);
            tracing::error!("{}", e);
            if update_tx
                .try_send(MessageUpdate(Message {
                    resource_name: dld_item.link.to_string(),
                    is_error: true,
                    content: e.to_string(),
                }))
                .is_err()
            {
                tracing::debug!("Update channel unavailable, dropping error message");
            }
        }
    }

    DownloadResult {
        link: dld_item.link,
        bytes_written: transfer.bytes_written,
        file_size: transfer.file_size,
        outcome,
    }
}

async fn save_to_disk(
    session: &SessionContext,
    dld_item: &DownloadItem,
    update_tx: &Sender<Update>,
    transfer: &mut Transfer,
) -> Result<PathBuf> {
    if let Err(e) = fs::create_dir_all(&dld_item.destination_dir).await {
        tracing::error!("Failed to create destination directory\nError : {}", e);
        return Err(ScrapeError::ErrorCreatingDestinationDirectory {
            dir: dld_item.destination_dir.to_string_lossy().to_string(),
            message: e.to_string(),
        });
    }

    let response = session
        .get(&dld_item.link)
        .send()
        .await
        .map_err(|e| ScrapeError::network(dld_item.link.as_str(), e))?;
    if !response.status().is_success() {
        tracing::error!(
            "Error status code received : {} |{}|",
            response.status(),
            dld_item.link
        );
        return Err(ScrapeError::ErrorStatusCode {
            status_code: response.status().to_string(),
            url: dld_item.link.to_string(),
        });
    }

    let headers = response.headers();
    transfer.file_size = content_length(headers);
    let f_name = get_file_name(&dld_item.link, headers);
    tracing::debug!("File name for {} is {}", dld_item.link, &f_name);
    let file_path = dld_item.destination_dir.join(&f_name);

    let dest_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&file_path)
        .await
        .map_err(|e| {
            tracing::error!("Error opening/creating file {}", file_path.display());
            ScrapeError::file_op(&file_path, e)
        })?;
    let mut writer = BufWriter::new(dest_file);

    let mut reporter = Reporter {
        update_tx,
        link: &dld_item.link,
        resource_name: f_name,
        last_update: None,
    };
    let mut chunks = FixedChunks::new(CHUNK_SIZE);
    let mut body = response.bytes_stream();

    while let Some(data) = body.next().await {
        let data = data.map_err(|e| ScrapeError::network(dld_item.link.as_str(), e))?;
        chunks.push(&data);
        while let Some(piece) = chunks.next_full() {
            write_piece(&mut writer, &piece, &file_path, transfer).await?;
        }
        reporter.progress(transfer);
    }
    if let Some(rest) = chunks.finish() {
        write_piece(&mut writer, &rest, &file_path, transfer).await?;
    }
    writer
        .flush()
        .await
        .map_err(|e| ScrapeError::file_op(&file_path, e))?;

    reporter.finished(transfer);
    Ok(file_path)
}

async fn write_piece(
    writer: &mut BufWriter<File>,
    piece: &[u8],
    file_path: &Path,
    transfer: &mut Transfer,
) -> Result<()> {
    if let Err(e) = writer.write_all(piece).await {
        tracing::error!("Error writing to destination file {}", file_path.display());
        tracing::error!("{} | {}", e, e.kind());
        return Err(ScrapeError::file_op(file_path, e));
    }
    transfer.bytes_written += piece.len() as u64;
    Ok(())
}

/// Sends progress for one file. Updates are dropped when the receiver is
/// gone or full, downloads never wait on it.
struct Reporter<'a> {
    update_tx: &'a Sender<Update>,
    link: &'a Url,
    resource_name: String,
    last_update: Option<Instant>,
}

impl Reporter<'_> {
    fn snapshot(&self, transfer: &Transfer, finished: bool) -> Update {
        ProgressUpdate(Progress {
            link: self.link.clone(),
            bytes_written: transfer.bytes_written,
            file_size: transfer.file_size,
            resource_name: self.resource_name.clone(),
            finished,
        })
    }

    fn progress(&mut self, transfer: &Transfer) {
        let due = self
            .last_update
            .map_or(true, |at| at.elapsed() >= PROGRESS_UPDATE_INTERVAL);
        if due && self.update_tx.try_send(self.snapshot(transfer, false)).is_ok() {
            self.last_update = Some(Instant::now());
        }
    }

    fn finished(&self, transfer: &Transfer) {
        if self.update_tx.try_send(self.snapshot(transfer, true)).is_err() {
            tracing::debug!("Update channel unavailable, dropping final progress");
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|size| *size > 0)
}

/// The percent-decoded last path segment of the link. Links ending in `/`,
/// or whose decoded name would leave the destination directory, get a
/// generic time based name.
fn get_file_name(link: &Url, headers: &HeaderMap) -> String {
    let decoded = link
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| urlencoding::decode(segment).ok())
        .filter(|name| is_plain_file_name(name));
    if let Some(name) = decoded {
        return name.into_owned();
    }
    tracing::warn!(
        "File name can't be determined, using generic name. {}",
        link
    );
    format!(
        "file-{time}{ext}",
        time = Utc::now().format("%Y%m%d%H%M%S%3f"),
        ext = get_file_extension(headers)
    )
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn get_file_extension(headers: &HeaderMap) -> &'static str {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
    else {
        return "";
    };
    // Remove charset if present (E.g text/html; charset=utf-8)
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    MIME_TYPES.get(mime.as_str()).copied().unwrap_or("")
}

static MIME_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "text/html" => ".html",
    "text/plain" => ".txt",
    "text/csv" => ".csv",
    "image/jpeg" => ".jpg",
    "image/png" => ".png",
    "image/gif" => ".gif",
    "image/webp" => ".webp",
    "image/svg+xml" => ".svg",
    "image/bmp" => ".bmp",
    "image/x-icon" => ".ico",
    "application/json" => ".json",
    "application/pdf" => ".pdf",
    "application/zip" => ".zip",
    "application/gzip" => ".gz",
    "application/msword" => ".doc",
    "application/vnd.ms-powerpoint" => ".ppt",
    "application/vnd.ms-excel" => ".xls",
    "audio/mpeg" => ".mp3",
    "audio/ogg" => ".oga",
    "video/mp4" => ".mp4",
    "video/mpeg" => ".mpeg",
    "video/ogg" => ".ogv",
};
