use crate::download::{download_file, DownloadItem, DownloadResult};
use crate::errors::{Result, ScrapeError};
use crate::session::SessionContext;
use crate::Update;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::spawn;
use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::instrument;
use url::Url;

pub const DEFAULT_WORKERS: usize = 1;

/// A fixed number of slots that downloads run in.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ScrapeError::InvalidWorkerCount(workers));
        }
        Ok(Self {
            workers,
            semaphore: Arc::new(Semaphore::new(workers)),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `worker` once per item, at most `workers` at a time.
    ///
    /// Items are started in order; results come back in the same order once
    /// every task has finished. A task that panics only fails its own slot.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, worker: F) -> Vec<Result<Fut::Output>>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let mut tasks: Vec<Result<JoinHandle<Fut::Output>>> = Vec::with_capacity(items.len());
        for item in items {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tasks.push(Err(ScrapeError::TaskFailed(e.to_string())));
                    continue;
                }
            };
            let job = worker(item);
            tasks.push(Ok(spawn(async move {
                let _permit = permit;
                job.await
            })));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = match task {
                Ok(handle) => handle.await.map_err(|e| {
                    tracing::error!("Download thread panicked\nError : {}", e);
                    ScrapeError::TaskFailed(e.to_string())
                }),
                Err(e) => Err(e),
            };
            results.push(result);
        }
        results
    }
}

/// Downloads every link into `destination_dir` on the pool.
#[instrument(skip(session, links, update_tx), fields(count = links.len()))]
pub async fn run_all(
    session: Arc<SessionContext>,
    links: Vec<Url>,
    destination_dir: PathBuf,
    pool: &WorkerPool,
    update_tx: Sender<Update>,
) -> Vec<DownloadResult> {
    let originals = links.clone();
    let results = pool
        .run(links, |link| {
            let session = session.clone();
            let update_tx = update_tx.clone();
            let item = DownloadItem {
                link,
                destination_dir: destination_dir.clone(),
            };
            async move { download_file(&session, item, &update_tx).await }
        })
        .await;

    results
        .into_iter()
        .zip(originals)
        .map(|(result, link)| match result {
            Ok(res) => res,
            Err(e) => DownloadResult {
                link,
                bytes_written: 0,
                file_size: None,
                outcome: Err(e),
            },
        })
        .collect()
}
