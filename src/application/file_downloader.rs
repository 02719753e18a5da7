use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use bytes::{Bytes, BytesMut};
use futures::{channel::mpsc, stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    api::{self, ApiClient},
    config::AppConfig,
    domain::{DownloadError, DownloadRequest, DownloadedFile, Listener, ProgressState},
    store::RecordStore,
};

/// Called with (bytes written so far, content length if known).
pub type ProgressListener = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;
/// Called with the destination file once it holds the requested image.
pub type CompletionListener = Arc<dyn Fn(&Path) + Send + Sync>;

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Progress(ProgressState),
    Completed(DownloadedFile),
    Failed(DownloadError),
}

/// What `request_download` started.
#[derive(Debug)]
pub enum DownloadHandle {
    /// Served from the recorded download; the completion listener already ran.
    Cached(PathBuf),
    /// A background fetch. Dropping the handle does not cancel it.
    Spawned(JoinHandle<Result<PathBuf, DownloadError>>),
}

impl DownloadHandle {
    pub async fn wait(self) -> Result<PathBuf, DownloadError> {
        match self {
            DownloadHandle::Cached(path) => Ok(path),
            DownloadHandle::Spawned(handle) => handle
                .await
                .map_err(|e| DownloadError::Worker(e.to_string()))?,
        }
    }
}

#[derive(Default)]
struct Listeners {
    progress: Option<ProgressListener>,
    completion: Option<CompletionListener>,
}

enum Fetched {
    Downloaded(PathBuf),
    /// Another fetch for the same URL finished while this one waited for the lock.
    AlreadyCurrent(PathBuf),
}

impl Fetched {
    fn into_file(self) -> DownloadedFile {
        match self {
            Fetched::Downloaded(path) => DownloadedFile {
                path,
                from_cache: false,
            },
            Fetched::AlreadyCurrent(path) => DownloadedFile {
                path,
                from_cache: true,
            },
        }
    }
}

/// Downloads one image to a fixed destination and skips the fetch when the
/// last successful download was for the same URL.
///
/// Clones share listeners, the record and the single-flight lock. All fetches
/// run on tokio tasks and listeners are invoked from those tasks.
#[derive(Clone)]
pub struct FileDownloader {
    client: ApiClient,
    store: RecordStore,
    destination: PathBuf,
    /// Sibling the body streams into before it replaces `destination`.
    partial: PathBuf,
    chunk_size: usize,
    listeners: Arc<RwLock<Listeners>>,
    flight: Arc<Mutex<()>>,
}

impl FileDownloader {
    pub fn new(config: &AppConfig, client: ApiClient) -> Self {
        let destination = config.destination_path();
        let mut partial_name = destination.file_name().unwrap_or_default().to_os_string();
        partial_name.push(".part");

        Self {
            client,
            store: RecordStore::new(config.state_path.clone()),
            partial: destination.with_file_name(partial_name),
            destination,
            chunk_size: config.chunk_size.max(1),
            listeners: Arc::new(RwLock::new(Listeners::default())),
            flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn register_progress_listener<F>(&self, listener: F)
    where
        F: Fn(u64, Option<u64>) + Send + Sync + 'static,
    {
        self.with_listeners(|l| l.progress = Some(Arc::new(listener)));
    }

    pub fn register_completion_listener<F>(&self, listener: F)
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        self.with_listeners(|l| l.completion = Some(Arc::new(listener)));
    }

    pub fn unregister_progress_listener(&self) {
        self.with_listeners(|l| l.progress = None);
    }

    pub fn unregister_completion_listener(&self) {
        self.with_listeners(|l| l.completion = None);
    }

    fn with_listeners(&self, f: impl FnOnce(&mut Listeners)) {
        let mut guard = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }

    fn progress_listener(&self) -> Option<ProgressListener> {
        let guard = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        guard.progress.clone()
    }

    fn completion_listener(&self) -> Option<CompletionListener> {
        let guard = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        guard.completion.clone()
    }

    async fn is_recorded(&self, url: &str) -> bool {
        DownloadRequest::new(url).matches(&self.store.last_downloaded_url().await)
    }

    /// Delivers `url` to the registered listeners.
    ///
    /// On a cache hit the completion listener runs before this returns and no
    /// progress is reported. Otherwise a fetch is spawned on the current tokio
    /// runtime; transient failures are logged there and no listener fires.
    pub fn request_download(&self, url: &str) -> Result<DownloadHandle, DownloadError> {
        debug!(url, "download requested");

        // Runs on the caller's context, so the record is read synchronously.
        if DownloadRequest::new(url).matches(&self.store.last_downloaded_url_blocking()) {
            debug!(url, "file already downloaded");
            let listener = self
                .completion_listener()
                .ok_or(DownloadError::ListenerNotRegistered(Listener::Completion))?;
            listener(&self.destination);
            return Ok(DownloadHandle::Cached(self.destination.clone()));
        }

        debug!(url, "previous download is different");
        let downloader = self.clone();
        let url = url.to_string();
        Ok(DownloadHandle::Spawned(tokio::spawn(async move {
            downloader.notify_listeners(&url).await
        })))
    }

    async fn notify_listeners(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let fetched = self
            .fetch(url, |progress| {
                let listener = self
                    .progress_listener()
                    .ok_or(DownloadError::ListenerNotRegistered(Listener::Progress))?;
                listener(progress.downloaded, progress.total);
                Ok(())
            })
            .await;

        let path = match fetched {
            Ok(fetched) => fetched.into_file().path,
            Err(e) if e.is_transient() => {
                warn!(url, error = %e, "download failed");
                return Err(e);
            }
            Err(e) => {
                error!(url, error = %e, "download aborted");
                return Err(e);
            }
        };

        // The record is already written; a missing listener does not undo it.
        match self.completion_listener() {
            Some(listener) => {
                listener(&path);
                Ok(path)
            }
            None => {
                let e = DownloadError::ListenerNotRegistered(Listener::Completion);
                error!(url, error = %e, "download finished without a completion listener");
                Err(e)
            }
        }
    }

    /// Listener-free variant: progress, then exactly one `Completed` or
    /// `Failed`. Work starts when the stream is first polled.
    pub fn download_events(&self, url: &str) -> BoxStream<'static, DownloadEvent> {
        let downloader = self.clone();
        let url = url.to_string();

        futures::stream::once(async move { downloader.spawn_events(url).await })
            .flatten()
            .boxed()
    }

    async fn spawn_events(&self, url: String) -> BoxStream<'static, DownloadEvent> {
        if self.is_recorded(&url).await {
            debug!(url = %url, "file already downloaded");
            let file = DownloadedFile {
                path: self.destination.clone(),
                from_cache: true,
            };
            return futures::stream::iter([DownloadEvent::Completed(file)]).boxed();
        }

        let (tx, rx) = mpsc::unbounded();
        let downloader = self.clone();
        tokio::spawn(async move {
            let result = downloader
                .fetch(&url, |progress| {
                    let _ = tx.unbounded_send(DownloadEvent::Progress(progress));
                    Ok(())
                })
                .await;

            let event = match result {
                Ok(fetched) => DownloadEvent::Completed(fetched.into_file()),
                Err(e) => {
                    warn!(url = %url, error = %e, "download failed");
                    DownloadEvent::Failed(e)
                }
            };
            let _ = tx.unbounded_send(event);
        });

        rx.boxed()
    }

    /// Streams `url` into the destination file and records it.
    ///
    /// Holds the single-flight lock for the whole transfer so concurrent
    /// requests never interleave writes to the destination or the record.
    /// The body lands in a `.part` sibling that only replaces the destination
    /// once complete, so any failure leaves the previous file and record as
    /// they were. `on_progress` returning an error stops the transfer.
    async fn fetch<F>(&self, url: &str, mut on_progress: F) -> Result<Fetched, DownloadError>
    where
        F: FnMut(ProgressState) -> Result<(), DownloadError>,
    {
        let _flight = self.flight.lock().await;

        if self.is_recorded(url).await {
            debug!(url, "fetched by an earlier request");
            return Ok(Fetched::AlreadyCurrent(self.destination.clone()));
        }

        let (total, stream) = self.client.download_file_stream(url).await?;

        let mut progress = ProgressState {
            downloaded: 0,
            total,
        };
        on_progress(progress)?;

        if let Some(parent) = self.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let written = match self.write_partial(stream, &mut progress, &mut on_progress).await {
            Ok(()) => tokio::fs::rename(&self.partial, &self.destination)
                .await
                .map_err(DownloadError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&self.partial).await {
                debug!(path = %self.partial.display(), error = %cleanup, "no partial file to remove");
            }
            return Err(e);
        }

        self.store.save_last_downloaded_url(url).await?;
        info!(url, path = %self.destination.display(), bytes = progress.downloaded, "download complete");

        Ok(Fetched::Downloaded(self.destination.clone()))
    }

    async fn write_partial<F>(
        &self,
        mut stream: BoxStream<'static, api::client::Result<Bytes>>,
        progress: &mut ProgressState,
        on_progress: &mut F,
    ) -> Result<(), DownloadError>
    where
        F: FnMut(ProgressState) -> Result<(), DownloadError>,
    {
        let mut file = tokio::fs::File::create(&self.partial).await?;

        // Re-slice the body so progress lands on chunk_size boundaries
        // regardless of how the network splits it.
        let mut pending = BytesMut::new();
        let mut finished = false;
        while !finished {
            match stream.next().await {
                Some(chunk) => pending.extend_from_slice(&chunk?),
                None => finished = true,
            }

            while pending.len() >= self.chunk_size || (finished && !pending.is_empty()) {
                let piece = pending.split_to(pending.len().min(self.chunk_size));
                file.write_all(&piece).await?;
                progress.downloaded += piece.len() as u64;
                on_progress(*progress)?;
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}
