use crate::api::ApiClient;
use crate::application::{DownloadEvent, FileDownloader};
use crate::config::AppConfig;
use crate::domain::DownloadPhase;
use crate::panorama::{self, PanoramaInfo};
use crate::ui::{DownloadMessage, DownloadView};
use futures::StreamExt;
use iced::widget::image;
use iced::Task;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct DownloadApp {
    view: DownloadView,
    downloader: FileDownloader,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(AppConfig::from_env())
    }
}

impl DownloadApp {
    pub fn new(config: AppConfig) -> Self {
        let downloader = FileDownloader::new(&config, ApiClient::new());
        let view = DownloadView::new(config.panorama_url);

        Self { view, downloader }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    /// Progress and outcome of the running download
    Download(DownloadEvent),
    /// Panorama metadata of the downloaded file
    Inspected(PathBuf, Result<PanoramaInfo, String>),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            if let DownloadMessage::DownloadPressed = ui_msg {
                if app.view.is_busy() {
                    return Task::none();
                }

                let url = app.view.url.trim().to_string();
                if let Err(e) = url::Url::parse(&url) {
                    app.view.status_message = format!("Invalid URL: {}", e);
                    return Task::none();
                }

                app.view.phase = DownloadPhase::Downloading;
                app.view.progress = None;
                app.view.panorama = None;
                app.view.status_message = format!("Requesting {}", url);

                // Events arrive on iced's update loop, not on the download worker.
                return Task::stream(app.downloader.download_events(&url).map(Message::Download));
            }
        }
        Message::Download(DownloadEvent::Progress(progress)) => {
            app.view.progress = Some(progress);
            app.view.status_message = match progress.fraction() {
                Some(fraction) => format!("Downloading: {:.1}%", fraction * 100.0),
                None => "Downloading...".to_string(),
            };
        }
        Message::Download(DownloadEvent::Completed(file)) => {
            info!(path = %file.path.display(), cached = file.from_cache, "file downloaded");
            app.view.phase = DownloadPhase::Inspecting;
            app.view.status_message = if file.from_cache {
                "Already downloaded, checking for panorama...".to_string()
            } else {
                "Download complete, checking for panorama...".to_string()
            };

            let path = file.path;
            return Task::perform(
                async move {
                    let target = path.clone();
                    let result = tokio::task::spawn_blocking(move || panorama::inspect(&target))
                        .await
                        .map_err(|e| e.to_string())
                        .and_then(|r| r.map_err(|e| e.to_string()));
                    (path, result)
                },
                |(path, result)| Message::Inspected(path, result),
            );
        }
        Message::Download(DownloadEvent::Failed(e)) => {
            app.view.phase = DownloadPhase::Failed;
            app.view.progress = None;
            app.view.status_message = format!("Download failed: {}", e);
        }
        Message::Inspected(path, result) => match result {
            Ok(info) if info.is_panorama() => {
                info!(
                    width = info.width,
                    height = info.height,
                    projection = info.projection.as_deref().unwrap_or("none"),
                    "opening panorama viewer"
                );
                app.view.phase = DownloadPhase::Viewing;
                app.view.status_message = format!(
                    "Panorama {}x{} ({})",
                    info.width,
                    info.height,
                    info.projection.as_deref().unwrap_or("wide image")
                );
                app.view.panorama = Some(image::Handle::from_path(path));
            }
            Ok(info) => {
                info!(width = info.width, height = info.height, "not a panorama");
                app.view.phase = DownloadPhase::Completed;
                app.view.status_message =
                    format!("{} is not a panorama", path.display());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "panorama inspection failed");
                app.view.phase = DownloadPhase::Failed;
                app.view.status_message = format!("Could not read image: {}", e);
            }
        },
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DownloadError, DownloadedFile, ProgressState};

    fn test_app() -> (tempfile::TempDir, DownloadApp) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            panorama_url: "https://example.com/pano1.jpg".to_string(),
            pictures_dir: dir.path().join("Pictures"),
            state_path: dir.path().join("state.json"),
            ..AppConfig::default()
        };
        (dir, DownloadApp::new(config))
    }

    #[test]
    fn test_invalid_url_is_not_requested() {
        let (_dir, mut app) = test_app();
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::UrlChanged("not a url".to_string())),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));

        assert_eq!(app.view.phase, DownloadPhase::Idle);
        assert!(app.view.status_message.starts_with("Invalid URL"));
    }

    #[test]
    fn test_progress_updates_status() {
        let (_dir, mut app) = test_app();
        let _ = update(
            &mut app,
            Message::Download(DownloadEvent::Progress(ProgressState {
                downloaded: 512,
                total: Some(1024),
            })),
        );

        assert_eq!(app.view.status_message, "Downloading: 50.0%");
    }

    #[test]
    fn test_failure_resets_progress() {
        let (_dir, mut app) = test_app();
        app.view.phase = DownloadPhase::Downloading;
        let _ = update(
            &mut app,
            Message::Download(DownloadEvent::Failed(DownloadError::Status(404))),
        );

        assert_eq!(app.view.phase, DownloadPhase::Failed);
        assert!(app.view.progress.is_none());
    }

    #[test]
    fn test_completion_starts_inspection() {
        let (_dir, mut app) = test_app();
        let _ = update(
            &mut app,
            Message::Download(DownloadEvent::Completed(DownloadedFile {
                path: PathBuf::from("panorama.jpg"),
                from_cache: true,
            })),
        );

        assert_eq!(app.view.phase, DownloadPhase::Inspecting);
        assert!(app.view.is_busy());
    }

    #[test]
    fn test_panorama_opens_viewer() {
        let (_dir, mut app) = test_app();
        let info = PanoramaInfo {
            width: 4000,
            height: 2000,
            projection: Some("equirectangular".to_string()),
        };
        let _ = update(&mut app, Message::Inspected(PathBuf::from("panorama.jpg"), Ok(info)));

        assert_eq!(app.view.phase, DownloadPhase::Viewing);
        assert!(app.view.panorama.is_some());
    }

    #[test]
    fn test_regular_photo_is_ignored() {
        let (_dir, mut app) = test_app();
        let info = PanoramaInfo {
            width: 400,
            height: 300,
            projection: None,
        };
        let _ = update(&mut app, Message::Inspected(PathBuf::from("panorama.jpg"), Ok(info)));

        assert_eq!(app.view.phase, DownloadPhase::Completed);
        assert!(app.view.panorama.is_none());
    }
}
