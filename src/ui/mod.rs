use iced::{
    widget::{button, column, image, progress_bar, text, text_input, Space},
    Element, Length,
};

use crate::domain::{DownloadPhase, ProgressState};
use crate::utils::format_bytes;

/// Main view state
pub struct DownloadView {
    pub url: String,
    pub status_message: String,
    pub phase: DownloadPhase,
    pub progress: Option<ProgressState>,
    pub panorama: Option<image::Handle>,
}

impl DownloadView {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status_message: "Press Download to fetch the panorama".to_string(),
            phase: DownloadPhase::Idle,
            progress: None,
            panorama: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            DownloadPhase::Downloading | DownloadPhase::Inspecting
        )
    }

    pub fn progress_label(&self) -> Option<String> {
        let progress = self.progress?;
        Some(match progress.total {
            Some(total) => format!(
                "{} / {}",
                format_bytes(progress.downloaded),
                format_bytes(total)
            ),
            None => format_bytes(progress.downloaded),
        })
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    DownloadPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.url = url;
            }
            DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let mut download = button("Download").padding([10, 20]);
        if !self.is_busy() {
            download = download.on_press(DownloadMessage::DownloadPressed);
        }

        let mut content = column![
            text("Panorama Display").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Image URL:").size(16),
            text_input("https://...", &self.url)
                .on_input(DownloadMessage::UrlChanged)
                .padding(10),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message).size(14),
        ]
        .padding(20)
        .spacing(10);

        if let Some(progress) = self.progress {
            let fraction = progress.fraction().unwrap_or(0.0);
            content = content.push(progress_bar(0.0..=1.0, fraction));
        }
        if let Some(label) = self.progress_label() {
            content = content.push(text(label).size(12));
        }

        content = content.push(download);

        if let Some(handle) = &self.panorama {
            content = content.push(
                image::viewer(handle.clone())
                    .width(Length::Fill)
                    .height(Length::Fill),
            );
        }

        content.into()
    }
}
