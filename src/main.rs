use panorama_display::{app, config::AppConfig, logging};

fn main() -> iced::Result {
    let config = AppConfig::from_env();
    logging::init(config.log_level);
    tracing::info!(
        destination = %config.destination_path().display(),
        state = %config.state_path.display(),
        "starting panorama display"
    );

    iced::application(app::DownloadApp::default, app::update, app::view)
        .title("Panorama Display")
        .run()
}
