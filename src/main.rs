mod app;

use std::sync::Arc;

use clap::Parser;
use eframe::egui;
use panelpachi::config::{Args, Config};
use panelpachi::services::HttpServices;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("panelpachi=info")).init();

    let args = Args::parse();
    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };
    let services = match HttpServices::new(&config.service_url, config.request_timeout, config.health_timeout) {
        Ok(services) => Arc::new(services),
        Err(e) => {
            log::error!("could not set up HTTP client: {e}");
            std::process::exit(1);
        }
    };
    log::info!("using service at {}", services.base_url());

    let title = match config.image.as_ref().and_then(|p| p.file_name()) {
        Some(name) => format!("panelpachi — {}", name.to_string_lossy()),
        None => "panelpachi".to_string(),
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| Ok(Box::new(app::PanelApp::new(cc, config, services)))),
    )
}
