// lamp-viewer: orbit a glTF model and switch its lamp on and off

// Module declarations
mod app;
mod camera;
mod config;
mod engine;
mod error;
mod lamp;
mod loader;
mod math;
mod renderer;
mod scene;
mod ui;
mod viewer;

use clap::Parser;

use crate::config::{Opts, ViewerConfig};
use crate::error::ViewerError;

#[tokio::main]
async fn main() -> Result<(), ViewerError> {
    // Initialize logging
    env_logger::init();

    let config = ViewerConfig::from(Opts::parse());
    log::info!("Starting with model {:?}", config.model_path);

    // Create event loop
    let event_loop = app::build_event_loop()?;

    // Create window, renderer and viewer
    let app = app::App::new(&event_loop, config.clone()).await?;

    // The lamp is wired once the model arrives
    app::spawn_model_load(event_loop.create_proxy(), config.model_path);

    // Run the viewer
    app.run(event_loop)
}
