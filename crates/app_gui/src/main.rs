use anyhow::Context;
use eframe::{NativeOptions, egui};
use std::path::PathBuf;
use tomato_core::{Predictor, PredictorConfig};

mod app;

use app::UiApp;

const CONFIG_FILE: &str = "tomato.toml";

fn main() {
    tracing_subscriber::fmt::init();

    let config = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("configuration error: {e:#}");
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(2);
        }
    };
    // Without a model there is nothing to serve.
    let predictor = match Predictor::load(&config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("cannot start without a model: {e}");
            eprintln!("Tomato Quality Predictor cannot start: {e}");
            std::process::exit(1);
        }
    };

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 820.0])
            .with_title("Tomato Quality Predictor"),
        ..Default::default()
    };
    if let Err(e) = eframe::run_native(
        "Tomato Quality Predictor",
        options,
        Box::new(move |cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new(
                &cc.egui_ctx,
                predictor,
                &config,
            )))
        }),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}

/// First CLI argument, else `tomato.toml` in the working directory, else the
/// platform config directory.
fn config_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args_os().nth(1) {
        return Some(PathBuf::from(arg));
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    directories_next::ProjectDirs::from("app", "tomato-predictor", "TomatoPredictor")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .filter(|p| p.is_file())
}

fn load_config() -> anyhow::Result<PredictorConfig> {
    match config_path() {
        Some(path) => PredictorConfig::load(&path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            tracing::info!("no {CONFIG_FILE} found, using built-in defaults");
            Ok(PredictorConfig::default())
        }
    }
}
