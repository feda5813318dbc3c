//! Main window: upload and result on the left, history on the right.

mod history;

use chrono::Datelike;
use eframe::{App, Frame, egui};
use rfd::FileDialog;
use std::fs;
use std::path::Path;
use tomato_core::{
    PredictError, PredictionSession, Predictor, PredictorConfig, Quality, Size, UploadStore,
};

pub(crate) const FRESH_COLOR: egui::Color32 = egui::Color32::from_rgb(0x28, 0xa7, 0x45);
pub(crate) const ROTTEN_COLOR: egui::Color32 = egui::Color32::from_rgb(0xdc, 0x26, 0x26);
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const LOGO_SIZE: f32 = 45.0;
const ICON_SIZE: f32 = 42.0;

/// Logo and result icons; any of them may be absent.
struct Branding {
    logo: Option<egui::TextureHandle>,
    fresh: Option<egui::TextureHandle>,
    rotten: Option<egui::TextureHandle>,
}

impl Branding {
    fn load(ctx: &egui::Context, cfg: &PredictorConfig) -> Self {
        Self {
            logo: load_icon(ctx, &cfg.display.logo),
            fresh: load_icon(ctx, &cfg.display.fresh_icon),
            rotten: load_icon(ctx, &cfg.display.rotten_icon),
        }
    }

    fn result_icon(&self, label: Quality) -> Option<&egui::TextureHandle> {
        match label {
            Quality::Fresh => self.fresh.as_ref(),
            Quality::Rotten => self.rotten.as_ref(),
        }
    }
}

fn load_icon(ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
    if !path.is_file() {
        return None;
    }
    match image::open(path) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let color = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
            let name = format!("icon:{}", path.display());
            Some(ctx.load_texture(name, color, egui::TextureOptions::LINEAR))
        }
        Err(e) => {
            tracing::warn!("failed to load icon {}: {e}", path.display());
            None
        }
    }
}

/// Analysis runs two frames after the click so the spinner is painted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Analysis {
    Idle,
    Requested,
    Running,
}

pub struct UiApp {
    predictor: Predictor,
    session: PredictionSession,
    uploads: Option<UploadStore>,
    preview_size: Size,
    recent_limit: usize,
    preview_tex: Option<egui::TextureHandle>,
    branding: Branding,
    analysis: Analysis,
    status: String,
    app_version: String,
}

impl UiApp {
    pub fn new(ctx: &egui::Context, predictor: Predictor, cfg: &PredictorConfig) -> Self {
        let uploads = cfg
            .uploads
            .enabled
            .then(|| UploadStore::new(&cfg.uploads.dir, &cfg.uploads.prefix));
        Self {
            predictor,
            session: PredictionSession::new(),
            uploads,
            preview_size: cfg.display.preview_size,
            recent_limit: cfg.history.recent_limit,
            preview_tex: None,
            branding: Branding::load(ctx, cfg),
            analysis: Analysis::Idle,
            status: String::new(),
            app_version: env!("TOMATO_VERSION").to_string(),
        }
    }

    fn load_bytes(&mut self, ctx: &egui::Context, bytes: &[u8], origin: &str) {
        match self
            .session
            .load_upload(&self.predictor, bytes, self.uploads.as_ref())
        {
            Ok(upload) => {
                let (w, h) = upload.preview.dimensions();
                let color =
                    egui::ColorImage::from_rgb([w as usize, h as usize], upload.preview.as_raw());
                self.preview_tex =
                    Some(ctx.load_texture("preview", color, egui::TextureOptions::LINEAR));
                self.status.clear();
                tracing::info!("loaded upload {origin}");
            }
            Err(PredictError::UnreadableImage(reason)) => {
                tracing::warn!("unreadable upload {origin}: {reason}");
                self.preview_tex = None;
                self.status = "Could not read uploaded image. Try a different file.".to_string();
            }
            Err(e) => {
                self.preview_tex = None;
                self.status = format!("Could not prepare preview: {e}");
            }
        }
    }

    fn load_path(&mut self, ctx: &egui::Context, path: &Path) {
        match fs::read(path) {
            Ok(bytes) => self.load_bytes(ctx, &bytes, &path.display().to_string()),
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", path.display());
                self.session.discard_upload();
                self.preview_tex = None;
                self.status = "Could not read uploaded image. Try a different file.".to_string();
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(bytes) = file.bytes.as_deref() {
            self.load_bytes(ctx, bytes, &file.name);
        } else if let Some(path) = file.path.as_deref() {
            self.load_path(ctx, path);
        }
    }

    fn run_analysis(&mut self) {
        match self.session.analyze(&self.predictor) {
            Ok(Some(_)) => self.status.clear(),
            Ok(None) => self.status = "Please upload an image first.".to_string(),
            Err(e) => {
                tracing::warn!("analysis failed: {e}");
                self.status = format!("Analysis failed: {e}");
            }
        }
    }

    fn render_upload_panel(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.label(
            "Upload a photo of your tomato, and our AI model will instantly predict whether it is fresh or rotten.",
        );
        ui.add_space(10.0);
        ui.heading("Upload or Take a Photo");
        ui.add_space(4.0);

        let busy = self.analysis != Analysis::Idle;
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label("Drag & drop an image here");
                if ui
                    .add_enabled(!busy, egui::Button::new("Choose file..."))
                    .clicked()
                    && let Some(path) = FileDialog::new()
                        .add_filter("Images", &IMAGE_EXTENSIONS)
                        .set_directory(".")
                        .pick_file()
                {
                    self.load_path(ctx, &path);
                }
            });
        });
        ui.add_space(8.0);

        if let Some(tex) = &self.preview_tex
            && self.session.upload().is_some()
        {
            let size = egui::vec2(
                self.preview_size.width as f32,
                self.preview_size.height as f32,
            );
            ui.vertical_centered(|ui| {
                ui.image((tex.id(), size));
                ui.small("Preview");
            });
        } else {
            ui.label("No preview yet. Upload a photo to continue.");
        }
        ui.add_space(8.0);

        let analyze = ui.add_enabled(
            !busy,
            egui::Button::new("Analyze").min_size(egui::vec2(ui.available_width(), 32.0)),
        );
        if analyze.clicked() {
            if self.session.upload().is_none() {
                self.status = "Please upload an image first.".to_string();
            } else {
                self.analysis = Analysis::Requested;
                ctx.request_repaint();
            }
        }

        if busy {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analyzing image...");
            });
        }

        if let Some(record) = self.session.last_prediction() {
            ui.add_space(12.0);
            ui.vertical_centered(|ui| {
                ui.heading("Results:");
                if let Some(icon) = self.branding.result_icon(record.label) {
                    ui.image((icon.id(), egui::vec2(ICON_SIZE, ICON_SIZE)));
                }
                let color = match record.label {
                    Quality::Fresh => FRESH_COLOR,
                    Quality::Rotten => ROTTEN_COLOR,
                };
                ui.label(
                    egui::RichText::new(record.label.to_string())
                        .color(color)
                        .size(20.0)
                        .strong(),
                );
                ui.label(
                    egui::RichText::new(format!("Confidence: {:.2}%", record.confidence))
                        .color(egui::Color32::GRAY),
                );
            });
        }

        if !self.status.is_empty() {
            ui.add_space(8.0);
            ui.colored_label(ROTTEN_COLOR, &self.status);
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        let spinner_pending = self.analysis == Analysis::Requested;
        if self.analysis == Analysis::Running {
            // Blocking; fine at one photo per click.
            self.run_analysis();
            self.analysis = Analysis::Idle;
        }
        if self.analysis == Analysis::Idle {
            self.handle_dropped_files(ctx);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if let Some(logo) = &self.branding.logo {
                    ui.image((logo.id(), egui::vec2(LOGO_SIZE, LOGO_SIZE)));
                }
                ui.heading(egui::RichText::new("Tomato Quality Predictor").strong());
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.small(format!(
                    "© {} Tomato Quality Predictor. All Rights Reserved. v{}",
                    chrono::Local::now().year(),
                    self.app_version
                ));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |cols| {
                self.render_upload_panel(ctx, &mut cols[0]);
                self.render_history_panel(&mut cols[1]);
            });
        });

        if spinner_pending {
            self.analysis = Analysis::Running;
            ctx.request_repaint();
        }
    }
}
