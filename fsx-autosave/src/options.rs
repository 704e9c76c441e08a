//! Settings dialog, run as its own process (`fsx-autosave options`).
//!
//! The running client notices the saved file on its next timer tick, so no
//! IPC is needed between the dialog and the message pump.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use autosave_core::{settings, store, Settings};

pub fn run_options_dialog(path: PathBuf) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([380.0, 250.0])
            .with_resizable(false),
        ..Default::default()
    };
    eframe::run_native(
        "FSX AutoSave Options",
        native_options,
        Box::new(move |_cc| Ok(Box::new(OptionsApp::new(path)))),
    )
    .map_err(|e| anyhow!("options dialog failed: {e}"))
}

struct OptionsApp {
    path: PathBuf,
    settings: Settings,
    status: Option<String>,
}

impl OptionsApp {
    fn new(path: PathBuf) -> Self {
        let settings = store::load(&path);
        OptionsApp { path, settings, status: None }
    }
}

impl eframe::App for OptionsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("FSX AutoSave");
            ui.separator();

            ui.add(
                egui::Slider::new(
                    &mut self.settings.save_interval_minutes,
                    settings::MIN_SAVE_INTERVAL_MIN..=settings::MAX_SAVE_INTERVAL_MIN,
                )
                .text("Save interval (minutes)"),
            );
            ui.add(
                egui::Slider::new(
                    &mut self.settings.max_saves_to_keep,
                    settings::MIN_SAVES_TO_KEEP..=settings::MAX_SAVES_TO_KEEP,
                )
                .text("Autosaves to keep"),
            );
            ui.checkbox(&mut self.settings.save_while_paused, "Save while paused");
            ui.checkbox(&mut self.settings.save_while_on_ground, "Save while on the ground");
            ui.checkbox(&mut self.settings.autosave_on_start, "Enable autosave on startup");

            ui.separator();
            if ui.button("Save settings").clicked() {
                self.status = Some(match store::save(&self.path, &self.settings) {
                    Ok(()) => "Settings saved.".to_string(),
                    Err(e) => format!("Could not save settings: {e}"),
                });
            }
            if let Some(status) = &self.status {
                ui.label(status);
            }
        });
    }
}
