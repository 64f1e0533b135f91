use eframe::egui;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::core::{scan_directory, AppConfig, EventMetadata, TimestampKey, ViewerError};
use crate::gui::camera_grid::CameraGrid;
use crate::gui::carousel::BatchCarousel;
use crate::gui::controls::{format_rate, TransportAction, TransportBar};
use crate::video::{
    MediaJob, MediaNotice, MediaWorker, PlaybackController, PlaybackEvent, PlaybackPhase, ProbingOpener,
    ToolRunner,
};

/// Keyboard shortcuts, active whenever no text field has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    TogglePlay,
    PreviousBatch,
    NextBatch,
}

impl Shortcut {
    fn from_input(input: &egui::InputState) -> Option<Self> {
        if input.key_pressed(egui::Key::Space) {
            Some(Shortcut::TogglePlay)
        } else if input.key_pressed(egui::Key::ArrowLeft) {
            Some(Shortcut::PreviousBatch)
        } else if input.key_pressed(egui::Key::ArrowRight) {
            Some(Shortcut::NextBatch)
        } else {
            None
        }
    }
}

const IDLE_REPAINT: Duration = Duration::from_millis(250);

pub struct ViewerApp {
    pub config: AppConfig,
    pub controller: PlaybackController,
    pub worker: MediaWorker,
    pub thumbnails: HashMap<TimestampKey, egui::TextureHandle>,
    pub metadata: Option<EventMetadata>,
    pub directory: Option<PathBuf>,
    pub status_message: String,
}

impl ViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> anyhow::Result<Self> {
        let mut visuals = egui::Visuals::dark();
        visuals.override_text_color = Some(egui::Color32::WHITE);
        cc.egui_ctx.set_visuals(visuals);

        let config = AppConfig::load()?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let worker = MediaWorker::new(ToolRunner::new(&config), config.max_tool_processes);
        let opener = ProbingOpener::new(worker.sender());
        let controller = PlaybackController::new(config.playback(), Box::new(opener));

        Self {
            config,
            controller,
            worker,
            thumbnails: HashMap::new(),
            metadata: None,
            directory: None,
            status_message: String::new(),
        }
    }

    pub fn pick_directory(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Select dashcam folder");
        if let Some(last) = self.config.last_directory.as_ref().filter(|dir| dir.is_dir()) {
            dialog = dialog.set_directory(last);
        }
        if let Some(path) = dialog.pick_folder() {
            self.open_directory(path.clone());
            self.config.last_directory = Some(path);
            if let Err(e) = self.config.save() {
                log::warn!("Failed to save config: {}", e);
            }
        }
    }

    /// Indexes every clip under `directory` and starts playing the earliest batch.
    pub fn open_directory(&mut self, directory: PathBuf) {
        log::info!("Opening dashcam folder {}", directory.display());

        let files = match scan_directory(&directory) {
            Ok(files) => files,
            Err(e) => {
                log::error!("Failed to scan {}: {}", directory.display(), e);
                self.status_message = format!("Cannot read {}: {}", directory.display(), e);
                return;
            }
        };

        let report = self.controller.on_directory_ingested(files);
        log::info!(
            "Indexed {} clips into {} batches ({} skipped, {} duplicates)",
            report.clips, report.batches, report.skipped, report.duplicates
        );

        self.thumbnails.clear();
        self.metadata = EventMetadata::load_first(self.controller.index().metadata_files());
        self.request_thumbnails();

        self.status_message = if report.batches == 0 {
            ViewerError::EmptyUpload.to_string()
        } else {
            format!("Loaded {} clips in {} batches", report.clips, report.batches)
        };

        self.directory = Some(directory);
    }

    fn request_thumbnails(&self) {
        for batch in self.controller.index().batches() {
            if let Some(clip) = batch.thumbnail_source() {
                self.worker.submit(MediaJob::Thumbnail {
                    key: batch.key().clone(),
                    path: clip.file.clone(),
                });
            }
        }
    }

    pub fn apply_shortcut(&mut self, shortcut: Shortcut) {
        match shortcut {
            Shortcut::TogglePlay => self.controller.toggle_play_pause(),
            Shortcut::PreviousBatch => {
                self.controller.prev_batch();
            }
            Shortcut::NextBatch => {
                self.controller.next_batch();
            }
        }
    }

    pub fn apply_transport(&mut self, action: TransportAction) {
        match action {
            TransportAction::TogglePlay => self.controller.toggle_play_pause(),
            TransportAction::Previous => {
                self.controller.prev_batch();
            }
            TransportAction::Next => {
                self.controller.next_batch();
            }
            TransportAction::Seek(time) => self.controller.seek(time),
        }
    }

    pub fn select_rate(&mut self, rate: f64) {
        if let Err(e) = self.controller.set_rate(rate) {
            log::warn!("{}", e);
            self.status_message = e.to_string();
        }
    }

    /// Feeds finished worker jobs back into the controller and texture cache.
    fn process_worker_notices(&mut self, ctx: &egui::Context) {
        for notice in self.worker.drain() {
            match notice {
                MediaNotice::Ready { key, angle } => self.controller.on_resource_ready(&key, angle),
                MediaNotice::Unprobed { key, angle, reason } => {
                    log::debug!("{} {} playing without a known duration: {}", key, angle, reason);
                    self.controller.on_resource_ready(&key, angle);
                }
                MediaNotice::Failed { key, angle, reason } => {
                    self.controller.on_resource_failed(&key, angle, &reason)
                }
                // Posters for a folder that has since been replaced.
                MediaNotice::Thumbnail { key, .. } if self.controller.index().get(&key).is_err() => {}
                MediaNotice::Thumbnail { key, result } => match result {
                    Ok(thumbnail) if thumbnail.is_complete() => {
                        let image = egui::ColorImage::from_rgba_unmultiplied(
                            [thumbnail.width as usize, thumbnail.height as usize],
                            &thumbnail.rgba,
                        );
                        let handle = ctx.load_texture(
                            format!("batch_thumbnail_{}", key),
                            image,
                            egui::TextureOptions::default(),
                        );
                        self.thumbnails.insert(key, handle);
                    }
                    Ok(_) => log::debug!("Incomplete thumbnail for {}", key),
                    Err(e) => log::debug!("No thumbnail for {}: {}", key, e),
                },
            }
        }
    }

    /// Turns controller events into status bar text.
    pub fn process_playback_events(&mut self) {
        for event in self.controller.drain_events() {
            match event {
                PlaybackEvent::BatchReady { key, .. } => {
                    self.status_message = format!("Batch {}", key.display_label());
                }
                PlaybackEvent::Advanced { to, .. } => {
                    self.status_message = format!("Continued with {}", to.display_label());
                }
                PlaybackEvent::EndOfIndex => {
                    self.status_message = "End of recordings".to_string();
                }
                PlaybackEvent::StreamError { angle, message } => {
                    self.status_message = format!("{}: {}", angle.label(), message);
                }
                PlaybackEvent::IndexRebuilt { .. }
                | PlaybackEvent::BatchLoading { .. }
                | PlaybackEvent::TimeUpdate(_)
                | PlaybackEvent::DurationChanged(_) => {}
            }
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        if let Some(shortcut) = ctx.input(Shortcut::from_input) {
            self.apply_shortcut(shortcut);
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_worker_notices(ctx);
        self.handle_keyboard(ctx);
        self.controller.poll(Instant::now());
        self.process_playback_events();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Folder...").clicked() {
                        ui.close_menu();
                        self.pick_directory();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.separator();
                ui.label("Speed:");
                let current_rate = self.controller.session().playback_rate;
                for rate in self.config.permitted_rates.clone() {
                    let selected = (rate - current_rate).abs() < f64::EPSILON;
                    if ui.selectable_label(selected, format!("{}×", format_rate(rate))).clicked() {
                        self.select_rate(rate);
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(metadata) = &self.metadata {
                        if let Some(location) = metadata.location_label() {
                            ui.label(format!("📍 {}", location));
                        }
                        if let Some(time) = metadata.time_label() {
                            ui.label(format!("🕒 {}", time));
                        }
                        if let Some(reason) = &metadata.reason {
                            ui.label(reason);
                        }
                    }
                    if let Some(dir) = &self.directory {
                        ui.label(format!("📁 {}", dir.file_name().unwrap_or_default().to_string_lossy()));
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Status:");
                if self.status_message.is_empty() {
                    ui.label("Ready");
                } else {
                    ui.label(&self.status_message);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label("Space: play/pause   ←/→: previous/next batch");
                });
            });
        });

        let keys = self.controller.index().keys().to_vec();
        if !keys.is_empty() {
            egui::TopBottomPanel::bottom("carousel")
                .resizable(false)
                .show(ctx, |ui| {
                    let active = self.controller.active_key().cloned();
                    if let Some(key) =
                        BatchCarousel::show(ui, &keys, active.as_ref(), &self.thumbnails)
                    {
                        if let Err(e) = self.controller.select_batch(&key) {
                            log::error!("Failed to select batch {}: {}", key, e);
                        }
                    }
                });
        }

        egui::TopBottomPanel::bottom("transport").show(ctx, |ui| {
            let active = self.controller.active_key().cloned();
            let index = self.controller.index();
            let has_previous = active.as_ref().map_or(false, |key| index.prev_key(key).is_some());
            let has_next = active.as_ref().map_or(false, |key| index.next_key(key).is_some());

            if let Some(action) =
                TransportBar::show(ui, self.controller.session(), has_previous, has_next)
            {
                self.apply_transport(action);
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.controller.index().is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("Dashcam Viewer");
                        ui.label("Open a folder of dashcam recordings to start.");
                        ui.add_space(20.0);
                        if ui.button("📁 Open Folder").clicked() {
                            self.pick_directory();
                        }
                    });
                });
                return;
            }

            let batch = self
                .controller
                .active_key()
                .and_then(|key| self.controller.index().get(key).ok());
            let poster = self.controller.active_key().and_then(|key| self.thumbnails.get(key));
            let loading = matches!(self.controller.session().phase, PlaybackPhase::Loading { .. });
            CameraGrid::show(ui, batch, self.controller.streams(), loading, poster);
        });

        let next_tick = self.controller.time_until_next_tick(Instant::now());
        ctx.request_repaint_after(next_tick.map_or(IDLE_REPAINT, |due| due.min(IDLE_REPAINT)));
    }
}
