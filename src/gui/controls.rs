use eframe::egui;
use crate::video::PlaybackSession;

/// What the transport bar asked for this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportAction {
    TogglePlay,
    Previous,
    Next,
    Seek(f64),
}

pub struct TransportBar;

impl TransportBar {
    /// Seek slider plus ⏮ / ▶⏸ / ⏭. `has_previous`/`has_next` grey out the
    /// step buttons at the ends of the index.
    pub fn show(
        ui: &mut egui::Ui,
        session: &PlaybackSession,
        has_previous: bool,
        has_next: bool,
    ) -> Option<TransportAction> {
        let mut action = None;
        let loaded = session.active_key().is_some();

        ui.horizontal(|ui| {
            ui.label(format_time(session.current_time));

            let mut position = session.current_time.min(session.duration);
            let slider_width = (ui.available_width() - 60.0).max(100.0);
            ui.spacing_mut().slider_width = slider_width;
            let response = ui.add_enabled(
                loaded,
                egui::Slider::new(&mut position, 0.0..=session.duration.max(0.0)).show_value(false),
            );
            if response.changed() {
                action = Some(TransportAction::Seek(position));
            }

            ui.label(format_time(session.duration));
        });

        ui.horizontal(|ui| {
            if ui.add_enabled(has_previous, egui::Button::new("⏮")).clicked() {
                action = Some(TransportAction::Previous);
            }

            let play_label = if session.is_playing { "⏸" } else { "▶" };
            if ui.add_enabled(loaded, egui::Button::new(play_label)).clicked() {
                action = Some(TransportAction::TogglePlay);
            }

            if ui.add_enabled(has_next, egui::Button::new("⏭")).clicked() {
                action = Some(TransportAction::Next);
            }

            ui.separator();
            ui.label(session.phase.display_text());
            ui.label(format!("{}×", format_rate(session.playback_rate)));
        });

        action
    }
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// `0.5`, `1`, `2` rather than `1.0`.
pub fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{}", rate as i64)
    } else {
        format!("{}", rate)
    }
}
