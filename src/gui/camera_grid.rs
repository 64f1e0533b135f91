use egui;
use crate::core::{Batch, CameraAngle};
use crate::gui::controls::format_time;
use crate::video::media::PlayableMedia;
use crate::video::StreamGroup;

const CELL_ASPECT: f32 = 16.0 / 9.0;
const CELL_SPACING: f32 = 6.0;

/// The six camera slots, laid out as the car sees them.
pub struct CameraGrid;

impl CameraGrid {
    /// `loading` is true while the controller waits for the batch to settle.
    pub fn show(
        ui: &mut egui::Ui,
        batch: Option<&Batch>,
        streams: &StreamGroup,
        loading: bool,
        poster: Option<&egui::TextureHandle>,
    ) {
        let columns = CameraAngle::LAYOUT[0].len() as f32;
        let rows = CameraAngle::LAYOUT.len() as f32;
        let mut cell_width = (ui.available_width() - CELL_SPACING * (columns - 1.0)) / columns;
        let max_height = (ui.available_height() - CELL_SPACING * (rows - 1.0)) / rows;
        if cell_width / CELL_ASPECT > max_height {
            cell_width = max_height * CELL_ASPECT;
        }
        let cell_size = egui::vec2(cell_width.max(40.0), (cell_width / CELL_ASPECT).max(22.5));

        ui.spacing_mut().item_spacing = egui::vec2(CELL_SPACING, CELL_SPACING);
        for row in CameraAngle::LAYOUT.iter() {
            ui.horizontal(|ui| {
                for &angle in row {
                    let poster = if angle == CameraAngle::Front { poster } else { None };
                    Self::show_cell(ui, angle, batch, streams, loading, poster, cell_size);
                }
            });
        }
    }

    fn show_cell(
        ui: &mut egui::Ui,
        angle: CameraAngle,
        batch: Option<&Batch>,
        streams: &StreamGroup,
        loading: bool,
        poster: Option<&egui::TextureHandle>,
        size: egui::Vec2,
    ) {
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, egui::Color32::from_gray(20));

        let clip = batch.and_then(|batch| batch.get(angle));
        let stream = streams.get(angle);

        if let (Some(texture), Some(_)) = (poster, stream) {
            painter.image(
                texture.id(),
                rect.shrink(2.0),
                egui::Rect::from_min_max(egui::Pos2::ZERO, egui::Pos2::new(1.0, 1.0)),
                egui::Color32::from_white_alpha(90),
            );
        }

        painter.text(
            rect.left_top() + egui::vec2(6.0, 4.0),
            egui::Align2::LEFT_TOP,
            angle.label(),
            egui::FontId::proportional(14.0),
            egui::Color32::WHITE,
        );

        let (body, colour) = match (clip, stream) {
            (Some(_), Some(media)) if loading && !media.is_ready() => {
                ("Loading...".to_string(), egui::Color32::LIGHT_GRAY)
            }
            (Some(_), Some(media)) => (stream_time_label(media), egui::Color32::WHITE),
            // Present in the batch but dropped after a bind or play failure.
            (Some(_), None) => ("Unavailable".to_string(), egui::Color32::LIGHT_RED),
            (None, _) => ("No video".to_string(), egui::Color32::DARK_GRAY),
        };
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            body,
            egui::FontId::proportional(16.0),
            colour,
        );

        if let Some(clip) = clip {
            painter.text(
                rect.left_bottom() + egui::vec2(6.0, -4.0),
                egui::Align2::LEFT_BOTTOM,
                clip.file_name(),
                egui::FontId::proportional(11.0),
                egui::Color32::GRAY,
            );
        }

        if streams.reference_angle() == Some(angle) {
            painter.rect_stroke(rect, 4.0, egui::Stroke::new(1.0, ui.visuals().selection.stroke.color));
        }
    }
}

/// Position and duration of a playing stream. Streams that started without
/// a probed duration show their position alone.
pub fn stream_time_label(media: &dyn PlayableMedia) -> String {
    match media.duration() {
        Some(duration) => format!("{} / {}", format_time(media.current_time()), format_time(duration)),
        None => format_time(media.current_time()),
    }
}
