use egui;
use std::collections::HashMap;
use crate::core::TimestampKey;
use crate::video::{THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};

/// Horizontal strip of batches, oldest first.
pub struct BatchCarousel;

impl BatchCarousel {
    /// Returns the batch the user clicked, if any.
    pub fn show(
        ui: &mut egui::Ui,
        keys: &[TimestampKey],
        active: Option<&TimestampKey>,
        thumbnails: &HashMap<TimestampKey, egui::TextureHandle>,
    ) -> Option<TimestampKey> {
        let mut clicked = None;

        egui::ScrollArea::horizontal()
            .id_source("batch_carousel")
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    for key in keys {
                        let is_active = active == Some(key);
                        let response = Self::show_item(ui, key, is_active, thumbnails.get(key));
                        if is_active && active_changed(ui, key) {
                            response.scroll_to_me(Some(egui::Align::Center));
                        }
                        if response.clicked() && !is_active {
                            clicked = Some(key.clone());
                        }
                    }
                });
            });

        clicked
    }

    fn show_item(
        ui: &mut egui::Ui,
        key: &TimestampKey,
        is_selected: bool,
        thumbnail: Option<&egui::TextureHandle>,
    ) -> egui::Response {
        let thumb_size = egui::vec2(THUMBNAIL_WIDTH as f32, THUMBNAIL_HEIGHT as f32);
        let label_height = ui.text_style_height(&egui::TextStyle::Small) + 4.0;
        let container_size = thumb_size + egui::vec2(10.0, 10.0 + label_height);

        let (container_rect, response) = ui.allocate_exact_size(container_size, egui::Sense::click());
        let painter = ui.painter();

        if is_selected {
            painter.rect_filled(container_rect, 4.0, ui.visuals().selection.bg_fill);
            painter.rect_stroke(container_rect, 4.0, ui.visuals().selection.stroke);
        } else if response.hovered() {
            let mut hover_color = ui.visuals().selection.bg_fill;
            hover_color[3] = (hover_color[3] as f32 * 0.3) as u8;
            painter.rect_filled(container_rect, 4.0, hover_color);
        }

        let thumb_rect = egui::Rect::from_min_size(container_rect.min + egui::vec2(5.0, 5.0), thumb_size);
        painter.rect_filled(thumb_rect, 4.0, egui::Color32::DARK_GRAY);
        if let Some(texture) = thumbnail {
            painter.image(
                texture.id(),
                thumb_rect,
                egui::Rect::from_min_max(egui::Pos2::ZERO, egui::Pos2::new(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        } else {
            painter.text(
                thumb_rect.center(),
                egui::Align2::CENTER_CENTER,
                "🎞",
                egui::FontId::proportional(24.0),
                egui::Color32::GRAY,
            );
        }

        painter.text(
            egui::pos2(container_rect.center().x, thumb_rect.max.y + 4.0),
            egui::Align2::CENTER_TOP,
            key.display_label(),
            egui::FontId::proportional(11.0),
            egui::Color32::WHITE,
        );

        let hover = match key.to_datetime() {
            Some(time) => time.format("%A %-d %B %Y, %H:%M:%S").to_string(),
            None => key.as_str().to_string(),
        };
        response.on_hover_text(hover)
    }
}

/// True on the first frame a batch is shown as active.
fn active_changed(ui: &egui::Ui, key: &TimestampKey) -> bool {
    let id = egui::Id::new("batch_carousel_active");
    ui.ctx().data_mut(|data| {
        let previous: Option<TimestampKey> = data.get_temp(id);
        if previous.as_ref() == Some(key) {
            false
        } else {
            data.insert_temp(id, key.clone());
            true
        }
    })
}
