//! AR studio panel.
//!
//! Camera feed with the overlay model drawn at the tracked page anchor,
//! plus the capture and variant controls. Everything stays disabled until
//! the runtime preload finishes.

use crate::ar::{ArSession, OverlayVariant};
use crate::bootstrap::PreloadState;
use crate::camera::CameraStatus;
use crate::render::StreamedTexture;
use crate::ui::widgets::{
    draw_texture, draw_texture_aspect_fit, draw_texture_placeholder, draw_viewport_border,
    project_normalized_rect,
};
use crate::vision::CaptureOutcome;

/// Actions returned from the AR panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArAction {
    /// Run the capture pipeline on the current camera frame.
    Capture,
    /// Swap between the line-art and pre-colored overlay models.
    ToggleVariant,
    /// Save the last captured page (or its edge map) to disk.
    SavePage,
    Back,
}

pub struct ArPanel {
    /// egui texture ID for the rendered overlay model.
    pub overlay_texture_id: Option<egui::TextureId>,
}

impl Default for ArPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ArPanel {
    pub fn new() -> Self {
        Self {
            overlay_texture_id: None,
        }
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        session: &ArSession,
        camera_status: &CameraStatus,
        camera_feed: &StreamedTexture,
        capture_preview: &StreamedTexture,
        page_reference: &StreamedTexture,
    ) -> Vec<ArAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            ui.heading(format!("AR Studio: {}", session.entry().title));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Back").clicked() {
                    actions.push(ArAction::Back);
                }
            });
        });

        ui.add_space(4.0);
        self.render_status(ui, session, camera_status);
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            let can_capture = session.is_ready() && camera_feed.has_frame();
            if ui
                .add_enabled(can_capture, egui::Button::new("Capture Page"))
                .clicked()
            {
                actions.push(ArAction::Capture);
            }

            let variant_label = match session.variant() {
                OverlayVariant::Base => "Show Colored",
                OverlayVariant::Colored => "Show Line Art",
            };
            if ui
                .add_enabled(session.is_ready(), egui::Button::new(variant_label))
                .clicked()
            {
                actions.push(ArAction::ToggleVariant);
            }
        });

        ui.add_space(4.0);

        // Camera feed with the overlay composited at the tracked anchor
        let available = ui.available_size();
        let feed_height = (available.y - 110.0).max(180.0);
        let (feed_rect, _) = ui.allocate_exact_size(
            egui::vec2(available.x.max(240.0), feed_height),
            egui::Sense::hover(),
        );

        match (camera_feed.egui_id(), camera_feed.size()) {
            (Some(feed_id), Some(size)) => {
                let image_rect = draw_texture_aspect_fit(ui, feed_id, feed_rect, size.x / size.y);
                self.render_overlay(ui, session, image_rect);
            }
            _ => {
                let message = match camera_status {
                    CameraStatus::Failed(reason) => reason.as_str(),
                    _ => "Waiting for camera...",
                };
                draw_texture_placeholder(ui, feed_rect, message);
            }
        }
        draw_viewport_border(ui, feed_rect);

        ui.add_space(6.0);
        self.render_capture_strip(ui, session, capture_preview, page_reference, &mut actions);

        actions
    }

    fn render_status(&self, ui: &mut egui::Ui, session: &ArSession, camera_status: &CameraStatus) {
        match session.state() {
            PreloadState::Loading => {
                let (loaded, total) = session.preload_progress().unwrap_or((0, 0));
                ui.horizontal(|ui| {
                    ui.label(format!("Loading runtime assets {}/{}...", loaded, total));
                    if total > 0 {
                        ui.add(egui::ProgressBar::new(loaded as f32 / total as f32));
                    }
                });
            }
            PreloadState::Failed(message) => {
                ui.colored_label(egui::Color32::LIGHT_RED, message);
            }
            PreloadState::Ready => {
                let hint = if session.anchor().is_some() {
                    "Page found. Capture when the colors look right."
                } else {
                    "Point the camera at the coloring page."
                };
                ui.label(hint);
            }
        }

        if let CameraStatus::Streaming {
            name,
            width,
            height,
        } = camera_status
        {
            ui.label(
                egui::RichText::new(format!("{} ({}x{})", name, width, height))
                    .small()
                    .weak(),
            );
        }
    }

    /// Draw the overlay model over the camera image, anchored to the page.
    fn render_overlay(&self, ui: &mut egui::Ui, session: &ArSession, image_rect: egui::Rect) {
        let (Some(overlay_id), Some(anchor)) = (self.overlay_texture_id, session.anchor()) else {
            return;
        };
        let anchor_rect = project_normalized_rect(image_rect, anchor.min, anchor.max);
        // The overlay target is square; cover the anchor with a centered square
        let side = anchor_rect.width().max(anchor_rect.height());
        let overlay_rect = egui::Rect::from_center_size(anchor_rect.center(), egui::vec2(side, side));
        draw_texture(ui, overlay_id, overlay_rect.intersect(image_rect));
    }

    fn render_capture_strip(
        &self,
        ui: &mut egui::Ui,
        session: &ArSession,
        capture_preview: &StreamedTexture,
        page_reference: &StreamedTexture,
        actions: &mut Vec<ArAction>,
    ) {
        ui.horizontal(|ui| {
            let label = match session.last_outcome() {
                Some(CaptureOutcome::Retextured { .. }) => "Last capture",
                Some(CaptureOutcome::NoTarget { .. }) => "No page found (edge view)",
                None => "No capture yet",
            };
            ui.label(egui::RichText::new(label).small());

            if let (Some(preview_id), Some(size)) = (capture_preview.egui_id(), capture_preview.size())
            {
                Self::thumbnail(ui, preview_id, size);
            }

            if session.last_outcome().is_some() && ui.button("Save Page...").clicked() {
                actions.push(ArAction::SavePage);
            }

            // Which printed page the camera should see
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let (Some(marker_id), Some(size)) =
                    (page_reference.egui_id(), page_reference.size())
                {
                    Self::thumbnail(ui, marker_id, size);
                    ui.label(egui::RichText::new("Target page").small().weak());
                }
            });
        });
    }

    fn thumbnail(ui: &mut egui::Ui, texture_id: egui::TextureId, size: egui::Vec2) {
        let thumb_height = 72.0;
        let thumb = egui::vec2(thumb_height * size.x / size.y, thumb_height);
        let (rect, _) = ui.allocate_exact_size(thumb, egui::Sense::hover());
        draw_texture(ui, texture_id, rect);
        draw_viewport_border(ui, rect);
    }
}
