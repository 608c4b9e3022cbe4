//! 3D model viewer panel.
//!
//! Orbit viewport plus upload, zoom and screenshot controls. Camera input
//! is applied straight to the scene; anything needing app services (file
//! dialogs, the renderer) comes back as an action.

use crate::ui::widgets::{draw_texture, draw_texture_placeholder, draw_viewport_border};
use crate::viewer::ViewerScene;

/// Actions returned from the viewer panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    /// Pick a .glb/.gltf file and load it into the scene.
    UploadModel,
    /// Pick an image file and apply it to the model's texture slots.
    UploadTexture,
    /// Save the current viewport as a PNG.
    Screenshot,
    Back,
}

pub struct ViewerPanel {
    /// egui texture ID for the rendered viewport.
    pub texture_id: Option<egui::TextureId>,
    /// Viewport size in texels, as laid out last frame.
    viewport_size: (u32, u32),
}

impl Default for ViewerPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerPanel {
    pub fn new() -> Self {
        Self {
            texture_id: None,
            viewport_size: (640, 480),
        }
    }

    /// Size the offscreen render target should have.
    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport_size
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        scene: &mut ViewerScene,
        title: &str,
        importing: bool,
    ) -> Vec<ViewerAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            ui.heading(title);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Back").clicked() {
                    actions.push(ViewerAction::Back);
                }
            });
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.button("Upload Model...").clicked() {
                actions.push(ViewerAction::UploadModel);
            }
            if ui.button("Upload Texture...").clicked() {
                actions.push(ViewerAction::UploadTexture);
            }
            ui.separator();
            if ui.button("\u{2212}").on_hover_text("Zoom out").clicked() {
                scene.camera.zoom_out();
            }
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                scene.camera.zoom_in();
            }
            if ui.button("Reset View").clicked() {
                scene.camera.reset();
            }
            ui.separator();
            if ui.button("Screenshot...").clicked() {
                actions.push(ViewerAction::Screenshot);
            }
        });

        ui.horizontal(|ui| {
            if importing {
                ui.spinner();
                ui.label("Importing model...");
            } else {
                match scene.model() {
                    Some(model) => {
                        ui.label(format!(
                            "{} ({} texture slot{})",
                            model.name,
                            model.texture_slots(),
                            if model.texture_slots() == 1 { "" } else { "s" }
                        ));
                    }
                    None => {
                        ui.label("No model loaded");
                    }
                }
            }
            ui.label(
                egui::RichText::new("Drag to orbit, scroll or +/\u{2212} to zoom")
                    .small()
                    .weak(),
            );
        });

        ui.add_space(4.0);

        // Viewport fills the remaining panel space
        let available = ui.available_size();
        let viewport = egui::vec2(available.x.max(200.0), (available.y - 8.0).max(150.0));
        self.viewport_size = (viewport.x.round() as u32, viewport.y.round() as u32);

        let (rect, response) = ui.allocate_exact_size(viewport, egui::Sense::click_and_drag());

        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            scene.camera.on_drag((delta.x, delta.y));
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll.abs() > 0.0 {
                scene.camera.on_scroll(scroll * 0.01);
            }
        }

        if let Some(texture_id) = self.texture_id {
            draw_texture(ui, texture_id, rect);
        } else {
            draw_texture_placeholder(ui, rect, "Loading viewport...");
        }
        draw_viewport_border(ui, rect);

        actions
    }
}
