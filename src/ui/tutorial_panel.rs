//! Guided tutorial panel.
//!
//! Walks through the four steps of preparing a custom model and texture.
//! The viewport shows the spinning placeholder cube until the user's own
//! model arrives.

use crate::tutorial::{TutorialFlow, FIRST_STEP, LAST_STEP};
use crate::ui::widgets::{draw_texture, draw_texture_placeholder, draw_viewport_border};
use crate::viewer::ViewerScene;

/// Actions returned from the tutorial panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialAction {
    Next,
    Previous,
    Restart,
    UploadModel,
    UploadTexture,
    /// Save the bundled sample model somewhere the user picks.
    SaveSampleModel,
    /// Save the bundled sample texture somewhere the user picks.
    SaveSampleTexture,
    Exit,
}

pub struct TutorialPanel {
    /// egui texture ID for the rendered viewport.
    pub texture_id: Option<egui::TextureId>,
    viewport_size: (u32, u32),
}

impl Default for TutorialPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl TutorialPanel {
    pub fn new() -> Self {
        Self {
            texture_id: None,
            viewport_size: (640, 360),
        }
    }

    /// Size the offscreen render target should have.
    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport_size
    }

    pub fn render(
        &mut self,
        ui: &mut egui::Ui,
        flow: &TutorialFlow,
        scene: &mut ViewerScene,
    ) -> Vec<TutorialAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            ui.heading("Tutorial");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Exit").clicked() {
                    actions.push(TutorialAction::Exit);
                }
            });
        });

        ui.add_space(4.0);
        ui.label(format!(
            "Step {}/{}: {}",
            flow.step(),
            LAST_STEP,
            flow.step_title()
        ));
        ui.add(
            egui::ProgressBar::new(flow.progress() as f32 / 100.0)
                .text(format!("{}%", flow.progress())),
        );
        if flow.shows_placeholder() {
            ui.label(
                egui::RichText::new("The viewport shows the practice cube until your model arrives.")
                    .small()
                    .weak(),
            );
        }
        ui.add_space(8.0);

        self.render_step(ui, flow, &mut actions);

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(flow.step() > FIRST_STEP, egui::Button::new("Previous"))
                .clicked()
            {
                actions.push(TutorialAction::Previous);
            }
            if flow.step() < LAST_STEP {
                if ui
                    .add_enabled(flow.can_proceed(), egui::Button::new("Next"))
                    .clicked()
                {
                    actions.push(TutorialAction::Next);
                }
            } else if ui.button("Restart").clicked() {
                actions.push(TutorialAction::Restart);
            }
        });

        ui.add_space(8.0);

        // Viewport: placeholder cube, then whatever the user uploaded
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

    fn render_step(
        &self,
        ui: &mut egui::Ui,
        flow: &TutorialFlow,
        actions: &mut Vec<TutorialAction>,
    ) {
        match flow.step() {
            1 => {
                ui.label(
                    "This tutorial walks you through pairing your own 3D model with a \
                     hand-colored texture. Grab the samples if you want something to \
                     practice with.",
                );
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    if ui.button("Save Sample Model...").clicked() {
                        actions.push(TutorialAction::SaveSampleModel);
                    }
                    if ui.button("Save Sample Texture...").clicked() {
                        actions.push(TutorialAction::SaveSampleTexture);
                    }
                });
            }
            2 => {
                ui.label(
                    "Upload a .glb or .gltf model. It replaces the green cube and \
                     unlocks the next step.",
                );
                ui.add_space(4.0);
                if ui.button("Upload Model...").clicked() {
                    actions.push(TutorialAction::UploadModel);
                }
                if flow.model_uploaded() {
                    ui.colored_label(egui::Color32::LIGHT_GREEN, "Model uploaded.");
                }
            }
            3 => {
                ui.label(
                    "Now upload a texture image. Models with a texture slot pick it \
                     up immediately.",
                );
                ui.add_space(4.0);
                if ui.button("Upload Texture...").clicked() {
                    actions.push(TutorialAction::UploadTexture);
                }
                if flow.texture_uploaded() {
                    ui.colored_label(egui::Color32::LIGHT_GREEN, "Texture uploaded.");
                }
            }
            _ => {
                ui.label(
                    "That's the whole loop: model in, texture on, ready for the AR \
                     studio. Restart to run through it again.",
                );
            }
        }
    }
}
