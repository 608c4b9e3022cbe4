//! Home view: the model library and entry points to the other views.

use crate::assets::{ModelEntry, MODEL_LIBRARY};

/// Actions returned from the home panel.
#[derive(Debug, Clone, Copy)]
pub enum HomeAction {
    /// Open the plain 3D viewer for a library entry.
    OpenViewer(&'static ModelEntry),
    /// Open the AR studio for a library entry.
    OpenArStudio(&'static ModelEntry),
    OpenTutorial,
    OpenAbout,
}

#[derive(Debug, Default)]
pub struct HomePanel;

impl HomePanel {
    pub fn render(&mut self, ui: &mut egui::Ui, last_used: Option<&ModelEntry>) -> Vec<HomeAction> {
        let mut actions = Vec::new();

        ui.heading("AR Coloring Studio");
        ui.label("Pick a coloring page set, then view it in 3D or bring it to life with the camera.");
        ui.add_space(12.0);

        for entry in MODEL_LIBRARY {
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(entry.title).strong());
                    if last_used.is_some_and(|last| last.id == entry.id) {
                        ui.label(egui::RichText::new("last session").small().weak());
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("AR Studio").clicked() {
                            actions.push(HomeAction::OpenArStudio(entry));
                        }
                        if ui.button("3D Viewer").clicked() {
                            actions.push(HomeAction::OpenViewer(entry));
                        }
                    });
                });
            });
            ui.add_space(4.0);
        }

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.button("Start Tutorial").clicked() {
                actions.push(HomeAction::OpenTutorial);
            }
            if ui.button("About").clicked() {
                actions.push(HomeAction::OpenAbout);
            }
        });

        actions
    }
}
