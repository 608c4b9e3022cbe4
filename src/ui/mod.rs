//! egui panels for the studio views.
//!
//! Panels return action lists; the app owns the state and applies them.

use std::time::{Duration, Instant};

pub mod ar_panel;
pub mod home_panel;
pub mod tutorial_panel;
pub mod viewer_panel;
pub mod widgets;

pub use ar_panel::{ArAction, ArPanel};
pub use home_panel::{HomeAction, HomePanel};
pub use tutorial_panel::{TutorialAction, TutorialPanel};
pub use viewer_panel::{ViewerAction, ViewerPanel};
pub use widgets::{
    draw_texture, draw_texture_aspect_fit, draw_texture_placeholder, draw_viewport_border,
    project_normalized_rect, FULL_UV,
};

/// How long an alert stays on screen.
const ALERT_TTL: Duration = Duration::from_secs(6);

/// The view currently filling the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Viewer,
    ArStudio,
    Tutorial,
    About,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Library",
            View::Viewer => "Model Viewer",
            View::ArStudio => "AR Studio",
            View::Tutorial => "Tutorial",
            View::About => "About",
        }
    }
}

/// A transient error or status message.
#[derive(Debug, Clone)]
pub struct Alert {
    pub message: String,
    created: Instant,
}

/// Cross-panel UI state.
#[derive(Debug, Default)]
pub struct UiState {
    pub view: View,
    alerts: Vec<Alert>,
}

impl UiState {
    pub fn push_alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.alerts.push(Alert {
            message,
            created: Instant::now(),
        });
    }

    /// Drop expired alerts; call once per frame.
    pub fn prune_alerts(&mut self) {
        self.alerts.retain(|a| a.created.elapsed() < ALERT_TTL);
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }
}

/// Draw the alert stack in the corner of the window.
pub fn show_alerts(ctx: &egui::Context, state: &UiState) {
    if state.alerts.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("alert_stack"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            for alert in state.alerts() {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(420.0);
                    ui.colored_label(egui::Color32::LIGHT_RED, &alert.message);
                });
            }
        });
}
