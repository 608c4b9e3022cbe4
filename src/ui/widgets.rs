//! Shared egui drawing helpers for the studio panels.

use egui::Ui;

/// Full UV rect (0,0) to (1,1) for rendering entire texture.
pub const FULL_UV: egui::Rect = egui::Rect {
    min: egui::pos2(0.0, 0.0),
    max: egui::pos2(1.0, 1.0),
};

/// Draw a texture filling a rect with full UVs.
pub fn draw_texture(ui: &Ui, texture_id: egui::TextureId, rect: egui::Rect) {
    ui.painter().image(texture_id, rect, FULL_UV, egui::Color32::WHITE);
}

/// Draw a texture with aspect-ratio preservation (letterbox/pillarbox).
/// Returns the actual rect where the texture was drawn.
pub fn draw_texture_aspect_fit(
    ui: &Ui,
    texture_id: egui::TextureId,
    available: egui::Rect,
    texture_aspect: f32,
) -> egui::Rect {
    let available_aspect = available.width() / available.height();

    let image_rect = if texture_aspect > available_aspect {
        // Texture is wider - fit width, center vertically
        let height = available.width() / texture_aspect;
        let y_offset = (available.height() - height) / 2.0;
        egui::Rect::from_min_size(
            egui::pos2(available.left(), available.top() + y_offset),
            egui::vec2(available.width(), height),
        )
    } else {
        // Texture is taller - fit height, center horizontally
        let width = available.height() * texture_aspect;
        let x_offset = (available.width() - width) / 2.0;
        egui::Rect::from_min_size(
            egui::pos2(available.left() + x_offset, available.top()),
            egui::vec2(width, available.height()),
        )
    };

    draw_texture(ui, texture_id, image_rect);
    image_rect
}

/// Draw a placeholder when texture is not available.
pub fn draw_texture_placeholder(ui: &Ui, rect: egui::Rect, message: &str) {
    ui.painter().rect_filled(rect, 4.0, egui::Color32::from_gray(30));
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        message,
        egui::FontId::default(),
        egui::Color32::GRAY,
    );
}

/// Draw a border around a viewport rect.
pub fn draw_viewport_border(ui: &Ui, rect: egui::Rect) {
    ui.painter().rect_stroke(
        rect,
        4.0,
        egui::Stroke::new(1.0, egui::Color32::from_gray(60)),
        egui::StrokeKind::Outside,
    );
}

/// Map a normalized rect (0..1 in both axes) onto a screen rect.
pub fn project_normalized_rect(
    target: egui::Rect,
    min: (f32, f32),
    max: (f32, f32),
) -> egui::Rect {
    egui::Rect::from_min_max(
        egui::pos2(
            target.left() + min.0 * target.width(),
            target.top() + min.1 * target.height(),
        ),
        egui::pos2(
            target.left() + max.0 * target.width(),
            target.top() + max.1 * target.height(),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_normalized_rect() {
        let target = egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(200.0, 100.0));
        let rect = project_normalized_rect(target, (0.25, 0.5), (0.75, 1.0));
        assert_eq!(rect.left(), 150.0);
        assert_eq!(rect.top(), 100.0);
        assert_eq!(rect.right(), 250.0);
        assert_eq!(rect.bottom(), 150.0);
    }
}
