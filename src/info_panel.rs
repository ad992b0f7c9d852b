use egui::{vec2, Color32, Context, Rect, RichText, Sense, Stroke, Ui};

use crate::state::EditorState;
use crate::theme;

/// Map facts plus an overview thumbnail with the visible-viewport rectangle.
pub fn show_info_panel(ui: &mut Ui, ctx: &Context, state: &mut EditorState) {
    let theme = theme::editor_theme();

    ui.add_space(theme.layout.space_2);
    ui.label(
        RichText::new(&state.map_name)
            .size(16.0)
            .color(theme.text.primary),
    );
    ui.add_space(theme.layout.space_2);

    fact_row(
        ui,
        &theme,
        "File",
        state
            .map_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| state.map_path.display().to_string()),
    );
    fact_row(ui, &theme, "Width", format!("{} cells", state.grid.width()));
    fact_row(ui, &theme, "Height", format!("{} cells", state.grid.height()));
    fact_row(
        ui,
        &theme,
        "Resolution",
        format!("{:.3} m/cell", state.meta.resolution),
    );
    fact_row(
        ui,
        &theme,
        "Origin",
        format!("({:.2}, {:.2})", state.meta.origin.0, state.meta.origin.1),
    );
    fact_row(
        ui,
        &theme,
        "Thresholds",
        format!(
            "occ {:.2} / free {:.2}",
            state.meta.occupied_thresh, state.meta.free_thresh
        ),
    );

    ui.add_space(theme.layout.space_3);
    ui.separator();
    ui.add_space(theme.layout.space_2);
    ui.label(RichText::new("Overview").color(theme.text.muted).size(12.0));
    ui.add_space(theme.layout.space_1);
    minimap(ui, ctx, state, &theme);
}

fn fact_row(ui: &mut Ui, theme: &theme::AppTheme, label: &str, value: String) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(label).color(theme.text.muted).size(12.0));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(value).color(theme.text.secondary).size(12.0));
        });
    });
}

fn minimap(ui: &mut Ui, ctx: &Context, state: &mut EditorState, theme: &theme::AppTheme) {
    let grid_w = state.grid.width() as f32;
    let grid_h = state.grid.height() as f32;
    let width = ui.available_width();
    let height = (width * grid_h / grid_w).clamp(40.0, 260.0);

    let (rect, _) = ui.allocate_exact_size(vec2(width, height), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, theme.surfaces.canvas_bg);

    let texture = state.scene.texture_id(ctx);
    painter.image(
        texture,
        rect,
        Rect::from_min_max(egui::Pos2::ZERO, egui::Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    // Red rectangle marking the part of the scene the scroll view shows.
    let viewport = state.viewport;
    if viewport.content_size.x > 0.0 && viewport.content_size.y > 0.0 {
        let scale_x = rect.width() / viewport.content_size.x;
        let scale_y = rect.height() / viewport.content_size.y;
        let view_rect = Rect::from_min_size(
            rect.min
                + vec2(
                    viewport.offset.x * scale_x,
                    viewport.offset.y * scale_y,
                ),
            vec2(
                (viewport.view_size.x * scale_x).min(rect.width()),
                (viewport.view_size.y * scale_y).min(rect.height()),
            ),
        );
        painter.rect_stroke(
            view_rect.intersect(rect),
            0.0,
            Stroke::new(1.0, Color32::RED),
        );
    }

    painter.rect_stroke(rect, 4.0, Stroke::new(1.0, theme.surfaces.stroke_soft));
}
