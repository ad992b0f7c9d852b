use egui::{vec2, Align, Align2, ComboBox, FontId, Layout, Pos2, Rect, RichText, Stroke, Ui};

use crate::interaction::{self, PaintColor, Tool};
use crate::state::{EditorState, MAX_BRUSH, MAX_ZOOM, MIN_BRUSH, MIN_ZOOM, ZOOM_PRESETS};
use crate::theme::{self, WidthClass};
use crate::ui_controls;

const TOOLS: [Tool; 5] = [Tool::Select, Tool::Paint, Tool::Measure, Tool::Line, Tool::Text];

const PAINT_COLORS: [PaintColor; 4] = [
    PaintColor::Alternate,
    PaintColor::Occupied,
    PaintColor::Unoccupied,
    PaintColor::Uncertain,
];

#[derive(Clone, Copy, Debug)]
pub struct ToolbarPlan {
    pub show_brush_inline: bool,
    pub show_zoom_slider: bool,
    pub show_rotation_inline: bool,
    pub show_overflow: bool,
}

pub fn plan_toolbar_items(width_class: WidthClass) -> ToolbarPlan {
    match width_class {
        WidthClass::Compact => ToolbarPlan {
            show_brush_inline: false,
            show_zoom_slider: false,
            show_rotation_inline: false,
            show_overflow: true,
        },
        WidthClass::Regular => ToolbarPlan {
            show_brush_inline: true,
            show_zoom_slider: false,
            show_rotation_inline: false,
            show_overflow: true,
        },
        WidthClass::Wide => ToolbarPlan {
            show_brush_inline: true,
            show_zoom_slider: true,
            show_rotation_inline: true,
            show_overflow: false,
        },
    }
}

pub fn show_toolbar(ui: &mut Ui, state: &mut EditorState, width_class: WidthClass) {
    let theme = theme::editor_theme();
    let plan = plan_toolbar_items(width_class);

    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
        ui.spacing_mut().interact_size.y = theme.layout.chip_h;
        ui.spacing_mut().item_spacing = vec2(theme.layout.control_gap, 0.0);

        for tool in TOOLS {
            tool_button(ui, state, tool);
        }

        ui_controls::group_separator(ui, &theme);

        // Paint controls are meaningless while measuring; the original
        // editor greys them out the same way.
        let paint_enabled = state.tool != Tool::Measure;
        ui.add_enabled_ui(paint_enabled, |ui| {
            for color in PAINT_COLORS {
                let selected = state.paint_color == color;
                if ui_controls::segmented(ui, &theme, color.label(), selected)
                    .on_hover_text("Paint color mode")
                    .clicked()
                {
                    state.set_paint_color(color);
                }
            }

            if plan.show_brush_inline {
                ui.add_space(theme.layout.space_2);
                ui.label(RichText::new("Brush").color(theme.text.muted).size(12.0));
                brush_slider(ui, state);
            }
        });

        ui_controls::group_separator(ui, &theme);
        zoom_combo(ui, state);
        if plan.show_zoom_slider {
            zoom_slider(ui, state);
        }

        if plan.show_rotation_inline {
            ui_controls::group_separator(ui, &theme);
            rotation_control(ui, state, &theme);
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui_controls::ghost_button(ui, &theme, "Clear dims", vec2(92.0, theme.layout.chip_h))
                .on_hover_text("Remove every measurement")
                .clicked()
            {
                clear_dimensions(state);
            }

            if plan.show_overflow {
                ui.menu_button("…", |ui| {
                    ui.spacing_mut().item_spacing =
                        vec2(theme.layout.control_gap, theme.layout.space_2);

                    if !plan.show_brush_inline {
                        ui.label(RichText::new("Brush").color(theme.text.muted).size(12.0));
                        brush_slider(ui, state);
                        ui.separator();
                    }

                    if !plan.show_zoom_slider {
                        ui.label(RichText::new("Zoom").color(theme.text.muted).size(12.0));
                        zoom_slider(ui, state);
                        ui.separator();
                    }

                    if !plan.show_rotation_inline {
                        rotation_control(ui, state, &theme);
                    }
                });
            }
        });
    });
}

fn clear_dimensions(state: &mut EditorState) {
    state.undoable("Clear measurements", |s| {
        s.store.clear_dimensions();
    });
    state.set_status("All measurements cleared");
}

fn brush_slider(ui: &mut Ui, state: &mut EditorState) {
    let mut brush = state.brush_size;
    let response = ui.add(
        egui::Slider::new(&mut brush, MIN_BRUSH..=MAX_BRUSH)
            .integer()
            .show_value(true),
    );
    if response.changed() {
        state.set_brush_size(brush);
    }
}

fn zoom_combo(ui: &mut Ui, state: &mut EditorState) {
    let current_label = ZOOM_PRESETS
        .iter()
        .find(|&&(_, z)| z == state.zoom)
        .map(|&(label, _)| label.to_string())
        .unwrap_or_else(|| format!("{} x", state.zoom));

    let mut selected = state.zoom;
    ComboBox::from_id_source("gridmark_zoom_presets")
        .selected_text(current_label)
        .width(86.0)
        .show_ui(ui, |ui| {
            for (label, zoom) in ZOOM_PRESETS {
                ui.selectable_value(&mut selected, zoom, label);
            }
        });
    if selected != state.zoom {
        state.set_zoom(selected);
    }
}

fn zoom_slider(ui: &mut Ui, state: &mut EditorState) {
    let mut zoom = state.zoom;
    let response = ui.add(
        egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM)
            .integer()
            .show_value(false),
    );
    if response.changed() {
        state.set_zoom(zoom);
    }
}

fn rotation_control(ui: &mut Ui, state: &mut EditorState, theme: &theme::AppTheme) {
    ui.label(RichText::new("Rotation").color(theme.text.muted).size(12.0));
    let mut degrees = state.rotation_deg;
    let response = ui.add(
        egui::Slider::new(&mut degrees, 0.0..=360.0)
            .fixed_decimals(0)
            .suffix("°"),
    );
    if response.changed() {
        state.set_rotation(degrees);
    }
    if ui_controls::ghost_button(ui, theme, "Reset", vec2(56.0, theme.layout.chip_h)).clicked() {
        state.reset_rotation();
    }
}

fn tool_button(ui: &mut Ui, state: &mut EditorState, tool: Tool) {
    let theme = theme::editor_theme();
    let selected = state.tool == tool;
    let hint = match tool {
        Tool::Select => "Select (V)",
        Tool::Paint => "Paint (P)",
        Tool::Measure => "Measure (M)",
        Tool::Line => "Line (L)",
        Tool::Text => "Text (T)",
    };
    let response = ui_controls::tool_chip(ui, &theme, "", selected).on_hover_text(hint);
    draw_tool_icon(ui, response.rect, tool, selected);
    if response.clicked() {
        interaction::set_tool(state, tool);
    }
}

fn draw_tool_icon(ui: &Ui, rect: Rect, tool: Tool, selected: bool) {
    let theme = theme::editor_theme();
    let color = if selected {
        theme.text.primary
    } else {
        theme.text.secondary
    };
    let stroke = Stroke::new(1.6, color);
    let painter = ui.painter();
    let icon_rect = rect.shrink2(vec2(9.0, 6.0));

    match tool {
        Tool::Select => {
            let tip = Pos2::new(icon_rect.left() + 2.0, icon_rect.top());
            let base = Pos2::new(icon_rect.left() + 7.5, icon_rect.bottom());
            let inner = Pos2::new(icon_rect.left() + 9.5, icon_rect.center().y + 2.0);
            let wing = Pos2::new(icon_rect.right() - 1.5, icon_rect.center().y - 1.0);
            painter.line_segment([tip, base], stroke);
            painter.line_segment([base, inner], stroke);
            painter.line_segment([inner, wing], stroke);
            painter.line_segment([wing, tip], stroke);
        }
        Tool::Paint => {
            // Brush: slanted handle with a round tip.
            let tip = Pos2::new(icon_rect.left() + 3.0, icon_rect.bottom() - 2.0);
            let top = Pos2::new(icon_rect.right() - 2.0, icon_rect.top() + 1.0);
            painter.line_segment([tip, top], stroke);
            painter.circle_filled(tip, 2.8, color);
        }
        Tool::Measure => {
            let body = icon_rect.shrink2(vec2(0.0, 3.0));
            painter.rect_stroke(body, 2.0, stroke);
            for i in 1..4 {
                let x = body.left() + body.width() * i as f32 / 4.0;
                painter.line_segment(
                    [Pos2::new(x, body.top()), Pos2::new(x, body.top() + 4.0)],
                    Stroke::new(1.2, color),
                );
            }
        }
        Tool::Line => {
            let a = Pos2::new(icon_rect.left() + 1.0, icon_rect.bottom() - 1.0);
            let b = Pos2::new(icon_rect.right() - 1.0, icon_rect.top() + 1.0);
            painter.line_segment([a, b], stroke);
            painter.circle_filled(a, 1.6, color);
            painter.circle_filled(b, 1.6, color);
        }
        Tool::Text => {
            painter.text(
                icon_rect.center(),
                Align2::CENTER_CENTER,
                "T",
                FontId::proportional(14.5),
                color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::plan_toolbar_items;
    use crate::theme::WidthClass;

    #[test]
    fn compact_layout_moves_sliders_to_overflow() {
        let plan = plan_toolbar_items(WidthClass::Compact);
        assert!(!plan.show_brush_inline);
        assert!(!plan.show_rotation_inline);
        assert!(plan.show_overflow);
    }

    #[test]
    fn wide_layout_is_fully_inline() {
        let plan = plan_toolbar_items(WidthClass::Wide);
        assert!(plan.show_brush_inline);
        assert!(plan.show_zoom_slider);
        assert!(plan.show_rotation_inline);
        assert!(!plan.show_overflow);
    }
}
