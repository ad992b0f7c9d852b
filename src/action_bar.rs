use egui::{vec2, Align, Layout, RichText, Ui};

use crate::state::EditorState;
use crate::theme::{self, WidthClass};
use crate::ui_controls;

pub struct ActionBarOutput {
    pub undo: bool,
    pub redo: bool,
    pub save: bool,
}

pub fn show_action_bar(
    ui: &mut Ui,
    state: &EditorState,
    width_class: WidthClass,
) -> ActionBarOutput {
    let theme = theme::editor_theme();
    let action_h = theme.controls.action_height;
    let mut output = ActionBarOutput {
        undo: false,
        redo: false,
        save: false,
    };

    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
        ui.spacing_mut().item_spacing = vec2(theme.layout.space_3, 0.0);

        ui.add_enabled_ui(state.history.can_undo(), |ui| {
            let hint = state
                .history
                .undo_label()
                .map(|label| format!("Undo {label} (Ctrl+Z)"))
                .unwrap_or_else(|| "Undo (Ctrl+Z)".to_string());
            if ui_controls::ghost_button(ui, &theme, "Undo", vec2(64.0, action_h))
                .on_hover_text(hint)
                .clicked()
            {
                output.undo = true;
            }
        });

        ui.add_enabled_ui(state.history.can_redo(), |ui| {
            let hint = state
                .history
                .redo_label()
                .map(|label| format!("Redo {label} (Ctrl+Shift+Z)"))
                .unwrap_or_else(|| "Redo (Ctrl+Shift+Z)".to_string());
            if ui_controls::ghost_button(ui, &theme, "Redo", vec2(64.0, action_h))
                .on_hover_text(hint)
                .clicked()
            {
                output.redo = true;
            }
        });

        ui_controls::group_separator(ui, &theme);
        ui.label(
            RichText::new(&state.status)
                .color(theme.text.secondary)
                .size(13.0),
        );

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui_controls::primary_button(ui, &theme, "Save", vec2(76.0, action_h))
                .on_hover_text("Write raw PGM and annotated PNG to output/ (Ctrl+S)")
                .clicked()
            {
                output.save = true;
            }

            if width_class != WidthClass::Compact {
                ui.label(
                    RichText::new(format!(
                        "{:.0} px/cell · {} tool",
                        state.pixels_per_cell(),
                        state.tool.label()
                    ))
                    .color(theme.text.muted)
                    .size(12.0),
                );
            }
        });
    });

    output
}
