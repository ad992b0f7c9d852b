use eframe::egui::{self, Context as EguiContext, Key, TopBottomPanel};
use eframe::{App, Frame};
use tracing::error;

use crate::action_bar;
use crate::canvas;
use crate::export;
use crate::info_panel;
use crate::interaction::{self, Gesture, Tool};
use crate::map_io::LoadedMap;
use crate::state::EditorState;
use crate::theme;
use crate::toolbar;
use crate::ui_controls;

pub struct GridMarkApp {
    state: EditorState,
    theme: theme::AppTheme,
}

impl GridMarkApp {
    pub fn new(cc: &eframe::CreationContext<'_>, map: LoadedMap) -> Self {
        let theme = theme::editor_theme();
        theme::apply_theme(&cc.egui_ctx, &theme);
        Self {
            state: EditorState::new(map),
            theme,
        }
    }

    fn handle_shortcuts(&mut self, ctx: &EguiContext) {
        let cmd = ctx.input(|input| input.modifiers.command || input.modifiers.ctrl);
        let shift = ctx.input(|input| input.modifiers.shift);
        let editing_text = matches!(self.state.gesture, Gesture::EditingText { .. });

        if ctx.input(|input| input.key_pressed(Key::Escape)) {
            interaction::handle_escape(&mut self.state);
        }

        // Plain letters are tool shortcuts, but never while a text field has
        // the keyboard.
        if !cmd && !editing_text && !ctx.wants_keyboard_input() {
            if ctx.input(|input| input.key_pressed(Key::V)) {
                interaction::set_tool(&mut self.state, Tool::Select);
            }
            if ctx.input(|input| input.key_pressed(Key::P)) {
                interaction::set_tool(&mut self.state, Tool::Paint);
            }
            if ctx.input(|input| input.key_pressed(Key::M)) {
                interaction::set_tool(&mut self.state, Tool::Measure);
            }
            if ctx.input(|input| input.key_pressed(Key::L)) {
                interaction::set_tool(&mut self.state, Tool::Line);
            }
            if ctx.input(|input| input.key_pressed(Key::T)) {
                interaction::set_tool(&mut self.state, Tool::Text);
            }

            if ctx
                .input(|input| input.key_pressed(Key::Delete) || input.key_pressed(Key::Backspace))
            {
                interaction::handle_delete(&mut self.state);
            }
        }

        if !cmd {
            return;
        }

        if ctx.input(|input| input.key_pressed(Key::Z)) {
            if shift {
                self.state.redo();
            } else {
                self.state.undo();
            }
        }

        if ctx.input(|input| input.key_pressed(Key::S)) {
            self.save();
        }

        if ctx.input(|input| input.key_pressed(Key::Plus) || input.key_pressed(Key::Equals)) {
            self.state.zoom_in();
        }

        if ctx.input(|input| input.key_pressed(Key::Minus)) {
            self.state.zoom_out();
        }
    }

    fn save(&mut self) {
        match export::save_outputs(
            &self.state.grid,
            &self.state.store,
            &self.state.map_name,
            self.state.pixels_per_cell(),
        ) {
            Ok((raw, annotated)) => {
                self.state.set_status(format!(
                    "Saved {} and {}",
                    raw.display(),
                    annotated.display()
                ));
            }
            Err(err) => {
                error!("save failed: {err:#}");
                self.state.set_status(format!("Save failed: {err:#}"));
            }
        }
    }
}

impl App for GridMarkApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        self.handle_shortcuts(ctx);

        TopBottomPanel::top("toolbar")
            .exact_height(self.theme.layout.toolbar_height)
            .frame(ui_controls::toolbar_frame(&self.theme))
            .show(ctx, |ui| {
                let width_class = self.theme.width_class(ui.available_width());
                toolbar::show_toolbar(ui, &mut self.state, width_class);
            });

        let action_output = TopBottomPanel::bottom("action_bar")
            .exact_height(self.theme.layout.action_bar_height)
            .frame(ui_controls::action_bar_frame(&self.theme))
            .show(ctx, |ui| {
                let width_class = self.theme.width_class(ui.available_width());
                action_bar::show_action_bar(ui, &self.state, width_class)
            })
            .inner;

        egui::SidePanel::right("info_panel")
            .exact_width(self.theme.layout.info_panel_width)
            .resizable(false)
            .frame(
                egui::Frame::none()
                    .fill(self.theme.surfaces.panel_bg)
                    .inner_margin(egui::Margin::symmetric(
                        self.theme.layout.panel_padding_x,
                        self.theme.layout.panel_padding_y,
                    )),
            )
            .show(ctx, |ui| {
                info_panel::show_info_panel(ui, ctx, &mut self.state);
            });

        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.surfaces.app_bg)
                    .inner_margin(egui::Margin::same(self.theme.layout.space_2)),
            )
            .show(ctx, |ui| {
                canvas::show_canvas(ui, ctx, &mut self.state);
            });

        if action_output.undo {
            self.state.undo();
        }
        if action_output.redo {
            self.state.redo();
        }
        if action_output.save {
            self.save();
        }
    }
}
