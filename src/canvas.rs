use egui::{
    emath::Rot2, epaint::TextShape, vec2, Color32, Context, FontId, Id, Key, Mesh, Pos2, Rect,
    Response, ScrollArea, Sense, Shape, Stroke, Ui, Vec2,
};

use crate::interaction::{self, Gesture};
use crate::scene::{self, SceneShape};
use crate::selection::{OverlayLayout, HANDLE_SIZE};
use crate::state::{EditorState, ViewportInfo};
use crate::theme;

const SCENE_MARGIN: f32 = 24.0;

const MEASURE_PREVIEW_COLOR: Color32 = Color32::from_rgb(0, 255, 255);

/// Projection from scene pixels to screen, applying the whole-view rotation
/// about the scene center.
#[derive(Clone, Copy)]
struct SceneView {
    origin: Pos2,
    center_scene: Pos2,
    rot: Rot2,
}

impl SceneView {
    fn new(origin: Pos2, scene_size: Vec2, rotation_deg: f32) -> Self {
        Self {
            origin,
            center_scene: Pos2::new(scene_size.x * 0.5, scene_size.y * 0.5),
            rot: Rot2::from_angle(rotation_deg.to_radians()),
        }
    }

    fn to_screen(&self, scene: Pos2) -> Pos2 {
        let rotated = self.rot * (scene - self.center_scene);
        self.origin + self.center_scene.to_vec2() + rotated
    }

    fn from_screen(&self, screen: Pos2) -> Pos2 {
        let local = screen - self.origin - self.center_scene.to_vec2();
        self.center_scene + self.rot.inverse() * local
    }
}

pub fn show_canvas(ui: &mut Ui, ctx: &Context, state: &mut EditorState) {
    let theme = theme::editor_theme();
    let available = ui.available_size();
    state.ensure_min_multiplier((available.x - 2.0 * SCENE_MARGIN).max(64.0));
    state.rebuild_scene_if_needed();

    let scene_size = state.scene.scene_size(&state.grid);
    let canvas_size = vec2(
        (scene_size.x + 2.0 * SCENE_MARGIN).max(available.x),
        (scene_size.y + 2.0 * SCENE_MARGIN).max(available.y),
    );

    let output = ScrollArea::both()
        .id_source("gridmark_canvas_scroll")
        .show(ui, |ui| {
            let (canvas_rect, response) =
                ui.allocate_exact_size(canvas_size, Sense::click_and_drag());

            let origin = Pos2::new(
                canvas_rect.center().x - scene_size.x * 0.5,
                canvas_rect.center().y - scene_size.y * 0.5,
            );
            let view = SceneView::new(origin, scene_size, state.rotation_deg);

            let painter = ui.painter_at(canvas_rect);
            painter.rect_filled(canvas_rect, 0.0, theme.surfaces.canvas_bg);

            draw_raster(ctx, &painter, state, &view, scene_size);
            if state.scene.show_grid_lines() {
                draw_grid_lines(&painter, state, &view);
            }
            draw_shapes(&painter, state, &view);
            draw_gesture_preview(&painter, state, &view);
            draw_selection_overlay(&painter, state, &view);
            draw_cursor_indicator(&painter, state, &view);

            handle_pointer(ctx, state, &response, &view);
            draw_text_editor(ui, state, &view);
        });

    state.viewport = ViewportInfo {
        offset: output.state.offset,
        view_size: output.inner_rect.size(),
        content_size: canvas_size,
    };
}

fn draw_raster(
    ctx: &Context,
    painter: &egui::Painter,
    state: &mut EditorState,
    view: &SceneView,
    scene_size: Vec2,
) {
    let texture = state.scene.texture_id(ctx);
    let rect = Rect::from_min_size(view.origin, scene_size);
    let mut mesh = Mesh::with_texture(texture);
    mesh.add_rect_with_uv(
        rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );
    mesh.rotate(view.rot, rect.center());
    painter.add(Shape::mesh(mesh));
}

fn draw_grid_lines(painter: &egui::Painter, state: &EditorState, view: &SceneView) {
    let ppc = state.scene.pixels_per_cell();
    let width = state.grid.width();
    let height = state.grid.height();
    let stroke = Stroke::new(1.0, scene::GRID_LINE_COLOR);

    for x in 0..=width {
        let sx = x as f32 * ppc;
        painter.line_segment(
            [
                view.to_screen(Pos2::new(sx, 0.0)),
                view.to_screen(Pos2::new(sx, height as f32 * ppc)),
            ],
            stroke,
        );
    }
    for y in 0..=height {
        let sy = y as f32 * ppc;
        painter.line_segment(
            [
                view.to_screen(Pos2::new(0.0, sy)),
                view.to_screen(Pos2::new(width as f32 * ppc, sy)),
            ],
            stroke,
        );
    }
}

fn draw_shapes(painter: &egui::Painter, state: &EditorState, view: &SceneView) {
    let view_angle = view.rot.angle();
    for shape in state.scene.shapes() {
        match shape {
            SceneShape::Line { a, b, width, color } => {
                painter.line_segment(
                    [view.to_screen(*a), view.to_screen(*b)],
                    Stroke::new(*width, *color),
                );
            }
            SceneShape::Polygon { points, color } => {
                let mapped: Vec<Pos2> = points.iter().map(|p| view.to_screen(*p)).collect();
                painter.add(Shape::convex_polygon(mapped, *color, Stroke::NONE));
            }
            SceneShape::LabelBox { rect, fill, stroke } => {
                let corners = [
                    view.to_screen(rect.left_top()),
                    view.to_screen(rect.right_top()),
                    view.to_screen(rect.right_bottom()),
                    view.to_screen(rect.left_bottom()),
                ];
                painter.add(Shape::convex_polygon(
                    corners.to_vec(),
                    *fill,
                    Stroke::NONE,
                ));
                let mut outline = corners.to_vec();
                outline.push(corners[0]);
                painter.add(Shape::line(outline, Stroke::new(1.0, *stroke)));
            }
            SceneShape::Label {
                pos,
                text,
                points,
                color,
                bold,
                angle_deg,
            } => {
                draw_label(
                    painter,
                    view.to_screen(*pos),
                    text,
                    *points,
                    *color,
                    *bold,
                    view_angle + angle_deg.to_radians(),
                );
            }
        }
    }
}

fn draw_label(
    painter: &egui::Painter,
    pos: Pos2,
    text: &str,
    points: f32,
    color: Color32,
    bold: bool,
    angle: f32,
) {
    let galley = painter.layout_no_wrap(text.to_string(), FontId::proportional(points), color);
    let offsets: &[Vec2] = if bold {
        &[Vec2::ZERO, vec2(0.7, 0.0)]
    } else {
        &[Vec2::ZERO]
    };
    for offset in offsets {
        let mut shape = TextShape::new(pos + *offset, galley.clone(), color);
        shape.angle = angle;
        painter.add(Shape::Text(shape));
    }
}

fn draw_gesture_preview(painter: &egui::Painter, state: &EditorState, view: &SceneView) {
    let Some(hover) = state.hover_scene else {
        return;
    };
    let mapper = state.mapper();

    match &state.gesture {
        Gesture::PendingMeasureFrom(start) => {
            let a = mapper.cell_to_scene(*start);
            let points = [view.to_screen(a), view.to_screen(hover)];
            painter.extend(Shape::dashed_line(
                &points,
                Stroke::new(2.0, MEASURE_PREVIEW_COLOR),
                6.0,
                4.0,
            ));

            let distance = start.distance(mapper.scene_to_cell(hover)) * state.store.resolution();
            let mid = Pos2::new((a.x + hover.x) * 0.5, (a.y + hover.y) * 0.5);
            draw_label(
                painter,
                view.to_screen(mid) + vec2(-30.0, -20.0),
                &format!("{distance:.3} m"),
                10.0,
                MEASURE_PREVIEW_COLOR,
                true,
                view.rot.angle(),
            );
        }
        Gesture::PendingLineFrom(start) => {
            let a = mapper.cell_to_scene(*start);
            let points = [view.to_screen(a), view.to_screen(hover)];
            painter.extend(Shape::dashed_line(
                &points,
                Stroke::new(state.brush_size as f32, scene::LINE_COLOR),
                6.0,
                4.0,
            ));
        }
        Gesture::Idle | Gesture::EditingText { .. } => {}
    }
}

fn draw_selection_overlay(painter: &egui::Painter, state: &EditorState, view: &SceneView) {
    let theme = theme::editor_theme();
    let Some(text) = state.store.selected_text() else {
        return;
    };
    let mapper = state.mapper();
    let layout = OverlayLayout::for_text(text, &mapper);

    let corners = [
        layout.bounds.left_top(),
        layout.bounds.right_top(),
        layout.bounds.right_bottom(),
        layout.bounds.left_bottom(),
        layout.bounds.left_top(),
    ];
    let mapped: Vec<Pos2> = corners.iter().map(|p| view.to_screen(*p)).collect();
    painter.extend(Shape::dashed_line(
        &mapped,
        Stroke::new(1.4, theme.surfaces.accent),
        4.0,
        3.0,
    ));

    for (_, corner_pos) in layout.handles() {
        let center = view.to_screen(corner_pos);
        let handle = Rect::from_center_size(center, vec2(HANDLE_SIZE, HANDLE_SIZE));
        painter.rect_filled(handle, 2.0, theme.surfaces.accent);
        painter.rect_stroke(
            handle,
            2.0,
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 200)),
        );
    }
}

fn draw_cursor_indicator(painter: &egui::Painter, state: &EditorState, view: &SceneView) {
    let Some(cursor) = state.scene.cursor() else {
        return;
    };
    // Cyan while measuring, magenta while painting, like the cursor circle
    // the editor has always shown.
    let color = if cursor.measure {
        Color32::from_rgba_unmultiplied(0, 255, 255, 150)
    } else {
        Color32::from_rgba_unmultiplied(255, 0, 255, 150)
    };
    let center = view.to_screen(cursor.scene_pos);
    let radius = cursor.radius.max(2.0);

    let fill = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), 24);
    painter.circle_filled(center, radius, fill);

    let segments = 24;
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32 * std::f32::consts::TAU;
        points.push(Pos2::new(
            center.x + radius * t.cos(),
            center.y + radius * t.sin(),
        ));
    }
    painter.extend(Shape::dashed_line(&points, Stroke::new(2.0, color), 4.0, 3.0));
}

fn handle_pointer(ctx: &Context, state: &mut EditorState, response: &Response, view: &SceneView) {
    // While the in-place editor is open the canvas is inert; the popup owns
    // the keyboard and clicks must not spawn new gestures underneath it.
    if matches!(state.gesture, Gesture::EditingText { .. }) {
        return;
    }

    let pointer = ctx.input(|input| input.pointer.interact_pos());
    let scene_pos = pointer.map(|p| view.from_screen(p));

    if response.hovered() || response.dragged() {
        interaction::handle_pointer_moved(state, scene_pos);
    } else {
        interaction::handle_pointer_moved(state, None);
    }

    let Some(scene_pos) = scene_pos else {
        return;
    };

    if response.double_clicked() {
        interaction::handle_double_click(state, scene_pos);
        return;
    }

    if response.drag_started() {
        interaction::handle_drag_started(state, scene_pos);
    }
    if response.dragged() {
        interaction::handle_drag_moved(state, scene_pos);
    }
    if response.drag_stopped() {
        interaction::handle_drag_stopped(state);
    }

    if response.clicked() {
        interaction::handle_click(state, scene_pos);
    }
}

fn draw_text_editor(ui: &mut Ui, state: &mut EditorState, view: &SceneView) {
    let Gesture::EditingText {
        id,
        buffer,
        created,
    } = state.gesture.clone()
    else {
        return;
    };
    let mut buffer = buffer;
    let mut commit = false;
    let mut cancel = false;

    let theme = theme::editor_theme();
    let mapper = state.mapper();
    let anchor = state
        .store
        .find_text(id)
        .map(|t| view.to_screen(mapper.cell_to_scene(t.pos)))
        .unwrap_or(view.origin);

    egui::Area::new(Id::new("gridmark_text_edit"))
        .order(egui::Order::Foreground)
        .fixed_pos(anchor + vec2(0.0, -44.0))
        .show(ui.ctx(), |ui| {
            egui::Frame::none()
                .fill(theme.surfaces.card_bg)
                .rounding(egui::Rounding::same(theme.controls.card_rounding))
                .stroke(Stroke::new(1.0, theme.surfaces.accent))
                .inner_margin(egui::Margin::symmetric(10.0, 8.0))
                .show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut buffer)
                            .desired_width(220.0)
                            .hint_text("Label text"),
                    );
                    if !response.has_focus() {
                        response.request_focus();
                    }

                    if ui.input(|input| input.key_pressed(Key::Enter)) {
                        commit = true;
                    }
                    if ui.input(|input| input.key_pressed(Key::Escape)) {
                        cancel = true;
                    }
                });
        });

    if cancel {
        interaction::cancel_text_edit(state);
        return;
    }

    // The gesture holds the edit buffer; write it back before committing so
    // the commit path reads what the user typed.
    state.gesture = Gesture::EditingText {
        id,
        buffer,
        created,
    };
    if commit {
        interaction::commit_text_edit(state);
        state.set_status("Text committed");
    }
}
