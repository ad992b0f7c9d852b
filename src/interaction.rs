use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::annotation::{AnnotationId, FontSize};
use crate::coords::CellPoint;
use crate::selection::{self, OverlayLayout};
use crate::state::EditorState;
use crate::store::DIMENSION_HIT_TOLERANCE;

/// Scene-pixel tolerance for picking text annotations.
pub const TEXT_HIT_TOLERANCE: f32 = 4.0;
/// Content a freshly placed text label starts with.
pub const TEXT_PLACEHOLDER: &str = "Text";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Select,
    Paint,
    Measure,
    Line,
    Text,
}

impl Tool {
    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Paint => "Paint",
            Tool::Measure => "Measure",
            Tool::Line => "Line",
            Tool::Text => "Text",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaintColor {
    Alternate,
    Occupied,
    Unoccupied,
    Uncertain,
}

impl PaintColor {
    /// Intensity written by the brush, or `None` for the alternate
    /// click-to-cycle mode.
    pub fn value(self) -> Option<u8> {
        match self {
            PaintColor::Alternate => None,
            PaintColor::Occupied => Some(crate::grid::OCCUPIED_VALUE),
            PaintColor::Unoccupied => Some(crate::grid::FREE_VALUE),
            PaintColor::Uncertain => Some(crate::grid::UNCERTAIN_VALUE),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaintColor::Alternate => "Alternate",
            PaintColor::Occupied => "Occupied",
            PaintColor::Unoccupied => "Unoccupied",
            PaintColor::Uncertain => "Uncertain",
        }
    }
}

/// The current click-click gesture. Modeling this as one enum keeps illegal
/// combinations (a pending measurement and a pending line at once, say)
/// unrepresentable.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    Idle,
    PendingMeasureFrom(CellPoint),
    PendingLineFrom(CellPoint),
    EditingText {
        id: AnnotationId,
        buffer: String,
        created: bool,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

/// Transient pointer-drag state, cleared on release.
#[derive(Clone, Debug)]
pub enum Drag {
    Paint,
    MoveText {
        id: AnnotationId,
        grab_offset: Vec2,
    },
    ResizeText {
        id: AnnotationId,
        fixed: Pos2,
        start_pointer: Pos2,
        start_size: FontSize,
    },
}

/// Switches tool mode, cancelling whatever transient gesture the old mode
/// had in flight. Leaving Measure also drops the dimension highlight;
/// leaving Paint leaves painted cells untouched.
pub fn set_tool(state: &mut EditorState, tool: Tool) {
    if state.tool == tool {
        return;
    }
    match state.gesture {
        Gesture::PendingMeasureFrom(_) | Gesture::PendingLineFrom(_) => {
            state.gesture = Gesture::Idle;
        }
        Gesture::EditingText { .. } => cancel_text_edit(state),
        Gesture::Idle => {}
    }
    if state.tool == Tool::Measure {
        state.store.deselect_dimension();
    }
    state.drag = None;
    state.tool = tool;
    info!(tool = tool.label(), "tool mode changed");
    state.set_status(match tool {
        Tool::Select => "Select mode",
        Tool::Paint => "Paint mode",
        Tool::Measure => "Measure mode: click two points",
        Tool::Line => "Line mode: click two points",
        Tool::Text => "Text mode: click to place a label",
    });
}

pub fn handle_click(state: &mut EditorState, scene: Pos2) {
    match state.tool {
        Tool::Select => select_click(state, scene),
        Tool::Paint => paint_click(state, scene),
        Tool::Measure => measure_click(state, scene),
        Tool::Line => line_click(state, scene),
        Tool::Text => text_click(state, scene),
    }
}

fn select_click(state: &mut EditorState, scene: Pos2) {
    let mapper = state.mapper();
    if let Some(id) = state.store.hit_test_text(scene, &mapper, TEXT_HIT_TOLERANCE) {
        state.store.select_only_text(id);
        state.store.deselect_dimension();
    } else if let Some(id) = state
        .store
        .hit_test_dimension(scene, &mapper, DIMENSION_HIT_TOLERANCE)
    {
        state.store.select_dimension(id);
        state.store.clear_text_selection();
    } else {
        state.store.clear_text_selection();
        state.store.deselect_dimension();
    }
}

fn paint_click(state: &mut EditorState, scene: Pos2) {
    let (x, y) = state.mapper().scene_to_cell_index(scene);
    if state.paint_color == PaintColor::Alternate {
        state.cycle_cell(x, y);
    } else {
        state.apply_paint(x, y);
    }
}

fn measure_click(state: &mut EditorState, scene: Pos2) {
    let mapper = state.mapper();

    // A click on an existing dimension selects it instead of measuring.
    if let Some(id) = state
        .store
        .hit_test_dimension(scene, &mapper, DIMENSION_HIT_TOLERANCE)
    {
        state.store.select_dimension(id);
        if let Some(dim) = state.store.find_dimension(id) {
            state.set_status(format!("Selected: {} (Delete to remove)", dim.label()));
        }
        return;
    }

    match state.gesture.clone() {
        Gesture::Idle => {
            state.gesture = Gesture::PendingMeasureFrom(mapper.scene_to_cell(scene));
            state.set_status("Click second point (Esc to cancel)");
        }
        Gesture::PendingMeasureFrom(start) => {
            let end = mapper.scene_to_cell(scene);
            state.undoable("Add measurement", |s| {
                s.store.add_dimension(start, end);
            });
            state.gesture = Gesture::Idle;
            if let Some(dim) = state.store.dimensions().last() {
                state.set_status(format!("Measured: {}", dim.label()));
            }
        }
        Gesture::PendingLineFrom(_) | Gesture::EditingText { .. } => {}
    }
}

fn line_click(state: &mut EditorState, scene: Pos2) {
    let mapper = state.mapper();
    match state.gesture.clone() {
        Gesture::Idle => {
            state.gesture = Gesture::PendingLineFrom(mapper.scene_to_cell(scene));
            state.set_status("Click second point (Esc to cancel)");
        }
        Gesture::PendingLineFrom(start) => {
            let end = mapper.scene_to_cell(scene);
            let thickness = state.brush_size;
            state.undoable("Add line", |s| {
                s.store.add_line(start, end, thickness);
            });
            state.gesture = Gesture::Idle;
            state.set_status("Line added");
        }
        Gesture::PendingMeasureFrom(_) | Gesture::EditingText { .. } => {}
    }
}

fn text_click(state: &mut EditorState, scene: Pos2) {
    let mapper = state.mapper();
    if let Some(id) = state.store.hit_test_text(scene, &mapper, TEXT_HIT_TOLERANCE) {
        state.store.select_only_text(id);
        return;
    }
    begin_text_creation(state, mapper.scene_to_cell(scene));
}

pub fn handle_double_click(state: &mut EditorState, scene: Pos2) {
    if !matches!(state.tool, Tool::Select | Tool::Text) {
        return;
    }
    let mapper = state.mapper();
    if let Some(id) = state.store.hit_test_text(scene, &mapper, TEXT_HIT_TOLERANCE) {
        begin_text_edit(state, id);
    }
}

pub fn handle_drag_started(state: &mut EditorState, scene: Pos2) {
    match state.tool {
        Tool::Paint if state.paint_color != PaintColor::Alternate => {
            let (x, y) = state.mapper().scene_to_cell_index(scene);
            state.apply_paint(x, y);
            state.drag = Some(Drag::Paint);
        }
        Tool::Select => {
            let mapper = state.mapper();

            if let Some(text) = state.store.selected_text() {
                let layout = OverlayLayout::for_text(text, &mapper);
                if let Some((_, fixed)) = layout.hit_handle(scene) {
                    let id = text.id;
                    let start_size = text.size;
                    state.begin_drag_snapshot("Resize text");
                    state.drag = Some(Drag::ResizeText {
                        id,
                        fixed,
                        start_pointer: scene,
                        start_size,
                    });
                    return;
                }
            }

            if let Some(id) = state.store.hit_test_text(scene, &mapper, TEXT_HIT_TOLERANCE) {
                state.store.select_only_text(id);
                if let Some(text) = state.store.find_text(id) {
                    let origin = mapper.cell_to_scene(text.pos);
                    state.begin_drag_snapshot("Move text");
                    state.drag = Some(Drag::MoveText {
                        id,
                        grab_offset: scene - origin,
                    });
                }
            }
        }
        _ => {}
    }
}

pub fn handle_drag_moved(state: &mut EditorState, scene: Pos2) {
    let Some(drag) = state.drag.clone() else {
        return;
    };
    match drag {
        Drag::Paint => {
            let (x, y) = state.mapper().scene_to_cell_index(scene);
            state.apply_paint(x, y);
        }
        Drag::MoveText { id, grab_offset } => {
            let pos = state.mapper().scene_to_cell(scene - grab_offset);
            if let Some(text) = state.store.find_text_mut(id) {
                text.pos = pos;
            }
        }
        Drag::ResizeText {
            id,
            fixed,
            start_pointer,
            start_size,
        } => {
            let factor = selection::drag_scale_factor(fixed, start_pointer, scene);
            if let Some(text) = state.store.find_text_mut(id) {
                text.size = selection::scaled_font(start_size, factor);
            }
        }
    }
}

pub fn handle_drag_stopped(state: &mut EditorState) {
    match state.drag.take() {
        Some(Drag::MoveText { .. }) | Some(Drag::ResizeText { .. }) => {
            state.end_drag_snapshot();
        }
        Some(Drag::Paint) | None => {}
    }
}

/// Tracks the pointer for the cursor brush indicator and gesture previews.
/// `None` means the pointer left the canvas.
pub fn handle_pointer_moved(state: &mut EditorState, scene: Option<Pos2>) {
    state.hover_scene = scene;
    match (scene, state.tool) {
        (Some(pos), Tool::Paint) => state.scene.set_cursor(pos, state.brush_size, false),
        (Some(pos), Tool::Measure) => state.scene.set_cursor(pos, state.brush_size, true),
        _ => state.scene.clear_cursor(),
    }
}

/// Escape: cancel the gesture in flight, else drop selections. Pressing it
/// with nothing pending is a no-op.
pub fn handle_escape(state: &mut EditorState) {
    match state.gesture {
        Gesture::EditingText { .. } => cancel_text_edit(state),
        Gesture::PendingMeasureFrom(_) => {
            state.gesture = Gesture::Idle;
            state.set_status("Measurement cancelled");
        }
        Gesture::PendingLineFrom(_) => {
            state.gesture = Gesture::Idle;
            state.set_status("Line cancelled");
        }
        Gesture::Idle => {
            if state.store.selected_dimension().is_some() {
                state.store.deselect_dimension();
                state.set_status("Dimension deselected");
            } else {
                state.store.clear_text_selection();
            }
        }
    }
}

pub fn handle_delete(state: &mut EditorState) {
    if matches!(state.gesture, Gesture::EditingText { .. }) {
        return;
    }
    let mut removed = false;
    state.undoable("Delete annotation", |s| {
        removed = s.store.delete_selected();
    });
    if removed {
        state.set_status("Annotation deleted");
    }
}

/// Places a text annotation with placeholder content and opens the in-place
/// editor. The begin/end snapshot pair makes creation plus the initial
/// content one undo step.
fn begin_text_creation(state: &mut EditorState, pos: CellPoint) {
    state.begin_drag_snapshot("Add text");
    let ppc = state.pixels_per_cell();
    let id = state.store.add_text(pos, TEXT_PLACEHOLDER.to_string(), ppc);
    state.store.select_only_text(id);
    state.gesture = Gesture::EditingText {
        id,
        buffer: TEXT_PLACEHOLDER.to_string(),
        created: true,
    };
    state.set_status("Enter to commit, Esc to cancel");
}

pub fn begin_text_edit(state: &mut EditorState, id: AnnotationId) {
    let Some(text) = state.store.find_text(id) else {
        return;
    };
    let buffer = text.content.clone();
    state.begin_drag_snapshot("Edit text");
    state.store.select_only_text(id);
    state.gesture = Gesture::EditingText {
        id,
        buffer,
        created: false,
    };
    state.set_status("Enter to commit, Esc to cancel");
}

pub fn commit_text_edit(state: &mut EditorState) {
    let Gesture::EditingText { id, buffer, .. } =
        std::mem::replace(&mut state.gesture, Gesture::Idle)
    else {
        return;
    };

    let content = buffer.trim().to_string();
    if content.is_empty() {
        state.store.delete_text(id);
    } else if let Some(text) = state.store.find_text_mut(id) {
        text.content = content;
    }
    state.end_drag_snapshot();
}

/// Abandons the editor. A never-committed annotation still holds only its
/// placeholder, which counts as empty: it is removed and no undo entry is
/// recorded.
pub fn cancel_text_edit(state: &mut EditorState) {
    let Gesture::EditingText { id, created, .. } =
        std::mem::replace(&mut state.gesture, Gesture::Idle)
    else {
        return;
    };

    if created {
        state.store.delete_text(id);
    }
    state.history.cancel_snapshot();
}

#[cfg(test)]
mod tests {
    use super::{
        cancel_text_edit, commit_text_edit, handle_click, handle_delete, handle_drag_moved,
        handle_drag_started, handle_drag_stopped, handle_escape, set_tool, Gesture, PaintColor,
        Tool, TEXT_PLACEHOLDER,
    };
    use crate::grid::{CellGrid, Thresholds, FREE_VALUE, OCCUPIED_VALUE};
    use crate::map_io::{LoadedMap, MapMeta};
    use crate::state::EditorState;
    use egui::Pos2;

    fn state() -> EditorState {
        let grid = CellGrid::new(50, 50, vec![FREE_VALUE; 2500], Thresholds::default())
            .expect("valid grid");
        let mut state = EditorState::new(LoadedMap {
            grid,
            meta: MapMeta {
                resolution: 0.05,
                occupied_thresh: 0.65,
                free_thresh: 0.196,
                origin: (0.0, 0.0),
            },
            name: "floor".to_string(),
            path: "maps/floor.pgm".into(),
        });
        state.min_multiplier = Some(10);
        // Production builds the scene raster every frame before input is
        // handled; mirror that here so paint operations have a sized raster.
        state.rebuild_scene_if_needed();
        state
    }

    #[test]
    fn measure_is_a_two_click_gesture() {
        let mut state = state();
        set_tool(&mut state, Tool::Measure);

        handle_click(&mut state, Pos2::new(0.0, 0.0));
        assert!(matches!(state.gesture, Gesture::PendingMeasureFrom(_)));

        handle_click(&mut state, Pos2::new(30.0, 40.0));
        assert!(state.gesture.is_idle());
        assert_eq!(state.store.dimensions().len(), 1);
        assert!((state.store.dimensions()[0].distance_m - 0.25).abs() < 1e-6);

        state.undo();
        assert!(state.store.dimensions().is_empty());
    }

    #[test]
    fn switching_tool_away_from_measure_clears_pending() {
        let mut state = state();
        set_tool(&mut state, Tool::Measure);
        handle_click(&mut state, Pos2::new(0.0, 0.0));
        assert!(!state.gesture.is_idle());

        set_tool(&mut state, Tool::Paint);
        assert!(state.gesture.is_idle());

        // Back in measure mode the next click starts fresh instead of
        // completing the abandoned gesture.
        set_tool(&mut state, Tool::Measure);
        handle_click(&mut state, Pos2::new(100.0, 100.0));
        assert!(state.store.dimensions().is_empty());
        assert!(matches!(state.gesture, Gesture::PendingMeasureFrom(_)));
    }

    #[test]
    fn measure_click_on_existing_dimension_selects_it() {
        let mut state = state();
        set_tool(&mut state, Tool::Measure);
        handle_click(&mut state, Pos2::new(0.0, 400.0));
        handle_click(&mut state, Pos2::new(400.0, 400.0));
        let id = state.store.dimensions()[0].id;

        // Click near the line: selects rather than starting a measurement.
        handle_click(&mut state, Pos2::new(200.0, 405.0));
        assert_eq!(state.store.selected_dimension(), Some(id));
        assert!(state.gesture.is_idle());
    }

    #[test]
    fn escape_cancels_pending_and_is_idempotent() {
        let mut state = state();
        set_tool(&mut state, Tool::Measure);
        handle_click(&mut state, Pos2::new(0.0, 0.0));

        handle_escape(&mut state);
        assert!(state.gesture.is_idle());
        handle_escape(&mut state);
        handle_escape(&mut state);
        assert!(state.gesture.is_idle());
    }

    #[test]
    fn line_tool_uses_current_brush_thickness() {
        let mut state = state();
        state.brush_size = 5;
        set_tool(&mut state, Tool::Line);
        handle_click(&mut state, Pos2::new(0.0, 0.0));
        handle_click(&mut state, Pos2::new(100.0, 0.0));

        assert_eq!(state.store.lines().len(), 1);
        assert_eq!(state.store.lines()[0].thickness, 5);
    }

    #[test]
    fn alternate_click_cycles_single_cell() {
        let mut state = state();
        state.paint_color = PaintColor::Alternate;
        state.brush_size = 5;
        set_tool(&mut state, Tool::Paint);

        handle_click(&mut state, Pos2::new(105.0, 105.0));
        assert_eq!(state.grid.get(10, 10), Some(OCCUPIED_VALUE));
        // The brush does not apply in alternate mode.
        assert_eq!(state.grid.get(11, 10), Some(FREE_VALUE));
    }

    #[test]
    fn paint_drag_stamps_along_the_path() {
        let mut state = state();
        state.paint_color = PaintColor::Occupied;
        state.brush_size = 1;
        set_tool(&mut state, Tool::Paint);

        handle_drag_started(&mut state, Pos2::new(5.0, 5.0));
        handle_drag_moved(&mut state, Pos2::new(15.0, 5.0));
        handle_drag_moved(&mut state, Pos2::new(25.0, 5.0));
        handle_drag_stopped(&mut state);

        assert_eq!(state.grid.get(0, 0), Some(OCCUPIED_VALUE));
        assert_eq!(state.grid.get(1, 0), Some(OCCUPIED_VALUE));
        assert_eq!(state.grid.get(2, 0), Some(OCCUPIED_VALUE));
        assert!(!state.history.can_undo());
    }

    #[test]
    fn text_creation_commits_as_one_undo_step() {
        let mut state = state();
        set_tool(&mut state, Tool::Text);
        handle_click(&mut state, Pos2::new(50.0, 50.0));

        let Gesture::EditingText { buffer, .. } = &mut state.gesture else {
            panic!("expected text edit gesture");
        };
        assert_eq!(buffer, TEXT_PLACEHOLDER);
        *buffer = "charging dock".to_string();
        commit_text_edit(&mut state);

        assert_eq!(state.store.texts().len(), 1);
        assert_eq!(state.store.texts()[0].content, "charging dock");

        state.undo();
        assert!(state.store.texts().is_empty());
        state.redo();
        assert_eq!(state.store.texts()[0].content, "charging dock");
    }

    #[test]
    fn cancelling_fresh_text_edit_removes_the_annotation() {
        let mut state = state();
        set_tool(&mut state, Tool::Text);
        handle_click(&mut state, Pos2::new(50.0, 50.0));
        cancel_text_edit(&mut state);

        assert!(state.store.texts().is_empty());
        assert!(!state.history.can_undo());
    }

    #[test]
    fn delete_key_removes_selected_dimension_undoably() {
        let mut state = state();
        set_tool(&mut state, Tool::Measure);
        handle_click(&mut state, Pos2::new(0.0, 100.0));
        handle_click(&mut state, Pos2::new(100.0, 100.0));
        let id = state.store.dimensions()[0].id;
        state.store.select_dimension(id);

        handle_delete(&mut state);
        assert!(state.store.dimensions().is_empty());

        state.undo();
        assert_eq!(state.store.dimensions().len(), 1);
        assert_eq!(state.store.selected_dimension(), Some(id));
    }

    #[test]
    fn move_drag_collapses_into_one_undo_step() {
        let mut state = state();
        let id = state.store.add_text(
            crate::coords::CellPoint::new(2.0, 2.0),
            "lab".to_string(),
            10.0,
        );
        state.store.select_only_text(id);
        set_tool(&mut state, Tool::Select);

        // Grab the body of the label, clear of the corner handles.
        handle_drag_started(&mut state, Pos2::new(30.0, 25.0));
        handle_drag_moved(&mut state, Pos2::new(60.0, 25.0));
        handle_drag_moved(&mut state, Pos2::new(120.0, 65.0));
        handle_drag_stopped(&mut state);

        let moved = state.store.find_text(id).expect("text exists").pos;
        assert!((moved.x - 11.0).abs() < 1e-4);
        assert!((moved.y - 6.0).abs() < 1e-4);

        state.undo();
        let back = state.store.find_text(id).expect("text exists").pos;
        assert!((back.x - 2.0).abs() < 1e-4);
        assert!((back.y - 2.0).abs() < 1e-4);
    }
}
