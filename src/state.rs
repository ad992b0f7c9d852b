use std::path::PathBuf;

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coords::{self, CoordinateMapper};
use crate::grid::CellGrid;
use crate::history::UndoEngine;
use crate::interaction::{Drag, Gesture, PaintColor, Tool};
use crate::map_io::{LoadedMap, MapMeta};
use crate::scene::MapScene;
use crate::store::{AnnotationStore, Snapshot};

pub const MIN_BRUSH: u32 = 1;
pub const MAX_BRUSH: u32 = 15;
pub const MIN_ZOOM: u32 = 1;
pub const MAX_ZOOM: u32 = 16;

/// Zoom presets offered by the toolbar combo, as (label, multiplier).
pub const ZOOM_PRESETS: [(&str, u32); 5] = [
    ("100 %", 1),
    ("200 %", 2),
    ("400 %", 4),
    ("800 %", 8),
    ("1600 %", 16),
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub brush_size: u32,
    pub paint_color: PaintColor,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            brush_size: 1,
            paint_color: PaintColor::Alternate,
        }
    }
}

impl UserSettings {
    fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "gridmark", "gridmark")?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir).ok()?;
        Some(config_dir.join("settings.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Scroll geometry of the canvas, captured each frame for the minimap's
/// viewport rectangle.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewportInfo {
    pub offset: Vec2,
    pub view_size: Vec2,
    pub content_size: Vec2,
}

pub struct EditorState {
    pub grid: CellGrid,
    pub meta: MapMeta,
    pub map_name: String,
    pub map_path: PathBuf,
    pub store: AnnotationStore,
    pub history: UndoEngine<Snapshot>,
    pub scene: MapScene,
    pub tool: Tool,
    pub paint_color: PaintColor,
    pub brush_size: u32,
    pub zoom: u32,
    /// Smallest zoom multiplier that fills the initial view; resolved on the
    /// first frame once the canvas width is known.
    pub min_multiplier: Option<u32>,
    pub rotation_deg: f32,
    pub gesture: Gesture,
    pub drag: Option<Drag>,
    pub hover_scene: Option<Pos2>,
    pub status: String,
    pub settings: UserSettings,
    pub viewport: ViewportInfo,
    needs_rebuild: bool,
}

impl EditorState {
    pub fn new(map: LoadedMap) -> Self {
        let settings = UserSettings::load().unwrap_or_default();
        let store = AnnotationStore::new(map.meta.resolution);
        Self {
            grid: map.grid,
            meta: map.meta,
            map_name: map.name,
            map_path: map.path,
            store,
            history: UndoEngine::new(),
            scene: MapScene::default(),
            tool: Tool::Select,
            paint_color: settings.paint_color,
            brush_size: settings.brush_size.clamp(MIN_BRUSH, MAX_BRUSH),
            zoom: 1,
            min_multiplier: None,
            rotation_deg: 0.0,
            gesture: Gesture::Idle,
            drag: None,
            hover_scene: None,
            status: "Map loaded successfully".to_string(),
            settings,
            viewport: ViewportInfo::default(),
            needs_rebuild: true,
        }
    }

    pub fn pixels_per_cell(&self) -> f32 {
        (self.min_multiplier.unwrap_or(1) * self.zoom) as f32
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.pixels_per_cell())
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Resolves the base zoom multiplier from the first known view width and
    /// schedules the initial scene build.
    pub fn ensure_min_multiplier(&mut self, view_width: f32) {
        if self.min_multiplier.is_none() {
            let multiplier = coords::min_multiplier(view_width, self.grid.width());
            self.min_multiplier = Some(multiplier);
            self.needs_rebuild = true;
            info!(multiplier, "base zoom multiplier resolved");
        }
    }

    /// Runs the scene rebuild if one is due, then re-projects annotations if
    /// the store moved. Called once per frame before drawing.
    pub fn rebuild_scene_if_needed(&mut self) {
        if self.needs_rebuild && self.min_multiplier.is_some() {
            let ppc = self.pixels_per_cell();
            self.scene
                .rebuild(&self.grid, &mut self.store, ppc, self.brush_size);
            self.needs_rebuild = false;
        }
        self.scene.sync_annotations(&self.store);
    }

    pub fn set_zoom(&mut self, zoom: u32) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.needs_rebuild = true;
            self.set_status(format!("Zoom: {} x", self.zoom));
        }
    }

    pub fn zoom_in(&mut self) {
        let next = ZOOM_PRESETS
            .iter()
            .map(|&(_, z)| z)
            .find(|&z| z > self.zoom)
            .unwrap_or(MAX_ZOOM);
        self.set_zoom(next);
    }

    pub fn zoom_out(&mut self) {
        let prev = ZOOM_PRESETS
            .iter()
            .rev()
            .map(|&(_, z)| z)
            .find(|&z| z < self.zoom)
            .unwrap_or(MIN_ZOOM);
        self.set_zoom(prev);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        if (degrees - self.rotation_deg).abs() > f32::EPSILON {
            self.rotation_deg = degrees;
            self.needs_rebuild = true;
            self.set_status(format!("Rotation: {degrees:.0} deg"));
        }
    }

    pub fn reset_rotation(&mut self) {
        self.set_rotation(0.0);
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH, MAX_BRUSH);
        self.settings.brush_size = self.brush_size;
        let _ = self.settings.save();
        self.set_status(format!("Brush size: {}", self.brush_size));
    }

    pub fn set_paint_color(&mut self, color: PaintColor) {
        self.paint_color = color;
        self.settings.paint_color = color;
        let _ = self.settings.save();
        self.set_status(format!("Color mode: {}", color.label()));
    }

    /// Wrap-around undo capture: snapshot, run the mutation, snapshot again,
    /// record only if something changed. Suppressed while a restore is in
    /// progress so restores can never generate new undo entries.
    pub fn undoable(&mut self, label: &'static str, mutate: impl FnOnce(&mut Self)) {
        if self.store.is_restoring() {
            return;
        }
        let before = self.store.capture_snapshot();
        mutate(self);
        let after = self.store.capture_snapshot();
        self.history.push(before, after, label);
    }

    /// Begin/end pair for interactive drags; the whole drag collapses into a
    /// single undo step.
    pub fn begin_drag_snapshot(&mut self, label: &'static str) {
        if self.store.is_restoring() {
            return;
        }
        let before = self.store.capture_snapshot();
        self.history.begin_snapshot(label, before);
    }

    pub fn end_drag_snapshot(&mut self) {
        let after = self.store.capture_snapshot();
        self.history.end_snapshot(after);
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo() {
            self.store.restore_snapshot(&snapshot);
            self.set_status("Undone");
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo() {
            self.store.restore_snapshot(&snapshot);
            self.set_status("Redone");
        }
    }

    /// Paints a brush stamp at the given cell with the active color and
    /// refreshes the affected raster pixels.
    pub fn apply_paint(&mut self, cell_x: i32, cell_y: i32) {
        let Some(value) = self.paint_color.value() else {
            return;
        };
        self.grid
            .paint_area(cell_x, cell_y, self.brush_size, value);
        let radius = (self.brush_size / 2) as i32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.scene.paint_cell(&self.grid, cell_x + dx, cell_y + dy);
            }
        }
    }

    /// Alternate mode: one click cycles the cell's classification.
    pub fn cycle_cell(&mut self, cell_x: i32, cell_y: i32) {
        let Some(value) = self.grid.get(cell_x, cell_y) else {
            return;
        };
        let next = self.grid.cycle_value(value);
        self.grid.set(cell_x, cell_y, next);
        self.scene.paint_cell(&self.grid, cell_x, cell_y);
    }
}

#[cfg(test)]
mod tests {
    use super::EditorState;
    use crate::coords::CellPoint;
    use crate::grid::{CellGrid, Thresholds, FREE_VALUE, OCCUPIED_VALUE, UNCERTAIN_VALUE};
    use crate::interaction::PaintColor;
    use crate::map_io::{LoadedMap, MapMeta};

    fn test_state() -> EditorState {
        let grid = CellGrid::new(20, 20, vec![FREE_VALUE; 400], Thresholds::default())
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
        state.min_multiplier = Some(4);
        state.zoom = 2;
        // Production builds the scene raster every frame before input is
        // handled; mirror that here so paint operations have a sized raster.
        state.rebuild_scene_if_needed();
        state
    }

    #[test]
    fn pixels_per_cell_multiplies_base_and_zoom() {
        let state = test_state();
        assert_eq!(state.pixels_per_cell(), 8.0);
    }

    #[test]
    fn undo_sequence_reverses_to_initial_state() {
        let mut state = test_state();
        for i in 0..4 {
            state.undoable("Add measurement", |s| {
                let y = i as f32;
                s.store
                    .add_dimension(CellPoint::new(0.0, y), CellPoint::new(3.0, y));
            });
        }
        assert_eq!(state.store.dimensions().len(), 4);

        for _ in 0..4 {
            state.undo();
        }
        assert!(state.store.dimensions().is_empty());
        // Bottom of the stack: further undo is a no-op.
        state.undo();
        assert!(state.store.dimensions().is_empty());

        for _ in 0..4 {
            state.redo();
        }
        assert_eq!(state.store.dimensions().len(), 4);
        state.redo();
        assert_eq!(state.store.dimensions().len(), 4);
    }

    #[test]
    fn aborted_undoable_records_nothing() {
        let mut state = test_state();
        state.undoable("Nothing", |_| {});
        assert!(!state.history.can_undo());
    }

    #[test]
    fn drag_snapshot_pair_is_one_undo_step() {
        let mut state = test_state();
        let id = state
            .store
            .add_text(CellPoint::new(1.0, 1.0), "dock".to_string(), 8.0);

        state.begin_drag_snapshot("Move text");
        for step in 1..=5 {
            if let Some(text) = state.store.find_text_mut(id) {
                text.pos = CellPoint::new(1.0 + step as f32, 1.0);
            }
        }
        state.end_drag_snapshot();

        state.undo();
        assert_eq!(
            state.store.find_text(id).expect("text exists").pos,
            CellPoint::new(1.0, 1.0)
        );
    }

    #[test]
    fn paint_is_not_undoable() {
        let mut state = test_state();
        state.paint_color = PaintColor::Occupied;
        state.apply_paint(5, 5);
        assert_eq!(state.grid.get(5, 5), Some(OCCUPIED_VALUE));
        assert!(!state.history.can_undo());
    }

    #[test]
    fn cycle_cell_steps_through_classes() {
        let mut state = test_state();
        state.cycle_cell(2, 2);
        assert_eq!(state.grid.get(2, 2), Some(OCCUPIED_VALUE));
        state.cycle_cell(2, 2);
        assert_eq!(state.grid.get(2, 2), Some(UNCERTAIN_VALUE));
        state.cycle_cell(2, 2);
        assert_eq!(state.grid.get(2, 2), Some(FREE_VALUE));
    }

    #[test]
    fn zoom_steps_walk_the_presets() {
        let mut state = test_state();
        state.set_zoom(4);
        state.zoom_in();
        assert_eq!(state.zoom, 8);
        state.zoom_out();
        state.zoom_out();
        assert_eq!(state.zoom, 2);
    }
}
