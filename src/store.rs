use egui::Pos2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::annotation::{
    distance_to_segment, AnnotationId, Dimension, FontSize, LineAnnotation, TextAnnotation,
};
use crate::coords::{CellPoint, CoordinateMapper};

/// Scene-pixel tolerance for picking a dimension by its line.
pub const DIMENSION_HIT_TOLERANCE: f32 = 10.0;

/// Zoom-independent capture of every annotation collection, used as the
/// undo/redo checkpoint and to carry annotations across scene rebuilds. The
/// selected dimension travels as an index into `dimensions`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub dimensions: Vec<Dimension>,
    pub selected_dimension: Option<usize>,
    pub lines: Vec<LineAnnotation>,
    pub texts: Vec<TextAnnotation>,
}

/// Exclusive owner of all live annotations plus selection state. Mutations
/// bump `revision`, which the view layer watches to re-project the scene;
/// while a snapshot restore is in progress those notifications are
/// suppressed so a restore can never feed back into the undo engine.
pub struct AnnotationStore {
    resolution: f32,
    dimensions: Vec<Dimension>,
    lines: Vec<LineAnnotation>,
    texts: Vec<TextAnnotation>,
    selected_dimension: Option<AnnotationId>,
    next_id: AnnotationId,
    revision: u64,
    restoring: bool,
}

impl AnnotationStore {
    pub fn new(resolution: f32) -> Self {
        Self {
            resolution,
            dimensions: Vec::new(),
            lines: Vec::new(),
            texts: Vec::new(),
            selected_dimension: None,
            next_id: 1,
            revision: 0,
            restoring: false,
        }
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn lines(&self) -> &[LineAnnotation] {
        &self.lines
    }

    pub fn texts(&self) -> &[TextAnnotation] {
        &self.texts
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Monotonic change counter; the scene rebuilds when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        if !self.restoring {
            self.revision += 1;
        }
    }

    fn alloc_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn add_dimension(&mut self, start: CellPoint, end: CellPoint) -> AnnotationId {
        let id = self.alloc_id();
        let distance_m = start.distance(end) * self.resolution;
        self.dimensions.push(Dimension {
            id,
            start,
            end,
            distance_m,
        });
        debug!(id, distance_m, "dimension added");
        self.touch();
        id
    }

    pub fn add_line(&mut self, start: CellPoint, end: CellPoint, thickness: u32) -> AnnotationId {
        let id = self.alloc_id();
        self.lines.push(LineAnnotation {
            id,
            start,
            end,
            thickness: thickness.max(1),
        });
        debug!(id, thickness, "line added");
        self.touch();
        id
    }

    pub fn add_text(
        &mut self,
        pos: CellPoint,
        content: String,
        pixels_per_cell: f32,
    ) -> AnnotationId {
        let id = self.alloc_id();
        let z = self.texts.iter().map(|t| t.z + 1).max().unwrap_or(0);
        self.texts.push(TextAnnotation {
            id,
            pos,
            content,
            size: FontSize::for_zoom(pixels_per_cell),
            bold: false,
            color: [255, 255, 255, 255],
            rotation_deg: 0.0,
            z,
            selected: false,
        });
        debug!(id, "text added");
        self.touch();
        id
    }

    pub fn find_dimension(&self, id: AnnotationId) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    pub fn find_text(&self, id: AnnotationId) -> Option<&TextAnnotation> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn find_text_mut(&mut self, id: AnnotationId) -> Option<&mut TextAnnotation> {
        self.touch();
        self.texts.iter_mut().find(|t| t.id == id)
    }

    pub fn selected_dimension(&self) -> Option<AnnotationId> {
        self.selected_dimension
    }

    /// At most one dimension carries the highlight at a time.
    pub fn select_dimension(&mut self, id: AnnotationId) {
        if self.dimensions.iter().any(|d| d.id == id) {
            self.selected_dimension = Some(id);
            self.touch();
        }
    }

    pub fn deselect_dimension(&mut self) {
        if self.selected_dimension.take().is_some() {
            self.touch();
        }
    }

    pub fn delete_dimension(&mut self, id: AnnotationId) -> bool {
        let before = self.dimensions.len();
        self.dimensions.retain(|d| d.id != id);
        if self.selected_dimension == Some(id) {
            self.selected_dimension = None;
        }
        let removed = self.dimensions.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn delete_text(&mut self, id: AnnotationId) -> bool {
        let before = self.texts.len();
        self.texts.retain(|t| t.id != id);
        let removed = self.texts.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Removes the selected dimension if one exists, otherwise any selected
    /// text annotations. Returns whether anything was deleted.
    pub fn delete_selected(&mut self) -> bool {
        if let Some(id) = self.selected_dimension {
            return self.delete_dimension(id);
        }
        let before = self.texts.len();
        self.texts.retain(|t| !t.selected);
        let removed = self.texts.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn clear_dimensions(&mut self) {
        if self.dimensions.is_empty() && self.selected_dimension.is_none() {
            return;
        }
        self.dimensions.clear();
        self.selected_dimension = None;
        debug!("all dimensions cleared");
        self.touch();
    }

    /// Picks the dimension under a scene position. Per dimension the tests
    /// run in order: label background box, label text box, then perpendicular
    /// distance to the measured segment.
    pub fn hit_test_dimension(
        &self,
        scene: Pos2,
        mapper: &CoordinateMapper,
        tolerance: f32,
    ) -> Option<AnnotationId> {
        for dim in &self.dimensions {
            let (text_rect, bg_rect) = dim.label_rects(mapper);
            if bg_rect.contains(scene) || text_rect.contains(scene) {
                return Some(dim.id);
            }
            let (a, b) = dim.endpoints_scene(mapper);
            if distance_to_segment(scene, a, b) < tolerance {
                return Some(dim.id);
            }
        }
        None
    }

    /// Picks the topmost text annotation under a scene position.
    pub fn hit_test_text(
        &self,
        scene: Pos2,
        mapper: &CoordinateMapper,
        tolerance: f32,
    ) -> Option<AnnotationId> {
        self.texts
            .iter()
            .filter(|t| t.contains(scene, mapper, tolerance))
            .max_by_key(|t| t.z)
            .map(|t| t.id)
    }

    pub fn select_only_text(&mut self, id: AnnotationId) {
        for text in &mut self.texts {
            text.selected = text.id == id;
        }
        self.touch();
    }

    pub fn clear_text_selection(&mut self) {
        let any = self.texts.iter().any(|t| t.selected);
        if any {
            for text in &mut self.texts {
                text.selected = false;
            }
            self.touch();
        }
    }

    /// The text annotation the selection overlay attaches to: the first
    /// selected one, if any.
    pub fn selected_text(&self) -> Option<&TextAnnotation> {
        self.texts.iter().find(|t| t.selected)
    }

    pub fn capture_snapshot(&self) -> Snapshot {
        let selected_dimension = self
            .selected_dimension
            .and_then(|id| self.dimensions.iter().position(|d| d.id == id));
        Snapshot {
            dimensions: self.dimensions.clone(),
            selected_dimension,
            lines: self.lines.clone(),
            texts: self.texts.clone(),
        }
    }

    /// Destroys all live annotations and recreates them from the snapshot's
    /// cell-fraction data, re-selecting the previously selected dimension by
    /// index. An item that fails validation is skipped; the rest of the
    /// restore proceeds.
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) {
        self.restoring = true;

        self.dimensions.clear();
        self.lines.clear();
        self.texts.clear();
        self.selected_dimension = None;

        for dim in &snapshot.dimensions {
            if !dim.start.is_finite() || !dim.end.is_finite() || !dim.distance_m.is_finite() {
                warn!(id = dim.id, "skipping corrupt dimension in restore");
                continue;
            }
            self.dimensions.push(dim.clone());
        }
        for line in &snapshot.lines {
            if !line.start.is_finite() || !line.end.is_finite() {
                warn!(id = line.id, "skipping corrupt line in restore");
                continue;
            }
            self.lines.push(line.clone());
        }
        for text in &snapshot.texts {
            if !text.pos.is_finite() {
                warn!(id = text.id, "skipping corrupt text in restore");
                continue;
            }
            self.texts.push(text.clone());
        }

        if let Some(index) = snapshot.selected_dimension {
            self.selected_dimension = self.dimensions.get(index).map(|d| d.id);
        }

        self.restoring = false;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::{AnnotationStore, DIMENSION_HIT_TOLERANCE};
    use crate::coords::{CellPoint, CoordinateMapper};
    use egui::Pos2;

    fn store() -> AnnotationStore {
        AnnotationStore::new(0.05)
    }

    #[test]
    fn dimension_distance_uses_resolution() {
        let mut store = store();
        let id = store.add_dimension(CellPoint::new(0.0, 0.0), CellPoint::new(3.0, 4.0));
        let dim = store.find_dimension(id).expect("dimension exists");
        assert!((dim.distance_m - 0.25).abs() < 1e-6);
    }

    #[test]
    fn zero_length_dimension_has_zero_distance() {
        let mut store = store();
        let p = CellPoint::new(2.0, 2.0);
        let id = store.add_dimension(p, p);
        assert_eq!(store.find_dimension(id).unwrap().distance_m, 0.0);
    }

    #[test]
    fn snapshot_round_trip_preserves_logical_data() {
        let mut store = store();
        let dim_id = store.add_dimension(CellPoint::new(1.0, 1.0), CellPoint::new(4.0, 5.0));
        store.add_line(CellPoint::new(0.0, 0.0), CellPoint::new(2.0, 0.0), 3);
        store.add_text(CellPoint::new(5.0, 5.0), "dock".to_string(), 12.0);
        store.select_dimension(dim_id);

        let snapshot = store.capture_snapshot();
        store.restore_snapshot(&snapshot);

        assert_eq!(store.capture_snapshot(), snapshot);
        assert_eq!(store.selected_dimension(), Some(dim_id));
    }

    #[test]
    fn restore_skips_corrupt_items_but_keeps_the_rest() {
        let mut store = store();
        store.add_dimension(CellPoint::new(0.0, 0.0), CellPoint::new(1.0, 1.0));
        store.add_dimension(CellPoint::new(2.0, 2.0), CellPoint::new(3.0, 3.0));

        let mut snapshot = store.capture_snapshot();
        snapshot.dimensions[0].start.x = f32::NAN;
        store.restore_snapshot(&snapshot);

        assert_eq!(store.dimensions().len(), 1);
        assert_eq!(store.dimensions()[0].id, snapshot.dimensions[1].id);
    }

    #[test]
    fn restore_suppresses_revision_noise() {
        let mut store = store();
        store.add_dimension(CellPoint::new(0.0, 0.0), CellPoint::new(1.0, 0.0));
        store.add_text(CellPoint::new(1.0, 1.0), "a".to_string(), 9.0);
        let snapshot = store.capture_snapshot();

        let before = store.revision();
        store.restore_snapshot(&snapshot);
        // One notification for the whole restore, not one per recreated item.
        assert_eq!(store.revision(), before + 1);
    }

    #[test]
    fn hit_test_finds_midpoint_and_respects_tolerance() {
        let mut store = store();
        let mapper = CoordinateMapper::new(10.0);
        // Scene segment (0,500)..(1000,500): far from the label box, which
        // sits 30 px above the midpoint.
        let id = store.add_dimension(CellPoint::new(0.0, 50.0), CellPoint::new(100.0, 50.0));

        let midpoint = Pos2::new(500.0, 500.0);
        assert_eq!(
            store.hit_test_dimension(midpoint, &mapper, DIMENSION_HIT_TOLERANCE),
            Some(id)
        );

        let off_by_eleven = Pos2::new(200.0, 511.0);
        assert_eq!(
            store.hit_test_dimension(off_by_eleven, &mapper, DIMENSION_HIT_TOLERANCE),
            None
        );
    }

    #[test]
    fn hit_test_prefers_label_boxes() {
        let mut store = store();
        let mapper = CoordinateMapper::new(10.0);
        let id = store.add_dimension(CellPoint::new(0.0, 50.0), CellPoint::new(100.0, 50.0));

        // 30 px above the midpoint, well outside line tolerance but inside
        // the label background box.
        let label_point = Pos2::new(500.0, 470.0);
        assert_eq!(
            store.hit_test_dimension(label_point, &mapper, DIMENSION_HIT_TOLERANCE),
            Some(id)
        );
    }

    #[test]
    fn only_one_dimension_selected_at_a_time() {
        let mut store = store();
        let a = store.add_dimension(CellPoint::new(0.0, 0.0), CellPoint::new(1.0, 0.0));
        let b = store.add_dimension(CellPoint::new(0.0, 1.0), CellPoint::new(1.0, 1.0));

        store.select_dimension(a);
        store.select_dimension(b);
        assert_eq!(store.selected_dimension(), Some(b));

        store.deselect_dimension();
        assert_eq!(store.selected_dimension(), None);
    }

    #[test]
    fn delete_selected_prefers_dimension_over_texts() {
        let mut store = store();
        let dim = store.add_dimension(CellPoint::new(0.0, 0.0), CellPoint::new(1.0, 0.0));
        let text = store.add_text(CellPoint::new(1.0, 1.0), "keep".to_string(), 9.0);
        store.select_only_text(text);
        store.select_dimension(dim);

        assert!(store.delete_selected());
        assert!(store.dimensions().is_empty());
        assert_eq!(store.texts().len(), 1);

        assert!(store.delete_selected());
        assert!(store.texts().is_empty());
    }

    #[test]
    fn default_text_size_tracks_zoom_with_floor() {
        let mut store = store();
        let small = store.add_text(CellPoint::new(0.0, 0.0), "a".to_string(), 12.0);
        let large = store.add_text(CellPoint::new(0.0, 0.0), "b".to_string(), 45.0);
        assert_eq!(store.find_text(small).unwrap().size.points(), 8.0);
        assert_eq!(store.find_text(large).unwrap().size.points(), 15.0);
    }

    #[test]
    fn topmost_text_wins_hit_test() {
        let mut store = store();
        let mapper = CoordinateMapper::new(10.0);
        let below = store.add_text(CellPoint::new(1.0, 1.0), "below".to_string(), 30.0);
        let above = store.add_text(CellPoint::new(1.0, 1.0), "above".to_string(), 30.0);
        assert!(store.find_text(below).unwrap().z < store.find_text(above).unwrap().z);
        assert_eq!(
            store.hit_test_text(Pos2::new(12.0, 12.0), &mapper, 0.0),
            Some(above)
        );
    }
}
