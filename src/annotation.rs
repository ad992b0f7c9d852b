use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::coords::{CellPoint, CoordinateMapper};

pub type AnnotationId = u64;

/// Arrowhead length for dimension endpoints, in scene pixels.
pub const ARROW_SIZE: f32 = 10.0;
/// Angular spread of the two arrowhead vertices around the line direction,
/// in radians. 2.8 rad gives the narrow head the editor has always drawn.
pub const ARROW_SPREAD: f32 = 2.8;
/// Point size of the dimension label.
pub const DIMENSION_LABEL_PT: f32 = 12.0;
/// Vertical offset of the label above the dimension midpoint, scene pixels.
pub const DIMENSION_LABEL_RISE: f32 = 30.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FontSize(f32);

impl FontSize {
    pub const MIN: f32 = 6.0;
    pub const MAX: f32 = 400.0;

    pub fn from_points(points: f32) -> Self {
        Self(points.clamp(Self::MIN, Self::MAX))
    }

    /// Default size for new text annotations, scaled with the current zoom.
    pub fn for_zoom(pixels_per_cell: f32) -> Self {
        Self::from_points((pixels_per_cell / 3.0).max(8.0))
    }

    pub fn points(self) -> f32 {
        self.0
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::from_points(self.0 * factor)
    }
}

/// A measurement annotation: a labeled line between two cell-fraction
/// endpoints with the computed real-world distance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
    pub id: AnnotationId,
    pub start: CellPoint,
    pub end: CellPoint,
    /// Cached `cell distance x resolution`, meters.
    pub distance_m: f32,
}

impl Dimension {
    pub fn label(&self) -> String {
        format!("{:.3} m", self.distance_m)
    }

    pub fn endpoints_scene(&self, mapper: &CoordinateMapper) -> (Pos2, Pos2) {
        (
            mapper.cell_to_scene(self.start),
            mapper.cell_to_scene(self.end),
        )
    }

    /// The two filled arrowhead triangles, one per endpoint. Each head is the
    /// endpoint plus two vertices swept `ARROW_SPREAD` radians to either side
    /// of the line direction.
    pub fn arrow_heads(&self, mapper: &CoordinateMapper) -> [[Pos2; 3]; 2] {
        let (a, b) = self.endpoints_scene(mapper);
        let angle = (b.y - a.y).atan2(b.x - a.x);

        let wing = |tip: Pos2, sign: f32, offset: f32| {
            Pos2::new(
                tip.x + sign * ARROW_SIZE * (angle + offset).cos(),
                tip.y + sign * ARROW_SIZE * (angle + offset).sin(),
            )
        };

        [
            [a, wing(a, 1.0, ARROW_SPREAD), wing(a, 1.0, -ARROW_SPREAD)],
            [b, wing(b, -1.0, ARROW_SPREAD), wing(b, -1.0, -ARROW_SPREAD)],
        ]
    }

    /// Label text box and its padded background box, both in scene pixels,
    /// centered above the dimension midpoint.
    pub fn label_rects(&self, mapper: &CoordinateMapper) -> (Rect, Rect) {
        let (a, b) = self.endpoints_scene(mapper);
        let mid = Pos2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5);
        let size = estimate_text_size(&self.label(), DIMENSION_LABEL_PT);
        let text = Rect::from_min_size(
            Pos2::new(mid.x - size.x * 0.5, mid.y - DIMENSION_LABEL_RISE),
            size,
        );
        (text, text.expand(2.0))
    }
}

/// A freehand straight line between two cell-fraction endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineAnnotation {
    pub id: AnnotationId,
    pub start: CellPoint,
    pub end: CellPoint,
    pub thickness: u32,
}

impl LineAnnotation {
    pub fn stroke_px(&self) -> f32 {
        self.thickness.max(1) as f32
    }
}

/// A movable, resizable text label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TextAnnotation {
    pub id: AnnotationId,
    pub pos: CellPoint,
    pub content: String,
    pub size: FontSize,
    pub bold: bool,
    pub color: [u8; 4],
    pub rotation_deg: f32,
    pub z: u32,
    pub selected: bool,
}

impl TextAnnotation {
    /// Conservative bounds estimate for hit-testing and the selection
    /// overlay, in scene pixels. Rotation is ignored here on purpose; the
    /// estimate is loose enough either way.
    pub fn bounds(&self, mapper: &CoordinateMapper) -> Rect {
        let origin = mapper.cell_to_scene(self.pos);
        Rect::from_min_size(origin, estimate_text_size(&self.content, self.size.points()))
    }

    pub fn contains(&self, scene: Pos2, mapper: &CoordinateMapper, tolerance: f32) -> bool {
        self.bounds(mapper).expand(tolerance).contains(scene)
    }
}

pub fn estimate_text_size(content: &str, points: f32) -> Vec2 {
    let width = (content.chars().count().max(1) as f32 * points * 0.6).max(20.0);
    Vec2::new(width, points * 1.4)
}

/// Perpendicular distance from `point` to the segment `a..b`, with the
/// parameter clamped to the segment. Degenerate segments fall back to plain
/// point-to-point distance.
pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = point - a;
    let ab_len_sq = ab.length_sq();
    if ab_len_sq <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    let projection = a + ab * t;
    (point - projection).length()
}

#[cfg(test)]
mod tests {
    use super::{distance_to_segment, Dimension, FontSize, TextAnnotation};
    use crate::coords::{CellPoint, CoordinateMapper};
    use egui::Pos2;

    fn dimension(start: (f32, f32), end: (f32, f32)) -> Dimension {
        let start = CellPoint::new(start.0, start.1);
        let end = CellPoint::new(end.0, end.1);
        Dimension {
            id: 1,
            start,
            end,
            distance_m: start.distance(end) * 0.05,
        }
    }

    #[test]
    fn label_formats_three_decimals() {
        let dim = dimension((0.0, 0.0), (3.0, 4.0));
        assert_eq!(dim.label(), "0.250 m");
    }

    #[test]
    fn arrow_heads_sit_on_the_endpoints() {
        let mapper = CoordinateMapper::new(10.0);
        let dim = dimension((0.0, 0.0), (10.0, 0.0));
        let [head_a, head_b] = dim.arrow_heads(&mapper);

        assert_eq!(head_a[0], Pos2::new(0.0, 0.0));
        assert_eq!(head_b[0], Pos2::new(100.0, 0.0));

        // Wings of the start head point backwards along the line, spread
        // symmetrically about it.
        assert!(head_a[1].x < 0.0 && head_a[2].x < 0.0);
        assert!((head_a[1].y + head_a[2].y).abs() < 1e-4);
    }

    #[test]
    fn label_background_pads_text_box() {
        let mapper = CoordinateMapper::new(10.0);
        let dim = dimension((0.0, 0.0), (4.0, 0.0));
        let (text, bg) = dim.label_rects(&mapper);
        assert!((bg.width() - text.width() - 4.0).abs() < 1e-4);
        assert!(bg.contains_rect(text));
    }

    #[test]
    fn segment_distance_handles_degenerate_segment() {
        let p = Pos2::new(3.0, 4.0);
        let a = Pos2::new(0.0, 0.0);
        assert_eq!(distance_to_segment(p, a, a), 5.0);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(14.0, 3.0), a, b), 5.0);
    }

    #[test]
    fn font_size_clamps_to_valid_range() {
        assert_eq!(FontSize::from_points(2.0).points(), FontSize::MIN);
        assert_eq!(FontSize::from_points(1000.0).points(), FontSize::MAX);
        assert_eq!(FontSize::for_zoom(12.0).points(), 8.0);
        assert_eq!(FontSize::for_zoom(60.0).points(), 20.0);
    }

    #[test]
    fn text_hit_test_expands_by_tolerance() {
        let mapper = CoordinateMapper::new(10.0);
        let text = TextAnnotation {
            id: 1,
            pos: CellPoint::new(1.0, 1.0),
            content: "door".to_string(),
            size: FontSize::from_points(10.0),
            bold: false,
            color: [255, 255, 255, 255],
            rotation_deg: 0.0,
            z: 0,
            selected: false,
        };
        assert!(text.contains(Pos2::new(12.0, 12.0), &mapper, 0.0));
        assert!(!text.contains(Pos2::new(120.0, 12.0), &mapper, 0.0));
        assert!(text.contains(Pos2::new(8.0, 12.0), &mapper, 4.0));
    }
}
