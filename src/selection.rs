use egui::{Pos2, Rect};

use crate::annotation::{FontSize, TextAnnotation};
use crate::coords::CoordinateMapper;

/// Drawn size of a corner handle, scene pixels.
pub const HANDLE_SIZE: f32 = 9.0;
/// Hit radius around a handle center.
pub const HANDLE_HIT_RADIUS: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    pub fn of(self, rect: Rect) -> Pos2 {
        match self {
            Corner::TopLeft => rect.left_top(),
            Corner::TopRight => rect.right_top(),
            Corner::BottomLeft => rect.left_bottom(),
            Corner::BottomRight => rect.right_bottom(),
        }
    }
}

pub const CORNERS: [Corner; 4] = [
    Corner::TopLeft,
    Corner::TopRight,
    Corner::BottomLeft,
    Corner::BottomRight,
];

/// Geometry of the selection overlay for one text annotation: the dashed
/// bounding rectangle and its four corner handles.
#[derive(Clone, Copy, Debug)]
pub struct OverlayLayout {
    pub bounds: Rect,
}

impl OverlayLayout {
    pub fn for_text(text: &TextAnnotation, mapper: &CoordinateMapper) -> Self {
        Self {
            bounds: text.bounds(mapper).expand(4.0),
        }
    }

    pub fn handles(&self) -> [(Corner, Pos2); 4] {
        CORNERS.map(|corner| (corner, corner.of(self.bounds)))
    }

    /// The handle under a scene position, if any, paired with the opposite
    /// (fixed) corner that anchors the resize.
    pub fn hit_handle(&self, scene: Pos2) -> Option<(Corner, Pos2)> {
        for (corner, pos) in self.handles() {
            if pos.distance(scene) <= HANDLE_HIT_RADIUS {
                return Some((corner, corner.opposite().of(self.bounds)));
            }
        }
        None
    }
}

/// Scale factor for a corner drag: the ratio of the current diagonal (dragged
/// point to the fixed opposite corner) to the diagonal at drag start. Makes
/// resizing direction-independent.
pub fn drag_scale_factor(fixed: Pos2, start: Pos2, current: Pos2) -> f32 {
    let old_diagonal = fixed.distance(start);
    if old_diagonal <= f32::EPSILON {
        return 1.0;
    }
    fixed.distance(current) / old_diagonal
}

/// Applies a drag scale to the font size captured at drag start. `FontSize`
/// clamps to its 6..400 pt range.
pub fn scaled_font(start: FontSize, factor: f32) -> FontSize {
    start.scaled(factor)
}
