use egui::{Color32, ColorImage, Context, Pos2, Rect, TextureHandle, TextureOptions};
use tracing::debug;

use crate::annotation::DIMENSION_LABEL_PT;
use crate::coords::CoordinateMapper;
use crate::grid::{CellClass, CellGrid};
use crate::store::AnnotationStore;

/// Above this cell size the raster gets one-pixel separator lines between
/// cells; below it they would only add visual noise.
pub const GRID_LINE_THRESHOLD: f32 = 10.0;

pub const DIMENSION_COLOR: Color32 = Color32::YELLOW;
pub const DIMENSION_SELECTED_COLOR: Color32 = Color32::RED;
pub const LINE_COLOR: Color32 = Color32::from_rgb(0x31, 0x82, 0xCE);
pub const GRID_LINE_COLOR: Color32 = Color32::from_gray(0xC8);
pub const LABEL_BG_COLOR: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 180);

pub(crate) fn class_color(class: CellClass) -> Color32 {
    match class {
        CellClass::Occupied => Color32::BLACK,
        CellClass::Uncertain => Color32::from_gray(0xA0),
        CellClass::Free => Color32::WHITE,
    }
}

/// A projected drawing primitive in scene pixels. The view layer rotates and
/// offsets these into screen space without knowing anything about
/// annotations.
#[derive(Clone, Debug)]
pub enum SceneShape {
    Line {
        a: Pos2,
        b: Pos2,
        width: f32,
        color: Color32,
    },
    Polygon {
        points: Vec<Pos2>,
        color: Color32,
    },
    LabelBox {
        rect: Rect,
        fill: Color32,
        stroke: Color32,
    },
    Label {
        pos: Pos2,
        text: String,
        points: f32,
        color: Color32,
        bold: bool,
        angle_deg: f32,
    },
}

/// The dashed brush circle that follows the pointer.
#[derive(Clone, Copy, Debug)]
pub struct CursorIndicator {
    pub scene_pos: Pos2,
    pub radius: f32,
    pub measure: bool,
}

/// Retained scene model: the rasterized grid plus annotation geometry
/// projected at the current zoom. Rebuilt wholesale on zoom or rotation
/// changes; annotations survive the rebuild because they are carried through
/// the store's zoom-independent snapshot.
pub struct MapScene {
    raster: ColorImage,
    texture: Option<TextureHandle>,
    shapes: Vec<SceneShape>,
    pixels_per_cell: f32,
    show_grid_lines: bool,
    cursor: Option<CursorIndicator>,
    store_revision: u64,
}

impl Default for MapScene {
    fn default() -> Self {
        Self {
            raster: ColorImage::new([1, 1], Color32::BLACK),
            texture: None,
            shapes: Vec::new(),
            pixels_per_cell: 1.0,
            show_grid_lines: false,
            cursor: None,
            store_revision: 0,
        }
    }
}

impl MapScene {
    pub fn pixels_per_cell(&self) -> f32 {
        self.pixels_per_cell
    }

    pub fn show_grid_lines(&self) -> bool {
        self.show_grid_lines
    }

    pub fn shapes(&self) -> &[SceneShape] {
        &self.shapes
    }

    pub fn cursor(&self) -> Option<CursorIndicator> {
        self.cursor
    }

    pub fn scene_size(&self, grid: &CellGrid) -> egui::Vec2 {
        egui::Vec2::new(
            grid.width() as f32 * self.pixels_per_cell,
            grid.height() as f32 * self.pixels_per_cell,
        )
    }

    /// Full reconstruction at a new scale. Order matters: annotation state is
    /// captured first, the raster is redrawn, and only then are annotations
    /// restored and re-projected so they land on top of the cells. A visible
    /// cursor indicator is recreated at the new scale as well.
    pub fn rebuild(
        &mut self,
        grid: &CellGrid,
        store: &mut AnnotationStore,
        pixels_per_cell: f32,
        brush: u32,
    ) {
        let saved = store.capture_snapshot();

        self.shapes.clear();
        self.texture = None;

        let width = grid.width() as usize;
        let height = grid.height() as usize;
        let mut image = ColorImage::new([width, height], Color32::BLACK);
        for y in 0..height {
            for x in 0..width {
                let value = grid.get(x as i32, y as i32).unwrap_or(0);
                image.pixels[y * width + x] = class_color(grid.classify(value));
            }
        }
        self.raster = image;
        self.pixels_per_cell = pixels_per_cell;
        self.show_grid_lines = pixels_per_cell > GRID_LINE_THRESHOLD;

        store.restore_snapshot(&saved);
        let mapper = CoordinateMapper::new(pixels_per_cell);
        self.shapes = project_annotations(store, &mapper);
        self.store_revision = store.revision();

        if let Some(cursor) = self.cursor.as_mut() {
            cursor.radius = brush as f32 * pixels_per_cell * 0.5;
        }

        debug!(
            pixels_per_cell,
            grid_lines = self.show_grid_lines,
            "scene rebuilt"
        );
    }

    /// Re-projects annotation geometry if the store changed since the last
    /// projection. Cheap compared to `rebuild`; called every frame.
    pub fn sync_annotations(&mut self, store: &AnnotationStore) {
        if store.revision() == self.store_revision {
            return;
        }
        let mapper = CoordinateMapper::new(self.pixels_per_cell);
        self.shapes = project_annotations(store, &mapper);
        self.store_revision = store.revision();
    }

    /// Updates a single cell after a paint stroke, both in the retained image
    /// and the uploaded texture.
    pub fn paint_cell(&mut self, grid: &CellGrid, x: i32, y: i32) {
        let Some(value) = grid.get(x, y) else {
            return;
        };
        let color = class_color(grid.classify(value));
        let width = self.raster.size[0];
        self.raster.pixels[y as usize * width + x as usize] = color;
        if let Some(texture) = self.texture.as_mut() {
            texture.set_partial(
                [x as usize, y as usize],
                ColorImage::new([1, 1], color),
                TextureOptions::NEAREST,
            );
        }
    }

    pub fn texture_id(&mut self, ctx: &Context) -> egui::TextureId {
        if self.texture.is_none() {
            self.texture = Some(ctx.load_texture(
                "map_raster",
                self.raster.clone(),
                TextureOptions::NEAREST,
            ));
        }
        self.texture.as_ref().expect("texture just created").id()
    }

    pub fn set_cursor(&mut self, scene_pos: Pos2, brush: u32, measure: bool) {
        self.cursor = Some(CursorIndicator {
            scene_pos,
            radius: brush as f32 * self.pixels_per_cell * 0.5,
            measure,
        });
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }
}

fn project_annotations(store: &AnnotationStore, mapper: &CoordinateMapper) -> Vec<SceneShape> {
    let mut shapes = Vec::new();

    for line in store.lines() {
        shapes.push(SceneShape::Line {
            a: mapper.cell_to_scene(line.start),
            b: mapper.cell_to_scene(line.end),
            width: line.stroke_px(),
            color: LINE_COLOR,
        });
    }

    for dim in store.dimensions() {
        let selected = store.selected_dimension() == Some(dim.id);
        let color = if selected {
            DIMENSION_SELECTED_COLOR
        } else {
            DIMENSION_COLOR
        };
        let stroke = if selected { 4.0 } else { 3.0 };

        let (a, b) = dim.endpoints_scene(mapper);
        shapes.push(SceneShape::Line {
            a,
            b,
            width: stroke,
            color,
        });
        for head in dim.arrow_heads(mapper) {
            shapes.push(SceneShape::Polygon {
                points: head.to_vec(),
                color,
            });
        }

        let (text_rect, bg_rect) = dim.label_rects(mapper);
        shapes.push(SceneShape::LabelBox {
            rect: bg_rect,
            fill: LABEL_BG_COLOR,
            stroke: color,
        });
        shapes.push(SceneShape::Label {
            pos: text_rect.min,
            text: dim.label(),
            points: DIMENSION_LABEL_PT,
            color,
            bold: true,
            angle_deg: 0.0,
        });
    }

    let mut texts: Vec<_> = store.texts().iter().collect();
    texts.sort_by_key(|t| t.z);
    for text in texts {
        shapes.push(SceneShape::Label {
            pos: mapper.cell_to_scene(text.pos),
            text: text.content.clone(),
            points: text.size.points(),
            color: Color32::from_rgba_unmultiplied(
                text.color[0],
                text.color[1],
                text.color[2],
                text.color[3],
            ),
            bold: text.bold,
            angle_deg: text.rotation_deg,
        });
    }

    shapes
}

#[cfg(test)]
mod tests {
    use super::{MapScene, SceneShape};
    use crate::coords::CellPoint;
    use crate::grid::{CellGrid, Thresholds};
    use crate::store::AnnotationStore;
    use egui::Pos2;

    fn grid() -> CellGrid {
        CellGrid::new(8, 8, vec![255; 64], Thresholds::default()).expect("valid grid")
    }

    #[test]
    fn rebuild_toggles_grid_lines_at_threshold() {
        let grid = grid();
        let mut store = AnnotationStore::new(0.05);
        let mut scene = MapScene::default();

        scene.rebuild(&grid, &mut store, 10.0, 1);
        assert!(!scene.show_grid_lines());

        scene.rebuild(&grid, &mut store, 11.0, 1);
        assert!(scene.show_grid_lines());
    }

    #[test]
    fn rebuild_preserves_annotations_across_zoom_change() {
        let grid = grid();
        let mut store = AnnotationStore::new(0.05);
        let mut scene = MapScene::default();
        let id = store.add_dimension(CellPoint::new(0.0, 0.0), CellPoint::new(3.0, 4.0));
        store.select_dimension(id);

        scene.rebuild(&grid, &mut store, 4.0, 1);
        scene.rebuild(&grid, &mut store, 16.0, 1);

        assert_eq!(store.dimensions().len(), 1);
        assert_eq!(store.selected_dimension(), Some(id));
        assert!((store.dimensions()[0].distance_m - 0.25).abs() < 1e-6);

        // The projected endpoint follows the new scale.
        let endpoint = scene.shapes().iter().find_map(|s| match s {
            SceneShape::Line { b, width, .. } if *width >= 3.0 => Some(*b),
            _ => None,
        });
        assert_eq!(endpoint, Some(Pos2::new(48.0, 64.0)));
    }

    #[test]
    fn rebuild_recreates_visible_cursor_at_new_scale() {
        let grid = grid();
        let mut store = AnnotationStore::new(0.05);
        let mut scene = MapScene::default();

        scene.rebuild(&grid, &mut store, 4.0, 3);
        scene.set_cursor(Pos2::new(10.0, 10.0), 3, false);
        scene.rebuild(&grid, &mut store, 8.0, 3);

        let cursor = scene.cursor().expect("cursor survives rebuild");
        assert_eq!(cursor.radius, 12.0);
    }

    #[test]
    fn sync_annotations_tracks_store_revision() {
        let grid = grid();
        let mut store = AnnotationStore::new(0.05);
        let mut scene = MapScene::default();
        scene.rebuild(&grid, &mut store, 4.0, 1);
        let baseline = scene.shapes().len();

        store.add_line(CellPoint::new(0.0, 0.0), CellPoint::new(1.0, 1.0), 2);
        scene.sync_annotations(&store);
        assert_eq!(scene.shapes().len(), baseline + 1);
    }
}
