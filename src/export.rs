use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use anyhow::{anyhow, Context as _, Result};
use image::{DynamicImage, GrayImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::{info, warn};

use crate::annotation::DIMENSION_LABEL_PT;
use crate::coords::CoordinateMapper;
use crate::grid::CellGrid;
use crate::scene;
use crate::store::AnnotationStore;

/// Writes both outputs under `output/`: the raw raster without annotations
/// and the flattened annotated PNG at the current scale. Returns the two
/// paths.
pub fn save_outputs(
    grid: &CellGrid,
    store: &AnnotationStore,
    map_name: &str,
    pixels_per_cell: f32,
) -> Result<(PathBuf, PathBuf)> {
    let out_dir = Path::new("output");
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let raw_path = out_dir.join(format!("{map_name}.pgm"));
    let raster = GrayImage::from_raw(grid.width(), grid.height(), grid.raw().to_vec())
        .ok_or_else(|| anyhow!("raster buffer size mismatch"))?;
    raster
        .save_with_format(&raw_path, ImageFormat::Pnm)
        .with_context(|| format!("cannot save raw map to {}", raw_path.display()))?;

    let annotated_path = out_dir.join(format!("{map_name}_annotated.png"));
    let annotated = render_annotated(grid, store, pixels_per_cell)?;
    annotated
        .save_with_format(&annotated_path, ImageFormat::Png)
        .with_context(|| format!("cannot save annotated map to {}", annotated_path.display()))?;

    info!(
        raw = %raw_path.display(),
        annotated = %annotated_path.display(),
        "map exported"
    );
    Ok((raw_path, annotated_path))
}

/// Flattens the scene (cells, grid lines, annotations) into an RGBA image of
/// `width x pixels_per_cell` by `height x pixels_per_cell`.
pub fn render_annotated(
    grid: &CellGrid,
    store: &AnnotationStore,
    pixels_per_cell: f32,
) -> Result<DynamicImage> {
    let px_width = (grid.width() as f32 * pixels_per_cell).round().max(1.0) as u32;
    let px_height = (grid.height() as f32 * pixels_per_cell).round().max(1.0) as u32;
    let mut pixmap =
        Pixmap::new(px_width, px_height).ok_or_else(|| anyhow!("cannot allocate pixmap"))?;

    draw_cells(grid, &mut pixmap, pixels_per_cell);
    if pixels_per_cell > scene::GRID_LINE_THRESHOLD {
        draw_grid_lines(grid, &mut pixmap, pixels_per_cell)?;
    }

    let mapper = CoordinateMapper::new(pixels_per_cell);
    draw_lines(store, &mut pixmap, &mapper)?;
    draw_dimensions(store, &mut pixmap, &mapper)?;

    let mut output = RgbaImage::from_raw(px_width, px_height, pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("cannot construct output image"))?;
    draw_text_pass(store, &mut output, &mapper);

    Ok(DynamicImage::ImageRgba8(output))
}

fn draw_cells(grid: &CellGrid, pixmap: &mut Pixmap, pixels_per_cell: f32) {
    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let data = pixmap.data_mut();
    for py in 0..height {
        let cy = (py as f32 / pixels_per_cell) as i32;
        for px in 0..width {
            let cx = (px as f32 / pixels_per_cell) as i32;
            let value = grid.get(cx, cy).unwrap_or(0);
            let color = scene::class_color(grid.classify(value));
            let offset = (py * width + px) * 4;
            data[offset] = color.r();
            data[offset + 1] = color.g();
            data[offset + 2] = color.b();
            data[offset + 3] = 255;
        }
    }
}

fn draw_grid_lines(grid: &CellGrid, pixmap: &mut Pixmap, pixels_per_cell: f32) -> Result<()> {
    let mut paint = Paint::default();
    let c = scene::GRID_LINE_COLOR;
    paint.set_color_rgba8(c.r(), c.g(), c.b(), 255);

    let stroke = Stroke {
        width: 1.0,
        ..Default::default()
    };

    let px_width = grid.width() as f32 * pixels_per_cell;
    let px_height = grid.height() as f32 * pixels_per_cell;

    let mut pb = PathBuilder::new();
    for x in 0..=grid.width() {
        let sx = x as f32 * pixels_per_cell;
        pb.move_to(sx, 0.0);
        pb.line_to(sx, px_height);
    }
    for y in 0..=grid.height() {
        let sy = y as f32 * pixels_per_cell;
        pb.move_to(0.0, sy);
        pb.line_to(px_width, sy);
    }
    let path = pb
        .finish()
        .ok_or_else(|| anyhow!("cannot build grid line path"))?;
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    Ok(())
}

fn draw_lines(store: &AnnotationStore, pixmap: &mut Pixmap, mapper: &CoordinateMapper) -> Result<()> {
    let mut paint = Paint::default();
    let c = scene::LINE_COLOR;
    paint.set_color_rgba8(c.r(), c.g(), c.b(), 255);
    paint.anti_alias = true;

    for line in store.lines() {
        let a = mapper.cell_to_scene(line.start);
        let b = mapper.cell_to_scene(line.end);
        let mut pb = PathBuilder::new();
        pb.move_to(a.x, a.y);
        pb.line_to(b.x, b.y);
        let path = pb.finish().ok_or_else(|| anyhow!("cannot build line"))?;
        let stroke = Stroke {
            width: line.stroke_px(),
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    Ok(())
}

fn draw_dimensions(
    store: &AnnotationStore,
    pixmap: &mut Pixmap,
    mapper: &CoordinateMapper,
) -> Result<()> {
    let mut paint = Paint::default();
    let c = scene::DIMENSION_COLOR;
    paint.set_color_rgba8(c.r(), c.g(), c.b(), 255);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: 3.0,
        ..Default::default()
    };

    for dim in store.dimensions() {
        let (a, b) = dim.endpoints_scene(mapper);
        let mut pb = PathBuilder::new();
        pb.move_to(a.x, a.y);
        pb.line_to(b.x, b.y);
        let path = pb
            .finish()
            .ok_or_else(|| anyhow!("cannot build dimension line"))?;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);

        for head in dim.arrow_heads(mapper) {
            let mut pb = PathBuilder::new();
            pb.move_to(head[0].x, head[0].y);
            pb.line_to(head[1].x, head[1].y);
            pb.line_to(head[2].x, head[2].y);
            pb.close();
            let path = pb
                .finish()
                .ok_or_else(|| anyhow!("cannot build arrow head"))?;
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }

        let (_, bg_rect) = dim.label_rects(mapper);
        if let Some(rect) = tiny_skia::Rect::from_ltrb(
            bg_rect.min.x,
            bg_rect.min.y,
            bg_rect.max.x,
            bg_rect.max.y,
        ) {
            let mut bg_paint = Paint::default();
            bg_paint.set_color_rgba8(0, 0, 0, 180);
            pixmap.fill_rect(rect, &bg_paint, Transform::identity(), None);

            let outline = PathBuilder::from_rect(rect);
            let thin = Stroke {
                width: 1.0,
                ..Default::default()
            };
            pixmap.stroke_path(&outline, &paint, &thin, Transform::identity(), None);
        }
    }
    Ok(())
}

fn draw_text_pass(store: &AnnotationStore, image: &mut RgbaImage, mapper: &CoordinateMapper) {
    let Some(font) = load_system_font() else {
        if !store.texts().is_empty() || !store.dimensions().is_empty() {
            warn!("no usable system font found; exported labels are omitted");
        }
        return;
    };

    let c = scene::DIMENSION_COLOR;
    for dim in store.dimensions() {
        let (text_rect, _) = dim.label_rects(mapper);
        let label = dim.label();
        // Bold label: double-strike with a one-pixel offset.
        for dx in [0, 1] {
            draw_text_mut(
                image,
                Rgba([c.r(), c.g(), c.b(), 255]),
                text_rect.min.x as i32 + dx,
                text_rect.min.y as i32,
                DIMENSION_LABEL_PT,
                &font,
                &label,
            );
        }
    }

    let mut texts: Vec<_> = store.texts().iter().collect();
    texts.sort_by_key(|t| t.z);
    for text in texts {
        let pos = mapper.cell_to_scene(text.pos);
        let strikes: &[i32] = if text.bold { &[0, 1] } else { &[0] };
        for &dx in strikes {
            draw_text_mut(
                image,
                Rgba(text.color),
                pos.x as i32 + dx,
                pos.y as i32,
                text.size.points(),
                &font,
                &text.content,
            );
        }
    }
}

fn load_system_font() -> Option<FontArc> {
    let candidates = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/SFNS.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in candidates {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::render_annotated;
    use crate::coords::CellPoint;
    use crate::grid::{CellGrid, Thresholds, FREE_VALUE, OCCUPIED_VALUE};
    use crate::store::AnnotationStore;

    fn grid() -> CellGrid {
        let mut cells = vec![FREE_VALUE; 400];
        cells[0] = OCCUPIED_VALUE;
        CellGrid::new(20, 20, cells, Thresholds::default()).expect("valid grid")
    }

    #[test]
    fn annotated_render_scales_with_zoom() {
        let grid = grid();
        let mut store = AnnotationStore::new(0.05);
        store.add_dimension(CellPoint::new(1.0, 1.0), CellPoint::new(10.0, 10.0));

        let image = render_annotated(&grid, &store, 4.0).expect("render succeeds");
        assert_eq!(image.width(), 80);
        assert_eq!(image.height(), 80);
    }

    #[test]
    fn cells_flatten_to_their_class_colors() {
        let grid = grid();
        let store = AnnotationStore::new(0.05);
        let image = render_annotated(&grid, &store, 2.0)
            .expect("render succeeds")
            .to_rgba8();

        // Cell (0,0) is occupied -> black; its neighbor is free -> white.
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }
}
