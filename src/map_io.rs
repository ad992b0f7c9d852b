use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use image::DynamicImage;
use serde::Deserialize;
use tracing::info;

use crate::grid::{CellGrid, Thresholds};

/// Scalars from the YAML sidecar; immutable configuration for the loaded map.
#[derive(Clone, Copy, Debug)]
pub struct MapMeta {
    /// Meters per cell.
    pub resolution: f32,
    pub occupied_thresh: f32,
    pub free_thresh: f32,
    pub origin: (f32, f32),
}

pub struct LoadedMap {
    pub grid: CellGrid,
    pub meta: MapMeta,
    /// Base name used for window title and output files.
    pub name: String,
    pub path: PathBuf,
}

/// ROS map_server sidecar document. `origin` is `[x, y, yaw]`; only the
/// translation is kept.
#[derive(Debug, Deserialize)]
struct SidecarDoc {
    resolution: f32,
    occupied_thresh: f32,
    free_thresh: f32,
    origin: Vec<f32>,
}

/// Loads the raster plus its sidecar. Resolution order for the raster: the
/// name as given, then with `.pgm` appended, then the same two under `maps/`.
pub fn load_map(name: &str) -> Result<LoadedMap> {
    let mut tried = Vec::new();
    let mut opened = None;
    for candidate in raster_candidates(name) {
        match image::open(&candidate) {
            Ok(image) => {
                opened = Some((image, candidate));
                break;
            }
            Err(_) => tried.push(candidate),
        }
    }
    let Some((image, path)) = opened else {
        bail!(
            "cannot open map '{name}'; tried: {}",
            tried
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    let DynamicImage::ImageLuma8(gray) = image else {
        bail!(
            "{} is not an 8-bit grayscale PGM raster",
            path.display()
        );
    };

    let meta = load_sidecar(name, &path)?;
    let grid = CellGrid::new(
        gray.width(),
        gray.height(),
        gray.into_raw(),
        Thresholds {
            occupied: meta.occupied_thresh,
            free: meta.free_thresh,
        },
    )
    .ok_or_else(|| anyhow!("{} has an empty raster", path.display()))?;

    let base = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_string();

    info!(
        map = %base,
        width = grid.width(),
        height = grid.height(),
        resolution = meta.resolution,
        "map loaded"
    );

    Ok(LoadedMap {
        grid,
        meta,
        name: base,
        path,
    })
}

fn raster_candidates(name: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from(name),
        PathBuf::from(format!("{name}.pgm")),
        Path::new("maps").join(name),
        Path::new("maps").join(format!("{name}.pgm")),
    ]
}

/// The sidecar is searched next to the raster that was actually opened,
/// then beside the name as given, then under `maps/`.
fn sidecar_candidates(name: &str, raster_path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![raster_path.with_extension("yaml")];
    candidates.push(PathBuf::from(name).with_extension("yaml"));
    candidates.push(
        Path::new("maps")
            .join(name)
            .with_extension("yaml"),
    );
    candidates.dedup();
    candidates
}

fn load_sidecar(name: &str, raster_path: &Path) -> Result<MapMeta> {
    let mut last_err = None;
    for candidate in sidecar_candidates(name, raster_path) {
        let raw = match std::fs::read_to_string(&candidate) {
            Ok(raw) => raw,
            Err(err) => {
                last_err = Some(anyhow!(err).context(candidate.display().to_string()));
                continue;
            }
        };
        return parse_sidecar(&raw)
            .with_context(|| format!("invalid sidecar {}", candidate.display()));
    }
    Err(last_err
        .unwrap_or_else(|| anyhow!("no sidecar candidates"))
        .context(format!("missing YAML sidecar for map '{name}'")))
}

fn parse_sidecar(raw: &str) -> Result<MapMeta> {
    let doc: SidecarDoc = serde_yaml::from_str(raw).context("cannot parse YAML")?;

    if doc.resolution <= 0.0 {
        bail!("resolution must be positive, got {}", doc.resolution);
    }
    for (key, value) in [
        ("occupied_thresh", doc.occupied_thresh),
        ("free_thresh", doc.free_thresh),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{key} must be within [0, 1], got {value}");
        }
    }
    if doc.origin.len() < 2 {
        bail!("origin must hold at least [x, y]");
    }

    Ok(MapMeta {
        resolution: doc.resolution,
        occupied_thresh: doc.occupied_thresh,
        free_thresh: doc.free_thresh,
        origin: (doc.origin[0], doc.origin[1]),
    })
}
