mod action_bar;
mod annotation;
mod app;
mod canvas;
mod coords;
mod export;
mod grid;
mod history;
mod info_panel;
mod interaction;
mod map_io;
mod scene;
mod selection;
mod state;
mod store;
mod theme;
mod toolbar;
mod ui_controls;

use anyhow::{anyhow, Context as _, Result};
use eframe::egui;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridmark=info")),
        )
        .init();

    let map_name = std::env::args().nth(1).context(
        "usage: gridmark <map-name>  (.pgm extension optional; the maps/ directory is searched too)",
    )?;
    let map = map_io::load_map(&map_name)?;

    let viewport = egui::ViewportBuilder::default()
        .with_title(format!("GridMark - {}", map.name))
        .with_inner_size([1180.0, 800.0])
        .with_min_inner_size([640.0, 480.0]);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "gridmark",
        options,
        Box::new(move |cc| Box::new(app::GridMarkApp::new(cc, map))),
    )
    .map_err(|err| anyhow!("cannot start the editor UI: {err}"))
}
