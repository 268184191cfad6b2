use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use image::RgbaImage;
use thiserror::Error;

use area_viewer::{
    overlay, CompositorError, DirectoryProvider, LayerRegistry, MapCompositor, SettingsError,
    VariantChange, ViewerSettings, Viewport,
};

/// Render an area map, optionally with its object layers, to PNG
#[derive(Parser)]
#[command(name = "area_viewer", version)]
struct Args {
    /// Game directory holding the resources; files in its override/ subdirectory win
    #[arg(long, value_name = "DIR")]
    game_dir: PathBuf,

    /// Area resource name, e.g. AR0100
    #[arg(long, value_name = "AREA")]
    area: String,

    /// Output PNG
    #[arg(long, value_name = "FILE")]
    out: PathBuf,

    /// Viewer settings JSON (defaults are used when absent)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Use the night variant of the map
    #[arg(long)]
    night: bool,

    /// Draw doors closed
    #[arg(long)]
    doors_closed: bool,

    /// Zoom factor of the exported bitmap
    #[arg(long, value_name = "FACTOR")]
    zoom: Option<f32>,

    /// Only show scheduled objects active at this hour (0-23)
    #[arg(long, value_name = "HOUR", value_parser = clap::value_parser!(u32).range(0..24))]
    hour: Option<u32>,

    /// Write descriptors of visible layer items as JSON
    #[arg(long, value_name = "FILE")]
    items: Option<PathBuf>,

    /// Draw visible layer items onto the exported map
    #[arg(long)]
    draw_layers: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Compositor(#[from] CompositorError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write item descriptors: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn settings_for(args: &Args) -> Result<ViewerSettings, CliError> {
    let mut settings = match &args.settings {
        Some(path) => ViewerSettings::load(path)?,
        None => ViewerSettings::default(),
    };
    settings.night |= args.night;
    settings.doors_closed |= args.doors_closed;
    if let Some(zoom) = args.zoom {
        settings.zoom = zoom;
    }
    if let Some(hour) = args.hour {
        settings.hour = hour;
        settings.schedule_filter = true;
    }
    Ok(settings)
}

fn run(args: &Args) -> Result<(), CliError> {
    let settings = settings_for(args)?;

    let mut map = MapCompositor::load(DirectoryProvider::new(&args.game_dir), &args.area)?;
    if let VariantChange::Switched { wed } = map.select_variant(settings.lighting())? {
        log::info!("Using {}", wed);
    }
    map.set_door_state(settings.door_state());
    map.paint()?;
    let mut image = map.render_scaled(settings.zoom)?;

    let viewport = Viewport::new(map.map_size()).with_zoom(settings.zoom as f64);
    let mut registry = LayerRegistry::new(viewport);
    settings.apply(&mut registry);
    let loaded = registry.load_all(false, map.index());
    let descriptors = registry.descriptors();
    log::info!("{} layer objects, {} visible items", loaded, descriptors.len());

    if args.draw_layers {
        overlay::draw_items(&mut image, &descriptors);
    }
    if let Some(path) = &args.items {
        serde_json::to_writer_pretty(File::create(path)?, &descriptors)?;
        log::info!("Wrote {}", path.display());
    }

    save_png(&image, &args.out)?;
    log::info!("Wrote {} ({}x{})", args.out.display(), image.width(), image.height());
    Ok(())
}

fn save_png(image: &RgbaImage, path: &Path) -> Result<(), CliError> {
    let temp_path = path.with_extension("temp.png");
    image.save(&temp_path)?;

    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;
    options.interlace = None;

    match oxipng::optimize(
        &oxipng::InFile::Path(temp_path.clone()),
        &oxipng::OutFile::Path(Some(path.to_path_buf())),
        &options,
    ) {
        Ok(_) => {
            let _ = fs::remove_file(temp_path);
        }
        Err(e) => {
            fs::rename(&temp_path, path)?;
            log::warn!("oxipng optimisation failed for {}: {}. File saved unoptimised.", path.display(), e);
        }
    }
    Ok(())
}
