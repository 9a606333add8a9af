/// Isogrid Terminal Demo - Extruded Voxel Grid
///
/// Renders a grid of extruded cells as shaded ASCII, optionally loaded from
/// a scene script given as the first argument.
/// Controls:
///   - WASD / Arrow Keys: Pan
///   - +/- / Mouse Wheel: Zoom about the mouse
///   - E/R: Rotate about the mouse
///   - 0: Reset the view
///   - Q/ESC: Quit

use std::env;
use std::fs;
use std::io;
use crossterm::terminal;
use isogrid_core::{Scene, SceneConfig, TransformEditor};
use isogrid_terminal::{load_fitted_scene, TerminalApp};

/// Grid size of the built-in scene
const DEMO_GRID_SIZE: u32 = 8;
/// Tallest voxel in the built-in scene
const DEMO_MAX_HEIGHT: f64 = 3.0;

fn demo_height(x: u32, y: u32) -> f64 {
    // Stepped terraces rising toward the far corner
    ((x / 2 + y / 3) % 4) as f64
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (width, height) = terminal::size()?;

    let (editor, scene, config) = match env::args().nth(1) {
        Some(path) => {
            println!("Loading scene script: {}", path);
            let source = fs::read_to_string(&path).map_err(|e| {
                io::Error::new(io::ErrorKind::NotFound, format!("Failed to read {}: {}", path, e))
            })?;
            load_fitted_scene(&source, width, height).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Failed to load scene: {}", e))
            })?
        }
        None => {
            let config = SceneConfig::fitted(
                width as u32,
                height as u32,
                DEMO_GRID_SIZE,
                DEMO_MAX_HEIGHT,
            );
            let scene = Scene::from_grid_with(&config.grid(), demo_height)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
            let editor = TransformEditor::with_transform(config.transform)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
            (editor, scene, config)
        }
    };
    log::info!("scene has {} cells", scene.len());

    println!("Starting isogrid renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    // Run the terminal app
    let mut app = TerminalApp::new(scene, editor, config)?;
    app.run()?;

    println!("Thank you for using the Isogrid terminal renderer!");
    Ok(())
}
