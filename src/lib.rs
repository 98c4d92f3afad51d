#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A streaming voxel world core: sparse regions around an observer, generated,
//! meshed and shaped by background workers in nearest-first order.
//!
//! ## Key Modules
//!
//! * `core` - Morton keys, shared resources and main-thread dispatch
//! * `engine_state` - Regions, the region index, generation, scheduling and geometry builders
//! * `error` - Error types for every fallible operation
//!
//! ## Architecture
//!
//! The engine follows a modular architecture with clear separation between:
//! * Voxel data (palette-compressed regions linked to their neighbours)
//! * Spatial bookkeeping (a chunked octree of region states)
//! * Task scheduling and execution
//! * Geometry building, behind traits so any renderer or physics engine can plug in
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() {
//!     voxel_world::run();
//! }
//! ```

use cgmath::Point3;
use log::{info, LevelFilter};
use web_time::{Duration, Instant};

use engine_state::config::EngineConfig;
use engine_state::rendering::{BoxShapeBuilder, CulledMeshBuilder};
use engine_state::EngineState;
use error::ConfigError;

pub mod core;
pub mod engine_state;
pub mod error;

/// Number of frames the headless demo runs for.
pub const DEMO_FRAMES: u32 = 300;

const FRAME_TIME: Duration = Duration::from_millis(16);

/// Runs a headless demo: streams terrain around an observer walking along
/// the X axis and logs progress.
///
/// Logging is configured through `RUST_LOG`; the engine configuration can be
/// given as a JSON file path in `VOXEL_WORLD_CONFIG`.
pub fn run() {
    log_builder("RUST_LOG").init();
    info!("Logger initialized");

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return;
        }
    };

    if let Err(err) = run_demo(config) {
        log::error!("demo failed: {err}");
    }
}

/// Info-level stdout logging, overridable through the `env` variable.
fn log_builder(env: &str) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .target(env_logger::Target::Stdout)
        .filter(None, LevelFilter::Info)
        .parse_env(env);
    builder
}

fn load_config() -> Result<EngineConfig, ConfigError> {
    match std::env::var("VOXEL_WORLD_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(path),
        Err(_) => Ok(EngineConfig::default()),
    }
}

fn run_demo(config: EngineConfig) -> Result<(), error::EngineError> {
    let mut engine = EngineState::with_default_terrain(config)?;
    engine.on_region_unloaded(|pos| log::trace!("unloaded {pos}"));

    engine.spawn_generation_workers()?;
    engine.spawn_mesh_worker(CulledMeshBuilder, |pos, mesh| match mesh {
        Some(mesh) => log::trace!("mesh for {pos}: {} faces", mesh.face_count()),
        None => log::trace!("{pos} has nothing to draw"),
    })?;
    engine.spawn_shape_worker(BoxShapeBuilder, |pos, shape| {
        if let Some(shape) = shape {
            log::trace!("shape for {pos}: {} boxes", shape.boxes.len());
        }
    })?;

    let started = Instant::now();
    for frame in 0..DEMO_FRAMES {
        let x = frame as f32 * 0.5;
        engine.set_observer_position(Point3::new(x, 40.0, 8.0));
        engine.process_tasks()?;

        if frame % 60 == 0 {
            info!(
                "frame {frame}: {} regions loaded, {} workers, {:?} elapsed",
                engine.world().get().len(),
                engine.worker_count(),
                started.elapsed()
            );
        }
        std::thread::sleep(FRAME_TIME);
    }

    engine.shutdown();
    info!("demo finished after {:?}", started.elapsed());
    Ok(())
}
