use std::sync::{Arc, Mutex};
use std::thread;

use cgmath::Point3;
use web_time::{Duration, Instant};

use voxel_world::engine_state::config::EngineConfig;
use voxel_world::engine_state::rendering::{CulledMeshBuilder, RegionMesh};
use voxel_world::engine_state::task_management::task::TaskStatus;
use voxel_world::engine_state::voxels::block::block_type::BlockType;
use voxel_world::engine_state::voxels::block::Block;
use voxel_world::engine_state::voxels::generation::{
    BlockedOn, GenerationContext, GenerationStep, Generator, GeneratorPipeline,
};
use voxel_world::engine_state::voxels::region::{Neighbor, RegionPos};
use voxel_world::engine_state::voxels::region_index::RegionState;
use voxel_world::engine_state::voxels::tasks::{RebuildScheduler, SchedulerSettings};
use voxel_world::engine_state::voxels::world::World;
use voxel_world::engine_state::EngineState;

/// Solid stone below y = 0 in world cells.
struct Flat;

impl Generator for Flat {
    fn identifier(&self) -> &'static str {
        "flat"
    }

    fn populate(&self, context: &mut GenerationContext<'_>) {
        if context.position().y >= 0 {
            return;
        }
        for z in 0..16 {
            for y in 0..16 {
                for x in 0..16 {
                    context.set_block(x, y, z, Block::new(BlockType::STONE));
                }
            }
        }
    }
}

/// Copies the east-most column of the western neighbour's bottom layer.
struct Seam;

impl Generator for Seam {
    fn identifier(&self) -> &'static str {
        "seam"
    }

    fn dependencies(&self) -> &[&'static str] {
        &["flat"]
    }

    fn neighbor_dependencies(&self) -> &[(Neighbor, &'static str)] {
        &[(Neighbor::WEST, "flat")]
    }

    fn populate(&self, context: &mut GenerationContext<'_>) {
        let west = context
            .neighbor(Neighbor::WEST)
            .map(|storage| storage.get(15))
            .unwrap_or_default();
        context.set_block(0, 0, 0, west);
    }
}

fn flat_pipeline() -> GeneratorPipeline {
    let flat: Arc<dyn Generator> = Arc::new(Flat);
    let seam: Arc<dyn Generator> = Arc::new(Seam);
    GeneratorPipeline::new(vec![flat, seam]).unwrap()
}

fn small_config() -> EngineConfig {
    EngineConfig {
        octree_depth: 3,
        generation_distance: 3,
        render_distance: 1,
        keep_distance: 5,
        generation_workers: 2,
        candidates_per_pass: 4,
        idle_wait_ms: 2,
        seed: Some(11),
    }
}

fn settings(config: &EngineConfig) -> SchedulerSettings {
    SchedulerSettings::from_config(config)
}

fn drain(scheduler: &RebuildScheduler) {
    let mut passes = 0;
    while scheduler.run_pass() == TaskStatus::Progressed {
        passes += 1;
        assert!(passes < 10_000, "scheduler never went idle");
    }
}

#[test]
fn neighbor_dependency_waits_for_the_western_region() {
    let pipeline = flat_pipeline();
    let mut world = World::new();
    let pos = RegionPos::new(0, -1, 0);
    let west = pos.neighbor(Neighbor::WEST);

    assert_eq!(world.advance_generation(&pipeline, pos), Ok(GenerationStep::Applied("flat")));
    assert_eq!(
        world.advance_generation(&pipeline, pos),
        Ok(GenerationStep::Blocked(BlockedOn::MissingNeighbor {
            generator: "seam",
            neighbor: Neighbor::WEST,
        }))
    );

    world.create(west).unwrap();
    assert_eq!(
        world.advance_generation(&pipeline, pos),
        Ok(GenerationStep::Blocked(BlockedOn::NeighborPending {
            generator: "seam",
            neighbor: Neighbor::WEST,
            dependency: "flat",
        }))
    );

    assert_eq!(world.advance_generation(&pipeline, west), Ok(GenerationStep::Applied("flat")));
    assert_eq!(world.advance_generation(&pipeline, pos), Ok(GenerationStep::Applied("seam")));
    assert_eq!(world.advance_generation(&pipeline, pos), Ok(GenerationStep::Complete));

    let region = world.get(pos).unwrap();
    assert!(region.get().is_generated());
    assert_eq!(region.get().applied_generators().count(), 2);
}

#[test]
fn scheduler_pulls_blocking_neighbors_forward() {
    let config = small_config();
    let engine = EngineState::new(config.clone(), flat_pipeline()).unwrap();
    let scheduler = RebuildScheduler::new("generation", engine.context().clone(), settings(&config))
        .with_generation(flat_pipeline());

    // The first region the search hands out needs its western neighbour,
    // which the same pass creates and brings up to date.
    assert_eq!(scheduler.run_pass(), TaskStatus::Progressed);
    let world = engine.world();
    let loaded = world.get();
    let first = loaded
        .positions()
        .find(|&pos| loaded.get(pos).is_some_and(|region| region.get().is_generated()))
        .unwrap();
    let west = loaded.get(first.neighbor(Neighbor::WEST)).unwrap();
    assert!(west.get().has_applied("flat"));
    assert!(!west.get().is_generated());
}

#[test]
fn missing_western_neighbor_is_created_and_generated() {
    let config = small_config();
    let mut engine = EngineState::new(config.clone(), flat_pipeline()).unwrap();
    engine.set_observer_position(Point3::new(8.0, 8.0, 8.0));
    let east = RegionPos::new(1, 0, 0);
    let west = RegionPos::new(-1, 0, 0);
    let origin = engine.world().get_mut().create(RegionPos::ORIGIN).unwrap();
    engine.world().get_mut().create(east).unwrap();

    let ready = Arc::new(Mutex::new(Vec::new()));
    let seen = ready.clone();
    engine.on_region_ready(move |pos| seen.lock().unwrap().push(pos));

    let first = RebuildScheduler::new("generation-0", engine.context().clone(), settings(&config))
        .with_generation(flat_pipeline());
    let second = RebuildScheduler::new("generation-1", engine.context().clone(), settings(&config))
        .with_generation(flat_pipeline());

    // The origin blocks on its western neighbour, which does not exist yet.
    assert_eq!(first.run_pass(), TaskStatus::Progressed);
    {
        let world = engine.world();
        let loaded = world.get();
        let pulled = loaded.get(west).expect("western neighbour was not created");
        assert!(pulled.get().has_applied("flat"));
        assert!(loaded.get(RegionPos::ORIGIN).unwrap().ptr_eq(&origin));
    }
    assert!(origin.get().is_generated());

    drain(&first);
    drain(&second);

    let index = engine.index();
    for pos in [west, RegionPos::ORIGIN, east] {
        assert!(index.get().leaf(pos).unwrap().contains(RegionState::GENERATED), "{pos}");
    }
    assert!(engine.world().get().get(west).unwrap().get().is_generated());

    let ready = ready.lock().unwrap();
    for pos in [RegionPos::ORIGIN, east] {
        assert_eq!(ready.iter().filter(|&&found| found == pos).count(), 1, "{pos}");
    }
}

#[test]
fn moving_away_unloads_and_resets_the_index() {
    let config = small_config();
    let mut engine = EngineState::new(config.clone(), flat_pipeline()).unwrap();
    let unloaded = Arc::new(Mutex::new(Vec::new()));
    let seen = unloaded.clone();
    engine.on_region_unloaded(move |pos| seen.lock().unwrap().push(pos));

    engine.set_observer_position(Point3::new(8.0, 8.0, 8.0));
    let scheduler = RebuildScheduler::new("generation", engine.context().clone(), settings(&config))
        .with_generation(flat_pipeline());
    drain(&scheduler);

    let loaded = engine.world().get().len();
    assert!(loaded > 27);
    assert!(engine.unload_distant().is_empty());

    engine.set_observer_position(Point3::new(16.0 * 40.0, 8.0, 8.0));
    engine.process_tasks().unwrap();

    assert!(engine.world().get().is_empty());
    assert_eq!(unloaded.lock().unwrap().len(), loaded);
    let index = engine.index();
    assert_eq!(index.get().leaf(RegionPos::ORIGIN).unwrap(), RegionState::empty());
    assert_eq!(index.get().super_region_count(), 0);
}

#[test]
fn edits_trigger_a_fresh_mesh() {
    let config = small_config();
    let mut engine = EngineState::new(config.clone(), flat_pipeline()).unwrap();
    engine.set_observer_position(Point3::new(8.0, 8.0, 8.0));

    let meshes: Arc<Mutex<Vec<(RegionPos, Option<RegionMesh>)>>> = Arc::default();
    let sink = meshes.clone();
    let generator = RebuildScheduler::new("generation", engine.context().clone(), settings(&config))
        .with_generation(flat_pipeline());
    let mesher = RebuildScheduler::new("mesh", engine.context().clone(), settings(&config))
        .with_mesh_builder(CulledMeshBuilder, move |pos, mesh| {
            sink.lock().unwrap().push((pos, mesh))
        });

    drain(&generator);
    drain(&mesher);
    engine.process_tasks().unwrap();

    let mesh_at = |pos: RegionPos| {
        meshes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(found, _)| *found == pos)
            .map(|(_, mesh)| mesh.as_ref().map_or(0, RegionMesh::face_count))
    };
    // Air above the ground: nothing to draw. The ground layer only shows its top.
    assert_eq!(mesh_at(RegionPos::ORIGIN), Some(0));
    assert_eq!(mesh_at(RegionPos::new(0, -1, 0)), Some(16 * 16));

    engine
        .set_block(Point3::new(4, 0, 4), Block::new(BlockType::WOOD))
        .unwrap();
    assert_eq!(engine.get_block(Point3::new(4, 0, 4)), Some(Block::new(BlockType::WOOD)));
    drain(&mesher);
    engine.process_tasks().unwrap();

    // The new block shows five faces and hides one ground top.
    assert_eq!(mesh_at(RegionPos::ORIGIN), Some(5));
    assert_eq!(mesh_at(RegionPos::new(0, -1, 0)), Some(16 * 16 - 1));
}

#[test]
fn background_workers_deliver_meshes() {
    let mut engine = EngineState::with_default_terrain(small_config()).unwrap();
    engine.set_observer_position(Point3::new(8.0, 40.0, 8.0));

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    engine.spawn_generation_workers().unwrap();
    engine
        .spawn_mesh_worker(CulledMeshBuilder, move |pos, _mesh| sink.lock().unwrap().push(pos))
        .unwrap();
    assert_eq!(engine.worker_count(), 3);

    let deadline = Instant::now() + Duration::from_secs(60);
    while delivered.lock().unwrap().is_empty() && Instant::now() < deadline {
        engine.process_tasks().unwrap();
        thread::sleep(Duration::from_millis(5));
    }
    engine.shutdown();

    let delivered = delivered.lock().unwrap();
    assert!(!delivered.is_empty(), "no mesh within the deadline");
    let index = engine.index();
    for &pos in delivered.iter() {
        assert!(index.get().leaf(pos).unwrap().contains(RegionState::GENERATED));
    }
    assert_eq!(engine.worker_count(), 0);
}
