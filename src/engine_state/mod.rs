//! # Engine State Module
//!
//! The core engine module that manages the state and functionality of the voxel engine.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `config` - Streaming distances and worker settings
//! * `rendering` - Snapshots and geometry builders for meshes and collision shapes
//! * `task_management` - Manages background worker threads
//! * `voxels` - Handles voxel data, regions, the region index and world generation
//!
//! ## Architecture
//!
//! The `EngineState` struct is the central coordinator. It owns the shared
//! [`WorldContext`] and the [`TaskManager`] whose workers advance regions in
//! the background. The thread that creates the engine is its main thread:
//! mesh and shape sinks run there when [`EngineState::process_tasks`] is
//! called, and unloading happens there too.
//!
//! ## Frame Loop
//!
//! 1. Move the observer with [`EngineState::set_observer_position`]
//! 2. Apply edits with [`EngineState::set_block`]
//! 3. Call [`EngineState::process_tasks`] to deliver finished geometry and
//!    unload regions that fell out of range

use std::sync::Arc;

use cgmath::Point3;

use crate::core::{MainThreadQueue, MtResource};
use crate::error::{EngineError, TaskError, WorldError};

use config::EngineConfig;
use rendering::{MeshBuilder, ShapeBuilder};
use task_management::TaskManager;
use voxels::block::Block;
use voxels::generation::GeneratorPipeline;
use voxels::region::RegionPos;
use voxels::region_index::{RegionIndex, RegionState};
use voxels::tasks::{RebuildScheduler, SchedulerSettings, WorldContext};
use voxels::world::World;

pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The main state container for the voxel engine
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_world::engine_state::config::EngineConfig;
/// use voxel_world::engine_state::voxels::generation::GeneratorPipeline;
/// use voxel_world::engine_state::EngineState;
///
/// let config = EngineConfig::default();
/// let mut engine = EngineState::new(config, GeneratorPipeline::default_terrain(1).unwrap()).unwrap();
/// engine.set_observer_position(Point3::new(8.0, 40.0, 8.0));
/// engine.process_tasks().unwrap();
/// assert_eq!(engine.worker_count(), 0);
/// ```
pub struct EngineState {
    config: EngineConfig,
    pipeline: GeneratorPipeline,
    context: WorldContext,
    dispatch: Arc<MainThreadQueue>,
    task_manager: TaskManager,
}

impl EngineState {
    /// Creates an engine owned by the calling thread. No workers run until
    /// one of the `spawn_*` methods is called.
    ///
    /// # Errors
    /// [`EngineError::Config`] if the configuration does not validate.
    pub fn new(config: EngineConfig, pipeline: GeneratorPipeline) -> Result<Self, EngineError> {
        config.validate()?;
        let index = RegionIndex::new(config.octree_depth)?;
        let dispatch = Arc::new(MainThreadQueue::new());
        let context = WorldContext::new(index, dispatch.clone());
        let task_manager = TaskManager::new(config.idle_wait());

        Ok(EngineState {
            config,
            pipeline,
            context,
            dispatch,
            task_manager,
        })
    }

    /// Creates an engine generating the built-in terrain with the configured seed.
    pub fn with_default_terrain(config: EngineConfig) -> Result<Self, EngineError> {
        let seed = config.seed_or_random();
        log::info!("terrain seed {seed}");
        Self::new(config, GeneratorPipeline::default_terrain(seed)?)
    }

    fn settings(&self) -> SchedulerSettings {
        SchedulerSettings::from_config(&self.config)
    }

    /// Starts `generation_workers` workers that create and generate regions.
    pub fn spawn_generation_workers(&mut self) -> Result<(), TaskError> {
        for _ in 0..self.config.generation_workers {
            let scheduler = RebuildScheduler::new("generation", self.context.clone(), self.settings())
                .with_generation(self.pipeline.clone());
            self.task_manager.spawn(scheduler)?;
        }
        Ok(())
    }

    /// Starts a worker building meshes; `sink` runs on the main thread.
    pub fn spawn_mesh_worker<B, S>(&mut self, builder: B, sink: S) -> Result<(), TaskError>
    where
        B: MeshBuilder,
        S: Fn(RegionPos, Option<B::Mesh>) + Send + Sync + 'static,
    {
        let scheduler = RebuildScheduler::new("mesh", self.context.clone(), self.settings())
            .with_mesh_builder(builder, sink);
        self.task_manager.spawn(scheduler)
    }

    /// Starts a worker building collision shapes; `sink` runs on the main thread.
    pub fn spawn_shape_worker<B, S>(&mut self, builder: B, sink: S) -> Result<(), TaskError>
    where
        B: ShapeBuilder,
        S: Fn(RegionPos, Option<B::Shape>) + Send + Sync + 'static,
    {
        let scheduler = RebuildScheduler::new("shape", self.context.clone(), self.settings())
            .with_shape_builder(builder, sink);
        self.task_manager.spawn(scheduler)
    }

    pub fn worker_count(&self) -> usize {
        self.task_manager.worker_count()
    }

    pub fn observer_position(&self) -> Point3<f32> {
        *self.context.observer.get()
    }

    /// Moves the observer, in world cells. Workers are woken when it enters
    /// another region.
    pub fn set_observer_position(&mut self, position: Point3<f32>) {
        let previous = std::mem::replace(&mut *self.context.observer.get_mut(), position);
        if RegionPos::containing_point(previous) != RegionPos::containing_point(position) {
            self.task_manager.wake_all();
        }
    }

    /// Requests a mesh and shape rebuild of `pos`.
    pub fn mark_dirty(&self, pos: RegionPos) {
        if self.context.dirty.get_mut().mark_dirty(pos) {
            self.task_manager.wake_all();
        }
    }

    pub fn get_block(&self, cell: Point3<i32>) -> Option<Block> {
        self.context.world.get().get_block(cell)
    }

    /// Edits one cell and marks every region that can see it dirty.
    ///
    /// # Errors
    /// [`WorldError::RegionNotFound`] if the cell's region is not loaded.
    pub fn set_block(&self, cell: Point3<i32>, block: Block) -> Result<(), WorldError> {
        let affected = self.context.world.get_mut().set_block(cell, block)?;
        self.context.dirty.get_mut().mark_many(affected);
        self.task_manager.wake_all();
        Ok(())
    }

    /// See [`RegionEvents::on_ready`](voxels::events::RegionEvents::on_ready).
    pub fn on_region_ready(&self, listener: impl Fn(RegionPos) + Send + Sync + 'static) {
        self.context.events.on_ready(listener);
    }

    pub fn on_region_unloaded(&self, listener: impl Fn(RegionPos) + Send + Sync + 'static) {
        self.context.events.on_unloaded(listener);
    }

    /// Main-thread housekeeping; call once per frame.
    ///
    /// Runs every artifact handed over by the workers, then unloads regions
    /// beyond the keep distance.
    ///
    /// # Returns
    /// The number of main-thread actions that ran.
    ///
    /// # Errors
    /// [`EngineError::Dispatch`] when called off the thread that created the engine.
    pub fn process_tasks(&mut self) -> Result<usize, EngineError> {
        let ran = self.dispatch.process()?;
        let unloaded = self.unload_distant();
        if !unloaded.is_empty() {
            log::debug!("unloaded {} regions", unloaded.len());
        }
        Ok(ran)
    }

    /// Removes loaded regions beyond the keep distance that no worker holds.
    pub fn unload_distant(&self) -> Vec<RegionPos> {
        let center = RegionPos::containing_point(self.observer_position());

        let removed = {
            // Holding the in-flight set keeps workers from claiming a region mid-removal.
            let in_flight = self.context.in_flight.get();
            let removed: Vec<RegionPos> = {
                let mut world = self.context.world.get_mut();
                world
                    .regions_beyond(center, self.config.keep_distance)
                    .into_iter()
                    .filter(|pos| !in_flight.contains(pos))
                    .filter(|&pos| world.try_remove(pos).is_some())
                    .collect()
            };

            if !removed.is_empty() {
                let mut index = self.context.index.get_mut();
                for &pos in &removed {
                    if let Err(err) = index.update(pos, |state| *state = RegionState::empty()) {
                        log::warn!("failed to reset index entry of {pos}: {err}");
                    }
                }
                index.prune_empty();
            }
            drop(in_flight);
            removed
        };

        for &pos in &removed {
            self.context.events.emit_unloaded(pos);
        }
        removed
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &GeneratorPipeline {
        &self.pipeline
    }

    pub fn world(&self) -> MtResource<World> {
        self.context.world.clone()
    }

    pub fn index(&self) -> MtResource<RegionIndex> {
        self.context.index.clone()
    }

    pub fn context(&self) -> &WorldContext {
        &self.context
    }

    /// Stops and joins every worker. Dropping the engine does the same.
    pub fn shutdown(&mut self) {
        self.task_manager.shutdown();
    }
}
