//! Nearest-first background scheduler for generation, meshing and shaping.
//!
//! A [`RebuildScheduler`] is a [`Task`]: every pass it
//! 1. folds pending dirty marks into the index,
//! 2. searches the index for the nearest regions that still need work,
//! 3. claims the first candidate no other worker holds and advances it.
//!
//! Generation runs the pipeline on the claimed region until it completes or
//! blocks; a block on a neighbour pulls that neighbour forward as far as it
//! can go. Mesh and shape stages only run once a region and all 26 of its
//! neighbours are generated, and hand their output to the main thread.

use std::iter;
use std::sync::Arc;

use cgmath::Point3;
use web_time::Instant;

use crate::core::{MainThreadDispatch, MtResource};
use crate::engine_state::config::EngineConfig;
use crate::engine_state::rendering::{MeshBuilder, RegionSnapshot, ShapeBuilder};
use crate::engine_state::task_management::task::{Task, TaskStatus};
use crate::engine_state::voxels::generation::{GenerationStep, GeneratorPipeline};
use crate::engine_state::voxels::region::{Neighbor, Region, RegionPos, REGION_DIMENSION};
use crate::engine_state::voxels::region_index::{distance_weight, FoundRegion, RegionIndex, RegionState};
use crate::error::SchedulerError;

use super::{is_ready, WorldContext};

/// Distances and batch size used by a scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub generation_distance: u32,
    pub render_distance: u32,
    pub candidates_per_pass: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        SchedulerSettings {
            generation_distance: config.generation_distance,
            render_distance: config.render_distance,
            candidates_per_pass: config.candidates_per_pass,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Squared search radius, in cells, for a distance in regions.
fn distance_limit(distance: u32) -> f32 {
    let cells = distance as f32 * REGION_DIMENSION as f32;
    cells * cells
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Concern {
    Mesh,
    Shape,
}

impl Concern {
    fn bit(self) -> RegionState {
        match self {
            Concern::Mesh => RegionState::MESH_UPDATED,
            Concern::Shape => RegionState::SHAPE_UPDATED,
        }
    }

    fn mark_region(self, region: &mut Region, built: bool) {
        match self {
            Concern::Mesh => region.set_mesh_built(built),
            Concern::Shape => region.set_shape_built(built),
        }
    }
}

type StageRunner = Box<dyn Fn(&RegionSnapshot, &dyn MainThreadDispatch) -> bool + Send + Sync>;

/// A geometry builder together with the sink that receives its output.
struct RebuildStage {
    concern: Concern,
    run: StageRunner,
}

impl RebuildStage {
    fn new<A, F, S>(concern: Concern, build: F, sink: S) -> Self
    where
        A: Send + 'static,
        F: Fn(&RegionSnapshot) -> Option<A> + Send + Sync + 'static,
        S: Fn(RegionPos, Option<A>) + Send + Sync + 'static,
    {
        let sink = Arc::new(sink);
        let run = move |snapshot: &RegionSnapshot, dispatch: &dyn MainThreadDispatch| -> bool {
            let artifact = build(snapshot);
            let built = artifact.is_some();
            let position = snapshot.position();
            let sink = sink.clone();
            dispatch.schedule(Box::new(move || (*sink)(position, artifact)));
            built
        };
        RebuildStage {
            concern,
            run: Box::new(run),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Work {
    Generate,
    Rebuild,
}

/// Background task that drives regions near the observer to completion.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use voxel_world::core::MainThreadQueue;
/// use voxel_world::engine_state::task_management::task::TaskStatus;
/// use voxel_world::engine_state::voxels::generation::GeneratorPipeline;
/// use voxel_world::engine_state::voxels::region_index::RegionIndex;
/// use voxel_world::engine_state::voxels::tasks::{RebuildScheduler, SchedulerSettings, WorldContext};
///
/// let context = WorldContext::new(RegionIndex::new(5).unwrap(), Arc::new(MainThreadQueue::new()));
/// let scheduler = RebuildScheduler::new("generation", context.clone(), SchedulerSettings::default())
///     .with_generation(GeneratorPipeline::default_terrain(7).unwrap());
///
/// assert_eq!(scheduler.run_pass(), TaskStatus::Progressed);
/// assert!(!context.world.get().is_empty());
/// ```
pub struct RebuildScheduler {
    name: String,
    context: WorldContext,
    settings: SchedulerSettings,
    pipeline: Option<GeneratorPipeline>,
    stages: Vec<RebuildStage>,
}

impl RebuildScheduler {
    /// Creates a scheduler with nothing to do; add work with the `with_*` methods.
    pub fn new(name: impl Into<String>, context: WorldContext, settings: SchedulerSettings) -> Self {
        RebuildScheduler {
            name: name.into(),
            context,
            settings,
            pipeline: None,
            stages: Vec::new(),
        }
    }

    /// Creates and generates regions within the generation distance.
    pub fn with_generation(mut self, pipeline: GeneratorPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Builds meshes for ready regions within the render distance.
    ///
    /// `sink` runs on the main thread; `None` means the region has nothing to draw.
    pub fn with_mesh_builder<B, S>(mut self, builder: B, sink: S) -> Self
    where
        B: MeshBuilder,
        S: Fn(RegionPos, Option<B::Mesh>) + Send + Sync + 'static,
    {
        self.stages.push(RebuildStage::new(
            Concern::Mesh,
            move |snapshot: &RegionSnapshot| builder.build_mesh(snapshot),
            sink,
        ));
        self
    }

    /// Builds collision shapes for ready regions within the render distance.
    pub fn with_shape_builder<B, S>(mut self, builder: B, sink: S) -> Self
    where
        B: ShapeBuilder,
        S: Fn(RegionPos, Option<B::Shape>) + Send + Sync + 'static,
    {
        self.stages.push(RebuildStage::new(
            Concern::Shape,
            move |snapshot: &RegionSnapshot| builder.build_shape(snapshot),
            sink,
        ));
        self
    }

    pub fn context(&self) -> &WorldContext {
        &self.context
    }

    /// Runs one pass and reports whether any region moved forward.
    pub fn run_pass(&self) -> TaskStatus {
        let started = Instant::now();

        if let Err(err) = self.flush_dirty() {
            log::warn!("{}: failed to apply dirty marks: {err}", self.name);
        }

        let observer = *self.context.observer.get();
        let candidates = match self.collect_candidates(observer) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::warn!("{}: region search failed: {err}", self.name);
                return TaskStatus::Idle;
            }
        };

        for (pos, work) in candidates {
            let Some(_claim) = self.context.try_claim(pos) else {
                continue;
            };

            let outcome = match work {
                Work::Generate => self.generate(pos),
                Work::Rebuild => self.rebuild(pos),
            };
            match outcome {
                Ok(true) => {
                    log::debug!(
                        "{}: {work:?} on {pos} took {:?}",
                        self.name,
                        started.elapsed()
                    );
                    return TaskStatus::Progressed;
                }
                Ok(false) => {}
                Err(err) => log::warn!("{}: {work:?} on {pos} failed: {err}", self.name),
            }
        }
        TaskStatus::Idle
    }

    /// Clears the updated bits of every region marked dirty since the last pass.
    fn flush_dirty(&self) -> Result<(), SchedulerError> {
        let dirty = self.context.dirty.get_mut().take_dirty();
        if dirty.is_empty() {
            return Ok(());
        }

        let mut index = self.context.index.get_mut();
        for pos in dirty {
            index.update(pos, |state| {
                state.remove(RegionState::MESH_UPDATED | RegionState::SHAPE_UPDATED)
            })?;
        }
        Ok(())
    }

    fn required_bits(&self) -> RegionState {
        let generated = match self.pipeline {
            Some(_) => RegionState::GENERATED,
            None => RegionState::empty(),
        };
        self.stages
            .iter()
            .fold(generated, |bits, stage| bits | stage.concern.bit())
    }

    fn search_limit(&self) -> f32 {
        let generation = match self.pipeline {
            Some(_) => distance_limit(self.settings.generation_distance),
            None => 0.0,
        };
        let render = match self.stages.is_empty() {
            true => 0.0,
            false => distance_limit(self.settings.render_distance),
        };
        generation.max(render)
    }

    /// The nearest regions this scheduler could advance, nearest first.
    fn collect_candidates(&self, observer: Point3<f32>) -> Result<Vec<(RegionPos, Work)>, SchedulerError> {
        let required = self.required_bits();
        let generating = self.pipeline.is_some();
        let limit = self.search_limit();

        let weight = |level: u32, node, state: RegionState| {
            if state.contains(required) {
                return None;
            }
            // Without a pipeline nothing can happen below a node with no generated region.
            if !generating && !state.contains(RegionState::GENERATED_SOME) {
                return None;
            }
            let weight = distance_weight(observer, level, node);
            (weight <= limit).then_some(weight)
        };

        let index = self.context.index.get();
        let start = RegionPos::containing_point(observer);
        let mut candidates = Vec::with_capacity(self.settings.candidates_per_pass);
        for found in index.find(weight, [start])? {
            if let Some(work) = self.classify(&index, &found) {
                candidates.push((found.position, work));
                if candidates.len() >= self.settings.candidates_per_pass {
                    break;
                }
            }
        }
        Ok(candidates)
    }

    fn classify(&self, index: &RegionIndex, found: &FoundRegion<RegionState>) -> Option<Work> {
        let state = found.state;
        if !state.contains(RegionState::GENERATED) {
            let in_range = found.weight <= distance_limit(self.settings.generation_distance);
            return (self.pipeline.is_some() && in_range).then_some(Work::Generate);
        }

        let pending = self
            .stages
            .iter()
            .any(|stage| !state.contains(stage.concern.bit()));
        let in_range = found.weight <= distance_limit(self.settings.render_distance);
        (pending && in_range && is_ready(index, found.position)).then_some(Work::Rebuild)
    }

    /// Loads `pos` and marks it as existing in the index.
    fn load(&self, pos: RegionPos) -> Result<MtResource<Region>, SchedulerError> {
        let region = self.context.world.get_mut().get_or_create(pos)?;
        self.context
            .index
            .get_mut()
            .update(pos, |state| state.insert(RegionState::EXISTS))?;
        Ok(region)
    }

    fn generate(&self, pos: RegionPos) -> Result<bool, SchedulerError> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(false);
        };
        let region = self.load(pos)?;

        let mut progressed = false;
        loop {
            match pipeline.advance(&region) {
                GenerationStep::Applied(generator) => {
                    log::trace!("applied {generator} to {pos}");
                    progressed = true;
                }
                GenerationStep::Complete => {
                    self.finish_generation(pos)?;
                    return Ok(true);
                }
                GenerationStep::Blocked(reason) => {
                    let helped = match reason.neighbor() {
                        Some(neighbor) => self.advance_neighbor(pipeline, pos.neighbor(neighbor))?,
                        None => false,
                    };
                    if !helped {
                        log::trace!("{pos} is blocked: {reason:?}");
                        return Ok(progressed);
                    }
                    progressed = true;
                }
            }
        }
    }

    /// Runs as many generators as possible on a neighbour another region
    /// is waiting for. Returns whether it moved forward.
    fn advance_neighbor(&self, pipeline: &GeneratorPipeline, pos: RegionPos) -> Result<bool, SchedulerError> {
        let Some(_claim) = self.context.try_claim(pos) else {
            return Ok(false);
        };
        let region = self.load(pos)?;

        let mut applied = false;
        loop {
            match pipeline.advance(&region) {
                GenerationStep::Applied(_) => applied = true,
                GenerationStep::Complete => return Ok(self.finish_generation(pos)? || applied),
                GenerationStep::Blocked(_) => return Ok(applied),
            }
        }
    }

    /// Records a completed region and announces every region that became
    /// ready because of it.
    ///
    /// Returns `false` if the region was already recorded.
    fn finish_generation(&self, pos: RegionPos) -> Result<bool, SchedulerError> {
        let ready: Vec<RegionPos> = {
            let mut index = self.context.index.get_mut();
            if index.leaf(pos)?.contains(RegionState::GENERATED) {
                return Ok(false);
            }
            index.update(pos, |state| state.insert(RegionState::GENERATED))?;

            iter::once(Neighbor::CENTER)
                .chain(Neighbor::ALL)
                .map(|neighbor| pos.neighbor(neighbor))
                .filter(|&candidate| is_ready(&index, candidate))
                .collect()
        };

        for pos in ready {
            self.context.events.emit_ready(pos);
        }
        Ok(true)
    }

    fn rebuild(&self, pos: RegionPos) -> Result<bool, SchedulerError> {
        let region = self.context.world.get().get(pos);
        let Some(region) = region else {
            return Ok(false);
        };

        // Set the bits before taking the snapshot so an edit racing the build
        // clears them again and schedules another pass.
        let pending: Vec<&RebuildStage> = {
            let mut index = self.context.index.get_mut();
            let state = index.leaf(pos)?;
            let pending: Vec<&RebuildStage> = self
                .stages
                .iter()
                .filter(|stage| !state.contains(stage.concern.bit()))
                .collect();
            let bits = pending
                .iter()
                .fold(RegionState::empty(), |bits, stage| bits | stage.concern.bit());
            index.update(pos, |state| state.insert(bits))?;
            pending
        };
        if pending.is_empty() {
            return Ok(false);
        }

        let snapshot = RegionSnapshot::capture(&region);
        for stage in pending {
            let built = (stage.run)(&snapshot, self.context.dispatch.as_ref());
            stage.concern.mark_region(&mut region.get_mut(), built);
        }
        Ok(true)
    }
}

impl Task for RebuildScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self) -> TaskStatus {
        self.run_pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::core::MainThreadQueue;
    use crate::engine_state::rendering::{BoxShapeBuilder, CulledMeshBuilder, RegionMesh};
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::block::Block;
    use crate::engine_state::voxels::generation::{GenerationContext, Generator};

    /// Fills the bottom layer of every region with stone.
    struct Floor;

    impl Generator for Floor {
        fn identifier(&self) -> &'static str {
            "floor"
        }

        fn populate(&self, context: &mut GenerationContext<'_>) {
            for z in 0..16 {
                for x in 0..16 {
                    context.set_block(x, 0, z, Block::new(BlockType::STONE));
                }
            }
        }
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            generation_distance: 3,
            render_distance: 1,
            candidates_per_pass: 4,
        }
    }

    fn setup() -> (WorldContext, Arc<MainThreadQueue>) {
        let queue = Arc::new(MainThreadQueue::new());
        let context = WorldContext::new(RegionIndex::new(3).unwrap(), queue.clone());
        *context.observer.get_mut() = Point3::new(8.0, 8.0, 8.0);
        (context, queue)
    }

    fn floor_pipeline() -> GeneratorPipeline {
        let floor: Arc<dyn Generator> = Arc::new(Floor);
        GeneratorPipeline::new(vec![floor]).unwrap()
    }

    fn drain(scheduler: &RebuildScheduler) -> usize {
        let mut passes = 0;
        while scheduler.run_pass() == TaskStatus::Progressed {
            passes += 1;
            assert!(passes < 10_000, "scheduler never went idle");
        }
        passes
    }

    #[test]
    fn empty_scheduler_is_idle() {
        let (context, _queue) = setup();
        let scheduler = RebuildScheduler::new("empty", context.clone(), settings());
        assert_eq!(scheduler.run_pass(), TaskStatus::Idle);
        assert!(context.world.get().is_empty());
    }

    #[test]
    fn generation_starts_nearest_the_observer() {
        let (context, _queue) = setup();
        let scheduler = RebuildScheduler::new("generation", context.clone(), settings())
            .with_generation(floor_pipeline());

        assert_eq!(scheduler.run_pass(), TaskStatus::Progressed);
        let world = context.world.get();
        assert_eq!(world.positions().collect::<Vec<_>>(), vec![RegionPos::ORIGIN]);
        let region = world.get(RegionPos::ORIGIN).unwrap();
        assert!(region.get().is_generated());
        assert!(context
            .index
            .get()
            .leaf(RegionPos::ORIGIN)
            .unwrap()
            .contains(RegionState::EXISTS | RegionState::GENERATED));
    }

    #[test]
    fn generation_fills_the_sphere_then_idles() {
        let (context, _queue) = setup();
        let scheduler = RebuildScheduler::new("generation", context.clone(), settings())
            .with_generation(floor_pipeline());

        let passes = drain(&scheduler);
        let world = context.world.get();
        assert_eq!(passes, world.len());

        let observer = Point3::new(8.0, 8.0, 8.0);
        let limit = distance_limit(3);
        for pos in world.positions() {
            let node = pos.to_morton().unwrap();
            assert!(distance_weight(observer, 0, node) <= limit, "{pos} is too far");
        }
        assert!(world.contains(RegionPos::new(3, 0, 0)));
        assert!(!world.contains(RegionPos::new(4, 0, 0)));
        assert!(context.in_flight.get().is_empty());
    }

    #[test]
    fn ready_is_announced_once_per_region() {
        let (context, _queue) = setup();
        let ready = Arc::new(Mutex::new(Vec::new()));
        let seen = ready.clone();
        context.events.on_ready(move |pos| seen.lock().unwrap().push(pos));

        let scheduler = RebuildScheduler::new("generation", context.clone(), settings())
            .with_generation(floor_pipeline());
        drain(&scheduler);

        let mut ready = ready.lock().unwrap().clone();
        let total = ready.len();
        ready.sort_by_key(|pos| (pos.x, pos.y, pos.z));
        ready.dedup();
        assert_eq!(ready.len(), total);
        assert!(ready.contains(&RegionPos::ORIGIN));

        let index = context.index.get();
        for pos in context.world.get().positions() {
            assert_eq!(ready.contains(&pos), is_ready(&index, pos), "{pos}");
        }
    }

    #[test]
    fn meshes_wait_for_generated_neighbors() {
        let (context, queue) = setup();
        let meshes: Arc<Mutex<Vec<(RegionPos, Option<RegionMesh>)>>> = Arc::default();
        let sink = meshes.clone();
        let mesher = RebuildScheduler::new("mesh", context.clone(), settings())
            .with_mesh_builder(CulledMeshBuilder, move |pos, mesh| {
                sink.lock().unwrap().push((pos, mesh))
            });

        // Only the centre region exists; nothing is ready to mesh.
        let generator = RebuildScheduler::new("generation", context.clone(), settings())
            .with_generation(floor_pipeline());
        assert_eq!(generator.run_pass(), TaskStatus::Progressed);
        assert_eq!(mesher.run_pass(), TaskStatus::Idle);

        drain(&generator);
        drain(&mesher);
        queue.process().unwrap();

        let meshes = meshes.lock().unwrap();
        let origin = meshes
            .iter()
            .find(|(pos, _)| *pos == RegionPos::ORIGIN)
            .and_then(|(_, mesh)| mesh.as_ref())
            .unwrap();
        // A full floor layer with floors on every side: only tops and bottoms show.
        assert_eq!(origin.face_count(), 2 * 16 * 16);

        let region = context.world.get().get(RegionPos::ORIGIN).unwrap();
        assert!(region.get().is_mesh_built());
        assert!(context
            .index
            .get()
            .leaf(RegionPos::ORIGIN)
            .unwrap()
            .contains(RegionState::MESH_UPDATED));
    }

    #[test]
    fn dirty_regions_are_rebuilt() {
        let (context, queue) = setup();
        let builds = Arc::new(Mutex::new(Vec::new()));
        let sink = builds.clone();
        let generator = RebuildScheduler::new("generation", context.clone(), settings())
            .with_generation(floor_pipeline());
        let shaper = RebuildScheduler::new("shape", context.clone(), settings())
            .with_shape_builder(BoxShapeBuilder, move |pos, shape| {
                sink.lock().unwrap().push((pos, shape.map(|shape| shape.solid_cells())))
            });

        drain(&generator);
        drain(&shaper);
        queue.process().unwrap();
        builds.lock().unwrap().clear();

        let touched = context
            .world
            .get_mut()
            .set_block(Point3::new(3, 5, 3), Block::new(BlockType::DIRT))
            .unwrap();
        context.dirty.get_mut().mark_many(touched);

        assert_eq!(drain(&shaper), 1);
        queue.process().unwrap();
        assert_eq!(
            *builds.lock().unwrap(),
            vec![(RegionPos::ORIGIN, Some(16 * 16 + 1))]
        );
    }

    #[test]
    fn claimed_regions_are_skipped() {
        let (context, _queue) = setup();
        let scheduler = RebuildScheduler::new("generation", context.clone(), settings())
            .with_generation(floor_pipeline());

        let _claim = context.try_claim(RegionPos::ORIGIN).unwrap();
        assert_eq!(scheduler.run_pass(), TaskStatus::Progressed);
        assert!(!context.world.get().contains(RegionPos::ORIGIN));
    }
}
