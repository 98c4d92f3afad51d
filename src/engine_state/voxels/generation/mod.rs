//! # Generation Module
//!
//! Dependency-gated content generation for regions.
//!
//! ## Pipeline
//!
//! A [`GeneratorPipeline`] is an ordered list of [`Generator`]s. Each call to
//! [`GeneratorPipeline::advance`] applies at most one generator to one region:
//! the first one the region has not seen yet. A generator may require
//!
//! - other generators to have run on the same region first, and
//! - generators to have run on specific neighbouring regions.
//!
//! When a neighbour requirement is not met the step reports
//! [`GenerationStep::Blocked`] and changes nothing. Callers retry later, once
//! the neighbour has progressed. Blocking is an expected outcome, not an error.
//!
//! ## Locking
//!
//! Neighbour storages are copied into the [`GenerationContext`] before the
//! target region is write-locked, so no two region locks are ever held at
//! the same time.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::MtResource;
use crate::error::GeneratorError;

use super::block::Block;
use super::region::{BlockStorage, Neighbor, Region, RegionPos};

pub mod basic_terrain;
pub mod surface_grass;

pub use basic_terrain::BasicTerrainGenerator;
pub use surface_grass::SurfaceGrassGenerator;

/// A named, dependency-gated content population step.
pub trait Generator: Send + Sync {
    /// Unique name recorded on every region the generator has run on.
    fn identifier(&self) -> &'static str;

    /// Generators that must already have run on the same region.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// Generators that must already have run on neighbouring regions.
    fn neighbor_dependencies(&self) -> &[(Neighbor, &'static str)] {
        &[]
    }

    /// Fills the target region. Must only write to the target region.
    fn populate(&self, context: &mut GenerationContext<'_>);
}

/// What a generator may see and touch while populating a region.
pub struct GenerationContext<'a> {
    region: &'a mut Region,
    neighbors: &'a [Option<BlockStorage>; Neighbor::SLOTS],
}

impl<'a> GenerationContext<'a> {
    pub fn position(&self) -> RegionPos {
        self.region.position()
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Block {
        self.region.get_block(x, y, z)
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) {
        self.region.set_block(x, y, z, block);
    }

    pub fn storage(&self) -> &BlockStorage {
        self.region.storage()
    }

    pub fn storage_mut(&mut self) -> &mut BlockStorage {
        self.region.storage_mut()
    }

    /// A copy of a neighbour's storage taken before population began.
    ///
    /// Only neighbours named in [`Generator::neighbor_dependencies`] are
    /// captured; any other direction returns `None`.
    pub fn neighbor(&self, neighbor: Neighbor) -> Option<&BlockStorage> {
        self.neighbors[neighbor.index()].as_ref()
    }
}

/// Why a generation step could not run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockedOn {
    /// A same-region dependency has not been applied.
    Dependency {
        generator: &'static str,
        dependency: &'static str,
    },
    /// The neighbour region is not loaded.
    MissingNeighbor {
        generator: &'static str,
        neighbor: Neighbor,
    },
    /// The neighbour region exists but has not run the dependency yet.
    NeighborPending {
        generator: &'static str,
        neighbor: Neighbor,
        dependency: &'static str,
    },
}

impl BlockedOn {
    /// The neighbour whose progress would unblock the step, if any.
    pub fn neighbor(&self) -> Option<Neighbor> {
        match self {
            BlockedOn::Dependency { .. } => None,
            BlockedOn::MissingNeighbor { neighbor, .. } | BlockedOn::NeighborPending { neighbor, .. } => {
                Some(*neighbor)
            }
        }
    }
}

/// Outcome of one [`GeneratorPipeline::advance`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationStep {
    /// The named generator ran.
    Applied(&'static str),
    /// The next generator cannot run yet; retry later.
    Blocked(BlockedOn),
    /// Every generator has run; the region is content-complete.
    Complete,
}

/// An ordered, validated list of generators.
#[derive(Clone)]
pub struct GeneratorPipeline {
    generators: Vec<Arc<dyn Generator>>,
}

impl GeneratorPipeline {
    /// Builds a pipeline, checking that every same-region dependency is
    /// registered earlier and every neighbour dependency is registered at all.
    ///
    /// # Errors
    /// [`GeneratorError`] describing the first violation found.
    pub fn new(generators: Vec<Arc<dyn Generator>>) -> Result<Self, GeneratorError> {
        let known: HashSet<&str> = generators.iter().map(|g| g.identifier()).collect();
        let mut registered = HashSet::new();

        for generator in &generators {
            for dependency in generator.dependencies() {
                if registered.contains(dependency) {
                    continue;
                }
                let generator = generator.identifier().to_owned();
                let dependency = dependency.to_string();
                return Err(if known.contains(dependency.as_str()) {
                    GeneratorError::DependencyOrder { generator, dependency }
                } else {
                    GeneratorError::UnknownDependency { generator, dependency }
                });
            }
            if !registered.insert(generator.identifier()) {
                return Err(GeneratorError::DuplicateIdentifier(
                    generator.identifier().to_owned(),
                ));
            }
        }

        for generator in &generators {
            for (_, dependency) in generator.neighbor_dependencies() {
                if !known.contains(dependency) {
                    return Err(GeneratorError::UnknownDependency {
                        generator: generator.identifier().to_owned(),
                        dependency: dependency.to_string(),
                    });
                }
            }
        }

        Ok(Self { generators })
    }

    /// Basic terrain followed by surface grass.
    ///
    /// # Errors
    /// Same as [`new`](Self::new); the built-in generators always validate.
    pub fn default_terrain(seed: u32) -> Result<Self, GeneratorError> {
        let terrain: Arc<dyn Generator> = Arc::new(BasicTerrainGenerator::new(seed));
        let grass: Arc<dyn Generator> = Arc::new(SurfaceGrassGenerator);
        Self::new(vec![terrain, grass])
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.iter().map(|generator| generator.identifier())
    }

    /// Applies the next unapplied generator to `region` if its dependencies
    /// are satisfied. Marks the region generated once nothing is left.
    pub fn advance(&self, region: &MtResource<Region>) -> GenerationStep {
        let (generator, neighbors) = {
            let current = region.get();
            if current.is_generated() {
                return GenerationStep::Complete;
            }

            let next = self
                .generators
                .iter()
                .find(|generator| !current.has_applied(generator.identifier()));
            let Some(generator) = next else {
                drop(current);
                region.get_mut().set_generated();
                return GenerationStep::Complete;
            };

            if let Some(dependency) = generator
                .dependencies()
                .iter()
                .copied()
                .find(|dependency| !current.has_applied(dependency))
            {
                return GenerationStep::Blocked(BlockedOn::Dependency {
                    generator: generator.identifier(),
                    dependency,
                });
            }

            let neighbors: Vec<_> = generator
                .neighbor_dependencies()
                .iter()
                .map(|&(neighbor, dependency)| (neighbor, dependency, current.neighbor(neighbor)))
                .collect();
            (generator.clone(), neighbors)
        };

        let mut snapshots: [Option<BlockStorage>; Neighbor::SLOTS] = std::array::from_fn(|_| None);
        for (neighbor, dependency, handle) in neighbors {
            let Some(handle) = handle else {
                return GenerationStep::Blocked(BlockedOn::MissingNeighbor {
                    generator: generator.identifier(),
                    neighbor,
                });
            };
            let other = handle.get();
            if !other.has_applied(dependency) {
                return GenerationStep::Blocked(BlockedOn::NeighborPending {
                    generator: generator.identifier(),
                    neighbor,
                    dependency,
                });
            }
            if snapshots[neighbor.index()].is_none() {
                snapshots[neighbor.index()] = Some(other.storage().clone());
            }
        }

        let identifier = generator.identifier();
        let mut target = region.get_mut();
        if !target.has_applied(identifier) {
            let mut context = GenerationContext {
                region: &mut *target,
                neighbors: &snapshots,
            };
            generator.populate(&mut context);
            target.mark_applied(identifier);
            log::trace!("applied `{identifier}` to region {}", target.position());
        }
        GenerationStep::Applied(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::world::World;

    struct Fill {
        id: &'static str,
        block: BlockType,
        deps: &'static [&'static str],
        neighbor_deps: &'static [(Neighbor, &'static str)],
    }

    impl Generator for Fill {
        fn identifier(&self) -> &'static str {
            self.id
        }

        fn dependencies(&self) -> &[&'static str] {
            self.deps
        }

        fn neighbor_dependencies(&self) -> &[(Neighbor, &'static str)] {
            self.neighbor_deps
        }

        fn populate(&self, context: &mut GenerationContext<'_>) {
            context.set_block(0, 0, 0, Block::new(self.block));
        }
    }

    fn fill(
        id: &'static str,
        deps: &'static [&'static str],
        neighbor_deps: &'static [(Neighbor, &'static str)],
    ) -> Arc<dyn Generator> {
        Arc::new(Fill {
            id,
            block: BlockType::WHITE,
            deps,
            neighbor_deps,
        })
    }

    #[test]
    fn validation_rejects_bad_orderings() {
        assert_eq!(
            GeneratorPipeline::new(vec![fill("b", &["a"], &[]), fill("a", &[], &[])]).err(),
            Some(GeneratorError::DependencyOrder {
                generator: "b".into(),
                dependency: "a".into()
            })
        );
        assert_eq!(
            GeneratorPipeline::new(vec![fill("a", &["missing"], &[])]).err(),
            Some(GeneratorError::UnknownDependency {
                generator: "a".into(),
                dependency: "missing".into()
            })
        );
        assert_eq!(
            GeneratorPipeline::new(vec![fill("a", &[], &[]), fill("a", &[], &[])]).err(),
            Some(GeneratorError::DuplicateIdentifier("a".into()))
        );
        assert_eq!(
            GeneratorPipeline::new(vec![fill("a", &[], &[(Neighbor::UP, "nope")])]).err(),
            Some(GeneratorError::UnknownDependency {
                generator: "a".into(),
                dependency: "nope".into()
            })
        );
    }

    #[test]
    fn default_terrain_passes_validation() {
        let pipeline = GeneratorPipeline::default_terrain(3).unwrap();
        assert_eq!(
            pipeline.identifiers().collect::<Vec<_>>(),
            vec![BasicTerrainGenerator::IDENTIFIER, SurfaceGrassGenerator::IDENTIFIER]
        );
    }

    #[test]
    fn neighbor_dependencies_may_point_forward() {
        let pipeline = GeneratorPipeline::new(vec![
            fill("a", &[], &[(Neighbor::UP, "b")]),
            fill("b", &[], &[]),
        ]);
        assert!(pipeline.is_ok());
    }

    #[test]
    fn generators_apply_in_order_then_complete() {
        let pipeline =
            GeneratorPipeline::new(vec![fill("a", &[], &[]), fill("b", &["a"], &[])]).unwrap();
        let mut world = World::new();

        assert_eq!(
            world.advance_generation(&pipeline, RegionPos::ORIGIN),
            Ok(GenerationStep::Applied("a"))
        );
        assert_eq!(
            world.advance_generation(&pipeline, RegionPos::ORIGIN),
            Ok(GenerationStep::Applied("b"))
        );
        assert_eq!(
            world.advance_generation(&pipeline, RegionPos::ORIGIN),
            Ok(GenerationStep::Complete)
        );

        let region = world.get(RegionPos::ORIGIN).unwrap();
        assert!(region.get().is_generated());
        assert_eq!(region.get().get_block(0, 0, 0), Block::new(BlockType::WHITE));
    }

    #[test]
    fn missing_neighbor_blocks_without_changes() {
        let pipeline =
            GeneratorPipeline::new(vec![fill("a", &[], &[(Neighbor::WEST, "a")])]).unwrap();
        let mut world = World::new();

        let step = world.advance_generation(&pipeline, RegionPos::ORIGIN).unwrap();
        assert_eq!(
            step,
            GenerationStep::Blocked(BlockedOn::MissingNeighbor {
                generator: "a",
                neighbor: Neighbor::WEST
            })
        );
        let region = world.get(RegionPos::ORIGIN).unwrap();
        assert!(!region.get().has_applied("a"));
        assert_eq!(region.get().get_block(0, 0, 0), Block::AIR);
    }

    #[test]
    fn applied_set_decides_the_next_generator() {
        let pipeline =
            GeneratorPipeline::new(vec![fill("a", &[], &[]), fill("b", &["a"], &[])]).unwrap();
        let region = MtResource::new(Region::new(RegionPos::ORIGIN));
        region.get_mut().mark_applied("a");

        assert_eq!(pipeline.advance(&region), GenerationStep::Applied("b"));
        assert_eq!(region.get().get_block(0, 0, 0), Block::new(BlockType::WHITE));
        assert_eq!(pipeline.advance(&region), GenerationStep::Complete);
    }
}
