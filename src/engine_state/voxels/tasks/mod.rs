//! # Voxel Task System
//!
//! This module contains the background work that keeps the world around the
//! observer generated, meshed and shaped. Each worker runs a
//! [`RebuildScheduler`] which, on every pass, asks the region index for the
//! nearest region that still needs work, claims it and advances it.
//!
//! ## Shared State
//!
//! Workers and the engine share one [`WorldContext`]. Locks are always taken
//! in the order in-flight set, world, region, index, and no lock is held
//! while generators or geometry builders run on a region other than the one
//! they were handed.

use std::collections::HashSet;
use std::iter;
use std::sync::Arc;

use cgmath::Point3;

use crate::core::{MainThreadDispatch, MtResource};

use super::events::RegionEvents;
use super::region::{Neighbor, RegionPos};
use super::region_index::{RegionIndex, RegionState};
use super::world::World;

pub mod dirty_tracker;
pub mod rebuild_scheduler;

pub use dirty_tracker::DirtyTracker;
pub use rebuild_scheduler::{RebuildScheduler, SchedulerSettings};

/// Handles shared by the engine and every worker.
#[derive(Clone)]
pub struct WorldContext {
    pub world: MtResource<World>,
    pub index: MtResource<RegionIndex>,
    /// Regions some worker is currently working on.
    pub in_flight: MtResource<HashSet<RegionPos>>,
    /// Observer position in world cells.
    pub observer: MtResource<Point3<f32>>,
    pub dirty: MtResource<DirtyTracker>,
    pub events: Arc<RegionEvents>,
    pub dispatch: Arc<dyn MainThreadDispatch>,
}

impl WorldContext {
    pub fn new(index: RegionIndex, dispatch: Arc<dyn MainThreadDispatch>) -> Self {
        WorldContext {
            world: MtResource::new(World::new()),
            index: MtResource::new(index),
            in_flight: MtResource::new(HashSet::new()),
            observer: MtResource::new(Point3::new(0.0, 0.0, 0.0)),
            dirty: MtResource::new(DirtyTracker::new()),
            events: Arc::new(RegionEvents::new()),
            dispatch,
        }
    }

    /// Claims `pos` for exclusive work until the returned guard is dropped.
    ///
    /// Returns `None` while another worker holds the claim.
    pub fn try_claim(&self, pos: RegionPos) -> Option<InFlightClaim> {
        self.in_flight.get_mut().insert(pos).then(|| InFlightClaim {
            in_flight: self.in_flight.clone(),
            pos,
        })
    }

    pub fn is_in_flight(&self, pos: RegionPos) -> bool {
        self.in_flight.get().contains(&pos)
    }
}

/// Releases an in-flight claim on drop.
pub struct InFlightClaim {
    in_flight: MtResource<HashSet<RegionPos>>,
    pos: RegionPos,
}

impl InFlightClaim {
    pub fn position(&self) -> RegionPos {
        self.pos
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.in_flight.get_mut().remove(&self.pos);
    }
}

/// Whether `pos` and all 26 of its neighbours are generated.
pub fn is_ready(index: &RegionIndex, pos: RegionPos) -> bool {
    iter::once(Neighbor::CENTER)
        .chain(Neighbor::ALL)
        .all(|neighbor| {
            index
                .leaf(pos.neighbor(neighbor))
                .is_ok_and(|state| state.contains(RegionState::GENERATED))
        })
}
