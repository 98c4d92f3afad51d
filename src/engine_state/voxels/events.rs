//! # Region Events
//!
//! Notifications produced by the voxel core. Listeners run synchronously on
//! whichever thread emits the event, so they must be cheap and thread-safe.
//! A listener must not subscribe further listeners from inside a callback.

use crate::core::MtResource;

use super::region::RegionPos;

/// Callback invoked with the position of the affected region.
pub type RegionListener = Box<dyn Fn(RegionPos) + Send + Sync + 'static>;

/// Listener registry shared by the engine and its workers.
pub struct RegionEvents {
    ready: MtResource<Vec<RegionListener>>,
    unloaded: MtResource<Vec<RegionListener>>,
}

impl RegionEvents {
    pub fn new() -> Self {
        Self {
            ready: MtResource::new(Vec::new()),
            unloaded: MtResource::new(Vec::new()),
        }
    }

    /// Called once per load when a region and all 26 of its neighbours are
    /// content-complete.
    pub fn on_ready(&self, listener: impl Fn(RegionPos) + Send + Sync + 'static) {
        self.ready.get_mut().push(Box::new(listener));
    }

    /// Called after a region has been removed from the world.
    pub fn on_unloaded(&self, listener: impl Fn(RegionPos) + Send + Sync + 'static) {
        self.unloaded.get_mut().push(Box::new(listener));
    }

    pub(crate) fn emit_ready(&self, pos: RegionPos) {
        log::debug!("region {pos} is ready");
        self.ready.get().iter().for_each(|listener| listener(pos));
    }

    pub(crate) fn emit_unloaded(&self, pos: RegionPos) {
        self.unloaded.get().iter().for_each(|listener| listener(pos));
    }
}

impl Default for RegionEvents {
    fn default() -> Self {
        Self::new()
    }
}
