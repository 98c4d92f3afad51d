//! # Core Module
//!
//! Fundamental building blocks shared by every engine subsystem.
//!
//! ## Key Components
//! - `MortonIndex`: Bit-interleaved 3-D keys with arithmetic on the packed form
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `WeakMtResource`: Non-owning handle to an `MtResource`
//! - `MainThreadQueue`: Hand-off point for work that must run on the owning thread
//!
//! ## Usage
//! ```rust
//! use voxel_world::core::{MortonIndex, MtResource};
//!
//! let key = MortonIndex::encode(1, -2, 3).unwrap();
//! assert_eq!(key.decode(), (1, -2, 3));
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod main_thread;
pub mod morton;
pub mod mt_resource;

// Re-export types for easier access
pub use main_thread::{MainThreadAction, MainThreadDispatch, MainThreadQueue};
pub use morton::MortonIndex;
pub use mt_resource::{MtResource, WeakMtResource};
