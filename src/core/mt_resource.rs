use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can be shared
/// across threads. It uses an `Arc<RwLock<T>>` internally; cloning the handle shares
/// the same value.
///
/// # Examples
///
/// ```
/// use voxel_world::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let counter_clone = counter.clone();
///
/// let handle = std::thread::spawn(move || {
///     *counter_clone.get_mut() += 1;
/// });
///
/// handle.join().unwrap();
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// # Performance Considerations
/// - Read operations (`get()`) can occur concurrently
/// - Write operations (`get_mut()`) are exclusive and will block other operations
/// - Guards should be dropped before locking another resource that may lock back
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a mutable guard that allows modifying the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }

    /// Creates a non-owning handle to the same value.
    pub fn downgrade(&self) -> WeakMtResource<T> {
        WeakMtResource {
            resource: Arc::downgrade(&self.resource),
        }
    }

    /// Whether both handles point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

/// A non-owning counterpart of [`MtResource`].
///
/// Used for links between values that are owned elsewhere, such as the
/// neighbor references between regions, which are owned by the world map.
pub struct WeakMtResource<T: Send + Sync> {
    resource: Weak<RwLock<T>>,
}

impl<T: Send + Sync + 'static> WeakMtResource<T> {
    /// Returns an owning handle if the value is still alive.
    pub fn upgrade(&self) -> Option<MtResource<T>> {
        self.resource.upgrade().map(|resource| MtResource { resource })
    }
}

impl<T: Send + Sync> Clone for WeakMtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
