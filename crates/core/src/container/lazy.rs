use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::container::descriptor::DependencyId;
use crate::container::ioc_container::{Container, ContainerInner};
use crate::errors::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LazyMode {
    Get,
    Create,
}

/// Deferred `get` or `create` of one dependency.
///
/// Nothing is resolved until [`Lazy::get`] is called, and cycle detection only
/// applies at that point. The handle keeps a weak reference to its container,
/// so services may store it without keeping the container alive.
pub struct Lazy<T: ?Sized> {
    container: Weak<ContainerInner>,
    id: DependencyId,
    mode: LazyMode,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Lazy<T> {
    pub(crate) fn new(container: Weak<ContainerInner>, id: DependencyId, mode: LazyMode) -> Self {
        Self {
            container,
            id,
            mode,
            _marker: PhantomData,
        }
    }

    /// Resolve the dependency now
    pub fn get(&self) -> Result<Arc<T>, ResolveError> {
        let inner = self
            .container
            .upgrade()
            .ok_or_else(|| ResolveError::ContainerDropped {
                id: self.id.clone(),
            })?;
        let container = Container::from_inner(inner);

        match self.mode {
            LazyMode::Get => container.get_by_id(&self.id),
            LazyMode::Create => container.create_by_id(&self.id),
        }
    }

    pub fn id(&self) -> &DependencyId {
        &self.id
    }

    /// True when every call creates a new instance
    pub fn is_create(&self) -> bool {
        self.mode == LazyMode::Create
    }
}

impl<T: ?Sized> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            id: self.id.clone(),
            mode: self.mode,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .finish()
    }
}
