use std::any::Any;
use std::sync::Arc;

use crate::container::descriptor::DependencyId;
use crate::container::ioc_container::Container;
use crate::errors::ResolveError;

/// Type-erased instance. The concrete value is always the `Arc<T>` handed out by `get`,
/// so clones of a cached instance share one allocation.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// Provider with its produced type erased
pub(crate) type ErasedProvider =
    Arc<dyn Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync>;

/// Post-init hook with its instance type erased
pub(crate) type ErasedHook =
    Arc<dyn Fn(&Container, &Instance) -> Result<(), ResolveError> + Send + Sync>;

/// Produces one instance of `T` when invoked with the resolving container.
///
/// Providers may request other dependencies from the container, which is how
/// transitive dependencies are expressed. A provider should create a new
/// instance each time; caching is the container's job.
pub trait Provider<T: ?Sized>: Send + Sync {
    fn provide(&self, container: &Container) -> Result<Arc<T>, ResolveError>;
}

impl<T, F> Provider<T> for F
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync,
{
    fn provide(&self, container: &Container) -> Result<Arc<T>, ResolveError> {
        self(container)
    }
}

/// Callback run once after every eagerly constructed dependency exists.
///
/// Used to patch references that could not be supplied at construction time,
/// which is how reference cycles between services are closed.
pub trait PostInit<T: ?Sized>: Send + Sync {
    fn on_post_init(&self, container: &Container, instance: Arc<T>) -> Result<(), ResolveError>;
}

impl<T, F> PostInit<T> for F
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Container, Arc<T>) -> Result<(), ResolveError> + Send + Sync,
{
    fn on_post_init(&self, container: &Container, instance: Arc<T>) -> Result<(), ResolveError> {
        self(container, instance)
    }
}

pub(crate) fn erase_provider<T, P>(provider: P) -> ErasedProvider
where
    T: ?Sized + Send + Sync + 'static,
    P: Provider<T> + 'static,
{
    Arc::new(move |container: &Container| -> Result<Instance, ResolveError> {
        let instance = provider.provide(container)?;
        Ok(Arc::new(instance) as Instance)
    })
}

pub(crate) fn erase_hook<T, H>(id: DependencyId, hook: H) -> ErasedHook
where
    T: ?Sized + Send + Sync + 'static,
    H: PostInit<T> + 'static,
{
    Arc::new(move |container: &Container, instance: &Instance| -> Result<(), ResolveError> {
        let typed = downcast_instance::<T>(&id, instance)?;
        hook.on_post_init(container, typed)
    })
}

pub(crate) fn downcast_instance<T>(id: &DependencyId, instance: &Instance) -> Result<Arc<T>, ResolveError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ResolveError::TypeMismatch {
            id: id.clone(),
            expected: std::any::type_name::<T>(),
        })
}
