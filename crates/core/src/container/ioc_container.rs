use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::config::ResolverConfig;
use crate::container::debug::ContainerReport;
use crate::container::descriptor::DependencyId;
use crate::container::lazy::{Lazy, LazyMode};
use crate::container::provider::{downcast_instance, ErasedHook, ErasedProvider, Instance};
use crate::container::resolution::{Frame, InFlight, ResolutionPath};
use crate::errors::ResolveError;

/// Resolved dependency graph produced by [`Resolver::resolve`](crate::container::Resolver::resolve).
///
/// The provider table is a snapshot taken at resolve time and never changes.
/// Every registered dependency is constructed before the container is handed
/// out, so `get` on a registered identity only reads the cache. Cloning is
/// cheap and clones share the same cache.
///
/// The handle a provider receives remembers what was under construction when
/// the provider was called. A thread the provider starts can resolve through a
/// clone of that handle and still take part in cycle detection.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
    frame: Option<Arc<Frame>>,
}

pub(crate) struct ContainerInner {
    providers: IndexMap<DependencyId, ErasedProvider>,
    post_init_hooks: Vec<(DependencyId, ErasedHook)>,
    cache: RwLock<HashMap<DependencyId, Instance>>,
    in_flight: InFlight,
    config: ResolverConfig,
}

impl Container {
    pub(crate) fn from_parts(
        providers: IndexMap<DependencyId, ErasedProvider>,
        post_init_hooks: Vec<(DependencyId, ErasedHook)>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                providers,
                post_init_hooks,
                cache: RwLock::new(HashMap::new()),
                in_flight: InFlight::new(),
                config,
            }),
            frame: None,
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner, frame: None }
    }

    /// Construct every registered dependency, then run the post-init hooks
    pub(crate) fn initialize(&self) -> Result<(), ResolveError> {
        for id in self.inner.providers.keys() {
            if self.cached(id)?.is_none() {
                self.get_instance(id)?;
            }
        }

        tracing::debug!(
            dependencies = self.inner.providers.len(),
            "Finished initialization of dependencies"
        );

        for (id, hook) in &self.inner.post_init_hooks {
            let instance = self.get_instance(id)?;
            tracing::trace!(dependency = %id, "running post-init hook");
            hook(self, &instance)?;
        }

        Ok(())
    }

    /// Get the cached instance of `T`, constructing it on first use
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.get_by_id(&DependencyId::of::<T>())
    }

    /// Get the cached instance of `T` registered under `name`
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ResolveError> {
        self.get_by_id(&DependencyId::named::<T>(name))
    }

    pub fn get_by_id<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: &DependencyId,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.get_instance(id)?;
        downcast_instance::<T>(id, &instance)
    }

    /// Create a new instance of `T` without touching the cache.
    ///
    /// Transitive dependencies requested with `get` by the provider still come
    /// from the cache.
    pub fn create<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.create_by_id(&DependencyId::of::<T>())
    }

    pub fn create_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ResolveError> {
        self.create_by_id(&DependencyId::named::<T>(name))
    }

    pub fn create_by_id<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: &DependencyId,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.create_instance(id)?;
        downcast_instance::<T>(id, &instance)
    }

    /// Every dependency declared with type `T`, whatever its name, in registration order
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveError> {
        Ok(self
            .get_all_named::<T>()?
            .into_iter()
            .map(|(_, instance)| instance)
            .collect())
    }

    /// Same as [`Container::get_all`], keeping the identity of each instance
    pub fn get_all_named<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<(DependencyId, Arc<T>)>, ResolveError> {
        let ids: Vec<DependencyId> = self
            .inner
            .providers
            .keys()
            .filter(|id| id.is_type::<T>())
            .cloned()
            .collect();

        ids.into_iter()
            .map(|id| {
                let instance = self.get_by_id::<T>(&id)?;
                Ok((id, instance))
            })
            .collect()
    }

    /// `Ok(None)` when nothing is registered for `T`; resolution errors still propagate
    pub fn find<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ResolveError> {
        self.find_by_id(&DependencyId::of::<T>())
    }

    pub fn find_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        self.find_by_id(&DependencyId::named::<T>(name))
    }

    fn find_by_id<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: &DependencyId,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        if !self.contains(id) {
            return Ok(None);
        }
        self.get_by_id(id).map(Some)
    }

    /// Handle that performs `get` only when invoked
    pub fn lazy_get<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        self.lazy(DependencyId::of::<T>(), LazyMode::Get)
    }

    pub fn lazy_get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Lazy<T> {
        self.lazy(DependencyId::named::<T>(name), LazyMode::Get)
    }

    /// Handle that performs `create` each time it is invoked
    pub fn lazy_create<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        self.lazy(DependencyId::of::<T>(), LazyMode::Create)
    }

    pub fn lazy_create_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Lazy<T> {
        self.lazy(DependencyId::named::<T>(name), LazyMode::Create)
    }

    fn lazy<T: ?Sized + Send + Sync + 'static>(&self, id: DependencyId, mode: LazyMode) -> Lazy<T> {
        Lazy::new(Arc::downgrade(&self.inner), id, mode)
    }

    /// Check if a provider is registered for `id`
    pub fn contains(&self, id: &DependencyId) -> bool {
        self.inner.providers.contains_key(id)
    }

    /// Registered identities in registration order
    pub fn registered_ids(&self) -> impl Iterator<Item = &DependencyId> {
        self.inner.providers.keys()
    }

    /// Check if an instance of `id` is cached
    pub fn is_cached(&self, id: &DependencyId) -> bool {
        matches!(self.cached(id), Ok(Some(_)))
    }

    /// Identities under construction on the calling thread, outermost first.
    /// Includes frames inherited from the provider that started this thread.
    pub fn resolution_path(&self) -> ResolutionPath {
        self.inner.in_flight.current_path()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// Snapshot of what this container holds
    pub fn report(&self) -> ContainerReport {
        let cached = self
            .inner
            .providers
            .keys()
            .filter(|id| self.is_cached(id))
            .cloned()
            .collect();

        ContainerReport {
            registered: self.inner.providers.keys().cloned().collect(),
            cached,
            post_init_hooks: self
                .inner
                .post_init_hooks
                .iter()
                .map(|(id, _)| id.clone())
                .collect(),
            idle: self.inner.in_flight.is_idle(),
        }
    }

    fn get_instance(&self, id: &DependencyId) -> Result<Instance, ResolveError> {
        if let Some(instance) = self.cached(id)? {
            return Ok(instance);
        }

        let created = self.create_instance(id)?;

        let mut cache = self
            .inner
            .cache
            .write()
            .map_err(|_| ResolveError::lock_poisoned("dependency_cache"))?;

        // If another thread cached the same identity meanwhile, its instance wins.
        Ok(cache.entry(id.clone()).or_insert(created).clone())
    }

    fn create_instance(&self, id: &DependencyId) -> Result<Instance, ResolveError> {
        let guard = self.inner.in_flight.enter(
            id,
            self.inner.config.max_resolution_depth,
            self.frame.as_deref(),
        )?;

        let provider = self.inner.providers.get(id).cloned().ok_or_else(|| {
            ResolveError::missing_provider(id.clone(), self.inner.providers.keys().cloned().collect())
        })?;

        tracing::trace!(dependency = %id, "constructing dependency");
        let scoped = Container {
            inner: self.inner.clone(),
            frame: Some(guard.frame()),
        };
        provider(&scoped)
    }

    fn cached(&self, id: &DependencyId) -> Result<Option<Instance>, ResolveError> {
        let cache = self
            .inner
            .cache
            .read()
            .map_err(|_| ResolveError::lock_poisoned("dependency_cache"))?;
        Ok(cache.get(id).cloned())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.inner.cache.read().map(|cache| cache.len()).unwrap_or(0);

        f.debug_struct("Container")
            .field("registered", &self.inner.providers.keys().collect::<Vec<_>>())
            .field("cached", &cached)
            .field("post_init_hooks", &self.inner.post_init_hooks.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::provider::erase_provider;

    #[derive(Debug)]
    struct Config {
        port: u16,
    }

    fn container_with_config() -> Container {
        let mut providers = IndexMap::new();
        providers.insert(
            DependencyId::of::<Config>(),
            erase_provider::<Config, _>(|_: &Container| -> Result<Arc<Config>, ResolveError> {
                Ok(Arc::new(Config { port: 8080 }))
            }),
        );
        Container::from_parts(providers, Vec::new(), ResolverConfig::default())
    }

    #[test]
    fn test_get_caches_lazily_before_initialize() {
        let container = container_with_config();
        let id = DependencyId::of::<Config>();

        assert!(!container.is_cached(&id));
        let config = container.get::<Config>().unwrap();
        assert_eq!(config.port, 8080);
        assert!(container.is_cached(&id));
    }

    #[test]
    fn test_initialize_fills_cache() {
        let container = container_with_config();
        container.initialize().unwrap();

        let report = container.report();
        assert_eq!(report.registered, report.cached);
        assert!(report.idle);
    }

    #[test]
    fn test_missing_provider_leaves_no_in_flight_entry() {
        let container = container_with_config();

        let error = container.get::<String>().unwrap_err();
        assert!(error.is_missing_provider());
        assert!(container.resolution_path().is_empty());
    }

    #[test]
    fn test_get_by_id_with_wrong_type() {
        let container = container_with_config();

        let result = container.get_by_id::<String>(&DependencyId::of::<Config>());
        assert!(matches!(result, Err(ResolveError::TypeMismatch { .. })));
    }

    #[test]
    fn test_find_unregistered_is_none() {
        let container = container_with_config();

        assert!(container.find::<String>().unwrap().is_none());
        assert!(container.find::<Config>().unwrap().is_some());
    }
}
