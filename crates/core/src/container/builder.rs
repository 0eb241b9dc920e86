use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::ResolverConfig;
use crate::container::autowiring::{synthesize, Autowire, Constructor, Implements};
use crate::container::debug::{
    Diagnostic, RegistrationEntry, RegistrationKind, ResolverReport,
};
use crate::container::descriptor::DependencyId;
use crate::container::ioc_container::Container;
use crate::container::module::Module;
use crate::container::provider::{erase_hook, erase_provider, ErasedHook, ErasedProvider, PostInit, Provider};
use crate::errors::ResolveError;

type ExpandFn =
    Arc<dyn Fn(&HashSet<DependencyId>) -> Result<ErasedProvider, ResolveError> + Send + Sync>;

/// Deferred auto-wiring: the constructor is only chosen once every identity is known
#[derive(Clone)]
struct AutowireMarker {
    implementation: &'static str,
    expand: ExpandFn,
}

#[derive(Clone)]
enum Registration {
    Provider(ErasedProvider),
    Autowired(AutowireMarker),
}

impl Registration {
    fn kind(&self) -> RegistrationKind {
        match self {
            Registration::Provider(_) => RegistrationKind::Provider,
            Registration::Autowired(_) => RegistrationKind::Autowired,
        }
    }
}

/// Accumulates registrations and turns them into a [`Container`].
///
/// Registering an identity twice replaces the first registration (last write
/// wins) but keeps its position in registration order. The resolver can be
/// resolved any number of times; every container it produces is independent
/// of the resolver and of every other container.
pub struct Resolver {
    registrations: IndexMap<DependencyId, Registration>,
    post_init_hooks: IndexMap<DependencyId, ErasedHook>,
    diagnostics: Vec<Diagnostic>,
    config: ResolverConfig,
    resolving: AtomicBool,
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            registrations: IndexMap::new(),
            post_init_hooks: IndexMap::new(),
            diagnostics: Vec::new(),
            config,
            resolving: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Register a provider for `T`
    pub fn register<T>(
        &mut self,
        provider: impl Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_provider::<T, _>(None, provider, None)
    }

    /// Register a provider for `T` under `name`
    pub fn register_named<T>(
        &mut self,
        name: &str,
        provider: impl Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_provider::<T, _>(Some(name), provider, None)
    }

    /// Register a provider for `T` and a hook run once the whole graph is constructed
    pub fn register_with_post_init<T>(
        &mut self,
        provider: impl Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
        hook: impl Fn(&Container, Arc<T>) -> Result<(), ResolveError> + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_provider::<T, _>(None, provider, Some(Arc::new(hook)))
    }

    pub fn register_named_with_post_init<T>(
        &mut self,
        name: &str,
        provider: impl Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
        hook: impl Fn(&Container, Arc<T>) -> Result<(), ResolveError> + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_provider::<T, _>(Some(name), provider, Some(Arc::new(hook)))
    }

    /// Register any [`Provider`] for `T`, optionally named and with a post-init hook.
    ///
    /// Registering without a hook leaves an earlier hook for the same identity in place.
    pub fn register_provider<T, P>(
        &mut self,
        name: Option<&str>,
        provider: P,
        hook: Option<Arc<dyn PostInit<T>>>,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        P: Provider<T> + 'static,
    {
        let id = DependencyId::with_name::<T>(name);

        self.insert_registration(id.clone(), Registration::Provider(erase_provider::<T, P>(provider)));

        if let Some(hook) = hook {
            let hook = erase_hook::<T, _>(
                id.clone(),
                move |container: &Container, instance: Arc<T>| -> Result<(), ResolveError> {
                    hook.on_post_init(container, instance)
                },
            );
            self.insert_hook(id, hook);
        }

        self
    }

    /// Register a single shared value; `get` and `create` both return it
    pub fn register_value<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        let value = Arc::new(value);
        self.register::<T>(move |_| Ok(value.clone()))
    }

    pub fn register_named_value<T: Send + Sync + 'static>(&mut self, name: &str, value: T) -> &mut Self {
        let value = Arc::new(value);
        self.register_named::<T>(name, move |_| Ok(value.clone()))
    }

    /// Register a provider that needs nothing from the container
    pub fn register_supplier<T: Send + Sync + 'static>(
        &mut self,
        supplier: impl Fn() -> T + Send + Sync + 'static,
    ) -> &mut Self {
        self.register::<T>(move |_| Ok(Arc::new(supplier())))
    }

    pub fn register_named_supplier<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        supplier: impl Fn() -> T + Send + Sync + 'static,
    ) -> &mut Self {
        self.register_named::<T>(name, move |_| Ok(Arc::new(supplier())))
    }

    /// Let the container pick a constructor of `T` at resolve time
    pub fn autowire<T: Autowire>(&mut self) -> &mut Self {
        self.autowire_as::<T, T>(None, std::convert::identity)
    }

    pub fn autowire_named<T: Autowire>(&mut self, name: &str) -> &mut Self {
        self.autowire_as::<T, T>(Some(name), std::convert::identity)
    }

    /// Auto-wire `T` but register it under the interface `S`
    pub fn bind<S, T>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Autowire + Implements<S>,
    {
        self.autowire_as::<S, T>(None, <T as Implements<S>>::upcast)
    }

    pub fn bind_named<S, T>(&mut self, name: &str) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Autowire + Implements<S>,
    {
        self.autowire_as::<S, T>(Some(name), <T as Implements<S>>::upcast)
    }

    fn autowire_as<S, T>(&mut self, name: Option<&str>, upcast: fn(Arc<T>) -> Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Autowire,
    {
        let expand: ExpandFn = Arc::new(
            move |resolvable: &HashSet<DependencyId>| -> Result<ErasedProvider, ResolveError> {
                let constructor = synthesize::<T>(resolvable)?;
                tracing::trace!(constructor = constructor.signature(), "selected constructor");
                Ok(autowired_provider(constructor, upcast))
            },
        );

        let marker = AutowireMarker {
            implementation: std::any::type_name::<T>(),
            expand,
        };

        self.insert_registration(DependencyId::with_name::<S>(name), Registration::Autowired(marker));
        self
    }

    /// Run a closure that registers a group of dependencies
    pub fn register_module(&mut self, module: impl FnOnce(&mut Resolver)) -> &mut Self {
        module(self);
        self
    }

    pub fn install<M: Module + ?Sized>(&mut self, module: &M) -> &mut Self {
        let before = self.registrations.len();
        module.configure(self);

        tracing::info!(
            module = module.name(),
            added = self.registrations.len().saturating_sub(before),
            "installed module"
        );
        self
    }

    /// Merge every registration and hook of `other` into this resolver.
    ///
    /// Existing identities are overwritten. Diagnostics of `other` are not copied.
    pub fn copy_from(&mut self, other: &Resolver) -> &mut Self {
        for (id, registration) in &other.registrations {
            self.insert_registration(id.clone(), registration.clone());
        }
        for (id, hook) in &other.post_init_hooks {
            self.insert_hook(id.clone(), hook.clone());
        }
        self
    }

    pub fn copy_from_with(&mut self, build: impl FnOnce() -> Resolver) -> &mut Self {
        let other = build();
        self.copy_from(&other)
    }

    pub fn contains(&self, id: &DependencyId) -> bool {
        self.registrations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registered identities in registration order
    pub fn registered_ids(&self) -> impl Iterator<Item = &DependencyId> {
        self.registrations.keys()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Build a container and construct every registered dependency.
    ///
    /// Fails with [`ResolveError::AlreadyResolving`] if another `resolve` on this
    /// resolver is still running. Any construction or hook failure aborts the
    /// whole call; the resolver is left untouched and can be resolved again.
    pub fn resolve(&self) -> Result<Container, ResolveError> {
        let _guard = ResolvingGuard::acquire(&self.resolving)?;

        let resolvable: HashSet<DependencyId> = self.registrations.keys().cloned().collect();

        let mut providers = IndexMap::with_capacity(self.registrations.len());
        for (id, registration) in &self.registrations {
            let provider = match registration {
                Registration::Provider(provider) => provider.clone(),
                Registration::Autowired(marker) => (marker.expand)(&resolvable)?,
            };
            providers.insert(id.clone(), provider);
        }

        let hooks = self
            .post_init_hooks
            .iter()
            .map(|(id, hook)| (id.clone(), hook.clone()))
            .collect::<Vec<_>>();

        tracing::debug!(
            dependencies = providers.len(),
            post_init_hooks = hooks.len(),
            "resolving dependencies"
        );

        let container = Container::from_parts(providers, hooks, self.config.clone());
        container.initialize()?;
        Ok(container)
    }

    pub fn report(&self) -> ResolverReport {
        ResolverReport {
            registrations: self
                .registrations
                .iter()
                .map(|(id, registration)| RegistrationEntry {
                    id: id.clone(),
                    kind: registration.kind(),
                    implementation: match registration {
                        Registration::Autowired(marker) => Some(marker.implementation),
                        Registration::Provider(_) => None,
                    },
                })
                .collect(),
            post_init_hooks: self.post_init_hooks.keys().cloned().collect(),
            diagnostics: self.diagnostics.clone(),
            config: self.config.clone(),
        }
    }

    fn insert_registration(&mut self, id: DependencyId, registration: Registration) {
        let kind = registration.kind();
        if self.registrations.insert(id.clone(), registration).is_some() {
            self.record_overwrite(Diagnostic::ProviderOverwritten { id });
        } else {
            tracing::debug!(dependency = %id, ?kind, "registered dependency");
        }
    }

    fn insert_hook(&mut self, id: DependencyId, hook: ErasedHook) {
        if self.post_init_hooks.insert(id.clone(), hook).is_some() {
            self.record_overwrite(Diagnostic::PostInitHookOverwritten { id });
        }
    }

    fn record_overwrite(&mut self, diagnostic: Diagnostic) {
        if self.config.warn_on_overwrite {
            tracing::warn!(dependency = %diagnostic.id(), "{}", diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registrations", &self.registrations.keys().collect::<Vec<_>>())
            .field("post_init_hooks", &self.post_init_hooks.keys().collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics)
            .field("config", &self.config)
            .finish()
    }
}

fn autowired_provider<S, T>(constructor: Constructor<T>, upcast: fn(Arc<T>) -> Arc<S>) -> ErasedProvider
where
    S: ?Sized + Send + Sync + 'static,
    T: Autowire,
{
    erase_provider::<S, _>(move |container: &Container| -> Result<Arc<S>, ResolveError> {
        let instance = constructor.construct(container)?;
        Ok(upcast(Arc::new(instance)))
    })
}

/// Holds the resolving flag of a resolver until dropped
struct ResolvingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ResolvingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ResolveError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ResolveError::AlreadyResolving)?;
        Ok(Self { flag })
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
