use crate::container::builder::Resolver;

/// A reusable group of registrations
///
/// ```ignore
/// struct StorageModule;
///
/// impl Module for StorageModule {
///     fn configure(&self, resolver: &mut Resolver) {
///         resolver.autowire::<Database>().autowire::<Repository>();
///     }
/// }
///
/// resolver.install(&StorageModule);
/// ```
pub trait Module {
    /// Get module name (defaults to type name)
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Register this module's dependencies
    fn configure(&self, resolver: &mut Resolver);
}

impl<F> Module for F
where
    F: Fn(&mut Resolver),
{
    fn configure(&self, resolver: &mut Resolver) {
        self(resolver)
    }
}
