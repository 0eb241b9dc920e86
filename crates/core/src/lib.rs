pub mod config;
pub mod container;
pub mod errors;

// Re-export key types for convenience
pub use config::{ConfigError, ResolverConfig};
pub use container::{
    Autowire, Constructor, Container, ContainerReport, DependencyId, Diagnostic, Implements, Lazy,
    Module, Named, ParamName, PostInit, Provider, Resolver, ResolverReport, TypeKey,
};
pub use errors::{BoxError, ResolveError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "wirebox";

/// Get library version
pub fn version() -> &'static str {
    VERSION
}

/// Get library name
pub fn name() -> &'static str {
    NAME
}
