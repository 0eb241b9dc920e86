pub mod autowiring;
pub mod builder;
pub mod debug;
pub mod descriptor;
pub mod ioc_container;
pub mod lazy;
pub mod module;
pub mod provider;
pub mod resolution;

pub use autowiring::{
    select_constructor, synthesize, Autowire, Constructor, ConstructorArgs, ConstructorParameter,
    Implements, Named, ParamName,
};
pub use builder::Resolver;
pub use debug::{ContainerReport, Diagnostic, RegistrationEntry, RegistrationKind, ResolverReport};
pub use descriptor::{DependencyId, TypeKey};
pub use ioc_container::Container;
pub use lazy::Lazy;
pub use module::Module;
pub use provider::{PostInit, Provider};
pub use resolution::ResolutionPath;
