use thiserror::Error;

use crate::container::descriptor::DependencyId;

/// Boxed error used as the `source` of construction failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error raised while resolving or querying the dependency graph
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "Unable to find a registered dependency provider for {id}. Registered providers: {}",
        join_ids(.registered)
    )]
    MissingDependencyProvider {
        id: DependencyId,
        registered: Vec<DependencyId>,
    },

    #[error(
        "Circular dependency detected while initializing {}. Dependency chain: {}",
        last_id(.chain),
        join_chain(.chain)
    )]
    CircularDependency { chain: Vec<DependencyId> },

    #[error(
        "Unable to find a constructor in {type_name} with parameters that match registered dependencies. {}",
        describe_mismatches(.constructors)
    )]
    NoMatchingConstructor {
        type_name: &'static str,
        constructors: Vec<ConstructorMismatch>,
    },

    #[error(
        "Found multiple constructors on {type_name} with the same parameter count whose parameters all match registered dependencies: {first} and {second}"
    )]
    MultipleMatchingConstructors {
        type_name: &'static str,
        first: String,
        second: String,
    },

    #[error("Found multiple preferred constructors on {type_name}: {first} and {second}")]
    MultiplePreferredConstructors {
        type_name: &'static str,
        first: String,
        second: String,
    },

    #[error("Failed to inject into constructor {signature} of {type_name}: {source}")]
    ConstructorInjectionFailed {
        type_name: &'static str,
        signature: String,
        source: BoxError,
    },

    #[error("Resolver is already resolving; concurrent or re-entrant resolve() calls are rejected")]
    AlreadyResolving,

    #[error("Provider for {} failed: {source}", display_optional(.id))]
    ProviderFailed {
        id: Option<DependencyId>,
        source: BoxError,
    },

    #[error("Resolution depth limit of {depth} exceeded while resolving {id}")]
    ResolutionDepthExceeded { id: DependencyId, depth: usize },

    #[error("Container was dropped before the lazy dependency {id} was requested")]
    ContainerDropped { id: DependencyId },

    #[error("Instance registered for {id} is not of the requested type {expected}")]
    TypeMismatch {
        id: DependencyId,
        expected: &'static str,
    },

    #[error("Lock error on resource: {resource}")]
    LockPoisoned { resource: String },
}

/// A constructor rejected during auto-wiring, with the parameters nothing was registered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorMismatch {
    pub signature: String,
    pub missing: Vec<DependencyId>,
}

impl ResolveError {
    /// Create a missing provider error
    pub fn missing_provider(id: DependencyId, registered: Vec<DependencyId>) -> Self {
        Self::MissingDependencyProvider { id, registered }
    }

    /// Create a circular dependency error from the chain, closing id included
    pub fn circular(chain: Vec<DependencyId>) -> Self {
        Self::CircularDependency { chain }
    }

    /// Wrap an error raised by a user provider or post-init hook
    pub fn provider_failed(source: impl Into<BoxError>) -> Self {
        Self::ProviderFailed {
            id: None,
            source: source.into(),
        }
    }

    /// Same as [`ResolveError::provider_failed`], naming the failing identity
    pub fn provider_failed_for(id: DependencyId, source: impl Into<BoxError>) -> Self {
        Self::ProviderFailed {
            id: Some(id),
            source: source.into(),
        }
    }

    /// Create a lock error
    pub fn lock_poisoned(resource: impl Into<String>) -> Self {
        Self::LockPoisoned {
            resource: resource.into(),
        }
    }

    /// The ordered dependency chain of a circular dependency error
    pub fn chain(&self) -> Option<&[DependencyId]> {
        match self {
            Self::CircularDependency { chain } => Some(chain),
            _ => None,
        }
    }

    /// Check if the error is a circular dependency error
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// Check if the error is a missing provider error
    pub fn is_missing_provider(&self) -> bool {
        matches!(self, Self::MissingDependencyProvider { .. })
    }

    /// Errors fixed by changing registrations rather than service code
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingDependencyProvider { .. }
                | Self::CircularDependency { .. }
                | Self::NoMatchingConstructor { .. }
                | Self::MultipleMatchingConstructors { .. }
                | Self::MultiplePreferredConstructors { .. }
                | Self::ResolutionDepthExceeded { .. }
        )
    }

    /// Errors raised by the code that builds a service
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            Self::ConstructorInjectionFailed { .. } | Self::ProviderFailed { .. }
        )
    }
}

fn join_ids(ids: &[DependencyId]) -> String {
    ids.iter()
        .map(DependencyId::to_key)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_chain(chain: &[DependencyId]) -> String {
    chain
        .iter()
        .map(DependencyId::to_key)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn last_id(chain: &[DependencyId]) -> String {
    chain
        .last()
        .map(DependencyId::to_key)
        .unwrap_or_else(|| "<empty chain>".to_string())
}

fn display_optional(id: &Option<DependencyId>) -> String {
    id.as_ref()
        .map(DependencyId::to_key)
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn describe_mismatches(constructors: &[ConstructorMismatch]) -> String {
    if constructors.is_empty() {
        return "The type declares no constructors that can be used for injection".to_string();
    }

    let listed = constructors
        .iter()
        .map(|c| format!("{} is missing the parameters [{}]", c.signature, join_ids(&c.missing)))
        .collect::<Vec<_>>()
        .join("; ");

    format!("Available constructors: {}", listed)
}
