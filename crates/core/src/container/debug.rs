//! Serializable snapshots of a resolver and a container, for logging and debugging.

use serde::Serialize;

use crate::config::ResolverConfig;
use crate::container::descriptor::DependencyId;

/// Something noteworthy that happened while registering, but is not an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A second provider replaced the first one for the same identity
    ProviderOverwritten { id: DependencyId },
    /// A second post-init hook replaced the first one for the same identity
    PostInitHookOverwritten { id: DependencyId },
}

impl Diagnostic {
    pub fn id(&self) -> &DependencyId {
        match self {
            Diagnostic::ProviderOverwritten { id } | Diagnostic::PostInitHookOverwritten { id } => id,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ProviderOverwritten { id } => {
                write!(f, "Provider for {} was overwritten", id)
            }
            Diagnostic::PostInitHookOverwritten { id } => {
                write!(f, "Post-init hook for {} was overwritten", id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Provider,
    Autowired,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationEntry {
    pub id: DependencyId,
    pub kind: RegistrationKind,
    /// Concrete type an auto-wired identity is built from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<&'static str>,
}

/// What a resolver would hand to `resolve`
#[derive(Debug, Clone, Serialize)]
pub struct ResolverReport {
    pub registrations: Vec<RegistrationEntry>,
    pub post_init_hooks: Vec<DependencyId>,
    pub diagnostics: Vec<Diagnostic>,
    pub config: ResolverConfig,
}

/// What a container holds right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerReport {
    pub registered: Vec<DependencyId>,
    pub cached: Vec<DependencyId>,
    pub post_init_hooks: Vec<DependencyId>,
    /// No identity is under construction on any thread
    pub idle: bool,
}

impl ResolverReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ContainerReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
