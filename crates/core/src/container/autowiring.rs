//! Constructor metadata and the best-fit constructor search used by auto-wiring.
//!
//! Rust has no runtime reflection, so a type opts into auto-wiring by
//! implementing [`Autowire`] and listing its constructors explicitly. Each
//! [`Constructor`] knows the identities of its parameters, which is all the
//! search needs.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::container::descriptor::DependencyId;
use crate::container::ioc_container::Container;
use crate::errors::{BoxError, ConstructorMismatch, ResolveError};

/// A value a constructor can ask the container for
pub trait ConstructorParameter: Sized + Send + Sync + 'static {
    /// The identity this parameter resolves
    fn dependency_id() -> DependencyId;

    /// Resolve this parameter from the container
    fn resolve(container: &Container) -> Result<Self, ResolveError>;
}

/// Parameters are always fetched with `get`, so they share the cached instance
impl<T: ?Sized + Send + Sync + 'static> ConstructorParameter for Arc<T> {
    fn dependency_id() -> DependencyId {
        DependencyId::of::<T>()
    }

    fn resolve(container: &Container) -> Result<Self, ResolveError> {
        container.get::<T>()
    }
}

/// Name a [`Named`] constructor parameter is registered under.
///
/// Usually declared with the [`param_name!`](crate::param_name) macro.
pub trait ParamName: Send + Sync + 'static {
    const NAME: &'static str;
}

/// Declare a [`ParamName`] marker type
///
/// ```ignore
/// wirebox_core::param_name!(pub Primary = "primary");
/// ```
#[macro_export]
macro_rules! param_name {
    ($vis:vis $marker:ident = $name:expr) => {
        $vis struct $marker;

        impl $crate::container::ParamName for $marker {
            const NAME: &'static str = $name;
        }
    };
}

/// Constructor parameter resolved from the identity of `T` named `N::NAME`
pub struct Named<T: ?Sized, N> {
    instance: Arc<T>,
    _name: PhantomData<fn() -> N>,
}

impl<T: ?Sized, N: ParamName> Named<T, N> {
    pub fn new(instance: Arc<T>) -> Self {
        Self {
            instance,
            _name: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        N::NAME
    }

    pub fn into_inner(self) -> Arc<T> {
        self.instance
    }
}

impl<T: ?Sized, N> Deref for Named<T, N> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T: ?Sized, N> Clone for Named<T, N> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            _name: PhantomData,
        }
    }
}

impl<T: ?Sized, N: ParamName> fmt::Debug for Named<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Named")
            .field("type", &std::any::type_name::<T>())
            .field("name", &N::NAME)
            .finish()
    }
}

impl<T: ?Sized + Send + Sync + 'static, N: ParamName> ConstructorParameter for Named<T, N> {
    fn dependency_id() -> DependencyId {
        DependencyId::named::<T>(N::NAME)
    }

    fn resolve(container: &Container) -> Result<Self, ResolveError> {
        container.get_named::<T>(N::NAME).map(Self::new)
    }
}

/// Ordered parameter list of a constructor, implemented for tuples of up to eight parameters
pub trait ConstructorArgs: Sized + 'static {
    fn parameters() -> Vec<DependencyId>;

    fn resolve(container: &Container) -> Result<Self, ResolveError>;
}

macro_rules! impl_constructor_args {
    ($($param:ident),*) => {
        impl<$($param: ConstructorParameter),*> ConstructorArgs for ($($param,)*) {
            fn parameters() -> Vec<DependencyId> {
                vec![$($param::dependency_id()),*]
            }

            #[allow(unused_variables)]
            fn resolve(container: &Container) -> Result<Self, ResolveError> {
                Ok(($($param::resolve(container)?,)*))
            }
        }
    };
}

impl_constructor_args!();
impl_constructor_args!(A);
impl_constructor_args!(A, B);
impl_constructor_args!(A, B, C);
impl_constructor_args!(A, B, C, D);
impl_constructor_args!(A, B, C, D, E);
impl_constructor_args!(A, B, C, D, E, F);
impl_constructor_args!(A, B, C, D, E, F, G);
impl_constructor_args!(A, B, C, D, E, F, G, H);

type ConstructFn<T> = Arc<dyn Fn(&Container) -> Result<T, ResolveError> + Send + Sync>;

/// One way of building `T` out of dependencies
pub struct Constructor<T> {
    signature: String,
    parameters: Vec<DependencyId>,
    construct: ConstructFn<T>,
    preferred: bool,
}

impl<T: Send + Sync + 'static> Constructor<T> {
    /// Declare a fallible constructor.
    ///
    /// Failing to resolve a parameter propagates unchanged; an `Err` from the
    /// body itself becomes [`ResolveError::ConstructorInjectionFailed`].
    pub fn new<A, F, E>(body: F) -> Self
    where
        A: ConstructorArgs,
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let parameters = A::parameters();
        let signature = signature_of::<T>(&parameters);
        let failing_signature = signature.clone();

        let construct: ConstructFn<T> = Arc::new(move |container: &Container| -> Result<T, ResolveError> {
            let args = A::resolve(container)?;
            body(args).map_err(|error| ResolveError::ConstructorInjectionFailed {
                type_name: std::any::type_name::<T>(),
                signature: failing_signature.clone(),
                source: error.into(),
            })
        });

        Self {
            signature,
            parameters,
            construct,
            preferred: false,
        }
    }

    /// Declare a constructor that cannot fail
    pub fn infallible<A, F>(body: F) -> Self
    where
        A: ConstructorArgs,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::new(move |args: A| Ok::<T, Infallible>(body(args)))
    }
}

impl<T> Constructor<T> {
    /// Mark this constructor as the one to use.
    ///
    /// A preferred constructor is chosen over every other constructor of the
    /// type, whatever their arity.
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    pub fn is_preferred(&self) -> bool {
        self.preferred
    }

    /// Human readable signature, e.g. `app::ServiceF(app::ServiceD, app::Config)`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn parameters(&self) -> &[DependencyId] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Check if every parameter is in `resolvable`
    pub fn is_satisfied_by(&self, resolvable: &HashSet<DependencyId>) -> bool {
        self.parameters.iter().all(|p| resolvable.contains(p))
    }

    /// Parameters missing from `resolvable`
    pub fn missing(&self, resolvable: &HashSet<DependencyId>) -> Vec<DependencyId> {
        self.parameters
            .iter()
            .filter(|p| !resolvable.contains(*p))
            .cloned()
            .collect()
    }

    /// Resolve the parameters with `get` and run the constructor
    pub fn construct(&self, container: &Container) -> Result<T, ResolveError> {
        (self.construct)(container)
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            parameters: self.parameters.clone(),
            construct: self.construct.clone(),
            preferred: self.preferred,
        }
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("signature", &self.signature)
            .field("parameters", &self.parameters)
            .field("preferred", &self.preferred)
            .finish()
    }
}

fn signature_of<T>(parameters: &[DependencyId]) -> String {
    let params = parameters
        .iter()
        .map(DependencyId::to_key)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({})", std::any::type_name::<T>(), params)
}

/// Types the container can build without an explicit provider
pub trait Autowire: Sized + Send + Sync + 'static {
    /// Every constructor the container may choose from
    fn constructors() -> Vec<Constructor<Self>>;
}

/// Upcast from an implementation to the interface it is bound under.
///
/// Usually implemented with the [`implements!`](crate::implements) macro.
pub trait Implements<S: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

/// Implement [`Implements`] for one interface and any number of implementations
///
/// ```ignore
/// wirebox_core::implements!(dyn Greeter: English, Spanish);
/// ```
#[macro_export]
macro_rules! implements {
    ($interface:ty: $($implementation:ty),+ $(,)?) => {
        $(
            impl $crate::container::Implements<$interface> for $implementation {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$interface> {
                    self
                }
            }
        )+
    };
}

/// Pick the constructor of `T` to use given the identities that can be resolved
pub fn synthesize<T: Autowire>(
    resolvable: &HashSet<DependencyId>,
) -> Result<Constructor<T>, ResolveError> {
    select_constructor(T::constructors(), resolvable)
}

/// Best-fit search: the highest arity constructor whose parameters are all
/// resolvable wins; two such constructors with the same arity are rejected.
///
/// A constructor marked [`Constructor::preferred`] is the only candidate when
/// present. Marking more than one is an error.
pub fn select_constructor<T>(
    mut constructors: Vec<Constructor<T>>,
    resolvable: &HashSet<DependencyId>,
) -> Result<Constructor<T>, ResolveError> {
    let mut preferred = constructors.iter().filter(|constructor| constructor.is_preferred());
    if let (Some(first), Some(second)) = (preferred.next(), preferred.next()) {
        return Err(ResolveError::MultiplePreferredConstructors {
            type_name: std::any::type_name::<T>(),
            first: first.signature().to_string(),
            second: second.signature().to_string(),
        });
    }
    if constructors.iter().any(Constructor::is_preferred) {
        constructors.retain(Constructor::is_preferred);
    }

    // Stable, so declaration order is kept between equal arities.
    constructors.sort_by(|a, b| b.arity().cmp(&a.arity()));

    let (matching, rejected): (Vec<_>, Vec<_>) = constructors
        .into_iter()
        .partition(|constructor| constructor.is_satisfied_by(resolvable));

    let mut matching = matching.into_iter();

    let Some(candidate) = matching.next() else {
        return Err(ResolveError::NoMatchingConstructor {
            type_name: std::any::type_name::<T>(),
            constructors: rejected
                .iter()
                .map(|constructor| ConstructorMismatch {
                    signature: constructor.signature().to_string(),
                    missing: constructor.missing(resolvable),
                })
                .collect(),
        });
    };

    if let Some(other) = matching.next() {
        if other.arity() == candidate.arity() {
            return Err(ResolveError::MultipleMatchingConstructors {
                type_name: std::any::type_name::<T>(),
                first: candidate.signature().to_string(),
                second: other.signature().to_string(),
            });
        }
    }

    Ok(candidate)
}
