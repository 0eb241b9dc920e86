//! Integration tests for constructor selection during `resolve`

mod common;

use std::fmt;
use std::sync::Arc;

use common::*;
use wirebox_core::{Autowire, Constructor, DependencyId, Named, ResolveError, Resolver};

#[test]
fn test_resolves_with_constructor_injection() {
    let mut resolver = Resolver::new();
    resolver
        .autowire::<ServiceD>()
        .autowire::<Config>()
        .autowire::<ServiceF>();

    let container = resolver.resolve().unwrap();

    let f = container.get::<ServiceF>().unwrap();
    let d = container.get::<ServiceD>().unwrap();
    let config = container.get::<Config>().unwrap();

    assert_eq!(config.name, "autowired");
    assert!(Arc::ptr_eq(f.d.as_ref().unwrap(), &d));
    assert!(Arc::ptr_eq(f.config.as_ref().unwrap(), &config));
    assert!(Arc::ptr_eq(&d.config, &config));
}

#[test]
fn test_picks_best_constructor_for_what_is_registered() {
    let mut resolver = Resolver::new();
    resolver.autowire::<ServiceF>();
    let f = resolver.resolve().unwrap().get::<ServiceF>().unwrap();
    assert!(f.d.is_none() && f.config.is_none());

    resolver
        .register_supplier(|| Config::new("explicit"))
        .autowire::<ServiceD>();
    let f = resolver.resolve().unwrap().get::<ServiceF>().unwrap();
    assert_eq!(f.config.as_ref().unwrap().name, "explicit");
}

#[test]
fn test_constructor_without_parameters() {
    struct NoParameters;

    impl Autowire for NoParameters {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::infallible(|(): ()| NoParameters)]
        }
    }

    let mut resolver = Resolver::new();
    resolver.autowire::<NoParameters>();

    assert!(resolver.resolve().unwrap().get::<NoParameters>().is_ok());
}

#[test]
fn test_no_matching_constructor() {
    let mut resolver = Resolver::new();
    resolver.autowire::<ServiceD>();

    match resolver.resolve() {
        Err(ResolveError::NoMatchingConstructor {
            type_name,
            constructors,
        }) => {
            assert!(type_name.ends_with("ServiceD"));
            assert_eq!(constructors.len(), 1);
            assert_eq!(constructors[0].missing, vec![DependencyId::of::<Config>()]);
        }
        other => panic!("Expected NoMatchingConstructor, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_multiple_matching_constructors() {
    struct Twins;

    impl Autowire for Twins {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::infallible(|(_config,): (Arc<Config>,)| Twins),
                Constructor::infallible(|(_e,): (Arc<ServiceE>,)| Twins),
                Constructor::infallible(|(): ()| Twins),
            ]
        }
    }

    let mut resolver = Resolver::new();
    configs(&mut resolver);
    resolver.autowire::<Twins>();

    let error = resolver.resolve().unwrap_err();
    assert!(matches!(error, ResolveError::MultipleMatchingConstructors { .. }));
    assert!(error.is_configuration_error());
}

#[derive(Debug)]
struct InvalidName(String);

impl fmt::Display for InvalidName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid name: {:?}", self.0)
    }
}

impl std::error::Error for InvalidName {}

struct Validated;

impl Autowire for Validated {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|(config,): (Arc<Config>,)| {
            if config.name.is_empty() {
                return Err(InvalidName(config.name.clone()));
            }
            Ok(Validated)
        })]
    }
}

#[test]
fn test_constructor_failure_is_wrapped() {
    let mut resolver = Resolver::new();
    resolver
        .register_supplier(|| Config::new(""))
        .autowire::<Validated>();

    match resolver.resolve() {
        Err(ResolveError::ConstructorInjectionFailed {
            type_name,
            signature,
            source,
        }) => {
            assert!(type_name.ends_with("Validated"));
            assert!(signature.contains("Config"));
            assert!(source.downcast_ref::<InvalidName>().is_some());
        }
        other => panic!("Expected ConstructorInjectionFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_parameter_failure_is_not_wrapped() {
    let mut resolver = Resolver::new();
    resolver
        .autowire::<Validated>()
        .register::<Config>(|_| Err(ResolveError::provider_failed("no config file")));

    let error = resolver.resolve().unwrap_err();
    assert!(matches!(error, ResolveError::ProviderFailed { .. }));
}

#[test]
fn test_autowired_cycle_is_detected() {
    struct Left;
    struct Right;

    impl Autowire for Left {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::infallible(|(_right,): (Arc<Right>,)| Left)]
        }
    }

    impl Autowire for Right {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::infallible(|(_left,): (Arc<Left>,)| Right)]
        }
    }

    let mut resolver = Resolver::new();
    resolver.autowire::<Left>().autowire::<Right>();

    let error = resolver.resolve().unwrap_err();
    assert_eq!(
        error.chain().unwrap(),
        &[
            DependencyId::of::<Left>(),
            DependencyId::of::<Right>(),
            DependencyId::of::<Left>()
        ]
    );
}

#[test]
fn test_bind_and_autowire_named() {
    let mut resolver = Resolver::new();
    resolver
        .autowire_named::<Config>("primary")
        .bind::<dyn Greeter, English>();

    let container = resolver.resolve().unwrap();

    assert_eq!(container.get_named::<Config>("primary").unwrap().name, "autowired");
    assert!(container.find::<Config>().unwrap().is_none());
    assert_eq!(container.get_all::<dyn Greeter>().unwrap().len(), 1);
}

wirebox_core::param_name!(Primary = "primary");
wirebox_core::param_name!(Fallback = "fallback");

struct Mirror {
    primary: Named<Config, Primary>,
    fallback: Named<Config, Fallback>,
}

impl Autowire for Mirror {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::infallible(
            |(primary, fallback): (Named<Config, Primary>, Named<Config, Fallback>)| Mirror {
                primary,
                fallback,
            },
        )]
    }
}

#[test]
fn test_named_constructor_parameters() {
    let mut resolver = Resolver::new();
    resolver
        .register_named_supplier("primary", || Config::new("one"))
        .register_named_supplier("fallback", || Config::new("two"))
        .autowire::<Mirror>();

    let container = resolver.resolve().unwrap();
    let mirror = container.get::<Mirror>().unwrap();

    assert_eq!(mirror.primary.name, "one");
    assert_eq!(mirror.fallback.name, "two");
    assert_eq!(mirror.fallback.name(), "fallback");
    assert!(Arc::ptr_eq(
        &mirror.primary.clone().into_inner(),
        &container.get_named::<Config>("primary").unwrap()
    ));
}

#[test]
fn test_missing_named_parameter() {
    let mut resolver = Resolver::new();
    resolver
        .register_supplier(|| Config::new("unnamed"))
        .register_named_supplier("primary", || Config::new("one"))
        .autowire::<Mirror>();

    match resolver.resolve() {
        Err(ResolveError::NoMatchingConstructor { constructors, .. }) => {
            assert_eq!(
                constructors[0].missing,
                vec![DependencyId::named::<Config>("fallback")]
            );
        }
        other => panic!("Expected NoMatchingConstructor, got {:?}", other.map(|_| ())),
    }
}

struct Picky {
    config: Option<Arc<Config>>,
}

impl Autowire for Picky {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::infallible(|(config, _e): (Arc<Config>, Arc<ServiceE>)| Picky {
                config: Some(config),
            }),
            Constructor::infallible(|(): ()| Picky { config: None }).preferred(),
        ]
    }
}

#[test]
fn test_preferred_constructor_wins() {
    let mut resolver = Resolver::new();
    configs(&mut resolver);
    resolver.autowire::<Picky>();

    let picky = resolver.resolve().unwrap().get::<Picky>().unwrap();
    assert!(picky.config.is_none());
}

#[test]
fn test_multiple_preferred_constructors() {
    struct Indecisive;

    impl Autowire for Indecisive {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::infallible(|(_config,): (Arc<Config>,)| Indecisive).preferred(),
                Constructor::infallible(|(): ()| Indecisive).preferred(),
            ]
        }
    }

    let mut resolver = Resolver::new();
    configs(&mut resolver);
    resolver.autowire::<Indecisive>();

    let error = resolver.resolve().unwrap_err();
    assert!(matches!(error, ResolveError::MultiplePreferredConstructors { .. }));
    assert!(error.to_string().contains("multiple preferred constructors"));
}
