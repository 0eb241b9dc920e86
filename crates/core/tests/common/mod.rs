//! Services shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use tracing_subscriber::EnvFilter;
use wirebox_core::{Autowire, Constructor, Container, ResolveError, Resolver};

/// Print library logs for a test, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
pub struct Config {
    pub name: String,
}

impl Config {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Autowire for Config {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::infallible(|(): ()| Config::new("autowired"))]
    }
}

#[derive(Debug)]
pub struct ServiceE {
    pub config: Arc<Config>,
}

impl ServiceE {
    pub fn provider(container: &Container) -> Result<Arc<ServiceE>, ResolveError> {
        Ok(Arc::new(ServiceE {
            config: container.get()?,
        }))
    }
}

/// A -> B -> C, and C points back to A once the graph is built
#[derive(Debug)]
pub struct ServiceA {
    pub b: Arc<ServiceB>,
}

#[derive(Debug)]
pub struct ServiceB {
    pub c: Arc<ServiceC>,
}

#[derive(Debug, Default)]
pub struct ServiceC {
    a: OnceLock<Arc<ServiceA>>,
}

impl ServiceC {
    pub fn set_service_a(&self, a: Arc<ServiceA>) {
        let _ = self.a.set(a);
    }

    pub fn service_a(&self) -> Option<&Arc<ServiceA>> {
        self.a.get()
    }
}

#[derive(Debug)]
pub struct ServiceD {
    pub config: Arc<Config>,
}

impl Autowire for ServiceD {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::infallible(|(config,): (Arc<Config>,)| ServiceD { config })]
    }
}

/// Three constructors of increasing arity
#[derive(Debug)]
pub struct ServiceF {
    pub d: Option<Arc<ServiceD>>,
    pub config: Option<Arc<Config>>,
}

impl Autowire for ServiceF {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::infallible(|(): ()| ServiceF {
                d: None,
                config: None,
            }),
            Constructor::infallible(|(d,): (Arc<ServiceD>,)| ServiceF {
                d: Some(d),
                config: None,
            }),
            Constructor::infallible(|(d, config): (Arc<ServiceD>, Arc<Config>)| ServiceF {
                d: Some(d),
                config: Some(config),
            }),
        ]
    }
}

pub trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

#[derive(Debug)]
pub struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

impl Autowire for English {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::infallible(|(): ()| English)]
    }
}

#[derive(Debug)]
pub struct Spanish {
    pub config: Arc<Config>,
}

impl Greeter for Spanish {
    fn greet(&self) -> String {
        format!("hola {}", self.config.name)
    }
}

impl Autowire for Spanish {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::infallible(|(config,): (Arc<Config>,)| Spanish { config })]
    }
}

wirebox_core::implements!(dyn Greeter: English, Spanish);

/// Config and ServiceE, the smallest useful graph
pub fn configs(resolver: &mut Resolver) {
    resolver
        .register_supplier(|| Config::new("default"))
        .register(ServiceE::provider);
}

/// The A -> B -> C -> A cycle, closed by a post-init hook on C
pub fn cyclic_services(resolver: &mut Resolver) {
    resolver
        .register(|container| {
            Ok(Arc::new(ServiceA {
                b: container.get()?,
            }))
        })
        .register(|container| {
            Ok(Arc::new(ServiceB {
                c: container.get()?,
            }))
        })
        .register_with_post_init(
            |_| Ok(Arc::new(ServiceC::default())),
            |container, c: Arc<ServiceC>| {
                c.set_service_a(container.get()?);
                Ok(())
            },
        );
}
