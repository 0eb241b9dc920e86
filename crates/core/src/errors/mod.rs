pub mod core;

pub use self::core::{BoxError, ConstructorMismatch, ResolveError};
