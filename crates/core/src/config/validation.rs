use thiserror::Error;

/// Why a [`ResolverConfig`](crate::config::ResolverConfig) was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment override could not be read or parsed
    #[error("{variable}='{value}' is invalid, expected {expected}")]
    InvalidEnvValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("max_resolution_depth is {depth} but must be at least 1")]
    InvalidDepth { depth: usize },
}

impl ConfigError {
    pub fn invalid_env(
        variable: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidEnvValue {
            variable,
            value: value.into(),
            expected,
        }
    }

    /// Environment variable the error came from, if any
    pub fn variable(&self) -> Option<&'static str> {
        match self {
            Self::InvalidEnvValue { variable, .. } => Some(*variable),
            Self::InvalidDepth { .. } => None,
        }
    }
}
