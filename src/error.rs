//! Error taxonomy shared across the kernel. Every public evaluator returns
//! one of these variants instead of panicking; callers decide whether a
//! given error should fail the whole batch or just one record.

use thiserror::Error;

/// Kernel-wide error taxonomy. Each variant maps to one of the recovery
/// classes described for the core: validation, cryptography, policy,
/// state, adapter, or malformed input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("crypto: {0}")]
    Crypto(String),

    #[error("policy: {0}")]
    Policy(String),

    #[error("state: {0}")]
    State(String),

    #[error("adapter({backend}): {detail}")]
    Adapter { backend: String, detail: String },

    #[error("input: {0}")]
    Input(String),
}

impl KernelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        KernelError::Validation(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        KernelError::Crypto(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        KernelError::Policy(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        KernelError::State(msg.into())
    }

    pub fn adapter(backend: impl Into<String>, detail: impl Into<String>) -> Self {
        KernelError::Adapter {
            backend: backend.into(),
            detail: detail.into(),
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        KernelError::Input(msg.into())
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
