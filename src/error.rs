//! Error types for linking and invoking intercepted call sites.

use thiserror::Error;

/// Errors raised while invoking a target.
///
/// Errors produced by an original target travel through decorated targets
/// unchanged, whether the interceptor handled the call or fell back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("wrong method type: expected {expected} arguments, got {actual}")]
    WrongArity { expected: usize, actual: usize },

    #[error("cannot cast {actual} to {expected}")]
    ClassCast { expected: String, actual: String },

    #[error("null pointer: {0}")]
    NullPointer(String),

    #[error("no method {type_name}.{method} for {arity} arguments")]
    MissingMethod {
        type_name: String,
        method: String,
        arity: usize,
    },

    #[error("no property {type_name}.{property}")]
    MissingProperty { type_name: String, property: String },

    /// An exception raised by user or library code.
    #[error("{0}")]
    Thrown(String),
}

/// Errors from call-site linking.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The linking infrastructure handed back a call site that cannot be
    /// reconfigured with new targets.
    #[error("linker produced unrecognized call site type {0}")]
    UnrecognizedCallSite(String),

    #[error("target type mismatch: call site is {expected}, target is {actual}")]
    TargetTypeMismatch { expected: String, actual: String },

    #[error("malformed call site: {0}")]
    Malformed(String),
}

/// Errors from populating the interceptor registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("selector '{0}' already has an interceptor")]
    DuplicateSelector(String),
}
