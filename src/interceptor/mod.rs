//! Method Interceptors
//!
//! A [`MethodInterceptor`] sees every invocation of a decorated call-site
//! target. It either handles the call itself or falls back to the original
//! target through [`Call::call_original`].
//!
//! # Decoration
//!
//! [`decorate`] wraps an original target into a new target with an identical
//! [`Signature`], so it can be installed on the call site in place of the
//! original. Invoking the decorated target builds a [`Call`] and dispatches
//! to the interceptor, then adapts the result to the original return type.

mod system_property;

pub use system_property::{
    PropertyRead, PropertyWrite, SystemGetPropertyInterceptor, SystemSetPropertiesInterceptor,
};

use crate::call::Call;
use crate::callsite::CallFlags;
use crate::error::CallError;
use crate::handle::MethodHandle;
use crate::value::Value;
use std::sync::Arc;

/// Intercepts calls through decorated call sites.
///
/// Implementations must be cheap on the fallback path: they run on every
/// call through a decorated site, including calls on unrelated receivers.
pub trait MethodInterceptor: Send + Sync {
    /// Handle or delegate one call. `consumer` names the calling unit.
    fn intercept(&self, consumer: &str, call: &Call<'_>) -> Result<Value, CallError>;
}

/// Wrap `original` so that its invocations dispatch to `interceptor`.
///
/// The result has the same signature as `original`. Decoration is pure:
/// decorating the same target twice yields targets with identical behavior.
pub fn decorate(
    original: &MethodHandle,
    interceptor: Arc<dyn MethodInterceptor>,
    flags: CallFlags,
    consumer: Arc<str>,
) -> MethodHandle {
    let signature = original.signature().clone();
    let ret = signature.clone();
    let original = original.clone();
    let spread = flags.is_spread();
    MethodHandle::new(signature, move |args| {
        let call = Call::new(&original, args, spread);
        let result = interceptor.intercept(&consumer, &call)?;
        ret.coerce_return(result)
    })
}
