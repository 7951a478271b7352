//! Interceptor Registry
//!
//! Maps selector names to interceptors. The registry is assembled once with
//! [`RegistryBuilder`] and is immutable afterwards, so it can be shared
//! between linking threads behind an `Arc` without locking.

use crate::environment::InputRecorder;
use crate::error::RegistryError;
use crate::interceptor::{
    MethodInterceptor, SystemGetPropertyInterceptor, SystemSetPropertiesInterceptor,
};
use crate::value::ObjectRef;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for an [`InterceptorRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    interceptors: HashMap<String, Arc<dyn MethodInterceptor>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `interceptor` for `selector`. Each selector takes at most one
    /// interceptor.
    pub fn register(
        mut self,
        selector: &str,
        interceptor: impl MethodInterceptor + 'static,
    ) -> Result<Self, RegistryError> {
        if self.interceptors.contains_key(selector) {
            return Err(RegistryError::DuplicateSelector(selector.to_string()));
        }
        self.interceptors
            .insert(selector.to_string(), Arc::new(interceptor));
        Ok(self)
    }

    pub fn build(self) -> InterceptorRegistry {
        InterceptorRegistry {
            interceptors: self.interceptors,
        }
    }
}

/// Immutable selector → interceptor table.
pub struct InterceptorRegistry {
    interceptors: HashMap<String, Arc<dyn MethodInterceptor>>,
}

impl InterceptorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The registry used for build scripts: property reads and bulk property
    /// writes on `system`, reported to `recorder`.
    pub fn standard(
        system: ObjectRef,
        recorder: Arc<dyn InputRecorder>,
    ) -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .register(
                SystemGetPropertyInterceptor::SELECTOR,
                SystemGetPropertyInterceptor::new(system.clone(), recorder.clone()),
            )?
            .register(
                SystemSetPropertiesInterceptor::SELECTOR,
                SystemSetPropertiesInterceptor::new(system, recorder),
            )?
            .build())
    }

    pub fn lookup(&self, selector: &str) -> Option<&Arc<dyn MethodInterceptor>> {
        self.interceptors.get(selector)
    }

    /// Registered selectors, sorted.
    pub fn selectors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.interceptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;
    use crate::error::CallError;
    use crate::value::Value;

    struct Passthrough;

    impl MethodInterceptor for Passthrough {
        fn intercept(&self, _: &str, call: &Call<'_>) -> Result<Value, CallError> {
            call.call_original()
        }
    }

    #[test]
    fn duplicate_selector_is_rejected() {
        let err = InterceptorRegistry::builder()
            .register("getProperty", Passthrough)
            .unwrap()
            .register("getProperty", Passthrough)
            .err();
        assert_eq!(
            err,
            Some(RegistryError::DuplicateSelector("getProperty".into()))
        );
    }

    #[test]
    fn lookup_finds_only_registered_selectors() {
        let registry = InterceptorRegistry::builder()
            .register("setProperties", Passthrough)
            .unwrap()
            .build();
        assert!(registry.lookup("setProperties").is_some());
        assert!(registry.lookup("setProperty").is_none());
        assert_eq!(registry.len(), 1);
    }
}
