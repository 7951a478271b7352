//! Call-Site Linker
//!
//! Runs once per call site, the first time the site executes. Sites whose
//! selector has a registered interceptor get both their default and fallback
//! targets decorated; every other site is returned exactly as the upstream
//! linker produced it.

use crate::callsite::{CallSite, CallType, LinkRequest};
use crate::error::LinkError;
use crate::handle::MethodHandle;
use crate::interceptor::{decorate, MethodInterceptor};
use crate::registry::InterceptorRegistry;
use std::sync::Arc;

/// Upstream call-site bootstrap.
pub trait CallSiteFactory: Send + Sync {
    fn bootstrap(&self, request: &LinkRequest) -> Result<Arc<dyn CallSite>, LinkError>;
}

/// The two targets a linked call site holds.
#[derive(Debug, Clone)]
pub struct LinkTargets {
    pub default_target: MethodHandle,
    pub fallback_target: MethodHandle,
}

/// Links call sites, decorating those whose selector is registered.
pub struct CallSiteLinker {
    registry: Arc<InterceptorRegistry>,
    upstream: Arc<dyn CallSiteFactory>,
}

impl CallSiteLinker {
    pub fn new(registry: Arc<InterceptorRegistry>, upstream: Arc<dyn CallSiteFactory>) -> Self {
        Self { registry, upstream }
    }

    fn interceptor_for(&self, request: &LinkRequest) -> Option<&Arc<dyn MethodInterceptor>> {
        if request.call_type != CallType::Method {
            return None;
        }
        self.registry.lookup(&request.name)
    }

    /// Decorate `targets` if the request's selector is intercepted; otherwise
    /// return them untouched.
    pub fn link_targets(&self, request: &LinkRequest, targets: LinkTargets) -> LinkTargets {
        let Some(interceptor) = self.interceptor_for(request) else {
            return targets;
        };
        tracing::debug!(
            selector = %request.name,
            caller = %request.caller,
            spread = request.flags.is_spread(),
            "decorating call site"
        );
        LinkTargets {
            default_target: decorate(
                &targets.default_target,
                interceptor.clone(),
                request.flags,
                request.caller.clone(),
            ),
            fallback_target: decorate(
                &targets.fallback_target,
                interceptor.clone(),
                request.flags,
                request.caller.clone(),
            ),
        }
    }

    /// Bootstrap a call site through the upstream linker and install
    /// decorated targets on it when its selector is intercepted.
    ///
    /// Fails with [`LinkError::UnrecognizedCallSite`] if the upstream site
    /// cannot have its targets replaced.
    pub fn bootstrap(&self, request: &LinkRequest) -> Result<Arc<dyn CallSite>, LinkError> {
        let site = self.upstream.bootstrap(request)?;
        let cacheable = site
            .as_cacheable()
            .ok_or_else(|| LinkError::UnrecognizedCallSite(site.type_name().to_string()))?;

        if self.interceptor_for(request).is_some() {
            let linked = self.link_targets(
                request,
                LinkTargets {
                    default_target: cacheable.default_target(),
                    fallback_target: cacheable.fallback_target(),
                },
            );
            cacheable.set_target(linked.default_target.clone())?;
            cacheable.set_default_target(linked.default_target)?;
            cacheable.set_fallback_target(linked.fallback_target)?;
        } else {
            tracing::trace!(
                selector = %request.name,
                call_type = %request.call_type,
                "call site not intercepted"
            );
        }
        Ok(site)
    }
}
