//! Call sites as handed out by the linking infrastructure.
//!
//! A call site is linked once, on first execution, and afterwards invokes
//! whatever target is installed in it. [`CacheableCallSite`] is the capability
//! the interception layer needs: reading and replacing the current, default
//! and fallback targets.

use crate::error::{CallError, LinkError};
use crate::handle::{MethodHandle, Signature};
use crate::value::Value;
use arc_swap::ArcSwap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Kind of dynamic call a site performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    Init,
    Method,
    GetProperty,
    SetProperty,
    Cast,
}

impl CallType {
    /// Name used in bootstrap requests.
    pub fn wire_name(self) -> &'static str {
        match self {
            CallType::Init => "init",
            CallType::Method => "invoke",
            CallType::GetProperty => "getProperty",
            CallType::SetProperty => "setProperty",
            CallType::Cast => "cast",
        }
    }
}

impl FromStr for CallType {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(CallType::Init),
            "invoke" => Ok(CallType::Method),
            "getProperty" => Ok(CallType::GetProperty),
            "setProperty" => Ok(CallType::SetProperty),
            "cast" => Ok(CallType::Cast),
            other => Err(LinkError::Malformed(format!("unknown call type '{}'", other))),
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

bitflags::bitflags! {
    /// Per-site flags emitted by the compiler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallFlags: u32 {
        /// `a?.b()`: a null receiver yields null instead of failing.
        const SAFE_NAVIGATION = 1;
        /// Call on the enclosing instance.
        const THIS_CALL = 2;
        /// `f(*list)`: logical arguments arrive packed in one array after the receiver.
        const SPREAD_CALL = 4;
    }
}

impl CallFlags {
    pub fn is_spread(self) -> bool {
        self.contains(CallFlags::SPREAD_CALL)
    }
}

/// Everything known about a call site when it is first linked.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    /// Name of the calling unit, used to attribute observed inputs.
    pub caller: Arc<str>,
    pub call_type: CallType,
    /// Method or property name; the interception selector.
    pub name: String,
    pub signature: Signature,
    pub flags: CallFlags,
}

impl LinkRequest {
    pub fn method(caller: &str, name: &str, signature: Signature) -> Self {
        Self {
            caller: Arc::from(caller),
            call_type: CallType::Method,
            name: name.to_string(),
            signature,
            flags: CallFlags::empty(),
        }
    }

    pub fn with_call_type(mut self, call_type: CallType) -> Self {
        self.call_type = call_type;
        self
    }

    pub fn with_flags(mut self, flags: CallFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A linked call site.
pub trait CallSite: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn signature(&self) -> &Signature;

    fn invoke(&self, args: &[Value]) -> Result<Value, CallError>;

    /// The reconfigurable view of this site, if it has one.
    fn as_cacheable(&self) -> Option<&dyn CacheableCallSite> {
        None
    }
}

/// A call site whose targets can be replaced after bootstrap.
pub trait CacheableCallSite: CallSite {
    fn target(&self) -> MethodHandle;
    fn default_target(&self) -> MethodHandle;
    fn fallback_target(&self) -> MethodHandle;

    fn set_target(&self, target: MethodHandle) -> Result<(), LinkError>;
    fn set_default_target(&self, target: MethodHandle) -> Result<(), LinkError>;
    fn set_fallback_target(&self, target: MethodHandle) -> Result<(), LinkError>;
}

fn check_installable(site: &Signature, target: &MethodHandle) -> Result<(), LinkError> {
    if target.signature() != site {
        return Err(LinkError::TargetTypeMismatch {
            expected: site.to_string(),
            actual: target.signature().to_string(),
        });
    }
    Ok(())
}

/// Call site with swappable current, default and fallback targets.
///
/// Each slot is replaced with a single atomic store, so concurrent linkers
/// racing on the same site leave one of their equivalent targets installed.
pub struct CachingCallSite {
    signature: Signature,
    target: ArcSwap<MethodHandle>,
    default_target: ArcSwap<MethodHandle>,
    fallback_target: ArcSwap<MethodHandle>,
}

impl CachingCallSite {
    /// Create a site whose current target starts as `default_target`.
    pub fn new(
        signature: Signature,
        default_target: MethodHandle,
        fallback_target: MethodHandle,
    ) -> Result<Self, LinkError> {
        check_installable(&signature, &default_target)?;
        check_installable(&signature, &fallback_target)?;
        Ok(Self {
            signature,
            target: ArcSwap::from_pointee(default_target.clone()),
            default_target: ArcSwap::from_pointee(default_target),
            fallback_target: ArcSwap::from_pointee(fallback_target),
        })
    }

    /// Switch the current target to the fallback target, as the linker does
    /// when the cached target stops applying.
    pub fn relink_to_fallback(&self) {
        self.target.store(self.fallback_target.load_full());
    }
}

impl CallSite for CachingCallSite {
    fn type_name(&self) -> &'static str {
        "CachingCallSite"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, CallError> {
        self.target.load_full().invoke_exact(args)
    }

    fn as_cacheable(&self) -> Option<&dyn CacheableCallSite> {
        Some(self)
    }
}

impl CacheableCallSite for CachingCallSite {
    fn target(&self) -> MethodHandle {
        MethodHandle::clone(&self.target.load())
    }

    fn default_target(&self) -> MethodHandle {
        MethodHandle::clone(&self.default_target.load())
    }

    fn fallback_target(&self) -> MethodHandle {
        MethodHandle::clone(&self.fallback_target.load())
    }

    fn set_target(&self, target: MethodHandle) -> Result<(), LinkError> {
        check_installable(&self.signature, &target)?;
        self.target.store(Arc::new(target));
        Ok(())
    }

    fn set_default_target(&self, target: MethodHandle) -> Result<(), LinkError> {
        check_installable(&self.signature, &target)?;
        self.default_target.store(Arc::new(target));
        Ok(())
    }

    fn set_fallback_target(&self, target: MethodHandle) -> Result<(), LinkError> {
        check_installable(&self.signature, &target)?;
        self.fallback_target.store(Arc::new(target));
        Ok(())
    }
}

/// Call site permanently bound to one target.
pub struct ConstantCallSite {
    target: MethodHandle,
}

impl ConstantCallSite {
    pub fn new(target: MethodHandle) -> Self {
        Self { target }
    }
}

impl CallSite for ConstantCallSite {
    fn type_name(&self) -> &'static str {
        "ConstantCallSite"
    }

    fn signature(&self) -> &Signature {
        self.target.signature()
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, CallError> {
        self.target.invoke_exact(args)
    }
}
