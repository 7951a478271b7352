//! Inputwatch: call-site interception for build input tracking
//!
//! Build scripts read process-wide state such as system properties. To know
//! which inputs a script observed, selected call sites are decorated when
//! they are first linked, so that calls on the environment facade are
//! reported to an [`InputRecorder`] without the script's cooperation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  upstream linker (CallSiteFactory)           │
//! │        │ bootstrap(request)                  │
//! │        ▼                                     │
//! │  linker     - registry lookup, once per site │
//! │  interceptor- decorate default + fallback    │
//! │        │                                     │
//! │        ▼ every call                          │
//! │  call/adapter - receiver + logical arguments │
//! │  interceptor  - handle or call original      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Call sites whose selector is not registered are returned exactly as the
//! upstream linker produced them.

pub mod adapter;
pub mod call;
pub mod callsite;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod handle;
pub mod interceptor;
pub mod linker;
pub mod registry;
pub mod value;

pub use call::Call;
pub use callsite::{
    CacheableCallSite, CachingCallSite, CallFlags, CallSite, CallType, ConstantCallSite,
    LinkRequest,
};
pub use dispatch::DynamicLinker;
pub use environment::{
    InputRecorder, ObservedInput, PropertyMap, PropertyStore, RecordingEnvironment, SystemFacade,
};
pub use error::{CallError, LinkError, RegistryError};
pub use handle::{MethodHandle, Signature};
pub use interceptor::{decorate, MethodInterceptor};
pub use linker::{CallSiteFactory, CallSiteLinker, LinkTargets};
pub use registry::{InterceptorRegistry, RegistryBuilder};
pub use value::{ObjectRef, ScriptObject, Value, ValueType};
