//! Name-based dynamic dispatch.
//!
//! [`DynamicLinker`] is the upstream call-site bootstrap: it produces
//! [`CachingCallSite`]s whose targets resolve the selector on the receiver
//! object at every invocation.

use crate::adapter;
use crate::callsite::{CallFlags, CallSite, CallType, CachingCallSite, LinkRequest};
use crate::error::{CallError, LinkError};
use crate::handle::MethodHandle;
use crate::linker::CallSiteFactory;
use crate::value::Value;
use std::sync::Arc;

/// Bootstraps call sites that dispatch dynamically by name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicLinker;

impl DynamicLinker {
    pub fn new() -> Self {
        Self
    }
}

/// Split packed site arguments into receiver and method arguments.
fn split_arguments(args: &[Value], flags: CallFlags) -> Result<(&Value, &[Value]), CallError> {
    let (receiver, rest) = args.split_first().ok_or(CallError::WrongArity {
        expected: 1,
        actual: 0,
    })?;
    if !flags.is_spread() {
        return Ok((receiver, rest));
    }
    match rest {
        [Value::Array(items)] => Ok((receiver, items.as_slice())),
        [other] => Err(CallError::ClassCast {
            expected: "Object[]".to_string(),
            actual: other.describe(),
        }),
        _ => Err(CallError::WrongArity {
            expected: 2,
            actual: args.len(),
        }),
    }
}

fn dispatch(
    call_type: CallType,
    name: &str,
    flags: CallFlags,
    args: &[Value],
) -> Result<Value, CallError> {
    let (receiver, rest) = split_arguments(args, flags)?;
    let object = match receiver {
        Value::Null if flags.contains(CallFlags::SAFE_NAVIGATION) => return Ok(Value::Null),
        Value::Null => {
            return Err(CallError::NullPointer(format!(
                "cannot invoke {}() on null",
                name
            )))
        }
        Value::Object(object) => object,
        other => {
            return Err(CallError::MissingMethod {
                type_name: other.describe(),
                method: name.to_string(),
                arity: rest.len(),
            })
        }
    };
    match call_type {
        CallType::Method => {
            // Receivers see plain values; cast wrappers never reach user code.
            let rest: Vec<Value> = rest.iter().map(adapter::unwrap).collect();
            object.get().invoke_method(name, &rest)
        }
        CallType::GetProperty => object.get().get_property(name),
        other => Err(CallError::Thrown(format!(
            "unsupported call type {} for {}",
            other, name
        ))),
    }
}

fn dispatch_handle(request: &LinkRequest) -> MethodHandle {
    let call_type = request.call_type;
    let name = request.name.clone();
    let flags = request.flags;
    MethodHandle::new(request.signature.clone(), move |args| {
        dispatch(call_type, &name, flags, args)
    })
}

impl CallSiteFactory for DynamicLinker {
    fn bootstrap(&self, request: &LinkRequest) -> Result<Arc<dyn CallSite>, LinkError> {
        if request.signature.arity() == 0 {
            return Err(LinkError::Malformed(format!(
                "call site for {} has no receiver parameter",
                request.name
            )));
        }
        let site = CachingCallSite::new(
            request.signature.clone(),
            dispatch_handle(request),
            dispatch_handle(request),
        )?;
        Ok(Arc::new(site))
    }
}
