//! Argument adaptation between call-site shapes and logical arguments.
//!
//! A fixed-arity site passes `(receiver, a1, ..., an)`. A spread site passes
//! `(receiver, [a1, ..., an])`. Both are presented to interceptors as the
//! ordered logical arguments `a1..an`, with compiler wrappers removed.

use crate::value::Value;

/// Strip a compiler-inserted wrapper, restoring the value user code produced.
pub fn unwrap(value: &Value) -> Value {
    match value {
        Value::Wrapped { value, .. } => (**value).clone(),
        other => other.clone(),
    }
}

fn unwrap_all(values: &[Value]) -> Vec<Value> {
    values.iter().map(unwrap).collect()
}

/// Logical (non-receiver) arguments of a packed call.
///
/// Returns `None` when a spread call does not carry its arguments as a
/// single array after the receiver.
pub fn logical_arguments(args: &[Value], spread: bool) -> Option<Vec<Value>> {
    if spread {
        return match args {
            [_, Value::Array(items)] => Some(unwrap_all(items)),
            _ => None,
        };
    }
    Some(args.get(1..).map(unwrap_all).unwrap_or_default())
}
