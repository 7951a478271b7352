//! Callable targets and their calling convention.

use crate::error::CallError;
use crate::value::{Value, ValueType};
use std::fmt;
use std::sync::Arc;

/// Parameter and return types of a call site or target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<ValueType>,
    pub ret: ValueType,
}

impl Signature {
    pub fn new(params: Vec<ValueType>, ret: ValueType) -> Self {
        Self { params, ret }
    }

    /// `(Object, Object, ...) -> Object` with `arity` parameters.
    pub fn generic(arity: usize) -> Self {
        Self::new(vec![ValueType::Object; arity], ValueType::Object)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check arity and per-parameter types.
    pub fn check_arguments(&self, args: &[Value]) -> Result<(), CallError> {
        if args.len() != self.params.len() {
            return Err(CallError::WrongArity {
                expected: self.params.len(),
                actual: args.len(),
            });
        }
        for (ty, arg) in self.params.iter().zip(args) {
            if !ty.admits(arg) {
                return Err(CallError::ClassCast {
                    expected: ty.to_string(),
                    actual: arg.describe(),
                });
            }
        }
        Ok(())
    }

    /// Adapt a produced value to this signature's return slot.
    pub fn coerce_return(&self, value: Value) -> Result<Value, CallError> {
        match self.ret {
            ValueType::Void => Ok(Value::Null),
            ref ty if ty.admits(&value) => Ok(value),
            ref ty => Err(CallError::ClassCast {
                expected: ty.to_string(),
                actual: value.describe(),
            }),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

type Body = Arc<dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync>;

/// A typed, shareable callable target.
///
/// Clones share the same body; [`MethodHandle::ptr_eq`] tells whether two
/// handles are the same target.
#[derive(Clone)]
pub struct MethodHandle {
    signature: Signature,
    body: Body,
}

impl MethodHandle {
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            signature,
            body: Arc::new(body),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke with arguments that must match the signature exactly.
    pub fn invoke_exact(&self, args: &[Value]) -> Result<Value, CallError> {
        self.signature.check_arguments(args)?;
        (self.body)(args)
    }

    pub fn ptr_eq(&self, other: &MethodHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.body), Arc::as_ptr(&other.body))
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle{}", self.signature)
    }
}
