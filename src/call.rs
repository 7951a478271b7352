//! Per-invocation call context handed to interceptors.

use crate::adapter;
use crate::error::CallError;
use crate::handle::MethodHandle;
use crate::value::Value;

/// One invocation of a decorated target.
///
/// Borrows the original target and the arguments exactly as the call site
/// supplied them; lives only for the duration of a single dispatch.
pub struct Call<'a> {
    original: &'a MethodHandle,
    args: &'a [Value],
    spread: bool,
}

impl<'a> Call<'a> {
    pub fn new(original: &'a MethodHandle, args: &'a [Value], spread: bool) -> Self {
        Self {
            original,
            args,
            spread,
        }
    }

    /// The implicit target object of the call, unchanged.
    pub fn receiver(&self) -> Option<&'a Value> {
        self.args.first()
    }

    /// Arguments after the receiver, unpacked from the spread array if the
    /// site is spread-shaped and with compiler wrappers removed.
    pub fn arguments(&self) -> Option<Vec<Value>> {
        adapter::logical_arguments(self.args, self.spread)
    }

    /// Invoke the original target with the arguments as received.
    pub fn call_original(&self) -> Result<Value, CallError> {
        self.original.invoke_exact(self.args)
    }
}
