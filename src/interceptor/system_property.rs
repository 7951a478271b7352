//! Interceptors for property reads and writes on the `System` facade.

use super::MethodInterceptor;
use crate::call::Call;
use crate::environment::{InputRecorder, PropertyMap};
use crate::error::CallError;
use crate::value::{ObjectRef, Value};
use std::mem;
use std::sync::Arc;

/// Overloads of `getProperty` that are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyRead {
    Key(String),
    KeyWithDefault(String, Option<String>),
}

impl PropertyRead {
    /// Match logical arguments against the known read overloads, taking
    /// ownership of the matched values.
    pub fn classify(mut args: Vec<Value>) -> Option<Self> {
        match args.as_mut_slice() {
            [Value::String(key)] => Some(PropertyRead::Key(mem::take(key))),
            [Value::String(key), Value::String(default)] => Some(PropertyRead::KeyWithDefault(
                mem::take(key),
                Some(mem::take(default)),
            )),
            [Value::String(key), Value::Null] => {
                Some(PropertyRead::KeyWithDefault(mem::take(key), None))
            }
            _ => None,
        }
    }
}

/// Overloads of `setProperties` that are recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyWrite {
    Replace(PropertyMap),
    /// `setProperties(null)` restores the default properties.
    Reset,
}

impl PropertyWrite {
    pub fn classify(mut args: Vec<Value>) -> Option<Self> {
        match args.as_mut_slice() {
            [Value::Map(properties)] => Some(PropertyWrite::Replace(mem::take(properties))),
            [Value::Null] => Some(PropertyWrite::Reset),
            _ => None,
        }
    }
}

fn targets(system: &ObjectRef, call: &Call<'_>) -> bool {
    call.receiver()
        .and_then(Value::as_object)
        .is_some_and(|receiver| receiver.same_object(system))
}

/// Records `System.getProperty(key)` and `System.getProperty(key, default)`.
pub struct SystemGetPropertyInterceptor {
    system: ObjectRef,
    recorder: Arc<dyn InputRecorder>,
}

impl SystemGetPropertyInterceptor {
    pub const SELECTOR: &'static str = "getProperty";

    pub fn new(system: ObjectRef, recorder: Arc<dyn InputRecorder>) -> Self {
        Self { system, recorder }
    }
}

impl MethodInterceptor for SystemGetPropertyInterceptor {
    fn intercept(&self, consumer: &str, call: &Call<'_>) -> Result<Value, CallError> {
        if !targets(&self.system, call) {
            return call.call_original();
        }
        match call.arguments().and_then(PropertyRead::classify) {
            Some(PropertyRead::Key(key)) => {
                tracing::trace!(%key, consumer, "intercepted property read");
                self.recorder.system_property(&key, None, consumer)
            }
            Some(PropertyRead::KeyWithDefault(key, default)) => {
                tracing::trace!(%key, consumer, "intercepted property read with default");
                self.recorder
                    .system_property(&key, default.as_deref(), consumer)
            }
            None => {
                tracing::debug!(consumer, "unrecognized getProperty overload, calling original");
                call.call_original()
            }
        }
    }
}

/// Records `System.setProperties(properties)`.
pub struct SystemSetPropertiesInterceptor {
    system: ObjectRef,
    recorder: Arc<dyn InputRecorder>,
}

impl SystemSetPropertiesInterceptor {
    pub const SELECTOR: &'static str = "setProperties";

    pub fn new(system: ObjectRef, recorder: Arc<dyn InputRecorder>) -> Self {
        Self { system, recorder }
    }
}

impl MethodInterceptor for SystemSetPropertiesInterceptor {
    fn intercept(&self, consumer: &str, call: &Call<'_>) -> Result<Value, CallError> {
        if !targets(&self.system, call) {
            return call.call_original();
        }
        match call.arguments().and_then(PropertyWrite::classify) {
            Some(PropertyWrite::Replace(properties)) => {
                tracing::trace!(count = properties.len(), consumer, "intercepted setProperties");
                self.recorder
                    .set_system_properties(Some(&properties), consumer)?;
                Ok(Value::Null)
            }
            Some(PropertyWrite::Reset) => {
                tracing::trace!(consumer, "intercepted setProperties(null)");
                self.recorder.set_system_properties(None, consumer)?;
                Ok(Value::Null)
            }
            None => {
                tracing::debug!(consumer, "unrecognized setProperties overload, calling original");
                call.call_original()
            }
        }
    }
}
