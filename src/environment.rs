//! Process environment facade and the input recording collaborator.
//!
//! [`SystemFacade`] is the well-known object that build scripts call to read
//! and write process-wide properties. Interceptors scoped to it report what
//! scripts observe through [`InputRecorder`].

use crate::error::CallError;
use crate::value::{ObjectRef, ScriptObject, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub type PropertyMap = BTreeMap<String, Value>;

/// Receives environment accesses made by instrumented code.
pub trait InputRecorder: Send + Sync {
    /// A property read. Returns the value the read evaluates to.
    fn system_property(
        &self,
        key: &str,
        default: Option<&str>,
        consumer: &str,
    ) -> Result<Value, CallError>;

    /// A bulk replacement of all properties. `None` resets to defaults.
    fn set_system_properties(
        &self,
        properties: Option<&PropertyMap>,
        consumer: &str,
    ) -> Result<(), CallError>;
}

/// Process-wide property table.
pub struct PropertyStore {
    defaults: PropertyMap,
    current: RwLock<PropertyMap>,
}

impl PropertyStore {
    pub fn new<I, K, V>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let defaults: PropertyMap = defaults
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            current: RwLock::new(defaults.clone()),
            defaults,
        }
    }

    /// String value of `key`. Entries holding non-string values read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current.get(key).and_then(Value::as_str).map(str::to_string)
    }

    /// Set one property, returning the previous string value.
    pub fn set(&self, key: &str, value: Value) -> Option<String> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current
            .insert(key.to_string(), value)
            .and_then(|old| old.as_str().map(str::to_string))
    }

    /// Replace the whole table; `None` restores the defaults.
    pub fn replace(&self, properties: Option<&PropertyMap>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = properties.unwrap_or(&self.defaults).clone();
    }

    pub fn snapshot(&self) -> PropertyMap {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The environment-access object exposed to scripts as `System`.
pub struct SystemFacade {
    store: Arc<PropertyStore>,
}

impl SystemFacade {
    pub const TYPE_NAME: &'static str = "System";

    pub fn new(store: Arc<PropertyStore>) -> Self {
        Self { store }
    }

    /// A shareable facade object over `store`.
    pub fn object(store: Arc<PropertyStore>) -> ObjectRef {
        ObjectRef::new(Self::new(store))
    }

    fn missing(&self, name: &str, args: &[Value]) -> CallError {
        CallError::MissingMethod {
            type_name: Self::TYPE_NAME.to_string(),
            method: name.to_string(),
            arity: args.len(),
        }
    }
}

/// Reject keys the facade refuses to look up.
pub(crate) fn check_key(key: &str) -> Result<(), CallError> {
    if key.is_empty() {
        return Err(CallError::Thrown(
            "IllegalArgumentException: key can't be empty".into(),
        ));
    }
    Ok(())
}

fn property_key(key: &Value) -> Result<Option<&str>, CallError> {
    match key {
        Value::Null => Err(CallError::NullPointer("key can't be null".into())),
        Value::String(s) => {
            check_key(s)?;
            Ok(Some(s.as_str()))
        }
        _ => Ok(None),
    }
}

impl ScriptObject for SystemFacade {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn invoke_method(&self, name: &str, args: &[Value]) -> Result<Value, CallError> {
        match (name, args) {
            ("getProperty", [key]) => match property_key(key)? {
                Some(key) => Ok(self.store.get(key).into()),
                None => Err(self.missing(name, args)),
            },
            ("getProperty", [key, default @ (Value::String(_) | Value::Null)]) => {
                match property_key(key)? {
                    Some(key) => Ok(self
                        .store
                        .get(key)
                        .map(Value::String)
                        .unwrap_or_else(|| default.clone())),
                    None => Err(self.missing(name, args)),
                }
            }
            ("setProperty", [key, value @ (Value::String(_) | Value::Null)]) => {
                match property_key(key)? {
                    Some(_) if value.is_null() => {
                        Err(CallError::NullPointer("value can't be null".into()))
                    }
                    Some(key) => Ok(self.store.set(key, value.clone()).into()),
                    None => Err(self.missing(name, args)),
                }
            }
            ("setProperties", [Value::Map(properties)]) => {
                self.store.replace(Some(properties));
                Ok(Value::Null)
            }
            ("setProperties", [Value::Null]) => {
                self.store.replace(None);
                Ok(Value::Null)
            }
            ("getProperties", []) => Ok(Value::Map(self.store.snapshot())),
            _ => Err(self.missing(name, args)),
        }
    }
}

/// An environment access observed through an interceptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ObservedInput {
    SystemProperty {
        key: String,
        value: Option<String>,
        consumer: String,
    },
    SystemPropertiesReplaced {
        properties: Option<PropertyMap>,
        consumer: String,
    },
}

/// Recorder backed by a [`PropertyStore`] that keeps every observation in
/// memory.
pub struct RecordingEnvironment {
    store: Arc<PropertyStore>,
    observed: Mutex<Vec<ObservedInput>>,
}

impl RecordingEnvironment {
    pub fn new(store: Arc<PropertyStore>) -> Self {
        Self {
            store,
            observed: Mutex::new(Vec::new()),
        }
    }

    pub fn observed(&self) -> Vec<ObservedInput> {
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, input: ObservedInput) {
        tracing::debug!(?input, "observed environment input");
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input);
    }
}

impl InputRecorder for RecordingEnvironment {
    fn system_property(
        &self,
        key: &str,
        default: Option<&str>,
        consumer: &str,
    ) -> Result<Value, CallError> {
        check_key(key)?;
        let value = self.store.get(key);
        self.push(ObservedInput::SystemProperty {
            key: key.to_string(),
            value: value.clone(),
            consumer: consumer.to_string(),
        });
        Ok(value.or_else(|| default.map(str::to_string)).into())
    }

    fn set_system_properties(
        &self,
        properties: Option<&PropertyMap>,
        consumer: &str,
    ) -> Result<(), CallError> {
        self.push(ObservedInput::SystemPropertiesReplaced {
            properties: properties.cloned(),
            consumer: consumer.to_string(),
        });
        self.store.replace(properties);
        Ok(())
    }
}
