//! Runtime values passed through dynamic call sites

use crate::error::CallError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Static type of a call-site parameter or return slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    /// Accepts any value.
    Object,
    Bool,
    Int,
    Long,
    Double,
    String,
    Array,
    Map,
    /// Return slot only: the produced value is discarded.
    Void,
}

impl ValueType {
    /// Reference types admit `Null`.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ValueType::Object | ValueType::String | ValueType::Array | ValueType::Map
        )
    }

    /// Whether a value may be passed in a slot of this type.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Object, _) => true,
            (ValueType::Void, _) => false,
            (ty, Value::Null) => ty.is_reference(),
            (ty, other) => *ty == other.infer_type(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Object => "Object",
            ValueType::Bool => "boolean",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::String => "String",
            ValueType::Array => "Object[]",
            ValueType::Map => "Map",
            ValueType::Void => "void",
        };
        f.write_str(name)
    }
}

/// An object that can receive dynamic calls.
pub trait ScriptObject: Send + Sync {
    fn type_name(&self) -> &str;

    fn invoke_method(&self, name: &str, args: &[Value]) -> Result<Value, CallError>;

    fn get_property(&self, name: &str) -> Result<Value, CallError> {
        Err(CallError::MissingProperty {
            type_name: self.type_name().to_string(),
            property: name.to_string(),
        })
    }
}

/// Shared reference to a script object. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn ScriptObject>);

impl ObjectRef {
    pub fn new(object: impl ScriptObject + 'static) -> Self {
        Self(Arc::new(object))
    }

    pub fn get(&self) -> &dyn ScriptObject {
        self.0.as_ref()
    }

    pub fn same_object(&self, other: &ObjectRef) -> bool {
        // Compare data pointers only; vtable pointers may differ across codegen units.
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0.type_name())
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("<{}>", self.0.type_name()))
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(ObjectRef),

    /// Compiler-inserted wrapper recording the static type a value was cast
    /// to. Never observable by user code.
    Wrapped {
        value: Box<Value>,
        declared: ValueType,
    },
}

impl Value {
    /// Wrap a value the way a typed cast in compiled code does.
    pub fn wrapped(value: impl Into<Value>, declared: ValueType) -> Self {
        Value::Wrapped {
            value: Box::new(value.into()),
            declared,
        }
    }

    /// Infer the ValueType from this Value
    pub fn infer_type(&self) -> ValueType {
        match self {
            Value::Null | Value::Object(_) => ValueType::Object,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Wrapped { declared, .. } => declared.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Object(obj) => obj.get().type_name().to_string(),
            other => other.infer_type().to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
