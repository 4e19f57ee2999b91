//! The marshaling contract between attribute maps and typed resources.
//!
//! Conversion is explicit per type: each field knows how to emit itself as a
//! [`Value`] and how to absorb one ([`AttributeValue`]), and each resource
//! struct maps its fields to storage tags ([`RawResource`]). The
//! [`raw_resource!`](crate::raw_resource) macro writes the per-struct part.
//!
//! Absorption rules:
//! - nullable wrappers: `null` makes the wrapper invalid, anything else makes it valid
//! - scalars: `null` leaves the field untouched; floats assigned to integer
//!   fields truncate toward zero (saturating at the integer's bounds)
//! - nested resources, `Vec`, `Option`, `Box`, [`Json`]: re-decoded
//!   structurally into a fresh value of the field's type

use crate::error::{MarshalError, MarshalResult};
use hookwire_types::{AttributeMap, Null, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use tracing::warn;

/// A typed resource whose fields map 1:1 to schema properties.
///
/// Object safe, so the runtime can hold resources of types registered by
/// extensions as `Box<dyn RawResource>`.
pub trait RawResource: Any + Send + Sync + fmt::Debug {
    /// Storage tags of all fields, in declaration order.
    fn storage_tags(&self) -> &'static [&'static str];

    /// Emits every field under its storage tag.
    fn to_attribute_map(&self) -> AttributeMap;

    /// Absorbs the values present in `map`; absent keys leave fields untouched.
    fn assign_from_map(&mut self, map: &AttributeMap) -> MarshalResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Rust type name, for diagnostics.
    fn type_name(&self) -> &'static str;
}

/// A concrete raw resource type that can be built from scratch.
pub trait RawResourceType: RawResource + Default + Sized {
    const STORAGE_TAGS: &'static [&'static str];

    /// Builds a resource from `map`; absent keys keep their zero value.
    fn from_attribute_map(map: &AttributeMap) -> MarshalResult<Self> {
        let mut resource = Self::default();
        resource.assign_from_map(map)?;
        Ok(resource)
    }
}

/// Conversion of one field value to and from the attribute representation.
pub trait AttributeValue {
    fn to_value(&self) -> Value;

    /// Absorbs a value that is present in the source map (possibly `null`).
    fn assign_value(&mut self, value: &Value) -> MarshalResult<()>;
}

impl AttributeValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => {
                self.clone_from(s);
                Ok(())
            }
            other => Err(MarshalError::mismatch("string", other)),
        }
    }
}

impl AttributeValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::Bool(b) => {
                *self = *b;
                Ok(())
            }
            other => Err(MarshalError::mismatch("bool", other)),
        }
    }
}

macro_rules! float_attribute_value {
    ($($ty:ty),*) => {$(
        impl AttributeValue for $ty {
            fn to_value(&self) -> Value {
                serde_json::Number::from_f64(f64::from(*self))
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }

            fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
                match value {
                    Value::Null => Ok(()),
                    Value::Number(n) => {
                        let f = n
                            .as_f64()
                            .ok_or_else(|| MarshalError::mismatch("float", value))?;
                        *self = f as $ty;
                        Ok(())
                    }
                    other => Err(MarshalError::mismatch("float", other)),
                }
            }
        }
    )*};
}

float_attribute_value!(f32, f64);

macro_rules! int_attribute_value {
    ($($ty:ty),*) => {$(
        impl AttributeValue for $ty {
            fn to_value(&self) -> Value {
                Value::from(*self)
            }

            fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
                let Value::Number(n) = value else {
                    return match value {
                        Value::Null => Ok(()),
                        other => Err(MarshalError::mismatch("integer", other)),
                    };
                };
                *self = if let Some(i) = n.as_i64() {
                    <$ty>::try_from(i).map_err(|_| MarshalError::OutOfRange {
                        value: n.to_string(),
                        target: stringify!($ty),
                    })?
                } else if let Some(u) = n.as_u64() {
                    <$ty>::try_from(u).map_err(|_| MarshalError::OutOfRange {
                        value: n.to_string(),
                        target: stringify!($ty),
                    })?
                } else {
                    // Storage layers may hand every number back as a float.
                    n.as_f64().unwrap_or_default() as $ty
                };
                Ok(())
            }
        }
    )*};
}

int_attribute_value!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl<T: AttributeValue + Default> AttributeValue for Null<T> {
    fn to_value(&self) -> Value {
        match self.get() {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        if value.is_null() {
            self.clear();
            return Ok(());
        }
        let mut inner = T::default();
        inner.assign_value(value)?;
        *self = Null::some(inner);
        Ok(())
    }
}

impl<T: AttributeValue + Default> AttributeValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, AttributeValue::to_value)
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.assign_value(value)?;
        *self = Some(inner);
        Ok(())
    }
}

impl<T: AttributeValue + Default> AttributeValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(AttributeValue::to_value).collect())
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        match value {
            Value::Null => {
                self.clear();
                Ok(())
            }
            Value::Array(items) => {
                let mut decoded = Vec::with_capacity(items.len());
                for item in items {
                    let mut element = T::default();
                    element.assign_value(item)?;
                    decoded.push(element);
                }
                *self = decoded;
                Ok(())
            }
            other => Err(MarshalError::mismatch("array", other)),
        }
    }
}

impl<T: AttributeValue + Default> AttributeValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        let mut inner = T::default();
        inner.assign_value(value)?;
        **self = inner;
        Ok(())
    }
}

impl AttributeValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        self.clone_from(value);
        Ok(())
    }
}

impl AttributeValue for AttributeMap {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        match value {
            Value::Null => {
                self.clear();
                Ok(())
            }
            Value::Object(map) => {
                self.clone_from(map);
                Ok(())
            }
            other => Err(MarshalError::mismatch("object", other)),
        }
    }
}

/// Field wrapper for arbitrary serde types.
///
/// The value is re-encoded through `serde_json` in both directions, so any
/// `Serialize + DeserializeOwned` type can be a resource field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> AttributeValue for Json<T> {
    fn to_value(&self) -> Value {
        serde_json::to_value(&self.0).unwrap_or_else(|err| {
            warn!("failed to encode field of type {}: {}", std::any::type_name::<T>(), err);
            Value::Null
        })
    }

    fn assign_value(&mut self, value: &Value) -> MarshalResult<()> {
        self.0 = serde_json::from_value(value.clone())?;
        Ok(())
    }
}
