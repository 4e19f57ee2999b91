//! Nullable wrapper values.
//!
//! Storage columns may be NULL. A [`Null<T>`] carries a value plus a
//! validity flag; an invalid wrapper marshals to JSON `null` and a JSON
//! `null` (or an absent key) unmarshals to an invalid wrapper.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A value plus a validity flag.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Null<T> {
    pub value: T,
    pub valid: bool,
}

pub type NullString = Null<String>;
pub type NullInt = Null<i64>;
pub type NullFloat = Null<f64>;
pub type NullBool = Null<bool>;

impl<T> Null<T> {
    /// A valid wrapper holding `value`.
    pub const fn some(value: T) -> Self {
        Self { value, valid: true }
    }

    /// Returns the wrapped value if valid.
    pub fn get(&self) -> Option<&T> {
        self.valid.then_some(&self.value)
    }

    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Converts into an `Option`, dropping the value if invalid.
    pub fn into_option(self) -> Option<T> {
        if self.valid { Some(self.value) } else { None }
    }
}

impl<T: Default> Null<T> {
    /// An invalid wrapper holding the zero value.
    pub fn none() -> Self {
        Self {
            value: T::default(),
            valid: false,
        }
    }

    /// Marks the wrapper invalid and resets the value.
    pub fn clear(&mut self) {
        *self = Self::none();
    }
}

impl<T: Default> From<Option<T>> for Null<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::some(value),
            None => Self::none(),
        }
    }
}

impl<T: Serialize> Serialize for Null<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.valid {
            serializer.serialize_some(&self.value)
        } else {
            serializer.serialize_none()
        }
    }
}

impl<'de, T: Deserialize<'de> + Default> Deserialize<'de> for Null<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
