/// Declares a raw resource struct and its marshaling code.
///
/// Every field carries a `#[db = "tag"]` attribute naming the schema
/// property it maps to. The struct must also derive `Debug` and `Default`.
///
/// ```
/// use hookwire_model::raw_resource;
/// use hookwire_types::NullString;
///
/// raw_resource! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Network {
///         #[db = "id"]
///         pub id: String,
///         #[db = "name"]
///         pub name: String,
///         #[db = "description"]
///         pub description: NullString,
///     }
/// }
/// ```
///
/// The generated type implements [`RawResource`](crate::RawResource),
/// [`RawResourceType`](crate::RawResourceType) and
/// [`AttributeValue`](crate::AttributeValue), so it can be nested inside
/// other resources.
#[macro_export]
macro_rules! raw_resource {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                #[db = $tag:literal]
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::RawResource for $name {
            fn storage_tags(&self) -> &'static [&'static str] {
                <Self as $crate::RawResourceType>::STORAGE_TAGS
            }

            fn to_attribute_map(&self) -> $crate::AttributeMap {
                let mut map = $crate::AttributeMap::new();
                $(
                    map.insert(
                        ::std::string::String::from($tag),
                        $crate::AttributeValue::to_value(&self.$field),
                    );
                )*
                map
            }

            fn assign_from_map(&mut self, map: &$crate::AttributeMap) -> $crate::MarshalResult<()> {
                $(
                    if let Some(value) = map.get($tag) {
                        $crate::AttributeValue::assign_value(&mut self.$field, value)
                            .map_err(|err| err.in_field($tag))?;
                    }
                )*
                let _ = map;
                Ok(())
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn type_name(&self) -> &'static str {
                ::std::stringify!($name)
            }
        }

        impl $crate::RawResourceType for $name {
            const STORAGE_TAGS: &'static [&'static str] = &[$($tag),*];
        }

        impl $crate::AttributeValue for $name {
            fn to_value(&self) -> $crate::Value {
                $crate::Value::Object($crate::RawResource::to_attribute_map(self))
            }

            fn assign_value(&mut self, value: &$crate::Value) -> $crate::MarshalResult<()> {
                *self = <Self as ::std::default::Default>::default();
                match value {
                    $crate::Value::Null => Ok(()),
                    $crate::Value::Object(map) => $crate::RawResource::assign_from_map(self, map),
                    other => Err($crate::MarshalError::mismatch("object", other)),
                }
            }
        }
    };
}
