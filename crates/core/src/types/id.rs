//! Newtype IDs for type-safe entity references.
//!
//! The REST API identifies every document with an opaque string `_id`.
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! mixing IDs from different resources.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`
/// - `Display`, `From<String>`, `From<&str>`
///
/// # Example
///
/// ```rust
/// # use rimline_core::define_id;
/// define_id!(MakeId);
/// define_id!(TrimId);
///
/// let make = MakeId::new("64f1c0");
/// let trim = TrimId::new("64f1c0");
///
/// // These are different types, so this won't compile:
/// // let _: MakeId = trim;
/// assert_eq!(make.as_str(), trim.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(TireId);
define_id!(WheelId);
define_id!(MakeId);
define_id!(ModelId);
define_id!(TrimId);
define_id!(TyreSizeId);
define_id!(DrivingTypeId);
define_id!(DealId);
define_id!(FleetNewsId);
define_id!(ServiceId);
define_id!(UserId);
define_id!(OrderId);

/// Id of either a tire or a wheel, as carried by cart and order lines.
pub type ProductId = String;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = MakeId::new("64f1c0aa");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"64f1c0aa\"");

        let parsed: MakeId = serde_json::from_str("\"64f1c0aa\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ServiceId::from("svc-1").to_string(), "svc-1");
    }
}
