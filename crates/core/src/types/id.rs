//! Newtype keys for type-safe item references.
//!
//! Use the `define_id!` macro to create type-safe string wrappers that prevent
//! accidentally mixing an item id with a variant label.

/// Macro to define a type-safe string key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<&str>`, `From<String>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use shopkeep_core::define_id;
/// define_id!(SkuId);
/// define_id!(BundleId);
///
/// let sku = SkuId::new("p1");
/// let bundle = BundleId::new("p1");
///
/// // These are different types, so this won't compile:
/// // let _: SkuId = bundle;
/// assert_eq!(sku.as_str(), bundle.as_str());
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
            /// Create a new key from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the key and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Catalog item identifier (product id as issued by the catalog).
define_id!(ItemId);
// Variant label within an item, e.g. a size such as "M".
define_id!(Variant);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversions() {
        let id = ItemId::new("p1");
        assert_eq!(id.to_string(), "p1");
        assert_eq!(id.as_str(), "p1");
        assert_eq!(ItemId::from("p1"), id);
        assert_eq!(String::from(id), "p1");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let variant = Variant::new("M");
        let json = serde_json::to_string(&variant).unwrap_or_default();
        assert_eq!(json, "\"M\"");
    }
}
