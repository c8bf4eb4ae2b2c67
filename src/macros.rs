/// Implements `From<T>` in both directions for a newtype wrapper around `T`.
#[macro_export]
macro_rules! impl_from_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl From<$primitive> for $wrapper {
            fn from(value: $primitive) -> Self {
                Self(value)
            }
        }

        impl From<$wrapper> for $primitive {
            fn from(wrapper: $wrapper) -> Self {
                wrapper.0
            }
        }
    };
}

/// Forwards `Display` of a newtype wrapper to its inner value.
///
/// Identifiers end up in log fields and error messages; printing them as
/// the bare number keeps both readable (`product 42` instead of `ProductId(42)`).
#[macro_export]
macro_rules! impl_display_inner {
    ($wrapper:ident) => {
        impl std::fmt::Display for $wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

/// Declares an opaque `u64` identifier newtype with the usual derives.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);
        $crate::impl_from_primitive!($name, u64);
        $crate::impl_display_inner!($name);
    };
}
