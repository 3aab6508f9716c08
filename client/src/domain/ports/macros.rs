//! Helper macro for generating domain port error enums.
//!
//! Every port failure carries one human-readable `message` captured from
//! the adapter. The macro derives `thiserror::Error`, emits a snake-case
//! constructor per variant accepting `impl Into<String>`, and a `message()`
//! accessor shared by all variants.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $format:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($format)]
                $variant {
                    /// Adapter-supplied detail.
                    message: String,
                },
            )*
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = concat!("Construct [`", stringify!($name), "::", stringify!($variant), "`].")]
                    pub fn [<$variant:snake>](message: impl Into<String>) -> Self {
                        Self::$variant {
                            message: message.into(),
                        }
                    }
                }
            )*

            /// Adapter-supplied detail for any variant.
            pub fn message(&self) -> &str {
                match self {
                    $(Self::$variant { message } => message.as_str(),)*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum ExamplePortError {
            Offline => "backend offline: {message}",
            Rejected => "request rejected: {message}",
        }
    }

    #[test]
    fn constructors_accept_str() {
        let err = ExamplePortError::offline("dns lookup failed");
        assert_eq!(err.to_string(), "backend offline: dns lookup failed");
    }

    #[test]
    fn message_accessor_covers_every_variant() {
        assert_eq!(ExamplePortError::rejected(String::from("quota")).message(), "quota");
        assert_eq!(ExamplePortError::offline("x").message(), "x");
    }
}
