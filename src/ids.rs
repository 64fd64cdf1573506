use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
        pub struct $name(pub ulid::Ulid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(ulid::Ulid::new())
            }

            #[must_use]
            pub fn from_ulid(id: ulid::Ulid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(ulid::Ulid::from_string(s)?))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse::<$name>()
                    .map_err(|_| serde::de::Error::custom(concat!("invalid ", $what)))
            }
        }
    };
}

ulid_id!(
    /// Identity of one request object (plain exchange or wrapper node).
    RequestId,
    "request id"
);

ulid_id!(
    /// Identity of one response object; the link table key.
    ResponseId,
    "response id"
);
