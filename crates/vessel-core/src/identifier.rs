//! Plugin identity.
//!
//! Every plugin unit is identified by a `(group, name)` pair with the
//! canonical textual form `group:name`. Identifiers key every map in the
//! candidate registry, the resolver, and the live instance table, so the type
//! is `Ord` (group first, then name) and hash-stable, and it serializes as its
//! canonical string so manifest documents can use it as a JSON map key.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::IdentifierError;

/// Identity of a plugin unit: a `(group, name)` pair.
///
/// Two identifiers are equal iff both components match exactly
/// (case-sensitive). [`FromStr`] and [`fmt::Display`] round-trip through the
/// canonical `group:name` form; parsing rejects empty input and anything
/// without exactly two non-empty colon-separated parts.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginIdentifier {
    group: String,
    name: String,
}

impl PluginIdentifier {
    /// Creates an identifier from its components.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyComponent`] when either component is
    /// empty.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let group = group.into();
        let name = name.into();
        if group.is_empty() || name.is_empty() {
            return Err(IdentifierError::EmptyComponent);
        }
        Ok(Self { group, name })
    }

    /// The group component.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The name component.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PluginIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl FromStr for PluginIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(name), None) if !group.is_empty() && !name.is_empty() => {
                Self::new(group, name)
            }
            _ => Err(IdentifierError::Malformed(s.to_string())),
        }
    }
}

impl Serialize for PluginIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PluginIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdentifierVisitor;

        impl Visitor<'_> for IdentifierVisitor {
            type Value = PluginIdentifier;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a plugin identifier of the form 'group:name'")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(IdentifierVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let id: PluginIdentifier = "core:combat".parse().unwrap();
        assert_eq!(id.group(), "core");
        assert_eq!(id.name(), "combat");
        assert_eq!(id.to_string().parse::<PluginIdentifier>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(
            "".parse::<PluginIdentifier>().unwrap_err(),
            IdentifierError::Empty
        );
    }

    #[test]
    fn parse_rejects_missing_colon() {
        assert!(matches!(
            "combat".parse::<PluginIdentifier>().unwrap_err(),
            IdentifierError::Malformed(_)
        ));
    }

    #[test]
    fn parse_rejects_extra_colon() {
        assert!(matches!(
            "core:combat:extra".parse::<PluginIdentifier>().unwrap_err(),
            IdentifierError::Malformed(_)
        ));
    }

    #[test]
    fn parse_rejects_empty_components() {
        assert!("core:".parse::<PluginIdentifier>().is_err());
        assert!(":combat".parse::<PluginIdentifier>().is_err());
        assert!(":".parse::<PluginIdentifier>().is_err());
    }

    #[test]
    fn equality_is_case_sensitive() {
        let lower: PluginIdentifier = "core:combat".parse().unwrap();
        let upper: PluginIdentifier = "core:Combat".parse().unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn ordering_compares_group_then_name() {
        let a: PluginIdentifier = "aaa:zzz".parse().unwrap();
        let b: PluginIdentifier = "bbb:aaa".parse().unwrap();
        let c: PluginIdentifier = "bbb:bbb".parse().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn serde_uses_canonical_form() {
        let id: PluginIdentifier = "core:combat".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"core:combat\"");
        let back: PluginIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
