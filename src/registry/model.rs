//! Registry data model

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::LinkError;

/// Direction of a type binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingKind {
    /// Singleton entry point; always paired with a Provides marker
    Service,
    /// The current type supplies an implementation
    Provides,
    /// The current type is satisfied by an implementation
    Provided,
    /// Provides and Provided with the same target
    TwoWay,
}

impl BindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "SERVICE",
            Self::Provides => "PROVIDES",
            Self::Provided => "PROVIDED",
            Self::TwoWay => "TWO_WAY",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingKind {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SERVICE" => Ok(Self::Service),
            "PROVIDES" => Ok(Self::Provides),
            "PROVIDED" => Ok(Self::Provided),
            "TWO_WAY" => Ok(Self::TwoWay),
            other => Err(LinkError::UnknownBindingKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Recorded binding of a current type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeEntry {
    pub target: String,
    pub kind: BindingKind,
    /// Target was resolved and validated at least once
    pub internal: bool,
}

/// `(ownerType, methodName, signature)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MethodKey {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MethodKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}{}", self.owner, self.name, self.descriptor)
    }
}

/// `type#method` without a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.name)
    }
}

/// Recorded binding of a static method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodEntry {
    pub target: MethodRef,
    pub internal: bool,
}

/// Resolved bindings shared by every pass of a build
///
/// Ordered maps keep the persisted form and merge diagnostics deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    /// `VERSION` header of the file it was read from
    pub version: Option<String>,
    pub types: BTreeMap<String, TypeEntry>,
    pub methods: BTreeMap<MethodKey, MethodEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.methods.is_empty()
    }

    /// Flat, serializable view (method keys are structs, not map keys)
    pub fn snapshot(&self) -> RegistrySnapshot<'_> {
        RegistrySnapshot {
            version: self.version.as_deref(),
            types: self
                .types
                .iter()
                .map(|(current, entry)| TypeRow { current, entry })
                .collect(),
            methods: self
                .methods
                .iter()
                .map(|(key, entry)| MethodRow {
                    key,
                    target: &entry.target,
                    internal: entry.internal,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrySnapshot<'a> {
    pub version: Option<&'a str>,
    pub types: Vec<TypeRow<'a>>,
    pub methods: Vec<MethodRow<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TypeRow<'a> {
    pub current: &'a str,
    #[serde(flatten)]
    pub entry: &'a TypeEntry,
}

#[derive(Debug, Serialize)]
pub struct MethodRow<'a> {
    #[serde(flatten)]
    pub key: &'a MethodKey,
    pub target: &'a MethodRef,
    pub internal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            BindingKind::Service,
            BindingKind::Provides,
            BindingKind::Provided,
            BindingKind::TwoWay,
        ] {
            assert_eq!(kind.as_str().parse::<BindingKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "BOTH".parse::<BindingKind>().unwrap_err();
        assert!(err.to_string().contains("LINK-011"));
        assert!("provides".parse::<BindingKind>().is_err());
    }

    #[test]
    fn method_keys_sort_by_owner_then_name_then_descriptor() {
        let mut keys = [
            MethodKey::new("b.B", "a", "()V"),
            MethodKey::new("a.A", "z", "()V"),
            MethodKey::new("a.A", "m", "(I)V"),
            MethodKey::new("a.A", "m", "()V"),
        ];
        keys.sort();
        let shown: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["a.A#m()V", "a.A#m(I)V", "a.A#z()V", "b.B#a()V"]);
    }

    #[test]
    fn snapshot_serializes_flat_rows() {
        let mut registry = Registry::new();
        registry.types.insert(
            "a.Api".into(),
            TypeEntry {
                target: "a.Impl".into(),
                kind: BindingKind::TwoWay,
                internal: true,
            },
        );
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["types"][0]["current"], "a.Api");
        assert_eq!(json["types"][0]["kind"], "TWO_WAY");
        assert_eq!(json["types"][0]["internal"], true);
    }
}
