//! Declaration Module - compiled unit declaration trees (v0.1)
//!
//! The host compiler hands over one declaration tree per analyzed unit.
//! Units are read from YAML:
//!
//! ```yaml
//! file: src/com/example/Api.java   # optional, defaults to the YAML path
//! package: com.example
//! declarations:
//!   - type:
//!       name: Api
//!       kind: interface
//!       line: 4
//!       markers:
//!         - { kind: provides, value: com.example.ApiImpl, line: 3 }
//!       members:
//!         - method:
//!             name: doThing
//!             modifiers: [public, static]
//!             params: [int, java.lang.String]
//!             returns: void
//! ```
//!
//! - `types`: type references inside signatures
//! - `index`: lookup of visible type declarations by qualified name

mod index;
mod types;

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::diagnostic::SourceLocation;
use crate::error::LinkError;

pub use index::{DeclarationIndex, IndexedType, Origin, TypeLookup};
pub use types::{Primitive, TypeRef, OBJECT};

/// One analyzed compilation unit
#[derive(Debug, Clone, Deserialize)]
pub struct CompilationUnit {
    /// Source path used for diagnostics
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl CompilationUnit {
    /// Parse a unit; `origin` names it when the document has no `file:`
    pub fn from_yaml(yaml: &str, origin: &str) -> Result<Self, serde_yaml::Error> {
        let mut unit: CompilationUnit = serde_yaml::from_str(yaml)?;
        if unit.file.is_none() {
            unit.file = Some(origin.to_string());
        }
        Ok(unit)
    }

    /// Read and parse a unit file
    pub fn load(path: &Path) -> Result<Self, LinkError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml, &path.to_string_lossy()).map_err(|source| LinkError::UnitParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Shared file name for every location in this unit
    pub fn file_name(&self) -> Arc<str> {
        Arc::from(self.file.as_deref().unwrap_or("<unknown>"))
    }

    /// Name for a top-level type of this unit
    pub fn top_level_name(&self, simple: &str) -> TypeName {
        match self.package.as_deref() {
            Some(package) if !package.is_empty() && !simple.contains('.') => {
                let qualified = format!("{package}.{simple}");
                TypeName {
                    binary: qualified.clone(),
                    qualified,
                }
            }
            _ => TypeName {
                qualified: simple.to_string(),
                binary: simple.to_string(),
            },
        }
    }
}

/// The declaration variants a unit tree is made of
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Declaration {
    Type {
        #[serde(rename = "type")]
        decl: TypeDecl,
    },
    Method {
        method: MethodDecl,
    },
    Field {
        field: MemberDecl,
    },
    Constructor {
        constructor: MemberDecl,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    /// Kinds that may carry binding markers and be extended by a proxy
    pub fn is_class_or_interface(self) -> bool {
        matches!(self, Self::Class | Self::Interface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Sealed,
    NonSealed,
    Abstract,
    Default,
    Native,
    Synchronized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Service,
    Provides,
    Provided,
}

impl MarkerKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Service => "@Service",
            Self::Provides => "@Provides",
            Self::Provided => "@Provided",
        }
    }
}

/// A binding marker attached to a declaration
#[derive(Debug, Clone, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    /// `ownertype[#methodName]`; unused for `service`
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeDecl {
    /// Simple name; a dotted name is taken as already qualified
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub members: Vec<Declaration>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl TypeDecl {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Neither `final` nor `sealed`
    pub fn is_inheritable(&self) -> bool {
        !self.has(Modifier::Final) && !self.has(Modifier::Sealed)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Declaration::Method { method } => Some(method),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub params: Vec<TypeRef>,
    #[serde(default)]
    pub returns: TypeRef,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl MethodDecl {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_static(&self) -> bool {
        self.has(Modifier::Static)
    }
}

/// Fields and constructors: only tracked so misplaced markers get reported
#[derive(Debug, Clone, Deserialize)]
pub struct MemberDecl {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// Canonical (`a.Outer.Inner`) and binary (`a.Outer$Inner`) names of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub qualified: String,
    pub binary: String,
}

impl TypeName {
    pub fn nested(&self, simple: &str) -> TypeName {
        TypeName {
            qualified: format!("{}.{simple}", self.qualified),
            binary: format!("{}${simple}", self.binary),
        }
    }
}

/// Location of a declaration, or of one of its markers when it has a line
pub(crate) fn location(file: &Arc<str>, line: u32, column: u32) -> SourceLocation {
    SourceLocation::new(Arc::clone(file), line, column)
}

pub(crate) fn marker_location(file: &Arc<str>, marker: &Marker, fallback: &SourceLocation) -> SourceLocation {
    match marker.line {
        Some(line) => location(file, line, marker.column.unwrap_or(0)),
        None => fallback.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT_YAML: &str = r#"
package: com.example
declarations:
  - type:
      name: Api
      kind: interface
      line: 4
      markers:
        - { kind: provides, value: ApiImpl, line: 3, column: 1 }
      members:
        - method:
            name: create
            modifiers: [public, static]
            params: [int, "java.util.List<java.lang.String>"]
            returns: com.example.Api
        - field:
            name: INSTANCE
            modifiers: [static, final]
        - type:
            name: Nested
            modifiers: [non-sealed]
"#;

    #[test]
    fn parse_unit_with_nested_members() {
        let unit = CompilationUnit::from_yaml(UNIT_YAML, "Api.yaml").unwrap();
        assert_eq!(unit.file.as_deref(), Some("Api.yaml"));
        assert_eq!(unit.declarations.len(), 1);

        let Declaration::Type { decl } = &unit.declarations[0] else {
            panic!("Expected type declaration");
        };
        assert_eq!(decl.kind, TypeKind::Interface);
        assert_eq!(decl.markers[0].kind, MarkerKind::Provides);
        assert_eq!(decl.markers[0].value, "ApiImpl");
        assert_eq!(decl.members.len(), 3);

        let method = decl.methods().next().unwrap();
        assert!(method.is_static());
        assert_eq!(method.params[1], TypeRef::declared("java.util.List"));
        assert!(matches!(decl.members[1], Declaration::Field { .. }));
        assert!(matches!(decl.members[2], Declaration::Type { .. }));
    }

    #[test]
    fn explicit_file_wins_over_origin() {
        let unit = CompilationUnit::from_yaml("file: src/A.java\ndeclarations: []", "a.yaml").unwrap();
        assert_eq!(&*unit.file_name(), "src/A.java");
    }

    #[test]
    fn nested_names_use_dollar_in_binary_form() {
        let unit = CompilationUnit::from_yaml(UNIT_YAML, "Api.yaml").unwrap();
        let outer = unit.top_level_name("Api");
        let inner = outer.nested("Nested");
        assert_eq!(inner.qualified, "com.example.Api.Nested");
        assert_eq!(inner.binary, "com.example.Api$Nested");
    }

    #[test]
    fn default_package_keeps_simple_name() {
        let unit = CompilationUnit::from_yaml("declarations: []", "x.yaml").unwrap();
        assert_eq!(unit.top_level_name("Api").qualified, "Api");
    }

    #[test]
    fn inheritability_checks_final_and_sealed() {
        let unit = CompilationUnit::from_yaml(
            "declarations:\n  - type: { name: A, modifiers: [final] }\n  - type: { name: B, modifiers: [sealed] }\n  - type: { name: C }",
            "x.yaml",
        )
        .unwrap();
        let inheritable: Vec<bool> = unit
            .declarations
            .iter()
            .map(|d| match d {
                Declaration::Type { decl } => decl.is_inheritable(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(inheritable, vec![false, false, true]);
    }
}
