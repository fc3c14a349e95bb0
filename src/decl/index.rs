//! Visible type declarations, looked up by qualified name

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{location, CompilationUnit, Declaration, TypeDecl, TypeName};
use crate::diagnostic::SourceLocation;

/// Where a visible declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Analyzed (and scanned for markers) in the current pass
    Scanned,
    /// Only visible, e.g. already compiled dependencies
    Classpath,
}

#[derive(Debug, Clone)]
pub struct IndexedType {
    pub name: TypeName,
    pub decl: TypeDecl,
    pub location: SourceLocation,
    pub origin: Origin,
}

/// Resolves target type names during validation
pub trait TypeLookup {
    /// Look up by qualified name, or by binary name for nested types
    fn find_type(&self, name: &str) -> Option<&IndexedType>;
}

/// Every type declaration visible to the current pass
///
/// Nested types are found by qualified (`a.Outer.Inner`) and by binary
/// (`a.Outer$Inner`) name.
#[derive(Debug, Default)]
pub struct DeclarationIndex {
    types: FxHashMap<String, IndexedType>,
    /// Binary name -> qualified name, nested types only
    binary_names: FxHashMap<String, String>,
}

impl DeclarationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every type in `unit`, nested ones included
    ///
    /// A scanned declaration replaces a classpath one with the same name,
    /// never the other way round.
    pub fn add_unit(&mut self, unit: &CompilationUnit, origin: Origin) {
        let file = unit.file_name();
        for declaration in &unit.declarations {
            if let Declaration::Type { decl } = declaration {
                let name = unit.top_level_name(&decl.name);
                self.add_type(&file, name, decl, origin);
            }
        }
    }

    fn add_type(&mut self, file: &Arc<str>, name: TypeName, decl: &TypeDecl, origin: Origin) {
        for member in &decl.members {
            if let Declaration::Type { decl: nested } = member {
                self.add_type(file, name.nested(&nested.name), nested, origin);
            }
        }

        let keep_existing = matches!(
            self.types.get(&name.qualified),
            Some(existing) if existing.origin == Origin::Scanned && origin == Origin::Classpath
        );
        if keep_existing {
            return;
        }

        if name.binary != name.qualified {
            self.binary_names.insert(name.binary.clone(), name.qualified.clone());
        }
        self.types.insert(
            name.qualified.clone(),
            IndexedType {
                location: location(file, decl.line, decl.column),
                name,
                decl: decl.clone(),
                origin,
            },
        );
    }
}

impl TypeLookup for DeclarationIndex {
    fn find_type(&self, name: &str) -> Option<&IndexedType> {
        self.types.get(name).or_else(|| {
            let qualified = self.binary_names.get(name)?;
            self.types.get(qualified)
        })
    }
}
