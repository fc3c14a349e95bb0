//! Scanner Module - binding marker extraction (v0.1)
//!
//! Walks one compilation unit and turns binding markers into pending
//! records. Every class, interface and static method produces a record;
//! one without a marker un-binds whatever an earlier pass recorded for it.
//!
//! Marker rules (a violation drops only the offending declaration):
//! - `@Service` requires `@Provides` and excludes `@Provided`
//! - `@Provides` + `@Provided` must carry the same value (two-way binding)
//! - values are `type[#method]`; the method part is for static methods only
//! - a type path starting with an uppercase letter is a short form
//!   relative to the configured prefix

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::decl::{self, CompilationUnit, Declaration, Marker, MarkerKind, MethodDecl, TypeDecl, TypeName};
use crate::descriptor;
use crate::diagnostic::{Diagnostic, SourceLocation};
use crate::ident;
use crate::pending::{MethodBindingRecord, PendingBindings, TypeBindingRecord, TypeTarget};
use crate::registry::{BindingKind, MethodKey, MethodRef};

pub const DEFAULT_SHORT_FORM_PREFIX: &str = "com.jetbrains.";

/// Extracts binding records from analyzed units
#[derive(Debug, Clone)]
pub struct Scanner {
    short_form_prefix: String,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_FORM_PREFIX)
    }
}

impl Scanner {
    pub fn new(short_form_prefix: impl Into<String>) -> Self {
        Self {
            short_form_prefix: short_form_prefix.into(),
        }
    }

    /// Scan `unit` into `pending`, returning declaration-site errors
    #[instrument(skip_all, fields(file = %unit.file_name()))]
    pub fn scan_unit(&self, unit: &CompilationUnit, pending: &mut PendingBindings) -> Vec<Diagnostic> {
        let mut scan = UnitScan {
            scanner: self,
            unit,
            file: unit.file_name(),
            pending,
            diagnostics: Vec::new(),
        };
        for declaration in &unit.declarations {
            scan.visit(declaration, None);
        }
        debug!(errors = scan.diagnostics.len(), "unit scanned");
        scan.diagnostics
    }

    fn expand(&self, type_path: &str) -> String {
        if type_path.starts_with(|c: char| c.is_uppercase()) {
            format!("{}{type_path}", self.short_form_prefix)
        } else {
            type_path.to_string()
        }
    }
}

/// What a declaration's markers ask for
enum Markers<'m> {
    Absent,
    /// Already reported
    Rejected,
    Bound { kind: BindingKind, marker: &'m Marker },
}

struct UnitScan<'s> {
    scanner: &'s Scanner,
    unit: &'s CompilationUnit,
    file: Arc<str>,
    pending: &'s mut PendingBindings,
    diagnostics: Vec<Diagnostic>,
}

impl UnitScan<'_> {
    fn visit(&mut self, declaration: &Declaration, enclosing: Option<&TypeName>) {
        match declaration {
            Declaration::Type { decl } => {
                let name = match enclosing {
                    Some(outer) => outer.nested(&decl.name),
                    None => self.unit.top_level_name(&decl.name),
                };
                if decl.kind.is_class_or_interface() {
                    self.scan_type(decl, &name);
                } else {
                    let at = decl::location(&self.file, decl.line, decl.column);
                    self.reject_placement(&decl.markers, &at);
                }
                for member in &decl.members {
                    self.visit(member, Some(&name));
                }
            }
            Declaration::Method { method } => {
                let at = decl::location(&self.file, method.line, method.column);
                match enclosing {
                    Some(owner) if method.is_static() => self.scan_static_method(method, owner, at),
                    _ => self.reject_placement(&method.markers, &at),
                }
            }
            Declaration::Field { field: member } | Declaration::Constructor { constructor: member } => {
                let at = decl::location(&self.file, member.line, member.column);
                self.reject_placement(&member.markers, &at);
            }
        }
    }

    fn scan_type(&mut self, decl: &TypeDecl, name: &TypeName) {
        let declared_at = decl::location(&self.file, decl.line, decl.column);
        let (location, target) = match self.read_markers(&decl.markers, &declared_at) {
            Markers::Rejected => return,
            Markers::Absent => (declared_at, None),
            Markers::Bound { kind, marker } => {
                let at = decl::marker_location(&self.file, marker, &declared_at);
                let Some(target) = self.target_type(&marker.value, &at) else {
                    return;
                };
                (at, Some(TypeTarget { target, kind }))
            }
        };

        debug!(current = %name.qualified, target = ?target, "type binding");
        self.pending.add_type(TypeBindingRecord {
            location,
            current: name.qualified.clone(),
            target,
        });
    }

    fn scan_static_method(&mut self, method: &MethodDecl, owner: &TypeName, declared_at: SourceLocation) {
        let (location, target) = match self.read_markers(&method.markers, &declared_at) {
            Markers::Rejected => return,
            Markers::Absent => (declared_at, None),
            Markers::Bound { kind, marker } => {
                let at = decl::marker_location(&self.file, marker, &declared_at);
                if kind != BindingKind::Provides {
                    self.error(at, "only @Provides is allowed on static methods");
                    return;
                }
                let (type_path, method_name) = match marker.value.split_once('#') {
                    Some((type_path, method_name)) => {
                        if !ident::is_identifier(method_name) {
                            self.error(at, format!("invalid method identifier: {method_name}"));
                            return;
                        }
                        (type_path, method_name)
                    }
                    None => (marker.value.as_str(), method.name.as_str()),
                };
                let Some(target_owner) = self.target_type(type_path, &at) else {
                    return;
                };
                (at, Some(MethodRef::new(target_owner, method_name)))
            }
        };

        let key = MethodKey::new(&owner.qualified, &method.name, descriptor::of_method(method));
        debug!(method = %key, target = ?target, "static method binding");
        self.pending.add_method(MethodBindingRecord { location, key, target });
    }

    /// Combine the markers of one declaration into a single binding
    fn read_markers<'m>(&mut self, markers: &'m [Marker], declared_at: &SourceLocation) -> Markers<'m> {
        let (mut service, mut provides, mut provided) = (None, None, None);
        for marker in markers {
            let slot = match marker.kind {
                MarkerKind::Service => &mut service,
                MarkerKind::Provides => &mut provides,
                MarkerKind::Provided => &mut provided,
            };
            if slot.replace(marker).is_some() {
                let at = decl::marker_location(&self.file, marker, declared_at);
                self.error(at, format!("duplicate {} marker", marker.kind.label()));
                return Markers::Rejected;
            }
        }

        let (kind, marker) = match (service, provides, provided) {
            (None, None, None) => return Markers::Absent,
            (Some(service), None, _) => {
                let at = decl::marker_location(&self.file, service, declared_at);
                self.error(at, "@Service also requires @Provides");
                return Markers::Rejected;
            }
            (Some(service), Some(_), Some(_)) => {
                let at = decl::marker_location(&self.file, service, declared_at);
                self.error(at, "@Service cannot be used with @Provided");
                return Markers::Rejected;
            }
            (Some(_), Some(provides), None) => (BindingKind::Service, provides),
            (None, Some(provides), Some(provided)) => {
                if provides.value != provided.value {
                    let at = decl::marker_location(&self.file, provides, declared_at);
                    self.error(at, "@Provided and @Provides values do not match");
                    return Markers::Rejected;
                }
                (BindingKind::TwoWay, provides)
            }
            (None, Some(provides), None) => (BindingKind::Provides, provides),
            (None, None, Some(provided)) => (BindingKind::Provided, provided),
        };

        if marker.value.is_empty() {
            let at = decl::marker_location(&self.file, marker, declared_at);
            self.error(at, "empty API binding");
            return Markers::Rejected;
        }
        Markers::Bound { kind, marker }
    }

    /// Markers on something that cannot be bound
    fn reject_placement(&mut self, markers: &[Marker], declared_at: &SourceLocation) {
        if let Markers::Bound { marker, .. } = self.read_markers(markers, declared_at) {
            let at = decl::marker_location(&self.file, marker, declared_at);
            self.error(at, "API binding markers are only allowed on classes, interfaces and static methods");
        }
    }

    fn target_type(&mut self, type_path: &str, at: &SourceLocation) -> Option<String> {
        if !ident::is_type_path(type_path) {
            self.error(at.clone(), format!("invalid type identifier: {type_path}"));
            return None;
        }
        Some(self.scanner.expand(type_path))
    }

    fn error(&mut self, at: SourceLocation, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(at, message));
    }
}
