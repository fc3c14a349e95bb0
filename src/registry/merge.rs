//! Merge/validate engine
//!
//! Folds one pass's pending bindings into the registry carried over from
//! earlier passes, in this order:
//!
//! 1. supersede every entry whose key was presented this pass
//! 2. drop method entries owned by a type presented this pass
//! 3. index the untouched entries by target
//! 4. insert the new entries
//! 5. report type conflicts, then validate the new type entries
//! 6. the same for method entries
//! 7. validate every remaining entry
//!
//! Validation never short-circuits on earlier passes: a target that was not
//! visible before may have been compiled since.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument};

use super::model::{BindingKind, MethodEntry, MethodKey, MethodRef, Registry, TypeEntry};
use crate::decl::{Modifier, Origin, TypeLookup};
use crate::descriptor;
use crate::diagnostic::{Diagnostic, SourceLocation};
use crate::pending::{MethodBindingRecord, PendingBindings, TypeBindingRecord};

/// Result of one merge; the registry is meant to be persisted even when
/// errors were found
#[derive(Debug)]
pub struct MergeOutcome {
    pub registry: Registry,
    /// Errors anchored at a declaration visible to this pass
    pub diagnostics: Vec<Diagnostic>,
    /// Errors about carried-over entries with no location in this pass
    pub unresolved: Vec<String>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.unresolved.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BindingKey {
    Type(String),
    Method(MethodKey),
}

/// Merge `pending` into `previous`, resolving targets against `visible`
#[instrument(skip_all, fields(
    types = pending.type_count(),
    methods = pending.method_count(),
    carried = previous.types.len() + previous.methods.len(),
))]
pub fn merge(previous: Registry, pending: &PendingBindings, visible: &dyn TypeLookup) -> MergeOutcome {
    let mut registry = previous;
    let mut checker = Checker::new(visible);

    // Supersede
    let mut replaced_types: FxHashMap<&str, TypeEntry> = FxHashMap::default();
    for record in pending.types() {
        if let Some(old) = registry.types.remove(&record.current) {
            replaced_types.insert(&record.current, old);
        }
    }
    let mut replaced_methods: FxHashMap<&MethodKey, MethodEntry> = FxHashMap::default();
    for record in pending.methods() {
        if let Some(old) = registry.methods.remove(&record.key) {
            replaced_methods.insert(&record.key, old);
        }
    }

    // Cascade
    let before = registry.methods.len();
    registry.methods.retain(|key, _| !pending.contains_type(&key.owner));
    if registry.methods.len() != before {
        debug!(dropped = before - registry.methods.len(), "dropped methods of rebound owners");
    }

    let mut inverse_types = checker.inverse_types(&registry);
    let mut inverse_methods = checker.inverse_methods(&registry);

    // Insert
    for record in pending.types() {
        let Some(target) = &record.target else {
            continue;
        };
        let internal = replaced_types
            .get(record.current.as_str())
            .is_some_and(|old| old.internal && old.target == target.target && old.kind == target.kind);
        registry.types.insert(
            record.current.clone(),
            TypeEntry {
                target: target.target.clone(),
                kind: target.kind,
                internal,
            },
        );
    }
    for record in pending.methods() {
        let Some(target) = &record.target else {
            continue;
        };
        let internal = replaced_methods
            .get(&record.key)
            .is_some_and(|old| old.internal && old.target == *target);
        registry.methods.insert(
            record.key.clone(),
            MethodEntry {
                target: target.clone(),
                internal,
            },
        );
    }

    for record in pending.types().filter(|r| r.target.is_some()) {
        checker.check_type_conflicts(&registry, &mut inverse_types, record);
        if let Some(entry) = registry.types.get_mut(&record.current) {
            checker.validate_type(&record.current, entry, Some(&record.location));
        }
    }

    for record in pending.methods().filter(|r| r.target.is_some()) {
        checker.check_method_conflicts(&registry, &mut inverse_methods, record);
        if let Some(entry) = registry.methods.get_mut(&record.key) {
            checker.validate_method(&record.key, entry, Some(&record.location));
        }
    }

    // Revalidate carried-over entries
    for (current, entry) in registry.types.iter_mut() {
        let anchor = checker.scanned_location(&entry.target);
        checker.validate_type(current, entry, anchor.as_ref());
    }
    for (key, entry) in registry.methods.iter_mut() {
        let anchor = checker.scanned_location(&entry.target.owner);
        checker.validate_method(key, entry, anchor.as_ref());
    }

    debug!(
        types = registry.types.len(),
        methods = registry.methods.len(),
        diagnostics = checker.diagnostics.len(),
        unresolved = checker.unresolved.len(),
        "merge complete"
    );

    MergeOutcome {
        registry,
        diagnostics: checker.diagnostics,
        unresolved: checker.unresolved,
    }
}

struct Checker<'a> {
    visible: &'a dyn TypeLookup,
    validated: FxHashSet<BindingKey>,
    diagnostics: Vec<Diagnostic>,
    unresolved: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(visible: &'a dyn TypeLookup) -> Self {
        Self {
            visible,
            validated: FxHashSet::default(),
            diagnostics: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    fn report(&mut self, anchor: Option<&SourceLocation>, message: String) {
        match anchor {
            Some(location) => self.diagnostics.push(Diagnostic::error(location.clone(), message)),
            None => self.unresolved.push(message),
        }
    }

    /// Declaration site of a target compiled in this pass
    fn scanned_location(&self, target_type: &str) -> Option<SourceLocation> {
        self.visible
            .find_type(target_type)
            .filter(|found| found.origin == Origin::Scanned)
            .map(|found| found.location.clone())
    }

    /// `target -> current` over carried-over type entries
    fn inverse_types(&mut self, registry: &Registry) -> FxHashMap<String, String> {
        let mut inverse: FxHashMap<String, String> = FxHashMap::default();
        for (current, entry) in &registry.types {
            match inverse.get_mut(&entry.target) {
                Some(names) => {
                    self.unresolved.push(format!(
                        "conflicting API binding: {names} and {current} bind to the same type"
                    ));
                    names.push(',');
                    names.push_str(current);
                }
                None => {
                    inverse.insert(entry.target.clone(), current.clone());
                }
            }
        }
        inverse
    }

    /// `(targetOwner, targetMethod, signature) -> (owner, method)` over
    /// carried-over method entries
    fn inverse_methods(&mut self, registry: &Registry) -> FxHashMap<MethodKey, MethodRef> {
        let mut inverse: FxHashMap<MethodKey, MethodRef> = FxHashMap::default();
        for (key, entry) in &registry.methods {
            let target_key = MethodKey::new(&entry.target.owner, &entry.target.name, &key.descriptor);
            match inverse.get_mut(&target_key) {
                Some(names) => {
                    self.unresolved.push(format!(
                        "conflicting API binding: {names} and {}#{} bind to the same method",
                        key.owner, key.name
                    ));
                    chain_method(names, &key.owner, &key.name);
                }
                None => {
                    inverse.insert(target_key, MethodRef::new(&key.owner, &key.name));
                }
            }
        }
        inverse
    }

    fn check_type_conflicts(
        &mut self,
        registry: &Registry,
        inverse: &mut FxHashMap<String, String>,
        record: &TypeBindingRecord,
    ) {
        let Some(target) = record.target.as_ref().map(|t| t.target.as_str()) else {
            return;
        };
        let current = record.current.as_str();
        let anchor = Some(&record.location);

        match inverse.get_mut(target) {
            Some(names) => {
                let message = format!("conflicting API binding: {current} -> {target} <- {names}");
                names.push(',');
                names.push_str(current);
                self.report(anchor, message);
            }
            None => {
                inverse.insert(target.to_string(), current.to_string());
            }
        }
        if let Some(next) = registry.types.get(target) {
            let message = format!("conflicting API binding: {current} -> {target} -> {}", next.target);
            self.report(anchor, message);
        }
        if let Some(prev) = inverse.get(current) {
            let message = format!("conflicting API binding: {prev} -> {current} -> {target}");
            self.report(anchor, message);
        }
    }

    fn check_method_conflicts(
        &mut self,
        registry: &Registry,
        inverse: &mut FxHashMap<MethodKey, MethodRef>,
        record: &MethodBindingRecord,
    ) {
        let Some(target) = &record.target else {
            return;
        };
        let key = &record.key;
        let current = MethodRef::new(&key.owner, &key.name);
        let target_key = MethodKey::new(&target.owner, &target.name, &key.descriptor);
        let anchor = Some(&record.location);

        match inverse.get_mut(&target_key) {
            Some(names) => {
                let message = format!("conflicting API binding: {current} -> {target} <- {names}");
                chain_method(names, &key.owner, &key.name);
                self.report(anchor, message);
            }
            None => {
                inverse.insert(target_key.clone(), current.clone());
            }
        }
        if let Some(next) = registry.methods.get(&target_key) {
            let message = format!("conflicting API binding: {current} -> {target} -> {}", next.target);
            self.report(anchor, message);
        }
        if let Some(prev) = inverse.get(key) {
            let message = format!("conflicting API binding: {prev} -> {current} -> {target}");
            self.report(anchor, message);
        }
    }

    fn validate_type(&mut self, current: &str, entry: &mut TypeEntry, anchor: Option<&SourceLocation>) {
        if !self.validated.insert(BindingKey::Type(current.to_string())) {
            return;
        }
        let visible = self.visible;
        let Some(found) = visible.find_type(&entry.target) else {
            debug!(current, target = %entry.target, "target type not visible yet");
            return;
        };
        entry.internal = true;
        if entry.kind == BindingKind::Service {
            return;
        }

        let problem = if !found.decl.kind.is_class_or_interface() {
            "not a class or interface"
        } else if !found.decl.is_inheritable() {
            "not inheritable"
        } else {
            return;
        };
        let message = format!("invalid API binding: {current} -> {} ({problem})", entry.target);
        self.report(anchor, message);
    }

    fn validate_method(&mut self, key: &MethodKey, entry: &mut MethodEntry, anchor: Option<&SourceLocation>) {
        if !self.validated.insert(BindingKey::Method(key.clone())) {
            return;
        }
        let visible = self.visible;
        let Some(found) = visible.find_type(&entry.target.owner) else {
            debug!(method = %key, target = %entry.target, "target owner not visible yet");
            return;
        };
        entry.internal = true;

        let matches = found.decl.methods().any(|method| {
            method.name == entry.target.name
                && !method.is_static()
                && !method.has(Modifier::Final)
                && descriptor::of_method(method) == key.descriptor
        });
        if !matches {
            let message = format!(
                "invalid static binding: {}#{} -> {} (no matching method found, type conversions are not allowed for internal bindings)",
                key.owner, key.name, entry.target
            );
            self.report(anchor, message);
        }
    }
}

/// Append another bound side to a conflicting inverse entry
fn chain_method(names: &mut MethodRef, owner: &str, name: &str) {
    names.owner.push(',');
    names.owner.push_str(owner);
    names.name.push(',');
    names.name.push_str(name);
}
