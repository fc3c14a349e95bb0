//! Pending binding set for the current pass
//!
//! Records are created by the scanner and discarded once the pass has been
//! merged. A record without a target is an explicit un-bind.

use std::collections::BTreeMap;

use crate::diagnostic::SourceLocation;
use crate::registry::{BindingKind, MethodKey, MethodRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTarget {
    pub target: String,
    pub kind: BindingKind,
}

#[derive(Debug, Clone)]
pub struct TypeBindingRecord {
    pub location: SourceLocation,
    pub current: String,
    pub target: Option<TypeTarget>,
}

#[derive(Debug, Clone)]
pub struct MethodBindingRecord {
    pub location: SourceLocation,
    pub key: MethodKey,
    pub target: Option<MethodRef>,
}

/// Records keyed by the bound side; a later record for the same key wins
#[derive(Debug, Default)]
pub struct PendingBindings {
    types: BTreeMap<String, TypeBindingRecord>,
    methods: BTreeMap<MethodKey, MethodBindingRecord>,
}

impl PendingBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, record: TypeBindingRecord) {
        self.types.insert(record.current.clone(), record);
    }

    pub fn add_method(&mut self, record: MethodBindingRecord) {
        self.methods.insert(record.key.clone(), record);
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeBindingRecord> {
        self.types.values()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodBindingRecord> {
        self.methods.values()
    }

    pub fn type_record(&self, current: &str) -> Option<&TypeBindingRecord> {
        self.types.get(current)
    }

    pub fn contains_type(&self, current: &str) -> bool {
        self.types.contains_key(current)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}
