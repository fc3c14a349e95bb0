//! Registry Module - persisted API bindings (v0.1)
//!
//! - `model`: in-memory registry and its entry types
//! - `format`: line-oriented file format
//! - `merge`: merge/validate engine run once per pass
//! - `store`: exclusive file lock and whole-file rewrite

mod format;
mod merge;
mod model;
mod store;

pub use format::{check_version, parse, render};
pub use merge::{merge, MergeOutcome};
pub use model::{
    BindingKind, MethodEntry, MethodKey, MethodRef, MethodRow, Registry, RegistrySnapshot, TypeEntry, TypeRow,
};
pub use store::{LockedRegistry, RegistryStore, DEFAULT_LOCK_RETRY};
