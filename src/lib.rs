//! apilink - build-time API binding registry linker

pub mod config;
pub mod decl;
pub mod descriptor;
pub mod diagnostic;
pub mod error;
pub mod ident;
pub mod linker;
pub mod pending;
pub mod registry;
pub mod scanner;

pub use config::{LinkSettings, LinkerConfig};
pub use decl::{CompilationUnit, DeclarationIndex, Origin, TypeLookup};
pub use diagnostic::{Diagnostic, SourceLocation};
pub use error::{FixSuggestion, LinkError};
pub use linker::{Linker, PassReport};
pub use pending::{MethodBindingRecord, PendingBindings, TypeBindingRecord, TypeTarget};
pub use registry::{merge, BindingKind, MergeOutcome, MethodKey, MethodRef, Registry, RegistryStore};
pub use scanner::Scanner;
