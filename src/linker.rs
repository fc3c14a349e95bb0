//! Compilation pass hook
//!
//! A host delivers zero or more analyzed units followed by exactly one
//! build-finished event. The finishing step runs under the registry lock:
//!
//! ```text
//! idle -> locking -> merging -> writing -> idle
//!                                       \-> build-failed
//! ```
//!
//! Build failure is only raised once the registry has been written.

use tracing::{debug, info, instrument};

use crate::config::LinkSettings;
use crate::decl::{CompilationUnit, DeclarationIndex, Origin};
use crate::diagnostic::Diagnostic;
use crate::error::LinkError;
use crate::pending::PendingBindings;
use crate::registry::{self, RegistryStore};
use crate::scanner::Scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Locking,
    Merging,
    Writing,
    BuildFailed,
}

/// Outcome of a pass that did not fail the build
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub units: usize,
    pub type_records: usize,
    pub method_records: usize,
    /// Registry size after the write
    pub registry_types: usize,
    pub registry_methods: usize,
    /// Declaration-site and merge errors, in report order
    pub diagnostics: Vec<Diagnostic>,
}

impl PassReport {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// One compilation pass
#[derive(Debug)]
pub struct Linker {
    settings: LinkSettings,
    scanner: Scanner,
    visible: DeclarationIndex,
    pending: PendingBindings,
    diagnostics: Vec<Diagnostic>,
    units: usize,
    phase: Phase,
}

impl Linker {
    pub fn new(settings: LinkSettings) -> Self {
        Self {
            scanner: Scanner::new(settings.short_form_prefix.clone()),
            settings,
            visible: DeclarationIndex::new(),
            pending: PendingBindings::new(),
            diagnostics: Vec::new(),
            units: 0,
            phase: Phase::Idle,
        }
    }

    /// Make a unit's types visible for validation without scanning it
    pub fn add_classpath_unit(&mut self, unit: &CompilationUnit) {
        self.visible.add_unit(unit, Origin::Classpath);
    }

    /// Scan an analyzed unit and make its types visible
    pub fn on_unit_analyzed(&mut self, unit: &CompilationUnit) {
        let diagnostics = self.scanner.scan_unit(unit, &mut self.pending);
        self.diagnostics.extend(diagnostics);
        self.visible.add_unit(unit, Origin::Scanned);
        self.units += 1;
    }

    /// Declaration-site errors reported so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Merge this pass into the shared registry
    ///
    /// Takes the registry lock even when nothing was scanned: entries left
    /// unvalidated by earlier passes may be resolvable now.
    #[instrument(skip(self), fields(registry = %self.settings.registry.display(), units = self.units))]
    pub fn on_build_finished(mut self) -> Result<PassReport, LinkError> {
        registry::check_version(&self.settings.impl_version)?;
        let store = RegistryStore::new(&self.settings.registry).with_retry(self.settings.lock_retry);

        self.enter(Phase::Locking);
        let mut locked = store.lock()?;

        self.enter(Phase::Merging);
        let previous = locked.read()?;
        if let Some(version) = previous.version.as_deref() {
            if version != self.settings.impl_version {
                debug!(from = version, to = %self.settings.impl_version, "registry version changes");
            }
        }
        let outcome = registry::merge(previous, &self.pending, &self.visible);

        self.enter(Phase::Writing);
        locked.write(&outcome.registry, &self.settings.impl_version)?;
        drop(locked);

        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        diagnostics.extend(outcome.diagnostics);

        if !outcome.unresolved.is_empty() {
            self.enter(Phase::BuildFailed);
            return Err(LinkError::UnresolvedBindings {
                messages: outcome.unresolved,
                diagnostics,
            });
        }

        self.enter(Phase::Idle);
        let report = PassReport {
            units: self.units,
            type_records: self.pending.type_count(),
            method_records: self.pending.method_count(),
            registry_types: outcome.registry.types.len(),
            registry_methods: outcome.registry.methods.len(),
            diagnostics,
        };
        info!(
            units = report.units,
            types = report.registry_types,
            methods = report.registry_methods,
            errors = report.diagnostics.len(),
            "pass merged"
        );
        Ok(report)
    }

    fn enter(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "pass phase");
        self.phase = next;
    }
}
