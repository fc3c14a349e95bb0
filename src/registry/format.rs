//! Line-oriented registry file format
//!
//! ```text
//! VERSION <string>
//! TYPE <currentType> <targetType> <KIND> [INTERNAL]
//! STATIC <ownerType> <methodName> <signature> <targetOwnerType> <targetMethodName> [INTERNAL]
//! ```
//!
//! Fields are separated by single spaces. Any line that does not match one
//! of these shapes is fatal, blank lines included.

use std::fmt::Write as _;

use super::model::{BindingKind, MethodEntry, MethodKey, MethodRef, Registry, TypeEntry};
use crate::error::LinkError;

const INTERNAL: &str = "INTERNAL";

/// Parse a whole registry file
pub fn parse(text: &str) -> Result<Registry, LinkError> {
    let mut registry = Registry::new();
    for (index, line) in text.lines().enumerate() {
        parse_line(&mut registry, line).map_err(|reason| LinkError::MalformedRegistry {
            line_no: index + 1,
            line: line.to_string(),
            reason,
        })?;
    }
    Ok(registry)
}

fn parse_line(registry: &mut Registry, line: &str) -> Result<(), String> {
    if let Some(version) = line.strip_prefix("VERSION ") {
        registry.version = Some(version.to_string());
        return Ok(());
    }

    let fields: Vec<&str> = line.split(' ').collect();
    if fields.iter().any(|f| f.is_empty()) {
        return Err("empty field".into());
    }

    match fields[0] {
        "TYPE" => {
            let internal = internal_flag(&fields, 4)?;
            let kind = fields[3]
                .parse::<BindingKind>()
                .map_err(|e| e.to_string())?;
            registry.types.insert(
                fields[1].to_string(),
                TypeEntry {
                    target: fields[2].to_string(),
                    kind,
                    internal,
                },
            );
        }
        "STATIC" => {
            let internal = internal_flag(&fields, 6)?;
            registry.methods.insert(
                MethodKey::new(fields[1], fields[2], fields[3]),
                MethodEntry {
                    target: MethodRef::new(fields[4], fields[5]),
                    internal,
                },
            );
        }
        other => return Err(format!("unknown record '{other}'")),
    }
    Ok(())
}

/// `required` fields, optionally followed by `INTERNAL`
fn internal_flag(fields: &[&str], required: usize) -> Result<bool, String> {
    match fields.len() {
        n if n == required => Ok(false),
        n if n == required + 1 && fields[required] == INTERNAL => Ok(true),
        n if n == required + 1 => Err(format!("expected {INTERNAL}, found '{}'", fields[required])),
        n => Err(format!("expected {} or {} fields, found {n}", required, required + 1)),
    }
}

/// A version that would not survive a round trip through the header line
pub fn check_version(version: &str) -> Result<(), LinkError> {
    if version.trim().is_empty() || version.contains(['\n', '\r']) {
        return Err(LinkError::InvalidVersion {
            version: version.to_string(),
        });
    }
    Ok(())
}

/// Render the full file: version header, type records, then method records
pub fn render(registry: &Registry, version: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "VERSION {version}");
    for (current, entry) in &registry.types {
        let _ = write!(out, "TYPE {current} {} {}", entry.target, entry.kind);
        push_internal(&mut out, entry.internal);
    }
    for (key, entry) in &registry.methods {
        let _ = write!(
            out,
            "STATIC {} {} {} {} {}",
            key.owner, key.name, key.descriptor, entry.target.owner, entry.target.name
        );
        push_internal(&mut out, entry.internal);
    }
    out
}

fn push_internal(out: &mut String, internal: bool) {
    if internal {
        out.push(' ');
        out.push_str(INTERNAL);
    }
    out.push('\n');
}
