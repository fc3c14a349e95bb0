//! Identifier validation for binding targets
//!
//! Host identifiers:
//! - Start with a letter, `_` or `$`
//! - Continue with letters, digits, `_` or `$`
//!
//! Type paths are one or more identifiers joined by `.`; binary names may
//! carry `$` for nested types (`com.example.Outer$Inner`).

use once_cell::sync::Lazy;
use regex::Regex;

/// Precompiled single-identifier pattern (Unicode letters and digits)
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{Nl}_$][\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}$]*$")
        .expect("identifier pattern is valid")
});

/// Check a single identifier (`doThing`, `$impl`, `_x1`)
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Check a dotted identifier path (`com.example.Api`)
///
/// Empty segments (`a..b`, `.a`, `a.`) are rejected.
pub fn is_type_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_identifier)
}
