//! Type references used in method signatures
//!
//! Written in unit files as strings:
//! ```text
//! void | int | boolean ...          primitives
//! java.lang.String                  declared (binary name, `$` for nested)
//! java.util.List<java.lang.String>  parameterized (arguments are erased)
//! int[][]                           arrays
//! T extends java.lang.Number        type variable with bound
//! ? | ? extends X | ? super X       wildcards
//! A | B                             union
//! A & B                             intersection
//! ```
//! or as a map `{ var: T, bound: ... }` for type variables.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LinkError;
use crate::ident::is_type_path;

/// Binary name every unbounded construct erases to
pub const OBJECT: &str = "java.lang.Object";

/// Primitive kinds with fixed descriptor codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

/// A reference to a type as it appears in a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "TypeRefRepr")]
pub enum TypeRef {
    #[default]
    Void,
    Primitive(Primitive),
    Array(Box<TypeRef>),
    /// Nominal type by binary name (`com.example.Outer$Inner`)
    Declared(String),
    Var {
        name: String,
        bound: Option<Box<TypeRef>>,
    },
    Wildcard {
        upper: Option<Box<TypeRef>>,
    },
    Union(Vec<TypeRef>),
    Intersection(Vec<TypeRef>),
}

impl TypeRef {
    pub fn declared(name: impl Into<String>) -> Self {
        Self::Declared(name.into())
    }

    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Structural erasure: only `Void`, `Primitive`, `Array` and `Declared`
    /// survive.
    ///
    /// Unions erase to their first alternative and intersections to their
    /// first component; unbounded variables and wildcards erase to `Object`.
    pub fn erasure(&self) -> TypeRef {
        match self {
            Self::Void | Self::Primitive(_) | Self::Declared(_) => self.clone(),
            Self::Array(element) => Self::array_of(element.erasure()),
            Self::Var { bound, .. } => erase_bound(bound.as_deref()),
            Self::Wildcard { upper } => erase_bound(upper.as_deref()),
            Self::Union(parts) | Self::Intersection(parts) => erase_bound(parts.first()),
        }
    }
}

fn erase_bound(bound: Option<&TypeRef>) -> TypeRef {
    bound
        .map(TypeRef::erasure)
        .unwrap_or_else(|| TypeRef::declared(OBJECT))
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Primitive(p) => f.write_str(p.keyword()),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::Declared(name) => f.write_str(name),
            Self::Var { name, bound: None } => f.write_str(name),
            Self::Var {
                name,
                bound: Some(bound),
            } => write!(f, "{name} extends {bound}"),
            Self::Wildcard { upper: None } => f.write_str("?"),
            Self::Wildcard { upper: Some(upper) } => write!(f, "? extends {upper}"),
            Self::Union(parts) => write_joined(f, parts, " | "),
            Self::Intersection(parts) => write_joined(f, parts, " & "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[TypeRef], sep: &str) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{part}")?;
    }
    Ok(())
}

impl FromStr for TypeRef {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s.trim(), s)
    }
}

fn invalid(text: &str, reason: &str) -> LinkError {
    LinkError::InvalidTypeRef {
        text: text.to_string(),
        reason: reason.to_string(),
    }
}

fn parse(s: &str, original: &str) -> Result<TypeRef, LinkError> {
    if s.is_empty() {
        return Err(invalid(original, "empty type"));
    }

    if let Some(rest) = s.strip_prefix('?') {
        let rest = rest.trim();
        if rest.is_empty() {
            return Ok(TypeRef::Wildcard { upper: None });
        }
        if let Some(bound) = rest.strip_prefix("extends ") {
            let upper = parse(bound.trim(), original)?;
            return Ok(TypeRef::Wildcard {
                upper: Some(Box::new(upper)),
            });
        }
        if let Some(bound) = rest.strip_prefix("super ") {
            // Lower bounds do not take part in erasure
            parse(bound.trim(), original)?;
            return Ok(TypeRef::Wildcard { upper: None });
        }
        return Err(invalid(original, "expected '?', '? extends T' or '? super T'"));
    }

    if let Some((name, bound)) = split_once_top_level(s, " extends ") {
        let name = name.trim();
        if !is_type_path(name) || name.contains('.') {
            return Err(invalid(original, "type variable name must be a simple identifier"));
        }
        let bound = parse(bound.trim(), original)?;
        return Ok(TypeRef::Var {
            name: name.to_string(),
            bound: Some(Box::new(bound)),
        });
    }

    let alternatives = split_top_level(s, '|');
    if alternatives.len() > 1 {
        return alternatives
            .into_iter()
            .map(|part| parse(part.trim(), original))
            .collect::<Result<_, _>>()
            .map(TypeRef::Union);
    }

    let components = split_top_level(s, '&');
    if components.len() > 1 {
        return components
            .into_iter()
            .map(|part| parse(part.trim(), original))
            .collect::<Result<_, _>>()
            .map(TypeRef::Intersection);
    }

    if let Some(element) = s.strip_suffix("[]") {
        return Ok(TypeRef::array_of(parse(element.trim_end(), original)?));
    }

    let raw = strip_type_arguments(s).ok_or_else(|| invalid(original, "unbalanced '<' '>'"))?;
    if raw == "void" {
        return Ok(TypeRef::Void);
    }
    if let Some(primitive) = Primitive::from_keyword(raw) {
        return Ok(TypeRef::Primitive(primitive));
    }
    if !is_type_path(raw) {
        return Err(invalid(original, "not a valid binary type name"));
    }
    Ok(TypeRef::declared(raw))
}

/// Drop a trailing `<...>` argument list; `None` when brackets don't balance
fn strip_type_arguments(s: &str) -> Option<&str> {
    let Some(open) = s.find('<') else {
        return (!s.contains('>')).then_some(s);
    };
    let mut depth = 0usize;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (i + 1 == s.len()).then(|| s[..open].trim_end());
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside of `<...>`
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// First occurrence of `needle` outside of `<...>`
fn split_once_top_level<'a>(s: &'a str, needle: &str) -> Option<(&'a str, &'a str)> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            _ if depth == 0 && s[i..].starts_with(needle) => {
                return Some((&s[..i], &s[i + needle.len()..]));
            }
            _ => {}
        }
    }
    None
}

/// Unit-file form of a type reference
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeRefRepr {
    Text(String),
    Var {
        var: String,
        #[serde(default)]
        bound: Option<String>,
    },
}

impl TryFrom<TypeRefRepr> for TypeRef {
    type Error = LinkError;

    fn try_from(repr: TypeRefRepr) -> Result<Self, Self::Error> {
        match repr {
            TypeRefRepr::Text(text) => text.parse(),
            TypeRefRepr::Var { var, bound } => {
                if var.is_empty() || var.contains('.') || !is_type_path(&var) {
                    return Err(invalid(&var, "type variable name must be a simple identifier"));
                }
                let bound = bound.map(|b| b.parse().map(Box::new)).transpose()?;
                Ok(TypeRef::Var { name: var, bound })
            }
        }
    }
}
