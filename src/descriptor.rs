//! Signature descriptors
//!
//! Canonical, process-independent keys for types and methods. Descriptors
//! are persisted verbatim inside registry keys, so the encoding must never
//! change:
//!
//! ```text
//! void V  boolean Z  byte B  char C  short S  int I  long J  float F  double D
//! T[]          [<T>
//! a.b.C$D      La/b/C$D;
//! (P1 P2) R    (<P1><P2>)<R>
//! ```

use crate::decl::{MethodDecl, Primitive, TypeRef};

/// Descriptor of a single type reference (erased first)
pub fn descriptor(ty: &TypeRef) -> String {
    let mut out = String::new();
    write_type(&ty.erasure(), &mut out);
    out
}

/// Descriptor of a method type: `(params)return`
pub fn method_descriptor(params: &[TypeRef], returns: &TypeRef) -> String {
    let mut out = String::from("(");
    for param in params {
        write_type(&param.erasure(), &mut out);
    }
    out.push(')');
    write_type(&returns.erasure(), &mut out);
    out
}

/// Descriptor of a declared method
pub fn of_method(method: &MethodDecl) -> String {
    method_descriptor(&method.params, &method.returns)
}

fn write_type(ty: &TypeRef, out: &mut String) {
    match ty {
        TypeRef::Void => out.push('V'),
        TypeRef::Primitive(p) => out.push(primitive_code(*p)),
        TypeRef::Array(element) => {
            out.push('[');
            write_type(element, out);
        }
        TypeRef::Declared(name) => {
            out.push('L');
            out.extend(name.chars().map(|c| if c == '.' { '/' } else { c }));
            out.push(';');
        }
        // Only reachable for unerased input
        other => write_type(&other.erasure(), out),
    }
}

fn primitive_code(p: Primitive) -> char {
    match p {
        Primitive::Boolean => 'Z',
        Primitive::Byte => 'B',
        Primitive::Char => 'C',
        Primitive::Short => 'S',
        Primitive::Int => 'I',
        Primitive::Long => 'J',
        Primitive::Float => 'F',
        Primitive::Double => 'D',
    }
}
