//! Type kinds, the numeric promotion lattice, annotated conversion, and
//! duck-type checking for `define`d object types.

use std::sync::Arc;

use crate::context::{throw_msg, Context, Exec};
use crate::env::{Env, EnvRef};
use crate::value::Value;
use hemlock_parser::ast::Expr;

/// The closed set of runtime type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
    Rune,
    Ptr,
    Buffer,
    Array,
    Object,
    Function,
    File,
    Task,
    Channel,
    Socket,
    Null,
    Type,
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::I8 => "i8",
            TypeKind::I16 => "i16",
            TypeKind::I32 => "i32",
            TypeKind::I64 => "i64",
            TypeKind::U8 => "u8",
            TypeKind::U16 => "u16",
            TypeKind::U32 => "u32",
            TypeKind::U64 => "u64",
            TypeKind::F32 => "f32",
            TypeKind::F64 => "f64",
            TypeKind::Bool => "bool",
            TypeKind::String => "string",
            TypeKind::Rune => "rune",
            TypeKind::Ptr => "ptr",
            TypeKind::Buffer => "buffer",
            TypeKind::Array => "array",
            TypeKind::Object => "object",
            TypeKind::Function => "function",
            TypeKind::File => "file",
            TypeKind::Task => "task",
            TypeKind::Channel => "channel",
            TypeKind::Socket => "socket",
            TypeKind::Null => "null",
            TypeKind::Type => "type",
        }
    }

    /// Position in the promotion lattice; None for non-numerics.
    ///
    /// Ascending order: i8 < u8 < i16 < u16 < i32 < u32 < i64 < u64 <
    /// f32 < f64. Any float dominates any integer.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            TypeKind::I8 => Some(0),
            TypeKind::U8 => Some(1),
            TypeKind::I16 => Some(2),
            TypeKind::U16 => Some(3),
            TypeKind::I32 => Some(4),
            TypeKind::U32 => Some(5),
            TypeKind::I64 => Some(6),
            TypeKind::U64 => Some(7),
            TypeKind::F32 => Some(8),
            TypeKind::F64 => Some(9),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeKind::F32 | TypeKind::F64)
    }

    /// Join of two numeric kinds on the lattice. Callers must pass
    /// numeric kinds.
    pub fn join(a: TypeKind, b: TypeKind) -> TypeKind {
        let (ra, rb) = (a.numeric_rank().unwrap_or(0), b.numeric_rank().unwrap_or(0));
        if ra >= rb {
            a
        } else {
            b
        }
    }
}

/// Resolve a type name to a built-in kind, if it names one.
pub fn kind_from_name(name: &str) -> Option<TypeKind> {
    let kind = match name {
        "i8" => TypeKind::I8,
        "i16" => TypeKind::I16,
        "i32" => TypeKind::I32,
        "i64" => TypeKind::I64,
        "u8" => TypeKind::U8,
        "u16" => TypeKind::U16,
        "u32" => TypeKind::U32,
        "u64" => TypeKind::U64,
        "f32" => TypeKind::F32,
        "f64" => TypeKind::F64,
        "bool" => TypeKind::Bool,
        "string" => TypeKind::String,
        "rune" => TypeKind::Rune,
        "ptr" => TypeKind::Ptr,
        "buffer" => TypeKind::Buffer,
        "array" => TypeKind::Array,
        "object" => TypeKind::Object,
        "function" => TypeKind::Function,
        "file" => TypeKind::File,
        "task" => TypeKind::Task,
        "channel" => TypeKind::Channel,
        "socket" => TypeKind::Socket,
        _ => return None,
    };
    Some(kind)
}

/// Runtime kind of a value.
pub fn kind_of(value: &Value) -> TypeKind {
    match value {
        Value::Null => TypeKind::Null,
        Value::Bool(_) => TypeKind::Bool,
        Value::I8(_) => TypeKind::I8,
        Value::I16(_) => TypeKind::I16,
        Value::I32(_) => TypeKind::I32,
        Value::I64(_) => TypeKind::I64,
        Value::U8(_) => TypeKind::U8,
        Value::U16(_) => TypeKind::U16,
        Value::U32(_) => TypeKind::U32,
        Value::U64(_) => TypeKind::U64,
        Value::F32(_) => TypeKind::F32,
        Value::F64(_) => TypeKind::F64,
        Value::Rune(_) => TypeKind::Rune,
        Value::Ptr(_) => TypeKind::Ptr,
        Value::Type(_) => TypeKind::Type,
        Value::Str(_) => TypeKind::String,
        Value::Buffer(_) => TypeKind::Buffer,
        Value::Array(_) => TypeKind::Array,
        Value::Object(_) => TypeKind::Object,
        Value::Function(_) | Value::Builtin(_) => TypeKind::Function,
        Value::File(_) => TypeKind::File,
        Value::Socket(_) => TypeKind::Socket,
        Value::Task(_) => TypeKind::Task,
        Value::Channel(_) => TypeKind::Channel,
    }
}

/// A first-class type value: either a kind constant or a `define`d
/// duck type.
#[derive(Debug, Clone)]
pub enum TypeValue {
    Kind(TypeKind),
    Defined(Arc<TypeDef>),
}

impl TypeValue {
    pub fn render(&self) -> String {
        match self {
            TypeValue::Kind(k) => k.name().to_string(),
            TypeValue::Defined(d) => d.name.clone(),
        }
    }

    pub fn same_type(&self, other: &TypeValue) -> bool {
        match (self, other) {
            (TypeValue::Kind(a), TypeValue::Kind(b)) => a == b,
            (TypeValue::Defined(a), TypeValue::Defined(b)) => a.name == b.name,
            _ => false,
        }
    }
}

/// A `define`d object type: duck-typed structural requirements.
#[derive(Debug)]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<TypeField>,
}

/// One declared field of a duck type. Required fields carry an
/// annotation name; optional fields may carry a default expression.
#[derive(Debug)]
pub struct TypeField {
    pub name: String,
    pub optional: bool,
    pub annot: Option<String>,
    pub default: Option<Expr>,
}

/// Resolve an annotation name against the built-in kinds and then the
/// environment (for `define`d types bound as values).
pub fn resolve_annot(env: &EnvRef, name: &str) -> Exec<TypeValue> {
    if let Some(kind) = kind_from_name(name) {
        return Ok(TypeValue::Kind(kind));
    }
    match Env::get(env, name) {
        Some(Value::Type(t)) => Ok(t),
        Some(other) => throw_msg(format!(
            "annotation `{}` does not name a type (found {})",
            name,
            other.type_name()
        )),
        None => throw_msg(format!("unknown type `{}`", name)),
    }
}

/// Verify a value has exactly the given kind; used at the native-function
/// boundary where arguments arrive pre-converted.
pub fn check_type(value: &Value, kind: TypeKind, name: &str) -> Exec<()> {
    if kind_of(value) == kind {
        Ok(())
    } else {
        throw_msg(format!(
            "type mismatch for `{}`: expected {}, got {}",
            name,
            kind.name(),
            value.type_name()
        ))
    }
}

/// True when a value already satisfies a constraint without conversion,
/// used for typed-array insertions.
pub fn satisfies(value: &Value, target: &TypeValue) -> bool {
    match target {
        TypeValue::Kind(kind) => kind_of(value) == *kind,
        TypeValue::Defined(def) => match value {
            Value::Object(o) => o.lock().type_name.as_deref() == Some(def.name.as_str()),
            _ => false,
        },
    }
}

/// Annotated conversion. Fails with a thrown range or kind error when the
/// value cannot represent the source. Conversion to a `define`d type runs
/// duck-type validation and may mutate the object (defaults, type_name).
pub fn convert(
    ctx: &mut Context,
    env: &EnvRef,
    value: &Value,
    target: &TypeValue,
) -> Exec<Value> {
    match target {
        TypeValue::Kind(kind) => convert_kind(value, *kind),
        TypeValue::Defined(def) => convert_duck(ctx, env, value, def),
    }
}

pub(crate) fn convert_kind(value: &Value, kind: TypeKind) -> Exec<Value> {
    if kind.is_numeric() {
        return convert_numeric(value, kind);
    }
    if kind_of(value) == kind {
        return Ok(value.clone());
    }
    throw_msg(format!(
        "cannot convert {} to {}",
        value.type_name(),
        kind.name()
    ))
}

fn convert_numeric(value: &Value, kind: TypeKind) -> Exec<Value> {
    if !value.is_numeric() {
        return throw_msg(format!(
            "cannot convert {} to {}",
            value.type_name(),
            kind.name()
        ));
    }

    if kind.is_float() {
        let f = value.as_f64();
        return Ok(match kind {
            TypeKind::F32 => Value::F32(f as f32),
            _ => Value::F64(f),
        });
    }

    // Integer target: floats must be exactly integral, and the magnitude
    // must fit the target range. Conversions never silently lose bits.
    let wide: i128 = if value.is_float() {
        let f = value.as_f64();
        if f.fract() != 0.0 {
            return throw_msg(format!(
                "cannot convert {} to {} without losing precision",
                f,
                kind.name()
            ));
        }
        f as i128
    } else if let Value::U64(u) = value {
        *u as i128
    } else {
        value.as_i64() as i128
    };

    let out = match kind {
        TypeKind::I8 => i8::try_from(wide).map(Value::I8).ok(),
        TypeKind::I16 => i16::try_from(wide).map(Value::I16).ok(),
        TypeKind::I32 => i32::try_from(wide).map(Value::I32).ok(),
        TypeKind::I64 => i64::try_from(wide).map(Value::I64).ok(),
        TypeKind::U8 => u8::try_from(wide).map(Value::U8).ok(),
        TypeKind::U16 => u16::try_from(wide).map(Value::U16).ok(),
        TypeKind::U32 => u32::try_from(wide).map(Value::U32).ok(),
        TypeKind::U64 => u64::try_from(wide).map(Value::U64).ok(),
        _ => None,
    };
    match out {
        Some(v) => Ok(v),
        None => throw_msg(format!("value {} out of range for {}", wide, kind.name())),
    }
}

/// Duck-typed conversion: every required field must be present and
/// satisfy its annotation; absent optional fields receive their default
/// (evaluated in the assignment's environment); on success the object's
/// type name is set.
fn convert_duck(
    ctx: &mut Context,
    env: &EnvRef,
    value: &Value,
    def: &Arc<TypeDef>,
) -> Exec<Value> {
    let obj_ref = match value {
        Value::Object(o) => o.clone(),
        _ => {
            return throw_msg(format!(
                "cannot convert {} to {}",
                value.type_name(),
                def.name
            ))
        }
    };

    for field in &def.fields {
        let existing = obj_ref.lock().get(&field.name).cloned();
        match existing {
            Some(field_value) => {
                if let Some(annot) = &field.annot {
                    let target = resolve_annot(env, annot)?;
                    let converted = convert(ctx, env, &field_value, &target)?;
                    obj_ref.lock().set(field.name.clone(), converted);
                }
            }
            None if field.optional => {
                if let Some(default) = &field.default {
                    let v = crate::interp::eval_expr(ctx, env, default)?;
                    obj_ref.lock().set(field.name.clone(), v);
                }
            }
            None => {
                return throw_msg(format!(
                    "missing required field `{}` for type {}",
                    field.name, def.name
                ))
            }
        }
    }

    obj_ref.lock().type_name = Some(def.name.clone());
    Ok(Value::Object(obj_ref))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERICS: [TypeKind; 10] = [
        TypeKind::I8,
        TypeKind::U8,
        TypeKind::I16,
        TypeKind::U16,
        TypeKind::I32,
        TypeKind::U32,
        TypeKind::I64,
        TypeKind::U64,
        TypeKind::F32,
        TypeKind::F64,
    ];

    #[test]
    fn join_is_commutative_and_associative() {
        for &a in &NUMERICS {
            for &b in &NUMERICS {
                assert_eq!(TypeKind::join(a, b), TypeKind::join(b, a));
                for &c in &NUMERICS {
                    assert_eq!(
                        TypeKind::join(TypeKind::join(a, b), c),
                        TypeKind::join(a, TypeKind::join(b, c))
                    );
                }
            }
        }
    }

    #[test]
    fn floats_dominate_integers() {
        assert_eq!(TypeKind::join(TypeKind::U64, TypeKind::F32), TypeKind::F32);
        assert_eq!(TypeKind::join(TypeKind::F32, TypeKind::F64), TypeKind::F64);
        assert_eq!(TypeKind::join(TypeKind::I8, TypeKind::F64), TypeKind::F64);
    }

    #[test]
    fn numeric_conversion_range_checks() {
        assert!(matches!(
            convert_numeric(&Value::I32(127), TypeKind::I8),
            Ok(Value::I8(127))
        ));
        assert!(convert_numeric(&Value::I32(128), TypeKind::I8).is_err());
        assert!(convert_numeric(&Value::I32(-1), TypeKind::U32).is_err());
        assert!(matches!(
            convert_numeric(&Value::F64(2.0), TypeKind::I32),
            Ok(Value::I32(2))
        ));
        assert!(convert_numeric(&Value::F64(2.5), TypeKind::I32).is_err());
    }

    #[test]
    fn integer_widens_to_float() {
        assert!(matches!(
            convert_numeric(&Value::I32(3), TypeKind::F64),
            Ok(Value::F64(f)) if f == 3.0
        ));
    }

    #[test]
    fn kind_names_round_trip() {
        for &k in &NUMERICS {
            assert_eq!(kind_from_name(k.name()), Some(k));
        }
        assert_eq!(kind_from_name("string"), Some(TypeKind::String));
        assert_eq!(kind_from_name("nope"), None);
    }

    #[test]
    fn satisfies_checks_defined_type_by_name() {
        let def = Arc::new(TypeDef {
            name: "P".to_string(),
            fields: vec![],
        });
        let obj = crate::heap::Object::new();
        let v = Value::object(obj);
        assert!(!satisfies(&v, &TypeValue::Defined(def.clone())));
        if let Value::Object(o) = &v {
            o.lock().type_name = Some("P".to_string());
        }
        assert!(satisfies(&v, &TypeValue::Defined(def)));
    }
}
