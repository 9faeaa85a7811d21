//! Tagged value (C2): the discriminated union every script-visible
//! datum is represented as.

use crate::gc::{GcPtr, Tracer};
use crate::gc::Trace;
use crate::object::ObjectData;
use crate::string_table::JsString;

/// `Undefined | Null | Boolean(bool) | Number(f64) | String | Object`.
///
/// Copy, bitwise-copied like the source's `SEE_value`; object and
/// string payloads are non-owning `GcPtr` references into the
/// managed heap.
#[derive(Clone, Copy)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(GcPtr<JsString>),
    Object(GcPtr<ObjectData>),
}

impl Trace for Value {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        match self {
            Value::String(s) => tracer.visit(s),
            Value::Object(o) => tracer.visit(o),
            _ => {}
        }
    }
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<GcPtr<JsString>> {
        match self {
            Value::String(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<GcPtr<ObjectData>> {
        match self {
            Value::Object(o) => Some(*o),
            _ => None,
        }
    }

    /// Pointer-identity/bit equality. Numeric NaN is therefore
    /// unequal to itself here, consistent with the tagged union being
    /// copied bitwise and equality being a higher-layer concern — this
    /// helper exists only for object/string reference comparisons
    /// used by the substrate itself (e.g. try-context caught-value
    /// bookkeeping in tests), not for script-level `===`.
    pub fn same_reference(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => GcPtr::same_object(a, b),
            (Value::Object(a), Value::Object(b)) => GcPtr::same_object(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{:?}", s.as_ref().to_utf8()),
            Value::Object(o) => write!(f, "[object {}]", o.as_ref().class_name_utf8()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminant_predicates() {
        assert!(Value::Undefined.is_undefined());
        assert!(Value::Null.is_null());
        assert!(Value::Boolean(true).is_boolean());
        assert!(Value::Number(1.0).is_number());
    }

    #[test]
    fn nan_and_infinity_are_valid_number_payloads() {
        let nan = Value::Number(f64::NAN);
        let inf = Value::Number(f64::INFINITY);
        assert!(nan.is_number());
        assert!(inf.is_number());
        assert!(nan.as_number().unwrap().is_nan());
    }

    #[test]
    fn same_reference_numeric_bitwise() {
        let a = Value::Number(1.5);
        let b = Value::Number(1.5);
        assert!(a.same_reference(&b));
        let nan_a = Value::Number(f64::NAN);
        let nan_b = Value::Number(f64::NAN);
        assert!(nan_a.same_reference(&nan_b)); // identical bit patterns
    }
}
