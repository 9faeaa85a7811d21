//! Convenience surface (C9): the ergonomic glue a host (or a
//! built-in-library crate sitting on top of the substrate) uses to
//! cross the native/script boundary without hand-rolling property
//! lookups and dispatcher calls every time.
//!
//! Four pieces:
//! - [`make_native_function`]: the native-callable adapter.
//! - [`parse_args`]/[`ArgValue`]: argument-vector decoding against a
//!   format string of conversion letters.
//! - [`call_args`]: encodes a small heterogeneous argument pack into
//!   `Value`s and invokes a callable through the dispatcher.
//! - The assertion helper [`rt_assert!`], elided entirely in release
//!   builds.

use crate::error::{EngineError, EngineResult};
use crate::gc::GcPtr;
use crate::interpreter::Interpreter;
use crate::object::{NativeFn, NativeFunctionData, ObjectBody, ObjectData};
use crate::string_table::JsString;
use crate::trycontext::ThrownResult;
use crate::value::Value;

const KNOWN_FORMAT_LETTERS: &[char] = &['v', 'n', 'b', 's', 'o', 'u'];

/// Checks that every letter in `fmt` is a conversion letter
/// `parse_args` understands, before it is ever used to decode a real
/// call's argument vector. A native function typically registers a
/// fixed format string once, at startup, through this check; a typo
/// there is a host-programming mistake, not something script code
/// triggered, so it is reported as an `EngineError` rather than a
/// script-visible `TypeError`.
pub fn validate_fmt(fmt: &str) -> EngineResult<()> {
    match fmt.chars().find(|c| !KNOWN_FORMAT_LETTERS.contains(c)) {
        Some(bad) => Err(EngineError::BadArgFormat(format!(
            "unknown argument format letter '{bad}' in \"{fmt}\""
        ))),
        None => Ok(()),
    }
}

/// Wraps a host function into a first-class callable object that
/// responds to `call` and to `get("length")` with `arity` (the C9
/// native-callable adapter). The object's prototype is
/// `Function.prototype` when the interpreter has one allocated.
pub fn make_native_function(
    interp: &mut Interpreter,
    class_name: &[u8],
    arity: u32,
    func: NativeFn,
) -> GcPtr<ObjectData> {
    let name = interp.intern_ascii(class_name);
    let proto = interp.builtins().function;
    interp
        .heap()
        .alloc(ObjectData::new(name, proto, ObjectBody::NativeFunction(NativeFunctionData { func, arity })))
}

/// One decoded argument, tagged by which conversion letter produced
/// it. Mirrors the primitive/object families `parse_args` supports.
#[derive(Clone, Copy)]
pub enum ArgValue {
    /// `'v'`: the raw value, unconverted. Never fails, and is the
    /// only letter a missing trailing argument can bind to directly.
    Any(Value),
    /// `'n'`: a `Number`.
    Number(f64),
    /// `'b'`: a `Boolean`.
    Boolean(bool),
    /// `'s'`: a `String`.
    Str(GcPtr<JsString>),
    /// `'o'`: an `Object`.
    Obj(GcPtr<ObjectData>),
    /// `'u'`: a `Number` truncated into a `u32` (no wraparound
    /// semantics beyond a plain `as` cast — full ECMAScript
    /// `ToUint32` coercion is a higher-layer concern, out of scope
    /// here).
    Uint(u32),
}

impl ArgValue {
    pub fn into_value(self) -> Value {
        match self {
            ArgValue::Any(v) => v,
            ArgValue::Number(n) => Value::Number(n),
            ArgValue::Boolean(b) => Value::Boolean(b),
            ArgValue::Str(s) => Value::String(s),
            ArgValue::Obj(o) => Value::Object(o),
            ArgValue::Uint(u) => Value::Number(u as f64),
        }
    }
}

/// Decodes `argv` against `fmt`, a string of conversion letters (one
/// per expected argument): `v` any value, `n` number, `b` boolean,
/// `s` string, `o` object, `u` unsigned integer. A letter other than
/// `v` applied to an argument of the wrong discriminant (including a
/// missing trailing argument, which binds to `Undefined`) is a
/// `TypeError`.
pub fn parse_args(interp: &mut Interpreter, argv: &[Value], fmt: &str) -> ThrownResult<Vec<ArgValue>> {
    let mut out = Vec::with_capacity(fmt.len());
    for (i, letter) in fmt.chars().enumerate() {
        let value = argv.get(i).copied().unwrap_or(Value::Undefined);
        let parsed = match letter {
            'v' => ArgValue::Any(value),
            'n' => ArgValue::Number(
                value
                    .as_number()
                    .ok_or_else(|| interp.type_error(&format!("argument {i} is not a number")))?,
            ),
            'b' => ArgValue::Boolean(
                value
                    .as_boolean()
                    .ok_or_else(|| interp.type_error(&format!("argument {i} is not a boolean")))?,
            ),
            's' => ArgValue::Str(
                value
                    .as_string()
                    .ok_or_else(|| interp.type_error(&format!("argument {i} is not a string")))?,
            ),
            'o' => ArgValue::Obj(
                value
                    .as_object()
                    .ok_or_else(|| interp.type_error(&format!("argument {i} is not an object")))?,
            ),
            'u' => {
                let n = value
                    .as_number()
                    .ok_or_else(|| interp.type_error(&format!("argument {i} is not a number")))?;
                ArgValue::Uint(n as u32)
            }
            other => return Err(interp.type_error(&format!("unknown argument format letter '{other}'"))),
        };
        out.push(parsed);
    }
    Ok(out)
}

/// Encodes `args` into a `Value` slice and invokes `func` through the
/// call dispatcher (C7), so recursion budget and security-domain
/// accounting apply exactly as to any script-initiated call.
pub fn call_args(
    interp: &mut Interpreter,
    func: GcPtr<ObjectData>,
    this: Value,
    args: &[ArgValue],
) -> ThrownResult<Value> {
    let values: Vec<Value> = args.iter().map(|a| a.into_value()).collect();
    crate::dispatch::dispatch_call(interp, func, this, &values)
}

/// Aborts through the system table's `abort` hook with a
/// `file:line: message` diagnostic when `cond` is false. Present only
/// in debug builds; elided entirely (condition included) from release
/// builds.
#[macro_export]
macro_rules! rt_assert {
    ($cond:expr $(,)?) => {
        $crate::rt_assert!($cond, stringify!($cond))
    };
    ($cond:expr, $($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            if !($cond) {
                $crate::convenience::assert_failed(format!($($arg)+));
            }
        }
    };
}

/// Backing call for [`rt_assert!`]; not meant to be called directly.
#[track_caller]
#[doc(hidden)]
pub fn assert_failed(message: String) -> ! {
    let location = std::panic::Location::caller();
    let full = format!("{location}: assertion failed: {message}");
    (crate::system::SystemTable::global().abort)(&full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn sqrt_native(_interp: &mut Interpreter, _this: Value, argv: &[Value]) -> ThrownResult<Value> {
        let n = argv.first().and_then(|v| v.as_number()).unwrap_or(0.0);
        Ok(Value::Number(n.sqrt()))
    }

    #[test]
    fn make_native_function_responds_to_length() {
        let mut interp = Interpreter::new();
        let f = make_native_function(&mut interp, b"sqrt", 1, sqrt_native);
        let length_name = interp.intern_ascii(b"length");
        match ObjectData::get(f, &mut interp, length_name) {
            Value::Number(n) => assert_eq!(n, 1.0),
            other => panic!("expected arity, got {other:?}"),
        }
    }

    #[test]
    fn parse_args_decodes_each_letter() {
        let mut interp = Interpreter::new();
        let s = interp.intern_ascii(b"hi");
        let argv = vec![Value::Number(3.0), Value::Boolean(true), Value::String(s)];
        let parsed = parse_args(&mut interp, &argv, "nbs").expect("well-typed");
        assert!(matches!(parsed[0], ArgValue::Number(n) if n == 3.0));
        assert!(matches!(parsed[1], ArgValue::Boolean(true)));
        assert!(matches!(parsed[2], ArgValue::Str(_)));
    }

    #[test]
    fn parse_args_binds_missing_trailing_argument_to_undefined_for_any_letter() {
        let mut interp = Interpreter::new();
        let parsed = parse_args(&mut interp, &[], "v").expect("v never fails");
        assert!(matches!(parsed[0], ArgValue::Any(Value::Undefined)));
    }

    #[test]
    fn parse_args_missing_typed_argument_is_type_error() {
        let mut interp = Interpreter::new();
        let result = parse_args(&mut interp, &[], "n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_fmt_accepts_known_letters() {
        assert!(validate_fmt("nbsouv").is_ok());
    }

    #[test]
    fn validate_fmt_rejects_unknown_letter() {
        assert!(matches!(validate_fmt("nx"), Err(EngineError::BadArgFormat(_))));
    }

    #[test]
    fn call_args_invokes_through_dispatcher() {
        let mut interp = Interpreter::new();
        let f = make_native_function(&mut interp, b"sqrt", 1, sqrt_native);
        let result = call_args(&mut interp, f, Value::Undefined, &[ArgValue::Number(9.0)]);
        assert!(matches!(result, Ok(Value::Number(n)) if n == 3.0));
    }
}
