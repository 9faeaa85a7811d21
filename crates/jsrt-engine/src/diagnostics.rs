//! Diagnostics surface (C11, supplement): debug-build structural
//! printers for values, objects, and tracebacks.
//!
//! `Value`'s `Debug` impl already covers the first case (see
//! `value.rs`); this module adds the object and traceback renderers
//! a host's trace hook can lean on instead of reimplementing value
//! introspection. This is diagnostics, not the built-in `toString`
//! library surface (which remains out of scope).

use std::fmt::Write as _;

use crate::gc::GcPtr;
use crate::object::ObjectData;
use crate::trycontext::{CallKind, Traceback};

/// Renders `object`'s class name and own enumerable properties (for
/// debugging only; no prototype walk, no `toString`/`valueOf` call).
pub fn format_object(object: GcPtr<ObjectData>) -> String {
    let entries = ObjectData::own_enumerable_entries(object);
    let mut out = format!("[object {}", object.as_ref().class_name_utf8());
    if entries.is_empty() {
        out.push(']');
        return out;
    }
    out.push_str(" {");
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let key_utf8 = String::from_utf16_lossy(key);
        let _ = write!(out, "{key_utf8}: {value:?}");
    }
    out.push_str(" }]");
    out
}

/// Renders a traceback as a sequence of `at <call-kind> (<location>)`
/// lines, innermost first.
pub fn format_traceback(traceback: &Traceback) -> String {
    let mut out = String::new();
    for frame in traceback.frames() {
        let kind = match frame.call_kind {
            CallKind::Call => "call",
            CallKind::Construct => "construct",
            CallKind::Throw => "throw",
        };
        let _ = writeln!(out, "at {kind} ({})", frame.location);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::object::Attributes;
    use crate::trycontext::TracebackFrame;
    use crate::value::Value;

    #[test]
    fn format_object_includes_class_name() {
        let mut interp = Interpreter::new();
        let obj = interp.new_plain_object(None);
        let rendered = format_object(obj);
        assert!(rendered.contains("Object"));
    }

    #[test]
    fn format_object_lists_enumerable_property_names_and_values() {
        let mut interp = Interpreter::new();
        let obj = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"x");
        ObjectData::put(obj, &mut interp, name, Value::Number(1.0), Attributes::NONE);
        let rendered = format_object(obj);
        assert!(rendered.contains("x: 1"));
    }

    #[test]
    fn format_object_omits_dontenum_properties() {
        let mut interp = Interpreter::new();
        let obj = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"hidden");
        ObjectData::put(obj, &mut interp, name, Value::Number(1.0), Attributes::DONTENUM);
        let rendered = format_object(obj);
        assert!(!rendered.contains("hidden"));
    }

    #[test]
    fn format_traceback_renders_one_line_per_frame() {
        let mut tb = Traceback::new();
        tb.push(TracebackFrame {
            location: std::panic::Location::caller(),
            call_kind: CallKind::Throw,
        });
        let rendered = format_traceback(&tb);
        assert_eq!(rendered.lines().count(), 1);
        assert!(rendered.contains("throw"));
    }
}
