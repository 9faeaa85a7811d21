//! jsrt-engine: the embeddable runtime substrate for a prototype-based,
//! dynamically-typed scripting language of the ECMAScript-3 family.
//!
//! This crate is the *substrate* — the per-interpreter state container,
//! the tagged value model, the object/property protocol, the string
//! interning facility, the managed-memory subsystem, the non-local
//! exit mechanism used to propagate script exceptions, and the
//! recursion / security-domain accounting wrapped around every object
//! invocation. A parser, bytecode backend, and the contents of the
//! built-in library objects (Array, Math, Date, RegExp, …) are
//! external collaborators that plug into the interfaces defined here;
//! they are not shipped by this crate.

#![warn(rust_2018_idioms)]

pub mod compat;
pub mod convenience;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod gc;
pub mod interpreter;
pub mod object;
pub mod string_table;
pub mod system;
pub mod trycontext;
pub mod value;

pub use compat::CompatFlags;
pub use dispatch::{dispatch_call, dispatch_construct};
pub use error::{EngineError, EngineResult};
pub use interpreter::{BuiltinSlots, Interpreter, InterpreterId, UNLIMITED_RECURSION};
pub use object::{Attributes, HostObject, Hint, NativeFn, ObjectBody, ObjectData, SecDomain};
pub use string_table::{cmp, cmp_ascii, intern_global, InternTable, JsString};
pub use system::SystemTable;
pub use trycontext::{CallKind, SavedState, Thrown, ThrownResult, Traceback, TracebackFrame, TryContextStack};
pub use value::Value;
