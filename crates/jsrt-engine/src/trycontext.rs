//! Try-context stack (C5): the non-local-exit mechanism used to
//! propagate script exceptions through host call frames.
//!
//! setjmp/longjmp semantics are expressed here the idiomatic Rust
//! way: a thrown value becomes a `Result::Err(Thrown)` that `?`
//! propagates up the native call stack to the nearest
//! `TryContextStack::enter` call. "Innermost context" falls directly
//! out of the Rust call stack; the explicit `TryContextStack` kept on
//! the interpreter exists so `save_state`/`restore_state` has
//! something concrete to snapshot across a thread handoff, and so
//! tests can assert the push/pop/restore invariants directly.

use std::panic::Location;

use crate::gc::{Trace, Tracer};
use crate::value::Value;

/// One `(source location, call-kind)` pair recorded at throw time.
#[derive(Clone, Copy, Debug)]
pub struct TracebackFrame {
    pub location: &'static Location<'static>,
    pub call_kind: CallKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    Construct,
    Throw,
}

/// Linked list of traceback frames, innermost first.
#[derive(Clone, Default)]
pub struct Traceback(Vec<TracebackFrame>);

impl Traceback {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, frame: TracebackFrame) {
        self.0.push(frame);
    }

    pub fn frames(&self) -> &[TracebackFrame] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A thrown script-level value, carrying the traceback captured while
/// it propagated.
#[derive(Clone)]
pub struct Thrown {
    pub value: Value,
    pub traceback: Traceback,
}

impl Thrown {
    #[track_caller]
    pub fn new(value: Value) -> Self {
        let mut traceback = Traceback::new();
        traceback.push(TracebackFrame {
            location: Location::caller(),
            call_kind: CallKind::Throw,
        });
        Self { value, traceback }
    }

    pub fn with_traceback(value: Value, traceback: Traceback) -> Self {
        Self { value, traceback }
    }
}

impl Trace for Thrown {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.value.trace(tracer);
    }
}

pub type ThrownResult<T> = Result<T, Thrown>;

/// One entry of the try-context stack. Holds the caught-value slot
/// filled in by a throw that unwinds into this frame.
pub struct TryContext {
    caught: Option<Thrown>,
}

impl TryContext {
    fn new() -> Self {
        Self { caught: None }
    }

    pub fn caught(&self) -> Option<&Thrown> {
        self.caught.as_ref()
    }

    pub fn take_caught(&mut self) -> Option<Thrown> {
        self.caught.take()
    }
}

impl Trace for TryContext {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        if let Some(thrown) = &self.caught {
            thrown.trace(tracer);
        }
    }
}

/// Snapshot returned by `TryContextStack::save_state`, restorable via
/// `restore_state`.
#[derive(Clone)]
pub struct SavedState {
    depth: usize,
    traceback: Traceback,
}

/// The interpreter's try-context stack plus the "current" traceback
/// being accumulated.
#[derive(Default)]
pub struct TryContextStack {
    stack: Vec<TryContext>,
    traceback: Traceback,
}

impl Trace for TryContextStack {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        for ctx in &self.stack {
            ctx.trace(tracer);
        }
    }
}

impl TryContextStack {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            traceback: Traceback::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Thrown values currently resting, uncaught, in an enclosing
    /// context's slot — a legitimate GC root distinct from a value
    /// still propagating through native call frames on the Rust stack.
    /// Collection only ever runs at an explicit `Interpreter::collect`
    /// safepoint, never mid-unwind.
    pub fn caught_values(&self) -> impl Iterator<Item = &Thrown> {
        self.stack.iter().filter_map(|ctx| ctx.caught())
    }

    /// Enters a try scope: runs `body`, and if it throws, stores the
    /// thrown value (with its traceback merged into the interpreter's
    /// current traceback) into the newly pushed context's caught-value
    /// slot before returning it to the caller. Leaving normally pops
    /// the context with nothing cached.
    pub fn enter<F>(&mut self, body: F) -> ThrownResult<Value>
    where
        F: FnOnce(&mut Self) -> ThrownResult<Value>,
    {
        self.push_new();
        let result = body(self);
        self.finish(result)
    }

    /// Pushes a fresh context. Paired with [`finish`](Self::finish).
    ///
    /// Split out of `enter` so a caller that also needs `&mut`
    /// access to something `self` doesn't own (e.g. the owning
    /// `Interpreter`) across the body of the try scope can drive the
    /// push/run/pop sequence through brief, non-overlapping borrows of
    /// the stack instead of threading that access through `enter`'s
    /// closure parameter.
    pub fn push_new(&mut self) {
        self.stack.push(TryContext::new());
    }

    /// Pops the context pushed by [`push_new`](Self::push_new), merges
    /// `result`'s traceback into the running traceback on an `Err`, and
    /// stashes the thrown value into the popped context's caught slot.
    pub fn finish(&mut self, result: ThrownResult<Value>) -> ThrownResult<Value> {
        let mut ctx = self.stack.pop().expect("push_new/finish paired");
        match result {
            Ok(v) => Ok(v),
            Err(thrown) => {
                for frame in thrown.traceback.frames() {
                    self.traceback.push(*frame);
                }
                ctx.caught = Some(thrown.clone());
                Err(thrown)
            }
        }
    }

    /// A default-catch helper: rethrows `thrown` into the enclosing
    /// context, preserving value and traceback untouched. Used at the
    /// end of a handler that decided not to swallow the exception.
    pub fn default_catch(&mut self, thrown: Thrown) -> ThrownResult<Value> {
        Err(thrown)
    }

    pub fn current_traceback(&self) -> &Traceback {
        &self.traceback
    }

    pub fn save_state(&self) -> SavedState {
        SavedState {
            depth: self.stack.len(),
            traceback: self.traceback.clone(),
        }
    }

    pub fn restore_state(&mut self, state: SavedState) {
        self.stack.truncate(state.depth);
        self.traceback = state.traceback;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_exit_restores_depth() {
        let mut stack = TryContextStack::new();
        let before = stack.depth();
        let result = stack.enter(|_| Ok(Value::Undefined));
        assert!(result.is_ok());
        assert_eq!(stack.depth(), before);
    }

    #[test]
    fn throw_unwinds_to_innermost_context_and_restores_depth() {
        let mut stack = TryContextStack::new();
        let before = stack.depth();
        let result = stack.enter(|_| Err(Thrown::new(Value::Number(42.0))));
        assert!(result.is_err());
        assert_eq!(stack.depth(), before);
        match result {
            Err(thrown) => assert!(matches!(thrown.value, Value::Number(n) if n == 42.0)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn save_restore_state_roundtrips() {
        let mut stack = TryContextStack::new();
        let saved = stack.save_state();
        let _ = stack.enter(|_| Err(Thrown::new(Value::Undefined)));
        assert_ne!(stack.current_traceback().frames().len(), 0);
        stack.restore_state(saved);
        assert_eq!(stack.current_traceback().frames().len(), 0);
    }

    #[test]
    fn default_catch_rethrows_unchanged() {
        let mut stack = TryContextStack::new();
        let thrown = Thrown::new(Value::Boolean(true));
        let result = stack.default_catch(thrown);
        assert!(result.is_err());
    }
}
