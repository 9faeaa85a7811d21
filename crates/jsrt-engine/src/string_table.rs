//! Immutable UTF-16 strings and the two-level intern table (C3).
//!
//! A global, process-lifetime table (lock-guarded, shared across
//! interpreters) and a non-shared per-interpreter table together
//! implement the round-trip identity invariant: a string first
//! interned globally is shared by every interpreter; a string
//! interned locally in one interpreter is distinct from the
//! equal-valued string interned in another, but re-interning it back
//! into its origin interpreter returns the original reference.

use std::cell::Cell;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::gc::{leak_gc, GcPtr, Heap, Tracer};
use crate::gc::Trace;
use crate::interpreter::InterpreterId;

/// An immutable sequence of 16-bit code units.
pub struct JsString {
    units: Box<[u16]>,
    /// `None` when globally interned; `Some(id)` otherwise, and once
    /// set it never changes.
    owner: Option<InterpreterId>,
    interned: bool,
    hash: Cell<Option<u64>>,
}

impl Trace for JsString {
    fn trace(&self, _tracer: &mut Tracer<'_>) {
        // string payload carries no outbound references
    }
}

impl JsString {
    fn new(units: Box<[u16]>, owner: Option<InterpreterId>, interned: bool) -> Self {
        Self {
            units,
            owner,
            interned,
            hash: Cell::new(None),
        }
    }

    /// Builds a fresh, non-interned string owned by `owner`. Used by
    /// call sites (e.g. error-message construction) that need a
    /// one-off string without going through the intern table.
    pub fn owned(units: Box<[u16]>, owner: InterpreterId) -> Self {
        Self::new(units, Some(owner), false)
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn owner(&self) -> Option<InterpreterId> {
        self.owner
    }

    pub fn is_interned(&self) -> bool {
        self.interned
    }

    pub fn to_utf8(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    fn content_hash(&self) -> u64 {
        if let Some(h) = self.hash.get() {
            return h;
        }
        use std::hash::{Hash, Hasher};
        let mut hasher = rustc_hash::FxHasher::default();
        self.units.hash(&mut hasher);
        let h = hasher.finish();
        self.hash.set(Some(h));
        h
    }
}

fn encode_ascii(bytes: &[u8]) -> Box<[u16]> {
    bytes.iter().map(|&b| b as u16).collect()
}

/// Lexicographic comparison over code units; `-1`/`0`/`1` per
/// `Ordering`.
pub fn cmp(a: &JsString, b: &JsString) -> std::cmp::Ordering {
    a.units.cmp(&b.units)
}

/// Shorter-is-less comparison against a plain ASCII C-string,
/// breaking ties on the first differing code unit.
pub fn cmp_ascii(a: &JsString, b: &[u8]) -> std::cmp::Ordering {
    let encoded = encode_ascii(b);
    a.units.cmp(&encoded)
}

type GlobalKey = Box<[u16]>;

static GLOBAL_TABLE: Lazy<Mutex<HashMap<GlobalKey, GcPtr<JsString>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Interns `ascii_bytes` in the process-wide global scope. Identical
/// content always returns an identical reference, regardless of
/// which interpreter calls this.
pub fn intern_global(ascii_bytes: &[u8]) -> GcPtr<JsString> {
    let units = encode_ascii(ascii_bytes);
    let mut table = GLOBAL_TABLE.lock();
    if let Some(existing) = table.get(&units) {
        return *existing;
    }
    let ptr = leak_gc(JsString::new(units.clone(), None, true));
    table.insert(units, ptr);
    ptr
}

/// Per-interpreter intern table: keyed by content, non-shared.
#[derive(Default)]
pub struct InternTable {
    map: HashMap<Box<[u16]>, GcPtr<JsString>>,
}

impl InternTable {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Interns `ascii_bytes` into this interpreter's local scope.
    /// Identity holds for repeated calls with identical content.
    pub fn intern_ascii(&mut self, heap: &mut Heap, owner: InterpreterId, ascii_bytes: &[u8]) -> GcPtr<JsString> {
        let units = encode_ascii(ascii_bytes);
        if let Some(existing) = self.map.get(&units) {
            return *existing;
        }
        let ptr = heap.alloc_string(JsString::new(units.clone(), Some(owner), true));
        self.map.insert(units, ptr);
        ptr
    }

    /// `intern(interp, s)`: if `s` is already globally interned,
    /// return it unchanged; if `s` is already interned in this
    /// interpreter's table, return it unchanged; otherwise look up
    /// (or insert) a local copy keyed by content.
    pub fn intern(&mut self, heap: &mut Heap, owner: InterpreterId, s: GcPtr<JsString>) -> GcPtr<JsString> {
        if s.as_ref().owner().is_none() {
            return s;
        }
        if s.as_ref().owner() == Some(owner) && s.as_ref().is_interned() {
            return s;
        }
        let key = s.as_ref().units().to_vec().into_boxed_slice();
        if let Some(existing) = self.map.get(&key) {
            return *existing;
        }
        let fresh = heap.alloc_string(JsString::new(key.clone(), Some(owner), true));
        self.map.insert(key, fresh);
        fresh
    }

    /// Produces a distinct, non-interned copy of `s`.
    pub fn dup(&self, heap: &mut Heap, owner: InterpreterId, s: GcPtr<JsString>) -> GcPtr<JsString> {
        let units = s.as_ref().units().to_vec().into_boxed_slice();
        heap.alloc_string(JsString::new(units, Some(owner), false))
    }

    /// Roots every string this table has ever handed out. Without
    /// this, a collection could sweep a locally-interned string still
    /// referenced only by `map`, leaving a dangling entry that the
    /// round-trip identity invariant then reads through.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        for ptr in self.map.values() {
            tracer.visit(ptr);
        }
    }
}
