//! Per-interpreter root state (C6): the record that owns every
//! built-in prototype/constructor slot, the heap, the intern table,
//! the try-context stack, and the recursion/security-domain cursors
//! that C7's dispatcher consults.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::compat::CompatFlags;
use crate::error::EngineError;
use crate::gc::{CollectStats, GarbageCollector, GcPtr, Heap, RootSet, Trace, Tracer};
use crate::object::{Attributes, ObjectBody, ObjectData, SecDomain};
use crate::string_table::{intern_global, InternTable, JsString};
use crate::system::SystemTable;
use crate::trycontext::{SavedState, Thrown, ThrownResult, TryContextStack};
use crate::value::Value;

/// Unique per-interpreter identity, used by `JsString::owner` to tell
/// whether a string belongs to this interpreter without holding a
/// borrow of the interpreter itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct InterpreterId(u64);

impl InterpreterId {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InterpreterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical constructor/prototype slots for the built-in object
/// families. The *contents* of these families (Array.prototype.push,
/// Math.sqrt's definition, …) are out of scope; only the slots a
/// conforming substrate must provide storage for are modeled here. A
/// host plugs concrete definitions into these slots via the C9
/// convenience surface.
#[derive(Default)]
pub struct BuiltinSlots {
    pub array: Option<GcPtr<ObjectData>>,
    pub boolean: Option<GcPtr<ObjectData>>,
    pub date: Option<GcPtr<ObjectData>>,
    pub error: Option<GcPtr<ObjectData>>,
    pub eval_error: Option<GcPtr<ObjectData>>,
    pub range_error: Option<GcPtr<ObjectData>>,
    pub reference_error: Option<GcPtr<ObjectData>>,
    pub syntax_error: Option<GcPtr<ObjectData>>,
    pub type_error: Option<GcPtr<ObjectData>>,
    pub uri_error: Option<GcPtr<ObjectData>>,
    pub function: Option<GcPtr<ObjectData>>,
    pub global: Option<GcPtr<ObjectData>>,
    pub math: Option<GcPtr<ObjectData>>,
    pub number: Option<GcPtr<ObjectData>>,
    pub object: Option<GcPtr<ObjectData>>,
    pub regexp: Option<GcPtr<ObjectData>>,
    pub string: Option<GcPtr<ObjectData>>,
}

impl BuiltinSlots {
    fn each(&self) -> [Option<GcPtr<ObjectData>>; 17] {
        [
            self.array,
            self.boolean,
            self.date,
            self.error,
            self.eval_error,
            self.range_error,
            self.reference_error,
            self.syntax_error,
            self.type_error,
            self.uri_error,
            self.function,
            self.global,
            self.math,
            self.number,
            self.object,
            self.regexp,
            self.string,
        ]
    }
}

impl Trace for BuiltinSlots {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        for slot in self.each().into_iter().flatten() {
            tracer.visit(&slot);
        }
    }
}

/// The per-instance root of the runtime (C6).
pub struct Interpreter {
    id: InterpreterId,
    heap: Heap,
    intern_table: InternTable,
    try_stack: TryContextStack,
    compat_flags: CompatFlags,
    recursion_budget: i64,
    sec_domain: Option<SecDomain>,
    locale: String,
    trace_enabled: bool,
    builtins: BuiltinSlots,
    gc: GarbageCollector,
    host_roots: RootSet,
}

/// Sentinel meaning "recursion budget disabled".
pub const UNLIMITED_RECURSION: i64 = -1;

impl Interpreter {
    /// Equivalent to `init(interp)` with the system table's default
    /// compatibility flags.
    pub fn new() -> Self {
        let defaults = SystemTable::global();
        Self::with_compat(defaults.default_compat_flags)
    }

    /// Equivalent to `init_compat(interp, flags)`: allocates the
    /// try-context stack, compatibility/locale/recursion settings, and
    /// every built-in family's prototype slot, in dependency order.
    pub fn with_compat(flags: CompatFlags) -> Self {
        let defaults = SystemTable::global();
        let id = InterpreterId::new();

        // Step 1: zero try-context/traceback — TryContextStack::new()
        // starts empty.
        let try_stack = TryContextStack::new();

        // Step 2: compat flags, locale, trace, recursion limit,
        // security domain (null), regex engine (opaque, unmodeled —
        // parsing/regex execution are out of scope).
        let compat_flags = flags;
        let locale = defaults.default_locale.clone();
        let trace_enabled = defaults.default_trace_enabled;
        let recursion_budget = defaults.default_recursion_limit;
        let sec_domain = None;

        let mut interp = Self {
            id,
            heap: Heap::new(),
            intern_table: InternTable::new(),
            try_stack,
            compat_flags,
            recursion_budget,
            sec_domain,
            locale,
            trace_enabled,
            builtins: BuiltinSlots::default(),
            gc: GarbageCollector::new(),
            host_roots: RootSet::new(),
        };

        // Step 3 + 5: allocate storage for each built-in family in
        // dependency order and run its init phase. The substrate owns
        // only the *slot*; a conforming host fills in the family's
        // behavior (library contents are out of scope per §1). Here
        // "init phase" is limited to giving each slot a bare object
        // rooted at Object.prototype once that exists.
        let object_proto = interp.alloc_plain_prototype(None, b"Object");
        interp.builtins.object = Some(object_proto);

        interp.builtins.array = Some(interp.alloc_plain_prototype(Some(object_proto), b"Array"));
        interp.builtins.boolean = Some(interp.alloc_plain_prototype(Some(object_proto), b"Boolean"));
        interp.builtins.date = Some(interp.alloc_plain_prototype(Some(object_proto), b"Date"));
        interp.builtins.error = Some(interp.alloc_plain_prototype(Some(object_proto), b"Error"));
        interp.builtins.eval_error = Some(interp.alloc_plain_prototype(interp.builtins.error, b"EvalError"));
        interp.builtins.range_error = Some(interp.alloc_plain_prototype(interp.builtins.error, b"RangeError"));
        interp.builtins.reference_error =
            Some(interp.alloc_plain_prototype(interp.builtins.error, b"ReferenceError"));
        interp.builtins.syntax_error = Some(interp.alloc_plain_prototype(interp.builtins.error, b"SyntaxError"));
        interp.builtins.type_error = Some(interp.alloc_plain_prototype(interp.builtins.error, b"TypeError"));
        interp.builtins.uri_error = Some(interp.alloc_plain_prototype(interp.builtins.error, b"URIError"));
        interp.builtins.global = Some(interp.alloc_plain_prototype(Some(object_proto), b"global"));
        interp.builtins.math = Some(interp.alloc_plain_prototype(Some(object_proto), b"Math"));
        interp.builtins.number = Some(interp.alloc_plain_prototype(Some(object_proto), b"Number"));
        interp.builtins.regexp = Some(interp.alloc_plain_prototype(Some(object_proto), b"RegExp"));
        interp.builtins.string = Some(interp.alloc_plain_prototype(Some(object_proto), b"String"));
        // Function.init runs last: it is the one family whose
        // contents reach into the parser.
        interp.builtins.function = Some(interp.alloc_plain_prototype(Some(object_proto), b"Function"));

        interp
    }

    fn alloc_plain_prototype(&mut self, proto: Option<GcPtr<ObjectData>>, class_name: &[u8]) -> GcPtr<ObjectData> {
        let name = intern_global(class_name);
        self.heap.alloc(ObjectData::new(name, proto, ObjectBody::Plain))
    }

    pub fn id(&self) -> InterpreterId {
        self.id
    }

    pub fn heap(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn compat_flags(&self) -> CompatFlags {
        self.compat_flags
    }

    pub fn set_compat_flags(&mut self, flags: CompatFlags) {
        self.compat_flags = flags;
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    pub fn recursion_budget(&self) -> i64 {
        self.recursion_budget
    }

    pub fn set_recursion_budget(&mut self, budget: i64) {
        self.recursion_budget = budget;
    }

    pub fn sec_domain(&self) -> Option<SecDomain> {
        self.sec_domain
    }

    pub fn set_sec_domain(&mut self, domain: Option<SecDomain>) {
        self.sec_domain = domain;
    }

    pub fn builtins(&self) -> &BuiltinSlots {
        &self.builtins
    }

    pub fn object_prototype(&self) -> GcPtr<ObjectData> {
        self.builtins.object.expect("Object.prototype always allocated by init")
    }

    /// Creates a new plain property-bag object. `prototype` defaults
    /// to `Object.prototype` when `None`.
    pub fn new_plain_object(&mut self, prototype: Option<GcPtr<ObjectData>>) -> GcPtr<ObjectData> {
        self.maybe_collect();
        let proto = prototype.or(self.builtins.object);
        let name = self.intern_ascii(b"Object");
        self.heap.alloc(ObjectData::new(name, proto, ObjectBody::Plain))
    }

    pub fn new_host_object(
        &mut self,
        class_name: &[u8],
        prototype: Option<GcPtr<ObjectData>>,
        body: Box<dyn crate::object::HostObject>,
    ) -> GcPtr<ObjectData> {
        self.maybe_collect();
        let name = self.intern_ascii(class_name);
        self.heap.alloc(ObjectData::new(name, prototype, ObjectBody::Host(body)))
    }

    /// Registers an ad hoc extra root (e.g. a value held only in a
    /// native stack frame mid-call) so it survives the next
    /// `collect()`. Persists across collections until `clear_roots`.
    pub fn add_root<T: Trace + 'static>(&mut self, ptr: GcPtr<T>) {
        self.host_roots.add(ptr);
    }

    pub fn clear_roots(&mut self) {
        self.host_roots.clear();
    }

    /// Whether the heap has grown enough since the last collection to
    /// warrant triggering one.
    pub fn should_collect(&self) -> bool {
        self.gc.should_collect(&self.heap)
    }

    fn maybe_collect(&mut self) {
        if self.should_collect() {
            self.collect();
        }
    }

    /// Marks everything reachable from the interpreter's own built-in
    /// slots, its locally-interned strings, its try-context stack's
    /// still-uncaught thrown values, and any host-registered extra
    /// roots, then sweeps the heap. The intern table is rooted
    /// unconditionally: a locally-interned
    /// string must outlive until nothing holds it, but the table
    /// itself is that hold — without tracing it, a collection could
    /// free a string still reachable only through `intern_ascii`'s
    /// map, leaving a dangling entry. Safe to call at any point
    /// between script-level calls; not safe to call while a `Thrown`
    /// is propagating only as a Rust-stack-local `Err` value that has
    /// not yet reached an enclosing `TryContextStack::enter` — that
    /// window is a documented hazard (see DESIGN.md).
    pub fn collect(&mut self) -> CollectStats {
        let Self {
            gc,
            heap,
            builtins,
            intern_table,
            try_stack,
            host_roots,
            ..
        } = self;
        gc.collect_with(heap, |tracer| {
            builtins.trace(tracer);
            intern_table.trace(tracer);
            try_stack.trace(tracer);
            host_roots.trace_all(tracer);
        })
    }

    pub fn intern_ascii(&mut self, ascii_bytes: &[u8]) -> GcPtr<JsString> {
        let id = self.id;
        self.intern_table.intern_ascii(&mut self.heap, id, ascii_bytes)
    }

    pub fn intern(&mut self, s: GcPtr<JsString>) -> GcPtr<JsString> {
        let id = self.id;
        self.intern_table.intern(&mut self.heap, id, s)
    }

    pub fn dup_string(&mut self, s: GcPtr<JsString>) -> GcPtr<JsString> {
        let id = self.id;
        self.intern_table.dup(&mut self.heap, id, s)
    }

    pub fn try_stack(&mut self) -> &mut TryContextStack {
        &mut self.try_stack
    }

    /// Enters a try scope around `body`, which receives the
    /// interpreter itself rather than just its try-context stack (C7's
    /// dispatcher needs `&mut Interpreter` for the call/construct hook
    /// it invokes inside the scope). Pushing and popping the context
    /// are brief reborrows of the `try_stack` field taken and released
    /// before and after `body` runs, so they never overlap with
    /// `body`'s own `&mut self` — the same field-splitting discipline
    /// `collect` uses to hand out several disjoint `&mut` borrows of
    /// one struct at once.
    pub fn enter_try_scope<F>(&mut self, body: F) -> ThrownResult<Value>
    where
        F: FnOnce(&mut Interpreter) -> ThrownResult<Value>,
    {
        self.try_stack.push_new();
        let result = body(self);
        self.try_stack.finish(result)
    }

    pub fn save_state(&self) -> SavedState {
        self.try_stack.save_state()
    }

    pub fn restore_state(&mut self, state: SavedState) {
        self.try_stack.restore_state(state);
    }

    /// Builds and throws a `TypeError` with `message`, matching the
    /// C9 error-throw-helper convention (constructs the named Error
    /// family, then returns it as an `Err` for the caller to
    /// propagate with `?`).
    #[track_caller]
    pub fn type_error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.type_error)
    }

    #[track_caller]
    pub fn error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.error)
    }

    #[track_caller]
    pub fn range_error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.range_error)
    }

    #[track_caller]
    pub fn reference_error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.reference_error)
    }

    #[track_caller]
    pub fn eval_error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.eval_error)
    }

    #[track_caller]
    pub fn syntax_error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.syntax_error)
    }

    #[track_caller]
    pub fn uri_error(&mut self, message: &str) -> Thrown {
        self.make_error(message, |b| b.uri_error)
    }

    #[track_caller]
    fn make_error(&mut self, message: &str, pick: fn(&BuiltinSlots) -> Option<GcPtr<ObjectData>>) -> Thrown {
        let proto = pick(&self.builtins).or(self.builtins.object);
        let error_obj = self.new_plain_object(proto);
        let name = self.intern_ascii(b"message");
        let units: Box<[u16]> = message.encode_utf16().collect();
        let msg_str = self.heap.alloc_string(JsString::owned(units, self.id));
        ObjectData::put(error_obj, self, name, Value::String(msg_str), Attributes::NONE);
        Thrown::new(Value::Object(error_obj))
    }

    /// Publishes `name` into `object`'s property table with explicit
    /// attributes (C9 surface).
    pub fn define_property(&mut self, object: GcPtr<ObjectData>, name: &[u8], value: Value, attrs: Attributes) {
        let key = self.intern_ascii(name);
        ObjectData::put(object, self, key, value, attrs);
    }

    pub fn is_memory_exhausted_hook(&self) -> ! {
        (SystemTable::global().mem_exhausted)()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Error conversions for the ambient `thiserror` convention: mapping
/// a try-stack pop underflow (should be unreachable given
/// `TryContextStack::enter`'s push/pop discipline, but kept for API
/// completeness) into `EngineError`.
impl Interpreter {
    pub fn checked_restore_state(&mut self, state: SavedState, owner: InterpreterId) -> Result<(), EngineError> {
        if owner != self.id {
            return Err(EngineError::ForeignState);
        }
        self.restore_state(state);
        Ok(())
    }
}

pub type InterpResult<T> = ThrownResult<T>;
