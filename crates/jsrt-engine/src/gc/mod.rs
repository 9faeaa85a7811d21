//! Managed memory subsystem (C1).
//!
//! Three allocation channels (`Heap::alloc`, `alloc_string`,
//! `alloc_finalize`), a growable-array helper, and a default
//! mark-sweep collector.

pub mod collector;
pub mod growable;
pub mod header;
pub mod heap;
pub mod roots;

pub use collector::{CollectStats, GarbageCollector, Tracer};
pub use growable::GrowableArray;
pub use heap::{leak_gc, GcPtr, Heap};
pub use roots::RootSet;

/// Implemented by every type that can live behind a `GcPtr` and may
/// itself hold further `GcPtr`s. `trace` must call `tracer.visit` on
/// every outbound reference; types with no outbound references (e.g.
/// interned string payloads) implement it as a no-op.
pub trait Trace {
    fn trace(&self, tracer: &mut Tracer<'_>);
}

macro_rules! impl_trace_leaf {
    ($($t:ty),* $(,)?) => {
        $(impl Trace for $t {
            fn trace(&self, _tracer: &mut Tracer<'_>) {}
        })*
    };
}

impl_trace_leaf!(bool, f64, i32, i64, u32, u64, usize, String, Vec<u16>, Box<[u16]>);
