//! Mark-sweep collector: one conforming implementation of the C1
//! collector contract. Hosts needing a different algorithm may swap
//! this module out; nothing above `gc` depends on mark-sweep
//! specifically, only on `Heap::alloc*`/`collect`.

use super::heap::{GcPtr, Heap};
use super::roots::RootSet;
use super::Trace;

/// Visitor passed down through `Trace::trace` implementations. Marks
/// the pointee and, on first visit, recurses into it via its stored
/// trace function — the recursion is what gives reachability through
/// arbitrarily deep object graphs; the `is_marked` check before
/// recursing is what keeps cycles from looping forever.
pub struct Tracer<'a> {
    _heap: &'a Heap,
}

impl<'a> Tracer<'a> {
    fn new(heap: &'a Heap) -> Self {
        Self { _heap: heap }
    }

    pub fn visit<T>(&mut self, ptr: &GcPtr<T>) {
        let header = ptr.header();
        if header.is_marked() {
            return;
        }
        header.mark();
        if let Some(trace_fn) = header.trace_fn() {
            let value_ptr = {
                // SAFETY: header/value_offset describe a live block;
                // trace_fn was produced for exactly this type at
                // allocation time.
                let base = header as *const _ as *const u8;
                unsafe { base.add(header.value_offset()) }
            };
            unsafe { trace_fn(value_ptr, self) };
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CollectStats {
    pub bytes_freed: usize,
    pub blocks_before: usize,
    pub blocks_after: usize,
}

/// Threshold-based trigger: `should_collect` compares bytes allocated
/// against a threshold that doubles after every collection (floored
/// at `DEFAULT_GC_THRESHOLD`), so steady-state allocation does not
/// thrash the collector.
pub struct GarbageCollector {
    threshold: usize,
}

pub const DEFAULT_GC_THRESHOLD: usize = 1024 * 1024;

impl Default for GarbageCollector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GC_THRESHOLD,
        }
    }
}

impl GarbageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_threshold(&mut self, bytes: usize) {
        self.threshold = bytes;
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_collect(&self, heap: &Heap) -> bool {
        heap.bytes_allocated() >= self.threshold
    }

    /// Marks everything reachable from `roots`, then sweeps the heap.
    /// Roots that are themselves unreachable from further roots but
    /// were directly registered are marked first; nothing else is
    /// special-cased.
    pub fn collect(&mut self, heap: &mut Heap, roots: &RootSet) -> CollectStats {
        self.collect_with(heap, |tracer| roots.trace_all(tracer))
    }

    /// Generalization of [`collect`](Self::collect) that lets a
    /// caller trace an arbitrary set of roots — used by
    /// `Interpreter::collect` to combine the interpreter's own
    /// built-in slots and try-context stack with a host's
    /// ad hoc [`RootSet`] in a single mark phase, without requiring
    /// everything to first be funneled through one `RootSet`.
    pub fn collect_with<F>(&mut self, heap: &mut Heap, trace_roots: F) -> CollectStats
    where
        F: FnOnce(&mut Tracer<'_>),
    {
        let blocks_before = heap.block_count();
        {
            let mut tracer = Tracer::new(heap);
            trace_roots(&mut tracer);
        }
        let bytes_freed = heap.sweep();
        let blocks_after = heap.block_count();

        let used = heap.bytes_allocated();
        if used * 2 > self.threshold {
            self.threshold = (used * 2).max(DEFAULT_GC_THRESHOLD);
        }

        CollectStats {
            bytes_freed,
            blocks_before,
            blocks_after,
        }
    }
}

/// Blanket root-visiting helper used by `RootSet::trace_all`.
pub(crate) fn trace_root<T: Trace>(value: &T, tracer: &mut Tracer<'_>) {
    value.trace(tracer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::roots::RootSet;

    #[derive(Clone, Copy)]
    struct Node {
        next: Option<GcPtr<Node>>,
    }
    impl Trace for Node {
        fn trace(&self, tracer: &mut Tracer<'_>) {
            if let Some(next) = &self.next {
                tracer.visit(next);
            }
        }
    }

    #[test]
    fn unreachable_chain_is_collected() {
        let mut heap = Heap::new();
        let mut gc = GarbageCollector::new();
        let tail = heap.alloc(Node { next: None });
        let _head = heap.alloc(Node { next: Some(tail) });
        let roots = RootSet::new();
        gc.collect(&mut heap, &roots);
        assert_eq!(heap.block_count(), 0);
    }

    #[test]
    fn reachable_chain_survives() {
        let mut heap = Heap::new();
        let mut gc = GarbageCollector::new();
        let tail = heap.alloc(Node { next: None });
        let head = heap.alloc(Node { next: Some(tail) });
        let mut roots = RootSet::new();
        roots.add(head);
        gc.collect(&mut heap, &roots);
        assert_eq!(heap.block_count(), 2);
    }

    #[test]
    fn threshold_grows_after_collection() {
        let mut heap = Heap::new();
        let mut gc = GarbageCollector::new();
        gc.set_threshold(8);
        for _ in 0..100 {
            heap.alloc(Node { next: None });
        }
        let before = gc.threshold();
        let roots = RootSet::new();
        gc.collect(&mut heap, &roots);
        // everything was unreachable, so usage after collection is 0
        // and the threshold should not have grown below its floor.
        assert!(gc.threshold() >= DEFAULT_GC_THRESHOLD.min(before));
    }

    #[test]
    fn finalization_order_unspecified_but_eventually_complete() {
        // A chain of 100 finalizable nodes linked through a single
        // root: before clearing the root, collection finalizes none;
        // after clearing it, repeated collection finalizes all 100,
        // in no particular order.
        use std::cell::RefCell;
        use std::rc::Rc;

        struct FNode {
            next: Option<GcPtr<FNode>>,
            marker: Rc<RefCell<Vec<u32>>>,
            id: u32,
        }
        impl Trace for FNode {
            fn trace(&self, tracer: &mut Tracer<'_>) {
                if let Some(next) = &self.next {
                    tracer.visit(next);
                }
            }
        }
        unsafe fn finalize_fnode(value: *mut u8, closure: *mut u8) {
            let node = &*(value as *const FNode);
            let marker = &*(closure as *const RefCell<Vec<u32>>);
            marker.borrow_mut().push(node.id);
        }

        let mut heap = Heap::new();
        let mut gc = GarbageCollector::new();
        let finalized = Rc::new(RefCell::new(Vec::new()));
        let closure_ptr = Rc::as_ptr(&finalized) as *mut u8;

        let mut chain: Option<GcPtr<FNode>> = None;
        for id in 0..100u32 {
            chain = Some(heap.alloc_finalize(
                FNode {
                    next: chain,
                    marker: finalized.clone(),
                    id,
                },
                finalize_fnode,
                closure_ptr,
            ));
        }
        let mut root = RootSet::new();
        root.add(chain.unwrap());

        // before clearing the root, collection finalizes none
        gc.collect(&mut heap, &root);
        assert_eq!(finalized.borrow().len(), 0);
        assert_eq!(heap.block_count(), 100);

        // dropping the root makes the whole cohort unreachable
        drop(root);
        let empty_roots = RootSet::new();
        gc.collect(&mut heap, &empty_roots);
        assert_eq!(finalized.borrow().len(), 100);
        assert_eq!(heap.block_count(), 0);
    }
}
