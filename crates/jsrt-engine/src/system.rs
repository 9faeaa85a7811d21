//! Process-wide system table (C8): the single record of hooks and
//! defaults every interpreter snapshots at construction time. Backed
//! by a `OnceCell`-style lazily-initialized singleton, read-only after
//! the first interpreter is built.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::compat::CompatFlags;
use crate::interpreter::UNLIMITED_RECURSION;
use crate::object::SecDomain;

/// Memory-exhaustion hook: must not return.
pub type MemExhaustedHook = fn() -> !;
/// Host abort hook for debug-assertion failures and other invariant
/// violations: must not return.
pub type AbortHook = fn(&str) -> !;
/// Invoked from long-running script loops so a host can poll for
/// cancellation; returning is the normal case.
pub type PeriodicHook = fn();
/// Invoked by the call dispatcher (C7) when a call crosses a
/// security-domain boundary.
pub type SecDomainTransitHook = fn(from: Option<SecDomain>, to: Option<SecDomain>);

fn default_mem_exhausted() -> ! {
    panic!("jsrt-engine: memory exhausted");
}

fn default_abort(message: &str) -> ! {
    panic!("jsrt-engine: internal invariant violated: {message}");
}

fn default_periodic() {}

fn default_sec_domain_transit(_from: Option<SecDomain>, _to: Option<SecDomain>) {}

/// Process-wide defaults and hooks. Cloned by value into each new
/// `Interpreter`; mutated only through `SystemTable::configure` before
/// the first interpreter is constructed.
#[derive(Clone)]
pub struct SystemTable {
    pub mem_exhausted: MemExhaustedHook,
    pub abort: AbortHook,
    pub periodic: PeriodicHook,
    pub sec_domain_transit: SecDomainTransitHook,
    pub default_compat_flags: CompatFlags,
    pub default_locale: String,
    pub default_recursion_limit: i64,
    pub default_trace_enabled: bool,
}

impl Default for SystemTable {
    fn default() -> Self {
        Self {
            mem_exhausted: default_mem_exhausted,
            abort: default_abort,
            periodic: default_periodic,
            sec_domain_transit: default_sec_domain_transit,
            default_compat_flags: CompatFlags::EMPTY,
            default_locale: String::from("C"),
            default_recursion_limit: UNLIMITED_RECURSION,
            default_trace_enabled: false,
        }
    }
}

static GLOBAL: OnceCell<RwLock<SystemTable>> = OnceCell::new();

impl SystemTable {
    fn cell() -> &'static RwLock<SystemTable> {
        GLOBAL.get_or_init(|| RwLock::new(SystemTable::default()))
    }

    /// Snapshot of the current process-wide table.
    pub fn global() -> SystemTable {
        Self::cell().read().clone()
    }

    /// Replaces the process-wide table wholesale. Intended to run once
    /// at host start-up, before any interpreter is constructed; later
    /// calls are honored but only affect interpreters built afterward.
    pub fn configure(table: SystemTable) {
        *Self::cell().write() = table;
    }
}
