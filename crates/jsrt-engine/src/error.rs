//! Crate-level error type for host-programming mistakes.
//!
//! This is distinct from a script exception (`Thrown`, see
//! `trycontext::Thrown`): `EngineError` covers misuse of the embedder
//! API itself — malformed format strings, popping an empty
//! try-context stack, an unknown compatibility-flag name — as a flat
//! `thiserror` enum. A bad *value* arriving from script code (wrong
//! argument type, wrong argument count at a call site) is instead a
//! script-visible `Thrown`/`TypeError`, since script code can
//! legitimately trigger it and may want to catch it; `EngineError`
//! is reserved for mistakes only the embedding host can make.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("try-context stack underflow: no context to pop")]
    TryStackUnderflow,

    #[error("unknown compatibility flag: {0}")]
    UnknownCompatFlag(String),

    #[error("malformed argument format string: {0}")]
    BadArgFormat(String),

    #[error("argument count mismatch: expected {expected}, got {got}")]
    ArgCountMismatch { expected: usize, got: usize },

    #[error("recursion limit reached")]
    RecursionLimitReached,

    #[error("type error: {0}")]
    TypeError(String),

    #[error("saved interpreter state does not belong to this interpreter")]
    ForeignState,
}

pub type EngineResult<T> = Result<T, EngineError>;
