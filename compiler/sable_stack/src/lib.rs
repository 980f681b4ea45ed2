//! Stack growth for the few recursive passes left in Sable.
//!
//! Evaluation itself runs on an explicit continuation stack and never
//! recurses on the native stack. Two passes still walk trees recursively:
//! lowering ESTree JSON into the node arena, and printing nested pair
//! structures. Both wrap their recursive step in [`ensure_sufficient_stack`].
//!
//! - **Native targets**: grows the stack on demand through `stacker`.
//! - **WASM targets**: plain passthrough.

/// Remaining stack below which we grow (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
