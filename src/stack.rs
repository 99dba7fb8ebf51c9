//! Native stack growth for the recursive reader and evaluator.
//!
//! Deeply nested source or deep call chains recurse once per level. Wrapping
//! those recursions in [`ensure_sufficient_stack`] lets the configured depth
//! limit, not the host thread's stack size, decide when evaluation stops.

/// If less than this much stack remains, grow before recursing.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
