//! Ring buffer errors.

/// Errors reported by the fallible ring buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingBufferError {
    #[error("ring buffer capacity must be greater than zero")]
    ZeroCapacity,

    #[error("overflow: {requested} element(s) requested, {available} slot(s) free")]
    Overflow { requested: usize, available: usize },
}
