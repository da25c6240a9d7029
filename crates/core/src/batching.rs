//! Splitting outgoing messages into queue-sized batches.

/// Maximum number of entries the queue accepts in one batch send call.
pub const MAX_QUEUE_BATCH: usize = 10;

/// Split `items` into consecutive batches of at most [`MAX_QUEUE_BATCH`].
pub fn batches<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
    items.chunks(MAX_QUEUE_BATCH)
}

/// Number of batch send calls needed for `len` items.
pub fn batch_count(len: usize) -> usize {
    len.div_ceil(MAX_QUEUE_BATCH)
}
