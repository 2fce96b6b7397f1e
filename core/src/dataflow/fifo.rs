use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

/// Bounded single-producer / single-consumer FIFO between two stages.
///
/// Both channel ends are owned by the stream itself, so the channel can never
/// disconnect; every operation is non-blocking.
#[derive(Debug)]
pub struct Stream<T> {
    name: &'static str,
    capacity: usize,
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Stream<T> {
    /// Create a stream holding at most `capacity` items (minimum 1).
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { name, capacity, tx, rx }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Free slots left.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    /// Append `item`, handing it back when the stream is full.
    pub fn try_write(&self, item: T) -> Result<(), T> {
        self.tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) | TrySendError::Disconnected(item) => item,
        })
    }

    /// Pop the oldest item, if any.
    #[inline]
    pub fn try_read(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Move one item from `from` to `to` when possible.
///
/// Returns `true` if an item moved.
pub fn link<T>(from: &Stream<T>, to: &Stream<T>) -> bool {
    if from.is_empty() || to.is_full() {
        return false;
    }
    match from.try_read() {
        Some(item) => to.try_write(item).is_ok(),
        None => false,
    }
}
