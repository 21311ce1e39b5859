//! Fixed-capacity ring buffer. Memory is allocated once; pushing past
//! capacity overwrites the oldest slot.

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    /// Index of the oldest element.
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// A buffer holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an item, returning the evicted oldest item when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let capacity = self.capacity();
        if self.len < capacity {
            let tail = (self.head + self.len) % capacity;
            self.slots[tail] = Some(item);
            self.len += 1;
            None
        } else {
            let evicted = self.slots[self.head].replace(item);
            self.head = (self.head + 1) % capacity;
            evicted
        }
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (0..self.len).filter_map(move |offset| self.slots[(self.head + offset) % capacity].as_ref())
    }

    pub fn newest(&self) -> Option<&T> {
        self.iter().next_back()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}
