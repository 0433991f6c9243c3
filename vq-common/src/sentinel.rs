//! Fixed-capacity sequences with "empty slot" semantics
//!
//! A [`SentinelArray`] never grows or shrinks. Unoccupied slots hold the
//! element type's sentinel value and all occupied slots form a contiguous
//! prefix `[0, count)`. Every mutation restores that layout before returning.

/// Element types that have a distinguished "empty" value
pub trait HasSentinel: Clone + PartialEq {
    /// The value stored in an unoccupied slot
    fn sentinel() -> Self;

    /// Whether this value marks an unoccupied slot
    fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }
}

impl HasSentinel for String {
    fn sentinel() -> Self {
        String::new()
    }

    fn is_sentinel(&self) -> bool {
        self.is_empty()
    }
}

impl HasSentinel for i32 {
    fn sentinel() -> Self {
        -1
    }
}

/// Fixed-capacity sequence keeping occupied slots contiguous
///
/// The count is not cached: it is the index of the first empty slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SentinelArray<T: HasSentinel> {
    slots: Vec<T>,
}

impl<T: HasSentinel> SentinelArray<T> {
    /// Create an array of `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::sentinel(); capacity],
        }
    }

    /// Rebuild an array from raw slots
    ///
    /// Returns `None` when the slots do not satisfy the contiguous-prefix
    /// layout or the length differs from `capacity`.
    pub fn try_from_slots(slots: Vec<T>, capacity: usize) -> Option<Self> {
        if slots.len() != capacity {
            return None;
        }
        let array = Self { slots };
        array.is_contiguous().then_some(array)
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots (index of the first empty slot)
    pub fn count(&self) -> usize {
        self.slots
            .iter()
            .position(HasSentinel::is_sentinel)
            .unwrap_or(self.slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_full(&self) -> bool {
        self.count() == self.capacity()
    }

    /// Occupied slot at `index`, `None` beyond the count
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).filter(|value| !value.is_sentinel())
    }

    /// First occupied slot
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Iterate over occupied slots in order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().take_while(|value| !value.is_sentinel())
    }

    /// All slots including trailing sentinels
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Place `value` at the first empty slot
    ///
    /// Returns false (and changes nothing) when the array is full or `value`
    /// is itself the sentinel.
    pub fn enqueue(&mut self, value: T) -> bool {
        if value.is_sentinel() {
            return false;
        }
        let index = self.count();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Remove the slot at `index`, shifting the tail left
    ///
    /// Indices at or beyond the count are a no-op and return `None`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.count() {
            return None;
        }
        let removed = std::mem::replace(&mut self.slots[index], T::sentinel());
        self.slots[index..].rotate_left(1);
        Some(removed)
    }

    /// Swap the slot at `index` with the one before it
    ///
    /// Valid for `index` in `[1, count-1]`.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.count() {
            return false;
        }
        self.slots.swap(index - 1, index);
        true
    }

    /// Swap the slot at `index` with the one after it
    ///
    /// Valid for `index` in `[0, count-2]`.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.count() {
            return false;
        }
        self.slots.swap(index, index + 1);
        true
    }

    /// Reset every slot to the sentinel
    pub fn clear(&mut self) {
        self.slots.fill(T::sentinel());
    }

    /// Whether no empty slot precedes an occupied one
    pub fn is_contiguous(&self) -> bool {
        let count = self.count();
        self.slots[count..].iter().all(HasSentinel::is_sentinel)
    }
}
