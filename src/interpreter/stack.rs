use crate::interpreter::container::BoundedList;

/// LIFO view over a [`BoundedList`]. Index 0 is the bottom of the stack.
///
/// Positional access stays available because PICK and ROLL reach below the top.
#[derive(Clone, Debug)]
pub struct BoundedStack<T> {
    items: BoundedList<T>,
}

impl<T: Copy + Default> BoundedStack<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: BoundedList::new(capacity),
        }
    }

    /// Pushes `value`. Returns false if the stack is full.
    pub fn push(&mut self, value: T) -> bool {
        self.items.append(value)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.remove_last()
    }

    /// Removes the top `n` elements. Returns false, removing nothing, if fewer are present.
    pub fn drop_top(&mut self, n: usize) -> bool {
        if n > self.items.len() {
            return false;
        }
        for _ in 0..n {
            self.items.remove_last();
        }
        true
    }

    pub fn peek(&self) -> Option<T> {
        self.items.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index)
    }

    /// Element `depth` positions below the top; `from_top(0)` is the top.
    pub fn from_top(&self, depth: usize) -> Option<T> {
        let index = self.items.len().checked_sub(depth + 1)?;
        self.items.get(index)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        self.items.remove_at(index)
    }

    pub fn insert(&mut self, index: usize, value: T) -> bool {
        self.items.insert(index, value)
    }

    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        self.items.swap(a, b)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    /// Iterates bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        self.items.as_slice()
    }
}
