//! Fixed-capacity, insertion-ordered sequence.
//!
//! Storage is allocated once at construction and never grows. Operations at
//! the end are O(1); insertion and removal elsewhere shift the tail and are
//! O(n). Failed mutations leave the contents untouched and report the failure
//! through their return value.

/// Bounded sequence backing every stack in the interpreter.
///
/// A capacity of zero is valid: every mutation fails and every index is out
/// of range.
#[derive(Clone, Debug)]
pub struct BoundedList<T> {
    slots: Box<[T]>,
    count: usize,
}

impl<T: Copy + Default> BoundedList<T> {
    /// Creates an empty list able to hold `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity].into_boxed_slice(),
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).copied()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots[..self.count].get_mut(index)
    }

    pub fn first(&self) -> Option<T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<T> {
        self.count.checked_sub(1).and_then(|index| self.get(index))
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        let index = self.count.checked_sub(1)?;
        self.get_mut(index)
    }

    /// Adds `value` at the end. Returns false if full.
    pub fn append(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.count] = value;
        self.count += 1;
        true
    }

    /// Adds `value` at the front, shifting every element up by one.
    pub fn prepend(&mut self, value: T) -> bool {
        self.insert(0, value)
    }

    /// Inserts `value` so that it ends up at `index`. `index == len()` appends.
    pub fn insert(&mut self, index: usize, value: T) -> bool {
        if self.is_full() || index > self.count {
            return false;
        }
        self.slots.copy_within(index..self.count, index + 1);
        self.slots[index] = value;
        self.count += 1;
        true
    }

    pub fn remove_last(&mut self) -> Option<T> {
        let value = self.last()?;
        self.count -= 1;
        Some(value)
    }

    pub fn remove_first(&mut self) -> Option<T> {
        self.remove_at(0)
    }

    /// Removes and returns the element at `index`, shifting the tail down.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        let value = self.get(index)?;
        self.slots.copy_within(index + 1..self.count, index);
        self.count -= 1;
        Some(value)
    }

    /// Exchanges two elements. Returns false if either index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.count || b >= self.count {
            return false;
        }
        self.slots.swap(a, b);
        true
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Fills every slot with `value`, leaving the list full.
    pub fn fill(&mut self, value: T) {
        self.slots.fill(value);
        self.count = self.slots.len();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Occupied slots, front to back.
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.count]
    }
}

impl<T: Copy + Default + PartialEq> BoundedList<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.as_slice().contains(value)
    }

    pub fn index_of_first(&self, value: &T) -> Option<usize> {
        self.iter().position(|v| v == value)
    }

    pub fn index_of_last(&self, value: &T) -> Option<usize> {
        self.iter().rposition(|v| v == value)
    }

    /// Removes the first element equal to `value`. Returns false if absent.
    pub fn remove_first_of(&mut self, value: &T) -> bool {
        self.index_of_first(value)
            .and_then(|index| self.remove_at(index))
            .is_some()
    }

    /// Removes the last element equal to `value`. Returns false if absent.
    pub fn remove_last_of(&mut self, value: &T) -> bool {
        self.index_of_last(value)
            .and_then(|index| self.remove_at(index))
            .is_some()
    }
}

impl<'a, T: Copy + Default> IntoIterator for &'a BoundedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(capacity: usize, values: &[u32]) -> BoundedList<u32> {
        let mut list = BoundedList::new(capacity);
        for &v in values {
            assert!(list.append(v));
        }
        list
    }

    #[test]
    fn append_until_full() {
        let mut list = BoundedList::new(3);
        assert!(list.is_empty());
        assert!(list.append(1u32));
        assert!(list.append(2));
        assert!(list.append(3));
        assert!(list.is_full());
        assert!(!list.append(4));
        assert_eq!(list.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn remove_last_until_empty() {
        let mut list = list_of(4, &[1, 2]);
        assert_eq!(list.remove_last(), Some(2));
        assert_eq!(list.remove_last(), Some(1));
        assert_eq!(list.remove_last(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn indexed_access_is_checked() {
        let mut list = list_of(4, &[10, 20]);
        assert_eq!(list.get(1), Some(20));
        assert_eq!(list.get(2), None);
        assert!(list.get_mut(3).is_none());
        *list.get_mut(0).unwrap() = 11;
        assert_eq!(list.first(), Some(11));
        assert_eq!(list.last(), Some(20));
    }

    #[test]
    fn insert_shifts_tail() {
        let mut list = list_of(5, &[1, 2, 4]);
        assert!(list.insert(2, 3));
        assert_eq!(list.as_slice(), &[1, 2, 3, 4]);
        assert!(list.insert(4, 5));
        assert_eq!(list.as_slice(), &[1, 2, 3, 4, 5]);
        assert!(!list.insert(0, 0));
    }

    #[test]
    fn insert_past_end_fails() {
        let mut list = list_of(5, &[1]);
        assert!(!list.insert(2, 9));
        assert_eq!(list.as_slice(), &[1]);
    }

    #[test]
    fn remove_at_shifts_tail() {
        let mut list = list_of(5, &[1, 2, 3, 4]);
        assert_eq!(list.remove_at(1), Some(2));
        assert_eq!(list.as_slice(), &[1, 3, 4]);
        assert_eq!(list.remove_at(3), None);
        assert_eq!(list.as_slice(), &[1, 3, 4]);
    }

    #[test]
    fn prepend_and_remove_first() {
        let mut list = list_of(3, &[2, 3]);
        assert!(list.prepend(1));
        assert_eq!(list.as_slice(), &[1, 2, 3]);
        assert!(!list.prepend(0));
        assert_eq!(list.remove_first(), Some(1));
        assert_eq!(list.as_slice(), &[2, 3]);
    }

    #[test]
    fn swap_elements() {
        let mut list = list_of(3, &[1, 2, 3]);
        assert!(list.swap(0, 2));
        assert_eq!(list.as_slice(), &[3, 2, 1]);
        assert!(!list.swap(0, 3));
    }

    #[test]
    fn search_and_remove_by_value() {
        let mut list = list_of(6, &[5, 7, 5, 9]);
        assert!(list.contains(&7));
        assert!(!list.contains(&8));
        assert_eq!(list.index_of_first(&5), Some(0));
        assert_eq!(list.index_of_last(&5), Some(2));
        assert!(list.remove_last_of(&5));
        assert_eq!(list.as_slice(), &[5, 7, 9]);
        assert!(list.remove_first_of(&5));
        assert_eq!(list.as_slice(), &[7, 9]);
        assert!(!list.remove_first_of(&5));
    }

    #[test]
    fn fill_and_clear() {
        let mut list: BoundedList<u32> = BoundedList::new(3);
        list.fill(7);
        assert!(list.is_full());
        assert_eq!(list.as_slice(), &[7, 7, 7]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.capacity(), 3);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let mut list: BoundedList<u32> = BoundedList::new(0);
        assert!(list.is_empty());
        assert!(list.is_full());
        assert!(!list.append(1));
        assert!(!list.prepend(1));
        assert!(!list.insert(0, 1));
        assert_eq!(list.remove_last(), None);
        assert_eq!(list.remove_first(), None);
        assert_eq!(list.get(0), None);
        assert_eq!(list.last(), None);
        list.fill(3);
        assert!(list.is_empty());
    }

    #[test]
    fn iterates_front_to_back() {
        let list = list_of(4, &[3, 1, 2]);
        let collected: Vec<u32> = list.iter().copied().collect();
        assert_eq!(collected, vec![3, 1, 2]);
        assert_eq!((&list).into_iter().count(), 3);
    }
}
