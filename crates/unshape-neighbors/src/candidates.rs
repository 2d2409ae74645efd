//! A capacity-limited list kept sorted by priority.

use crate::{NeighborError, Result};

/// Direction in which a [`BoundedPriorityList`] is sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortOrder {
    /// Smallest priority first. The list keeps the lowest priorities.
    #[default]
    Ascending,
    /// Largest priority first. The list keeps the highest priorities.
    Descending,
}

impl SortOrder {
    /// Returns `true` if `a` ranks strictly ahead of `b` in this order.
    fn ranks_before<P: PartialOrd>(self, a: &P, b: &P) -> bool {
        match self {
            SortOrder::Ascending => a < b,
            SortOrder::Descending => a > b,
        }
    }
}

/// A list of elements sorted by priority, optionally bounded in length.
///
/// Used by every search to accumulate the best candidates seen so far. The
/// "best" element is always at index 0 and the "worst" at the end, whichever
/// [`SortOrder`] the list uses. Equal priorities keep their insertion order.
///
/// A capacity of `0` means unbounded.
///
/// # Example
///
/// ```
/// use unshape_neighbors::BoundedPriorityList;
///
/// let mut list = BoundedPriorityList::new(2);
/// list.add("far", 9.0);
/// list.add("near", 1.0);
/// list.add("middle", 4.0);
///
/// let kept: Vec<_> = list.elements().to_vec();
/// assert_eq!(kept, vec!["near", "middle"]);
/// assert_eq!(list.worst_priority(), Some(&4.0));
/// ```
#[derive(Debug, Clone)]
pub struct BoundedPriorityList<E, P> {
    elements: Vec<E>,
    priorities: Vec<P>,
    capacity: usize,
    order: SortOrder,
}

impl<E, P: PartialOrd> BoundedPriorityList<E, P> {
    /// Creates an ascending list holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self::with_order(capacity, SortOrder::Ascending)
    }

    /// Creates an ascending list with no capacity limit.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Creates a list with the given capacity and sort direction.
    pub fn with_order(capacity: usize, order: SortOrder) -> Self {
        Self {
            elements: Vec::new(),
            priorities: Vec::new(),
            capacity,
            order,
        }
    }

    /// Maximum length, or `None` if the list is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// Sort direction of the list.
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Number of elements currently held.
    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    /// Returns `true` if the list holds nothing.
    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    /// Returns `true` if the list is at capacity. Always `false` when unbounded.
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.len() >= self.capacity
    }

    /// Offers an element to the list.
    ///
    /// Returns `true` if the element was kept. At capacity, a new element is
    /// only kept if its priority ranks strictly ahead of the current worst,
    /// which is then dropped.
    pub fn add(&mut self, element: E, priority: P) -> bool {
        if self.is_full() {
            let worst = &self.priorities[self.len() - 1];
            if !self.order.ranks_before(&priority, worst) {
                return false;
            }
        }

        // First position whose priority ranks strictly behind the new one,
        // so ties stay in insertion order.
        let order = self.order;
        let at = self
            .priorities
            .partition_point(|p| !order.ranks_before(&priority, p));
        self.elements.insert(at, element);
        self.priorities.insert(at, priority);

        if self.capacity > 0 && self.len() > self.capacity {
            self.elements.pop();
            self.priorities.pop();
        }
        true
    }

    /// Removes and returns the element and priority at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<(E, P)> {
        if index >= self.len() {
            return Err(NeighborError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok((self.elements.remove(index), self.priorities.remove(index)))
    }

    /// Removes the first (best-ranked) entry whose priority matches.
    pub fn remove_first_where_priority(
        &mut self,
        predicate: impl Fn(&P) -> bool,
    ) -> Result<(E, P)> {
        let index = self
            .priorities
            .iter()
            .position(predicate)
            .ok_or(NeighborError::NoMatchingElement)?;
        self.remove_at(index)
    }

    /// Removes the first (best-ranked) entry whose element matches.
    pub fn remove_first_where_element(
        &mut self,
        predicate: impl Fn(&E) -> bool,
    ) -> Result<(E, P)> {
        let index = self
            .elements
            .iter()
            .position(predicate)
            .ok_or(NeighborError::NoMatchingElement)?;
        self.remove_at(index)
    }

    /// Removes every entry whose priority matches. Returns how many were removed.
    pub fn remove_all_where_priority(&mut self, predicate: impl Fn(&P) -> bool) -> usize {
        self.retain(|_, p| !predicate(p))
    }

    /// Removes every entry whose element matches. Returns how many were removed.
    pub fn remove_all_where_element(&mut self, predicate: impl Fn(&E) -> bool) -> usize {
        self.retain(|e, _| !predicate(e))
    }

    fn retain(&mut self, keep: impl Fn(&E, &P) -> bool) -> usize {
        let before = self.len();
        let (elements, priorities) = std::mem::take(&mut self.elements)
            .into_iter()
            .zip(std::mem::take(&mut self.priorities))
            .filter(|(e, p)| keep(e, p))
            .unzip();
        self.elements = elements;
        self.priorities = priorities;
        before - self.len()
    }

    /// Element at `index` in priority order.
    pub fn get(&self, index: usize) -> Option<(&E, &P)> {
        Some((self.elements.get(index)?, self.priorities.get(index)?))
    }

    /// Best-ranked element and its priority.
    pub fn best(&self) -> Option<(&E, &P)> {
        self.get(0)
    }

    /// Worst-ranked element and its priority.
    pub fn worst(&self) -> Option<(&E, &P)> {
        self.get(self.len().checked_sub(1)?)
    }

    /// Priority of the best-ranked element.
    pub fn best_priority(&self) -> Option<&P> {
        self.priorities.first()
    }

    /// Priority of the worst-ranked element.
    ///
    /// During a k-nearest search this is the current search radius once the
    /// list is full.
    pub fn worst_priority(&self) -> Option<&P> {
        self.priorities.last()
    }

    /// Smallest priority held, regardless of sort direction.
    pub fn min_priority(&self) -> Option<&P> {
        match self.order {
            SortOrder::Ascending => self.priorities.first(),
            SortOrder::Descending => self.priorities.last(),
        }
    }

    /// Largest priority held, regardless of sort direction.
    pub fn max_priority(&self) -> Option<&P> {
        match self.order {
            SortOrder::Ascending => self.priorities.last(),
            SortOrder::Descending => self.priorities.first(),
        }
    }

    /// Element with the smallest priority.
    pub fn min_element(&self) -> Option<&E> {
        match self.order {
            SortOrder::Ascending => self.elements.first(),
            SortOrder::Descending => self.elements.last(),
        }
    }

    /// Element with the largest priority.
    pub fn max_element(&self) -> Option<&E> {
        match self.order {
            SortOrder::Ascending => self.elements.last(),
            SortOrder::Descending => self.elements.first(),
        }
    }

    /// Elements in priority order.
    pub fn elements(&self) -> &[E] {
        &self.elements
    }

    /// Priorities in sorted order.
    pub fn priorities(&self) -> &[P] {
        &self.priorities
    }

    /// Iterates `(element, priority)` pairs in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&E, &P)> {
        self.elements.iter().zip(self.priorities.iter())
    }

    /// Consumes the list, returning the elements in priority order.
    pub fn into_elements(self) -> Vec<E> {
        self.elements
    }
}

impl<E, P> IntoIterator for BoundedPriorityList<E, P> {
    type Item = (E, P);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<E>, std::vec::IntoIter<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter().zip(self.priorities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(values: &[f64], order: SortOrder) -> bool {
        values.windows(2).all(|w| match order {
            SortOrder::Ascending => w[0] <= w[1],
            SortOrder::Descending => w[0] >= w[1],
        })
    }

    #[test]
    fn test_unbounded_keeps_everything_sorted() {
        let mut list = BoundedPriorityList::unbounded();
        for (i, p) in [5.0, 1.0, 3.0, 9.0, 0.5].into_iter().enumerate() {
            assert!(list.add(i, p));
        }
        assert_eq!(list.len(), 5);
        assert_eq!(list.capacity(), None);
        assert!(!list.is_full());
        assert_eq!(list.elements(), &[4, 1, 2, 0, 3]);
    }

    #[test]
    fn test_bounded_ascending_drops_worst() {
        let mut list = BoundedPriorityList::new(3);
        for (i, p) in [5.0, 1.0, 3.0, 9.0, 0.5, 4.0].into_iter().enumerate() {
            list.add(i, p);
            assert!(list.len() <= 3);
        }
        assert_eq!(list.priorities(), &[0.5, 1.0, 3.0]);
        assert_eq!(list.elements(), &[4, 1, 2]);
        assert!(list.is_full());
    }

    #[test]
    fn test_bounded_descending_keeps_largest() {
        let mut list = BoundedPriorityList::with_order(2, SortOrder::Descending);
        list.add('a', 1.0);
        list.add('b', 7.0);
        list.add('c', 3.0);
        assert!(!list.add('d', 2.0));
        assert_eq!(list.elements(), &['b', 'c']);
        assert_eq!(list.max_priority(), Some(&7.0));
        assert_eq!(list.min_priority(), Some(&3.0));
        assert_eq!(list.max_element(), Some(&'b'));
        assert_eq!(list.min_element(), Some(&'c'));
    }

    #[test]
    fn test_rejects_equal_priority_at_capacity() {
        let mut list = BoundedPriorityList::new(2);
        list.add("a", 1.0);
        list.add("b", 2.0);
        assert!(!list.add("c", 2.0));
        assert_eq!(list.elements(), &["a", "b"]);
    }

    #[test]
    fn test_ties_are_insertion_stable() {
        let mut list = BoundedPriorityList::unbounded();
        list.add("first", 1.0);
        list.add("second", 1.0);
        list.add("zero", 0.0);
        list.add("third", 1.0);
        assert_eq!(list.elements(), &["zero", "first", "second", "third"]);

        let mut desc = BoundedPriorityList::with_order(0, SortOrder::Descending);
        desc.add("first", 1.0);
        desc.add("second", 1.0);
        assert_eq!(desc.elements(), &["first", "second"]);
    }

    #[test]
    fn test_accessors_on_empty() {
        let list: BoundedPriorityList<u8, f64> = BoundedPriorityList::new(4);
        assert!(list.best().is_none());
        assert!(list.worst().is_none());
        assert!(list.worst_priority().is_none());
        assert!(list.min_element().is_none());
    }

    #[test]
    fn test_remove_at() {
        let mut list = BoundedPriorityList::new(0);
        list.add('x', 2.0);
        list.add('y', 1.0);
        assert_eq!(list.remove_at(0), Ok(('y', 1.0)));
        assert_eq!(
            list.remove_at(5),
            Err(NeighborError::IndexOutOfBounds { index: 5, len: 1 })
        );
    }

    #[test]
    fn test_predicate_removal() {
        let mut list = BoundedPriorityList::unbounded();
        for i in 0..6 {
            list.add(i, i as f64);
        }
        assert_eq!(list.remove_first_where_priority(|p| *p > 2.5), Ok((3, 3.0)));
        assert_eq!(list.remove_first_where_element(|e| *e == 0), Ok((0, 0.0)));
        assert_eq!(
            list.remove_first_where_element(|e| *e == 42),
            Err(NeighborError::NoMatchingElement)
        );
        assert_eq!(list.remove_all_where_priority(|p| *p >= 4.0), 2);
        assert_eq!(list.remove_all_where_element(|e| *e == 1), 1);
        assert_eq!(list.elements(), &[2]);
        assert_eq!(list.priorities(), &[2.0]);
    }

    #[test]
    fn test_sorted_after_mixed_operations() {
        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let mut list = BoundedPriorityList::with_order(7, order);
            let mut seed = 17u64;
            for i in 0..200 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let p = (seed >> 40) as f64 / 1000.0;
                list.add(i, p);
                assert!(list.len() <= 7);
                assert!(is_sorted(list.priorities(), order));
            }
        }
    }

    #[test]
    fn test_into_iter_pairs() {
        let mut list = BoundedPriorityList::new(2);
        list.add("b", 2.0);
        list.add("a", 1.0);
        let pairs: Vec<_> = list.into_iter().collect();
        assert_eq!(pairs, vec![("a", 1.0), ("b", 2.0)]);
    }
}
