//! A list that keeps only its head sorted.
//!
//! Elements are appended in O(1). Only the first `head_len` elements (the
//! "head") are kept in order, and only while that stays cheap:
//!
//! ```text
//! Sorted        whole list in order
//! UnsortedTail  head in order, every tail element >= head's last element
//! UnsortedAll   no ordering known
//! ```
//!
//! Extracting the k smallest elements selects and sorts just that prefix
//! instead of the whole list.

use std::cmp::Ordering;

/// How much of a [`LazyHeadList`] is known to be in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortState {
    /// The whole list is sorted.
    Sorted,
    /// The head is sorted and holds the smallest elements; the tail is not.
    UnsortedTail,
    /// Nothing is known.
    UnsortedAll,
}

/// A partially sorted list with a fixed-size ordered head.
#[derive(Debug, Clone)]
pub struct LazyHeadList<T> {
    data: Vec<T>,
    head_len: usize,
    state: SortState,
}

impl<T: Ord> LazyHeadList<T> {
    /// Create a list whose head holds `head_len` elements.
    ///
    /// # Panics
    ///
    /// If `head_len` is zero.
    pub fn new(head_len: usize) -> Self {
        Self::with_capacity(head_len, head_len)
    }

    /// Like [`LazyHeadList::new`], reserving room for `capacity` elements.
    pub fn with_capacity(head_len: usize, capacity: usize) -> Self {
        assert!(head_len > 0, "head length must be positive");
        Self {
            data: Vec::with_capacity(capacity.max(head_len)),
            head_len,
            state: SortState::Sorted,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn state(&self) -> SortState {
        self.state
    }

    pub fn head_len(&self) -> usize {
        self.head_len
    }

    /// Number of elements a head cut can currently return.
    pub fn available_head_len(&self) -> usize {
        self.data.len().min(self.head_len)
    }

    /// Whether the list holds at least a full head.
    pub fn has_full_head(&self) -> bool {
        self.data.len() >= self.head_len
    }

    /// Append an element, keeping the head ordered where that is cheap.
    pub fn add(&mut self, value: T) {
        let tail_was_empty = self.data.len() <= self.head_len;
        self.data.push(value);
        let len = self.data.len();

        match len.cmp(&self.head_len) {
            Ordering::Less => self.state = SortState::UnsortedAll,
            Ordering::Equal => {
                self.data.sort();
                self.state = SortState::Sorted;
            }
            Ordering::Greater => {
                if self.state == SortState::UnsortedAll {
                    return;
                }
                let last_head = self.head_len - 1;
                if self.data[len - 1] >= self.data[last_head] {
                    self.state = SortState::UnsortedTail;
                    return;
                }

                // The new value displaces the head's largest element to the end.
                let pos = self.data[..self.head_len].partition_point(|x| *x <= self.data[len - 1]);
                self.data.swap(last_head, len - 1);
                self.data[pos..self.head_len].rotate_right(1);

                if !(tail_was_empty && self.state == SortState::Sorted) {
                    self.state = SortState::UnsortedTail;
                }
            }
        }
    }

    /// Element at `index` in storage order.
    ///
    /// # Panics
    ///
    /// If `index >= len()`.
    pub fn get(&self, index: usize) -> &T {
        match self.data.get(index) {
            Some(value) => value,
            None => panic!("index {} out of range for {} elements", index, self.data.len()),
        }
    }

    /// The smallest element without removing it.
    pub fn peek_min(&self) -> Option<&T> {
        match self.state {
            SortState::Sorted | SortState::UnsortedTail => self.data.first(),
            SortState::UnsortedAll => self.data.iter().min(),
        }
    }

    /// Sort the whole list.
    pub fn sort_all(&mut self) {
        if self.state != SortState::Sorted {
            self.data.sort();
            self.state = SortState::Sorted;
        }
    }

    /// Remove and return the `max.min(len())` smallest elements, in order.
    ///
    /// # Panics
    ///
    /// If `max > head_len()`.
    pub fn cut_off_head(&mut self, max: usize) -> Vec<T> {
        assert!(
            max <= self.head_len,
            "cannot cut {} elements off a head of {}",
            max,
            self.head_len
        );
        let n = max.min(self.data.len());
        self.cut_off_head_by_len(n)
    }

    /// Remove and return the `n` smallest elements, in order.
    ///
    /// Only the returned prefix is sorted; the rest of the list stays as it is.
    ///
    /// # Panics
    ///
    /// If `n > len()`.
    pub fn cut_off_head_by_len(&mut self, n: usize) -> Vec<T> {
        let len = self.data.len();
        assert!(n <= len, "cannot cut {} elements off a list of {}", n, len);
        if n == 0 {
            return Vec::new();
        }

        let prefix_ready = match self.state {
            SortState::Sorted => true,
            SortState::UnsortedTail => n <= self.head_len,
            SortState::UnsortedAll => false,
        };
        if !prefix_ready {
            if n < len {
                self.data.select_nth_unstable(n - 1);
            }
            self.data[..n].sort();
        }

        let cut = self.data.drain(..n).collect();
        if self.state != SortState::Sorted && self.data.len() > 1 {
            self.state = SortState::UnsortedAll;
        } else {
            self.state = SortState::Sorted;
        }
        cut
    }

    /// Remove and return everything, sorted.
    pub fn flush(&mut self) -> Vec<T> {
        self.sort_all();
        std::mem::take(&mut self.data)
    }

    /// Remove and return everything in storage order, without sorting.
    pub fn drain_unsorted(&mut self) -> Vec<T> {
        self.state = SortState::Sorted;
        std::mem::take(&mut self.data)
    }

    /// Append `values` without ordering them. The next head cut selects the
    /// smallest elements instead of sorting the list.
    pub fn extend_unsorted<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.data.len();
        self.data.extend(values);
        if self.data.len() != before && self.data.len() > 1 {
            self.state = SortState::UnsortedAll;
        }
    }

    /// Remove the first element (in storage order) matching `pred`.
    pub fn remove_first<F>(&mut self, pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.data.iter().position(pred)?;
        let removed = self.data.remove(index);
        if self.state == SortState::UnsortedTail && index < self.head_len {
            self.state = SortState::UnsortedAll;
        }
        Some(removed)
    }

    /// Elements in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}
