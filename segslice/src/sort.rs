//! In-place sorting over anything that can compare and swap by index.
//!
//! The algorithms here only see a [`Sortable`]; they don't know (or care) that
//! a [`SegmentedSlice`] keeps its elements in separate segments.

use std::rc::Rc;

use crate::{
    error::{Error, Result},
    index::Translator,
    slice::SegmentedSlice,
    store::Segments,
};

/// A "less than" function, as used to order the elements of a slice.
pub type LessFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Runs shorter than this are sorted by insertion.
const INSERTION_SORT_THRESHOLD: usize = 16;

/// Index-based access for sorting.
pub trait Sortable {
    fn len(&self) -> usize;

    /// Is the element at `i` strictly smaller than the one at `j`?
    fn less(&self, i: usize, j: usize) -> bool;

    fn swap(&mut self, i: usize, j: usize);
}

/// Sorts `v` in place. Not stable.
///
/// Quicksort with a median-of-three pivot, insertion sort on short runs and a
/// heapsort fallback once the recursion gets too deep, so the worst case is
/// `O(n log n)` comparisons and swaps.
pub fn sort(v: &mut impl Sortable) {
    let len = v.len();
    if len < 2 {
        return;
    }
    let limit = 2 * (usize::BITS - len.leading_zeros());
    quicksort(v, 0, len, limit);
}

fn quicksort(v: &mut impl Sortable, mut start: usize, mut end: usize, mut limit: u32) {
    loop {
        let len = end - start;
        if len <= INSERTION_SORT_THRESHOLD {
            insertion_sort(v, start, end);
            return;
        }
        if limit == 0 {
            heapsort(v, start, end);
            return;
        }
        limit -= 1;

        let pivot = median_of_three(v, start, start + len / 2, end - 1);
        v.swap(start, pivot);
        let mid = partition(v, start, end);

        // Recurse into the smaller half and loop on the larger one, to bound
        // the stack depth.
        if mid - start < end - mid - 1 {
            quicksort(v, start, mid, limit);
            start = mid + 1;
        } else {
            quicksort(v, mid + 1, end, limit);
            end = mid;
        }
    }
}

fn insertion_sort(v: &mut impl Sortable, start: usize, end: usize) {
    for i in (start + 1)..end {
        let mut j = i;
        while j > start && v.less(j, j - 1) {
            v.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn median_of_three(v: &impl Sortable, a: usize, b: usize, c: usize) -> usize {
    if v.less(a, b) {
        if v.less(b, c) {
            b
        } else if v.less(a, c) {
            c
        } else {
            a
        }
    } else if v.less(a, c) {
        a
    } else if v.less(b, c) {
        c
    } else {
        b
    }
}

/// Partitions `[start, end)` around the pivot at `start` and returns the
/// pivot's final position.
fn partition(v: &mut impl Sortable, start: usize, end: usize) -> usize {
    let mut left = start + 1;
    let mut right = end - 1;

    loop {
        while left <= right && v.less(left, start) {
            left += 1;
        }
        while left <= right && !v.less(right, start) {
            right -= 1;
        }
        if left > right {
            break;
        }
        v.swap(left, right);
        left += 1;
        right -= 1;
    }

    v.swap(start, right);
    right
}

fn heapsort(v: &mut impl Sortable, start: usize, end: usize) {
    let len = end - start;
    for node in (0..len / 2).rev() {
        sift_down(v, start, node, len);
    }
    for last in (1..len).rev() {
        v.swap(start, start + last);
        sift_down(v, start, 0, last);
    }
}

fn sift_down(v: &mut impl Sortable, start: usize, mut node: usize, heap_len: usize) {
    loop {
        let mut child = 2 * node + 1;
        if child >= heap_len {
            return;
        }
        if child + 1 < heap_len && v.less(start + child, start + child + 1) {
            child += 1;
        }
        if !v.less(start + node, start + child) {
            return;
        }
        v.swap(start + node, start + child);
        node = child;
    }
}

/// A [`SegmentedSlice`]'s storage, borrowed once for the whole sort.
struct SortWindow<'a, T, F> {
    store: &'a mut Segments<T>,
    translator: Translator,
    start: usize,
    len: usize,
    less: F,
}

impl<T, F: Fn(&T, &T) -> bool> Sortable for SortWindow<'_, T, F> {
    fn len(&self) -> usize {
        self.len
    }

    fn less(&self, i: usize, j: usize) -> bool {
        (self.less)(
            self.store.slot(&self.translator, self.start + i),
            self.store.slot(&self.translator, self.start + j),
        )
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.store.swap(&self.translator, self.start + i, self.start + j);
    }
}

impl<T> SegmentedSlice<T> {
    /// Compares the elements at `i` and `j` with the configured comparator.
    pub fn less(&self, i: usize, j: usize) -> Result<bool> {
        let less = self.less.as_ref().ok_or(Error::NoComparator)?;
        let a = self.get_ref(i)?;
        let b = self.get_ref(j)?;
        Ok(less(&*a, &*b))
    }

    /// Exchanges the elements at `i` and `j`. This never allocates, and never
    /// promotes a view: swapping inside a view swaps the shared storage.
    pub fn swap(&mut self, i: usize, j: usize) -> Result<()> {
        let t = self.translator.ok_or(Error::OutOfRange {
            index: i.max(j),
            bound: self.len,
        })?;
        for index in [i, j] {
            if index >= self.len {
                return Err(Error::OutOfRange {
                    index,
                    bound: self.len,
                });
            }
        }
        self.store
            .borrow_mut()
            .swap(&t, self.start + i, self.start + j);
        Ok(())
    }

    /// Sorts the elements with the configured comparator.
    ///
    /// Sorting a view reorders the shared storage inside the view's window.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let mut arr = SegmentedSlice::new_sortable(5, |a: &i32, b: &i32| a < b);
    /// arr.append((0..100).rev());
    /// arr.sort().unwrap();
    /// assert_eq!(arr.to_vec(), (0..100).collect::<Vec<_>>());
    /// ```
    pub fn sort(&mut self) -> Result<()> {
        let less = Rc::clone(self.less.as_ref().ok_or(Error::NoComparator)?);
        self.sort_by(|a, b| less(a, b));
        Ok(())
    }

    /// Sorts the elements with an ad-hoc "less than" function.
    pub fn sort_by(&mut self, less: impl Fn(&T, &T) -> bool) {
        let Some(translator) = self.translator else {
            return;
        };
        let mut store = self.store.borrow_mut();
        let mut window = SortWindow {
            store: &mut store,
            translator,
            start: self.start,
            len: self.len,
            less,
        };
        sort(&mut window);
    }
}

impl<T> Sortable for SegmentedSlice<T> {
    fn len(&self) -> usize {
        self.len
    }

    /// # Panics
    ///
    /// Panics if no comparator is configured or an index is out of range.
    fn less(&self, i: usize, j: usize) -> bool {
        match SegmentedSlice::less(self, i, j) {
            Ok(ret) => ret,
            Err(e) => panic!("{e}"),
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        if let Err(e) = SegmentedSlice::swap(self, i, j) {
            panic!("{e}");
        }
    }
}
