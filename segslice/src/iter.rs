use std::iter::FusedIterator;

use crate::{
    error::{Error, Result},
    slice::SegmentedSlice,
};

/// A forward cursor over a fixed range of a [`SegmentedSlice`].
///
/// The range is captured when the cursor is created. The cursor borrows the
/// slice, so the slice itself can't change shape while it's alive, but a
/// view or parent sharing the same storage can still write to it; what the
/// cursor yields after such a write is unspecified.
///
/// A cursor can't be rewound. To iterate again, make a new one.
#[derive(Debug)]
pub struct Cursor<'a, T> {
    slice: &'a SegmentedSlice<T>,
    pos: usize,
    end: usize,
}

impl<T: Clone> Cursor<'_, T> {
    /// Are there elements left?
    pub fn has_more(&self) -> bool {
        self.pos < self.end
    }

    /// Returns the next element along with its index in the slice.
    pub fn next_with_index(&mut self) -> Option<(usize, T)> {
        if !self.has_more() {
            return None;
        }
        let idx = self.pos;
        // The range was checked when the cursor was created, and the slice
        // can't have shrunk since.
        let elt = self.slice.get(idx).ok()?;
        self.pos += 1;
        Some((idx, elt))
    }
}

impl<T: Clone> Iterator for Cursor<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.next_with_index().map(|(_, elt)| elt)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for Cursor<'_, T> {}

impl<T: Clone> FusedIterator for Cursor<'_, T> {}

impl<T> SegmentedSlice<T> {
    /// A cursor over all the elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let arr: SegmentedSlice<_> = (0..10).map(|i| i * i).collect();
    /// let mut cursor = arr.cursor();
    /// let mut out = Vec::new();
    /// while cursor.has_more() {
    ///     out.push(cursor.next().unwrap());
    /// }
    /// assert_eq!(out, vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
    /// ```
    pub fn cursor(&self) -> Cursor<'_, T> {
        Cursor {
            slice: self,
            pos: 0,
            end: self.len,
        }
    }

    /// A cursor over the elements from `start` (inclusive) to `end`
    /// (exclusive).
    pub fn cursor_range(&self, start: usize, end: usize) -> Result<Cursor<'_, T>> {
        if start > end || end > self.len {
            return Err(Error::InvalidRange {
                start,
                end,
                len: self.len,
            });
        }
        Ok(Cursor {
            slice: self,
            pos: start,
            end,
        })
    }

    /// Calls `f` with each index and element, starting at `start`, walking
    /// the storage one segment at a time.
    ///
    /// `f` returns `true` to stop early. Returns whether it did.
    ///
    /// # Panics
    ///
    /// The storage is borrowed for the duration of the walk, so `f` must not
    /// write to this slice or to anything sharing its storage.
    pub fn for_each_at(&self, start: usize, mut f: impl FnMut(usize, &T) -> bool) -> bool {
        let Some(t) = self.translator else {
            return false;
        };
        if start >= self.len {
            return false;
        }
        let offset = self.start;
        self.store
            .borrow()
            .visit(&t, offset + start, offset + self.len, |idx, elt| {
                f(idx - offset, elt)
            })
    }

    /// Shorthand for `for_each_at(0, f)`.
    pub fn for_each(&self, f: impl FnMut(usize, &T) -> bool) -> bool {
        self.for_each_at(0, f)
    }

    /// Collects the elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut ret = Vec::with_capacity(self.len);
        self.for_each(|_, elt| {
            ret.push(elt.clone());
            false
        });
        ret
    }
}

impl<'a, T: Clone> IntoIterator for &'a SegmentedSlice<T> {
    type Item = T;
    type IntoIter = Cursor<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.cursor()
    }
}
