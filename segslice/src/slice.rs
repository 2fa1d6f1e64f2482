use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
};

use crate::{
    config::{Config, ViewPop},
    error::{Error, Result},
    index::Translator,
    json::Hint,
    sort::LessFn,
    store::Segments,
};

/// A growable sequence stored in fixed-length segments.
///
/// Growing never moves existing elements: new capacity comes from appending
/// whole segments to the list of segments. A `SegmentedSlice` is either
/// *owned* or a *view* produced by [`slice`](Self::slice). Views share the
/// segments of the slice they came from; writing an element through a view
/// writes the shared storage, but any operation that changes the view's shape
/// (push, append, grow, pop) first turns it into an independent copy.
///
/// This type is single-threaded. Views and their parents share storage through
/// a [`RefCell`], so holding a borrow from [`get_ref`](Self::get_ref) while
/// writing through an aliasing handle panics.
pub struct SegmentedSlice<T> {
    pub(crate) store: Rc<RefCell<Segments<T>>>,
    // `None` until the segment length is known.
    pub(crate) translator: Option<Translator>,
    pub(crate) config: Config,
    // Logical index of our first element within `store`. Always zero for an
    // owned slice.
    pub(crate) start: usize,
    pub(crate) len: usize,
    pub(crate) view: bool,
    pub(crate) less: Option<LessFn<T>>,
    pub(crate) hint: Option<Hint<T>>,
}

impl<T> SegmentedSlice<T> {
    /// Creates an empty slice with the given segment length. A length of zero
    /// picks [`DEFAULT_SEGMENT_LENGTH`](crate::DEFAULT_SEGMENT_LENGTH) on first
    /// growth.
    ///
    /// Power-of-two lengths use shift-and-mask index translation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let mut arr = SegmentedSlice::new(8);
    /// arr.append((0..10).map(|i| i * i));
    /// assert_eq!(arr.len(), 10);
    /// assert_eq!(arr.capacity(), 16);
    /// assert_eq!(arr.segment_count(), 2);
    /// ```
    pub fn new(segment_length: usize) -> Self {
        let config = Config::new(segment_length);
        // Only a zero length is rejected, and that one is resolved lazily.
        let translator = Translator::auto(segment_length).ok();
        Self::from_parts(config, translator)
    }

    /// Creates an empty slice that can be sorted with `less`.
    pub fn new_sortable(segment_length: usize, less: impl Fn(&T, &T) -> bool + 'static) -> Self {
        let mut ret = Self::new(segment_length);
        ret.less = Some(Rc::new(less));
        ret
    }

    /// Creates an empty slice from a [`Config`].
    ///
    /// Fails with [`Error::InvalidSegmentLength`] if the configured strategy
    /// can't handle the configured segment length.
    pub fn with_config(config: Config) -> Result<Self> {
        let translator = config.translator()?;
        Ok(Self::from_parts(config, translator))
    }

    fn from_parts(config: Config, translator: Option<Translator>) -> Self {
        SegmentedSlice {
            store: Rc::default(),
            translator,
            config,
            start: 0,
            len: 0,
            view: false,
            less: None,
            hint: None,
        }
    }

    /// The number of elements in this slice.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if this slice still shares storage with the slice it was
    /// cut from.
    pub fn is_view(&self) -> bool {
        self.view
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The number of elements per segment, or zero if no segment length has
    /// been chosen yet.
    pub fn segment_length(&self) -> usize {
        self.translator.map_or(0, |t| t.segment_length())
    }

    /// The number of element slots this slice can use without allocating.
    ///
    /// For an owned slice this is always a multiple of the segment length. A
    /// view owns no slots beyond its window, so its capacity is its length.
    pub fn capacity(&self) -> usize {
        if self.view {
            return self.len;
        }
        self.translator.map_or(0, |t| self.store.borrow().capacity(&t))
    }

    /// The number of segments backing this slice. For a view, the number of
    /// shared segments its window touches.
    pub fn segment_count(&self) -> usize {
        if !self.view {
            return self.store.borrow().count();
        }
        match self.translator {
            Some(t) if self.len > 0 => {
                let (first, _) = t.locate(self.start);
                let (last, _) = t.locate(self.start + self.len - 1);
                last - first + 1
            }
            _ => 0,
        }
    }

    /// Attaches (or replaces) the ordering used by [`sort`](Self::sort) and
    /// [`less`](Self::less).
    pub fn set_comparator(&mut self, less: impl Fn(&T, &T) -> bool + 'static) {
        self.less = Some(Rc::new(less));
    }

    fn checked_translator(&self, index: usize, bound: usize) -> Result<Translator> {
        match self.translator {
            Some(t) if index < bound => Ok(t),
            _ => Err(Error::OutOfRange { index, bound }),
        }
    }

    /// Borrows the element at `index`.
    ///
    /// Elements never move while the slice grows, so the address behind the
    /// returned reference is the same for the lifetime of the storage.
    pub fn get_ref(&self, index: usize) -> Result<Ref<'_, T>> {
        let t = self.checked_translator(index, self.len)?;
        let idx = self.start + index;
        Ok(Ref::map(self.store.borrow(), |store| store.slot(&t, idx)))
    }

    /// Gets a copy of the element at `index`, or [`Error::OutOfRange`] if
    /// `index >= self.len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let arr: SegmentedSlice<_> = [0, 1, 2, 3, 4, 5].into_iter().collect();
    /// assert_eq!(arr.get(2).unwrap(), 2);
    /// assert!(arr.get(6).is_err());
    /// ```
    pub fn get(&self, index: usize) -> Result<T>
    where
        T: Clone,
    {
        self.get_ref(index).map(|elt| elt.clone())
    }

    /// Overwrites the element at `index`.
    ///
    /// An owned slice accepts any index below its capacity; writing past the
    /// length fills the slot without changing the length. A view only accepts
    /// indices inside its window, and the write is visible to every slice
    /// sharing the storage.
    pub fn set(&mut self, index: usize, elt: T) -> Result<()> {
        let bound = self.capacity();
        let t = self.checked_translator(index, bound)?;
        *self.store.borrow_mut().slot_mut(&t, self.start + index) = elt;
        Ok(())
    }

    /// A view of the elements from `start` (inclusive) to `end` (exclusive).
    ///
    /// The view shares storage with `self` until it is structurally modified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let arr: SegmentedSlice<_> = [0, 1, 2, 3, 4, 5].into_iter().collect();
    /// let mut view = arr.slice(1, 4).unwrap();
    /// assert_eq!(view.to_vec(), vec![1, 2, 3]);
    /// view.set(0, 10).unwrap();
    /// assert_eq!(arr.get(1).unwrap(), 10);
    /// ```
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len {
            return Err(Error::InvalidRange {
                start,
                end,
                len: self.len,
            });
        }

        Ok(SegmentedSlice {
            store: Rc::clone(&self.store),
            translator: self.translator,
            config: self.config,
            start: self.start + start,
            len: end - start,
            view: true,
            less: self.less.clone(),
            hint: self.hint.clone(),
        })
    }
}

impl<T: Clone + Default> SegmentedSlice<T> {
    /// An independent copy of this slice, with storage of its own.
    pub fn copy(&self) -> Self {
        let mut store = Segments::default();
        if let Some(t) = &self.translator {
            store.grow_to(t, self.len);
            self.store
                .borrow()
                .visit(t, self.start, self.start + self.len, |idx, elt| {
                    *store.slot_mut(t, idx - self.start) = elt.clone();
                    false
                });
        }

        SegmentedSlice {
            store: Rc::new(RefCell::new(store)),
            translator: self.translator,
            config: self.config,
            start: 0,
            len: self.len,
            view: false,
            less: self.less.clone(),
            hint: self.hint.clone(),
        }
    }

    /// If we're a view, detach from the shared storage.
    fn promote(&mut self) {
        if self.view {
            log::trace!(
                "promoting view of {} element(s) at offset {} to an owned copy",
                self.len,
                self.start
            );
            *self = self.copy();
        }
    }

    /// The translator, picking the default segment length if there isn't one
    /// yet.
    fn translator_or_default(&mut self) -> Translator {
        *self
            .translator
            .get_or_insert_with(|| self.config.default_translator())
    }

    fn make_room(&mut self, extra: usize) -> (Translator, usize) {
        self.promote();
        let t = self.translator_or_default();
        let required = self.len.checked_add(extra).expect("capacity overflow");
        let added = self.store.borrow_mut().grow_to(&t, required);
        (t, added)
    }

    /// Makes sure there is room for `extra` more elements, returning the number
    /// of segments that had to be allocated.
    ///
    /// On a view this first makes an owned copy, even if `extra` is zero.
    ///
    /// # Panics
    ///
    /// Panics if the required capacity overflows `usize`.
    pub fn grow(&mut self, extra: usize) -> usize {
        self.make_room(extra).1
    }

    /// Adds an element to the end of this slice.
    pub fn push(&mut self, elt: T) {
        let (t, _) = self.make_room(1);
        *self.store.borrow_mut().slot_mut(&t, self.len) = elt;
        self.len += 1;
    }

    /// Adds all of `values` to the end of this slice, in order.
    ///
    /// Appending nothing is a no-op, even on a view.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let mut arr = SegmentedSlice::new(4);
    /// arr.append([1, 2, 3]);
    /// arr.append([4, 5, 6]);
    /// assert_eq!(arr.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    /// assert_eq!(arr.segment_count(), 2);
    /// ```
    pub fn append<I: IntoIterator<Item = T>>(&mut self, values: I) {
        // Peek so that an empty input doesn't promote a view.
        let mut iter = values.into_iter().peekable();
        if iter.peek().is_none() {
            return;
        }

        let (t, _) = self.make_room(iter.size_hint().0);
        for elt in iter {
            // `values` may be reading this storage (a view of `self`, say), so
            // the store is only borrowed once the element is in hand.
            let mut store = self.store.borrow_mut();
            // A no-op unless the size hint was an underestimate.
            store.grow_to(&t, self.len + 1);
            *store.slot_mut(&t, self.len) = elt;
            self.len += 1;
        }
    }

    /// Removes and returns the last element, resetting its slot to
    /// `T::default()`.
    ///
    /// Fails with [`Error::Empty`] on an empty slice. On a view, fails with
    /// [`Error::NotOwned`] unless the slice was configured with
    /// [`ViewPop::Promote`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// let mut arr: SegmentedSlice<_> = [0, 1, 2].into_iter().collect();
    /// assert_eq!(arr.pop().unwrap(), 2);
    /// assert_eq!(arr.to_vec(), vec![0, 1]);
    /// ```
    pub fn pop(&mut self) -> Result<T> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        if self.view {
            match self.config.view_pop {
                ViewPop::Reject => return Err(Error::NotOwned),
                ViewPop::Promote => self.promote(),
            }
        }

        // A non-empty slice always has a translator.
        let t = self.translator.ok_or(Error::Empty)?;
        self.len -= 1;
        Ok(self.store.borrow_mut().take(&t, self.start + self.len))
    }
}

impl<T> Default for SegmentedSlice<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Cloning makes an independent copy; see [`SegmentedSlice::copy`].
impl<T: Clone + Default> Clone for SegmentedSlice<T> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<T: PartialEq> PartialEq for SegmentedSlice<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let (Some(t), Some(other_t)) = (self.translator, other.translator) else {
            // At least one of us never allocated, so both are empty.
            return true;
        };

        let ours = self.store.borrow();
        let theirs = other.store.borrow();
        !ours.visit(&t, self.start, self.start + self.len, |idx, elt| {
            elt != theirs.slot(&other_t, other.start + idx - self.start)
        })
    }
}

impl<T: Eq> Eq for SegmentedSlice<T> {}

impl<T: fmt::Debug> fmt::Debug for SegmentedSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        self.for_each(|_, elt| {
            list.entry(elt);
            false
        });
        list.finish()
    }
}

/// Renders the elements as `[e0, e1, ...]`.
impl<T: fmt::Display> fmt::Display for SegmentedSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut ret = Ok(());
        self.for_each(|idx, elt| {
            ret = if idx == 0 {
                write!(f, "{elt}")
            } else {
                write!(f, ", {elt}")
            };
            ret.is_err()
        });
        ret?;
        write!(f, "]")
    }
}

impl<T: Clone + Default> Extend<T> for SegmentedSlice<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.append(iter);
    }
}

impl<T: Clone + Default> FromIterator<T> for SegmentedSlice<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut ret = SegmentedSlice::default();
        ret.append(iter);
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        let mut arr = SegmentedSlice::new(8);
        assert_eq!(arr.capacity(), 0);
        assert_eq!(arr.segment_count(), 0);
        arr.append((0..10).map(|i: u32| i * i));
        assert_eq!(arr.len(), 10);
        assert_eq!(arr.capacity(), 16);
        assert_eq!(arr.segment_count(), 2);

        assert_eq!(arr.pop().unwrap(), 81);
        assert_eq!(arr.len(), 9);
        assert_eq!(arr.capacity(), 16);
        assert_eq!(arr.segment_count(), 2);

        let view = arr.slice(4, 7).unwrap();
        assert_eq!(view.to_vec(), vec![16, 25, 36]);
        assert_eq!(view.to_string(), "[16, 25, 36]");
        assert_eq!(format!("{view:?}"), "[16, 25, 36]");
    }

    #[test]
    fn lazy_segment_length() {
        let mut arr = SegmentedSlice::<u8>::new(0);
        assert_eq!(arr.segment_length(), 0);
        assert!(arr.get(0).is_err());
        assert_eq!(arr.grow(0), 0);
        assert_eq!(arr.segment_length(), crate::DEFAULT_SEGMENT_LENGTH);
        assert_eq!(arr.grow(1), 1);
        assert_eq!(arr.capacity(), crate::DEFAULT_SEGMENT_LENGTH);
    }

    #[test]
    fn grow_allocates_whole_segments() {
        let mut arr = SegmentedSlice::<u32>::new(5);
        assert_eq!(arr.grow(11), 3);
        assert_eq!(arr.capacity(), 15);
        assert_eq!(arr.grow(15), 0);
        assert_eq!(arr.grow(16), 1);
        assert_eq!(arr.len(), 0);
    }

    #[test]
    fn set_bounds() {
        let mut arr = SegmentedSlice::new(4);
        arr.push(1u32);
        arr.set(0, 2).unwrap();
        // Writing past the length but within capacity is allowed...
        arr.set(3, 9).unwrap();
        assert_eq!(arr.len(), 1);
        assert!(arr.get(3).is_err());
        // ...but writing past the capacity is not.
        assert!(matches!(
            arr.set(4, 9),
            Err(Error::OutOfRange { index: 4, bound: 4 })
        ));

        let mut view = arr.slice(0, 1).unwrap();
        assert!(view.set(1, 3).is_err());
        view.set(0, 3).unwrap();
        assert_eq!(arr.get(0).unwrap(), 3);
    }

    #[test]
    fn pop_errors() {
        let mut arr = SegmentedSlice::<u32>::new(4);
        assert!(matches!(arr.pop(), Err(Error::Empty)));

        arr.append([1, 2, 3]);
        let mut view = arr.slice(1, 3).unwrap();
        assert!(matches!(view.pop(), Err(Error::NotOwned)));
        assert!(view.is_view());

        let mut empty_view = arr.slice(2, 2).unwrap();
        assert!(matches!(empty_view.pop(), Err(Error::Empty)));
    }

    #[test]
    fn pop_with_promotion() {
        let config = Config::new(4).view_pop(ViewPop::Promote);
        let mut arr = SegmentedSlice::<u32>::with_config(config).unwrap();
        arr.append([1, 2, 3]);
        let mut view = arr.slice(0, 2).unwrap();
        assert_eq!(view.pop().unwrap(), 2);
        assert!(!view.is_view());
        assert_eq!(arr.to_vec(), vec![1, 2, 3]);
        assert_eq!(view.to_vec(), vec![1]);
    }

    #[test]
    fn pop_clears_slot() {
        let mut arr = SegmentedSlice::new(2);
        arr.append([String::from("a"), String::from("b")]);
        assert_eq!(arr.pop().unwrap(), "b");
        // The slot still exists, but holds the default value.
        assert_eq!(arr.store.borrow().slot(&arr.translator.unwrap(), 1), "");
    }

    #[test]
    fn views_share_until_promoted() {
        let mut arr: SegmentedSlice<i32> = (0..20).collect();
        let mut view = arr.slice(5, 10).unwrap();
        assert_eq!(view.capacity(), 5);

        view.set(0, -5).unwrap();
        assert_eq!(arr.get(5).unwrap(), -5);
        arr.set(6, -6).unwrap();
        assert_eq!(view.get(1).unwrap(), -6);

        view.push(100);
        assert!(!view.is_view());
        assert_eq!(view.to_vec(), vec![-5, -6, 7, 8, 9, 100]);

        view.set(0, 0).unwrap();
        assert_eq!(arr.get(5).unwrap(), -5);
        assert_eq!(arr.get(10).unwrap(), 10);
    }

    #[test]
    fn empty_append_does_not_promote() {
        let arr: SegmentedSlice<i32> = (0..4).collect();
        let mut view = arr.slice(1, 3).unwrap();
        view.append([]);
        assert!(view.is_view());
        view.grow(0);
        assert!(!view.is_view());
        assert_eq!(view.capacity(), view.segment_length());
    }

    #[test]
    fn extend_from_own_view() {
        let mut arr: SegmentedSlice<u32> = (0..4).collect();
        let view = arr.slice(0, 2).unwrap();
        arr.extend(&view);
        assert_eq!(arr.to_vec(), vec![0, 1, 2, 3, 0, 1]);

        let view = arr.slice(1, 3).unwrap();
        arr.append(view.cursor());
        assert_eq!(arr.to_vec(), vec![0, 1, 2, 3, 0, 1, 1, 2]);
        assert_eq!(view.to_vec(), vec![1, 2]);

        // Crossing a segment boundary while reading the shared storage.
        let mut arr = SegmentedSlice::<u32>::new(3);
        arr.append(0..5);
        let view = arr.slice(0, 5).unwrap();
        arr.append(view.cursor().filter(|_| true));
        assert_eq!(arr.to_vec(), vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 4]);
        assert_eq!(arr.capacity(), 12);
    }

    #[test]
    fn nested_views() {
        let mut arr = SegmentedSlice::<i32>::new(3);
        arr.append(0..12);
        let outer = arr.slice(2, 11).unwrap();
        let mut inner = outer.slice(3, 6).unwrap();
        assert_eq!(inner.to_vec(), vec![5, 6, 7]);
        assert_eq!(inner.segment_count(), 2);
        inner.set(2, 70).unwrap();
        assert_eq!(arr.get(7).unwrap(), 70);
        assert_eq!(outer.get(5).unwrap(), 70);
        assert!(matches!(
            outer.slice(4, 10),
            Err(Error::InvalidRange {
                start: 4,
                end: 10,
                len: 9
            })
        ));
        assert!(outer.slice(5, 4).is_err());
    }

    #[test]
    fn copy_is_independent() {
        let mut arr: SegmentedSlice<i32> = (0..10).collect();
        let mut copy = arr.copy();
        assert_eq!(arr, copy);
        copy.set(0, 100).unwrap();
        arr.set(1, 200).unwrap();
        assert_eq!(arr.get(0).unwrap(), 0);
        assert_eq!(copy.get(1).unwrap(), 1);
        assert_ne!(arr, copy);

        let view = arr.slice(3, 6).unwrap();
        let view_copy = view.copy();
        assert!(!view_copy.is_view());
        assert_eq!(view, view_copy);
        assert_eq!(view_copy.segment_length(), arr.segment_length());
    }

    #[test]
    fn stable_addresses() {
        let mut arr = SegmentedSlice::new(16);
        arr.push(1u64);
        let addr = {
            let r = arr.get_ref(0).unwrap();
            &*r as *const u64
        };
        arr.append(2..10_000);
        assert_eq!(addr, &*arr.get_ref(0).unwrap() as *const u64);
    }
}
