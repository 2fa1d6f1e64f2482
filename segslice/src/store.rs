use crate::index::Translator;

/// A single fixed-length block of element storage.
///
/// Boxed slices never reallocate, and moving the box (for example when the
/// outer `Vec` of segments grows) doesn't move the elements.
pub(crate) type Segment<T> = Box<[T]>;

/// The backing storage of a segmented slice: an append-only list of
/// equally-sized segments.
///
/// This knows nothing about the logical length of the slices using it. The
/// storage can be shared between a slice and its views, each of which tracks
/// its own window into it.
#[derive(Debug)]
pub(crate) struct Segments<T> {
    segments: Vec<Segment<T>>,
}

impl<T> Default for Segments<T> {
    fn default() -> Self {
        Segments {
            segments: Vec::new(),
        }
    }
}

impl<T> Segments<T> {
    pub fn count(&self) -> usize {
        self.segments.len()
    }

    pub fn capacity(&self, translator: &Translator) -> usize {
        self.count() * translator.segment_length()
    }

    /// Panics if `idx` is beyond the allocated capacity.
    #[inline]
    pub fn slot(&self, translator: &Translator, idx: usize) -> &T {
        let (seg, off) = translator.locate(idx);
        &self.segments[seg][off]
    }

    #[inline]
    pub fn slot_mut(&mut self, translator: &Translator, idx: usize) -> &mut T {
        let (seg, off) = translator.locate(idx);
        &mut self.segments[seg][off]
    }

    /// Exchanges two slots, possibly in different segments.
    pub fn swap(&mut self, translator: &Translator, a: usize, b: usize) {
        let (seg_a, off_a) = translator.locate(a);
        let (seg_b, off_b) = translator.locate(b);
        if seg_a == seg_b {
            self.segments[seg_a].swap(off_a, off_b);
        } else {
            let (lo, hi, off_lo, off_hi) = if seg_a < seg_b {
                (seg_a, seg_b, off_a, off_b)
            } else {
                (seg_b, seg_a, off_b, off_a)
            };
            let (head, tail) = self.segments.split_at_mut(hi);
            std::mem::swap(&mut head[lo][off_lo], &mut tail[0][off_hi]);
        }
    }

    /// Visits the slots `[start, end)` in order, one segment at a time.
    ///
    /// `f` returns `true` to stop early; the return value says whether it did.
    pub fn visit(
        &self,
        translator: &Translator,
        start: usize,
        end: usize,
        mut f: impl FnMut(usize, &T) -> bool,
    ) -> bool {
        if start >= end {
            return false;
        }

        let (first_seg, mut off) = translator.locate(start);
        let mut idx = start;
        for segment in &self.segments[first_seg..] {
            let take = (segment.len() - off).min(end - idx);
            for elt in &segment[off..off + take] {
                if f(idx, elt) {
                    return true;
                }
                idx += 1;
            }
            if idx == end {
                break;
            }
            off = 0;
        }
        false
    }
}

impl<T: Default> Segments<T> {
    /// Appends whole segments until the capacity is at least `required`.
    /// Returns the number of segments allocated.
    pub fn grow_to(&mut self, translator: &Translator, required: usize) -> usize {
        let capacity = self.capacity(translator);
        if required <= capacity {
            return 0;
        }

        let seg_len = translator.segment_length();
        let new_segments = (required - capacity).div_ceil(seg_len);
        self.segments.reserve(new_segments);
        for _ in 0..new_segments {
            self.segments
                .push(std::iter::repeat_with(T::default).take(seg_len).collect());
        }
        log::trace!(
            "allocated {new_segments} segment(s) of {seg_len}, capacity now {}",
            self.capacity(translator)
        );
        new_segments
    }

    /// Resets a slot to the zero value and returns what was there.
    pub fn take(&mut self, translator: &Translator, idx: usize) -> T {
        std::mem::take(self.slot_mut(translator, idx))
    }
}
