//! Translation from logical indices to `(segment, offset)` pairs.

use serde::Deserialize;

use crate::error::{Error, Result};

/// How a [`Translator`] should be built for a given segment length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Shift and mask when the segment length is a power of two, division
    /// otherwise.
    #[default]
    Auto,
    /// Division and modulo; works for every positive segment length.
    Divide,
    /// Shift and mask; the segment length must be a power of two.
    Shift,
}

/// Maps a logical index to the segment holding it and the offset inside
/// that segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Translator {
    Divide { len: usize },
    Shift { shift: u32, mask: usize },
}

impl Translator {
    /// A division-based translator; fails if `len` is zero.
    pub fn divide(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidSegmentLength(len));
        }
        Ok(Translator::Divide { len })
    }

    /// A shift-based translator; fails unless `len` is a power of two.
    pub fn shift(len: usize) -> Result<Self> {
        if !len.is_power_of_two() {
            return Err(Error::InvalidSegmentLength(len));
        }
        Ok(Translator::Shift {
            shift: len.ilog2(),
            mask: len - 1,
        })
    }

    pub fn with_strategy(strategy: Strategy, len: usize) -> Result<Self> {
        match strategy {
            Strategy::Divide => Self::divide(len),
            Strategy::Shift => Self::shift(len),
            Strategy::Auto => Self::auto(len),
        }
    }

    /// Shift-based for powers of two, division-based otherwise. Fails if `len`
    /// is zero.
    pub fn auto(len: usize) -> Result<Self> {
        if len.is_power_of_two() {
            Self::shift(len)
        } else {
            Self::divide(len)
        }
    }

    /// The number of elements in each segment.
    pub fn segment_length(&self) -> usize {
        match *self {
            Translator::Divide { len } => len,
            Translator::Shift { mask, .. } => mask + 1,
        }
    }

    #[inline]
    pub fn locate(&self, idx: usize) -> (usize, usize) {
        match *self {
            Translator::Divide { len } => (idx / len, idx % len),
            Translator::Shift { shift, mask } => (idx >> shift, idx & mask),
        }
    }
}
