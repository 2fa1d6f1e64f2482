//! Growable sequences that never move their elements.
//!
//! A [`SegmentedSlice`] stores its elements in fixed-length *segments*. When it
//! runs out of room it allocates another segment instead of reallocating and
//! copying everything, so pushing is `O(1)` without the occasional large copy
//! a `Vec` makes, and an element's address doesn't change as the slice grows.
//!
//! Slices can be cut into views with [`SegmentedSlice::slice`]. A view shares
//! its parent's segments until something changes its shape, at which point it
//! copies its window into storage of its own.
//!
//! Elements are usually statically typed. For heterogeneous data, use
//! `SegmentedSlice<Value>`; see [`value`].
//!
//! Everything here is single-threaded.

pub mod config;
pub mod error;
pub mod index;
pub mod iter;
pub mod json;
pub mod slice;
pub mod sort;
mod store;
pub mod value;

pub use config::{Config, ViewPop, DEFAULT_SEGMENT_LENGTH};
pub use error::{Error, Result};
pub use index::{Strategy, Translator};
pub use iter::Cursor;
pub use json::Hint;
pub use slice::SegmentedSlice;
pub use sort::Sortable;
pub use value::Value;
