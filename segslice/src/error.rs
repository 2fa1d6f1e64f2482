//! Errors reported by [`SegmentedSlice`](crate::SegmentedSlice) operations.

/// Everything that can go wrong when using a segmented slice.
///
/// All of these are reported at the point of the offending call; nothing is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("index {index} out of range (bound is {bound})")]
    OutOfRange { index: usize, bound: usize },

    #[error("cannot pop from an empty slice")]
    Empty,

    #[error("cannot remove elements from a view; copy it first")]
    NotOwned,

    #[error("invalid range {start}..{end} for a slice of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("segment length {0} is not a power of two")]
    InvalidSegmentLength(usize),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("failed to decode element {index}: {source}")]
    Decode {
        index: usize,
        source: serde_json::Error,
    },

    #[error("no comparator was configured for this slice")]
    NoComparator,

    #[error("failed to encode: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
