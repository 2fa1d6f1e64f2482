//! Construction options for a [`SegmentedSlice`](crate::SegmentedSlice).
//!
//! [`Config`] implements [`serde::Deserialize`] with every field optional, so
//! it can be embedded in whatever configuration format the host application
//! already reads.

use serde::Deserialize;

use crate::{
    error::Result,
    index::{Strategy, Translator},
    slice::SegmentedSlice,
};

/// The segment length used when none was requested.
pub const DEFAULT_SEGMENT_LENGTH: usize = 128;

/// What [`pop`](crate::SegmentedSlice::pop) does when called on a view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewPop {
    /// Fail with [`Error::NotOwned`](crate::Error::NotOwned).
    #[default]
    Reject,
    /// Promote the view to an owned copy, then pop from the copy.
    Promote,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Elements per segment. Zero defers the choice to the first growth,
    /// which picks [`DEFAULT_SEGMENT_LENGTH`].
    pub segment_length: usize,
    pub strategy: Strategy,
    pub view_pop: ViewPop,
}

impl Config {
    pub fn new(segment_length: usize) -> Self {
        Config {
            segment_length,
            ..Default::default()
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn view_pop(mut self, view_pop: ViewPop) -> Self {
        self.view_pop = view_pop;
        self
    }

    /// Creates an empty slice with these options; the same as
    /// [`SegmentedSlice::with_config`].
    ///
    /// Fails with [`Error::InvalidSegmentLength`](crate::Error::InvalidSegmentLength)
    /// if the strategy can't handle the segment length.
    pub fn build<T>(self) -> Result<SegmentedSlice<T>> {
        SegmentedSlice::with_config(self)
    }

    /// Builds the index translator for the configured segment length, or
    /// `None` if the length is still to be decided.
    pub(crate) fn translator(&self) -> Result<Option<Translator>> {
        if self.segment_length == 0 {
            Ok(None)
        } else {
            Translator::with_strategy(self.strategy, self.segment_length).map(Some)
        }
    }

    pub(crate) fn default_translator(&self) -> Translator {
        // The default length is a power of two, so every strategy accepts it.
        match self.strategy {
            Strategy::Divide => Translator::Divide {
                len: DEFAULT_SEGMENT_LENGTH,
            },
            Strategy::Auto | Strategy::Shift => Translator::Shift {
                shift: DEFAULT_SEGMENT_LENGTH.ilog2(),
                mask: DEFAULT_SEGMENT_LENGTH - 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_with_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());

        let config: Config =
            serde_json::from_str(r#"{"segment_length": 64, "strategy": "shift", "view_pop": "promote"}"#)
                .unwrap();
        assert_eq!(
            config,
            Config::new(64)
                .strategy(Strategy::Shift)
                .view_pop(ViewPop::Promote)
        );
    }

    #[test]
    fn lazy_translator() {
        assert_eq!(Config::default().translator().unwrap(), None);
        assert_eq!(
            Config::default().default_translator().segment_length(),
            DEFAULT_SEGMENT_LENGTH
        );
        assert_eq!(
            Config::default()
                .strategy(Strategy::Divide)
                .default_translator(),
            Translator::Divide {
                len: DEFAULT_SEGMENT_LENGTH
            }
        );
        assert!(Config::new(12).strategy(Strategy::Shift).translator().is_err());
    }

    #[test]
    fn build_validates_strategy() {
        let arr = Config::new(16)
            .strategy(Strategy::Shift)
            .build::<u8>()
            .unwrap();
        assert_eq!(arr.segment_length(), 16);

        assert!(matches!(
            Config::new(24).strategy(Strategy::Shift).build::<u8>(),
            Err(crate::Error::InvalidSegmentLength(24))
        ));
        assert_eq!(Config::default().build::<u8>().unwrap().segment_length(), 0);
    }
}
