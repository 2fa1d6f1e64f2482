//! JSON encoding and decoding.
//!
//! A segmented slice is encoded as a plain JSON array of its elements in
//! order, with no envelope. Any serde format works through the
//! [`Serialize`] and [`Deserialize`] impls; the inherent methods here add the
//! JSON-specific checks and element hints.

use std::{fmt, rc::Rc};

use serde::{
    de::{DeserializeOwned, SeqAccess, Visitor},
    ser::SerializeSeq,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{
    config::Config,
    error::{Error, Result},
    slice::SegmentedSlice,
};

type DecodeFn<T> = Rc<dyn Fn(serde_json::Value) -> serde_json::Result<T>>;

/// Tells a slice how to decode each element of a JSON array.
///
/// Without a hint, elements are decoded by `T`'s own [`Deserialize`] impl.
/// A hint is mostly useful for `SegmentedSlice<Value>`, where it picks a
/// representation that the untyped decoder wouldn't:
///
/// ```rust
/// # use segslice::{Hint, SegmentedSlice, Value};
/// let mut arr = SegmentedSlice::<Value>::new(0).with_hint(Hint::declared::<i64>());
/// arr.decode_json("[1, 2, 3]").unwrap();
/// assert_eq!(arr.to_vec(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
/// ```
pub struct Hint<T> {
    name: &'static str,
    decode: DecodeFn<T>,
}

impl<T> Clone for Hint<T> {
    fn clone(&self) -> Self {
        Hint {
            name: self.name,
            decode: Rc::clone(&self.decode),
        }
    }
}

impl<T> fmt::Debug for Hint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hint").field(&self.name).finish()
    }
}

impl<T> Hint<T> {
    /// A hint with a custom decoding function.
    pub fn new(
        name: &'static str,
        decode: impl Fn(serde_json::Value) -> serde_json::Result<T> + 'static,
    ) -> Self {
        Hint {
            name,
            decode: Rc::new(decode),
        }
    }

    /// Decodes each element as a `U`, then converts it.
    pub fn declared<U>() -> Self
    where
        U: DeserializeOwned + Into<T>,
    {
        Hint::new(std::any::type_name::<U>(), |value| {
            serde_json::from_value::<U>(value).map(Into::into)
        })
    }

    /// The name of the declared representation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn decode(&self, value: serde_json::Value) -> serde_json::Result<T> {
        (self.decode)(value)
    }
}

impl<T> SegmentedSlice<T> {
    /// Sets the hint used by [`decode_json`](Self::decode_json).
    pub fn with_hint(mut self, hint: Hint<T>) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn set_hint(&mut self, hint: Option<Hint<T>>) {
        self.hint = hint;
    }

    pub fn hint(&self) -> Option<&Hint<T>> {
        self.hint.as_ref()
    }
}

impl<T: Serialize> SegmentedSlice<T> {
    /// Encodes this slice as a JSON array.
    ///
    /// ```rust
    /// # use segslice::SegmentedSlice;
    /// assert_eq!(SegmentedSlice::<u8>::new(4).to_json().unwrap(), "[]");
    /// let arr: SegmentedSlice<_> = [1, 2, 3].into_iter().collect();
    /// assert_eq!(arr.to_json().unwrap(), "[1,2,3]");
    /// ```
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Encode)
    }
}

impl<T: DeserializeOwned + Clone + Default> SegmentedSlice<T> {
    /// Decodes a JSON array and appends its elements to this slice.
    ///
    /// Each element is decoded with the slice's [`Hint`] if it has one, and
    /// with `T`'s [`Deserialize`] impl otherwise. Once done, the segment
    /// length is set to the default if it was still undecided.
    ///
    /// If this fails, some of the elements may already have been appended.
    /// The slice should be discarded rather than inspected.
    pub fn decode_json(&mut self, input: &str) -> Result<()> {
        let trimmed = input.trim();
        if !trimmed.starts_with('[') || !trimmed.ends_with(']') {
            return Err(Error::MalformedInput(
                "expected a JSON array delimited by `[` and `]`".to_owned(),
            ));
        }
        let elts: Vec<serde_json::Value> =
            serde_json::from_str(trimmed).map_err(|e| Error::MalformedInput(e.to_string()))?;
        log::debug!(
            "decoding {} element(s){}",
            elts.len(),
            self.hint
                .as_ref()
                .map(|h| format!(" as {}", h.name()))
                .unwrap_or_default()
        );

        let hint = self.hint.clone();
        let decoded = elts.into_iter().enumerate().map(|(index, value)| {
            let elt = match &hint {
                Some(hint) => hint.decode(value),
                None => serde_json::from_value(value),
            };
            elt.map_err(|source| Error::Decode { index, source })
        });
        for elt in decoded {
            self.push(elt?);
        }

        // Mirrors the lazy initialization in `grow`.
        if self.translator.is_none() {
            self.grow(0);
        }
        Ok(())
    }

    /// Decodes a JSON array into a new slice with the default configuration.
    ///
    /// ```rust
    /// # use segslice::{SegmentedSlice, Value};
    /// let arr = SegmentedSlice::<Value>::from_json("[1, 2, 3]").unwrap();
    /// assert_eq!(arr.get(0).unwrap(), Value::Float(1.0));
    /// let arr = SegmentedSlice::<u32>::from_json("[1, 2, 3]").unwrap();
    /// assert_eq!(arr.get(0).unwrap(), 1);
    /// ```
    pub fn from_json(input: &str) -> Result<Self> {
        Self::from_json_with(Config::default(), None, input)
    }

    pub fn from_json_with(config: Config, hint: Option<Hint<T>>, input: &str) -> Result<Self> {
        let mut ret = Self::with_config(config)?;
        ret.hint = hint;
        ret.decode_json(input)?;
        Ok(ret)
    }
}

impl<T: Serialize> Serialize for SegmentedSlice<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        let mut ret = Ok(());
        self.for_each(|_, elt| {
            ret = seq.serialize_element(elt);
            ret.is_err()
        });
        ret?;
        seq.end()
    }
}

/// Upper bound, in bytes, on what a deserializer's length hint may reserve up
/// front. Longer inputs still decode; they just grow as they go.
const MAX_PREALLOC_BYTES: usize = 1024 * 1024;

fn cautious_len<T>(hint: Option<usize>) -> usize {
    let max = MAX_PREALLOC_BYTES / std::mem::size_of::<T>().max(1);
    hint.unwrap_or(0).min(max)
}

struct SliceVisitor<T> {
    config: Config,
    marker: std::marker::PhantomData<T>,
}

impl<'de, T> Visitor<'de> for SliceVisitor<T>
where
    T: Deserialize<'de> + Clone + Default,
{
    type Value = SegmentedSlice<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut ret = SegmentedSlice::with_config(self.config).map_err(serde::de::Error::custom)?;
        ret.grow(cautious_len::<T>(seq.size_hint()));
        while let Some(elt) = seq.next_element()? {
            ret.push(elt);
        }
        ret.grow(0);
        Ok(ret)
    }
}

impl<'de, T> Deserialize<'de> for SegmentedSlice<T>
where
    T: Deserialize<'de> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SliceVisitor {
            config: Config::default(),
            marker: std::marker::PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn empty() {
        let arr = SegmentedSlice::<Value>::new(0);
        assert_eq!(arr.to_json().unwrap(), "[]");

        let arr = SegmentedSlice::<Value>::from_json("[]").unwrap();
        assert_eq!(arr.len(), 0);
        assert_eq!(arr.segment_length(), crate::DEFAULT_SEGMENT_LENGTH);

        let arr = SegmentedSlice::<Value>::from_json("  [ ]\n").unwrap();
        assert!(arr.is_empty());
    }

    #[test]
    fn untyped_numbers_are_floats() {
        let arr = SegmentedSlice::<Value>::from_json("[1,2,3]").unwrap();
        assert_eq!(
            arr.to_vec(),
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );
    }

    #[test]
    fn integer_hint() {
        let arr = SegmentedSlice::<Value>::from_json_with(
            Config::default(),
            Some(Hint::declared::<i64>()),
            "[1,2,3]",
        )
        .unwrap();
        assert_eq!(arr.to_vec(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(arr.to_json().unwrap(), "[1,2,3]");
    }

    #[test]
    fn hint_failure_names_the_element() {
        let mut arr = SegmentedSlice::<Value>::new(4).with_hint(Hint::declared::<i64>());
        match arr.decode_json("[1, 2, \"three\", 4]") {
            Err(Error::Decode { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected a decode error, got {other:?}"),
        }

        let err = SegmentedSlice::<u8>::from_json("[1, 300]").unwrap_err();
        assert!(matches!(err, Error::Decode { index: 1, .. }));
    }

    #[test]
    fn custom_hint() {
        let hint = Hint::new("doubled", |v| u32::deserialize(v).map(|x| x * 2));
        assert_eq!(hint.name(), "doubled");
        let mut arr = SegmentedSlice::new(2).with_hint(hint);
        arr.decode_json("[1, 2, 3]").unwrap();
        assert_eq!(arr.to_vec(), vec![2, 4, 6]);
    }

    #[test]
    fn malformed() {
        for input in ["", "{}", "1", "[1, 2", "1, 2]", "[1,,2]", "[1] [2]"] {
            let res = SegmentedSlice::<Value>::from_json(input);
            assert!(
                matches!(res, Err(Error::MalformedInput(_))),
                "{input:?} gave {res:?}"
            );
        }
    }

    #[test]
    fn decode_appends() {
        let mut arr: SegmentedSlice<u32> = SegmentedSlice::new(3);
        arr.append([7, 8]);
        arr.decode_json("[9, 10]").unwrap();
        assert_eq!(arr.to_vec(), vec![7, 8, 9, 10]);
    }

    #[test]
    fn serde_round_trip() {
        let arr: SegmentedSlice<String> = ["a", "b", "c"].into_iter().map(String::from).collect();
        let text = serde_json::to_string(&arr).unwrap();
        assert_eq!(text, r#"["a","b","c"]"#);
        let back: SegmentedSlice<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(arr, back);

        let view = arr.slice(1, 3).unwrap();
        assert_eq!(view.to_json().unwrap(), r#"["b","c"]"#);
    }

    #[test]
    fn mixed_values() {
        let input = r#"[null, true, "s", [1.5], {"k": 2}]"#;
        let arr = SegmentedSlice::<Value>::from_json(input).unwrap();
        assert_eq!(arr.len(), 5);
        assert_eq!(arr.get(0).unwrap(), Value::Null);
        assert_eq!(arr.get(1).unwrap(), Value::Bool(true));
        assert_eq!(arr.to_json().unwrap(), r#"[null,true,"s",[1.5],{"k":2.0}]"#);
        assert_eq!(arr.to_string(), "[null, true, s, [1.5], {k: 2}]");
    }

    /// Reports a huge exact length but yields only a few elements.
    struct LyingLength(std::ops::Range<u32>);

    impl Iterator for LyingLength {
        type Item = u32;

        fn next(&mut self) -> Option<u32> {
            self.0.next()
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            (1 << 40, Some(1 << 40))
        }
    }

    #[test]
    fn length_hint_is_capped() {
        use serde::de::value::{Error as ValueError, SeqDeserializer};

        let de = SeqDeserializer::<_, ValueError>::new(LyingLength(0..3));
        let arr = SegmentedSlice::<u32>::deserialize(de).unwrap();
        assert_eq!(arr.to_vec(), vec![0, 1, 2]);
        assert!(arr.capacity() <= MAX_PREALLOC_BYTES / std::mem::size_of::<u32>());

        assert_eq!(cautious_len::<u64>(None), 0);
        assert_eq!(cautious_len::<u64>(Some(10)), 10);
        assert_eq!(cautious_len::<()>(Some(usize::MAX)), MAX_PREALLOC_BYTES);
    }
}
