//! Container construction under the unified container model.
//!
//! Every block accumulates through one builder whether it turns out to
//! be a map or a sequence. Keyed entries insert under their keys with
//! duplicate detection; positional elements insert under implicit
//! integer keys `"0"`, `"1"`, … and are promoted to a sequence when the
//! block completes, so the intermediate representation never reaches
//! the caller.

use indexmap::IndexMap;

use crate::error::{ParseError, Result};
use crate::span::Span;
use crate::value::Value;

/// Block shape, frozen after the first item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Undecided,
    Keyed,
    Positional,
}

/// Accumulates the members of one block.
pub(crate) struct ContainerBuilder {
    shape: Shape,
    entries: IndexMap<String, Value>,
    next_index: usize,
}

impl ContainerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            shape: Shape::Undecided,
            entries: IndexMap::new(),
            next_index: 0,
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        self.shape
    }

    /// Insert a keyed entry, rejecting duplicates at `span`.
    pub(crate) fn insert_keyed(&mut self, key: String, span: Span, value: Value) -> Result<()> {
        debug_assert_ne!(self.shape, Shape::Positional);
        self.shape = Shape::Keyed;
        if self.entries.contains_key(&key) {
            return Err(ParseError::key(format!("duplicate key `{key}`"), span));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Append a positional element under its implicit integer key.
    pub(crate) fn push_positional(&mut self, value: Value) {
        debug_assert_ne!(self.shape, Shape::Keyed);
        self.shape = Shape::Positional;
        self.entries.insert(self.next_index.to_string(), value);
        self.next_index += 1;
    }

    /// Finalize the block. An undecided (empty) block is an empty map;
    /// a positional accumulation is promoted to a sequence.
    pub(crate) fn finish(self) -> Value {
        match self.shape {
            Shape::Undecided | Shape::Keyed => Value::Map(self.entries),
            Shape::Positional => promote(self.entries),
        }
    }
}

/// Promote an integer-keyed accumulation to a sequence. Insertion order
/// is element order; the implicit keys never surface.
fn promote(entries: IndexMap<String, Value>) -> Value {
    Value::Seq(entries.into_iter().map(|(_, value)| value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_block_is_empty_map() {
        let b = ContainerBuilder::new();
        assert_eq!(b.finish(), Value::Map(IndexMap::new()));
    }

    #[test]
    fn test_keyed_preserves_insertion_order() {
        let mut b = ContainerBuilder::new();
        b.insert_keyed("b".into(), Span::default(), Value::Int(1))
            .unwrap();
        b.insert_keyed("a".into(), Span::default(), Value::Int(2))
            .unwrap();
        let map = b.finish();
        let keys: Vec<&String> = map.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_duplicate_key_rejected_at_second_span() {
        let mut b = ContainerBuilder::new();
        b.insert_keyed("a".into(), Span::point(1, 1, 0), Value::Int(1))
            .unwrap();
        let err = b
            .insert_keyed("a".into(), Span::point(1, 8, 7), Value::Int(2))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Key);
        assert_eq!(err.span.col, 8);
    }

    #[test]
    fn test_positional_promotes_to_seq() {
        let mut b = ContainerBuilder::new();
        b.push_positional(Value::Int(10));
        b.push_positional(Value::Int(20));
        assert_eq!(b.finish(), Value::Seq(vec![Value::Int(10), Value::Int(20)]));
    }
}
