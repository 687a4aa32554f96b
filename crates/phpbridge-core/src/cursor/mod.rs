//! Cursors over arrays and objects.
//!
//! Three cursor kinds walk host containers without exposing how they are
//! stored:
//!
//! - [`HashCursor`] - position over an array snapshot; can step both ways
//! - [`VisibleCursor`] - object properties seen from a calling scope, with
//!   mangled keys skipped or unmangled
//! - [`TraverseCursor`] - drives an object's iterator protocol; forward only
//!
//! [`ValueIterator`] wraps whichever kind applies and implements
//! [`Iterator`], so `for (key, value) in value.iter()` works for arrays and
//! objects alike.
//!
//! # States
//!
//! A cursor starts `Uninitialized`. [`Cursor::reset`] moves it to the first
//! element (`Positioned`) or, for an empty container, `Terminal`. Stepping
//! past either end is `Terminal`.

mod hash;
mod traverse;
mod visible;

pub use hash::HashCursor;
pub use traverse::TraverseCursor;
pub use visible::VisibleCursor;

use std::fmt;
use std::rc::Rc;

use crate::array::HashTable;
use crate::entries::ClassEntry;
use crate::error::BridgeError;
use crate::object::Object;
use crate::value::Value;

/// Which cursor implementation is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    Hash,
    Visible,
    Traverse,
}

/// Where a cursor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorState {
    #[default]
    Uninitialized,
    Positioned,
    Terminal,
}

/// Common cursor protocol.
///
/// `value` and `key` return null unless the cursor is positioned. The
/// stepping methods return whether the cursor is positioned afterwards.
pub trait Cursor {
    fn kind(&self) -> CursorKind;
    fn state(&self) -> CursorState;
    fn value(&self) -> Value;
    fn key(&self) -> Value;
    /// Whether the container has no elements this cursor would visit.
    fn is_empty(&self) -> bool;
    /// Whether the current key is a string.
    fn is_str(&self) -> bool;
    fn next(&mut self) -> bool;
    fn prev(&mut self) -> bool;
    fn reset(&mut self) -> bool;
}

// ============================================================================
// ValueIterator
// ============================================================================

/// `(key, value)` iterator over any container.
///
/// Cursors of different kinds never compare equal. Terminal cursors of the
/// same kind always do.
pub enum ValueIterator {
    Hash(HashCursor),
    Visible(VisibleCursor),
    Traverse(TraverseCursor),
    Empty,
}

impl ValueIterator {
    pub fn hash(table: Rc<HashTable>) -> Self {
        ValueIterator::Hash(HashCursor::new(table))
    }

    /// Properties of `object` visible from `scope` (`None` is global scope).
    pub fn visible(object: &Rc<Object>, scope: Option<Rc<ClassEntry>>) -> Self {
        ValueIterator::Visible(VisibleCursor::new(object, scope))
    }

    pub fn traverse(cursor: TraverseCursor) -> Self {
        ValueIterator::Traverse(cursor)
    }

    pub fn empty() -> Self {
        ValueIterator::Empty
    }

    pub fn kind(&self) -> Option<CursorKind> {
        self.cursor().map(Cursor::kind)
    }

    pub fn cursor(&self) -> Option<&dyn Cursor> {
        match self {
            ValueIterator::Hash(cursor) => Some(cursor),
            ValueIterator::Visible(cursor) => Some(cursor),
            ValueIterator::Traverse(cursor) => Some(cursor),
            ValueIterator::Empty => None,
        }
    }

    pub fn cursor_mut(&mut self) -> Option<&mut dyn Cursor> {
        match self {
            ValueIterator::Hash(cursor) => Some(cursor),
            ValueIterator::Visible(cursor) => Some(cursor),
            ValueIterator::Traverse(cursor) => Some(cursor),
            ValueIterator::Empty => None,
        }
    }

    /// Error raised by the iterator protocol, if traversal stopped on one.
    pub fn take_error(&mut self) -> Option<BridgeError> {
        match self {
            ValueIterator::Traverse(cursor) => cursor.take_error(),
            _ => None,
        }
    }
}

impl Iterator for ValueIterator {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<(Value, Value)> {
        let cursor = self.cursor_mut()?;
        let positioned = match cursor.state() {
            CursorState::Uninitialized => cursor.reset(),
            CursorState::Positioned => cursor.next(),
            CursorState::Terminal => false,
        };
        positioned.then(|| (cursor.key(), cursor.value()))
    }
}

impl PartialEq for ValueIterator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueIterator::Hash(a), ValueIterator::Hash(b)) => a == b,
            (ValueIterator::Visible(a), ValueIterator::Visible(b)) => a == b,
            (ValueIterator::Traverse(a), ValueIterator::Traverse(b)) => a == b,
            (ValueIterator::Empty, ValueIterator::Empty) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ValueIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cursor() {
            Some(cursor) => f
                .debug_struct("ValueIterator")
                .field("kind", &cursor.kind())
                .field("state", &cursor.state())
                .finish(),
            None => f.write_str("ValueIterator(Empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[i64]) -> Value {
        Value::from(items.to_vec())
    }

    #[test]
    fn arrays_iterate_in_insertion_order() {
        let mut value = Value::array();
        value.set("b", 2).unwrap();
        value.set("a", 1).unwrap();
        value.push(3).unwrap();
        let pairs: Vec<(Value, Value)> = value.iter().collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], (Value::from("b"), Value::from(2)));
        assert_eq!(pairs[2], (Value::from(0), Value::from(3)));
    }

    #[test]
    fn scalars_iterate_as_empty() {
        let mut iter = Value::from(5).iter();
        assert_eq!(iter.kind(), None);
        assert!(iter.next().is_none());
        assert_eq!(iter, ValueIterator::empty());
    }

    #[test]
    fn cursors_of_different_kinds_differ() {
        let array = list(&[1]);
        let object = Value::object();
        assert_eq!(array.iter().kind(), Some(CursorKind::Hash));
        assert_eq!(object.iter().kind(), Some(CursorKind::Visible));
        assert_ne!(array.iter(), object.iter());
    }

    #[test]
    fn same_table_same_position_is_equal() {
        let array = list(&[1, 2]);
        let mut a = array.iter();
        let mut b = array.iter();
        assert_eq!(a, b);
        a.next();
        assert_ne!(a, b);
        b.next();
        assert_eq!(a, b);
    }

    #[test]
    fn finished_iterators_over_different_arrays_are_equal() {
        let mut a = list(&[1]).iter();
        let mut b = list(&[2]).iter();
        assert_ne!(a, b);
        while a.next().is_some() {}
        while b.next().is_some() {}
        assert_eq!(a, b);
        assert_ne!(a, ValueIterator::empty());
    }

    #[test]
    fn snapshot_survives_mutation() {
        let mut array = list(&[1, 2]);
        let iter = array.iter();
        array.push(3).unwrap();
        assert_eq!(iter.count(), 2);
    }
}
