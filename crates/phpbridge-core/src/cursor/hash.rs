use std::rc::Rc;

use crate::array::{ArrayKey, HashTable};
use crate::value::Value;

use super::{Cursor, CursorKind, CursorState};

/// Position over a shared array table.
///
/// The cursor holds its own handle on the table, so writes through other
/// handles detach and never disturb it.
#[derive(Debug, Clone)]
pub struct HashCursor {
    table: Rc<HashTable>,
    position: usize,
    state: CursorState,
}

impl HashCursor {
    pub fn new(table: Rc<HashTable>) -> Self {
        Self {
            table,
            position: 0,
            state: CursorState::Uninitialized,
        }
    }

    pub fn table(&self) -> &Rc<HashTable> {
        &self.table
    }

    pub(crate) fn current(&self) -> Option<(&ArrayKey, &Value)> {
        match self.state {
            CursorState::Positioned => self.table.get_index(self.position),
            _ => None,
        }
    }

    fn terminate(&mut self) -> bool {
        self.state = CursorState::Terminal;
        false
    }

    fn seek(&mut self, position: usize) -> bool {
        self.position = position;
        self.state = CursorState::Positioned;
        true
    }
}

impl Cursor for HashCursor {
    fn kind(&self) -> CursorKind {
        CursorKind::Hash
    }

    fn state(&self) -> CursorState {
        self.state
    }

    fn value(&self) -> Value {
        self.current()
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    fn key(&self) -> Value {
        self.current()
            .map(|(key, _)| key.to_value())
            .unwrap_or_default()
    }

    fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn is_str(&self) -> bool {
        self.current().is_some_and(|(key, _)| key.is_str())
    }

    fn next(&mut self) -> bool {
        match self.state {
            CursorState::Uninitialized => self.reset(),
            CursorState::Terminal => false,
            CursorState::Positioned if self.position + 1 < self.table.len() => {
                self.seek(self.position + 1)
            }
            CursorState::Positioned => self.terminate(),
        }
    }

    /// Stepping back from the terminal position lands on the last element;
    /// stepping back from the first element is terminal.
    fn prev(&mut self) -> bool {
        match self.state {
            CursorState::Positioned if self.position > 0 => self.seek(self.position - 1),
            CursorState::Positioned => self.terminate(),
            _ if self.table.is_empty() => self.terminate(),
            _ => self.seek(self.table.len() - 1),
        }
    }

    fn reset(&mut self) -> bool {
        if self.table.is_empty() {
            self.terminate()
        } else {
            self.seek(0)
        }
    }
}

/// Terminal cursors are all equal. Other cursors need the same table and,
/// when positioned, the same position.
impl PartialEq for HashCursor {
    fn eq(&self, other: &Self) -> bool {
        match (self.state, other.state) {
            (CursorState::Terminal, CursorState::Terminal) => true,
            (CursorState::Positioned, CursorState::Positioned) => {
                Rc::ptr_eq(&self.table, &other.table) && self.position == other.position
            }
            (CursorState::Uninitialized, CursorState::Uninitialized) => {
                Rc::ptr_eq(&self.table, &other.table)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(items: &[&str]) -> HashCursor {
        let table: HashTable = items.iter().enumerate().map(|(i, v)| (i, *v)).collect();
        HashCursor::new(Rc::new(table))
    }

    #[test]
    fn walks_forward() {
        let mut cursor = cursor(&["a", "b"]);
        assert_eq!(cursor.state(), CursorState::Uninitialized);
        assert!(cursor.value().is_null());
        assert!(cursor.reset());
        assert_eq!(cursor.value(), "a");
        assert_eq!(cursor.key(), 0);
        assert!(!cursor.is_str());
        assert!(cursor.next());
        assert_eq!(cursor.value(), "b");
        assert!(!cursor.next());
        assert_eq!(cursor.state(), CursorState::Terminal);
        assert!(!cursor.next());
    }

    #[test]
    fn walks_backward_from_the_end() {
        let mut cursor = cursor(&["a", "b", "c"]);
        while cursor.next() {}
        assert!(cursor.prev());
        assert_eq!(cursor.value(), "c");
        assert!(cursor.prev());
        assert!(cursor.prev());
        assert_eq!(cursor.value(), "a");
        assert!(!cursor.prev());
        assert_eq!(cursor.state(), CursorState::Terminal);
    }

    #[test]
    fn empty_tables() {
        let mut cursor = cursor(&[]);
        assert!(cursor.is_empty());
        assert!(!cursor.reset());
        assert!(!cursor.prev());
        assert_eq!(cursor.state(), CursorState::Terminal);
    }

    #[test]
    fn string_keys() {
        let table: HashTable = [("name", "x")].into_iter().collect();
        let mut cursor = HashCursor::new(Rc::new(table));
        cursor.reset();
        assert!(cursor.is_str());
        assert_eq!(cursor.key(), "name");
    }

    #[test]
    fn equality_needs_the_same_table() {
        let a = cursor(&["a"]);
        let b = cursor(&["a"]);
        assert_ne!(a, b);
        let mut c = a.clone();
        assert_eq!(a, c);
        c.reset();
        assert_ne!(a, c);
    }

    #[test]
    fn terminal_cursors_are_equal() {
        let mut a = cursor(&["a"]);
        let mut b = cursor(&["x", "y"]);
        let empty = {
            let mut empty = cursor(&[]);
            empty.reset();
            empty
        };
        while a.next() {}
        assert_ne!(a, b);
        while b.next() {}
        assert_eq!(a, b);
        assert_eq!(a, empty);
    }
}
