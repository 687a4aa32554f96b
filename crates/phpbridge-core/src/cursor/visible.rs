use std::rc::Rc;

use crate::array::ArrayKey;
use crate::entries::ClassEntry;
use crate::object::{Object, is_key_visible, unmangle};
use crate::value::Value;

use super::{Cursor, CursorKind, CursorState, HashCursor};

/// Object properties as seen from a calling scope.
///
/// Walks a snapshot of the property table, skipping private and protected
/// entries the scope may not see, and reports keys without their mangling
/// prefix.
#[derive(Debug, Clone)]
pub struct VisibleCursor {
    inner: HashCursor,
    class: Rc<ClassEntry>,
    scope: Option<Rc<ClassEntry>>,
}

impl VisibleCursor {
    pub fn new(object: &Rc<Object>, scope: Option<Rc<ClassEntry>>) -> Self {
        Self {
            inner: HashCursor::new(object.properties()),
            class: Rc::clone(object.class()),
            scope,
        }
    }

    fn visible(&self, key: &ArrayKey) -> bool {
        match key {
            ArrayKey::Int(_) => true,
            ArrayKey::Str(key) => is_key_visible(&self.class, key, self.scope.as_deref()),
        }
    }

    fn current_visible(&self) -> bool {
        self.inner
            .current()
            .is_some_and(|(key, _)| self.visible(key))
    }

    /// Keep stepping with `step` until a visible entry or the end.
    fn settle(&mut self, mut positioned: bool, step: fn(&mut HashCursor) -> bool) -> bool {
        while positioned && !self.current_visible() {
            positioned = step(&mut self.inner);
        }
        positioned
    }
}

impl Cursor for VisibleCursor {
    fn kind(&self) -> CursorKind {
        CursorKind::Visible
    }

    fn state(&self) -> CursorState {
        self.inner.state()
    }

    fn value(&self) -> Value {
        self.inner.value()
    }

    /// Property name without the visibility prefix.
    fn key(&self) -> Value {
        let key = self.inner.key();
        if !key.is_string() {
            return key;
        }
        let raw = key.string_value();
        Value::from(unmangle(&raw).1)
    }

    fn is_empty(&self) -> bool {
        !self.inner.table().keys().any(|key| self.visible(key))
    }

    fn is_str(&self) -> bool {
        self.inner.is_str()
    }

    fn next(&mut self) -> bool {
        let positioned = self.inner.next();
        self.settle(positioned, <HashCursor as Cursor>::next)
    }

    fn prev(&mut self) -> bool {
        let positioned = self.inner.prev();
        self.settle(positioned, <HashCursor as Cursor>::prev)
    }

    fn reset(&mut self) -> bool {
        let positioned = self.inner.reset();
        self.settle(positioned, <HashCursor as Cursor>::next)
    }
}

impl PartialEq for VisibleCursor {
    fn eq(&self, other: &Self) -> bool {
        if self.state() == CursorState::Terminal && other.state() == CursorState::Terminal {
            return true;
        }
        self.inner == other.inner
            && match (&self.scope, &other.scope) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}
