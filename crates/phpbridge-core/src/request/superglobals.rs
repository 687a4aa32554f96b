//! Request-scoped superglobals.

use std::cell::RefCell;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::value::Value;

/// One of the host's request arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Superglobal {
    Get,
    Post,
    Cookie,
    Server,
    Env,
    Files,
    /// GET and POST merged, POST winning on conflicts.
    Request,
}

impl Superglobal {
    pub const ALL: [Superglobal; 7] = [
        Superglobal::Get,
        Superglobal::Post,
        Superglobal::Cookie,
        Superglobal::Server,
        Superglobal::Env,
        Superglobal::Files,
        Superglobal::Request,
    ];

    /// Variable name as seen from user space.
    pub fn name(self) -> &'static str {
        match self {
            Superglobal::Get => "_GET",
            Superglobal::Post => "_POST",
            Superglobal::Cookie => "_COOKIE",
            Superglobal::Server => "_SERVER",
            Superglobal::Env => "_ENV",
            Superglobal::Files => "_FILES",
            Superglobal::Request => "_REQUEST",
        }
    }
}

impl fmt::Display for Superglobal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// The arrays of one request. They start empty and live as long as the
/// request does.
#[derive(Default)]
pub(crate) struct Superglobals {
    tables: RefCell<FxHashMap<Superglobal, Value>>,
    globals: RefCell<Value>,
}

impl Superglobals {
    pub(crate) fn get(&self, which: Superglobal) -> Value {
        if which == Superglobal::Request {
            return self
                .tables
                .borrow()
                .get(&which)
                .cloned()
                .unwrap_or_else(|| self.merged());
        }
        self.tables
            .borrow()
            .get(&which)
            .cloned()
            .unwrap_or_else(Value::array)
    }

    /// Replace a whole array. Replacing GET or POST drops an explicitly set
    /// `$_REQUEST` so it is merged again.
    pub(crate) fn set(&self, which: Superglobal, value: Value) {
        let mut tables = self.tables.borrow_mut();
        if matches!(which, Superglobal::Get | Superglobal::Post) {
            tables.remove(&Superglobal::Request);
        }
        tables.insert(which, value);
    }

    fn merged(&self) -> Value {
        let mut merged = self.get(Superglobal::Get);
        for (key, value) in self.get(Superglobal::Post).entries() {
            if let Err(err) = merged.set(key, value) {
                tracing::debug!("skipping request variable: {err}");
            }
        }
        merged
    }

    pub(crate) fn global(&self, name: &str) -> Value {
        self.globals.borrow().get(name)
    }

    pub(crate) fn set_global(&self, name: &str, value: Value) {
        let mut globals = self.globals.borrow_mut();
        if let Err(err) = globals.set(name, value) {
            tracing::debug!("cannot set global {name}: {err}");
        }
    }

    pub(crate) fn globals(&self) -> Value {
        let globals = self.globals.borrow().clone();
        if globals.is_null() {
            Value::array()
        } else {
            globals
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> Value {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn arrays_start_empty() {
        let superglobals = Superglobals::default();
        for which in Superglobal::ALL {
            let value = superglobals.get(which);
            assert!(value.is_array(), "{which}");
            assert_eq!(value.size(), 0);
        }
    }

    #[test]
    fn request_merges_get_and_post() {
        let superglobals = Superglobals::default();
        superglobals.set(Superglobal::Get, table(&[("a", "get"), ("b", "get")]));
        superglobals.set(Superglobal::Post, table(&[("b", "post")]));
        let merged = superglobals.get(Superglobal::Request);
        assert_eq!(merged.get("a"), "get");
        assert_eq!(merged.get("b"), "post");
    }

    #[test]
    fn copies_are_detached() {
        let superglobals = Superglobals::default();
        superglobals.set(Superglobal::Server, table(&[("REQUEST_METHOD", "GET")]));
        let mut copy = superglobals.get(Superglobal::Server);
        copy.set("REQUEST_METHOD", "POST").unwrap();
        assert_eq!(
            superglobals.get(Superglobal::Server).get("REQUEST_METHOD"),
            "GET"
        );
    }

    #[test]
    fn globals() {
        let superglobals = Superglobals::default();
        superglobals.set_global("counter", Value::from(3));
        assert_eq!(superglobals.global("counter"), 3);
        assert!(superglobals.global("missing").is_null());
        assert_eq!(superglobals.globals().size(), 1);
        assert_eq!(Superglobal::Files.to_string(), "$_FILES");
    }
}
