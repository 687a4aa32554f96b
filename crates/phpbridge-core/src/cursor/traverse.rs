use std::fmt;
use std::rc::Rc;

use crate::capabilities::ObjectIterator;
use crate::error::BridgeError;
use crate::exception::Exception;
use crate::object::Object;
use crate::request::Request;
use crate::value::Value;

use super::{Cursor, CursorKind, CursorState};

/// Nesting limit for `getIterator()` returning another aggregate.
const MAX_AGGREGATE_DEPTH: usize = 32;

enum Driver {
    /// Iterator produced by the class's traverse capability.
    Native(Box<dyn ObjectIterator>),
    /// `valid`/`current`/`key`/`next`/`rewind` methods called through the
    /// request.
    Protocol { request: Request, object: Value },
    Failed,
}

/// Forward-only cursor over a traversable object.
///
/// Errors raised by the iterator methods stop the traversal; they are kept
/// on the cursor for [`take_error`](Self::take_error). A host exception
/// that was never taken stays pending when the cursor is dropped.
pub struct TraverseCursor {
    driver: Driver,
    state: CursorState,
    current: Option<(Value, Value)>,
    yielded: bool,
    error: Option<BridgeError>,
}

impl TraverseCursor {
    /// Cursor over `object`, resolving `IteratorAggregate::getIterator`
    /// chains up front.
    pub fn new(request: Request, object: Rc<Object>) -> Self {
        let mut cursor = Self {
            driver: Driver::Failed,
            state: CursorState::Uninitialized,
            current: None,
            yielded: false,
            error: None,
        };
        match Self::driver(request, object) {
            Ok(driver) => cursor.driver = driver,
            Err(err) => cursor.error = Some(err),
        }
        cursor
    }

    fn driver(request: Request, mut object: Rc<Object>) -> Result<Driver, BridgeError> {
        for _ in 0..MAX_AGGREGATE_DEPTH {
            let class = Rc::clone(object.class());
            if let Some(factory) = &class.capabilities.traverse {
                return object
                    .with_native_any(|native| factory(native))
                    .flatten()
                    .map(Driver::Native)
                    .ok_or_else(|| {
                        let name = &class.name;
                        let message = format!("Object of class {name} is not ready for iteration");
                        Exception::new(message).with_class("Error").into()
                    });
            }
            if class.is_subclass_of("Iterator") {
                return Ok(Driver::Protocol {
                    request,
                    object: Value::from_object(object),
                });
            }
            if !class.is_subclass_of("IteratorAggregate") {
                break;
            }
            let this = Value::from_object(Rc::clone(&object));
            let inner = request.call_method(&this, "getIterator", Vec::new())?;
            object = match inner.object_ref() {
                Some(inner) if inner.class().is_subclass_of("Traversable") => inner,
                _ => {
                    return Err(Exception::new(format!(
                        "{}::getIterator(): Return value must be of type Traversable, {} returned",
                        class.name,
                        inner.type_name()
                    ))
                    .with_class("TypeError")
                    .into());
                }
            };
        }
        Err(Exception::new(format!("Object of class {} is not traversable", object.class_name()))
            .with_class("Error")
            .into())
    }

    /// The error that stopped traversal, if any.
    pub fn take_error(&mut self) -> Option<BridgeError> {
        self.error.take()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    fn fail(&mut self, err: BridgeError) -> bool {
        tracing::debug!("traversal stopped: {err}");
        self.error = Some(err);
        self.driver = Driver::Failed;
        self.terminate()
    }

    fn terminate(&mut self) -> bool {
        self.current = None;
        self.state = CursorState::Terminal;
        false
    }

    /// Read the element under the iterator, or terminate.
    fn load(&mut self) -> bool {
        let loaded = match &self.driver {
            Driver::Native(iterator) => Ok(iterator
                .valid()
                .then(|| (iterator.key(), iterator.current()))),
            Driver::Protocol { request, object } => Self::load_protocol(request, object),
            Driver::Failed => Ok(None),
        };
        match loaded {
            Ok(Some(pair)) => {
                self.current = Some(pair);
                self.state = CursorState::Positioned;
                self.yielded = true;
                true
            }
            Ok(None) => self.terminate(),
            Err(err) => self.fail(err),
        }
    }

    fn load_protocol(
        request: &Request,
        object: &Value,
    ) -> Result<Option<(Value, Value)>, BridgeError> {
        let valid = request.call_method(object, "valid", Vec::new())?;
        if !valid.bool_value() {
            return Ok(None);
        }
        let value = request.call_method(object, "current", Vec::new())?;
        let key = request.call_method(object, "key", Vec::new())?;
        Ok(Some((key, value)))
    }

    fn step(&mut self, method: &str) -> bool {
        let stepped = match &mut self.driver {
            Driver::Native(iterator) => {
                match method {
                    "rewind" => iterator.rewind(),
                    _ => iterator.next(),
                }
                Ok(())
            }
            Driver::Protocol { request, object } => {
                request.call_method(object, method, Vec::new()).map(drop)
            }
            Driver::Failed => Ok(()),
        };
        match stepped {
            Ok(()) => self.load(),
            Err(err) => self.fail(err),
        }
    }
}

impl Cursor for TraverseCursor {
    fn kind(&self) -> CursorKind {
        CursorKind::Traverse
    }

    fn state(&self) -> CursorState {
        self.state
    }

    fn value(&self) -> Value {
        self.current
            .as_ref()
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    fn key(&self) -> Value {
        self.current
            .as_ref()
            .map(|(key, _)| key.clone())
            .unwrap_or_default()
    }

    /// Only known once traversal has ended: true when it ended without
    /// producing an element.
    fn is_empty(&self) -> bool {
        self.state == CursorState::Terminal && !self.yielded
    }

    fn is_str(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|(key, _)| key.is_string())
    }

    fn next(&mut self) -> bool {
        match self.state {
            CursorState::Uninitialized => self.reset(),
            CursorState::Positioned => self.step("next"),
            CursorState::Terminal => false,
        }
    }

    /// Iterators cannot step backwards.
    fn prev(&mut self) -> bool {
        self.terminate()
    }

    fn reset(&mut self) -> bool {
        self.yielded = false;
        self.step("rewind")
    }
}

/// Traverse cursors only compare equal once both have finished.
impl PartialEq for TraverseCursor {
    fn eq(&self, other: &Self) -> bool {
        self.state == CursorState::Terminal && other.state == CursorState::Terminal
    }
}

impl Drop for TraverseCursor {
    fn drop(&mut self) {
        if let Some(BridgeError::Host(host)) = self.error.take() {
            drop(host.rethrow());
        }
    }
}

impl fmt::Debug for TraverseCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = match &self.driver {
            Driver::Native(_) => "native",
            Driver::Protocol { .. } => "protocol",
            Driver::Failed => "failed",
        };
        f.debug_struct("TraverseCursor")
            .field("driver", &driver)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}
