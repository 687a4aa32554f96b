//! Exceptions crossing the native boundary.
//!
//! Three kinds of failure travel between native code and the host:
//!
//! - [`Exception`]: native code throws into the host. At the boundary it
//!   becomes a pending exception object of the named class.
//! - [`HostException`]: a host exception observed by native code after a
//!   call into user space. Dropping it marks the exception handled;
//!   [`HostException::rethrow`] leaves it pending so it bubbles back to the
//!   host when the native handler returns it.
//! - [`FatalError`]: unrecoverable. Recorded on the request at the
//!   boundary; every later call fails fast with the same error.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::modifiers::Visibility;
use crate::object::mangle;
use crate::value::Value;

// ============================================================================
// Native exceptions
// ============================================================================

/// Exception thrown by native code.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct Exception {
    class: String,
    message: String,
    code: i64,
}

impl Exception {
    /// An `Exception` with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            class: "Exception".to_string(),
            message: message.into(),
            code: 0,
        }
    }

    /// Throw as a different `Throwable` class (`"InvalidArgumentException"`,
    /// `"TypeError"`, ...). Unknown classes fall back to `Exception`.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> i64 {
        self.code
    }
}

/// Unrecoverable engine error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FatalError {
    message: String,
}

impl FatalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// ============================================================================
// Host exceptions
// ============================================================================

/// The request's pending-exception slot.
#[derive(Clone, Default)]
pub(crate) struct ExceptionSlot(Rc<RefCell<Option<Value>>>);

impl ExceptionSlot {
    pub(crate) fn get(&self) -> Option<Value> {
        self.0.borrow().clone()
    }

    pub(crate) fn set(&self, exception: Value) {
        *self.0.borrow_mut() = Some(exception);
    }

    pub(crate) fn take(&self) -> Option<Value> {
        self.0.borrow_mut().take()
    }

    /// Clear the slot if it still holds `exception`.
    fn clear_if(&self, exception: &Value) {
        let mut slot = self.0.borrow_mut();
        if slot
            .as_ref()
            .is_some_and(|pending| pending.identical(exception))
        {
            *slot = None;
        }
    }
}

/// Host exception raised by a call into user space.
///
/// The exception stays pending on the request while this value is alive.
/// Dropping it handles the exception; [`rethrow`](Self::rethrow) keeps it
/// pending.
#[derive(Error)]
#[error("{}: {}", self.class_name(), self.message())]
pub struct HostException {
    object: Value,
    slot: ExceptionSlot,
    bubble: bool,
}

impl HostException {
    pub(crate) fn new(object: Value, slot: ExceptionSlot) -> Self {
        Self {
            object,
            slot,
            bubble: false,
        }
    }

    /// The exception object.
    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn class_name(&self) -> String {
        self.object.class_name().unwrap_or_default()
    }

    pub fn message(&self) -> String {
        self.read("message").string_value()
    }

    pub fn code(&self) -> i64 {
        self.read("code").numeric_value()
    }

    /// Whether the exception is an instance of `class`.
    pub fn is(&self, class: &str) -> bool {
        self.object.instance_of(class)
    }

    /// Leave the exception pending so it propagates back to the host.
    pub fn rethrow(mut self) -> Self {
        self.bubble = true;
        self
    }

    pub fn is_bubbling(&self) -> bool {
        self.bubble
    }

    fn read(&self, property: &str) -> Value {
        self.object
            .object_ref()
            .and_then(|object| object.get_raw(&mangle(property, Visibility::Protected, "")))
            .unwrap_or_default()
    }
}

impl Drop for HostException {
    fn drop(&mut self) {
        if !self.bubble {
            self.slot.clear_if(&self.object);
        }
    }
}

impl fmt::Debug for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostException")
            .field("class", &self.class_name())
            .field("message", &self.message())
            .field("bubble", &self.bubble)
            .finish()
    }
}
