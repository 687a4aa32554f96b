//! Unified error types for the bridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError (top-level wrapper)
//! ├── ValueError        - Conversion, arithmetic and container misuse
//! ├── CallError         - Argument validation and call resolution
//! ├── RegistrationError - Descriptor validation and materialization
//! ├── Exception         - Native code throwing into the host
//! ├── HostException     - Host exception observed by native code
//! └── FatalError        - Unrecoverable engine condition
//! ```
//!
//! Native handlers return `Result<_, BridgeError>`, so every phase error
//! converts with `?`. The boundary in [`Request`](crate::Request) turns each
//! variant back into what the host expects: a pending exception object of the
//! right class, or a recorded fatal error.

use thiserror::Error;

use crate::exception::{Exception, FatalError, HostException};
use crate::modifiers::Visibility;
use crate::types::Type;

// ============================================================================
// Value Errors
// ============================================================================

/// Errors raised by [`Value`](crate::Value) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// An explicit conversion that the host does not perform silently.
    #[error("cannot convert {from} to {to}")]
    Conversion { from: Type, to: Type },

    /// Object without a string capability or `__toString` method.
    #[error("Object of class {class} could not be converted to string")]
    NotStringable { class: String },

    /// Integer does not fit the requested native width.
    #[error("integer {value} out of range for {target}")]
    IntegerOverflow { value: i64, target: &'static str },

    /// Arithmetic on operand types the host rejects.
    #[error("Unsupported operand types: {left} {op} {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: Type,
        right: Type,
    },

    /// Division or modulo by zero.
    #[error("{0} by zero")]
    DivisionByZero(&'static str),

    /// Arrays and objects cannot be used as array keys.
    #[error("Illegal offset type {0}")]
    IllegalOffset(Type),

    /// Array syntax on a scalar that cannot be auto-vivified.
    #[error("Cannot use a scalar value of type {0} as an array")]
    ScalarAsArray(Type),

    /// Append when the next integer key would overflow.
    #[error("Cannot add element to the array as the next element is already occupied")]
    NextElementOccupied,

    /// The value is not an object.
    #[error("expected object, got {0}")]
    NotAnObject(Type),

    /// The object has no native backing of the requested type.
    #[error("object of class {class} is not backed by {expected}")]
    NoBacking {
        class: String,
        expected: &'static str,
    },

    /// The native backing is already borrowed by an active call.
    #[error("native object of class {class} is already in use")]
    Busy { class: String },

    /// A property write hit a slot the object's class may not see.
    #[error("Cannot access {visibility} property {class}::${property}")]
    InaccessibleProperty {
        class: String,
        property: String,
        visibility: Visibility,
    },
}

impl ValueError {
    /// Check if this is a division or modulo by zero.
    pub fn is_division_by_zero(&self) -> bool {
        matches!(self, ValueError::DivisionByZero(_))
    }

    /// Host exception class this error surfaces as.
    pub fn host_class(&self) -> &'static str {
        match self {
            ValueError::DivisionByZero(_) => "DivisionByZeroError",
            ValueError::NotStringable { .. } | ValueError::NextElementOccupied => "Error",
            ValueError::ScalarAsArray(_) | ValueError::InaccessibleProperty { .. } => "Error",
            _ => "TypeError",
        }
    }
}

// ============================================================================
// Call Errors
// ============================================================================

/// Errors detected while resolving or validating a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// Fewer arguments than the descriptor requires.
    #[error(
        "Too few arguments to function {function}(), {given} passed and at least {required} expected"
    )]
    ArgumentCount {
        function: String,
        required: usize,
        given: usize,
    },

    /// An argument failed type validation.
    #[error(
        "{function}(): Argument #{position} (${name}) must be of type {expected}, {given} given"
    )]
    ArgumentType {
        function: String,
        position: usize,
        name: String,
        expected: String,
        given: String,
    },

    /// A by-reference parameter received a plain value.
    #[error("{function}(): Argument #{position} (${name}) could not be passed by reference")]
    NotAReference {
        function: String,
        position: usize,
        name: String,
    },

    #[error("Call to undefined function {0}()")]
    UndefinedFunction(String),

    #[error("Call to undefined method {class}::{method}()")]
    UndefinedMethod { class: String, method: String },

    /// Visibility check failed for a method.
    #[error("Call to {visibility} method {class}::{method}() from {}", scope_name(.scope))]
    InaccessibleMethod {
        class: String,
        method: String,
        visibility: Visibility,
        scope: Option<String>,
    },

    /// Visibility check failed for a property.
    #[error("Cannot access {visibility} property {class}::${property}")]
    InaccessibleProperty {
        class: String,
        property: String,
        visibility: Visibility,
    },

    #[error("Non-static method {class}::{method}() cannot be called statically")]
    NonStaticCall { class: String, method: String },

    #[error("{0}")]
    NotCallable(String),

    #[error("Class \"{0}\" not found")]
    ClassNotFound(String),

    #[error("Cannot instantiate {kind} {class}")]
    CannotInstantiate { class: String, kind: &'static str },

    #[error("Trying to clone an uncloneable object of class {0}")]
    NotClonable(String),

    #[error("Undefined constant \"{0}\"")]
    UndefinedConstant(String),

    #[error("Constant {0} already defined")]
    ConstantRedefined(String),
}

fn scope_name(scope: &Option<String>) -> String {
    match scope {
        Some(class) => format!("scope {class}"),
        None => "global scope".to_string(),
    }
}

impl CallError {
    /// Check if this is an argument validation failure.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            CallError::ArgumentCount { .. }
                | CallError::ArgumentType { .. }
                | CallError::NotAReference { .. }
        )
    }

    /// Host exception class this error surfaces as.
    pub fn host_class(&self) -> &'static str {
        match self {
            CallError::ArgumentCount { .. } => "ArgumentCountError",
            CallError::ArgumentType { .. } | CallError::NotAReference { .. } => "TypeError",
            _ => "Error",
        }
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors found while validating descriptors or materializing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A member with this name was already added to the class.
    #[error("duplicate {kind} {class}::{member}")]
    DuplicateMember {
        class: String,
        member: String,
        kind: &'static str,
    },

    /// A class or interface with this name already exists.
    #[error("duplicate class: {0}")]
    DuplicateClass(String),

    #[error("duplicate function: {0}")]
    DuplicateFunction(String),

    #[error("duplicate constant: {0}")]
    DuplicateConstant(String),

    /// Abstract method declared on a class that is not abstract.
    #[error("class {class} contains abstract method {method} and must be declared abstract")]
    AbstractMethodInConcreteClass { class: String, method: String },

    /// Concrete class inherits an abstract method it does not implement.
    #[error("class {class} must implement abstract method {declared_in}::{method}")]
    UnimplementedAbstract {
        class: String,
        method: String,
        declared_in: String,
    },

    /// Modifier combination the host rejects.
    #[error("invalid modifiers on {class}::{member}: {reason}")]
    InvalidModifiers {
        class: String,
        member: String,
        reason: &'static str,
    },

    /// Constants only accept scalar (or null) values.
    #[error("constant {name} must be scalar, got {ty}")]
    InvalidConstant { name: String, ty: Type },

    #[error("class {class} extends unknown class {parent}")]
    ParentNotFound { class: String, parent: String },

    #[error("class {class} implements unknown interface {interface}")]
    InterfaceNotFound { class: String, interface: String },

    #[error("class {class} cannot extend interface {parent}")]
    ExtendsInterface { class: String, parent: String },

    #[error("class {class} cannot extend final class {parent}")]
    ExtendsFinal { class: String, parent: String },

    #[error("{class} cannot implement {name}, it is not an interface")]
    NotAnInterface { class: String, name: String },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// `initialize` was called a second time.
    #[error("extension {0} is already initialized")]
    AlreadyInitialized(String),

    /// A descriptor was modified after materialization.
    #[error("extension {0} is locked, descriptors can no longer change")]
    Locked(String),
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Top-level error type returned by native handlers and user-space calls.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Native code throwing a host exception.
    #[error(transparent)]
    Exception(#[from] Exception),

    /// Host exception raised during a call into user space.
    #[error(transparent)]
    Host(#[from] HostException),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl BridgeError {
    pub fn is_value(&self) -> bool {
        matches!(self, BridgeError::Value(_))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, BridgeError::Call(_))
    }

    pub fn is_registration(&self) -> bool {
        matches!(self, BridgeError::Registration(_))
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, BridgeError::Exception(_))
    }

    pub fn is_host(&self) -> bool {
        matches!(self, BridgeError::Host(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Fatal(_))
    }

    /// Borrow the host exception, if this is one.
    pub fn as_host(&self) -> Option<&HostException> {
        match self {
            BridgeError::Host(host) => Some(host),
            _ => None,
        }
    }
}
