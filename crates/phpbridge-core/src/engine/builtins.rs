//! Built-in classes and interfaces every engine starts with.

use std::rc::Rc;

use crate::argument::Argument;
use crate::entries::{ClassDefinition, ClassEntry, ConstantEntry, FunctionEntry, PropertyEntry};
use crate::error::BridgeError;
use crate::modifiers::{MemberFlags, Visibility};
use crate::native_fn::{NativeFn, Parameters};
use crate::object::{Object, mangle};
use crate::types::Type;
use crate::value::Value;

use super::Engine;

thread_local! {
    static STD_CLASS: Rc<ClassEntry> = Rc::new(ClassEntry::bare("stdClass"));
}

/// The shared `stdClass` entry.
pub(crate) fn std_class() -> Rc<ClassEntry> {
    STD_CLASS.with(Rc::clone)
}

/// Interfaces with their parents and abstract methods, in declaration order.
const INTERFACES: &[(&str, &[&str], &[&str])] = &[
    ("Traversable", &[], &[]),
    ("Iterator", &["Traversable"], &["current", "key", "next", "rewind", "valid"]),
    ("IteratorAggregate", &["Traversable"], &["getIterator"]),
    ("ArrayAccess", &[], &["offsetExists", "offsetGet", "offsetSet", "offsetUnset"]),
    ("Countable", &[], &["count"]),
    ("Stringable", &[], &["__toString"]),
    ("Throwable", &["Stringable"], &["getMessage", "getCode", "getPrevious"]),
];

/// Throwable classes below the two roots.
const THROWABLES: &[(&str, &str)] = &[
    ("TypeError", "Error"),
    ("ArgumentCountError", "TypeError"),
    ("ValueError", "Error"),
    ("ArithmeticError", "Error"),
    ("DivisionByZeroError", "ArithmeticError"),
    ("ErrorException", "Exception"),
    ("LogicException", "Exception"),
    ("InvalidArgumentException", "LogicException"),
    ("DomainException", "LogicException"),
    ("RuntimeException", "Exception"),
    ("OutOfBoundsException", "RuntimeException"),
    ("UnexpectedValueException", "RuntimeException"),
];

pub(super) fn declare(engine: &Engine) {
    engine.insert_class(std_class());

    let constants = [
        ConstantEntry::new("PHP_INT_MAX", i64::MAX),
        ConstantEntry::new("PHP_INT_MIN", i64::MIN),
        ConstantEntry::new("PHP_INT_SIZE", 8),
        ConstantEntry::new("PHP_FLOAT_EPSILON", f64::EPSILON),
        ConstantEntry::new("PHP_FLOAT_MAX", f64::MAX),
        ConstantEntry::new("PHP_EOL", "\n"),
    ];
    for constant in constants {
        let name = constant.name.clone();
        if let Err(err) = engine.declare_constant(constant) {
            tracing::error!(constant = %name, "failed to declare built-in constant: {err}");
        }
    }

    let interfaces = INTERFACES.iter().map(|(name, parents, methods)| {
        let mut definition = ClassDefinition::interface(*name);
        for parent in *parents {
            definition = definition.implements(*parent);
        }
        for method in *methods {
            definition = definition.with_method(FunctionEntry::abstract_method(*method));
        }
        definition
    });
    let roots = ["Exception", "Error"].into_iter().map(throwable_root);
    let throwables = THROWABLES
        .iter()
        .map(|(name, parent)| ClassDefinition::new(*name).extends(*parent));

    for definition in interfaces.chain(roots).chain(throwables) {
        let name = definition.name.clone();
        if let Err(err) = engine.declare_class(definition) {
            tracing::error!(class = %name, "failed to declare built-in class: {err}");
        }
    }
}

// ============================================================================
// Exception and Error
// ============================================================================

fn throwable_root(name: &'static str) -> ClassDefinition {
    let getter = |method: &str, handler: NativeFn| {
        FunctionEntry::new(method, handler).with_flags(MemberFlags::PUBLIC | MemberFlags::FINAL)
    };
    ClassDefinition::new(name)
        .implements("Throwable")
        .with_property(PropertyEntry::new("message", "", MemberFlags::PROTECTED))
        .with_property(PropertyEntry::new("code", 0, MemberFlags::PROTECTED))
        .with_property(PropertyEntry::new("previous", Value::null(), MemberFlags::PRIVATE))
        .with_method(
            FunctionEntry::new("__construct", NativeFn::new(construct)).with_arguments([
                Argument::by_val("message").of_type(Type::String).optional(),
                Argument::by_val("code").of_type(Type::Numeric).optional(),
                Argument::by_val("previous")
                    .of_class("Throwable")
                    .nullable()
                    .optional(),
            ]),
        )
        .with_method(getter("getMessage", NativeFn::new(message)))
        .with_method(getter("getCode", NativeFn::new(code)))
        .with_method(getter("getPrevious", NativeFn::new(previous)))
        .with_method(FunctionEntry::new("__toString", NativeFn::new(to_string)))
}

/// `Exception` or `Error`, whichever declares the private `previous` slot.
fn root_of(object: &Object) -> &'static str {
    if object.class().is_subclass_of("Exception") {
        "Exception"
    } else {
        "Error"
    }
}

fn construct(params: &mut Parameters) -> Result<Value, BridgeError> {
    let this = params.this_object()?;
    let args: &[Value] = &params[..];
    if let Some(message) = args.first() {
        this.set_raw(
            &mangle("message", Visibility::Protected, ""),
            message.clone(),
        );
    }
    if let Some(code) = args.get(1) {
        this.set_raw(&mangle("code", Visibility::Protected, ""), code.clone());
    }
    if let Some(previous) = args.get(2) {
        this.set_raw(
            &mangle("previous", Visibility::Private, root_of(&this)),
            previous.clone(),
        );
    }
    Ok(Value::null())
}

fn read(params: &mut Parameters, property: &str) -> Result<Value, BridgeError> {
    let this = params.this_object()?;
    Ok(this
        .get_raw(&mangle(property, Visibility::Protected, ""))
        .unwrap_or_default())
}

fn message(params: &mut Parameters) -> Result<Value, BridgeError> {
    read(params, "message")
}

fn code(params: &mut Parameters) -> Result<Value, BridgeError> {
    read(params, "code")
}

fn previous(params: &mut Parameters) -> Result<Value, BridgeError> {
    let this = params.this_object()?;
    Ok(this
        .get_raw(&mangle("previous", Visibility::Private, root_of(&this)))
        .unwrap_or_default())
}

fn to_string(params: &mut Parameters) -> Result<Value, BridgeError> {
    let this = params.this_object()?;
    let message = read(params, "message")?.string_value();
    Ok(Value::from(if message.is_empty() {
        this.class_name().to_string()
    } else {
        format!("{}: {message}", this.class_name())
    }))
}

/// A throwable object of `class`, falling back to `Exception` when `class`
/// is unknown or not throwable.
pub(crate) fn exception_class_for(engine: &Engine, class: &str) -> Option<Rc<ClassEntry>> {
    engine
        .find_class(class)
        .filter(|entry| {
            entry.is_subclass_of("Throwable") && !entry.is_abstract() && !entry.is_interface()
        })
        .or_else(|| {
            tracing::warn!(class, "not a throwable class, throwing Exception instead");
            engine.find_class("Exception")
        })
}

/// Build a throwable object without running user constructors.
pub(crate) fn exception_object(class: Rc<ClassEntry>, message: &str, code: i64) -> Value {
    let object = Object::new(class, None);
    object.set_raw(
        &mangle("message", Visibility::Protected, ""),
        Value::from(message),
    );
    object.set_raw(
        &mangle("code", Visibility::Protected, ""),
        Value::from(code),
    );
    Value::from_object(object)
}
