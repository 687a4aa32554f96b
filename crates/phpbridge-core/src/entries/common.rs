//! Member entries shared by classes and namespaces.

use std::rc::Rc;

use crate::array::ArrayKey;
use crate::modifiers::{MemberFlags, Visibility};
use crate::object::mangle;
use crate::value::Value;

/// A declared property.
#[derive(Debug, Clone)]
pub struct PropertyEntry {
    pub name: String,
    pub flags: MemberFlags,
    pub default: Value,
    /// Class that declared the property; filled in when the class is
    /// resolved.
    pub declaring_class: String,
}

impl PropertyEntry {
    pub fn new(name: impl Into<String>, default: impl Into<Value>, flags: MemberFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            default: default.into(),
            declaring_class: String::new(),
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.flags.visibility()
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    /// Key under which instances store this property.
    pub fn storage_key(&self) -> ArrayKey {
        ArrayKey::Str(Rc::from(mangle(&self.name, self.visibility(), &self.declaring_class)))
    }
}

/// A class or global constant.
#[derive(Debug, Clone)]
pub struct ConstantEntry {
    pub name: String,
    pub value: Value,
}

impl ConstantEntry {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Constants hold scalars or null.
    pub fn is_valid(&self) -> bool {
        self.value.is_null() || self.value.is_scalar()
    }
}
