//! Member and class modifiers.

use std::fmt;

use bitflags::bitflags;

/// Visibility modifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

bitflags! {
    /// Modifiers attached to a method, property or constant.
    ///
    /// At most one visibility bit may be set; with none set the member is
    /// public. `STATIC`, `ABSTRACT` and `FINAL` only apply to methods, with
    /// `STATIC` also allowed on properties.
    ///
    /// ```
    /// use phpbridge_core::{MemberFlags, Visibility};
    ///
    /// let flags = MemberFlags::PROTECTED | MemberFlags::STATIC;
    /// assert_eq!(flags.visibility(), Visibility::Protected);
    /// assert!(flags.is_static());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberFlags: u32 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 4;
        const ABSTRACT = 1 << 6;
        const FINAL = 1 << 5;
        const CONST = 1 << 8;
    }
}

impl MemberFlags {
    /// Mask of the visibility bits.
    pub const VISIBILITY: MemberFlags = MemberFlags::PUBLIC
        .union(MemberFlags::PROTECTED)
        .union(MemberFlags::PRIVATE);

    /// Resolve the visibility bits, defaulting to public.
    pub fn visibility(self) -> Visibility {
        if self.contains(MemberFlags::PRIVATE) {
            Visibility::Private
        } else if self.contains(MemberFlags::PROTECTED) {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    /// More than one visibility bit set.
    pub fn has_conflicting_visibility(self) -> bool {
        self.intersection(Self::VISIBILITY).bits().count_ones() > 1
    }

    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(MemberFlags::STATIC)
    }

    #[inline]
    pub fn is_abstract(self) -> bool {
        self.contains(MemberFlags::ABSTRACT)
    }

    #[inline]
    pub fn is_final(self) -> bool {
        self.contains(MemberFlags::FINAL)
    }
}

impl From<Visibility> for MemberFlags {
    fn from(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => MemberFlags::PUBLIC,
            Visibility::Protected => MemberFlags::PROTECTED,
            Visibility::Private => MemberFlags::PRIVATE,
        }
    }
}

bitflags! {
    /// Class kind. A class with none of these bits is a regular class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u32 {
        const ABSTRACT = 1 << 0;
        const FINAL = 1 << 1;
        const INTERFACE = 1 << 2;
    }
}

impl ClassFlags {
    /// Interfaces and abstract classes may carry abstract methods.
    pub fn allows_abstract_methods(self) -> bool {
        self.intersects(ClassFlags::ABSTRACT | ClassFlags::INTERFACE)
    }

    /// Whether objects of this class can be instantiated directly.
    pub fn is_instantiable(self) -> bool {
        !self.allows_abstract_methods()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_visibility_is_public() {
        assert_eq!(MemberFlags::empty().visibility(), Visibility::Public);
        assert_eq!(MemberFlags::STATIC.visibility(), Visibility::Public);
    }

    #[test]
    fn conflicting_visibility() {
        assert!((MemberFlags::PUBLIC | MemberFlags::PRIVATE).has_conflicting_visibility());
        assert!(!(MemberFlags::PRIVATE | MemberFlags::FINAL).has_conflicting_visibility());
    }

    #[test]
    fn class_kinds() {
        assert!(ClassFlags::INTERFACE.allows_abstract_methods());
        assert!(ClassFlags::FINAL.is_instantiable());
        assert!(!ClassFlags::ABSTRACT.is_instantiable());
    }
}
