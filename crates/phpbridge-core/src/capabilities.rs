//! Capability traits and the per-class capability table.
//!
//! A native class exposes optional behaviour by implementing one of the
//! traits below and opting in on its class descriptor. The descriptor then
//! stores type-erased function objects in a [`ClassCapabilities`] table;
//! the engine calls through that table without knowing the native type.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Native object that can be iterated with `foreach`.
pub trait Traversable {
    /// A fresh iterator. It must not borrow `self`; copy or share the data
    /// it walks.
    fn iterator(&self) -> Box<dyn ObjectIterator>;
}

/// Iterator protocol driven by a traversal cursor.
pub trait ObjectIterator {
    fn valid(&self) -> bool;
    fn current(&self) -> Value;
    fn key(&self) -> Value;
    fn next(&mut self);
    fn rewind(&mut self);
}

/// Native object with a custom element count.
pub trait Countable {
    fn count(&self) -> i64;
}

/// Native object supporting array syntax.
pub trait ArrayAccess {
    fn offset_exists(&self, offset: &Value) -> bool;
    fn offset_get(&self, offset: &Value) -> Value;
    /// `offset` is `None` for `$object[] = $value`.
    fn offset_set(&mut self, offset: Option<&Value>, value: Value);
    fn offset_unset(&mut self, offset: &Value);
}

/// Native objects of the same class with a custom ordering.
pub trait Comparable {
    fn compare(&self, other: &Self) -> Ordering;
}

pub type Factory = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;
pub type Cloner = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any>> + Send + Sync>;
pub type Teardown = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;
pub type IteratorFactory = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn ObjectIterator>> + Send + Sync>;
pub type Counter = Arc<dyn Fn(&dyn Any) -> Option<i64> + Send + Sync>;
pub type Comparator = Arc<dyn Fn(&dyn Any, &dyn Any) -> Option<Ordering> + Send + Sync>;
pub type Stringifier = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

/// Type-erased `ArrayAccess` hooks.
#[derive(Clone)]
pub struct ArrayAccessHooks {
    pub exists: Arc<dyn Fn(&dyn Any, &Value) -> Option<bool> + Send + Sync>,
    pub get: Arc<dyn Fn(&dyn Any, &Value) -> Option<Value> + Send + Sync>,
    pub set: Arc<dyn Fn(&mut dyn Any, Option<&Value>, Value) -> bool + Send + Sync>,
    pub unset: Arc<dyn Fn(&mut dyn Any, &Value) -> bool + Send + Sync>,
}

/// What a class can do, stored as function objects instead of requiring a
/// common native base type.
///
/// `construct` and `clone` mirror default- and copy-construction of the
/// native backing; `destruct` runs before the backing is dropped.
#[derive(Clone, Default)]
pub struct ClassCapabilities {
    pub construct: Option<Factory>,
    pub clone: Option<Cloner>,
    pub destruct: Option<Teardown>,
    pub traverse: Option<IteratorFactory>,
    pub count: Option<Counter>,
    pub compare: Option<Comparator>,
    pub to_string: Option<Stringifier>,
    pub array_access: Option<ArrayAccessHooks>,
}

impl ClassCapabilities {
    /// Fill every missing capability from `parent`.
    pub fn inherit(&mut self, parent: &ClassCapabilities) {
        macro_rules! inherit {
            ($($field:ident),*) => {
                $(
                    if self.$field.is_none() {
                        self.$field = parent.$field.clone();
                    }
                )*
            };
        }
        inherit!(
            construct,
            clone,
            destruct,
            traverse,
            count,
            compare,
            to_string,
            array_access
        );
    }

    /// Construct capability wrapping `T::default()`.
    pub fn default_factory<T: Default + 'static>() -> Factory {
        Arc::new(|| Box::new(T::default()))
    }

    /// Construct capability wrapping a plain factory function.
    pub fn factory<T: 'static>(make: fn() -> T) -> Factory {
        Arc::new(move || Box::new(make()))
    }

    /// Clone capability for `T: Clone`.
    pub fn cloner<T: Clone + 'static>() -> Cloner {
        Arc::new(|native: &dyn Any| {
            native
                .downcast_ref::<T>()
                .map(|value| Box::new(value.clone()) as Box<dyn Any>)
        })
    }

    /// Teardown capability calling `hook` on the native value.
    pub fn teardown<T: 'static>(hook: fn(&mut T)) -> Teardown {
        Arc::new(move |native: &mut dyn Any| {
            if let Some(value) = native.downcast_mut::<T>() {
                hook(value);
            }
        })
    }

    pub fn traverser<T: Traversable + 'static>() -> IteratorFactory {
        Arc::new(|native: &dyn Any| native.downcast_ref::<T>().map(|value| value.iterator()))
    }

    pub fn counter<T: Countable + 'static>() -> Counter {
        Arc::new(|native: &dyn Any| native.downcast_ref::<T>().map(|value| value.count()))
    }

    pub fn comparator<T: Comparable + 'static>() -> Comparator {
        Arc::new(|a: &dyn Any, b: &dyn Any| {
            let (a, b) = (a.downcast_ref::<T>()?, b.downcast_ref::<T>()?);
            Some(a.compare(b))
        })
    }

    pub fn stringifier<T: fmt::Display + 'static>() -> Stringifier {
        Arc::new(|native: &dyn Any| native.downcast_ref::<T>().map(|value| value.to_string()))
    }

    pub fn array_access<T: ArrayAccess + 'static>() -> ArrayAccessHooks {
        ArrayAccessHooks {
            exists: Arc::new(|native: &dyn Any, offset: &Value| {
                native
                    .downcast_ref::<T>()
                    .map(|value| value.offset_exists(offset))
            }),
            get: Arc::new(|native: &dyn Any, offset: &Value| {
                native
                    .downcast_ref::<T>()
                    .map(|value| value.offset_get(offset))
            }),
            set: Arc::new(|native: &mut dyn Any, offset: Option<&Value>, item: Value| {
                match native.downcast_mut::<T>() {
                    Some(value) => {
                        value.offset_set(offset, item);
                        true
                    }
                    None => false,
                }
            }),
            unset: Arc::new(|native: &mut dyn Any, offset: &Value| {
                match native.downcast_mut::<T>() {
                    Some(value) => {
                        value.offset_unset(offset);
                        true
                    }
                    None => false,
                }
            }),
        }
    }
}

impl fmt::Debug for ClassCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassCapabilities")
            .field("construct", &self.construct.is_some())
            .field("clone", &self.clone.is_some())
            .field("destruct", &self.destruct.is_some())
            .field("traverse", &self.traverse.is_some())
            .field("count", &self.count.is_some())
            .field("compare", &self.compare.is_some())
            .field("to_string", &self.to_string.is_some())
            .field("array_access", &self.array_access.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone, PartialEq, Debug)]
    struct Bag(Vec<i64>);

    impl Countable for Bag {
        fn count(&self) -> i64 {
            self.0.len() as i64
        }
    }

    impl Comparable for Bag {
        fn compare(&self, other: &Self) -> Ordering {
            self.0.len().cmp(&other.0.len())
        }
    }

    #[test]
    fn factory_and_cloner_round_trip_through_any() {
        let make = ClassCapabilities::default_factory::<Bag>();
        let mut native = make();
        native.downcast_mut::<Bag>().unwrap().0.push(3);
        let clone = ClassCapabilities::cloner::<Bag>()(&*native).unwrap();
        assert_eq!(clone.downcast_ref::<Bag>(), Some(&Bag(vec![3])));
    }

    #[test]
    fn erased_capabilities_reject_foreign_types() {
        let count = ClassCapabilities::counter::<Bag>();
        assert_eq!(count(&Bag(vec![1, 2])), Some(2));
        assert_eq!(count(&"not a bag"), None);

        let compare = ClassCapabilities::comparator::<Bag>();
        assert_eq!(
            compare(&Bag(vec![1]), &Bag(vec![])),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn inherit_fills_only_missing() {
        let mut child = ClassCapabilities {
            count: Some(ClassCapabilities::counter::<Bag>()),
            ..Default::default()
        };
        let parent = ClassCapabilities {
            construct: Some(ClassCapabilities::default_factory::<Bag>()),
            ..Default::default()
        };
        child.inherit(&parent);
        assert!(child.construct.is_some());
        assert!(child.count.is_some());
        assert!(child.clone.is_none());
    }
}
