//! Ordered hash table backing arrays and object property tables.
//!
//! [`HashTable`] preserves insertion order across mixed integer and string
//! keys and tracks the next free integer key for appends. It is shared
//! between [`Value`]s through an `Rc` and detached on first write.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::error::ValueError;
use crate::value::Value;

/// A normalized array key.
///
/// Decimal integer strings (`"5"`, `"-3"`) are stored as [`ArrayKey::Int`],
/// so `$a["5"]` and `$a[5]` address the same slot. Strings with a leading
/// zero, a plus sign, whitespace or a fraction stay strings.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Int(i64),
    Str(Rc<str>),
}

impl ArrayKey {
    /// Normalize a string key.
    pub fn from_str_key(key: &str) -> Self {
        match canonical_int(key) {
            Some(index) => ArrayKey::Int(index),
            None => ArrayKey::Str(Rc::from(key)),
        }
    }

    /// Normalize a value used as a key. Arrays, objects and callables are
    /// illegal offsets.
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        value.to_array_key()
    }

    pub fn is_str(&self) -> bool {
        matches!(self, ArrayKey::Str(_))
    }

    /// The key as a [`Value`].
    pub fn to_value(&self) -> Value {
        match self {
            ArrayKey::Int(index) => Value::from(*index),
            ArrayKey::Str(key) => Value::from(&**key),
        }
    }
}

fn canonical_int(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    if key == "-0" {
        return None;
    }
    key.parse().ok()
}

impl fmt::Debug for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(index) => write!(f, "{index}"),
            ArrayKey::Str(key) => write!(f, "{key:?}"),
        }
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(index) => write!(f, "{index}"),
            ArrayKey::Str(key) => f.write_str(key),
        }
    }
}

macro_rules! impl_array_key_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ArrayKey {
                fn from(index: $ty) -> Self {
                    ArrayKey::Int(index as i64)
                }
            }
        )*
    };
}

impl_array_key_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<&str> for ArrayKey {
    fn from(key: &str) -> Self {
        ArrayKey::from_str_key(key)
    }
}

impl From<String> for ArrayKey {
    fn from(key: String) -> Self {
        ArrayKey::from_str_key(&key)
    }
}

impl From<&String> for ArrayKey {
    fn from(key: &String) -> Self {
        ArrayKey::from_str_key(key)
    }
}

impl From<bool> for ArrayKey {
    fn from(key: bool) -> Self {
        ArrayKey::Int(key as i64)
    }
}

impl From<&ArrayKey> for ArrayKey {
    fn from(key: &ArrayKey) -> Self {
        key.clone()
    }
}

/// Insertion-ordered table of [`Value`]s keyed by [`ArrayKey`].
#[derive(Clone, Default)]
pub struct HashTable {
    entries: IndexMap<ArrayKey, Value, FxBuildHasher>,
    next_index: i64,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            next_index: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The key the next [`push`](Self::push) will use.
    pub fn next_index(&self) -> i64 {
        self.next_index
    }

    pub fn contains_key(&self, key: &ArrayKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &ArrayKey) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Entry at a position in insertion order.
    pub fn get_index(&self, position: usize) -> Option<(&ArrayKey, &Value)> {
        self.entries.get_index(position)
    }

    /// Position of a key in insertion order.
    pub fn position(&self, key: &ArrayKey) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Insert or overwrite. Overwriting keeps the original position.
    pub fn insert(&mut self, key: ArrayKey, value: Value) -> Option<Value> {
        if let ArrayKey::Int(index) = key {
            self.bump_next_index(index);
        }
        self.entries.insert(key, value)
    }

    /// Append with the next free integer key.
    pub fn push(&mut self, value: Value) -> Result<ArrayKey, ValueError> {
        let index = self.next_index;
        if index == i64::MAX && self.entries.contains_key(&ArrayKey::Int(index)) {
            return Err(ValueError::NextElementOccupied);
        }
        let key = ArrayKey::Int(index);
        self.insert(key.clone(), value);
        Ok(key)
    }

    /// Remove a key, keeping the order of the remaining entries. The next
    /// free index is not rewound.
    pub fn remove(&mut self, key: &ArrayKey) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Slot for `key`, inserted as null when missing.
    pub fn entry_or_null(&mut self, key: ArrayKey) -> &mut Value {
        if let ArrayKey::Int(index) = key {
            self.bump_next_index(index);
        }
        self.entries.entry(key).or_default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_index = 0;
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, ArrayKey, Value> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, ArrayKey, Value> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, ArrayKey, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, ArrayKey, Value> {
        self.entries.values()
    }

    fn bump_next_index(&mut self, index: i64) {
        if index >= self.next_index {
            self.next_index = index.saturating_add(1);
        }
    }
}

impl fmt::Debug for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K: Into<ArrayKey>, V: Into<Value>> FromIterator<(K, V)> for HashTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = HashTable::new();
        for (key, value) in iter {
            table.insert(key.into(), value.into());
        }
        table
    }
}

impl<'a> IntoIterator for &'a HashTable {
    type Item = (&'a ArrayKey, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, ArrayKey, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_strings_normalize() {
        assert_eq!(ArrayKey::from("5"), ArrayKey::Int(5));
        assert_eq!(ArrayKey::from("-3"), ArrayKey::Int(-3));
        assert!(ArrayKey::from("05").is_str());
        assert!(ArrayKey::from("5.0").is_str());
        assert!(ArrayKey::from(" 5").is_str());
        assert!(ArrayKey::from("-0").is_str());
        assert!(ArrayKey::from("9223372036854775808").is_str());
    }

    #[test]
    fn insertion_order_is_kept_across_key_kinds() {
        let mut table = HashTable::new();
        table.insert(ArrayKey::Int(0), Value::from("val0"));
        table.insert(ArrayKey::Int(1), Value::from("val1"));
        table.insert(ArrayKey::from("third"), Value::from("val3"));
        let keys: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["0", "1", "third"]);
    }

    #[test]
    fn push_uses_next_free_index() {
        let mut table = HashTable::new();
        table.insert(ArrayKey::Int(7), Value::from(1));
        assert_eq!(table.push(Value::from(2)).ok(), Some(ArrayKey::Int(8)));
        table.insert(ArrayKey::Int(-4), Value::from(3));
        assert_eq!(table.push(Value::from(4)).ok(), Some(ArrayKey::Int(9)));
    }

    #[test]
    fn remove_does_not_rewind_next_index() {
        let mut table = HashTable::new();
        table.push(Value::from("a")).unwrap();
        table.push(Value::from("b")).unwrap();
        table.remove(&ArrayKey::Int(1));
        assert_eq!(table.push(Value::from("c")).ok(), Some(ArrayKey::Int(2)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut table: HashTable = [("a", 1), ("b", 2)].into_iter().collect();
        table.insert(ArrayKey::from("a"), Value::from(3));
        let (key, value) = table.get_index(0).unwrap();
        assert_eq!(key, &ArrayKey::from("a"));
        assert_eq!(value.numeric_value(), 3);
    }

    #[test]
    fn push_at_max_index_fails() {
        let mut table = HashTable::new();
        table.insert(ArrayKey::Int(i64::MAX), Value::from(1));
        assert_eq!(
            table.push(Value::from(2)),
            Err(ValueError::NextElementOccupied)
        );
    }
}
