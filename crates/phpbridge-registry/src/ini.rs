//! Ini directive descriptors.

use phpbridge_core::IniEntry;

/// A configuration directive owned by an extension.
///
/// Values are stored as the host stores them: strings, with booleans
/// written as `On`/`Off`.
///
/// ```
/// use phpbridge_registry::Ini;
///
/// assert_eq!(Ini::new("demo.enabled", true).default_value(), "On");
/// assert_eq!(Ini::new("demo.limit", 64).default_value(), "64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ini {
    name: String,
    default: String,
    user_modifiable: bool,
}

impl Ini {
    pub fn new(name: impl Into<String>, default: impl IniValue) -> Self {
        Self {
            name: name.into(),
            default: default.into_ini(),
            user_modifiable: true,
        }
    }

    /// Only the system configuration may change this directive; requests
    /// cannot override it with `ini_set`.
    pub fn system_only(mut self) -> Self {
        self.user_modifiable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &str {
        &self.default
    }

    pub(crate) fn into_entry(self) -> IniEntry {
        let mut entry = IniEntry::new(self.name, self.default);
        entry.user_modifiable = self.user_modifiable;
        entry
    }
}

/// Values accepted as ini defaults.
pub trait IniValue {
    fn into_ini(self) -> String;
}

impl IniValue for bool {
    fn into_ini(self) -> String {
        if self { "On" } else { "Off" }.to_string()
    }
}

macro_rules! impl_ini_value {
    ($($ty:ty),*) => {
        $(
            impl IniValue for $ty {
                fn into_ini(self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_ini_value!(i16, i32, i64, u16, u32, u64, f64, &str, String);
