//! Interned identifiers for flattened state and trigger names.
//!
//! This module provides the [`Id`] type, a copyable handle to a string stored in
//! a process-wide interner. Qualified state names are built by nesting
//! identifiers with the `:` separator.

use std::{
    cmp::Ordering,
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use serde::{Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Separator placed between the segments of a qualified name.
pub const QUALIFIER_SEPARATOR: &str = ":";

/// Global string interner backing every [`Id`].
///
/// # Thread Safety
///
/// Access goes through a `Mutex`. The interner is append-only, so a symbol
/// resolved once stays valid for the lifetime of the process.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Interned identifier.
///
/// Equality and hashing are symbol based. Ordering compares the underlying
/// strings, so sorting a list of identifiers is lexical and does not depend on
/// interning order.
///
/// # Examples
///
/// ```
/// use astrolabe_core::identifier::Id;
///
/// let region = Id::new("Main");
/// let state = region.create_nested(Id::new("Running"));
/// assert_eq!(state, "Main:Running");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string slice, interning it if needed.
    pub fn new(name: &str) -> Self {
        let symbol = interner().get_or_intern(name);
        Self(symbol)
    }

    /// Creates a nested ID by joining `self` and `child_id` with [`QUALIFIER_SEPARATOR`].
    ///
    /// # Examples
    ///
    /// ```
    /// use astrolabe_core::identifier::Id;
    ///
    /// let parent = Id::new("Top");
    /// let nested = parent.create_nested(Id::new("Idle"));
    /// assert_eq!(nested, "Top:Idle");
    /// ```
    pub fn create_nested(&self, child_id: Id) -> Self {
        let mut interner = interner();
        let nested_name = match (interner.resolve(self.0), interner.resolve(child_id.0)) {
            (Some(parent), Some(child)) => format!("{parent}{QUALIFIER_SEPARATOR}{child}"),
            // Symbols are never removed; both always resolve.
            _ => String::new(),
        };
        Self(interner.get_or_intern(&nested_name))
    }

    /// Returns an owned copy of the interned string.
    pub fn as_string(&self) -> String {
        interner()
            .resolve(self.0)
            .map(str::to_owned)
            .unwrap_or_default()
    }

    /// Returns the last segment of a qualified identifier.
    ///
    /// ```
    /// use astrolabe_core::identifier::Id;
    ///
    /// assert_eq!(Id::new("Top:Running:Fast").local_name(), "Fast");
    /// assert_eq!(Id::new("Idle").local_name(), "Idle");
    /// ```
    pub fn local_name(&self) -> String {
        let full = self.as_string();
        match full.rsplit_once(QUALIFIER_SEPARATOR) {
            Some((_, local)) => local.to_owned(),
            None => full,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let str_value = interner.resolve(self.0).unwrap_or_default();
        write!(f, "{str_value}")
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        let interner = interner();
        let lhs = interner.resolve(self.0).unwrap_or_default();
        let rhs = interner.resolve(other.0).unwrap_or_default();
        lhs.cmp(rhs)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        let interner = interner();
        interner.resolve(self.0) == Some(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id1 = Id::new("Idle");
        let id2 = Id::new("Idle");
        let id3 = Id::new("Running");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "Idle");
    }

    #[test]
    fn test_create_nested() {
        let parent = Id::new("Top");
        let nested1 = parent.create_nested(Id::new("Idle"));
        let nested2 = parent.create_nested(Id::new("Running"));

        assert_ne!(nested1, nested2);
        assert_eq!(nested1, "Top:Idle");
        assert_eq!(nested2, "Top:Running");
    }

    #[test]
    fn test_deep_nesting() {
        let level1 = Id::new("Top").create_nested(Id::new("Operational"));
        let level2 = level1.create_nested(Id::new("Motion"));
        let level3 = level2.create_nested(Id::new("Slewing"));

        assert_eq!(level3, "Top:Operational:Motion:Slewing");
        assert_eq!(level3.local_name(), "Slewing");
    }

    #[test]
    fn test_ordering_is_lexical() {
        // Intern in reverse order so symbol order disagrees with lexical order.
        let zulu = Id::new("zz_ordering_zulu");
        let alpha = Id::new("zz_ordering_alpha");

        let mut ids = vec![zulu, alpha];
        ids.sort();

        assert_eq!(ids, vec![alpha, zulu]);
    }

    #[test]
    fn test_display_and_as_string() {
        let id = Id::new("display_test");
        assert_eq!(format!("{id}"), "display_test");
        assert_eq!(id.as_string(), "display_test");
    }

    #[test]
    fn test_partial_eq_str() {
        let id = Id::new("Top:Idle");

        assert!(id == "Top:Idle");
        assert!(id != "Top");
        assert!(id != "Idle");

        let name = String::from("Top:Idle");
        assert!(id == name.as_str());
    }

    #[test]
    fn test_hash_and_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Id::new("key1"), "value1");
        map.insert(Id::new("key2"), "value2");

        assert_eq!(map.get(&Id::new("key1")), Some(&"value1"));
        assert_eq!(map.len(), 2);
    }
}
