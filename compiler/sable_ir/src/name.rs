//! Interned identifiers.
//!
//! Every identifier and string literal in the tree is interned once, so
//! frames key their bindings by a 4-byte [`Name`] and compare in O(1).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Interned string identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[derive(Debug)]
struct InternTable {
    map: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

/// String interner shared between the tree and the evaluator.
///
/// Interned strings are leaked and live for the rest of the process, which
/// lets [`StringInterner::lookup`] hand out `&'static str` without holding
/// the lock.
#[derive(Debug)]
pub struct StringInterner {
    table: RwLock<InternTable>,
}

impl StringInterner {
    /// Create a new interner holding only the empty string.
    pub fn new() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, Name::EMPTY);
        StringInterner {
            table: RwLock::new(InternTable {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&name) = self.table.read().map.get(s) {
            return name;
        }

        let mut table = self.table.write();
        // Another writer may have won the race.
        if let Some(&name) = table.map.get(s) {
            return name;
        }
        let index = u32::try_from(table.strings.len())
            .unwrap_or_else(|_| panic!("interner exceeded {} strings", u32::MAX));
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let name = Name(index);
        table.strings.push(leaked);
        table.map.insert(leaked, name);
        name
    }

    /// Look up the string for a Name.
    ///
    /// Names from another interner resolve to the empty string.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or_default()
    }

    /// Number of interned strings, the empty string included.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    /// True when only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Interner handle shared between a tree and the runs evaluating it.
pub type SharedInterner = Arc<StringInterner>;
