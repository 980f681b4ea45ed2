//! Language subsets.

use std::fmt;

/// A numbered language subset.
///
/// Higher chapters add node kinds and prelude functions; everything legal in
/// a chapter stays legal in later ones.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct Chapter(u8);

impl Chapter {
    /// Functions, constants, conditionals, recursion.
    pub const ONE: Chapter = Chapter(1);
    /// Adds pairs, lists and `null`.
    pub const TWO: Chapter = Chapter(2);
    /// Adds `let` and assignment.
    pub const THREE: Chapter = Chapter(3);
    /// Highest chapter this evaluator understands.
    pub const FOUR: Chapter = Chapter(4);

    /// Chapter from its number, if it is one we support.
    pub const fn new(number: u8) -> Option<Chapter> {
        if matches!(number, 1..=4) {
            Some(Chapter(number))
        } else {
            None
        }
    }

    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl Default for Chapter {
    fn default() -> Self {
        Chapter::ONE
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
