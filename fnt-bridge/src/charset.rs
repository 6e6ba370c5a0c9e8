//! Named character sets and the user's choice among them.
//!
//! The registry is fixed: set names and their order are shown to users and
//! must stay stable.

use std::{collections::BTreeSet, ops::RangeInclusive};

/// A named group of characters.
#[derive(Debug)]
pub struct CharacterSet {
    pub name: &'static str,
    ranges: &'static [RangeInclusive<char>],
}

impl CharacterSet {
    pub fn contains(&self, ch: char) -> bool {
        self.ranges.iter().any(|range| range.contains(&ch))
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.ranges.iter().flat_map(|range| range.clone())
    }
}

/// All known sets, in display order.
pub static CHARACTER_SETS: &[CharacterSet] = &[
    CharacterSet {
        name: "Basic Latin",
        ranges: &[' '..='~'],
    },
    CharacterSet {
        name: "Latin-1 Supplement",
        ranges: &['\u{a0}'..='\u{ff}'],
    },
    CharacterSet {
        name: "Latin Extended-A",
        ranges: &['\u{100}'..='\u{17f}'],
    },
    CharacterSet {
        name: "Greek",
        // U+03A2 is unassigned
        ranges: &['\u{391}'..='\u{3a1}', '\u{3a3}'..='\u{3a9}', '\u{3b1}'..='\u{3c9}'],
    },
    CharacterSet {
        name: "Cyrillic",
        ranges: &['\u{401}'..='\u{401}', '\u{410}'..='\u{44f}', '\u{451}'..='\u{451}'],
    },
    CharacterSet {
        name: "General Punctuation",
        ranges: &[
            '\u{2013}'..='\u{2014}',
            '\u{2018}'..='\u{2019}',
            '\u{201c}'..='\u{201d}',
            '\u{2022}'..='\u{2022}',
            '\u{2026}'..='\u{2026}',
            '\u{2030}'..='\u{2030}',
            '\u{2039}'..='\u{203a}',
            '\u{20ac}'..='\u{20ac}',
            '\u{2122}'..='\u{2122}',
        ],
    },
];

/// Look up a set by name.
pub fn character_set(name: &str) -> Option<&'static CharacterSet> {
    CHARACTER_SETS.iter().find(|set| set.name == name)
}

/// Which of the registry's sets are enabled.
///
/// A character takes part in a conversion only if some enabled set
/// contains it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterSetSelection {
    enabled: Vec<bool>,
}

impl Default for CharacterSetSelection {
    fn default() -> Self {
        CharacterSetSelection {
            enabled: vec![true; CHARACTER_SETS.len()],
        }
    }
}

impl CharacterSetSelection {
    /// A selection with every set enabled.
    pub fn all() -> Self {
        Self::default()
    }

    /// A selection with every set disabled.
    pub fn none() -> Self {
        CharacterSetSelection {
            enabled: vec![false; CHARACTER_SETS.len()],
        }
    }

    /// Enable or disable the set called `name`.
    ///
    /// Returns `false` if there is no such set.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match CHARACTER_SETS.iter().position(|set| set.name == name) {
            Some(idx) => {
                self.enabled[idx] = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        CHARACTER_SETS
            .iter()
            .position(|set| set.name == name)
            .map(|idx| self.enabled[idx])
    }

    /// Each set name with its state, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        CHARACTER_SETS
            .iter()
            .zip(&self.enabled)
            .map(|(set, enabled)| (set.name, *enabled))
    }

    fn enabled_sets(&self) -> impl Iterator<Item = &'static CharacterSet> + '_ {
        CHARACTER_SETS
            .iter()
            .zip(&self.enabled)
            .filter_map(|(set, enabled)| enabled.then_some(set))
    }

    pub fn contains(&self, ch: char) -> bool {
        self.enabled_sets().any(|set| set.contains(ch))
    }

    /// The union of all enabled sets.
    pub fn characters(&self) -> BTreeSet<char> {
        self.enabled_sets().flat_map(CharacterSet::chars).collect()
    }
}
