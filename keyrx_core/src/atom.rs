//! Atom interning.
//!
//! An [`Atom`] is a small, `Copy` handle for a string that has been interned
//! into an [`AtomTable`]. Every name a keymap references — key names, type
//! names, modifier names, group names — is stored once and referred to by
//! atom everywhere else, favoring small `Copy` value objects over passing
//! owned strings around.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

/// An interned string handle. `Atom::NONE` denotes "no name".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom(u32);

impl Atom {
    /// Sentinel meaning "absent" — never produced by [`AtomTable::intern`].
    pub const NONE: Atom = Atom(0);

    /// Raw numeric value, for callers that need a stable integer key.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// True unless this is the `NONE` sentinel.
    pub fn is_some(self) -> bool {
        self != Atom::NONE
    }
}

impl Default for Atom {
    fn default() -> Self {
        Atom::NONE
    }
}

/// Interning table mapping strings to stable [`Atom`] handles.
///
/// Atoms are stable for the lifetime of the table: once interned, a string
/// always maps to the same atom and an atom's text never changes.
#[derive(Debug, Default)]
pub struct AtomTable {
    strings: Vec<String>,
    by_name: HashMap<String, Atom>,
}

impl AtomTable {
    pub fn new() -> Self {
        // Slot 0 is reserved for Atom::NONE and carries no text.
        AtomTable {
            strings: alloc::vec![String::new()],
            by_name: HashMap::new(),
        }
    }

    /// Interns `name`, returning its atom. Re-interning the same text
    /// returns the same atom.
    pub fn intern(&mut self, name: &str) -> Atom {
        if let Some(atom) = self.by_name.get(name) {
            return *atom;
        }
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(name.to_string());
        self.by_name.insert(name.to_string(), atom);
        atom
    }

    /// Looks up the text for an atom previously produced by this table.
    /// Returns `None` for `Atom::NONE` or an atom foreign to this table.
    pub fn text(&self, atom: Atom) -> Option<&str> {
        if atom == Atom::NONE {
            return None;
        }
        self.strings.get(atom.0 as usize).map(String::as_str)
    }

    /// Looks up an already-interned atom without creating one.
    pub fn find(&self, name: &str) -> Option<Atom> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_returns_same_atom() {
        let mut table = AtomTable::new();
        let a = table.intern("Shift");
        let b = table.intern("Shift");
        assert_eq!(a, b);
        assert_eq!(table.text(a), Some("Shift"));
    }

    #[test]
    fn distinct_text_gets_distinct_atoms() {
        let mut table = AtomTable::new();
        let a = table.intern("Shift");
        let b = table.intern("Lock");
        assert_ne!(a, b);
    }

    #[test]
    fn none_atom_has_no_text() {
        let table = AtomTable::new();
        assert_eq!(table.text(Atom::NONE), None);
        assert!(!Atom::NONE.is_some());
    }

    #[test]
    fn find_does_not_create() {
        let mut table = AtomTable::new();
        assert_eq!(table.find("Missing"), None);
        let atom = table.intern("Missing");
        assert_eq!(table.find("Missing"), Some(atom));
    }
}
