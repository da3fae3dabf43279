//! The `Keymap` aggregate root.
//!
//! Owns every atom, table and string referenced anywhere in a compiled
//! keymap. Built once by the assembler, then treated as immutable — readers
//! hold an `Rc<Keymap>` rather than a raw reference, an explicit-ownership
//! aggregate-root-with-version pattern that avoids unsafe aliasing.

use alloc::vec::Vec;

use crate::atom::{Atom, AtomTable};
use crate::domain::entities::{IndicatorMap, Key, KeyType, SymInterpret};
use crate::domain::value_objects::{ModMask, ModifierKind};
use crate::expr::{ModNamespace, ModifierLookup};

/// The eight fixed real-modifier bit positions, in their historical order.
pub const NUM_REAL_MODS: usize = 8;
pub const REAL_MOD_NAMES: [&str; NUM_REAL_MODS] = [
    "Shift", "Lock", "Control", "Mod1", "Mod2", "Mod3", "Mod4", "Mod5",
];

/// Fixed capacity of the indicator (LED) table.
pub const MAX_INDICATORS: usize = 32;

/// Text format tag. Only `TextV1` is implemented; every other value is
/// rejected with `UnsupportedFormat` by the serializer and reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeymapFormat {
    #[default]
    TextV1,
}

/// A real or virtual modifier slot in the keymap's shared modifier table.
/// Real modifiers occupy indices `0..NUM_REAL_MODS` in the fixed order
/// above; virtual modifiers are appended afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifier {
    pub name: Atom,
    pub kind: ModifierKind,
    /// Real-modifier mask a virtual modifier resolves to at finalize time;
    /// unused (`ModMask::NONE`) for real modifiers.
    pub mapping: ModMask,
}

/// The compiled keymap aggregate.
#[derive(Debug)]
pub struct Keymap {
    pub atoms: AtomTable,
    pub keys: Vec<Key>,
    pub mods: Vec<Modifier>,
    pub types: Vec<KeyType>,
    pub interprets: Vec<SymInterpret>,
    pub indicators: [Option<IndicatorMap>; MAX_INDICATORS],
    /// Group name per group number (index 0 = group 1).
    pub group_names: Vec<Atom>,
    pub keycodes_name: Option<Atom>,
    pub types_name: Option<Atom>,
    pub compat_name: Option<Atom>,
    pub symbols_name: Option<Atom>,
    pub format: KeymapFormat,
    /// Bumped on every structural mutation; lets a caller detect whether a
    /// `Keymap` changed underneath an `Rc` clone during assembly.
    pub version: u64,
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap::new()
    }
}

impl Keymap {
    pub fn new() -> Self {
        let mut atoms = AtomTable::new();
        let mods = REAL_MOD_NAMES
            .iter()
            .map(|name| Modifier {
                name: atoms.intern(name),
                kind: ModifierKind::Real,
                mapping: ModMask::NONE,
            })
            .collect();
        Keymap {
            atoms,
            keys: Vec::new(),
            mods,
            types: Vec::new(),
            interprets: Vec::new(),
            indicators: [None; MAX_INDICATORS],
            group_names: Vec::new(),
            keycodes_name: None,
            types_name: None,
            compat_name: None,
            symbols_name: None,
            format: KeymapFormat::default(),
            version: 0,
        }
    }

    pub fn intern(&mut self, name: &str) -> Atom {
        self.atoms.intern(name)
    }

    /// Mask with every real-modifier bit set.
    pub fn real_mods_mask(&self) -> ModMask {
        ModMask((1u32 << NUM_REAL_MODS) - 1)
    }

    /// Reserves `name` as a virtual modifier, returning its table index.
    /// Re-declaring the same name returns the existing slot; duplicates
    /// share the slot.
    pub fn install_virtual_modifier(&mut self, name: Atom) -> u32 {
        if let Some(idx) = self
            .mods
            .iter()
            .position(|m| m.kind == ModifierKind::Virtual && m.name == name)
        {
            return idx as u32;
        }
        self.mods.push(Modifier {
            name,
            kind: ModifierKind::Virtual,
            mapping: ModMask::NONE,
        });
        self.version += 1;
        (self.mods.len() - 1) as u32
    }

    pub fn modifier_name(&self, index: u32) -> Option<Atom> {
        self.mods.get(index as usize).map(|m| m.name)
    }

    pub fn find_key_by_name(&self, name: Atom) -> Option<&Key> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn find_key_index_by_name(&self, name: Atom) -> Option<usize> {
        self.keys.iter().position(|k| k.name == name)
    }

    pub fn find_key_by_keycode(&self, keycode: u32) -> Option<&Key> {
        self.keys.iter().find(|k| k.keycode == keycode)
    }

    pub fn find_key_by_keycode_mut(&mut self, keycode: u32) -> Option<&mut Key> {
        self.keys.iter_mut().find(|k| k.keycode == keycode)
    }

    pub fn find_type_by_name(&self, name: Atom) -> Option<&KeyType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Finds the first empty indicator slot, or a slot already carrying
    /// `name`. Used both by the keycodes section (pre-registration) and the
    /// compat compiler's copy-to-keymap step.
    pub fn find_indicator_slot(&self, name: Atom) -> Option<usize> {
        self.indicators
            .iter()
            .position(|slot| matches!(slot, Some(led) if led.name == name))
    }

    pub fn find_empty_indicator_slot(&self) -> Option<usize> {
        self.indicators.iter().position(|slot| slot.is_none())
    }

    /// Checks that every type map entry's mask is a subset of its type's
    /// relevant mods, and every preserved mask is a subset of its own
    /// entry's mask.
    pub fn validate(&self) -> bool {
        self.types.iter().all(|ty| {
            ty.map
                .iter()
                .all(|entry| ty.mods.contains(entry.mods) && entry.mods.contains(entry.preserve))
        })
    }
}

impl ModifierLookup for Keymap {
    fn modifier_index(&self, name: &str, namespace: ModNamespace) -> Option<u32> {
        let matches_namespace = |kind: ModifierKind| match namespace {
            ModNamespace::Real => kind == ModifierKind::Real,
            ModNamespace::Virtual => kind == ModifierKind::Virtual,
            ModNamespace::Both => true,
        };
        self.mods.iter().position(|m| {
            matches_namespace(m.kind) && self.atoms.text(m.name) == Some(name)
        }).map(|i| i as u32)
    }

    fn modifier_mask_keyword(&self, name: &str) -> Option<u32> {
        match name {
            "all" => Some(self.real_mods_mask().0),
            "none" => Some(0),
            _ => self
                .modifier_index(name, ModNamespace::Real)
                .map(|idx| 1u32 << idx),
        }
    }
}
