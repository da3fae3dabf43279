//! Keymap entities: keys, groups, levels, types, interprets, indicator maps
//! and the tagged-union action type they all eventually carry.

use alloc::vec::Vec;

use crate::atom::Atom;
use crate::domain::value_objects::{MergeMode, ModMask, Predicate};
use crate::keysym::Keysym;

/// Small macro standing in for a bitflags dependency: these "defined" masks
/// are internal bookkeeping only (never serialized), so a handful of `const`
/// bit positions plus `contains`/`set` is all that's needed.
macro_rules! bitflags_like {
    ($name:ident, [$($flag:ident),+ $(,)?]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(u32);

        impl $name {
            bitflags_like!(@consts 0u32; $($flag),+);

            pub fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn set(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }
        }

        impl core::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: Self) -> Self::Output {
                self.union(rhs)
            }
        }
    };
    (@consts $bit:expr; $flag:ident $(, $rest:ident)*) => {
        #[allow(non_upper_case_globals)]
        pub const $flag: Self = Self(1u32 << $bit);
        bitflags_like!(@consts ($bit + 1); $($rest),*);
    };
    (@consts $bit:expr;) => {};
}

/// What a key does when its effective group goes out of range for its
/// declared number of groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfRangeGroupAction {
    #[default]
    Wrap,
    Saturate,
    Redirect,
}

/// A single level within a group: the keysyms it produces and the action it
/// runs, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Level {
    pub syms: Vec<Keysym>,
    pub action: Action,
}

impl Level {
    pub fn empty() -> Self {
        Level::default()
    }

    /// `key_get_one_sym`: `Some` only when the level carries exactly one
    /// keysym, `None` for zero or more than one.
    pub fn one_sym(&self) -> Option<Keysym> {
        match self.syms.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// One group of levels attached to a key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    pub type_name: Atom,
    pub explicit_type: bool,
    pub levels: Vec<Level>,
}

/// A single `mods -> level` entry in a [`KeyType`]'s map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapEntry {
    pub mods: ModMask,
    pub level: u32,
    pub preserve: ModMask,
}

/// A key type: the rule mapping an effective modifier mask to a level index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyType {
    pub name: Atom,
    pub mods: ModMask,
    pub num_levels: u32,
    pub map: Vec<TypeMapEntry>,
    pub level_names: Vec<Atom>,
}

impl KeyType {
    /// First map entry whose `mods` exactly matches `effective_mods` once
    /// masked down to this type's relevant bits; `None` means level 0
    /// (default fallthrough).
    pub fn level_for_mods(&self, effective_mods: ModMask) -> u32 {
        let relevant = ModMask(effective_mods.0 & self.mods.0);
        self.map
            .iter()
            .find(|entry| entry.mods == relevant)
            .map(|entry| entry.level)
            .unwrap_or(0)
    }

    /// Union of every map entry's `mods`, the modifiers that can possibly
    /// influence level selection for this type (used by consumed-modifier
    /// computation).
    pub fn consumable_mods(&self) -> ModMask {
        self.map
            .iter()
            .fold(ModMask::NONE, |acc, e| acc | e.mods)
    }
}

bitflags_like!(KeyExplicit, [TYPE, REPEAT, VMODMAP, INTERP]);

/// A key: its name, groups of levels, and the flags controlling default
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Key {
    pub name: Atom,
    pub keycode: u32,
    pub groups: Vec<Group>,
    pub modmap: ModMask,
    pub vmodmap: ModMask,
    pub repeats: bool,
    /// Which fields the symbols section set explicitly; the assembler's
    /// interpret-application pass only fills in fields left unset here
    /// (mirroring `xkbcomp`'s `XkbExplicit*Mask` bits).
    pub explicit: KeyExplicit,
    pub out_of_range_group_action: OutOfRangeGroupAction,
    pub out_of_range_group_number: u32,
}

impl Key {
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Resolves an arbitrary (possibly out-of-range) group index according
    /// to this key's out-of-range policy.
    pub fn resolve_group(&self, requested: i32) -> usize {
        let n = self.groups.len() as i32;
        if n == 0 {
            return 0;
        }
        if requested >= 0 && requested < n {
            return requested as usize;
        }
        match self.out_of_range_group_action {
            OutOfRangeGroupAction::Wrap => requested.rem_euclid(n) as usize,
            OutOfRangeGroupAction::Saturate => {
                if requested < 0 {
                    0
                } else {
                    (n - 1) as usize
                }
            }
            OutOfRangeGroupAction::Redirect => {
                (self.out_of_range_group_number as usize).min(self.groups.len().saturating_sub(1))
            }
        }
    }
}

/// A symbol interpretation rule (`interpret SYM+PRED(mask) { ... }`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymInterpret {
    pub sym: Keysym,
    pub has_sym: bool,
    pub predicate: Predicate,
    pub mods: ModMask,
    pub virtual_mod: Option<u32>,
    pub action: Action,
    pub level_one_only: bool,
    pub repeat: bool,
    /// Which fields this record's source statement actually set; used by
    /// the compat compiler's merge discipline.
    pub defined: InterpretDefined,
    pub merge: MergeMode,
    /// Origin file, used to detect same-source collisions under `Override`.
    pub file_id: u32,
}

bitflags_like!(InterpretDefined, [ACTION, VIRTUAL_MOD, REPEAT, LEVEL_ONE_ONLY]);

/// An indicator map (LED) rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorMap {
    pub name: Atom,
    pub which_mods: ComponentMask,
    pub mods: ModMask,
    pub which_groups: ComponentMask,
    pub groups: u32,
    pub ctrls: u32,
    pub defined: LedDefined,
    pub merge: MergeMode,
    pub file_id: u32,
}

bitflags_like!(LedDefined, [MODS, GROUPS, CTRLS, WHICH_MODS, WHICH_GROUPS]);

/// Which state component(s) a `which_mods`/`which_groups` field selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentMask(pub u8);

impl ComponentMask {
    pub const NONE: ComponentMask = ComponentMask(0);
    pub const BASE: ComponentMask = ComponentMask(1 << 0);
    pub const LATCHED: ComponentMask = ComponentMask(1 << 1);
    pub const LOCKED: ComponentMask = ComponentMask(1 << 2);
    pub const EFFECTIVE: ComponentMask = ComponentMask(1 << 3);

    pub fn contains(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for ComponentMask {
    type Output = ComponentMask;
    fn bitor(self, rhs: Self) -> Self::Output {
        ComponentMask(self.0 | rhs.0)
    }
}

/// A modifier-bearing action payload (`SetMods`/`LatchMods`/`LockMods`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModAction {
    pub mods: u32,
    pub use_mod_map_mods: bool,
    pub clear_locks: bool,
    pub latch_to_lock: bool,
}

/// A group-bearing action payload (`SetGroup`/`LatchGroup`/`LockGroup`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupAction {
    pub group: i32,
    pub absolute: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PtrMoveAction {
    pub x: i32,
    pub y: i32,
    pub absolute_x: bool,
    pub absolute_y: bool,
    pub no_accel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockAffect {
    #[default]
    Both,
    Lock,
    Unlock,
    Neither,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PtrButtonAction {
    pub button: Option<u8>,
    pub count: u8,
    pub affect: LockAffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PtrDefaultAction {
    pub value: i32,
    pub absolute: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwitchVtAction {
    pub screen: i32,
    pub same_server: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CtrlAction {
    pub ctrls: u32,
}

/// Tagged union of every action a level can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    None,
    ModSet(ModAction),
    ModLatch(ModAction),
    ModLock(ModAction),
    GroupSet(GroupAction),
    GroupLatch(GroupAction),
    GroupLock(GroupAction),
    PtrMove(PtrMoveAction),
    PtrButton(PtrButtonAction),
    PtrLock(PtrButtonAction),
    PtrDefault(PtrDefaultAction),
    SwitchVt(SwitchVtAction),
    CtrlSet(CtrlAction),
    CtrlLock(CtrlAction),
    Terminate,
    /// Opaque vendor-private action; the 7-byte payload is carried through
    /// unmodified, never interpreted.
    Private([u8; 7]),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_sym_requires_exactly_one_keysym() {
        let mut level = Level::empty();
        assert_eq!(level.one_sym(), None);
        level.syms.push(Keysym::from_name("a").unwrap());
        assert_eq!(level.one_sym(), Some(Keysym::from_name("a").unwrap()));
        level.syms.push(Keysym::from_name("b").unwrap());
        assert_eq!(level.one_sym(), None);
    }

    #[test]
    fn key_type_defaults_to_level_zero_when_unmatched() {
        let ty = KeyType {
            name: Atom::NONE,
            mods: ModMask(0b11),
            num_levels: 2,
            map: alloc::vec![TypeMapEntry {
                mods: ModMask(0b01),
                level: 1,
                preserve: ModMask::NONE,
            }],
            level_names: alloc::vec![],
        };
        assert_eq!(ty.level_for_mods(ModMask(0b10)), 0);
        assert_eq!(ty.level_for_mods(ModMask(0b01)), 1);
    }

    #[test]
    fn key_resolve_group_wraps_by_default() {
        let key = Key {
            groups: alloc::vec![Group::default(), Group::default()],
            ..Default::default()
        };
        assert_eq!(key.resolve_group(2), 0);
        assert_eq!(key.resolve_group(-1), 1);
    }

    #[test]
    fn key_resolve_group_saturates() {
        let key = Key {
            groups: alloc::vec![Group::default(), Group::default()],
            out_of_range_group_action: OutOfRangeGroupAction::Saturate,
            ..Default::default()
        };
        assert_eq!(key.resolve_group(5), 1);
        assert_eq!(key.resolve_group(-5), 0);
    }

    #[test]
    fn interpret_defined_tracks_set_fields() {
        let mut defined = InterpretDefined::default();
        assert!(!defined.contains(InterpretDefined::ACTION));
        defined.set(InterpretDefined::ACTION);
        assert!(defined.contains(InterpretDefined::ACTION));
        assert!(!defined.contains(InterpretDefined::REPEAT));
    }
}
