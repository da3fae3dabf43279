//! Fixture builders shared by this crate's test modules and by the other
//! workspace crates' dev-dependencies (under the `testing` feature).
//!
//! A full scenario-simulation harness in the style of a mock-device,
//! coverage-analysis DDD surface is out of scope here: the section
//! compilers, assembler and state machine only ever need a handful of keys,
//! types and groups wired up quickly, so that's what these builders give.

use alloc::vec::Vec;

use crate::atom::Atom;
use crate::domain::aggregates::Keymap;
use crate::domain::entities::{Action, Group, Key, KeyType, Level, TypeMapEntry};
use crate::domain::value_objects::ModMask;
use crate::keysym::Keysym;

/// Fluent builder for one key inside a [`KeymapBuilder`].
pub struct KeyBuilder<'a> {
    keymap: &'a mut Keymap,
    key: Key,
}

impl<'a> KeyBuilder<'a> {
    fn new(keymap: &'a mut Keymap, name: &str, keycode: u32) -> Self {
        let name_atom = keymap.intern(name);
        KeyBuilder {
            keymap,
            key: Key {
                name: name_atom,
                keycode,
                ..Key::default()
            },
        }
    }

    /// Appends a group with a single level per named keysym and no attached
    /// type, the bare `[ sym, sym ]` form.
    pub fn syms(mut self, syms: &[&str]) -> Self {
        let level = Level {
            syms: syms
                .iter()
                .map(|name| Keysym::from_name(name).expect("fixture keysym must be known"))
                .collect(),
            action: Action::default(),
        };
        self.key.groups.push(Group {
            levels: alloc::vec![level],
            ..Group::default()
        });
        self
    }

    /// Appends a pre-built group, for callers that need an attached type or
    /// more than one level.
    pub fn group(mut self, group: Group) -> Self {
        self.key.groups.push(group);
        self
    }

    pub fn vmodmap(mut self, mods: ModMask) -> Self {
        self.key.vmodmap = mods;
        self
    }

    pub fn modmap(mut self, mods: ModMask) -> Self {
        self.key.modmap = mods;
        self
    }

    pub fn repeats(mut self, repeats: bool) -> Self {
        self.key.repeats = repeats;
        self
    }

    /// Installs the key and returns its interned name.
    pub fn build(self) -> Atom {
        let name = self.key.name;
        self.keymap.keys.push(self.key);
        name
    }
}

/// Fluent builder for a whole keymap fixture.
pub struct KeymapBuilder {
    keymap: Keymap,
}

impl KeymapBuilder {
    pub fn new() -> Self {
        KeymapBuilder {
            keymap: Keymap::new(),
        }
    }

    pub fn key(&mut self, name: &str, keycode: u32) -> KeyBuilder<'_> {
        KeyBuilder::new(&mut self.keymap, name, keycode)
    }

    /// Installs a key type whose only map entry selects level 1 when
    /// exactly `mods` is active, falling through to level 0 otherwise — the
    /// shape almost every fixture needing a type-driven level actually
    /// wants.
    pub fn two_level_type(&mut self, name: &str, mods: ModMask) -> Atom {
        let name_atom = self.keymap.intern(name);
        self.keymap.types.push(KeyType {
            name: name_atom,
            mods,
            num_levels: 2,
            map: alloc::vec![TypeMapEntry {
                mods,
                level: 1,
                preserve: ModMask::NONE,
            }],
            level_names: Vec::new(),
        });
        name_atom
    }

    pub fn group_names(&mut self, names: &[&str]) -> &mut Self {
        let mut atoms = Vec::with_capacity(names.len());
        for name in names {
            atoms.push(self.keymap.intern(name));
        }
        self.keymap.group_names = atoms;
        self
    }

    pub fn build(self) -> Keymap {
        self.keymap
    }
}

impl Default for KeymapBuilder {
    fn default() -> Self {
        KeymapBuilder::new()
    }
}

/// Wraps a freshly built keymap in the `Rc` a [`crate::runtime::State`]
/// expects.
pub fn state_over(keymap: Keymap) -> crate::runtime::State {
    crate::runtime::State::new(alloc::rc::Rc::new(keymap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::KeyDirection;

    #[test]
    fn builder_produces_a_key_whose_syms_round_trip_through_a_state() {
        let mut builder = KeymapBuilder::new();
        builder.key("AD01", 24).syms(&["q", "Q"]).build();
        let keymap = builder.build();
        let state = state_over(keymap);
        assert_eq!(state.key_get_syms(24), &[Keysym::from_name("q").unwrap()]);
    }

    #[test]
    fn two_level_type_selects_level_one_once_the_type_mods_are_active() {
        let mut builder = KeymapBuilder::new();
        let shift = ModMask(1 << 0);
        let ty = builder.two_level_type("TWO_LEVEL", shift);
        builder
            .key("AD02", 25)
            .group(Group {
                type_name: ty,
                levels: alloc::vec![
                    Level {
                        syms: alloc::vec![Keysym::from_name("w").unwrap()],
                        action: Action::default(),
                    },
                    Level {
                        syms: alloc::vec![Keysym::from_name("W").unwrap()],
                        action: Action::default(),
                    },
                ],
                ..Group::default()
            })
            .build();
        builder
            .key("LFSH", 50)
            .vmodmap(shift)
            .group(Group {
                levels: alloc::vec![Level {
                    syms: Vec::new(),
                    action: Action::ModSet(crate::domain::entities::ModAction {
                        mods: 0,
                        use_mod_map_mods: true,
                        clear_locks: false,
                        latch_to_lock: false,
                    }),
                }],
                ..Group::default()
            })
            .build();
        let keymap = builder.build();
        let mut state = state_over(keymap);
        assert_eq!(state.key_get_one_sym(25), Keysym::from_name("w").unwrap());
        state.update_key(50, KeyDirection::Down);
        assert_eq!(state.key_get_one_sym(25), Keysym::from_name("W").unwrap());
        state.update_key(50, KeyDirection::Up);
        assert_eq!(state.key_get_one_sym(25), Keysym::from_name("w").unwrap());
    }
}
