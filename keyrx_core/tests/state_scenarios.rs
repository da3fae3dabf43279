//! Behavioral coverage for the live state machine: a locking
//! toggle action, a type-driven level switch, a multi-symbol level, and
//! consumed-modifier removal under a chord. Keymaps are wired directly
//! through the `testing` fixture builders rather than canonical text, since
//! these scenarios turn on the state machine's reaction to a given compiled
//! shape, not the reader/serializer.

use keyrx_core::domain::entities::{Action, ComponentMask, Group, IndicatorMap, Level, ModAction};
use keyrx_core::domain::value_objects::{MergeMode, ModMask};
use keyrx_core::keysym::Keysym;
use keyrx_core::runtime::KeyDirection;
use keyrx_core::testing::{state_over, KeymapBuilder};

const SHIFT: u32 = 0;
const LOCK: u32 = 1;

#[test]
fn caps_lock_key_toggles_the_lock_modifier_on_successive_presses() {
    let mut builder = KeymapBuilder::new();
    builder
        .key("CAPS", 66)
        .group(Group {
            levels: vec![Level {
                syms: Vec::new(),
                action: Action::ModLock(ModAction {
                    mods: 1 << LOCK,
                    use_mod_map_mods: false,
                    clear_locks: false,
                    latch_to_lock: false,
                }),
            }],
            ..Default::default()
        })
        .build();
    let mut keymap = builder.build();
    keymap.indicators[0] = Some(IndicatorMap {
        name: keymap.intern("Caps Lock"),
        which_mods: ComponentMask::LOCKED,
        mods: ModMask(1 << LOCK),
        which_groups: ComponentMask::NONE,
        groups: 0,
        ctrls: 0,
        defined: Default::default(),
        merge: MergeMode::Default,
        file_id: 0,
    });
    let mut state = state_over(keymap);

    assert!(!state.mod_is_active(LOCK, ComponentMask::LOCKED));
    assert_eq!(state.led_mask(), 0);

    state.update_key(66, KeyDirection::Down);
    state.update_key(66, KeyDirection::Up);
    assert!(state.mod_is_active(LOCK, ComponentMask::LOCKED));
    assert_eq!(state.led_mask(), 1);

    state.update_key(66, KeyDirection::Down);
    state.update_key(66, KeyDirection::Up);
    assert!(!state.mod_is_active(LOCK, ComponentMask::LOCKED));
    assert_eq!(state.led_mask(), 0);
}

#[test]
fn shift_key_selects_the_uppercase_level_of_a_two_level_key() {
    let mut builder = KeymapBuilder::new();
    let shift = ModMask(1 << SHIFT);
    let two_level = builder.two_level_type("TWO_LEVEL", shift);
    builder
        .key("AD01", 24)
        .group(Group {
            type_name: two_level,
            levels: vec![
                Level {
                    syms: vec![Keysym::from_name("q").unwrap()],
                    action: Action::default(),
                },
                Level {
                    syms: vec![Keysym::from_name("Q").unwrap()],
                    action: Action::default(),
                },
            ],
            ..Default::default()
        })
        .build();
    builder
        .key("LFSH", 50)
        .vmodmap(shift)
        .group(Group {
            levels: vec![Level {
                syms: Vec::new(),
                action: Action::ModSet(ModAction {
                    mods: 0,
                    use_mod_map_mods: true,
                    clear_locks: false,
                    latch_to_lock: false,
                }),
            }],
            ..Default::default()
        })
        .build();
    let mut state = state_over(builder.build());

    assert_eq!(state.key_get_one_sym(24), Keysym::from_name("q").unwrap());
    state.update_key(50, KeyDirection::Down);
    assert_eq!(state.key_get_one_sym(24), Keysym::from_name("Q").unwrap());
    state.update_key(50, KeyDirection::Up);
    assert_eq!(state.key_get_one_sym(24), Keysym::from_name("q").unwrap());
}

#[test]
fn a_level_carrying_several_alternate_keysyms_has_no_single_symbol() {
    let mut builder = KeymapBuilder::new();
    builder
        .key("GREET", 40)
        .syms(&["H", "E", "L", "L", "O"])
        .build();
    let state = state_over(builder.build());

    assert_eq!(
        state.key_get_syms(40),
        &[
            Keysym::from_name("H").unwrap(),
            Keysym::from_name("E").unwrap(),
            Keysym::from_name("L").unwrap(),
            Keysym::from_name("L").unwrap(),
            Keysym::from_name("O").unwrap(),
        ]
    );
    assert_eq!(state.key_get_one_sym(40), Keysym::NO_SYMBOL);
}

#[test]
fn the_shift_that_selected_a_level_is_removed_from_a_consumed_mask() {
    let mut builder = KeymapBuilder::new();
    let shift = ModMask(1 << SHIFT);
    let two_level = builder.two_level_type("TWO_LEVEL", shift);
    builder
        .key("AD01", 24)
        .group(Group {
            type_name: two_level,
            levels: vec![
                Level {
                    syms: vec![Keysym::from_name("q").unwrap()],
                    action: Action::default(),
                },
                Level {
                    syms: vec![Keysym::from_name("Q").unwrap()],
                    action: Action::default(),
                },
            ],
            ..Default::default()
        })
        .build();
    let state = state_over(builder.build());

    let chord = ModMask((1 << SHIFT) | (1 << LOCK));
    let remaining = state.mod_mask_remove_consumed(24, chord);
    assert_eq!(remaining, ModMask(1 << LOCK));
}
