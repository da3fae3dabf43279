#![no_main]

use std::rc::Rc;

use keyrx_core::compiler::assembler::Assembler;
use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::reader;
use keyrx_core::runtime::{KeyDirection, State};
use libfuzzer_sys::fuzz_target;

const FIXTURE: &str = r#"
xkb_keycodes "fuzz" {
    <CAPS> = 66;
    <LFSH> = 50;
    <AD01> = 24;
    indicator 1 = "Caps Lock";
};
xkb_types "fuzz" {
    type "TWO_LEVEL" {
        modifiers = Shift;
        map[Shift] = Level2;
    };
};
xkb_compatibility "fuzz" {
    interpret Caps_Lock+AnyOf(all) {
        action = LockMods(modifiers=Lock);
    };
    indicator "Caps Lock" {
        whichModState = Locked;
        modifiers = Lock;
    };
};
xkb_symbols "fuzz" {
    key <CAPS> { [ Caps_Lock ] };
    modifier_map Shift { <LFSH> };
    key <LFSH> { actions[1] = SetMods(); };
    key <AD01> { type = "TWO_LEVEL"; symbols[1] = [ q, Q ]; };
};
"#;

fn build_fixture() -> Keymap {
    let mut keymap = Keymap::new();
    let sections = reader::read(FIXTURE, &mut keymap).expect("fixture must parse");
    Assembler::new()
        .assemble(&sections, &mut keymap)
        .expect("fixture must assemble");
    keymap
}

// Drives the state machine with an arbitrary sequence of (keycode, direction)
// pairs over a small fixed keymap. The state machine must never panic,
// regardless of how interleaved the up/down events are.
fuzz_target!(|data: &[u8]| {
    let keymap = Rc::new(build_fixture());
    let mut state = State::new(keymap);

    for chunk in data.chunks(2) {
        if chunk.len() < 2 {
            break;
        }
        let keycode = [66u32, 50, 24][chunk[0] as usize % 3];
        let direction = if chunk[1] % 2 == 0 {
            KeyDirection::Down
        } else {
            KeyDirection::Up
        };
        state.update_key(keycode, direction);

        let _ = state.effective_mods();
        let _ = state.effective_group();
        let _ = state.led_mask();
    }
});
