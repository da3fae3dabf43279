//! Property-based coverage of two invariants the state machine and
//! assembler must hold for any input: consumed-modifier masks never grow
//! beyond the mask queried, and compiling an `AUGMENT` source twice is the
//! same as compiling it once. Uses `proptest` over small generated
//! fixtures, one property per test.

use keyrx_core::compiler::assembler::Assembler;
use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::domain::value_objects::ModMask;
use keyrx_core::reader;
use keyrx_core::runtime::state::State;
use keyrx_core::serializer;
use proptest::prelude::*;
use std::rc::Rc;

const TWO_LEVEL_SHIFT: &str = r#"
xkb_keycodes "t" {
    <AD01> = 24;
};
xkb_types "t" {
    type "TWO_LEVEL" {
        modifiers = Shift;
        map[Shift] = Level2;
        level_name[1] = "Base";
        level_name[2] = "Shift";
    };
};
xkb_compatibility "t" {
};
xkb_symbols "t" {
    key <AD01> { type = "TWO_LEVEL", [ q, Q ] };
};
"#;

fn compile(src: &str) -> Keymap {
    let mut keymap = Keymap::new();
    let sections = reader::read(src, &mut keymap).expect("fixture must parse");
    Assembler::new()
        .assemble(&sections, &mut keymap)
        .expect("fixture must assemble");
    keymap
}

proptest! {
    /// `mod_mask_remove_consumed(state, kc, m) subseteq m` for every real
    /// modifier mask `m`.
    #[test]
    fn remove_consumed_never_adds_bits(raw_query in 0u32..256) {
        let keymap = Rc::new(compile(TWO_LEVEL_SHIFT));
        let keycode = keymap.find_key_by_name(keymap.atoms.find("AD01").unwrap()).unwrap().keycode;
        let state = State::new(keymap);

        let query = ModMask(raw_query & 0xFF);
        let result = state.mod_mask_remove_consumed(keycode, query);
        prop_assert_eq!(result.0 & !query.0, 0, "remove_consumed introduced bits outside the query mask");
    }

    /// Compiling the same source twice under `Augment` merge leaves the
    /// keymap's canonical text identical to compiling it once: every field
    /// the first compile defined is already `defined`, so the second
    /// compile's fields never win (the `Augment` merge discipline).
    #[test]
    fn augment_recompile_is_idempotent(level2_name in "[A-Za-z]{1,8}") {
        let src = format!(
            r#"
xkb_keycodes "t" {{
    <AD01> = 24;
}};
xkb_types "t" {{
    type "TWO_LEVEL" {{
        modifiers = Shift;
        map[Shift] = Level2;
        level_name[1] = "Base";
        level_name[2] = "{level2_name}";
    }};
}};
xkb_compatibility "t" {{
}};
xkb_symbols "t" {{
    key <AD01> {{ type = "TWO_LEVEL", [ q, Q ] }};
}};
"#
        );

        let once = compile(&src);
        let once_text = serializer::serialize(&once);

        let mut twice_keymap = Keymap::new();
        let sections = reader::read(&src, &mut twice_keymap).unwrap();
        Assembler::new().assemble(&sections, &mut twice_keymap).unwrap();
        // Reassemble the same sections (all `Default`, which behaves as
        // `Augment` once every field is already defined) a second time.
        Assembler::new().assemble(&sections, &mut twice_keymap).unwrap();
        let twice_text = serializer::serialize(&twice_keymap);

        prop_assert_eq!(once_text, twice_text);
    }
}
