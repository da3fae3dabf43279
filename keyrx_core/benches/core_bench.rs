//! Criterion benchmarks for the canonical text pipeline and state machine.
//!
//! Covers the three stages a consumer actually pays for: atom interning (the
//! table every section compiler goes through), compiling a moderately sized
//! keymap from canonical text (reader + assembler), and driving the state
//! machine's `update_key` dispatch loop once a keymap is built.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyrx_core::atom::AtomTable;
use keyrx_core::compiler::assembler::Assembler;
use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::reader;
use keyrx_core::runtime::{KeyDirection, State};
use keyrx_core::serializer;
use std::rc::Rc;

const KEYSYMS: &[&str] = &[
    "a", "b", "e", "h", "l", "o", "q", "A", "B", "E", "H", "L", "O", "Q", "0", "1", "5", "6",
];

const KEY_COUNT: u32 = 64;

fn build_fixture_text() -> String {
    let mut keycodes = String::new();
    let mut symbols = String::new();
    for i in 0..KEY_COUNT {
        let keycode = 9 + i;
        let sym = KEYSYMS[i as usize % KEYSYMS.len()];
        keycodes.push_str(&format!("    <K{i}> = {keycode};\n"));
        symbols.push_str(&format!("    key <K{i}> {{ [ {sym} ] }};\n"));
    }

    let caps_keycode = 9 + KEY_COUNT;
    format!(
        r#"xkb_keycodes "bench" {{
{keycodes}    <CAPS> = {caps_keycode};
    indicator 1 = "Caps Lock";
}};
xkb_types "bench" {{
    type "TWO_LEVEL" {{
        modifiers = Shift;
        map[Shift] = Level2;
    }};
}};
xkb_compatibility "bench" {{
    interpret Caps_Lock+AnyOf(all) {{
        action = LockMods(modifiers=Lock);
    }};
    indicator "Caps Lock" {{
        whichModState = Locked;
        modifiers = Lock;
    }};
}};
xkb_symbols "bench" {{
{symbols}    key <CAPS> {{ [ Caps_Lock ] }};
}};
"#
    )
}

fn compile_fixture(text: &str) -> Keymap {
    let mut keymap = Keymap::new();
    let sections = reader::read(text, &mut keymap).expect("fixture must parse");
    Assembler::new()
        .assemble(&sections, &mut keymap)
        .expect("fixture must assemble");
    keymap
}

fn benchmark_atom_intern(c: &mut Criterion) {
    c.bench_function("atom_intern_fresh_names", |b| {
        b.iter(|| {
            let mut table = AtomTable::new();
            for i in 0..KEY_COUNT {
                black_box(table.intern(&format!("K{i}")));
            }
        })
    });

    c.bench_function("atom_intern_repeated_name", |b| {
        let mut table = AtomTable::new();
        b.iter(|| {
            black_box(table.intern("Shift"));
        })
    });
}

fn benchmark_compile(c: &mut Criterion) {
    let text = build_fixture_text();

    c.bench_function("reader_read", |b| {
        b.iter(|| {
            let mut keymap = Keymap::new();
            let sections = reader::read(black_box(&text), &mut keymap).unwrap();
            black_box(sections);
        })
    });

    c.bench_function("reader_and_assembler", |b| {
        b.iter(|| black_box(compile_fixture(black_box(&text))))
    });
}

fn benchmark_serialize_round_trip(c: &mut Criterion) {
    let text = build_fixture_text();
    let keymap = compile_fixture(&text);

    c.bench_function("serialize", |b| {
        b.iter(|| black_box(serializer::serialize(black_box(&keymap))))
    });

    let serialized = serializer::serialize(&keymap);
    c.bench_function("serialize_then_read", |b| {
        b.iter(|| {
            let mut reparsed = Keymap::new();
            let sections = reader::read(black_box(&serialized), &mut reparsed).unwrap();
            Assembler::new().assemble(&sections, &mut reparsed).unwrap();
            black_box(reparsed);
        })
    });
}

fn benchmark_state_update_key(c: &mut Criterion) {
    let text = build_fixture_text();
    let keymap = Rc::new(compile_fixture(&text));

    c.bench_function("state_update_key_down_up", |b| {
        let mut state = State::new(keymap.clone());
        b.iter(|| {
            state.update_key(black_box(9), KeyDirection::Down);
            state.update_key(black_box(9), KeyDirection::Up);
        })
    });

    c.bench_function("state_caps_lock_toggle", |b| {
        let mut state = State::new(keymap.clone());
        b.iter(|| {
            state.update_key(black_box(9 + KEY_COUNT), KeyDirection::Down);
            black_box(state.led_mask());
        })
    });
}

criterion_group!(
    benches,
    benchmark_atom_intern,
    benchmark_compile,
    benchmark_serialize_round_trip,
    benchmark_state_update_key
);
criterion_main!(benches);
