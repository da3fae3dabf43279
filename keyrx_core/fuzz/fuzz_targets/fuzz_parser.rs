#![no_main]

use keyrx_core::compiler::assembler::Assembler;
use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::reader;
use libfuzzer_sys::fuzz_target;

// The reader should never panic on arbitrary input: it either returns a
// parsed set of sections or a CoreError::ParseError. Malformed canonical
// text that happens to parse should also assemble without panicking, even
// if assembly reports diagnostics.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let mut keymap = Keymap::new();
        if let Ok(sections) = reader::read(text, &mut keymap) {
            let _ = Assembler::new().assemble(&sections, &mut keymap);
        }
    }
});
