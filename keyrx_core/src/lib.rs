#![no_std]

//! keyrx_core - keyboard-map compiler, serializer and runtime state machine.
//!
//! This crate compiles XKB-style keymap components (keycodes, types,
//! compatibility interpretations, symbols) into an in-memory keymap, can
//! re-emit that keymap as canonical text, and drives a per-device state
//! machine from key events. It is `no_std` so it can run on any target that
//! can provide an allocator, the same way this crate always has.

extern crate alloc;

pub mod ast;
pub mod atom;
pub mod compiler;
pub mod domain;
pub mod error;
pub mod expr;
pub mod keysym;
pub mod reader;
pub mod runtime;
pub mod serializer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use atom::{Atom, AtomTable};
pub use domain::aggregates::Keymap;
pub use error::{CoreError, CoreResult};
pub use keysym::Keysym;

#[cfg(test)]
mod tests {
    #[test]
    fn it_works() {
        assert_eq!(2 + 2, 4);
    }
}
