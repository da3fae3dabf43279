//! Keymap assembler and section compilers.
//!
//! Section compilers are thin and proportionate; the compat compiler
//! (`compat`) is the most involved and carries the bulk of this module's
//! logic.

pub mod assembler;
pub mod compat;
pub mod keycodes;
pub mod symbols;
pub mod types;

pub use assembler::Assembler;
pub use compat::IncludeResolver;
