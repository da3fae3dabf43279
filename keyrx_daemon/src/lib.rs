//! `keyrx_daemon`: a synthetic-event demo that drives a compiled keymap's
//! state machine end to end and narrates the resulting transitions.
//!
//! A full input pipeline would have device I/O, IPC, a web dashboard and
//! platform backends sitting in front of this. This binary keeps only the
//! one piece every one of those surfaces ultimately calls into: replaying
//! key events through [`keyrx_core::runtime::state::State`].

pub mod demo;
pub mod error;
