//! Per-session keyboard state.
//!
//! A `Keymap` is data; a [`state::State`] is the thing that actually tracks
//! which modifiers and layout are currently active and turns key events into
//! resolved symbols. One state machine serves one input stream; callers that
//! need independent streams (two virtual keyboards, a test harness driving
//! several scenarios) construct one `State` per stream over a shared,
//! `Rc`-cloned keymap.

pub mod state;

pub use state::{GroupComponents, KeyDirection, ModComponents, State};
