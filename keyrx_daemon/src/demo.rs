//! Synthetic event script replay.
//!
//! A rules-resolution layer and live device enumeration sit outside the
//! core's scope as external collaborators it relies on but does not
//! implement. This module is that collaborator for the demo binary: it
//! turns a small text script of named evdev keys into the
//! `(keycode, direction)` pairs `keyrx_core::runtime::state::State::update_key`
//! expects, and narrates the resulting modifier/layout/LED transitions the
//! way a real input pipeline's debug log would.

use std::fmt;
use std::rc::Rc;

use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::domain::entities::ComponentMask;
use keyrx_core::runtime::state::{KeyDirection, State};
use keyrx_core::Keysym;
use thiserror::Error;

/// Linux evdev code offset applied to every event in a script.
pub const EVDEV_OFFSET: u32 = 8;

/// Evdev key names recognised by [`parse_event_script`]. Not exhaustive — a real rules-resolution layer
/// would carry the full `linux/input-event-codes.h` table; this is the
/// proportionate subset the demo's own fixtures and tests exercise.
const EVDEV_NAMES: &[(&str, u32)] = &[
    ("KEY_ESC", 1),
    ("KEY_1", 2),
    ("KEY_2", 3),
    ("KEY_3", 4),
    ("KEY_4", 5),
    ("KEY_5", 6),
    ("KEY_6", 7),
    ("KEY_7", 8),
    ("KEY_8", 9),
    ("KEY_9", 10),
    ("KEY_0", 11),
    ("KEY_MINUS", 12),
    ("KEY_EQUAL", 13),
    ("KEY_Q", 16),
    ("KEY_TAB", 15),
    ("KEY_LEFTCTRL", 29),
    ("KEY_LEFTSHIFT", 42),
    ("KEY_RIGHTSHIFT", 54),
    ("KEY_CAPSLOCK", 58),
    ("KEY_RIGHTALT", 100),
    ("KEY_RIGHTCTRL", 97),
    ("KEY_NUMLOCK", 69),
    ("KEY_KP1", 79),
    ("KEY_KP2", 80),
    ("KEY_KP3", 81),
    ("KEY_COMPOSE", 127),
];

fn evdev_code(name: &str) -> Option<u32> {
    EVDEV_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventScriptError {
    #[error("line {line}: expected \"DOWN|UP <KEY_NAME|keycode>\", found {text:?}")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unknown direction {word:?} (expected DOWN or UP)")]
    BadDirection { line: usize, word: String },

    #[error("line {line}: unknown evdev key name {name:?}")]
    UnknownKeyName { line: usize, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u32,
    pub direction: KeyDirection,
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self.direction {
            KeyDirection::Down => "DOWN",
            KeyDirection::Up => "UP",
        };
        write!(f, "{word} {}", self.keycode)
    }
}

/// Parses a script of `DOWN <name>` / `UP <name>` lines (blank lines and
/// `#`-prefixed comments ignored) into key events. `<name>` is either one
/// of [`EVDEV_NAMES`] (offset by [`EVDEV_OFFSET`] to get the keymap
/// keycode) or a bare integer keymap keycode.
pub fn parse_event_script(text: &str) -> Result<Vec<KeyEvent>, EventScriptError> {
    let mut events = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = idx + 1;
        let mut words = line.split_whitespace();
        let (Some(word), Some(key), None) = (words.next(), words.next(), words.next()) else {
            return Err(EventScriptError::Malformed {
                line: line_no,
                text: line.to_string(),
            });
        };
        let direction = match word {
            "DOWN" => KeyDirection::Down,
            "UP" => KeyDirection::Up,
            other => {
                return Err(EventScriptError::BadDirection {
                    line: line_no,
                    word: other.to_string(),
                })
            }
        };
        let keycode = if let Ok(raw) = key.parse::<u32>() {
            raw
        } else {
            evdev_code(key)
                .ok_or_else(|| EventScriptError::UnknownKeyName {
                    line: line_no,
                    name: key.to_string(),
                })?
                + EVDEV_OFFSET
        };
        events.push(KeyEvent { keycode, direction });
    }
    Ok(events)
}

/// A post-event snapshot of the state machine, narrated for the log.
#[derive(Debug, Clone)]
pub struct Transition {
    pub event: KeyEvent,
    pub effective_mods: u32,
    pub effective_group: i32,
    pub syms: Vec<Keysym>,
    pub active_indicators: Vec<String>,
}

/// Replays `events` against a fresh [`State`] over `keymap`, logging each
/// transition through the `log` facade and returning the full trace for
/// callers (and tests) that want to assert on it.
pub fn run(keymap: Rc<Keymap>, events: &[KeyEvent]) -> Vec<Transition> {
    let mut state = State::new(keymap);
    let mut trace = Vec::with_capacity(events.len());

    for &event in events {
        state.update_key(event.keycode, event.direction);

        let syms = state.key_get_syms(event.keycode).to_vec();
        let active_indicators = state
            .keymap()
            .indicators
            .iter()
            .flatten()
            .filter(|led| state.indicator_is_lit(led))
            .filter_map(|led| state.keymap().atoms.text(led.name))
            .map(str::to_string)
            .collect::<Vec<_>>();

        log::info!(
            "{event} -> mods={:#010x} group={} syms={:?} leds={:?}",
            state.effective_mods().0,
            state.effective_group(),
            syms,
            active_indicators,
        );

        trace.push(Transition {
            event,
            effective_mods: state.effective_mods().0,
            effective_group: state.effective_group(),
            syms,
            active_indicators,
        });
    }

    trace
}

/// Convenience used by [`run`]'s log line and available to callers that
/// just want the locked/latched/effective split without a full trace.
pub fn mods_snapshot(state: &State) -> (u32, u32, u32) {
    (
        state.serialize_mods(ComponentMask::BASE).0,
        state.serialize_mods(ComponentMask::LATCHED).0,
        state.serialize_mods(ComponentMask::LOCKED).0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_numeric_events() {
        let events = parse_event_script(
            "# comment\nDOWN KEY_CAPSLOCK\n\nUP KEY_CAPSLOCK\nDOWN 42\n",
        )
        .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].keycode, 58 + EVDEV_OFFSET);
        assert_eq!(events[0].direction, KeyDirection::Down);
        assert_eq!(events[1].direction, KeyDirection::Up);
        assert_eq!(events[2].keycode, 42);
    }

    #[test]
    fn rejects_unknown_key_name() {
        let err = parse_event_script("DOWN KEY_DOES_NOT_EXIST").unwrap_err();
        assert!(matches!(err, EventScriptError::UnknownKeyName { .. }));
    }

    #[test]
    fn rejects_bad_direction() {
        let err = parse_event_script("SIDEWAYS KEY_Q").unwrap_err();
        assert!(matches!(err, EventScriptError::BadDirection { .. }));
    }

    #[test]
    fn rejects_malformed_line() {
        let err = parse_event_script("DOWN").unwrap_err();
        assert!(matches!(err, EventScriptError::Malformed { .. }));
    }

    fn sample_keymap_text() -> &'static str {
        r#"xkb_keycodes "t" {
    <CAPS> = 66;
    indicator 1 = "Caps Lock";
};
xkb_types "t" {
    type "ONE_LEVEL" {
        modifiers= none;
        level_name[Level1]= "Any";
    };
};
xkb_compatibility "t" {
    interpret.useModMapMods= AnyLevel;
    interpret.repeat= False;
    interpret Caps_Lock+AnyOf(all) {
        action= LockMods(modifiers=Lock);
    };
    indicator "Caps Lock" {
        whichModState= Locked;
        modifiers= Lock;
    };
};
xkb_symbols "t" {
    key <CAPS> { [ Caps_Lock ] };
};
"#
    }

    #[test]
    fn run_locks_caps_and_lights_the_indicator() {
        let text = sample_keymap_text();
        let mut keymap = Keymap::new();
        let sections = keyrx_core::reader::read(text, &mut keymap).unwrap();
        keyrx_core::compiler::assembler::Assembler::new()
            .assemble(&sections, &mut keymap)
            .unwrap();
        let keymap = Rc::new(keymap);

        let caps = keymap.find_key_by_name(keymap.atoms.find("CAPS").unwrap()).unwrap();
        let keycode = caps.keycode;

        let events = vec![
            KeyEvent {
                keycode,
                direction: KeyDirection::Down,
            },
            KeyEvent {
                keycode,
                direction: KeyDirection::Up,
            },
        ];
        let trace = run(keymap, &events);
        assert_eq!(trace.len(), 2);
        assert!(trace[1].active_indicators.contains(&"Caps Lock".to_string()));
    }
}
