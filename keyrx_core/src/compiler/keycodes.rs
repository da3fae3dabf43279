//! Keycodes section compiler.
//!
//! Proportionate depth: keycode declarations, indicator pre-registration
//! and key-name aliases. Not a general XKB keycodes grammar — those are
//! named by the scoped canonical-format reader (§4.3.1), which is the only
//! producer of the AST this module consumes.

use alloc::string::ToString;
use alloc::vec::Vec;

use crate::ast::{AliasDef, KeycodeDef};
use crate::domain::aggregates::Keymap;
use crate::domain::entities::{ComponentMask, IndicatorMap, LedDefined};
use crate::domain::events::{Diagnostic, DiagnosticBus};
use crate::domain::value_objects::{MergeMode, ModMask};
use crate::error::CoreResult;

/// A pre-parsed keycodes section: keycode declarations, `indicator N =
/// "NAME";` pre-registrations and key-name aliases.
#[derive(Debug, Clone, Default)]
pub struct KeycodesFile {
    pub name: Option<crate::atom::Atom>,
    pub keycodes: Vec<KeycodeDef>,
    pub indicators: Vec<(u32, crate::atom::Atom)>,
    pub aliases: Vec<AliasDef>,
}

pub fn compile(
    file: &KeycodesFile,
    file_id: u32,
    _merge: MergeMode,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
) -> CoreResult<()> {
    if keymap.keycodes_name.is_none() {
        keymap.keycodes_name = file.name;
    }
    for def in &file.keycodes {
        if let Some(existing) = keymap.find_key_by_keycode_mut(def.keycode) {
            existing.name = def.name;
        } else {
            let mut key = crate::domain::entities::Key::default();
            key.name = def.name;
            key.keycode = def.keycode;
            keymap.keys.push(key);
        }
    }

    for (index, name) in &file.indicators {
        let slot = (*index as usize).wrapping_sub(1);
        if slot >= crate::domain::aggregates::MAX_INDICATORS {
            diagnostics.publish(Diagnostic::error(
                file_id,
                "indicator index out of range (capacity 32)".to_string(),
            ));
            continue;
        }
        if keymap.indicators[slot].is_none() {
            keymap.indicators[slot] = Some(IndicatorMap {
                name: *name,
                which_mods: ComponentMask::NONE,
                mods: ModMask::NONE,
                which_groups: ComponentMask::NONE,
                groups: 0,
                ctrls: 0,
                defined: LedDefined::default(),
                merge: MergeMode::Default,
                file_id,
            });
        }
    }

    for alias in &file.aliases {
        if let Some(real_idx) = keymap.find_key_index_by_name(alias.real) {
            let real_keycode = keymap.keys[real_idx].keycode;
            if keymap.find_key_by_name(alias.alias).is_none() {
                let mut key = crate::domain::entities::Key::default();
                key.name = alias.alias;
                key.keycode = real_keycode;
                keymap.keys.push(key);
            }
        } else {
            diagnostics.publish(Diagnostic::warning(
                file_id,
                "alias target key was never declared".to_string(),
            ));
        }
    }

    keymap.version += 1;
    Ok(())
}
