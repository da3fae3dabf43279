//! Symbols section compiler.
//!
//! Group names, per-key symbol/action blocks (both the `simple` single-group
//! form and the full attributed form) and `modifier_map` declarations.

use alloc::string::ToString;
use alloc::vec::Vec;

use crate::ast::{Expr, KeyDef};
use crate::atom::Atom;
use crate::domain::aggregates::Keymap;
use crate::domain::entities::{Action, Group, Key, KeyExplicit, Level, OutOfRangeGroupAction};
use crate::domain::events::{Diagnostic, DiagnosticBus};
use crate::domain::value_objects::{MergeMode, ModMask};
use crate::error::{CoreError, CoreResult};
use crate::expr::{Evaluator, ModNamespace, ModifierLookup};
use crate::keysym::Keysym;

#[derive(Debug, Clone, Default)]
pub struct SymbolsFile {
    pub name: Option<Atom>,
    /// `name[groupN]="NAME";`
    pub group_names: Vec<(u32, Atom)>,
    pub keys: Vec<KeyDef>,
    /// `modifier_map NAME { <KEY>, <KEY> };`
    pub modifier_maps: Vec<(Atom, Vec<Atom>)>,
}

pub fn compile(
    file: &SymbolsFile,
    file_id: u32,
    _merge: MergeMode,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
) -> CoreResult<()> {
    if keymap.symbols_name.is_none() {
        keymap.symbols_name = file.name;
    }
    for (group_num, name) in &file.group_names {
        let idx = (*group_num as usize).saturating_sub(1);
        while keymap.group_names.len() <= idx {
            keymap.group_names.push(Atom::NONE);
        }
        keymap.group_names[idx] = *name;
    }

    for def in &file.keys {
        if let Err(err) = compile_one_key(def, file_id, keymap) {
            diagnostics.publish(Diagnostic::from_error(file_id, &err));
        }
    }

    for (map_name, members) in &file.modifier_maps {
        let name_text = keymap.atoms.text(*map_name).unwrap_or("").to_string();
        let index = keymap.modifier_index(&name_text, ModNamespace::Both);
        let Some(index) = index else {
            diagnostics.publish(Diagnostic::warning(
                file_id,
                "modifier_map references an undeclared modifier name",
            ));
            continue;
        };
        for member in members {
            if let Some(key) = keymap.keys.iter_mut().find(|k| k.name == *member) {
                key.modmap = key.modmap | ModMask(1 << index);
            }
        }
    }

    keymap.version += 1;
    Ok(())
}

fn compile_one_key(def: &KeyDef, file_id: u32, keymap: &mut Keymap) -> CoreResult<()> {
    let evaluator = Evaluator::new(&keymap.atoms, &*keymap);
    let mut key = keymap
        .find_key_index_by_name(def.name)
        .map(|idx| keymap.keys[idx].clone())
        .unwrap_or_else(|| {
            let mut k = Key::default();
            k.name = def.name;
            k
        });

    for var in &def.body {
        match &var.name {
            None => {
                // Simple form: the body is a bare `[ entry, entry, ... ]`
                // list, one entry per level, for group 1 of a single-group
                // key.
                let levels = resolve_sym_levels(&var.value, &evaluator)?;
                if key.groups.is_empty() {
                    key.groups.push(Group {
                        type_name: Atom::NONE,
                        explicit_type: false,
                        levels: alloc::vec![Level::empty()],
                    });
                }
                set_group_levels(&mut key.groups[0], levels);
            }
            Some(lhs) => {
                let (_, field, index) = evaluator.resolve_lhs(lhs)?;
                match field.to_ascii_lowercase().as_str() {
                    "type" => {
                        let name = evaluator.resolve_string(&var.value)?;
                        let atom = keymap
                            .atoms
                            .find(name)
                            .ok_or_else(|| CoreError::UndefinedName(name.to_string()))?;
                        ensure_group(&mut key, 0);
                        key.groups[0].type_name = atom;
                        key.groups[0].explicit_type = true;
                        key.explicit.set(KeyExplicit::TYPE);
                    }
                    "symbols" => {
                        let group = resolve_group_index(index)?;
                        ensure_group(&mut key, group);
                        let levels = resolve_sym_levels(&var.value, &evaluator)?;
                        set_group_levels(&mut key.groups[group], levels);
                        let ty = keymap.find_type_by_name(key.groups[group].type_name);
                        if let Some(ty) = ty {
                            ensure_levels(&mut key.groups[group], ty.num_levels as usize);
                        }
                    }
                    "actions" => {
                        let group = resolve_group_index(index)?;
                        ensure_group(&mut key, group);
                        let action = evaluator.resolve_action(&var.value)?;
                        if let Some(first) = key.groups[group].levels.first_mut() {
                            first.action = action;
                        }
                        key.explicit.set(KeyExplicit::INTERP);
                    }
                    "repeat" => {
                        key.repeats = evaluator.resolve_boolean(&var.value)?;
                        key.explicit.set(KeyExplicit::REPEAT);
                    }
                    "virtualmods" | "virtualmodifiers" => {
                        key.vmodmap = ModMask(evaluator.resolve_mask(&var.value)?);
                        key.explicit.set(KeyExplicit::VMODMAP);
                    }
                    "groupsclamp" => {
                        key.out_of_range_group_action = OutOfRangeGroupAction::Saturate;
                    }
                    "groupsredirect" => {
                        key.out_of_range_group_action = OutOfRangeGroupAction::Redirect;
                        key.out_of_range_group_number = evaluator.resolve_integer(&var.value)? as u32;
                    }
                    other => return Err(CoreError::UnknownField(other.to_string())),
                }
            }
        }
    }

    if let Some(idx) = keymap.find_key_index_by_name(def.name) {
        keymap.keys[idx] = key;
    } else {
        keymap.keys.push(key);
    }
    let _ = file_id;
    Ok(())
}

fn ensure_group(key: &mut Key, group: usize) {
    while key.groups.len() <= group {
        key.groups.push(Group {
            type_name: Atom::NONE,
            explicit_type: false,
            levels: alloc::vec![Level::empty()],
        });
    }
}

fn ensure_levels(group: &mut Group, width: usize) {
    while group.levels.len() < width {
        group.levels.push(Level::empty());
    }
}

/// Replaces `group`'s levels with one [`Level`] per entry of a resolved
/// `[ entry, entry, ... ]` symbol list, preserving nothing from whatever
/// levels the group held before (a fresh `symbols[Group]=`/bare-bracket
/// statement redefines the whole group).
fn set_group_levels(group: &mut Group, levels: Vec<Vec<Keysym>>) {
    group.levels = levels
        .into_iter()
        .map(|syms| Level {
            syms,
            action: Action::None,
        })
        .collect();
    if group.levels.is_empty() {
        group.levels.push(Level::empty());
    }
}

/// `symbols[GroupN]`/`actions[GroupN]` indices are parsed upstream as plain
/// integers by the reader; `GroupN` itself never reaches this module.
fn resolve_group_index(index: Option<&Expr>) -> CoreResult<usize> {
    match index {
        None => Ok(0),
        Some(Expr::Integer(n)) => Ok((*n as usize).saturating_sub(1)),
        Some(_) => Err(CoreError::BadType {
            expected: "group index",
            context: "symbols[group]".to_string(),
        }),
    }
}

/// Resolves a parsed `[ entry, entry, ... ]` symbol list into one keysym
/// vector per level, in level order.
fn resolve_sym_levels(expr: &Expr, evaluator: &Evaluator<'_>) -> CoreResult<Vec<Vec<Keysym>>> {
    match expr {
        Expr::SymList(levels) => levels
            .iter()
            .map(|level| level.iter().map(|e| evaluator.resolve_keysym(e)).collect())
            .collect(),
        _ => Err(CoreError::BadType {
            expected: "keysym list",
            context: "key symbols".to_string(),
        }),
    }
}
