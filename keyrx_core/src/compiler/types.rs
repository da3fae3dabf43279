//! Types section compiler.
//!
//! `virtual_modifiers` declarations and `type "NAME" { ... }` blocks,
//! validated against the §3 `KeyType` invariants.

use alloc::string::ToString;
use alloc::vec::Vec;

use crate::ast::{Expr, TypeDef};
use crate::atom::Atom;
use crate::domain::aggregates::Keymap;
use crate::domain::entities::{KeyType, TypeMapEntry};
use crate::domain::events::{Diagnostic, DiagnosticBus};
use crate::domain::value_objects::{MergeMode, ModMask};
use crate::error::{CoreError, CoreResult};
use crate::expr::Evaluator;

#[derive(Debug, Clone, Default)]
pub struct TypesFile {
    pub name: Option<Atom>,
    pub virtual_modifiers: Vec<Atom>,
    pub types: Vec<TypeDef>,
}

pub fn compile(
    file: &TypesFile,
    file_id: u32,
    _merge: MergeMode,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
) -> CoreResult<()> {
    if keymap.types_name.is_none() {
        keymap.types_name = file.name;
    }
    for name in &file.virtual_modifiers {
        keymap.install_virtual_modifier(*name);
    }

    for def in &file.types {
        match compile_one_type(def, file_id, keymap) {
            Ok(ty) => {
                if let Some(existing) = keymap.types.iter_mut().find(|t| t.name == ty.name) {
                    *existing = ty;
                } else {
                    keymap.types.push(ty);
                }
            }
            Err(err) => diagnostics.publish(Diagnostic::from_error(file_id, &err)),
        }
    }
    keymap.version += 1;
    Ok(())
}

fn compile_one_type(def: &TypeDef, file_id: u32, keymap: &Keymap) -> CoreResult<KeyType> {
    let evaluator = Evaluator::new(&keymap.atoms, keymap);
    let mut ty = KeyType {
        name: def.name,
        mods: ModMask::NONE,
        num_levels: 1,
        map: Vec::new(),
        level_names: Vec::new(),
    };
    for var in &def.body {
        let lhs = var.name.as_ref().ok_or_else(|| CoreError::BadType {
            expected: "field reference",
            context: "type body".to_string(),
        })?;
        let (_, field, index) = evaluator.resolve_lhs(lhs)?;
        match field.to_ascii_lowercase().as_str() {
            "modifiers" => ty.mods = ModMask(evaluator.resolve_mask(&var.value)?),
            "map" => {
                let index_expr = index.ok_or(CoreError::NotAnArray("map".to_string()))?;
                let mods = ModMask(evaluator.resolve_mask(index_expr)?);
                let level = resolve_level(&var.value, &evaluator)?;
                ty.map.push(TypeMapEntry {
                    mods,
                    level,
                    preserve: ModMask::NONE,
                });
                ty.num_levels = ty.num_levels.max(level + 1);
            }
            "preserve" => {
                let index_expr = index.ok_or(CoreError::NotAnArray("preserve".to_string()))?;
                let mods = ModMask(evaluator.resolve_mask(index_expr)?);
                let preserve = ModMask(evaluator.resolve_mask(&var.value)?);
                if let Some(entry) = ty.map.iter_mut().find(|e| e.mods == mods) {
                    entry.preserve = preserve;
                }
            }
            "levelname" | "level_name" => {
                let level = index
                    .map(|e| evaluator.resolve_integer(e))
                    .transpose()?
                    .unwrap_or(1) as u32;
                let name_atom = resolve_level_name_atom(&var.value)?;
                while ty.level_names.len() < level as usize {
                    ty.level_names.push(Atom::NONE);
                }
                if level > 0 {
                    ty.level_names[(level - 1) as usize] = name_atom;
                }
                ty.num_levels = ty.num_levels.max(level);
            }
            other => return Err(CoreError::UnknownField(other.to_string())),
        }
    }

    for entry in &ty.map {
        if !ty.mods.contains(entry.mods) {
            return Err(CoreError::BadType {
                expected: "map entry mask is a subset of the type's modifiers",
                context: keymap.atoms.text(def.name).unwrap_or("<type>").to_string(),
            });
        }
        if !entry.mods.contains(entry.preserve) {
            return Err(CoreError::BadType {
                expected: "preserve mask is a subset of its map entry's modifiers",
                context: keymap.atoms.text(def.name).unwrap_or("<type>").to_string(),
            });
        }
    }
    let _ = file_id;
    Ok(ty)
}

/// `Level<n>` identifiers resolve to `n - 1`.
fn resolve_level(expr: &Expr, evaluator: &Evaluator<'_>) -> CoreResult<u32> {
    if let Ok(name) = evaluator.resolve_string(expr) {
        if let Some(digits) = name.strip_prefix("Level") {
            if let Ok(n) = digits.parse::<u32>() {
                return Ok(n.saturating_sub(1));
            }
        }
    }
    Ok(evaluator.resolve_integer(expr)? as u32)
}

fn resolve_level_name_atom(expr: &Expr) -> CoreResult<Atom> {
    match expr {
        Expr::Str(atom) | Expr::Ident(atom) => Ok(*atom),
        _ => Err(CoreError::BadType {
            expected: "string",
            context: "level name".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{MergeMode as AstMergeMode, VarDef};
    use alloc::vec;

    #[test]
    fn simple_type_with_one_map_entry_validates() {
        let mut keymap = Keymap::new();
        let shift = keymap.intern("Shift");
        let one_level = keymap.intern("ONE_LEVEL");
        let level2 = keymap.intern("Level2");
        let def = TypeDef {
            name: one_level,
            merge: AstMergeMode::Default,
            body: vec![
                VarDef {
                    name: Some(Expr::Ident(keymap.intern("modifiers"))),
                    value: Expr::Ident(shift),
                },
                VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: keymap.intern("map"),
                        index: alloc::boxed::Box::new(Expr::Ident(shift)),
                    }),
                    value: Expr::Ident(level2),
                },
            ],
        };
        let file = TypesFile {
            name: None,
            virtual_modifiers: Vec::new(),
            types: vec![def],
        };
        compile(&file, 1, MergeMode::Default, &mut keymap, &mut DiagnosticBus::new()).unwrap();
        let ty = keymap.find_type_by_name(one_level).unwrap();
        assert_eq!(ty.mods.0, 1);
        assert_eq!(ty.map[0].level, 1);
    }

    #[test]
    fn map_entry_outside_type_mods_is_rejected() {
        let mut keymap = Keymap::new();
        let shift = keymap.intern("Shift");
        let lock = keymap.intern("Lock");
        let bad = keymap.intern("BAD");
        let level2 = keymap.intern("Level2");
        let def = TypeDef {
            name: bad,
            merge: AstMergeMode::Default,
            body: vec![
                VarDef {
                    name: Some(Expr::Ident(keymap.intern("modifiers"))),
                    value: Expr::Ident(shift),
                },
                VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: keymap.intern("map"),
                        index: alloc::boxed::Box::new(Expr::Ident(lock)),
                    }),
                    value: Expr::Ident(level2),
                },
            ],
        };
        let file = TypesFile {
            name: None,
            virtual_modifiers: Vec::new(),
            types: vec![def],
        };
        let mut diagnostics = DiagnosticBus::new();
        compile(&file, 1, MergeMode::Default, &mut keymap, &mut diagnostics).unwrap();
        assert!(keymap.find_type_by_name(bad).is_none());
        assert_eq!(diagnostics.error_count(), 1);
    }
}
