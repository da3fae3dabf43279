//! Keymap assembler.
//!
//! Drives the four section compilers in the fixed order keycodes, types,
//! compat, symbols, then finalizes the result: resolving virtual modifiers
//! to real-modifier masks, widening per-key `explicit` bookkeeping, and
//! running interpret application (`ApplyInterpsToKey` in `xkbcomp/symbols.c`)
//! to fill in whatever actions/vmodmap/repeat bits the symbols section left
//! unset.

use alloc::vec::Vec;

use crate::atom::Atom;
use crate::compiler::{compat, keycodes, symbols, types};
use crate::compiler::compat::IncludeResolver;
use crate::compiler::keycodes::KeycodesFile;
use crate::compiler::symbols::SymbolsFile;
use crate::compiler::types::TypesFile;
use crate::ast::CompatMapFile;
use crate::domain::aggregates::{Keymap, Modifier, NUM_REAL_MODS};
use crate::domain::entities::{Action, KeyExplicit};
use crate::domain::events::DiagnosticBus;
use crate::domain::value_objects::{MergeMode, ModMask, ModifierKind};
use crate::error::CoreResult;

/// One section file plus the bookkeeping the assembler needs to compile it.
pub struct Section<T> {
    pub file: T,
    pub file_id: u32,
    pub merge: MergeMode,
}

impl<T> Section<T> {
    pub fn new(file: T, file_id: u32, merge: MergeMode) -> Self {
        Section { file, file_id, merge }
    }
}

/// The (optional) four component files a keymap is assembled from. A keymap
/// need not define every section; whichever are present compile in the
/// fixed order, each building on the tables the previous ones established.
#[derive(Default)]
pub struct Sections {
    pub keycodes: Option<Section<KeycodesFile>>,
    pub types: Option<Section<TypesFile>>,
    pub compat: Option<Section<CompatMapFile>>,
    pub symbols: Option<Section<SymbolsFile>>,
}

pub struct Assembler<'a> {
    resolver: Option<&'a dyn IncludeResolver>,
}

impl<'a> Default for Assembler<'a> {
    fn default() -> Self {
        Assembler { resolver: None }
    }
}

impl<'a> Assembler<'a> {
    pub fn new() -> Self {
        Assembler::default()
    }

    pub fn with_resolver(resolver: &'a dyn IncludeResolver) -> Self {
        Assembler {
            resolver: Some(resolver),
        }
    }

    /// Compiles `sections` into `keymap`, then finalizes it. `keymap` is the
    /// same table the caller interned every section's atoms into (typically
    /// via [`crate::reader`]) — the assembler never starts a fresh atom
    /// table of its own, matching each section compiler's own contract.
    /// Stops at the first section that fails outright; each section's own
    /// internal warnings and recoverable errors are still recorded on the
    /// returned diagnostics bus.
    pub fn assemble(&self, sections: &Sections, keymap: &mut Keymap) -> CoreResult<DiagnosticBus> {
        let mut diagnostics = DiagnosticBus::new();

        if let Some(section) = &sections.keycodes {
            keycodes::compile(
                &section.file,
                section.file_id,
                section.merge,
                keymap,
                &mut diagnostics,
            )?;
        }
        if let Some(section) = &sections.types {
            types::compile(
                &section.file,
                section.file_id,
                section.merge,
                keymap,
                &mut diagnostics,
            )?;
        }
        if let Some(section) = &sections.compat {
            compat::compile(
                &section.file,
                section.file_id,
                section.merge,
                keymap,
                &mut diagnostics,
                self.resolver,
            )?;
        }
        if let Some(section) = &sections.symbols {
            symbols::compile(
                &section.file,
                section.file_id,
                section.merge,
                keymap,
                &mut diagnostics,
            )?;
        }

        finalize(keymap);
        Ok(diagnostics)
    }
}

fn finalize(keymap: &mut Keymap) {
    assign_default_types(keymap);
    widen_explicit_type_flags(keymap);
    resolve_virtual_modifier_mappings(keymap);
    apply_interprets(keymap);
    keymap.version += 1;
}

/// A group left without an explicit type defaults by level count, the way
/// `xkbcomp`'s `FindAutomaticType` picks `ONE_LEVEL`/`TWO_LEVEL` for the
/// common cases (alphabetic/keypad heuristics are out of scope here).
fn assign_default_types(keymap: &mut Keymap) {
    let one_level = keymap.intern("ONE_LEVEL");
    let two_level = keymap.intern("TWO_LEVEL");
    for key in &mut keymap.keys {
        for group in &mut key.groups {
            if group.type_name.is_some() {
                continue;
            }
            group.type_name = if group.levels.len() <= 1 {
                one_level
            } else {
                two_level
            };
        }
    }
}

fn widen_explicit_type_flags(keymap: &mut Keymap) {
    for key in &mut keymap.keys {
        if key.groups.iter().any(|g| g.explicit_type) {
            key.explicit.set(KeyExplicit::TYPE);
        }
    }
}

/// A virtual modifier's real-mod mapping is the union of the real modifiers
/// on every key whose `vmodmap` carries that virtual modifier's bit
/// (`xkbcomp/vmod.c`'s `ResolveVirtualModifier` resolution strategy).
fn resolve_virtual_modifier_mappings(keymap: &mut Keymap) {
    let real_mask = keymap.real_mods_mask();
    let num_mods = keymap.mods.len();
    let mut mapping = alloc::vec![ModMask::NONE; num_mods];
    for key in &keymap.keys {
        let real_bits = ModMask(key.modmap.0 & real_mask.0);
        if real_bits.is_empty() {
            continue;
        }
        for idx in NUM_REAL_MODS..num_mods {
            if key.vmodmap.0 & (1 << idx) != 0 {
                mapping[idx] = mapping[idx] | real_bits;
            }
        }
    }
    for (idx, modifier) in keymap.mods.iter_mut().enumerate() {
        if modifier.kind == ModifierKind::Virtual {
            modifier.mapping = mapping[idx];
        }
    }
}

fn resolve_vmods(vmodmap: ModMask, mods: &[Modifier]) -> ModMask {
    mods.iter()
        .enumerate()
        .filter(|(idx, m)| m.kind == ModifierKind::Virtual && vmodmap.0 & (1 << idx) != 0)
        .fold(ModMask::NONE, |acc, (_, m)| acc | m.mapping)
}

/// Scans each key's levels against the keymap's (already most-specific-first
/// ordered) interpret list and fills in whatever the symbols section left
/// unset: a level's action, the key's vmodmap contribution, and repeat.
/// Symbol-bearing interprets match a level by its single keysym; symbol-less
/// interprets only ever match level 0 (`xkbcomp/symbols.c`'s
/// `FindInterpForKey` restricts unconditional interprets to the first shift
/// level).
fn apply_interprets(keymap: &mut Keymap) {
    let interprets = keymap.interprets.clone();
    let mods_table = keymap.mods.clone();
    let real_mask = keymap.real_mods_mask();

    for key in &mut keymap.keys {
        let explicit = key.explicit;
        let real_from_modmap = ModMask(key.modmap.0 & real_mask.0);
        let real_from_vmodmap = resolve_vmods(key.vmodmap, &mods_table);
        let effective = real_from_modmap | real_from_vmodmap;

        let mut matched_repeat: Option<bool> = None;
        let mut vmod_acc = ModMask::NONE;

        for group in &mut key.groups {
            for (level_idx, level) in group.levels.iter_mut().enumerate() {
                let sym = level.one_sym();
                for interp in &interprets {
                    let sym_matches = if interp.has_sym {
                        sym == Some(interp.sym)
                    } else {
                        level_idx == 0
                    };
                    if !sym_matches || !interp.predicate.matches(effective, interp.mods) {
                        continue;
                    }

                    if !explicit.contains(KeyExplicit::INTERP) && level.action == Action::None {
                        level.action = interp.action;
                    }
                    if let Some(vidx) = interp.virtual_mod {
                        vmod_acc = vmod_acc | ModMask(1 << vidx);
                    }
                    if matched_repeat.is_none() {
                        matched_repeat = Some(interp.repeat);
                    }
                    break;
                }
            }
        }

        if !explicit.contains(KeyExplicit::VMODMAP) {
            key.vmodmap = key.vmodmap | vmod_acc;
        }
        if !explicit.contains(KeyExplicit::REPEAT) {
            if let Some(repeat) = matched_repeat {
                key.repeats = repeat;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, InterpDef, KeyDef, KeycodeDef, MergeMode as AstMergeMode, Statement, VarDef};
    use crate::domain::value_objects::Predicate;
    use crate::keysym::Keysym;
    use alloc::vec;

    #[test]
    fn assemble_runs_all_four_sections_in_order() {
        let mut keymap = Keymap::new();
        let esc = keymap.intern("ESC ");
        let escape_sym = keymap.intern("Escape");
        let action_field = keymap.intern("action");
        let action_name = keymap.intern("SetMods");
        let mods_field = keymap.intern("modifiers");
        let shift_name = keymap.intern("Shift");

        let keycodes = KeycodesFile {
            name: None,
            keycodes: vec![KeycodeDef {
                name: esc,
                keycode: 9,
            }],
            indicators: Vec::new(),
            aliases: Vec::new(),
        };
        let compat_file = CompatMapFile {
            name: None,
            statements: vec![Statement::Interp(InterpDef {
                sym: Keysym::from_name("Escape"),
                predicate: None,
                merge: AstMergeMode::Override,
                body: vec![VarDef {
                    name: Some(Expr::Ident(action_field)),
                    value: Expr::ActionDecl {
                        name: action_name,
                        args: vec![(mods_field, Expr::Ident(shift_name))],
                    },
                }],
            })],
        };
        let symbols_file = SymbolsFile {
            name: None,
            group_names: Vec::new(),
            keys: vec![KeyDef {
                name: esc,
                merge: AstMergeMode::Default,
                body: vec![VarDef {
                    name: None,
                    value: Expr::Ident(escape_sym),
                }],
            }],
            modifier_maps: Vec::new(),
        };

        let sections = Sections {
            keycodes: Some(Section::new(keycodes, 1, MergeMode::Default)),
            types: None,
            compat: Some(Section::new(compat_file, 2, MergeMode::Override)),
            symbols: Some(Section::new(symbols_file, 3, MergeMode::Default)),
        };

        let assembler = Assembler::new();
        assembler.assemble(&sections, &mut keymap).unwrap();

        let key = keymap.find_key_by_name(esc).unwrap();
        assert_eq!(key.keycode, 9);
        assert_eq!(key.groups[0].type_name, keymap.atoms.find("ONE_LEVEL").unwrap());
        match key.groups[0].levels[0].action {
            Action::ModSet(m) => assert_eq!(m.mods, 1),
            other => panic!("interpret application did not fire: {:?}", other),
        }
    }

    #[test]
    fn virtual_modifier_mapping_resolves_from_key_modmaps() {
        let mut keymap = Keymap::new();
        let numlock = keymap.intern("NumLock");
        let vidx = keymap.install_virtual_modifier(numlock);
        let mut key = crate::domain::entities::Key::default();
        key.name = keymap.intern("KP0 ");
        key.modmap = ModMask(1 << 3); // Mod1
        key.vmodmap = ModMask(1 << vidx);
        keymap.keys.push(key);

        resolve_virtual_modifier_mappings(&mut keymap);

        let modifier = keymap.mods[vidx as usize];
        assert_eq!(modifier.mapping.0, 1 << 3);
    }

    #[test]
    fn symbol_less_interpret_only_matches_level_zero() {
        let mut keymap = Keymap::new();
        let mut key = crate::domain::entities::Key::default();
        key.name = keymap.intern("AB01");
        key.groups.push(crate::domain::entities::Group {
            type_name: Atom::NONE,
            explicit_type: false,
            levels: vec![
                crate::domain::entities::Level::empty(),
                crate::domain::entities::Level::empty(),
            ],
        });
        keymap.keys.push(key);
        keymap.interprets.push(crate::domain::entities::SymInterpret {
            sym: Keysym::NO_SYMBOL,
            has_sym: false,
            predicate: Predicate::AnyOfOrNone,
            mods: ModMask::NONE,
            virtual_mod: None,
            action: Action::Terminate,
            level_one_only: false,
            repeat: false,
            defined: Default::default(),
            merge: MergeMode::Default,
            file_id: 1,
        });

        apply_interprets(&mut keymap);

        let key = &keymap.keys[0];
        assert_eq!(key.groups[0].levels[0].action, Action::Terminate);
        assert_eq!(key.groups[0].levels[1].action, Action::None);
    }
}
