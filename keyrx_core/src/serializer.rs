//! Canonical text serializer.
//!
//! Emits the single canonical "V1" rendering of a compiled [`Keymap`]: four
//! `xkb_keycodes`/`xkb_types`/`xkb_compatibility`/`xkb_symbols` blocks, one
//! statement per line, in a fixed field order per record. [`crate::reader`]
//! is this module's exact inverse for the subset it emits — round-tripping
//! a keymap through `serialize` then `crate::reader::read` reproduces the
//! same compiled state. Nothing else is guaranteed to parse; the full
//! historical XKB text grammar (geometry sections, legacy `//` merge
//! shorthand, multi-file include search) is out of scope.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::domain::aggregates::Keymap;
use crate::domain::entities::{
    Action, ComponentMask, GroupAction, IndicatorMap, KeyType, LedDefined, LockAffect, ModAction,
    SymInterpret,
};
use crate::domain::value_objects::{ModifierKind, Predicate};
use crate::keysym::Keysym;

/// Serializes every populated section of `keymap` into its canonical text
/// form, in keycodes/types/compat/symbols order.
pub fn serialize(keymap: &Keymap) -> String {
    let mut out = String::new();
    write_keycodes(keymap, &mut out);
    out.push('\n');
    write_types(keymap, &mut out);
    out.push('\n');
    write_compat(keymap, &mut out);
    out.push('\n');
    write_symbols(keymap, &mut out);
    out
}

fn name_of(keymap: &Keymap, atom: Option<crate::atom::Atom>) -> &str {
    atom.and_then(|a| keymap.atoms.text(a)).unwrap_or("")
}

fn text(keymap: &Keymap, atom: crate::atom::Atom) -> &str {
    keymap.atoms.text(atom).unwrap_or("")
}

fn write_keycodes(keymap: &Keymap, out: &mut String) {
    out.push_str(&format!(
        "xkb_keycodes \"{}\" {{\n",
        name_of(keymap, keymap.keycodes_name)
    ));
    for key in &keymap.keys {
        out.push_str(&format!("    <{}> = {};\n", text(keymap, key.name), key.keycode));
    }
    for (idx, slot) in keymap.indicators.iter().enumerate() {
        if let Some(led) = slot {
            out.push_str(&format!(
                "    indicator {} = \"{}\";\n",
                idx + 1,
                text(keymap, led.name)
            ));
        }
    }
    out.push_str("};\n");
}

fn write_types(keymap: &Keymap, out: &mut String) {
    out.push_str(&format!(
        "xkb_types \"{}\" {{\n",
        name_of(keymap, keymap.types_name)
    ));
    for modifier in &keymap.mods {
        if modifier.kind == ModifierKind::Virtual {
            out.push_str(&format!("    virtual_modifiers {};\n", text(keymap, modifier.name)));
        }
    }
    for ty in &keymap.types {
        write_type(keymap, ty, out);
    }
    out.push_str("};\n");
}

fn write_type(keymap: &Keymap, ty: &KeyType, out: &mut String) {
    out.push_str(&format!("    type \"{}\" {{\n", text(keymap, ty.name)));
    out.push_str(&format!("        modifiers = {};\n", mask_text(keymap, ty.mods)));
    for entry in &ty.map {
        if entry.level == 0 && entry.preserve.is_empty() {
            // The implicit default: redundant to reparse.
            continue;
        }
        out.push_str(&format!(
            "        map[{}] = Level{};\n",
            mask_text(keymap, entry.mods),
            entry.level + 1
        ));
        if !entry.preserve.is_empty() {
            out.push_str(&format!(
                "        preserve[{}] = {};\n",
                mask_text(keymap, entry.mods),
                mask_text(keymap, entry.preserve)
            ));
        }
    }
    for (idx, name) in ty.level_names.iter().enumerate() {
        if name.is_some() {
            out.push_str(&format!(
                "        level_name[{}] = \"{}\";\n",
                idx + 1,
                text(keymap, *name)
            ));
        }
    }
    out.push_str("    };\n");
}

fn write_compat(keymap: &Keymap, out: &mut String) {
    out.push_str(&format!(
        "xkb_compatibility \"{}\" {{\n",
        name_of(keymap, keymap.compat_name)
    ));
    out.push_str("    interpret.useModMapMods = AnyLevel;\n");
    out.push_str("    interpret.repeat = False;\n");
    for interp in &keymap.interprets {
        write_interp(keymap, interp, out);
    }
    for slot in keymap.indicators.iter() {
        if let Some(led) = slot {
            write_indicator(keymap, led, out);
        }
    }
    out.push_str("};\n");
}

fn write_interp(keymap: &Keymap, interp: &SymInterpret, out: &mut String) {
    let head = if interp.has_sym {
        format!(
            "{}+{}({})",
            interp.sym.name(),
            predicate_name(interp.predicate),
            mask_text(keymap, interp.mods)
        )
    } else {
        format!("+{}({})", predicate_name(interp.predicate), mask_text(keymap, interp.mods))
    };
    out.push_str(&format!("    interpret {} {{\n", head));
    out.push_str(&format!("        action = {};\n", action_text(keymap, &interp.action)));
    if let Some(vidx) = interp.virtual_mod {
        out.push_str(&format!(
            "        virtualModifier = {};\n",
            keymap.modifier_name(vidx).map(|a| text(keymap, a)).unwrap_or("")
        ));
    }
    out.push_str(&format!("        repeat = {};\n", bool_text(interp.repeat)));
    out.push_str(&format!(
        "        useModMapMods = {};\n",
        if interp.level_one_only { "level1" } else { "any" }
    ));
    out.push_str("    };\n");
}

fn write_indicator(keymap: &Keymap, led: &IndicatorMap, out: &mut String) {
    out.push_str(&format!("    indicator \"{}\" {{\n", text(keymap, led.name)));
    if led.defined.contains(LedDefined::MODS) {
        out.push_str(&format!("        modifiers = {};\n", mask_text(keymap, led.mods)));
    }
    if led.defined.contains(LedDefined::GROUPS) {
        out.push_str(&format!("        groups = {};\n", led.groups));
    }
    if led.defined.contains(LedDefined::CTRLS) {
        out.push_str(&format!("        controls = {};\n", led.ctrls));
    }
    if led.defined.contains(LedDefined::WHICH_MODS) {
        out.push_str(&format!(
            "        whichModState = {};\n",
            component_mask_text(led.which_mods)
        ));
    }
    if led.defined.contains(LedDefined::WHICH_GROUPS) {
        out.push_str(&format!(
            "        whichGroupState = {};\n",
            component_mask_text(led.which_groups)
        ));
    }
    out.push_str("    };\n");
}

fn write_symbols(keymap: &Keymap, out: &mut String) {
    out.push_str(&format!(
        "xkb_symbols \"{}\" {{\n",
        name_of(keymap, keymap.symbols_name)
    ));
    for (idx, name) in keymap.group_names.iter().enumerate() {
        if name.is_some() {
            out.push_str(&format!("    name[{}] = \"{}\";\n", idx + 1, text(keymap, *name)));
        }
    }
    for key in &keymap.keys {
        write_key(keymap, key, out);
    }
    out.push_str("};\n");
}

fn write_key(keymap: &Keymap, key: &crate::domain::entities::Key, out: &mut String) {
    out.push_str(&format!("    key <{}> {{\n", text(keymap, key.name)));
    if let Some(group) = key.groups.first() {
        if group.type_name.is_some() {
            out.push_str(&format!("        type = \"{}\";\n", text(keymap, group.type_name)));
        }
    }
    for (idx, group) in key.groups.iter().enumerate() {
        out.push_str(&format!(
            "        symbols[{}] = {};\n",
            idx + 1,
            levels_text(keymap, &group.levels)
        ));
        if let Some(first) = group.levels.first() {
            if first.action != Action::None {
                out.push_str(&format!(
                    "        actions[{}] = {};\n",
                    idx + 1,
                    action_text(keymap, &first.action)
                ));
            }
        }
    }
    out.push_str(&format!("        repeat = {};\n", bool_text(key.repeats)));
    if !key.vmodmap.is_empty() {
        out.push_str(&format!("        virtualMods = {};\n", mask_text(keymap, key.vmodmap)));
    }
    match key.out_of_range_group_action {
        crate::domain::entities::OutOfRangeGroupAction::Wrap => {}
        crate::domain::entities::OutOfRangeGroupAction::Saturate => {
            out.push_str("        groupsClamp = true;\n");
        }
        crate::domain::entities::OutOfRangeGroupAction::Redirect => {
            out.push_str(&format!(
                "        groupsRedirect = {};\n",
                key.out_of_range_group_number
            ));
        }
    }
    out.push_str("    };\n");
}

/// Renders a group's levels as `[ entry, entry, ... ]`, one entry per
/// level, matching the original writer's per-level iteration.
fn levels_text(keymap: &Keymap, levels: &[crate::domain::entities::Level]) -> String {
    let _ = keymap;
    let rendered: Vec<String> = levels.iter().map(|level| level_entry_text(&level.syms)).collect();
    format!("[ {} ]", rendered.join(", "))
}

/// A level with no keysyms renders as `NoSymbol`, exactly one as the bare
/// name, and more than one wrapped in `{ ... }`.
fn level_entry_text(syms: &[Keysym]) -> String {
    match syms {
        [] => "NoSymbol".to_string(),
        [single] => single.name(),
        many => format!(
            "{{ {} }}",
            many.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn mask_text(keymap: &Keymap, mask: crate::domain::value_objects::ModMask) -> String {
    if mask.is_empty() {
        return "none".to_string();
    }
    if mask == keymap.real_mods_mask() {
        return "all".to_string();
    }
    let names: Vec<String> = keymap
        .mods
        .iter()
        .enumerate()
        .filter(|(idx, _)| mask.0 & (1 << idx) != 0)
        .map(|(_, m)| text(keymap, m.name).to_string())
        .collect();
    names.join("+")
}

fn component_mask_text(mask: ComponentMask) -> String {
    let mut parts = Vec::new();
    if mask.contains(ComponentMask::BASE) {
        parts.push("base");
    }
    if mask.contains(ComponentMask::LATCHED) {
        parts.push("latched");
    }
    if mask.contains(ComponentMask::LOCKED) {
        parts.push("locked");
    }
    if mask.contains(ComponentMask::EFFECTIVE) {
        parts.push("effective");
    }
    if parts.is_empty() {
        parts.push("base");
    }
    parts.join("+")
}

fn predicate_name(p: Predicate) -> &'static str {
    match p {
        Predicate::AnyOfOrNone => "AnyOfOrNone",
        Predicate::AnyOf => "AnyOf",
        Predicate::NoneOf => "NoneOf",
        Predicate::AllOf => "AllOf",
        Predicate::Exactly => "Exactly",
        Predicate::Any => "Any",
    }
}

fn bool_text(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn signed_text(value: i32, absolute: bool) -> String {
    if absolute {
        format!("{}", value)
    } else if value < 0 {
        format!("{}", value)
    } else {
        format!("+{}", value)
    }
}

fn group_action_text(name: &str, action: &GroupAction) -> String {
    if action.absolute {
        format!("{}(group={})", name, action.group + 1)
    } else {
        format!("{}(group={})", name, signed_text(action.group, false))
    }
}

fn mod_action_text(keymap: &Keymap, name: &str, action: &ModAction) -> String {
    let mut args = Vec::new();
    if !action.use_mod_map_mods {
        args.push(format!("modifiers={}", mask_text(keymap, crate::domain::value_objects::ModMask(action.mods))));
    }
    if action.clear_locks {
        args.push("clearLocks=true".to_string());
    }
    if action.latch_to_lock {
        args.push("latchToLock=true".to_string());
    }
    format!("{}({})", name, args.join(", "))
}

fn action_text(keymap: &Keymap, action: &Action) -> String {
    match action {
        Action::None => "NoAction".to_string(),
        Action::ModSet(m) => mod_action_text(keymap, "SetMods", m),
        Action::ModLatch(m) => mod_action_text(keymap, "LatchMods", m),
        Action::ModLock(m) => mod_action_text(keymap, "LockMods", m),
        Action::GroupSet(g) => group_action_text("SetGroup", g),
        Action::GroupLatch(g) => group_action_text("LatchGroup", g),
        Action::GroupLock(g) => group_action_text("LockGroup", g),
        Action::PtrMove(p) => format!(
            "MovePtr(x={}, y={}, accel={})",
            signed_text(p.x, p.absolute_x),
            signed_text(p.y, p.absolute_y),
            bool_text(!p.no_accel)
        ),
        Action::PtrButton(b) | Action::PtrLock(b) => {
            let name = if matches!(action, Action::PtrLock(_)) {
                "LockPtrBtn"
            } else {
                "PtrBtn"
            };
            format!(
                "{}(button={}, count={}, affect={})",
                name,
                b.button.unwrap_or(0),
                b.count,
                lock_affect_text(b.affect)
            )
        }
        Action::PtrDefault(d) => format!("SetPtrDflt(value={})", signed_text(d.value, d.absolute)),
        Action::SwitchVt(s) => format!(
            "SwitchScreen(screen={}, same={})",
            signed_text(s.screen, true),
            bool_text(s.same_server)
        ),
        Action::CtrlSet(c) => format!(
            "SetControls(controls={})",
            mask_text(keymap, crate::domain::value_objects::ModMask(c.ctrls))
        ),
        Action::CtrlLock(c) => format!(
            "LockControls(controls={})",
            mask_text(keymap, crate::domain::value_objects::ModMask(c.ctrls))
        ),
        Action::Terminate => "Terminate()".to_string(),
        Action::Private(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("Private(data=0x{})", hex)
        }
    }
}

fn lock_affect_text(affect: LockAffect) -> &'static str {
    match affect {
        LockAffect::Both => "both",
        LockAffect::Lock => "lock",
        LockAffect::Unlock => "unlock",
        LockAffect::Neither => "neither",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Group, Key, Level};

    #[test]
    fn serialize_emits_all_four_section_headers() {
        let keymap = Keymap::new();
        let text = serialize(&keymap);
        assert!(text.contains("xkb_keycodes"));
        assert!(text.contains("xkb_types"));
        assert!(text.contains("xkb_compatibility"));
        assert!(text.contains("xkb_symbols"));
    }

    #[test]
    fn serialize_emits_key_keycode_line() {
        let mut keymap = Keymap::new();
        let esc = keymap.intern("ESC");
        keymap.keys.push(Key {
            name: esc,
            keycode: 9,
            groups: alloc::vec![Group {
                type_name: crate::atom::Atom::NONE,
                explicit_type: false,
                levels: alloc::vec![Level {
                    syms: alloc::vec![Keysym::from_name("Escape").unwrap()],
                    action: Action::None,
                }],
            }],
            ..Default::default()
        });
        let text = serialize(&keymap);
        assert!(text.contains("<ESC> = 9;"));
        assert!(text.contains("Escape"));
    }

    #[test]
    fn mask_text_renders_all_keyword() {
        let keymap = Keymap::new();
        assert_eq!(mask_text(&keymap, keymap.real_mods_mask()), "all");
        assert_eq!(mask_text(&keymap, crate::domain::value_objects::ModMask::NONE), "none");
    }
}
