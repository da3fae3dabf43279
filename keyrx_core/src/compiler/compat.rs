//! Compat-map compiler.
//!
//! Merges `interpret`/`indicator`/`virtual_modifiers` statements under the
//! five merge modes, resolves predicates against real modifier masks, and
//! copies the result into the keymap's interpret list and indicator table
//! in the most-specific-first order the rest of the pipeline treats as a
//! load-bearing contract. Grounded throughout on `xkbcomp/compat.c`'s `FindMatchingInterp`
//! / `UseNewInterpField` / `AddInterp` / `AddIndicatorMap` / `CopyInterps` /
//! `CopyIndicatorMapDefs` / `CopyCompatToKeymap`.

use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::ast::{
    CompatMapFile, Expr, IncludeStmt, IndicatorMapDef, InterpDef, MergeMode as AstMergeMode,
    Statement, VarDef,
};
use crate::atom::Atom;
use crate::domain::aggregates::Keymap;
use crate::domain::entities::{
    ComponentMask, IndicatorMap, InterpretDefined, LedDefined, SymInterpret,
};
use crate::domain::events::{Diagnostic, DiagnosticBus};
use crate::domain::value_objects::{MergeMode, ModMask, Predicate};
use crate::error::{CoreError, CoreResult};
use crate::expr::{Evaluator, ModNamespace};
use crate::keysym::Keysym;

/// Resolves an `include` statement's path to the component it names.
/// Filesystem/rules-resolution search is the excluded external collaborator
///; this trait is the seam a caller plugs a resolver into.
pub trait IncludeResolver {
    fn resolve(&self, path: &str) -> Option<CompatMapFile>;
}

/// A per-file error counter exceeding this many per-statement failures
/// aborts compilation of that file.
const MAX_ERRORS_PER_FILE: u32 = 10;

#[derive(Debug, Clone)]
struct CompatState {
    default_interp: SymInterpret,
    default_led: IndicatorMap,
    interps: Vec<SymInterpret>,
    leds: Vec<IndicatorMap>,
    error_count: u32,
}

impl CompatState {
    fn new(file_id: u32) -> Self {
        CompatState {
            default_interp: SymInterpret {
                sym: Keysym::NO_SYMBOL,
                has_sym: false,
                predicate: Predicate::AnyOfOrNone,
                mods: ModMask::NONE,
                virtual_mod: None,
                action: Default::default(),
                level_one_only: false,
                repeat: false,
                defined: InterpretDefined::default(),
                merge: MergeMode::Default,
                file_id,
            },
            default_led: IndicatorMap {
                name: Atom::NONE,
                which_mods: ComponentMask::NONE,
                mods: ModMask::NONE,
                which_groups: ComponentMask::NONE,
                groups: 0,
                ctrls: 0,
                defined: LedDefined::default(),
                merge: MergeMode::Default,
                file_id,
            },
            interps: Vec::new(),
            leds: Vec::new(),
            error_count: 0,
        }
    }
}

/// Compiles one compat-map file (including any nested includes resolved via
/// `resolver`) into `keymap`, under `ambient_merge`. This is the section
/// compiler the assembler drives: `compile(file, keymap,
/// merge_mode) -> ok`.
pub fn compile(
    file: &CompatMapFile,
    file_id: u32,
    ambient_merge: MergeMode,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
    resolver: Option<&dyn IncludeResolver>,
) -> CoreResult<()> {
    let mut state = CompatState::new(file_id);
    if keymap.compat_name.is_none() {
        keymap.compat_name = file.name;
    }
    run_statements(file, file_id, ambient_merge, keymap, diagnostics, resolver, &mut state)?;
    copy_to_keymap(state.interps, state.leds, keymap, diagnostics);
    if state.error_count > 0 {
        return Err(CoreError::TooManyErrors {
            file: file
                .name
                .and_then(|n| keymap.atoms.text(n))
                .unwrap_or("<compat>")
                .to_string(),
            count: state.error_count as usize,
        });
    }
    Ok(())
}

fn run_statements(
    file: &CompatMapFile,
    file_id: u32,
    ambient_merge: MergeMode,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
    resolver: Option<&dyn IncludeResolver>,
    state: &mut CompatState,
) -> CoreResult<()> {
    for stmt in &file.statements {
        let result = match stmt {
            Statement::VMod(v) => {
                for name in &v.names {
                    keymap.install_virtual_modifier(*name);
                }
                Ok(())
            }
            Statement::Var(v) => handle_global_var(v, keymap, diagnostics, file_id, state),
            Statement::Interp(def) => handle_interp(def, ambient_merge, file_id, keymap, diagnostics, state),
            Statement::IndicatorMap(def) => {
                handle_indicator(def, ambient_merge, file_id, keymap, diagnostics, state)
            }
            Statement::Include(inc) => {
                handle_include(inc, file_id, ambient_merge, keymap, diagnostics, resolver, state)
            }
        };
        if let Err(err) = result {
            diagnostics.publish(Diagnostic::from_error(file_id, &err));
            state.error_count += 1;
            if state.error_count > MAX_ERRORS_PER_FILE {
                return Err(CoreError::TooManyErrors {
                    file: file
                        .name
                        .and_then(|n| keymap.atoms.text(n))
                        .unwrap_or("<compat>")
                        .to_string(),
                    count: state.error_count as usize,
                });
            }
        }
    }
    Ok(())
}

fn handle_global_var(
    var: &VarDef,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
    file_id: u32,
    state: &mut CompatState,
) -> CoreResult<()> {
    let lhs = var
        .name
        .as_ref()
        .ok_or_else(|| CoreError::BadType {
            expected: "elem.field",
            context: "global variable".to_string(),
        })?;
    let evaluator = Evaluator::new(&keymap.atoms, keymap);
    let (element, field, _index) = evaluator.resolve_lhs(lhs)?;
    match element {
        Some("interpret") => {
            apply_interp_field(field, &var.value, &evaluator, &mut state.default_interp)
        }
        Some("indicator") => apply_led_field(
            field,
            &var.value,
            &evaluator,
            &mut state.default_led,
            diagnostics,
            file_id,
        ),
        _ => {
            diagnostics.publish(Diagnostic::warning(
                file_id,
                format!("ignoring unrecognised global variable '{}'", field),
            ));
            Ok(())
        }
    }
}

fn handle_interp(
    def: &InterpDef,
    ambient_merge: MergeMode,
    file_id: u32,
    keymap: &Keymap,
    diagnostics: &mut DiagnosticBus,
    state: &mut CompatState,
) -> CoreResult<()> {
    let evaluator = Evaluator::new(&keymap.atoms, keymap);
    let (predicate, mods) = match &def.predicate {
        None => (Predicate::AnyOfOrNone, keymap.real_mods_mask()),
        Some((p, mask_expr)) => (
            ast_predicate_to_domain(*p),
            ModMask(evaluator.resolve_mask(mask_expr)?),
        ),
    };
    let mut rec = state.default_interp.clone();
    rec.sym = def.sym.unwrap_or(Keysym::NO_SYMBOL);
    rec.has_sym = def.sym.is_some();
    rec.predicate = predicate;
    rec.mods = mods;
    rec.merge = resolve_merge(def.merge, ambient_merge);
    rec.file_id = file_id;
    rec.defined = InterpretDefined::default();
    for body_var in &def.body {
        let (field, value) = body_field(body_var, &evaluator)?;
        apply_interp_field(field, value, &evaluator, &mut rec)?;
    }
    add_interp(&mut state.interps, rec, diagnostics);
    Ok(())
}

fn handle_indicator(
    def: &IndicatorMapDef,
    ambient_merge: MergeMode,
    file_id: u32,
    keymap: &Keymap,
    diagnostics: &mut DiagnosticBus,
    state: &mut CompatState,
) -> CoreResult<()> {
    let evaluator = Evaluator::new(&keymap.atoms, keymap);
    let mut rec = state.default_led;
    rec.name = def.name;
    rec.merge = resolve_merge(def.merge, ambient_merge);
    rec.file_id = file_id;
    rec.defined = LedDefined::default();
    for body_var in &def.body {
        let (field, value) = body_field(body_var, &evaluator)?;
        apply_led_field(field, value, &evaluator, &mut rec, diagnostics, file_id)?;
    }
    add_indicator(&mut state.leds, rec, diagnostics);
    Ok(())
}

fn handle_include(
    inc: &IncludeStmt,
    file_id: u32,
    ambient_merge: MergeMode,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
    resolver: Option<&dyn IncludeResolver>,
    state: &mut CompatState,
) -> CoreResult<()> {
    let mut first = keymap.compat_name.is_none();
    let mut link = Some(inc);
    while let Some(cur) = link {
        let merge = resolve_merge(cur.merge, ambient_merge);
        match resolver {
            None => {
                diagnostics.publish(Diagnostic::warning(
                    file_id,
                    "include statement ignored: no include resolver configured",
                ));
            }
            Some(resolver) => {
                let path_text = keymap.atoms.text(cur.path).unwrap_or("").to_string();
                match resolver.resolve(&path_text) {
                    None => {
                        diagnostics.publish(Diagnostic::warning(
                            file_id,
                            format!("include target '{}' could not be resolved", path_text),
                        ));
                    }
                    Some(included) => {
                        let mut inner = CompatState::new(file_id);
                        run_statements(&included, file_id, merge, keymap, diagnostics, Some(resolver), &mut inner)?;
                        if first {
                            if let Some(name) = included.name {
                                keymap.compat_name = Some(name);
                            }
                            first = false;
                        }
                        for mut interp in inner.interps {
                            interp.merge = merge;
                            add_interp(&mut state.interps, interp, diagnostics);
                        }
                        for mut led in inner.leds {
                            led.merge = merge;
                            add_indicator(&mut state.leds, led, diagnostics);
                        }
                        state.error_count += inner.error_count;
                    }
                }
            }
        }
        link = cur.next.as_deref();
    }
    Ok(())
}

/// `Default` resolves to whatever merge mode the enclosing file/include
/// established (DESIGN.md Open Question 3); everything else is already
/// concrete.
fn resolve_merge(merge: AstMergeMode, ambient: MergeMode) -> MergeMode {
    match merge {
        AstMergeMode::Default => ambient,
        other => other.into(),
    }
}

fn ast_predicate_to_domain(p: crate::ast::Predicate) -> Predicate {
    match p {
        crate::ast::Predicate::AnyOfOrNone => Predicate::AnyOfOrNone,
        crate::ast::Predicate::AnyOf => Predicate::AnyOf,
        crate::ast::Predicate::NoneOf => Predicate::NoneOf,
        crate::ast::Predicate::AllOf => Predicate::AllOf,
        crate::ast::Predicate::Exactly => Predicate::Exactly,
        crate::ast::Predicate::Any => Predicate::Any,
    }
}

/// Resolves a body statement's field name, whether it was written with an
/// explicit (dot-free) left-hand side or as a bare assignment.
fn body_field<'a>(var: &'a VarDef, evaluator: &Evaluator<'_>) -> CoreResult<(&'a str, &'a Expr)> {
    match &var.name {
        Some(lhs) => {
            let (_, field, _) = evaluator.resolve_lhs(lhs)?;
            Ok((field, &var.value))
        }
        None => match &var.value {
            Expr::ActionDecl { .. } | Expr::Ident(_) => Ok(("action", &var.value)),
            _ => Err(CoreError::UnknownField("<bare body statement>".to_string())),
        },
    }
}

fn apply_interp_field(
    field: &str,
    value: &Expr,
    evaluator: &Evaluator<'_>,
    rec: &mut SymInterpret,
) -> CoreResult<()> {
    match lower(field).as_str() {
        "action" => {
            rec.action = evaluator.resolve_action(value)?;
            rec.defined.set(InterpretDefined::ACTION);
        }
        "virtualmodifier" | "virtualmod" => {
            let idx = evaluator.resolve_modifier_index(value, ModNamespace::Virtual)?;
            rec.virtual_mod = Some(idx);
            rec.defined.set(InterpretDefined::VIRTUAL_MOD);
        }
        "repeat" => {
            rec.repeat = evaluator.resolve_boolean(value)?;
            rec.defined.set(InterpretDefined::REPEAT);
        }
        "usemodmapmods" | "usemodmap" => {
            let level_one = evaluator
                .resolve_string(value)
                .map(|s| s.eq_ignore_ascii_case("level1"))
                .unwrap_or(false);
            rec.level_one_only = level_one;
            rec.defined.set(InterpretDefined::LEVEL_ONE_ONLY);
        }
        other => return Err(CoreError::UnknownField(other.to_string())),
    }
    Ok(())
}

fn apply_led_field(
    field: &str,
    value: &Expr,
    evaluator: &Evaluator<'_>,
    rec: &mut IndicatorMap,
    diagnostics: &mut DiagnosticBus,
    file_id: u32,
) -> CoreResult<()> {
    match lower(field).as_str() {
        "modifiers" => {
            rec.mods = ModMask(evaluator.resolve_mask(value)?);
            rec.defined.set(LedDefined::MODS);
        }
        "groups" => {
            rec.groups = evaluator.resolve_mask(value)?;
            rec.defined.set(LedDefined::GROUPS);
        }
        "controls" => {
            rec.ctrls = evaluator.resolve_mask(value)?;
            rec.defined.set(LedDefined::CTRLS);
        }
        "whichmodstate" => {
            rec.which_mods = resolve_component_mask(evaluator, value)?;
            rec.defined.set(LedDefined::WHICH_MODS);
        }
        "whichgroupstate" => {
            rec.which_groups = resolve_component_mask(evaluator, value)?;
            rec.defined.set(LedDefined::WHICH_GROUPS);
        }
        "allowexplicit" | "driveskbd" | "index" => {
            diagnostics.publish(Diagnostic::warning(
                file_id,
                format!("unsupported legacy indicator field '{}' dropped", field),
            ));
        }
        other => return Err(CoreError::UnknownField(other.to_string())),
    }
    Ok(())
}

fn resolve_component_mask(evaluator: &Evaluator<'_>, expr: &Expr) -> CoreResult<ComponentMask> {
    match expr {
        Expr::Binary {
            op: crate::ast::BinaryOp::Add,
            lhs,
            rhs,
        } => Ok(resolve_component_mask(evaluator, lhs)? | resolve_component_mask(evaluator, rhs)?),
        _ => {
            let name = evaluator.resolve_string(expr)?;
            match lower(name).as_str() {
                "base" => Ok(ComponentMask::BASE),
                "latched" => Ok(ComponentMask::LATCHED),
                "locked" => Ok(ComponentMask::LOCKED),
                "effective" => Ok(ComponentMask::EFFECTIVE),
                other => Err(CoreError::UndefinedName(other.to_string())),
            }
        }
    }
}

fn lower(s: &str) -> alloc::string::String {
    s.to_ascii_lowercase()
}

/// Merges `new` into `list` keyed by `(sym, mods, predicate)` under the
/// merge-discipline rules shared with `add_indicator_map` below.
fn add_interp(list: &mut Vec<SymInterpret>, new: SymInterpret, diagnostics: &mut DiagnosticBus) {
    let key = (new.sym, new.mods, new.predicate);
    if let Some(existing) = list
        .iter_mut()
        .find(|e| (e.sym, e.mods, e.predicate) == key)
    {
        match new.merge {
            MergeMode::Replace => {
                diagnostics.publish(Diagnostic::warning(
                    new.file_id,
                    "replacing an existing interpret with an identical key",
                ));
                *existing = new;
            }
            MergeMode::Augment => merge_interp_fields(existing, &new, diagnostics, true),
            MergeMode::Override | MergeMode::Default => {
                merge_interp_fields(existing, &new, diagnostics, false)
            }
        }
    } else {
        list.push(new);
    }
}

fn merge_interp_fields(
    existing: &mut SymInterpret,
    new: &SymInterpret,
    diagnostics: &mut DiagnosticBus,
    augment: bool,
) {
    macro_rules! merge_field {
        ($bit:ident, $dst:ident) => {
            if new.defined.contains(InterpretDefined::$bit) {
                let already = existing.defined.contains(InterpretDefined::$bit);
                if augment {
                    if !already {
                        existing.$dst = new.$dst;
                        existing.defined.set(InterpretDefined::$bit);
                    }
                } else {
                    if already && existing.file_id == new.file_id {
                        diagnostics.publish(Diagnostic::warning(
                            new.file_id,
                            "colliding definitions of the same interpret field from the same file",
                        ));
                    }
                    existing.$dst = new.$dst;
                    existing.defined.set(InterpretDefined::$bit);
                }
            }
        };
    }
    merge_field!(ACTION, action);
    merge_field!(VIRTUAL_MOD, virtual_mod);
    merge_field!(REPEAT, repeat);
    merge_field!(LEVEL_ONE_ONLY, level_one_only);
}

/// Merges `new` into `list` keyed by `name`. The fast path
/// short-circuits when an existing record is already field-for-field
/// identical, just widening its `defined` mask.
fn add_indicator(list: &mut Vec<IndicatorMap>, new: IndicatorMap, diagnostics: &mut DiagnosticBus) {
    if let Some(existing) = list.iter_mut().find(|e| e.name == new.name) {
        if leds_equal_ignoring_bookkeeping(existing, &new) {
            existing.defined = existing.defined.union(new.defined);
            return;
        }
        match new.merge {
            MergeMode::Replace => {
                diagnostics.publish(Diagnostic::warning(
                    new.file_id,
                    "replacing an existing indicator map with the same name",
                ));
                *existing = new;
            }
            MergeMode::Augment => merge_led_fields(existing, &new, diagnostics, true),
            MergeMode::Override | MergeMode::Default => {
                merge_led_fields(existing, &new, diagnostics, false)
            }
        }
    } else {
        list.push(new);
    }
}

fn leds_equal_ignoring_bookkeeping(a: &IndicatorMap, b: &IndicatorMap) -> bool {
    a.name == b.name
        && a.which_mods == b.which_mods
        && a.mods == b.mods
        && a.which_groups == b.which_groups
        && a.groups == b.groups
        && a.ctrls == b.ctrls
}

fn merge_led_fields(
    existing: &mut IndicatorMap,
    new: &IndicatorMap,
    diagnostics: &mut DiagnosticBus,
    augment: bool,
) {
    macro_rules! merge_field {
        ($bit:ident, $dst:ident) => {
            if new.defined.contains(LedDefined::$bit) {
                let already = existing.defined.contains(LedDefined::$bit);
                if augment {
                    if !already {
                        existing.$dst = new.$dst;
                        existing.defined.set(LedDefined::$bit);
                    }
                } else {
                    if already && existing.file_id == new.file_id {
                        diagnostics.publish(Diagnostic::warning(
                            new.file_id,
                            "colliding definitions of the same indicator field from the same file",
                        ));
                    }
                    existing.$dst = new.$dst;
                    existing.defined.set(LedDefined::$bit);
                }
            }
        };
    }
    merge_field!(MODS, mods);
    merge_field!(GROUPS, groups);
    merge_field!(CTRLS, ctrls);
    merge_field!(WHICH_MODS, which_mods);
    merge_field!(WHICH_GROUPS, which_groups);
}

/// Copies accumulated interprets into the keymap's list in the strict
/// most-specific-first order, and indicator maps into the fixed-size
/// indicator table.
fn copy_to_keymap(
    interps: Vec<SymInterpret>,
    leds: Vec<IndicatorMap>,
    keymap: &mut Keymap,
    diagnostics: &mut DiagnosticBus,
) {
    let mut buckets: [Vec<SymInterpret>; 10] = Default::default();
    for interp in interps {
        buckets[bucket_index(interp.has_sym, interp.predicate)].push(interp);
    }
    keymap.interprets.clear();
    for bucket in buckets {
        keymap.interprets.extend(bucket);
    }

    for led in leds {
        copy_indicator(led, keymap, diagnostics);
    }
    keymap.version += 1;
}

fn bucket_index(has_sym: bool, predicate: Predicate) -> usize {
    let rank = predicate.specificity_rank() as usize;
    if has_sym {
        rank
    } else {
        5 + rank
    }
}

fn copy_indicator(mut led: IndicatorMap, keymap: &mut Keymap, diagnostics: &mut DiagnosticBus) {
    if led.groups != 0 && led.which_groups.is_empty() {
        led.which_groups = ComponentMask::EFFECTIVE;
    }
    if !led.mods.is_empty() && led.which_mods.is_empty() {
        led.which_mods = ComponentMask::EFFECTIVE;
    }
    if let Some(idx) = keymap.find_indicator_slot(led.name) {
        keymap.indicators[idx] = Some(led);
        return;
    }
    if let Some(idx) = keymap.find_empty_indicator_slot() {
        keymap.indicators[idx] = Some(led);
        return;
    }
    diagnostics.publish(Diagnostic::error(
        led.file_id,
        "indicator table is full (capacity 32): dropping indicator map",
    ));
}
