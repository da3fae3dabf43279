//! The live state machine: modifier/group components, indicator derivation,
//! and the key-event dispatch loop.
//!
//! Grounded on the depressed/latched/locked/effective split and the
//! "a subsequent distinct key's down event consumes a pending latch" rule
//! that a text-mode console session exercises directly: hold a latch key,
//! release it, press an unrelated key, and see the latch spend itself on
//! that key alone.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::atom::Atom;
use crate::domain::aggregates::{Keymap, NUM_REAL_MODS};
use crate::domain::entities::{Action, ComponentMask, IndicatorMap, Key};
use crate::domain::value_objects::ModMask;
use crate::keysym::Keysym;

/// Fixed capacity of the controls bitmask, mirroring `MAX_INDICATORS`'s
/// fixed-size-table style.
const MAX_CONTROLS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// A snapshot of the three explicit modifier components; `effective()`
/// derives the fourth the way every `which_mods`/`serialize_mods` query does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModComponents {
    pub depressed: ModMask,
    pub latched: ModMask,
    pub locked: ModMask,
}

impl ModComponents {
    pub fn effective(&self) -> ModMask {
        self.depressed | self.latched | self.locked
    }
}

/// A snapshot of the three group (layout) components, each a plain layout
/// index rather than a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupComponents {
    pub base: i32,
    pub latched: i32,
    pub locked: i32,
}

impl GroupComponents {
    pub fn effective(&self, num_layouts: i32) -> i32 {
        if num_layouts <= 0 {
            0
        } else {
            (self.base + self.latched + self.locked).rem_euclid(num_layouts)
        }
    }
}

/// What one currently-held key contributed to the depressed components, so
/// its key-up event releases exactly those bits and no others — two keys
/// that both happen to carry the same real modifier in their modmap must
/// not clear each other's contribution on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyContribution {
    keycode: u32,
    mod_bits: ModMask,
    ctrl_bits: u32,
    /// Latch bits this key's down event consumed from a pending latch,
    /// borrowed into depressed for this key's duration only.
    consumed_latch_mods: ModMask,
}

/// One input stream's live keyboard state over a shared, immutable keymap.
pub struct State {
    keymap: Rc<Keymap>,
    mod_depressed_counts: [u8; NUM_REAL_MODS],
    mod_latched: ModMask,
    mod_locked: ModMask,
    /// Key whose `LatchMods` action most recently armed `latch_pending`;
    /// `None` once consumed.
    latch_origin: Option<u32>,
    latch_pending: ModMask,
    ctrl_depressed_counts: [u8; MAX_CONTROLS],
    ctrl_locked: u32,
    base_group: i32,
    latched_group: i32,
    locked_group: i32,
    group_latch_origin: Option<u32>,
    down: Vec<KeyContribution>,
}

impl State {
    pub fn new(keymap: Rc<Keymap>) -> Self {
        State {
            keymap,
            mod_depressed_counts: [0; NUM_REAL_MODS],
            mod_latched: ModMask::NONE,
            mod_locked: ModMask::NONE,
            latch_origin: None,
            latch_pending: ModMask::NONE,
            ctrl_depressed_counts: [0; MAX_CONTROLS],
            ctrl_locked: 0,
            base_group: 0,
            latched_group: 0,
            locked_group: 0,
            group_latch_origin: None,
            down: Vec::new(),
        }
    }

    pub fn keymap(&self) -> &Rc<Keymap> {
        &self.keymap
    }

    pub fn num_layouts(&self) -> i32 {
        if !self.keymap.group_names.is_empty() {
            self.keymap.group_names.len() as i32
        } else {
            self.keymap
                .keys
                .iter()
                .map(|k| k.num_groups())
                .max()
                .unwrap_or(1)
                .max(1) as i32
        }
    }

    pub fn mod_components(&self) -> ModComponents {
        ModComponents {
            depressed: self.mod_depressed_mask(),
            latched: self.mod_latched,
            locked: self.mod_locked,
        }
    }

    pub fn group_components(&self) -> GroupComponents {
        GroupComponents {
            base: self.base_group,
            latched: self.latched_group,
            locked: self.locked_group,
        }
    }

    pub fn effective_mods(&self) -> ModMask {
        self.mod_component(ComponentMask::EFFECTIVE)
    }

    pub fn effective_group(&self) -> i32 {
        self.group_components().effective(self.num_layouts())
    }

    pub fn serialize_mods(&self, which: ComponentMask) -> ModMask {
        self.mod_component(which)
    }

    pub fn serialize_layout(&self, which: ComponentMask) -> i32 {
        self.group_component_value(which)
    }

    pub fn mod_is_active(&self, bit: u32, which: ComponentMask) -> bool {
        self.mod_component(which).0 & (1 << bit) != 0
    }

    pub fn mod_names_are_active_all(&self, which: ComponentMask, bits: ModMask) -> bool {
        self.mod_component(which).contains(bits)
    }

    pub fn mod_names_are_active_any(&self, which: ComponentMask, bits: ModMask) -> bool {
        self.mod_component(which).intersects(bits)
    }

    pub fn ctrls_active(&self) -> u32 {
        self.ctrl_depressed_mask() | self.ctrl_locked
    }

    /// Overrides every component directly, the way external state sync does;
    /// bypasses per-key contribution tracking and clears any pending latch.
    pub fn set_mask(
        &mut self,
        depressed: ModMask,
        latched: ModMask,
        locked: ModMask,
        base_group: i32,
        latched_group: i32,
        locked_group: i32,
    ) {
        for i in 0..NUM_REAL_MODS {
            self.mod_depressed_counts[i] = u8::from(depressed.0 & (1 << i) != 0);
        }
        self.mod_latched = latched;
        self.mod_locked = locked;
        self.latch_origin = None;
        self.latch_pending = ModMask::NONE;
        self.base_group = base_group;
        self.latched_group = latched_group;
        self.locked_group = locked_group;
        self.group_latch_origin = None;
        self.down.clear();
    }

    pub fn key_get_syms(&self, keycode: u32) -> &[Keysym] {
        let key = match self.keymap.find_key_by_keycode(keycode) {
            Some(key) => key,
            None => return &[],
        };
        let (group_idx, level_idx) = self.resolve_key_group_and_level(key);
        key.groups
            .get(group_idx)
            .and_then(|g| g.levels.get(level_idx))
            .map(|level| level.syms.as_slice())
            .unwrap_or(&[])
    }

    /// `None` for a level carrying zero or more than one keysym.
    pub fn key_get_one_sym(&self, keycode: u32) -> Keysym {
        let key = match self.keymap.find_key_by_keycode(keycode) {
            Some(key) => key,
            None => return Keysym::NO_SYMBOL,
        };
        let (group_idx, level_idx) = self.resolve_key_group_and_level(key);
        key.groups
            .get(group_idx)
            .and_then(|g| g.levels.get(level_idx))
            .and_then(|level| level.one_sym())
            .unwrap_or(Keysym::NO_SYMBOL)
    }

    /// The real modifiers that contributed to selecting `keycode`'s current
    /// level, removed from `mask`.
    pub fn mod_mask_remove_consumed(&self, keycode: u32, mask: ModMask) -> ModMask {
        let key = match self.keymap.find_key_by_keycode(keycode) {
            Some(key) => key,
            None => return mask,
        };
        let (group_idx, _) = self.resolve_key_group_and_level(key);
        let consumable = key
            .groups
            .get(group_idx)
            .and_then(|g| self.keymap.find_type_by_name(g.type_name))
            .map(|ty| ty.consumable_mods())
            .unwrap_or(ModMask::NONE);
        ModMask(mask.0 & !consumable.0)
    }

    pub fn indicator_is_lit(&self, led: &IndicatorMap) -> bool {
        let mut lit = false;
        if !led.which_mods.is_empty() {
            lit |= self.mod_component(led.which_mods).intersects(led.mods);
        }
        if !led.which_groups.is_empty() {
            lit |= self.group_component_bit(led.which_groups) & led.groups != 0;
        }
        if led.ctrls != 0 {
            lit |= self.ctrls_active() & led.ctrls != 0;
        }
        lit
    }

    pub fn indicator_is_active(&self, name: Atom) -> Option<bool> {
        let idx = self.keymap.find_indicator_slot(name)?;
        let led = self.keymap.indicators[idx].as_ref()?;
        Some(self.indicator_is_lit(led))
    }

    pub fn led_mask(&self) -> u32 {
        let mut mask = 0u32;
        for (i, slot) in self.keymap.indicators.iter().enumerate() {
            if let Some(led) = slot {
                if self.indicator_is_lit(led) {
                    mask |= 1 << i;
                }
            }
        }
        mask
    }

    pub fn update_key(&mut self, keycode: u32, direction: KeyDirection) {
        match direction {
            KeyDirection::Down => self.key_down(keycode),
            KeyDirection::Up => self.key_up(keycode),
        }
    }

    fn key_down(&mut self, keycode: u32) {
        if let Some(origin) = self.latch_origin {
            if origin != keycode {
                self.consume_mod_latch(keycode);
            }
        }
        if let Some(origin) = self.group_latch_origin {
            if origin != keycode {
                self.consume_group_latch();
            }
        }

        let (action, vmodmap) = {
            let key = match self.keymap.find_key_by_keycode(keycode) {
                Some(key) => key,
                None => return,
            };
            let (group_idx, level_idx) = self.resolve_key_group_and_level(key);
            let action = key
                .groups
                .get(group_idx)
                .and_then(|g| g.levels.get(level_idx))
                .map(|level| level.action)
                .unwrap_or_default();
            (action, key.vmodmap)
        };
        self.run_down_action(keycode, action, vmodmap);
    }

    fn key_up(&mut self, keycode: u32) {
        if let Some(pos) = self.down.iter().position(|c| c.keycode == keycode) {
            let contribution = self.down.remove(pos);
            self.release_mod_depressed(contribution.mod_bits | contribution.consumed_latch_mods);
            self.release_ctrl_depressed(contribution.ctrl_bits);
        }
    }

    fn run_down_action(&mut self, keycode: u32, action: Action, key_vmodmap: ModMask) {
        match action {
            Action::None => {}
            Action::ModSet(m) => {
                let raw = if m.use_mod_map_mods { key_vmodmap.0 } else { m.mods };
                let real = self.resolve_to_real_mods(raw);
                if m.clear_locks {
                    self.mod_locked = ModMask(self.mod_locked.0 & !real.0);
                }
                self.add_mod_depressed(keycode, real);
            }
            Action::ModLatch(m) => {
                let raw = if m.use_mod_map_mods { key_vmodmap.0 } else { m.mods };
                let real = self.resolve_to_real_mods(raw);
                if m.latch_to_lock && self.latch_pending.intersects(real) {
                    self.mod_locked = self.mod_locked | real;
                    self.mod_latched = ModMask(self.mod_latched.0 & !real.0);
                    self.latch_pending = ModMask::NONE;
                    self.latch_origin = None;
                } else {
                    self.mod_latched = self.mod_latched | real;
                    self.latch_pending = self.latch_pending | real;
                    self.latch_origin = Some(keycode);
                }
            }
            Action::ModLock(m) => {
                let raw = if m.use_mod_map_mods { key_vmodmap.0 } else { m.mods };
                let real = self.resolve_to_real_mods(raw);
                self.mod_locked = ModMask(self.mod_locked.0 ^ real.0);
            }
            Action::GroupSet(g) => {
                self.base_group = if g.absolute { g.group } else { self.base_group + g.group };
            }
            Action::GroupLatch(g) => {
                self.latched_group = if g.absolute {
                    g.group
                } else {
                    self.latched_group + g.group
                };
                self.group_latch_origin = Some(keycode);
            }
            Action::GroupLock(g) => {
                self.locked_group = if g.absolute { g.group } else { self.locked_group + g.group };
            }
            Action::CtrlSet(c) => {
                self.add_ctrl_depressed(keycode, c.ctrls);
            }
            Action::CtrlLock(c) => {
                self.ctrl_locked ^= c.ctrls;
            }
            // Pointer, terminate, switch-vt and vendor-private actions carry
            // no keyboard-state effect here; a caller driving a pointer or
            // session manager dispatches on the resolved `Action` itself
            // rather than through `State`.
            Action::PtrMove(_)
            | Action::PtrButton(_)
            | Action::PtrLock(_)
            | Action::PtrDefault(_)
            | Action::SwitchVt(_)
            | Action::Terminate
            | Action::Private(_) => {}
        }
    }

    fn consume_mod_latch(&mut self, consuming_keycode: u32) {
        let bits = self.latch_pending;
        self.mod_latched = ModMask(self.mod_latched.0 & !bits.0);
        self.latch_pending = ModMask::NONE;
        self.latch_origin = None;
        if bits.is_empty() {
            return;
        }
        for i in 0..NUM_REAL_MODS {
            if bits.0 & (1 << i) != 0 {
                self.mod_depressed_counts[i] = self.mod_depressed_counts[i].saturating_add(1);
            }
        }
        let contribution = self.contribution_mut(consuming_keycode);
        contribution.consumed_latch_mods = contribution.consumed_latch_mods | bits;
    }

    fn consume_group_latch(&mut self) {
        self.base_group += self.latched_group;
        self.latched_group = 0;
        self.group_latch_origin = None;
    }

    fn contribution_mut(&mut self, keycode: u32) -> &mut KeyContribution {
        if let Some(pos) = self.down.iter().position(|c| c.keycode == keycode) {
            &mut self.down[pos]
        } else {
            self.down.push(KeyContribution {
                keycode,
                mod_bits: ModMask::NONE,
                ctrl_bits: 0,
                consumed_latch_mods: ModMask::NONE,
            });
            self.down.last_mut().expect("just pushed")
        }
    }

    fn add_mod_depressed(&mut self, keycode: u32, mods: ModMask) {
        for i in 0..NUM_REAL_MODS {
            if mods.0 & (1 << i) != 0 {
                self.mod_depressed_counts[i] = self.mod_depressed_counts[i].saturating_add(1);
            }
        }
        let contribution = self.contribution_mut(keycode);
        contribution.mod_bits = contribution.mod_bits | mods;
    }

    fn add_ctrl_depressed(&mut self, keycode: u32, ctrls: u32) {
        for i in 0..MAX_CONTROLS {
            if ctrls & (1 << i) != 0 {
                self.ctrl_depressed_counts[i] = self.ctrl_depressed_counts[i].saturating_add(1);
            }
        }
        let contribution = self.contribution_mut(keycode);
        contribution.ctrl_bits |= ctrls;
    }

    fn release_mod_depressed(&mut self, mods: ModMask) {
        for i in 0..NUM_REAL_MODS {
            if mods.0 & (1 << i) != 0 {
                self.mod_depressed_counts[i] = self.mod_depressed_counts[i].saturating_sub(1);
            }
        }
    }

    fn release_ctrl_depressed(&mut self, ctrls: u32) {
        for i in 0..MAX_CONTROLS {
            if ctrls & (1 << i) != 0 {
                self.ctrl_depressed_counts[i] = self.ctrl_depressed_counts[i].saturating_sub(1);
            }
        }
    }

    fn mod_depressed_mask(&self) -> ModMask {
        let mut mask = 0u32;
        for (i, count) in self.mod_depressed_counts.iter().enumerate() {
            if *count > 0 {
                mask |= 1 << i;
            }
        }
        ModMask(mask)
    }

    fn ctrl_depressed_mask(&self) -> u32 {
        let mut mask = 0u32;
        for (i, count) in self.ctrl_depressed_counts.iter().enumerate() {
            if *count > 0 {
                mask |= 1 << i;
            }
        }
        mask
    }

    fn mod_component(&self, which: ComponentMask) -> ModMask {
        let mut mask = ModMask::NONE;
        if which.contains(ComponentMask::BASE) {
            mask = mask | self.mod_depressed_mask();
        }
        if which.contains(ComponentMask::LATCHED) {
            mask = mask | self.mod_latched;
        }
        if which.contains(ComponentMask::LOCKED) {
            mask = mask | self.mod_locked;
        }
        if which.contains(ComponentMask::EFFECTIVE) {
            mask = mask | self.mod_depressed_mask() | self.mod_latched | self.mod_locked;
        }
        mask
    }

    /// First matching component wins, most specific first: effective, then
    /// locked, latched, base — a caller asking for a single component gets
    /// exactly that one; a caller asking for several gets the most settled.
    fn group_component_value(&self, which: ComponentMask) -> i32 {
        let num_layouts = self.num_layouts();
        if which.contains(ComponentMask::EFFECTIVE) {
            return self.effective_group();
        }
        if which.contains(ComponentMask::LOCKED) {
            return self.locked_group.rem_euclid(num_layouts.max(1));
        }
        if which.contains(ComponentMask::LATCHED) {
            return self.latched_group.rem_euclid(num_layouts.max(1));
        }
        if which.contains(ComponentMask::BASE) {
            return self.base_group.rem_euclid(num_layouts.max(1));
        }
        0
    }

    fn group_component_bit(&self, which: ComponentMask) -> u32 {
        1 << self.group_component_value(which)
    }

    fn resolve_key_group_and_level(&self, key: &Key) -> (usize, usize) {
        let group_idx = key.resolve_group(self.effective_group());
        let group = match key.groups.get(group_idx) {
            Some(group) => group,
            None => return (group_idx, 0),
        };
        let level = self
            .keymap
            .find_type_by_name(group.type_name)
            .map(|ty| ty.level_for_mods(self.effective_mods()) as usize)
            .unwrap_or(0);
        let max_level = group.levels.len().saturating_sub(1);
        (group_idx, level.min(max_level))
    }

    /// Translates a raw resolved-mask value (which may carry a virtual
    /// modifier's table-slot bit rather than a real-modifier bit) down to
    /// the real modifiers it actually affects, via each virtual modifier's
    /// `mapping` computed at assembly time.
    fn resolve_to_real_mods(&self, raw: u32) -> ModMask {
        let real_mask = self.keymap.real_mods_mask().0;
        let mut real = raw & real_mask;
        let mut virt = raw & !real_mask;
        let mut idx = NUM_REAL_MODS as u32;
        while virt != 0 && idx < 32 && (idx as usize) < self.keymap.mods.len() {
            if virt & (1 << idx) != 0 {
                if let Some(modifier) = self.keymap.mods.get(idx as usize) {
                    real |= modifier.mapping.0;
                }
                virt &= !(1 << idx);
            }
            idx += 1;
        }
        ModMask(real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        ComponentMask, Group, Key, KeyType, Level, ModAction, TypeMapEntry,
    };
    use alloc::vec;

    fn shift_bit() -> u32 {
        0
    }

    fn new_keymap_with(mutate: impl FnOnce(&mut Keymap)) -> Rc<Keymap> {
        let mut keymap = Keymap::new();
        mutate(&mut keymap);
        Rc::new(keymap)
    }

    #[test]
    fn mod_set_is_transient_and_released_on_key_up() {
        let keymap = new_keymap_with(|keymap| {
            keymap.keys.push(Key {
                keycode: 1,
                vmodmap: ModMask(1 << shift_bit()),
                groups: vec![Group {
                    levels: vec![Level {
                        action: Action::ModSet(ModAction {
                            mods: 0,
                            use_mod_map_mods: true,
                            clear_locks: false,
                            latch_to_lock: false,
                        }),
                        ..Level::empty()
                    }],
                    ..Group::default()
                }],
                ..Key::default()
            });
        });
        let mut state = State::new(keymap);
        state.update_key(1, KeyDirection::Down);
        assert!(state.effective_mods().contains(ModMask(1 << shift_bit())));
        state.update_key(1, KeyDirection::Up);
        assert!(state.effective_mods().is_empty());
    }

    #[test]
    fn mod_latch_is_consumed_by_the_next_distinct_key_and_then_spent() {
        let keymap = new_keymap_with(|keymap| {
            keymap.keys.push(Key {
                keycode: 1,
                groups: vec![Group {
                    levels: vec![Level {
                        action: Action::ModLatch(ModAction {
                            mods: 1 << shift_bit(),
                            use_mod_map_mods: false,
                            clear_locks: false,
                            latch_to_lock: false,
                        }),
                        ..Level::empty()
                    }],
                    ..Group::default()
                }],
                ..Key::default()
            });
            keymap.keys.push(Key {
                keycode: 2,
                groups: vec![Group {
                    levels: vec![Level::empty()],
                    ..Group::default()
                }],
                ..Key::default()
            });
        });
        let mut state = State::new(keymap);

        state.update_key(1, KeyDirection::Down);
        assert!(state.mod_components().latched.contains(ModMask(1 << shift_bit())));
        state.update_key(1, KeyDirection::Up);
        assert!(state.mod_components().latched.contains(ModMask(1 << shift_bit())));

        state.update_key(2, KeyDirection::Down);
        assert!(state.mod_components().latched.is_empty());
        assert!(state.mod_components().depressed.contains(ModMask(1 << shift_bit())));

        state.update_key(2, KeyDirection::Up);
        assert!(state.effective_mods().is_empty());
    }

    #[test]
    fn group_set_relative_cycles_the_effective_layout() {
        let keymap = new_keymap_with(|keymap| {
            keymap.group_names = vec![keymap.intern("English"), keymap.intern("Russian")];
            keymap.keys.push(Key {
                keycode: 3,
                groups: vec![Group {
                    levels: vec![Level {
                        action: Action::GroupSet(crate::domain::entities::GroupAction {
                            group: 1,
                            absolute: false,
                        }),
                        ..Level::empty()
                    }],
                    ..Group::default()
                }],
                ..Key::default()
            });
        });
        let mut state = State::new(keymap);
        assert_eq!(state.effective_group(), 0);
        state.update_key(3, KeyDirection::Down);
        state.update_key(3, KeyDirection::Up);
        assert_eq!(state.effective_group(), 1);
        state.update_key(3, KeyDirection::Down);
        state.update_key(3, KeyDirection::Up);
        assert_eq!(state.effective_group(), 0);
    }

    #[test]
    fn key_get_syms_selects_level_by_effective_mods() {
        let keymap = new_keymap_with(|keymap| {
            let ty_name = keymap.intern("TWO_LEVEL");
            keymap.types.push(KeyType {
                name: ty_name,
                mods: ModMask(1 << shift_bit()),
                num_levels: 2,
                map: vec![TypeMapEntry {
                    mods: ModMask(1 << shift_bit()),
                    level: 1,
                    preserve: ModMask::NONE,
                }],
                level_names: vec![],
            });
            keymap.keys.push(Key {
                keycode: 4,
                vmodmap: ModMask(1 << shift_bit()),
                groups: vec![Group {
                    type_name: ty_name,
                    levels: vec![
                        Level {
                            syms: vec![Keysym::from_name("a").unwrap()],
                            ..Level::empty()
                        },
                        Level {
                            syms: vec![Keysym::from_name("A").unwrap()],
                            ..Level::empty()
                        },
                    ],
                    ..Group::default()
                }],
                ..Key::default()
            });
            keymap.keys.push(Key {
                keycode: 5,
                vmodmap: ModMask(1 << shift_bit()),
                groups: vec![Group {
                    levels: vec![Level {
                        action: Action::ModSet(ModAction {
                            mods: 0,
                            use_mod_map_mods: true,
                            clear_locks: false,
                            latch_to_lock: false,
                        }),
                        ..Level::empty()
                    }],
                    ..Group::default()
                }],
                ..Key::default()
            });
        });
        let mut state = State::new(keymap);
        assert_eq!(state.key_get_one_sym(4), Keysym::from_name("a").unwrap());
        state.update_key(5, KeyDirection::Down);
        assert_eq!(state.key_get_one_sym(4), Keysym::from_name("A").unwrap());
        state.update_key(5, KeyDirection::Up);
        assert_eq!(state.key_get_one_sym(4), Keysym::from_name("a").unwrap());
    }

    #[test]
    fn indicator_lit_when_its_locked_mods_match() {
        let keymap = new_keymap_with(|keymap| {
            let name = keymap.intern("Caps Lock");
            keymap.indicators[0] = Some(IndicatorMap {
                name,
                which_mods: ComponentMask::LOCKED,
                mods: ModMask(1 << 1),
                which_groups: ComponentMask::NONE,
                groups: 0,
                ctrls: 0,
                defined: Default::default(),
                merge: crate::domain::value_objects::MergeMode::Default,
                file_id: 0,
            });
            keymap.keys.push(Key {
                keycode: 6,
                groups: vec![Group {
                    levels: vec![Level {
                        action: Action::ModLock(ModAction {
                            mods: 1 << 1,
                            use_mod_map_mods: false,
                            clear_locks: false,
                            latch_to_lock: false,
                        }),
                        ..Level::empty()
                    }],
                    ..Group::default()
                }],
                ..Key::default()
            });
        });
        let mut state = State::new(keymap);
        assert_eq!(state.indicator_is_active(state.keymap().atoms.find("Caps Lock").unwrap()), Some(false));
        state.update_key(6, KeyDirection::Down);
        state.update_key(6, KeyDirection::Up);
        assert_eq!(state.indicator_is_active(state.keymap().atoms.find("Caps Lock").unwrap()), Some(true));
        state.update_key(6, KeyDirection::Down);
        state.update_key(6, KeyDirection::Up);
        assert_eq!(state.indicator_is_active(state.keymap().atoms.find("Caps Lock").unwrap()), Some(false));
    }

    #[test]
    fn remove_consumed_strips_only_the_bits_the_type_matched() {
        let keymap = new_keymap_with(|keymap| {
            let ty_name = keymap.intern("ALT_SHIFT");
            keymap.types.push(KeyType {
                name: ty_name,
                mods: ModMask(0b11),
                num_levels: 2,
                map: vec![TypeMapEntry {
                    mods: ModMask(0b01),
                    level: 1,
                    preserve: ModMask::NONE,
                }],
                level_names: vec![],
            });
            keymap.keys.push(Key {
                keycode: 7,
                groups: vec![Group {
                    type_name: ty_name,
                    levels: vec![Level::empty(), Level::empty()],
                    ..Group::default()
                }],
                ..Key::default()
            });
        });
        let state = State::new(keymap);
        let active = ModMask(0b11);
        let remaining = state.mod_mask_remove_consumed(7, active);
        assert_eq!(remaining, ModMask(0b10));
    }
}
