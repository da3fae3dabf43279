//! Expression evaluator.
//!
//! Resolves [`crate::ast::Expr`] nodes against an atom table and a modifier
//! name lookup into the concrete values a statement needs: booleans,
//! integers, masks, modifier indices, keysyms and actions. Every resolver
//! reports `BadType`/`UndefinedName` rather than panicking — callers decide
//! whether a failed resolution is fatal to the current statement.

use alloc::string::ToString;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::atom::{Atom, AtomTable};
use crate::domain::entities::{
    Action, CtrlAction, GroupAction, LockAffect, ModAction, PtrButtonAction, PtrDefaultAction,
    PtrMoveAction, SwitchVtAction,
};
use crate::error::CoreError;
use crate::keysym::Keysym;

/// Which modifier namespace a `resolve_modifier_index` call is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModNamespace {
    Real,
    Virtual,
    Both,
}

/// Looks up a name to a modifier bit index and tells which namespace it
/// came from. Implemented by the keymap under construction.
pub trait ModifierLookup {
    /// Resolves a bare modifier name (`"Shift"`, `"NumLock"`) to its bit
    /// index, or `None` if undeclared.
    fn modifier_index(&self, name: &str, namespace: ModNamespace) -> Option<u32>;
    /// Resolves `"all"`/`"none"` and named masks to a full mask value.
    fn modifier_mask_keyword(&self, name: &str) -> Option<u32>;
}

pub struct Evaluator<'a> {
    pub atoms: &'a AtomTable,
    pub mods: &'a dyn ModifierLookup,
}

impl<'a> Evaluator<'a> {
    pub fn new(atoms: &'a AtomTable, mods: &'a dyn ModifierLookup) -> Self {
        Evaluator { atoms, mods }
    }

    fn text(&self, atom: Atom) -> Result<&str, CoreError> {
        self.atoms
            .text(atom)
            .ok_or_else(|| CoreError::UndefinedName("<anonymous atom>".to_string()))
    }

    pub fn resolve_boolean(&self, expr: &Expr) -> Result<bool, CoreError> {
        match expr {
            Expr::Boolean(b) => Ok(*b),
            Expr::Integer(n) => Ok(*n != 0),
            Expr::Ident(atom) => match self.text(*atom)? {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                other => Err(CoreError::BadType {
                    expected: "boolean",
                    context: other.to_string(),
                }),
            },
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => Ok(!self.resolve_boolean(expr)?),
            _ => Err(CoreError::BadType {
                expected: "boolean",
                context: "expression".to_string(),
            }),
        }
    }

    pub fn resolve_integer(&self, expr: &Expr) -> Result<i64, CoreError> {
        match expr {
            Expr::Integer(n) => Ok(*n),
            Expr::Unary {
                op: UnaryOp::Negate,
                expr,
            } => Ok(-self.resolve_integer(expr)?),
            Expr::Unary {
                op: UnaryOp::Plus,
                expr,
            } => self.resolve_integer(expr),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.resolve_integer(lhs)?;
                let r = self.resolve_integer(rhs)?;
                Ok(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => {
                        if r == 0 {
                            return Err(CoreError::BadType {
                                expected: "nonzero divisor",
                                context: "integer expression".to_string(),
                            });
                        }
                        l / r
                    }
                })
            }
            _ => Err(CoreError::BadType {
                expected: "integer",
                context: "expression".to_string(),
            }),
        }
    }

    pub fn resolve_string<'b>(&'b self, expr: &Expr) -> Result<&'b str, CoreError> {
        match expr {
            Expr::Str(atom) | Expr::Ident(atom) => self.text(*atom),
            _ => Err(CoreError::BadType {
                expected: "string",
                context: "expression".to_string(),
            }),
        }
    }

    /// Resolves a mask expression: a bare keyword (`"all"`, `"none"`, a named
    /// mask), a modifier name, or a `+`-joined union represented as nested
    /// `Binary { op: Add, .. }` nodes over `Ident`s.
    pub fn resolve_mask(&self, expr: &Expr) -> Result<u32, CoreError> {
        match expr {
            Expr::Integer(n) => Ok(*n as u32),
            Expr::Ident(atom) => {
                let name = self.text(*atom)?;
                if let Some(mask) = self.mods.modifier_mask_keyword(name) {
                    return Ok(mask);
                }
                if let Some(idx) = self.mods.modifier_index(name, ModNamespace::Both) {
                    return Ok(1 << idx);
                }
                Err(CoreError::UndefinedName(name.to_string()))
            }
            Expr::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } => Ok(self.resolve_mask(lhs)? | self.resolve_mask(rhs)?),
            Expr::Unary {
                op: UnaryOp::Invert,
                expr,
            } => Ok(!self.resolve_mask(expr)?),
            Expr::Unary {
                op: UnaryOp::Plus,
                expr,
            } => self.resolve_mask(expr),
            _ => Err(CoreError::BadType {
                expected: "modifier mask",
                context: "expression".to_string(),
            }),
        }
    }

    pub fn resolve_modifier_index(
        &self,
        expr: &Expr,
        namespace: ModNamespace,
    ) -> Result<u32, CoreError> {
        let name = self.resolve_string(expr)?;
        self.mods
            .modifier_index(name, namespace)
            .ok_or_else(|| CoreError::UndefinedName(name.to_string()))
    }

    pub fn resolve_keysym(&self, expr: &Expr) -> Result<Keysym, CoreError> {
        match expr {
            Expr::KeysymLit(sym) => Ok(*sym),
            Expr::Ident(atom) => {
                let name = self.text(*atom)?;
                Keysym::from_name(name).ok_or_else(|| CoreError::UndefinedName(name.to_string()))
            }
            _ => Err(CoreError::BadType {
                expected: "keysym",
                context: "expression".to_string(),
            }),
        }
    }

    /// Splits `elem.field[ndx]` into its components, for assigning into a
    /// record field during statement handling.
    pub fn resolve_lhs<'b>(
        &'b self,
        expr: &'b Expr,
    ) -> Result<(Option<&'b str>, &'b str, Option<&'b Expr>), CoreError> {
        match expr {
            Expr::FieldRef { element, field } => {
                let elem = if element.is_some() {
                    Some(self.text(*element)?)
                } else {
                    None
                };
                Ok((elem, self.text(*field)?, None))
            }
            Expr::ArrayRef {
                element,
                field,
                index,
            } => {
                let elem = match element {
                    Some(e) if e.is_some() => Some(self.text(*e)?),
                    _ => None,
                };
                Ok((elem, self.text(*field)?, Some(index.as_ref())))
            }
            Expr::Ident(field) => Ok((None, self.text(*field)?, None)),
            _ => Err(CoreError::BadType {
                expected: "assignable field reference",
                context: "expression".to_string(),
            }),
        }
    }

    pub fn resolve_action(&self, expr: &Expr) -> Result<Action, CoreError> {
        let (name, args) = match expr {
            Expr::ActionDecl { name, args } => (self.text(*name)?, args),
            Expr::Ident(atom) if self.text(*atom)? == "NoAction" => return Ok(Action::None),
            _ => {
                return Err(CoreError::BadType {
                    expected: "action declaration",
                    context: "expression".to_string(),
                })
            }
        };

        let arg = |key: &str| -> Option<&Expr> {
            args.iter()
                .find(|(k, _)| self.text(*k).ok() == Some(key))
                .map(|(_, v)| v)
        };
        let mask_arg = |key: &str| -> Result<u32, CoreError> {
            arg(key).map(|e| self.resolve_mask(e)).unwrap_or(Ok(0))
        };
        let bool_arg = |key: &str| -> Result<bool, CoreError> {
            arg(key).map(|e| self.resolve_boolean(e)).unwrap_or(Ok(false))
        };
        let int_arg = |key: &str| -> Result<i64, CoreError> {
            arg(key).map(|e| self.resolve_integer(e)).unwrap_or(Ok(0))
        };

        match name {
            "SetMods" | "LatchMods" | "LockMods" => {
                let mods = ModAction {
                    mods: mask_arg("modifiers")?,
                    use_mod_map_mods: arg("modifiers").is_none(),
                    clear_locks: bool_arg("clearLocks")?,
                    latch_to_lock: bool_arg("latchToLock")?,
                };
                Ok(match name {
                    "SetMods" => Action::ModSet(mods),
                    "LatchMods" => Action::ModLatch(mods),
                    _ => Action::ModLock(mods),
                })
            }
            "SetGroup" | "LatchGroup" | "LockGroup" => {
                let (value, absolute) = match arg("group") {
                    Some(Expr::Unary {
                        op: UnaryOp::Negate,
                        expr,
                    }) => (-self.resolve_integer(expr)?, false),
                    Some(other) => (self.resolve_integer(other)?, !is_relative(other)),
                    None => (0, true),
                };
                // The wire form numbers an absolute group from 1; internally
                // groups are 0-based.
                let group = if absolute { value - 1 } else { value };
                let action = GroupAction {
                    group: group as i32,
                    absolute,
                };
                Ok(match name {
                    "SetGroup" => Action::GroupSet(action),
                    "LatchGroup" => Action::GroupLatch(action),
                    _ => Action::GroupLock(action),
                })
            }
            "MovePtr" => Ok(Action::PtrMove(PtrMoveAction {
                x: int_arg("x")? as i32,
                y: int_arg("y")? as i32,
                absolute_x: arg("x").map(|e| !is_relative(e)).unwrap_or(true),
                absolute_y: arg("y").map(|e| !is_relative(e)).unwrap_or(true),
                no_accel: match arg("accel") {
                    Some(e) => !self.resolve_boolean(e)?,
                    None => false,
                },
            })),
            "PtrBtn" | "LockPtrBtn" => {
                let button = match arg("button") {
                    Some(e) => {
                        let n = self.resolve_integer(e)?;
                        if n == 0 {
                            None
                        } else {
                            Some(n as u8)
                        }
                    }
                    None => None,
                };
                let affect = match arg("affect") {
                    Some(e) => match self.resolve_string(e)? {
                        "lock" => LockAffect::Lock,
                        "unlock" => LockAffect::Unlock,
                        "neither" => LockAffect::Neither,
                        _ => LockAffect::Both,
                    },
                    None => LockAffect::Both,
                };
                let btn = PtrButtonAction {
                    button,
                    count: int_arg("count")? as u8,
                    affect,
                };
                if name == "LockPtrBtn" {
                    Ok(Action::PtrLock(btn))
                } else {
                    Ok(Action::PtrButton(btn))
                }
            }
            "SetPtrDflt" => Ok(Action::PtrDefault(PtrDefaultAction {
                value: int_arg("value")? as i32,
                absolute: arg("value").map(|e| !is_relative(e)).unwrap_or(true),
            })),
            "Terminate" => Ok(Action::Terminate),
            "SwitchScreen" => Ok(Action::SwitchVt(SwitchVtAction {
                screen: int_arg("screen")? as i32,
                same_server: bool_arg("same")?,
            })),
            "SetControls" | "LockControls" => {
                let ctrls = CtrlAction {
                    ctrls: mask_arg("controls")?,
                };
                if name == "SetControls" {
                    Ok(Action::CtrlSet(ctrls))
                } else {
                    Ok(Action::CtrlLock(ctrls))
                }
            }
            "Private" => {
                let data = int_arg("data")? as u64;
                let mut bytes = [0u8; 7];
                for (i, b) in bytes.iter_mut().enumerate() {
                    let shift = 8 * (6 - i);
                    *b = ((data >> shift) & 0xff) as u8;
                }
                Ok(Action::Private(bytes))
            }
            other => Err(CoreError::UndefinedName(other.to_string())),
        }
    }
}

/// A signed integer literal (`-N` or `+N`) is a relative delta; a bare `N`
/// is absolute. The reader in [`crate::reader`] folds a leading `+` or `-`
/// into `Unary`, since a bare `+N` and a bare `N` are otherwise
/// indistinguishable once tokenized.
fn is_relative(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Unary {
            op: UnaryOp::Negate | UnaryOp::Plus,
            ..
        }
    )
}
