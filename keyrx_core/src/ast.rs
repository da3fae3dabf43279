//! Statement-tree types.
//!
//! These are the node shapes the section compilers (`compiler::compat`,
//! `compiler::keycodes`, `compiler::types`, `compiler::symbols`) consume.
//! The general-purpose grammar that would parse arbitrary historical XKB
//! source text into this tree is out of scope; the scoped reader in
//! [`crate::reader`] builds exactly this tree from the canonical V1 subset
//! that [`crate::serializer`] emits.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::atom::Atom;
use crate::keysym::Keysym;

/// How a newly parsed record combines with one already present under the
/// same identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Use the including file's established mode (first include sets it).
    Default,
    /// Old field values win whenever they were already defined.
    Augment,
    /// New field values win; a collision between two explicit definitions
    /// from different sources is only a warning.
    Override,
    /// Unconditionally replace the whole prior record.
    Replace,
}

impl Default for MergeMode {
    fn default() -> Self {
        MergeMode::Default
    }
}

/// A match predicate used in `interpret SYM+PRED(mask)` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    AnyOfOrNone,
    AnyOf,
    NoneOf,
    AllOf,
    Exactly,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    Invert,
    /// An explicit leading `+` on a value (`group=+1`), distinct from a bare
    /// unsigned literal: it marks the value as relative rather than
    /// absolute, the way `+N` does in action argument lists.
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// An expression node, as it appears on the right-hand side of a statement
/// or inside an action declaration's argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(Atom),
    Str(Atom),
    Integer(i64),
    Boolean(bool),
    KeysymLit(Keysym),
    /// `[ entry, entry, ... ]` as it appears in a `key <NAME> { [ ... ] }` or
    /// `symbols[Group]= [ ... ]` statement: one entry per level, outermost
    /// to innermost. A level with no keysyms (`NoSymbol`) is an empty inner
    /// `Vec`; one keysym is a single-element `Vec`; a `{ a, b, ... }`
    /// nested group is a multi-element `Vec`.
    SymList(Vec<Vec<Expr>>),
    FieldRef {
        element: Atom,
        field: Atom,
    },
    ArrayRef {
        element: Option<Atom>,
        field: Atom,
        index: Box<Expr>,
    },
    ActionDecl {
        name: Atom,
        args: Vec<(Atom, Expr)>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// `lhs = expr;` A `name: None` bare statement is a default-template inner
/// body line, e.g. `action = SetMods(modifiers=Shift);` inside an
/// `interpret { }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDef {
    pub name: Option<Expr>,
    pub value: Expr,
}

/// `interpret SYM+PRED(mask) { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpDef {
    pub sym: Option<Keysym>,
    pub predicate: Option<(Predicate, Expr)>,
    pub merge: MergeMode,
    pub body: Vec<VarDef>,
}

/// `indicator "NAME" { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMapDef {
    pub name: Atom,
    pub merge: MergeMode,
    pub body: Vec<VarDef>,
}

/// `include "a+b|c"` chain link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeStmt {
    pub merge: MergeMode,
    pub path: Atom,
    pub map_name: Option<Atom>,
    pub next: Option<Box<IncludeStmt>>,
}

/// `virtual_modifiers Foo, Bar;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VModDef {
    pub names: Vec<Atom>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Include(IncludeStmt),
    Interp(InterpDef),
    IndicatorMap(IndicatorMapDef),
    Var(VarDef),
    VMod(VModDef),
}

/// A whole `xkb_compatibility "name" { ... }` section, pre-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompatMapFile {
    pub name: Option<Atom>,
    pub statements: Vec<Statement>,
}

/// `key <NAME> { ... }` statement body, used by the symbols section compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    pub name: Atom,
    pub merge: MergeMode,
    pub body: Vec<VarDef>,
}

/// `type "NAME" { ... }` statement body, used by the types section compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: Atom,
    pub merge: MergeMode,
    pub body: Vec<VarDef>,
}

/// `<NAME> = NUMBER;` keycode declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeycodeDef {
    pub name: Atom,
    pub keycode: u32,
}

/// `alias <A> = <B>;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasDef {
    pub alias: Atom,
    pub real: Atom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_mode_defaults_to_default() {
        assert_eq!(MergeMode::default(), MergeMode::Default);
    }

    #[test]
    fn include_chain_links_via_next() {
        let inner = IncludeStmt {
            merge: MergeMode::Augment,
            path: Atom::NONE,
            map_name: None,
            next: None,
        };
        let outer = IncludeStmt {
            merge: MergeMode::Default,
            path: Atom::NONE,
            map_name: None,
            next: Some(alloc::boxed::Box::new(inner)),
        };
        assert!(outer.next.is_some());
    }
}
