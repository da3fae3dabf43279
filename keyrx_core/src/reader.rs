//! Canonical-format reader.
//!
//! A scoped recursive-descent parser for exactly the V1 text grammar
//! [`crate::serializer`] emits — a `key <NAME> = N;` keycodes block, a
//! `type "NAME" { ... }` types block, `interpret`/`indicator` statements in a
//! compat block, and `key <NAME> { ... }` blocks in a symbols block. This is
//! not a general XKB grammar: geometry sections, the legacy `//` merge
//! shorthand and multi-file include resolution are all out of scope (SPEC
//! §1); malformed input beyond what's covered here produces `PARSE_ERROR`
//! rather than a best-effort recovery.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::ast::{
    AliasDef, BinaryOp, CompatMapFile, Expr, IncludeStmt, IndicatorMapDef, InterpDef,
    KeyDef, KeycodeDef, MergeMode as AstMergeMode, Predicate as AstPredicate, Statement, TypeDef,
    UnaryOp, VModDef, VarDef,
};
use crate::atom::Atom;
use crate::compiler::assembler::{Section, Sections};
use crate::compiler::keycodes::KeycodesFile;
use crate::compiler::symbols::SymbolsFile;
use crate::compiler::types::TypesFile;
use crate::domain::aggregates::Keymap;
use crate::domain::value_objects::MergeMode;
use crate::error::{CoreError, CoreResult};
use crate::keysym::Keysym;

/// Parses the canonical text `src` into the four section files the
/// assembler consumes, interning every name into `keymap`'s atom table so
/// the resulting `Atom`s are valid against it.
pub fn read(src: &str, keymap: &mut Keymap) -> CoreResult<Sections> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        toks: tokens,
        pos: 0,
        keymap,
    };
    let mut sections = Sections::default();
    let mut file_id = 0u32;
    while !parser.at_end() {
        let keyword = parser.expect_ident()?;
        file_id += 1;
        match keyword.as_str() {
            "xkb_keycodes" => {
                let file = parser.parse_keycodes()?;
                sections.keycodes = Some(Section::new(file, file_id, MergeMode::Default));
            }
            "xkb_types" => {
                let file = parser.parse_types()?;
                sections.types = Some(Section::new(file, file_id, MergeMode::Default));
            }
            "xkb_compatibility" => {
                let file = parser.parse_compat()?;
                sections.compat = Some(Section::new(file, file_id, MergeMode::Default));
            }
            "xkb_symbols" => {
                let file = parser.parse_symbols()?;
                sections.symbols = Some(Section::new(file, file_id, MergeMode::Default));
            }
            other => {
                return Err(parser.err(format!("unknown section keyword '{}'", other)));
            }
        }
    }
    Ok(sections)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    KeyName(String),
    Str(String),
    Int(i64),
    Sym(char),
    Eof,
}

struct Positioned {
    tok: Tok,
    line: usize,
    col: usize,
}

fn lex(src: &str) -> CoreResult<Vec<Positioned>> {
    let mut out = Vec::new();
    let mut line = 1usize;
    let mut col = 1usize;
    let bytes: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    let advance_pos = |c: char, line: &mut usize, col: &mut usize| {
        if c == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    };
    while i < bytes.len() {
        let c = bytes[i];
        if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
            advance_pos(c, &mut line, &mut col);
            i += 1;
            continue;
        }
        if c == '/' && i + 1 < bytes.len() && bytes[i + 1] == '/' {
            while i < bytes.len() && bytes[i] != '\n' {
                advance_pos(bytes[i], &mut line, &mut col);
                i += 1;
            }
            continue;
        }
        let (start_line, start_col) = (line, col);
        match c {
            '{' | '}' | '(' | ')' | '[' | ']' | ';' | ',' | '=' | '.' | '+' | '-' => {
                out.push(Positioned {
                    tok: Tok::Sym(c),
                    line: start_line,
                    col: start_col,
                });
                advance_pos(c, &mut line, &mut col);
                i += 1;
            }
            '"' => {
                advance_pos(c, &mut line, &mut col);
                i += 1;
                let mut s = String::new();
                while i < bytes.len() && bytes[i] != '"' {
                    s.push(bytes[i]);
                    advance_pos(bytes[i], &mut line, &mut col);
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(CoreError::ParseError {
                        line: start_line,
                        column: start_col,
                        message: "unterminated string literal".to_string(),
                    });
                }
                advance_pos(bytes[i], &mut line, &mut col);
                i += 1;
                out.push(Positioned {
                    tok: Tok::Str(s),
                    line: start_line,
                    col: start_col,
                });
            }
            '<' => {
                advance_pos(c, &mut line, &mut col);
                i += 1;
                let mut s = String::new();
                while i < bytes.len() && bytes[i] != '>' {
                    s.push(bytes[i]);
                    advance_pos(bytes[i], &mut line, &mut col);
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(CoreError::ParseError {
                        line: start_line,
                        column: start_col,
                        message: "unterminated key name".to_string(),
                    });
                }
                advance_pos(bytes[i], &mut line, &mut col);
                i += 1;
                out.push(Positioned {
                    tok: Tok::KeyName(s),
                    line: start_line,
                    col: start_col,
                });
            }
            _ if c.is_ascii_digit() => {
                let mut s = String::new();
                if c == '0' && i + 1 < bytes.len() && (bytes[i + 1] == 'x' || bytes[i + 1] == 'X') {
                    s.push(bytes[i]);
                    advance_pos(bytes[i], &mut line, &mut col);
                    i += 1;
                    s.push(bytes[i]);
                    advance_pos(bytes[i], &mut line, &mut col);
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
                        s.push(bytes[i]);
                        advance_pos(bytes[i], &mut line, &mut col);
                        i += 1;
                    }
                    let value = i64::from_str_radix(&s[2..], 16).map_err(|_| CoreError::ParseError {
                        line: start_line,
                        column: start_col,
                        message: "invalid hex literal".to_string(),
                    })?;
                    out.push(Positioned {
                        tok: Tok::Int(value),
                        line: start_line,
                        col: start_col,
                    });
                } else {
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        s.push(bytes[i]);
                        advance_pos(bytes[i], &mut line, &mut col);
                        i += 1;
                    }
                    let value = s.parse::<i64>().map_err(|_| CoreError::ParseError {
                        line: start_line,
                        column: start_col,
                        message: "invalid integer literal".to_string(),
                    })?;
                    out.push(Positioned {
                        tok: Tok::Int(value),
                        line: start_line,
                        col: start_col,
                    });
                }
            }
            _ if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                while i < bytes.len() && (bytes[i].is_alphanumeric() || bytes[i] == '_') {
                    s.push(bytes[i]);
                    advance_pos(bytes[i], &mut line, &mut col);
                    i += 1;
                }
                out.push(Positioned {
                    tok: Tok::Ident(s),
                    line: start_line,
                    col: start_col,
                });
            }
            other => {
                return Err(CoreError::ParseError {
                    line: start_line,
                    column: start_col,
                    message: format!("unexpected character '{}'", other),
                });
            }
        }
    }
    out.push(Positioned {
        tok: Tok::Eof,
        line,
        col,
    });
    Ok(out)
}

struct Parser<'a> {
    toks: Vec<Positioned>,
    pos: usize,
    keymap: &'a mut Keymap,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        matches!(self.toks[self.pos].tok, Tok::Eof)
    }

    fn err(&self, message: String) -> CoreError {
        let p = &self.toks[self.pos];
        CoreError::ParseError {
            line: p.line,
            column: p.col,
            message,
        }
    }

    fn intern(&mut self, s: &str) -> Atom {
        self.keymap.intern(s)
    }

    fn peek(&self) -> &Tok {
        &self.toks[self.pos].tok
    }

    fn advance(&mut self) -> Tok {
        let tok = self.toks[self.pos].tok.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        tok
    }

    fn peek_is_sym(&self, c: char) -> bool {
        matches!(self.peek(), Tok::Sym(s) if *s == c)
    }

    fn peek_is_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Tok::Ident(s) if s == name)
    }

    fn expect_sym(&mut self, c: char) -> CoreResult<()> {
        if self.peek_is_sym(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}'", c)))
        }
    }

    fn expect_ident(&mut self) -> CoreResult<String> {
        match self.advance() {
            Tok::Ident(s) => Ok(s),
            other => Err(self.err(format!("expected identifier, found {:?}", other))),
        }
    }

    fn expect_str(&mut self) -> CoreResult<String> {
        match self.advance() {
            Tok::Str(s) => Ok(s),
            other => Err(self.err(format!("expected string literal, found {:?}", other))),
        }
    }

    fn expect_keyname(&mut self) -> CoreResult<String> {
        match self.advance() {
            Tok::KeyName(s) => Ok(s),
            other => Err(self.err(format!("expected <key name>, found {:?}", other))),
        }
    }

    fn expect_int(&mut self) -> CoreResult<i64> {
        match self.advance() {
            Tok::Int(n) => Ok(n),
            other => Err(self.err(format!("expected integer, found {:?}", other))),
        }
    }

    fn try_int(&mut self) -> Option<i64> {
        if let Tok::Int(n) = self.peek() {
            let n = *n;
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn parse_section_name(&mut self) -> CoreResult<Option<Atom>> {
        let name = self.expect_str()?;
        self.expect_sym('{')?;
        if name.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.intern(&name)))
        }
    }

    /// An identifier chain joined by `+` (`Shift+Lock`), a bare integer, or a
    /// single identifier (`all`, `none`, `base`, a modifier name, ...).
    fn parse_mask_expr(&mut self) -> CoreResult<Expr> {
        let mut expr = self.parse_mask_atom()?;
        while self.peek_is_sym('+') {
            self.advance();
            let rhs = self.parse_mask_atom()?;
            expr = Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_mask_atom(&mut self) -> CoreResult<Expr> {
        if let Some(n) = self.try_int() {
            return Ok(Expr::Integer(n));
        }
        let name = self.expect_ident()?;
        Ok(Expr::Ident(self.intern(&name)))
    }

    fn parse_bracket_mask(&mut self) -> CoreResult<Expr> {
        self.expect_sym('[')?;
        let e = self.parse_mask_expr()?;
        self.expect_sym(']')?;
        Ok(e)
    }

    fn parse_bracket_int(&mut self) -> CoreResult<Expr> {
        self.expect_sym('[')?;
        let n = self.expect_int()?;
        self.expect_sym(']')?;
        Ok(Expr::Integer(n))
    }

    fn try_parse_merge_keyword(&mut self) -> Option<AstMergeMode> {
        let mode = match self.peek() {
            Tok::Ident(s) if s == "augment" => Some(AstMergeMode::Augment),
            Tok::Ident(s) if s == "override" => Some(AstMergeMode::Override),
            Tok::Ident(s) if s == "replace" => Some(AstMergeMode::Replace),
            _ => None,
        };
        if mode.is_some() {
            self.advance();
        }
        mode
    }

    fn parse_keycodes(&mut self) -> CoreResult<KeycodesFile> {
        let name = self.parse_section_name()?;
        let mut file = KeycodesFile {
            name,
            ..KeycodesFile::default()
        };
        while !self.peek_is_sym('}') {
            if self.peek_is_ident("indicator") {
                self.advance();
                let idx = self.expect_int()? as u32;
                self.expect_sym('=')?;
                let nm = self.expect_str()?;
                self.expect_sym(';')?;
                let atom = self.intern(&nm);
                file.indicators.push((idx, atom));
            } else if self.peek_is_ident("alias") {
                self.advance();
                let alias = self.expect_keyname()?;
                self.expect_sym('=')?;
                let real = self.expect_keyname()?;
                self.expect_sym(';')?;
                let alias_atom = self.intern(&alias);
                let real_atom = self.intern(&real);
                file.aliases.push(AliasDef {
                    alias: alias_atom,
                    real: real_atom,
                });
            } else {
                let nm = self.expect_keyname()?;
                self.expect_sym('=')?;
                let kc = self.expect_int()? as u32;
                self.expect_sym(';')?;
                let atom = self.intern(&nm);
                file.keycodes.push(KeycodeDef {
                    name: atom,
                    keycode: kc,
                });
            }
        }
        self.expect_sym('}')?;
        self.expect_sym(';')?;
        Ok(file)
    }

    fn parse_idents_list(&mut self) -> CoreResult<Vec<Atom>> {
        let mut names = Vec::new();
        loop {
            let nm = self.expect_ident()?;
            names.push(self.intern(&nm));
            if self.peek_is_sym(',') {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_sym(';')?;
        Ok(names)
    }

    fn parse_types(&mut self) -> CoreResult<TypesFile> {
        let name = self.parse_section_name()?;
        let mut file = TypesFile {
            name,
            ..TypesFile::default()
        };
        while !self.peek_is_sym('}') {
            if self.peek_is_ident("virtual_modifiers") {
                self.advance();
                file.virtual_modifiers.extend(self.parse_idents_list()?);
            } else if self.peek_is_ident("type") {
                self.advance();
                let tname = self.expect_str()?;
                self.expect_sym('{')?;
                let mut body = Vec::new();
                while !self.peek_is_sym('}') {
                    body.push(self.parse_type_body_var()?);
                }
                self.expect_sym('}')?;
                self.expect_sym(';')?;
                let atom = self.intern(&tname);
                file.types.push(TypeDef {
                    name: atom,
                    merge: AstMergeMode::Default,
                    body,
                });
            } else {
                return Err(self.err("expected 'virtual_modifiers' or 'type'".to_string()));
            }
        }
        self.expect_sym('}')?;
        self.expect_sym(';')?;
        Ok(file)
    }

    fn parse_type_body_var(&mut self) -> CoreResult<VarDef> {
        let field = self.expect_ident()?;
        match field.as_str() {
            "modifiers" => {
                self.expect_sym('=')?;
                let value = self.parse_mask_expr()?;
                self.expect_sym(';')?;
                let atom = self.intern("modifiers");
                Ok(VarDef {
                    name: Some(Expr::Ident(atom)),
                    value,
                })
            }
            "map" => {
                let index = self.parse_bracket_mask()?;
                self.expect_sym('=')?;
                let value = self.parse_mask_expr()?;
                self.expect_sym(';')?;
                let field_atom = self.intern("map");
                Ok(VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: field_atom,
                        index: Box::new(index),
                    }),
                    value,
                })
            }
            "preserve" => {
                let index = self.parse_bracket_mask()?;
                self.expect_sym('=')?;
                let value = self.parse_mask_expr()?;
                self.expect_sym(';')?;
                let field_atom = self.intern("preserve");
                Ok(VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: field_atom,
                        index: Box::new(index),
                    }),
                    value,
                })
            }
            "level_name" => {
                let index = self.parse_bracket_int()?;
                self.expect_sym('=')?;
                let s = self.expect_str()?;
                self.expect_sym(';')?;
                let field_atom = self.intern("level_name");
                let value_atom = self.intern(&s);
                Ok(VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: field_atom,
                        index: Box::new(index),
                    }),
                    value: Expr::Str(value_atom),
                })
            }
            other => Err(self.err(format!("unknown type field '{}'", other))),
        }
    }

    fn parse_compat(&mut self) -> CoreResult<CompatMapFile> {
        let name = self.parse_section_name()?;
        let mut statements = Vec::new();
        while !self.peek_is_sym('}') {
            statements.push(self.parse_compat_stmt()?);
        }
        self.expect_sym('}')?;
        self.expect_sym(';')?;
        Ok(CompatMapFile { name, statements })
    }

    fn parse_compat_stmt(&mut self) -> CoreResult<Statement> {
        let merge = self.try_parse_merge_keyword();
        if self.peek_is_ident("virtual_modifiers") {
            self.advance();
            let names = self.parse_idents_list()?;
            return Ok(Statement::VMod(VModDef { names }));
        }
        if self.peek_is_ident("include") {
            self.advance();
            let path = self.expect_str()?;
            self.expect_sym(';')?;
            return Ok(Statement::Include(self.parse_include_chain(
                &path,
                merge.unwrap_or(AstMergeMode::Default),
            )?));
        }
        if self.peek_is_ident("interpret") {
            self.advance();
            if self.peek_is_sym('.') {
                self.advance();
                let field = self.expect_ident()?;
                self.expect_sym('=')?;
                let value = self.parse_led_body_value()?;
                self.expect_sym(';')?;
                let element = self.intern("interpret");
                let field_atom = self.intern(&field);
                return Ok(Statement::Var(VarDef {
                    name: Some(Expr::FieldRef {
                        element,
                        field: field_atom,
                    }),
                    value,
                }));
            }
            let (sym, predicate) = self.parse_interp_head()?;
            self.expect_sym('{')?;
            let mut body = Vec::new();
            while !self.peek_is_sym('}') {
                body.push(self.parse_interp_body_var()?);
            }
            self.expect_sym('}')?;
            self.expect_sym(';')?;
            return Ok(Statement::Interp(InterpDef {
                sym,
                predicate,
                merge: merge.unwrap_or(AstMergeMode::Default),
                body,
            }));
        }
        if self.peek_is_ident("indicator") {
            self.advance();
            if self.peek_is_sym('.') {
                self.advance();
                let field = self.expect_ident()?;
                self.expect_sym('=')?;
                let value = self.parse_led_body_value()?;
                self.expect_sym(';')?;
                let element = self.intern("indicator");
                let field_atom = self.intern(&field);
                return Ok(Statement::Var(VarDef {
                    name: Some(Expr::FieldRef {
                        element,
                        field: field_atom,
                    }),
                    value,
                }));
            }
            let nm = self.expect_str()?;
            self.expect_sym('{')?;
            let mut body = Vec::new();
            while !self.peek_is_sym('}') {
                body.push(self.parse_led_body_var()?);
            }
            self.expect_sym('}')?;
            self.expect_sym(';')?;
            let name_atom = self.intern(&nm);
            return Ok(Statement::IndicatorMap(IndicatorMapDef {
                name: name_atom,
                merge: merge.unwrap_or(AstMergeMode::Default),
                body,
            }));
        }
        Err(self.err("expected 'virtual_modifiers', 'include', 'interpret' or 'indicator'".to_string()))
    }

    /// `"a+b|c"`: a `+`-joined chain of includes that augment, a `|`-joined
    /// chain that override. Only the two operators this crate's own
    /// serializer emits are supported; the general include path grammar is
    /// out of scope.
    fn parse_include_chain(&mut self, path: &str, head_merge: AstMergeMode) -> CoreResult<IncludeStmt> {
        let mut segments: Vec<(AstMergeMode, &str)> = Vec::new();
        let mut current_merge = head_merge;
        let mut start = 0usize;
        for (idx, ch) in path.char_indices() {
            if ch == '+' || ch == '|' {
                segments.push((current_merge, &path[start..idx]));
                current_merge = if ch == '+' {
                    AstMergeMode::Augment
                } else {
                    AstMergeMode::Override
                };
                start = idx + ch.len_utf8();
            }
        }
        segments.push((current_merge, &path[start..]));

        let mut root: Option<IncludeStmt> = None;
        for (merge, seg) in segments.into_iter().rev() {
            let seg_atom = self.intern(seg.trim());
            root = Some(IncludeStmt {
                merge,
                path: seg_atom,
                map_name: None,
                next: root.map(Box::new),
            });
        }
        Ok(root.unwrap_or(IncludeStmt {
            merge: head_merge,
            path: Atom::NONE,
            map_name: None,
            next: None,
        }))
    }

    fn parse_interp_head(&mut self) -> CoreResult<(Option<Keysym>, Option<(AstPredicate, Expr)>)> {
        let sym = if self.peek_is_sym('+') {
            None
        } else {
            let nm = self.expect_ident()?;
            Some(
                Keysym::from_name(&nm)
                    .ok_or_else(|| self.err(format!("unknown keysym '{}'", nm)))?,
            )
        };
        if self.peek_is_sym('+') {
            self.advance();
            let pred_name = self.expect_ident()?;
            let pred = match pred_name.as_str() {
                "AnyOfOrNone" => AstPredicate::AnyOfOrNone,
                "AnyOf" => AstPredicate::AnyOf,
                "NoneOf" => AstPredicate::NoneOf,
                "AllOf" => AstPredicate::AllOf,
                "Exactly" => AstPredicate::Exactly,
                "Any" => AstPredicate::Any,
                other => return Err(self.err(format!("unknown predicate '{}'", other))),
            };
            self.expect_sym('(')?;
            let mask = self.parse_mask_expr()?;
            self.expect_sym(')')?;
            Ok((sym, Some((pred, mask))))
        } else {
            Ok((sym, None))
        }
    }

    fn parse_interp_body_var(&mut self) -> CoreResult<VarDef> {
        let field = self.expect_ident()?;
        self.expect_sym('=')?;
        let value = match field.to_ascii_lowercase().as_str() {
            "action" => self.parse_action_expr()?,
            _ => self.parse_mask_expr()?,
        };
        self.expect_sym(';')?;
        let field_atom = self.intern(&field);
        Ok(VarDef {
            name: Some(Expr::Ident(field_atom)),
            value,
        })
    }

    fn parse_led_body_var(&mut self) -> CoreResult<VarDef> {
        let field = self.expect_ident()?;
        self.expect_sym('=')?;
        let value = self.parse_led_body_value()?;
        self.expect_sym(';')?;
        let field_atom = self.intern(&field);
        Ok(VarDef {
            name: Some(Expr::Ident(field_atom)),
            value,
        })
    }

    fn parse_led_body_value(&mut self) -> CoreResult<Expr> {
        self.parse_mask_expr()
    }

    /// `NAME ( arg=value, ... )`, or the bare identifier `NoAction` (the only
    /// action form [`crate::expr::Evaluator::resolve_action`] accepts without
    /// parentheses).
    fn parse_action_expr(&mut self) -> CoreResult<Expr> {
        let name = self.expect_ident()?;
        if name == "NoAction" && !self.peek_is_sym('(') {
            let atom = self.intern(&name);
            return Ok(Expr::Ident(atom));
        }
        self.expect_sym('(')?;
        let mut args = Vec::new();
        while !self.peek_is_sym(')') {
            let arg_name = self.expect_ident()?;
            self.expect_sym('=')?;
            let value = self.parse_arg_value_expr()?;
            let arg_atom = self.intern(&arg_name);
            args.push((arg_atom, value));
            if self.peek_is_sym(',') {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_sym(')')?;
        let name_atom = self.intern(&name);
        Ok(Expr::ActionDecl {
            name: name_atom,
            args,
        })
    }

    /// A signed integer (`+1`/`-1`, recorded with its explicit sign so
    /// [`crate::expr::Evaluator::resolve_action`] can tell a relative delta
    /// from an absolute value), a bare integer, or an identifier chain.
    fn parse_arg_value_expr(&mut self) -> CoreResult<Expr> {
        if self.peek_is_sym('+') {
            self.advance();
            let n = self.expect_int()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Plus,
                expr: Box::new(Expr::Integer(n)),
            });
        }
        if self.peek_is_sym('-') {
            self.advance();
            let n = self.expect_int()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Negate,
                expr: Box::new(Expr::Integer(n)),
            });
        }
        if let Some(n) = self.try_int() {
            return Ok(Expr::Integer(n));
        }
        self.parse_mask_expr()
    }

    fn parse_symbols(&mut self) -> CoreResult<SymbolsFile> {
        let name = self.parse_section_name()?;
        let mut file = SymbolsFile {
            name,
            ..SymbolsFile::default()
        };
        while !self.peek_is_sym('}') {
            if self.peek_is_ident("name") {
                self.advance();
                let index = self.parse_bracket_int()?;
                let n = match index {
                    Expr::Integer(n) => n as u32,
                    _ => unreachable!("parse_bracket_int always returns Expr::Integer"),
                };
                self.expect_sym('=')?;
                let s = self.expect_str()?;
                self.expect_sym(';')?;
                let atom = self.intern(&s);
                file.group_names.push((n, atom));
            } else if self.peek_is_ident("modifier_map") {
                self.advance();
                let mod_name = self.expect_ident()?;
                self.expect_sym('{')?;
                let mut members = Vec::new();
                while !self.peek_is_sym('}') {
                    let kn = self.expect_keyname()?;
                    members.push(self.intern(&kn));
                    if self.peek_is_sym(',') {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect_sym('}')?;
                self.expect_sym(';')?;
                let mod_atom = self.intern(&mod_name);
                file.modifier_maps.push((mod_atom, members));
            } else {
                self.try_parse_merge_keyword();
                if !self.peek_is_ident("key") {
                    return Err(self.err("expected 'key', 'name' or 'modifier_map'".to_string()));
                }
                self.advance();
                let kn = self.expect_keyname()?;
                self.expect_sym('{')?;
                let mut body = Vec::new();
                if self.peek_is_sym('[') {
                    let value = self.parse_sym_list()?;
                    self.expect_sym(';')?;
                    body.push(VarDef { name: None, value });
                } else {
                    while !self.peek_is_sym('}') {
                        body.push(self.parse_key_body_var()?);
                    }
                }
                self.expect_sym('}')?;
                self.expect_sym(';')?;
                let atom = self.intern(&kn);
                file.keys.push(KeyDef {
                    name: atom,
                    merge: AstMergeMode::Default,
                    body,
                });
            }
        }
        self.expect_sym('}')?;
        self.expect_sym(';')?;
        Ok(file)
    }

    /// `[ entry, entry, ... ]`: one entry per level. A bare entry is a
    /// single-keysym level; a `{ a, b, ... }` nested group is a level
    /// carrying several keysyms; the literal ident `NoSymbol` is a level
    /// with none. Produces [`Expr::SymList`], one inner `Vec` per level.
    fn parse_sym_list(&mut self) -> CoreResult<Expr> {
        self.expect_sym('[')?;
        let mut levels: Vec<Vec<Expr>> = Vec::new();
        while !self.peek_is_sym(']') {
            if self.peek_is_sym('{') {
                self.advance();
                let mut group = Vec::new();
                while !self.peek_is_sym('}') {
                    group.push(self.parse_one_sym()?);
                    if self.peek_is_sym(',') {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect_sym('}')?;
                levels.push(group);
            } else {
                let entry = self.parse_one_sym()?;
                match entry {
                    Expr::KeysymLit(sym) if sym.is_no_symbol() => levels.push(Vec::new()),
                    other => levels.push(alloc::vec![other]),
                }
            }
            if self.peek_is_sym(',') {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_sym(']')?;
        if levels.is_empty() {
            return Err(self.err("empty symbol list".to_string()));
        }
        Ok(Expr::SymList(levels))
    }

    /// A single keysym-valued entry: a known keysym name, or an identifier
    /// the expression evaluator resolves later.
    fn parse_one_sym(&mut self) -> CoreResult<Expr> {
        let nm = self.expect_ident()?;
        let atom = self.intern(&nm);
        Ok(match Keysym::from_name(&nm) {
            Some(sym) => Expr::KeysymLit(sym),
            None => Expr::Ident(atom),
        })
    }

    fn parse_key_body_var(&mut self) -> CoreResult<VarDef> {
        let field = self.expect_ident()?;
        match field.to_ascii_lowercase().as_str() {
            "type" => {
                self.expect_sym('=')?;
                let s = self.expect_str()?;
                self.expect_sym(';')?;
                let field_atom = self.intern("type");
                let value_atom = self.intern(&s);
                Ok(VarDef {
                    name: Some(Expr::Ident(field_atom)),
                    value: Expr::Str(value_atom),
                })
            }
            "symbols" => {
                let index = self.parse_bracket_int()?;
                self.expect_sym('=')?;
                let value = self.parse_sym_list()?;
                self.expect_sym(';')?;
                let field_atom = self.intern("symbols");
                Ok(VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: field_atom,
                        index: Box::new(index),
                    }),
                    value,
                })
            }
            "actions" => {
                let index = self.parse_bracket_int()?;
                self.expect_sym('=')?;
                let value = self.parse_action_expr()?;
                self.expect_sym(';')?;
                let field_atom = self.intern("actions");
                Ok(VarDef {
                    name: Some(Expr::ArrayRef {
                        element: None,
                        field: field_atom,
                        index: Box::new(index),
                    }),
                    value,
                })
            }
            "repeat" | "virtualmods" | "virtualmodifiers" | "groupsclamp" | "groupsredirect" => {
                self.expect_sym('=')?;
                let value = self.parse_arg_value_expr()?;
                self.expect_sym(';')?;
                let field_atom = self.intern(&field);
                Ok(VarDef {
                    name: Some(Expr::Ident(field_atom)),
                    value,
                })
            }
            other => Err(self.err(format!("unknown key field '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::assembler::Assembler;
    use crate::domain::entities::Action;

    #[test]
    fn reads_keycodes_section_into_keys() {
        let mut keymap = Keymap::new();
        let src = r#"xkb_keycodes "" { <ESC> = 9; };"#;
        let sections = read(src, &mut keymap).unwrap();
        let file = sections.keycodes.unwrap().file;
        assert_eq!(file.keycodes.len(), 1);
        assert_eq!(file.keycodes[0].keycode, 9);
    }

    #[test]
    fn reads_a_type_with_a_map_entry() {
        let mut keymap = Keymap::new();
        let src = r#"xkb_types "" {
            type "ONE_LEVEL" {
                modifiers = Shift;
                map[Shift] = Level2;
            };
        };"#;
        let sections = read(src, &mut keymap).unwrap();
        let file = sections.types.unwrap().file;
        assert_eq!(file.types.len(), 1);
        assert_eq!(file.types[0].body.len(), 2);
    }

    #[test]
    fn reads_an_interpret_with_a_predicate_and_action() {
        let mut keymap = Keymap::new();
        let src = r#"xkb_compatibility "" {
            interpret Caps_Lock+AnyOfOrNone(all) {
                action = LockMods(modifiers=Lock);
            };
        };"#;
        let sections = read(src, &mut keymap).unwrap();
        let file = sections.compat.unwrap().file;
        assert_eq!(file.statements.len(), 1);
        match &file.statements[0] {
            Statement::Interp(def) => {
                assert!(def.predicate.is_some());
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected an interpret statement: {:?}", other),
        }
    }

    #[test]
    fn reads_a_simple_key_block() {
        let mut keymap = Keymap::new();
        let src = r#"xkb_symbols "" {
            key <ESC> { [ Escape ] };
        };"#;
        let sections = read(src, &mut keymap).unwrap();
        let file = sections.symbols.unwrap().file;
        assert_eq!(file.keys.len(), 1);
        assert!(file.keys[0].body[0].name.is_none());
    }

    #[test]
    fn round_trips_through_the_serializer() {
        let mut keymap = Keymap::new();
        let esc = keymap.intern("ESC");
        let escape_sym = keymap.intern("Escape");
        keymap.keys.push(crate::domain::entities::Key {
            name: esc,
            keycode: 9,
            groups: alloc::vec![crate::domain::entities::Group {
                type_name: Atom::NONE,
                explicit_type: false,
                levels: alloc::vec![crate::domain::entities::Level {
                    syms: alloc::vec![Keysym::from_name("Escape").unwrap()],
                    action: Action::None,
                }],
            }],
            ..Default::default()
        });
        let _ = escape_sym;
        let text = crate::serializer::serialize(&keymap);

        let mut reparsed = Keymap::new();
        let sections = read(&text, &mut reparsed).unwrap();
        Assembler::new().assemble(&sections, &mut reparsed).unwrap();

        let key = reparsed.find_key_by_name(reparsed.atoms.find("ESC").unwrap()).unwrap();
        assert_eq!(key.keycode, 9);
        assert_eq!(
            key.groups[0].levels[0].syms,
            alloc::vec![Keysym::from_name("Escape").unwrap()]
        );
    }
}
