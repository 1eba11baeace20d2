//! Recursive-descent parser and semantic/code-generation driver (§4.G).
//!
//! This is the control algorithm that drives every other component: it
//! pulls tokens from the [`Lexer`], interns names via
//! [`crate::interner::StringInterner`], declares/resolves them in the
//! [`SymbolTable`], and emits/backpatches instructions in the
//! [`CodeBuffer`] as a side effect of recognising productions. Error
//! recovery (`accept`/`synchronise`) runs against [`TokenSet`]s built over
//! the token code space.

use crate::codegen::{CodeAddress, CodeBuffer, Opcode, RelOp};
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostic, FatalError, Severity};
use crate::interner::{InternHandle, StringInterner};
use crate::lexer::Lexer;
use crate::source::CharSource;
use crate::symtab::{SymbolId, SymbolKind, SymbolTable};
use crate::token::{Token, TokenCode};
use crate::token_set::TokenSet;

fn first_statement() -> TokenSet {
    TokenSet::from_list(&[
        TokenCode::Identifier,
        TokenCode::While,
        TokenCode::If,
        TokenCode::Read,
        TokenCode::Write,
    ])
}

/// Legal tokens at the point where `[Declarations] {ProcDeclaration} Block`
/// begins — used by `Synchronise` after `PROGRAM id ;` and after each
/// `ProcDeclaration`/`Declarations` block.
fn first_decl_or_proc_or_block() -> TokenSet {
    TokenSet::from_list(&[TokenCode::Var, TokenCode::Procedure, TokenCode::Begin])
}

fn relop_set() -> TokenSet {
    TokenSet::from_list(&[
        TokenCode::Equality,
        TokenCode::Less,
        TokenCode::Greater,
        TokenCode::LessEqual,
        TokenCode::GreaterEqual,
    ])
}

/// A fully rendered compile result: the diagnostics raised, whether code
/// generation was killed by a semantic error, and the textual assembly
/// listing (already reflecting the error banner if it was killed).
pub struct CompileOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub errors_present: bool,
    pub code_text: String,
    pub source_lines: Vec<crate::source::LineBuffer>,
}

impl CompileOutcome {
    /// Whether the compile should be reported to the caller as a success
    /// (§6: "exit 0 on successful compile, including compiles with
    /// recovered errors but no fatal ones" — but a killed code generator
    /// still means the overall CLI exit code is non-zero, since the
    /// program text failed to produce usable code).
    pub fn succeeded(&self) -> bool {
        !self.errors_present
    }
}

/// Three places a variable/procedure reference can be satisfied: an
/// absolute data address, a frame-pointer-relative offset in the current
/// frame, or (after walking the static chain) a stack-pointer-indirect
/// offset in an enclosing frame.
#[derive(Debug, Clone, Copy)]
struct OpcodeFamily {
    absolute: Opcode,
    fp: Opcode,
    sp: Opcode,
}

const LOAD_FAMILY: OpcodeFamily = OpcodeFamily {
    absolute: Opcode::LoadAbsolute,
    fp: Opcode::LoadFp,
    sp: Opcode::LoadSp,
};
const STORE_FAMILY: OpcodeFamily = OpcodeFamily {
    absolute: Opcode::StoreAbsolute,
    fp: Opcode::StoreFp,
    sp: Opcode::StoreSp,
};
const READ_FAMILY: OpcodeFamily = OpcodeFamily {
    absolute: Opcode::ReadAbsolute,
    fp: Opcode::ReadFp,
    sp: Opcode::ReadSp,
};

pub struct Parser {
    source: CharSource,
    interner: StringInterner,
    symtab: SymbolTable,
    code: CodeBuffer,
    current: Token,
    recovering: bool,
    scope_depth: u32,
    /// Next free data slot per active scope, indexed by `scope_depth - 1`.
    next_data_addr: Vec<i64>,
    dummy_symbol: Option<SymbolId>,
}

impl Parser {
    pub fn new(source_text: &str, config: &CompilerConfig) -> Result<Self, FatalError> {
        let code = if config.growable_code_buffer {
            CodeBuffer::unbounded()
        } else {
            CodeBuffer::with_capacity(config.code_capacity)
        };
        let mut parser = Parser {
            source: CharSource::with_tab_width(source_text, config.tab_width),
            interner: StringInterner::new(),
            symtab: SymbolTable::new(),
            code,
            current: Token::new(TokenCode::EndOfInput),
            recovering: false,
            scope_depth: 1,
            next_data_addr: vec![0],
            dummy_symbol: None,
        };
        parser.advance()?;
        Ok(parser)
    }

    /// Parses the whole program and renders the final compile outcome.
    pub fn compile(mut self) -> Result<CompileOutcome, FatalError> {
        self.parse_program()?;
        let mut diagnostics = self.source.take_diagnostics();
        diagnostics.sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));
        let errors_present = self.code.errors_present();
        let code_text = self.code.render();
        let source_lines = self.source.all_lines();
        Ok(CompileOutcome {
            diagnostics,
            errors_present,
            code_text,
            source_lines,
        })
    }

    // ---- token stream plumbing -------------------------------------

    fn advance(&mut self) -> Result<(), FatalError> {
        let mut lexer = Lexer::new(&mut self.source, &mut self.interner);
        self.current = lexer.next_token()?;
        Ok(())
    }

    /// Routes a recoverable parser diagnostic through the character
    /// source (§4.H: "print a message via the character source"), so it
    /// is recorded both as a [`Diagnostic`] and as a caret annotation on
    /// the line buffer the annotated listing renders from.
    fn push_diag(&mut self, severity: Severity, message: String) {
        let column = self.current.position;
        self.source.report_error(severity, message, column);
    }

    fn syntax_error_token(&mut self, expected: TokenCode) {
        let message = format!(
            "Expected {}, got {}",
            expected.name(),
            self.current.code.name()
        );
        self.push_diag(Severity::SyntaxToken, message);
    }

    fn syntax_error_set(&mut self, _expected: &TokenSet) {
        let message = format!("Unexpected {}", self.current.code.name());
        self.push_diag(Severity::SyntaxSet, message);
    }

    fn semantic_error(&mut self, message: impl Into<String>, position: usize) {
        self.source.report_error(Severity::Semantic, message, position);
    }

    /// §4.G "Accept": if recovering, skip to the expected token (or EOF);
    /// then compare and either advance past a match or report and start
    /// recovering.
    fn accept(&mut self, expected: TokenCode) -> Result<(), FatalError> {
        if self.recovering {
            while self.current.code != expected && self.current.code != TokenCode::EndOfInput {
                self.advance()?;
            }
            self.recovering = false;
        }
        if self.current.code != expected {
            self.syntax_error_token(expected);
            self.recovering = true;
            Ok(())
        } else {
            self.advance()
        }
    }

    /// §4.G "Synchronise": if the current token is already legal, this is
    /// a no-op; otherwise report and skip to the FIRST ∪ beacon set.
    fn synchronise(&mut self, first: TokenSet, follow_beacons: TokenSet) -> Result<(), FatalError> {
        if first.contains(self.current.code) {
            return Ok(());
        }
        self.syntax_error_set(&first);
        let allowed = TokenSet::union(&[first, follow_beacons]);
        while !allowed.contains(self.current.code) && self.current.code != TokenCode::EndOfInput {
            self.advance()?;
        }
        Ok(())
    }

    fn current_identifier(&self) -> (String, InternHandle) {
        let handle = self
            .current
            .spelling
            .expect("caller must check code == Identifier first");
        (self.interner.resolve(handle).to_string(), handle)
    }

    // ---- symbol table plumbing --------------------------------------

    fn dummy_symbol(&mut self) -> SymbolId {
        if let Some(id) = self.dummy_symbol {
            return id;
        }
        self.interner.begin();
        let handle = self.interner.commit();
        let hash = SymbolTable::hash("");
        let id = self.symtab.enter(handle, hash);
        let sym = self.symtab.get_mut(id);
        sym.scope = 1;
        sym.kind = SymbolKind::GlobalVariable;
        sym.address = 0;
        self.dummy_symbol = Some(id);
        id
    }

    /// §4.E declaration contract: shadowing across scopes is fine, a
    /// second declaration at the *same* depth is a semantic error.
    fn declare(&mut self, name: &str, handle: InternHandle, kind: SymbolKind, position: usize) -> SymbolId {
        let hash = SymbolTable::hash(name);
        let depth = self.scope_depth;
        if let Some(existing) = self.symtab.probe(name, hash, &self.interner) {
            if self.symtab.get(existing).scope == depth {
                self.semantic_error(format!("Redeclaration of '{name}'"), position);
                self.code.kill_output();
            }
        }
        let id = self.symtab.enter(handle, hash);
        let sym = self.symtab.get_mut(id);
        sym.scope = depth;
        sym.kind = kind;
        if kind.is_variable() {
            let counter = self
                .next_data_addr
                .last_mut()
                .expect("scope stack is never empty while parsing");
            sym.address = *counter;
            *counter += 1;
        }
        id
    }

    /// §4.E resolution contract. Undeclared names are a semantic error
    /// and kill code generation, but parsing (and codegen, harmlessly)
    /// continues using a placeholder symbol so the rest of the compile
    /// can still run and surface further diagnostics.
    fn resolve(&mut self, name: &str, position: usize) -> SymbolId {
        let hash = SymbolTable::hash(name);
        match self.symtab.probe(name, hash, &self.interner) {
            Some(id) => id,
            None => {
                self.semantic_error("Identifier not declared", position);
                self.code.kill_output();
                self.dummy_symbol()
            }
        }
    }

    /// Emits the load/store/read sequence for a variable at `def_scope`,
    /// referenced from `self.scope_depth`, per the addressing rules of
    /// §4.G: absolute for globals, frame-relative in the same scope, or a
    /// static-chain walk (one `Load [SP]` per intervening scope) for an
    /// enclosing scope's locals.
    fn emit_access(
        &mut self,
        kind: SymbolKind,
        address: i64,
        def_scope: u32,
        family: OpcodeFamily,
    ) -> Result<(), FatalError> {
        if matches!(kind, SymbolKind::GlobalVariable | SymbolKind::Program) {
            self.code.emit(family.absolute, address)?;
            return Ok(());
        }
        let j = self.scope_depth.saturating_sub(def_scope);
        if j == 0 {
            self.code.emit(family.fp, address)?;
        } else {
            self.code.emit(Opcode::LoadFp, 0)?;
            for _ in 0..(j - 1) {
                self.code.emit(Opcode::LoadSp, 0)?;
            }
            self.code.emit(family.sp, address)?;
        }
        Ok(())
    }

    // ---- grammar ------------------------------------------------------

    fn parse_program(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::Program)?;
        if self.current.code == TokenCode::Identifier {
            let (name, handle) = self.current_identifier();
            let position = self.current.position;
            self.advance()?;
            self.declare(&name, handle, SymbolKind::Program, position);
        } else {
            self.syntax_error_token(TokenCode::Identifier);
            self.recovering = true;
        }
        self.accept(TokenCode::Semicolon)?;

        let sync_fb = TokenSet::from_list(&[TokenCode::Dot, TokenCode::EndOfInput]);
        self.synchronise(first_decl_or_proc_or_block(), sync_fb)?;
        if self.current.code == TokenCode::Var {
            self.parse_declarations(SymbolKind::GlobalVariable)?;
        }
        self.synchronise(first_decl_or_proc_or_block(), sync_fb)?;
        while self.current.code == TokenCode::Procedure {
            self.parse_proc_declaration()?;
            self.synchronise(first_decl_or_proc_or_block(), sync_fb)?;
        }

        self.parse_block()?;
        self.accept(TokenCode::Dot)?;
        Ok(())
    }

    fn parse_declarations(&mut self, kind: SymbolKind) -> Result<(), FatalError> {
        self.accept(TokenCode::Var)?;
        loop {
            if self.current.code == TokenCode::Identifier {
                let (name, handle) = self.current_identifier();
                let position = self.current.position;
                self.advance()?;
                self.declare(&name, handle, kind, position);
            } else {
                self.syntax_error_token(TokenCode::Identifier);
                self.recovering = true;
                break;
            }
            if self.current.code == TokenCode::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.accept(TokenCode::Semicolon)?;
        Ok(())
    }

    fn parse_proc_declaration(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::Procedure)?;
        let proc_id = if self.current.code == TokenCode::Identifier {
            let (name, handle) = self.current_identifier();
            let position = self.current.position;
            self.advance()?;
            Some(self.declare(&name, handle, SymbolKind::Procedure, position))
        } else {
            self.syntax_error_token(TokenCode::Identifier);
            self.recovering = true;
            None
        };

        self.scope_depth += 1;
        self.next_data_addr.push(0);

        let (param_count, param_is_ref) = if self.current.code == TokenCode::LeftParen {
            self.parse_parameter_list()?
        } else {
            (0, 0)
        };
        if let Some(id) = proc_id {
            let sym = self.symtab.get_mut(id);
            sym.param_count = param_count;
            sym.param_is_ref = param_is_ref;
        }

        self.accept(TokenCode::Semicolon)?;

        let sync_fb = TokenSet::from_list(&[TokenCode::Semicolon, TokenCode::EndOfInput]);
        self.synchronise(first_decl_or_proc_or_block(), sync_fb)?;
        if self.current.code == TokenCode::Var {
            self.parse_declarations(SymbolKind::LocalVariable)?;
        }
        self.synchronise(first_decl_or_proc_or_block(), sync_fb)?;
        while self.current.code == TokenCode::Procedure {
            self.parse_proc_declaration()?;
            self.synchronise(first_decl_or_proc_or_block(), sync_fb)?;
        }

        // The procedure's entry point is the first instruction of its
        // own block, which we're about to emit.
        if let Some(id) = proc_id {
            let entry = self.code.current_address();
            self.symtab.get_mut(id).address = entry.0 as i64;
        }

        self.parse_block()?;

        self.symtab.remove_at_or_above(self.scope_depth);
        self.next_data_addr.pop();
        self.scope_depth -= 1;

        self.accept(TokenCode::Semicolon)?;
        Ok(())
    }

    fn parse_parameter_list(&mut self) -> Result<(u32, u32), FatalError> {
        self.accept(TokenCode::LeftParen)?;
        let mut count: u32 = 0;
        let mut bitmap: u32 = 0;
        let is_ref = self.parse_formal_parameter()?;
        if is_ref {
            bitmap |= 1 << count;
        }
        count += 1;
        while self.current.code == TokenCode::Comma {
            self.advance()?;
            let is_ref = self.parse_formal_parameter()?;
            if is_ref {
                bitmap |= 1 << count;
            }
            count += 1;
        }
        self.accept(TokenCode::RightParen)?;
        Ok((count, bitmap))
    }

    fn parse_formal_parameter(&mut self) -> Result<bool, FatalError> {
        let is_ref = self.current.code == TokenCode::Ref;
        if is_ref {
            self.advance()?;
        }
        if self.current.code == TokenCode::Identifier {
            let (name, handle) = self.current_identifier();
            let position = self.current.position;
            self.advance()?;
            let kind = if is_ref {
                SymbolKind::RefParameter
            } else {
                SymbolKind::ValueParameter
            };
            self.declare(&name, handle, kind, position);
        } else {
            self.syntax_error_token(TokenCode::Identifier);
            self.recovering = true;
        }
        Ok(is_ref)
    }

    fn parse_block(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::Begin)?;
        let stmt_or_end = TokenSet::union(&[first_statement(), TokenSet::from_list(&[TokenCode::End])]);
        let sync_fb = TokenSet::from_list(&[TokenCode::Semicolon, TokenCode::End, TokenCode::EndOfInput]);
        loop {
            self.synchronise(stmt_or_end, sync_fb)?;
            if self.current.code == TokenCode::End || self.current.code == TokenCode::EndOfInput {
                break;
            }
            self.parse_statement()?;
            self.accept(TokenCode::Semicolon)?;
        }
        self.accept(TokenCode::End)?;
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<(), FatalError> {
        match self.current.code {
            TokenCode::Identifier => self.parse_simple_statement(),
            TokenCode::While => self.parse_while_statement(),
            TokenCode::If => self.parse_if_statement(),
            TokenCode::Read => self.parse_read_statement(),
            TokenCode::Write => self.parse_write_statement(),
            _ => {
                self.syntax_error_set(&first_statement());
                Ok(())
            }
        }
    }

    fn parse_simple_statement(&mut self) -> Result<(), FatalError> {
        let (name, _handle) = self.current_identifier();
        let position = self.current.position;
        let symbol_id = self.resolve(&name, position);
        self.advance()?;

        match self.current.code {
            TokenCode::LeftParen => {
                self.advance()?;
                self.parse_actual_parameter_list()?;
                self.accept(TokenCode::RightParen)?;
                let sym = self.symtab.get(symbol_id);
                if sym.kind.is_callable() {
                    let target = sym.address;
                    self.code.emit(Opcode::Call, target)?;
                } else {
                    self.semantic_error("Not a procedure", position);
                    self.code.kill_output();
                }
            }
            TokenCode::Assign => {
                self.advance()?;
                self.parse_expression()?;
                let sym = self.symtab.get(symbol_id);
                if sym.kind.is_variable() {
                    let (kind, address, def_scope) = (sym.kind, sym.address, sym.scope);
                    self.emit_access(kind, address, def_scope, STORE_FAMILY)?;
                } else {
                    self.semantic_error("Not a variable", position);
                    self.code.kill_output();
                }
            }
            _ => {
                // RestOfStatement ::= ε — a bare identifier statement.
            }
        }
        Ok(())
    }

    /// §9 Open Question (procedure-call argument emission): each actual
    /// parameter — whether a bare `id` or a full `Expression` per the
    /// grammar — is compiled as an expression, left-to-right, pushing its
    /// value; the caller then emits `Call target`.
    fn parse_actual_parameter_list(&mut self) -> Result<(), FatalError> {
        self.parse_expression()?;
        while self.current.code == TokenCode::Comma {
            self.advance()?;
            self.parse_expression()?;
        }
        Ok(())
    }

    fn parse_while_statement(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::While)?;
        let loop_start = self.code.current_address();
        let branch = self.parse_bool_expr()?;
        self.accept(TokenCode::Do)?;
        self.parse_block()?;
        self.code.emit(Opcode::Br, loop_start.0 as i64)?;
        let after_loop = self.code.current_address();
        self.code.backpatch(branch, after_loop.0 as i64)?;
        Ok(())
    }

    fn parse_if_statement(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::If)?;
        let branch_on_false = self.parse_bool_expr()?;
        self.accept(TokenCode::Then)?;
        self.parse_block()?;
        if self.current.code == TokenCode::Else {
            self.advance()?;
            let jump_past_else = self.code.emit(Opcode::Br, 0)?;
            let else_start = self.code.current_address();
            self.code.backpatch(branch_on_false, else_start.0 as i64)?;
            self.parse_block()?;
            let after_if = self.code.current_address();
            self.code.backpatch(jump_past_else, after_if.0 as i64)?;
        } else {
            let after_then = self.code.current_address();
            self.code.backpatch(branch_on_false, after_then.0 as i64)?;
        }
        Ok(())
    }

    fn parse_read_statement(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::Read)?;
        self.accept(TokenCode::LeftParen)?;
        loop {
            if self.current.code == TokenCode::Identifier {
                let (name, _handle) = self.current_identifier();
                let position = self.current.position;
                let symbol_id = self.resolve(&name, position);
                self.advance()?;
                let sym = self.symtab.get(symbol_id);
                if sym.kind.is_variable() {
                    let (kind, address, def_scope) = (sym.kind, sym.address, sym.scope);
                    self.emit_access(kind, address, def_scope, READ_FAMILY)?;
                } else {
                    self.semantic_error("Not a variable", position);
                    self.code.kill_output();
                }
            } else {
                self.syntax_error_token(TokenCode::Identifier);
                self.recovering = true;
                break;
            }
            if self.current.code == TokenCode::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.accept(TokenCode::RightParen)?;
        Ok(())
    }

    fn parse_write_statement(&mut self) -> Result<(), FatalError> {
        self.accept(TokenCode::Write)?;
        self.accept(TokenCode::LeftParen)?;
        self.parse_expression()?;
        self.code.emit(Opcode::Write, 0)?;
        while self.current.code == TokenCode::Comma {
            self.advance()?;
            self.parse_expression()?;
            self.code.emit(Opcode::Write, 0)?;
        }
        self.accept(TokenCode::RightParen)?;
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<(), FatalError> {
        self.parse_compound_term()?;
        loop {
            let opcode = match self.current.code {
                TokenCode::Plus => Opcode::Add,
                TokenCode::Minus => Opcode::Sub,
                _ => break,
            };
            self.advance()?;
            self.parse_compound_term()?;
            self.code.emit(opcode, 0)?;
        }
        Ok(())
    }

    fn parse_compound_term(&mut self) -> Result<(), FatalError> {
        self.parse_term()?;
        loop {
            let opcode = match self.current.code {
                TokenCode::Mult => Opcode::Mult,
                TokenCode::Divide => Opcode::Div,
                _ => break,
            };
            self.advance()?;
            self.parse_term()?;
            self.code.emit(opcode, 0)?;
        }
        Ok(())
    }

    fn parse_term(&mut self) -> Result<(), FatalError> {
        let negate = self.current.code == TokenCode::Minus;
        if negate {
            self.advance()?;
        }
        self.parse_sub_term()?;
        if negate {
            self.code.emit(Opcode::Neg, 0)?;
        }
        Ok(())
    }

    fn parse_sub_term(&mut self) -> Result<(), FatalError> {
        match self.current.code {
            TokenCode::IntConst => {
                let value = self.current.value;
                self.advance()?;
                self.code.emit(Opcode::LoadImmediate, value)?;
            }
            TokenCode::Identifier => {
                let (name, _handle) = self.current_identifier();
                let position = self.current.position;
                let symbol_id = self.resolve(&name, position);
                self.advance()?;
                let sym = self.symtab.get(symbol_id);
                if sym.kind.is_variable() {
                    let (kind, address, def_scope) = (sym.kind, sym.address, sym.scope);
                    self.emit_access(kind, address, def_scope, LOAD_FAMILY)?;
                } else {
                    self.semantic_error("Not a variable", position);
                    self.code.kill_output();
                    self.code.emit(Opcode::LoadImmediate, 0)?;
                }
            }
            TokenCode::LeftParen => {
                self.advance()?;
                self.parse_expression()?;
                self.accept(TokenCode::RightParen)?;
            }
            _ => {
                let expected = TokenSet::from_list(&[
                    TokenCode::IntConst,
                    TokenCode::Identifier,
                    TokenCode::LeftParen,
                ]);
                self.syntax_error_set(&expected);
            }
        }
        Ok(())
    }

    /// §4.G `ParseBooleanExpression`: compiles `left - right`, then emits
    /// the branch that is the *negation* of the user's relational
    /// operator, with a placeholder operand for the caller to backpatch.
    fn parse_bool_expr(&mut self) -> Result<CodeAddress, FatalError> {
        self.parse_expression()?;
        let relop = match self.current.code {
            TokenCode::Equality => RelOp::Equal,
            TokenCode::Less => RelOp::Less,
            TokenCode::Greater => RelOp::Greater,
            TokenCode::LessEqual => RelOp::LessEqual,
            TokenCode::GreaterEqual => RelOp::GreaterEqual,
            _ => {
                self.syntax_error_set(&relop_set());
                RelOp::Equal
            }
        };
        if relop_set().contains(self.current.code) {
            self.advance()?;
        }
        self.parse_expression()?;
        self.code.emit(Opcode::Sub, 0)?;
        let branch = self.code.emit(Opcode::negated_branch(relop), 0)?;
        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> CompileOutcome {
        Parser::new(src, &CompilerConfig::default())
            .unwrap()
            .compile()
            .unwrap()
    }

    #[test]
    fn empty_program_compiles_clean() {
        let outcome = compile("PROGRAM p; BEGIN END.");
        assert!(outcome.succeeded());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn single_assignment_emits_expected_sequence() {
        let outcome = compile("PROGRAM p; VAR x; BEGIN x := 3 + 4; END.");
        assert!(outcome.succeeded());
        let lines: Vec<&str> = outcome.code_text.lines().collect();
        assert!(lines[0].contains("Load #3"));
        assert!(lines[1].contains("Load #4"));
        assert!(lines[2].contains("Add"));
        assert!(lines[3].contains("Store 0"));
    }

    #[test]
    fn negation_emits_neg_after_subterm() {
        let outcome = compile("PROGRAM p; VAR x; BEGIN x := -5; END.");
        let lines: Vec<&str> = outcome.code_text.lines().collect();
        assert!(lines[0].contains("Load #5"));
        assert!(lines[1].contains("Neg"));
        assert!(lines[2].contains("Store 0"));
    }

    #[test]
    fn redeclaration_kills_output() {
        let outcome = compile("PROGRAM p; VAR x, x; BEGIN END.");
        assert!(!outcome.succeeded());
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Redeclaration")));
        assert!(outcome.code_text.starts_with(";; Errors detected"));
    }

    #[test]
    fn missing_semicolon_recovers_and_keeps_parsing() {
        let outcome = compile("PROGRAM p VAR x; BEGIN x := 1 END.");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.message.starts_with("Expected ;")));
        // x was still declared and assigned despite the missing `;`.
        assert!(outcome.code_text.contains("Store 0"));
    }

    #[test]
    fn if_else_branch_targets_match_spec_scenario() {
        let outcome = compile(
            "PROGRAM p; VAR x, y; BEGIN IF x = 0 THEN BEGIN y := 1 END ELSE BEGIN y := 2 END END.",
        );
        assert!(outcome.succeeded());
        let lines: Vec<&str> = outcome.code_text.lines().collect();
        // Load x, Load #0, Sub, Bnz(branch-on-false for `=`), ...
        assert!(lines[3].starts_with("  3  Bnz"));
        let bz_operand: usize = lines[3]
            .rsplit(' ')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(lines[bz_operand], "  7  Load #2");
        let br_line = lines.iter().find(|l| l.contains("Br")).unwrap();
        let br_operand: usize = br_line.rsplit(' ').next().unwrap().parse().unwrap();
        assert_eq!(br_operand, lines.len());
    }

    #[test]
    fn while_loop_branch_targets_match_spec_property() {
        let outcome = compile("PROGRAM p; VAR x; BEGIN WHILE x > 0 DO BEGIN x := x - 1 END END.");
        assert!(outcome.succeeded());
        let lines: Vec<&str> = outcome.code_text.lines().collect();
        let br_line_idx = lines.iter().position(|l| l.trim_start().starts_with(|c: char| c.is_ascii_digit()) && l.contains("Br ") && !l.contains("Bl") && !l.contains("Bg") && !l.contains("Bz") && !l.contains("Bnz")).unwrap();
        let br_operand: usize = lines[br_line_idx].rsplit(' ').next().unwrap().parse().unwrap();
        assert_eq!(br_operand, 0);
        let branch_line = lines.iter().find(|l| l.contains("Blz") || l.contains("Bl ")).unwrap();
        let branch_operand: usize = branch_line.rsplit(' ').next().unwrap().parse().unwrap();
        assert_eq!(branch_operand, lines.len());
    }
}
