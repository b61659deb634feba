//! Single-pass Pratt compiler: parses and emits bytecode in the same walk,
//! with no intermediate AST. Precedence climbing is driven by a table of
//! prefix/infix handler functions keyed by token kind, in the same shape
//! as the reference implementation's `parseRule` table.

use tracing::debug;

use vitte_core::heap::{Heap, ObjRef};
use vitte_core::value::Value;
use vitte_core::{Chunk, OpCode};

use crate::error::{CompileError, ErrorLocation};
use crate::scanner::{Scanner, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

type ParseFn = fn(&mut Parser<'_>, bool);

// Free-function shims, generic over the parser's source lifetime, so that
// `rule()` can coerce them to the higher-ranked `ParseFn` pointer type.
// (Referencing the inherent methods directly does not coerce: the method
// item's lifetime is tied to a single instantiation, not universally
// quantified, so rustc rejects it as "one type is more general than the
// other".)
fn grouping_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::grouping(p, can_assign) }
fn call_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::call(p, can_assign) }
fn dot_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::dot(p, can_assign) }
fn unary_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::unary(p, can_assign) }
fn binary_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::binary(p, can_assign) }
fn variable_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::variable(p, can_assign) }
fn string_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::string(p, can_assign) }
fn number_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::number(p, can_assign) }
fn and_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::and(p, can_assign) }
fn or_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::or(p, can_assign) }
fn literal_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::literal(p, can_assign) }
fn this_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::this(p, can_assign) }
fn super_shim<'src>(p: &mut Parser<'src>, can_assign: bool) { Parser::super_(p, can_assign) }

struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

fn rule(kind: TokenKind) -> ParseRule {
    use TokenKind::*;
    let (prefix, infix, precedence): (Option<ParseFn>, Option<ParseFn>, Precedence) = match kind {
        LeftParen => (Some(grouping_shim as ParseFn), Some(call_shim as ParseFn), Precedence::Call),
        Dot => (None, Some(dot_shim as ParseFn), Precedence::Call),
        Minus => (Some(unary_shim as ParseFn), Some(binary_shim as ParseFn), Precedence::Term),
        Plus => (None, Some(binary_shim as ParseFn), Precedence::Term),
        Slash => (None, Some(binary_shim as ParseFn), Precedence::Factor),
        Star => (None, Some(binary_shim as ParseFn), Precedence::Factor),
        Bang => (Some(unary_shim as ParseFn), None, Precedence::None),
        BangEqual => (None, Some(binary_shim as ParseFn), Precedence::Equality),
        EqualEqual => (None, Some(binary_shim as ParseFn), Precedence::Equality),
        Greater => (None, Some(binary_shim as ParseFn), Precedence::Comparison),
        GreaterEqual => (None, Some(binary_shim as ParseFn), Precedence::Comparison),
        Less => (None, Some(binary_shim as ParseFn), Precedence::Comparison),
        LessEqual => (None, Some(binary_shim as ParseFn), Precedence::Comparison),
        Identifier => (Some(variable_shim as ParseFn), None, Precedence::None),
        String => (Some(string_shim as ParseFn), None, Precedence::None),
        Number => (Some(number_shim as ParseFn), None, Precedence::None),
        And => (None, Some(and_shim as ParseFn), Precedence::And),
        Or => (None, Some(or_shim as ParseFn), Precedence::Or),
        False => (Some(literal_shim as ParseFn), None, Precedence::None),
        Nil => (Some(literal_shim as ParseFn), None, Precedence::None),
        True => (Some(literal_shim as ParseFn), None, Precedence::None),
        This => (Some(this_shim as ParseFn), None, Precedence::None),
        Super => (Some(super_shim as ParseFn), None, Precedence::None),
        _ => (None, None, Precedence::None),
    };
    ParseRule { prefix, infix, precedence }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Function,
    Initializer,
    Method,
    Script,
}

struct LocalVar<'src> {
    name: &'src str,
    depth: i32,
    is_captured: bool,
}

struct UpvalueVar {
    index: u8,
    is_local: bool,
}

struct FunctionScope<'src> {
    name: Option<ObjRef>,
    arity: u8,
    chunk: Chunk,
    kind: FunctionType,
    locals: Vec<LocalVar<'src>>,
    upvalues: Vec<UpvalueVar>,
    scope_depth: i32,
}

impl<'src> FunctionScope<'src> {
    fn new(kind: FunctionType, name: Option<ObjRef>) -> Self {
        // Slot 0 is reserved: `this` for methods, unnamed otherwise, so a
        // bare function still pushes a stack slot its frame can point at.
        let first_local_name = if kind == FunctionType::Method || kind == FunctionType::Initializer { "this" } else { "" };
        FunctionScope {
            name,
            arity: 0,
            chunk: Chunk::new(),
            kind,
            locals: vec![LocalVar { name: first_local_name, depth: 0, is_captured: false }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

struct ClassScope {
    has_superclass: bool,
}

#[derive(Debug)]
pub struct CompiledFunction {
    pub name: Option<ObjRef>,
    pub arity: u8,
    pub upvalue_count: u8,
    pub chunk: Chunk,
    /// Parallel to the chunk's closure-producing opcode: which captured
    /// variables are locals of the enclosing function vs. its own upvalues.
    pub upvalues: Vec<(bool, u8)>,
}

pub struct Parser<'src> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
    heap: &'src mut Heap,
    functions: Vec<FunctionScope<'src>>,
    classes: Vec<ClassScope>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, heap: &'src mut Heap) -> Self {
        let dummy = Token { kind: TokenKind::Eof, lexeme: "", line: 0 };
        Parser {
            scanner: Scanner::new(source),
            previous: dummy,
            current: dummy,
            had_error: false,
            panic_mode: false,
            errors: Vec::new(),
            heap,
            functions: vec![FunctionScope::new(FunctionType::Script, None)],
            classes: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Result<CompiledFunction, Vec<CompileError>> {
        self.advance();
        while !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::Eof, "Expect end of expression.");
        let function = self.end_function();
        // Every nested function compiled along the way was pinned here so a
        // mid-compile collection couldn't reclaim it before it was wired
        // into its enclosing chunk's constant pool; by now all of them are
        // reachable from `function`'s own constant graph, so the pins are
        // no longer needed and would otherwise root them forever.
        self.heap.extra_roots.clear();
        if self.had_error {
            Err(self.errors)
        } else {
            Ok(function)
        }
    }

    // --- token stream --------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at(&mut self, token: Token<'_>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        let at = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::None,
            _ => ErrorLocation::Lexeme(token.lexeme.to_string()),
        };
        self.errors.push(CompileError::new(token.line, at, message));
    }

    /// Discards tokens until a statement boundary, so one syntax error
    /// reports instead of cascading into dozens of spurious ones.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            use TokenKind::*;
            if matches!(self.current.kind, Class | Fun | Var | For | If | While | Print | Return) {
                return;
            }
            self.advance();
        }
    }

    // --- emission --------------------------------------------------

    fn chunk_mut(&mut self) -> &mut Chunk {
        &mut self.functions.last_mut().unwrap().chunk
    }

    fn line(&self) -> u32 {
        self.previous.line
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.line();
        self.chunk_mut().write_op(op, line);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.line();
        self.chunk_mut().write_byte(byte, line);
    }

    fn emit_ops(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    fn emit_constant(&mut self, value: Value) {
        let line = self.line();
        match self.chunk_mut().add_constant(value) {
            Ok(index) => {
                self.chunk_mut().write_op(OpCode::Constant, line);
                self.chunk_mut().write_byte(index, line);
            }
            Err(_) => self.error("Too many constants in one chunk."),
        }
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk_mut().add_constant(value) {
            Ok(index) => index,
            Err(_) => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let r = self.heap.intern(name);
        self.make_constant(Value::obj(r))
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        let line = self.line();
        self.chunk_mut().emit_jump(op, line)
    }

    fn patch_jump(&mut self, offset: usize) {
        if self.chunk_mut().patch_jump(offset).is_err() {
            self.error("Too much code to jump over.");
        }
    }

    fn emit_loop(&mut self, loop_start: usize) {
        let line = self.line();
        if self.chunk_mut().emit_loop(loop_start, line).is_err() {
            self.error("Loop body too large.");
        }
    }

    fn current_kind(&self) -> FunctionType {
        self.functions.last().unwrap().kind
    }

    fn end_function(&mut self) -> CompiledFunction {
        if self.current_kind() == FunctionType::Initializer {
            self.emit_ops(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);

        let scope = self.functions.pop().unwrap();
        if tracing::enabled!(tracing::Level::TRACE) {
            debug!(target: "compiler", "{}", scope.chunk.disassemble(scope.name.map(|_| "<fn>").unwrap_or("<script>")));
        }
        CompiledFunction {
            name: scope.name,
            arity: scope.arity,
            upvalue_count: scope.upvalues.len() as u8,
            chunk: scope.chunk,
            upvalues: scope.upvalues.iter().map(|u| (u.is_local, u.index)).collect(),
        }
    }

    // --- scopes ------------------------------------------------------

    fn begin_scope(&mut self) {
        self.functions.last_mut().unwrap().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.functions.last_mut().unwrap().scope_depth -= 1;
        let depth = self.functions.last().unwrap().scope_depth;
        loop {
            let is_captured = match self.functions.last().unwrap().locals.last() {
                Some(local) if local.depth > depth => local.is_captured,
                _ => break,
            };
            if is_captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
            self.functions.last_mut().unwrap().locals.pop();
        }
    }

    // --- variables -----------------------------------------------------

    fn declaration(&mut self) {
        if self.matches(TokenKind::Class) {
            self.class_declaration();
        } else if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.functions.last().unwrap().scope_depth > 0 {
            return 0;
        }
        let name = self.previous.lexeme;
        self.identifier_constant(name)
    }

    fn declare_variable(&mut self) {
        let scope = self.functions.last().unwrap();
        if scope.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = scope.scope_depth;
        let mut duplicate = false;
        for local in scope.locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name {
                duplicate = true;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        let scope = self.functions.last_mut().unwrap();
        if scope.locals.len() >= u8::MAX as usize + 1 {
            self.error("Too many local variables in function.");
            return;
        }
        scope.locals.push(LocalVar { name, depth: -1, is_captured: false });
    }

    fn mark_initialized(&mut self) {
        let scope = self.functions.last_mut().unwrap();
        if scope.scope_depth == 0 {
            return;
        }
        let depth = scope.scope_depth;
        scope.locals.last_mut().unwrap().depth = depth;
    }

    fn define_variable(&mut self, global: u8) {
        if self.functions.last().unwrap().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_ops(OpCode::DefineGlobal, global);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn resolve_local(&mut self, level: usize, name: &str) -> Option<u8> {
        let scope = &self.functions[level];
        for (i, local) in scope.locals.iter().enumerate().rev() {
            if local.name == name {
                if local.depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                return Some(i as u8);
            }
        }
        None
    }

    fn add_upvalue(&mut self, level: usize, index: u8, is_local: bool) -> u8 {
        let scope = &mut self.functions[level];
        for (i, up) in scope.upvalues.iter().enumerate() {
            if up.index == index && up.is_local == is_local {
                return i as u8;
            }
        }
        if scope.upvalues.len() >= u8::MAX as usize + 1 {
            self.error("Too many closure variables in function.");
            return 0;
        }
        scope.upvalues.push(UpvalueVar { index, is_local });
        (scope.upvalues.len() - 1) as u8
    }

    fn resolve_upvalue(&mut self, level: usize, name: &str) -> Option<u8> {
        if level == 0 {
            return None;
        }
        let enclosing = level - 1;
        if let Some(local) = self.resolve_local(enclosing, name) {
            self.functions[enclosing].locals[local as usize].is_captured = true;
            return Some(self.add_upvalue(level, local, true));
        }
        if let Some(up) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(level, up, false));
        }
        None
    }

    fn named_variable(&mut self, name: &'src str, can_assign: bool) {
        let level = self.functions.len() - 1;
        let (get_op, set_op, arg) = if let Some(slot) = self.resolve_local(level, name) {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else if let Some(slot) = self.resolve_upvalue(level, name) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, slot)
        } else {
            let slot = self.identifier_constant(name);
            (OpCode::GetGlobal, OpCode::SetGlobal, slot)
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_ops(set_op, arg);
        } else {
            self.emit_ops(get_op, arg);
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    // --- statements ------------------------------------------------------

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn return_statement(&mut self) {
        if self.current_kind() == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.matches(TokenKind::Semicolon) {
            if self.current_kind() == FunctionType::Initializer {
                self.emit_ops(OpCode::GetLocal, 0);
            } else {
                self.emit_op(OpCode::Nil);
            }
            self.emit_op(OpCode::Return);
            return;
        }
        if self.current_kind() == FunctionType::Initializer {
            self.error("Can't return a value from an initializer.");
        }
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
        self.emit_op(OpCode::Return);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk_mut().code.len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk_mut().code.len();
        let mut exit_jump: Option<usize> = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk_mut().code.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit) = exit_jump {
            self.patch_jump(exit);
            self.emit_op(OpCode::Pop);
        }

        self.end_scope();
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    fn function(&mut self, kind: FunctionType) {
        let name_token = self.previous.lexeme;
        let name = self.heap.intern(name_token);
        self.functions.push(FunctionScope::new(kind, Some(name)));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                let scope = self.functions.last_mut().unwrap();
                scope.arity += 1;
                if scope.arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let compiled = self.end_function();
        self.emit_closure(compiled);
    }

    fn emit_closure(&mut self, compiled: CompiledFunction) {
        let mut function_obj = vitte_core::object::FunctionObj::new(compiled.name.unwrap());
        function_obj.arity = compiled.arity;
        function_obj.upvalue_count = compiled.upvalue_count;
        function_obj.chunk = compiled.chunk;
        let r = self.heap.alloc_function(function_obj);
        self.heap.extra_roots.push(r);
        let constant = self.make_constant(Value::obj(r));
        self.emit_ops(OpCode::Closure, constant);
        for (is_local, index) in &compiled.upvalues {
            self.emit_byte(if *is_local { 1 } else { 0 });
            self.emit_byte(*index);
        }
    }

    fn method(&mut self) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name_token = self.previous.lexeme;
        let constant = self.identifier_constant(name_token);
        let kind = if name_token == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(kind);
        self.emit_ops(OpCode::Method, constant);
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let class_name = self.previous.lexeme;
        let name_constant = self.identifier_constant(class_name);
        self.declare_variable();

        self.emit_ops(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassScope { has_superclass: false });

        if self.matches(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            let super_name = self.previous.lexeme;
            self.variable(false);
            if super_name == class_name {
                self.error("A class can't inherit from itself.");
            }

            self.begin_scope();
            self.add_local("super");
            self.define_variable(0);

            self.named_variable(class_name, false);
            self.emit_op(OpCode::Inherit);
            self.classes.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(class_name, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        let class = self.classes.pop().unwrap();
        if class.has_superclass {
            self.end_scope();
        }
    }

    // --- expressions ------------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = rule(self.previous.kind).prefix;
        let Some(prefix) = prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            let infix = rule(self.previous.kind).infix.unwrap();
            infix(self, can_assign);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let raw = self.previous.lexeme;
        let content = &raw[1..raw.len() - 1];
        let r = self.heap.intern(content);
        self.emit_constant(Value::obj(r));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => unreachable!(),
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        let operand_rule = rule(operator);
        self.parse_precedence(operand_rule.precedence.next());
        match operator {
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => unreachable!(),
        }
    }

    fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count = 0u8;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_ops(OpCode::Call, arg_count);
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.previous.lexeme;
        let constant = self.identifier_constant(name);

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_ops(OpCode::SetProperty, constant);
        } else if self.matches(TokenKind::LeftParen) {
            let arg_count = self.argument_list();
            self.emit_op(OpCode::Invoke);
            self.emit_byte(constant);
            self.emit_byte(arg_count);
        } else {
            self.emit_ops(OpCode::GetProperty, constant);
        }
    }

    fn this(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.variable(false);
    }

    fn super_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let method_name = self.previous.lexeme;
        let constant = self.identifier_constant(method_name);

        self.named_variable("this", false);
        if self.matches(TokenKind::LeftParen) {
            let arg_count = self.argument_list();
            self.named_variable("super", false);
            self.emit_op(OpCode::SuperInvoke);
            self.emit_byte(constant);
            self.emit_byte(arg_count);
        } else {
            self.named_variable("super", false);
            self.emit_ops(OpCode::GetSuper, constant);
        }
    }
}
