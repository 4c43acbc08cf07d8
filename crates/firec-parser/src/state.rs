//! Parser state: token cursor, error recovery, and the top-level parse loop.

use firec_common::Diagnostic;
use firec_lexer::{Lexer, Token, TokenKind};
use rustc_hash::FxHashSet;

use crate::node::{Node, NodeArena, NodeId, NodeKind};
use crate::registries::Registries;

/// Class body parsing context: (class name, in constructor, base class).
#[derive(Clone, Debug)]
pub(crate) struct ClassContext {
    pub class_name: String,
    pub in_constructor: bool,
    pub base_class: Option<String>,
}

#[derive(Debug)]
pub struct ParserState {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub arena: NodeArena,
    pub root: NodeId,
    pub(crate) source: String,
    pub(crate) filename: String,
    pub errors: Vec<Diagnostic>,

    /// When the file has imports, undefined-name checks are deferred and
    /// revalidated against the merged symbol table after import resolution.
    pub defer_undefined_identifiers: bool,
    pub deferred_undefined: Vec<(String, Option<Token>)>,

    pub registries: Registries,
    /// Directive names collected in this file.
    pub directives: FxHashSet<String>,

    pub(crate) class_context_stack: Vec<ClassContext>,
    /// Type parameters in scope while parsing a generic function body.
    pub(crate) current_type_params: Vec<String>,

    /// Parsed field/method nodes per class, kept so inherited members can be
    /// synthesized for derived classes.
    pub(crate) class_field_nodes: rustc_hash::FxHashMap<String, Vec<NodeId>>,
    pub(crate) class_method_nodes: rustc_hash::FxHashMap<String, Vec<NodeId>>,
}

impl ParserState {
    #[must_use]
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let tokens = Lexer::new(&source).tokenize();
        let defer = tokens.iter().any(|t| t.kind == TokenKind::Import);
        let mut arena = NodeArena::new();
        let root = arena.alloc(Node::new(NodeKind::Root, None, "program", 0));
        Self {
            tokens,
            pos: 0,
            arena,
            root,
            source,
            filename: filename.into(),
            errors: Vec::new(),
            defer_undefined_identifiers: defer,
            deferred_undefined: Vec::new(),
            registries: Registries::new(),
            directives: FxHashSet::default(),
            class_context_stack: Vec::new(),
            current_type_params: Vec::new(),
            class_field_nodes: rustc_hash::FxHashMap::default(),
            class_method_nodes: rustc_hash::FxHashMap::default(),
        }
    }

    /// Override the deferred-undefined-identifier behavior (the resolver
    /// forces this on for files that themselves have imports).
    #[must_use]
    pub fn with_deferred_undefined(mut self, defer: bool) -> Self {
        self.defer_undefined_identifiers = defer;
        self
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    pub(crate) fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn current_cloned(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    pub(crate) fn current_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    pub(crate) fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.peek(offset).map(|t| t.kind)
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn consume(&mut self, kind: TokenKind) -> Option<Token> {
        if self.current_kind() == Some(kind) {
            let token = self.tokens[self.pos].clone();
            self.advance();
            Some(token)
        } else {
            None
        }
    }

    /// Consume the current token or report `Expected <kind> but got <kind>`.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if let Some(token) = self.consume(kind) {
            return Some(token);
        }
        let got = self.current_cloned();
        match &got {
            Some(t) => self.error(format!("Expected {kind:?} but got {:?}", t.kind), Some(t)),
            None => self.error(format!("Expected {kind:?} but got end of input"), None),
        }
        None
    }

    // ========================================================================
    // Diagnostics and recovery
    // ========================================================================

    pub(crate) fn error(&mut self, message: impl Into<String>, token: Option<&Token>) {
        let message = message.into();
        tracing::debug!(target: "firec_parser", "{message}");
        let diagnostic = match token {
            Some(t) => Diagnostic::at_offset(message, &self.source, t.index),
            None => Diagnostic::unpositioned(message),
        };
        self.errors.push(diagnostic);
    }

    pub(crate) fn error_at_current(&mut self, message: impl Into<String>) {
        let tok = self.current_cloned();
        self.error(message, tok.as_ref());
    }

    /// Advance until a semicolon (consumed) or end of input.
    pub(crate) fn sync_to_semicolon(&mut self) {
        while let Some(kind) = self.current_kind() {
            if kind == TokenKind::Semicolon {
                break;
            }
            self.advance();
        }
        self.consume(TokenKind::Semicolon);
    }

    /// Advance until a semicolon (consumed) or a brace boundary.
    pub(crate) fn sync_to_semicolon_or_brace(&mut self) {
        while let Some(kind) = self.current_kind() {
            if matches!(
                kind,
                TokenKind::Semicolon | TokenKind::OpenBrace | TokenKind::CloseBrace
            ) {
                break;
            }
            self.advance();
        }
        self.consume(TokenKind::Semicolon);
    }

    /// Advance past a single-line comment or a whole `/* ... */` stretch.
    pub(crate) fn skip_comment(&mut self) {
        match self.current_kind() {
            Some(TokenKind::SingleLineComment) => self.advance(),
            Some(TokenKind::MultiLineCommentStart) => {
                while let Some(kind) = self.current_kind() {
                    self.advance();
                    if kind == TokenKind::MultiLineCommentEnd {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Types in syntax
    // ========================================================================

    /// A type token is a type keyword, a registered user class name, or a
    /// type parameter of the generic function being parsed.
    pub(crate) fn is_type_token(&self, token: &Token) -> bool {
        if token.kind.is_type_keyword() {
            return true;
        }
        token.kind == TokenKind::Identifier
            && (self.registries.user_types.contains(&token.lexeme)
                || self.current_type_params.iter().any(|p| *p == token.lexeme))
    }

    pub(crate) fn current_is_type_token(&self) -> bool {
        self.current().is_some_and(|t| self.is_type_token(t))
    }

    /// Canonical firescript type name for a type token.
    pub(crate) fn normalize_type_name(token: &Token) -> String {
        token
            .kind
            .type_name()
            .map_or_else(|| token.lexeme.clone(), str::to_string)
    }

    pub(crate) fn class_context(&self) -> Option<&ClassContext> {
        self.class_context_stack.last()
    }

    // ========================================================================
    // Node construction
    // ========================================================================

    pub(crate) fn new_node(
        &mut self,
        kind: NodeKind,
        token: Option<&Token>,
        name: impl Into<String>,
    ) -> NodeId {
        let index = token.map_or(0, |t| t.index);
        self.arena.alloc(Node::new(kind, token.cloned(), name, index))
    }

    pub(crate) fn attach(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for child in children {
            self.arena.add_child(parent, child);
        }
    }

    // ========================================================================
    // Top-level parse loop
    // ========================================================================

    /// Parse the whole file, then run identifier resolution and the type
    /// check in place. Returns the root node.
    pub fn parse(&mut self) -> NodeId {
        tracing::debug!(target: "firec_parser", file = %self.filename, "parsing tokens");

        while let Some(kind) = self.current_kind() {
            match kind {
                TokenKind::SingleLineComment | TokenKind::MultiLineCommentStart => {
                    self.skip_comment();
                    continue;
                }
                TokenKind::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenKind::Import => {
                    if let Some(import) = self.parse_import() {
                        self.arena.add_child(self.root, import);
                    }
                    self.consume(TokenKind::Semicolon);
                    continue;
                }
                TokenKind::Directive => {
                    if let Some(directive) = self.parse_directive() {
                        self.arena.add_child(self.root, directive);
                    }
                    continue;
                }
                TokenKind::Class => {
                    if let Some(class) = self.parse_class_definition() {
                        self.arena.add_child(self.root, class);
                    }
                    continue;
                }
                TokenKind::Constraint => {
                    self.parse_constraint_declaration();
                    self.consume(TokenKind::Semicolon);
                    continue;
                }
                _ => {}
            }

            let before = self.pos;
            let stmt = if self.looks_like_function_definition() {
                self.parse_function_definition()
            } else {
                self.parse_statement()
            };

            let Some(stmt) = stmt else {
                // Recovery: make sure we cannot loop on the same token, but
                // never skip past tokens a failed production already moved
                // over.
                if self.pos == before && self.current().is_some() {
                    self.advance();
                }
                continue;
            };

            self.arena.add_child(self.root, stmt);

            // Simple statements require a trailing semicolon; block forms do
            // not.
            let stmt_kind = self.arena.node(stmt).kind;
            if !matches!(
                stmt_kind,
                NodeKind::IfStatement
                    | NodeKind::WhileStatement
                    | NodeKind::Scope
                    | NodeKind::FunctionDefinition
            ) {
                if self.consume(TokenKind::Semicolon).is_none() {
                    self.error_at_current("Expected semicolon after statement");
                    self.sync_to_semicolon_or_brace();
                }
            }
        }

        tracing::debug!(target: "firec_parser", "resolving variable types");
        self.resolve_variable_types();

        tracing::debug!(target: "firec_parser", "type checking");
        self.type_check();

        self.root
    }
}
