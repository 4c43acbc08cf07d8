//! Statement parsing with explicit error recovery.
//!
//! The parser keeps going after most errors, synchronising either to the
//! next `;` or to a brace boundary so one run can report many problems.

use firec_lexer::TokenKind;

use crate::node::{NodeId, NodeKind};
use crate::registries::builtin_return_type;
use crate::state::ParserState;

/// The closed directive vocabulary.
pub(crate) const KNOWN_DIRECTIVES: [&str; 1] = ["enable_drops"];

impl ParserState {
    /// Determine the kind of statement and parse it.
    pub(crate) fn parse_statement(&mut self) -> Option<NodeId> {
        // Imports are top-level only.
        if self.at(TokenKind::Import) {
            self.error_at_current("Imports must appear at top level");
            while let Some(kind) = self.current_kind() {
                if matches!(
                    kind,
                    TokenKind::Semicolon | TokenKind::CloseBrace | TokenKind::OpenBrace
                ) {
                    break;
                }
                self.advance();
            }
            self.consume(TokenKind::Semicolon);
            return None;
        }

        if self.at(TokenKind::Directive) {
            return self.parse_directive();
        }

        // Unknown byte recovery: report and continue.
        if self.at(TokenKind::Unknown) {
            let bad = self.current_cloned()?;
            self.advance();
            self.error(format!("Unexpected character '{}'", bad.lexeme), Some(&bad));
            return None;
        }

        if self.at(TokenKind::While) {
            return self.parse_while_statement();
        }

        if matches!(
            self.current_kind(),
            Some(TokenKind::Break | TokenKind::Continue)
        ) {
            let token = self.current_cloned()?;
            self.advance();
            let kind = if token.kind == TokenKind::Break {
                NodeKind::BreakStatement
            } else {
                NodeKind::ContinueStatement
            };
            let node = self.new_node(kind, Some(&token), token.lexeme.clone());
            if self.consume(TokenKind::Semicolon).is_none() {
                self.error_at_current("Expected semicolon after statement");
            }
            return Some(node);
        }

        if self.at(TokenKind::Return) {
            let return_token = self.current_cloned()?;
            self.advance();
            let mut children = Vec::new();
            if self.current().is_some() && !self.at(TokenKind::Semicolon) {
                if let Some(expr) = self.parse_expression() {
                    children.push(expr);
                }
            }
            let node = self.new_node(NodeKind::ReturnStatement, Some(&return_token), "return");
            self.attach(node, children);
            return Some(node);
        }

        if matches!(
            self.current_kind(),
            Some(TokenKind::SingleLineComment | TokenKind::MultiLineCommentStart)
        ) {
            self.skip_comment();
            return None;
        }

        self.current()?;

        if self.at(TokenKind::OpenBrace) {
            return self.parse_scope();
        }

        if self.at(TokenKind::If) {
            return self.parse_if_statement();
        }

        // Dangling else: report, then swallow its body to keep going.
        if self.at(TokenKind::Else) {
            let token = self.current_cloned()?;
            self.advance();
            self.error("Unexpected 'else' without matching 'if'", Some(&token));
            if self.at(TokenKind::OpenBrace) {
                self.parse_scope();
            } else {
                let _ = self.parse_statement();
            }
            return None;
        }

        // Variable declaration: a type token or a nullable/const modifier.
        if self.current_is_type_token()
            || matches!(
                self.current_kind(),
                Some(TokenKind::Nullable | TokenKind::Const)
            )
        {
            return self.parse_variable_declaration();
        }

        if self.at(TokenKind::Identifier) {
            match self.peek_kind(1) {
                Some(
                    TokenKind::AddAssign
                    | TokenKind::SubtractAssign
                    | TokenKind::MultiplyAssign
                    | TokenKind::DivideAssign
                    | TokenKind::ModuloAssign,
                ) => return self.parse_compound_assignment(),
                Some(TokenKind::Increment | TokenKind::Decrement) => {
                    return self.parse_increment_or_decrement();
                }
                Some(TokenKind::Assign) => return self.parse_variable_assignment(),
                Some(TokenKind::OpenParen) => return self.parse_function_call_statement(),
                Some(TokenKind::Dot) => {
                    let lhs = self.parse_primary()?;
                    let lhs_kind = self.arena.node(lhs).kind;
                    // A method call used as a statement stands on its own.
                    if matches!(lhs_kind, NodeKind::MethodCall | NodeKind::SuperCall) {
                        return Some(lhs);
                    }
                    // Field access followed by '=' is an assignment.
                    if self.at(TokenKind::Assign) {
                        let assign_token = self.consume(TokenKind::Assign)?;
                        let Some(rhs) = self.parse_expression() else {
                            self.error_at_current("Expected expression after '='");
                            self.sync_to_semicolon();
                            return None;
                        };
                        let node = self.new_node(NodeKind::Assignment, Some(&assign_token), "=");
                        self.attach(node, vec![lhs, rhs]);
                        return Some(node);
                    }
                    self.error_at_current("Expected assignment after field access");
                    self.sync_to_semicolon();
                    return None;
                }
                Some(TokenKind::OpenBracket) => {
                    // Array element assignment: arr[i] = expr
                    let expr = self.parse_expression();
                    if self.at(TokenKind::Assign) {
                        let assign_token = self.consume(TokenKind::Assign)?;
                        let Some(rhs) = self.parse_expression() else {
                            self.error_at_current("Expected expression after '='");
                            self.sync_to_semicolon();
                            return None;
                        };
                        let Some(target) = expr else {
                            self.error("Invalid assignment target", Some(&assign_token));
                            self.sync_to_semicolon();
                            return None;
                        };
                        let node = self.new_node(NodeKind::Assignment, Some(&assign_token), "=");
                        self.attach(node, vec![target, rhs]);
                        return Some(node);
                    }
                    return expr;
                }
                Some(TokenKind::LessThan)
                    if self
                        .current()
                        .is_some_and(|t| self.registries.generic_functions.contains_key(&t.lexeme)) =>
                {
                    // Generic call with explicit type arguments as a statement.
                    return self.parse_primary();
                }
                _ => {
                    self.error_at_current("Expected assignment, function call, or method call");
                    self.advance();
                    return None;
                }
            }
        }

        self.error_at_current("Expected assignment, function call, or method call");
        self.advance();
        None
    }

    /// `[nullable] [const] <Type>[[]] <name> = <expr>`
    pub(crate) fn parse_variable_declaration(&mut self) -> Option<NodeId> {
        let is_nullable = self.consume(TokenKind::Nullable).is_some();
        let is_const = self.consume(TokenKind::Const).is_some();

        if !self.current_is_type_token() {
            self.error_at_current("Expected type in variable declaration");
            return None;
        }
        let type_token = self.current_cloned()?;
        self.advance();

        // Array suffix binds to the type keyword exactly once.
        let mut is_array = false;
        if self.at(TokenKind::OpenBracket) {
            self.advance();
            if self.consume(TokenKind::CloseBracket).is_none() {
                self.error_at_current("Expected ']' after '[' in array type declaration");
                return None;
            }
            is_array = true;
        }

        let Some(identifier) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected variable name after type");
            return None;
        };

        if self.consume(TokenKind::Assign).is_none() {
            self.error_at_current("Expected '=' in variable declaration");
            return None;
        }

        let Some(value) = self.parse_expression() else {
            self.error_at_current("Expected initializer expression in variable declaration");
            return None;
        };

        let node =
            self.new_node(NodeKind::VariableDeclaration, Some(&identifier), identifier.lexeme.clone());
        self.attach(node, vec![value]);
        let base_type = Self::normalize_type_name(&type_token);
        let n = self.arena.node_mut(node);
        n.is_ref_counted = base_type == "string" || is_array;
        n.var_type = Some(base_type);
        n.is_nullable = is_nullable;
        n.is_const = is_const;
        n.is_array = is_array;
        Some(node)
    }

    pub(crate) fn parse_variable_assignment(&mut self) -> Option<NodeId> {
        let Some(identifier) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected identifier");
            self.sync_to_semicolon();
            return None;
        };

        if self.consume(TokenKind::Assign).is_none() {
            self.error_at_current("Expected assignment operator");
            self.sync_to_semicolon();
            return None;
        }

        let Some(value) = self.parse_expression() else {
            self.error_at_current("Expected expression after assignment operator");
            self.sync_to_semicolon();
            return None;
        };

        let node =
            self.new_node(NodeKind::VariableAssignment, Some(&identifier), identifier.lexeme.clone());
        self.attach(node, vec![value]);
        self.arena.node_mut(node).is_ref_counted = true;
        Some(node)
    }

    /// A standalone call statement: `functionName(arguments, ...)`.
    pub(crate) fn parse_function_call_statement(&mut self) -> Option<NodeId> {
        let Some(name_token) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected function name for function call");
            self.sync_to_semicolon();
            return None;
        };

        if self.consume(TokenKind::OpenParen).is_none() {
            self.error_at_current("Expected '(' after function name");
            self.sync_to_semicolon();
            return None;
        }

        let arguments = self.parse_call_arguments();

        if self.consume(TokenKind::CloseParen).is_none() {
            self.error_at_current("Expected ')' after function arguments");
            self.sync_to_semicolon();
            return None;
        }

        // Unknown callees are an error unless imports may still provide the
        // definition, in which case the check is deferred until after merge.
        let known = builtin_return_type(&name_token.lexeme).is_some()
            || self.registries.user_functions.contains_key(&name_token.lexeme);
        if !known {
            if self.defer_undefined_identifiers {
                self.deferred_undefined
                    .push((name_token.lexeme.clone(), Some(name_token.clone())));
            } else {
                self.error(
                    format!("Function '{}' is not defined", name_token.lexeme),
                    Some(&name_token),
                );
                return None;
            }
        }

        let node = self.new_node(NodeKind::FunctionCall, Some(&name_token), name_token.lexeme.clone());
        self.attach(node, arguments);

        let return_type = builtin_return_type(&name_token.lexeme)
            .map(str::to_string)
            .or_else(|| {
                self.registries
                    .user_functions
                    .get(&name_token.lexeme)
                    .cloned()
                    .flatten()
            });
        self.arena.node_mut(node).return_type = return_type;
        Some(node)
    }

    /// Compound assignment: `x += e`, `x -= e`, ...
    pub(crate) fn parse_compound_assignment(&mut self) -> Option<NodeId> {
        let Some(identifier) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected identifier");
            self.sync_to_semicolon();
            return None;
        };

        let op_token = match self.current_kind() {
            Some(
                TokenKind::AddAssign
                | TokenKind::SubtractAssign
                | TokenKind::MultiplyAssign
                | TokenKind::DivideAssign
                | TokenKind::ModuloAssign,
            ) => {
                let token = self.current_cloned()?;
                self.advance();
                token
            }
            _ => {
                self.error_at_current("Expected compound assignment operator");
                return None;
            }
        };

        let Some(value) = self.parse_expression() else {
            self.error_at_current("Expected expression after compound assignment operator");
            self.sync_to_semicolon();
            return None;
        };

        let node =
            self.new_node(NodeKind::CompoundAssignment, Some(&identifier), identifier.lexeme.clone());
        self.attach(node, vec![value]);
        // The operator token drives code generation; the node keeps the
        // identifier's source index.
        self.arena.node_mut(node).token = Some(op_token);
        self.arena.node_mut(node).is_ref_counted = true;
        Some(node)
    }

    /// Increment/decrement: `x++`, `x--`.
    pub(crate) fn parse_increment_or_decrement(&mut self) -> Option<NodeId> {
        let Some(identifier) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected identifier");
            self.sync_to_semicolon();
            return None;
        };

        match self.current_kind() {
            Some(TokenKind::Increment | TokenKind::Decrement) => {
                let op = self.current_cloned()?;
                self.advance();
                // The identifier token is kept on the node; the operator text
                // becomes the node name.
                let node = self.new_node(NodeKind::UnaryExpression, Some(&identifier), op.lexeme);
                Some(node)
            }
            _ => {
                self.error_at_current("Expected increment or decrement operator");
                None
            }
        }
    }

    /// `if (<cond>) <stmt-or-block> [else <stmt-or-block>]`
    pub(crate) fn parse_if_statement(&mut self) -> Option<NodeId> {
        let if_token = self.consume(TokenKind::If)?;

        if self.consume(TokenKind::OpenParen).is_none() {
            self.error_at_current("Expected '(' after 'if'");
            return None;
        }

        let Some(condition) = self.parse_expression() else {
            self.consume(TokenKind::CloseParen);
            return None;
        };

        if self.consume(TokenKind::CloseParen).is_none() {
            self.error_at_current("Expected ')' after if condition");
            return None;
        }

        let then_branch = if self.at(TokenKind::OpenBrace) {
            let Some(scope) = self.parse_scope() else {
                self.error_at_current("Invalid 'then' block (scope) for if statement");
                return None;
            };
            scope
        } else {
            let stmt = self.parse_statement();
            let scope = self.new_node(NodeKind::Scope, None, "scope_then");
            self.arena.node_mut(scope).index = if_token.index;
            if let Some(stmt) = stmt {
                self.arena.node_mut(scope).index = self.arena.node(stmt).index;
                self.attach(scope, vec![stmt]);
            }
            scope
        };

        let mut children = vec![condition, then_branch];

        if self.at(TokenKind::Else) {
            self.consume(TokenKind::Else);
            let else_branch = if self.at(TokenKind::OpenBrace) {
                self.parse_scope()
            } else {
                let stmt = self.parse_statement();
                let scope = self.new_node(NodeKind::Scope, None, "scope_else");
                self.arena.node_mut(scope).index = if_token.index;
                if let Some(stmt) = stmt {
                    self.arena.node_mut(scope).index = self.arena.node(stmt).index;
                    self.attach(scope, vec![stmt]);
                }
                Some(scope)
            };
            if let Some(else_branch) = else_branch {
                children.push(else_branch);
            }
        }

        let node = self.new_node(NodeKind::IfStatement, Some(&if_token), "if");
        self.attach(node, children);
        Some(node)
    }

    /// `while (<cond>) <stmt-or-block>`
    pub(crate) fn parse_while_statement(&mut self) -> Option<NodeId> {
        let while_token = self.consume(TokenKind::While)?;

        if self.consume(TokenKind::OpenParen).is_none() {
            self.error_at_current("Expected '(' after 'while'");
            return None;
        }

        let Some(condition) = self.parse_expression() else {
            self.consume(TokenKind::CloseParen);
            return None;
        };

        if self.consume(TokenKind::CloseParen).is_none() {
            self.error_at_current("Expected ')' after while condition");
            return None;
        }

        let body = if self.at(TokenKind::OpenBrace) {
            self.parse_scope()?
        } else {
            let stmt = self.parse_statement();
            let scope = self.new_node(NodeKind::Scope, None, "scope");
            self.arena.node_mut(scope).index = while_token.index;
            if let Some(stmt) = stmt {
                self.arena.node_mut(scope).index = self.arena.node(stmt).index;
                self.attach(scope, vec![stmt]);
            }
            scope
        };

        let node = self.new_node(NodeKind::WhileStatement, Some(&while_token), "while");
        self.attach(node, vec![condition, body]);
        Some(node)
    }

    /// A brace-enclosed block as a new scope.
    pub(crate) fn parse_scope(&mut self) -> Option<NodeId> {
        let Some(open_brace) = self.consume(TokenKind::OpenBrace) else {
            self.error_at_current("Expected '{' to start scope");
            return None;
        };

        let scope = self.new_node(NodeKind::Scope, Some(&open_brace), "scope");
        while self.current().is_some() && !self.at(TokenKind::CloseBrace) {
            if self.at(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let before = self.pos;
            let stmt = self.parse_statement();
            if let Some(stmt) = stmt {
                self.arena.add_child(scope, stmt);
            } else if self.pos == before {
                // Recovery fallback: never loop without consuming.
                self.advance();
            }
            self.consume(TokenKind::Semicolon);
        }
        self.consume(TokenKind::CloseBrace);
        Some(scope)
    }

    /// `directive <name> [, arg]* ;`
    pub(crate) fn parse_directive(&mut self) -> Option<NodeId> {
        let directive_token = self.consume(TokenKind::Directive)?;

        let Some(name_token) = self.consume(TokenKind::Identifier) else {
            self.error("Expected directive name after 'directive'", Some(&directive_token));
            return None;
        };

        // Optional comma-separated arguments, currently ignored.
        while self.current().is_some() && !self.at(TokenKind::Semicolon) {
            if self.at(TokenKind::Comma) {
                self.advance();
                if matches!(
                    self.current_kind(),
                    Some(
                        TokenKind::Identifier
                            | TokenKind::IntegerLiteral
                            | TokenKind::FloatLiteral
                            | TokenKind::DoubleLiteral
                            | TokenKind::StringLiteral
                            | TokenKind::BooleanLiteral
                    )
                ) {
                    self.advance();
                }
                continue;
            }
            self.error_at_current("Unexpected token in directive arguments");
            break;
        }
        if self.consume(TokenKind::Semicolon).is_none() {
            self.error("Expected semicolon after directive", Some(&name_token));
        }

        let known = KNOWN_DIRECTIVES.contains(&name_token.lexeme.as_str());
        if !known {
            self.error(
                format!("Unknown directive '{}'", name_token.lexeme),
                Some(&name_token),
            );
        } else {
            self.directives.insert(name_token.lexeme.clone());
        }

        let node = self.new_node(NodeKind::Directive, Some(&directive_token), name_token.lexeme);
        Some(node)
    }
}
