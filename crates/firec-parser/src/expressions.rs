//! Expression parsing: precedence climbing with postfix chains.
//!
//! Precedence, tightest last: equality/relational -> additive ->
//! multiplicative -> unary -> primary. A postfix `as <type>` cast binds
//! tighter than any binary operator.

use firec_lexer::TokenKind;

use crate::node::{NodeId, NodeKind};
use crate::registries::builtin_return_type;
use crate::state::ParserState;
use crate::typecheck::infer_literal_type;

impl ParserState {
    pub(crate) fn parse_expression(&mut self) -> Option<NodeId> {
        self.parse_equality()
    }

    /// Equality and relational expressions (`==`, `!=`, `>`, `<`, `>=`, `<=`).
    pub(crate) fn parse_equality(&mut self) -> Option<NodeId> {
        let mut node = self.parse_additive()?;

        while let Some(kind) = self.current_kind() {
            let node_kind = match kind {
                TokenKind::Equals | TokenKind::NotEquals => NodeKind::EqualityExpression,
                TokenKind::GreaterThan
                | TokenKind::LessThan
                | TokenKind::GreaterThanOrEqual
                | TokenKind::LessThanOrEqual => NodeKind::RelationalExpression,
                _ => break,
            };
            let op_token = self.current_cloned()?;
            self.advance();
            let right = self.parse_additive()?;
            let combined = self.new_node(node_kind, Some(&op_token), op_token.lexeme.clone());
            self.attach(combined, vec![node, right]);
            node = combined;
        }
        Some(node)
    }

    /// Additive expressions (`+` and `-`).
    pub(crate) fn parse_additive(&mut self) -> Option<NodeId> {
        let mut node = self.parse_multiplicative()?;

        while matches!(
            self.current_kind(),
            Some(TokenKind::Add | TokenKind::Subtract)
        ) {
            let op_token = self.current_cloned()?;
            self.advance();
            let right = self.parse_multiplicative()?;
            let combined =
                self.new_node(NodeKind::BinaryExpression, Some(&op_token), op_token.lexeme.clone());
            self.attach(combined, vec![node, right]);
            node = combined;
        }
        Some(node)
    }

    /// Multiplicative expressions (`*`, `/`, `%`).
    pub(crate) fn parse_multiplicative(&mut self) -> Option<NodeId> {
        let mut node = self.parse_unary()?;

        while matches!(
            self.current_kind(),
            Some(TokenKind::Multiply | TokenKind::Divide | TokenKind::Modulo)
        ) {
            let op_token = self.current_cloned()?;
            self.advance();
            let right = self.parse_unary()?;
            let combined =
                self.new_node(NodeKind::BinaryExpression, Some(&op_token), op_token.lexeme.clone());
            self.attach(combined, vec![node, right]);
            node = combined;
        }
        Some(node)
    }

    /// Unary `-` and `+`, right-associative.
    pub(crate) fn parse_unary(&mut self) -> Option<NodeId> {
        if matches!(
            self.current_kind(),
            Some(TokenKind::Subtract | TokenKind::Add)
        ) {
            let op_token = self.current_cloned()?;
            self.advance();
            let Some(operand) = self.parse_unary() else {
                self.error(
                    format!("Expected expression after unary '{}'", op_token.lexeme),
                    Some(&op_token),
                );
                return None;
            };
            let node =
                self.new_node(NodeKind::UnaryExpression, Some(&op_token), op_token.lexeme.clone());
            self.attach(node, vec![operand]);
            return Some(node);
        }
        self.parse_primary()
    }

    /// Rust-style postfix cast chain: `<expr> as <type>`.
    pub(crate) fn parse_postfix_cast(&mut self, node: Option<NodeId>) -> Option<NodeId> {
        let mut node = node?;
        while self.at(TokenKind::As) {
            self.advance();
            let Some(type_token) = self.current_cloned() else {
                let origin = self.arena.node(node).token.clone();
                self.error("Expected type after 'as'", origin.as_ref());
                break;
            };
            if !(self.is_type_token(&type_token) || type_token.kind == TokenKind::Identifier) {
                self.error("Expected type after 'as'", Some(&type_token));
                break;
            }
            self.advance();

            let target_type = if self.is_type_token(&type_token) {
                Self::normalize_type_name(&type_token)
            } else {
                type_token.lexeme.clone()
            };

            let cast = self.new_node(NodeKind::CastExpression, Some(&type_token), target_type.clone());
            self.attach(cast, vec![node]);
            self.arena.node_mut(cast).return_type = Some(target_type);
            node = cast;
        }
        Some(node)
    }

    /// Comma-separated call arguments up to (not including) the `)`.
    pub(crate) fn parse_call_arguments(&mut self) -> Vec<NodeId> {
        let mut arguments = Vec::new();
        if self.current().is_some() && !self.at(TokenKind::CloseParen) {
            loop {
                if let Some(arg) = self.parse_expression() {
                    arguments.push(arg);
                }
                if self.at(TokenKind::Comma) {
                    self.consume(TokenKind::Comma);
                    continue;
                }
                break;
            }
        }
        arguments
    }

    pub(crate) fn parse_primary(&mut self) -> Option<NodeId> {
        let token = self.current_cloned()?;

        // Java-like constructor: new ClassName(args)
        if token.kind == TokenKind::New {
            self.advance();
            let Some(class_token) = self.consume(TokenKind::Identifier) else {
                self.error_at_current("Expected class name after 'new'");
                return None;
            };
            if !self.registries.user_types.contains(&class_token.lexeme) {
                self.error(
                    format!("Unknown type '{}' in constructor", class_token.lexeme),
                    Some(&class_token),
                );
            }
            if self.consume(TokenKind::OpenParen).is_none() {
                self.error_at_current("Expected '(' after constructor type");
                return None;
            }
            let arguments = self.parse_call_arguments();
            if self.consume(TokenKind::CloseParen).is_none() {
                self.error_at_current("Expected ')' after constructor arguments");
                return None;
            }
            let node =
                self.new_node(NodeKind::ConstructorCall, Some(&class_token), class_token.lexeme.clone());
            self.attach(node, arguments);
            return Some(node);
        }

        if token.kind == TokenKind::OpenParen {
            self.advance();
            let expr = self.parse_expression();
            if !self.at(TokenKind::CloseParen) {
                self.error_at_current("Expected closing parenthesis");
                return self.parse_postfix_cast(expr);
            }
            self.advance();
            return self.parse_postfix_cast(expr);
        }

        if token.kind == TokenKind::OpenBracket {
            return self.parse_array_literal();
        }

        if token.kind.is_literal() {
            self.advance();
            let node = self.new_node(NodeKind::Literal, Some(&token), token.lexeme.clone());
            let return_type = match token.kind {
                TokenKind::BooleanLiteral => Some("bool".to_string()),
                TokenKind::StringLiteral => Some("string".to_string()),
                TokenKind::NullLiteral => Some("null".to_string()),
                TokenKind::IntegerLiteral | TokenKind::FloatLiteral | TokenKind::DoubleLiteral => {
                    Some(infer_literal_type(&token))
                }
                _ => None,
            };
            self.arena.node_mut(node).return_type = return_type;
            return self.parse_postfix_cast(Some(node));
        }

        if token.kind == TokenKind::Identifier {
            self.advance();

            // Type-level method call: Type.method(...)
            if self.registries.user_types.contains(&token.lexeme) && self.at(TokenKind::Dot) {
                self.consume(TokenKind::Dot);
                let Some(method_token) = self.consume(TokenKind::Identifier) else {
                    self.error_at_current("Expected method name after type '.'");
                    return None;
                };
                if self.consume(TokenKind::OpenParen).is_none() {
                    self.error_at_current("Expected '(' after type method name");
                    return None;
                }
                let arguments = self.parse_call_arguments();
                if self.consume(TokenKind::CloseParen).is_none() {
                    self.error_at_current("Expected ')' after arguments");
                    return None;
                }
                let node = self.new_node(
                    NodeKind::TypeMethodCall,
                    Some(&method_token),
                    method_token.lexeme.clone(),
                );
                self.attach(node, arguments);
                self.arena.node_mut(node).class_name = Some(token.lexeme.clone());
                return Some(node);
            }

            let mut node = self.new_node(NodeKind::Identifier, Some(&token), token.lexeme.clone());

            // Postfix chains: array access, field access, method call,
            // function call, generic call, cast.
            loop {
                match self.current_kind() {
                    Some(TokenKind::OpenBracket) => {
                        node = self.parse_array_access(node)?;
                    }
                    Some(TokenKind::Dot) => {
                        self.consume(TokenKind::Dot);
                        let Some(member_token) = self.consume(TokenKind::Identifier) else {
                            self.error_at_current("Expected identifier after '.'");
                            break;
                        };
                        if self.at(TokenKind::OpenParen) {
                            self.consume(TokenKind::OpenParen);
                            let arguments = self.parse_call_arguments();
                            if self.consume(TokenKind::CloseParen).is_none() {
                                self.error_at_current("Expected ')' after method arguments");
                            }

                            // `this.super(...)` inside constructors lowers to
                            // a SuperCall node.
                            let context = self.class_context().cloned();
                            let is_this_receiver = {
                                let n = self.arena.node(node);
                                n.kind == NodeKind::Identifier && n.name == "this"
                            };
                            if member_token.lexeme == "super"
                                && is_this_receiver
                                && context.as_ref().is_some_and(|c| c.in_constructor)
                            {
                                let context = context.expect("checked above");
                                let super_node =
                                    self.new_node(NodeKind::SuperCall, Some(&member_token), "super");
                                self.attach(super_node, arguments);
                                let n = self.arena.node_mut(super_node);
                                n.class_name = Some(context.class_name);
                                n.base_class = context.base_class;
                                n.is_constructor = true;
                                return Some(super_node);
                            }

                            let call = self.new_node(
                                NodeKind::MethodCall,
                                Some(&member_token),
                                member_token.lexeme.clone(),
                            );
                            let mut children = vec![node];
                            children.extend(arguments);
                            self.attach(call, children);
                            node = call;
                        } else {
                            // Field access, chainable: a.b.c
                            let access = self.new_node(
                                NodeKind::FieldAccess,
                                Some(&member_token),
                                member_token.lexeme.clone(),
                            );
                            self.attach(access, vec![node]);
                            node = access;
                        }
                    }
                    Some(TokenKind::OpenParen) => {
                        self.consume(TokenKind::OpenParen);
                        let arguments = self.parse_call_arguments();
                        if self.consume(TokenKind::CloseParen).is_none() {
                            self.error("Expected ')' after function arguments", Some(&token));
                        }
                        let call =
                            self.new_node(NodeKind::FunctionCall, Some(&token), token.lexeme.clone());
                        self.attach(call, arguments);
                        self.set_call_return_type(call, &token);
                        node = call;
                    }
                    Some(TokenKind::LessThan)
                        if self.registries.generic_functions.contains_key(&token.lexeme) =>
                    {
                        node = self.parse_generic_call(&token)?;
                    }
                    Some(TokenKind::As) => {
                        node = self.parse_postfix_cast(Some(node))?;
                    }
                    _ => break,
                }
            }
            return self.parse_postfix_cast(Some(node));
        }

        self.error(format!("Unexpected token {}", token.lexeme), Some(&token));
        self.advance();
        None
    }

    /// Record a call's return type from the registries, or defer/report an
    /// unknown callee.
    fn set_call_return_type(&mut self, call: NodeId, token: &firec_lexer::Token) {
        if let Some(builtin) = builtin_return_type(&token.lexeme) {
            self.arena.node_mut(call).return_type = Some(builtin.to_string());
        } else if let Some(return_type) = self.registries.user_functions.get(&token.lexeme) {
            self.arena.node_mut(call).return_type = return_type.clone();
        } else if self.registries.user_types.contains(&token.lexeme) {
            // Constructor call: validated in the type checker, which also
            // sets the return type.
        } else if self.defer_undefined_identifiers {
            self.deferred_undefined
                .push((token.lexeme.clone(), Some(token.clone())));
        } else {
            self.error(
                format!("Function '{}' is not defined", token.lexeme),
                Some(token),
            );
        }
    }

    /// Explicit generic type arguments: `func<T1, T2>(...)`. Only entered
    /// when `func` is a known generic function; otherwise `<` is a
    /// comparison.
    fn parse_generic_call(&mut self, token: &firec_lexer::Token) -> Option<NodeId> {
        self.advance(); // consume <
        let mut type_args = Vec::new();
        loop {
            if !self.current_is_type_token() {
                self.error_at_current("Expected type argument");
                break;
            }
            let arg_token = self.current_cloned()?;
            self.advance();
            type_args.push(Self::normalize_type_name(&arg_token));

            if self.at(TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }

        if self.at(TokenKind::GreaterThan) {
            self.advance();
        } else {
            self.error_at_current("Expected '>' to close type arguments");
        }

        if !self.at(TokenKind::OpenParen) {
            self.error_at_current("Expected '(' after generic type arguments");
            return None;
        }
        self.consume(TokenKind::OpenParen);
        let arguments = self.parse_call_arguments();
        if self.consume(TokenKind::CloseParen).is_none() {
            self.error("Expected ')' after function arguments", Some(token));
        }

        let call = self.new_node(NodeKind::FunctionCall, Some(token), token.lexeme.clone());
        self.attach(call, arguments);
        let return_type = self
            .registries
            .user_functions
            .get(&token.lexeme)
            .cloned()
            .flatten()
            .unwrap_or_else(|| "void".to_string());
        let n = self.arena.node_mut(call);
        n.type_args = type_args;
        n.return_type = Some(return_type);
        Some(call)
    }

    /// Array literal `[e1, e2, ...]`.
    pub(crate) fn parse_array_literal(&mut self) -> Option<NodeId> {
        let Some(open_bracket) = self.consume(TokenKind::OpenBracket) else {
            self.error_at_current("Expected '[' to start array literal");
            return None;
        };

        let mut elements = Vec::new();
        if self.current().is_some() && !self.at(TokenKind::CloseBracket) {
            loop {
                if let Some(element) = self.parse_expression() {
                    elements.push(element);
                }
                if self.at(TokenKind::Comma) {
                    self.consume(TokenKind::Comma);
                    continue;
                }
                break;
            }
        }

        if self.consume(TokenKind::CloseBracket).is_none() {
            self.error_at_current("Expected ']' to end array literal");
            return None;
        }

        let node = self.new_node(NodeKind::ArrayLiteral, Some(&open_bracket), "array");
        self.attach(node, elements);
        Some(node)
    }

    /// Array access `arr[index]`.
    pub(crate) fn parse_array_access(&mut self, array_node: NodeId) -> Option<NodeId> {
        let Some(open_bracket) = self.consume(TokenKind::OpenBracket) else {
            self.error_at_current("Expected '[' for array access");
            return None;
        };

        let Some(index_expr) = self.parse_expression() else {
            self.error_at_current("Expected expression for array index");
            return None;
        };

        if self.consume(TokenKind::CloseBracket).is_none() {
            self.error_at_current("Expected ']' to close array access");
            return None;
        }

        let node = self.new_node(NodeKind::ArrayAccess, Some(&open_bracket), "arrayAccess");
        self.attach(node, vec![array_node, index_expr]);
        Some(node)
    }
}
