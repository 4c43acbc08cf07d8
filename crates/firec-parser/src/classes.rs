//! Class definitions: fields, methods, constructors, and single-inheritance
//! materialization.
//!
//! Inherited fields are prepended to the derived class (name conflicts with
//! locally-declared fields are errors). Inherited non-constructor methods
//! are deep-copied into the derived class with the receiver rebound to the
//! derived type; locally-defined methods override same-named inherited ones.

use firec_lexer::{Token, TokenKind};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::node::{NodeId, NodeKind};
use crate::registries::MethodSig;
use crate::state::{ClassContext, ParserState};

impl ParserState {
    /// `class Name [from Base] { <fields and methods> }`
    pub(crate) fn parse_class_definition(&mut self) -> Option<NodeId> {
        let _class_token = self.consume(TokenKind::Class)?;
        let Some(name_token) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected class name after 'class'");
            return None;
        };

        let mut base_class: Option<String> = None;
        if self.at(TokenKind::From) {
            self.advance();
            let Some(base_token) = self.consume(TokenKind::Identifier) else {
                self.error_at_current("Expected base class name after 'from'");
                return None;
            };
            if base_token.lexeme == name_token.lexeme {
                self.error("A class cannot inherit from itself", Some(&base_token));
            }
            base_class = Some(base_token.lexeme);
        }

        if self.consume(TokenKind::OpenBrace).is_none() {
            self.error_at_current("Expected '{' to start class body");
            return None;
        }

        let mut fields: Vec<NodeId> = Vec::new();
        let mut methods: Vec<NodeId> = Vec::new();
        let mut local_field_types: IndexMap<String, String> = IndexMap::new();

        while self.current().is_some() && !self.at(TokenKind::CloseBrace) {
            if matches!(
                self.current_kind(),
                Some(TokenKind::SingleLineComment | TokenKind::MultiLineCommentStart)
            ) {
                self.skip_comment();
                continue;
            }
            if self.at(TokenKind::Semicolon) {
                self.advance();
                continue;
            }

            // Member types are known types or the current class name.
            let member_type_ok = self.current_is_type_token()
                || self
                    .current()
                    .is_some_and(|t| t.kind == TokenKind::Identifier && t.lexeme == name_token.lexeme);
            if !member_type_ok {
                self.error_at_current("Expected field or method return type in class body");
                while let Some(kind) = self.current_kind() {
                    if matches!(kind, TokenKind::Semicolon | TokenKind::CloseBrace) {
                        break;
                    }
                    self.advance();
                }
                self.consume(TokenKind::Semicolon);
                continue;
            }
            let member_type_token = self.current_cloned()?;
            self.advance();

            // Constructor without an explicit return type:
            // `ClassName(<params>) { ... }`
            if member_type_token.kind == TokenKind::Identifier
                && member_type_token.lexeme == name_token.lexeme
                && self.at(TokenKind::OpenParen)
            {
                self.consume(TokenKind::OpenParen);
                let params = self.parse_method_params(&name_token)?;

                if !self.at(TokenKind::OpenBrace) {
                    self.error_at_current("Expected '{' to start method body");
                    return None;
                }
                self.class_context_stack.push(ClassContext {
                    class_name: name_token.lexeme.clone(),
                    in_constructor: true,
                    base_class: base_class.clone(),
                });
                let body = self.parse_scope();
                self.class_context_stack.pop();
                let body = body?;

                let method = self.new_node(
                    NodeKind::ClassMethodDefinition,
                    Some(&member_type_token),
                    member_type_token.lexeme.clone(),
                );
                let mut children = params;
                children.push(body);
                self.attach(method, children);
                let n = self.arena.node_mut(method);
                n.return_type = Some(name_token.lexeme.clone());
                n.class_name = Some(name_token.lexeme.clone());
                n.is_constructor = true;
                methods.push(method);
                continue;
            }

            let Some(member_name_token) = self.consume(TokenKind::Identifier) else {
                self.error_at_current("Expected identifier after type in class body");
                break;
            };

            if self.at(TokenKind::OpenParen) {
                // Method definition; a method named like the class is a
                // constructor.
                let is_constructor = member_name_token.lexeme == name_token.lexeme;
                self.consume(TokenKind::OpenParen);
                let params = self.parse_method_params(&name_token)?;

                if !self.at(TokenKind::OpenBrace) {
                    self.error_at_current("Expected '{' to start method body");
                    return None;
                }
                self.class_context_stack.push(ClassContext {
                    class_name: name_token.lexeme.clone(),
                    in_constructor: is_constructor,
                    base_class: base_class.clone(),
                });
                let body = self.parse_scope();
                self.class_context_stack.pop();
                let body = body?;

                // Non-constructor methods get a synthetic `this` receiver
                // unless `&this` was written explicitly.
                let mut param_nodes = params;
                let has_receiver = param_nodes
                    .first()
                    .is_some_and(|&p| self.arena.node(p).name == "this");
                if !is_constructor && !has_receiver {
                    let receiver = self.new_node(
                        NodeKind::Parameter,
                        Some(&member_name_token),
                        "this",
                    );
                    let n = self.arena.node_mut(receiver);
                    n.var_type = Some(name_token.lexeme.clone());
                    n.is_receiver = true;
                    param_nodes.insert(0, receiver);
                }

                let method = self.new_node(
                    NodeKind::ClassMethodDefinition,
                    Some(&member_name_token),
                    member_name_token.lexeme.clone(),
                );
                let mut children = param_nodes;
                children.push(body);
                self.attach(method, children);
                let n = self.arena.node_mut(method);
                n.return_type = Some(Self::normalize_type_name(&member_type_token));
                n.class_name = Some(name_token.lexeme.clone());
                n.is_constructor = is_constructor;
                methods.push(method);
            } else {
                // Field declaration: `<Type> <name>;`
                if self.consume(TokenKind::Semicolon).is_none() {
                    self.error_at_current("Expected ';' after field declaration");
                    while let Some(kind) = self.current_kind() {
                        if matches!(kind, TokenKind::Semicolon | TokenKind::CloseBrace) {
                            break;
                        }
                        self.advance();
                    }
                    self.consume(TokenKind::Semicolon);
                }
                let field_type = Self::normalize_type_name(&member_type_token);
                let field = self.new_node(
                    NodeKind::ClassField,
                    Some(&member_name_token),
                    member_name_token.lexeme.clone(),
                );
                self.arena.node_mut(field).var_type = Some(field_type.clone());
                fields.push(field);
                local_field_types.insert(member_name_token.lexeme.clone(), field_type);
            }
        }
        self.consume(TokenKind::CloseBrace);

        // Materialize inherited members. Inherited fields are prepended;
        // inherited methods are deep copies with the receiver rebound.
        let mut field_types: IndexMap<String, String> = IndexMap::new();
        let mut inherited_fields: Vec<NodeId> = Vec::new();
        let mut inherited_methods: Vec<NodeId> = Vec::new();

        if let Some(base) = &base_class {
            if let Some(base_fields) = self.registries.user_classes.get(base).cloned() {
                for (field_name, field_type) in base_fields {
                    if local_field_types.contains_key(&field_name) {
                        self.error(
                            format!(
                                "Field '{}' in '{}' conflicts with inherited field from '{}'",
                                field_name, name_token.lexeme, base
                            ),
                            Some(&name_token),
                        );
                        continue;
                    }
                    let inherited = self.new_node(NodeKind::ClassField, Some(&name_token), field_name.clone());
                    self.arena.node_mut(inherited).var_type = Some(field_type.clone());
                    inherited_fields.push(inherited);
                    field_types.insert(field_name, field_type);
                }
            }

            let base_methods = self.class_method_nodes.get(base).cloned().unwrap_or_default();
            let defined_names: Vec<String> = methods
                .iter()
                .map(|&m| self.arena.node(m).name.clone())
                .collect();
            for base_method in base_methods {
                if self.arena.node(base_method).is_constructor {
                    continue;
                }
                let method_name = self.arena.node(base_method).name.clone();
                if defined_names.iter().any(|n| *n == method_name) {
                    continue;
                }
                let copy = self.arena.deep_copy(base_method);
                {
                    let n = self.arena.node_mut(copy);
                    n.class_name = Some(name_token.lexeme.clone());
                    n.is_constructor = false;
                }
                // Rebind the receiver to the derived class.
                for child in self.arena.children(copy) {
                    let n = self.arena.node_mut(child);
                    if n.kind == NodeKind::Parameter && n.name == "this" {
                        n.var_type = Some(name_token.lexeme.clone());
                        break;
                    }
                }
                inherited_methods.push(copy);
            }
        }
        field_types.extend(local_field_types);

        let all_fields: Vec<NodeId> = inherited_fields.into_iter().chain(fields).collect();
        let all_methods: Vec<NodeId> = methods.into_iter().chain(inherited_methods).collect();

        // Register the class type.
        self.registries.user_types.insert(name_token.lexeme.clone());
        self.registries.catalog.register_class(&name_token.lexeme, false);
        self.registries
            .user_classes
            .insert(name_token.lexeme.clone(), field_types);
        self.registries
            .user_class_bases
            .insert(name_token.lexeme.clone(), base_class.clone());
        self.class_field_nodes
            .insert(name_token.lexeme.clone(), all_fields.clone());
        self.class_method_nodes
            .insert(name_token.lexeme.clone(), all_methods.clone());

        // Method signature lookup: base signatures first (overridden by the
        // derived class's own entries below).
        let mut method_sigs: FxHashMap<String, MethodSig> = FxHashMap::default();
        if let Some(base) = &base_class {
            if let Some(base_sigs) = self.registries.user_methods.get(base) {
                for (method_name, sig) in base_sigs {
                    method_sigs.insert(method_name.clone(), sig.clone());
                }
            }
        }
        for &method in &all_methods {
            let node = self.arena.node(method);
            let mut param_types: Vec<String> = Vec::new();
            let mut skipped_receiver = false;
            for &child in &node.children {
                let child_node = self.arena.node(child);
                if child_node.kind != NodeKind::Parameter {
                    continue;
                }
                if !skipped_receiver && child_node.name == "this" {
                    skipped_receiver = true;
                    continue;
                }
                skipped_receiver = true;
                param_types.push(child_node.var_type.clone().unwrap_or_default());
            }
            method_sigs.insert(
                node.name.clone(),
                MethodSig {
                    return_type: node.return_type.clone(),
                    param_types,
                },
            );
        }
        self.registries
            .user_methods
            .insert(name_token.lexeme.clone(), method_sigs);

        let class_node =
            self.new_node(NodeKind::ClassDefinition, Some(&name_token), name_token.lexeme.clone());
        let children: Vec<NodeId> = all_fields.into_iter().chain(all_methods).collect();
        self.attach(class_node, children);
        self.arena.node_mut(class_node).base_class = base_class;
        Some(class_node)
    }

    /// Method parameter list after the `(`. Supports a leading `&this`
    /// borrowed receiver and `&`-prefixed borrowed parameter types.
    fn parse_method_params(&mut self, class_name_token: &Token) -> Option<Vec<NodeId>> {
        let mut params: Vec<NodeId> = Vec::new();
        let mut seen_receiver = false;

        if self.current().is_some() && !self.at(TokenKind::CloseParen) {
            loop {
                if self.at(TokenKind::Ampersand)
                    && self
                        .peek(1)
                        .is_some_and(|t| t.kind == TokenKind::Identifier && t.lexeme == "this")
                {
                    let amp_token = self.current_cloned()?;
                    self.advance();
                    let this_token = self.consume(TokenKind::Identifier)?;
                    if seen_receiver || !params.is_empty() {
                        self.error("'&this' must be the first method parameter", Some(&amp_token));
                    }
                    let receiver = self.new_node(NodeKind::Parameter, Some(&this_token), "this");
                    let n = self.arena.node_mut(receiver);
                    n.var_type = Some(class_name_token.lexeme.clone());
                    n.is_borrowed = true;
                    n.is_receiver = true;
                    params.push(receiver);
                    seen_receiver = true;
                } else {
                    let is_borrowed = self.consume(TokenKind::Ampersand).is_some();

                    let param_type_ok = self.current_is_type_token()
                        || self.current().is_some_and(|t| {
                            t.kind == TokenKind::Identifier && t.lexeme == class_name_token.lexeme
                        });
                    if !param_type_ok {
                        self.error_at_current("Expected parameter type in method");
                        return None;
                    }
                    let type_token = self.current_cloned()?;
                    self.advance();

                    if self.at(TokenKind::OpenBracket) {
                        self.error_at_current("Array parameters are not supported for methods");
                        while self.current().is_some() && !self.at(TokenKind::CloseParen) {
                            self.advance();
                        }
                        break;
                    }

                    let Some(param_name) = self.consume(TokenKind::Identifier) else {
                        self.error_at_current("Expected parameter name in method");
                        return None;
                    };

                    let param =
                        self.new_node(NodeKind::Parameter, Some(&param_name), param_name.lexeme.clone());
                    let n = self.arena.node_mut(param);
                    n.var_type = Some(Self::normalize_type_name(&type_token));
                    n.is_borrowed = is_borrowed;
                    params.push(param);
                }

                if self.at(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }

        if self.consume(TokenKind::CloseParen).is_none() {
            self.error_at_current("Expected ')' after method parameters");
            return None;
        }
        Some(params)
    }
}
