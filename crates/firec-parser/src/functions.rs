//! Function definitions, generic type parameters, and constraint aliases.

use firec_lexer::TokenKind;

use crate::node::{NodeId, NodeKind};
use crate::registries::ParamSig;
use crate::state::ParserState;

impl ParserState {
    /// Lookahead for a top-level function definition:
    /// `TYPE name (`, `TYPE [] name (`, or `TYPE name < ... > (` (generic,
    /// where TYPE may itself be a declared type parameter).
    pub(crate) fn looks_like_function_definition(&self) -> bool {
        let Some(current) = self.current() else {
            return false;
        };

        let mut starts_type = self.is_type_token(current);
        if !starts_type && current.kind == TokenKind::Identifier {
            // Possibly a generic function returning its own type parameter:
            // IDENT IDENT '<' ...
            if self.peek_kind(1) == Some(TokenKind::Identifier)
                && self.peek_kind(2) == Some(TokenKind::LessThan)
            {
                starts_type = true;
            }
        }
        if !starts_type {
            return false;
        }

        // Gather the next few meaningful tokens (comments skipped).
        let mut look = Vec::new();
        let mut offset = 1;
        while look.len() < 30 {
            let Some(kind) = self.peek_kind(offset) else {
                break;
            };
            if !kind.is_comment() {
                look.push(kind);
            }
            offset += 1;
        }

        if look.len() >= 2 && look[0] == TokenKind::Identifier && look[1] == TokenKind::OpenParen {
            return true;
        }
        if look.len() >= 4
            && look[0] == TokenKind::OpenBracket
            && look[1] == TokenKind::CloseBracket
            && look[2] == TokenKind::Identifier
            && look[3] == TokenKind::OpenParen
        {
            return true;
        }
        if look.len() >= 3 && look[0] == TokenKind::Identifier && look[1] == TokenKind::LessThan {
            // Find the matching '>' and require '(' right after it.
            let mut depth = 1usize;
            let mut i = 2;
            while i < look.len() && depth > 0 {
                match look[i] {
                    TokenKind::LessThan => depth += 1,
                    TokenKind::GreaterThan => depth -= 1,
                    _ => {}
                }
                i += 1;
            }
            if depth == 0 && look.get(i) == Some(&TokenKind::OpenParen) {
                return true;
            }
        }
        false
    }

    /// `<RetType>[[]] <name>[<T [: constraint], ...>](<params>) { <body> }`
    pub(crate) fn parse_function_definition(&mut self) -> Option<NodeId> {
        let mut valid_return = self.current_is_type_token();
        if !valid_return
            && self.at(TokenKind::Identifier)
            && self.peek_kind(1) == Some(TokenKind::Identifier)
            && self.peek_kind(2) == Some(TokenKind::LessThan)
        {
            // Return type may be a type parameter declared just ahead.
            valid_return = true;
        }
        if !valid_return {
            self.error_at_current("Expected return type at function definition");
            return None;
        }
        let return_type_token = self.current_cloned()?;
        self.advance();

        let mut return_is_array = false;
        if self.at(TokenKind::OpenBracket) {
            self.advance();
            if self.consume(TokenKind::CloseBracket).is_none() {
                self.error_at_current("Expected ']' after '[' in array return type");
                return None;
            }
            return_is_array = true;
        }

        let Some(name_token) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected function name after return type");
            return None;
        };

        // Optional generic type parameters with constraints.
        let mut type_params: Vec<String> = Vec::new();
        let mut type_constraints: rustc_hash::FxHashMap<String, String> =
            rustc_hash::FxHashMap::default();

        if self.at(TokenKind::LessThan) {
            self.advance();
            loop {
                let Some(param_token) = self.consume(TokenKind::Identifier) else {
                    self.error_at_current("Expected type parameter name");
                    return None;
                };
                type_params.push(param_token.lexeme.clone());

                // `T: int32 | float64` or `T: Comparable` or an alias name,
                // expanded inline.
                if self.at(TokenKind::Colon) {
                    self.advance();
                    let mut parts: Vec<String> = Vec::new();
                    loop {
                        let Some(constraint_token) = self.current_cloned() else {
                            self.error_at_current("Expected constraint type or interface");
                            return None;
                        };
                        if !(self.is_type_token(&constraint_token)
                            || constraint_token.kind == TokenKind::Identifier)
                        {
                            self.error("Expected constraint type or interface", Some(&constraint_token));
                            return None;
                        }
                        self.advance();

                        let text = Self::normalize_type_name(&constraint_token);
                        match self.registries.constraint_aliases.get(&text) {
                            Some(expansion) => parts.push(expansion.clone()),
                            None => parts.push(text),
                        }

                        if self.at(TokenKind::Pipe) {
                            self.advance();
                            continue;
                        }
                        if self.at(TokenKind::Ampersand) {
                            self.advance();
                            parts.push("&".to_string());
                            continue;
                        }
                        break;
                    }
                    type_constraints.insert(param_token.lexeme.clone(), parts.join(" | "));
                }

                if self.at(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }

            if self.at(TokenKind::GreaterThan) {
                self.advance();
            } else {
                self.error_at_current("Expected '>' to close type parameters");
                return None;
            }
        }

        // An identifier return type must be a declared type parameter.
        if return_type_token.kind == TokenKind::Identifier
            && !self.registries.user_types.contains(&return_type_token.lexeme)
            && !type_params.iter().any(|p| *p == return_type_token.lexeme)
        {
            self.error(
                format!(
                    "Return type '{}' is not a declared type parameter",
                    return_type_token.lexeme
                ),
                Some(&return_type_token),
            );
            return None;
        }

        if self.consume(TokenKind::OpenParen).is_none() {
            self.error_at_current("Expected '(' after function name");
            return None;
        }

        // Type parameters are in scope while parsing the signature and body.
        let previous_type_params = std::mem::replace(&mut self.current_type_params, type_params.clone());

        let result = self.parse_function_rest(
            &name_token,
            &return_type_token,
            return_is_array,
            &type_params,
            &type_constraints,
        );

        self.current_type_params = previous_type_params;
        result
    }

    fn parse_function_rest(
        &mut self,
        name_token: &firec_lexer::Token,
        return_type_token: &firec_lexer::Token,
        return_is_array: bool,
        type_params: &[String],
        type_constraints: &rustc_hash::FxHashMap<String, String>,
    ) -> Option<NodeId> {
        let mut params: Vec<NodeId> = Vec::new();
        if self.current().is_some() && !self.at(TokenKind::CloseParen) {
            loop {
                // `&` before the type marks a borrowed parameter.
                let is_borrowed = self.consume(TokenKind::Ampersand).is_some();

                if !self.current_is_type_token() {
                    self.error_at_current("Expected parameter type");
                    return None;
                }
                let type_token = self.current_cloned()?;
                self.advance();

                let mut is_array = false;
                if self.at(TokenKind::OpenBracket) {
                    self.advance();
                    if self.consume(TokenKind::CloseBracket).is_none() {
                        self.error_at_current("Expected ']' after '[' in array parameter type");
                        return None;
                    }
                    is_array = true;
                }

                let Some(param_name) = self.consume(TokenKind::Identifier) else {
                    self.error_at_current("Expected parameter name");
                    return None;
                };

                let param =
                    self.new_node(NodeKind::Parameter, Some(&param_name), param_name.lexeme.clone());
                let n = self.arena.node_mut(param);
                n.var_type = Some(Self::normalize_type_name(&type_token));
                n.is_array = is_array;
                n.is_ref_counted = is_array;
                n.is_borrowed = is_borrowed;
                params.push(param);

                if self.at(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        if self.consume(TokenKind::CloseParen).is_none() {
            self.error_at_current("Expected ')' after parameters");
            return None;
        }
        if !self.at(TokenKind::OpenBrace) {
            self.error_at_current("Expected '{' to start function body");
            return None;
        }
        let body = self.parse_scope()?;

        let base_return = Self::normalize_type_name(return_type_token);
        let return_type_value = if return_is_array {
            format!("{base_return}[]")
        } else {
            base_return
        };

        let node = self.new_node(NodeKind::FunctionDefinition, Some(name_token), name_token.lexeme.clone());
        let mut children = params.clone();
        children.push(body);
        self.attach(node, children);
        {
            let n = self.arena.node_mut(node);
            n.return_type = Some(return_type_value.clone());
            n.is_array = return_is_array;
            n.is_ref_counted = return_is_array;
            n.type_params = type_params.to_vec();
            n.type_constraints = type_constraints.clone();
        }

        // Register the signature for call checking.
        let signatures: Vec<ParamSig> = params
            .iter()
            .map(|&p| {
                let n = self.arena.node(p);
                ParamSig {
                    name: n.name.clone(),
                    param_type: n.var_type.clone().unwrap_or_default(),
                    is_array: n.is_array,
                    is_borrowed: n.is_borrowed,
                }
            })
            .collect();
        self.registries
            .user_functions
            .insert(name_token.lexeme.clone(), Some(return_type_value));
        self.registries
            .user_function_params
            .insert(name_token.lexeme.clone(), signatures);
        if !type_params.is_empty() {
            self.registries
                .generic_functions
                .insert(name_token.lexeme.clone(), type_params.to_vec());
            self.registries
                .generic_constraints
                .insert(name_token.lexeme.clone(), type_constraints.clone());
        }
        Some(node)
    }

    /// `constraint Name = type1 | type2 | ...;`
    ///
    /// Constraint declarations produce no tree node; they only update the
    /// alias registry. Aliases on the right-hand side expand recursively.
    pub(crate) fn parse_constraint_declaration(&mut self) {
        let Some(_constraint_token) = self.consume(TokenKind::Constraint) else {
            return;
        };

        let Some(name_token) = self.consume(TokenKind::Identifier) else {
            self.error_at_current("Expected constraint name after 'constraint'");
            return;
        };

        if self.consume(TokenKind::Assign).is_none() {
            self.error_at_current("Expected '=' after constraint name");
            return;
        }

        let mut parts: Vec<String> = Vec::new();
        loop {
            let Some(type_token) = self.current_cloned() else {
                self.error_at_current("Expected type name in constraint definition");
                return;
            };
            if !(type_token.kind == TokenKind::Identifier || self.is_type_token(&type_token)) {
                self.error("Expected type name in constraint definition", Some(&type_token));
                return;
            }
            self.advance();

            let text = if self.is_type_token(&type_token) {
                Self::normalize_type_name(&type_token)
            } else {
                type_token.lexeme.clone()
            };
            match self.registries.constraint_aliases.get(&text) {
                Some(expansion) => parts.push(expansion.clone()),
                None => parts.push(text),
            }

            if self.at(TokenKind::Pipe) {
                self.advance();
                continue;
            }
            if self.at(TokenKind::Ampersand) {
                self.advance();
                parts.push("&".to_string());
                continue;
            }
            break;
        }

        self.registries
            .constraint_aliases
            .insert(name_token.lexeme, parts.join(" | "));
    }
}
