//! Import statement parsing.
//!
//! Accepted shapes:
//!   import a.b.c
//!   import a.b.c as Alias
//!   import a.b.name [as alias]
//!   import a.b.{n1 [as a1], n2 ...}
//!   import a.b.*
//!   import @vendor/pkg (external; always an error)
//!
//! `@firescript/...` is the first-party standard library prefix and rewrites
//! into a dotted path rooted at `firescript`.

use firec_lexer::TokenKind;

use crate::node::{ImportData, ImportKind, ImportSymbol, NodeId, NodeKind};
use crate::state::ParserState;

impl ParserState {
    pub(crate) fn parse_import(&mut self) -> Option<NodeId> {
        let start_token = self.consume(TokenKind::Import)?;

        let kind: ImportKind;
        let mut module_path = String::new();
        let mut alias: Option<String> = None;
        let mut symbols: Vec<ImportSymbol> = Vec::new();

        if self.at(TokenKind::At) {
            let at_token = self.consume(TokenKind::At)?;
            if !self.at(TokenKind::Identifier) {
                self.error("Expected package name after '@'", Some(&at_token));
                return None;
            }
            let mut segments = vec![self.consume(TokenKind::Identifier)?.lexeme];
            // The path separator inside a package name lexes as '/'.
            while self.at(TokenKind::Divide) {
                self.advance();
                let Some(segment) = self.consume(TokenKind::Identifier) else {
                    self.error_at_current("Expected identifier after '/' in external package name");
                    break;
                };
                segments.push(segment.lexeme);
            }

            if segments.first().is_some_and(|s| s == "firescript") {
                // Standard library import: rewrite to a dotted path rooted
                // at `firescript` and keep parsing like an internal module.
                let mut module_segments = segments;
                while self.at(TokenKind::Dot) {
                    let Some(next) = self.peek(1) else {
                        break;
                    };
                    if matches!(next.kind, TokenKind::OpenBrace | TokenKind::Multiply) {
                        break;
                    }
                    if next.kind == TokenKind::Identifier || self.is_type_token(next) {
                        if matches!(
                            self.peek_kind(2),
                            Some(TokenKind::OpenBrace | TokenKind::Multiply)
                        ) {
                            // The identifier belongs to the symbol suffix.
                            break;
                        }
                        self.advance(); // consume '.'
                        let segment = self.current_cloned()?;
                        self.advance();
                        module_segments.push(segment.lexeme);
                    } else {
                        break;
                    }
                }
                module_path = module_segments.join(".");

                if self.at(TokenKind::Dot) {
                    self.advance();
                    let (suffix_kind, suffix_symbols) = self.parse_import_symbol_suffix()?;
                    kind = suffix_kind;
                    symbols = suffix_symbols;
                } else {
                    kind = ImportKind::Module;
                }
            } else {
                module_path = format!("@{}", segments.join("/"));
                kind = ImportKind::External;
            }
        } else {
            // Dotted module path; type keywords may appear as segments.
            let path_start_ok = self
                .current()
                .is_some_and(|t| t.kind == TokenKind::Identifier || self.is_type_token(t));
            if !path_start_ok {
                self.error("Expected module name after 'import'", Some(&start_token));
                return None;
            }
            let first = self.current_cloned()?;
            self.advance();
            let mut segments = vec![first.lexeme];

            while self.at(TokenKind::Dot) {
                let Some(next) = self.peek(1) else {
                    break;
                };
                if next.kind == TokenKind::Identifier || self.is_type_token(next) {
                    if self.peek_kind(2) == Some(TokenKind::Dot) {
                        // More segments follow, so this identifier is part of
                        // the module path.
                        self.advance();
                        let segment = self.current_cloned()?;
                        self.advance();
                        segments.push(segment.lexeme);
                        continue;
                    }
                    // No further dots: `module.symbol`, handled below.
                    break;
                }
                break;
            }
            module_path = segments.join(".");

            if self.at(TokenKind::Dot) {
                self.advance();
                let (suffix_kind, suffix_symbols) = self.parse_import_symbol_suffix()?;
                kind = suffix_kind;
                symbols = suffix_symbols;
            } else {
                // Whole-module import with optional alias.
                if self.at(TokenKind::As) {
                    self.advance();
                    let Some(alias_token) = self.consume(TokenKind::Identifier) else {
                        self.error_at_current("Expected alias name after 'as'");
                        return None;
                    };
                    alias = Some(alias_token.lexeme);
                }
                kind = ImportKind::Module;
            }
        }

        let node = self.new_node(NodeKind::ImportStatement, Some(&start_token), "import");
        self.arena.node_mut(node).import = Some(ImportData {
            module_path,
            kind,
            alias,
            symbols,
        });

        if kind == ImportKind::External {
            self.error("External packages are not supported", Some(&start_token));
        }

        Some(node)
    }

    /// After the `.` that ends the module path: `{a [as x], b}`, `*`, or a
    /// single `name [as alias]`.
    fn parse_import_symbol_suffix(&mut self) -> Option<(ImportKind, Vec<ImportSymbol>)> {
        let mut symbols = Vec::new();

        if self.at(TokenKind::OpenBrace) {
            self.advance();
            while self.current().is_some() && !self.at(TokenKind::CloseBrace) {
                let Some(name_token) = self.consume(TokenKind::Identifier) else {
                    self.error_at_current("Expected identifier in import symbol list");
                    break;
                };
                let alias = if self.at(TokenKind::As) {
                    self.advance();
                    let Some(alias_token) = self.consume(TokenKind::Identifier) else {
                        self.error_at_current("Expected alias name after 'as'");
                        return None;
                    };
                    Some(alias_token.lexeme)
                } else {
                    None
                };
                symbols.push(ImportSymbol {
                    name: name_token.lexeme,
                    alias,
                });
                if self.at(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
            if self.consume(TokenKind::CloseBrace).is_none() {
                self.error_at_current("Expected '}' to close import symbol list");
                return None;
            }
            return Some((ImportKind::Symbols, symbols));
        }

        if self.at(TokenKind::Multiply) {
            self.advance();
            return Some((ImportKind::Wildcard, symbols));
        }

        if self.at(TokenKind::Identifier) {
            let name_token = self.consume(TokenKind::Identifier)?;
            let alias = if self.at(TokenKind::As) {
                self.advance();
                let Some(alias_token) = self.consume(TokenKind::Identifier) else {
                    self.error_at_current("Expected alias name after 'as'");
                    return None;
                };
                Some(alias_token.lexeme)
            } else {
                None
            };
            symbols.push(ImportSymbol {
                name: name_token.lexeme,
                alias,
            });
            return Some((ImportKind::Symbols, symbols));
        }

        self.error_at_current("Expected symbol name, '*', or '{' after '.' in import");
        None
    }
}
