//! In-place type check over the resolved tree.
//!
//! Assigns a `return_type` to every expression node and enforces the
//! operator, cast, call, and condition rules. Binary arithmetic requires
//! exact type identity, with the sole relaxation that `+` with at least one
//! `string` operand yields `string`.

use firec_common::types::{display_type, is_integer_type, is_numeric_type, split_array_type};
use firec_lexer::{Token, TokenKind};
use rustc_hash::FxHashMap;

use crate::node::{NodeId, NodeKind};
use crate::registries::builtin_return_type;
use crate::state::ParserState;

/// Built-in interface names accepted as opaque generic constraints.
const CONSTRAINT_INTERFACES: [&str; 6] = [
    "Numeric",
    "Comparable",
    "SignedInt",
    "UnsignedInt",
    "Float",
    "Integer",
];

/// Numeric constructor builtins that take exactly one argument.
const CONSTRUCTOR_BUILTINS: [&str; 8] = [
    "int", "int32", "float32", "float64", "float128", "bool", "string", "char",
];

type SymbolTable = FxHashMap<String, (Option<String>, bool)>;

/// Infer the type of a numeric literal from its suffix and the language
/// defaults (`int32` for bare integers, `float64` for bare decimals).
#[must_use]
pub(crate) fn infer_literal_type(token: &Token) -> String {
    let text = token.lexeme.as_str();
    match token.kind {
        TokenKind::IntegerLiteral => {
            for (suffix, name) in [
                ("i8", "int8"),
                ("i16", "int16"),
                ("i32", "int32"),
                ("i64", "int64"),
                ("u8", "uint8"),
                ("u16", "uint16"),
                ("u32", "uint32"),
                ("u64", "uint64"),
            ] {
                if text.ends_with(suffix) {
                    return name.to_string();
                }
            }
            "int32".to_string()
        }
        TokenKind::FloatLiteral => {
            if text.ends_with("f128") {
                "float128".to_string()
            } else if text.ends_with("f64") {
                "float64".to_string()
            } else {
                "float32".to_string()
            }
        }
        TokenKind::DoubleLiteral => "float64".to_string(),
        _ => String::new(),
    }
}

impl ParserState {
    pub(crate) fn type_check(&mut self) {
        let mut table = SymbolTable::default();
        let root = self.root;
        self.check_node(root, &mut table);
    }

    fn is_type_param(&self, name: &str) -> bool {
        self.current_type_params.iter().any(|p| p == name)
    }

    fn token_of(&self, id: NodeId) -> Option<Token> {
        self.arena.node(id).token.clone()
    }

    fn child_token(&self, id: NodeId, index: usize) -> Option<Token> {
        self.arena
            .node(id)
            .children
            .get(index)
            .and_then(|&c| self.arena.node(c).token.clone())
    }

    fn error_at_node(&mut self, message: String, id: NodeId) {
        let token = self.token_of(id);
        self.error(message, token.as_ref());
    }

    /// Recursively check a node, returning its expression type in display
    /// form (`int32`, `string[]`, `null`, a class name, `void`).
    pub(crate) fn check_node(&mut self, id: NodeId, table: &mut SymbolTable) -> Option<String> {
        let kind = self.arena.node(id).kind;
        let children = self.arena.children(id);

        // Parameters of a definition participate in the symbol table so that
        // `param++` and compound assignment to parameters type-check.
        if matches!(
            kind,
            NodeKind::FunctionDefinition | NodeKind::ClassMethodDefinition
        ) {
            for &child in &children {
                let node = self.arena.node(child);
                if node.kind == NodeKind::Parameter {
                    table.insert(node.name.clone(), (node.var_type.clone(), node.is_array));
                }
            }
        }

        // Generic function bodies accept their type parameters as types.
        let type_params = self.arena.node(id).type_params.clone();
        let child_types: Vec<Option<String>> =
            if kind == NodeKind::FunctionDefinition && !type_params.is_empty() {
                let previous = std::mem::replace(&mut self.current_type_params, type_params);
                let types = children.iter().map(|&c| self.check_node(c, table)).collect();
                self.current_type_params = previous;
                types
            } else {
                children.iter().map(|&c| self.check_node(c, table)).collect()
            };

        let result = match kind {
            NodeKind::Root | NodeKind::Scope => None,
            NodeKind::VariableDeclaration => {
                self.check_variable_declaration(id, &child_types, table);
                None
            }
            NodeKind::VariableAssignment => {
                self.check_variable_assignment(id, &child_types, table)?;
                None
            }
            NodeKind::BinaryExpression => self.check_binary(id, &child_types),
            NodeKind::UnaryExpression => return self.check_unary(id, &child_types, table),
            NodeKind::EqualityExpression => self.check_equality(id, &child_types),
            NodeKind::RelationalExpression => self.check_relational(id, &child_types),
            NodeKind::CastExpression => self.check_cast(id, &child_types)?,
            NodeKind::FunctionCall => self.check_function_call(id, &child_types),
            NodeKind::MethodCall => self.check_method_call(id, &child_types),
            NodeKind::SuperCall => self.check_super_call(id, &child_types)?,
            NodeKind::TypeMethodCall => self.check_type_method_call(id, &child_types)?,
            NodeKind::ConstructorCall => self.check_constructor_call(id, &child_types)?,
            NodeKind::FieldAccess => self.check_field_access(id, &child_types),
            NodeKind::ArrayAccess => self.check_array_access(id, &child_types),
            NodeKind::IfStatement | NodeKind::WhileStatement => {
                self.check_condition(id, &child_types);
                None
            }
            NodeKind::BreakStatement | NodeKind::ContinueStatement => {
                self.check_loop_placement(id);
                None
            }
            _ => None,
        };

        match result {
            Some(ty) => Some(ty),
            None => self.expression_type(id, &child_types),
        }
    }

    /// Fallback type query for nodes whose type is carried as an annotation.
    fn expression_type(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let node = self.arena.node(id);
        match node.kind {
            NodeKind::Literal => {
                if let Some(return_type) = &node.return_type {
                    return Some(return_type.clone());
                }
                let token = node.token.as_ref()?;
                match token.kind {
                    TokenKind::IntegerLiteral => Some("int32".to_string()),
                    TokenKind::FloatLiteral => Some("float32".to_string()),
                    TokenKind::DoubleLiteral => Some("float64".to_string()),
                    TokenKind::BooleanLiteral => Some("bool".to_string()),
                    TokenKind::StringLiteral => Some("string".to_string()),
                    TokenKind::NullLiteral => Some("null".to_string()),
                    _ => None,
                }
            }
            NodeKind::Identifier => {
                let base = node.var_type.clone()?;
                Some(display_type(&base, node.is_array))
            }
            NodeKind::ArrayLiteral => {
                let first = child_types.first()?.clone()?;
                if first.ends_with("[]") {
                    self.error_at_node("Array literals cannot directly contain arrays".to_string(), id);
                    return None;
                }
                Some(format!("{first}[]"))
            }
            NodeKind::FunctionCall
            | NodeKind::MethodCall
            | NodeKind::SuperCall
            | NodeKind::TypeMethodCall
            | NodeKind::ConstructorCall
            | NodeKind::ArrayAccess
            | NodeKind::CastExpression
            | NodeKind::BinaryExpression
            | NodeKind::EqualityExpression
            | NodeKind::RelationalExpression => node.return_type.clone(),
            _ => None,
        }
    }

    fn check_variable_declaration(
        &mut self,
        id: NodeId,
        child_types: &[Option<String>],
        table: &mut SymbolTable,
    ) {
        let node = self.arena.node(id);
        let name = node.name.clone();
        let var_type = node.var_type.clone();
        let is_array = node.is_array;
        let is_nullable = node.is_nullable;
        let declared = var_type
            .as_deref()
            .map(|base| display_type(base, is_array));

        if let Some(Some(initializer)) = child_types.first() {
            if initializer == "null" {
                if !is_nullable {
                    self.error_at_node(
                        format!("Cannot initialize non-nullable variable '{name}' with null"),
                        id,
                    );
                }
            } else if let Some(declared) = &declared {
                // Strict: no implicit coercions between numeric families.
                if declared != initializer {
                    self.error_at_node(
                        format!(
                            "Type mismatch for variable '{name}'. Expected {declared}, got {initializer}"
                        ),
                        id,
                    );
                }
            }
        }
        table.insert(name, (var_type, is_array));
    }

    fn check_variable_assignment(
        &mut self,
        id: NodeId,
        child_types: &[Option<String>],
        table: &mut SymbolTable,
    ) -> Option<()> {
        let name = self.arena.node(id).name.clone();
        let assigned = child_types.first().cloned().flatten();
        match table.get(&name).cloned() {
            None => {
                // Implicit declaration on first assignment: register with
                // the inferred type.
                if let Some(assigned) = assigned {
                    let (base, is_array) = split_array_type(&assigned);
                    table.insert(name, (Some(base.to_string()), is_array));
                } else {
                    self.error_at_node(format!("Variable '{name}' not defined"), id);
                    return None;
                }
            }
            Some((var_type, is_array)) => {
                if let (Some(var_type), Some(assigned)) = (var_type, assigned) {
                    let expected = display_type(&var_type, is_array);
                    if assigned != "null" && expected != assigned {
                        self.error_at_node(
                            format!(
                                "Type mismatch assigning to variable '{name}'. Expected {expected}, got {assigned}"
                            ),
                            id,
                        );
                    }
                }
            }
        }
        Some(())
    }

    fn check_binary(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let left = child_types.first()?.clone()?;
        let right = child_types.get(1)?.clone()?;
        let op = self.arena.node(id).name.clone();
        let same = left == right;
        let type_param = self.is_type_param(&left);

        let result = match op.as_str() {
            "+" => {
                // String concatenation is allowed with any operand order.
                if left == "string" || right == "string" {
                    Some("string".to_string())
                } else if same && (is_numeric_type(&left) || type_param) {
                    Some(left)
                } else {
                    self.error_at_node(
                        format!("Operator '+' not supported between types {left} and {right}"),
                        id,
                    );
                    None
                }
            }
            "-" | "*" | "/" => {
                if same && (is_numeric_type(&left) || type_param) {
                    Some(left)
                } else {
                    self.error_at_node(
                        format!("Operator '{op}' not supported between types {left} and {right}"),
                        id,
                    );
                    None
                }
            }
            "%" => {
                if same && (is_integer_type(&left) || type_param) {
                    Some(left)
                } else {
                    self.error_at_node(
                        format!(
                            "Operator '%' requires integer operands of the same type, got {left} and {right}"
                        ),
                        id,
                    );
                    None
                }
            }
            _ => {
                self.error_at_node(format!("Unsupported binary operator '{op}'"), id);
                None
            }
        };
        self.arena.node_mut(id).return_type = result.clone();
        result
    }

    fn check_unary(
        &mut self,
        id: NodeId,
        child_types: &[Option<String>],
        table: &mut SymbolTable,
    ) -> Option<String> {
        let op = self.arena.node(id).name.clone();

        // Increment/decrement operate on the identifier stored in the node's
        // token and have no children.
        if op == "++" || op == "--" {
            let var_name = self.token_of(id).map(|t| t.lexeme)?;
            return match table.get(&var_name).cloned() {
                Some((Some(var_type), _)) if is_integer_type(&var_type) => Some(var_type),
                Some((var_type, _)) => {
                    self.error_at_node(
                        format!(
                            "Operator '{op}' requires an integer variable, got {}",
                            var_type.as_deref().unwrap_or("<unknown>")
                        ),
                        id,
                    );
                    None
                }
                None => {
                    self.error_at_node(format!("Variable '{var_name}' not defined"), id);
                    None
                }
            };
        }

        if child_types.is_empty() {
            self.error_at_node(format!("Unary operator '{op}' missing operand"), id);
            return None;
        }
        let operand = child_types.first()?.clone()?;

        let result = if op == "+" || op == "-" {
            if is_numeric_type(&operand) || self.is_type_param(&operand) {
                Some(operand)
            } else {
                self.error_at_node(
                    format!("Unary operator '{op}' requires numeric operand, got {operand}"),
                    id,
                );
                None
            }
        } else {
            self.error_at_node(format!("Unsupported unary operator '{op}'"), id);
            None
        };
        self.arena.node_mut(id).return_type = result.clone();
        result
    }

    fn check_equality(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let left = child_types.first()?.clone()?;
        let right = child_types.get(1)?.clone()?;
        let op = self.arena.node(id).name.clone();

        let same = left == right;
        let comparable = (same && is_numeric_type(&left))
            || (same && (left == "string" || left == "bool"))
            || left == "null"
            || right == "null";
        let result = if comparable {
            Some("bool".to_string())
        } else {
            self.error_at_node(
                format!("Cannot compare types {left} and {right} with '{op}'"),
                id,
            );
            None
        };
        self.arena.node_mut(id).return_type = result.clone();
        result
    }

    fn check_relational(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let left = child_types.first()?.clone()?;
        let right = child_types.get(1)?.clone()?;
        let op = self.arena.node(id).name.clone();

        let result = if left == right && (is_numeric_type(&left) || self.is_type_param(&left)) {
            Some("bool".to_string())
        } else {
            self.error_at_node(
                format!("Operator '{op}' requires same-type numeric operands, got {left} and {right}"),
                id,
            );
            None
        };
        self.arena.node_mut(id).return_type = result.clone();
        result
    }

    fn check_cast(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<Option<String>> {
        let expr_type = child_types.first()?.clone()?;
        let target = self.arena.node(id).name.clone();

        // Arrays may be cast to string; casting to an array type is
        // rejected.
        if expr_type.ends_with("[]") {
            if target == "string" {
                self.arena.node_mut(id).return_type = Some("string".to_string());
                return Some(Some("string".to_string()));
            }
            self.error_at_node(format!("Cannot cast array type {expr_type} to {target}"), id);
            return None;
        }
        if target.ends_with("[]") {
            self.error_at_node(format!("Cannot cast to array type {target}"), id);
            return None;
        }

        if target == "string" {
            self.arena.node_mut(id).return_type = Some("string".to_string());
            return Some(Some("string".to_string()));
        }
        if !is_numeric_type(&target) {
            self.error_at_node(
                format!("Cannot cast to unknown or non-numeric type {target}"),
                id,
            );
            return None;
        }
        if !is_numeric_type(&expr_type) && expr_type != "bool" && expr_type != "string" {
            self.error_at_node(
                format!("Cannot cast non-numeric type {expr_type} to {target}"),
                id,
            );
            return None;
        }
        self.arena.node_mut(id).return_type = Some(target.clone());
        Some(Some(target))
    }

    fn check_function_call(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let func_name = self.arena.node(id).name.clone();
        let mut result: Option<String> = None;

        // Generic calls: infer or validate type arguments, check
        // constraints, substitute the return type.
        if let Some(type_params) = self.registries.generic_functions.get(&func_name).cloned() {
            let explicit = !self.arena.node(id).type_args.is_empty();
            if explicit {
                let given = self.arena.node(id).type_args.len();
                if given != type_params.len() {
                    self.error_at_node(
                        format!(
                            "Generic function '{func_name}' expects {} type arguments, got {given}",
                            type_params.len()
                        ),
                        id,
                    );
                }
            } else {
                let arg_types: Vec<String> =
                    child_types.iter().flatten().cloned().collect();
                match self.infer_generic_type_args(&func_name, &arg_types) {
                    Some(inferred) => self.arena.node_mut(id).type_args = inferred,
                    None => {
                        self.error_at_node(
                            format!(
                                "Could not infer type arguments for generic function '{func_name}'"
                            ),
                            id,
                        );
                        self.arena.node_mut(id).type_args = Vec::new();
                    }
                }
            }

            let type_args = self.arena.node(id).type_args.clone();
            if !type_args.is_empty() {
                let constraints = self
                    .registries
                    .generic_constraints
                    .get(&func_name)
                    .cloned()
                    .unwrap_or_default();
                for (param, concrete) in type_params.iter().zip(&type_args) {
                    if let Some(constraint) = constraints.get(param) {
                        let allowed: Vec<&str> =
                            constraint.split('|').map(str::trim).collect();
                        if !allowed.contains(&concrete.as_str())
                            && !CONSTRAINT_INTERFACES.contains(&constraint.as_str())
                        {
                            self.error_at_node(
                                format!(
                                    "Type '{concrete}' does not satisfy constraint '{constraint}' for type parameter '{param}'"
                                ),
                                id,
                            );
                        }
                    }
                }

                if let Some(Some(generic_return)) =
                    self.registries.user_functions.get(&func_name).cloned()
                {
                    let substituted = type_params
                        .iter()
                        .position(|p| *p == generic_return)
                        .map_or(generic_return, |i| type_args[i].clone());
                    self.arena.node_mut(id).return_type = Some(substituted.clone());
                    result = Some(substituted);
                }
            }
        }

        // Builtin arity checks.
        let arg_count = child_types.len();
        match func_name.as_str() {
            "print" | "typeof" => {
                if arg_count != 1 {
                    self.error_at_node(
                        format!("Function '{func_name}' expected 1 arguments, got {arg_count}"),
                        id,
                    );
                }
            }
            "input" => {
                if arg_count != 1 {
                    self.error_at_node(
                        format!("Function 'input' expected 1 arguments, got {arg_count}"),
                        id,
                    );
                } else if let Some(Some(arg)) = child_types.first() {
                    if arg != "string" {
                        let token = self.child_token(id, 0);
                        self.error(
                            format!("Argument 1 for function 'input' expected type string, got {arg}"),
                            token.as_ref(),
                        );
                    }
                }
            }
            name if CONSTRUCTOR_BUILTINS.contains(&name) => {
                if arg_count != 1 {
                    self.error_at_node(
                        format!("Function '{func_name}' expected 1 arguments, got {arg_count}"),
                        id,
                    );
                }
            }
            _ => {}
        }

        // Calling a class name is a positional constructor over the ordered
        // field list.
        if self.registries.user_types.contains(&func_name) {
            if let Some(fields) = self.registries.user_classes.get(&func_name).cloned() {
                if child_types.len() != fields.len() {
                    self.error_at_node(
                        format!(
                            "Constructor '{func_name}' expected {} args, got {}",
                            fields.len(),
                            child_types.len()
                        ),
                        id,
                    );
                } else {
                    for (i, (arg, (_, expected))) in
                        child_types.iter().zip(fields.iter()).enumerate()
                    {
                        if let Some(arg) = arg {
                            if arg != expected {
                                let token = self.child_token(id, i).or_else(|| self.token_of(id));
                                self.error(
                                    format!(
                                        "Constructor '{func_name}' arg {} expected {expected}, got {arg}",
                                        i + 1
                                    ),
                                    token.as_ref(),
                                );
                            }
                        }
                    }
                }
            }
            self.arena.node_mut(id).return_type = Some(func_name.clone());
            return Some(func_name);
        }

        // Known non-generic user functions: arity and positional types.
        if !self.registries.generic_functions.contains_key(&func_name) {
            if let Some(signature) = self.registries.user_function_params.get(&func_name).cloned() {
                if child_types.len() != signature.len() {
                    self.error_at_node(
                        format!(
                            "Function '{func_name}' expected {} arguments, got {}",
                            signature.len(),
                            child_types.len()
                        ),
                        id,
                    );
                } else {
                    for (i, (arg, param)) in child_types.iter().zip(signature.iter()).enumerate() {
                        let expected = display_type(&param.param_type, param.is_array);
                        if let Some(arg) = arg {
                            if *arg != expected {
                                let token = self.child_token(id, i).or_else(|| self.token_of(id));
                                self.error(
                                    format!(
                                        "Argument {} for function '{func_name}' expected type {expected}, got {arg}",
                                        i + 1
                                    ),
                                    token.as_ref(),
                                );
                            }
                        }
                    }
                }
            }
            if self.arena.node(id).return_type.is_none() {
                let fallback = builtin_return_type(&func_name)
                    .map(str::to_string)
                    .or_else(|| {
                        self.registries
                            .user_functions
                            .get(&func_name)
                            .cloned()
                            .flatten()
                    });
                self.arena.node_mut(id).return_type = fallback;
            }
            result = self.arena.node(id).return_type.clone();
        }

        result.or_else(|| self.arena.node(id).return_type.clone())
    }

    /// Infer type arguments by unifying declared parameter types (each `T`
    /// is a variable) against the argument types. Conflicting or missing
    /// bindings fail the inference.
    fn infer_generic_type_args(
        &self,
        func_name: &str,
        arg_types: &[String],
    ) -> Option<Vec<String>> {
        let type_params = self.registries.generic_functions.get(func_name)?;
        if type_params.is_empty() {
            return Some(Vec::new());
        }
        let signature = self.registries.user_function_params.get(func_name)?;

        let mut bindings: FxHashMap<&str, &str> = FxHashMap::default();
        for (param, arg) in signature.iter().zip(arg_types) {
            if type_params.iter().any(|p| *p == param.param_type) {
                match bindings.get(param.param_type.as_str()) {
                    Some(existing) if *existing != arg.as_str() => return None,
                    Some(_) => {}
                    None => {
                        bindings.insert(param.param_type.as_str(), arg.as_str());
                    }
                }
            }
        }

        type_params
            .iter()
            .map(|p| bindings.get(p.as_str()).map(|t| (*t).to_string()))
            .collect()
    }

    fn check_method_call(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let object_type = child_types.first()?.clone()?;
        let method_name = self.arena.node(id).name.clone();
        let arg_types = &child_types[1..];

        self.arena.node_mut(id).return_type = None;

        if object_type.ends_with("[]") {
            match method_name.as_str() {
                "length" | "size" => {
                    if arg_types.is_empty() {
                        self.arena.node_mut(id).return_type = Some("int32".to_string());
                    } else {
                        self.error_at_node(
                            format!(
                                "Method '{method_name}' expected 0 arguments, got {}",
                                arg_types.len()
                            ),
                            id,
                        );
                    }
                }
                // The historical mutating methods are recognised but
                // rejected on fixed-size arrays.
                "append" | "insert" | "pop" | "clear" => {
                    self.error_at_node(
                        format!(
                            "Unsupported array method '{method_name}' for fixed-size arrays"
                        ),
                        id,
                    );
                }
                _ => {
                    self.error_at_node(
                        format!("Unknown method '{method_name}' for array type {object_type}"),
                        id,
                    );
                }
            }
        } else if let Some(sig) = self
            .registries
            .user_methods
            .get(&object_type)
            .and_then(|methods| methods.get(&method_name))
            .cloned()
        {
            if arg_types.len() != sig.param_types.len() {
                self.error_at_node(
                    format!(
                        "Method '{method_name}' for '{object_type}' expected {} args, got {}",
                        sig.param_types.len(),
                        arg_types.len()
                    ),
                    id,
                );
            } else {
                for (i, (arg, expected)) in arg_types.iter().zip(sig.param_types.iter()).enumerate()
                {
                    if let Some(arg) = arg {
                        if arg != expected {
                            let token =
                                self.child_token(id, i + 1).or_else(|| self.token_of(id));
                            self.error(
                                format!(
                                    "Argument {} for method '{method_name}' expected type {expected}, got {arg}",
                                    i + 1
                                ),
                                token.as_ref(),
                            );
                        }
                    }
                }
            }
            self.arena.node_mut(id).return_type = sig.return_type;
        } else {
            let token = self.child_token(id, 0).or_else(|| self.token_of(id));
            self.error(
                format!("Methods not supported for type {object_type}"),
                token.as_ref(),
            );
        }

        self.arena.node(id).return_type.clone()
    }

    fn check_super_call(
        &mut self,
        id: NodeId,
        child_types: &[Option<String>],
    ) -> Option<Option<String>> {
        let node = self.arena.node(id);
        let enclosing = node.class_name.clone();
        let super_class = node.base_class.clone();
        let in_constructor = node.is_constructor;

        let Some(enclosing) = enclosing else {
            self.error_at_node("'super' can only be used inside a class method".to_string(), id);
            return None;
        };
        let Some(super_class) = super_class else {
            self.error_at_node(
                format!("Class '{enclosing}' has no base class; cannot use 'super'"),
                id,
            );
            return None;
        };
        if !in_constructor {
            self.error_at_node(
                "'this.super(...)' is only valid inside a constructor".to_string(),
                id,
            );
            return None;
        }

        // When the base constructor exists, check arity and types here; the
        // semantic analyzer reports a missing base constructor.
        if let Some(sig) = self
            .registries
            .user_methods
            .get(&super_class)
            .and_then(|methods| methods.get(&super_class))
            .cloned()
        {
            if child_types.len() != sig.param_types.len() {
                self.error_at_node(
                    format!(
                        "Super constructor '{super_class}' expected {} args, got {}",
                        sig.param_types.len(),
                        child_types.len()
                    ),
                    id,
                );
            } else {
                for (i, (arg, expected)) in
                    child_types.iter().zip(sig.param_types.iter()).enumerate()
                {
                    if let Some(arg) = arg {
                        if arg != expected {
                            let token = self.child_token(id, i).or_else(|| self.token_of(id));
                            self.error(
                                format!(
                                    "Super constructor '{super_class}' arg {} expected {expected}, got {arg}",
                                    i + 1
                                ),
                                token.as_ref(),
                            );
                        }
                    }
                }
            }
        }

        self.arena.node_mut(id).return_type = Some("void".to_string());
        Some(Some("void".to_string()))
    }

    fn check_type_method_call(
        &mut self,
        id: NodeId,
        child_types: &[Option<String>],
    ) -> Option<Option<String>> {
        let class_name = self.arena.node(id).class_name.clone();
        let method_name = self.arena.node(id).name.clone();

        let sig = class_name.as_ref().and_then(|class| {
            self.registries
                .user_methods
                .get(class)
                .and_then(|methods| methods.get(&method_name))
                .cloned()
        });
        let Some(class_name) = class_name else {
            self.error_at_node(
                format!("Unknown constructor or static method '{method_name}' for type '<unknown>'"),
                id,
            );
            return None;
        };
        let Some(sig) = sig else {
            self.error_at_node(
                format!(
                    "Unknown constructor or static method '{method_name}' for type '{class_name}'"
                ),
                id,
            );
            return None;
        };

        if sig.return_type.as_deref() != Some(class_name.as_str()) {
            self.error_at_node(
                format!("'{method_name}' is not a constructor for type '{class_name}'"),
                id,
            );
            return None;
        }

        if child_types.len() != sig.param_types.len() {
            self.error_at_node(
                format!(
                    "Constructor '{class_name}.{method_name}' expected {} args, got {}",
                    sig.param_types.len(),
                    child_types.len()
                ),
                id,
            );
        } else {
            for (i, (arg, expected)) in child_types.iter().zip(sig.param_types.iter()).enumerate() {
                if let Some(arg) = arg {
                    if arg != expected {
                        let token = self.child_token(id, i).or_else(|| self.token_of(id));
                        self.error(
                            format!(
                                "Constructor '{class_name}.{method_name}' arg {} expected {expected}, got {arg}",
                                i + 1
                            ),
                            token.as_ref(),
                        );
                    }
                }
            }
        }

        self.arena.node_mut(id).return_type = Some(class_name.clone());
        Some(Some(class_name))
    }

    fn check_constructor_call(
        &mut self,
        id: NodeId,
        child_types: &[Option<String>],
    ) -> Option<Option<String>> {
        let class_name = self.arena.node(id).name.clone();
        let Some(sig) = self
            .registries
            .user_methods
            .get(&class_name)
            .and_then(|methods| methods.get(&class_name))
            .cloned()
        else {
            self.error_at_node(format!("No constructor defined for type '{class_name}'"), id);
            return None;
        };

        if child_types.len() != sig.param_types.len() {
            self.error_at_node(
                format!(
                    "Constructor '{class_name}' expected {} args, got {}",
                    sig.param_types.len(),
                    child_types.len()
                ),
                id,
            );
        } else {
            for (i, (arg, expected)) in child_types.iter().zip(sig.param_types.iter()).enumerate() {
                if let Some(arg) = arg {
                    if arg != expected {
                        let token = self.child_token(id, i).or_else(|| self.token_of(id));
                        self.error(
                            format!(
                                "Constructor '{class_name}' arg {} expected {expected}, got {arg}",
                                i + 1
                            ),
                            token.as_ref(),
                        );
                    }
                }
            }
        }

        self.arena.node_mut(id).return_type = Some(class_name.clone());
        Some(Some(class_name))
    }

    fn check_field_access(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let object_type = child_types.first()?.clone()?;
        let field_name = self.arena.node(id).name.clone();

        if let Some(fields) = self.registries.user_classes.get(&object_type) {
            if let Some(field_type) = fields.get(&field_name).cloned() {
                self.arena.node_mut(id).return_type = Some(field_type.clone());
                return Some(field_type);
            }
            self.error_at_node(
                format!("Type '{object_type}' has no field '{field_name}'"),
                id,
            );
            return None;
        }
        self.error_at_node(format!("Field access on non-class type '{object_type}'"), id);
        None
    }

    fn check_array_access(&mut self, id: NodeId, child_types: &[Option<String>]) -> Option<String> {
        let array_type = child_types.first()?.clone()?;
        let index_type = child_types.get(1)?.clone()?;

        let result = if let Some(element) = array_type.strip_suffix("[]") {
            if is_integer_type(&index_type) {
                Some(element.to_string())
            } else {
                let token = self.child_token(id, 1).or_else(|| self.token_of(id));
                self.error(
                    format!("Array index must be an integer type, got {index_type}"),
                    token.as_ref(),
                );
                None
            }
        } else {
            let token = self.child_token(id, 0).or_else(|| self.token_of(id));
            self.error(
                format!("Cannot apply index operator [] to non-array type {array_type}"),
                token.as_ref(),
            );
            None
        };
        self.arena.node_mut(id).return_type = result.clone();
        result
    }

    fn check_condition(&mut self, id: NodeId, child_types: &[Option<String>]) {
        let Some(Some(condition_type)) = child_types.first() else {
            return;
        };
        if condition_type != "bool" {
            let name = self.arena.node(id).name.clone();
            let token = self.child_token(id, 0).or_else(|| self.token_of(id));
            self.error(
                format!(
                    "Condition for '{name}' statement must be a boolean, got {condition_type}"
                ),
                token.as_ref(),
            );
        }
    }

    /// `break`/`continue` must sit inside a `while` somewhere up the parent
    /// chain.
    fn check_loop_placement(&mut self, id: NodeId) {
        let mut current = self.arena.node(id).parent;
        while let Some(ancestor) = current {
            if self.arena.node(ancestor).kind == NodeKind::WhileStatement {
                return;
            }
            current = self.arena.node(ancestor).parent;
        }
        let name = self.arena.node(id).name.clone();
        self.error_at_node(format!("'{name}' statement not within a loop"), id);
    }
}
