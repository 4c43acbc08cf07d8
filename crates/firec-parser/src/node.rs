//! The annotated syntax tree, stored as an arena of nodes.
//!
//! Nodes reference each other by `NodeId`; `parent` back-references are set
//! when a child is appended. Passes after parsing (identifier resolution,
//! type check, drop insertion, ownership analysis) mutate node attributes in
//! place through the arena.

use firec_common::ValueCategory;
use firec_lexer::Token;
use rustc_hash::FxHashMap;

/// Handle to a node inside a `NodeArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Scope,
    VariableDeclaration,
    VariableAssignment,
    CompoundAssignment,
    Assignment,
    BinaryExpression,
    UnaryExpression,
    EqualityExpression,
    RelationalExpression,
    CastExpression,
    Literal,
    Identifier,
    FunctionDefinition,
    FunctionCall,
    Parameter,
    ReturnStatement,
    IfStatement,
    WhileStatement,
    BreakStatement,
    ContinueStatement,
    ArrayLiteral,
    ArrayAccess,
    MethodCall,
    TypeMethodCall,
    ConstructorCall,
    SuperCall,
    FieldAccess,
    ClassDefinition,
    ClassField,
    ClassMethodDefinition,
    ImportStatement,
    Directive,
}

/// Which grammatical shape an import statement used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportKind {
    Module,
    Symbols,
    Wildcard,
    External,
}

/// One imported symbol, optionally renamed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSymbol {
    pub name: String,
    pub alias: Option<String>,
}

/// Metadata attached to `ImportStatement` nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportData {
    pub module_path: String,
    pub kind: ImportKind,
    pub alias: Option<String>,
    pub symbols: Vec<ImportSymbol>,
}

/// A syntax tree node: a discriminated kind plus the optional attributes
/// populated incrementally by the parser and later passes.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Identifier / operator text / literal text.
    pub name: String,
    /// Origin token for diagnostics (synthetic nodes have none).
    pub token: Option<Token>,
    /// Byte offset into the source, for diagnostics.
    pub index: u32,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,

    /// Canonical base type (`int32`, a class name, a generic parameter name).
    pub var_type: Option<String>,
    /// Fixed-size array flag on the base type.
    pub is_array: bool,
    pub is_nullable: bool,
    pub is_const: bool,
    /// Expression / call result type in display form (`int32`, `string[]`).
    pub return_type: Option<String>,
    /// Heap-backed runtime value marker.
    pub is_ref_counted: bool,
    pub value_category: Option<ValueCategory>,

    // Generic-definition / generic-call metadata
    pub type_params: Vec<String>,
    pub type_constraints: FxHashMap<String, String>,
    pub type_args: Vec<String>,

    // Class-member metadata
    pub class_name: Option<String>,
    pub base_class: Option<String>,
    pub is_constructor: bool,
    pub is_borrowed: bool,
    pub is_receiver: bool,

    // Import metadata
    pub import: Option<ImportData>,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind, token: Option<Token>, name: impl Into<String>, index: u32) -> Self {
        Self {
            kind,
            name: name.into(),
            token,
            index,
            children: Vec::new(),
            parent: None,
            var_type: None,
            is_array: false,
            is_nullable: false,
            is_const: false,
            return_type: None,
            is_ref_counted: false,
            value_category: None,
            type_params: Vec::new(),
            type_constraints: FxHashMap::default(),
            type_args: Vec::new(),
            class_name: None,
            base_class: None,
            is_constructor: false,
            is_borrowed: false,
            is_receiver: false,
            import: None,
        }
    }
}

/// Arena owning every node of one tree.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Append `child` to `parent` and set the back-reference.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` at `position` among `parent`'s children.
    pub fn insert_child(&mut self, parent: NodeId, position: usize, child: NodeId) {
        self.nodes[parent.index()].children.insert(position, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Replace `parent`'s children wholesale, rewiring back-references.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children = children;
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.index()].children.clone()
    }

    /// Deep-copy a subtree, rewiring parent ids inside the copy. The copy's
    /// root has no parent until it is appended somewhere.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut copy = self.nodes[id.index()].clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        let new_id = self.alloc(copy);
        for child in children {
            let new_child = self.deep_copy(child);
            self.add_child(new_id, new_child);
        }
        new_id
    }

    /// Render a subtree for debugging and structural comparison.
    #[must_use]
    pub fn tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render(id, "", true, &mut out);
        out
    }

    fn render(&self, id: NodeId, prefix: &str, is_last: bool, out: &mut String) {
        let node = self.node(id);
        let mut line = format!("{:?}", node.kind);
        if node.kind == NodeKind::VariableDeclaration {
            if node.is_nullable {
                line.push_str(" nullable");
            }
            if node.is_const {
                line.push_str(" const");
            }
            if let Some(ty) = &node.var_type {
                line.push(' ');
                line.push_str(ty);
                if node.is_array {
                    line.push_str("[]");
                }
            }
        }
        if !node.name.is_empty() {
            line.push(' ');
            line.push_str(&node.name);
        }

        if prefix.is_empty() {
            out.push_str(&line);
        } else {
            out.push_str(prefix);
            out.push_str(if is_last { "└── " } else { "├── " });
            out.push_str(&line);
        }
        out.push('\n');

        let new_prefix = if prefix.is_empty() {
            " ".to_string()
        } else {
            format!("{prefix}{}", if is_last { "    " } else { "│   " })
        };
        let count = node.children.len();
        for (i, &child) in node.children.iter().enumerate() {
            self.render(child, &new_prefix, i + 1 == count, out);
        }
    }
}
