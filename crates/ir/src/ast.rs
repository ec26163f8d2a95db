//! Generic AST representation.
//!
//! The tree preserves the hierarchy of the converted source. Every node is
//! reachable both through its parent's `children` and through the flat
//! [`FileAst::index`], which is ordered by `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// Index of a node in the native compilation unit this tree was converted
/// from. Only meaningful together with the file the tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeRef(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    /// Incremental unique identifier of the node within the file.
    pub id: usize,
    /// Reference to the parent node, if any.
    pub parent: Option<usize>,
    /// Logical kind of the node: "MethodDeclaration", "Block", etc.
    pub kind: String,
    /// Value associated with the node (identifier, literal, etc.).
    pub value: JsonValue,
    /// Back-reference to the native node, when the converter kept one.
    #[serde(default)]
    pub native: Option<NativeRef>,
    /// Node children to preserve structural context.
    pub children: Vec<AstNode>,
    /// Location metadata.
    pub meta: Meta,
}

impl AstNode {
    /// Name carried in `value`, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.value.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAst {
    pub file_path: String,
    pub file_type: String,
    /// Root nodes of the AST.
    pub nodes: Vec<AstNode>,
    /// Flat node index ordered by `id`.
    pub index: Vec<AstNode>,
}

impl FileAst {
    pub fn new(file_path: String, file_type: String) -> Self {
        Self {
            file_path,
            file_type,
            nodes: Vec::new(),
            index: Vec::new(),
        }
    }

    pub fn push(&mut self, node: AstNode) {
        self.collect(&node);
        self.nodes.push(node);
    }

    fn collect(&mut self, node: &AstNode) {
        if node.id == self.index.len() {
            self.index.push(node.clone());
        } else if node.id < self.index.len() {
            self.index[node.id] = node.clone();
        } else {
            self.index.push(node.clone());
        }
        for child in &node.children {
            self.collect(child);
        }
    }

    /// Gets node `id` from the flat index.
    pub fn get(&self, id: usize) -> Option<&AstNode> {
        self.index.get(id)
    }

    /// Gets the parent node of `id`, if any.
    pub fn parent(&self, id: usize) -> Option<&AstNode> {
        self.index
            .get(id)
            .and_then(|n| n.parent.and_then(|p| self.index.get(p)))
    }

    /// Returns the direct children of node `id`.
    pub fn children(&self, id: usize) -> Vec<&AstNode> {
        self.index
            .get(id)
            .map(|n| {
                n.children
                    .iter()
                    .filter_map(|c| self.index.get(c.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates over the ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = &AstNode> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            let node = current?;
            current = node.parent.and_then(|p| self.index.get(p));
            Some(node)
        })
    }

    /// Finds the first node of `kind` whose value equals `name`.
    pub fn find(&self, kind: &str, name: &str) -> Option<&AstNode> {
        self.index
            .iter()
            .find(|n| n.kind == kind && n.name() == Some(name))
    }

    /// Exports the AST to DOT format.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph AST {\n");
        for node in &self.index {
            let label = match &node.value {
                JsonValue::String(s) => format!("{}:{}", node.kind, s),
                _ => node.kind.clone(),
            };
            out.push_str(&format!("    {} [label=\"{}\"];\n", node.id, label));
            for child in &node.children {
                out.push_str(&format!("    {} -> {};\n", node.id, child.id));
            }
        }
        out.push('}');
        out
    }

    /// Exports the AST to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
