//! # Transition Tree
//!
//! The Transition Tree encodes every *known-good* ordering of events as a
//! path from the root to a leaf. Each leaf names the scenario its path
//! represents.
//!
//! The tree is declared once, validated, and then only ever read. Children
//! are owned values, so a tree is finite and acyclic by construction.
//!
//! ## Example
//!
//! ```rust
//! use tracewalk_core::tree::{Node, TransitionTree};
//!
//! let tree = TransitionTree::new(Node::branch([
//!     ("load", Node::branch([("execute", Node::leaf("exec"))])),
//! ]))
//! .unwrap();
//!
//! assert_eq!(tree.paths().len(), 1);
//! ```

use crate::error::TreeError;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The terminal label of a leaf.
pub type Label = String;

/// A node of the Transition Tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// More transitions are possible from here.
    Branch(Arc<Branch>),
    /// A terminal outcome.
    Leaf(Label),
}

impl Node {
    /// Create a leaf carrying the given terminal label.
    pub fn leaf(label: impl Into<Label>) -> Self {
        Node::Leaf(label.into())
    }

    /// Create a branch from `(event name, child)` pairs.
    ///
    /// A later pair with the same event name replaces an earlier one.
    pub fn branch<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Branch(Arc::new(Branch::new(children)))
    }
}

/// A non-terminal node: event name -> child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Branch {
    children: BTreeMap<String, Node>,
}

/// Result of looking an event name up in a [`Branch`].
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Branch(&'a Arc<Branch>),
    Leaf(&'a str),
    NotFound,
}

impl Branch {
    pub(crate) fn new<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Self {
            children: children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        }
    }

    /// Look up the child reached by `event`.
    pub fn lookup(&self, event: &str) -> Lookup<'_> {
        match self.children.get(event) {
            Some(Node::Branch(child)) => Lookup::Branch(child),
            Some(Node::Leaf(label)) => Lookup::Leaf(label),
            None => Lookup::NotFound,
        }
    }

    /// Event names accepted at this branch, in sorted order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A root-to-leaf path through the tree and the label it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPath {
    pub events: Vec<String>,
    pub label: Label,
}

impl fmt::Display for KnownPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.events.join(" -> "), self.label)
    }
}

/// An immutable, validated Transition Tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTree {
    root: Arc<Branch>,
}

impl TransitionTree {
    /// Validate `root` and wrap it as a tree.
    ///
    /// The root must be a branch and no branch anywhere may be empty.
    pub fn new(root: Node) -> Result<Self, TreeError> {
        match root {
            Node::Leaf(label) => Err(TreeError::RootIsLeaf(label)),
            Node::Branch(branch) => {
                let mut path = Vec::new();
                check_branch(&branch, &mut path)?;
                Ok(Self { root: branch })
            }
        }
    }

    /// Wrap a literal tree known to satisfy the construction invariants.
    pub(crate) fn from_literal(root: Arc<Branch>) -> Self {
        Self { root }
    }

    /// Parse a tree from JSON: strings are leaves, objects are branches.
    pub fn from_json_str(src: &str) -> Result<Self, TreeError> {
        let root: Node = serde_json::from_str(src)?;
        Self::new(root)
    }

    /// Parse a tree from TOML: strings are leaves, tables are branches.
    pub fn from_toml_str(src: &str) -> Result<Self, TreeError> {
        let children: BTreeMap<String, Node> = toml::from_str(src)?;
        Self::new(Node::Branch(Arc::new(Branch { children })))
    }

    /// Load a tree file, choosing the format by extension (`.toml`, otherwise JSON).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&src),
            _ => Self::from_json_str(&src),
        }
    }

    /// The root branch; a walker's cursor starts here.
    pub fn root(&self) -> &Arc<Branch> {
        &self.root
    }

    /// Every root-to-leaf path, in sorted event order.
    pub fn paths(&self) -> Vec<KnownPath> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect_paths(&self.root, &mut prefix, &mut out);
        out
    }

    /// Every event name that appears anywhere in the tree.
    pub fn vocabulary(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut stack = vec![&self.root];
        while let Some(branch) = stack.pop() {
            for (name, child) in &branch.children {
                names.insert(name.clone());
                if let Node::Branch(child) = child {
                    stack.push(child);
                }
            }
        }
        names
    }
}

fn check_branch(branch: &Branch, path: &mut Vec<String>) -> Result<(), TreeError> {
    if branch.children.is_empty() {
        return Err(TreeError::EmptyBranch {
            path: display_path(path),
        });
    }
    for (name, child) in &branch.children {
        if let Node::Branch(child) = child {
            path.push(name.clone());
            check_branch(child, path)?;
            path.pop();
        }
    }
    Ok(())
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" -> ")
    }
}

fn collect_paths(branch: &Branch, prefix: &mut Vec<String>, out: &mut Vec<KnownPath>) {
    for (name, child) in &branch.children {
        prefix.push(name.clone());
        match child {
            Node::Leaf(label) => out.push(KnownPath {
                events: prefix.clone(),
                label: label.clone(),
            }),
            Node::Branch(child) => collect_paths(child, prefix, out),
        }
        prefix.pop();
    }
}

/// Wire shape of a node: a string is a leaf, a map is a branch.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
    Leaf(String),
    Branch(BTreeMap<String, Node>),
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawNode::deserialize(deserializer)? {
            RawNode::Leaf(label) => Node::Leaf(label),
            RawNode::Branch(children) => Node::Branch(Arc::new(Branch { children })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::branch([
            (
                "a",
                Node::branch([("b", Node::leaf("ab")), ("c", Node::leaf("ac"))]),
            ),
            ("d", Node::leaf("d")),
        ])
    }

    #[test]
    fn test_lookup_variants() {
        let tree = TransitionTree::new(sample()).unwrap();
        let root = tree.root();

        let Lookup::Branch(a) = root.lookup("a") else {
            panic!("expected branch under `a`");
        };
        assert_eq!(a.lookup("b"), Lookup::Leaf("ab"));
        assert_eq!(root.lookup("d"), Lookup::Leaf("d"));
        assert_eq!(root.lookup("zzz"), Lookup::NotFound);
        assert_eq!(a.events().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_paths_and_vocabulary() {
        let tree = TransitionTree::new(sample()).unwrap();
        let paths = tree.paths();

        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].events, vec!["a", "b"]);
        assert_eq!(paths[0].label, "ab");
        assert_eq!(paths[2].to_string(), "d => d");

        let vocab: Vec<_> = tree.vocabulary().into_iter().collect();
        assert_eq!(vocab, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_rejects_leaf_root() {
        let err = TransitionTree::new(Node::leaf("done")).unwrap_err();
        assert!(matches!(err, TreeError::RootIsLeaf(label) if label == "done"));
    }

    #[test]
    fn test_rejects_empty_branch() {
        let empty = || Node::branch(Vec::<(String, Node)>::new());

        let root = Node::branch([("a", Node::branch([("b", empty())]))]);
        let err = TransitionTree::new(root).unwrap_err();
        assert!(matches!(err, TreeError::EmptyBranch { ref path } if path == "a -> b"));

        let err = TransitionTree::new(empty()).unwrap_err();
        assert_eq!(err.to_string(), "transition tree has an empty branch at <root>");
    }

    #[test]
    fn test_json_and_toml_agree_with_literal() {
        let literal = TransitionTree::new(sample()).unwrap();

        let json = r#"{ "a": { "b": "ab", "c": "ac" }, "d": "d" }"#;
        assert_eq!(TransitionTree::from_json_str(json).unwrap(), literal);

        let toml = r#"
            d = "d"

            [a]
            b = "ab"
            c = "ac"
        "#;
        assert_eq!(TransitionTree::from_toml_str(toml).unwrap(), literal);
    }

    #[test]
    fn test_json_leaf_root_is_rejected() {
        let err = TransitionTree::from_json_str(r#""just a label""#).unwrap_err();
        assert!(matches!(err, TreeError::RootIsLeaf(_)));

        let err = TransitionTree::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, TreeError::Json(_)));
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("tree.json");
        std::fs::write(&json_path, r#"{ "x": "done" }"#).unwrap();
        let tree = TransitionTree::load(&json_path).unwrap();
        assert_eq!(tree.root().lookup("x"), Lookup::Leaf("done"));

        let toml_path = dir.path().join("tree.toml");
        std::fs::write(&toml_path, "x = \"done\"\n").unwrap();
        assert_eq!(TransitionTree::load(&toml_path).unwrap(), tree);

        let err = TransitionTree::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, TreeError::Io { .. }));
    }
}
