//! Count-encoded tree storage.
//!
//! A node carries no payload: everything the tree says is in how many
//! children each node has and in which order they were appended.

use core::fmt;

/// Handle of a node in a [`Ctr`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Ctr {
    nodes: Vec<Vec<NodeId>>,
}

impl Ctr {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn new_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Vec::new());
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].push(child);
    }

    /// Creates an empty node and appends it to `parent`.
    pub fn push_child(&mut self, parent: NodeId) -> NodeId {
        let child = self.new_node();
        self.append_child(parent, child);
        child
    }

    pub fn children_of(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0]
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.nodes[node.0].len()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counts the nodes reachable below `root`, excluding `root` itself.
    pub fn descendants(&self, root: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let children = self.children_of(node);
            count += children.len();
            stack.extend_from_slice(children);
        }
        count
    }
}
