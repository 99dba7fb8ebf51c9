//! Syntactic structure recorded by the parser.
//!
//! Every list read from source gets a [`SyntaxNode`] holding its span, its head
//! symbol (if any) and the node of the list that lexically encloses it. These
//! links exist for diagnostics only; scope resolution never consults them.

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

/// A list's position in the [`SyntaxTree`] that recorded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u32,
    index: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub span: SourceSpan,
    pub parent: Option<NodeId>,
    pub head: Option<String>,
}

#[derive(Debug)]
pub struct SyntaxTree {
    id: u32,
    nodes: Vec<SyntaxNode>,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::with_id(0)
    }

    /// A tree whose node ids are told apart from those of trees with another `id`.
    pub fn with_id(id: u32) -> Self {
        Self {
            id,
            nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn push(
        &mut self,
        span: SourceSpan,
        parent: Option<NodeId>,
    ) -> Result<NodeId, Diagnostic> {
        let index = u32::try_from(self.nodes.len()).map_err(|_| {
            Diagnostic::new(DiagnosticKind::Parse, "too many lists in one program").with_span(span)
        })?;
        self.nodes.push(SyntaxNode {
            span,
            parent,
            head: None,
        });
        Ok(NodeId {
            tree: self.id,
            index,
        })
    }

    /// Looks up a node; ids recorded by a different tree are not found.
    pub fn get(&self, id: NodeId) -> Option<&SyntaxNode> {
        if id.tree != self.id {
            return None;
        }
        self.nodes.get(id.index())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub(crate) fn close(&mut self, id: NodeId, end: usize, head: Option<String>) {
        if id.tree != self.id {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.span.end = end;
            node.head = head;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Describes `id` and each enclosing list, innermost first, stopping before the program root.
    pub fn traceback(&self, id: NodeId) -> Vec<String> {
        let mut notes = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.get(current) else {
                break;
            };
            if node.parent.is_none() {
                break;
            }
            let head = node.head.as_deref().unwrap_or("...");
            notes.push(format!("within ({head} ...) at {}", node.span));
            cursor = node.parent;
        }
        notes
    }
}
