//! PPM context model
//!
//! Contexts form a tree rooted at the empty history. A node at depth `k`
//! holds the statistics of the symbols that followed one particular
//! `k`-symbol history; its children extend that history one symbol further
//! into the past. Nodes live in an arena and refer to their children by
//! index, and are only created once their history has actually occurred.

use tracing::trace;

use crate::error::{CodecError, Result};
use crate::frequency::{FrequencyTable, SYMBOL_LIMIT};

/// Index of a node in the model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

const ROOT: NodeId = NodeId(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextNode {
    order: usize,
    table: FrequencyTable,
    /// Indexed by the next older history symbol. Empty at the maximum order.
    children: Vec<Option<NodeId>>,
}

impl ContextNode {
    fn new(order: usize, has_children: bool) -> Self {
        Self {
            order,
            table: FrequencyTable::new(),
            children: if has_children {
                vec![None; SYMBOL_LIMIT]
            } else {
                Vec::new()
            },
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    fn child(&self, symbol: u16) -> Option<NodeId> {
        self.children.get(symbol as usize).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpmModel {
    model_order: i32,
    nodes: Vec<ContextNode>,
    order_minus1: FrequencyTable,
}

impl PpmModel {
    pub fn new(model_order: i32) -> Result<Self> {
        if model_order < -1 {
            return Err(CodecError::InvalidOrder(model_order));
        }
        Ok(Self {
            model_order,
            nodes: Vec::new(),
            order_minus1: FrequencyTable::uniform(),
        })
    }

    pub fn model_order(&self) -> i32 {
        self.model_order
    }

    /// Number of context nodes created so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &ContextNode {
        &self.nodes[id.0 as usize]
    }

    pub fn table(&self, id: NodeId) -> &FrequencyTable {
        &self.node(id).table
    }

    /// The fixed table behind every context: all 257 symbols with count one.
    pub fn order_minus1_table(&self) -> &FrequencyTable {
        &self.order_minus1
    }

    fn max_depth(&self, history: &[u16]) -> usize {
        history.len().min(self.model_order.max(0) as usize)
    }

    /// Existing contexts for `history` (most recent symbol first), longest first.
    ///
    /// The walk stops at the first history prefix that has never been seen,
    /// so the result can be shorter than the history.
    pub fn contexts_for_history(&self, history: &[u16]) -> Vec<NodeId> {
        let mut path = Vec::new();
        if self.model_order < 0 || self.nodes.is_empty() {
            return path;
        }

        let mut node = ROOT;
        path.push(node);
        for &symbol in &history[..self.max_depth(history)] {
            match self.node(node).child(symbol) {
                Some(child) => {
                    node = child;
                    path.push(node);
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Table of the context reached by following `context` exactly, if it exists.
    pub fn table_for(&self, context: &[u16]) -> Option<&FrequencyTable> {
        if self.nodes.is_empty() || context.len() > self.model_order.max(0) as usize {
            return None;
        }
        let mut node = ROOT;
        for &symbol in context {
            node = self.node(node).child(symbol)?;
        }
        Some(self.table(node))
    }

    /// Count `symbol` in every context from order 0 up to the history depth,
    /// creating the contexts that do not exist yet.
    pub fn increment_contexts(&mut self, history: &[u16], symbol: u16) -> Result<()> {
        if self.model_order < 0 {
            return Ok(());
        }
        if symbol as usize >= SYMBOL_LIMIT {
            return Err(CodecError::InvalidSymbol(symbol));
        }

        let depth = self.max_depth(history);
        let max_order = self.model_order as usize;
        if self.nodes.is_empty() {
            self.nodes.push(ContextNode::new(0, max_order > 0));
        }

        let mut node = ROOT;
        self.bump(node, symbol)?;
        for (i, &prev) in history[..depth].iter().enumerate() {
            node = self.child_or_insert(node, prev, i + 1, max_order)?;
            self.bump(node, symbol)?;
        }
        Ok(())
    }

    fn child_or_insert(
        &mut self,
        parent: NodeId,
        symbol: u16,
        order: usize,
        max_order: usize,
    ) -> Result<NodeId> {
        if symbol as usize >= SYMBOL_LIMIT {
            return Err(CodecError::InvalidSymbol(symbol));
        }
        if let Some(child) = self.node(parent).child(symbol) {
            return Ok(child);
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ContextNode::new(order, order < max_order));
        self.nodes[parent.0 as usize].children[symbol as usize] = Some(id);
        Ok(id)
    }

    fn bump(&mut self, node: NodeId, symbol: u16) -> Result<()> {
        let entry = &mut self.nodes[node.0 as usize];
        if entry.table.increment(symbol)? {
            trace!(order = entry.order, symbol, "context table rescaled");
        }
        Ok(())
    }
}
