// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexSet;
use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::Graph;

use crate::ir::CallKind;
use crate::pta::elements::{CSCallSiteId, CSMethodId};

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;
/// Context-sensitive call graph.
pub type CSCallGraph = CallGraph<CSMethodId, CSCallSiteId>;

#[derive(Debug)]
pub struct CallGraphNode<F> {
    pub func: F,
}

#[derive(Debug)]
pub struct CallGraphEdge<S> {
    pub callsite: S,
    pub kind: CallKind,
}

/// A call graph generic over the function handle `F` and call-site handle
/// `S`. Both the edge set and the reachable-method set grow monotonically.
pub struct CallGraph<F, S> {
    /// The graph structure capturing call relationships.
    graph: Graph<CallGraphNode<F>, CallGraphEdge<S>>,
    /// A map from functions to their corresponding call graph nodes.
    func_nodes: HashMap<F, CGNodeId>,
    /// A map from call sites to their outgoing call graph edges.
    callsite_edges: HashMap<S, Vec<CGEdgeId>>,
    /// Reachable methods in discovery order.
    reach_methods: IndexSet<F>,
    /// The analysis entry methods.
    entries: Vec<F>,
}

impl<F, S> CallGraph<F, S>
where
    F: Copy + Eq + Hash + Debug,
    S: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            func_nodes: HashMap::new(),
            callsite_edges: HashMap::new(),
            reach_methods: IndexSet::new(),
            entries: Vec::new(),
        }
    }

    fn get_or_insert_node(&mut self, func: F) -> CGNodeId {
        match self.func_nodes.entry(func) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => *v.insert(self.graph.add_node(CallGraphNode { func })),
        }
    }

    /// Registers an analysis entry method.
    pub fn add_entry_method(&mut self, func: F) {
        self.get_or_insert_node(func);
        self.entries.push(func);
    }

    pub fn entry_methods(&self) -> &[F] {
        &self.entries
    }

    /// Marks `func` reachable; returns true iff it was not already.
    pub fn add_reachable_method(&mut self, func: F) -> bool {
        self.get_or_insert_node(func);
        self.reach_methods.insert(func)
    }

    pub fn is_reachable(&self, func: F) -> bool {
        self.reach_methods.contains(&func)
    }

    /// Reachable methods in discovery order.
    pub fn reachable_methods(&self) -> impl Iterator<Item = F> + '_ {
        self.reach_methods.iter().copied()
    }

    pub fn num_reachable_methods(&self) -> usize {
        self.reach_methods.len()
    }

    /// Returns true if an edge to `callee` already exists for `callsite`.
    pub fn has_edge(&self, callsite: S, callee: F) -> bool {
        self.callees_of(callsite).any(|c| c == callee)
    }

    /// Adds a call edge from `caller` to `callee` at `callsite`.
    /// Returns false if the edge already existed, and true otherwise.
    pub fn add_edge(&mut self, callsite: S, kind: CallKind, caller: F, callee: F) -> bool {
        if self.has_edge(callsite, callee) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        let edge_id = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge { callsite, kind });
        self.callsite_edges.entry(callsite).or_default().push(edge_id);
        true
    }

    /// The callees of a call site, in edge-insertion order.
    pub fn callees_of(&self, callsite: S) -> impl Iterator<Item = F> + '_ {
        self.callsite_edges
            .get(&callsite)
            .into_iter()
            .flatten()
            .filter_map(|&edge_id| {
                let (_, callee_node) = self.graph.edge_endpoints(edge_id)?;
                Some(self.graph[callee_node].func)
            })
    }

    /// All edges as (callsite, kind, caller, callee), in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (S, CallKind, F, F)> + '_ {
        self.graph.edge_indices().map(|edge_id| {
            let edge = &self.graph[edge_id];
            let (caller_node, callee_node) = self.graph.edge_endpoints(edge_id).unwrap();
            (
                edge.callsite,
                edge.kind,
                self.graph[caller_node].func,
                self.graph[callee_node].func,
            )
        })
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<F, S> Default for CallGraph<F, S>
where
    F: Copy + Eq + Hash + Debug,
    S: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edge_novelty() {
        let mut cg: CallGraph<u32, u32> = CallGraph::new();
        assert!(cg.add_edge(0, CallKind::Static, 1, 2));
        assert!(!cg.add_edge(0, CallKind::Static, 1, 2));
        assert!(cg.add_edge(0, CallKind::Virtual, 1, 3));
        assert_eq!(cg.num_edges(), 2);
        assert_eq!(cg.callees_of(0).collect::<Vec<_>>(), vec![2, 3]);
        assert!(cg.callees_of(7).next().is_none());
    }

    #[test]
    fn reachable_set_is_idempotent_and_ordered() {
        let mut cg: CallGraph<u32, u32> = CallGraph::new();
        assert!(cg.add_reachable_method(5));
        assert!(cg.add_reachable_method(3));
        assert!(!cg.add_reachable_method(5));
        assert_eq!(cg.reachable_methods().collect::<Vec<_>>(), vec![5, 3]);
        assert!(cg.is_reachable(3));
        assert!(!cg.is_reachable(4));
    }

    #[test]
    fn edges_enumerate_in_insertion_order() {
        let mut cg: CallGraph<u32, u32> = CallGraph::new();
        cg.add_edge(0, CallKind::Static, 1, 2);
        cg.add_edge(1, CallKind::Virtual, 2, 3);
        let edges: Vec<_> = cg.edges().collect();
        assert_eq!(edges[0], (0, CallKind::Static, 1, 2));
        assert_eq!(edges[1], (1, CallKind::Virtual, 2, 3));
    }
}
