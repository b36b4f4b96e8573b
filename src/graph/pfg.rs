// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::Graph;

use crate::pta::elements::PointerId;

type PFGNodeIx = NodeIndex<DefaultIx>;

/// The pointer flow graph: a directed graph over interned pointers whose
/// edges denote subset inclusion between points-to sets. Edges are only
/// ever added, never removed, and never duplicated.
pub struct PointerFlowGraph {
    graph: Graph<PointerId, ()>,
    nodes: HashMap<PointerId, PFGNodeIx>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        PointerFlowGraph {
            graph: Graph::new(),
            nodes: HashMap::new(),
        }
    }

    fn get_or_insert_node(&mut self, pointer: PointerId) -> PFGNodeIx {
        match self.nodes.entry(pointer) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => *v.insert(self.graph.add_node(pointer)),
        }
    }

    /// Adds the edge `source -> target`, returning true iff it was new.
    pub fn add_edge(&mut self, source: PointerId, target: PointerId) -> bool {
        let src = self.get_or_insert_node(source);
        let dst = self.get_or_insert_node(target);
        if self.graph.find_edge(src, dst).is_some() {
            return false;
        }
        self.graph.add_edge(src, dst, ());
        true
    }

    /// The immediate successors of `pointer`.
    pub fn succs_of(&self, pointer: PointerId) -> impl Iterator<Item = PointerId> + '_ {
        self.nodes
            .get(&pointer)
            .into_iter()
            .flat_map(move |&ix| self.graph.neighbors(ix).map(|n| self.graph[n]))
    }

    /// All edges as (source, target) pairs, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (PointerId, PointerId)> + '_ {
        self.graph.edge_indices().map(|e| {
            let (src, dst) = self.graph.edge_endpoints(e).unwrap();
            (self.graph[src], self.graph[dst])
        })
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for PointerFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::Idx;

    fn p(i: usize) -> PointerId {
        PointerId::new(i)
    }

    #[test]
    fn edges_are_deduplicated() {
        let mut pfg = PointerFlowGraph::new();
        assert!(pfg.add_edge(p(0), p(1)));
        assert!(!pfg.add_edge(p(0), p(1)));
        assert!(pfg.add_edge(p(1), p(0)));
        assert_eq!(pfg.num_edges(), 2);
    }

    #[test]
    fn successors() {
        let mut pfg = PointerFlowGraph::new();
        pfg.add_edge(p(0), p(1));
        pfg.add_edge(p(0), p(2));
        pfg.add_edge(p(1), p(2));
        let mut succs: Vec<_> = pfg.succs_of(p(0)).collect();
        succs.sort();
        assert_eq!(succs, vec![p(1), p(2)]);
        assert!(pfg.succs_of(p(2)).next().is_none());
    }
}
