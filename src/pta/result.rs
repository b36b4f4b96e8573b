// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};

use crate::graph::call_graph::CSCallGraph;
use crate::graph::pfg::PointerFlowGraph;
use crate::ir::VarId;
use crate::pta::context::ContextId;
use crate::pta::elements::{CSManager, CSObjId, Pointer, PointerId};
use crate::pta::heap::{HeapModel, ObjId};
use crate::pta::plugin::taint::{TaintFlows, TAINT_ANALYSIS_NAME};
use crate::pta::PointsTo;
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PointsToData;
use crate::util::stats::AnalysisStats;

/// Results deposited by plugins, keyed by plugin identifier.
pub struct PluginStore {
    map: HashMap<String, Box<dyn Any>>,
}

impl PluginStore {
    pub fn new() -> Self {
        PluginStore {
            map: HashMap::new(),
        }
    }

    pub fn store<T: Any>(&mut self, key: &str, value: T) {
        self.map.insert(key.to_string(), Box::new(value));
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.map.get(key).and_then(|v| v.downcast_ref())
    }
}

impl Default for PluginStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The materialized outcome of a pointer analysis: the context-sensitive
/// call graph, the points-to map under both context-sensitive and
/// collapsed views, the pointer flow graph, and plugin deliverables.
pub struct PointerAnalysisResult {
    csm: CSManager,
    heap: HeapModel,
    pt_data: PointsToData<PointerId, CSObjId>,
    pfg: PointerFlowGraph,
    call_graph: CSCallGraph,
    stats: AnalysisStats,
    store: PluginStore,
}

impl PointerAnalysisResult {
    pub(crate) fn new(
        csm: CSManager,
        heap: HeapModel,
        pt_data: PointsToData<PointerId, CSObjId>,
        pfg: PointerFlowGraph,
        call_graph: CSCallGraph,
        stats: AnalysisStats,
        store: PluginStore,
    ) -> Self {
        PointerAnalysisResult {
            csm,
            heap,
            pt_data,
            pfg,
            call_graph,
            stats,
            store,
        }
    }

    pub fn call_graph(&self) -> &CSCallGraph {
        &self.call_graph
    }

    pub fn cs_manager(&self) -> &CSManager {
        &self.csm
    }

    pub fn heap_model(&self) -> &HeapModel {
        &self.heap
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    /// The points-to set of an interned pointer.
    pub fn points_to(&self, pointer: PointerId) -> Option<&PointsTo<CSObjId>> {
        self.pt_data.pts(pointer)
    }

    /// The points-to set of a variable under a specific context.
    pub fn points_to_of_cs_var(&self, ctx: ContextId, var: VarId) -> Option<&PointsTo<CSObjId>> {
        let pointer = self.csm.find_cs_var(ctx, var)?;
        self.pt_data.pts(pointer)
    }

    /// The context-insensitive view of a variable's points-to set: the
    /// abstract objects it may designate under any context.
    pub fn objects_of_var(&self, var: VarId) -> BTreeSet<ObjId> {
        let mut objects = BTreeSet::new();
        for (pointer, kind) in self.csm.iter_pointers() {
            let Pointer::CSVar { var: v, .. } = kind else {
                continue;
            };
            if v != var {
                continue;
            }
            if let Some(pts) = self.pt_data.pts(pointer) {
                for cs_obj in pts.iter() {
                    objects.insert(self.csm.cs_obj(cs_obj).obj);
                }
            }
        }
        objects
    }

    /// A result a plugin stored under its identifier.
    pub fn get_result<T: Any>(&self, key: &str) -> Option<&T> {
        self.store.get(key)
    }

    /// The flows collected by the taint plugin, if it ran.
    pub fn taint_flows(&self) -> Option<&TaintFlows> {
        self.get_result(TAINT_ANALYSIS_NAME)
    }
}
