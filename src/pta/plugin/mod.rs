// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Solver plugins.
//!
//! A plugin participates in the fixpoint through two hooks: call
//! resolution and points-to growth of a variable, plus a finish hook for
//! materializing its deliverables. Hooks receive borrow-bundles over the
//! solver's parts rather than the solver itself, so a plugin can enqueue
//! worklist entries while the solver drives the loop.

use std::collections::HashSet;

use crate::graph::call_graph::CSCallGraph;
use crate::ir::{MethodId, StmtId, VarId, World};
use crate::pta::context::ContextId;
use crate::pta::elements::{CSManager, CSObjId, PointerId};
use crate::pta::heap::HeapModel;
use crate::pta::result::PluginStore;
use crate::pta::worklist::WorkList;
use crate::pta::PointsTo;
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PointsToData;

pub mod config;
pub mod taint;

/// The solver state a plugin may consult and extend during the fixpoint.
pub struct PluginContext<'a> {
    pub world: &'a World,
    pub csm: &'a mut CSManager,
    pub heap: &'a mut HeapModel,
    pub pt_data: &'a PointsToData<PointerId, CSObjId>,
    pub reachable_stmts: &'a HashSet<StmtId>,
    pub empty_ctx: ContextId,
    work_list: &'a mut WorkList,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(
        world: &'a World,
        csm: &'a mut CSManager,
        heap: &'a mut HeapModel,
        pt_data: &'a PointsToData<PointerId, CSObjId>,
        reachable_stmts: &'a HashSet<StmtId>,
        empty_ctx: ContextId,
        work_list: &'a mut WorkList,
    ) -> Self {
        PluginContext {
            world,
            csm,
            heap,
            pt_data,
            reachable_stmts,
            empty_ctx,
            work_list,
        }
    }

    /// Enqueues a growth obligation; empty sets are dropped.
    pub fn add_to_work_list(&mut self, pointer: PointerId, pts: PointsTo<CSObjId>) {
        if !pts.is_empty() {
            self.work_list.add_entry(pointer, pts);
        }
    }
}

/// The read-only state a plugin sees when the fixpoint has been reached.
pub struct FinishContext<'a> {
    pub world: &'a World,
    pub csm: &'a CSManager,
    pub heap: &'a HeapModel,
    pub call_graph: &'a CSCallGraph,
    pub pt_data: &'a PointsToData<PointerId, CSObjId>,
    pub store: &'a mut PluginStore,
}

pub trait Plugin {
    /// The identifier under which this plugin stores its results.
    fn name(&self) -> &'static str;

    /// Called whenever the solver resolves a call: `invoke` under
    /// `caller_ctx` dispatches to `callee`. For instance calls, `recv` is
    /// the receiver pointer; it is `None` for static calls. The hook fires
    /// once per discovered (call site, receiver object) resolution, which
    /// may revisit the same call-graph edge.
    fn on_call_resolved(
        &mut self,
        _cx: &mut PluginContext<'_>,
        _caller_ctx: ContextId,
        _invoke: StmtId,
        _recv: Option<PointerId>,
        _callee: MethodId,
    ) {
    }

    /// Called when the points-to set of `var` under `ctx` grows by `delta`.
    fn on_points_to_grew(
        &mut self,
        _cx: &mut PluginContext<'_>,
        _ctx: ContextId,
        _var: VarId,
        _delta: &PointsTo<CSObjId>,
    ) {
    }

    /// Called once after the fixpoint is reached.
    fn on_finish(&mut self, _cx: &mut FinishContext<'_>) {}
}
