// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The fixpoint solver: an inclusion-based, whole-program points-to
//! analysis with on-the-fly call graph construction.
//!
//! Reachability discovery seeds pointer-flow edges and allocation deltas;
//! the worklist loop then propagates points-to growth, materializes field
//! and array edges against newly seen base objects, resolves instance
//! calls against newly seen receiver objects, and lets plugins ride the
//! same fixpoint.

use std::collections::HashSet;
use std::mem;
use std::time::Instant;

use log::*;

use crate::graph::call_graph::CSCallGraph;
use crate::graph::pfg::PointerFlowGraph;
use crate::ir::{MethodId, StmtId, StmtKind, VarId, World};
use crate::pta::context::ContextId;
use crate::pta::elements::{CSManager, CSMethodId, CSObjId, Pointer, PointerId};
use crate::pta::heap::HeapModel;
use crate::pta::plugin::{FinishContext, Plugin, PluginContext};
use crate::pta::result::{PluginStore, PointerAnalysisResult};
use crate::pta::selector::ContextSelector;
use crate::pta::worklist::WorkList;
use crate::pta::PointsTo;
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PointsToData;
use crate::util::stats::AnalysisStats;

pub struct Solver<'w> {
    world: &'w World,
    entry: MethodId,
    selector: Box<dyn ContextSelector>,
    empty_ctx: ContextId,

    csm: CSManager,
    heap: HeapModel,
    pfg: PointerFlowGraph,
    call_graph: CSCallGraph,
    work_list: WorkList,
    pt_data: PointsToData<PointerId, CSObjId>,
    reachable_stmts: HashSet<StmtId>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl<'w> Solver<'w> {
    pub fn new(world: &'w World, entry: MethodId, mut selector: Box<dyn ContextSelector>) -> Self {
        let empty_ctx = selector.empty_context();
        Solver {
            world,
            entry,
            selector,
            empty_ctx,
            csm: CSManager::new(),
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CSCallGraph::new(),
            work_list: WorkList::new(),
            pt_data: PointsToData::new(),
            reachable_stmts: HashSet::new(),
            plugins: Vec::new(),
        }
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Runs the analysis to its fixpoint and returns the result.
    pub fn solve(mut self) -> PointerAnalysisResult {
        let start = Instant::now();
        self.initialize();
        self.analyze();
        self.finish(start)
    }

    /// Seeds the entry method under the empty context.
    fn initialize(&mut self) {
        let entry = self.csm.get_cs_method(self.empty_ctx, self.entry);
        info!("entry method: {}", self.world.method_sig(self.entry));
        self.call_graph.add_entry_method(entry);
        self.add_reachable(entry);
    }

    /// Processes a newly reachable context-sensitive method: records its
    /// statements and emits their immediate effects. Idempotent.
    fn add_reachable(&mut self, cs_method: CSMethodId) {
        if !self.call_graph.add_reachable_method(cs_method) {
            return;
        }
        let cs = self.csm.cs_method(cs_method);
        let ctx = cs.ctx;
        debug!(
            "reachable: {} under {:?}",
            self.world.method_sig(cs.method),
            ctx
        );

        let method = self.world.method(cs.method);
        for &stmt_id in &method.stmts {
            self.reachable_stmts.insert(stmt_id);
        }
        for &stmt_id in &method.stmts {
            let stmt = self.world.stmt(stmt_id);
            match &stmt.kind {
                StmtKind::New { lhs, ty } => {
                    let obj = self.heap.get_obj(stmt_id, *ty);
                    let heap_ctx = self.selector.select_heap_context(cs, obj);
                    let cs_obj = self.csm.get_cs_obj(heap_ctx, obj);
                    let lhs_ptr = self.csm.get_cs_var(ctx, *lhs);
                    self.work_list.add_entry(lhs_ptr, PointsTo::singleton(cs_obj));
                }
                StmtKind::Copy { lhs, rhs } => {
                    let src = self.csm.get_cs_var(ctx, *rhs);
                    let dst = self.csm.get_cs_var(ctx, *lhs);
                    self.add_pfg_edge(src, dst);
                }
                StmtKind::LoadField {
                    lhs,
                    base: None,
                    field,
                } => {
                    let src = self.csm.get_static_field(*field);
                    let dst = self.csm.get_cs_var(ctx, *lhs);
                    self.add_pfg_edge(src, dst);
                }
                StmtKind::StoreField {
                    base: None,
                    field,
                    rhs,
                } => {
                    let src = self.csm.get_cs_var(ctx, *rhs);
                    let dst = self.csm.get_static_field(*field);
                    self.add_pfg_edge(src, dst);
                }
                StmtKind::Invoke(invoke) if invoke.base.is_none() => {
                    self.process_call_impl(ctx, stmt_id, None);
                }
                // Instance field/array accesses and instance calls are
                // deferred until the base variable's points-to set grows.
                _ => {}
            }
        }
    }

    /// Adds the PFG edge `source -> target` and replays the source's
    /// points-to set over the new edge.
    fn add_pfg_edge(&mut self, source: PointerId, target: PointerId) {
        if self.pfg.add_edge(source, target) {
            if let Some(pts) = self.pt_data.pts(source) {
                let pts = pts.clone();
                self.work_list.add_entry(target, pts);
            }
        }
    }

    /// Drains the worklist to the fixpoint.
    fn analyze(&mut self) {
        while let Some((pointer, pts)) = self.work_list.poll() {
            let delta = self.propagate(pointer, &pts);
            if delta.is_empty() {
                continue;
            }
            let Pointer::CSVar { ctx, var } = self.csm.pointer(pointer) else {
                continue;
            };
            let var_info = self.world.var(var);
            for cs_obj in delta.iter() {
                for &stmt_id in var_info.store_fields() {
                    if !self.reachable_stmts.contains(&stmt_id) {
                        continue;
                    }
                    let &StmtKind::StoreField { field, rhs, .. } = &self.world.stmt(stmt_id).kind
                    else {
                        continue;
                    };
                    let src = self.csm.get_cs_var(ctx, rhs);
                    let dst = self.csm.get_instance_field(cs_obj, field);
                    self.add_pfg_edge(src, dst);
                }
                for &stmt_id in var_info.load_fields() {
                    if !self.reachable_stmts.contains(&stmt_id) {
                        continue;
                    }
                    let &StmtKind::LoadField { lhs, field, .. } = &self.world.stmt(stmt_id).kind
                    else {
                        continue;
                    };
                    let src = self.csm.get_instance_field(cs_obj, field);
                    let dst = self.csm.get_cs_var(ctx, lhs);
                    self.add_pfg_edge(src, dst);
                }
                for &stmt_id in var_info.store_arrays() {
                    if !self.reachable_stmts.contains(&stmt_id) {
                        continue;
                    }
                    let &StmtKind::StoreArray { rhs, .. } = &self.world.stmt(stmt_id).kind else {
                        continue;
                    };
                    let src = self.csm.get_cs_var(ctx, rhs);
                    let dst = self.csm.get_array_index(cs_obj);
                    self.add_pfg_edge(src, dst);
                }
                for &stmt_id in var_info.load_arrays() {
                    if !self.reachable_stmts.contains(&stmt_id) {
                        continue;
                    }
                    let &StmtKind::LoadArray { lhs, .. } = &self.world.stmt(stmt_id).kind else {
                        continue;
                    };
                    let src = self.csm.get_array_index(cs_obj);
                    let dst = self.csm.get_cs_var(ctx, lhs);
                    self.add_pfg_edge(src, dst);
                }
                for &invoke in var_info.invokes() {
                    self.process_call_impl(ctx, invoke, Some((pointer, cs_obj)));
                }
            }
            self.run_points_to_grew_hooks(ctx, var, &delta);
        }
    }

    /// Computes the true growth of `pointer` by `pts`, applies it, and
    /// forwards it to the PFG successors.
    fn propagate(&mut self, pointer: PointerId, pts: &PointsTo<CSObjId>) -> PointsTo<CSObjId> {
        let mut delta = PointsTo::new();
        for cs_obj in pts.iter() {
            if !self.pt_data.contains(pointer, cs_obj) {
                delta.insert(cs_obj);
            }
        }
        if !delta.is_empty() {
            self.pt_data.union_to(pointer, &delta);
            let succs: Vec<PointerId> = self.pfg.succs_of(pointer).collect();
            for succ in succs {
                self.work_list.add_entry(succ, delta.clone());
            }
        }
        delta
    }

    /// Resolves one call discovery: `invoke` under `caller_ctx`, with the
    /// receiver pointer and newly seen receiver object for instance calls.
    fn process_call_impl(
        &mut self,
        caller_ctx: ContextId,
        invoke_id: StmtId,
        recv: Option<(PointerId, CSObjId)>,
    ) {
        if !self.reachable_stmts.contains(&invoke_id) {
            return;
        }
        let invoke = self.world.invoke(invoke_id);
        let recv_ty = recv.map(|(_, cs_obj)| {
            let obj = self.csm.cs_obj(cs_obj).obj;
            self.heap.obj(obj).ty
        });
        let Some(callee) = self.world.resolve_invoke(invoke, recv_ty) else {
            debug!("unresolved callee at {:?}", invoke_id);
            return;
        };
        if self.world.method(callee).is_abstract {
            return;
        }

        let cs_site_id = self.csm.get_cs_call_site(caller_ctx, invoke_id);
        let site = self.csm.cs_call_site(cs_site_id);
        let callee_ctx = match recv {
            Some((_, cs_obj)) => {
                let recv_obj = self.csm.cs_obj(cs_obj);
                self.selector
                    .select_instance_context(site, recv_obj, recv_ty.unwrap(), callee)
            }
            None => self.selector.select_static_context(site, callee),
        };

        self.run_call_resolved_hooks(caller_ctx, invoke_id, recv.map(|(p, _)| p), callee);

        if let Some((_, cs_obj)) = recv {
            if let Some(this_var) = self.world.method(callee).this_var {
                let this_ptr = self.csm.get_cs_var(callee_ctx, this_var);
                self.work_list
                    .add_entry(this_ptr, PointsTo::singleton(cs_obj));
            }
        }

        let caller = self.world.stmt(invoke_id).method;
        let caller_cs = self.csm.get_cs_method(caller_ctx, caller);
        let callee_cs = self.csm.get_cs_method(callee_ctx, callee);
        if self
            .call_graph
            .add_edge(cs_site_id, invoke.kind, caller_cs, callee_cs)
        {
            self.add_reachable(callee_cs);
            let callee_info = self.world.method(callee);
            for (&arg, &param) in invoke.args.iter().zip(callee_info.params.iter()) {
                let src = self.csm.get_cs_var(caller_ctx, arg);
                let dst = self.csm.get_cs_var(callee_ctx, param);
                self.add_pfg_edge(src, dst);
            }
            if let Some(result) = invoke.result {
                for &ret in &callee_info.return_vars {
                    let src = self.csm.get_cs_var(callee_ctx, ret);
                    let dst = self.csm.get_cs_var(caller_ctx, result);
                    self.add_pfg_edge(src, dst);
                }
            }
        }
    }

    fn run_call_resolved_hooks(
        &mut self,
        caller_ctx: ContextId,
        invoke: StmtId,
        recv: Option<PointerId>,
        callee: MethodId,
    ) {
        if self.plugins.is_empty() {
            return;
        }
        let mut plugins = mem::take(&mut self.plugins);
        let mut cx = PluginContext::new(
            self.world,
            &mut self.csm,
            &mut self.heap,
            &self.pt_data,
            &self.reachable_stmts,
            self.empty_ctx,
            &mut self.work_list,
        );
        for plugin in &mut plugins {
            plugin.on_call_resolved(&mut cx, caller_ctx, invoke, recv, callee);
        }
        self.plugins = plugins;
    }

    fn run_points_to_grew_hooks(&mut self, ctx: ContextId, var: VarId, delta: &PointsTo<CSObjId>) {
        if self.plugins.is_empty() {
            return;
        }
        let mut plugins = mem::take(&mut self.plugins);
        let mut cx = PluginContext::new(
            self.world,
            &mut self.csm,
            &mut self.heap,
            &self.pt_data,
            &self.reachable_stmts,
            self.empty_ctx,
            &mut self.work_list,
        );
        for plugin in &mut plugins {
            plugin.on_points_to_grew(&mut cx, ctx, var, delta);
        }
        self.plugins = plugins;
    }

    /// Runs the finish hooks and assembles the result.
    fn finish(mut self, start: Instant) -> PointerAnalysisResult {
        let mut store = PluginStore::new();
        let mut plugins = mem::take(&mut self.plugins);
        {
            let mut cx = FinishContext {
                world: self.world,
                csm: &self.csm,
                heap: &self.heap,
                call_graph: &self.call_graph,
                pt_data: &self.pt_data,
                store: &mut store,
            };
            for plugin in &mut plugins {
                plugin.on_finish(&mut cx);
            }
        }

        let stats = AnalysisStats {
            reachable_methods: self.call_graph.num_reachable_methods(),
            call_graph_edges: self.call_graph.num_edges(),
            pointers: self.csm.num_pointers(),
            objects: self.heap.num_objs(),
            taint_objects: self.heap.num_taint_objs(),
            pfg_edges: self.pfg.num_edges(),
            pts_entries: self.pt_data.total_entries(),
            elapsed: start.elapsed(),
        };
        info!("{stats}");

        PointerAnalysisResult::new(
            self.csm,
            self.heap,
            self.pt_data,
            self.pfg,
            self.call_graph,
            stats,
            store,
        )
    }
}
