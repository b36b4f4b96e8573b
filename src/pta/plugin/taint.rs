// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The taint-tracking plugin.
//!
//! Sources inject taint objects into call results, transfers re-emit
//! existing taints at other call-site positions, and sinks are matched
//! against the final call graph. Taint objects live under the empty
//! context and remember their originating source call across arbitrarily
//! many transfers.

use std::collections::BTreeSet;

use log::*;

use crate::ir::{MethodId, StmtId, TypeId, VarId};
use crate::pta::context::ContextId;
use crate::pta::elements::{CSObjId, PointerId};
use crate::pta::plugin::config::{TaintConfig, TransferPoint};
use crate::pta::plugin::{FinishContext, Plugin, PluginContext};
use crate::pta::PointsTo;
use crate::pts_set::points_to::PointsToSet;

/// The plugin identifier, and the key of its stored result.
pub const TAINT_ANALYSIS_NAME: &str = "taint-analysis";

/// A detected flow from a source call into a sink argument.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaintFlow {
    pub source_call: StmtId,
    pub sink_call: StmtId,
    pub index: usize,
}

/// The totally ordered set of detected flows.
pub type TaintFlows = BTreeSet<TaintFlow>;

pub struct TaintAnalysis {
    config: TaintConfig,
}

impl TaintAnalysis {
    pub fn new(config: TaintConfig) -> Self {
        TaintAnalysis { config }
    }

    /// Re-emits every taint object in `pts(from)` at `target`, retyped to
    /// `ty` but keeping the original source call.
    fn retype_taints(
        &self,
        cx: &mut PluginContext<'_>,
        from: PointerId,
        target: PointerId,
        ty: TypeId,
    ) {
        let Some(pts) = cx.pt_data.pts(from) else {
            return;
        };
        let mut taints = PointsTo::new();
        for cs_obj in pts.iter() {
            let obj = cx.csm.cs_obj(cs_obj).obj;
            if let Some(source) = cx.heap.taint_source(obj) {
                let retyped = cx.heap.get_taint_obj(source, ty);
                taints.insert(cx.csm.get_cs_obj(cx.empty_ctx, retyped));
            }
        }
        cx.add_to_work_list(target, taints);
    }

    fn apply_transfers(
        &self,
        cx: &mut PluginContext<'_>,
        ctx: ContextId,
        invoke: StmtId,
        recv: Option<PointerId>,
        callee: MethodId,
    ) {
        let transfers = self.config.transfers_of(callee);
        if transfers.is_empty() {
            return;
        }
        let inv = cx.world.invoke(invoke);
        for transfer in transfers {
            match (transfer.from, transfer.to) {
                (TransferPoint::Base, TransferPoint::Result) => {
                    if let (Some(recv_ptr), Some(result)) = (recv, inv.result) {
                        let target = cx.csm.get_cs_var(ctx, result);
                        self.retype_taints(cx, recv_ptr, target, transfer.ty);
                    }
                }
                (TransferPoint::Arg(i), TransferPoint::Base) => {
                    if let (Some(recv_ptr), Some(&arg)) = (recv, inv.args.get(i)) {
                        let from = cx.csm.get_cs_var(ctx, arg);
                        self.retype_taints(cx, from, recv_ptr, transfer.ty);
                    }
                }
                (TransferPoint::Arg(i), TransferPoint::Result) => {
                    if let (Some(result), Some(&arg)) = (inv.result, inv.args.get(i)) {
                        let from = cx.csm.get_cs_var(ctx, arg);
                        let target = cx.csm.get_cs_var(ctx, result);
                        self.retype_taints(cx, from, target, transfer.ty);
                    }
                }
                // Combinations the rule language does not define.
                _ => {}
            }
        }
    }
}

impl Plugin for TaintAnalysis {
    fn name(&self) -> &'static str {
        TAINT_ANALYSIS_NAME
    }

    fn on_call_resolved(
        &mut self,
        cx: &mut PluginContext<'_>,
        caller_ctx: ContextId,
        invoke: StmtId,
        recv: Option<PointerId>,
        callee: MethodId,
    ) {
        let inv = cx.world.invoke(invoke);
        if let Some(result) = inv.result {
            for &ty in self.config.sources_of(callee) {
                let obj = cx.heap.get_taint_obj(invoke, ty);
                let cs_obj = cx.csm.get_cs_obj(cx.empty_ctx, obj);
                let target = cx.csm.get_cs_var(caller_ctx, result);
                debug!("taint source at {invoke:?} flows into {target:?}");
                cx.add_to_work_list(target, PointsTo::singleton(cs_obj));
            }
        }
        self.apply_transfers(cx, caller_ctx, invoke, recv, callee);
    }

    fn on_points_to_grew(
        &mut self,
        cx: &mut PluginContext<'_>,
        ctx: ContextId,
        var: VarId,
        delta: &PointsTo<CSObjId>,
    ) {
        let grew_taint = delta
            .iter()
            .any(|cs_obj| cx.heap.is_taint(cx.csm.cs_obj(cs_obj).obj));
        if !grew_taint {
            return;
        }
        // The variable now carries taint; replay the transfer rules of
        // every reachable call that takes it as an argument.
        let arg_invokes = cx.world.var(var).arg_invokes();
        for &invoke in arg_invokes {
            if !cx.reachable_stmts.contains(&invoke) {
                continue;
            }
            let inv = cx.world.invoke(invoke);
            // Transfer rules name the statically written callee.
            let Some(callee) = cx.world.dispatch(None, &inv.method_ref) else {
                continue;
            };
            let recv = inv.base.map(|base| cx.csm.get_cs_var(ctx, base));
            self.apply_transfers(cx, ctx, invoke, recv, callee);
        }
    }

    fn on_finish(&mut self, cx: &mut FinishContext<'_>) {
        let mut flows = TaintFlows::new();
        for (callsite_id, _kind, _caller, callee_id) in cx.call_graph.edges() {
            let site = cx.csm.cs_call_site(callsite_id);
            let callee = cx.csm.cs_method(callee_id).method;
            let sinks = self.config.sinks_of(callee);
            if sinks.is_empty() {
                continue;
            }
            let inv = cx.world.invoke(site.invoke);
            for &index in sinks {
                let Some(&arg) = inv.args.get(index) else {
                    continue;
                };
                let Some(pointer) = cx.csm.find_cs_var(site.ctx, arg) else {
                    continue;
                };
                let Some(pts) = cx.pt_data.pts(pointer) else {
                    continue;
                };
                for cs_obj in pts.iter() {
                    let obj = cx.csm.cs_obj(cs_obj).obj;
                    if let Some(source_call) = cx.heap.taint_source(obj) {
                        flows.insert(TaintFlow {
                            source_call,
                            sink_call: site.invoke,
                            index,
                        });
                    }
                }
            }
        }
        info!("collected {} taint flows", flows.len());
        cx.store.store(self.name(), flows);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::Idx;

    #[test]
    fn flows_order_by_source_then_sink_then_index() {
        let flow = |s, k, i| TaintFlow {
            source_call: StmtId::new(s),
            sink_call: StmtId::new(k),
            index: i,
        };
        let mut flows = TaintFlows::new();
        flows.insert(flow(2, 0, 0));
        flows.insert(flow(1, 5, 1));
        flows.insert(flow(1, 5, 0));
        flows.insert(flow(1, 3, 2));
        let collected: Vec<_> = flows.into_iter().collect();
        assert_eq!(
            collected,
            vec![flow(1, 3, 2), flow(1, 5, 0), flow(1, 5, 1), flow(2, 0, 0)]
        );
    }
}
