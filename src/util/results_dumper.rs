// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fs::File;
use std::io::{BufWriter, Write};

use itertools::Itertools;
use log::*;

use crate::ir::World;
use crate::pta::elements::{CSObjId, Pointer};
use crate::pta::heap::ObjKind;
use crate::pta::result::PointerAnalysisResult;
use crate::pts_set::points_to::PointsToSet;
use crate::util::options::AnalysisOptions;
use crate::util::Idx;

/// Writes out whatever the options ask for. Dump failures are logged and
/// never fail the analysis.
pub fn dump_results(world: &World, result: &PointerAnalysisResult, options: &AnalysisOptions) {
    if let Some(path) = &options.pts_output {
        info!("dumping points-to results to {path}");
        if let Err(e) = dump_points_to(world, result, path) {
            error!("failed to dump points-to results: {e}");
        }
    }
    if let Some(path) = &options.call_graph_output {
        info!("dumping call graph to {path}");
        if let Err(e) = dump_call_graph(world, result, path) {
            error!("failed to dump call graph: {e}");
        }
    }
    if let Some(path) = &options.taint_output {
        info!("dumping taint flows to {path}");
        if let Err(e) = dump_taint_flows(result, path) {
            error!("failed to dump taint flows: {e}");
        }
    }
    if options.dump_stats {
        info!("{}", result.stats());
    }
}

/// One line per pointer with a non-empty points-to set, in pointer-handle
/// order, which makes dumps of equal analyses byte-identical.
fn dump_points_to(
    world: &World,
    result: &PointerAnalysisResult,
    path: &str,
) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for (pointer, kind) in result.cs_manager().iter_pointers() {
        let Some(pts) = result.points_to(pointer) else {
            continue;
        };
        let objs = pts
            .iter()
            .map(|cs_obj| describe_cs_obj(world, result, cs_obj))
            .join(", ");
        writeln!(w, "{} -> {{{objs}}}", describe_pointer(world, result, kind))?;
    }
    Ok(())
}

fn dump_call_graph(
    world: &World,
    result: &PointerAnalysisResult,
    path: &str,
) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let csm = result.cs_manager();
    for (site_id, kind, caller_id, callee_id) in result.call_graph().edges() {
        let site = csm.cs_call_site(site_id);
        let caller = csm.cs_method(caller_id);
        let callee = csm.cs_method(callee_id);
        writeln!(
            w,
            "{:?}:{} --{:?}@{}--> {:?}:{}",
            caller.ctx,
            world.method_sig(caller.method),
            kind,
            site.invoke.index(),
            callee.ctx,
            world.method_sig(callee.method),
        )?;
    }
    Ok(())
}

fn dump_taint_flows(result: &PointerAnalysisResult, path: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    if let Some(flows) = result.taint_flows() {
        for flow in flows {
            writeln!(
                w,
                "TaintFlow{{source: {}, sink: {}, index: {}}}",
                flow.source_call.index(),
                flow.sink_call.index(),
                flow.index,
            )?;
        }
    }
    Ok(())
}

fn describe_pointer(world: &World, result: &PointerAnalysisResult, kind: Pointer) -> String {
    match kind {
        Pointer::CSVar { ctx, var } => {
            let v = world.var(var);
            format!("{:?}:{}/{}", ctx, world.method_sig(v.method), v.name)
        }
        Pointer::InstanceField { base, field } => format!(
            "{}.{}",
            describe_cs_obj(world, result, base),
            world.field(field).name
        ),
        Pointer::ArrayIndex { base } => {
            format!("{}[*]", describe_cs_obj(world, result, base))
        }
        Pointer::StaticField { field } => {
            let f = world.field(field);
            format!("{}.{}", world.class(f.class).name, f.name)
        }
    }
}

fn describe_cs_obj(world: &World, result: &PointerAnalysisResult, id: CSObjId) -> String {
    let cs_obj = result.cs_manager().cs_obj(id);
    let obj = result.heap_model().obj(cs_obj.obj);
    match obj.kind {
        ObjKind::Alloc { site } => format!(
            "{:?}:new {}/{}",
            cs_obj.ctx,
            world.type_name(obj.ty),
            site.index()
        ),
        ObjKind::Taint { source } => {
            format!("taint {}@{}", world.type_name(obj.ty), source.index())
        }
    }
}
