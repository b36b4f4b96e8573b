// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! End-to-end pointer analysis scenarios over schematic programs.

use std::collections::BTreeSet;

use tapir::ir::builder::MethodBuilder;
use tapir::ir::{MethodRef, World};
use tapir::pta::elements::Pointer;
use tapir::pta::result::PointerAnalysisResult;
use tapir::pta::selector::{ContextInsensitive, ContextSelector, KCallSiteSensitive};
use tapir::pta::solver::Solver;
use tapir::pts_set::points_to::PointsToSet;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn analyze(world: &World, selector: Box<dyn ContextSelector>) -> PointerAnalysisResult {
    init_logger();
    let entry = world.entry_point().expect("world has an entry");
    Solver::new(world, entry, selector).solve()
}

/// S1 — basic allocation and copy: `A x = new A(); A y = x;`
#[test]
fn allocation_and_copy() {
    let mut w = World::new();
    let a = w.add_class("A", None);
    let a_ty = w.class_type(a);
    let main_cls = w.add_class("Main", None);

    let mut b = MethodBuilder::static_method(&mut w, main_cls, "main");
    let x = b.var("x", a_ty);
    let y = b.var("y", a_ty);
    let site = b.new_obj(x, a_ty);
    b.copy(y, x);
    let main = b.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));

    let pts_x = result.objects_of_var(x);
    let pts_y = result.objects_of_var(y);
    assert_eq!(pts_x.len(), 1);
    assert_eq!(pts_x, pts_y);
    let obj = *pts_x.iter().next().unwrap();
    assert_eq!(
        result.heap_model().obj(obj).kind,
        tapir::pta::heap::ObjKind::Alloc { site }
    );
}

/// S2 — virtual dispatch discovers only the overriding callee.
#[test]
fn virtual_dispatch_discovers_override() {
    let mut w = World::new();
    let a = w.add_class("A", None);
    let b_cls = w.add_class("B", Some(a));
    let a_ty = w.class_type(a);
    let b_ty = w.class_type(b_cls);
    let main_cls = w.add_class("Main", None);

    let a_m = MethodBuilder::instance(&mut w, a, "m").finish();
    let b_m = MethodBuilder::instance(&mut w, b_cls, "m").finish();

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let recv = mb.var("a", a_ty);
    mb.new_obj(recv, b_ty);
    let call = mb.invoke_virtual(None, recv, MethodRef::new(a, "m"), vec![]);
    let main = mb.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));

    let csm = result.cs_manager();
    let reachable: BTreeSet<_> = result
        .call_graph()
        .reachable_methods()
        .map(|cs| csm.cs_method(cs).method)
        .collect();
    assert!(reachable.contains(&b_m));
    assert!(!reachable.contains(&a_m));

    let callees: Vec<_> = result
        .call_graph()
        .edges()
        .filter(|(site, ..)| csm.cs_call_site(*site).invoke == call)
        .map(|(.., callee)| csm.cs_method(callee).method)
        .collect();
    assert_eq!(callees, vec![b_m]);
}

/// S3 — a 2-call-site selector distinguishes two `id(p)` call sites.
#[test]
fn call_site_contexts_distinguish_arguments() {
    let mut w = World::new();
    let a = w.add_class("A", None);
    let a_ty = w.class_type(a);
    let main_cls = w.add_class("Main", None);

    let mut ib = MethodBuilder::static_method(&mut w, main_cls, "id");
    let p = ib.param("p", a_ty);
    ib.ret(Some(p));
    ib.finish();

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let o1 = mb.var("o1", a_ty);
    let o2 = mb.var("o2", a_ty);
    let r1 = mb.var("r1", a_ty);
    let r2 = mb.var("r2", a_ty);
    mb.new_obj(o1, a_ty);
    mb.new_obj(o2, a_ty);
    let id_ref = MethodRef::new(main_cls, "id");
    mb.invoke_static(Some(r1), id_ref.clone(), vec![o1]);
    mb.invoke_static(Some(r2), id_ref, vec![o2]);
    let main = mb.finish();
    w.set_entry(main);

    let cs_result = analyze(&w, Box::new(KCallSiteSensitive::new(2)));
    let alloc1 = cs_result.objects_of_var(o1);
    let alloc2 = cs_result.objects_of_var(o2);
    assert_eq!(cs_result.objects_of_var(r1), alloc1);
    assert_eq!(cs_result.objects_of_var(r2), alloc2);

    // the parameter exists under two contexts, each holding exactly the
    // caller's argument objects
    let param_pts: Vec<BTreeSet<_>> = cs_result
        .cs_manager()
        .iter_pointers()
        .filter_map(|(pointer, kind)| match kind {
            Pointer::CSVar { var, .. } if var == p => cs_result.points_to(pointer).map(|pts| {
                pts.iter()
                    .map(|o| cs_result.cs_manager().cs_obj(o).obj)
                    .collect()
            }),
            _ => None,
        })
        .collect();
    assert_eq!(param_pts.len(), 2);
    assert!(param_pts.contains(&alloc1));
    assert!(param_pts.contains(&alloc2));

    // context-insensitively the two call sites merge
    let ci_result = analyze(&w, Box::new(ContextInsensitive));
    let merged: BTreeSet<_> = alloc1.union(&alloc2).copied().collect();
    assert_eq!(ci_result.objects_of_var(r1), merged);
    assert_eq!(ci_result.objects_of_var(r2), merged);
}

/// S4 — instance field flow: `x.f = a; y = x.f;`
#[test]
fn instance_field_flow() {
    let mut w = World::new();
    let cls = w.add_class("A", None);
    let ty = w.class_type(cls);
    let f = w.add_field(cls, "f", ty);
    let main_cls = w.add_class("Main", None);

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let x = mb.var("x", ty);
    let a_var = mb.var("a", ty);
    let y = mb.var("y", ty);
    mb.new_obj(x, ty);
    mb.new_obj(a_var, ty);
    mb.store_field(x, f, a_var);
    mb.load_field(y, x, f);
    let main = mb.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));
    let pts_a = result.objects_of_var(a_var);
    let pts_y = result.objects_of_var(y);
    assert!(!pts_a.is_empty());
    assert!(pts_y.is_superset(&pts_a));
}

/// Static field flow across methods, reached through a static call.
#[test]
fn static_field_flow_across_methods() {
    let mut w = World::new();
    let cls = w.add_class("A", None);
    let ty = w.class_type(cls);
    let holder = w.add_class("Holder", None);
    let g = w.add_field(holder, "g", ty);
    let main_cls = w.add_class("Main", None);

    let mut sb = MethodBuilder::static_method(&mut w, main_cls, "reader");
    let r = sb.var("r", ty);
    sb.load_static(r, g);
    sb.ret(Some(r));
    sb.finish();

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let x = mb.var("x", ty);
    let out = mb.var("out", ty);
    mb.new_obj(x, ty);
    mb.store_static(g, x);
    mb.invoke_static(Some(out), MethodRef::new(main_cls, "reader"), vec![]);
    let main = mb.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));
    assert_eq!(result.objects_of_var(out), result.objects_of_var(x));
}

/// Array element flow: `arr[*] = a; b = arr[*];`
#[test]
fn array_element_flow() {
    let mut w = World::new();
    let cls = w.add_class("A", None);
    let ty = w.class_type(cls);
    let arr_ty = w.array_type(ty);
    let main_cls = w.add_class("Main", None);

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let arr = mb.var("arr", arr_ty);
    let a_var = mb.var("a", ty);
    let b_var = mb.var("b", ty);
    mb.new_obj(arr, arr_ty);
    mb.new_obj(a_var, ty);
    mb.store_array(arr, a_var);
    mb.load_array(b_var, arr);
    let main = mb.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));
    assert_eq!(result.objects_of_var(b_var), result.objects_of_var(a_var));
}

/// An invoke whose reference resolves nowhere is skipped silently.
#[test]
fn unresolved_callee_is_skipped() {
    let mut w = World::new();
    let a = w.add_class("A", None);
    let a_ty = w.class_type(a);
    let main_cls = w.add_class("Main", None);

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let x = mb.var("x", a_ty);
    mb.new_obj(x, a_ty);
    mb.invoke_virtual(None, x, MethodRef::new(a, "missing"), vec![]);
    let main = mb.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));
    assert_eq!(result.call_graph().num_edges(), 0);
    assert_eq!(result.objects_of_var(x).len(), 1);
}

/// An abstract callee produces no call edge either.
#[test]
fn abstract_callee_is_skipped() {
    let mut w = World::new();
    let a = w.add_class("A", None);
    let a_ty = w.class_type(a);
    let main_cls = w.add_class("Main", None);
    MethodBuilder::abstract_method(&mut w, a, "m").finish();

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let x = mb.var("x", a_ty);
    mb.new_obj(x, a_ty);
    mb.invoke_virtual(None, x, MethodRef::new(a, "m"), vec![]);
    let main = mb.finish();
    w.set_entry(main);

    let result = analyze(&w, Box::new(ContextInsensitive));
    assert_eq!(result.call_graph().num_edges(), 0);
}

/// Builds a program with virtual calls, parameter passing and field
/// traffic, for the structural checks below.
fn mixed_world() -> (World, Vec<tapir::ir::VarId>) {
    let mut w = World::new();
    let a = w.add_class("A", None);
    let b_cls = w.add_class("B", Some(a));
    let a_ty = w.class_type(a);
    let b_ty = w.class_type(b_cls);
    let f = w.add_field(a, "f", a_ty);
    let main_cls = w.add_class("Main", None);

    let mut setter = MethodBuilder::instance(&mut w, a, "set");
    let sp = setter.param("v", a_ty);
    let sthis = setter.this();
    setter.store_field(sthis, f, sp);
    setter.finish();

    let mut getter = MethodBuilder::instance(&mut w, a, "get");
    let gthis = getter.this();
    let gr = getter.var("r", a_ty);
    getter.load_field(gr, gthis, f);
    getter.ret(Some(gr));
    getter.finish();

    let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
    let x = mb.var("x", a_ty);
    let v = mb.var("v", a_ty);
    let out = mb.var("out", a_ty);
    mb.new_obj(x, b_ty);
    mb.new_obj(v, a_ty);
    mb.invoke_virtual(None, x, MethodRef::new(a, "set"), vec![v]);
    mb.invoke_virtual(Some(out), x, MethodRef::new(a, "get"), vec![]);
    let main = mb.finish();
    w.set_entry(main);

    (w, vec![x, v, out, sp, gr])
}

/// Parameter, `this` and return flow through instance calls.
#[test]
fn instance_call_binds_this_params_and_returns() {
    let (w, vars) = mixed_world();
    let result = analyze(&w, Box::new(ContextInsensitive));
    let (x, v, out) = (vars[0], vars[1], vars[2]);
    assert_eq!(result.objects_of_var(out), result.objects_of_var(v));
    assert_eq!(result.objects_of_var(x).len(), 1);
}

/// Universal invariant: for every PFG edge s -> t at fixpoint,
/// pts(s) is a subset of pts(t).
#[test]
fn pfg_edges_satisfy_subset_inclusion() {
    let (w, _) = mixed_world();
    for selector in [
        Box::new(ContextInsensitive) as Box<dyn ContextSelector>,
        Box::new(KCallSiteSensitive::new(1)),
        Box::new(KCallSiteSensitive::new(2)),
    ] {
        let result = analyze(&w, selector);
        for (src, dst) in result.pointer_flow_graph().edges() {
            let Some(src_pts) = result.points_to(src) else {
                continue;
            };
            let dst_pts = result
                .points_to(dst)
                .expect("target of a fed edge has a points-to set");
            assert!(
                dst_pts.superset(src_pts),
                "subset inclusion violated on {src:?} -> {dst:?}"
            );
        }
    }
}

/// A callee rediscovered from a second call site is processed once: its
/// statement effects are not re-emitted and the reachable set gains no
/// duplicate entry.
#[test]
fn add_reachable_is_idempotent_across_call_sites() {
    fn world_calling_make(call_sites: usize) -> (World, Vec<tapir::ir::VarId>) {
        let mut w = World::new();
        let a = w.add_class("A", None);
        let a_ty = w.class_type(a);
        let main_cls = w.add_class("Main", None);

        let mut hb = MethodBuilder::static_method(&mut w, main_cls, "make");
        let t = hb.var("t", a_ty);
        let u = hb.var("u", a_ty);
        hb.new_obj(t, a_ty);
        hb.copy(u, t);
        hb.ret(Some(u));
        hb.finish();

        let mut mb = MethodBuilder::static_method(&mut w, main_cls, "main");
        let mut results = Vec::new();
        for i in 0..call_sites {
            let r = mb.var(format!("r{i}"), a_ty);
            mb.invoke_static(Some(r), MethodRef::new(main_cls, "make"), vec![]);
            results.push(r);
        }
        let main = mb.finish();
        w.set_entry(main);
        (w, results)
    }

    let (single_world, _) = world_calling_make(1);
    let baseline = analyze(&single_world, Box::new(ContextInsensitive));

    let (world, results) = world_calling_make(2);
    let result = analyze(&world, Box::new(ContextInsensitive));

    // both call sites resolve to the same context-insensitive callee
    assert_eq!(result.call_graph().num_edges(), 2);
    let reachable: Vec<_> = result.call_graph().reachable_methods().collect();
    let deduped: BTreeSet<_> = reachable.iter().copied().collect();
    assert_eq!(reachable.len(), deduped.len());
    assert_eq!(
        result.call_graph().num_reachable_methods(),
        baseline.call_graph().num_reachable_methods()
    );

    // the callee's allocation and copy effects match the single-call-site
    // baseline; the only growth is the second return edge
    assert_eq!(result.stats().objects, baseline.stats().objects);
    assert_eq!(result.stats().pfg_edges, baseline.stats().pfg_edges + 1);

    let pts_r1 = result.objects_of_var(results[0]);
    assert_eq!(pts_r1.len(), 1);
    assert_eq!(pts_r1, result.objects_of_var(results[1]));
}

/// Determinism: the same world and selector give identical results.
#[test]
fn analysis_is_deterministic() {
    let (w, vars) = mixed_world();
    let r1 = analyze(&w, Box::new(KCallSiteSensitive::new(2)));
    let r2 = analyze(&w, Box::new(KCallSiteSensitive::new(2)));
    for &var in &vars {
        assert_eq!(r1.objects_of_var(var), r2.objects_of_var(var));
    }
    assert_eq!(r1.stats().pointers, r2.stats().pointers);
    assert_eq!(r1.stats().pts_entries, r2.stats().pts_entries);
    assert_eq!(r1.stats().call_graph_edges, r2.stats().call_graph_edges);
    assert_eq!(r1.stats().pfg_edges, r2.stats().pfg_edges);
    let edges1: Vec<_> = r1.call_graph().edges().collect();
    let edges2: Vec<_> = r2.call_graph().edges().collect();
    assert_eq!(edges1, edges2);
}
