// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use thiserror::Error;

use crate::ir::World;
use crate::pts_set::points_to::HybridPointsToSet;
use crate::util::options::AnalysisOptions;
use crate::util::results_dumper;

pub mod context;
pub mod elements;
pub mod heap;
pub mod plugin;
pub mod result;
pub mod selector;
pub mod solver;
pub mod worklist;

use self::plugin::config::{TaintConfig, TaintConfigError};
use self::plugin::taint::TaintAnalysis;
use self::result::PointerAnalysisResult;
use self::selector::{
    ContextInsensitive, ContextSelector, KCallSiteSensitive, KObjectSensitive, KTypeSensitive,
};
use self::solver::Solver;

pub type PointsTo<T> = HybridPointsToSet<T>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PTAType {
    ContextInsensitive,
    CallSiteSensitive,
    ObjectSensitive,
    TypeSensitive,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no entry method: set one on the world or pass --entry")]
    NoEntryPoint,

    #[error("unknown entry method `{0}`")]
    UnknownEntry(String),

    #[error(transparent)]
    TaintConfig(#[from] TaintConfigError),
}

fn make_selector(options: &AnalysisOptions) -> Box<dyn ContextSelector> {
    let k = options.context_depth as usize;
    match options.pta_type {
        PTAType::ContextInsensitive => Box::new(ContextInsensitive),
        PTAType::CallSiteSensitive => Box::new(KCallSiteSensitive::new(k)),
        PTAType::ObjectSensitive => Box::new(KObjectSensitive::new(k)),
        PTAType::TypeSensitive => Box::new(KTypeSensitive::new(k)),
    }
}

/// Runs a whole-program pointer analysis over `world` as configured by
/// `options`, and dumps whatever the options ask for.
pub fn run_pta(
    world: &World,
    options: &AnalysisOptions,
) -> Result<PointerAnalysisResult, AnalysisError> {
    let entry = match &options.entry {
        Some(sig) => world
            .lookup_method(sig)
            .ok_or_else(|| AnalysisError::UnknownEntry(sig.clone()))?,
        None => world.entry_point().ok_or(AnalysisError::NoEntryPoint)?,
    };

    let mut solver = Solver::new(world, entry, make_selector(options));
    if let Some(config_path) = &options.taint_config {
        let config = TaintConfig::load(config_path, world)?;
        solver.register_plugin(Box::new(TaintAnalysis::new(config)));
    }

    info!(
        "running {:?} pointer analysis (context depth {})",
        options.pta_type, options.context_depth
    );
    let result = solver.solve();
    results_dumper::dump_results(world, &result, options);
    Ok(result)
}
