// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

use crate::pta::PTAType;

const TAPIR_USAGE: &str = r#"tapir [OPTIONS]"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("tapir")
        .no_binary_name(true)
        .override_usage(TAPIR_USAGE)
        .arg(Arg::new("entry")
            .long("entry")
            .takes_value(true)
            .help("The signature of the entry method from which the analysis begins. \
                   Defaults to the main method declared by the program world."))
        .arg(Arg::new("pta-type")
            .long("pta-type")
            .takes_value(true)
            .value_parser([
                "insensitive", "ci",
                "callsite-sensitive", "cs",
                "object-sensitive", "obj",
                "type-sensitive", "type",
            ])
            .default_value("callsite-sensitive")
            .help("The type of pointer analysis."))
        .arg(Arg::new("context-depth")
            .long("context-depth")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .default_value("1")
            .help("The context depth limit for a context-sensitive pointer analysis."))
        .arg(Arg::new("taint-config")
            .long("taint-config")
            .takes_value(true)
            .help("Path to the taint rule document; enables the taint plugin."))
        .arg(Arg::new("pta")
            .long("pta")
            .takes_value(true)
            .help("Identifier of a prior pointer analysis result, consumed by \
                   downstream interprocedural analyses."))
        .arg(Arg::new("pts-output")
            .long("dump-pts")
            .takes_value(true)
            .help("Dump points-to results to the output file."))
        .arg(Arg::new("call-graph-output")
            .long("dump-call-graph")
            .takes_value(true)
            .help("Dump the call graph to the output file."))
        .arg(Arg::new("taint-output")
            .long("dump-taint-flows")
            .takes_value(true)
            .help("Dump detected taint flows to the output file."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Log the statistics of the analysis results."))
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub entry: Option<String>,
    pub pta_type: PTAType,
    // options for context-sensitive analysis
    pub context_depth: u32,
    // options consumed by plugins and downstream analyses
    pub taint_config: Option<String>,
    pub pta: Option<String>,

    pub dump_stats: bool,
    pub pts_output: Option<String>,
    pub call_graph_output: Option<String>,
    pub taint_output: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            entry: None,
            pta_type: PTAType::CallSiteSensitive,
            context_depth: 1,
            taint_config: None,
            pta: None,
            dump_stats: false,
            pts_output: None,
            call_graph_output: None,
            taint_output: None,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings, exiting with a diagnostic on
    /// invalid arguments.
    pub fn parse_from_args(&mut self, args: &[String]) {
        let matches = match make_options_parser().try_get_matches_from(args.iter()) {
            Ok(matches) => matches,
            Err(e) => e.exit(),
        };

        self.entry = matches.get_one::<String>("entry").cloned();

        if matches.contains_id("pta-type") {
            self.pta_type = match matches.get_one::<String>("pta-type").unwrap().as_str() {
                "insensitive" | "ci" => PTAType::ContextInsensitive,
                "callsite-sensitive" | "cs" => PTAType::CallSiteSensitive,
                "object-sensitive" | "obj" => PTAType::ObjectSensitive,
                "type-sensitive" | "type" => PTAType::TypeSensitive,
                _ => unreachable!(),
            }
        }

        if let Some(depth) = matches.get_one::<u32>("context-depth") {
            self.context_depth = *depth;
        }

        self.taint_config = matches.get_one::<String>("taint-config").cloned();
        self.pta = matches.get_one::<String>("pta").cloned();

        self.dump_stats = matches.contains_id("dump-stats");
        self.pts_output = matches.get_one::<String>("pts-output").cloned();
        self.call_graph_output = matches.get_one::<String>("call-graph-output").cloned();
        self.taint_output = matches.get_one::<String>("taint-output").cloned();
    }
}
