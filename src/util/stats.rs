// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::time::Duration;

/// Counters describing a finished analysis.
#[derive(Clone, Debug)]
pub struct AnalysisStats {
    pub reachable_methods: usize,
    pub call_graph_edges: usize,
    pub pointers: usize,
    pub objects: usize,
    pub taint_objects: usize,
    pub pfg_edges: usize,
    pub pts_entries: usize,
    pub elapsed: Duration,
}

impl fmt::Display for AnalysisStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analysis finished in {}: {} reachable methods, {} call edges, \
             {} pointers, {} objects ({} taint), {} pfg edges, {} points-to entries",
            humantime::format_duration(self.elapsed),
            self.reachable_methods,
            self.call_graph_edges,
            self.pointers,
            self.objects,
            self.taint_objects,
            self.pfg_edges,
            self.pts_entries,
        )
    }
}
