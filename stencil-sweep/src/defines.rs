// Copyright 2022 Clemens Lutz
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Preprocessor definitions that configure one build of the stencil benchmark.
//!
//! The Makefile of the benchmark forwards its `DEFINES` variable to the
//! compiler. The names must match the macros tested in the benchmark source.

use crate::config::SweepConfig;
use crate::grid::GridPoint;
use std::fmt;

/// Name of the Makefile variable carrying the definitions.
pub const DEFINES_VARIABLE: &str = "DEFINES";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Defines {
    pub quiet: bool,
    pub ydim: u32,
    pub xdim: u32,
    pub num_iteration: u32,
    pub ydim_gpu: u32,
}

impl Defines {
    /// Quiet mode is always on, because the benchmark then prints only the
    /// measured speedup.
    pub fn new(config: &SweepConfig, point: GridPoint) -> Self {
        Self {
            quiet: true,
            ydim: config.matrix_size,
            xdim: config.matrix_size,
            num_iteration: point.iteration_count,
            ydim_gpu: point.gpu_dim,
        }
    }

    /// Macro names and values in a fixed order.
    pub fn pairs(&self) -> [(&'static str, u32); 5] {
        [
            ("QUIET", self.quiet as u32),
            ("YDIM", self.ydim),
            ("XDIM", self.xdim),
            ("NUM_ITERATION", self.num_iteration),
            ("YDIM_GPU", self.ydim_gpu),
        ]
    }

    /// A single `DEFINES=...` command line argument for `make`.
    pub fn make_argument(&self) -> String {
        format!("{}={}", DEFINES_VARIABLE, self)
    }
}

impl fmt::Display for Defines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.pairs().iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "-D{}={}", name, value)?;
        }
        Ok(())
    }
}
