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

use crate::error::{ErrorKind, Result};
use crate::grid::{GridPoints, StepRange};
use crate::types::ArgFailurePolicy;
use error_chain::bail;
use std::path::PathBuf;

pub const DEFAULT_MATRIX_SIZE: u32 = 8192;
pub const DEFAULT_MAX_ITERATION: u32 = 50;
pub const DEFAULT_STEP_ITERATION: u32 = 5;
pub const DEFAULT_STEP_YDIM_GPU: u32 = 256;
pub const DEFAULT_LOOP_AVG: u32 = 5;
pub const DEFAULT_OUTPUT_FILE: &str = "graph3.dat";
pub const DEFAULT_BUILD_TOOL: &str = "make";
pub const DEFAULT_BENCHMARK: &str = "./stencil";

/// The first iteration count of every sweep.
pub const FIRST_ITERATION: u32 = 1;

/// Parameters of a sweep, fixed for the whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepConfig {
    /// Side length of the square stencil grid. Also the upper bound of the
    /// GPU dimension.
    pub matrix_size: u32,
    pub max_iteration: u32,
    pub step_iteration: u32,
    pub step_ydim_gpu: u32,

    /// Number of benchmark runs averaged per grid point
    pub loop_avg: u32,

    pub output_file: PathBuf,

    /// Optional CSV file receiving one record per benchmark run
    pub csv_file: Option<PathBuf>,

    pub build_tool: PathBuf,
    pub benchmark: PathBuf,

    /// Directory in which the build tool and the benchmark are executed.
    /// `None` inherits the current directory.
    pub work_dir: Option<PathBuf>,

    pub failure_policy: ArgFailurePolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            matrix_size: DEFAULT_MATRIX_SIZE,
            max_iteration: DEFAULT_MAX_ITERATION,
            step_iteration: DEFAULT_STEP_ITERATION,
            step_ydim_gpu: DEFAULT_STEP_YDIM_GPU,
            loop_avg: DEFAULT_LOOP_AVG,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            csv_file: None,
            build_tool: PathBuf::from(DEFAULT_BUILD_TOOL),
            benchmark: PathBuf::from(DEFAULT_BENCHMARK),
            work_dir: None,
            failure_policy: ArgFailurePolicy::default(),
        }
    }
}

impl SweepConfig {
    /// Checks that the sweep terminates and measures something.
    pub fn validate(&self) -> Result<()> {
        if self.step_iteration == 0 {
            bail!(ErrorKind::InvalidArgument(
                "Iteration step must be greater than zero".to_string(),
            ));
        }

        if self.step_ydim_gpu == 0 {
            bail!(ErrorKind::InvalidArgument(
                "GPU dimension step must be greater than zero".to_string(),
            ));
        }

        if self.loop_avg == 0 {
            bail!(ErrorKind::InvalidArgument(
                "Number of runs to average must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn iteration_counts(&self) -> StepRange {
        StepRange::new(FIRST_ITERATION, self.max_iteration, self.step_iteration)
    }

    pub fn gpu_dims(&self) -> StepRange {
        StepRange::new(0, self.matrix_size, self.step_ydim_gpu)
    }

    /// All grid points in measurement order.
    pub fn grid_points(&self) -> GridPoints {
        GridPoints::new(self.iteration_counts(), self.gpu_dims())
    }
}
