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

use crate::config::SweepConfig;
use crate::error::Result;
use crate::grid::GridPoint;
use crate::types::ArgFailurePolicy;
use serde_derive::Serialize;

/// A single benchmark run, as written to the optional CSV file.
///
/// Runs that failed under the `Skip` policy have no `speedup`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DataPoint {
    pub hostname: String,
    pub failure_policy: Option<ArgFailurePolicy>,
    pub matrix_size: Option<u32>,
    pub num_iteration: Option<u32>,
    pub ydim_gpu: Option<u32>,
    pub run: Option<u32>,
    pub speedup: Option<f64>,
    pub build_ns: Option<f64>,
    pub ns: Option<f64>,
}

impl DataPoint {
    pub fn new() -> Result<Self> {
        let hostname = hostname::get()?
            .into_string()
            .map_err(|_| "Couldn't convert hostname into UTF-8 string")?;

        let dp = DataPoint {
            hostname,
            ..DataPoint::default()
        };

        Ok(dp)
    }

    pub fn fill_from_config(&self, config: &SweepConfig) -> DataPoint {
        DataPoint {
            failure_policy: Some(config.failure_policy),
            matrix_size: Some(config.matrix_size),
            ..self.clone()
        }
    }

    pub fn fill_from_grid_point(&self, point: GridPoint) -> DataPoint {
        DataPoint {
            num_iteration: Some(point.iteration_count),
            ydim_gpu: Some(point.gpu_dim),
            ..self.clone()
        }
    }
}
