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

//! The sweep driver.
//!
//! For each grid point, the harness rebuilds the benchmark, runs it
//! `loop_avg` times, and appends the mean measurement to the output log.
//! Everything runs sequentially on the calling thread.

use crate::config::SweepConfig;
use crate::data_point::DataPoint;
use crate::defines::Defines;
use crate::error::{Error, Result};
use crate::grid::GridPoint;
use crate::output_log::{OutputLog, ResultRow};
use crate::process::{Benchmark, Builder, Clock};
use crate::types::ArgFailurePolicy;
use average::{concatenate, impl_from_iterator, Estimate, Max, Min, Variance};
use std::io::Write;
use std::time::Instant;
use tracing::{debug, info, warn};

concatenate!(
    RunStatistics,
    [Variance, variance, mean, error],
    [Min, min, min],
    [Max, max, max]
);

/// Counters reported at the end of a sweep.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Grid points with a row in the output log, including skipped points
    pub grid_points: usize,

    /// Grid points logged without a measurement
    pub skipped_points: usize,

    /// Benchmark runs excluded from their average
    pub failed_runs: usize,
}

pub struct Harness<'c> {
    config: &'c SweepConfig,
    template: DataPoint,
    csv: Option<csv::Writer<Box<dyn Write + 'c>>>,
}

impl<'c> Harness<'c> {
    /// Validates the configuration. No files are touched yet.
    pub fn new(config: &'c SweepConfig) -> Result<Self> {
        config.validate()?;
        let template = DataPoint::new()?.fill_from_config(config);

        Ok(Self {
            config,
            template,
            csv: None,
        })
    }

    /// Additionally writes one CSV record per benchmark run.
    pub fn with_csv<W: Write + 'c>(mut self, writer: W) -> Self {
        let boxed: Box<dyn Write + 'c> = Box::new(writer);
        self.csv = Some(csv::Writer::from_writer(boxed));
        self
    }

    /// Runs the whole sweep.
    ///
    /// Under the `Abort` policy the first build or run failure is returned and
    /// the log ends after the last complete row, without an end timestamp.
    pub fn run<W: Write>(
        &mut self,
        builder: &mut dyn Builder,
        benchmark: &mut dyn Benchmark,
        clock: &dyn Clock,
        log: &mut OutputLog<W>,
    ) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        let points = self.config.grid_points();
        let total = points.len();

        log.write_header(self.config.matrix_size, &clock.now()?)?;

        info!(
            points = total,
            repeat = self.config.loop_avg,
            "starting sweep"
        );

        for (index, point) in points.enumerate() {
            let row = self.measure_point(point, builder, benchmark, &mut summary)?;
            log.write_row(&row)?;
            summary.grid_points += 1;

            info!(
                point = index + 1,
                of = total,
                num_iteration = row.iteration_count,
                ydim_gpu = row.gpu_dim,
                mean = row.mean,
                "logged grid point"
            );
        }

        log.write_footer(&clock.now()?)?;

        info!(
            grid_points = summary.grid_points,
            skipped_points = summary.skipped_points,
            failed_runs = summary.failed_runs,
            "finished sweep"
        );

        Ok(summary)
    }

    fn measure_point(
        &mut self,
        point: GridPoint,
        builder: &mut dyn Builder,
        benchmark: &mut dyn Benchmark,
        summary: &mut SweepSummary,
    ) -> Result<ResultRow> {
        let defines = Defines::new(self.config, point);
        let template = self.template.fill_from_grid_point(point);
        let missing = ResultRow {
            iteration_count: point.iteration_count,
            gpu_dim: point.gpu_dim,
            mean: std::f64::NAN,
        };

        let timer = Instant::now();
        if let Err(e) = builder.build(&defines) {
            self.skip_or_abort(e)?;
            summary.skipped_points += 1;

            // Keep loop_avg records per grid point, none of them measured
            if let Some(ref mut csv) = self.csv {
                for run in 0..self.config.loop_avg {
                    csv.serialize(DataPoint {
                        run: Some(run),
                        ..template.clone()
                    })?;
                }
                csv.flush()?;
            }

            return Ok(missing);
        }
        let build_ns = timer.elapsed().as_nanos() as f64;
        debug!(%defines, build_ns, "rebuilt benchmark");

        let mut measurements = Vec::with_capacity(self.config.loop_avg as usize);
        for run in 0..self.config.loop_avg {
            let timer = Instant::now();
            let speedup = match benchmark.run() {
                Ok(value) => Some(value),
                Err(e) => {
                    self.skip_or_abort(e)?;
                    summary.failed_runs += 1;
                    None
                }
            };
            let ns = timer.elapsed().as_nanos() as f64;

            debug!(run, ?speedup, ns, "benchmark run");

            if let Some(value) = speedup {
                measurements.push(value);
            }

            if let Some(ref mut csv) = self.csv {
                csv.serialize(DataPoint {
                    run: Some(run),
                    speedup,
                    build_ns: Some(build_ns),
                    ns: Some(ns),
                    ..template.clone()
                })?;
            }
        }

        if let Some(ref mut csv) = self.csv {
            csv.flush()?;
        }

        if measurements.is_empty() {
            warn!(
                num_iteration = point.iteration_count,
                ydim_gpu = point.gpu_dim,
                "no successful run, logging missing value"
            );
            summary.skipped_points += 1;
            return Ok(missing);
        }

        let stats: RunStatistics = measurements.iter().cloned().collect();
        info!(
            num_iteration = point.iteration_count,
            ydim_gpu = point.gpu_dim,
            runs = measurements.len(),
            mean = stats.mean(),
            error = stats.error(),
            min = stats.min(),
            max = stats.max(),
            "run statistics"
        );

        Ok(ResultRow {
            iteration_count: point.iteration_count,
            gpu_dim: point.gpu_dim,
            mean: stats.mean(),
        })
    }

    /// Returns the error unless the failure policy allows skipping it.
    fn skip_or_abort(&self, error: Error) -> Result<()> {
        match self.config.failure_policy {
            ArgFailurePolicy::Skip if error.is_skippable() => {
                warn!(%error, "skipping failure");
                Ok(())
            }
            _ => Err(error),
        }
    }
}
