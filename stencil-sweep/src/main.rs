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

use std::path::PathBuf;
use stencil_sweep::config::SweepConfig;
use stencil_sweep::error::Result;
use stencil_sweep::harness::Harness;
use stencil_sweep::output_log::OutputLog;
use stencil_sweep::process::{DateCommand, MakeBuilder, ProcessBenchmark};
use stencil_sweep::types::ArgFailurePolicy;
use structopt::StructOpt;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Log to stderr; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Parse commandline arguments
    let cmd = CmdOpt::from_args();
    let config = SweepConfig::from(&cmd);

    let result = run(&config);
    if let Err(ref e) = result {
        error!(error = %e, "sweep aborted");
    }

    result
}

fn run(config: &SweepConfig) -> Result<()> {
    let mut harness = Harness::new(config)?;
    if let Some(ref csv_file) = config.csv_file {
        harness = harness.with_csv(std::fs::File::create(csv_file)?);
    }

    let mut builder = MakeBuilder::new(config.build_tool.clone(), config.work_dir.clone());
    let mut benchmark = ProcessBenchmark::new(config.benchmark.clone(), config.work_dir.clone());
    let clock = DateCommand::default();
    let mut log = OutputLog::create(&config.output_file)?;

    harness.run(&mut builder, &mut benchmark, &clock, &mut log)?;

    Ok(())
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct CmdOpt {
    /// Side length of the square stencil grid; also the largest GPU dimension
    #[structopt(long, default_value = "8192")]
    matrix_size: u32,

    /// Largest number of stencil iterations
    #[structopt(long, default_value = "50")]
    max_iteration: u32,

    /// Increment of the number of stencil iterations, starting at 1
    #[structopt(long, default_value = "5")]
    step_iteration: u32,

    /// Increment of the rows computed on the GPU, starting at 0
    #[structopt(long, default_value = "256")]
    step_ydim_gpu: u32,

    /// Number of benchmark runs averaged per grid point
    #[structopt(long, default_value = "5")]
    repeat: u32,

    /// Output filename for the tab-separated sweep results
    #[structopt(long, default_value = "graph3.dat", parse(from_os_str))]
    output: PathBuf,

    /// Output filename for per-run measurement CSV file
    #[structopt(long, parse(from_os_str))]
    csv: Option<PathBuf>,

    /// Build tool invoked with the preprocessor definitions
    #[structopt(long, default_value = "make", parse(from_os_str))]
    build_tool: PathBuf,

    /// Benchmark binary produced by the build tool
    #[structopt(long, default_value = "./stencil", parse(from_os_str))]
    benchmark: PathBuf,

    /// Directory containing the benchmark's Makefile (default: current directory)
    #[structopt(long, parse(from_os_str))]
    work_dir: Option<PathBuf>,

    /// Abort the sweep on a failed build or run, or skip the failure
    #[structopt(
        long,
        default_value = "Abort",
        possible_values = &ArgFailurePolicy::variants(),
        case_insensitive = true
    )]
    on_failure: ArgFailurePolicy,
}

impl From<&CmdOpt> for SweepConfig {
    fn from(cmd: &CmdOpt) -> Self {
        SweepConfig {
            matrix_size: cmd.matrix_size,
            max_iteration: cmd.max_iteration,
            step_iteration: cmd.step_iteration,
            step_ydim_gpu: cmd.step_ydim_gpu,
            loop_avg: cmd.repeat,
            output_file: cmd.output.clone(),
            csv_file: cmd.csv.clone(),
            build_tool: cmd.build_tool.clone(),
            benchmark: cmd.benchmark.clone(),
            work_dir: cmd.work_dir.clone(),
            failure_policy: cmd.on_failure,
        }
    }
}
