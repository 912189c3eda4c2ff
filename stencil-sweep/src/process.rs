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

//! External programs driven by the sweep.
//!
//! Each program sits behind a trait, so that the harness can be exercised
//! without a compiler toolchain or an OpenCL device. All programs are launched
//! directly with an argument list, never through a shell.

use crate::defines::Defines;
use crate::error::{Error, ErrorKind, Result};
use error_chain::bail;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Rebuilds the benchmark for a set of definitions.
pub trait Builder {
    fn build(&mut self, defines: &Defines) -> Result<()>;
}

/// Runs the benchmark once and returns its measurement.
pub trait Benchmark {
    fn run(&mut self) -> Result<f64>;
}

/// Provides the human-readable timestamps of the log header and footer.
pub trait Clock {
    fn now(&self) -> Result<String>;
}

/// Invokes `make DEFINES=...`.
#[derive(Clone, Debug)]
pub struct MakeBuilder {
    program: PathBuf,
    work_dir: Option<PathBuf>,
}

impl MakeBuilder {
    pub fn new<P: Into<PathBuf>>(program: P, work_dir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir,
        }
    }
}

impl Builder for MakeBuilder {
    fn build(&mut self, defines: &Defines) -> Result<()> {
        let program = resolve_program(&self.program, self.work_dir.as_deref());
        let mut cmd = Command::new(&program);
        cmd.arg(defines.make_argument());
        if let Some(ref dir) = self.work_dir {
            cmd.current_dir(dir);
        }

        debug!(?cmd, "rebuilding benchmark");

        let output = cmd.output().map_err(|e| {
            Error::with_chain(
                e,
                ErrorKind::BuildFailure(format!("Couldn't execute {}", program.display())),
            )
        })?;

        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "build output");

        if !output.status.success() {
            bail!(ErrorKind::BuildFailure(failure_message(&program, &output)));
        }

        Ok(())
    }
}

/// Runs the benchmark binary and reads the measurement from its standard
/// output.
#[derive(Clone, Debug)]
pub struct ProcessBenchmark {
    program: PathBuf,
    work_dir: Option<PathBuf>,
}

impl ProcessBenchmark {
    pub fn new<P: Into<PathBuf>>(program: P, work_dir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir,
        }
    }
}

impl Benchmark for ProcessBenchmark {
    fn run(&mut self) -> Result<f64> {
        let program = resolve_program(&self.program, self.work_dir.as_deref());
        let mut cmd = Command::new(&program);
        if let Some(ref dir) = self.work_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| {
            Error::with_chain(
                e,
                ErrorKind::RunFailure(format!("Couldn't execute {}", program.display())),
            )
        })?;

        if !output.status.success() {
            bail!(ErrorKind::RunFailure(failure_message(&program, &output)));
        }

        // Validation failures are summarized on stderr, mismatches go to stdout
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "benchmark wrote to stderr");
        }

        parse_measurement(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Reads timestamps from the `date` utility.
#[derive(Clone, Debug)]
pub struct DateCommand {
    program: PathBuf,
}

impl DateCommand {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DateCommand {
    fn default() -> Self {
        Self::new("date")
    }
}

impl Clock for DateCommand {
    fn now(&self) -> Result<String> {
        let output = Command::new(&self.program).output().map_err(|e| {
            Error::with_chain(
                e,
                ErrorKind::CommandFailure(format!("Couldn't execute {}", self.program.display())),
            )
        })?;

        if !output.status.success() {
            bail!(ErrorKind::CommandFailure(failure_message(
                &self.program,
                &output,
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(last_line(&stdout).unwrap_or("").to_string())
    }
}

/// Parses the measurement printed by the benchmark.
///
/// In quiet mode the benchmark prints the speedup first. If validating its
/// result against the CPU reference fails, it then prints up to ten
/// `[index] value vs reference` lines to stdout and still exits with 0. Such a
/// run is a `RunFailure`. Otherwise the last non-empty line is parsed, and must
/// be a finite number.
pub fn parse_measurement(stdout: &str) -> Result<f64> {
    let lines: Vec<&str> = stdout
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    let mismatches: Vec<&str> = lines
        .iter()
        .cloned()
        .filter(|line| is_mismatch(line))
        .collect();
    if let Some(first) = mismatches.first() {
        bail!(ErrorKind::RunFailure(format!(
            "Result validation failed, {} mismatched values reported, first: {}",
            mismatches.len(),
            first
        )));
    }

    let line = lines
        .last()
        .ok_or_else(|| ErrorKind::RunFailure("Benchmark printed no measurement".to_string()))?;

    let value = line.parse::<f64>().map_err(|e| {
        Error::with_chain(
            e,
            ErrorKind::RunFailure(format!("Couldn't parse measurement '{}'", line)),
        )
    })?;

    if !value.is_finite() {
        bail!(ErrorKind::RunFailure(format!(
            "Measurement '{}' is not a finite number",
            line
        )));
    }

    Ok(value)
}

/// Matches the `[%d] %f vs %f` lines of a failed result validation.
fn is_mismatch(line: &str) -> bool {
    line.starts_with('[') && line.contains(" vs ")
}

fn last_line(text: &str) -> Option<&str> {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .last()
}

/// Relative paths such as `./stencil` are resolved against the working
/// directory. Bare program names are left to the `PATH` lookup.
fn resolve_program(program: &Path, work_dir: Option<&Path>) -> PathBuf {
    match work_dir {
        Some(dir) if program.is_relative() && program.components().count() > 1 => {
            dir.join(program)
        }
        _ => program.to_path_buf(),
    }
}

fn failure_message(program: &Path, output: &Output) -> String {
    format!(
        "{} exited with {}: {}",
        program.display(),
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    )
}
