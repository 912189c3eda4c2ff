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

//! Drives the real process wrappers with shell scripts standing in for `make`
//! and the stencil binary.

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use stencil_sweep::config::SweepConfig;
use stencil_sweep::defines::Defines;
use stencil_sweep::error::ErrorKind;
use stencil_sweep::grid::GridPoint;
use stencil_sweep::harness::Harness;
use stencil_sweep::output_log::OutputLog;
use stencil_sweep::process::{
    Benchmark, Builder, Clock, DateCommand, MakeBuilder, ProcessBenchmark,
};
use stencil_sweep::types::ArgFailurePolicy;
use tempfile::TempDir;

// Executing a script fails with ETXTBSY while another test thread forks with
// the script still open for writing
static SCRIPT_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    SCRIPT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_script(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn defines() -> Defines {
    Defines::new(
        &SweepConfig::default(),
        GridPoint {
            iteration_count: 6,
            gpu_dim: 256,
        },
    )
}

#[test]
fn make_receives_single_defines_argument() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(
        dir.path(),
        "make.sh",
        r#"echo "$#" > args.txt; for a in "$@"; do echo "$a" >> args.txt; done"#,
    )?;

    let mut builder = MakeBuilder::new("./make.sh", Some(dir.path().to_path_buf()));
    builder.build(&defines())?;

    let args = fs::read_to_string(dir.path().join("args.txt"))?;
    assert_eq!(
        args,
        "1\nDEFINES=-DQUIET=1 -DYDIM=8192 -DXDIM=8192 -DNUM_ITERATION=6 -DYDIM_GPU=256\n"
    );

    Ok(())
}

#[test]
fn failing_make_is_build_failure() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(dir.path(), "make.sh", "echo 'stencil.c: error' >&2; exit 2")?;

    let mut builder = MakeBuilder::new("./make.sh", Some(dir.path().to_path_buf()));
    let err = builder.build(&defines()).unwrap_err();

    match err.kind() {
        ErrorKind::BuildFailure(msg) => assert!(msg.contains("stencil.c: error")),
        other => panic!("unexpected error kind: {}", other),
    }

    Ok(())
}

#[test]
fn missing_build_tool_is_build_failure() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let mut builder = MakeBuilder::new("./no-such-make", Some(dir.path().to_path_buf()));
    let err = builder.build(&defines()).unwrap_err();

    assert!(err.is_skippable());
    match err.kind() {
        ErrorKind::BuildFailure(_) => {}
        other => panic!("unexpected error kind: {}", other),
    }

    Ok(())
}

#[test]
fn benchmark_measurement_from_stdout() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(
        dir.path(),
        "stencil",
        "echo 'pas d erreurs' >&2; printf '%f\\n' 1.25",
    )?;

    let mut benchmark = ProcessBenchmark::new("./stencil", Some(dir.path().to_path_buf()));
    assert_eq!(benchmark.run()?, 1.25);

    Ok(())
}

#[test]
fn failing_benchmark_is_run_failure() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(dir.path(), "stencil", "echo 0.5; exit 1")?;

    let mut benchmark = ProcessBenchmark::new("./stencil", Some(dir.path().to_path_buf()));
    let err = benchmark.run().unwrap_err();

    match err.kind() {
        ErrorKind::RunFailure(_) => {}
        other => panic!("unexpected error kind: {}", other),
    }

    Ok(())
}

#[test]
fn failed_validation_is_run_failure() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(
        dir.path(),
        "stencil",
        "echo 1.734521; echo '[3] 0.100000 vs 0.200000'; echo '1 erreurs !' >&2",
    )?;

    let mut benchmark = ProcessBenchmark::new("./stencil", Some(dir.path().to_path_buf()));
    let err = benchmark.run().unwrap_err();

    assert!(err.is_skippable());
    match err.kind() {
        ErrorKind::RunFailure(msg) => assert!(msg.contains("validation failed")),
        other => panic!("unexpected error kind: {}", other),
    }

    Ok(())
}

#[test]
fn missing_benchmark_is_run_failure() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let mut benchmark = ProcessBenchmark::new("./stencil", Some(dir.path().to_path_buf()));
    let err = benchmark.run().unwrap_err();

    match err.kind() {
        ErrorKind::RunFailure(_) => {}
        other => panic!("unexpected error kind: {}", other),
    }

    Ok(())
}

#[test]
fn date_command_returns_timestamp() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let now = DateCommand::default().now()?;

    assert!(!now.is_empty());
    assert!(!now.contains('\n'));

    Ok(())
}

#[test]
fn sweep_with_external_programs() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(dir.path(), "make.sh", r#"echo "$1" >> builds.txt"#)?;
    write_script(dir.path(), "stencil", "echo 4")?;

    let config = SweepConfig {
        matrix_size: 8,
        max_iteration: 1,
        step_iteration: 1,
        step_ydim_gpu: 8,
        loop_avg: 2,
        output_file: dir.path().join("graph3.dat"),
        build_tool: PathBuf::from("./make.sh"),
        work_dir: Some(dir.path().to_path_buf()),
        ..SweepConfig::default()
    };

    let mut builder = MakeBuilder::new(config.build_tool.clone(), config.work_dir.clone());
    let mut benchmark = ProcessBenchmark::new(config.benchmark.clone(), config.work_dir.clone());
    let mut log = OutputLog::create(&config.output_file)?;
    Harness::new(&config)?.run(&mut builder, &mut benchmark, &DateCommand::default(), &mut log)?;
    drop(log);

    let text = fs::read_to_string(&config.output_file)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "#MATRIX_SIZE : 8");
    assert!(lines[1].starts_with("#START : "));
    assert_eq!(lines[2], "#num_iteration\tydim_gpu\tspeedup");
    assert_eq!(lines[3], "1\t0\t4");
    assert_eq!(lines[4], "1\t8\t4");
    assert!(lines[5].starts_with("#END : "));

    let builds = fs::read_to_string(dir.path().join("builds.txt"))?;
    assert_eq!(builds.lines().count(), 2);

    Ok(())
}

#[test]
fn non_finite_speedup_is_skipped() -> Result<(), Box<dyn Error>> {
    let _guard = lock();
    let dir = TempDir::new()?;
    write_script(dir.path(), "make.sh", "exit 0")?;
    write_script(
        dir.path(),
        "stencil",
        r#"if [ -e measured ]; then echo 2; else touch measured; echo -nan; fi"#,
    )?;

    let config = SweepConfig {
        matrix_size: 8,
        max_iteration: 1,
        step_iteration: 1,
        step_ydim_gpu: 8,
        loop_avg: 2,
        output_file: dir.path().join("graph3.dat"),
        build_tool: PathBuf::from("./make.sh"),
        work_dir: Some(dir.path().to_path_buf()),
        failure_policy: ArgFailurePolicy::Skip,
        ..SweepConfig::default()
    };

    let mut builder = MakeBuilder::new(config.build_tool.clone(), config.work_dir.clone());
    let mut benchmark = ProcessBenchmark::new(config.benchmark.clone(), config.work_dir.clone());
    let mut log = OutputLog::from_writer(Vec::new());
    let summary = Harness::new(&config)?.run(
        &mut builder,
        &mut benchmark,
        &DateCommand::default(),
        &mut log,
    )?;

    let text = String::from_utf8(log.into_inner())?;
    let rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(rows, vec!["1\t0\t2", "1\t8\t2"]);
    assert_eq!(summary.failed_runs, 1);
    assert_eq!(summary.skipped_points, 0);

    Ok(())
}
